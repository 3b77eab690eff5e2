/// File categorization by extension.
///
/// Categories are checked in a fixed order and the first one whose extension
/// set contains the file's extension wins. Anything unmatched lands in
/// [`Category::Other`].
///
/// # Examples
///
/// ```
/// use dirsort::file_category::{Category, CategoryTable};
///
/// let table = CategoryTable::default();
/// assert_eq!(table.classify("jpg"), Category::Images);
/// assert_eq!(table.classify("MP3"), Category::Audio);
/// assert_eq!(table.classify("xyz"), Category::Other);
/// ```
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Represents a destination category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// JPEG, PNG, JPG, SVG
    Images,
    /// AVI, MP4, MOV, MKV
    Video,
    /// DOC, DOCX, TXT, PDF, XLSX, PPTX
    Documents,
    /// MP3, OGG, WAV, AMR
    Audio,
    /// ZIP, GZ, TAR. Extracted instead of moved.
    Archives,
    /// Fallback for everything else.
    Other,
}

impl Category {
    /// Every category, in lookup order.
    pub const ALL: [Category; 6] = [
        Category::Images,
        Category::Video,
        Category::Documents,
        Category::Audio,
        Category::Archives,
        Category::Other,
    ];

    /// Returns the directory name for this category.
    ///
    /// ```
    /// use dirsort::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "images");
    /// assert_eq!(Category::Other.dir_name(), "other");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "images",
            Category::Video => "video",
            Category::Documents => "documents",
            Category::Audio => "audio",
            Category::Archives => "archives",
            Category::Other => "other",
        }
    }

    /// Whether files of this category are unpacked rather than moved.
    pub fn is_extracted(&self) -> bool {
        matches!(self, Category::Archives)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Ordered extension lookup table.
///
/// Extensions are stored upper-cased; lookups upper-case their input, so
/// `"jpg"`, `"JPG"` and `"Jpg"` all match.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    entries: Vec<(Category, HashSet<String>)>,
}

impl CategoryTable {
    /// Creates the standard table.
    pub fn new() -> Self {
        let mut table = Self {
            entries: Vec::new(),
        };
        table.add_category(Category::Images, &["JPEG", "PNG", "JPG", "SVG"]);
        table.add_category(Category::Video, &["AVI", "MP4", "MOV", "MKV"]);
        table.add_category(
            Category::Documents,
            &["DOC", "DOCX", "TXT", "PDF", "XLSX", "PPTX"],
        );
        table.add_category(Category::Audio, &["MP3", "OGG", "WAV", "AMR"]);
        table.add_category(Category::Archives, &["ZIP", "GZ", "TAR"]);
        table
    }

    fn add_category(&mut self, category: Category, extensions: &[&str]) {
        let set = extensions.iter().map(|ext| ext.to_uppercase()).collect();
        self.entries.push((category, set));
    }

    /// Extensions recognized for a category. Empty for [`Category::Other`].
    pub fn extensions(&self, category: Category) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |(c, _)| *c == category)
            .flat_map(|(_, set)| set.iter().map(String::as_str))
    }

    /// Maps an extension (without the leading dot) to its category.
    pub fn classify(&self, extension: &str) -> Category {
        let key = extension.trim_start_matches('.').to_uppercase();
        self.entries
            .iter()
            .find(|(_, set)| set.contains(&key))
            .map(|(category, _)| *category)
            .unwrap_or(Category::Other)
    }

    /// Classifies a path by its extension. Paths without one are `Other`.
    pub fn classify_path(&self, path: &Path) -> Category {
        path.extension()
            .map(|ext| self.classify(&ext.to_string_lossy()))
            .unwrap_or(Category::Other)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new()
    }
}
