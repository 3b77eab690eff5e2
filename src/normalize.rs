//! File name normalization.
//!
//! Stems are made filesystem-safe in two steps: every run of characters
//! that are neither letters, digits nor `_` collapses to a single
//! underscore, then Cyrillic letters are transliterated to Latin sequences.
//! Combining marks count as separators, so a decomposed `й` (`и` + U+0306)
//! ends up as `i_`.
//!
//! # Examples
//!
//! ```
//! use dirsort::normalize::normalize;
//!
//! assert_eq!(normalize("фото"), "foto");
//! assert_eq!(normalize("my file (1)"), "my_file_1_");
//! ```

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Source alphabet, lower case. Upper-case forms are derived.
const CYRILLIC: &str = "абвгдеёжзийклмнопрстуфхцчшщъыьэюяєіїґ";

/// Latin sequence for each letter of [`CYRILLIC`], in the same order.
const LATIN: [&str; 37] = [
    "a", "b", "v", "g", "d", "e", "e", "j", "z", "i", "j", "k", "l", "m", "n", "o", "p", "r", "s",
    "t", "u", "f", "h", "ts", "ch", "sh", "sch", "", "y", "", "e", "yu", "ya", "je", "i", "ji", "g",
];

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}_]+").expect("non-word pattern is valid"));

static TRANSLIT: LazyLock<HashMap<char, String>> = LazyLock::new(|| {
    let mut table = HashMap::with_capacity(LATIN.len() * 2);
    for (letter, latin) in CYRILLIC.chars().zip(LATIN) {
        table.insert(letter, latin.to_string());
        for upper in letter.to_uppercase() {
            table.insert(upper, latin.to_uppercase());
        }
    }
    table
});

/// Returns the Latin sequence for a single character, if it has one.
///
/// Letters that transliterate to nothing (`ъ`, `ь`) return `Some("")`.
pub fn transliterate_char(c: char) -> Option<&'static str> {
    TRANSLIT.get(&c).map(String::as_str)
}

/// Normalizes a file stem.
///
/// Letters and digits outside the transliteration table (precomposed
/// accented Latin, CJK) are kept as they are. A non-empty stem never
/// normalizes to an empty string: if every character maps to nothing the
/// result is `"_"`.
pub fn normalize(stem: &str) -> String {
    let collapsed = NON_WORD.replace_all(stem, "_");

    let mut normalized = String::with_capacity(collapsed.len());
    for c in collapsed.chars() {
        match transliterate_char(c) {
            Some(latin) => normalized.push_str(latin),
            None => normalized.push(c),
        }
    }

    if normalized.is_empty() && !stem.is_empty() {
        normalized.push('_');
    }
    normalized
}
