//! Text folding for tag and keyword comparison
//!
//! Environment tags, emotion keywords and speech-rate labels arrive in free
//! form ("Forêt", "très lent", "open  sea"). Comparisons go through
//! [`fold_tag`], which lowercases, strips combining accents and joins
//! whitespace runs with `_`.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, accent-stripped, whitespace-joined form of `s`
pub fn fold_tag(s: &str) -> String {
    let stripped: String = s
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Lowercase, accent-stripped form of `s` with whitespace preserved
///
/// Used for keyword search inside running text.
pub fn fold_text(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Number of whitespace-delimited tokens
pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}
