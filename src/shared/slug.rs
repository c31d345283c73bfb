//! Label slugs
//!
//! Turns a human command label into a file-name friendly slug:
//! transliterated to ASCII, lowercased, runs of anything outside
//! `[a-z0-9]` collapsed to a single `-`, no leading/trailing dashes.

use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9]+").expect("static slug pattern is valid")
});

/// Digit groupings like `1,000` keep their digits together
static NUMBER_GROUPING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d),(\d)").expect("static slug pattern is valid")
});

pub fn slugify(label: &str) -> String {
    let ascii = deunicode::deunicode(label).to_lowercase();
    let ascii = NUMBER_GROUPING.replace_all(&ascii, "$1$2");
    DISALLOWED
        .replace_all(&ascii, "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_label() {
        assert_eq!(slugify("Disk usage"), "disk-usage");
    }

    #[test]
    fn test_punctuation_collapses() {
        assert_eq!(slugify("  Uptime / load (1m, 5m)  "), "uptime-load-1m-5m");
        assert_eq!(slugify("who's logged in?"), "who-s-logged-in");
    }

    #[test]
    fn test_unicode_is_transliterated() {
        assert_eq!(slugify("Café Überwachung"), "cafe-uberwachung");
    }

    #[test]
    fn test_number_grouping() {
        assert_eq!(slugify("Top 1,000 files"), "top-1000-files");
    }

    #[test]
    fn test_empty_label() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }
}
