// crates/trimline-ui/src/helpers/format.rs
//
// Display-only string helpers. Timestamps and durations live in
// trimline_core::helpers::time.

use std::path::Path;

/// Shortens `text` to at most `max_chars` characters by replacing its middle
/// with "…", so both the folder start and the file name stay readable.
pub fn middle_ellipsis(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    if max_chars <= 1 {
        return "…".chars().take(max_chars).collect();
    }
    let keep = max_chars - 1;
    let tail = keep / 2 + keep % 2;
    let head = keep - tail;
    let start: String = text.chars().take(head).collect();
    let end: String = text.chars().skip(count - tail).collect();
    format!("{start}…{end}")
}

/// `name.ext` of a path, or the whole path when it has no file name.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(middle_ellipsis("clip.mp4", 20), "clip.mp4");
    }

    #[test]
    fn long_text_keeps_both_ends() {
        let s = middle_ellipsis("/home/user/videos/holiday_2024.mp4", 15);
        assert_eq!(s.chars().count(), 15);
        assert!(s.starts_with("/home/"));
        assert!(s.ends_with("24.mp4"));
        assert!(s.contains('…'));
    }

    #[test]
    fn multibyte_is_counted_by_char() {
        let s = middle_ellipsis("ééééééééé", 5);
        assert_eq!(s, "éé…éé");
    }

    #[test]
    fn tiny_budget() {
        assert_eq!(middle_ellipsis("abcdef", 0), "");
        assert_eq!(middle_ellipsis("abcdef", 1), "…");
    }
}
