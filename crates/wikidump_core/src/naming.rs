use std::path::{Path, PathBuf};

pub const HTML_EXTENSION: &str = "html";
pub const MAX_BASE_CHARS: usize = 200;

const UNSAFE_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Map a page title to a filesystem-safe base name (no extension).
///
/// Unsafe characters become `_`, surrounding spaces and dots are dropped, an
/// empty result falls back to `page_<id>` (or `page_unknown`), and the name is
/// capped at [`MAX_BASE_CHARS`] characters.
pub fn sanitize_filename(title: &str, page_id: Option<i64>) -> String {
    let replaced = title
        .chars()
        .map(|ch| if UNSAFE_CHARS.contains(&ch) { '_' } else { ch })
        .collect::<String>();
    let trimmed = replaced.trim_matches(|ch| ch == ' ' || ch == '.');

    let base = if trimmed.is_empty() {
        match page_id {
            Some(id) => format!("page_{id}"),
            None => "page_unknown".to_string(),
        }
    } else {
        trimmed.to_string()
    };

    if base.chars().count() > MAX_BASE_CHARS {
        let truncated = base.chars().take(MAX_BASE_CHARS).collect::<String>();
        truncated.trim_end().to_string()
    } else {
        base
    }
}

/// `<dir>/<base>.html`.
pub fn html_path(dir: &Path, base: &str) -> PathBuf {
    dir.join(format!("{base}.{HTML_EXTENSION}"))
}

/// First free path among `<base>.html`, `<base>_1.html`, `<base>_2.html`, ...
pub fn unique_html_path(dir: &Path, base: &str) -> PathBuf {
    let mut candidate = html_path(dir, base);
    let mut counter = 1usize;
    while candidate.exists() {
        candidate = html_path(dir, &format!("{base}_{counter}"));
        counter += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{html_path, sanitize_filename, unique_html_path};

    #[test]
    fn unsafe_characters_become_underscores() {
        let name = sanitize_filename("a/b\\c:d*e?f\"g<h>i|j", Some(1));
        assert_eq!(name, "a_b_c_d_e_f_g_h_i_j");
        assert!(!name.contains(['/', '\\', ':', '*', '?', '"', '<', '>', '|']));
    }

    #[test]
    fn surrounding_spaces_and_dots_are_trimmed() {
        assert_eq!(sanitize_filename(" ..Hidden page.. ", Some(1)), "Hidden page");
        assert_eq!(sanitize_filename("Inner. dots .kept", Some(1)), "Inner. dots .kept");
    }

    #[test]
    fn empty_titles_fall_back_to_page_id() {
        assert_eq!(sanitize_filename("", Some(17)), "page_17");
        assert_eq!(sanitize_filename("   ", Some(17)), "page_17");
        assert_eq!(sanitize_filename(" . ", None), "page_unknown");
    }

    #[test]
    fn long_titles_are_truncated() {
        let title = "x".repeat(250);
        let base = sanitize_filename(&title, Some(1));
        assert_eq!(base.chars().count(), 200);

        let temp = tempdir().expect("tempdir");
        let path = html_path(temp.path(), &base);
        let file_name = path.file_name().expect("file name").to_string_lossy();
        assert!(file_name.chars().count() <= 205);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let title = "é".repeat(250);
        let base = sanitize_filename(&title, None);
        assert_eq!(base.chars().count(), 200);
    }

    #[test]
    fn truncation_trims_trailing_whitespace() {
        let title = format!("{} tail", "y".repeat(199));
        assert_eq!(sanitize_filename(&title, None), "y".repeat(199));
    }

    #[test]
    fn unique_path_appends_counter() {
        let temp = tempdir().expect("tempdir");
        let first = unique_html_path(temp.path(), "Alpha");
        assert!(first.ends_with("Alpha.html"));
        fs::write(&first, "one").expect("write");

        let second = unique_html_path(temp.path(), "Alpha");
        assert!(second.ends_with("Alpha_1.html"));
        fs::write(&second, "two").expect("write");

        let third = unique_html_path(temp.path(), "Alpha");
        assert!(third.ends_with("Alpha_2.html"));
    }
}
