use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

const MAX_SLUG_LEN: usize = 60;

/// Turns a post title into a name that is safe as both a URL segment and a
/// directory name. Degenerate titles may produce an empty string; callers
/// are expected to run the result through [`unique_slug`].
pub fn derive_slug(title: &str) -> String {
    lazy_static! {
        static ref DISALLOWED: Regex = Regex::new(r"[^\w\- ]").unwrap();
        static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
        static ref HYPHEN_RUNS: Regex = Regex::new(r"-{2,}").unwrap();
    }

    let slug = unidecode::unidecode(title).to_lowercase();
    let slug = DISALLOWED.replace_all(&slug, "");
    let slug = WHITESPACE.replace_all(slug.as_ref(), "-");
    let slug = HYPHEN_RUNS.replace_all(slug.as_ref(), "-");
    let slug: String = slug.trim_matches('-').chars().take(MAX_SLUG_LEN).collect();

    slug.trim_end_matches('-').to_string()
}

/// Resolves slug collisions against the posts directory by suffixing
/// `-1`, `-2`, ... until the candidate does not exist. An empty base slug
/// is never returned as-is.
pub fn unique_slug(root: &Path, base: &str) -> String {
    if !base.is_empty() && !root.join(base).exists() {
        return base.to_string();
    }

    let mut suffix = 1;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !root.join(&candidate).exists() {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_derive_slug() {
        assert_eq!(derive_slug("Test Post"), "test-post");
        assert_eq!(derive_slug("  What I learned, 20+ years in!  "), "what-i-learned-20-years-in");
        assert_eq!(derive_slug("Post title of mine ábaco - dir2"), "post-title-of-mine-abaco-dir2");
        assert_eq!(derive_slug("hyphen -- runs --- everywhere"), "hyphen-runs-everywhere");
    }

    #[test]
    fn test_derive_slug_degenerate() {
        assert_eq!(derive_slug(""), "");
        assert_eq!(derive_slug("!!! ??? ..."), "");
        assert_eq!(derive_slug("---"), "");
    }

    #[test]
    fn test_derive_slug_truncates() {
        let title = "a".repeat(80);
        assert_eq!(derive_slug(&title).len(), 60);

        // A hyphen landing on the cut point is trimmed
        let title = format!("{} {}", "b".repeat(59), "c".repeat(20));
        let slug = derive_slug(&title);
        assert_eq!(slug, "b".repeat(59));
    }

    #[test]
    fn test_unique_slug() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_slug(dir.path(), "test-post"), "test-post");

        fs::create_dir(dir.path().join("test-post")).unwrap();
        assert_eq!(unique_slug(dir.path(), "test-post"), "test-post-1");

        fs::create_dir(dir.path().join("test-post-1")).unwrap();
        assert_eq!(unique_slug(dir.path(), "test-post"), "test-post-2");
    }

    #[test]
    fn test_unique_slug_empty_base() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_slug(dir.path(), ""), "-1");
    }
}
