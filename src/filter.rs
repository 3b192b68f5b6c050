//! File classification by extension.
//!
//! Decides which changed files are worth sending to the review stage: an
//! allow-list of extensions and a deny-list of binary (or otherwise
//! unreviewable) extensions. Deny always wins.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Extensions excluded when the caller supplies no deny-list.
pub const DEFAULT_BINARY_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".ico", ".webp", ".pdf", ".doc", ".docx", ".ppt",
    ".pptx", ".xls", ".xlsx", ".zip", ".tar", ".gz", ".rar", ".7z", ".exe", ".dll", ".so", ".dylib",
    ".bin", ".dat", ".class", ".mp3", ".mp4", ".avi", ".mov", ".flv", ".md", ".markdown", ".txt",
    ".gitignore",
];

/// Extension allow/deny configuration for one `get_changes` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Allow-list. Empty means every non-denied file is included.
    pub file_extensions: BTreeSet<String>,
    /// Deny-list. Empty means [`DEFAULT_BINARY_EXTENSIONS`].
    pub binary_extensions: BTreeSet<String>,
}

impl FilterConfig {
    /// Build a filter from raw extension lists, normalizing each entry.
    pub fn new<A, D>(file_extensions: A, binary_extensions: D) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            file_extensions: normalize_extensions(file_extensions),
            binary_extensions: normalize_extensions(binary_extensions),
        }
    }

    /// Returns a copy whose deny-list falls back to the built-in defaults.
    pub fn with_default_binaries(&self) -> Self {
        if !self.binary_extensions.is_empty() {
            return self.clone();
        }
        Self {
            file_extensions: self.file_extensions.clone(),
            binary_extensions: normalize_extensions(DEFAULT_BINARY_EXTENSIONS),
        }
    }

    /// Classify a path against this filter.
    pub fn includes(&self, path: &str) -> bool {
        include(path, &self.file_extensions, &self.binary_extensions)
    }
}

/// Decide whether a path is included.
///
/// Deny takes priority; a non-empty allow-list then requires membership;
/// otherwise everything is included.
pub fn include(path: &str, allow: &BTreeSet<String>, deny: &BTreeSet<String>) -> bool {
    let ext = extension_of(path);

    if deny.contains(&ext) {
        return false;
    }

    if !allow.is_empty() {
        return allow.contains(&ext);
    }

    true
}

/// Lower-cased extension of the file name, including the leading dot.
///
/// Only the final path component is considered, so a dot in a directory
/// name never counts. Files without a dot have an empty extension.
pub fn extension_of(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) => name[idx..].to_lowercase(),
        None => String::new(),
    }
}

/// Trim, lower-case, and dot-prefix extension entries, dropping blanks.
pub fn normalize_extensions<I>(exts: I) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    exts.into_iter()
        .map(|e| e.as_ref().trim().to_lowercase())
        .filter(|e| !e.is_empty() && e != ".")
        .map(|e| if e.starts_with('.') { e } else { format!(".{e}") })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        normalize_extensions(items)
    }

    #[test]
    fn deny_excludes_even_without_allow_list() {
        assert!(!include("a/b.md", &set(&[]), &set(&[".md"])));
    }

    #[test]
    fn allow_list_includes_matching_extension() {
        assert!(include("x.ts", &set(&[".ts", ".js"]), &set(&[".png"])));
    }

    #[test]
    fn deny_wins_over_allow_list() {
        assert!(!include("y.png", &set(&[".ts"]), &set(&[".png"])));
        assert!(!include("y.png", &set(&[".png"]), &set(&[".png"])));
    }

    #[test]
    fn allow_list_excludes_other_extensions() {
        assert!(!include("src/lib.rs", &set(&[".ts"]), &set(&[])));
    }

    #[test]
    fn empty_lists_include_everything() {
        assert!(include("Makefile", &set(&[]), &set(&[])));
        assert!(include("src/lib.rs", &set(&[]), &set(&[])));
    }

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(extension_of("Logo.PNG"), ".png");
        assert!(!include("Logo.PNG", &set(&[]), &set(&[".png"])));
    }

    #[test]
    fn extension_uses_last_dot_of_file_name() {
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("dir.v2/Makefile"), "");
        assert_eq!(extension_of(r"dir\file.Rs"), ".rs");
        assert_eq!(extension_of(".gitignore"), ".gitignore");
    }

    #[test]
    fn extensionless_path_matches_only_empty_allow() {
        assert!(!include("Dockerfile", &set(&[".rs"]), &set(&[])));
    }

    #[test]
    fn normalize_adds_dot_and_lowercases() {
        let exts = normalize_extensions(["TS", " .Js ", "", "."]);
        assert_eq!(exts, set(&[".ts", ".js"]));
    }

    #[test]
    fn default_binaries_apply_only_when_empty() {
        let f = FilterConfig::new(Vec::<String>::new(), Vec::<String>::new())
            .with_default_binaries();
        assert!(!f.includes("readme.md"));
        assert!(!f.includes("logo.png"));
        assert!(f.includes("main.ts"));

        let custom = FilterConfig::new(Vec::<String>::new(), [".lock"]).with_default_binaries();
        assert!(!custom.includes("Cargo.lock"));
        assert!(custom.includes("logo.png"));
    }
}
