//! File discovery and glob pattern helpers.

use std::collections::BTreeSet;
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

/// Directory names never descended into.
pub const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "target",
    "coverage",
    ".venv",
    "venv",
    "__pycache__",
    ".next",
    ".turbo",
    ".tox",
    ".mypy_cache",
    ".ruff_cache",
    ".pytest_cache",
];

/// Split a comma-separated list of globs, keeping `{a,b}` groups intact.
///
/// `**/*.{test,spec}.ts,**/test_*.py` becomes
/// `["**/*.{test,spec}.ts", "**/test_*.py"]`.
pub fn split_patterns(pattern: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in pattern.chars() {
        match ch {
            '{' => {
                depth += 1;
                current.push(ch);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                push_trimmed(&mut patterns, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_trimmed(&mut patterns, &current);

    patterns
}

fn push_trimmed(patterns: &mut Vec<String>, segment: &str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        patterns.push(trimmed.to_string());
    }
}

/// Compile one glob; `*` does not cross directory separators.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// Compile a set of globs for exclusion checks.
pub fn compile_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
    }
    builder.build()
}

/// Root-relative path with forward slashes.
pub fn to_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && IGNORED_DIRS.contains(&entry.file_name().to_string_lossy().as_ref())
}

/// Every file under `root` outside ignored directories, as relative paths.
pub fn walk_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| to_relative(root, e.path()))
        .collect();
    files.sort();
    files
}

/// Union of the files matched by each pattern independently.
pub fn find_files(root: &Path, patterns: &[String]) -> Result<Vec<String>, globset::Error> {
    let matchers = patterns
        .iter()
        .map(|p| compile_glob(p))
        .collect::<Result<Vec<_>, _>>()?;

    let matched: BTreeSet<String> = walk_files(root)
        .into_iter()
        .filter(|f| matchers.iter().any(|m| m.is_match(f)))
        .collect();

    Ok(matched.into_iter().collect())
}

/// Relative files whose extension is one of `extensions`.
pub fn files_with_extensions(root: &Path, extensions: &[String]) -> Vec<String> {
    walk_files(root)
        .into_iter()
        .filter(|f| {
            Path::new(f)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.iter().any(|x| x.trim_start_matches('.') == e))
                .unwrap_or(false)
        })
        .collect()
}

/// [`has_files_with_extension`] on the blocking pool.
pub async fn contains_files_with_extension(
    root: &Path,
    extensions: &'static [&'static str],
) -> anyhow::Result<bool> {
    let root = root.to_path_buf();
    Ok(tokio::task::spawn_blocking(move || has_files_with_extension(&root, extensions)).await?)
}

/// Whether any file with one of `extensions` exists under `root`.
pub fn has_files_with_extension(root: &Path, extensions: &[&str]) -> bool {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .any(|e| {
            e.path()
                .extension()
                .and_then(|x| x.to_str())
                .map(|x| extensions.contains(&x))
                .unwrap_or(false)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_keeps_brace_groups() {
        assert_eq!(
            split_patterns("**/*.{test,spec}.ts,**/test_*.py"),
            vec!["**/*.{test,spec}.ts", "**/test_*.py"]
        );
    }

    #[test]
    fn test_split_single_and_nested() {
        assert_eq!(split_patterns("**/*.test.ts"), vec!["**/*.test.ts"]);
        assert_eq!(
            split_patterns("a/{b,{c,d}}/*.ts, e/*.py"),
            vec!["a/{b,{c,d}}/*.ts", "e/*.py"]
        );
        assert!(split_patterns("").is_empty());
        assert_eq!(split_patterns("a,,b"), vec!["a", "b"]);
    }

    #[test]
    fn test_find_files_unions_patterns() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("tests")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("src/app.test.ts"), "").unwrap();
        std::fs::write(root.join("src/app.spec.ts"), "").unwrap();
        std::fs::write(root.join("tests/test_app.py"), "").unwrap();
        std::fs::write(root.join("node_modules/pkg/x.test.ts"), "").unwrap();

        let patterns = split_patterns("**/*.{test,spec}.ts,**/test_*.py,src/*.test.ts");
        let files = find_files(root, &patterns).unwrap();
        assert_eq!(
            files,
            vec!["src/app.spec.ts", "src/app.test.ts", "tests/test_app.py"]
        );
    }

    #[test]
    fn test_has_files_with_extension() {
        let temp = TempDir::new().unwrap();
        assert!(!has_files_with_extension(temp.path(), &["py"]));
        std::fs::write(temp.path().join("main.py"), "").unwrap();
        assert!(has_files_with_extension(temp.path(), &["py"]));
    }

    #[tokio::test]
    async fn test_contains_files_with_extension_skips_ignored_dirs() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("node_modules/pkg")).unwrap();
        std::fs::write(temp.path().join("node_modules/pkg/setup.py"), "").unwrap();
        assert!(!contains_files_with_extension(temp.path(), &["py"]).await.unwrap());

        std::fs::create_dir_all(temp.path().join("app")).unwrap();
        std::fs::write(temp.path().join("app/main.py"), "").unwrap();
        assert!(contains_files_with_extension(temp.path(), &["py"]).await.unwrap());
    }
}
