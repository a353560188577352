//! Lint-suppression comment detection.
//!
//! A directive only counts when it appears inside a real comment. For
//! Python and JS/TS sources each line is scanned with a small quote-aware
//! state machine to find where the comment starts; directives inside string
//! literals are ignored. Other extensions fall back to a substring match.

use std::path::Path;

use futures::future::{BoxFuture, FutureExt};
use rayon::prelude::*;
use tracing::debug;

use crate::check::{CheckResult, Severity, Violation};
use crate::config::DisableCommentsConfig;
use crate::files::{compile_globset, files_with_extensions};
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "disable-comments",
    name: "Disable Comments",
    rule: "code.quality.disable_comments",
};

pub const DEFAULT_PATTERNS: &[&str] = &[
    "eslint-disable",
    "@ts-ignore",
    "@ts-expect-error",
    "@ts-nocheck",
    "# noqa",
    "# type: ignore",
    "# pylint: disable",
    "# pragma: no cover",
];

/// Comment syntax of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// `#` line comments; `'` and `"` strings
    Python,
    /// `//` and `/*` comments; `'`, `"` and `` ` `` strings
    Script,
    /// Unknown language: plain substring match
    Plain,
}

impl Syntax {
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "py" | "pyi" => Syntax::Python,
            "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" | "mts" | "cts" => Syntax::Script,
            _ => Syntax::Plain,
        }
    }

    fn quotes(&self) -> &'static [char] {
        match self {
            Syntax::Python => &['\'', '"'],
            _ => &['\'', '"', '`'],
        }
    }
}

/// Byte offset where the line comment starts, outside any string literal.
pub fn comment_start(line: &str, syntax: Syntax) -> Option<usize> {
    let quotes = syntax.quotes();
    let mut quote: Option<char> = None;
    let mut chars = line.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        match quote {
            Some(q) => {
                if ch == '\\' {
                    chars.next();
                } else if ch == q {
                    quote = None;
                }
            }
            None => {
                if quotes.contains(&ch) {
                    quote = Some(ch);
                    continue;
                }
                match syntax {
                    Syntax::Python if ch == '#' => return Some(idx),
                    Syntax::Script if ch == '/' => {
                        if matches!(chars.peek(), Some((_, '/')) | Some((_, '*'))) {
                            return Some(idx);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    None
}

/// First pattern found on `line`, with its byte offset.
pub fn find_directive<'p>(
    line: &str,
    syntax: Syntax,
    patterns: &'p [String],
) -> Option<(&'p str, usize)> {
    let start = match syntax {
        Syntax::Plain => 0,
        _ => comment_start(line, syntax)?,
    };

    patterns.iter().find_map(|pattern| {
        line.match_indices(pattern.as_str())
            .map(|(idx, _)| idx)
            .find(|idx| *idx >= start)
            .map(|idx| (pattern.as_str(), idx))
    })
}

/// Scan one file's contents, one violation per offending line.
pub fn scan_source(file: &str, source: &str, patterns: &[String]) -> Vec<Violation> {
    let ext = Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    let syntax = Syntax::from_extension(ext);

    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let (pattern, idx) = find_directive(line, syntax, patterns)?;
            let column = line[..idx].chars().count() as u32 + 1;
            Some(
                INFO.violation(format!("Disable comment found: {}", pattern))
                    .file(file.to_string())
                    .at(i as u32 + 1, Some(column))
                    .code(pattern.to_string())
                    .severity(Severity::Error),
            )
        })
        .collect()
}

pub struct DisableComments {
    config: DisableCommentsConfig,
}

impl DisableComments {
    pub fn new(config: DisableCommentsConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        let config = self.config.clone();
        let root = ctx.root.clone();
        tokio::task::spawn_blocking(move || scan(&root, &config)).await?
    }
}

impl Tool for DisableComments {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }

    fn audit<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

/// Scan every matching file in parallel. Results are ordered by path.
pub fn scan(root: &Path, config: &DisableCommentsConfig) -> anyhow::Result<CheckResult> {
    let patterns: Vec<String> = match &config.patterns {
        Some(p) => p.clone(),
        None => DEFAULT_PATTERNS.iter().map(|s| s.to_string()).collect(),
    };
    let exclude = compile_globset(&config.exclude)?;

    let files: Vec<String> = files_with_extensions(root, &config.extensions)
        .into_iter()
        .filter(|f| !exclude.is_match(f))
        .collect();
    debug!(files = files.len(), "scanning for disable comments");

    let per_file: Vec<Vec<Violation>> = files
        .par_iter()
        .map(|file| match std::fs::read_to_string(root.join(file)) {
            Ok(source) => scan_source(file, &source, &patterns),
            Err(e) => {
                debug!(file = %file, error = %e, "skipping unreadable file");
                Vec::new()
            }
        })
        .collect();

    Ok(INFO.result(per_file.into_iter().flatten().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn defaults() -> Vec<String> {
        DEFAULT_PATTERNS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_python_string_is_not_a_comment() {
        let patterns = defaults();
        assert!(find_directive(r##"x = "# noqa""##, Syntax::Python, &patterns).is_none());
        assert!(find_directive(r#"x = 'it\'s # noqa'"#, Syntax::Python, &patterns).is_none());
        assert_eq!(
            find_directive("import os  # noqa", Syntax::Python, &patterns),
            Some(("# noqa", 11))
        );
    }

    #[test]
    fn test_script_comments() {
        let patterns = defaults();
        assert!(find_directive(r#"const s = "// eslint-disable";"#, Syntax::Script, &patterns).is_none());
        assert!(find_directive("const s = `/* @ts-ignore */`;", Syntax::Script, &patterns).is_none());
        assert!(find_directive("// eslint-disable-next-line no-var", Syntax::Script, &patterns).is_some());
        assert!(find_directive("foo(); /* eslint-disable */", Syntax::Script, &patterns).is_some());
        assert!(find_directive("const url = 'http://x'; // @ts-ignore", Syntax::Script, &patterns).is_some());
        assert!(find_directive("const r = a / b;", Syntax::Script, &patterns).is_none());
    }

    #[test]
    fn test_first_pattern_wins() {
        let patterns = defaults();
        let hit = find_directive("// eslint-disable @ts-ignore", Syntax::Script, &patterns);
        assert_eq!(hit.map(|h| h.0), Some("eslint-disable"));
    }

    #[test]
    fn test_plain_fallback() {
        let patterns = vec!["rubocop:disable".to_string()];
        assert!(find_directive("x = 1 # rubocop:disable Style", Syntax::Plain, &patterns).is_some());
    }

    #[test]
    fn test_scan_reports_location() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(
            temp.path().join("src/app.ts"),
            "const a = \"@ts-ignore\";\n  // @ts-ignore\nlet b = 1;\n",
        )
        .unwrap();
        std::fs::write(temp.path().join("main.py"), "x = \"# noqa\"\n").unwrap();

        let result = scan(temp.path(), &DisableCommentsConfig::default()).unwrap();
        assert_eq!(result.violations.len(), 1);
        let v = &result.violations[0];
        assert_eq!(v.file.as_deref(), Some("src/app.ts"));
        assert_eq!(v.line, Some(2));
        assert_eq!(v.column, Some(6));
        assert_eq!(v.code.as_deref(), Some("@ts-ignore"));
    }
}
