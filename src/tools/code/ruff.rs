//! Ruff adapters: `ruff check` and `ruff format --check`.

use futures::future::{BoxFuture, FutureExt};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

use crate::check::{CheckResult, Violation};
use crate::config::RuffConfig;
use crate::files::contains_files_with_extension;
use crate::tools::{relative_path, Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "ruff",
    name: "Ruff",
    rule: "code.linting.ruff",
};

pub const FORMAT_INFO: ToolInfo = ToolInfo {
    id: "ruff",
    name: "Ruff Format",
    rule: "code.linting.ruff.format",
};

lazy_static! {
    static ref WOULD_REFORMAT: Regex = Regex::new(r"^Would reformat:\s+(.+)$").unwrap();
}

#[derive(Debug, Deserialize)]
struct Diagnostic {
    code: Option<String>,
    message: String,
    filename: String,
    location: Option<Location>,
}

#[derive(Debug, Deserialize)]
struct Location {
    row: u32,
    column: u32,
}

pub struct Ruff {
    config: RuffConfig,
}

impl Ruff {
    pub fn new(config: RuffConfig) -> Self {
        Self { config }
    }

    fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["check", ".", "--output-format", "json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if !self.config.select.is_empty() {
            args.push("--select".to_string());
            args.push(self.config.select.join(","));
        }
        if !self.config.ignore.is_empty() {
            args.push("--ignore".to_string());
            args.push(self.config.ignore.join(","));
        }
        args
    }

    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        if !contains_files_with_extension(&ctx.root, &["py"]).await? {
            return Ok(INFO.skip("No Python files found"));
        }

        let args = self.args();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = match ctx.exec("ruff", &arg_refs).await {
            Ok(o) => o,
            Err(e) => return Ok(INFO.exec_failure(e)),
        };

        match parse_check_output(&output.stdout, &ctx.root) {
            Some(violations) if !violations.is_empty() || output.success() => {
                Ok(INFO.result(violations))
            }
            None if output.success() => Ok(INFO.pass()),
            _ => Ok(INFO.unparseable(&output)),
        }
    }
}

impl Tool for Ruff {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

/// Parse `ruff check --output-format json`.
pub fn parse_check_output(stdout: &str, root: &Path) -> Option<Vec<Violation>> {
    let diagnostics: Vec<Diagnostic> = serde_json::from_str(stdout.trim()).ok()?;
    Some(
        diagnostics
            .into_iter()
            .map(|d| {
                let mut v = INFO
                    .violation(d.message)
                    .file(relative_path(&d.filename, root));
                if let Some(loc) = d.location {
                    v = v.at(loc.row, Some(loc.column));
                }
                if let Some(code) = d.code {
                    v = v.code(code);
                }
                v
            })
            .collect(),
    )
}

/// `ruff format --check`, enabled by `ruff.format = true`.
pub struct RuffFormat;

impl RuffFormat {
    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        if !contains_files_with_extension(&ctx.root, &["py"]).await? {
            return Ok(FORMAT_INFO.skip("No Python files found"));
        }

        let output = match ctx.exec("ruff", &["format", "--check", "."]).await {
            Ok(o) => o,
            Err(e) => return Ok(FORMAT_INFO.exec_failure(e)),
        };
        if output.success() {
            return Ok(FORMAT_INFO.pass());
        }

        let violations = parse_format_output(&output.combined());
        if violations.is_empty() {
            Ok(FORMAT_INFO.unparseable(&output))
        } else {
            Ok(FORMAT_INFO.result(violations))
        }
    }
}

impl Tool for RuffFormat {
    fn info(&self) -> ToolInfo {
        FORMAT_INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

/// One violation per `Would reformat: <path>` line.
pub fn parse_format_output(text: &str) -> Vec<Violation> {
    text.lines()
        .filter_map(|line| WOULD_REFORMAT.captures(line.trim()))
        .map(|caps| {
            FORMAT_INFO
                .violation("File is not formatted")
                .file(caps[1].trim().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_check_output() {
        let json = r#"[
          {"code": "F401", "message": "`os` imported but unused", "filename": "/repo/app/main.py",
           "location": {"row": 1, "column": 8}, "end_location": {"row": 1, "column": 10}, "fix": null, "url": "https://docs.astral.sh/ruff/rules/unused-import"}
        ]"#;
        let violations = parse_check_output(json, Path::new("/repo")).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code.as_deref(), Some("F401"));
        assert_eq!(violations[0].file.as_deref(), Some("app/main.py"));
        assert_eq!(violations[0].line, Some(1));
        assert_eq!(violations[0].column, Some(8));
    }

    #[test]
    fn test_parse_empty_check_output() {
        assert_eq!(parse_check_output("[]", Path::new("/")).unwrap().len(), 0);
    }

    #[test]
    fn test_parse_format_output() {
        let text = "Would reformat: app/main.py\nWould reformat: app/util.py\n2 files would be reformatted, 3 files already formatted\n";
        let violations = parse_format_output(text);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[1].file.as_deref(), Some("app/util.py"));
        assert_eq!(violations[0].rule, "code.linting.ruff.format");
    }

    #[test]
    fn test_args_include_select_and_ignore() {
        let ruff = Ruff::new(RuffConfig {
            enabled: true,
            format: false,
            select: vec!["E".to_string(), "F".to_string()],
            ignore: vec!["E501".to_string()],
        });
        assert_eq!(
            ruff.args(),
            vec!["check", ".", "--output-format", "json", "--select", "E,F", "--ignore", "E501"]
        );
    }

    #[tokio::test]
    async fn test_skips_without_python_files() {
        let temp = TempDir::new().unwrap();
        let ctx = ToolContext::new(temp.path());
        let result = Ruff::new(RuffConfig::default()).run(&ctx).await.unwrap();
        assert!(result.skipped);
        let result = RuffFormat.run(&ctx).await.unwrap();
        assert_eq!(result.skip_reason.as_deref(), Some("No Python files found"));
    }
}
