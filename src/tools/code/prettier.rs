//! Prettier adapter (`prettier --check`).

use futures::future::{self, BoxFuture, FutureExt};
use lazy_static::lazy_static;
use regex::Regex;

use crate::check::{CheckResult, Violation};
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "prettier",
    name: "Prettier",
    rule: "code.formatting.prettier",
};

const CONFIG_FILES: &[&str] = &[
    ".prettierrc",
    ".prettierrc.json",
    ".prettierrc.yaml",
    ".prettierrc.yml",
    ".prettierrc.json5",
    ".prettierrc.js",
    ".prettierrc.cjs",
    ".prettierrc.mjs",
    ".prettierrc.toml",
    "prettier.config.js",
    "prettier.config.cjs",
    "prettier.config.mjs",
];

lazy_static! {
    static ref WARN_LINE: Regex = Regex::new(r"^\[warn\]\s+(.+)$").unwrap();
}

pub struct Prettier;

fn has_config(ctx: &ToolContext) -> bool {
    if ctx.find_any(CONFIG_FILES).is_some() {
        return true;
    }
    // A "prettier" key in package.json also configures it.
    std::fs::read_to_string(ctx.root.join("package.json"))
        .ok()
        .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
        .map(|pkg| pkg.get("prettier").is_some())
        .unwrap_or(false)
}

impl Prettier {
    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        if !has_config(ctx) {
            return Ok(INFO.result(vec![INFO.violation("Prettier config not found")]));
        }

        let output = match ctx.exec("npx", &["prettier", "--check", "."]).await {
            Ok(o) => o,
            Err(e) => return Ok(INFO.exec_failure(e)),
        };
        if let Some(skip) = INFO.missing_tool(&output) {
            return Ok(skip);
        }
        if output.success() {
            return Ok(INFO.pass());
        }

        let violations = parse_output(&output.combined());
        if violations.is_empty() {
            Ok(INFO.unparseable(&output))
        } else {
            Ok(INFO.result(violations))
        }
    }
}

impl Tool for Prettier {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }

    fn audit<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        let result = if has_config(ctx) {
            INFO.pass()
        } else {
            INFO.result(vec![INFO.violation("Prettier config not found")])
        };
        future::ready(Ok(result)).boxed()
    }
}

/// One violation per `[warn] <path>` line, skipping the trailing summary.
pub fn parse_output(text: &str) -> Vec<Violation> {
    text.lines()
        .filter_map(|line| WARN_LINE.captures(line.trim()))
        .map(|caps| caps[1].trim().to_string())
        .filter(|path| !path.starts_with("Code style issues"))
        .map(|path| INFO.violation("File is not formatted").file(path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_output() {
        let text = "Checking formatting...\n[warn] src/index.ts\n[warn] src/util.ts\n[warn] Code style issues found in 2 files. Run Prettier with --write to fix.\n";
        let violations = parse_output(text);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].file.as_deref(), Some("src/index.ts"));
    }

    #[test]
    fn test_package_json_key_counts_as_config() {
        let temp = TempDir::new().unwrap();
        let ctx = ToolContext::new(temp.path());
        assert!(!has_config(&ctx));

        std::fs::write(
            temp.path().join("package.json"),
            r#"{"name": "x", "prettier": {"semi": false}}"#,
        )
        .unwrap();
        assert!(has_config(&ctx));
    }
}
