//! ESLint adapter.

use futures::future::{self, BoxFuture, FutureExt};
use serde::Deserialize;
use std::path::Path;

use crate::check::{CheckResult, Severity, Violation};
use crate::config::EslintConfig;
use crate::tools::{relative_path, Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "eslint",
    name: "ESLint",
    rule: "code.linting.eslint",
};

/// Config files ESLint picks up, flat config first.
const CONFIG_FILES: &[&str] = &[
    "eslint.config.js",
    "eslint.config.mjs",
    "eslint.config.cjs",
    "eslint.config.ts",
    "eslint.config.mts",
    "eslint.config.cts",
    ".eslintrc.js",
    ".eslintrc.cjs",
    ".eslintrc.json",
    ".eslintrc.yaml",
    ".eslintrc.yml",
    ".eslintrc",
];

/// One file entry of `--format json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileReport {
    file_path: String,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    rule_id: Option<String>,
    severity: u8,
    message: String,
    line: Option<u32>,
    column: Option<u32>,
}

pub struct Eslint {
    config: EslintConfig,
}

impl Eslint {
    pub fn new(config: EslintConfig) -> Self {
        Self { config }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec!["eslint".to_string()];
        if self.config.files.is_empty() {
            args.push(".".to_string());
        } else {
            args.extend(self.config.files.iter().cloned());
        }
        args.extend(["--format".to_string(), "json".to_string()]);
        if let Some(max) = self.config.max_warnings {
            args.extend(["--max-warnings".to_string(), max.to_string()]);
        }
        args
    }

    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        if ctx.find_any(CONFIG_FILES).is_none() {
            return Ok(INFO.result(vec![INFO.violation("ESLint config not found")]));
        }

        let args = self.args();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = match ctx.exec("npx", &arg_refs).await {
            Ok(o) => o,
            Err(e) => return Ok(INFO.exec_failure(e)),
        };
        if let Some(skip) = INFO.missing_tool(&output) {
            return Ok(skip);
        }

        match parse_output(&output.stdout, &ctx.root) {
            Some(violations) => {
                if violations.is_empty() && !output.success() {
                    return Ok(INFO.unparseable(&output));
                }
                Ok(INFO.result(violations))
            }
            None if output.success() => Ok(INFO.pass()),
            None => Ok(INFO.unparseable(&output)),
        }
    }
}

impl Tool for Eslint {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }

    fn audit<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        let result = if ctx.find_any(CONFIG_FILES).is_some() {
            INFO.pass()
        } else {
            INFO.result(vec![INFO.violation("ESLint config not found")])
        };
        future::ready(Ok(result)).boxed()
    }
}

/// Parse `eslint --format json`. `None` when stdout is not that JSON.
pub fn parse_output(stdout: &str, root: &Path) -> Option<Vec<Violation>> {
    let reports: Vec<FileReport> = serde_json::from_str(stdout.trim()).ok()?;

    let violations = reports
        .into_iter()
        .flat_map(|report| {
            let file = relative_path(&report.file_path, root);
            report.messages.into_iter().map(move |m| {
                let mut v = INFO
                    .violation(m.message)
                    .file(file.clone())
                    .severity(map_severity(m.severity));
                if let Some(line) = m.line {
                    v = v.at(line, m.column);
                }
                if let Some(rule) = m.rule_id {
                    v = v.code(rule);
                }
                v
            })
        })
        .collect();

    Some(violations)
}

/// ESLint numeric severity: 2 is error, anything lower is a warning.
fn map_severity(severity: u8) -> Severity {
    if severity >= 2 {
        Severity::Error
    } else {
        Severity::Warning
    }
}
