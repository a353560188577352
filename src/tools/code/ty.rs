//! ty (Astral type checker) adapter.

use futures::future::{BoxFuture, FutureExt};
use lazy_static::lazy_static;
use regex::Regex;

use crate::check::{CheckResult, Severity, Violation};
use crate::files::contains_files_with_extension;
use crate::tools::{strip_ansi, Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "ty",
    name: "ty",
    rule: "code.types.ty",
};

lazy_static! {
    /// `app/main.py:4:5: error[invalid-assignment] Object of type ...`
    static ref CONCISE: Regex =
        Regex::new(r"^(.+?):(\d+):(\d+):\s+(error|warning|info)\[([\w-]+)\]\s+(.+)$").unwrap();
}

pub struct Ty;

impl Ty {
    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        if !contains_files_with_extension(&ctx.root, &["py"]).await? {
            return Ok(INFO.skip("No Python files found"));
        }

        let output = match ctx
            .exec("ty", &["check", "--output-format", "concise"])
            .await
        {
            Ok(o) => o,
            Err(e) => return Ok(INFO.exec_failure(e)),
        };
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

impl Tool for Ty {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

/// Parse concise diagnostics (`file:line:col: level[code] message`).
pub fn parse_output(text: &str) -> Vec<Violation> {
    strip_ansi(text)
        .lines()
        .filter_map(|line| CONCISE.captures(line.trim()))
        .map(|caps| {
            let severity = if &caps[4] == "error" {
                Severity::Error
            } else {
                Severity::Warning
            };
            INFO.violation(caps[6].to_string())
                .file(caps[1].to_string())
                .at(caps[2].parse().unwrap_or(0), caps[3].parse().ok())
                .code(caps[5].to_string())
                .severity(severity)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output() {
        let text = "app/main.py:4:5: error[invalid-assignment] Object of type `str` is not assignable to `int`\napp/util.py:9:1: warning[unused-ignore-comment] Unused blanket `type: ignore` directive\nFound 2 diagnostics\n";
        let violations = parse_output(text);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].code.as_deref(), Some("invalid-assignment"));
        assert_eq!(violations[0].line, Some(4));
        assert_eq!(violations[1].severity, Severity::Warning);
    }
}
