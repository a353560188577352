//! Vulture adapter (dead Python code).

use futures::future::{BoxFuture, FutureExt};
use lazy_static::lazy_static;
use regex::Regex;

use crate::check::{CheckResult, Severity, Violation};
use crate::config::VultureConfig;
use crate::files::contains_files_with_extension;
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "vulture",
    name: "Vulture",
    rule: "code.unused.vulture",
};

/// Vulture exits with 3 when it found dead code.
const EXIT_DEAD_CODE: i32 = 3;

lazy_static! {
    /// `app/models.py:12: unused function 'helper' (60% confidence)`
    static ref FINDING: Regex =
        Regex::new(r"^(.+?):(\d+):\s+(.+?)\s+\((\d+)% confidence(?:, \d+ lines?)?\)$").unwrap();
}

pub struct Vulture {
    config: VultureConfig,
}

impl Vulture {
    pub fn new(config: VultureConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        if !contains_files_with_extension(&ctx.root, &["py"]).await? {
            return Ok(INFO.skip("No Python files found"));
        }

        let confidence = self.config.min_confidence.to_string();
        let args = [
            ".",
            "--min-confidence",
            confidence.as_str(),
            "--exclude",
            ".venv,venv,node_modules,build,dist",
        ];
        let output = match ctx.exec("vulture", &args).await {
            Ok(o) => o,
            Err(e) => return Ok(INFO.exec_failure(e)),
        };
        if output.success() {
            return Ok(INFO.pass());
        }

        let violations = parse_output(&output.stdout);
        if output.code == Some(EXIT_DEAD_CODE) && !violations.is_empty() {
            Ok(INFO.result(violations))
        } else {
            Ok(INFO.unparseable(&output))
        }
    }
}

impl Tool for Vulture {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

pub fn parse_output(stdout: &str) -> Vec<Violation> {
    stdout
        .lines()
        .filter_map(|line| FINDING.captures(line.trim()))
        .map(|caps| {
            let file = caps[1].trim_start_matches("./").to_string();
            INFO.violation(format!("{} ({}% confidence)", &caps[3], &caps[4]))
                .file(file)
                .at(caps[2].parse().unwrap_or(0), None)
                .severity(Severity::Warning)
        })
        .collect()
}
