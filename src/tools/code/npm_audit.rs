//! Dependency vulnerability audit via `npm audit` / `pnpm audit`.

use futures::future::{BoxFuture, FutureExt};
use phf::phf_map;
use serde_json::Value;

use crate::check::{CheckResult, Severity, Violation};
use crate::config::NpmAuditConfig;
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "npmaudit",
    name: "npm audit",
    rule: "code.security.npmaudit",
};

/// Advisory severity → violation severity.
static SEVERITIES: phf::Map<&'static str, Severity> = phf_map! {
    "critical" => Severity::Error,
    "high" => Severity::Error,
    "moderate" => Severity::Warning,
    "low" => Severity::Warning,
    "info" => Severity::Warning,
};

pub fn map_severity(severity: &str) -> Severity {
    SEVERITIES
        .get(severity.to_lowercase().as_str())
        .copied()
        .unwrap_or(Severity::Warning)
}

/// Which package manager owns the lockfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Pnpm,
}

impl PackageManager {
    pub fn detect(ctx: &ToolContext) -> Option<Self> {
        if ctx.exists("package-lock.json") {
            Some(PackageManager::Npm)
        } else if ctx.exists("pnpm-lock.yaml") {
            Some(PackageManager::Pnpm)
        } else {
            None
        }
    }

    fn program(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Pnpm => "pnpm",
        }
    }
}

pub struct NpmAudit {
    config: NpmAuditConfig,
}

impl NpmAudit {
    pub fn new(config: NpmAuditConfig) -> Self {
        Self { config }
    }

    fn args(&self, pm: PackageManager) -> Vec<&'static str> {
        let mut args = vec!["audit", "--json"];
        if self.config.exclude_dev {
            args.push(match pm {
                PackageManager::Npm => "--omit=dev",
                PackageManager::Pnpm => "--prod",
            });
        }
        args
    }

    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        let Some(pm) = PackageManager::detect(ctx) else {
            return Ok(INFO.skip("No package-lock.json or pnpm-lock.yaml found"));
        };

        let output = match ctx.exec(pm.program(), &self.args(pm)).await {
            Ok(o) => o,
            Err(e) => return Ok(INFO.exec_failure(e)),
        };

        match parse_output(&output.stdout) {
            Some(violations) if !violations.is_empty() || output.success() => {
                Ok(INFO.result(violations))
            }
            None if output.success() => Ok(INFO.pass()),
            _ => Ok(INFO.unparseable(&output)),
        }
    }
}

impl Tool for NpmAudit {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

/// Parse either npm's `vulnerabilities` map or pnpm's `advisories` map.
pub fn parse_output(stdout: &str) -> Option<Vec<Violation>> {
    let report: Value = serde_json::from_str(stdout.trim()).ok()?;

    if let Some(vulns) = report.get("vulnerabilities").and_then(Value::as_object) {
        return Some(
            vulns
                .iter()
                .map(|(name, vuln)| {
                    let severity = vuln.get("severity").and_then(Value::as_str).unwrap_or("");
                    let title = vuln
                        .get("via")
                        .and_then(Value::as_array)
                        .and_then(|via| via.iter().find_map(|v| v.get("title")?.as_str()))
                        .unwrap_or("vulnerable dependency");
                    let range = vuln.get("range").and_then(Value::as_str).unwrap_or("*");
                    advisory(name, severity, title, range)
                })
                .collect(),
        );
    }

    if let Some(advisories) = report.get("advisories").and_then(Value::as_object) {
        return Some(
            advisories
                .values()
                .map(|adv| {
                    let name = adv.get("module_name").and_then(Value::as_str).unwrap_or("unknown");
                    let severity = adv.get("severity").and_then(Value::as_str).unwrap_or("");
                    let title = adv.get("title").and_then(Value::as_str).unwrap_or("vulnerable dependency");
                    let range = adv
                        .get("vulnerable_versions")
                        .and_then(Value::as_str)
                        .unwrap_or("*");
                    advisory(name, severity, title, range)
                })
                .collect(),
        );
    }

    // `npm audit` on a project without dependencies prints no map at all.
    report.get("metadata").map(|_| Vec::new())
}

fn advisory(name: &str, severity: &str, title: &str, range: &str) -> Violation {
    INFO.violation(format!("{} ({}): {} [{}]", name, range, title, severity))
        .file("package.json")
        .code(name.to_string())
        .severity(map_severity(severity))
}
