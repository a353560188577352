//! Python dependency audit via pip-audit.

use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;

use crate::check::{CheckResult, Severity, Violation};
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "pipaudit",
    name: "pip-audit",
    rule: "code.security.pipaudit",
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Report {
    Wrapped { dependencies: Vec<Dependency> },
    Bare(Vec<Dependency>),
}

#[derive(Debug, Deserialize)]
struct Dependency {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    vulns: Vec<Vuln>,
}

#[derive(Debug, Deserialize)]
struct Vuln {
    id: String,
    #[serde(default)]
    fix_versions: Vec<String>,
}

pub struct PipAudit;

impl PipAudit {
    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        let mut args = vec!["--format", "json", "--progress-spinner", "off"];
        if ctx.exists("requirements.txt") {
            args.extend(["-r", "requirements.txt"]);
        } else if ctx.exists("pyproject.toml") {
            args.push(".");
        } else {
            return Ok(INFO.skip("No requirements.txt or pyproject.toml found"));
        }

        let output = match ctx.exec("pip-audit", &args).await {
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

impl Tool for PipAudit {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

/// A vulnerability with a released fix is an error; one without is a warning.
pub fn parse_output(stdout: &str) -> Option<Vec<Violation>> {
    let report: Report = serde_json::from_str(stdout.trim()).ok()?;
    let dependencies = match report {
        Report::Wrapped { dependencies } => dependencies,
        Report::Bare(dependencies) => dependencies,
    };

    let violations = dependencies
        .into_iter()
        .flat_map(|dep| {
            let version = dep.version.unwrap_or_else(|| "?".to_string());
            let name = dep.name;
            dep.vulns.into_iter().map(move |vuln| {
                let (message, severity) = if vuln.fix_versions.is_empty() {
                    (
                        format!("{} {} is vulnerable ({}), no fix available", name, version, vuln.id),
                        Severity::Warning,
                    )
                } else {
                    (
                        format!(
                            "{} {} is vulnerable ({}), fixed in {}",
                            name,
                            version,
                            vuln.id,
                            vuln.fix_versions.join(", ")
                        ),
                        Severity::Error,
                    )
                };
                INFO.violation(message).code(vuln.id).severity(severity)
            })
        })
        .collect();

    Some(violations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_available_is_error() {
        let json = r#"{"dependencies": [
          {"name": "flask", "version": "0.5", "vulns": [
            {"id": "PYSEC-2019-179", "fix_versions": ["1.0"], "aliases": ["CVE-2019-1010083"], "description": "..."},
            {"id": "GHSA-xxxx", "fix_versions": [], "aliases": []}
          ]},
          {"name": "requests", "version": "2.31.0", "vulns": []}
        ], "fixes": []}"#;
        let violations = parse_output(json).unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].severity, Severity::Error);
        assert!(violations[0].message.contains("fixed in 1.0"));
        assert_eq!(violations[1].severity, Severity::Warning);
        assert_eq!(violations[1].code.as_deref(), Some("GHSA-xxxx"));
    }

    #[test]
    fn test_bare_array_format() {
        let json = r#"[{"name": "jinja2", "version": "2.4", "vulns": [{"id": "PYSEC-1", "fix_versions": ["2.11.3"]}]}]"#;
        assert_eq!(parse_output(json).unwrap().len(), 1);
    }
}
