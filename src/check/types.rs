//! Core types for check results.

use serde::{Serialize, Serializer};
use std::time::Duration;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_VIOLATIONS: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;
pub const EXIT_RUNTIME_ERROR: i32 = 3;

/// Severity levels for violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// The three groups of checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Code,
    Process,
    Infra,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Code, Domain::Process, Domain::Infra];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Code => "code",
            Domain::Process => "process",
            Domain::Infra => "infra",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Config path of the check that produced it, e.g. `code.linting.eslint`
    pub rule: String,
    /// Tool identifier, e.g. `eslint`
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub message: String,
    /// Tool-native code such as `no-var`, `E501` or `TS2322`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub severity: Severity,
}

impl Violation {
    pub fn new(rule: &str, tool: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            tool: tool.to_string(),
            file: None,
            line: None,
            column: None,
            message: message.into(),
            code: None,
            severity: Severity::Error,
        }
    }

    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at(mut self, line: u32, column: Option<u32>) -> Self {
        self.line = Some(line);
        self.column = column;
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// `file:line:col` with missing parts omitted.
    pub fn location(&self) -> Option<String> {
        let file = self.file.as_ref()?;
        Some(match (self.line, self.column) {
            (Some(l), Some(c)) => format!("{}:{}:{}", file, l, c),
            (Some(l), None) => format!("{}:{}", file, l),
            _ => file.clone(),
        })
    }
}

/// Outcome of running one adapter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub name: String,
    pub rule: String,
    pub passed: bool,
    pub violations: Vec<Violation>,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Wall time in milliseconds
    pub duration: u64,
}

impl CheckResult {
    /// Passed iff there are no violations.
    pub fn from_violations(name: &str, rule: &str, violations: Vec<Violation>) -> Self {
        Self {
            name: name.to_string(),
            rule: rule.to_string(),
            passed: violations.is_empty(),
            violations,
            skipped: false,
            skip_reason: None,
            duration: 0,
        }
    }

    pub fn skip(name: &str, rule: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            rule: rule.to_string(),
            passed: true,
            violations: Vec::new(),
            skipped: true,
            skip_reason: Some(reason.into()),
            duration: 0,
        }
    }

    /// A failed result carrying one synthetic error violation.
    pub fn error(name: &str, rule: &str, tool: &str, message: impl Into<String>) -> Self {
        Self::from_violations(name, rule, vec![Violation::new(rule, tool, message)])
    }

    pub fn with_duration(self, duration: Duration) -> Self {
        Self {
            duration: duration.as_millis() as u64,
            ..self
        }
    }

    pub fn failed(&self) -> bool {
        !self.skipped && !self.passed
    }
}

/// Aggregate status of one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    Pass,
    Fail,
    Skip,
}

impl std::fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainStatus::Pass => write!(f, "pass"),
            DomainStatus::Fail => write!(f, "fail"),
            DomainStatus::Skip => write!(f, "skip"),
        }
    }
}

/// Aggregation of the checks that ran for one domain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainResult {
    #[serde(skip)]
    pub domain: Domain,
    pub status: DomainStatus,
    pub violation_count: usize,
    pub checks: Vec<CheckResult>,
}

impl DomainResult {
    /// Skips never count as failures; a domain with no checks at all is skipped.
    pub fn from_checks(domain: Domain, checks: Vec<CheckResult>) -> Self {
        let violation_count = checks.iter().map(|c| c.violations.len()).sum();
        let status = if checks.is_empty() {
            DomainStatus::Skip
        } else if checks.iter().any(CheckResult::failed) {
            DomainStatus::Fail
        } else {
            DomainStatus::Pass
        };

        Self {
            domain,
            status,
            violation_count,
            checks,
        }
    }
}

/// Totals for the whole run.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_violations: usize,
    pub exit_code: i32,
}

/// Top-level report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullResult {
    pub version: String,
    pub config_path: String,
    #[serde(serialize_with = "domains_as_map")]
    pub domains: Vec<DomainResult>,
    pub summary: Summary,
}

impl FullResult {
    pub fn new(config_path: impl Into<String>, domains: Vec<DomainResult>) -> Self {
        let total_violations = domains.iter().map(|d| d.violation_count).sum();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config_path: config_path.into(),
            domains,
            summary: Summary {
                total_violations,
                exit_code: exit_code_for(total_violations),
            },
        }
    }

    pub fn domain(&self, domain: Domain) -> Option<&DomainResult> {
        self.domains.iter().find(|d| d.domain == domain)
    }

    pub fn exit_code(&self) -> i32 {
        self.summary.exit_code
    }
}

/// Exit code from the violation count alone.
pub fn exit_code_for(total_violations: usize) -> i32 {
    if total_violations == 0 {
        EXIT_SUCCESS
    } else {
        EXIT_VIOLATIONS
    }
}

fn domains_as_map<S: Serializer>(domains: &[DomainResult], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(domains.iter().map(|d| (d.domain.as_str(), d)))
}
