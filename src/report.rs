//! Output formatting for healthgate results.
//!
//! Supports two output formats:
//! - Text: colored terminal output for human readability
//! - JSON: the result structs serialized verbatim for programmatic consumption

use std::fmt::Write;

use colored::*;
use serde::Serialize;

use crate::check::{CheckResult, DomainResult, DomainStatus, FullResult, Severity};
use crate::monorepo::{DetectedProject, MonorepoResult};

/// Violations listed per failing check before eliding the rest.
pub const MAX_VIOLATIONS_SHOWN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print any serializable result as pretty JSON on stdout.
pub fn write_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn write_full(result: &FullResult, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => write_json(result),
        OutputFormat::Text => {
            print!("{}", render_text(result));
            Ok(())
        }
    }
}

pub fn write_monorepo(result: &MonorepoResult, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => write_json(result),
        OutputFormat::Text => {
            print!("{}", render_monorepo(result));
            Ok(())
        }
    }
}

pub fn write_projects(projects: &[DetectedProject], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => write_json(&projects),
        OutputFormat::Text => {
            print!("{}", render_projects(projects));
            Ok(())
        }
    }
}

// =============================================================================
// Text Format
// =============================================================================

fn status_icon(status: DomainStatus) -> ColoredString {
    match status {
        DomainStatus::Pass => "✓".green(),
        DomainStatus::Fail => "✗".red(),
        DomainStatus::Skip => "○".dimmed(),
    }
}

fn check_icon(check: &CheckResult) -> ColoredString {
    if check.skipped {
        "○".dimmed()
    } else if check.passed {
        "✓".green()
    } else {
        "✗".red()
    }
}

fn check_outcome(check: &CheckResult) -> String {
    if check.skipped {
        match &check.skip_reason {
            Some(reason) => format!("skipped ({})", reason),
            None => "skipped".to_string(),
        }
    } else if check.passed {
        "passed".to_string()
    } else {
        let n = check.violations.len();
        format!("{} violation{}", n, if n == 1 { "" } else { "s" })
    }
}

/// Render the whole report as colored text.
pub fn render_text(result: &FullResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "  {} v{}", "healthgate".cyan().bold(), result.version);
    let _ = writeln!(out, "  {}{}", "Config: ".dimmed(), result.config_path);
    let _ = writeln!(out);

    for domain in &result.domains {
        render_domain(&mut out, domain);
        let _ = writeln!(out);
    }

    let total = result.summary.total_violations;
    if total == 0 {
        let _ = writeln!(out, "  {}", "✓ All checks passed".green().bold());
    } else {
        let _ = writeln!(
            out,
            "  {}",
            format!(
                "✗ {} violation{} found",
                total,
                if total == 1 { "" } else { "s" }
            )
            .red()
            .bold()
        );
    }
    out
}

fn render_domain(out: &mut String, domain: &DomainResult) {
    let _ = writeln!(
        out,
        "  {} {}",
        status_icon(domain.status),
        domain.domain.as_str().to_uppercase().bold()
    );
    if domain.checks.is_empty() {
        let _ = writeln!(out, "    {}", "No checks enabled".dimmed());
        return;
    }

    for check in &domain.checks {
        let _ = writeln!(
            out,
            "    {} {:<18} {} {}",
            check_icon(check),
            check.name,
            check_outcome(check),
            format!("({}ms)", check.duration).dimmed()
        );
        if !check.failed() {
            continue;
        }
        for v in check.violations.iter().take(MAX_VIOLATIONS_SHOWN) {
            let tag = match v.severity {
                Severity::Error => "error".red(),
                Severity::Warning => "warn ".yellow(),
            };
            let mut line = format!("        {} ", tag);
            if let Some(location) = v.location() {
                let _ = write!(line, "{} ", location.blue());
            }
            line.push_str(&v.message);
            if let Some(code) = &v.code {
                let _ = write!(line, " {}", format!("[{}]", code).dimmed());
            }
            let _ = writeln!(out, "{}", line);
        }
        if check.violations.len() > MAX_VIOLATIONS_SHOWN {
            let _ = writeln!(
                out,
                "        {}",
                format!("... and {} more", check.violations.len() - MAX_VIOLATIONS_SHOWN).dimmed()
            );
        }
    }
}

pub fn render_monorepo(result: &MonorepoResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "  {} {}", "healthgate".cyan().bold(), "monorepo".dimmed());
    let _ = writeln!(out, "  {}{}", "Root: ".dimmed(), result.root);
    let _ = writeln!(out);

    for project in &result.projects {
        let (icon, outcome) = if let Some(error) = &project.error {
            ("✗".red(), format!("error: {}", error))
        } else if let Some(full) = &project.result {
            let n = full.summary.total_violations;
            if n == 0 {
                ("✓".green(), "passed".to_string())
            } else {
                ("✗".red(), format!("{} violation{}", n, if n == 1 { "" } else { "s" }))
            }
        } else {
            ("○".dimmed(), format!("skipped (no {})", crate::config::CONFIG_FILE_NAME))
        };
        let _ = writeln!(
            out,
            "  {} {:<30} {:<11} {}",
            icon, project.path, project.project_type.to_string().dimmed(), outcome
        );
    }

    let s = &result.summary;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {} projects: {} passed, {} failed, {} errored, {} skipped",
        s.total, s.passed, s.failed, s.errored, s.skipped
    );
    let line = if s.exit_code == 0 {
        "✓ All projects passed".green().bold()
    } else {
        "✗ Some projects failed".red().bold()
    };
    let _ = writeln!(out, "  {}", line);
    out
}

pub fn render_projects(projects: &[DetectedProject]) -> String {
    let mut out = String::new();
    if projects.is_empty() {
        let _ = writeln!(out, "No projects detected");
        return out;
    }
    for p in projects {
        let config = if p.has_check_toml {
            crate::config::CONFIG_FILE_NAME.green()
        } else {
            "no config".yellow()
        };
        let _ = writeln!(
            out,
            "{:<30} {:<11} {:<15} {}",
            p.path,
            p.project_type.to_string(),
            p.marker_file.dimmed(),
            config
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{Domain, Violation};

    fn plain() {
        colored::control::set_override(false);
    }

    fn eslint_with(n: usize) -> CheckResult {
        let violations = (0..n)
            .map(|i| {
                Violation::new("code.linting.eslint", "eslint", "Unexpected var")
                    .file("src/a.js")
                    .at(i as u32 + 1, Some(1))
                    .code("no-var")
            })
            .collect();
        CheckResult::from_violations("ESLint", "code.linting.eslint", violations)
    }

    #[test]
    fn test_elides_after_ten_violations() {
        plain();
        let result = FullResult::new(
            "check.toml",
            vec![DomainResult::from_checks(Domain::Code, vec![eslint_with(13)])],
        );
        let text = render_text(&result);
        assert!(text.contains("✗ CODE"));
        assert!(text.contains("13 violations"));
        assert!(text.contains("src/a.js:10:1 Unexpected var [no-var]"));
        assert!(!text.contains("src/a.js:11:1"));
        assert!(text.contains("... and 3 more"));
        assert!(text.contains("✗ 13 violations found"));
    }

    #[test]
    fn test_passing_and_skipped() {
        plain();
        let result = FullResult::new(
            "check.toml",
            vec![
                DomainResult::from_checks(
                    Domain::Code,
                    vec![
                        eslint_with(0),
                        CheckResult::skip("Ruff", "code.linting.ruff", "No Python files"),
                    ],
                ),
                DomainResult::from_checks(Domain::Infra, vec![]),
            ],
        );
        let text = render_text(&result);
        assert!(text.contains("✓ CODE"));
        assert!(text.contains("skipped (No Python files)"));
        assert!(text.contains("○ INFRA"));
        assert!(text.contains("No checks enabled"));
        assert!(text.contains("✓ All checks passed"));
    }
}
