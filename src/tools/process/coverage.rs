//! Coverage threshold policy.
//!
//! `config` mode looks for a threshold in the test runner's configuration,
//! `ci` mode for a workflow step that collects coverage.

use std::path::Path;

use futures::future::{BoxFuture, FutureExt};
use lazy_static::lazy_static;
use regex::Regex;

use crate::check::{CheckResult, Violation};
use crate::config::{CoverageConfig, EnforceIn};
use crate::tools::process::ci::WORKFLOWS_DIR;
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "coverage",
    name: "Coverage",
    rule: "process.coverage",
};

/// Files that may carry a JS threshold (`lines: 80`, `statements: 80`...).
const JS_CONFIGS: &[&str] = &[
    "vitest.config.ts",
    "vitest.config.mts",
    "vitest.config.js",
    "vitest.config.mjs",
    "vite.config.ts",
    "vite.config.js",
    "jest.config.ts",
    "jest.config.js",
    "jest.config.mjs",
    "jest.config.cjs",
    "jest.config.json",
];

/// Files that may carry a Python `fail_under`.
const PY_CONFIGS: &[&str] = &["pyproject.toml", ".coveragerc", "setup.cfg", "tox.ini"];

lazy_static! {
    static ref JS_THRESHOLD: Regex =
        Regex::new(r#"["']?(?:lines|statements|branches|functions)["']?\s*:\s*(\d+(?:\.\d+)?)"#).unwrap();
    static ref FAIL_UNDER: Regex = Regex::new(r"fail_under\s*=\s*(\d+(?:\.\d+)?)").unwrap();
    static ref CI_COVERAGE: Regex = Regex::new(
        r"(?i)--coverage\b|--cov\b|--cov=|coverage run|coverage report|pytest-cov|\bc8\b|\bnyc\b|vitest\b.*\bcoverage\b|cargo (?:llvm-cov|tarpaulin)"
    )
    .unwrap();
}

/// Threshold found in one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub file: String,
    pub value: f64,
}

pub struct Coverage {
    config: CoverageConfig,
}

impl Coverage {
    pub fn new(config: CoverageConfig) -> Self {
        Self { config }
    }

    fn evaluate(&self, root: &Path) -> CheckResult {
        let mut violations = Vec::new();
        if matches!(self.config.enforce_in, EnforceIn::Config | EnforceIn::Both) {
            violations.extend(check_config(root, self.config.min_threshold));
        }
        if matches!(self.config.enforce_in, EnforceIn::Ci | EnforceIn::Both) {
            match check_ci(root) {
                Some(v) => violations.extend(v),
                None if self.config.enforce_in == EnforceIn::Ci => {
                    return INFO.skip("No CI workflows found");
                }
                None => {}
            }
        }
        INFO.result(violations)
    }
}

impl Tool for Coverage {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        futures::future::ready(Ok(self.evaluate(&ctx.root))).boxed()
    }

    fn audit<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.run(ctx)
    }
}

/// Lowest threshold declared in each known config file.
pub fn find_thresholds(root: &Path) -> Vec<Threshold> {
    let mut found = Vec::new();

    for (files, re) in [(JS_CONFIGS, &*JS_THRESHOLD), (PY_CONFIGS, &*FAIL_UNDER)] {
        for file in files {
            let Ok(text) = std::fs::read_to_string(root.join(file)) else {
                continue;
            };
            let lowest = re
                .captures_iter(&text)
                .filter_map(|c| c[1].parse::<f64>().ok())
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));
            if let Some(value) = lowest {
                found.push(Threshold {
                    file: file.to_string(),
                    value,
                });
            }
        }
    }

    if let Some(value) = package_json_threshold(root) {
        found.push(Threshold {
            file: "package.json".to_string(),
            value,
        });
    }

    found
}

/// `jest.coverageThreshold.global` in package.json.
fn package_json_threshold(root: &Path) -> Option<f64> {
    let text = std::fs::read_to_string(root.join("package.json")).ok()?;
    let pkg: serde_json::Value = serde_json::from_str(&text).ok()?;
    let global = pkg.get("jest")?.get("coverageThreshold")?.get("global")?;
    global
        .as_object()?
        .values()
        .filter_map(serde_json::Value::as_f64)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
}

pub fn check_config(root: &Path, min: Option<f64>) -> Vec<Violation> {
    let thresholds = find_thresholds(root);
    if thresholds.is_empty() {
        return vec![INFO.violation("No coverage threshold configured")];
    }

    let Some(min) = min else {
        return Vec::new();
    };
    thresholds
        .into_iter()
        .filter(|t| t.value < min)
        .map(|t| {
            INFO.violation(format!(
                "Coverage threshold {}% is below required {}%",
                t.value, min
            ))
            .file(t.file)
        })
        .collect()
}

/// `None` when the repository has no workflows at all.
pub fn check_ci(root: &Path) -> Option<Vec<Violation>> {
    let entries = std::fs::read_dir(root.join(WORKFLOWS_DIR)).ok()?;
    let mut any = false;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "yml" || e == "yaml")
            .unwrap_or(false);
        if !is_yaml {
            continue;
        }
        any = true;
        if let Ok(text) = std::fs::read_to_string(&path) {
            if CI_COVERAGE.is_match(&text) {
                return Some(Vec::new());
            }
        }
    }

    if !any {
        return None;
    }
    Some(vec![INFO
        .violation("No CI workflow collects test coverage")
        .file(WORKFLOWS_DIR)])
}
