//! GitHub Actions workflow policy.

use std::collections::BTreeSet;
use std::path::Path;

use futures::future::{BoxFuture, FutureExt};
use serde_yaml::Value;

use crate::check::{CheckResult, Violation};
use crate::config::CiConfig;
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "ci",
    name: "CI",
    rule: "process.ci",
};

pub const WORKFLOWS_DIR: &str = ".github/workflows";

pub struct Ci {
    config: CiConfig,
}

impl Ci {
    pub fn new(config: CiConfig) -> Self {
        Self { config }
    }
}

impl Tool for Ci {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        let result = INFO.result(check_workflows(&ctx.root, &self.config));
        futures::future::ready(Ok(result)).boxed()
    }

    fn audit<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.run(ctx)
    }
}

/// Every workflow name the config mentions, in order.
fn referenced_workflows(config: &CiConfig) -> BTreeSet<&str> {
    config
        .require_workflows
        .iter()
        .map(String::as_str)
        .chain(config.jobs.keys().map(String::as_str))
        .chain(config.actions.keys().map(String::as_str))
        .chain(config.commands.keys().map(String::as_str))
        .collect()
}

pub fn check_workflows(root: &Path, config: &CiConfig) -> Vec<Violation> {
    let mut violations = Vec::new();

    for workflow in referenced_workflows(config) {
        let path = format!("{}/{}", WORKFLOWS_DIR, workflow);
        let text = match std::fs::read_to_string(root.join(&path)) {
            Ok(t) => t,
            Err(_) => {
                violations.push(
                    INFO.violation(format!("Required workflow \"{}\" not found", workflow))
                        .file(path),
                );
                continue;
            }
        };
        let doc: Value = match serde_yaml::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                violations.push(
                    INFO.violation(format!("Workflow \"{}\" is not valid YAML: {}", workflow, e))
                        .file(path),
                );
                continue;
            }
        };

        let jobs = job_names(&doc);
        for job in config.jobs.get(workflow).into_iter().flatten() {
            if !jobs.contains(job.as_str()) {
                violations.push(
                    INFO.violation(format!(
                        "Workflow \"{}\" is missing required job \"{}\"",
                        workflow, job
                    ))
                    .file(path.clone()),
                );
            }
        }

        let uses = action_refs(&doc);
        for action in config.actions.get(workflow).into_iter().flatten() {
            if !uses.iter().any(|u| u.starts_with(action.as_str())) {
                violations.push(
                    INFO.violation(format!(
                        "Workflow \"{}\" does not use action \"{}\"",
                        workflow, action
                    ))
                    .file(path.clone()),
                );
            }
        }

        let scripts = run_scripts(&doc);
        for command in config.commands.get(workflow).into_iter().flatten() {
            if !scripts.iter().any(|s| s.contains(command.as_str())) {
                violations.push(
                    INFO.violation(format!(
                        "Workflow \"{}\" does not run \"{}\"",
                        workflow, command
                    ))
                    .file(path.clone()),
                );
            }
        }
    }

    violations
}

fn jobs(doc: &Value) -> impl Iterator<Item = (&Value, &Value)> {
    doc.get("jobs")
        .and_then(Value::as_mapping)
        .into_iter()
        .flat_map(|m| m.iter())
}

fn job_names(doc: &Value) -> BTreeSet<&str> {
    jobs(doc).filter_map(|(k, _)| k.as_str()).collect()
}

fn steps(doc: &Value) -> impl Iterator<Item = &Value> {
    jobs(doc)
        .filter_map(|(_, job)| job.get("steps").and_then(Value::as_sequence))
        .flatten()
}

/// `uses:` of every step plus reusable-workflow jobs.
fn action_refs(doc: &Value) -> Vec<&str> {
    let job_uses = jobs(doc).filter_map(|(_, job)| job.get("uses").and_then(Value::as_str));
    let step_uses = steps(doc).filter_map(|s| s.get("uses").and_then(Value::as_str));
    job_uses.chain(step_uses).collect()
}

/// `run:` scripts of every step.
pub fn run_scripts(doc: &Value) -> Vec<&str> {
    steps(doc)
        .filter_map(|s| s.get("run").and_then(Value::as_str))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WORKFLOW: &str = r#"
name: CI
on: [push, pull_request]
jobs:
  lint:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - uses: actions/setup-node@v4
        with:
          node-version: 20
      - run: npm ci
      - run: |
          npm run lint
          npm test -- --coverage
  release:
    uses: acme/workflows/.github/workflows/release.yml@main
"#;

    fn write_workflow(root: &Path) {
        let dir = root.join(WORKFLOWS_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("ci.yml"), WORKFLOW).unwrap();
    }

    #[test]
    fn test_missing_workflow() {
        let temp = TempDir::new().unwrap();
        let config = CiConfig {
            enabled: true,
            require_workflows: vec!["ci.yml".to_string()],
            ..CiConfig::default()
        };
        let violations = check_workflows(temp.path(), &config);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "Required workflow \"ci.yml\" not found");
    }

    #[test]
    fn test_jobs_actions_commands() {
        let temp = TempDir::new().unwrap();
        write_workflow(temp.path());

        let mut config = CiConfig {
            enabled: true,
            require_workflows: vec!["ci.yml".to_string()],
            ..CiConfig::default()
        };
        config
            .jobs
            .insert("ci.yml".to_string(), vec!["lint".to_string(), "test".to_string()]);
        config.actions.insert(
            "ci.yml".to_string(),
            vec!["actions/checkout".to_string(), "acme/workflows".to_string()],
        );
        config
            .commands
            .insert("ci.yml".to_string(), vec!["npm run lint".to_string(), "npm audit".to_string()]);

        let violations = check_workflows(temp.path(), &config);
        let messages: Vec<&str> = violations.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Workflow \"ci.yml\" is missing required job \"test\"",
                "Workflow \"ci.yml\" does not run \"npm audit\"",
            ]
        );
    }
}
