//! Git hook policy (husky).

use std::path::Path;

use futures::future::{BoxFuture, FutureExt};

use crate::check::{CheckResult, Violation};
use crate::config::HooksConfig;
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "hooks",
    name: "Hooks",
    rule: "process.hooks",
};

const HUSKY_DIR: &str = ".husky";

pub struct Hooks {
    config: HooksConfig,
}

impl Hooks {
    pub fn new(config: HooksConfig) -> Self {
        Self { config }
    }
}

impl Tool for Hooks {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        let result = INFO.result(check_hooks(&ctx.root, &self.config));
        futures::future::ready(Ok(result)).boxed()
    }

    fn audit<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.run(ctx)
    }
}

pub fn check_hooks(root: &Path, config: &HooksConfig) -> Vec<Violation> {
    let husky = root.join(HUSKY_DIR);
    if !husky.is_dir() {
        if config.require_husky {
            return vec![INFO.violation("Husky not installed").file(HUSKY_DIR)];
        }
        if config.require_hooks.is_empty() && config.commands.is_empty() {
            return Vec::new();
        }
    }

    let mut violations = Vec::new();

    for hook in &config.require_hooks {
        if !husky.join(hook).is_file() {
            violations.push(
                INFO.violation(format!("Required hook \"{}\" not found", hook))
                    .file(format!("{}/{}", HUSKY_DIR, hook)),
            );
        }
    }

    for (hook, commands) in &config.commands {
        let path = format!("{}/{}", HUSKY_DIR, hook);
        let Ok(script) = std::fs::read_to_string(root.join(&path)) else {
            if !config.require_hooks.contains(hook) {
                violations.push(
                    INFO.violation(format!("Required hook \"{}\" not found", hook))
                        .file(path),
                );
            }
            continue;
        };
        for command in commands {
            if !script_runs(&script, command) {
                violations.push(
                    INFO.violation(format!(
                        "Hook \"{}\" does not run \"{}\"",
                        hook, command
                    ))
                    .file(path.clone()),
                );
            }
        }
    }

    violations
}

/// Whether a non-comment line of the script contains `command`.
fn script_runs(script: &str, command: &str) -> bool {
    script
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .any(|line| line.contains(command))
}
