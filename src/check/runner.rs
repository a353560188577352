//! Domain runner: bounded concurrent execution with per-adapter isolation.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::check::{registry, CheckResult, Domain, DomainResult};
use crate::config::Config;
use crate::tools::{Tool, ToolContext};

/// Execute the tools, or only verify their static configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Check,
    Audit,
}

/// Runs the enabled adapters of a domain against one project root.
pub struct DomainRunner<'a> {
    config: &'a Config,
    ctx: ToolContext,
    concurrency: usize,
}

impl<'a> DomainRunner<'a> {
    pub fn new<P: AsRef<Path>>(config: &'a Config, root: P) -> Self {
        let concurrency = config.settings.concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });
        let ctx = ToolContext::for_config(root, config);

        Self {
            config,
            ctx,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run_domain(&self, domain: Domain, mode: Mode) -> DomainResult {
        let tools = registry::select(self.config, domain);
        info!(%domain, tools = tools.len(), ?mode, "running domain");
        let checks = run_tools(tools, &self.ctx, mode, self.concurrency).await;
        DomainResult::from_checks(domain, checks)
    }

    /// Domains run one after another; adapters within a domain run concurrently.
    pub async fn run(&self, domains: &[Domain], mode: Mode) -> Vec<DomainResult> {
        let mut results = Vec::with_capacity(domains.len());
        for domain in domains {
            results.push(self.run_domain(*domain, mode).await);
        }
        results
    }
}

/// Run every tool with at most `concurrency` in flight. Results keep the
/// order of `tools` and every tool yields exactly one result.
pub async fn run_tools(
    tools: Vec<Box<dyn Tool>>,
    ctx: &ToolContext,
    mode: Mode,
    concurrency: usize,
) -> Vec<CheckResult> {
    stream::iter(tools)
        .map(|tool| run_isolated(tool, ctx, mode))
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// An adapter error or panic becomes a failed result for that adapter only.
async fn run_isolated(tool: Box<dyn Tool>, ctx: &ToolContext, mode: Mode) -> CheckResult {
    let info = tool.info();
    let start = Instant::now();

    let fut = match mode {
        Mode::Check => tool.run(ctx),
        Mode::Audit => tool.audit(ctx),
    };
    let result = match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(tool = info.id, error = %e, "check failed");
            info.error(format!("{:#}", e))
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            warn!(tool = info.id, %message, "check panicked");
            info.error(format!("{} crashed: {}", info.name, message))
        }
    };

    debug!(
        tool = info.id,
        passed = result.passed,
        skipped = result.skipped,
        violations = result.violations.len(),
        "check finished"
    );
    result.with_duration(start.elapsed())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{DomainStatus, Violation};
    use crate::tools::ToolInfo;
    use futures::future::{self, BoxFuture};

    enum Behavior {
        Pass,
        Fail,
        Skip,
        Error,
        Panic,
        Sleep(u64),
    }

    struct Fake {
        info: ToolInfo,
        behavior: Behavior,
    }

    fn fake(id: &'static str, behavior: Behavior) -> Box<dyn Tool> {
        Box::new(Fake {
            info: ToolInfo {
                id,
                name: id,
                rule: "code.fake",
            },
            behavior,
        })
    }

    fn explode(id: &str) -> anyhow::Result<CheckResult> {
        panic!("adapter bug in {}", id)
    }

    impl Tool for Fake {
        fn info(&self) -> ToolInfo {
            self.info
        }

        fn run<'a>(&'a self, _ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
            let info = self.info;
            match self.behavior {
                Behavior::Pass => future::ready(Ok(info.pass())).boxed(),
                Behavior::Fail => {
                    future::ready(Ok(info.result(vec![Violation::new(info.rule, info.id, "bad")])))
                        .boxed()
                }
                Behavior::Skip => future::ready(Ok(info.skip("not installed"))).boxed(),
                Behavior::Error => future::ready(Err(anyhow::anyhow!("boom"))).boxed(),
                Behavior::Panic => async move { explode(info.id) }.boxed(),
                Behavior::Sleep(ms) => async move {
                    tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                    Ok(info.pass())
                }
                .boxed(),
            }
        }
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let ctx = ToolContext::new(".");
        let tools = vec![
            fake("a", Behavior::Pass),
            fake("b", Behavior::Error),
            fake("c", Behavior::Panic),
            fake("d", Behavior::Skip),
            fake("e", Behavior::Fail),
        ];
        let results = run_tools(tools, &ctx, Mode::Check, 4).await;

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
        assert!(results[0].passed);
        assert!(!results[1].passed);
        assert_eq!(results[1].violations[0].message, "boom");
        assert!(!results[2].passed);
        assert!(results[2].violations[0].message.contains("adapter bug in c"));
        assert!(results[3].skipped);
        assert_eq!(results[4].violations.len(), 1);

        let domain = DomainResult::from_checks(Domain::Code, results);
        assert_eq!(domain.status, DomainStatus::Fail);
        assert_eq!(domain.violation_count, 3);
    }

    #[tokio::test]
    async fn test_order_kept_under_concurrency() {
        let ctx = ToolContext::new(".");
        let tools = vec![
            fake("slow", Behavior::Sleep(50)),
            fake("fast", Behavior::Sleep(1)),
            fake("mid", Behavior::Sleep(10)),
        ];
        let results = run_tools(tools, &ctx, Mode::Check, 3).await;
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast", "mid"]);
        assert!(results[0].duration >= 50);
    }

    #[tokio::test]
    async fn test_audit_uses_default_pass() {
        let ctx = ToolContext::new(".");
        let results = run_tools(vec![fake("x", Behavior::Fail)], &ctx, Mode::Audit, 1).await;
        assert!(results[0].passed);
    }

    #[tokio::test]
    async fn test_empty_domain_is_skipped() {
        let config = Config::default();
        let runner = DomainRunner::new(&config, ".");
        let result = runner.run_domain(Domain::Infra, Mode::Check).await;
        assert_eq!(result.status, DomainStatus::Skip);
    }
}
