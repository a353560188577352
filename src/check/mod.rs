//! Result model, adapter table and the domain runner.

pub mod registry;
pub mod runner;
pub mod types;

pub use runner::{DomainRunner, Mode};
pub use types::*;

use crate::config::LoadedConfig;

/// Run `domains` for one loaded project and build the report.
pub async fn run_project(loaded: &LoadedConfig, domains: &[Domain], mode: Mode) -> FullResult {
    let runner = DomainRunner::new(&loaded.config, &loaded.root);
    let results = runner.run(domains, mode).await;
    FullResult::new(loaded.path.display().to_string(), results)
}
