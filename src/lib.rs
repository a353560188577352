//! healthgate - unified project health checks.
//!
//! healthgate reads a declarative `check.toml`, runs the external tools it
//! enables (linters, type checkers, security scanners, workflow and
//! repository policies) and folds their native output into one report
//! with a single exit code. It never reimplements the tools themselves.
//!
//! # Architecture
//!
//! - `config`: `check.toml` loading, registry inheritance and validation
//! - `tools`: one adapter per external tool, grouped by domain
//! - `check`: result model, the adapter table and the domain runner
//! - `monorepo`: sub-project detection and per-project runs
//! - `report`: output formatting (text, JSON)
//! - `schema`: machine-readable description of the config schema
//! - `cli`: command tree and command runners
//!
//! # Adding a New Check
//!
//! Write an adapter under `src/tools/<domain>/` implementing [`tools::Tool`],
//! give it an options struct in `config::schema`, and add a row to
//! `check::registry::TOOLS`.

pub mod check;
pub mod cli;
pub mod config;
pub mod files;
pub mod monorepo;
pub mod report;
pub mod schema;
pub mod tools;

pub use check::{CheckResult, DomainResult, DomainStatus, FullResult, Severity, Violation};
pub use config::{Config, ConfigError, LoadedConfig};
pub use monorepo::{DetectedProject, MonorepoResult};
pub use tools::{Tool, ToolContext, ToolInfo};
