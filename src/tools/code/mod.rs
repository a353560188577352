//! Code-quality adapters: linters, formatters, type checkers, dead code,
//! security scanners and repository-local conventions.

pub mod disable_comments;
pub mod eslint;
pub mod gitleaks;
pub mod knip;
pub mod naming;
pub mod npm_audit;
pub mod pip_audit;
pub mod prettier;
pub mod ruff;
pub mod tsc;
pub mod ty;
pub mod vulture;

pub use disable_comments::DisableComments;
pub use eslint::Eslint;
pub use gitleaks::Gitleaks;
pub use knip::Knip;
pub use naming::Naming;
pub use npm_audit::NpmAudit;
pub use pip_audit::PipAudit;
pub use prettier::Prettier;
pub use ruff::{Ruff, RuffFormat};
pub use tests::Tests;
pub use tsc::Tsc;
pub use ty::Ty;
pub use vulture::Vulture;
