//! Process adapters: hooks, CI, branch and commit conventions, pull
//! requests, coverage policy, repository settings and backups.

pub mod backups;
pub mod branches;
pub mod ci;
pub mod commits;
pub mod coverage;
pub mod git;
pub mod github;
pub mod hooks;
pub mod pr;
pub mod repo;
pub mod tickets;

pub use backups::Backups;
pub use branches::Branches;
pub use ci::Ci;
pub use commits::Commits;
pub use coverage::Coverage;
pub use hooks::Hooks;
pub use pr::Pr;
pub use repo::Repo;
pub use tickets::Tickets;
