//! The adapter table.
//!
//! One row per adapter: identity, domain, the predicate over the loaded
//! config that enables it, and a constructor that takes its slice of the
//! config. Rows are listed in report order.

use crate::check::Domain;
use crate::config::Config;
use crate::tools::{code, infra, process, Tool, ToolInfo};

pub struct ToolEntry {
    pub info: ToolInfo,
    pub domain: Domain,
    pub enabled: fn(&Config) -> bool,
    pub build: fn(&Config) -> Box<dyn Tool>,
}

pub static TOOLS: &[ToolEntry] = &[
    // code
    ToolEntry {
        info: code::eslint::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.linting.eslint.enabled,
        build: |c| Box::new(code::Eslint::new(c.code.linting.eslint.clone())),
    },
    ToolEntry {
        info: code::ruff::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.linting.ruff.enabled,
        build: |c| Box::new(code::Ruff::new(c.code.linting.ruff.clone())),
    },
    ToolEntry {
        info: code::ruff::FORMAT_INFO,
        domain: Domain::Code,
        enabled: |c| c.code.linting.ruff.enabled && c.code.linting.ruff.format,
        build: |_| Box::new(code::RuffFormat),
    },
    ToolEntry {
        info: code::prettier::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.formatting.prettier.enabled,
        build: |_| Box::new(code::Prettier),
    },
    ToolEntry {
        info: code::tsc::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.types.tsc.enabled,
        build: |c| Box::new(code::Tsc::new(c.code.types.tsc.clone())),
    },
    ToolEntry {
        info: code::ty::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.types.ty.enabled,
        build: |_| Box::new(code::Ty),
    },
    ToolEntry {
        info: code::knip::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.unused.knip.enabled,
        build: |_| Box::new(code::Knip),
    },
    ToolEntry {
        info: code::vulture::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.unused.vulture.enabled,
        build: |c| Box::new(code::Vulture::new(c.code.unused.vulture.clone())),
    },
    ToolEntry {
        info: code::gitleaks::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.security.secrets.enabled,
        build: |_| Box::new(code::Gitleaks),
    },
    ToolEntry {
        info: code::npm_audit::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.security.npmaudit.enabled,
        build: |c| Box::new(code::NpmAudit::new(c.code.security.npmaudit.clone())),
    },
    ToolEntry {
        info: code::pip_audit::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.security.pipaudit.enabled,
        build: |_| Box::new(code::PipAudit),
    },
    ToolEntry {
        info: code::tests::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.tests.enabled,
        build: |c| Box::new(code::Tests::new(c.code.tests.clone())),
    },
    ToolEntry {
        info: code::naming::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.naming.enabled,
        build: |c| Box::new(code::Naming::new(c.code.naming.clone())),
    },
    ToolEntry {
        info: code::disable_comments::INFO,
        domain: Domain::Code,
        enabled: |c| c.code.quality.disable_comments.enabled,
        build: |c| {
            Box::new(code::DisableComments::new(
                c.code.quality.disable_comments.clone(),
            ))
        },
    },
    // process
    ToolEntry {
        info: process::hooks::INFO,
        domain: Domain::Process,
        enabled: |c| c.process.hooks.enabled,
        build: |c| Box::new(process::Hooks::new(c.process.hooks.clone())),
    },
    ToolEntry {
        info: process::ci::INFO,
        domain: Domain::Process,
        enabled: |c| c.process.ci.enabled,
        build: |c| Box::new(process::Ci::new(c.process.ci.clone())),
    },
    ToolEntry {
        info: process::branches::INFO,
        domain: Domain::Process,
        enabled: |c| c.process.branches.enabled,
        build: |c| Box::new(process::Branches::new(c.process.branches.clone())),
    },
    ToolEntry {
        info: process::commits::INFO,
        domain: Domain::Process,
        enabled: |c| c.process.commits.enabled,
        build: |c| Box::new(process::Commits::new(c.process.commits.clone())),
    },
    ToolEntry {
        info: process::pr::INFO,
        domain: Domain::Process,
        enabled: |c| c.process.pr.enabled,
        build: |c| Box::new(process::Pr::new(c.process.pr.clone())),
    },
    ToolEntry {
        info: process::tickets::INFO,
        domain: Domain::Process,
        enabled: |c| c.process.tickets.enabled,
        build: |c| Box::new(process::Tickets::new(c.process.tickets.clone())),
    },
    ToolEntry {
        info: process::coverage::INFO,
        domain: Domain::Process,
        enabled: |c| c.process.coverage.enabled,
        build: |c| Box::new(process::Coverage::new(c.process.coverage.clone())),
    },
    ToolEntry {
        info: process::repo::INFO,
        domain: Domain::Process,
        enabled: |c| c.process.repo.enabled,
        build: |c| Box::new(process::Repo::new(c.process.repo.clone())),
    },
    ToolEntry {
        info: process::backups::INFO,
        domain: Domain::Process,
        enabled: |c| c.process.backups.enabled,
        build: |c| Box::new(process::Backups::new(c.process.backups.clone())),
    },
    // infra
    ToolEntry {
        info: infra::tagging::INFO,
        domain: Domain::Infra,
        enabled: |c| c.infra.tagging.enabled,
        build: |c| Box::new(infra::Tagging::new(c.infra.tagging.clone())),
    },
];

/// Fresh adapter instances for every enabled check of `domain`.
pub fn select(config: &Config, domain: Domain) -> Vec<Box<dyn Tool>> {
    TOOLS
        .iter()
        .filter(|entry| entry.domain == domain && (entry.enabled)(config))
        .map(|entry| (entry.build)(config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_enabled_by_default() {
        let config = Config::default();
        for domain in Domain::ALL {
            assert!(select(&config, domain).is_empty());
        }
    }

    #[test]
    fn test_ruff_format_needs_both_flags() {
        let mut config = Config::default();
        config.code.linting.ruff.enabled = true;
        let names: Vec<&str> = select(&config, Domain::Code).iter().map(|t| t.info().name).collect();
        assert_eq!(names, vec!["Ruff"]);

        config.code.linting.ruff.format = true;
        let names: Vec<&str> = select(&config, Domain::Code).iter().map(|t| t.info().name).collect();
        assert_eq!(names, vec!["Ruff", "Ruff Format"]);
    }

    #[test]
    fn test_rules_are_unique() {
        let mut rules: Vec<&str> = TOOLS.iter().map(|e| e.info.rule).collect();
        let total = rules.len();
        rules.sort();
        rules.dedup();
        assert_eq!(rules.len(), total);
    }

    #[test]
    fn test_built_tool_matches_entry() {
        let config = Config::default();
        for entry in TOOLS {
            assert_eq!((entry.build)(&config).info(), entry.info);
        }
    }
}
