//! Typed schema for `check.toml`.
//!
//! Every table rejects unknown keys so a typo is a load error rather than a
//! silently ignored option. Each tool owns its own options struct; the
//! adapter table hands a clone of that slice to the adapter it builds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default test file globs.
pub const DEFAULT_TEST_PATTERN: &str =
    "**/*.{test,spec}.{ts,tsx,js,jsx},**/test_*.py,**/*_test.py";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub extends: ExtendsConfig,
    pub settings: SettingsConfig,
    pub monorepo: MonorepoConfig,
    pub code: CodeConfig,
    pub process: ProcessConfig,
    pub infra: InfraConfig,
}

/// Registry inheritance.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtendsConfig {
    /// Local path, https URL or `github:owner/repo[@ref]`
    pub registry: Option<String>,
    pub rulesets: Vec<String>,
}

/// Runner settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsConfig {
    /// Maximum adapters running at once (default: CPU count)
    pub concurrency: Option<usize>,
    /// Per-subprocess timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            concurrency: None,
            timeout_secs: 300,
        }
    }
}

/// Monorepo project detection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonorepoConfig {
    pub exclude: Vec<String>,
    pub max_depth: usize,
}

impl Default for MonorepoConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            max_depth: 4,
        }
    }
}

// =============================================================================
// Code domain
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodeConfig {
    pub linting: LintingConfig,
    pub formatting: FormattingConfig,
    pub types: TypesConfig,
    pub unused: UnusedConfig,
    pub security: SecurityConfig,
    pub tests: TestsConfig,
    pub naming: NamingConfig,
    pub quality: QualityConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintingConfig {
    pub eslint: EslintConfig,
    pub ruff: RuffConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EslintConfig {
    pub enabled: bool,
    /// Files or globs to lint (default: whole project)
    pub files: Vec<String>,
    pub max_warnings: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuffConfig {
    pub enabled: bool,
    /// Also run `ruff format --check`
    pub format: bool,
    pub select: Vec<String>,
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormattingConfig {
    pub prettier: ToggleConfig,
}

/// A tool with no options beyond being switched on.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToggleConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypesConfig {
    pub tsc: TscConfig,
    pub ty: ToggleConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TscConfig {
    pub enabled: bool,
    /// compilerOptions that must be set to the given values (audit)
    pub require: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnusedConfig {
    pub knip: ToggleConfig,
    pub vulture: VultureConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VultureConfig {
    pub enabled: bool,
    pub min_confidence: u8,
}

impl Default for VultureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_confidence: 80,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    pub secrets: ToggleConfig,
    pub npmaudit: NpmAuditConfig,
    pub pipaudit: ToggleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NpmAuditConfig {
    pub enabled: bool,
    /// Skip devDependencies
    pub exclude_dev: bool,
}

impl Default for NpmAuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            exclude_dev: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestsConfig {
    pub enabled: bool,
    /// Comma-separated globs; brace groups may contain commas
    pub pattern: String,
    pub min_test_files: usize,
    pub required_dir: Option<String>,
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pattern: DEFAULT_TEST_PATTERN.to_string(),
            min_test_files: 1,
            required_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    pub enabled: bool,
    pub rules: Vec<NamingRule>,
}

/// Case convention applied to a file or folder name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum CaseStyle {
    #[serde(rename = "kebab-case")]
    Kebab,
    #[serde(rename = "snake_case")]
    Snake,
    #[serde(rename = "camelCase")]
    Camel,
    #[serde(rename = "PascalCase")]
    Pascal,
}

impl CaseStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStyle::Kebab => "kebab-case",
            CaseStyle::Snake => "snake_case",
            CaseStyle::Camel => "camelCase",
            CaseStyle::Pascal => "PascalCase",
        }
    }
}

impl std::fmt::Display for CaseStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NamingRule {
    pub extensions: Vec<String>,
    pub file_case: CaseStyle,
    pub folder_case: CaseStyle,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    pub disable_comments: DisableCommentsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisableCommentsConfig {
    pub enabled: bool,
    /// Overrides the built-in directive list when set
    pub patterns: Option<Vec<String>>,
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for DisableCommentsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            patterns: None,
            extensions: ["ts", "tsx", "js", "jsx", "py"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude: Vec::new(),
        }
    }
}

// =============================================================================
// Process domain
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessConfig {
    pub hooks: HooksConfig,
    pub ci: CiConfig,
    pub branches: BranchesConfig,
    pub commits: CommitsConfig,
    pub pr: PrConfig,
    pub tickets: TicketsConfig,
    pub coverage: CoverageConfig,
    pub repo: RepoConfig,
    pub backups: BackupsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HooksConfig {
    pub enabled: bool,
    pub require_husky: bool,
    /// Hook file names that must exist under `.husky/`
    pub require_hooks: Vec<String>,
    /// Hook name -> commands its script must contain
    pub commands: BTreeMap<String, Vec<String>>,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            require_husky: true,
            require_hooks: Vec::new(),
            commands: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CiConfig {
    pub enabled: bool,
    /// Workflow file names under `.github/workflows/`
    pub require_workflows: Vec<String>,
    /// Workflow -> job ids it must define
    pub jobs: BTreeMap<String, Vec<String>>,
    /// Workflow -> action references it must use (prefix match)
    pub actions: BTreeMap<String, Vec<String>>,
    /// Workflow -> shell commands some `run:` step must contain
    pub commands: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BranchesConfig {
    pub enabled: bool,
    /// Regex the branch name must match
    pub pattern: Option<String>,
    /// Branch names exempt from the pattern
    pub exclude: Vec<String>,
}

impl Default for BranchesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pattern: None,
            exclude: ["main", "master", "develop"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Conventional commit types accepted by default.
pub const DEFAULT_COMMIT_TYPES: &[&str] = &[
    "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci", "chore", "revert",
];

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommitsConfig {
    pub enabled: bool,
    pub types: Vec<String>,
    pub require_scope: bool,
    pub max_subject_length: Option<usize>,
}

impl Default for CommitsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            types: DEFAULT_COMMIT_TYPES.iter().map(|s| s.to_string()).collect(),
            require_scope: false,
            max_subject_length: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrConfig {
    pub enabled: bool,
    pub max_files: Option<u64>,
    pub max_lines: Option<u64>,
    /// Title or body must reference an issue
    pub require_issue: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TicketsConfig {
    pub enabled: bool,
    /// Regex of a ticket reference, e.g. `[A-Z]+-[0-9]+`
    pub pattern: String,
    pub require_in_commits: bool,
    pub require_in_branch: bool,
}

impl Default for TicketsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pattern: String::new(),
            require_in_commits: true,
            require_in_branch: false,
        }
    }
}

/// Where a coverage threshold must be enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforceIn {
    #[default]
    Config,
    Ci,
    Both,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverageConfig {
    pub enabled: bool,
    /// Minimum percentage the project's coverage config must enforce
    pub min_threshold: Option<f64>,
    pub enforce_in: EnforceIn,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    pub enabled: bool,
    pub require_branch_protection: bool,
    pub require_codeowners: bool,
    pub ruleset: Option<RulesetConfig>,
}

/// Desired branch protection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RulesetConfig {
    pub branch: String,
    pub required_reviews: Option<u32>,
    pub dismiss_stale_reviews: Option<bool>,
    pub require_code_owner_reviews: Option<bool>,
    pub require_status_checks: Vec<String>,
    pub enforce_admins: Option<bool>,
}

impl Default for RulesetConfig {
    fn default() -> Self {
        Self {
            branch: "main".to_string(),
            required_reviews: None,
            dismiss_stale_reviews: None,
            require_code_owner_reviews: None,
            require_status_checks: Vec::new(),
            enforce_admins: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackupsConfig {
    pub enabled: bool,
    pub bucket: String,
    pub prefix: String,
    pub max_age_hours: u64,
    pub region: Option<String>,
}

impl Default for BackupsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: String::new(),
            prefix: String::new(),
            max_age_hours: 24,
            region: None,
        }
    }
}

// =============================================================================
// Infra domain
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InfraConfig {
    pub tagging: TaggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaggingConfig {
    pub enabled: bool,
    pub region: Option<String>,
    /// Tag keys every resource must carry
    pub required: Vec<String>,
    /// Tag key -> allowed values
    pub values: BTreeMap<String, Vec<String>>,
}
