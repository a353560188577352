//! Command-line interface for healthgate.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;
use serde_json::json;
use tracing::debug;

use crate::check::{
    self, Domain, Mode, Violation, EXIT_CONFIG_ERROR, EXIT_RUNTIME_ERROR, EXIT_SUCCESS,
    EXIT_VIOLATIONS,
};
use crate::config::{self, ConfigError, LoadedConfig, MonorepoConfig, CONFIG_FILE_NAME};
use crate::monorepo;
use crate::report::{self, OutputFormat};
use crate::schema;
use crate::tools::process::{branches, commits, git, repo, tickets};
use crate::tools::ToolContext;

/// Unified project health checks.
///
/// Reads `check.toml`, runs the configured linters, type checkers, security
/// scanners and workflow checks, and reports every finding in one place.
#[derive(Parser)]
#[command(name = "healthgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Path to check.toml (default: nearest check.toml from the working directory)
    #[arg(short, long, global = true, env = "HEALTHGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every domain
    Check(RunArgs),
    /// Verify static configuration of every domain
    Audit(RunArgs),
    /// Code checks: linting, types, unused code, security, tests, naming
    Code {
        #[command(subcommand)]
        action: DomainAction,
    },
    /// Process checks: hooks, CI, branches, commits, PRs, repository settings
    Process {
        #[command(subcommand)]
        action: ProcessAction,
    },
    /// Infrastructure checks
    Infra {
        #[command(subcommand)]
        action: DomainAction,
    },
    /// Validate configuration without running checks
    Validate {
        #[command(subcommand)]
        target: ValidateTarget,
    },
    /// Print schemas
    Schema {
        #[command(subcommand)]
        target: SchemaTarget,
    },
    /// Monorepo project detection
    Projects {
        #[command(subcommand)]
        action: ProjectsAction,
    },
    /// Create check.toml from a template
    Init(InitArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Check every sub-project that has its own check.toml
    #[arg(long)]
    pub monorepo: bool,
}

#[derive(Subcommand)]
pub enum DomainAction {
    /// Run the domain's checks
    Check,
    /// Verify the domain's static configuration
    Audit,
}

#[derive(Subcommand)]
pub enum ProcessAction {
    /// Run the process checks
    Check,
    /// Verify the process configuration
    Audit,
    /// Validate the current branch name
    CheckBranch {
        /// Print nothing; report through the exit code only
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate a commit message file (for commit-msg hooks)
    CheckCommit {
        /// Path to the commit message file
        file: PathBuf,
    },
    /// Compare live branch protection with process.repo.ruleset
    Diff,
    /// Show the protection diff and optionally apply it
    Sync {
        /// Update the branch protection on GitHub
        #[arg(long)]
        apply: bool,
    },
}

#[derive(Subcommand)]
pub enum ValidateTarget {
    /// Load and validate check.toml
    Config,
    /// Validate a local registry directory
    Registry {
        /// Registry directory containing rulesets/
        path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum SchemaTarget {
    /// Describe every check.toml section and option as JSON
    Config,
}

#[derive(Subcommand)]
pub enum ProjectsAction {
    /// List detected sub-projects
    Detect {
        /// Only list projects without a check.toml
        #[arg(long)]
        missing_config: bool,
    },
}

#[derive(Parser)]
pub struct InitArgs {
    /// Template to start from
    #[arg(short, long, value_enum, default_value_t = TemplateName::Minimal)]
    pub template: TemplateName,

    /// Overwrite an existing check.toml
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TemplateName {
    Minimal,
    Typescript,
    Python,
}

impl TemplateName {
    pub fn content(&self) -> &'static str {
        match self {
            TemplateName::Minimal => include_str!("templates/minimal.toml"),
            TemplateName::Typescript => include_str!("templates/typescript.toml"),
            TemplateName::Python => include_str!("templates/python.toml"),
        }
    }
}

/// Run the parsed command and map any error to an exit code.
pub async fn run(cli: Cli) -> i32 {
    match dispatch(&cli).await {
        Ok(code) => code,
        Err(e) => {
            let code = exit_code_for_error(&e);
            eprintln!("Error: {:#}", e);
            if matches!(e.downcast_ref::<ConfigError>(), Some(ConfigError::NotFound(_))) {
                eprintln!("Run 'healthgate init' to create {}", CONFIG_FILE_NAME);
            }
            code
        }
    }
}

/// Configuration problems exit 2; everything else is a runtime error.
pub fn exit_code_for_error(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        EXIT_CONFIG_ERROR
    } else {
        EXIT_RUNTIME_ERROR
    }
}

async fn dispatch(cli: &Cli) -> anyhow::Result<i32> {
    let explicit = cli.config.as_deref();
    match &cli.command {
        Commands::Check(args) => run_all(explicit, cli.format, Mode::Check, args.monorepo).await,
        Commands::Audit(args) => run_all(explicit, cli.format, Mode::Audit, args.monorepo).await,
        Commands::Code { action } => run_domain(explicit, cli.format, Domain::Code, action.mode()).await,
        Commands::Infra { action } => run_domain(explicit, cli.format, Domain::Infra, action.mode()).await,
        Commands::Process { action } => match action {
            ProcessAction::Check => run_domain(explicit, cli.format, Domain::Process, Mode::Check).await,
            ProcessAction::Audit => run_domain(explicit, cli.format, Domain::Process, Mode::Audit).await,
            ProcessAction::CheckBranch { quiet } => run_check_branch(explicit, cli.format, *quiet).await,
            ProcessAction::CheckCommit { file } => run_check_commit(explicit, cli.format, file).await,
            ProcessAction::Diff => run_sync(explicit, cli.format, false, false).await,
            ProcessAction::Sync { apply } => run_sync(explicit, cli.format, true, *apply).await,
        },
        Commands::Validate { target } => match target {
            ValidateTarget::Config => run_validate_config(explicit, cli.format).await,
            ValidateTarget::Registry { path } => run_validate_registry(path, cli.format),
        },
        Commands::Schema {
            target: SchemaTarget::Config,
        } => {
            report::write_json(&schema::config_schema()?)?;
            Ok(EXIT_SUCCESS)
        }
        Commands::Projects {
            action: ProjectsAction::Detect { missing_config },
        } => run_detect(explicit, cli.format, *missing_config).await,
        Commands::Init(args) => {
            let cwd = std::env::current_dir()?;
            run_init(&cwd, args)
        }
    }
}

impl DomainAction {
    fn mode(&self) -> Mode {
        match self {
            DomainAction::Check => Mode::Check,
            DomainAction::Audit => Mode::Audit,
        }
    }
}

/// Resolve and load check.toml from the flag or the working directory.
pub async fn load_config(explicit: Option<&Path>) -> anyhow::Result<LoadedConfig> {
    let cwd = std::env::current_dir()?;
    let path = config::resolve_path(explicit, &cwd)?;
    debug!(path = %path.display(), "loading config");
    Ok(config::load(&path).await?)
}

async fn run_all(
    explicit: Option<&Path>,
    format: OutputFormat,
    mode: Mode,
    monorepo: bool,
) -> anyhow::Result<i32> {
    if monorepo {
        let (root, settings) = monorepo_root(explicit).await?;
        let result = monorepo::run(&root, &settings, mode).await?;
        report::write_monorepo(&result, format)?;
        return Ok(result.exit_code());
    }

    let loaded = load_config(explicit).await?;
    let result = check::run_project(&loaded, &Domain::ALL, mode).await;
    report::write_full(&result, format)?;
    Ok(result.exit_code())
}

async fn run_domain(
    explicit: Option<&Path>,
    format: OutputFormat,
    domain: Domain,
    mode: Mode,
) -> anyhow::Result<i32> {
    let loaded = load_config(explicit).await?;
    let result = check::run_project(&loaded, &[domain], mode).await;
    report::write_full(&result, format)?;
    Ok(result.exit_code())
}

/// Monorepo root and detection settings: the config's directory when one
/// is found, otherwise the working directory with defaults.
async fn monorepo_root(explicit: Option<&Path>) -> anyhow::Result<(PathBuf, MonorepoConfig)> {
    let cwd = std::env::current_dir()?;
    match config::resolve_path(explicit, &cwd) {
        Ok(path) => {
            let loaded = config::load(&path).await?;
            Ok((loaded.root, loaded.config.monorepo))
        }
        Err(ConfigError::NotFound(_)) if explicit.is_none() => Ok((cwd, MonorepoConfig::default())),
        Err(e) => Err(e.into()),
    }
}

async fn run_detect(
    explicit: Option<&Path>,
    format: OutputFormat,
    missing_config: bool,
) -> anyhow::Result<i32> {
    let (root, settings) = monorepo_root(explicit).await?;
    let mut projects = monorepo::detect_projects(&root, &settings)?;
    if missing_config {
        projects.retain(|p| !p.has_check_toml);
    }
    report::write_projects(&projects, format)?;
    Ok(EXIT_SUCCESS)
}

fn print_violations(violations: &[Violation], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => report::write_json(&json!({ "violations": violations })),
        OutputFormat::Text => {
            for v in violations {
                eprintln!("✗ {}", v.message);
            }
            Ok(())
        }
    }
}

fn exit_code_for_violations(violations: &[Violation]) -> i32 {
    check::exit_code_for(violations.len())
}

async fn run_check_branch(
    explicit: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<i32> {
    let loaded = load_config(explicit).await?;
    let ctx = ToolContext::for_config(&loaded.root, &loaded.config);
    let Some(branch) = git::current_branch(&ctx).await? else {
        if !quiet {
            eprintln!("Not on a branch; nothing to check");
        }
        return Ok(EXIT_SUCCESS);
    };

    let violations = validate_branch_name(&branch, &loaded.config)?;

    if !quiet {
        print_violations(&violations, format)?;
        if violations.is_empty() && format == OutputFormat::Text {
            eprintln!("✓ Branch \"{}\" is valid", branch);
        }
    }
    Ok(exit_code_for_violations(&violations))
}

async fn run_check_commit(
    explicit: Option<&Path>,
    format: OutputFormat,
    file: &Path,
) -> anyhow::Result<i32> {
    let loaded = load_config(explicit).await?;
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read commit message {}", file.display()))?;
    let message = git::clean_message(&raw);
    if message.is_empty() {
        return Ok(EXIT_SUCCESS);
    }

    let violations = validate_commit_message(&message, &loaded.config)?;
    print_violations(&violations, format)?;
    Ok(exit_code_for_violations(&violations))
}

/// Branch and ticket rules that apply to a branch name.
pub fn validate_branch_name(branch: &str, config: &config::Config) -> anyhow::Result<Vec<Violation>> {
    let process = &config.process;
    let mut violations = Vec::new();
    if process.branches.enabled {
        violations.extend(branches::validate_branch(branch, &process.branches)?);
    }
    if process.tickets.enabled && process.tickets.require_in_branch {
        let re = Regex::new(&process.tickets.pattern)?;
        violations.extend(tickets::check_branch(branch, &re, &process.tickets.pattern));
    }
    Ok(violations)
}

/// Commit and ticket rules that apply to a single message.
pub fn validate_commit_message(
    message: &str,
    config: &config::Config,
) -> anyhow::Result<Vec<Violation>> {
    let mut violations = Vec::new();
    if config.process.commits.enabled {
        violations.extend(commits::validate_message(message, &config.process.commits));
    }
    if config.process.tickets.enabled {
        violations.extend(tickets::validate_message(message, &config.process.tickets)?);
    }
    Ok(violations)
}

async fn run_sync(
    explicit: Option<&Path>,
    format: OutputFormat,
    sync: bool,
    apply: bool,
) -> anyhow::Result<i32> {
    let loaded = load_config(explicit).await?;
    let desired = loaded.config.process.repo.ruleset.clone().ok_or_else(|| {
        ConfigError::Invalid(vec!["process.repo.ruleset is not configured".to_string()])
    })?;
    let ctx = ToolContext::for_config(&loaded.root, &loaded.config);
    let (github_repo, diffs) = repo::live_diff(&ctx, &desired).await?;

    let applied = apply && !diffs.is_empty();
    if applied {
        repo::apply_protection(&ctx, &github_repo, &desired).await?;
    }

    match format {
        OutputFormat::Json => report::write_json(&json!({
            "repository": github_repo.to_string(),
            "branch": desired.branch,
            "differences": diffs,
            "applied": applied,
        }))?,
        OutputFormat::Text => {
            if diffs.is_empty() {
                println!("✓ {}:{} protection matches the ruleset", github_repo, desired.branch);
            } else {
                println!("{}:{} protection differs from the ruleset:", github_repo, desired.branch);
                for diff in &diffs {
                    println!("  - {}", diff);
                }
                if applied {
                    println!("✓ Applied ruleset to {}:{}", github_repo, desired.branch);
                } else if sync {
                    println!("Run 'healthgate process sync --apply' to update");
                }
            }
        }
    }

    if diffs.is_empty() || applied {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_VIOLATIONS)
    }
}

async fn run_validate_config(explicit: Option<&Path>, format: OutputFormat) -> anyhow::Result<i32> {
    let loaded = load_config(explicit).await?;
    match format {
        OutputFormat::Json => report::write_json(&json!({
            "valid": true,
            "configPath": loaded.path.display().to_string(),
        }))?,
        OutputFormat::Text => println!("✓ {} is valid", loaded.path.display()),
    }
    Ok(EXIT_SUCCESS)
}

fn run_validate_registry(path: &Path, format: OutputFormat) -> anyhow::Result<i32> {
    let rulesets = config::validate_registry(path)?;
    match format {
        OutputFormat::Json => report::write_json(&json!({
            "valid": true,
            "registry": path.display().to_string(),
            "rulesets": rulesets,
        }))?,
        OutputFormat::Text => {
            println!("✓ {} is a valid registry", path.display());
            for name in &rulesets {
                println!("  - {}", name);
            }
        }
    }
    Ok(EXIT_SUCCESS)
}

/// Write check.toml into `dir` from the chosen template.
pub fn run_init(dir: &Path, args: &InitArgs) -> anyhow::Result<i32> {
    let output = dir.join(CONFIG_FILE_NAME);
    if output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }
    std::fs::write(&output, args.template.content())
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Created {} from template '{}'", output.display(), template_label(args.template));
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to enable the checks you need", CONFIG_FILE_NAME);
    println!("  2. Run: healthgate check");
    Ok(EXIT_SUCCESS)
}

fn template_label(template: TemplateName) -> &'static str {
    match template {
        TemplateName::Minimal => "minimal",
        TemplateName::Typescript => "typescript",
        TemplateName::Python => "python",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_templates_are_valid_configs() {
        for template in [TemplateName::Minimal, TemplateName::Typescript, TemplateName::Python] {
            if let Err(e) = config::parse_str(template.content()) {
                panic!("template {:?} is invalid: {}", template, e);
            }
        }
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let args = InitArgs {
            template: TemplateName::Python,
            force: false,
        };
        assert_eq!(run_init(temp.path(), &args).unwrap(), EXIT_SUCCESS);
        let written = std::fs::read_to_string(temp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(written, TemplateName::Python.content());

        assert!(run_init(temp.path(), &args).is_err());

        let forced = InitArgs {
            template: TemplateName::Minimal,
            force: true,
        };
        assert_eq!(run_init(temp.path(), &forced).unwrap(), EXIT_SUCCESS);
    }

    #[test]
    fn test_error_exit_codes() {
        let config_err = anyhow::Error::new(ConfigError::Invalid(vec!["bad".to_string()]));
        assert_eq!(exit_code_for_error(&config_err), EXIT_CONFIG_ERROR);
        let runtime_err = anyhow::anyhow!("gh exploded");
        assert_eq!(exit_code_for_error(&runtime_err), EXIT_RUNTIME_ERROR);
    }

    #[test]
    fn test_commit_message_rules() {
        let config = config::parse_str(
            r#"
[process.commits]
enabled = true

[process.tickets]
enabled = true
pattern = "[A-Z]+-[0-9]+"
"#,
        )
        .unwrap();
        assert!(validate_commit_message("feat: add login (AUTH-12)", &config)
            .unwrap()
            .is_empty());
        let violations = validate_commit_message("added login", &config).unwrap();
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_branch_rules_respect_enabled() {
        let disabled = config::parse_str(
            r#"
[process.branches]
enabled = false
pattern = "^(feature|fix)/[a-z0-9-]+$"
"#,
        )
        .unwrap();
        assert!(validate_branch_name("Random_Branch", &disabled).unwrap().is_empty());

        let enabled = config::parse_str(
            r#"
[process.branches]
enabled = true
pattern = "^(feature|fix)/[a-z0-9-]+$"
"#,
        )
        .unwrap();
        assert_eq!(validate_branch_name("Random_Branch", &enabled).unwrap().len(), 1);
        assert!(validate_branch_name("feature/login", &enabled).unwrap().is_empty());
        assert!(validate_branch_name("main", &enabled).unwrap().is_empty());
    }

    #[test]
    fn test_tool_context_uses_configured_timeout() {
        let config = config::parse_str("[settings]\ntimeout_secs = 12\n").unwrap();
        let ctx = ToolContext::for_config("/repo", &config);
        assert_eq!(ctx.timeout, std::time::Duration::from_secs(12));
    }

    #[test]
    fn test_parses_nested_commands() {
        let cli = Cli::try_parse_from(["healthgate", "process", "check-branch", "--quiet", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Process {
                action: ProcessAction::CheckBranch { quiet: true }
            }
        ));

        let cli = Cli::try_parse_from(["healthgate", "check", "--monorepo"]).unwrap();
        assert!(matches!(cli.command, Commands::Check(RunArgs { monorepo: true })));

        let cli = Cli::try_parse_from(["healthgate", "init", "--template", "typescript"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Init(InitArgs {
                template: TemplateName::Typescript,
                force: false
            })
        ));
    }
}
