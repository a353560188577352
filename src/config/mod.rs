//! Configuration loading for `check.toml`.
//!
//! Resolution order:
//!
//! 1. `--config` flag (explicit path)
//! 2. `check.toml` in the working directory or the nearest parent
//!
//! The raw document is merged with any registry rulesets it extends, then
//! deserialized into the typed [`Config`] and validated. All of this happens
//! before a single adapter runs; failures map to exit code 2.

mod extends;
mod schema;
mod validate;

pub use extends::{fetch_ruleset, merge_stricter, validate_registry, RegistrySource};
pub use schema::*;
pub use validate::validate;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Config file name searched for.
pub const CONFIG_FILE_NAME: &str = "check.toml";

/// Errors surfaced before any check runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no {} found in {} or any parent directory", CONFIG_FILE_NAME, .0.display())]
    NotFound(PathBuf),
    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),
    #[error("registry {registry}: {message}")]
    Registry { registry: String, message: String },
}

/// A validated configuration and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// Path of the `check.toml` that was loaded
    pub path: PathBuf,
    /// Directory containing it; the project root
    pub root: PathBuf,
}

/// Find `check.toml` in `start` or the nearest parent.
pub fn discover(start: &Path) -> Result<PathBuf, ConfigError> {
    for dir in start.ancestors() {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            debug!("Found config: {}", candidate.display());
            return Ok(candidate);
        }
    }
    Err(ConfigError::NotFound(start.to_path_buf()))
}

/// Resolve the explicit path or discover one from `cwd`.
pub fn resolve_path(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(p) if p.is_file() => Ok(p.to_path_buf()),
        Some(p) => Err(ConfigError::NotFound(p.to_path_buf())),
        None => discover(cwd),
    }
}

/// Load, merge with registry rulesets, deserialize and validate.
pub async fn load(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let path = path
        .canonicalize()
        .map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.clone(),
        source: e,
    })?;
    let raw: toml::Value = toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.clone(),
        source: e,
    })?;

    let merged = extends::resolve(raw, &root).await?;
    let config: Config = merged.try_into().map_err(|e| ConfigError::Parse {
        path: path.clone(),
        source: e,
    })?;
    validate(&config)?;

    Ok(LoadedConfig { config, path, root })
}

/// Parse and validate a document without registry resolution.
pub fn parse_str(text: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text).map_err(|e| ConfigError::Parse {
        path: PathBuf::from(CONFIG_FILE_NAME),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal() {
        let config = parse_str(
            r#"
[code.linting.eslint]
enabled = true

[code.linting.ruff]
enabled = true
format = true

[process.hooks]
enabled = true
require_hooks = ["pre-commit"]
"#,
        )
        .unwrap();
        assert!(config.code.linting.eslint.enabled);
        assert!(config.code.linting.ruff.format);
        assert!(config.process.hooks.require_husky);
        assert_eq!(config.process.hooks.require_hooks, vec!["pre-commit"]);
        assert!(!config.infra.tagging.enabled);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = parse_str("[code.linting.eslint]\nenabeld = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_naming_rule_cases() {
        let config = parse_str(
            r#"
[code.naming]
enabled = true

[[code.naming.rules]]
extensions = ["ts"]
file_case = "kebab-case"
folder_case = "kebab-case"
"#,
        )
        .unwrap();
        assert_eq!(config.code.naming.rules[0].file_case, CaseStyle::Kebab);
        assert!(parse_str(
            "[[code.naming.rules]]\nextensions=[\"ts\"]\nfile_case=\"SCREAMING\"\nfolder_case=\"kebab-case\"\n"
        )
        .is_err());
    }

    #[test]
    fn test_discover_walks_up() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE_NAME), "").unwrap();
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = discover(&nested).unwrap();
        assert_eq!(found, temp.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_discover_not_found() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("empty");
        std::fs::create_dir_all(&nested).unwrap();
        // A check.toml further up the real filesystem would be found; only
        // assert the error shape when nothing is there.
        if let Err(e) = discover(&nested) {
            assert!(matches!(e, ConfigError::NotFound(_)));
        }
    }

    #[tokio::test]
    async fn test_load_sets_root() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[code.tests]\nenabled = true\n").unwrap();

        let loaded = load(&path).await.unwrap();
        assert_eq!(loaded.root, temp.path().canonicalize().unwrap());
        assert!(loaded.config.code.tests.enabled);
        assert_eq!(loaded.config.code.tests.min_test_files, 1);
    }
}
