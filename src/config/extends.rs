//! Registry inheritance for `check.toml`.
//!
//! A registry is a directory (local or remote) holding reusable rulesets at
//! `rulesets/<name>.toml`. Rulesets listed in `[extends]` are merged in
//! order and the project's own file is merged on top.
//!
//! Composition is stricter-only: once a boolean is `true` in the base, an
//! overlay cannot switch it back off, and the numeric thresholds listed in
//! [`THRESHOLDS`] can only move in their stricter direction. Every other
//! value is replaced by the overlay.

use std::path::{Path, PathBuf};
use std::time::Duration;

use phf::phf_map;
use tracing::{debug, warn};

use super::ConfigError;

/// Where a registry lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySource {
    Local(PathBuf),
    /// Base URL without a trailing slash
    Http(String),
}

impl RegistrySource {
    /// Parse an `extends.registry` value.
    ///
    /// `github:owner/repo[@ref]` maps to raw.githubusercontent.com (ref
    /// defaults to `main`); `http(s)://` URLs are used as-is; anything else
    /// is a path relative to `base_dir`.
    pub fn parse(reference: &str, base_dir: &Path) -> Self {
        if let Some(rest) = reference.strip_prefix("github:") {
            let (repo, git_ref) = match rest.split_once('@') {
                Some((repo, r)) => (repo, r),
                None => (rest, "main"),
            };
            return RegistrySource::Http(format!(
                "https://raw.githubusercontent.com/{}/{}",
                repo.trim_matches('/'),
                git_ref
            ));
        }
        if reference.starts_with("https://") || reference.starts_with("http://") {
            return RegistrySource::Http(reference.trim_end_matches('/').to_string());
        }
        let path = Path::new(reference);
        if path.is_absolute() {
            RegistrySource::Local(path.to_path_buf())
        } else {
            RegistrySource::Local(base_dir.join(path))
        }
    }

    fn describe(&self) -> String {
        match self {
            RegistrySource::Local(p) => p.display().to_string(),
            RegistrySource::Http(url) => url.clone(),
        }
    }
}

/// Fetch the text of one ruleset.
pub async fn fetch_ruleset(source: &RegistrySource, name: &str) -> Result<String, ConfigError> {
    match source {
        RegistrySource::Local(dir) => {
            let path = dir.join("rulesets").join(format!("{}.toml", name));
            debug!(path = %path.display(), "reading ruleset");
            std::fs::read_to_string(&path).map_err(|e| ConfigError::Registry {
                registry: source.describe(),
                message: format!("ruleset {:?} not readable at {}: {}", name, path.display(), e),
            })
        }
        RegistrySource::Http(base) => {
            let url = format!("{}/rulesets/{}.toml", base, name);
            debug!(%url, "fetching ruleset");
            let registry_err = |message: String| ConfigError::Registry {
                registry: source.describe(),
                message,
            };
            let client = reqwest::Client::builder()
                .user_agent(concat!("healthgate/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(30))
                .build()
                .map_err(|e| registry_err(e.to_string()))?;
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| registry_err(format!("fetching {}: {}", url, e)))?;
            match response.status().as_u16() {
                200 => response
                    .text()
                    .await
                    .map_err(|e| registry_err(format!("reading {}: {}", url, e))),
                404 => Err(registry_err(format!("ruleset {:?} not found", name))),
                status => Err(registry_err(format!("HTTP {} fetching {}", status, url))),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    /// Raising the value is stricter
    AtLeast,
    /// Lowering the value is stricter
    AtMost,
}

/// Numeric settings with a stricter direction.
static THRESHOLDS: phf::Map<&'static str, Bound> = phf_map! {
    "code.linting.eslint.max_warnings" => Bound::AtMost,
    "code.unused.vulture.min_confidence" => Bound::AtLeast,
    "code.tests.min_test_files" => Bound::AtLeast,
    "process.commits.max_subject_length" => Bound::AtMost,
    "process.pr.max_files" => Bound::AtMost,
    "process.pr.max_lines" => Bound::AtMost,
    "process.coverage.min_threshold" => Bound::AtLeast,
    "process.repo.ruleset.required_reviews" => Bound::AtLeast,
    "process.backups.max_age_hours" => Bound::AtMost,
};

fn as_number(value: &toml::Value) -> Option<f64> {
    match value {
        toml::Value::Integer(i) => Some(*i as f64),
        toml::Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Whether replacing `current` with `proposed` would loosen the threshold at `path`.
fn relaxes(path: &str, current: &toml::Value, proposed: &toml::Value) -> bool {
    let (Some(bound), Some(current), Some(proposed)) =
        (THRESHOLDS.get(path), as_number(current), as_number(proposed))
    else {
        return false;
    };
    match bound {
        Bound::AtLeast => proposed < current,
        Bound::AtMost => proposed > current,
    }
}

/// Deep-merge `overlay` into `base` under the stricter-only rule.
pub fn merge_stricter(base: &mut toml::Value, overlay: toml::Value, path: &str) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                match base_table.get_mut(&key) {
                    Some(existing) => merge_stricter(existing, value, &child_path),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (toml::Value::Boolean(true), toml::Value::Boolean(false)) => {
            warn!(key = path, "cannot relax inherited setting; keeping true");
        }
        (slot, value) if relaxes(path, &*slot, &value) => {
            warn!(key = path, inherited = %slot, proposed = %value, "cannot relax inherited threshold");
        }
        (slot, value) => *slot = value,
    }
}

/// Resolve `[extends]` of a raw project document into a merged document.
pub async fn resolve(project: toml::Value, base_dir: &Path) -> Result<toml::Value, ConfigError> {
    let (registry, rulesets) = match extends_of(&project) {
        Some(pair) => pair,
        None => return Ok(project),
    };
    if rulesets.is_empty() {
        return Ok(project);
    }

    let source = RegistrySource::parse(&registry, base_dir);
    let mut merged = toml::Value::Table(toml::Table::new());

    for name in &rulesets {
        let text = fetch_ruleset(&source, name).await?;
        let mut ruleset: toml::Value =
            toml::from_str(&text).map_err(|e| ConfigError::Registry {
                registry: source.describe(),
                message: format!("ruleset {:?} is not valid TOML: {}", name, e),
            })?;
        if let toml::Value::Table(table) = &mut ruleset {
            // Rulesets do not chain.
            table.remove("extends");
        }
        merge_stricter(&mut merged, ruleset, "");
    }

    merge_stricter(&mut merged, project, "");
    Ok(merged)
}

/// Check a local registry: `rulesets/` must exist and every `*.toml` in it
/// must parse and validate on its own. Returns the ruleset names.
pub fn validate_registry(dir: &Path) -> Result<Vec<String>, ConfigError> {
    let rulesets_dir = dir.join("rulesets");
    let registry_err = |message: String| ConfigError::Registry {
        registry: dir.display().to_string(),
        message,
    };
    let entries = std::fs::read_dir(&rulesets_dir)
        .map_err(|e| registry_err(format!("{}: {}", rulesets_dir.display(), e)))?;

    let mut names = Vec::new();
    let mut problems = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        match check_ruleset(&path) {
            Ok(()) => names.push(name),
            Err(e) => problems.push(format!("{}: {}", name, e)),
        }
    }

    if !problems.is_empty() {
        problems.sort();
        return Err(ConfigError::Invalid(problems));
    }
    if names.is_empty() {
        return Err(registry_err("no rulesets found".to_string()));
    }
    names.sort();
    Ok(names)
}

fn check_ruleset(path: &Path) -> Result<(), ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut raw: toml::Value = toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    if let toml::Value::Table(table) = &mut raw {
        table.remove("extends");
    }
    let config: super::Config = raw.try_into().map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    super::validate(&config)
}

fn extends_of(project: &toml::Value) -> Option<(String, Vec<String>)> {
    let extends = project.get("extends")?;
    let registry = extends.get("registry")?.as_str()?.to_string();
    let rulesets = extends
        .get("rulesets")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    Some((registry, rulesets))
}
