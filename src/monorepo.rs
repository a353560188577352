//! Monorepo support: project detection and per-project runs.
//!
//! Sub-projects are found by marker file. Every project that carries its
//! own `check.toml` is checked with the normal single-project pipeline;
//! projects run one after another.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::check::{self, Domain, FullResult, Mode, EXIT_CONFIG_ERROR, EXIT_SUCCESS, EXIT_VIOLATIONS};
use crate::config::{self, MonorepoConfig, CONFIG_FILE_NAME};
use crate::files::{compile_globset, to_relative, IGNORED_DIRS};

/// Marker file → project type, in priority order.
pub const MARKERS: &[(&str, ProjectType)] = &[
    ("package.json", ProjectType::Typescript),
    ("pyproject.toml", ProjectType::Python),
    ("Cargo.toml", ProjectType::Rust),
    ("go.mod", ProjectType::Go),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Typescript,
    Python,
    Rust,
    Go,
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProjectType::Typescript => "typescript",
            ProjectType::Python => "python",
            ProjectType::Rust => "rust",
            ProjectType::Go => "go",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedProject {
    /// Path relative to the monorepo root (`.` for the root itself)
    pub path: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub has_check_toml: bool,
    pub marker_file: String,
}

/// Outcome for one project.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResult {
    pub path: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<FullResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub exit_code: i32,
}

impl ProjectResult {
    pub fn is_skipped(&self) -> bool {
        self.result.is_none() && self.error.is_none()
    }

    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonorepoSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonorepoResult {
    pub root: String,
    pub projects: Vec<ProjectResult>,
    pub summary: MonorepoSummary,
}

impl MonorepoResult {
    /// A project fails on a non-zero exit code or an error; the whole run
    /// fails if any project did.
    pub fn new(root: impl Into<String>, projects: Vec<ProjectResult>) -> Self {
        let mut summary = MonorepoSummary {
            total: projects.len(),
            ..MonorepoSummary::default()
        };
        for project in &projects {
            if project.is_errored() {
                summary.errored += 1;
            } else if project.is_skipped() {
                summary.skipped += 1;
            } else if project.exit_code == EXIT_SUCCESS {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary.exit_code = if summary.failed + summary.errored > 0 {
            EXIT_VIOLATIONS
        } else {
            EXIT_SUCCESS
        };

        Self {
            root: root.into(),
            projects,
            summary,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.summary.exit_code
    }
}

/// Marker present in `dir`, if any.
fn marker(dir: &Path) -> Option<(&'static str, ProjectType)> {
    MARKERS
        .iter()
        .find(|(file, _)| dir.join(file).is_file())
        .copied()
}

/// Whether the root only groups other projects (npm/pnpm workspaces, a
/// virtual Cargo workspace, a `go.work`).
pub fn is_container_root(root: &Path) -> bool {
    if root.join("pnpm-workspace.yaml").is_file() || root.join("go.work").is_file() {
        return true;
    }
    let package_workspaces = std::fs::read_to_string(root.join("package.json"))
        .ok()
        .and_then(|t| serde_json::from_str::<serde_json::Value>(&t).ok())
        .map(|pkg| pkg.get("workspaces").is_some())
        .unwrap_or(false);
    if package_workspaces {
        return true;
    }
    std::fs::read_to_string(root.join("Cargo.toml"))
        .ok()
        .and_then(|t| t.parse::<toml::Value>().ok())
        .map(|cargo| cargo.get("workspace").is_some() && cargo.get("package").is_none())
        .unwrap_or(false)
}

/// Find sub-projects under `root`, sorted by path.
pub fn detect_projects(
    root: &Path,
    settings: &MonorepoConfig,
) -> Result<Vec<DetectedProject>, globset::Error> {
    let exclude = compile_globset(&settings.exclude)?;
    let container = is_container_root(root);
    let mut projects = Vec::new();

    let walker = WalkDir::new(root)
        .max_depth(settings.max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            if !e.file_type().is_dir() {
                return false;
            }
            let name = e.file_name().to_string_lossy();
            if IGNORED_DIRS.contains(&name.as_ref()) || name.starts_with('.') {
                return false;
            }
            let rel = to_relative(root, e.path());
            !exclude.is_match(&rel) && !exclude.is_match(format!("{}/", rel))
        });

    for entry in walker.filter_map(|e| e.ok()) {
        let dir = entry.path();
        if entry.depth() == 0 && container {
            continue;
        }
        let Some((marker_file, project_type)) = marker(dir) else {
            continue;
        };
        let path = if entry.depth() == 0 {
            ".".to_string()
        } else {
            to_relative(root, dir)
        };
        projects.push(DetectedProject {
            path,
            project_type,
            has_check_toml: dir.join(CONFIG_FILE_NAME).is_file(),
            marker_file: marker_file.to_string(),
        });
    }

    Ok(projects)
}

/// Check every detected project that has its own config.
pub async fn run(root: &Path, settings: &MonorepoConfig, mode: Mode) -> anyhow::Result<MonorepoResult> {
    let projects = detect_projects(root, settings)?;
    info!(root = %root.display(), projects = projects.len(), "running monorepo");

    let mut results = Vec::with_capacity(projects.len());
    for project in projects {
        results.push(run_one(root, project, mode).await);
    }

    Ok(MonorepoResult::new(root.display().to_string(), results))
}

async fn run_one(root: &Path, project: DetectedProject, mode: Mode) -> ProjectResult {
    let mut result = ProjectResult {
        path: project.path.clone(),
        project_type: project.project_type,
        result: None,
        error: None,
        exit_code: EXIT_SUCCESS,
    };
    if !project.has_check_toml {
        return result;
    }

    let config_path: PathBuf = root.join(&project.path).join(CONFIG_FILE_NAME);
    match config::load(&config_path).await {
        Ok(loaded) => {
            let full = check::run_project(&loaded, &Domain::ALL, mode).await;
            result.exit_code = full.exit_code();
            result.result = Some(full);
        }
        Err(e) => {
            warn!(project = %project.path, error = %e, "project config failed to load");
            result.exit_code = EXIT_CONFIG_ERROR;
            result.error = Some(e.to_string());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_detects_by_marker_and_skips_container_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "package.json", r#"{"private": true, "workspaces": ["apps/*"]}"#);
        write(root, "apps/web/package.json", "{}");
        write(root, "apps/web/check.toml", "");
        write(root, "services/api/pyproject.toml", "[project]\nname = \"api\"\n");
        write(root, "tools/cli/Cargo.toml", "[package]\nname = \"cli\"\n");
        write(root, "node_modules/dep/package.json", "{}");

        let projects = detect_projects(root, &MonorepoConfig::default()).unwrap();
        let paths: Vec<&str> = projects.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["apps/web", "services/api", "tools/cli"]);
        assert_eq!(projects[0].project_type, ProjectType::Typescript);
        assert!(projects[0].has_check_toml);
        assert_eq!(projects[1].project_type, ProjectType::Python);
        assert!(!projects[1].has_check_toml);
        assert_eq!(projects[2].marker_file, "Cargo.toml");
    }

    #[test]
    fn test_exclude_and_depth() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "go.work", "go 1.22\n");
        write(root, "legacy/old/go.mod", "module old\n");
        write(root, "svc/a/go.mod", "module a\n");
        write(root, "a/b/c/d/e/go.mod", "module deep\n");

        let settings = MonorepoConfig {
            exclude: vec!["legacy/**".to_string()],
            max_depth: 4,
        };
        let projects = detect_projects(root, &settings).unwrap();
        let paths: Vec<&str> = projects.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["svc/a"]);
    }

    #[test]
    fn test_summary() {
        let project = |path: &str, exit_code: i32, error: bool, skipped: bool| ProjectResult {
            path: path.to_string(),
            project_type: ProjectType::Go,
            result: if skipped || error {
                None
            } else {
                Some(FullResult::new("check.toml", Vec::new()))
            },
            error: error.then(|| "bad config".to_string()),
            exit_code,
        };
        let result = MonorepoResult::new(
            "/repo",
            vec![
                project("a", 0, false, false),
                project("b", 1, false, false),
                project("c", 2, true, false),
                project("d", 0, false, true),
            ],
        );
        assert_eq!(result.summary.total, 4);
        assert_eq!(result.summary.passed, 1);
        assert_eq!(result.summary.failed, 1);
        assert_eq!(result.summary.errored, 1);
        assert_eq!(result.summary.skipped, 1);
        assert_eq!(result.exit_code(), EXIT_VIOLATIONS);

        let clean = MonorepoResult::new("/repo", vec![project("a", 0, false, false)]);
        assert_eq!(clean.exit_code(), EXIT_SUCCESS);
    }
}
