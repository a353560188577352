//! File and folder naming conventions.

use std::collections::HashSet;
use std::path::Path;

use futures::future::{BoxFuture, FutureExt};
use lazy_static::lazy_static;
use regex::Regex;

use crate::check::{CheckResult, Violation};
use crate::config::{CaseStyle, NamingConfig, NamingRule};
use crate::files::{compile_globset, files_with_extensions};
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "naming",
    name: "Naming",
    rule: "code.naming",
};

lazy_static! {
    static ref KEBAB: Regex = Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").unwrap();
    static ref SNAKE: Regex = Regex::new(r"^[a-z][a-z0-9]*(_[a-z0-9]+)*$").unwrap();
    static ref CAMEL: Regex = Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap();
    static ref PASCAL: Regex = Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap();
}

/// Whether `name` is written in `style`.
pub fn matches_case(name: &str, style: CaseStyle) -> bool {
    match style {
        CaseStyle::Kebab => KEBAB.is_match(name),
        CaseStyle::Snake => SNAKE.is_match(name),
        CaseStyle::Camel => CAMEL.is_match(name),
        CaseStyle::Pascal => PASCAL.is_match(name),
    }
}

/// File name with every extension removed (`button.test.tsx` → `button`).
pub fn base_name(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

/// Folder names that are conventions of their own (`__tests__`, `.github`,
/// Next.js route groups and dynamic segments).
fn is_special_folder(segment: &str) -> bool {
    segment.starts_with(['_', '.', '(', '['])
}

pub struct Naming {
    config: NamingConfig,
}

impl Naming {
    pub fn new(config: NamingConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        let config = self.config.clone();
        let root = ctx.root.clone();
        tokio::task::spawn_blocking(move || scan(&root, &config)).await?
    }
}

impl Tool for Naming {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }

    fn audit<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

pub fn scan(root: &Path, config: &NamingConfig) -> anyhow::Result<CheckResult> {
    let mut violations = Vec::new();
    for rule in &config.rules {
        violations.extend(check_rule(root, rule)?);
    }
    Ok(INFO.result(violations))
}

fn check_rule(root: &Path, rule: &NamingRule) -> anyhow::Result<Vec<Violation>> {
    let exclude = compile_globset(&rule.exclude)?;
    let mut checked_folders: HashSet<String> = HashSet::new();
    let mut violations = Vec::new();

    for file in files_with_extensions(root, &rule.extensions) {
        if exclude.is_match(&file) {
            continue;
        }

        let (dir, file_name) = match file.rsplit_once('/') {
            Some((dir, name)) => (Some(dir), name),
            None => (None, file.as_str()),
        };

        if let Some(dir) = dir {
            let mut prefix = String::new();
            for segment in dir.split('/') {
                if !prefix.is_empty() {
                    prefix.push('/');
                }
                prefix.push_str(segment);

                if is_special_folder(segment) || !checked_folders.insert(prefix.clone()) {
                    continue;
                }
                if !matches_case(segment, rule.folder_case) {
                    violations.push(
                        INFO.violation(format!(
                            "Folder \"{}\" should be {}",
                            segment, rule.folder_case
                        ))
                        .file(prefix.clone())
                        .code("folder-case"),
                    );
                }
            }
        }

        let base = base_name(file_name);
        if base.is_empty() || base.starts_with('_') {
            continue;
        }
        if !matches_case(base, rule.file_case) {
            violations.push(
                INFO.violation(format!(
                    "File \"{}\" should be {}",
                    file_name, rule.file_case
                ))
                .file(file.clone())
                .code("file-case"),
            );
        }
    }

    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn kebab_rule() -> NamingRule {
        NamingRule {
            extensions: vec!["ts".to_string()],
            file_case: CaseStyle::Kebab,
            folder_case: CaseStyle::Kebab,
            exclude: Vec::new(),
        }
    }

    #[test]
    fn test_case_styles() {
        assert!(matches_case("my-component", CaseStyle::Kebab));
        assert!(!matches_case("my_component", CaseStyle::Kebab));
        assert!(!matches_case("MyComponent", CaseStyle::Kebab));
        assert!(!matches_case("my--component", CaseStyle::Kebab));

        assert!(matches_case("my_module", CaseStyle::Snake));
        assert!(!matches_case("my-module", CaseStyle::Snake));

        assert!(matches_case("myComponent", CaseStyle::Camel));
        assert!(!matches_case("MyComponent", CaseStyle::Camel));
        assert!(!matches_case("my-component", CaseStyle::Camel));

        assert!(matches_case("MyComponent", CaseStyle::Pascal));
        assert!(!matches_case("myComponent", CaseStyle::Pascal));
        assert!(!matches_case("My_Component", CaseStyle::Pascal));
    }

    #[test]
    fn test_base_name_strips_all_extensions() {
        assert_eq!(base_name("button.test.tsx"), "button");
        assert_eq!(base_name("index.ts"), "index");
        assert_eq!(base_name("Makefile"), "Makefile");
    }

    #[test]
    fn test_bad_folder_and_file() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("BadFolder")).unwrap();
        std::fs::write(temp.path().join("BadFolder/MyComponent.ts"), "").unwrap();

        let config = NamingConfig {
            enabled: true,
            rules: vec![kebab_rule()],
        };
        let result = scan(temp.path(), &config).unwrap();
        assert_eq!(result.violations.len(), 2);
        assert_eq!(result.violations[0].code.as_deref(), Some("folder-case"));
        assert_eq!(result.violations[0].file.as_deref(), Some("BadFolder"));
        assert_eq!(result.violations[1].code.as_deref(), Some("file-case"));
    }

    #[test]
    fn test_folders_reported_once_and_special_names_skipped() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("src/UiKit")).unwrap();
        std::fs::create_dir_all(root.join("src/__tests__")).unwrap();
        std::fs::write(root.join("src/UiKit/button.ts"), "").unwrap();
        std::fs::write(root.join("src/UiKit/card.ts"), "").unwrap();
        std::fs::write(root.join("src/__tests__/card.test.ts"), "").unwrap();
        std::fs::write(root.join("src/_private.ts"), "").unwrap();

        let config = NamingConfig {
            enabled: true,
            rules: vec![kebab_rule()],
        };
        let result = scan(root, &config).unwrap();
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].file.as_deref(), Some("src/UiKit"));
    }

    #[test]
    fn test_exclude() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("legacy")).unwrap();
        std::fs::write(temp.path().join("legacy/OldThing.ts"), "").unwrap();

        let mut rule = kebab_rule();
        rule.exclude = vec!["legacy/**".to_string()];
        let config = NamingConfig {
            enabled: true,
            rules: vec![rule],
        };
        assert!(scan(temp.path(), &config).unwrap().passed);
    }
}
