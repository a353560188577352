//! Knip adapter (unused files, dependencies and exports).

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::check::{CheckResult, Severity, Violation};
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "knip",
    name: "Knip",
    rule: "code.unused.knip",
};

/// Issue categories reported per file, with the label used in messages.
const CATEGORIES: &[(&str, &str)] = &[
    ("dependencies", "Unused dependency"),
    ("devDependencies", "Unused devDependency"),
    ("optionalPeerDependencies", "Unused optional peer dependency"),
    ("unlisted", "Unlisted dependency"),
    ("binaries", "Unlisted binary"),
    ("unresolved", "Unresolved import"),
    ("exports", "Unused export"),
    ("nsExports", "Unused namespace export"),
    ("types", "Unused type"),
    ("nsTypes", "Unused namespace type"),
    ("enumMembers", "Unused enum member"),
    ("classMembers", "Unused class member"),
    ("duplicates", "Duplicate export"),
];

pub struct Knip;

impl Knip {
    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        if !ctx.exists("package.json") {
            return Ok(INFO.skip("No package.json found"));
        }

        let output = match ctx
            .exec("npx", &["knip", "--reporter", "json", "--no-progress"])
            .await
        {
            Ok(o) => o,
            Err(e) => return Ok(INFO.exec_failure(e)),
        };
        if let Some(skip) = INFO.missing_tool(&output) {
            return Ok(skip);
        }

        match parse_output(&output.stdout) {
            Some(violations) if !violations.is_empty() || output.success() => {
                Ok(INFO.result(violations))
            }
            None if output.success() => Ok(INFO.pass()),
            _ => Ok(INFO.unparseable(&output)),
        }
    }
}

impl Tool for Knip {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

/// Parse `knip --reporter json`.
///
/// Unused files come either as a top-level `files` array of paths or as
/// per-issue `files` entries; every other category is a list of
/// `{ name, line?, col? }` objects under the issue's file.
pub fn parse_output(stdout: &str) -> Option<Vec<Violation>> {
    let report: Value = serde_json::from_str(stdout.trim()).ok()?;
    let mut violations = Vec::new();

    if let Some(files) = report.get("files").and_then(Value::as_array) {
        for file in files.iter().filter_map(Value::as_str) {
            violations.push(unused_file(file));
        }
    }

    let issues = report.get("issues").and_then(Value::as_array)?;
    for issue in issues {
        let Some(file) = issue.get("file").and_then(Value::as_str) else {
            continue;
        };

        if let Some(files) = issue.get("files") {
            let flagged = match files {
                Value::Bool(b) => *b,
                Value::Array(a) => !a.is_empty(),
                _ => false,
            };
            if flagged && !violations.iter().any(|v| v.file.as_deref() == Some(file)) {
                violations.push(unused_file(file));
            }
        }

        for (key, label) in CATEGORIES {
            let Some(items) = issue.get(*key).and_then(Value::as_array) else {
                continue;
            };
            for item in items {
                let Some(name) = item_name(item) else {
                    continue;
                };
                let mut v = INFO
                    .violation(format!("{}: {}", label, name))
                    .file(file.to_string())
                    .code(key.to_string())
                    .severity(Severity::Warning);
                if let Some(line) = item.get("line").and_then(Value::as_u64) {
                    let col = item.get("col").and_then(Value::as_u64).map(|c| c as u32);
                    v = v.at(line as u32, col);
                }
                violations.push(v);
            }
        }
    }

    Some(violations)
}

fn unused_file(file: &str) -> Violation {
    INFO.violation("Unused file")
        .file(file.to_string())
        .code("files")
        .severity(Severity::Warning)
}

/// `duplicates` entries are arrays of names; everything else has `name`.
fn item_name(item: &Value) -> Option<String> {
    match item {
        Value::Object(_) => item.get("name").and_then(Value::as_str).map(str::to_string),
        Value::Array(names) => {
            let names: Vec<&str> = names
                .iter()
                .filter_map(|n| n.get("name").and_then(Value::as_str).or_else(|| n.as_str()))
                .collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output() {
        let json = r#"{
          "files": ["src/orphan.ts"],
          "issues": [
            {"file": "package.json", "dependencies": [{"name": "lodash", "line": 12, "col": 6}], "devDependencies": []},
            {"file": "src/util.ts", "exports": [{"name": "unusedHelper", "line": 3, "col": 17}], "types": [{"name": "Shape", "line": 9, "col": 13}]}
          ]
        }"#;
        let violations = parse_output(json).unwrap();
        assert_eq!(violations.len(), 4);
        assert_eq!(violations[0].message, "Unused file");
        assert_eq!(violations[1].message, "Unused dependency: lodash");
        assert_eq!(violations[1].line, Some(12));
        assert_eq!(violations[2].code.as_deref(), Some("exports"));
        assert!(violations.iter().all(|v| v.severity == Severity::Warning));
    }

    #[test]
    fn test_parse_clean() {
        let violations = parse_output(r#"{"files": [], "issues": []}"#).unwrap();
        assert!(violations.is_empty());
        assert!(parse_output("not json").is_none());
    }
}
