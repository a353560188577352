//! Machine-readable description of the `check.toml` schema.
//!
//! Built from the serialized default configuration so it always tracks the
//! typed structs. Fields whose default is absent (optional values) and
//! enumerated strings are described through the lookup tables below.

use phf::phf_map;
use serde_json::{json, Map, Value};

use crate::config::{CaseStyle, Config, NamingRule, RulesetConfig};

/// Value type of fields that default to nothing.
static OPTIONAL_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "extends.registry" => "string",
    "settings.concurrency" => "integer",
    "code.linting.eslint.max_warnings" => "integer",
    "code.tests.required_dir" => "string",
    "code.quality.disable_comments.patterns" => "array",
    "process.branches.pattern" => "string",
    "process.commits.max_subject_length" => "integer",
    "process.pr.max_files" => "integer",
    "process.pr.max_lines" => "integer",
    "process.coverage.min_threshold" => "number",
    "process.repo.ruleset.required_reviews" => "integer",
    "process.repo.ruleset.dismiss_stale_reviews" => "boolean",
    "process.repo.ruleset.require_code_owner_reviews" => "boolean",
    "process.repo.ruleset.enforce_admins" => "boolean",
    "process.backups.region" => "string",
    "infra.tagging.region" => "string",
};

/// Tables keyed by user-chosen names rather than fixed fields.
static MAP_FIELDS: phf::Map<&'static str, &'static str> = phf_map! {
    "code.types.tsc.require" => "compilerOptions name -> required value",
    "process.hooks.commands" => "hook name -> commands",
    "process.ci.jobs" => "workflow file -> job ids",
    "process.ci.actions" => "workflow file -> action references",
    "process.ci.commands" => "workflow file -> commands",
    "infra.tagging.values" => "tag key -> allowed values",
};

static ENUMS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "process.coverage.enforce_in" => &["config", "ci", "both"],
    "code.naming.rules[].file_case" => &["kebab-case", "snake_case", "camelCase", "PascalCase"],
    "code.naming.rules[].folder_case" => &["kebab-case", "snake_case", "camelCase", "PascalCase"],
};

/// JSON description of every section and field with its type and default.
pub fn config_schema() -> anyhow::Result<Value> {
    let defaults = serde_json::to_value(Config::default())?;
    let mut root = describe("", &defaults)?;
    root["title"] = json!(crate::config::CONFIG_FILE_NAME);
    root["version"] = json!(env!("CARGO_PKG_VERSION"));
    Ok(root)
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn describe(path: &str, value: &Value) -> anyhow::Result<Value> {
    if let Some(meaning) = MAP_FIELDS.get(path) {
        return Ok(json!({ "type": "map", "description": meaning }));
    }

    let mut node = match value {
        Value::Object(fields) => {
            let mut properties = Map::new();
            for (key, field) in fields {
                let field_path = child_path(path, key);
                properties.insert(key.clone(), describe(&field_path, field)?);
            }
            if path == "process.repo" {
                let ruleset = serde_json::to_value(RulesetConfig::default())?;
                let mut described = describe("process.repo.ruleset", &ruleset)?;
                described["optional"] = json!(true);
                properties.insert("ruleset".to_string(), described);
            }
            json!({ "type": "table", "properties": properties })
        }
        Value::Null => {
            let kind = OPTIONAL_TYPES.get(path).copied().unwrap_or("any");
            json!({ "type": kind, "optional": true })
        }
        Value::Bool(_) => json!({ "type": "boolean", "default": value }),
        Value::Number(n) if n.is_f64() => json!({ "type": "number", "default": value }),
        Value::Number(_) => json!({ "type": "integer", "default": value }),
        Value::String(_) => json!({ "type": "string", "default": value }),
        Value::Array(_) => {
            let mut node = json!({ "type": "array", "default": value });
            if path == "code.naming.rules" {
                node["items"] = naming_rule_schema()?;
            }
            node
        }
    };

    if let Some(values) = ENUMS.get(path) {
        node["enum"] = json!(values);
    }
    Ok(node)
}

fn naming_rule_schema() -> anyhow::Result<Value> {
    let sample = NamingRule {
        extensions: Vec::new(),
        file_case: CaseStyle::Kebab,
        folder_case: CaseStyle::Kebab,
        exclude: Vec::new(),
    };
    let mut items = describe("code.naming.rules[]", &serde_json::to_value(sample)?)?;
    for required in ["extensions", "file_case", "folder_case"] {
        if let Some(field) = items["properties"].get_mut(required) {
            field["required"] = json!(true);
            if let Some(obj) = field.as_object_mut() {
                obj.remove("default");
            }
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describes_defaults() {
        let schema = config_schema().unwrap();
        let props = &schema["properties"];
        assert_eq!(schema["type"], "table");
        assert_eq!(props["settings"]["properties"]["timeout_secs"]["default"], 300);
        assert_eq!(
            props["code"]["properties"]["unused"]["properties"]["vulture"]["properties"]
                ["min_confidence"]["type"],
            "integer"
        );
        assert_eq!(
            props["process"]["properties"]["branches"]["properties"]["pattern"],
            json!({ "type": "string", "optional": true })
        );
    }

    #[test]
    fn test_enums_maps_and_nested_items() {
        let schema = config_schema().unwrap();
        let process = &schema["properties"]["process"]["properties"];
        assert_eq!(process["coverage"]["properties"]["enforce_in"]["enum"][1], "ci");
        assert_eq!(process["ci"]["properties"]["jobs"]["type"], "map");
        assert_eq!(process["repo"]["properties"]["ruleset"]["optional"], true);
        assert_eq!(
            process["repo"]["properties"]["ruleset"]["properties"]["branch"]["default"],
            "main"
        );

        let rules = &schema["properties"]["code"]["properties"]["naming"]["properties"]["rules"];
        let file_case = &rules["items"]["properties"]["file_case"];
        assert_eq!(file_case["required"], true);
        assert_eq!(file_case["enum"][3], "PascalCase");
    }
}
