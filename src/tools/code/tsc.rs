//! TypeScript compiler adapter (`tsc --noEmit`).
//!
//! `audit` reads `tsconfig.json` (JSON with comments) and verifies the
//! compiler options required by `code.types.tsc.require`.

use futures::future::{self, BoxFuture, FutureExt};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

use crate::check::{CheckResult, Severity, Violation};
use crate::config::TscConfig;
use crate::tools::{strip_ansi, Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "tsc",
    name: "TypeScript",
    rule: "code.types.tsc",
};

lazy_static! {
    /// `src/a.ts(12,5): error TS2322: Type 'string' is not assignable...`
    static ref DIAGNOSTIC: Regex =
        Regex::new(r"^(.+?)\((\d+),(\d+)\):\s+(error|warning)\s+(TS\d+):\s+(.+)$").unwrap();
    /// Project-level diagnostics without a location.
    static ref GLOBAL_DIAGNOSTIC: Regex =
        Regex::new(r"^(error|warning)\s+(TS\d+):\s+(.+)$").unwrap();
}

pub struct Tsc {
    config: TscConfig,
}

impl Tsc {
    pub fn new(config: TscConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        if !ctx.exists("tsconfig.json") {
            return Ok(INFO.result(vec![INFO.violation("tsconfig.json not found")]));
        }

        let output = match ctx.exec("npx", &["tsc", "--noEmit", "--pretty", "false"]).await {
            Ok(o) => o,
            Err(e) => return Ok(INFO.exec_failure(e)),
        };
        if let Some(skip) = INFO.missing_tool(&output) {
            return Ok(skip);
        }
        if output.success() {
            return Ok(INFO.pass());
        }

        let violations = parse_output(&output.combined());
        if violations.is_empty() {
            Ok(INFO.unparseable(&output))
        } else {
            Ok(INFO.result(violations))
        }
    }

    fn audit_sync(&self, ctx: &ToolContext) -> CheckResult {
        let path = ctx.root.join("tsconfig.json");
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(_) => return INFO.result(vec![INFO.violation("tsconfig.json not found")]),
        };
        let tsconfig: serde_json::Value = match serde_json::from_str(&strip_jsonc(&text)) {
            Ok(v) => v,
            Err(e) => {
                return INFO.result(vec![INFO
                    .violation(format!("tsconfig.json is not valid JSON: {}", e))
                    .file("tsconfig.json")])
            }
        };
        INFO.result(check_required_options(&tsconfig, &self.config.require))
    }
}

impl Tool for Tsc {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }

    fn audit<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        future::ready(Ok(self.audit_sync(ctx))).boxed()
    }
}

/// Parse `tsc --pretty false` diagnostics; ANSI codes are stripped first.
pub fn parse_output(text: &str) -> Vec<Violation> {
    let clean = strip_ansi(text);
    let mut violations = Vec::new();

    for line in clean.lines() {
        let line = line.trim_end();
        if let Some(caps) = DIAGNOSTIC.captures(line) {
            let line_no = caps[2].parse().unwrap_or(0);
            let col = caps[3].parse().ok();
            violations.push(
                INFO.violation(caps[6].to_string())
                    .file(caps[1].trim().to_string())
                    .at(line_no, col)
                    .code(caps[5].to_string())
                    .severity(level(&caps[4])),
            );
        } else if let Some(caps) = GLOBAL_DIAGNOSTIC.captures(line.trim_start()) {
            violations.push(
                INFO.violation(caps[3].to_string())
                    .code(caps[2].to_string())
                    .severity(level(&caps[1])),
            );
        }
    }

    violations
}

fn level(s: &str) -> Severity {
    if s == "warning" {
        Severity::Warning
    } else {
        Severity::Error
    }
}

/// Compare `compilerOptions` against the required values.
pub fn check_required_options(
    tsconfig: &serde_json::Value,
    required: &BTreeMap<String, toml::Value>,
) -> Vec<Violation> {
    let options = tsconfig.get("compilerOptions");
    let mut violations = Vec::new();

    for (key, expected) in required {
        let expected_json = match serde_json::to_value(expected) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let actual = options.and_then(|o| o.get(key));
        match actual {
            Some(value) if *value == expected_json => {}
            Some(value) => violations.push(
                INFO.violation(format!(
                    "compilerOptions.{} is {}, expected {}",
                    key, value, expected_json
                ))
                .file("tsconfig.json"),
            ),
            None => violations.push(
                INFO.violation(format!(
                    "compilerOptions.{} is not set, expected {}",
                    key, expected_json
                ))
                .file("tsconfig.json"),
            ),
        }
    }

    violations
}

/// Remove `//` and `/* */` comments and trailing commas outside strings.
pub fn strip_jsonc(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let ch = chars[i];
        if in_string {
            out.push(ch);
            if ch == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if ch == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i += 2;
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(ch);
                }
                i += 1;
            }
            _ => {
                out.push(ch);
                i += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output() {
        let text = "\x1b[96msrc/index.ts\x1b[0m(3,7): error TS2322: Type 'string' is not assignable to type 'number'.\nsrc/util.ts(10,1): error TS2304: Cannot find name 'foo'.\nerror TS5023: Unknown compiler option 'bogus'.\n";
        let violations = parse_output(text);
        assert_eq!(violations.len(), 3);
        assert_eq!(violations[0].file.as_deref(), Some("src/index.ts"));
        assert_eq!(violations[0].line, Some(3));
        assert_eq!(violations[0].column, Some(7));
        assert_eq!(violations[0].code.as_deref(), Some("TS2322"));
        assert!(violations[2].file.is_none());
    }

    #[test]
    fn test_strip_jsonc() {
        let text = r#"{
  // comment
  "compilerOptions": {
    "strict": true, /* inline */
    "paths": {"@/*": ["./src/*"]},
    "outDir": "dist//x",
  },
}"#;
        let value: serde_json::Value = serde_json::from_str(&strip_jsonc(text)).unwrap();
        assert_eq!(value["compilerOptions"]["strict"], true);
        assert_eq!(value["compilerOptions"]["outDir"], "dist//x");
    }

    #[test]
    fn test_required_options() {
        let tsconfig = serde_json::json!({"compilerOptions": {"strict": false, "target": "ES2022"}});
        let mut required = BTreeMap::new();
        required.insert("strict".to_string(), toml::Value::Boolean(true));
        required.insert("noUncheckedIndexedAccess".to_string(), toml::Value::Boolean(true));
        required.insert("target".to_string(), toml::Value::String("ES2022".to_string()));

        let violations = check_required_options(&tsconfig, &required);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.contains("noUncheckedIndexedAccess is not set"));
        assert!(violations[1].message.contains("strict is false"));
    }
}
