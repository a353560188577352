//! ESLint through the full pipeline, with `npx` replaced by a stub that
//! prints what `eslint --format json` reports for `var x = 1`.
//!
//! Kept in its own test binary because it rewrites `PATH`.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use healthgate::check::{self, Domain, Mode, Severity, EXIT_VIOLATIONS};
use healthgate::config;
use tempfile::TempDir;

const FAKE_NPX: &str = r#"#!/bin/sh
if [ "$1" != "eslint" ]; then
  echo "unexpected tool: $1" >&2
  exit 127
fi
root="$(pwd -P)"
cat <<JSON
[{"filePath":"$root/src/index.js","messages":[{"ruleId":"no-var","severity":2,"message":"Unexpected var, use let or const instead.","line":1,"column":1}],"errorCount":1,"warningCount":0}]
JSON
exit 1
"#;

#[tokio::test]
async fn test_no_var_fails_the_run() {
    let bin = TempDir::new().unwrap();
    let npx = bin.path().join("npx");
    std::fs::write(&npx, FAKE_NPX).unwrap();
    std::fs::set_permissions(&npx, std::fs::Permissions::from_mode(0o755)).unwrap();
    let path = std::env::var("PATH").unwrap_or_default();
    std::env::set_var("PATH", format!("{}:{}", bin.path().display(), path));

    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata/projects/eslint")
        .join(config::CONFIG_FILE_NAME);
    let loaded = config::load(&config_path).await.unwrap();
    let result = check::run_project(&loaded, &[Domain::Code], Mode::Check).await;

    assert_eq!(result.exit_code(), EXIT_VIOLATIONS);
    let code = result.domain(Domain::Code).unwrap();
    assert_eq!(code.checks[0].name, "ESLint");
    let violation = &code.checks[0].violations[0];
    assert_eq!(violation.code.as_deref(), Some("no-var"));
    assert_eq!(violation.file.as_deref(), Some("src/index.js"));
    assert_eq!(violation.line, Some(1));
    assert_eq!(violation.severity, Severity::Error);
}
