//! S3 backup freshness.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;

use crate::check::{CheckResult, Violation};
use crate::config::BackupsConfig;
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "backups",
    name: "Backups",
    rule: "process.backups",
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Listing {
    #[serde(default)]
    contents: Vec<Object>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Object {
    key: String,
    last_modified: String,
}

pub struct Backups {
    config: BackupsConfig,
}

impl Backups {
    pub fn new(config: BackupsConfig) -> Self {
        Self { config }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "s3api".to_string(),
            "list-objects-v2".to_string(),
            "--bucket".to_string(),
            self.config.bucket.clone(),
            "--output".to_string(),
            "json".to_string(),
        ];
        if !self.config.prefix.is_empty() {
            args.extend(["--prefix".to_string(), self.config.prefix.clone()]);
        }
        if let Some(region) = &self.config.region {
            args.extend(["--region".to_string(), region.clone()]);
        }
        args
    }

    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        let args = self.args();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = match ctx.exec("aws", &arg_refs).await {
            Ok(o) => o,
            Err(e) => return Ok(INFO.exec_failure(e)),
        };
        if !output.success() {
            return Ok(INFO.unparseable(&output));
        }

        match evaluate(&output.stdout, &self.config, Utc::now()) {
            Some(violations) => Ok(INFO.result(violations)),
            None => Ok(INFO.unparseable(&output)),
        }
    }
}

impl Tool for Backups {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

/// Check the newest object of a `list-objects-v2` listing against the
/// maximum age. `None` when the listing cannot be parsed.
pub fn evaluate(stdout: &str, config: &BackupsConfig, now: DateTime<Utc>) -> Option<Vec<Violation>> {
    let location = format!("s3://{}/{}", config.bucket, config.prefix);
    // An empty prefix yields no output at all.
    let listing: Listing = if stdout.trim().is_empty() {
        Listing { contents: Vec::new() }
    } else {
        serde_json::from_str(stdout).ok()?
    };

    let newest = listing
        .contents
        .iter()
        .filter_map(|o| {
            DateTime::parse_from_rfc3339(&o.last_modified)
                .ok()
                .map(|t| (t.with_timezone(&Utc), &o.key))
        })
        .max_by_key(|(t, _)| *t);

    let Some((modified, key)) = newest else {
        return Some(vec![INFO
            .violation(format!("No backups found in {}", location))
            .file(location)]);
    };

    let age = now - modified;
    let max_age = i64::try_from(config.max_age_hours)
        .ok()
        .and_then(Duration::try_hours)
        .unwrap_or(Duration::MAX);
    if age > max_age {
        return Some(vec![INFO
            .violation(format!(
                "Latest backup {} is {} hours old, max {}",
                key,
                age.num_hours(),
                config.max_age_hours
            ))
            .file(location)]);
    }
    Some(Vec::new())
}
