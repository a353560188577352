//! AWS resource tagging policy via the Resource Groups Tagging API.

use std::collections::BTreeMap;

use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;

use crate::check::{CheckResult, Violation};
use crate::config::TaggingConfig;
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "tagging",
    name: "AWS Tagging",
    rule: "infra.tagging",
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Resources {
    #[serde(default)]
    resource_tag_mapping_list: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Resource {
    #[serde(rename = "ResourceARN")]
    resource_arn: String,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Tag {
    key: String,
    value: String,
}

pub struct Tagging {
    config: TaggingConfig,
}

impl Tagging {
    pub fn new(config: TaggingConfig) -> Self {
        Self { config }
    }

    fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["resourcegroupstaggingapi", "get-resources", "--output", "json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
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

        match parse_output(&output.stdout, &self.config) {
            Some(violations) => Ok(INFO.result(violations)),
            None => Ok(INFO.unparseable(&output)),
        }
    }
}

impl Tool for Tagging {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

/// Missing required tags and disallowed values, per resource.
pub fn parse_output(stdout: &str, config: &TaggingConfig) -> Option<Vec<Violation>> {
    let resources: Resources = serde_json::from_str(stdout.trim()).ok()?;
    let mut violations = Vec::new();

    for resource in resources.resource_tag_mapping_list {
        let tags: BTreeMap<&str, &str> = resource
            .tags
            .iter()
            .map(|t| (t.key.as_str(), t.value.as_str()))
            .collect();

        for key in &config.required {
            if !tags.contains_key(key.as_str()) {
                violations.push(
                    INFO.violation(format!(
                        "{} is missing required tag \"{}\"",
                        resource.resource_arn, key
                    ))
                    .code("missing-tag"),
                );
            }
        }

        for (key, allowed) in &config.values {
            let Some(value) = tags.get(key.as_str()) else {
                continue;
            };
            if !allowed.iter().any(|a| a.as_str() == *value) {
                violations.push(
                    INFO.violation(format!(
                        "{} has tag \"{}\" = \"{}\", allowed: {}",
                        resource.resource_arn,
                        key,
                        value,
                        allowed.join(", ")
                    ))
                    .code("invalid-tag-value"),
                );
            }
        }
    }

    Some(violations)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESOURCES: &str = r#"{"ResourceTagMappingList": [
      {"ResourceARN": "arn:aws:s3:::acme-assets",
       "Tags": [{"Key": "Owner", "Value": "platform"}, {"Key": "Environment", "Value": "prod"}]},
      {"ResourceARN": "arn:aws:ec2:eu-west-1:123456789012:instance/i-0abc",
       "Tags": [{"Key": "Environment", "Value": "qa"}]}
    ]}"#;

    fn config() -> TaggingConfig {
        let mut values = BTreeMap::new();
        values.insert(
            "Environment".to_string(),
            vec!["prod".to_string(), "staging".to_string()],
        );
        TaggingConfig {
            enabled: true,
            region: Some("eu-west-1".to_string()),
            required: vec!["Owner".to_string(), "Environment".to_string()],
            values,
        }
    }

    #[test]
    fn test_parse_output() {
        let violations = parse_output(RESOURCES, &config()).unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(
            violations[0].message,
            "arn:aws:ec2:eu-west-1:123456789012:instance/i-0abc is missing required tag \"Owner\""
        );
        assert_eq!(violations[1].code.as_deref(), Some("invalid-tag-value"));
    }

    #[test]
    fn test_args() {
        assert_eq!(
            Tagging::new(config()).args(),
            vec!["resourcegroupstaggingapi", "get-resources", "--output", "json", "--region", "eu-west-1"]
        );
    }
}
