//! Semantic validation beyond what the schema types enforce.

use regex::Regex;

use super::{Config, ConfigError};
use crate::files::{compile_glob, split_patterns};

/// Validate a configuration, reporting every problem found.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let mut problems = Vec::new();

    if config.settings.concurrency == Some(0) {
        problems.push("settings.concurrency must be at least 1".to_string());
    }
    if config.settings.timeout_secs == 0 {
        problems.push("settings.timeout_secs must be at least 1".to_string());
    }
    for pattern in &config.monorepo.exclude {
        check_glob(&mut problems, "monorepo.exclude", pattern);
    }

    let code = &config.code;
    if code.unused.vulture.min_confidence > 100 {
        problems.push("code.unused.vulture.min_confidence must be between 0 and 100".to_string());
    }

    if code.tests.enabled {
        let patterns = split_patterns(&code.tests.pattern);
        if patterns.is_empty() {
            problems.push("code.tests.pattern must not be empty".to_string());
        }
        for pattern in &patterns {
            check_glob(&mut problems, "code.tests.pattern", pattern);
        }
    }

    for (i, rule) in code.naming.rules.iter().enumerate() {
        if rule.extensions.is_empty() {
            problems.push(format!("code.naming.rules[{}].extensions must not be empty", i));
        }
        for pattern in &rule.exclude {
            check_glob(&mut problems, &format!("code.naming.rules[{}].exclude", i), pattern);
        }
    }

    let disable = &code.quality.disable_comments;
    if let Some(patterns) = &disable.patterns {
        if patterns.iter().any(|p| p.trim().is_empty()) {
            problems.push("code.quality.disable_comments.patterns must not contain empty strings".to_string());
        }
    }
    for pattern in &disable.exclude {
        check_glob(&mut problems, "code.quality.disable_comments.exclude", pattern);
    }

    let process = &config.process;
    if let Some(pattern) = &process.branches.pattern {
        check_regex(&mut problems, "process.branches.pattern", pattern);
    }
    if process.tickets.enabled {
        if process.tickets.pattern.trim().is_empty() {
            problems.push("process.tickets.pattern is required when tickets are enabled".to_string());
        } else {
            check_regex(&mut problems, "process.tickets.pattern", &process.tickets.pattern);
        }
    }
    if let Some(threshold) = process.coverage.min_threshold {
        if !(0.0..=100.0).contains(&threshold) {
            problems.push("process.coverage.min_threshold must be between 0 and 100".to_string());
        }
    }
    if process.backups.enabled && process.backups.bucket.trim().is_empty() {
        problems.push("process.backups.bucket is required when backups are enabled".to_string());
    }

    let tagging = &config.infra.tagging;
    if tagging.enabled && tagging.required.is_empty() && tagging.values.is_empty() {
        problems.push("infra.tagging needs `required` tags or allowed `values`".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(problems))
    }
}

fn check_glob(problems: &mut Vec<String>, key: &str, pattern: &str) {
    if let Err(e) = compile_glob(pattern) {
        problems.push(format!("{}: invalid glob {:?}: {}", key, pattern, e));
    }
}

fn check_regex(problems: &mut Vec<String>, key: &str, pattern: &str) {
    if let Err(e) = Regex::new(pattern) {
        problems.push(format!("{}: invalid regex {:?}: {}", key, pattern, e));
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{parse_str, ConfigError};

    #[test]
    fn test_collects_every_problem() {
        let err = parse_str(
            r#"
[process.branches]
enabled = true
pattern = "feature/(unclosed"

[process.tickets]
enabled = true

[process.coverage]
enabled = true
min_threshold = 140.0
"#,
        )
        .unwrap_err();

        match err {
            ConfigError::Invalid(problems) => {
                assert_eq!(problems.len(), 3, "{:?}", problems);
                assert!(problems[0].contains("process.branches.pattern"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_brace_patterns_are_valid() {
        parse_str(
            "[code.tests]\nenabled = true\npattern = \"**/*.{test,spec}.ts,**/test_*.py\"\n",
        )
        .unwrap();
    }
}
