//! GitHub access through the `gh` CLI.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::tools::exec::{self, ExecError};
use crate::tools::process::git;
use crate::tools::ToolContext;

lazy_static! {
    static ref REMOTE: Regex =
        Regex::new(r"github\.com[:/]([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/?$").unwrap();
}

#[derive(Debug, Error)]
pub enum GhError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("gh api {endpoint} failed: {message}")]
    Api { endpoint: String, message: String },

    #[error("gh api {endpoint} returned invalid JSON: {source}")]
    Json {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// `owner/name` of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRepo {
    pub owner: String,
    pub name: String,
}

impl GithubRepo {
    /// Parse an SSH or HTTPS remote URL.
    pub fn from_remote(url: &str) -> Option<Self> {
        let caps = REMOTE.captures(url.trim())?;
        Some(Self {
            owner: caps[1].to_string(),
            name: caps[2].to_string(),
        })
    }

    /// Parse `owner/name`, as found in `GITHUB_REPOSITORY`.
    pub fn from_slug(slug: &str) -> Option<Self> {
        let (owner, name) = slug.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn protection_endpoint(&self, branch: &str) -> String {
        format!(
            "repos/{}/{}/branches/{}/protection",
            self.owner, self.name, branch
        )
    }
}

impl std::fmt::Display for GithubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// The repository being checked, from `GITHUB_REPOSITORY` or `origin`.
pub async fn resolve_repo(ctx: &ToolContext) -> Result<Option<GithubRepo>, ExecError> {
    if let Some(repo) = std::env::var("GITHUB_REPOSITORY")
        .ok()
        .and_then(|s| GithubRepo::from_slug(&s))
    {
        return Ok(Some(repo));
    }
    Ok(git::origin_url(ctx)
        .await?
        .and_then(|url| GithubRepo::from_remote(&url)))
}

fn is_not_found(stderr: &str) -> bool {
    stderr.contains("HTTP 404") || stderr.contains("Not Found")
}

/// `GET` an endpoint. `None` on 404.
pub async fn api_get(ctx: &ToolContext, endpoint: &str) -> Result<Option<Value>, GhError> {
    let output = ctx.exec("gh", &["api", endpoint]).await?;
    if !output.success() {
        if is_not_found(&output.stderr) || is_not_found(&output.stdout) {
            return Ok(None);
        }
        return Err(GhError::Api {
            endpoint: endpoint.to_string(),
            message: output.excerpt(),
        });
    }
    serde_json::from_str(&output.stdout)
        .map(Some)
        .map_err(|source| GhError::Json {
            endpoint: endpoint.to_string(),
            source,
        })
}

/// `PUT` a JSON body to an endpoint.
pub async fn api_put(ctx: &ToolContext, endpoint: &str, body: &Value) -> Result<Value, GhError> {
    let input = serde_json::to_vec(body).map_err(|source| GhError::Json {
        endpoint: endpoint.to_string(),
        source,
    })?;
    let output = exec::run_with_input(
        "gh",
        &["api", "--method", "PUT", endpoint, "--input", "-"],
        &ctx.root,
        ctx.timeout,
        &input,
    )
    .await?;
    if !output.success() {
        return Err(GhError::Api {
            endpoint: endpoint.to_string(),
            message: output.excerpt(),
        });
    }
    serde_json::from_str(&output.stdout).map_err(|source| GhError::Json {
        endpoint: endpoint.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_remote() {
        let expected = Some(GithubRepo {
            owner: "acme".to_string(),
            name: "widgets".to_string(),
        });
        assert_eq!(GithubRepo::from_remote("git@github.com:acme/widgets.git"), expected);
        assert_eq!(GithubRepo::from_remote("https://github.com/acme/widgets"), expected);
        assert_eq!(GithubRepo::from_remote("https://github.com/acme/widgets.git\n"), expected);
        assert_eq!(GithubRepo::from_remote("git@gitlab.com:acme/widgets.git"), None);
    }

    #[test]
    fn test_from_slug() {
        let repo = GithubRepo::from_slug("acme/widgets").unwrap();
        assert_eq!(repo.to_string(), "acme/widgets");
        assert_eq!(
            repo.protection_endpoint("main"),
            "repos/acme/widgets/branches/main/protection"
        );
        assert!(GithubRepo::from_slug("acme").is_none());
    }
}
