//! Repository metadata client used by enrichment.

use reqwest::blocking::Client;
use serde::Deserialize;

use super::{decode, http_client, post};
use crate::error::{Error, Result};
use crate::identifier::RepoId;
use crate::model::{Metric, Repository, RepositoryKind};

const SERVICE: &str = "GitHub";

/// Trait for repository metadata lookups - allows mocking in tests
pub trait MetadataApi: Send + Sync {
    fn repository_metadata(&self, id: &RepoId) -> Result<RepositoryMetadata>;
}

/// Everything enrichment records about a repository.
///
/// Optional upstream values (license, latest release, primary language) are
/// empty strings when the platform reports none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryMetadata {
    pub commit_count: u64,
    pub open_issues: u64,
    pub closed_issues: u64,
    pub language_bytes: u64,
    pub stargazers: u64,
    pub license: String,
    pub created_at: String,
    pub latest_release: String,
    pub primary_language: String,
}

impl RepositoryMetadata {
    /// Fill the enrichment fields of `repository` and tag it primary.
    pub fn apply_to(&self, repository: &mut Repository) {
        repository.commit_count = Metric::Done(self.commit_count);
        repository.open_issues = Metric::Done(self.open_issues);
        repository.closed_issues = Metric::Done(self.closed_issues);
        repository.language_bytes = Metric::Done(self.language_bytes);
        repository.stargazers = Metric::Done(self.stargazers);
        repository.license = Metric::Done(self.license.clone());
        repository.created_at = Metric::Done(self.created_at.clone());
        repository.latest_release = Metric::Done(self.latest_release.clone());
        repository.primary_language = Metric::Done(self.primary_language.clone());
        repository.kind = Metric::Done(RepositoryKind::Primary);
    }
}

const METADATA_QUERY: &str = r#"query Metadata($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    defaultBranchRef {
      target {
        ... on Commit {
          history {
            totalCount
          }
        }
      }
    }
    openIssues: issues(states: OPEN) {
      totalCount
    }
    closedIssues: issues(states: CLOSED) {
      totalCount
    }
    languages {
      totalSize
    }
    stargazerCount
    licenseInfo {
      key
    }
    createdAt
    latestRelease {
      publishedAt
    }
    primaryLanguage {
      name
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct MetadataData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    default_branch_ref: Option<BranchRef>,
    open_issues: Total,
    closed_issues: Total,
    languages: Option<Languages>,
    stargazer_count: u64,
    license_info: Option<License>,
    created_at: String,
    latest_release: Option<Release>,
    primary_language: Option<Language>,
}

#[derive(Debug, Deserialize)]
struct BranchRef {
    target: Option<Target>,
}

#[derive(Debug, Deserialize)]
struct Target {
    history: Option<Total>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Total {
    total_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Languages {
    total_size: u64,
}

#[derive(Debug, Deserialize)]
struct License {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Release {
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Language {
    name: String,
}

/// Decode a metadata response body.
pub fn parse_metadata_response(body: &str) -> Result<RepositoryMetadata> {
    let data: MetadataData = decode(SERVICE, body)?;
    let node = data.repository.ok_or_else(|| Error::Api {
        service: SERVICE.to_string(),
        message: "repository not found".to_string(),
    })?;

    Ok(RepositoryMetadata {
        commit_count: node
            .default_branch_ref
            .and_then(|branch| branch.target)
            .and_then(|target| target.history)
            .map_or(0, |history| history.total_count),
        open_issues: node.open_issues.total_count,
        closed_issues: node.closed_issues.total_count,
        language_bytes: node.languages.map_or(0, |l| l.total_size),
        stargazers: node.stargazer_count,
        license: node.license_info.map(|l| l.key).unwrap_or_default(),
        created_at: node.created_at,
        latest_release: node
            .latest_release
            .and_then(|r| r.published_at)
            .unwrap_or_default(),
        primary_language: node.primary_language.map(|l| l.name).unwrap_or_default(),
    })
}

/// Blocking GitHub GraphQL client authenticated with a personal access token.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    endpoint: String,
    token: String,
}

impl GitHubClient {
    /// `username` is sent as the User-Agent, which GitHub requires.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>, username: &str) -> Result<Self> {
        let user_agent = if username.is_empty() {
            concat!("depsize/", env!("CARGO_PKG_VERSION")).to_string()
        } else {
            username.to_string()
        };
        Ok(Self {
            http: http_client(&user_agent)?,
            endpoint: endpoint.into(),
            token: token.into(),
        })
    }
}

impl MetadataApi for GitHubClient {
    fn repository_metadata(&self, id: &RepoId) -> Result<RepositoryMetadata> {
        let authorization = format!("bearer {}", self.token);
        let body = post(
            &self.http,
            SERVICE,
            &self.endpoint,
            Some(&authorization),
            METADATA_QUERY,
            serde_json::json!({ "owner": id.owner, "name": id.name }),
        )?;
        parse_metadata_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RESPONSE: &str = r#"{"data": {"repository": {
        "defaultBranchRef": {"target": {"history": {"totalCount": 10}}},
        "openIssues": {"totalCount": 0},
        "closedIssues": {"totalCount": 3},
        "languages": {"totalSize": 123456},
        "stargazerCount": 42,
        "licenseInfo": {"key": "mit"},
        "createdAt": "2019-03-01T10:00:00Z",
        "latestRelease": {"publishedAt": "2023-01-15T08:30:00Z"},
        "primaryLanguage": {"name": "Go"}
    }}}"#;

    #[test]
    fn test_parse_full_response() {
        let metadata = parse_metadata_response(FULL_RESPONSE).unwrap();
        assert_eq!(metadata.commit_count, 10);
        assert_eq!(metadata.open_issues, 0);
        assert_eq!(metadata.closed_issues, 3);
        assert_eq!(metadata.language_bytes, 123456);
        assert_eq!(metadata.stargazers, 42);
        assert_eq!(metadata.license, "mit");
        assert_eq!(metadata.latest_release, "2023-01-15T08:30:00Z");
        assert_eq!(metadata.primary_language, "Go");
    }

    #[test]
    fn test_parse_response_with_nulls() {
        let body = r#"{"data": {"repository": {
            "defaultBranchRef": null,
            "openIssues": {"totalCount": 1},
            "closedIssues": {"totalCount": 2},
            "languages": null,
            "stargazerCount": 0,
            "licenseInfo": null,
            "createdAt": "2020-01-01T00:00:00Z",
            "latestRelease": null,
            "primaryLanguage": null
        }}}"#;
        let metadata = parse_metadata_response(body).unwrap();
        assert_eq!(metadata.commit_count, 0);
        assert_eq!(metadata.license, "");
        assert_eq!(metadata.latest_release, "");
        assert_eq!(metadata.primary_language, "");
    }

    #[test]
    fn test_parse_missing_repository() {
        let body = r#"{"data": {"repository": null}}"#;
        assert!(matches!(
            parse_metadata_response(body),
            Err(Error::Api { .. })
        ));
    }

    #[test]
    fn test_apply_to_sets_fields_and_kind() {
        let metadata = parse_metadata_response(FULL_RESPONSE).unwrap();
        let mut repository = Repository::new("a", "github.com/org/a");
        metadata.apply_to(&mut repository);

        assert_eq!(repository.open_issues.to_string(), "0");
        assert_eq!(repository.closed_issues.to_string(), "3");
        assert_eq!(repository.commit_count.to_string(), "10");
        assert_eq!(repository.license.to_string(), "mit");
        assert_eq!(repository.kind, Metric::Done(RepositoryKind::Primary));
        assert!(repository.own_code_lines.is_pending());
    }
}
