//! Code search client used by discovery.

use reqwest::blocking::Client;
use serde::Deserialize;

use super::{decode, http_client, post};
use crate::error::Result;

const SERVICE: &str = "Sourcegraph";

/// Trait for repository search - allows mocking in tests
pub trait SearchApi: Send + Sync {
    /// Repository names matching `query`, in result order.
    fn search_repositories(&self, query: &SearchQuery) -> Result<Vec<String>>;
}

/// Which repositories to look for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub language: String,
    pub manifest_file: String,
    pub count: usize,
}

impl SearchQuery {
    /// The search expression: repositories in `language` that carry
    /// `manifest_file`, capped at `count` results.
    pub fn expression(&self) -> String {
        format!(
            "lang:{} AND select:repo AND repohasfile:{} AND count:{}",
            self.language, self.manifest_file, self.count
        )
    }
}

const SEARCH_QUERY: &str = r#"query Search($query: String!) {
  search(query: $query, version: V2) {
    results {
      repositories {
        name
      }
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct SearchData {
    search: Option<Search>,
}

#[derive(Debug, Deserialize)]
struct Search {
    results: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    repositories: Vec<RepositoryName>,
}

#[derive(Debug, Deserialize)]
struct RepositoryName {
    name: String,
}

/// Decode a search response body into repository names.
pub fn parse_search_response(body: &str) -> Result<Vec<String>> {
    let data: SearchData = decode(SERVICE, body)?;
    Ok(data
        .search
        .map(|search| {
            search
                .results
                .repositories
                .into_iter()
                .map(|repository| repository.name)
                .collect()
        })
        .unwrap_or_default())
}

/// Blocking Sourcegraph GraphQL client.
#[derive(Debug, Clone)]
pub struct SourcegraphClient {
    http: Client,
    endpoint: String,
    token: Option<String>,
}

impl SourcegraphClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self> {
        Ok(Self {
            http: http_client(concat!("depsize/", env!("CARGO_PKG_VERSION")))?,
            endpoint: endpoint.into(),
            token,
        })
    }
}

impl SearchApi for SourcegraphClient {
    fn search_repositories(&self, query: &SearchQuery) -> Result<Vec<String>> {
        let authorization = self.token.as_ref().map(|t| format!("token {}", t));
        let body = post(
            &self.http,
            SERVICE,
            &self.endpoint,
            authorization.as_deref(),
            SEARCH_QUERY,
            serde_json::json!({ "query": query.expression() }),
        )?;
        parse_search_response(&body)
    }
}
