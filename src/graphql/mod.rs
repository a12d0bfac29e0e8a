//! # GraphQL Clients
//!
//! Blocking clients for the two GraphQL services the pipeline talks to:
//!
//! - **`sourcegraph`**: code search, used by discovery to find candidate
//!   repositories that carry a manifest file.
//! - **`github`**: repository metadata, used by enrichment.
//!
//! Each service sits behind a trait (`SearchApi`, `MetadataApi`) so the
//! stages can be tested against canned responses. Response decoding is kept
//! in plain functions over the response body for the same reason.

pub mod github;
pub mod sourcegraph;

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

pub use github::{GitHubClient, MetadataApi, RepositoryMetadata};
pub use sourcegraph::{SearchApi, SearchQuery, SourcegraphClient};

/// Request timeout for a single GraphQL call.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    message: String,
}

pub(crate) fn http_client(user_agent: &str) -> Result<Client> {
    Ok(Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(user_agent)
        .build()?)
}

/// POST `{"query": .., "variables": ..}` and return the raw body of a
/// successful response.
pub(crate) fn post(
    client: &Client,
    service: &str,
    endpoint: &str,
    authorization: Option<&str>,
    query: &str,
    variables: Value,
) -> Result<String> {
    let body = serde_json::json!({ "query": query, "variables": variables });
    let mut request = client
        .post(endpoint)
        .header("Accept", "application/json")
        .json(&body);
    if let Some(authorization) = authorization {
        request = request.header("Authorization", authorization);
    }

    let response = request.send()?;
    let status = response.status();
    let text = response.text()?;
    debug!("{} responded with {}", service, status);

    if !status.is_success() {
        return Err(Error::Api {
            service: service.to_string(),
            message: format!("HTTP {}: {}", status, truncate(&text, 200)),
        });
    }
    Ok(text)
}

/// Decode a GraphQL response body, surfacing the `errors` array.
pub(crate) fn decode<T: DeserializeOwned>(service: &str, body: &str) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    if !envelope.errors.is_empty() {
        return Err(Error::GraphQl {
            service: service.to_string(),
            messages: envelope.errors.into_iter().map(|e| e.message).collect(),
        });
    }
    envelope.data.ok_or_else(|| Error::Api {
        service: service.to_string(),
        message: "response has no data".to_string(),
    })
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
