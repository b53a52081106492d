/*
 * @file knowledge.rs
 * @brief Encyclopedia lookup through the MediaWiki API
 * @author Kevin Thomas
 * @date 2025
 *
 * MIT License
 *
 * Copyright (c) 2025 Kevin Thomas
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Knowledge lookup provider.
//!
//! Failures never escape this module: they come back as a sentence the
//! assistant can read out, carrying the reason.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AssistantError, Result};

const SERVICE: &str = "wikipedia";

const USER_AGENT: &str = concat!("jarvis/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Short encyclopedia summaries.
#[async_trait]
pub trait KnowledgeLookup: Send + Sync {
    /// Returns a summary of at most `sentences` sentences, or an error message.
    async fn summary(&self, query: &str, sentences: usize) -> String;
}

/// [`KnowledgeLookup`] backed by Wikipedia's `api.php`.
pub struct WikipediaClient {
    client: reqwest::Client,
    api_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Deserialize)]
struct ExtractResponse {
    query: ExtractQuery,
}

#[derive(Deserialize)]
struct ExtractQuery {
    pages: HashMap<String, Page>,
}

#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    extract: Option<String>,
}

impl WikipediaClient {
    /// Creates a client for the given `api.php` endpoint.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    async fn lookup(&self, query: &str, sentences: usize) -> Result<String> {
        let title = self.best_title(query).await?;
        debug!(query, title = %title, "wikipedia search hit");
        self.intro_extract(&title, sentences).await
    }

    /// Title of the top search result for `query`.
    async fn best_title(&self, query: &str) -> Result<String> {
        let response: SearchResponse = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srlimit", "1"),
                ("srsearch", query),
                ("format", "json"),
            ])
            .await?;
        response
            .query
            .search
            .into_iter()
            .next()
            .map(|hit| hit.title)
            .ok_or_else(|| {
                AssistantError::external(SERVICE, format!("no article matches '{}'", query))
            })
    }

    /// Plain-text intro of `title`, limited to `sentences` sentences.
    async fn intro_extract(&self, title: &str, sentences: usize) -> Result<String> {
        let sentences = sentences.max(1).to_string();
        let response: ExtractResponse = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("exsentences", &sentences),
                ("titles", title),
                ("format", "json"),
            ])
            .await?;
        response
            .query
            .pages
            .into_values()
            .find_map(|page| page.extract)
            .map(|extract| extract.trim().to_string())
            .filter(|extract| !extract.is_empty())
            .ok_or_else(|| {
                AssistantError::external(SERVICE, format!("'{}' has no summary", title))
            })
    }

    async fn get_json<T>(&self, params: &[(&str, &str)]) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .get(&self.api_url)
            .query(params)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AssistantError::external(SERVICE, e))?;
        response
            .json()
            .await
            .map_err(|e| AssistantError::external(SERVICE, e))
    }
}

#[async_trait]
impl KnowledgeLookup for WikipediaClient {
    async fn summary(&self, query: &str, sentences: usize) -> String {
        match self.lookup(query, sentences).await {
            Ok(summary) => summary,
            Err(err) => {
                warn!(query, error = %err, "wikipedia lookup failed");
                match err {
                    AssistantError::ExternalApi { reason, .. } => {
                        format!("Wikipedia search failed: {}", reason)
                    }
                    other => format!("Wikipedia search failed: {}", other),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> WikipediaClient {
        WikipediaClient::new(format!("{}/w/api.php", server.uri())).expect("client")
    }

    async fn mount_search(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("list", "search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn summary_returns_intro_extract() {
        let server = MockServer::start().await;
        mount_search(
            &server,
            json!({ "query": { "search": [ { "title": "Ada Lovelace" } ] } }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "extracts"))
            .and(query_param("titles", "Ada Lovelace"))
            .and(query_param("exsentences", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "pages": { "7": {
                    "title": "Ada Lovelace",
                    "extract": "Ada Lovelace was a mathematician. She wrote the first program."
                } } }
            })))
            .mount(&server)
            .await;

        let summary = client_for(&server).await.summary("ada lovelace", 2).await;
        assert_eq!(
            summary,
            "Ada Lovelace was a mathematician. She wrote the first program."
        );
    }

    #[tokio::test]
    async fn no_search_hit_is_reported() {
        let server = MockServer::start().await;
        mount_search(&server, json!({ "query": { "search": [] } })).await;

        let summary = client_for(&server).await.summary("qwxzzy", 2).await;
        assert_eq!(summary, "Wikipedia search failed: no article matches 'qwxzzy'");
    }

    #[tokio::test]
    async fn missing_extract_is_reported() {
        let server = MockServer::start().await;
        mount_search(&server, json!({ "query": { "search": [ { "title": "Void" } ] } })).await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "extracts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "pages": { "-1": { "title": "Void", "missing": "" } } }
            })))
            .mount(&server)
            .await;

        let summary = client_for(&server).await.summary("void", 2).await;
        assert_eq!(summary, "Wikipedia search failed: 'Void' has no summary");
    }

    #[tokio::test]
    async fn server_error_carries_reason() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let summary = client_for(&server).await.summary("rust", 2).await;
        assert!(summary.starts_with("Wikipedia search failed: "), "{summary}");
        assert!(summary.contains("503"), "{summary}");
    }
}
