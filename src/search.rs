//! Resolve a book to its catalog detail page through web search.
//!
//! Results are scanned in the order the search API returns them and the
//! first URL containing the catalog's detail path wins. Nothing checks that
//! the page is actually about the queried book, so common titles can land
//! on the wrong edition or work.

use crate::book::BookQuery;
use crate::config::SearchCredentials;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    FetchError(#[from] reqwest::Error),
    #[error("search API returned {0}")]
    Status(StatusCode),
    #[error("invalid search endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("search credentials are missing")]
    MissingCredentials,
    #[error("book title is required")]
    EmptyTitle,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// One search hit. Only the link matters.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub link: Option<String>,
}

/// Web search scoped to a catalog site.
#[derive(Debug, Clone)]
pub struct SearchResolver {
    client: Client,
    endpoint: String,
    site: String,
    detail_path: String,
}

impl SearchResolver {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        site: impl Into<String>,
        detail_path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            site: site.into(),
            detail_path: detail_path.into(),
        }
    }

    /// Find the detail page URL for `query`, if the search turns one up.
    pub async fn resolve(
        &self,
        query: &BookQuery,
        credentials: &SearchCredentials,
    ) -> Result<Option<String>, SearchError> {
        if !query.is_valid() {
            return Err(SearchError::EmptyTitle);
        }
        if !credentials.is_complete() {
            return Err(SearchError::MissingCredentials);
        }

        let q = build_query(query, &self.site);
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("q", q.as_str()),
                ("key", credentials.api_key.as_str()),
                ("cx", credentials.cx.as_str()),
            ],
        )?;

        tracing::debug!(query = %q, "searching catalog");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SearchError::Status(response.status()));
        }
        let results: SearchResponse = response.json().await?;

        Ok(pick_detail_url(&results.items, &self.detail_path))
    }
}

/// `"<title> <author> site:<domain>"`, skipping the author when there is none.
pub fn build_query(query: &BookQuery, site: &str) -> String {
    let mut parts = vec![query.title.trim()];
    if let Some(author) = query.author.as_deref() {
        parts.push(author.trim());
    }
    let site = format!("site:{site}");
    parts.push(&site);
    parts.join(" ")
}

/// First result, in received order, whose link contains `detail_path`.
pub fn pick_detail_url(items: &[SearchItem], detail_path: &str) -> Option<String> {
    items
        .iter()
        .filter_map(|item| item.link.as_deref())
        .find(|link| link.contains(detail_path))
        .map(str::to_string)
}
