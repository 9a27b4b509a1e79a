//! Title/author to catalog metadata, best effort.
//!
//! Search and scrape failures stop here: callers only ever see a
//! [`ResolvedMetadata`], with `None` fields standing in for anything that
//! could not be found.

use crate::book::{BookQuery, ResolvedMetadata};
use crate::config::SearchCredentials;
use crate::scraper::PageExtractor;
use crate::search::SearchResolver;

#[derive(Debug, Clone)]
pub struct MetadataResolver {
    search: SearchResolver,
    pages: PageExtractor,
}

impl MetadataResolver {
    pub fn new(search: SearchResolver, pages: PageExtractor) -> Self {
        Self { search, pages }
    }

    /// Resolve `query` to its detail page and scrape it.
    ///
    /// `canonical_url` is only set once the page was fetched and parsed; a
    /// failed scrape returns the all-empty record even though a URL was found.
    pub async fn resolve(
        &self,
        query: &BookQuery,
        credentials: &SearchCredentials,
    ) -> ResolvedMetadata {
        let url = match self.search.resolve(query, credentials).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                tracing::info!(title = %query.title, "no catalog page found");
                return ResolvedMetadata::empty();
            }
            Err(e) => {
                tracing::warn!(title = %query.title, error = %e, "catalog search failed");
                return ResolvedMetadata::empty();
            }
        };

        match self.pages.extract(&url).await {
            Ok(metadata) => ResolvedMetadata {
                canonical_url: Some(url),
                ..metadata
            },
            Err(e) => {
                tracing::warn!(%url, error = %e, "catalog page scrape failed");
                ResolvedMetadata::empty()
            }
        }
    }
}
