//! A reader's "read" shelf on the catalog site.
//!
//! The shelf is only used to steer the model away from books the reader
//! already knows, so every failure here degrades to an empty list.

use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

#[derive(Debug, Clone)]
pub struct ReadListProvider {
    client: Client,
    base_url: String,
}

impl ReadListProvider {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Titles on `user_id`'s read shelf. Empty for an empty id or on any error.
    pub async fn read_titles(&self, user_id: &str) -> Vec<String> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Vec::new();
        }

        match self.fetch_shelf(user_id).await {
            Ok(html) => {
                let titles = parse_read_titles(&html);
                tracing::info!(user_id, count = titles.len(), "loaded read shelf");
                titles
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "could not load read shelf");
                Vec::new()
            }
        }
    }

    async fn fetch_shelf(&self, user_id: &str) -> anyhow::Result<String> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("base URL cannot hold a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(["review", "list", user_id]);
        url.query_pairs_mut().append_pair("shelf", "read");

        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Extract book titles from a shelf listing page.
pub fn parse_read_titles(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let (Ok(rows), Ok(anchor)) = (
        Selector::parse("table#books tbody tr.bookalike.review"),
        Selector::parse("td.field.title .value a"),
    ) else {
        return Vec::new();
    };

    document
        .select(&rows)
        .filter_map(|row| row.select(&anchor).next())
        .map(|a| a.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .collect()
}
