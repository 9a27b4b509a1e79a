//! Catalog page scraping.
//!
//! Uses reqwest for fetching and scraper for HTML parsing. Each field is
//! extracted with an ordered chain of strategies; the first one that finds
//! a non-empty value wins and the rest are skipped.

use crate::book::ResolvedMetadata;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::USER_AGENT as USER_AGENT_HEADER;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;

/// User-Agent string identifying this client on API calls
const USER_AGENT: &str = concat!(
    "shelfscout/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/cladam/shelfscout)"
);

/// Catalog pages reject unfamiliar clients, so page fetches look like a browser
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),
    #[error("page returned {0}")]
    Status(StatusCode),
}

/// A strategy that looks for one field in a parsed page.
type Strategy = fn(&Html) -> Option<String>;

const RATING_CHAIN: &[Strategy] = &[rating_element, rating_meta];
const REVIEW_COUNT_CHAIN: &[Strategy] = &[review_count_text, review_count_meta];
const TITLE_CHAIN: &[Strategy] = &[og_title, heading_title];
const COVER_CHAIN: &[Strategy] = &[og_image, cover_element];

lazy_static! {
    static ref REVIEW_COUNT: Regex = Regex::new(r"(?i)([\d,]+)\s+reviews").unwrap();
}

/// Create a configured HTTP client
pub fn create_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Fetches catalog detail pages and pulls book metadata out of them.
#[derive(Debug, Clone)]
pub struct PageExtractor {
    client: Client,
}

impl PageExtractor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch `url` and extract its metadata. `canonical_url` is left for
    /// the caller to fill in.
    pub async fn extract(&self, url: &str) -> Result<ResolvedMetadata, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT_HEADER, BROWSER_USER_AGENT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ScraperError::Status(response.status()));
        }
        let html = response.text().await?;

        Ok(extract_metadata(&html))
    }
}

/// Run every field's fallback chain over `html`.
pub fn extract_metadata(html: &str) -> ResolvedMetadata {
    let document = Html::parse_document(html);

    ResolvedMetadata {
        canonical_url: None,
        rating: first_match(&document, RATING_CHAIN),
        review_count: first_match(&document, REVIEW_COUNT_CHAIN),
        title: first_match(&document, TITLE_CHAIN),
        cover_image_url: first_match(&document, COVER_CHAIN),
    }
}

fn first_match(document: &Html, chain: &[Strategy]) -> Option<String> {
    chain.iter().find_map(|strategy| strategy(document))
}

fn rating_element(doc: &Html) -> Option<String> {
    first_text(doc, r#".RatingStatistics__rating[aria-hidden="true"]"#)
}

fn rating_meta(doc: &Html) -> Option<String> {
    first_attr(doc, r#"meta[itemprop="ratingValue"]"#, "content")
}

fn review_count_text(doc: &Html) -> Option<String> {
    let text = first_text(doc, ".RatingStatistics__meta")?;
    parse_review_count(&text)
}

fn review_count_meta(doc: &Html) -> Option<String> {
    first_attr(doc, r#"meta[itemprop="reviewCount"]"#, "content")
}

fn og_title(doc: &Html) -> Option<String> {
    first_attr(doc, r#"meta[property="og:title"]"#, "content")
}

fn heading_title(doc: &Html) -> Option<String> {
    first_text(doc, "h1.Text__title1, h1")
}

fn og_image(doc: &Html) -> Option<String> {
    first_attr(doc, r#"meta[property="og:image"]"#, "content")
}

fn cover_element(doc: &Html) -> Option<String> {
    first_attr(doc, ".BookPage__rightCover img.ResponsiveImage", "src")
}

/// Pull the number out of text like `"1,234 ratings · 98,765 reviews"`.
pub fn parse_review_count(text: &str) -> Option<String> {
    REVIEW_COUNT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn first_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
