//! Book records flowing through the recommendation pipeline.
//!
//! Everything here is built fresh per request and never persisted.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("failed to read image: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("image is empty")]
    Empty,
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
}

/// A title (and maybe an author) to resolve against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub title: String,
    pub author: Option<String>,
}

impl BookQuery {
    pub fn new(title: impl Into<String>, author: Option<String>) -> Self {
        Self {
            title: title.into(),
            author: author.filter(|a| !a.trim().is_empty()),
        }
    }

    /// A query without a title can't be resolved.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Catalog metadata for one book.
///
/// Every field is independently optional. When `canonical_url` is `None`
/// no page was scraped and every other field is `None` as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMetadata {
    pub canonical_url: Option<String>,
    pub rating: Option<String>,
    pub review_count: Option<String>,
    pub title: Option<String>,
    pub cover_image_url: Option<String>,
}

impl ResolvedMetadata {
    /// The record returned whenever resolution fails at any stage.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One recommendation as decoded from the model's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationCandidate {
    pub book_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl RecommendationCandidate {
    pub fn query(&self) -> BookQuery {
        BookQuery::new(self.book_title.clone(), self.author.clone())
    }
}

/// A candidate merged with whatever the catalog had to say about it.
///
/// The model's `bookTitle` and the catalog's `title` are kept side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedRecommendation {
    #[serde(flatten)]
    pub candidate: RecommendationCandidate,
    #[serde(flatten)]
    pub metadata: ResolvedMetadata,
}

impl EnrichedRecommendation {
    pub fn new(candidate: RecommendationCandidate, metadata: ResolvedMetadata) -> Self {
        Self {
            candidate,
            metadata,
        }
    }

    /// The catalog title when one was found, otherwise the model's title.
    pub fn display_title(&self) -> &str {
        self.metadata
            .title
            .as_deref()
            .unwrap_or(&self.candidate.book_title)
    }
}

/// An uploaded photo of a bookshelf.
#[derive(Debug, Clone)]
pub struct BookshelfImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl BookshelfImage {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Load an image from disk, sniffing its type from the leading bytes.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ImageError> {
        if data.is_empty() {
            return Err(ImageError::Empty);
        }
        let kind = infer::get(&data)
            .ok_or_else(|| ImageError::UnsupportedType("unknown".to_string()))?;
        if !infer::is_image(&data) {
            return Err(ImageError::UnsupportedType(kind.mime_type().to_string()));
        }
        Ok(Self::new(kind.mime_type(), data))
    }
}
