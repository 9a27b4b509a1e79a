//! # Shelfscout
//!
//! Book recommendations from a photograph of a bookshelf.
//!
//! ## Features
//!
//! - **Shelf Reading**: A Gemini model reads the photo and picks books the reader hasn't read
//! - **Catalog Enrichment**: Each pick is resolved to its catalog page for rating, review count and cover
//! - **Resilient Calls**: Rate-limited model calls are retried with exponential backoff

pub mod agent;
pub mod book;
pub mod config;
pub mod decoder;
pub mod metadata;
pub mod reading;
pub mod recommend;
pub mod retry;
pub mod scraper;
pub mod search;

pub use book::{BookQuery, BookshelfImage, EnrichedRecommendation, ResolvedMetadata};
pub use config::{Config, Credentials, SearchCredentials};
pub use recommend::{RecommendError, Recommender};
