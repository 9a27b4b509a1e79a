//! End-to-end recommendation flow.
//!
//! read shelf → model request → decode → enrich every candidate concurrently.
//! Only the first three stages can fail the request; enrichment degrades to
//! empty metadata per book.

use crate::agent::{self, AgentError, GeminiClient};
use crate::book::{BookshelfImage, EnrichedRecommendation};
use crate::config::{Config, Credentials};
use crate::decoder::{self, DecodeError};
use crate::metadata::MetadataResolver;
use crate::reading::ReadListProvider;
use crate::scraper::{create_client, PageExtractor};
use crate::search::SearchResolver;
use futures::future::join_all;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Model(#[from] AgentError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

impl RecommendError {
    /// One message per failure category, fit to show an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            RecommendError::Validation(_) => {
                "Please upload an image of a bookshelf and configure a model API key."
            }
            RecommendError::Model(AgentError::EmptyResponse) => {
                "No recommendations found. The model could not process the image."
            }
            RecommendError::Model(_) | RecommendError::Http(_) => {
                "An error occurred while getting recommendations. Please try again."
            }
            RecommendError::Decode(_) => {
                "The recommendations could not be read. Please try again."
            }
        }
    }
}

pub struct Recommender {
    read_list: ReadListProvider,
    model: GeminiClient,
    metadata: MetadataResolver,
}

impl Recommender {
    pub fn new(
        read_list: ReadListProvider,
        model: GeminiClient,
        metadata: MetadataResolver,
    ) -> Self {
        Self {
            read_list,
            model,
            metadata,
        }
    }

    /// Wire every collaborator from configuration, sharing one HTTP client.
    pub fn from_config(config: &Config) -> Result<Self, RecommendError> {
        let client = create_client(config.timeout())?;

        let read_list = ReadListProvider::new(client.clone(), &config.catalog.base_url);
        let model = GeminiClient::new(client.clone(), &config.model, config.retry_policy());
        let search = SearchResolver::new(
            client.clone(),
            &config.search.endpoint,
            &config.catalog.site,
            &config.catalog.detail_path,
        );
        let metadata = MetadataResolver::new(search, PageExtractor::new(client));

        Ok(Self::new(read_list, model, metadata))
    }

    pub fn metadata(&self) -> &MetadataResolver {
        &self.metadata
    }

    pub fn read_list(&self) -> &ReadListProvider {
        &self.read_list
    }

    /// Recommend unread books from the shelf in `image`, in model order.
    pub async fn get_recommendations(
        &self,
        user_id: &str,
        image: &BookshelfImage,
        credentials: &Credentials,
    ) -> Result<Vec<EnrichedRecommendation>, RecommendError> {
        if image.data.is_empty() {
            return Err(RecommendError::Validation("bookshelf image is empty".into()));
        }
        if credentials.model_api_key.trim().is_empty() {
            return Err(RecommendError::Validation("model API key is missing".into()));
        }

        let read_titles = self.read_list.read_titles(user_id).await;

        let prompt = agent::build_prompt(&read_titles);
        let request = self.model.build_request(&prompt, image);
        tracing::info!(read = read_titles.len(), "asking model for recommendations");
        let raw = self
            .model
            .generate(&request, &credentials.model_api_key)
            .await?;

        let candidates = decoder::decode(&raw)?;
        tracing::info!(count = candidates.len(), "enriching recommendations");

        let enriched = join_all(candidates.into_iter().map(|candidate| async move {
            let metadata = self
                .metadata
                .resolve(&candidate.query(), &credentials.search)
                .await;
            EnrichedRecommendation::new(candidate, metadata)
        }))
        .await;

        Ok(enriched)
    }
}
