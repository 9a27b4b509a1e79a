//! Generative model client for reading a bookshelf photo.
//!
//! Talks to the Gemini `generateContent` REST API. Every call goes through
//! the retry executor so rate limiting is absorbed with backoff.

use crate::book::BookshelfImage;
use crate::config::ModelConfig;
use crate::retry::{self, RawResponse, RetryError, RetryPolicy};
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    RequestFailed(#[from] RetryError<reqwest::Error>),
    #[error("invalid model endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("failed to parse response envelope: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("the model could not process the image")]
    EmptyResponse,
}

/// Request body for `generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    response_schema: bool,
    google_search: bool,
    policy: RetryPolicy,
}

impl GeminiClient {
    pub fn new(client: Client, config: &ModelConfig, policy: RetryPolicy) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.name.clone(),
            response_schema: config.response_schema,
            google_search: config.google_search,
            policy,
        }
    }

    /// Bundle the prompt and the inline image into one request.
    pub fn build_request(&self, prompt: &str, image: &BookshelfImage) -> GenerateRequest {
        let data = base64::engine::general_purpose::STANDARD.encode(&image.data);

        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: Blob {
                            mime_type: image.mime_type.clone(),
                            data,
                        },
                    },
                ],
            }],
            generation_config: self.response_schema.then(|| GenerationConfig {
                response_schema: recommendation_schema(),
            }),
            tools: if self.google_search {
                vec![Tool {
                    google_search: GoogleSearch {},
                }]
            } else {
                Vec::new()
            },
        }
    }

    /// Send `request` and return the generated text.
    pub async fn generate(
        &self,
        request: &GenerateRequest,
        api_key: &str,
    ) -> Result<String, AgentError> {
        let url = Url::parse_with_params(
            &format!(
                "{}/models/{}:generateContent",
                self.endpoint.trim_end_matches('/'),
                self.model
            ),
            &[("key", api_key)],
        )?;

        let response = retry::execute(&self.policy, || {
            let pending = self.client.post(url.clone()).json(request).send();
            async move { RawResponse::read(pending.await?).await }
        })
        .await?;

        let text = response_text(&response.body)?;
        tracing::debug!(%text, "raw model response");
        Ok(text)
    }
}

/// Prompt asking for shelf books the reader hasn't read yet.
pub fn build_prompt(read_titles: &[String]) -> String {
    format!(
        r#"You are an expert literary assistant. Your task is to analyze an image of a bookshelf, identify the books on it, and then recommend three books from that shelf that are NOT in the user's list of previously read books.

The user's list of read books is: {}.

Please provide your response as a JSON array of objects. Each object should have a 'bookTitle' property (a string), a 'summary' property (a one-line summary explaining why the user might like this book) and, when you can read it from the spine, an 'author' property. Do not include any other text or formatting outside the JSON array.
Example response: [{{ "bookTitle": "The Name of the Wind", "summary": "If you enjoy epic fantasy with a lyrical writing style, this is a must-read.", "author": "Patrick Rothfuss" }}]
If you cannot find any new books to recommend, return an empty array."#,
        read_titles.join(", ")
    )
}

fn recommendation_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "bookTitle": { "type": "STRING" },
                "summary": { "type": "STRING" },
                "author": { "type": "STRING" }
            },
            "required": ["bookTitle"]
        }
    })
}

/// Dig `candidates[0].content.parts[0].text` out of a response body.
pub fn response_text(body: &str) -> Result<String, AgentError> {
    let response: GenerateResponse = serde_json::from_str(body)?;
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or(AgentError::EmptyResponse)
}
