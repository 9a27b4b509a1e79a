//! Decode the model's answer into recommendation candidates.
//!
//! The model is asked for a bare JSON array but often wraps it in a code
//! fence. At most one fence style is stripped, tried in the order of
//! [`FENCE_STYLES`].

use crate::book::RecommendationCandidate;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("model response is not parseable: {source}")]
    NotParseable {
        #[source]
        source: serde_json::Error,
        text: String,
    },
}

lazy_static! {
    static ref JSON_WORD_FENCE: Regex = Regex::new(r"(?i)^json\s*```").unwrap();
    static ref TAGGED_FENCE: Regex = Regex::new(r"(?i)^```json").unwrap();
    static ref PLAIN_FENCE: Regex = Regex::new(r"^```").unwrap();
    static ref CLOSING_FENCE: Regex = Regex::new(r"```\s*$").unwrap();
}

/// A fence style: the pattern its opening must match.
pub struct FenceStyle {
    pub name: &'static str,
    opening: &'static Regex,
}

impl FenceStyle {
    fn matches(&self, text: &str) -> bool {
        self.opening.is_match(text)
    }

    fn strip<'a>(&self, text: &'a str) -> &'a str {
        let body = match self.opening.find(text) {
            Some(m) => &text[m.end()..],
            None => text,
        };
        match CLOSING_FENCE.find(body) {
            Some(m) => &body[..m.start()],
            None => body,
        }
    }
}

lazy_static! {
    /// Priority order: the word `json` followed by a fence, then a fence
    /// tagged `json`, then a bare fence.
    pub static ref FENCE_STYLES: [FenceStyle; 3] = [
        FenceStyle { name: "json-word", opening: &*JSON_WORD_FENCE },
        FenceStyle { name: "tagged", opening: &*TAGGED_FENCE },
        FenceStyle { name: "plain", opening: &*PLAIN_FENCE },
    ];
}

/// Remove the first matching fence style from `raw`, trimming whitespace.
pub fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    FENCE_STYLES
        .iter()
        .find(|style| style.matches(trimmed))
        .map(|style| {
            tracing::debug!(style = style.name, "stripping code fence");
            style.strip(trimmed).trim()
        })
        .unwrap_or(trimmed)
}

/// Decode a model response into candidates.
pub fn decode(raw: &str) -> Result<Vec<RecommendationCandidate>, DecodeError> {
    let text = strip_fence(raw);
    serde_json::from_str(text).map_err(|source| DecodeError::NotParseable {
        source,
        text: text.to_string(),
    })
}
