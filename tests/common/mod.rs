#![allow(dead_code)]

use mockito::ServerGuard;
use shelfscout::{BookshelfImage, Config, Credentials, SearchCredentials};

/// Config pointing every outbound call at `server`, with fast retries.
pub fn config_for(server: &ServerGuard) -> Config {
    let mut config = Config::default();
    config.model.endpoint = server.url();
    config.search.endpoint = format!("{}/customsearch/v1", server.url());
    config.catalog.base_url = server.url();
    config.catalog.detail_path = "/book/show/".to_string();
    config.retry.base_delay_ms = 1;
    config.http.timeout_secs = 5;
    config
}

pub fn credentials() -> Credentials {
    Credentials {
        model_api_key: "model-key".to_string(),
        search: SearchCredentials {
            api_key: "search-key".to_string(),
            cx: "search-cx".to_string(),
        },
    }
}

pub fn image() -> BookshelfImage {
    BookshelfImage::new("image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
}

/// A generateContent response whose first part carries `text`.
pub fn model_reply(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

/// A read-shelf listing page with one row per title.
pub fn shelf_page(titles: &[&str]) -> String {
    let rows: String = titles
        .iter()
        .map(|t| {
            format!(
                r#"<tr class="bookalike review"><td class="field title"><div class="value"><a href="/book/show/0">{t}</a></div></td></tr>"#
            )
        })
        .collect();
    format!(r#"<html><body><table id="books"><tbody>{rows}</tbody></table></body></html>"#)
}
