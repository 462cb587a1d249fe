//! Upstream metadata lookup (display titles).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::MetadataConfig;
use crate::error::SourceError;
use crate::model::ItemId;
use crate::sanitize::redact_query_param;
use crate::secrets::SecretSources;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_BODY_LENGTH: usize = 200;

#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Returns the display title of `item_id`, or `SourceError::NotFound`
    /// when the upstream has no such item.
    async fn fetch_title(&self, item_id: &ItemId) -> Result<String, SourceError>;
}

/// Client for the YouTube Data API `videos` endpoint.
pub struct YoutubeDataApi {
    client: Client,
    api_base: String,
    api_key: SecretString,
}

impl YoutubeDataApi {
    pub fn new(api_base: impl Into<String>, api_key: SecretString) -> Result<Self, SourceError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Resolves the API key from the configured sources.
    pub fn from_config(config: &MetadataConfig) -> Result<Self, SourceError> {
        let api_key = SecretSources::from(config).resolve()?;
        Self::new(config.api_base.clone(), api_key)
    }
}

#[async_trait]
impl MetadataSource for YoutubeDataApi {
    async fn fetch_title(&self, item_id: &ItemId) -> Result<String, SourceError> {
        let request = self
            .client
            .get(format!("{}/videos", self.api_base))
            .query(&[
                ("part", "snippet"),
                ("id", item_id.as_str()),
                ("key", self.api_key.expose_secret()),
            ])
            .build()?;

        log::debug!(
            "Fetching metadata: {}",
            redact_query_param(request.url().as_str(), "key")
        );

        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let body = if body.len() > MAX_ERROR_BODY_LENGTH {
                let mut end = MAX_ERROR_BODY_LENGTH;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}... (truncated)", &body[..end])
            } else {
                body
            };
            return Err(SourceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_title_response(&body, item_id)
    }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
}

/// Extracts the first item's title from a `videos` list response.
pub fn parse_title_response(body: &str, item_id: &ItemId) -> Result<String, SourceError> {
    let response: VideoListResponse = serde_json::from_str(body)?;
    response
        .items
        .into_iter()
        .next()
        .map(|video| video.snippet.title)
        .ok_or_else(|| SourceError::NotFound(item_id.clone()))
}
