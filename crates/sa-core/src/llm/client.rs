//! Gemini API HTTP client

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::GeminiConfig;
use crate::error::{Error, Result};

use super::types::*;

/// Anything that turns a multimodal prompt into model text.
///
/// The agents only depend on this trait so they can run against a
/// scripted generator in tests.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Send one user turn and return the model's text
    async fn generate(&self, parts: Vec<Part>) -> Result<String>;
}

/// Gemini `generateContent` client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    generation_config: Option<GenerationConfig>,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::Http)?;

        let generation_config = config.temperature.map(|temperature| GenerationConfig {
            temperature: Some(temperature),
            ..Default::default()
        });

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            generation_config,
        })
    }

    /// Create with a custom base URL (for testing or proxies)
    pub fn with_base_url(config: &GeminiConfig, base_url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(client)
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Call `generateContent`
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let inline_parts = request
            .contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter(|p| p.is_inline_data())
            .count();
        debug!(
            model = %self.model,
            inline_parts,
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("Gemini API error: {} - {}", status, body);
            return Err(Error::GeminiApi(format!("{}: {}", status, body)));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            Error::GeminiApi(format!("Failed to parse response: {} - {}", e, body))
        })?;

        info!(
            "Gemini API response: finish_reason={:?}, tokens={}",
            parsed
                .candidates
                .first()
                .and_then(|c| c.finish_reason.as_deref()),
            parsed
                .usage_metadata
                .as_ref()
                .map(|u| u.total_token_count)
                .unwrap_or(0)
        );

        Ok(parsed)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(&self, parts: Vec<Part>) -> Result<String> {
        let mut request = GenerateContentRequest::from_parts(parts);
        if let Some(config) = &self.generation_config {
            request = request.with_generation_config(config.clone());
        }

        let response = self.generate_content(&request).await?;
        response.text().ok_or(Error::EmptyResponse)
    }
}
