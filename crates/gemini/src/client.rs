use crate::types::{GenerateContentRequest, GenerateContentResponse};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A client for the Gemini `generateContent` REST API.
pub struct Client {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl Client {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL, e.g. to point at a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sends one `generateContent` call against the given model.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        tracing::debug!(model, "Sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .context("Failed to reach the Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "generateContent call rejected");
            anyhow::bail!("Gemini API returned {status}: {body}");
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .context("Failed to deserialize generateContent response")
    }
}
