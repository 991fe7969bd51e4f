//! Upstream API client.
//!
//! A thin `reqwest` transport for the two OpenAI-compatible endpoints the
//! proxy forwards to. Request and response bodies are the types in
//! [`crate::proxy::types`].

use reqwest::header;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{ApiKey, UpstreamConfig, DEFAULT_AUTH_TOKEN};
use crate::error::{Error, Result};
use crate::proxy::types::{
    ChatCompletionRequest, ChatCompletionResponse, CompletionRequest, CompletionResponse,
};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
const COMPLETIONS_PATH: &str = "/completions";

/// Client for an OpenAI-compatible upstream API.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: ApiKey,
}

impl UpstreamClient {
    /// Client pointed at `base_url` using the placeholder token `"none"`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_token(base_url, DEFAULT_AUTH_TOKEN)
    }

    /// Client pointed at `base_url` using `auth_token` as bearer token.
    pub fn with_token(base_url: impl Into<String>, auth_token: impl Into<ApiKey>) -> Result<Self> {
        let mut config = UpstreamConfig::new(base_url);
        config.auth_token = auth_token.into();
        Self::from_config(&config)
    }

    /// Client built from the `[upstream]` config section.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self::with_http_client(
            http,
            config.base_url.clone(),
            config.auth_token.clone(),
        ))
    }

    /// Client reusing an existing `reqwest::Client`.
    pub fn with_http_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        auth_token: impl Into<ApiKey>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            auth_token: auth_token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /chat/completions
    pub async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        self.post_json(CHAT_COMPLETIONS_PATH, request).await
    }

    /// POST /completions
    pub async fn create_completion(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        self.post_json(COMPLETIONS_PATH, request).await
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(self.auth_token.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: api_error_message(&bytes),
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Extract `error.message` from an OpenAI error body, falling back to the raw body.
fn api_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_trimmed_from_base_url() {
        let client = UpstreamClient::new("http://localhost:8000/v1/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn api_error_message_from_openai_body() {
        let body = br#"{"error":{"message":"Invalid API key","type":"invalid_request_error"}}"#;
        assert_eq!(api_error_message(body), "Invalid API key");
    }

    #[test]
    fn api_error_message_falls_back_to_raw_body() {
        assert_eq!(api_error_message(b"Bad Gateway"), "Bad Gateway");
    }
}
