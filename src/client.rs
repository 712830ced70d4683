//! # Description Client
//!
//! One function's worth of contract: encoded image in, natural-language text
//! out, via a single POST to a remote multimodal model endpoint.
//!
//! The wire shape is the OpenAI-compatible single-image completion used by
//! local VLM servers: `{model, image, prompt}` where `image` is the raw
//! base64 JPEG payload (data-URL header stripped), answered with a JSON body
//! whose `content` field holds the description.
//!
//! Deliberately minimal: no retry, no timeout, no batching. One outbound
//! network call per invocation; failures come back as a `RemoteCall` error
//! carrying a human-readable message so the session can surface it.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DescribeError, DescribeResult};
use crate::processing::EncodedImage;

/// Environment variable holding the API key for hosted endpoints.
pub const API_KEY_ENV: &str = "DESCRIBE_API_KEY";

/// Default endpoint: a local OpenAI-compatible VLM server.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8001/v1/responses";

/// Default model name requested from the endpoint.
pub const DEFAULT_MODEL: &str = "qwen3-vl";

/// Fixed instruction prompt sent with every capture.
pub const DEFAULT_PROMPT: &str =
    "Describe en una frase breve y clara lo que aparece en la imagen.";

/// Abstract interface for description backends.
/// Enables pluggable clients so tests can substitute a mock.
#[async_trait]
pub trait Describer: Send + Sync {
    /// Describe one encoded image, returning the model's text.
    async fn describe(&self, image: &EncodedImage) -> DescribeResult<String>;
}

/// HTTP client for a remote vision-language model endpoint.
pub struct VlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    prompt: String,
    api_key: Option<String>,
}

impl VlmClient {
    /// Create a client with an explicit API key (or none, for local servers).
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        prompt: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            prompt: prompt.into(),
            api_key,
        }
    }

    /// Create a client that reads its API key from [`API_KEY_ENV`].
    ///
    /// A missing key is fatal here, before any camera work starts, so the
    /// user never loses a capture to a credentials problem.
    pub fn from_env(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        prompt: impl Into<String>,
    ) -> DescribeResult<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            DescribeError::auth(format!("{API_KEY_ENV} is not set"))
                .with_recovery_suggestion(format!(
                    "Export {API_KEY_ENV}, or pass --anonymous for endpoints that need no key"
                ))
        })?;
        Ok(Self::new(endpoint, model, prompt, Some(api_key)))
    }

    /// The instruction prompt sent with every request.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Build the request body for one description call.
pub fn build_request_body(model: &str, prompt: &str, image: &EncodedImage) -> Value {
    serde_json::json!({
        "model": model,
        "prompt": prompt,
        "image": image.base64_payload(),
    })
}

/// Pull the description text out of a response body.
pub fn extract_description(body: &Value) -> DescribeResult<String> {
    let text = body
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            DescribeError::remote_call(format!(
                "response is missing a 'content' text field: {body}"
            ))
        })?;
    if text.trim().is_empty() {
        return Err(DescribeError::remote_call("model returned an empty description"));
    }
    Ok(text.trim().to_string())
}

#[async_trait]
impl Describer for VlmClient {
    async fn describe(&self, image: &EncodedImage) -> DescribeResult<String> {
        let body = build_request_body(&self.model, &self.prompt, image);

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            DescribeError::remote_call(format!(
                "network error reaching {}: {e}",
                self.endpoint
            ))
            .with_recovery_suggestion("Check that the model server is running and reachable")
        })?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(DescribeError::remote_call(format!(
                "endpoint returned {status}: {}",
                details.trim()
            )));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| DescribeError::remote_call(format!("invalid JSON response: {e}")))?;
        extract_description(&parsed)
    }
}
