//! Model-invocation collaborator.
//!
//! The pipeline only needs "prompt in, text out"; everything else (endpoint,
//! model id, retries, pacing) lives outside the trait so tests can substitute
//! a scripted mock.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ModelError {
    /// Server returned 429 Too Many Requests.
    #[error("rate limited (429)")]
    RateLimited,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    /// Response parsed but carried no completion text.
    #[error("empty completion")]
    EmptyCompletion,
}

impl ModelError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ModelError::RateLimited)
    }
}

/// A blocking-call language model: prompt string in, completion text out.
pub trait ModelClient: Send + Sync {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>>;
}

/// Chat-completions client for an OpenRouter-compatible endpoint.
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.3,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ModelClient for OpenRouterClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/chat/completions", self.base_url);
            let body = serde_json::json!({
                "model": self.model,
                "temperature": self.temperature,
                "messages": [{ "role": "user", "content": prompt }],
            });

            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| ModelError::Transport(e.to_string()))?;

            let status = resp.status();
            if status.as_u16() == 429 {
                return Err(ModelError::RateLimited);
            }
            if !status.is_success() {
                return Err(ModelError::Status(status.as_u16()));
            }

            let data: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| ModelError::Transport(e.to_string()))?;
            data["choices"][0]["message"]["content"]
                .as_str()
                .map(|s| s.to_string())
                .ok_or(ModelError::EmptyCompletion)
        })
    }
}

/// Scripted model for tests: pops one canned result per call and records the
/// prompts it was given.
#[derive(Default)]
pub struct MockModel {
    responses: Mutex<VecDeque<Result<String, ModelError>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn new(responses: impl IntoIterator<Item = Result<String, ModelError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor from plain success strings.
    pub fn replying(responses: impl IntoIterator<Item = &'static str>) -> Self {
        Self::new(responses.into_iter().map(|s| Ok(s.to_string())))
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl ModelClient for MockModel {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let result = self
            .responses
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| Err(ModelError::Transport("mock script exhausted".into())));
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_pops_responses_in_order() {
        let model = MockModel::replying(["one", "two"]);
        assert_eq!(model.complete("a").await.unwrap(), "one");
        assert_eq!(model.complete("b").await.unwrap(), "two");
        assert!(model.complete("c").await.is_err());
        assert_eq!(model.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn mock_propagates_scripted_errors() {
        let model = MockModel::new([Err(ModelError::RateLimited)]);
        assert!(model.complete("a").await.unwrap_err().is_rate_limited());
    }
}
