//! Unified OpenAI-compatible provider.
//!
//! One struct serves both collaborator seams: `POST {base}/embeddings` for the
//! [`Embedder`] and `POST {base}/chat/completions` for the [`AnswerService`].
//! Providers differ only by endpoint URL, auth style and API key.

use std::time::Duration;

use async_trait::async_trait;
use docqa_core::config::{AnswerConfig, DEFAULT_SYSTEM_PROMPT, EmbeddingConfig};
use docqa_core::error::{DocQaError, Result};
use docqa_core::traits::{AnswerService, Embedder};
use docqa_core::types::Message;
use serde_json::{Value, json};

use crate::provider_registry::{AuthStyle, ProviderConfig};

pub struct OpenAiCompatibleProvider {
    /// Provider name (e.g., "openai", "ollama").
    name: String,
    api_key: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    base_url: String,
    chat_path: String,
    embeddings_path: Option<String>,
    auth_style: AuthStyle,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Create from a known provider config.
    ///
    /// Resolution order:
    /// - API key: `api_key` argument > env vars > empty
    /// - Base URL: `endpoint` argument > env override > registry default
    pub fn from_registry(
        registry: &ProviderConfig,
        api_key: &str,
        endpoint: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        let api_key = if !api_key.is_empty() {
            api_key.to_string()
        } else {
            registry
                .env_keys
                .iter()
                .find_map(|key| std::env::var(key).ok())
                .unwrap_or_default()
        };

        let base_url = if !endpoint.is_empty() {
            endpoint.trim_end_matches('/').to_string()
        } else {
            registry
                .base_url_env
                .and_then(|env_key| {
                    let val = std::env::var(env_key).ok()?;
                    // OLLAMA_HOST and friends usually omit the /v1 suffix
                    if val.ends_with("/v1") {
                        Some(val)
                    } else {
                        Some(format!("{}/v1", val.trim_end_matches('/')))
                    }
                })
                .unwrap_or_else(|| registry.base_url.to_string())
        };

        Ok(Self {
            name: registry.name.to_string(),
            api_key,
            base_url,
            chat_path: registry.chat_path.to_string(),
            embeddings_path: registry.embeddings_path.map(String::from),
            auth_style: registry.auth_style,
            model: registry.default_chat_model.to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            client: build_client(timeout_secs)?,
        })
    }

    /// Create for a custom endpoint (e.g., "custom:https://my-server.com/v1").
    pub fn custom(endpoint: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let base_url = endpoint
            .strip_prefix("custom:")
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(DocQaError::Config("custom provider needs a URL".into()));
        }

        let api_key = if !api_key.is_empty() {
            api_key.to_string()
        } else {
            std::env::var("CUSTOM_API_KEY").unwrap_or_default()
        };
        let auth_style = if api_key.is_empty() {
            AuthStyle::None
        } else {
            AuthStyle::Bearer
        };

        Ok(Self {
            name: "custom".to_string(),
            api_key,
            base_url,
            chat_path: "/chat/completions".to_string(),
            embeddings_path: Some("/embeddings".to_string()),
            auth_style,
            model: String::new(),
            temperature: 0.2,
            max_tokens: 1024,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            client: build_client(timeout_secs)?,
        })
    }

    /// Resolve an embedding provider from `[embedding]`.
    ///
    /// An empty `model` falls back to the registry's default embedding model.
    pub fn for_embedding(registry: Option<&ProviderConfig>, config: &EmbeddingConfig) -> Result<Self> {
        let mut provider = match registry {
            Some(registry) => Self::from_registry(
                registry,
                &config.api_key,
                &config.endpoint,
                config.request_timeout_secs,
            )?,
            None => Self::custom(&config.provider, &config.api_key, config.request_timeout_secs)?,
        };
        if provider.embeddings_path.is_none() {
            return Err(DocQaError::Config(format!(
                "provider '{}' has no embeddings endpoint",
                provider.name
            )));
        }
        provider.model = resolve_model(
            &config.model,
            registry.and_then(|r| r.default_embedding_model),
        )
        .ok_or_else(|| {
            DocQaError::Config(format!(
                "no embedding model configured for provider '{}'",
                provider.name
            ))
        })?;
        Ok(provider)
    }

    /// Resolve an answer provider from `[answer]`.
    ///
    /// An empty `model` falls back to the registry's default chat model.
    pub fn for_answer(registry: Option<&ProviderConfig>, config: &AnswerConfig) -> Result<Self> {
        let mut provider = match registry {
            Some(registry) => Self::from_registry(
                registry,
                &config.api_key,
                &config.endpoint,
                config.request_timeout_secs,
            )?,
            None => Self::custom(&config.provider, &config.api_key, config.request_timeout_secs)?,
        };
        provider.model = resolve_model(&config.model, registry.map(|r| r.default_chat_model))
            .ok_or_else(|| {
                DocQaError::Config(format!(
                    "no chat model configured for provider '{}'",
                    provider.name
                ))
            })?;
        provider.temperature = config.temperature;
        provider.max_tokens = config.max_tokens;
        provider.system_prompt = config.system_prompt.clone();
        Ok(provider)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the auth header for the request.
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_style {
            AuthStyle::Bearer if !self.api_key.is_empty() => {
                req.header("Authorization", format!("Bearer {}", self.api_key))
            }
            _ => req,
        }
    }

    fn check_key(&self) -> Result<()> {
        if self.auth_style != AuthStyle::None && self.api_key.is_empty() {
            return Err(DocQaError::ApiKeyMissing(self.name.clone()));
        }
        Ok(())
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        let req = self.apply_auth(req);

        let resp = req.send().await.map_err(|e| {
            DocQaError::upstream(&self.name, format!("connection failed ({url}): {e}"))
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(DocQaError::Upstream {
                service: self.name.clone(),
                status: Some(status.as_u16()),
                message: text,
            });
        }

        resp.json()
            .await
            .map_err(|e| DocQaError::upstream(&self.name, format!("invalid response: {e}")))
    }
}

/// The configured model, else the registry default. `None` when neither is set.
fn resolve_model(configured: &str, registry_default: Option<&str>) -> Option<String> {
    let configured = configured.trim();
    if !configured.is_empty() {
        return Some(configured.to_string());
    }
    registry_default.map(String::from)
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DocQaError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Pull `data[].embedding` out of an embeddings response, ordered by `index`.
pub fn parse_embeddings(service: &str, json: &Value) -> Result<Vec<Vec<f32>>> {
    let data = json["data"]
        .as_array()
        .ok_or_else(|| DocQaError::upstream(service, "no data in embeddings response"))?;

    let mut rows: Vec<(u64, Vec<f32>)> = Vec::with_capacity(data.len());
    for (i, item) in data.iter().enumerate() {
        let vector = item["embedding"]
            .as_array()
            .ok_or_else(|| DocQaError::upstream(service, format!("item {i} has no embedding")))?
            .iter()
            .map(|x| x.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| DocQaError::upstream(service, format!("item {i} has non-numeric values")))?;
        let index = item["index"].as_u64().unwrap_or(i as u64);
        rows.push((index, vector));
    }
    rows.sort_by_key(|(index, _)| *index);
    Ok(rows.into_iter().map(|(_, v)| v).collect())
}

/// Pull `choices[0].message.content` out of a chat completion response.
pub fn parse_chat(service: &str, json: &Value) -> Result<String> {
    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| DocQaError::upstream(service, "No choices in response"))?;
    choice["message"]["content"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| DocQaError::upstream(service, "No content in response"))
}

/// The user turn sent with every question.
pub fn user_prompt(context: &str, question: &str) -> String {
    format!("Context:\n{context}\n\nQuestion:\n{question}")
}

#[async_trait]
impl Embedder for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.check_key()?;
        let path = self.embeddings_path.as_deref().ok_or_else(|| {
            DocQaError::Config(format!("provider '{}' has no embeddings endpoint", self.name))
        })?;

        let body = json!({
            "model": self.model,
            "input": texts,
        });
        tracing::debug!("🧮 Embedding {} texts with {}/{}", texts.len(), self.name, self.model);
        let json = self.post(path, &body).await?;
        parse_embeddings(&self.name, &json)
    }
}

#[async_trait]
impl AnswerService for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn answer(&self, context: &str, question: &str) -> Result<String> {
        self.check_key()?;

        let prompt = user_prompt(context, question);
        tracing::debug!("System prompt: {}", self.system_prompt);
        tracing::debug!("Prompt sent to {}:\n{}", self.name, prompt);

        let messages = vec![Message::system(&self.system_prompt), Message::user(prompt)];
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        let json = self.post(&self.chat_path, &body).await?;
        parse_chat(&self.name, &json)
    }
}
