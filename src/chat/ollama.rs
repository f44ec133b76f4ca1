//! Ollama chat client (`POST /api/chat`, non-streaming).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatEngine, ChatMessage};
use crate::config::OllamaConfig;
use crate::tools::ToolDefinition;

pub struct OllamaChat {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
    stream: bool,
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

impl OllamaChat {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", config.base_url.trim_end_matches('/')),
            model: config.chat_model.clone(),
        })
    }
}

#[async_trait]
impl ChatEngine for OllamaChat {
    async fn complete(&self, history: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ChatMessage> {
        let request = ChatRequest {
            model: &self.model,
            messages: history,
            tools,
            stream: false,
        };

        tracing::debug!(model = %self.model, turns = history.len(), tools = tools.len(), "chat request");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("chat request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("ollama chat returned HTTP {status}: {body}"));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("failed to decode ollama chat response")?;
        Ok(parsed.message)
    }
}
