//! Read–eval loop over a chat engine with automatic tool dispatch.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::{ChatEngine, ChatMessage};
use crate::tools::ToolRegistry;

const BANNER: &str = "AI Chatbot (RAG) – Type 'exit' to quit.";
const PROMPT: &str = "Enter your question: ";
const FAREWELL: &str = "The chatbot has been stopped.";

/// Holds the session history and drives tool calls for each user turn.
pub struct Orchestrator {
    engine: Arc<dyn ChatEngine>,
    tools: ToolRegistry,
    history: Vec<ChatMessage>,
    max_tool_rounds: usize,
    spinner: bool,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn ChatEngine>, tools: ToolRegistry, max_tool_rounds: usize) -> Self {
        Self {
            engine,
            tools,
            history: Vec::new(),
            max_tool_rounds,
            spinner: false,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.history.insert(0, ChatMessage::system(prompt));
        self
    }

    /// Show a spinner on stderr while waiting for the model.
    pub fn with_spinner(mut self) -> Self {
        self.spinner = true;
        self
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Run one user turn to completion and return the assistant's reply.
    ///
    /// On error the user turn and any partial tool exchange are dropped from
    /// the history.
    pub async fn ask(&mut self, input: &str) -> Result<String> {
        let checkpoint = self.history.len();
        self.history.push(ChatMessage::user(input));

        let result = self.complete_with_tools().await;
        if result.is_err() {
            self.history.truncate(checkpoint);
        }
        result
    }

    async fn complete_with_tools(&mut self) -> Result<String> {
        let definitions = self.tools.definitions();
        let mut rounds = 0;

        loop {
            let reply = self.engine.complete(&self.history, &definitions).await?;

            if reply.tool_calls.is_empty() || rounds == self.max_tool_rounds {
                if !reply.tool_calls.is_empty() {
                    tracing::warn!(rounds, "tool round limit reached, ignoring further tool calls");
                }
                let content = reply.content;
                self.history.push(ChatMessage::assistant(content.clone()));
                return Ok(content);
            }

            rounds += 1;
            let calls = reply.tool_calls.clone();
            self.history.push(reply);

            for call in calls {
                let name = call.function.name;
                let output = match self.tools.dispatch(&name, call.function.arguments).await {
                    Some(output) => output,
                    None => {
                        tracing::warn!(tool = %name, "model requested unknown tool");
                        format!("Unknown tool: {name}")
                    }
                };
                self.history.push(ChatMessage::tool(name, output));
            }
        }
    }

    /// Line-based REPL. Ends on EOF or `exit` (any case); blank lines are skipped.
    /// Lines that are not valid UTF-8 are decoded lossily rather than ending
    /// the session.
    pub async fn run<R, W>(&mut self, mut input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        output.write_all(format!("{BANNER}\n").as_bytes()).await?;
        let mut buf = Vec::new();

        loop {
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            buf.clear();
            if input.read_until(b'\n', &mut buf).await? == 0 {
                output.write_all(b"\n").await?;
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("exit") {
                break;
            }

            let spinner = self.spinner.then(thinking_spinner);
            let reply = self.ask(line).await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }

            let text = match reply {
                Ok(text) => format!("AI: {text}\n"),
                Err(e) => {
                    tracing::error!(error = %e, "chat turn failed");
                    format!("AI: (error) {e}\n")
                }
            };
            output.write_all(text.as_bytes()).await?;
        }

        output.write_all(format!("{FAREWELL}\n").as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }
}

fn thinking_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} thinking...") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
