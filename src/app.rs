//! Wires configuration into the running components.
//!
//! [`App::build`] opens the database, creates the embedding provider and the
//! OpenWeatherMap client, and assembles the resolver and the weather tool.
//! [`run_chat`] starts the REPL on stdin/stdout.

use anyhow::Result;
use std::sync::{Arc, Mutex};

use crate::chat::{OllamaChat, Orchestrator};
use crate::config::RagbotConfig;
use crate::db;
use crate::embedding;
use crate::geo::GeoResolver;
use crate::memory::SemanticMemory;
use crate::tools::{ToolRegistry, WeatherTool};
use crate::weather::OpenWeatherClient;

pub struct App {
    pub config: Arc<RagbotConfig>,
    pub memory: SemanticMemory,
    pub resolver: Arc<GeoResolver>,
    pub weather: Arc<WeatherTool>,
}

impl App {
    pub fn build(config: RagbotConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = db::open_database(&db_path, &config.ollama)?;
        tracing::info!(db = %db_path.display(), "database ready");

        let provider = embedding::create_provider(&config.ollama)?;
        db::ensure_embedding_dim(&conn, provider.dimensions())?;
        let embedding: Arc<dyn embedding::EmbeddingProvider> = Arc::from(provider);
        let db = Arc::new(Mutex::new(conn));
        let memory = SemanticMemory::new(db, embedding, &config.memory);

        let api_key = config.weather.credential().map(str::to_string);
        if api_key.is_none() {
            tracing::warn!("no OpenWeatherMap API key configured; set OPENWEATHER_API_KEY or weather.api_key");
        }

        let openweather = Arc::new(OpenWeatherClient::new(&config.weather)?);
        let mut resolver = GeoResolver::new(
            memory.clone(),
            openweather.clone(),
            api_key.clone(),
            config.memory.collection.clone(),
        );
        if config.geo.coalesce_inflight {
            resolver = resolver.with_inflight_coalescing();
        }
        let resolver = Arc::new(resolver);

        let weather = Arc::new(WeatherTool::new(resolver.clone(), openweather, api_key));

        Ok(Self {
            config: Arc::new(config),
            memory,
            resolver,
            weather,
        })
    }
}

/// Run the interactive chat on stdin/stdout until `exit` or EOF.
pub async fn run_chat(config: RagbotConfig) -> Result<()> {
    let app = App::build(config)?;

    let mut tools = ToolRegistry::new();
    tools.register(app.weather.clone());

    let engine = Arc::new(OllamaChat::new(&app.config.ollama)?);
    tracing::info!(model = %app.config.ollama.chat_model, "chat engine ready");

    let mut bot = Orchestrator::new(engine, tools, app.config.chat.max_tool_rounds).with_spinner();
    if let Some(prompt) = &app.config.chat.system_prompt {
        bot = bot.with_system_prompt(prompt.clone());
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    bot.run(stdin, tokio::io::stdout()).await
}
