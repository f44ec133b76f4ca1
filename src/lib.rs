//! Local RAG chatbot with a weather tool.
//!
//! `ragbot` chats with a local Ollama model and lets it call a `get_weather`
//! tool. City names are turned into coordinates by a tiered resolver so the
//! geocoding API is called once per city, not once per question:
//!
//! | Tier | Store | Lifetime |
//! |------|-------|----------|
//! | 0 | in-process map | resolver instance |
//! | 1 | SQLite + sqlite-vec vector memory | permanent |
//! | 2 | OpenWeatherMap geocoding | not cached |
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, migrations, and health checks
//! - [`embedding`]: Text-to-vector embedding via Ollama
//! - [`memory`]: Vector memory store: save and similarity search of text records
//! - [`geo`]: Tiered city → coordinates resolver
//! - [`weather`]: OpenWeatherMap client
//! - [`tools`]: Tool registry and the `get_weather` tool
//! - [`chat`]: Chat engine seam, Ollama client, and the REPL orchestrator

pub mod app;
pub mod chat;
pub mod cli;
pub mod config;
pub mod db;
pub mod embedding;
pub mod geo;
pub mod memory;
pub mod tools;
pub mod weather;
