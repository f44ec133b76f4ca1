use anyhow::Result;

use crate::app::App;
use crate::config::RagbotConfig;

/// Ask the weather tool directly, bypassing the chat model.
pub async fn weather(config: RagbotConfig, city: &str) -> Result<()> {
    let app = App::build(config)?;
    println!("{}", app.weather.get_weather(city).await);
    Ok(())
}
