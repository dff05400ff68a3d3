use std::sync::Arc;

use dotenv::dotenv;
use finance_chat_relay::{serve, Config, FinancialAnalyst, GeminiClient};
use log::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    if config.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set in environment variables. Analysis requests will fail.");
    }

    let client = GeminiClient::from_config(&config);
    info!("Using Gemini model {}", client.model());

    let analyst = FinancialAnalyst::new(Arc::new(client));
    serve(&config, analyst).await?;

    Ok(())
}
