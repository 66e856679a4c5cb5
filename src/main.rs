use object_qa::{api, telemetry, AppState, Config, OpenAiVisionClient};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    telemetry::init_tracing(&config.logging);

    let model = OpenAiVisionClient::new(&config.model)
        .map_err(|e| anyhow::anyhow!("{} (set OPENAI_API_KEY)", e))?;
    info!("Using model {} at {}", config.model.model, model.endpoint());

    let state = AppState::new(&config, Arc::new(model));
    api::serve(&config.server, state).await?;

    Ok(())
}
