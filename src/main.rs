use std::sync::Arc;

use anyhow::Context;
use notebook_agent::{
    media::{TesseractOcr, WhisperTranscriber},
    server,
    store::{DeviceCodeAuth, DestinationStore, GraphStore, StaticToken, TokenProvider},
    AppConfig, ModelInvoker, NoteAgent, StructuredPipeline,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = AppConfig::from_env().context("reading configuration")?;
    tracing::info!(
        model = %config.model.model,
        base_url = %config.model.base_url,
        force_cpu = config.model.force_cpu,
        "starting notebook agent"
    );

    let http = config.http_client().context("building HTTP client")?;

    let tokens: Arc<dyn TokenProvider> = match &config.graph.access_token {
        Some(token) => Arc::new(StaticToken::new(token.clone())),
        None => Arc::new(DeviceCodeAuth::new(http.clone(), &config.graph).context("configuring Graph sign-in")?),
    };
    let store: Arc<dyn DestinationStore> = Arc::new(GraphStore::new(http.clone(), tokens));

    let invoker = ModelInvoker::builder(config.model.clone()).build();
    let agent = NoteAgent::new(
        StructuredPipeline::new(Arc::new(invoker)),
        store,
        Arc::new(TesseractOcr::from_config(&config.media)),
        Arc::new(WhisperTranscriber::from_config(http, &config.media)),
    )
    .with_defaults(config.default_notebook.clone(), config.default_section.clone());

    server::serve(&config, agent).await?;
    Ok(())
}
