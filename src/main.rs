use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use reelmind::config::Config;
use reelmind::db::{create_redis_client, Cache};
use reelmind::routes::create_router;
use reelmind::services::providers::{
    CompletionProvider, MetadataResolver, OpenAiCompletionProvider, TmdbMetadataResolver,
};
use reelmind::services::{ConversationService, InMemorySessionStore, RecommendationAggregator};
use reelmind::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reelmind=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let cache = Cache::new(redis_client);

    let resolver: Arc<dyn MetadataResolver> = Arc::new(TmdbMetadataResolver::new(
        http_client.clone(),
        cache,
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_image_url.clone(),
    ));

    let completions: Arc<dyn CompletionProvider> = Arc::new(OpenAiCompletionProvider::new(
        http_client,
        config.completion_api_key.clone(),
        config.completion_api_url.clone(),
        config.completion_model.clone(),
    ));

    let aggregator = Arc::new(RecommendationAggregator::new(
        completions,
        Arc::clone(&resolver),
    ));
    let store = InMemorySessionStore::new(Duration::from_secs(config.session_ttl_secs));
    let conversations = Arc::new(ConversationService::new(store, Arc::clone(&aggregator)));

    let state = AppState {
        conversations,
        aggregator,
        resolver,
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
