use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use next_favorite_api::{
    api::{create_router, AppState, Catalogs},
    config::Config,
    db::{
        create_pool, create_redis_client, run_migrations, Cache, PgRegistryStore, PgSourceStore,
    },
    services::{JikanProvider, PosterEnricher, TmdbPosterClient, TraktProvider},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "next_favorite_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let (cache, cache_writer) = Cache::new(create_redis_client(&config.redis_url)?);

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let catalogs = Catalogs::new(
        Arc::new(JikanProvider::new(
            http_client.clone(),
            cache.clone(),
            config.jikan_api_url.clone(),
        )),
        Arc::new(TraktProvider::movies(
            http_client.clone(),
            cache.clone(),
            config.trakt_api_key.clone(),
            config.trakt_api_url.clone(),
        )),
        Arc::new(TraktProvider::shows(
            http_client.clone(),
            cache.clone(),
            config.trakt_api_key.clone(),
            config.trakt_api_url.clone(),
        )),
    );

    let posters = PosterEnricher::new(
        Arc::new(TmdbPosterClient::new(
            http_client,
            cache,
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
        )),
        config.tmdb_image_url.clone(),
        config.poster_size.clone(),
    );

    let state = AppState {
        registries: Arc::new(PgRegistryStore::new(pool.clone())),
        sources: Arc::new(PgSourceStore::new(pool)),
        catalogs,
        detail_posters: posters.with_size(config.detail_poster_size.clone()),
        posters,
        admin_group: config.admin_group.clone(),
    };

    let app = create_router(state, &config.allowed_origins);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_writer.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
