use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wayfarer_api::{config::Config, db, middleware::request_id, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfarer_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool =
        db::postgres::create_pool(&config.database_url, config.database_max_connections).await?;
    sqlx::migrate!().run(&pool).await?;

    let redis_client = db::redis::create_redis_client(&config.redis_url)?;
    let cache = db::redis::RedisCache::new(redis_client);

    let state = AppState::new(pool, cache, config.recommendation_ttl_secs);

    let app = routes::create_router(state)
        .layer(TraceLayer::new_for_http().make_span_with(request_id::make_span))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Wayfarer API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
