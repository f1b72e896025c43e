use sqlx::{postgres::PgPoolOptions, PgPool};

/// Opens the connection pool for the attraction catalog and rating store.
///
/// Recommendation requests fan out into several short reads, so connections
/// are pooled and reused; the cap comes from configuration.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}
