use pin_exam_backend::{
    config::{get_config, init_config, LogFormat},
    database::{pool, EntityStore, MemoryStore, PgStore},
    routes, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let (store, storage_kind): (Arc<dyn EntityStore>, &'static str) = match config.database_url {
        Some(_) => {
            let pool = pool::create_pool(config).await?;
            pool::run_migrations(&pool).await?;
            info!("Connected to PostgreSQL, migrations applied");
            (Arc::new(PgStore::new(pool)), "postgres")
        }
        None => {
            tracing::warn!(
                "DATABASE_URL is not set; using the in-memory store, data is lost on restart"
            );
            (Arc::new(MemoryStore::new()), "memory")
        }
    };

    let app_state = AppState::new(store, config.clone(), storage_kind);
    let app = routes::create_router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
