use std::sync::Arc;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use bucketbox::{
    config::{Args, Config},
    db::{create_pool, PgMetadataStore},
    llm::build_adapter,
    routes::create_router,
    storage::select_backend,
    utils::init_logger,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep the guard alive so file logs are flushed on exit
    let _log_guard = init_logger();

    let args = Args::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    config.apply_args(&args);
    info!("Configuration loaded: {:?}", config.server);

    // Connect to database
    let pool = create_pool(&config.database).await?;

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    if args.migrate_only {
        return Ok(());
    }

    // Object storage backend, chosen once for the life of the process
    let storage = select_backend(&config.storage)
        .map_err(|e| anyhow::anyhow!("Failed to initialise object storage: {}", e))?;

    let llm = build_adapter(&config.llm);

    // Create shared state
    let state = AppState::new(config.clone(), Arc::new(PgMetadataStore::new(pool)), storage, llm);

    // Create router
    let app = create_router(state);

    // Start server
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
