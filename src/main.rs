use docshub::{
    api::{build_router, AppState},
    config::Config,
    registry::ProjectRegistry,
    search::SearchService,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docshub=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    tracing::info!("Starting docshub v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Serving mode: {}",
        if config.serving.use_subdomain {
            "subdomain"
        } else {
            "path"
        }
    );

    // Open or create the search indexes
    let search = Arc::new(
        SearchService::new(config.search.clone(), config.serving.use_subdomain).await?,
    );
    tracing::info!(path = %config.search.index_path.display(), "Search indexes ready");

    // Project registry (system of record for reindexing)
    let registry = Arc::new(ProjectRegistry::new());

    let config = Arc::new(config);
    let app_state = AppState::new(search, registry, config.clone());
    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Search page: http://{}/search", http_addr);
    tracing::info!("   Search API: http://{}/api/v2/search", http_addr);

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
