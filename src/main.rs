use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use gift_recommender::{
    config::Config,
    api::routes::create_router,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gift_recommender=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = Config::load()?;
    let server_addr = config.server_addr;

    tracing::info!(
        provider = %config.provider,
        model = %config.model,
        product_source = %config.product_source,
        api_key_configured = !config.api_key.is_empty(),
        google_shopping = config.google_shopping_configured(),
        unsplash = config.unsplash_configured(),
        "Loaded configuration"
    );

    let app_state = AppState::new(config);
    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;
    tracing::info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
