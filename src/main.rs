use std::sync::Arc;

use booking_assist::config::AppConfig;
use booking_assist::routes::{ChatRouteState, chat_routes};
use booking_assist::secrets::{AzureCredential, KeyVaultStore};
use booking_assist::service;
use booking_assist::session::spawn_prune_task;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("  Required: KEY_VAULT_NAME, OPENAI_API_SECRET_NAME, DEPLOYMENT_NAME,");
        eprintln!("            OPENAI_ENDPOINT_URL, API_URL");
        std::process::exit(1);
    });

    eprintln!("📅 Booking Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Deployment: {}", config.deployment);
    eprintln!("   Key Vault: {}", config.key_vault_url());
    eprintln!("   Booking API: {}", config.booking_api_url);
    eprintln!("   Chat API: http://0.0.0.0:{}/api/chat\n", config.port);

    // ── Assistant ───────────────────────────────────────────────────────
    let secrets = KeyVaultStore::new(config.key_vault_url(), AzureCredential::from_env());
    let service = Arc::new(service::bootstrap(&config, &secrets).await.unwrap_or_else(|e| {
        eprintln!("Error: Failed to initialize assistant: {}", e);
        std::process::exit(1);
    }));

    // ── Sessions ────────────────────────────────────────────────────────
    let _prune_handle = spawn_prune_task(Arc::clone(service.sessions()));

    // ── HTTP ────────────────────────────────────────────────────────────
    let app = chat_routes(ChatRouteState {
        service: Arc::clone(&service),
    })
    .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Chat server started");
    axum::serve(listener, app).await?;

    Ok(())
}
