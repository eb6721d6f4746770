use anyhow::{Context, Result};
use axum::Router;
use serde::Deserialize;
use std::{env, fs, net::SocketAddr, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vrent_storefront::{AppState, config::Settings, erp_api, routes};

// Define structure for proxy configuration
#[derive(Deserialize, Debug)]
struct ProxyConfig {
    http_proxy: Option<String>,
    https_proxy: Option<String>,
}

// Load proxyconfig.json, if present, into HTTP(S)_PROXY before the ERP client is built
fn load_and_set_proxy_env_vars() -> Result<()> {
    let config_path = Path::new("proxyconfig.json");
    if !config_path.exists() {
        tracing::info!("proxyconfig.json not found, skipping proxy environment variable setup.");
        return Ok(());
    }

    tracing::info!("Found proxyconfig.json, attempting to load proxy settings...");
    let config_content = fs::read_to_string(config_path).context("Failed to read proxyconfig.json")?;
    let proxy_config: ProxyConfig =
        serde_json::from_str(&config_content).context("Failed to parse proxyconfig.json")?;

    for (key, value) in [
        ("HTTP_PROXY", proxy_config.http_proxy),
        ("HTTPS_PROXY", proxy_config.https_proxy),
    ] {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            // SAFETY: only called from the synchronous main before the tokio runtime is built; no other thread exists yet.
            unsafe { env::set_var(key, value) };
            tracing::info!("Set {} environment variable from config.", key);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vrent_storefront=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    // Still single-threaded here; the runtime starts below.
    if let Err(e) = load_and_set_proxy_env_vars() {
        tracing::warn!("Failed to load or apply proxy configuration: {}", e);
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(serve())
}

async fn serve() -> Result<()> {
    tracing::info!("Initializing V-Rent storefront server...");

    let settings = Settings::new().context("Failed to load configuration")?;
    tracing::info!(erp = %settings.erp_origin(), "Configuration loaded successfully.");

    // Built after the proxy env vars so reqwest picks them up
    let http_client = erp_api::build_http_client(&settings).context("Failed to build shared reqwest client")?;
    let app_state =
        AppState::new(Arc::new(settings), Arc::new(http_client)).context("Failed to build application state")?;

    let addr: SocketAddr = app_state
        .settings
        .server_address
        .parse()
        .with_context(|| format!("Invalid server address format: {}", app_state.settings.server_address))?;

    let app: Router = routes::create_router(app_state)
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
