//! NekoLc API server binary.
//!
//! Loads `app.json`, applies environment and flag overrides, opens the
//! configured token store and serves the `/v0` API until Ctrl-C.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use nekolc_api::services::auth::AuthService;
use nekolc_core::auth::StaticCredentials;
use nekolc_core::clock::SystemClock;
use nekolc_core::store::{ensure_data_dir, open_store};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{AppConfig, Overrides};

/// CLI arguments. Each flag can also be set through the named env var.
#[derive(Parser, Debug)]
#[command(name = "nekolc_server", about = "NekoLc launcher API server", version)]
struct Args {
    /// Directory holding `app.json`.
    #[arg(long, env = "CONFIG_PATH", default_value = "./configs")]
    config: PathBuf,

    /// Port to listen on.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Enable debug mode.
    #[arg(
        long,
        env = "DEBUG_MODE",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    debug: Option<bool>,

    /// Enable the authentication endpoints.
    #[arg(
        long,
        env = "ENABLE_AUTH",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    enable_auth: Option<bool>,

    /// Token signing secret.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Token store backend: `sqlite` or `file`.
    #[arg(long, env = "DATABASE_TYPE")]
    database_type: Option<String>,

    /// SQLite database file, or directory for the file store.
    #[arg(long, env = "DATABASE_PATH")]
    database_path: Option<String>,

    /// API version reported in `meta`.
    #[arg(long, env = "API_VERSION")]
    api_version: Option<String>,

    /// Build version reported in `meta`.
    #[arg(long, env = "BUILD_VERSION")]
    build_version: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            port: self.port,
            debug: self.debug,
            enable_auth: self.enable_auth,
            jwt_secret: self.jwt_secret.clone(),
            database_type: self.database_type.clone(),
            database_path: self.database_path.clone(),
            api_version: self.api_version.clone(),
            build_version: self.build_version.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let default_filter = if args.debug == Some(true) {
        "debug"
    } else {
        "info,nekolc_api=debug,nekolc_core=debug"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_filter))?,
        )
        .init();

    let config = AppConfig::load(&args.config).with_overrides(&args.overrides());
    let port = config.port()?;
    let api_config = config.api_config()?;

    info!(
        config_dir = %args.config.display(),
        auth_enabled = config.authentication.enabled,
        debug = config.debug.enabled,
        database_type = %config.database.kind,
        database_path = %config.database.path,
        "configuration loaded"
    );
    if config.authentication.enabled && config.uses_default_secret() {
        warn!("authentication is enabled with the default secret; set JWT_SECRET");
    }

    let store_config = config.store_config();
    ensure_data_dir(&store_config)?;
    let clock = Arc::new(SystemClock);
    let store = open_store(&store_config, clock.clone()).await?;

    let auth = AuthService::new(
        &api_config.auth,
        Arc::new(StaticCredentials::with_default_admin()),
        store.clone(),
        clock,
    )?;
    let state = nekolc_api::AppState {
        auth: Arc::new(auth),
        config: api_config,
    };
    let app = nekolc_api::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(addr = %listener.local_addr()?, "NekoLc server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await;

    store.close().await?;
    served?;
    Ok(())
}
