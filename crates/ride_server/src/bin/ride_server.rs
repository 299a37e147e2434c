use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ride_core::RideService;
use ride_server::auth::JwtValidator;
use ride_server::config::Args;
use ride_server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "ride_server={level},ride_core={level},info",
            level = args.log_level
        )
        .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let auth = match args.jwt_secret() {
        Some(secret) if args.dev_mode && args.jwt_secret.is_none() => {
            warn!("No JWT_SECRET set, using the built-in development secret");
            JwtValidator::new(secret, args.jwt_expiry_seconds)?
        }
        Some(secret) => JwtValidator::new(secret, args.jwt_expiry_seconds)?,
        None => anyhow::bail!("JWT_SECRET is required in production mode"),
    };

    let config = args.service_config();
    info!("======================================");
    info!("  Ride dispatch server");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Match radius: {} m", config.dispatch.match_radius_m);
    info!("Match candidates: {}", config.dispatch.max_candidates);
    info!("Auto dispatch: {}", config.dispatch.auto_dispatch);
    info!("Fare rate: {} per km per seat", config.pricing.rate_per_km_per_seat);
    info!("======================================");

    let state = AppState::new(RideService::in_memory(config), auth);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("Server is running on http://{}", args.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
