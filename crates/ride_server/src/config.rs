//! CLI arguments and environment variable handling using clap.

use std::net::SocketAddr;

use clap::Parser;
use ride_core::config::{DispatchConfig, IndexConfig, ServiceConfig};
use ride_core::pricing::PricingConfig;

/// Shortest signing secret accepted outside dev mode.
pub const MIN_SECRET_LEN: usize = 32;

const DEV_SECRET: &str = "dev-mode-secret-not-for-production-use-123456";

/// Ride dispatch server: trip HTTP API plus the real-time channel.
#[derive(Parser, Debug, Clone)]
#[command(name = "ride_server")]
#[command(about = "Matches trips to nearby captains and streams trip updates")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// HS256 secret for verifying caller tokens (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds for tokens minted by this process
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (built-in secret allowed)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Radius in meters searched for captains around a pickup
    #[arg(long, env = "MATCH_RADIUS_M", default_value = "2000")]
    pub match_radius_m: f64,

    /// Nearest captains tried per match attempt
    #[arg(long, env = "MATCH_CANDIDATES", default_value = "10")]
    pub match_candidates: usize,

    /// Start matching as soon as a trip is requested
    #[arg(long, env = "AUTO_DISPATCH", default_value = "true", action = clap::ArgAction::Set)]
    pub auto_dispatch: bool,

    /// Fare per kilometer per seat
    #[arg(long, env = "FARE_RATE_PER_KM", default_value = "0.40")]
    pub fare_rate_per_km: f64,
}

impl Args {
    /// Effective signing secret. Dev mode falls back to a built-in value.
    pub fn jwt_secret(&self) -> Option<String> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => Some(secret.clone()),
            (None, true) => Some(DEV_SECRET.to_string()),
            (None, false) => None,
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            dispatch: DispatchConfig {
                match_radius_m: self.match_radius_m,
                max_candidates: self.match_candidates,
                auto_dispatch: self.auto_dispatch,
            },
            pricing: PricingConfig {
                rate_per_km_per_seat: self.fare_rate_per_km,
                ..PricingConfig::default()
            },
            index: IndexConfig::default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match &self.jwt_secret {
            None if !self.dev_mode => {
                return Err("JWT_SECRET is required in production mode".to_string())
            }
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(format!(
                    "JWT_SECRET must be at least {MIN_SECRET_LEN} characters"
                ))
            }
            _ => {}
        }

        if !self.match_radius_m.is_finite() || self.match_radius_m <= 0.0 {
            return Err("MATCH_RADIUS_M must be a positive number of meters".to_string());
        }
        if self.match_candidates == 0 {
            return Err("MATCH_CANDIDATES must be at least 1".to_string());
        }
        if !self.fare_rate_per_km.is_finite() || self.fare_rate_per_km < 0.0 {
            return Err("FARE_RATE_PER_KM must not be negative".to_string());
        }

        Ok(())
    }
}
