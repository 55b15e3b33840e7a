use crate::application::payments::PaymentSettings;
use crate::infrastructure::stripe::STRIPE_API_BASE;
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Service configuration. Every flag falls back to an environment variable.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to bind the HTTP server to
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Browser origin allowed to call the API with credentials
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:5173")]
    pub cors_origin: String,

    /// Stripe secret key. Without it an offline in-process provider is used.
    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    pub stripe_secret_key: Option<String>,

    /// Base URL of the Stripe API
    #[arg(long, env = "STRIPE_API_BASE", default_value = STRIPE_API_BASE)]
    pub stripe_api_base: String,

    /// Currency payment intents are created in
    #[arg(long, env = "PAYMENT_CURRENCY", default_value = "usd")]
    pub currency: String,

    /// Record payments without checking the provider confirmed the charge
    #[arg(long, env = "ALLOW_UNCONFIRMED_PAYMENTS")]
    pub allow_unconfirmed_payments: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn payment_settings(&self) -> PaymentSettings {
        PaymentSettings {
            currency: self.currency.to_lowercase(),
            require_confirmed_charge: !self.allow_unconfirmed_payments,
        }
    }
}
