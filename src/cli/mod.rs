use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api;
use crate::application::{CurrencyConverter, CurrencyLayer, FixedRates, LedgerService};
use crate::telemetry;

pub const DEFAULT_RATES_URL: &str = "http://api.currencylayer.com/live";

/// Saldo - balances and transfer ledger over HTTP
#[derive(Parser, Debug)]
#[command(name = "saldo")]
#[command(about = "Keeps per-user balances and an append-only transfer ledger behind an HTTP API")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "SALDO_DATABASE", default_value = "saldo.db", global = true)]
    pub database: String,

    /// Currency balances are stored in
    #[arg(long, env = "SALDO_BASE_CURRENCY", default_value = "RUB", global = true)]
    pub base_currency: String,

    /// currencylayer-compatible `live` endpoint
    #[arg(long, env = "SALDO_RATES_URL", default_value = DEFAULT_RATES_URL, global = true)]
    pub rates_url: String,

    /// Access key for the rates endpoint (conversion is disabled without it)
    #[arg(long, env = "SALDO_RATES_ACCESS_KEY", hide_env_values = true, global = true)]
    pub rates_access_key: Option<String>,

    /// Seconds to wait for the rates endpoint before giving up
    #[arg(long, env = "SALDO_RATES_TIMEOUT_SECS", default_value_t = 10, global = true)]
    pub rates_timeout_secs: u64,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and run migrations
    Init,

    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "SALDO_ADDR", default_value = "0.0.0.0:9000")]
        addr: SocketAddr,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        telemetry::init(&self.log_level, self.log_json);

        let service = LedgerService::init(&self.database, self.converter(), &self.base_currency)
            .await
            .with_context(|| format!("Failed to open database {}", self.database))?;

        match self.command {
            Commands::Init => {
                info!(database = %self.database, "database initialized");
                Ok(())
            }
            Commands::Serve { addr } => {
                let listener = TcpListener::bind(addr)
                    .await
                    .with_context(|| format!("Failed to bind {}", addr))?;

                info!(
                    %addr,
                    database = %self.database,
                    base_currency = service.base_currency(),
                    "listening"
                );
                api::serve(listener, Arc::new(service)).await
            }
        }
    }

    fn converter(&self) -> Arc<dyn CurrencyConverter> {
        match &self.rates_access_key {
            Some(key) => Arc::new(
                CurrencyLayer::new(
                    self.rates_url.as_str(),
                    key.as_str(),
                    self.base_currency.as_str(),
                )
                .with_timeout(Duration::from_secs(self.rates_timeout_secs)),
            ),
            None => {
                warn!("no rates access key configured; currency conversion is unavailable");
                Arc::new(FixedRates::new())
            }
        }
    }
}
