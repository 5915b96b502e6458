//! carrent - command line client for the peer-to-peer car rental marketplace.
//!
//! Browse cars, register your own, rent and return them, and follow GPS and
//! notifications for your rentals. Logging in signs a server challenge with
//! your wallet.

mod commands;
mod prompt;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use carrent_core::auth::{open_token_storage, LoginFlow, RouteGuard, SessionStore};
use carrent_core::{ApiClient, Config};

#[derive(Debug, Parser)]
#[command(name = "carrent", version, about = "Peer-to-peer car rental marketplace client")]
struct Cli {
    /// Wallet account to act as (defaults to the last account used)
    #[arg(long, global = true, env = "CARRENT_ACCOUNT")]
    account: Option<String>,

    /// Marketplace API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in by signing a server challenge with your wallet
    Login,
    /// Forget the stored session
    Logout,
    /// Show session and wallet status
    Status,
    /// List cars available for rent
    Cars {
        /// Only show cars whose make or model contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one car
    Car { vin: String },
    /// List cars registered by an owner (defaults to your account)
    Owned {
        #[arg(long)]
        owner: Option<String>,
    },
    /// Register a car for rent
    Register {
        #[arg(long)]
        vin: String,
        #[arg(long)]
        make: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        year: String,
        /// Daily price in ETH
        #[arg(long)]
        price: String,
        #[arg(long, default_value = "")]
        image_url: String,
    },
    /// Rent a car for a number of days
    Rent {
        vin: String,
        #[arg(long, default_value_t = 1)]
        days: u32,
    },
    /// List your active and past rentals
    Rentals,
    /// Complete an active rental
    Complete { rental_id: String },
    /// Show notifications, or mark them read
    Notifications {
        #[arg(long, conflicts_with = "read_all")]
        read: Option<String>,
        #[arg(long)]
        read_all: bool,
    },
    /// Follow GPS fixes and notifications until Ctrl-C
    Watch,
}

/// Shared state handed to every command
pub struct AppContext {
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub api: ApiClient,
    pub guard: RouteGuard,
    pub account: Option<String>,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "carrent.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url.clone() {
        config.api_base_url = url;
    }

    let _log_guard = init_tracing(config.log_file.as_deref());
    info!(api = %config.api_base_url, "carrent starting");

    let cache_dir = config.cache_dir()?;
    let storage = open_token_storage(config.token_storage, cache_dir);
    let session = Arc::new(SessionStore::new(storage));

    let account = cli
        .account
        .clone()
        .or_else(|| config.last_account.clone())
        .filter(|a| !a.trim().is_empty());
    session
        .wallet_changed(account.as_deref())
        .context("Failed to update session for wallet")?;

    let api = ApiClient::authenticated(&config.api_base_url, Arc::clone(&session))
        .context("Failed to create API client")?;

    let ctx = AppContext {
        guard: RouteGuard::new(Arc::clone(&session)),
        config,
        session,
        api,
        account,
    };

    match cli.command {
        Command::Login => {
            let flow = LoginFlow::new(&ctx.api, Arc::clone(&ctx.session));
            commands::login(ctx, &flow).await
        }
        Command::Logout => {
            let flow = LoginFlow::new(&ctx.api, Arc::clone(&ctx.session));
            flow.logout()?;
            println!("Logged out");
            Ok(())
        }
        Command::Status => commands::status(&ctx),
        Command::Cars { search } => commands::cars(&ctx, search.as_deref()).await,
        Command::Car { vin } => commands::car(&ctx, &vin).await,
        Command::Owned { owner } => commands::owned(&ctx, owner).await,
        Command::Register {
            vin,
            make,
            model,
            year,
            price,
            image_url,
        } => {
            let form = carrent_core::models::CarForm {
                vin_number: vin,
                make,
                model,
                year,
                rental_price: price,
                image_url,
            };
            commands::register(&ctx, form).await
        }
        Command::Rent { vin, days } => commands::rent(&ctx, &vin, days).await,
        Command::Rentals => commands::rentals(&ctx).await,
        Command::Complete { rental_id } => commands::complete(&ctx, &rental_id).await,
        Command::Notifications { read, read_all } => {
            commands::notifications(&ctx, read, read_all).await
        }
        Command::Watch => commands::watch(&ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_rent() {
        let cli = Cli::try_parse_from(["carrent", "--account", "0xabc", "rent", "VIN1", "--days", "3"])
            .expect("valid arguments");
        assert_eq!(cli.account.as_deref(), Some("0xabc"));
        assert!(matches!(cli.command, Command::Rent { ref vin, days: 3 } if vin == "VIN1"));
    }

    #[test]
    fn test_parse_cars_search() {
        let cli = Cli::try_parse_from(["carrent", "cars", "--search", "honda"]).expect("valid arguments");
        assert!(matches!(cli.command, Command::Cars { search: Some(ref term) } if term == "honda"));
    }

    #[test]
    fn test_read_flags_conflict() {
        let parsed = Cli::try_parse_from(["carrent", "notifications", "--read", "n1", "--read-all"]);
        assert!(parsed.is_err());
    }
}
