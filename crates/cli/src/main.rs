//! Marketplace CLI - Inspect and edit the device cart.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! mp-cart show
//!
//! # Add a product (or one more unit of it)
//! mp-cart add --id 1 --title Shirt --image-url https://cdn.example.com/1.png --price 10
//!
//! # Change quantities
//! mp-cart increment 1
//! mp-cart decrement 1
//! ```
//!
//! # Commands
//!
//! - `show` - Log every line in the cart
//! - `add` - Add one unit of a product
//! - `increment` / `decrement` - Adjust a line already in the cart
//!
//! The cart lives in `MARKETPLACE_DATA_DIR` and survives between runs, the
//! same way the app's cart survives a restart.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use marketplace_cart::{CartConfig, LogFormat};
use marketplace_core::Price;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "mp-cart")]
#[command(author, version, about = "Marketplace cart tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current cart
    Show,
    /// Add one unit of a product to the cart
    Add {
        /// Catalog product ID
        #[arg(long)]
        id: String,

        /// Product display name
        #[arg(short, long)]
        title: String,

        /// Product image URL
        #[arg(short, long)]
        image_url: String,

        /// Unit price
        #[arg(short, long)]
        price: Price,
    },
    /// Add one unit to a product already in the cart
    Increment {
        /// Catalog product ID
        id: String,
    },
    /// Remove one unit of a product (removes the line at zero)
    Decrement {
        /// Catalog product ID
        id: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Initialize tracing with `EnvFilter`, the configured output format and Sentry.
fn init_tracing(config: &CartConfig) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketplace_cart=info,marketplace_cli=info".into());

    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match CartConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &CartConfig) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Show => commands::cart::show(config).await,
        Commands::Add {
            id,
            title,
            image_url,
            price,
        } => commands::cart::add(config, id, title, image_url, price).await,
        Commands::Increment { id } => commands::cart::increment(config, id).await,
        Commands::Decrement { id } => commands::cart::decrement(config, id).await,
    }
}
