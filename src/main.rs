use std::path::PathBuf;

use anyhow::{Context, Result};
use avgx::config::{default_config_path, ResolvedConfig};
use avgx::rates::AssetClass;
use avgx::AvgxServiceBuilder;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "avgx")]
#[command(about = "AVGX composite index: rates, averages and conversions")]
struct Cli {
    /// Path to config file (defaults to ./avgx.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serve baseline and default rates only, without contacting providers
    #[arg(long)]
    offline: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Basket {
    Fiat,
    Crypto,
}

impl From<Basket> for AssetClass {
    fn from(basket: Basket) -> Self {
        match basket {
            Basket::Fiat => AssetClass::Fiat,
            Basket::Crypto => AssetClass::Crypto,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Current AVGX value with both basket averages
    Index,
    /// Reconciled rates and weights for one basket
    Rates {
        #[arg(value_enum)]
        basket: Basket,
    },
    /// Weighted USD average of one basket
    Average {
        #[arg(value_enum)]
        basket: Basket,
    },
    /// Index points recorded in this process
    History,
    /// Convert an amount between AVGX, USD and configured codes
    Convert {
        amount: f64,
        from: String,
        to: String,
    },
    /// Freshness, baseline usage and missing codes per basket
    Status,
    /// Show resolved configuration
    Config,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    if json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load avgx config: {}", config_path.display()))?;

    if let Command::Config = cli.command {
        println!("Config file: {}", config_path.display());
        return print_json(&config);
    }

    let mut builder = AvgxServiceBuilder::new(config);
    if cli.offline {
        builder = builder.offline_only();
    }
    let service = builder.build();

    match cli.command {
        Command::Index => print_json(&service.current_index().await?),
        Command::Rates { basket } => {
            let rates = match AssetClass::from(basket) {
                AssetClass::Fiat => service.fiat_rates_with_weights().await,
                AssetClass::Crypto => service.crypto_prices_with_weights().await,
            };
            print_json(&rates)
        }
        Command::Average { basket } => {
            let class = AssetClass::from(basket);
            let average = match class {
                AssetClass::Fiat => service.weighted_fiat_average().await?,
                AssetClass::Crypto => service.weighted_crypto_average().await?,
            };
            print_json(&serde_json::json!({ "class": class, "usd_average": average }))
        }
        Command::History => {
            service.current_index().await?;
            print_json(&service.history())
        }
        Command::Convert { amount, from, to } => {
            let result = service.convert(amount, &from, &to).await?;
            print_json(&serde_json::json!({
                "amount": amount,
                "from": from.to_uppercase(),
                "to": to.to_uppercase(),
                "result": result,
            }))
        }
        Command::Status => {
            service.refresh_all().await;
            print_json(&service.status())
        }
        Command::Config => Ok(()),
    }
}
