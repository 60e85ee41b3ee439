//! Leadgen CLI
//!
//! Operator tooling for quote funnel experiments.
//!
//! # Usage
//!
//! ```bash
//! leadgen bucket cookie-abc cookie-def
//! leadgen bucket cookie-abc -c campaign.toml
//! leadgen simulate -c campaign.toml --visitors 10000 --conversion-rate 0.04 --seed 7
//! leadgen config set reconcile_grace_secs 60
//! leadgen simulate -c campaign.yaml --format json
//! ```

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "leadgen")]
#[command(author = "Leadgen")]
#[command(version = "0.1.0")]
#[command(about = "Leadgen experiments command line interface", long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, short, global = true)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short, global = true)]
    profile: Option<String>,

    /// Tracing filter, overrides RUST_LOG and the configured level
    #[arg(long, env = "LEADGEN_LOG", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the bucket each visitor id hashes to
    Bucket {
        /// Visitor ids (cookie values)
        #[arg(required = true)]
        visitor_ids: Vec<String>,
        /// Campaign definition used to resolve the variant for each bucket
        #[arg(short, long)]
        campaign: Option<String>,
    },
    /// Run synthetic traffic through a campaign and print its report
    Simulate {
        /// Campaign definition file (toml, yaml or json)
        #[arg(short, long)]
        campaign: String,
        /// Number of synthetic visitors
        #[arg(long, default_value_t = 10_000)]
        visitors: u64,
        /// Probability that a visitor converts, unless the variant sets its own
        #[arg(long, default_value_t = 0.05)]
        conversion_rate: f64,
        /// Seed for the conversion draws
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = config::Config::load(cli.profile.as_deref()).unwrap_or_default();

    let filter = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| config.engine().log_level);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let format = cli.format.unwrap_or_else(|| config.format());

    let result = match cli.command {
        Commands::Bucket { visitor_ids, campaign } => {
            commands::bucket::handle(&visitor_ids, campaign.as_deref(), format)
        }
        Commands::Simulate {
            campaign,
            visitors,
            conversion_rate,
            seed,
        } => {
            let options = commands::simulate::SimulateOptions {
                campaign_path: campaign,
                visitors,
                conversion_rate,
                seed,
            };
            commands::simulate::handle(options, &config, format).await
        }
        Commands::Config { action } => commands::config::handle(action, cli.profile.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
