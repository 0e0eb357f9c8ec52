// Market Regime Detector - CLI
// Fetches price history, fits the regime model and reports the current regime

use clap::{Parser, Subcommand};
use std::path::Path;
use tracing::{error, info, warn, Level};

use market_regime::{Config, ConfigError, RegimeError};

// Load command modules from cli directory
#[path = "../cli/detect_commands.rs"]
mod detect_commands;

use detect_commands::DetectOptions;

#[derive(Parser)]
#[command(name = "regime")]
#[command(version)]
#[command(about = "Three-state market regime detection", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "regime.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Detect regimes for a symbol
    Detect {
        /// Trading pair (e.g., XBTUSD)
        #[arg(short, long)]
        symbol: Option<String>,

        /// Bar interval (1m, 5m, 15m, 30m, 1h, 4h, 1d, 1wk)
        #[arg(short, long)]
        interval: Option<String>,

        /// First date of interest (YYYY-MM-DD); warm-up is fetched before it
        #[arg(long)]
        start: Option<String>,

        /// Read bars from a JSON file instead of Kraken
        #[arg(long)]
        input: Option<String>,

        /// Save the full report as JSON
        #[arg(short, long)]
        output: Option<String>,

        /// Print the full report as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Summarize a saved report
    Inspect {
        /// Report file written by `detect --output`
        file: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Config is read before the subscriber exists so `logging.level` applies;
    // load problems are reported once logging is up
    let loaded = read_config(&cli.config);
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        match &loaded {
            Ok(Some(config)) => config.logging.max_level().unwrap_or(Level::INFO),
            _ => Level::INFO,
        }
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    let outcome = match cli.command {
        Commands::Init { force } => init_config(&cli.config, force),
        Commands::Detect { symbol, interval, start, input, output, json } => match resolve_config(&cli.config, loaded) {
            Ok(config) => {
                let options = DetectOptions { symbol, interval, start, input, output, json };
                detect_commands::run_detect(options, &config).await
            }
            Err(e) => Err(e),
        },
        Commands::Inspect { file } => detect_commands::inspect_report(&file),
    };

    if let Err(e) = outcome {
        error!("❌ {} error", e.category());
        error!("{}", e.user_message());
        std::process::exit(1);
    }
}

/// Config from `path`, or `None` when the file does not exist
fn read_config(path: &str) -> Result<Option<Config>, ConfigError> {
    if Path::new(path).exists() {
        Config::from_file(path).map(Some)
    } else {
        Ok(None)
    }
}

fn resolve_config(path: &str, loaded: Result<Option<Config>, ConfigError>) -> Result<Config, RegimeError> {
    match loaded? {
        Some(config) => {
            info!("📁 Config: {}", path);
            Ok(config)
        }
        None => {
            warn!("⚠️  {} not found, using defaults (run `regime init` to create it)", path);
            Ok(Config::default())
        }
    }
}

fn init_config(path: &str, force: bool) -> Result<(), RegimeError> {
    if Path::new(path).exists() && !force {
        warn!("⚠️  {} already exists, skipping (use --force to overwrite)", path);
        return Ok(());
    }

    Config::default().to_file(path)?;
    info!("📝 Created {}", path);
    info!("💡 Next steps:");
    info!("   1. Edit {} to pick a symbol and start date", path);
    info!("   2. Run: regime detect");
    Ok(())
}
