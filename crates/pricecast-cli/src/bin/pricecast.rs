use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use pricecast_cli::config::FileConfig;
use pricecast_cli::input::read_wide_csv;
use pricecast_cli::report::render_summary;
use pricecast_core::{build_panel, predict, train_panel, ArtifactStore};

#[derive(Parser)]
#[command(version, about = "Monthly commodity price forecasting")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Train and persist the best model per commodity from a wide price CSV
    Train {
        /// Wide CSV: one row per month, one column per commodity
        #[arg(long, value_name = "FILE")]
        data: Option<PathBuf>,
        /// Directory the model artifacts are written to
        #[arg(long, value_name = "DIR")]
        models_dir: Option<PathBuf>,
        /// TOML configuration file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Forecast a commodity from its stored artifact, printed as JSON
    Predict {
        /// Commodity name, as printed by `list`
        commodity: String,
        /// Months to predict, starting at the current month
        #[arg(long, default_value_t = 1)]
        months: usize,
        #[arg(long, value_name = "DIR")]
        models_dir: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// List commodities that have a stored artifact
    List {
        #[arg(long, value_name = "DIR")]
        models_dir: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Train {
            data,
            models_dir,
            config,
        } => run_train(data, models_dir, config),
        Cmd::Predict {
            commodity,
            months,
            models_dir,
            config,
        } => run_predict(&commodity, months, models_dir, config),
        Cmd::List { models_dir, config } => run_list(models_dir, config),
    }
}

fn run_train(
    data: Option<PathBuf>,
    models_dir: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<()> {
    let config = FileConfig::load_or_default(config.as_deref())?;
    let data = data
        .or_else(|| config.data.clone())
        .context("no price CSV given; pass --data or set `data` in the config")?;
    let store = ArtifactStore::new(config.models_dir(models_dir));
    let options = config.training_options();

    let table = read_wide_csv(&data)?;
    let panel = build_panel(&table);
    let outcomes = train_panel(&panel, &store, &options)?;

    tracing::info!(
        trained = outcomes.len(),
        models_dir = %store.dir().display(),
        "training sweep finished"
    );
    print!("{}", render_summary(&outcomes));
    Ok(())
}

fn run_predict(
    commodity: &str,
    months: usize,
    models_dir: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<()> {
    let config = FileConfig::load_or_default(config.as_deref())?;
    let store = ArtifactStore::new(config.models_dir(models_dir));

    let descriptor = store.load(commodity)?;
    let today = chrono::Local::now().date_naive();
    let rows = predict(&descriptor, months, today)?;
    if rows.is_empty() {
        tracing::warn!(commodity = %commodity, "no predictions available");
    }
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn run_list(models_dir: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let config = FileConfig::load_or_default(config.as_deref())?;
    let store = ArtifactStore::new(config.models_dir(models_dir));
    for commodity in store.list()? {
        println!("{commodity}");
    }
    Ok(())
}
