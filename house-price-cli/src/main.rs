//! house-price: acquire the Ames dataset, train and select a model, plot
//! its validation predictions, and serve it.

mod plots;
mod prompt;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::execute;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use house_price_io::remove_if_exists;
use house_price_pipeline::{load_best_model, load_processed, run_dataset, run_training, Regressor, Settings};
use house_price_serve::Predictor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "house-price")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ames house price prediction pipeline", long_about = None)]
struct Cli {
    /// Settings file (default: optional `house-price.toml` in the working directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the raw dataset if needed, clean, split and preprocess it
    Dataset {
        /// Download the dataset again even if a local copy exists
        #[arg(long)]
        force_refresh: bool,
    },
    /// Train every candidate model and keep the best one
    Train,
    /// Plot predicted against actual prices on the validation set
    Plot,
    /// Predict the price of one house
    Predict {
        /// Features as a JSON object; prompts on stdin when omitted
        #[arg(long)]
        json: Option<String>,
    },
    /// Serve predictions over HTTP
    Serve {
        /// Listen address (overrides the settings)
        #[arg(long)]
        addr: Option<String>,
    },
}

fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    match cli.command {
        Command::Dataset { force_refresh } => dataset(&settings, force_refresh),
        Command::Train => train(&settings),
        Command::Plot => plot(&settings),
        Command::Predict { json } => predict(&settings, json),
        Command::Serve { addr } => serve(&settings, addr),
    }
}

fn dataset(settings: &Settings, force_refresh: bool) -> Result<()> {
    info!("Preparing dataset...");
    let roles = run_dataset(settings, force_refresh).context("Dataset run failed")?;
    info!(
        numerical = roles.numerical.len(),
        categorical = roles.categorical.len(),
        dropped = roles.dropped_sparse.len() + roles.dropped_ids.len(),
        "Done."
    );
    Ok(())
}

fn train(settings: &Settings) -> Result<()> {
    info!("Training candidate models...");
    let best = run_training(&settings.paths()).context("Training run failed")?;
    info!(model = %best.name, rmse = best.rmse, r2 = best.r2, "Done.");
    Ok(())
}

fn plot(settings: &Settings) -> Result<()> {
    let paths = settings.paths();
    info!("Loading validation data and best model...");
    let data = load_processed(&paths).context("Failed to load processed data")?;
    let model = load_best_model(&paths).context("Failed to load the best model")?;

    remove_if_exists(&paths.prediction_plot).context("Failed to remove the previous plot")?;
    let predicted = model
        .predict(&data.x_valid)
        .context("Failed to predict the validation set")?;
    plots::save_prediction_plot(&paths.prediction_plot, &data.y_valid, &predicted)
        .map_err(|e| anyhow!("Failed to draw {}: {}", paths.prediction_plot.display(), e))?;
    info!(path = %paths.prediction_plot.display(), "Done.");
    Ok(())
}

fn predict(settings: &Settings, json: Option<String>) -> Result<()> {
    info!("Loading preprocessor and best model...");
    let predictor = Predictor::load(&settings.paths()).context("Failed to load artifacts")?;

    let record = match json {
        Some(text) => prompt::parse_features(&text)?,
        None => prompt::ask_features(std::io::stdin().lock(), std::io::stdout())?,
    };
    let price = predictor.predict(&record).context("Prediction failed")?;

    execute!(
        std::io::stdout(),
        SetForegroundColor(Color::Green),
        Print(format!("Predicted price: {}\n", prompt::format_price(price))),
        ResetColor
    )?;
    Ok(())
}

fn serve(settings: &Settings, addr: Option<String>) -> Result<()> {
    let addr = addr.unwrap_or_else(|| settings.serve_addr.clone());
    let predictor = Arc::new(Predictor::load(&settings.paths()).context("Failed to load artifacts")?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        house_price_serve::serve(listener, predictor)
            .await
            .context("server terminated unexpectedly")
    })
}
