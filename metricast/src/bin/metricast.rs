//! # metricast
//!
//! Command-line interface for forecasting, spike detection and rollups of a
//! daily metric stored as CSV (`date,value`).

use clap::{Parser, Subcommand};
use metricast::aggregate::{self, Aggregation, Period};
use metricast::data::{
    write_csv, write_json, DataLoader, LoggingWarehouse, MissingValues, WarehouseSink,
};
use metricast::{EngagementForecaster, ForecastConfig, Result, Series};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "metricast")]
#[command(about = "Forecasting and spike detection for daily engagement metrics", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Carry the previous value into empty cells instead of rejecting the file
    #[arg(long, global = true)]
    fill_forward: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on the input series and forecast future days
    Forecast {
        /// Input CSV with a date column and a numeric value column
        #[arg(short, long)]
        input: PathBuf,

        /// Number of days to forecast
        #[arg(long, allow_hyphen_values = true)]
        horizon: i64,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Value column (default: first numeric column)
        #[arg(long)]
        column: Option<String>,

        /// Output file; `.json` writes JSON, anything else CSV (default: CSV on stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Flag days whose z-score exceeds the threshold
    Spikes {
        #[arg(short, long)]
        input: PathBuf,

        /// Absolute z-score threshold (default: the configured spike threshold)
        #[arg(short, long)]
        threshold: Option<f64>,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        column: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Roll the series up to weeks or months
    Aggregate {
        #[arg(short, long)]
        input: PathBuf,

        /// week or month
        #[arg(short, long, default_value = "week")]
        period: Period,

        /// Sum values instead of averaging them
        #[arg(long)]
        sum: bool,

        #[arg(long)]
        column: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report a dry-run warehouse load of the rollup under this table name
        #[arg(long)]
        load_table: Option<String>,
    },

    /// Add 7-day averages, growth and anomaly flags to every day
    Enrich {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        column: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Market penetration of the latest user count
    Market {
        #[arg(short, long)]
        input: PathBuf,

        /// Total addressable market
        #[arg(long)]
        tam: f64,

        /// Serviceable addressable market
        #[arg(long)]
        sam: f64,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        column: Option<String>,
    },

    /// Hold out the last days, forecast them and score the forecast
    Backtest {
        #[arg(short, long)]
        input: PathBuf,

        /// Number of trailing days to hold out
        #[arg(long)]
        holdout: usize,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        column: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let missing = if cli.fill_forward {
        MissingValues::ForwardFill
    } else {
        MissingValues::Reject
    };
    let source = Source { missing };

    let result = match cli.command {
        Commands::Forecast {
            input,
            horizon,
            config,
            column,
            output,
        } => source.load(&input, column.as_deref()).and_then(|series| {
            run_forecast(&series, horizon, config.as_deref(), output.as_deref())
        }),

        Commands::Spikes {
            input,
            threshold,
            config,
            column,
            output,
        } => source.load(&input, column.as_deref()).and_then(|series| {
            run_spikes(&series, threshold, config.as_deref(), output.as_deref())
        }),

        Commands::Aggregate {
            input,
            period,
            sum,
            column,
            output,
            load_table,
        } => source.load(&input, column.as_deref()).and_then(|series| {
            run_aggregate(&series, period, sum, output.as_deref(), load_table.as_deref())
        }),

        Commands::Enrich {
            input,
            config,
            column,
            output,
        } => source.load(&input, column.as_deref()).and_then(|series| {
            run_enrich(&series, config.as_deref(), output.as_deref())
        }),

        Commands::Market {
            input,
            tam,
            sam,
            config,
            column,
        } => source
            .load(&input, column.as_deref())
            .and_then(|series| run_market(&series, tam, sam, config.as_deref())),

        Commands::Backtest {
            input,
            holdout,
            config,
            column,
        } => source
            .load(&input, column.as_deref())
            .and_then(|series| run_backtest(&series, holdout, config.as_deref())),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ForecastConfig> {
    match path {
        Some(path) => ForecastConfig::from_json_file(path),
        None => Ok(ForecastConfig::default()),
    }
}

/// Where every subcommand reads its series from
struct Source {
    missing: MissingValues,
}

impl Source {
    fn load(&self, input: &Path, column: Option<&str>) -> Result<Series> {
        let series = DataLoader::from_csv_with(input, column, self.missing)?;
        tracing::info!(
            path = %input.display(),
            observations = series.len(),
            missing = ?self.missing,
            "loaded series"
        );
        Ok(series)
    }
}

/// Write rows to `output` (JSON for a `.json` extension, CSV otherwise) or stdout
fn emit<T: serde::Serialize>(rows: &[T], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            let is_json = path
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
            if is_json {
                write_json(writer, rows)?;
            } else {
                write_csv(writer, rows)?;
            }
            tracing::info!(path = %path.display(), rows = rows.len(), "wrote output");
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_csv(&mut handle, rows)?;
            handle.flush()?;
        }
    }
    Ok(())
}

fn run_forecast(
    series: &Series,
    horizon: i64,
    config: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let mut forecaster = EngagementForecaster::new(load_config(config)?)?;

    let report = forecaster.train(series)?;
    eprintln!("{}", report.metrics);

    let forecast = forecaster.predict_days(series, horizon)?;
    emit(&forecast, output)
}

fn run_spikes(
    series: &Series,
    threshold: Option<f64>,
    config: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let forecaster = EngagementForecaster::new(load_config(config)?)?;
    let spikes = match threshold {
        Some(threshold) => forecaster.detect_spikes_with(series, threshold)?,
        None => forecaster.detect_spikes(series)?,
    };
    emit(&spikes, output)
}

fn run_aggregate(
    series: &Series,
    period: Period,
    sum: bool,
    output: Option<&Path>,
    load_table: Option<&str>,
) -> Result<()> {
    let how = if sum { Aggregation::Sum } else { Aggregation::Mean };
    let rows = aggregate::aggregate(series, period, how)?;

    if let Some(table) = load_table {
        let frame = aggregate::to_dataframe(&rows)?;
        let summary = LoggingWarehouse.load(table, &frame)?;
        if let Some((first, last)) = &summary.date_range {
            eprintln!(
                "Loading {} rows to {} ({} to {})",
                summary.rows, summary.table, first, last
            );
        }
    }

    emit(&rows, output)
}

fn run_enrich(series: &Series, config: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let forecaster = EngagementForecaster::new(load_config(config)?)?;
    let rows = forecaster.enrich(series)?;
    emit(&rows, output)
}

fn run_market(series: &Series, tam: f64, sam: f64, config: Option<&Path>) -> Result<()> {
    let forecaster = EngagementForecaster::new(load_config(config)?)?;
    let sizing = forecaster.market_sizing(series, tam, sam)?;
    println!("{}", sizing);
    Ok(())
}

fn run_backtest(series: &Series, holdout: usize, config: Option<&Path>) -> Result<()> {
    let mut forecaster = EngagementForecaster::new(load_config(config)?)?;
    let report = forecaster.backtest(series, holdout)?;

    println!("Training ({} rows, {})", report.training.rows, report.training.backend);
    println!("{}", report.training.metrics);
    println!();
    println!("Holdout ({} days)", holdout);
    println!("{}", report.metrics);
    Ok(())
}
