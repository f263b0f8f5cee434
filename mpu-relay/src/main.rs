mod config;
mod logging;
mod statsd;

use clap::{Parser, Subcommand};
use config::{Config, ConfigError};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use telemetry::{LineEncoder, TelemetryRecord, ValidationError, to_payload};

#[derive(Parser)]
#[command(version, about = "Relays MPU activity telemetry to a line protocol endpoint")]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the relay (default)
    Run,
    /// Print the lines a JSON record, or an array of records, encodes to
    Encode {
        /// Input file, stdin when omitted
        file: Option<PathBuf>,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] logging::LoggingError),
    #[error(transparent)]
    Metrics(#[from] statsd::MetricsError),
    #[error("failed to start runtime: {0}")]
    Runtime(std::io::Error),
    #[error(transparent)]
    Server(#[from] relay::errors::ServerError),
    #[error("failed to read input: {0}")]
    Input(std::io::Error),
    #[error("invalid JSON input: {0}")]
    InvalidJson(serde_json::Error),
    #[error("record {index}: {source}")]
    Record {
        index: usize,
        source: ValidationError,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(CliCommand::Run) {
        CliCommand::Run => serve(cli.config),
        CliCommand::Encode { file } => encode(cli.config, file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn serve(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let config = Config::load(config_path.as_deref())?;

    let _sentry = logging::init(config.common.logging.as_ref())?;
    if let Some(metrics) = &config.common.metrics {
        statsd::init(metrics)?;
    }

    tracing::info!("starting mpu-relay");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(relay::run(config.relay))?;
    Ok(())
}

fn encode(config_path: Option<PathBuf>, file: Option<PathBuf>) -> Result<(), CliError> {
    let config = Config::load(config_path.as_deref())?;

    let input = match file {
        Some(path) => std::fs::read(path).map_err(CliError::Input)?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(CliError::Input)?;
            buf
        }
    };

    let encoder = LineEncoder::new(config.relay.encoder);
    println!("{}", encode_input(&encoder, &input)?);
    Ok(())
}

fn encode_input(encoder: &LineEncoder, input: &[u8]) -> Result<String, CliError> {
    let invalid = |index: usize, source: ValidationError| CliError::Record { index, source };

    let records = match serde_json::from_slice::<Value>(input).map_err(CliError::InvalidJson)? {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut lines = Vec::new();
    for (index, item) in records.into_iter().enumerate() {
        let record = TelemetryRecord::from_value(item).map_err(|e| invalid(index, e))?;
        lines.extend(encoder.encode(&record).map_err(|e| invalid(index, e))?);
    }

    Ok(to_payload(&lines))
}
