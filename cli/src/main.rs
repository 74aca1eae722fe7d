use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use watermark_url_core::{Clock, FixedClock, ParsedTimestamp, SystemClock, WatermarkComposer};
use watermark_url_storageservice::{inspect_columns, process_file_with_status, ProcessOptions};

#[derive(Parser)]
#[command(name = "watermark-url")]
#[command(about = "Stamp time and address watermarks onto the image URLs of a CSV table", long_about = None)]
#[command(version)]
struct Cli {
    /// Log line format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite every image URL of a CSV file into `<name>_处理后.csv`
    Process {
        /// Source CSV file
        input: PathBuf,
        /// Directory for the result file (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Timestamp column (detected from headers containing 时间 when omitted)
        #[arg(short, long)]
        time_column: Option<String>,
        /// Address column (detected from headers containing 水印 or 地址 when omitted)
        #[arg(short, long)]
        watermark_column: Option<String>,
        /// Instant rendered for unparsable timestamps, "YYYY-MM-DD HH:MM:SS"
        #[arg(long, value_parser = parse_instant)]
        fixed_now: Option<NaiveDateTime>,
        /// Log progress every N rows
        #[arg(long, default_value = "100")]
        progress_every: usize,
        /// Print the final status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the watermarked form of a single URL
    Compose {
        url: String,
        /// Timestamp text, "YYYY-MM-DD HH:MM:SS"
        #[arg(long, default_value = "")]
        time: String,
        /// Address text
        #[arg(long, default_value = "")]
        address: String,
        /// Instant rendered for an unparsable timestamp
        #[arg(long, value_parser = parse_instant)]
        fixed_now: Option<NaiveDateTime>,
    },

    /// List the columns of a CSV file and the ones picked automatically
    Columns {
        input: PathBuf,
    },
}

fn parse_instant(raw: &str) -> Result<NaiveDateTime, String> {
    match ParsedTimestamp::parse(raw) {
        ParsedTimestamp::Parsed(instant) => Ok(instant),
        ParsedTimestamp::Unparsable => Err(format!("expected YYYY-MM-DD HH:MM:SS, got {:?}", raw)),
    }
}

fn clock(fixed_now: Option<NaiveDateTime>) -> Box<dyn Clock> {
    match fixed_now {
        Some(instant) => Box::new(FixedClock(instant)),
        None => Box::new(SystemClock),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,watermark_url=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn default_output_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("错误: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Process {
            input,
            output_dir,
            time_column,
            watermark_column,
            fixed_now,
            progress_every,
            json,
        } => {
            let options = ProcessOptions {
                output_dir: output_dir.unwrap_or_else(|| default_output_dir(&input)),
                input,
                time_column,
                watermark_column,
            };
            tracing::debug!(?options, "Process options");

            let every = progress_every.max(1);
            let result = process_file_with_status(&options, clock(fixed_now), |rows| {
                if rows % every == 0 {
                    tracing::info!(rows, "Progress");
                }
            });

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result).context("Failed to serialize status")?
                );
            } else {
                println!("{}", result.message);
            }

            Ok(if result.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Compose {
            url,
            time,
            address,
            fixed_now,
        } => {
            let composer = WatermarkComposer::new(clock(fixed_now));
            println!("{}", composer.compose(&url, &time, &address));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Columns { input } => {
            let report = inspect_columns(&input)
                .with_context(|| format!("Failed to read headers of {}", input.display()))?;

            for (index, name) in report.headers.names().iter().enumerate() {
                println!("{:>3}  {}", index, name);
            }
            println!("时间列: {}", report.time_column.as_deref().unwrap_or("-"));
            println!("水印列: {}", report.watermark_column.as_deref().unwrap_or("-"));
            Ok(ExitCode::SUCCESS)
        }
    }
}
