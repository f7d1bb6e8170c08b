//! Vaxload CLI - vaccination record ETL
//!
//! # Main Commands
//!
//! ```bash
//! vaxload run                       # Full pipeline over the data directory
//! vaxload views --country USA --country IND   # Write per-country view SQL
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! vaxload parse data/USA.csv        # Just parse a record file to JSON
//! vaxload validate data/USA.csv     # Parse and report validation outcomes
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vaxload::{
    generate_view_specs, parse_file, run_pipeline, validate_records, write_view_scripts,
    ColumnMapper, PipelineConfig, ScriptClient, CANONICAL_TABLE, DEFAULT_CHUNK_SIZE,
};

#[derive(Parser)]
#[command(name = "vaxload")]
#[command(about = "Validate, load and derive views over vaccination records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: parse, validate, transform, load, generate views
    Run {
        /// Directory containing the raw record files
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Directory rejected records are written into
        #[arg(long, default_value = "data/invalid_records")]
        invalid_dir: PathBuf,

        /// Target warehouse table
        #[arg(long, default_value = CANONICAL_TABLE)]
        table: String,

        /// Maximum records per warehouse write
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Generate views for these countries instead of the observed ones
        /// (repeatable)
        #[arg(long = "country")]
        countries: Vec<String>,

        /// Directory the warehouse SQL scripts are written into
        #[arg(long, default_value = "scripts/generated")]
        scripts_dir: PathBuf,
    },

    /// Parse a record file and output JSON
    Parse {
        /// Input record file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a record file and report validation outcomes
    Validate {
        /// Input record file
        input: PathBuf,
    },

    /// Write per-country view definitions as SQL files
    Views {
        /// Country to generate a view for (repeatable)
        #[arg(long = "country", required = true)]
        countries: Vec<String>,

        /// Source warehouse table
        #[arg(long, default_value = CANONICAL_TABLE)]
        table: String,

        /// Output directory for the SQL files
        #[arg(short, long, default_value = "scripts/generated")]
        output: PathBuf,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let _guard = init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            data_dir,
            invalid_dir,
            table,
            chunk_size,
            countries,
            scripts_dir,
        } => cmd_run(data_dir, invalid_dir, table, chunk_size, countries, scripts_dir),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Validate { input } => cmd_validate(&input),

        Commands::Views {
            countries,
            table,
            output,
        } => cmd_views(&countries, &table, &output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Console on stderr plus a daily-rotated file under `logs/`.
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "vaxload.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    guard
}

fn cmd_run(
    data_dir: PathBuf,
    invalid_dir: PathBuf,
    table: String,
    chunk_size: usize,
    countries: Vec<String>,
    scripts_dir: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig {
        data_dir,
        invalid_dir,
        table,
        chunk_size,
        countries: if countries.is_empty() {
            None
        } else {
            Some(countries)
        },
    };

    let mut client = ScriptClient::new(scripts_dir);
    let summary = run_pipeline(&config, &mut client)?;

    info!(dir = %client.dir().display(), "warehouse scripts written");
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    info!(file = %input.display(), "parsing record file");

    let result = parse_file(input)?;
    info!(
        encoding = %result.encoding,
        delimiter = %format_delimiter(result.delimiter),
        columns = result.headers.len(),
        records = result.records.len(),
        "parsed record file"
    );

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_validate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!(file = %input.display(), "validating record file");

    let mapper = ColumnMapper::new()?;
    let result = parse_file(input)?;
    let report = validate_records(result.records, &mapper);

    println!("Accepted: {}", report.accepted.len());
    println!("Rejected: {}", report.rejected.len());
    for rejection in report.rejected.iter().take(20) {
        println!("  line {}:", rejection.record.line);
        for reason in &rejection.reasons {
            println!("    - {}", reason);
        }
    }
    if report.rejected.len() > 20 {
        println!("  ... and {} more", report.rejected.len() - 20);
    }

    Ok(())
}

fn cmd_views(
    countries: &[String],
    table: &str,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (specs, failures) = generate_view_specs(countries);

    let paths = write_view_scripts(&specs, table, output)?;
    for path in &paths {
        println!("{}", path.display());
    }
    for failure in &failures {
        eprintln!("Skipped: {}", failure);
    }
    if !failures.is_empty() {
        return Err(format!("{} country value(s) failed", failures.len()).into());
    }

    Ok(())
}

fn format_delimiter(delimiter: char) -> String {
    match delimiter {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, output: Option<&Path>) -> std::io::Result<()> {
    match output {
        Some(path) => std::fs::write(path, content),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}
