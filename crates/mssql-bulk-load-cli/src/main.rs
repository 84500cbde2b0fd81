//! mssql-bulk-load CLI - Load CSV files into SQL Server tables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use mssql_bulk_load::core::check_column_names;
use mssql_bulk_load::target::{generate_create, split_qualified};
use mssql_bulk_load::{
    full_load, infer_types, load_chunked, read_csv, Config, CsvOptions, Dataset, IfExists,
    LoadError, MssqlPool, TableRef,
};
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "mssql-bulk-load")]
#[command(about = "Load tabular data into SQL Server tables")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

/// Dataset and destination arguments shared by every loading command.
#[derive(Args)]
struct SourceArgs {
    /// CSV file with a header row
    csv: PathBuf,

    /// Destination table, optionally schema-qualified (schema.table)
    #[arg(short, long)]
    table: String,

    /// Column type override, repeatable (COLUMN=TYPE)
    #[arg(long = "custom", value_name = "COLUMN=TYPE", value_parser = parse_custom)]
    custom: Vec<(String, String)>,

    /// CSV field delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Normalize column labels (lowercase, no punctuation, spaces to underscores)
    #[arg(long)]
    clean_labels: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV file into a table
    Load {
        #[command(flatten)]
        source: SourceArgs,

        /// Behavior when the table exists: append, fail or replace [default: from config]
        #[arg(long)]
        if_exists: Option<String>,

        /// Load into a connection-scoped #temp table
        #[arg(long)]
        temporary: bool,

        /// Rows per committed chunk [default: from config]
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Replace a table with the CSV contents plus a 1-based id primary key
    FullLoad {
        #[command(flatten)]
        source: SourceArgs,

        /// Rows per committed chunk [default: from config]
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Print the CREATE TABLE statement for a CSV file without connecting
    Ddl {
        #[command(flatten)]
        source: SourceArgs,

        /// Schema used when the table name is not qualified
        #[arg(long, default_value = "dbo")]
        schema: String,

        /// Render as a connection-scoped #temp table
        #[arg(long)]
        temporary: bool,
    },

    /// Test the database connection
    HealthCheck,
}

fn parse_custom(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((column, sql_type)) if !column.is_empty() && !sql_type.trim().is_empty() => {
            Ok((column.to_string(), sql_type.trim().to_string()))
        }
        _ => Err(format!("expected COLUMN=TYPE, got {:?}", s)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), LoadError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| LoadError::Config(e.to_string()))?;

    match cli.command {
        Commands::Ddl {
            source,
            schema,
            temporary,
        } => {
            let dataset = read_source(&source)?;
            check_column_names(&dataset.column_names())?;
            let specs = infer_types(dataset.columns(), &custom_map(&source.custom))?;
            let (explicit, name) = split_qualified(&source.table);
            let table = TableRef::new(explicit.unwrap_or(&schema), name, temporary)?;
            println!("{}", generate_create(&table, &specs));
        }

        Commands::Load {
            source,
            if_exists,
            temporary,
            chunk_size,
        } => {
            // reject a bad policy before reading config or connecting
            let if_exists = if_exists.map(|p| p.parse::<IfExists>()).transpose()?;

            let config = load_config(&cli.config)?;
            let dataset = read_source(&source)?;

            let mut options = config.load.to_options();
            if let Some(policy) = if_exists {
                options.if_exists = policy;
            }
            options.temporary |= temporary;
            options.custom.extend(source.custom);
            let chunk_size = chunk_size.unwrap_or(config.load.chunk_size);

            let pool = MssqlPool::new(&config.target).await?;
            let mut conn = pool.get().await?;
            let result =
                load_chunked(&mut *conn, &dataset, &source.table, &options, chunk_size).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nLoad completed!");
                println!("  Table: {}", result.table);
                println!("  Action: {:?}", result.action);
                println!("  Chunks: {}", result.chunks);
                println!("  Rows: {}", result.rows_inserted);
            }
        }

        Commands::FullLoad { source, chunk_size } => {
            let config = load_config(&cli.config)?;
            let dataset = read_source(&source)?;

            let mut options = config.load.to_options();
            options.custom.extend(source.custom);
            let chunk_size = chunk_size.unwrap_or(config.load.chunk_size);

            let pool = MssqlPool::new(&config.target).await?;
            let mut conn = pool.get().await?;
            let result =
                full_load(&mut *conn, dataset, &source.table, &options, chunk_size).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nFull load completed!");
                println!("  Table: {}", result.table);
                println!("  Chunks: {}", result.chunks);
                println!("  Rows: {}", result.rows_inserted);
            }
        }

        Commands::HealthCheck => {
            let config = load_config(&cli.config)?;
            let pool = MssqlPool::new(&config.target).await?;
            let result = pool.health_check().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  SQL Server ({}): {} ({}ms)",
                    result.server,
                    if result.healthy { "OK" } else { "FAILED" },
                    result.latency_ms
                );
                if let Some(ref schema) = result.default_schema {
                    println!("    Default schema: {}", schema);
                }
                if let Some(ref err) = result.error {
                    println!("    Error: {}", err);
                }
            }

            if !result.healthy {
                return Err(LoadError::pool(
                    result.error.unwrap_or_else(|| "health check failed".to_string()),
                    result.server,
                ));
            }
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<Config, LoadError> {
    let config = Config::load(path)?;
    info!("Loaded configuration from {:?}", path);
    Ok(config)
}

fn read_source(source: &SourceArgs) -> Result<Dataset, LoadError> {
    let delimiter = u8::try_from(source.delimiter).map_err(|_| {
        LoadError::Config(format!(
            "delimiter {:?} must be a single-byte character",
            source.delimiter
        ))
    })?;
    let dataset = read_csv(&source.csv, &CsvOptions::default().with_delimiter(delimiter))?;
    info!(
        "Read {} rows x {} columns from {:?}",
        dataset.num_rows(),
        dataset.num_columns(),
        source.csv
    );
    Ok(if source.clean_labels {
        dataset.clean_labels()
    } else {
        dataset
    })
}

fn custom_map(custom: &[(String, String)]) -> HashMap<String, String> {
    custom.iter().cloned().collect()
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
