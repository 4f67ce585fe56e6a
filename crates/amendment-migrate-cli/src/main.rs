//! amendment-migrate CLI - import legacy amendment dumps into the amendment store.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use amendment_migrate::{AmendmentStore, Config, ImportSummary, MigrateError, Migrator};
use clap::{Parser, Subcommand};
use dialoguer::Input;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;

const DEFAULT_CONFIG: &str = "config.yaml";

#[derive(Parser)]
#[command(name = "amendment-migrate")]
#[command(about = "Import legacy SQL Server amendment dumps into the amendment store")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file [default: config.yaml, built-in defaults if absent]
    #[arg(short, long)]
    config: Option<PathBuf>,

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
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import amendments from a legacy dump (the default command)
    Migrate {
        /// Path to the dump; overrides source.dump_path
        dump: Option<PathBuf>,
    },

    /// Create the database tables
    InitDb {
        /// Drop existing tables first (refused in production)
        #[arg(long)]
        reset: bool,
    },

    /// Test the database connection
    HealthCheck,
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

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = load_config(cli.config.as_deref())?.with_env_overrides();
    config.validate()?;

    match cli.command.unwrap_or(Commands::Migrate { dump: None }) {
        Commands::Migrate { dump } => {
            let store = AmendmentStore::connect(&config.target).await?;
            store.init_schema().await?;

            let dump_path = match resolve_dump_path(dump, &config.source.dump_path) {
                Ok(path) => path,
                Err(e) => {
                    store.close().await;
                    return Err(e);
                }
            };

            let migrator = Migrator::new(config.migration.clone())?;
            let mut sink = store.sink();
            let summary = migrator.run_file(&dump_path, &mut sink).await?;
            store.close().await;

            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                print_summary(&summary);
            }
        }

        Commands::InitDb { reset } => {
            let store = AmendmentStore::connect(&config.target).await?;
            if reset {
                store.reset().await?;
            } else {
                store.init_schema().await?;
            }
            store.close().await;
            println!("Database tables created at {}", config.target.database_url);
        }

        Commands::HealthCheck => {
            let store = AmendmentStore::connect(&config.target).await?;
            let result = store.health().await;
            store.close().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Database ({}): {} ({}ms)",
                    config.target.database_url,
                    if result.database_connected { "OK" } else { "FAILED" },
                    result.database_latency_ms
                );
                if let Some(ref err) = result.database_error {
                    println!("    Error: {}", err);
                }
                match result.amendment_count {
                    Some(count) => println!("  Amendments: {}", count),
                    None => println!("  Amendments: schema not initialized"),
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(MigrateError::Config("Health check failed".to_string()));
            }
        }
    }

    Ok(())
}

/// Load the config file. Only the implicit default path may be missing.
fn load_config(explicit: Option<&Path>) -> Result<Config, MigrateError> {
    match explicit {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            Ok(config)
        }
        None if Path::new(DEFAULT_CONFIG).exists() => {
            let config = Config::load(DEFAULT_CONFIG)?;
            info!("Loaded configuration from {}", DEFAULT_CONFIG);
            Ok(config)
        }
        None => {
            info!("No {} found, using built-in defaults", DEFAULT_CONFIG);
            Ok(Config::default())
        }
    }
}

/// Pick the dump: the argument, else the configured path, else ask the operator.
fn resolve_dump_path(argument: Option<PathBuf>, configured: &Path) -> Result<PathBuf, MigrateError> {
    if let Some(path) = argument {
        return if path.exists() {
            Ok(path)
        } else {
            Err(MigrateError::DumpNotFound(path))
        };
    }
    if configured.exists() {
        return Ok(configured.to_path_buf());
    }

    warn!("SQL file not found at {:?}", configured);
    if !(std::io::stdin().is_terminal() && std::io::stderr().is_terminal()) {
        return Err(MigrateError::DumpNotFound(configured.to_path_buf()));
    }

    let answer: String = Input::new()
        .with_prompt("Please provide the path to your SQL dump file")
        .allow_empty(true)
        .interact_text()
        .map_err(|_| MigrateError::DumpNotFound(configured.to_path_buf()))?;

    let answer = answer.trim();
    if answer.is_empty() {
        return Err(MigrateError::DumpNotFound(configured.to_path_buf()));
    }
    let path = PathBuf::from(answer);
    if path.exists() {
        Ok(path)
    } else {
        Err(MigrateError::DumpNotFound(path))
    }
}

fn print_summary(summary: &ImportSummary) {
    if summary.is_empty() {
        println!("\nNo {} data found in dump.", summary.table);
        if !summary.tables_found.is_empty() {
            println!("  Tables with INSERT statements:");
            for table in &summary.tables_found {
                println!("    {}", table);
            }
        }
        return;
    }

    println!("\nMigration completed!");
    println!("  Table: {}", summary.table);
    println!("  Statements: {}", summary.statements_found);
    println!("  Rows processed: {}", summary.rows_processed);
    println!("  Imported: {}", summary.rows_imported);
    println!("  Skipped: {}", summary.rows_skipped);
    println!("  Defaults applied: {}", summary.substitutions.len());
    println!("  Duration: {:.2}s", summary.duration_seconds);
    for row_error in &summary.row_errors {
        println!("    {}", row_error.message);
    }
}

fn setup_logging(verbosity: &str, format: &str) {
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
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
