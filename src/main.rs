//! Main module for the colmatch CLI application.
//!
//! Parses the command line, loads configuration, builds the embedding
//! generator and catalog, and runs one boundary operation. Results are printed
//! to stdout as JSON; logs go to stderr.
//!
//! # Examples
//!
//! ```sh
//! colmatch init
//! colmatch seed
//! colmatch update-embeddings
//! colmatch candidates "얼마를 기부했나요" -k 3
//! colmatch health
//! ```
//!
//! A failed operation prints `{"detail": "..."}` and exits with status `1` for
//! a rejected request or `2` for an internal failure.

use clap::Parser;
use colmatch::{
    api::{ApiError, ColumnCandidatesRequest, HealthResponse, HealthStatus},
    catalog::CatalogStore,
    commands::{Cli, Commands},
    config::{self, ColumnMatchConfig},
    config_dir, seed,
    service::ColumnMatchService,
};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::{error::Error, fs, path::PathBuf, process, sync::Arc};
use tracing::{debug, error, info};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    });
    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(cli))
}

/// Main asynchronous function of the colmatch CLI application.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or written, or the
/// catalog cannot be opened. Operation failures are reported as JSON and end
/// the process with a non-zero status instead.
async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Commands::Init = cli.command {
        debug!("Initializing configuration");
        return init();
    }

    let config_path = match cli.config {
        Some(path) => path,
        None => config_dir()?.join("config.yaml"),
    };
    debug!("Loading config from: {}", config_path.display());
    let config = config::load_config(&config_path.to_string_lossy())?;
    debug!("Config loaded: {:?}", config);

    let request = match &cli.command {
        Commands::Candidates { input, top_k } => {
            let request = ColumnCandidatesRequest {
                input: input.clone(),
                top_k: top_k.unwrap_or(config.default_top_k),
            };
            if let Err(e) = request.validate() {
                return fail(e);
            }
            Some(request)
        }
        _ => None,
    };

    let catalog = Arc::new(CatalogStore::open(&config.database_url)?);

    if let Commands::Seed { file } = &cli.command {
        let columns = match file {
            Some(path) => seed::load_seed_file(path)?,
            None => seed::default_donation_columns(),
        };
        let inserted = seed::seed_catalog(&catalog, &columns)?;
        info!("Seeded {} column descriptions", inserted);
        print_json(&serde_json::json!({
            "message": format!("{inserted} column descriptions were stored."),
            "count": inserted,
        }))?;
        return Ok(());
    }

    let generator = match config.build_generator() {
        Ok(generator) => Arc::new(generator),
        Err(e) => {
            error!(error = %e, "failed to load embedding model");
            if let Commands::Health = cli.command {
                print_json(&HealthResponse {
                    status: HealthStatus::Unhealthy,
                    model_loaded: false,
                    embedding_dimension: None,
                    error: Some(e.to_string()),
                    message: "The embedding model could not be loaded.".to_string(),
                })?;
                process::exit(2);
            }
            fail(ApiError::internal(format!(
                "Embedding model could not be loaded: {e}"
            )))?;
            return Ok(());
        }
    };

    let service = ColumnMatchService::new(generator, catalog);

    match cli.command {
        Commands::Candidates { .. } => {
            if let Some(request) = request {
                debug!("Ranking candidates for {:?} (top_k={})", request.input, request.top_k);
                match service.column_candidates(request).await {
                    Ok(response) => print_json(&response)?,
                    Err(e) => fail(e)?,
                }
            }
        }
        Commands::UpdateEmbeddings => match service.update_embeddings().await {
            Ok(response) => print_json(&response)?,
            Err(e) => fail(e)?,
        },
        Commands::Health => {
            let response = service.health().await;
            print_json(&response)?;
            if response.status == HealthStatus::Unhealthy {
                process::exit(2);
            }
        }
        Commands::Init | Commands::Seed { .. } => {}
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the error payload and exit: `1` for client errors, `2` otherwise.
fn fail(err: ApiError) -> Result<(), Box<dyn Error>> {
    print_json(&err)?;
    process::exit(if err.is_client_error() { 1 } else { 2 });
}

/// Writes a default `config.yaml` into the configuration directory.
///
/// The catalog database defaults to `colmatch.db` next to the config file.
/// An existing config is left untouched.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the configuration
/// cannot be serialized or written.
fn init() -> Result<(), Box<dyn Error>> {
    let config_dir = config_dir()?;
    info!("Creating config directory: {}", config_dir.display());
    fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join("config.yaml");
    if config_path.exists() {
        info!("Config already exists: {}", config_path.display());
        return Ok(());
    }

    let database: PathBuf = config_dir.join("colmatch.db");
    let config = ColumnMatchConfig::with_database(&database.to_string_lossy());
    info!("Creating config file: {}", config_path.display());
    fs::write(&config_path, serde_yaml::to_string(&config)?)?;

    Ok(())
}
