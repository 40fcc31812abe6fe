use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tastelog_server::config::{AppConfig, CliConfig, FileConfig};
use tastelog_server::llm::{LlmProvider, OpenAiProvider};
use tastelog_server::recommend::RecommendService;
use tastelog_server::server::{run_server, RequestsLoggingLevel};
use tastelog_server::{SqliteLibraryStore, SqliteRecommendStore, StreamingClient};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file; file values override CLI values.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the SQLite databases.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Base URL of the streaming catalog API.
    #[clap(long)]
    pub streaming_api_url: Option<String>,

    /// Base URL of an OpenAI-compatible completions API. Without it the
    /// server runs with recommendations disabled.
    #[clap(long)]
    pub llm_api_url: Option<String>,

    /// Model to request from the completions API.
    #[clap(long)]
    pub llm_model: Option<String>,

    /// Static API key for the completions API.
    #[clap(long)]
    pub llm_api_key: Option<String>,

    /// Shell command that prints the completions API key.
    #[clap(long)]
    pub llm_api_key_command: Option<String>,

    /// Seconds a listener has to wait between generation runs.
    #[clap(long, default_value_t = 60)]
    pub rate_limit_window_secs: u64,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            streaming_api_url: self.streaming_api_url.clone(),
            llm_api_url: self.llm_api_url.clone(),
            llm_model: self.llm_model.clone(),
            llm_api_key: self.llm_api_key.clone(),
            llm_api_key_command: self.llm_api_key_command.clone(),
            rate_limit_window_secs: self.rate_limit_window_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening library database at {:?}...", config.library_db_path());
    let library_store = Arc::new(SqliteLibraryStore::new(config.library_db_path())?);

    info!(
        "Opening recommendation database at {:?}...",
        config.recommend_db_path()
    );
    let recommend_store = Arc::new(SqliteRecommendStore::new(config.recommend_db_path())?);

    let streaming = Arc::new(StreamingClient::new(config.streaming_api_url.clone()));

    let llm_provider: Option<Arc<dyn LlmProvider>> = match &config.llm {
        Some(llm) => {
            info!(model = %llm.model, "Generative backend configured at {}", llm.api_url);
            Some(Arc::new(OpenAiProvider::new(
                llm.api_url.clone(),
                llm.model.clone(),
                llm.api_key_source(),
            )))
        }
        None => {
            info!("No generative backend configured, recommendations are disabled");
            None
        }
    };

    let recommend_service = Arc::new(RecommendService::new(
        streaming,
        library_store,
        llm_provider,
        recommend_store,
        Duration::from_secs(config.rate_limit_window_secs),
    ));

    info!("Ready to serve at port {}!", config.port);
    run_server(
        recommend_service,
        config.logging_level,
        config.port,
        config.frontend_dir_path,
    )
    .await
}
