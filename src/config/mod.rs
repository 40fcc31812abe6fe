mod file_config;

pub use file_config::{FileConfig, LlmFileConfig};

use crate::llm::ApiKeySource;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub streaming_api_url: Option<String>,
    pub llm_api_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_api_key_command: Option<String>,
    pub rate_limit_window_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            port: 3001,
            logging_level: RequestsLoggingLevel::default(),
            frontend_dir_path: None,
            streaming_api_url: None,
            llm_api_url: None,
            llm_model: None,
            llm_api_key: None,
            llm_api_key_command: None,
            rate_limit_window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
        }
    }
}

/// How to reach and authenticate against the generative backend.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
}

impl LlmSettings {
    /// A key command wins over a static key.
    pub fn api_key_source(&self) -> ApiKeySource {
        if let Some(command) = &self.api_key_command {
            return ApiKeySource::Command(command.clone());
        }
        match &self.api_key {
            Some(key) => ApiKeySource::Static(key.clone()),
            None => ApiKeySource::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub streaming_api_url: String,
    pub rate_limit_window_secs: u64,
    /// `None` when no generative backend is configured; the server then
    /// serves history but rejects generation requests.
    pub llm: Option<LlmSettings>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let streaming_api_url = file
            .streaming_api_url
            .or_else(|| cli.streaming_api_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "streaming_api_url must be specified via --streaming-api-url or in config file"
                )
            })?;

        let rate_limit_window_secs = file
            .rate_limit_window_secs
            .unwrap_or(cli.rate_limit_window_secs);
        if rate_limit_window_secs == 0 {
            bail!("rate_limit_window_secs must be greater than zero");
        }

        let llm_file = file.llm.unwrap_or_default();
        let llm_api_url = llm_file.api_url.or_else(|| cli.llm_api_url.clone());
        let llm = llm_api_url.map(|api_url| LlmSettings {
            api_url,
            model: llm_file
                .model
                .or_else(|| cli.llm_model.clone())
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            api_key: llm_file.api_key.or_else(|| cli.llm_api_key.clone()),
            api_key_command: llm_file
                .api_key_command
                .or_else(|| cli.llm_api_key_command.clone()),
        });

        Ok(Self {
            db_dir,
            port,
            logging_level,
            frontend_dir_path,
            streaming_api_url,
            rate_limit_window_secs,
            llm,
        })
    }

    pub fn library_db_path(&self) -> PathBuf {
        self.db_dir.join("library.db")
    }

    pub fn recommend_db_path(&self) -> PathBuf {
        self.db_dir.join("recommend.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
