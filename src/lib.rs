use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

pub mod annotation;
pub mod error;
pub mod font;
pub mod host;
pub mod service;
pub mod templating;

pub use annotation::{AnnotationOutcome, Annotator};
pub use error::{AnnotationError, ConfigError, ServiceError};
pub use host::{AllowList, Host, PathPolicy};
pub use service::{ServiceRegistry, setup};
pub use templating::{LiquidResolver, Template, TemplateContext, TemplateResolver};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Directories the annotate service may write into.
    #[serde(default)]
    pub allowlist_external_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TemplateConfig {
    /// Globals available to every filename and annotation template.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                name: "Image Annotation".to_string(),
                log_level: "info".to_string(),
            },
            paths: PathsConfig::default(),
            templates: TemplateConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml_edit::de::from_str::<Config>(content)?)
    }

    /// Reads the config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!("Configuration loaded from: {:?}", path);
        Ok(config)
    }
}

pub fn parse_log_level(log_level: &str) -> Level {
    match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Installs a global fmt subscriber at `log_level`.
pub fn init_logging(log_level: &str) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_log_level(log_level))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
