use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Failed to decode image {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to save image {path:?}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Template error: {0}")]
    Template(#[from] liquid::Error),

    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service not found: {domain}.{service}")]
    NotFound { domain: String, service: String },

    #[error("Invalid service data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Handler(#[from] AnnotationError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml_edit::de::Error),

    #[error("Template parser error: {0}")]
    TemplateError(#[from] liquid::Error),
}
