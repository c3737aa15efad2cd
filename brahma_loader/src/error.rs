use std::path::PathBuf;
use thiserror::Error;

/* Errors raised while reading or parsing headers */
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read header '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to load the C grammar: {0}")]
    Language(String),

    #[error("Parser produced no syntax tree for '{}'", .0.display())]
    Parse(PathBuf),
}

/* Errors raised while loading or validating the generator configuration */
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
