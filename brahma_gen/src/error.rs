use brahma_loader::LoadError;
use std::path::PathBuf;
use thiserror::Error;

/* Errors raised while generating or writing interface modules */
#[derive(Error, Debug)]
pub enum GenError {
    #[error("Interface namespace '{0}' is registered twice")]
    DuplicateNamespace(String),

    #[error("[{namespace}] Failed to load declarations: {source}")]
    Load {
        namespace: String,
        #[source]
        source: LoadError,
    },

    #[error("Failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
