use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read dataset {path:?}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid dataset {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl DataError {
    pub(crate) fn parse(path: &std::path::Path, message: impl Into<String>) -> Self {
        DataError::Parse { path: path.to_path_buf(), message: message.into() }
    }
}
