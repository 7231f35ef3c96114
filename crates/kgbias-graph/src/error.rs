use std::path::PathBuf;

use thiserror::Error;

/// Failure to read one of the dataset input files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid centrality config: {0}")]
    InvalidConfig(String),
}
