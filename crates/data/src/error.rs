use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source file {} does not exist", .0.display())]
    MissingFile(PathBuf),
    #[error("unsupported source format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("environment variable {0} is not set")]
    MissingVariable(&'static str),
}

impl LoadError {
    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cleaned dataset {} is missing; run `gotham generate-dataset` first", .0.display())]
    Missing(PathBuf),
    #[error("failed to read cleaned dataset {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write cleaned dataset {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("{dataset} dataset failed validation: {reason}")]
    Validation {
        dataset: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Write(#[from] StoreError),
}

impl CleanError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::Load(_) => "LoadError",
            Self::Write(_) => "WriteError",
        }
    }
}
