use std::{io, num::ParseFloatError, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("Coverage XML file not found at {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed XML in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },
    #[error("Could not find 'line-rate' attribute in {}", path.display())]
    MissingLineRate { path: PathBuf },
    #[error("line-rate {value:?} in {} is not a number: {source}", path.display())]
    InvalidLineRate {
        path: PathBuf,
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

pub type CoverageResult<T> = Result<T, CoverageError>;

impl CoverageError {
    /// Classifies a read failure, splitting out a missing file from other I/O errors.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, source: roxmltree::Error) -> Self {
        Self::Malformed {
            path: path.into(),
            source,
        }
    }

    pub fn missing_line_rate(path: impl Into<PathBuf>) -> Self {
        Self::MissingLineRate { path: path.into() }
    }

    pub fn invalid_line_rate(
        path: impl Into<PathBuf>,
        value: impl Into<String>,
        source: ParseFloatError,
    ) -> Self {
        Self::InvalidLineRate {
            path: path.into(),
            value: value.into(),
            source,
        }
    }
}
