use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by any pipeline stage. No stage recovers from another's.
#[derive(Debug, Error)]
pub enum Error {
    #[error("data unavailable{}: {reason}", symbol.as_ref().map(|s| format!(" for {s}")).unwrap_or_default())]
    DataUnavailable {
        symbol: Option<String>,
        reason: String,
    },

    #[error("I/O failure on {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid table: {0}")]
    InvalidTable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to render {}: {message}", path.display())]
    Render { path: PathBuf, message: String },
}

impl Error {
    pub fn unavailable(symbol: Option<&str>, reason: impl Into<String>) -> Self {
        Error::DataUnavailable {
            symbol: symbol.map(str::to_string),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoFailure {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_unavailable_names_the_symbol_when_known() {
        let err = Error::unavailable(Some("ZZZZ"), "HTTP 500");
        assert_eq!(err.to_string(), "data unavailable for ZZZZ: HTTP 500");

        let err = Error::unavailable(None, "connection refused");
        assert_eq!(err.to_string(), "data unavailable: connection refused");
    }
}
