//! Common error types for FMSC

use serde::Serialize;
use thiserror::Error;

use crate::profile::MovementTest;

/// Common result type for FMSC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors. Anything recoverable is reported as a [`Warning`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Unrecognized test name, rule/vocabulary mismatch, or invalid settings.
    /// Aborts the request; never defaulted away.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Value outside its documented range (scores, severities)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Exercise catalog failed structural validation
    #[error("Malformed catalog: {0}")]
    MalformedCatalog(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML decoding error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Non-fatal findings carried alongside a successful result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A test was scored on incomplete fault data. A score of 3 here may
    /// mean "nothing observed" rather than "nothing wrong".
    PartialData {
        test: MovementTest,
        missing_categories: Vec<String>,
        unknown_keys: Vec<String>,
    },

    /// No catalog entry matched; the shortlist is empty
    EmptyShortlist { target_level: u8 },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::PartialData {
                test,
                missing_categories,
                unknown_keys,
            } => write!(
                f,
                "{} scored on partial data (missing: [{}], ignored: [{}])",
                test,
                missing_categories.join(", "),
                unknown_keys.join(", ")
            ),
            Warning::EmptyShortlist { target_level } => {
                write!(f, "no corrective exercises matched at level {}", target_level)
            }
        }
    }
}
