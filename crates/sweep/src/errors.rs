use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SweepError>;

/// Failures that abort the sweep: bad configuration or an unusable
/// results directory.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    ConfigFormat(String),

    #[error("invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("failed to create results directory {}: {source}", path.display())]
    ResultsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write table {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write run log {}: {source}", path.display())]
    RunLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SweepError {
    pub fn validation(messages: Vec<String>) -> Self {
        Self::Validation(messages)
    }
}

impl From<toml::de::Error> for SweepError {
    fn from(value: toml::de::Error) -> Self {
        SweepError::ConfigFormat(value.to_string())
    }
}

impl From<serde_json::Error> for SweepError {
    fn from(value: serde_json::Error) -> Self {
        SweepError::ConfigFormat(value.to_string())
    }
}

/// A benchmark report that could not be turned into a result row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("line {line_number} is not of the form `key: value`: {line:?}")]
    MalformedLine { line_number: usize, line: String },

    #[error("report is missing required key `{0}`")]
    MissingKey(&'static str),

    #[error("value for `{key}` is not an integer: {value:?}")]
    InvalidInteger { key: &'static str, value: String },

    #[error("value for `{key}` is not a number: {value:?}")]
    InvalidFloat { key: &'static str, value: String },
}

/// The benchmark executable could not be run at all.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("runner failed: {0}")]
    Other(String),
}

/// Grid-point level failure. Never propagates past the point it belongs to.
#[derive(Error, Debug)]
pub enum PointError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}
