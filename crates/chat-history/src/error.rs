use thiserror::Error;

/// Failure reported by a [`HistorySink`](crate::sink::HistorySink).
///
/// Returning one aborts the rest of the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("history sink closed")]
    Closed,

    #[error("history sink rejected event: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("invalid replay script: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("step {step}: {source}")]
    Sink {
        step: usize,
        #[source]
        source: SinkError,
    },
}
