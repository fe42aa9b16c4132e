use thiserror::Error;

/// Convenience result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error type returned by transformations, grouping, ingestion and session setup.
///
/// A single enum is shared across the crate so callers can branch on one type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller's [`crate::context::Context`] was canceled before or during the operation.
    #[error("operation canceled")]
    Canceled,

    /// The caller's [`crate::context::Context`] ran past its deadline.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// A named column does not exist in the dataset.
    #[error("column not found: '{column}'")]
    ColumnNotFound { column: String },

    /// A column name is empty, blank or duplicated.
    #[error("invalid column name: {message}")]
    InvalidColumnName { message: String },

    /// An aggregation pipeline was finalized in an unusable state.
    #[error("invalid pipeline: {message}")]
    InvalidPipeline { message: String },

    /// Input data or configuration is malformed.
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// The operation requires at least one value.
    #[error("dataset is empty")]
    EmptyDataSet,

    /// A worker stopped without delivering its share of the output.
    #[error("worker failed during {op}")]
    WorkerFailed { op: &'static str },

    /// The per-call worker pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Session configuration could not be decoded.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl EngineError {
    /// Returns `true` for the errors caused by the caller's context (retryable with a fresh one).
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled | Self::DeadlineExceeded)
    }
}
