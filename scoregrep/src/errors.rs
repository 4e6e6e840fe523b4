/// Error types for scoregrep.
///
/// Errors fall into two families, and callers treat them differently:
///
/// 1. **Configuration errors** are detected before any worker thread exists:
///    wrong argument arity, a threshold or weight that is not an integer, a
///    pattern the regex engine rejects, an empty pattern set, or a config file
///    that cannot be loaded. They are always fatal.
///
/// 2. **Runtime errors** happen while lines are flowing: the input or output
///    stream fails, an input line is not valid UTF-8 (in fail-fast mode), a
///    worker thread cannot be spawned, or a worker panics mid-cycle. The
///    worker pool is still shut down and joined before one of these reaches
///    the caller.
///
/// ```rust,ignore
/// match filter.run(input, output) {
///     Ok(summary) => // Clean drain,
///     Err(e) if e.is_config_error() => // Exit 1,
///     Err(e) => // Exit 2,
/// }
/// ```
///
/// Nothing is retried: this is a single-pass filter.
use thiserror::Error;

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors that can occur while configuring or running the filter
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Expected a minimum score followed by PATTERN WEIGHT pairs, got {0} argument(s)")]
    ArgumentCount(usize),
    #[error("Invalid {what}: {value:?} is not an integer")]
    InvalidNumber { what: &'static str, value: String },
    #[error("Invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("At least one PATTERN WEIGHT pair is required")]
    NoPatterns,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid UTF-8 on input line {line}: {source}")]
    EncodingError {
        line: u64,
        source: std::string::FromUtf8Error,
    },
    #[error("Failed to spawn pattern worker {id}: {source}")]
    WorkerSpawn { id: usize, source: std::io::Error },
    #[error("A pattern worker panicked while evaluating a line")]
    WorkerPanicked,
}

impl FilterError {
    pub fn invalid_number(what: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            what,
            value: value.into(),
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn encoding_error(line: u64, source: std::string::FromUtf8Error) -> Self {
        Self::EncodingError { line, source }
    }

    /// True for errors raised before any worker was started.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ArgumentCount(_)
                | Self::InvalidNumber { .. }
                | Self::InvalidPattern { .. }
                | Self::NoPatterns
                | Self::ConfigError(_)
        )
    }
}

impl From<config::ConfigError> for FilterError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
