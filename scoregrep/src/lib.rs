pub mod config;
pub mod errors;
pub mod filter;
pub mod metrics;
pub mod results;

pub use config::{CliOverrides, EncodingMode, FilterConfig, PatternEntry};
pub use errors::{FilterError, FilterResult};
pub use filter::{run_filter, LineFilter, LineReader, LineScorer, LineSource};
pub use metrics::{FilterMetrics, FilterStats};
pub use results::RunSummary;
