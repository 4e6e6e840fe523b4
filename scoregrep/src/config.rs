use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{FilterError, FilterResult};

/// One (pattern, weight) pair. Each entry is bound to exactly one worker
/// thread for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    /// Regular expression that must match an entire line
    pub pattern: String,
    /// Amount added to a line's score when the pattern matches
    pub weight: i64,
}

impl PatternEntry {
    pub fn new(pattern: impl Into<String>, weight: i64) -> Self {
        Self {
            pattern: pattern.into(),
            weight,
        }
    }
}

/// How to treat input lines that are not valid UTF-8
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Stop the run with an encoding error
    #[default]
    FailFast,
    /// Replace invalid sequences with U+FFFD and keep going
    Lossy,
}

/// Configuration for one filter run.
///
/// # Configuration Locations
///
/// Values are layered from these sources, later ones winning:
/// 1. Global `$CONFIG_DIR/scoregrep/config.yaml`
/// 2. Local `.scoregrep.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// Command-line values ([`CliOverrides`]) take precedence over all of them,
/// see [`FilterConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Lines scoring at least this much are printed
/// min_score: 5
///
/// # One worker per entry
/// patterns:
///   - pattern: "^ERROR.*"
///     weight: 3
///   - pattern: ".*timeout.*"
///     weight: 2
///
/// # failfast or lossy
/// encoding_mode: failfast
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Inclusive score threshold; `None` until some source provides it
    #[serde(default)]
    pub min_score: Option<i64>,

    /// Ordered pattern entries, one worker each
    #[serde(default)]
    pub patterns: Vec<PatternEntry>,

    /// Handling of invalid UTF-8 in input lines
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_score: None,
            patterns: Vec::new(),
            encoding_mode: EncodingMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl FilterConfig {
    /// Builds a complete configuration in code
    pub fn new(min_score: i64, patterns: Vec<PatternEntry>) -> Self {
        Self {
            min_score: Some(min_score),
            patterns,
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations plus a custom file.
    /// The custom file, when given, must exist.
    pub fn load_from(config_path: Option<&Path>) -> FilterResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let default_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("scoregrep/config.yaml")),
            // Local config
            Some(PathBuf::from(".scoregrep.yaml")),
        ];

        for path in default_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        // Anything the command line set wins, even when it equals a default
        if let Some(min_score) = cli.min_score {
            self.min_score = Some(min_score);
        }
        // Pattern sets are replaced wholesale, never concatenated
        if !cli.patterns.is_empty() {
            self.patterns = cli.patterns;
        }
        if let Some(encoding_mode) = cli.encoding_mode {
            self.encoding_mode = encoding_mode;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Returns the threshold, or a configuration error if no source set one
    pub fn require_min_score(&self) -> FilterResult<i64> {
        self.min_score
            .ok_or_else(|| FilterError::config_error("No minimum score was provided"))
    }
}

/// Values given on the command line. `None` and an empty pattern list mean
/// "not given", so the config files keep their say.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub min_score: Option<i64>,
    pub patterns: Vec<PatternEntry>,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
}

impl CliOverrides {
    /// Parses `MIN_SCORE [PATTERN WEIGHT]...` positional arguments.
    ///
    /// An empty argument list sets nothing so that a config file can provide
    /// everything. Otherwise the count must be odd: the threshold plus whole
    /// pairs.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> FilterResult<Self> {
        if args.is_empty() {
            return Ok(Self::default());
        }
        if args.len() % 2 != 1 {
            return Err(FilterError::ArgumentCount(args.len()));
        }

        let min_score = parse_integer("minimum score", args[0].as_ref())?;
        let patterns = args[1..]
            .chunks_exact(2)
            .map(|pair| {
                let weight = parse_integer("weight", pair[1].as_ref())?;
                Ok(PatternEntry::new(pair[0].as_ref(), weight))
            })
            .collect::<FilterResult<Vec<_>>>()?;

        Ok(Self {
            min_score: Some(min_score),
            patterns,
            ..Self::default()
        })
    }
}

fn parse_integer(what: &'static str, value: &str) -> FilterResult<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| FilterError::invalid_number(what, value))
}
