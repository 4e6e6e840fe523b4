use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex_automata::meta::Regex;
use regex_syntax::hir::{Hir, Look};
use tracing::trace;

use crate::config::PatternEntry;
use crate::errors::{FilterError, FilterResult};
use crate::metrics::FilterMetrics;

/// Anchored regexes keyed by the pattern text they were built from
static PATTERN_CACHE: Lazy<DashMap<String, Regex>> = Lazy::new(DashMap::new);

/// Whole-line matcher for one pattern.
///
/// The parsed pattern is wrapped between start-of-text and end-of-text
/// assertions, so a line only matches when the pattern covers it from the
/// first byte to the last. Substring hits do not count. Anchoring happens on
/// the syntax tree rather than the pattern text, so flags such as `(?x)` or
/// `(?m)` inside the pattern cannot change how the anchors parse.
#[derive(Debug, Clone)]
pub struct LineMatcher {
    pattern: String,
    regex: Regex,
}

impl LineMatcher {
    /// Compiles a pattern, failing on invalid syntax
    pub fn compile(pattern: &str) -> FilterResult<Self> {
        Self::compile_with_metrics(pattern, &FilterMetrics::new())
    }

    /// Compiles a pattern, recording cache hits and misses in `metrics`
    pub fn compile_with_metrics(pattern: &str, metrics: &FilterMetrics) -> FilterResult<Self> {
        if let Some(entry) = PATTERN_CACHE.get(pattern) {
            metrics.record_cache_lookup(true);
            return Ok(Self {
                pattern: pattern.to_string(),
                regex: entry.clone(),
            });
        }

        let hir = regex_syntax::ParserBuilder::new()
            .build()
            .parse(pattern)
            .map_err(|e| FilterError::invalid_pattern(pattern, e.to_string()))?;
        let anchored = Hir::concat(vec![Hir::look(Look::Start), hir, Hir::look(Look::End)]);
        let regex = Regex::builder()
            .build_from_hir(&anchored)
            .map_err(|e| FilterError::invalid_pattern(pattern, e.to_string()))?;

        metrics.record_cache_lookup(false);
        PATTERN_CACHE.insert(pattern.to_string(), regex.clone());
        trace!("Compiled pattern {:?}", pattern);

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The pattern text as configured
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True when the pattern matches the entire line
    pub fn is_full_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

/// What a pattern worker evaluates each cycle.
///
/// [`WeightedMatcher`] is the production implementation; the dispatcher and
/// worker pool accept anything that scores a line.
pub trait LineScorer: Send + Sync + 'static {
    /// Weight to add for `line`, or `None` when it contributes nothing
    fn score(&self, line: &str) -> Option<i64>;

    /// Short name used in worker logs
    fn label(&self) -> &str;
}

/// A compiled pattern together with the weight it contributes on a match
#[derive(Debug, Clone)]
pub struct WeightedMatcher {
    pub matcher: LineMatcher,
    pub weight: i64,
}

impl LineScorer for WeightedMatcher {
    fn score(&self, line: &str) -> Option<i64> {
        self.matcher.is_full_match(line).then_some(self.weight)
    }

    fn label(&self) -> &str {
        self.matcher.pattern()
    }
}

/// Compiles every entry up front. The first invalid pattern aborts the whole
/// set, so no worker is ever started against a partially valid configuration.
pub fn compile_entries(
    entries: &[PatternEntry],
    metrics: &FilterMetrics,
) -> FilterResult<Vec<WeightedMatcher>> {
    entries
        .iter()
        .map(|entry| {
            Ok(WeightedMatcher {
                matcher: LineMatcher::compile_with_metrics(&entry.pattern, metrics)?,
                weight: entry.weight,
            })
        })
        .collect()
}
