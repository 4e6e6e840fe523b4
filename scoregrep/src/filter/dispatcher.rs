use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};

use super::cycle::CycleShared;
use super::input::{LineReader, LineSource};
use super::matcher::{compile_entries, LineScorer, WeightedMatcher};
use super::worker::WorkerPool;
use crate::config::{EncodingMode, FilterConfig};
use crate::errors::{FilterError, FilterResult};
use crate::metrics::FilterMetrics;
use crate::results::RunSummary;

/// Dispatcher control states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState {
    /// Pull the next line, or start draining at end-of-stream
    AwaitingLine,
    /// Workers are evaluating the current line
    CycleActive,
    /// Every worker is done; compare the total to the threshold
    Deciding,
    /// Shut the pool down and join it
    Draining,
}

/// A validated, compiled filter ready to run over any number of inputs.
///
/// All configuration errors surface from [`LineFilter::new`], before a single
/// worker thread exists. Each call to [`run`](Self::run) starts a fresh pool
/// of one worker per pattern and joins it before returning.
#[derive(Debug, Clone)]
pub struct LineFilter<M = WeightedMatcher> {
    min_score: i64,
    matchers: Vec<M>,
    encoding_mode: EncodingMode,
    metrics: FilterMetrics,
}

impl LineFilter {
    /// Validates and compiles `config`
    pub fn new(config: &FilterConfig) -> FilterResult<Self> {
        Self::with_metrics(config, FilterMetrics::new())
    }

    /// Validates and compiles `config`, reporting into `metrics`
    pub fn with_metrics(config: &FilterConfig, metrics: FilterMetrics) -> FilterResult<Self> {
        let min_score = config.require_min_score()?;
        if config.patterns.is_empty() {
            return Err(FilterError::NoPatterns);
        }
        let matchers = compile_entries(&config.patterns, &metrics)?;
        Self::from_scorers(min_score, matchers, config.encoding_mode, metrics)
    }
}

impl<M: LineScorer + Clone> LineFilter<M> {
    /// Builds a filter from already constructed scorers, one worker each
    pub fn from_scorers(
        min_score: i64,
        scorers: Vec<M>,
        encoding_mode: EncodingMode,
        metrics: FilterMetrics,
    ) -> FilterResult<Self> {
        if scorers.is_empty() {
            return Err(FilterError::NoPatterns);
        }
        Ok(Self {
            min_score,
            matchers: scorers,
            encoding_mode,
            metrics,
        })
    }

    pub fn min_score(&self) -> i64 {
        self.min_score
    }

    /// Number of workers each run starts
    pub fn worker_count(&self) -> usize {
        self.matchers.len()
    }

    pub fn metrics(&self) -> &FilterMetrics {
        &self.metrics
    }

    /// Filters lines from `input` into `output`
    pub fn run<R: BufRead, W: Write>(&self, input: R, output: W) -> FilterResult<RunSummary> {
        self.run_source(LineReader::new(input, self.encoding_mode), output)
    }

    /// Filters lines from any [`LineSource`] into `output`.
    ///
    /// Emitted lines are written in input order, each followed by `\n`, and
    /// `output` is flushed before returning. On error the pool is still shut
    /// down and joined before the error propagates.
    pub fn run_source<S: LineSource, W: Write>(
        &self,
        mut source: S,
        mut output: W,
    ) -> FilterResult<RunSummary> {
        info!(
            "Starting filter with {} patterns, minimum score {}",
            self.matchers.len(),
            self.min_score
        );
        let started = Instant::now();

        let workers = self.matchers.len();
        let shared = Arc::new(CycleShared::new(workers));
        let mut pool = WorkerPool::spawn(&self.matchers, shared.clone(), &self.metrics)?;

        let mut lines_read = 0u64;
        let mut lines_emitted = 0u64;
        let mut state = DispatchState::AwaitingLine;

        let shutdown = loop {
            state = match state {
                DispatchState::AwaitingLine => match source.next_line()? {
                    Some(line) => {
                        shared.begin_cycle(line);
                        lines_read += 1;
                        self.metrics.record_line_read();
                        DispatchState::CycleActive
                    }
                    None => DispatchState::Draining,
                },
                DispatchState::CycleActive => {
                    shared.barrier.release_all();
                    shared.barrier.await_completion(workers)?;
                    self.metrics.record_cycle();
                    DispatchState::Deciding
                }
                DispatchState::Deciding => {
                    let total = shared.scores.read();
                    trace!("Line {} scored {}", lines_read, total);
                    if total >= self.min_score {
                        shared.with_line(|line| writeln!(output, "{}", line))?;
                        lines_emitted += 1;
                        self.metrics.record_line_emitted();
                    }
                    shared.end_cycle();
                    DispatchState::AwaitingLine
                }
                DispatchState::Draining => {
                    debug!("End of input after {} lines, draining workers", lines_read);
                    break pool.shutdown_and_join();
                }
            };
        };

        if shutdown.panicked > 0 {
            return Err(FilterError::WorkerPanicked);
        }
        output.flush()?;

        let summary = RunSummary {
            min_score: self.min_score,
            lines_read,
            lines_emitted,
            workers_spawned: pool.spawned(),
            workers_joined: shutdown.joined,
            elapsed: started.elapsed(),
        };
        info!("Filter complete. {}", summary);
        self.metrics.log_stats();

        Ok(summary)
    }
}

/// Compiles `config` and filters `input` into `output` in one call
pub fn run_filter<R: BufRead, W: Write>(
    config: &FilterConfig,
    input: R,
    output: W,
) -> FilterResult<RunSummary> {
    LineFilter::new(config)?.run(input, output)
}
