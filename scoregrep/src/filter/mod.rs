/// Concurrent weighted line filtering.
///
/// A run pairs one dispatching thread with a fixed pool of long-lived worker
/// threads, one per configured pattern. Lines are processed strictly one at a
/// time:
///
/// ```text
/// dispatcher                       worker i (of N)
/// ----------                       ---------------
/// read line, reset score/count
/// release_all()  ───────────────▶  pass start gate
///                                  whole-line match
///                                  add weight if matched
/// await_completion(N)  ◀─────────  complete()
/// total >= min_score? emit line
/// ...
/// end of input: shutdown()  ─────▶ pass gate, see finished, exit
/// join all N
/// ```
///
/// # Components
///
/// - [`barrier::CycleBarrier`]: per-worker start gates plus the shared
///   completion counter and finished flag
/// - [`accumulator::ScoreAccumulator`]: the per-cycle total, the only state
///   written by more than one thread
/// - [`worker::PatternWorker`] / [`worker::WorkerPool`]: the per-pattern loop
///   and the threads running it
/// - [`dispatcher::LineFilter`]: the control loop
///
/// All waiting blocks on condition variables; nothing spins. Because only one
/// line is in flight at a time, output order always equals input order, and
/// pattern order never affects a line's score.
pub mod accumulator;
pub mod barrier;
pub mod cycle;
pub mod dispatcher;
pub mod input;
pub mod matcher;
pub mod worker;

pub use dispatcher::{run_filter, LineFilter};
pub use input::{LineReader, LineSource};
pub use matcher::{LineMatcher, LineScorer, WeightedMatcher};
