use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{trace, warn};

use crate::errors::{FilterError, FilterResult};

/// What a worker should do after passing its start gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    /// Evaluate the current line
    Proceed,
    /// The stream has ended; exit the worker loop
    Finished,
}

/// One-shot start permit for a single worker.
///
/// Holds at most one pending permit. `open` grants it, `pass` blocks until a
/// permit is available and consumes it.
#[derive(Debug, Default)]
struct StartGate {
    permit: Mutex<bool>,
    opened: Condvar,
}

impl StartGate {
    fn open(&self) {
        let mut permit = lock(&self.permit);
        debug_assert!(!*permit, "start gate opened twice in one cycle");
        *permit = true;
        self.opened.notify_one();
    }

    fn pass(&self) {
        let mut permit = lock(&self.permit);
        while !*permit {
            permit = self
                .opened
                .wait(permit)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *permit = false;
    }
}

#[derive(Debug, Default)]
struct Completion {
    count: usize,
    panicked: bool,
}

/// Coordinates the start and end of each cycle between the dispatcher and
/// a fixed set of workers.
///
/// - Each worker has its own [`StartGate`]; [`release_all`](Self::release_all)
///   opens every gate once.
/// - Workers report through [`complete`](Self::complete), which bumps a shared
///   counter; [`await_completion`](Self::await_completion) blocks until the
///   counter reaches the worker count.
/// - [`shutdown`](Self::shutdown) raises the finished flag and opens every gate
///   one last time so blocked workers observe it and exit.
///
/// Completion goes through a mutex and condition variable, so every
/// contribution a worker made before `complete` is visible to the dispatcher
/// once `await_completion` returns.
#[derive(Debug)]
pub struct CycleBarrier {
    gates: Vec<StartGate>,
    completion: Mutex<Completion>,
    all_done: Condvar,
    finished: AtomicBool,
}

impl CycleBarrier {
    pub fn new(workers: usize) -> Self {
        Self {
            gates: (0..workers).map(|_| StartGate::default()).collect(),
            completion: Mutex::new(Completion::default()),
            all_done: Condvar::new(),
            finished: AtomicBool::new(false),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.gates.len()
    }

    /// Zeros the completion counter and clears the panic mark. Dispatcher
    /// only, before `release_all`.
    pub fn reset_completion(&self) {
        *lock(&self.completion) = Completion::default();
    }

    /// Grants every worker exactly one pass through its gate
    pub fn release_all(&self) {
        trace!("Releasing {} workers", self.gates.len());
        for gate in &self.gates {
            gate.open();
        }
    }

    /// Blocks `worker` at its gate until released, then reports whether the
    /// stream has finished
    pub fn wait_for_release(&self, worker: usize) -> GateSignal {
        self.gates[worker].pass();
        if self.finished.load(Ordering::Acquire) {
            GateSignal::Finished
        } else {
            GateSignal::Proceed
        }
    }

    /// Records that one worker is done with the current cycle. `panicked`
    /// marks the cycle as failed.
    pub fn complete(&self, panicked: bool) {
        let mut completion = lock(&self.completion);
        completion.count += 1;
        completion.panicked |= panicked;
        if completion.count >= self.gates.len() {
            self.all_done.notify_all();
        }
    }

    /// Blocks until `workers` completions have been recorded for this cycle
    pub fn await_completion(&self, workers: usize) -> FilterResult<()> {
        debug_assert!(workers <= self.gates.len());
        let mut completion = lock(&self.completion);
        while completion.count < workers {
            completion = self
                .all_done
                .wait(completion)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if completion.panicked {
            return Err(FilterError::WorkerPanicked);
        }
        Ok(())
    }

    /// Raises the finished flag and wakes every worker so it can exit.
    ///
    /// Returns false if the barrier was already shut down.
    pub fn shutdown(&self) -> bool {
        if self.finished.swap(true, Ordering::AcqRel) {
            warn!("Cycle barrier shut down more than once");
            return false;
        }
        self.release_all();
        true
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
