use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// The transformation a scheduler run is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Map,
    Filter,
    Flatten,
    FlatMap,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Map => "map",
            Operation::Filter => "filter",
            Operation::Flatten => "flatten",
            Operation::FlatMap => "flat_map",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution events emitted by the engine.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        op: Operation,
        input_len: usize,
        workers: usize,
    },
    WorkerStarted { worker: usize },
    ChunkStarted {
        worker: usize,
        start_row: usize,
        row_count: usize,
    },
    WorkerFinished { worker: usize, output_rows: usize },
    Canceled { op: Operation },
    WorkerFailed { op: Operation },
    RunFinished {
        op: Operation,
        elapsed: Duration,
        metrics: ExecutionMetricsSnapshot,
    },
    /// A session was configured with an unknown mode and fell back to local execution.
    ModeFallback { requested: String },
}

/// Observer hook for execution events.
pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// A simple stderr logger for execution events.
#[derive(Default)]
pub struct StdErrExecutionObserver;

impl ExecutionObserver for StdErrExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        eprintln!("[rdd] {event:?}");
    }
}

/// Counters for an execution run.
///
/// Every scheduler call counts into its own `ExecutionMetrics`, so concurrent calls on one engine
/// never touch each other's counters. When a call finishes its counters are published into the
/// engine-wide instance returned by [`crate::execution::ExecutionEngine::metrics`], which
/// therefore describes the most recently started run that has finished.
pub struct ExecutionMetrics {
    run_id: AtomicU64,
    started_at: Mutex<Option<Instant>>,
    elapsed_ns: AtomicU64,

    rows_processed: AtomicU64,
    workers_started: AtomicU64,
    workers_finished: AtomicU64,
    partials_collected: AtomicU64,

    active_workers: AtomicUsize,
    max_active_workers: AtomicUsize,

    // Held while publishing and snapshotting so a snapshot never mixes two runs.
    publish_lock: Mutex<()>,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            started_at: Mutex::new(None),
            elapsed_ns: AtomicU64::new(0),
            rows_processed: AtomicU64::new(0),
            workers_started: AtomicU64::new(0),
            workers_finished: AtomicU64::new(0),
            partials_collected: AtomicU64::new(0),
            active_workers: AtomicUsize::new(0),
            max_active_workers: AtomicUsize::new(0),
            publish_lock: Mutex::new(()),
        }
    }

    /// Fresh counters for run number `run_id`, started now.
    pub(crate) fn for_run(run_id: u64) -> Self {
        let metrics = Self::new();
        metrics.run_id.store(run_id, Ordering::SeqCst);
        if let Ok(mut started) = metrics.started_at.lock() {
            *started = Some(Instant::now());
        }
        metrics
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub fn on_row_processed(&self) {
        let _ = self.rows_processed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_worker_start(&self) {
        let _ = self.workers_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_workers.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        update_max_usize(&self.max_active_workers, now);
    }

    pub fn on_worker_end(&self) {
        let _ = self.workers_finished.fetch_add(1, Ordering::SeqCst);
        let _ = self
            .active_workers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn on_partial_collected(&self) {
        let _ = self.partials_collected.fetch_add(1, Ordering::SeqCst);
    }

    /// Copy a finished run's counters into these, unless a later run was already published.
    pub(crate) fn publish(&self, run: &ExecutionMetrics) {
        let _guard = lock_ignoring_poison(&self.publish_lock);
        let run_id = run.run_id.load(Ordering::SeqCst);
        if run_id < self.run_id.load(Ordering::SeqCst) {
            return;
        }

        self.run_id.store(run_id, Ordering::SeqCst);
        *lock_ignoring_poison(&self.started_at) = run.started_at();
        for (dst, src) in [
            (&self.elapsed_ns, &run.elapsed_ns),
            (&self.rows_processed, &run.rows_processed),
            (&self.workers_started, &run.workers_started),
            (&self.workers_finished, &run.workers_finished),
            (&self.partials_collected, &run.partials_collected),
        ] {
            dst.store(src.load(Ordering::SeqCst), Ordering::SeqCst);
        }
        self.active_workers
            .store(run.active_workers.load(Ordering::SeqCst), Ordering::SeqCst);
        self.max_active_workers
            .store(run.max_active_workers.load(Ordering::SeqCst), Ordering::SeqCst);
    }

    /// When the run started, if any run has started.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at.lock().ok().and_then(|g| *g)
    }

    pub fn snapshot(&self) -> ExecutionMetricsSnapshot {
        let _guard = lock_ignoring_poison(&self.publish_lock);
        let run_id = self.run_id.load(Ordering::SeqCst);
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        ExecutionMetricsSnapshot {
            run_id,
            elapsed,
            rows_processed: self.rows_processed.load(Ordering::SeqCst),
            workers_started: self.workers_started.load(Ordering::SeqCst),
            workers_finished: self.workers_finished.load(Ordering::SeqCst),
            partials_collected: self.partials_collected.load(Ordering::SeqCst),
            max_active_workers: self.max_active_workers.load(Ordering::SeqCst),
        }
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_ignoring_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`ExecutionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub rows_processed: u64,
    pub workers_started: u64,
    pub workers_finished: u64,
    /// Partial results consumed by the collector: one per element for `map`, one batch per
    /// worker for the batched operations.
    pub partials_collected: u64,
    pub max_active_workers: usize,
}

impl fmt::Display for ExecutionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, rows_processed={}, workers={}/{}, partials={}, max_active_workers={}, elapsed={:?}",
            self.run_id,
            self.rows_processed,
            self.workers_finished,
            self.workers_started,
            self.partials_collected,
            self.max_active_workers,
            self.elapsed
        )
    }
}
