//! Execution engine behind the [`crate::rdd::Rdd`] transformations.
//!
//! Every call builds its own worker pool, sized to `min(parallelism, input length)`, and tears
//! it down before returning. Two fan-out/fan-in disciplines are provided:
//!
//! - **ordered** (`map`): a dispatcher feeds index-tagged jobs through a bounded queue; workers
//!   send `(index, value)` results; the collector writes each into its original slot.
//! - **batched** (`filter`, `flatten`, `flat_map`): the input is split into one contiguous chunk
//!   per worker; each worker accumulates locally and sends a single batch; the collector
//!   concatenates batches in arrival order.
//!
//! The collector runs on the calling thread and is the only writer of the output. The caller's
//! [`Context`] is checked before dispatch, at every job/chunk dispatch and at every consumed
//! partial result; workers also watch it while blocked. On cancellation the partial output is
//! discarded and the context's error is returned.

mod observer;

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_channel::{bounded, select};
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{EngineError, EngineResult};

pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver, Operation,
    StdErrExecutionObserver,
};

/// Configuration for the [`ExecutionEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Upper bound on workers per call.
    ///
    /// If `None`, uses the platform's available parallelism. The input length always caps it.
    pub num_workers: Option<usize>,
    /// Capacity of the bounded job and result queues used by ordered execution.
    pub queue_capacity: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            num_workers: None,
            queue_capacity: 1_024,
        }
    }
}

/// Schedules transformations over borrowed input slices.
pub struct ExecutionEngine {
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
    runs: AtomicU64,
}

impl ExecutionEngine {
    /// Create a new engine with the given options.
    ///
    /// Returns [`EngineError::InvalidData`] if `queue_capacity == 0` or `num_workers == Some(0)`.
    pub fn new(opts: ExecutionOptions) -> EngineResult<Self> {
        if opts.queue_capacity == 0 {
            return Err(EngineError::InvalidData {
                message: "queue_capacity must be > 0".to_string(),
            });
        }
        if opts.num_workers == Some(0) {
            return Err(EngineError::InvalidData {
                message: "num_workers must be > 0 when set".to_string(),
            });
        }
        Ok(Self {
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
            runs: AtomicU64::new(0),
        })
    }

    /// Attach an observer for execution events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.opts
    }

    /// Get a handle to the metrics of the latest finished run.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Number of workers a call over `len` elements spins up: never more than `len`, never
    /// zero for a non-empty input.
    pub fn worker_count(&self, len: usize) -> usize {
        let parallelism = self.opts.num_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        parallelism.max(1).min(len)
    }

    /// Order-preserving parallel map: `out[i] == f(&input[i])`.
    pub(crate) fn run_ordered<T, U, F>(
        &self,
        ctx: &Context,
        op: Operation,
        input: &[T],
        f: F,
    ) -> EngineResult<Vec<U>>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Sync,
    {
        ctx.check()?;
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let len = input.len();
        let workers = self.worker_count(len);
        let start = Instant::now();
        let run = self.begin(op, len, workers);

        let outcome = self.ordered_fan_out(ctx, op, &run, input, workers, &f);
        self.finish(op, start, &run, &outcome);
        outcome
    }

    fn ordered_fan_out<T, U, F>(
        &self,
        ctx: &Context,
        op: Operation,
        run: &ExecutionMetrics,
        input: &[T],
        workers: usize,
        f: &F,
    ) -> EngineResult<Vec<U>>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Sync,
    {
        let len = input.len();
        // One extra thread runs the dispatcher so it never starves behind blocked workers.
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers + 1)
            .thread_name(move |i| format!("rdd-{op}-{i}"))
            .build()?;

        let (job_tx, job_rx) = bounded::<(usize, &T)>(self.opts.queue_capacity);
        let (result_tx, result_rx) = bounded::<(usize, U)>(self.opts.queue_capacity);

        let mut slots: Vec<Option<U>> = Vec::with_capacity(len);
        slots.resize_with(len, || None);

        pool.in_place_scope(|scope| -> EngineResult<()> {
            scope.spawn(move |_| {
                for job in input.iter().enumerate() {
                    if ctx.is_done() {
                        break;
                    }
                    select! {
                        send(job_tx, job) -> sent => if sent.is_err() { break },
                        recv(ctx.done()) -> _ => break,
                    }
                }
                // Dropping `job_tx` closes the queue.
            });

            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move |_| {
                    self.worker_started(run, worker);
                    let mut produced = 0usize;
                    loop {
                        select! {
                            recv(job_rx) -> job => {
                                let Ok((index, item)) = job else { break };
                                let out = f(item);
                                run.on_row_processed();
                                select! {
                                    send(result_tx, (index, out)) -> sent => {
                                        if sent.is_err() { break }
                                    }
                                    recv(ctx.done()) -> _ => break,
                                }
                                produced += 1;
                            }
                            recv(ctx.done()) -> _ => break,
                        }
                    }
                    self.worker_finished(run, worker, produced);
                });
            }
            drop(job_rx);
            drop(result_tx);

            // Moved in so it is dropped on early return, which unblocks any pending sender.
            let result_rx = result_rx;
            let mut received = 0usize;
            while received < len {
                select! {
                    recv(result_rx) -> msg => match msg {
                        Ok((index, out)) => {
                            slots[index] = Some(out);
                            received += 1;
                            run.on_partial_collected();
                        }
                        Err(_) => {
                            ctx.check()?;
                            return Err(EngineError::WorkerFailed { op: op.as_str() });
                        }
                    },
                    recv(ctx.done()) -> _ => return ctx.check(),
                }
                ctx.check()?;
            }
            Ok(())
        })?;

        // Every slot was filled exactly once, since `received == len` and indices are unique.
        Ok(slots.into_iter().flatten().collect())
    }

    /// Unordered parallel expansion: `work` pushes zero or more outputs per input element into
    /// its worker's local batch. Batches are concatenated in completion order.
    pub(crate) fn run_batched<T, U, F>(
        &self,
        ctx: &Context,
        op: Operation,
        input: &[T],
        work: F,
    ) -> EngineResult<Vec<U>>
    where
        T: Sync,
        U: Send,
        F: Fn(&T, &mut Vec<U>) + Sync,
    {
        ctx.check()?;
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let len = input.len();
        let workers = self.worker_count(len);
        let start = Instant::now();
        let run = self.begin(op, len, workers);

        let outcome = self.batched_fan_out(ctx, op, &run, input, workers, &work);
        self.finish(op, start, &run, &outcome);
        outcome
    }

    fn batched_fan_out<T, U, F>(
        &self,
        ctx: &Context,
        op: Operation,
        run: &ExecutionMetrics,
        input: &[T],
        workers: usize,
        work: &F,
    ) -> EngineResult<Vec<U>>
    where
        T: Sync,
        U: Send,
        F: Fn(&T, &mut Vec<U>) + Sync,
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |i| format!("rdd-{op}-{i}"))
            .build()?;

        let (batch_tx, batch_rx) = bounded::<Vec<U>>(workers);

        pool.in_place_scope(|scope| -> EngineResult<Vec<U>> {
            for (worker, range) in chunk_ranges(input.len(), workers).into_iter().enumerate() {
                ctx.check()?;
                let batch_tx = batch_tx.clone();
                scope.spawn(move |_| {
                    self.worker_started(run, worker);
                    self.emit(ExecutionEvent::ChunkStarted {
                        worker,
                        start_row: range.start,
                        row_count: range.len(),
                    });

                    let mut local = Vec::new();
                    let mut completed = true;
                    for item in &input[range] {
                        if ctx.is_done() {
                            completed = false;
                            break;
                        }
                        work(item, &mut local);
                        run.on_row_processed();
                    }

                    let produced = local.len();
                    if completed {
                        select! {
                            send(batch_tx, local) -> _ => {}
                            recv(ctx.done()) -> _ => {}
                        }
                    }
                    self.worker_finished(run, worker, produced);
                });
            }
            drop(batch_tx);

            let batch_rx = batch_rx;
            let mut out = Vec::new();
            for _ in 0..workers {
                select! {
                    recv(batch_rx) -> msg => match msg {
                        Ok(batch) => {
                            out.extend(batch);
                            run.on_partial_collected();
                        }
                        Err(_) => {
                            ctx.check()?;
                            return Err(EngineError::WorkerFailed { op: op.as_str() });
                        }
                    },
                    recv(ctx.done()) -> _ => {
                        ctx.check()?;
                    }
                }
                ctx.check()?;
            }
            Ok(out)
        })
    }

    fn begin(&self, op: Operation, input_len: usize, workers: usize) -> ExecutionMetrics {
        let run_id = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit(ExecutionEvent::RunStarted {
            op,
            input_len,
            workers,
        });
        ExecutionMetrics::for_run(run_id)
    }

    fn finish<R>(
        &self,
        op: Operation,
        start: Instant,
        run: &ExecutionMetrics,
        outcome: &EngineResult<R>,
    ) {
        match outcome {
            Err(err) if err.is_cancellation() => self.emit(ExecutionEvent::Canceled { op }),
            Err(EngineError::WorkerFailed { .. }) => {
                self.emit(ExecutionEvent::WorkerFailed { op })
            }
            _ => {}
        }
        run.end_run(start.elapsed());
        self.metrics.publish(run);
        self.emit(ExecutionEvent::RunFinished {
            op,
            elapsed: start.elapsed(),
            metrics: run.snapshot(),
        });
    }

    fn worker_started(&self, run: &ExecutionMetrics, worker: usize) {
        run.on_worker_start();
        self.emit(ExecutionEvent::WorkerStarted { worker });
    }

    fn worker_finished(&self, run: &ExecutionMetrics, worker: usize, output_rows: usize) {
        self.emit(ExecutionEvent::WorkerFinished {
            worker,
            output_rows,
        });
        run.on_worker_end();
    }

    pub(crate) fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self {
            opts: ExecutionOptions::default(),
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
            runs: AtomicU64::new(0),
        }
    }
}

/// Split `len` rows into `parts` contiguous ranges; the first `len % parts` ranges get one
/// extra row.
fn chunk_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    if len == 0 || parts == 0 {
        return Vec::new();
    }
    let base = len / parts;
    let extra = len % parts;
    let mut out = Vec::with_capacity(parts);
    let mut start = 0usize;
    for i in 0..parts {
        let end = start + base + usize::from(i < extra);
        out.push(start..end);
        start = end;
    }
    out
}
