use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_rdd::EngineError;
use rust_rdd::context::Context;
use rust_rdd::execution::{
    ExecutionEngine, ExecutionEvent, ExecutionObserver, ExecutionOptions, Operation,
};
use rust_rdd::rdd::Rdd;
use rust_rdd::types::{DataSet, Value};

fn canceled() -> Context {
    let ctx = Context::new();
    ctx.cancel();
    ctx
}

fn big_input() -> Vec<Value> {
    (0..10_000i64)
        .map(|i| {
            if i % 3 == 0 {
                Value::List(vec![Value::Int64(i), Value::Int64(-i)])
            } else {
                Value::Int64(i)
            }
        })
        .collect()
}

#[derive(Default)]
struct RunCounter {
    runs: AtomicUsize,
}

impl ExecutionObserver for RunCounter {
    fn on_event(&self, event: &ExecutionEvent) {
        if matches!(event, ExecutionEvent::RunStarted { .. }) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn already_canceled_context_fails_every_transformation() {
    let ctx = canceled();
    let counter = Arc::new(RunCounter::default());
    let engine = Arc::new(ExecutionEngine::default().with_observer(counter.clone()));
    let rdd = Rdd::with_engine(big_input(), engine);

    assert!(matches!(rdd.map(&ctx, Value::clone), Err(EngineError::Canceled)));
    assert!(matches!(rdd.filter(&ctx, |_| true), Err(EngineError::Canceled)));
    assert!(matches!(rdd.flatten(&ctx), Err(EngineError::Canceled)));
    assert!(matches!(
        rdd.flat_map(&ctx, |v| v.as_i64()),
        Err(EngineError::Canceled)
    ));

    // Nothing was scheduled.
    assert_eq!(counter.runs.load(Ordering::SeqCst), 0);
    assert_eq!(rdd.len(), 10_000);
}

#[test]
fn cancel_during_map_returns_error_not_partial_output() {
    let engine = Arc::new(
        ExecutionEngine::new(ExecutionOptions {
            num_workers: Some(4),
            queue_capacity: 4,
        })
        .unwrap(),
    );
    let rdd = Rdd::with_engine((0..10_000i64).collect::<Vec<_>>(), engine);
    let ctx = Context::new();
    let seen = AtomicUsize::new(0);

    let result = rdd.map(&ctx, |v| {
        if seen.fetch_add(1, Ordering::SeqCst) == 500 {
            ctx.cancel();
        }
        *v
    });
    assert!(matches!(result, Err(EngineError::Canceled)));
    assert!(seen.load(Ordering::SeqCst) < 10_000);
}

#[test]
fn cancel_during_filter_returns_error() {
    let rdd = Rdd::new((0..10_000i64).collect::<Vec<_>>());
    let ctx = Context::new();
    let seen = AtomicUsize::new(0);

    let result = rdd.filter(&ctx, |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 10 {
            ctx.cancel();
        }
        true
    });
    assert!(matches!(result, Err(EngineError::Canceled)));
}

#[test]
fn expired_deadline_reports_deadline_exceeded() {
    let ctx = Context::with_timeout(Duration::from_millis(5)).unwrap();
    ctx.wait();
    let rdd = Rdd::new(big_input());

    let err = rdd.flatten(&ctx).unwrap_err();
    assert!(matches!(err, EngineError::DeadlineExceeded));
    assert!(err.is_cancellation());
}

#[test]
fn deadline_interrupts_a_slow_map() {
    let ctx = Context::with_timeout(Duration::from_millis(20)).unwrap();
    let rdd = Rdd::new((0..10_000i64).collect::<Vec<_>>());
    let result = rdd.map(&ctx, |v| {
        std::thread::sleep(Duration::from_millis(1));
        *v
    });
    assert!(matches!(result, Err(EngineError::DeadlineExceeded)));
}

#[test]
fn canceled_runs_are_reported_to_the_observer() {
    #[derive(Default)]
    struct Recorder(Mutex<Vec<Operation>>);
    impl ExecutionObserver for Recorder {
        fn on_event(&self, event: &ExecutionEvent) {
            if let ExecutionEvent::Canceled { op } = event {
                self.0.lock().unwrap().push(*op);
            }
        }
    }

    let recorder = Arc::new(Recorder::default());
    let engine = Arc::new(
        ExecutionEngine::new(ExecutionOptions {
            num_workers: Some(2),
            ..Default::default()
        })
        .unwrap()
        .with_observer(recorder.clone()),
    );
    let rdd = Rdd::with_engine((0..1_000i64).collect::<Vec<_>>(), engine);
    let ctx = Context::new();
    let _ = rdd.flat_map(&ctx, |v| {
        if *v == 3 {
            ctx.cancel();
        }
        *v
    });

    assert_eq!(recorder.0.lock().unwrap().as_slice(), &[Operation::FlatMap]);
}

#[test]
fn grouping_and_distinct_observe_cancellation() {
    let ds = DataSet::from_columns(
        vec![vec![Value::from("A"), Value::from("B")]],
        vec!["letter".to_string()],
    )
    .unwrap();
    let ctx = canceled();
    assert!(matches!(ds.group_by(&ctx, "letter"), Err(EngineError::Canceled)));
    assert!(matches!(ds.distinct(&ctx, "letter"), Err(EngineError::Canceled)));
}

#[test]
fn deadline_expires_while_grouping_a_large_column() {
    let keys: Vec<Value> = (0..2_000_000i64)
        .map(|i| Value::Utf8(format!("key-{}", i % 10_000)))
        .collect();
    let ds = DataSet::from_columns(vec![keys], vec!["key".to_string()]).unwrap();

    let ctx = Context::with_timeout(Duration::from_millis(2)).unwrap();
    let result = ds.group_by(&ctx, "key");

    assert!(matches!(result, Err(EngineError::DeadlineExceeded)));
}
