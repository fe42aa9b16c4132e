use std::sync::{Arc, Mutex};

use rust_rdd::context::Context;
use rust_rdd::execution::{ExecutionEvent, ExecutionObserver, ExecutionOptions};
use rust_rdd::session::{Mode, Session, SessionConfig};
use rust_rdd::EngineError;

#[derive(Default)]
struct FallbackRecorder {
    requested: Mutex<Vec<String>>,
}

impl ExecutionObserver for FallbackRecorder {
    fn on_event(&self, event: &ExecutionEvent) {
        if let ExecutionEvent::ModeFallback { requested } = event {
            self.requested.lock().unwrap().push(requested.clone());
        }
    }
}

#[test]
fn unknown_mode_falls_back_to_local_and_is_reported() {
    let recorder = Arc::new(FallbackRecorder::default());
    let session = Session::builder()
        .app_name("fallback")
        .mode_str("mesos")
        .observer(recorder.clone())
        .build()
        .unwrap();

    assert_eq!(session.mode(), Mode::Local);
    assert_eq!(*recorder.requested.lock().unwrap(), vec!["mesos".to_string()]);
}

#[test]
fn known_mode_names_are_not_reported() {
    let recorder = Arc::new(FallbackRecorder::default());
    let session = Session::builder()
        .mode_str("Cluster")
        .observer(recorder.clone())
        .build()
        .unwrap();

    assert_eq!(session.mode(), Mode::Cluster);
    assert!(recorder.requested.lock().unwrap().is_empty());
    assert!(session.to_string().ends_with(", Mode: cluster"));
}

#[test]
fn session_loads_from_json_config() {
    let cfg = SessionConfig::from_json_path("tests/fixtures/session.json").unwrap();
    assert_eq!(cfg.app_name, "letters");
    assert_eq!(cfg.mode, Mode::Cluster);
    assert_eq!(
        cfg.execution,
        ExecutionOptions {
            num_workers: Some(2),
            queue_capacity: 16,
        }
    );

    let session = Session::from_config(cfg).unwrap();
    assert_eq!(session.app_name(), "letters");
    assert_eq!(session.engine().worker_count(100), 2);
}

#[test]
fn invalid_config_is_rejected() {
    let err = SessionConfig::from_json_str(r#"{ "mode": 3 }"#).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));

    let cfg = SessionConfig::from_json_str(r#"{ "execution": { "queue_capacity": 0 } }"#).unwrap();
    let err = Session::from_config(cfg).unwrap_err();
    assert!(matches!(err, EngineError::InvalidData { .. }));
}

#[test]
fn parallelize_runs_on_the_session_engine() {
    let session = Session::builder()
        .execution_options(ExecutionOptions {
            num_workers: Some(3),
            ..Default::default()
        })
        .build()
        .unwrap();
    let rdd = session.parallelize(1..=10);
    assert!(Arc::ptr_eq(rdd.engine(), session.engine()));

    let doubled = rdd.map(&Context::background(), |v| v * 2).unwrap();
    assert_eq!(doubled.collect(), (1..=10).map(|v| v * 2).collect::<Vec<_>>());
    assert_eq!(session.engine().metrics().snapshot().rows_processed, 10);
}

#[test]
fn read_csv_goes_through_the_loader() {
    let session = Session::builder().app_name("csv").build().unwrap();
    let ds = session.read_csv("tests/fixtures/letters.csv").unwrap();
    assert_eq!(ds.to_string(), "DataSet[rows=5, columns=2: letter, weight]");
}
