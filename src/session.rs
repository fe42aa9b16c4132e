//! Session: a named entry point that owns an execution engine.
//!
//! ```rust
//! use rust_rdd::context::Context;
//! use rust_rdd::session::{Mode, Session};
//!
//! # fn main() -> rust_rdd::EngineResult<()> {
//! let session = Session::builder().app_name("word-count").mode(Mode::Local).build()?;
//! let words = session.parallelize(vec!["a", "b", "a"]);
//! let upper = words.map(&Context::background(), |w| w.to_uppercase())?;
//! assert_eq!(upper.collect(), vec!["A", "B", "A"]);
//! assert!(session.to_string().starts_with("AppName: word-count @ "));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::execution::{ExecutionEngine, ExecutionEvent, ExecutionObserver, ExecutionOptions};
use crate::ingestion;
use crate::rdd::Rdd;
use crate::types::DataSet;

/// Where a session's work runs. Only local execution is performed; `Cluster` is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Local,
    Cluster,
}

impl Mode {
    /// Parse a mode name case-insensitively. Unknown names fall back to [`Mode::Local`].
    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or_default()
    }

    fn try_parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Mode::Local),
            "cluster" => Some(Mode::Cluster),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Local => "local",
            Mode::Cluster => "cluster",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable session settings.
///
/// ```json
/// { "app_name": "etl", "mode": "local", "execution": { "num_workers": 4 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub app_name: String,
    pub mode: Mode,
    pub execution: ExecutionOptions,
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn from_json_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// A named, identified handle owning the engine its collections run on.
pub struct Session {
    id: Uuid,
    app_name: String,
    mode: Mode,
    engine: Arc<ExecutionEngine>,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn from_config(config: SessionConfig) -> EngineResult<Self> {
        Self::builder()
            .app_name(config.app_name)
            .mode(config.mode)
            .execution_options(config.execution)
            .build()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// Copy `data` into a collection scheduled on this session's engine.
    pub fn parallelize<T>(&self, data: impl IntoIterator<Item = T>) -> Rdd<T> {
        Rdd::with_engine(data, Arc::clone(&self.engine))
    }

    /// Load a CSV file with [`ingestion::ingest_csv_from_path`].
    pub fn read_csv(&self, path: impl AsRef<Path>) -> EngineResult<DataSet> {
        ingestion::ingest_csv_from_path(path)
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.to_string();
        match id.split_once('-') {
            Some((prefix, _)) => write!(
                f,
                "AppName: {} @ {}, Mode: {}",
                self.app_name, prefix, self.mode
            ),
            None => write!(f, "AppName: {}, Mode: {}", self.app_name, self.mode),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("app_name", &self.app_name)
            .field("mode", &self.mode)
            .field("execution", self.engine.options())
            .finish()
    }
}

/// Builder for [`Session`].
#[derive(Default)]
pub struct SessionBuilder {
    app_name: String,
    mode: Mode,
    unknown_mode: Option<String>,
    execution: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
}

impl SessionBuilder {
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self.unknown_mode = None;
        self
    }

    /// Set the mode by name. An unknown name selects [`Mode::Local`] and is reported to the
    /// observer as [`ExecutionEvent::ModeFallback`] when the session is built.
    pub fn mode_str(mut self, mode: &str) -> Self {
        match Mode::try_parse(mode) {
            Some(m) => {
                self.mode = m;
                self.unknown_mode = None;
            }
            None => {
                self.mode = Mode::Local;
                self.unknown_mode = Some(mode.to_string());
            }
        }
        self
    }

    pub fn execution_options(mut self, opts: ExecutionOptions) -> Self {
        self.execution = opts;
        self
    }

    /// Attach an observer to the session's engine.
    pub fn observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> EngineResult<Session> {
        let mut engine = ExecutionEngine::new(self.execution)?;
        if let Some(observer) = self.observer {
            engine = engine.with_observer(observer);
        }
        if let Some(requested) = self.unknown_mode {
            engine.emit(ExecutionEvent::ModeFallback { requested });
        }

        Ok(Session {
            id: Uuid::new_v4(),
            app_name: self.app_name,
            mode: self.mode,
            engine: Arc::new(engine),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Mode, Session, SessionConfig};

    #[test]
    fn mode_parse_falls_back_to_local() {
        assert_eq!(Mode::parse("cluster"), Mode::Cluster);
        assert_eq!(Mode::parse("LOCAL"), Mode::Local);
        assert_eq!(Mode::parse("yarn"), Mode::Local);
        assert_eq!(Mode::parse(""), Mode::Local);
    }

    #[test]
    fn display_uses_first_id_segment() {
        let s = Session::builder().app_name("demo").mode(Mode::Cluster).build().unwrap();
        let prefix = s.id().to_string();
        let prefix = prefix.split('-').next().unwrap();
        assert_eq!(s.to_string(), format!("AppName: demo @ {prefix}, Mode: cluster"));
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let a = Session::builder().build().unwrap();
        let b = Session::builder().build().unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn config_defaults_missing_fields() {
        let cfg = SessionConfig::from_json_str(r#"{ "app_name": "etl" }"#).unwrap();
        assert_eq!(cfg.app_name, "etl");
        assert_eq!(cfg.mode, Mode::Local);
        assert_eq!(cfg.execution.queue_capacity, 1_024);
    }
}
