//! Immutable, ordered collections with parallel transformations.
//!
//! An [`Rdd`] owns its elements and never mutates them after construction: every
//! transformation builds a new collection. A shared `&Rdd<T>` can be transformed from several
//! threads at once, since workers only ever read the source.
//!
//! | operation | output order | scheduler discipline |
//! |-----------|--------------|----------------------|
//! | [`Rdd::map`] | preserved | index-tagged job queue |
//! | [`Rdd::filter`] | unspecified | per-worker batches |
//! | [`Rdd::flatten`] | unspecified | per-worker batches |
//! | [`Rdd::flat_map`] | unspecified | per-worker batches |
//!
//! ```rust
//! use rust_rdd::context::Context;
//! use rust_rdd::rdd::Rdd;
//!
//! # fn main() -> rust_rdd::EngineResult<()> {
//! let ctx = Context::background();
//! let words = Rdd::new(vec!["A", "B", "C"]);
//! let lower = words.map(&ctx, |s| s.to_lowercase())?;
//! assert_eq!(lower.collect(), vec!["a", "b", "c"]);
//!
//! let mut kept = lower.filter(&ctx, |s| s != "b")?.collect();
//! kept.sort();
//! assert_eq!(kept, vec!["a", "c"]);
//! # Ok(())
//! # }
//! ```

mod nested;

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::EngineResult;
use crate::execution::{ExecutionEngine, Operation};
use crate::types::{DataSet, Value};

pub use nested::{Nested, Shape};

/// Immutable, ordered collection of `T` supporting parallel transformations.
#[derive(Clone)]
pub struct Rdd<T> {
    data: Vec<T>,
    engine: Arc<ExecutionEngine>,
}

impl<T> Rdd<T> {
    /// Build a collection from any ordered sequence, using a default engine.
    pub fn new(data: impl IntoIterator<Item = T>) -> Self {
        Self::with_engine(data, Arc::new(ExecutionEngine::default()))
    }

    /// Build a collection scheduled on `engine`. Derived collections keep the same engine.
    pub fn with_engine(data: impl IntoIterator<Item = T>, engine: Arc<ExecutionEngine>) -> Self {
        Self {
            data: data.into_iter().collect(),
            engine,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    fn derive<U>(&self, data: Vec<U>) -> Rdd<U> {
        Rdd {
            data,
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<T: Clone> Rdd<T> {
    /// Copy the elements out, in order. The returned vector is independent of the collection.
    pub fn collect(&self) -> Vec<T> {
        self.data.clone()
    }

    /// Build a collection by cloning a slice.
    pub fn from_slice(data: &[T]) -> Self {
        Self::new(data.iter().cloned())
    }
}

impl<T: Sync> Rdd<T> {
    /// Apply `f` to every element in parallel. `out[i] == f(&self[i])`.
    ///
    /// Fails with the context's error if it is done before or during the run; no partial
    /// collection is ever returned.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from `f` once every worker has stopped.
    pub fn map<U, F>(&self, ctx: &Context, f: F) -> EngineResult<Rdd<U>>
    where
        U: Send,
        F: Fn(&T) -> U + Sync,
    {
        ctx.check()?;
        if self.is_empty() {
            return Ok(self.derive(Vec::new()));
        }
        let data = self.engine.run_ordered(ctx, Operation::Map, &self.data, f)?;
        Ok(self.derive(data))
    }
}

impl<T: Clone + Send + Sync> Rdd<T> {
    /// Keep the elements for which `predicate` holds.
    ///
    /// The kept elements are exactly the matching ones, but their relative order is not
    /// guaranteed.
    pub fn filter<P>(&self, ctx: &Context, predicate: P) -> EngineResult<Rdd<T>>
    where
        P: Fn(&T) -> bool + Sync,
    {
        ctx.check()?;
        if self.is_empty() {
            return Ok(self.derive(Vec::new()));
        }
        let data = self
            .engine
            .run_batched(ctx, Operation::Filter, &self.data, |item, out| {
                if predicate(item) {
                    out.push(item.clone());
                }
            })?;
        Ok(self.derive(data))
    }
}

impl<T: Nested + Clone + Send + Sync> Rdd<T> {
    /// Splice nested sequences one level deep. Scalars pass through, and so do sequences of a
    /// different element type ([`Shape::Foreign`]). Output order is not guaranteed.
    pub fn flatten(&self, ctx: &Context) -> EngineResult<Rdd<T>> {
        ctx.check()?;
        if self.is_empty() {
            return Ok(self.derive(Vec::new()));
        }
        let data = self
            .engine
            .run_batched(ctx, Operation::Flatten, &self.data, |item, out| {
                match item.shape() {
                    Shape::Sequence(inner) => out.extend(inner.iter().cloned()),
                    Shape::Scalar | Shape::Foreign => out.push(item.clone()),
                }
            })?;
        Ok(self.derive(data))
    }

    /// [`Rdd::flatten`] followed by [`Rdd::map`], fused into one pass. Output order is not
    /// guaranteed.
    pub fn flat_map<U, F>(&self, ctx: &Context, f: F) -> EngineResult<Rdd<U>>
    where
        U: Send,
        F: Fn(&T) -> U + Sync,
    {
        ctx.check()?;
        if self.is_empty() {
            return Ok(self.derive(Vec::new()));
        }
        let data = self
            .engine
            .run_batched(ctx, Operation::FlatMap, &self.data, |item, out| {
                match item.shape() {
                    Shape::Sequence(inner) => out.extend(inner.iter().map(&f)),
                    Shape::Scalar | Shape::Foreign => out.push(f(item)),
                }
            })?;
        Ok(self.derive(data))
    }
}

impl Rdd<Value> {
    /// One-column dataset named `value` holding the elements in order.
    pub fn to_dataset(&self) -> EngineResult<DataSet> {
        DataSet::from_columns(vec![self.collect()], vec!["value".to_string()])
    }
}

impl<T> From<Vec<T>> for Rdd<T> {
    fn from(data: Vec<T>) -> Self {
        Self::new(data)
    }
}

impl<T> fmt::Display for Rdd<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rdd[size={}]", self.len())
    }
}

impl<T: fmt::Debug> fmt::Debug for Rdd<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rdd")
            .field("size", &self.len())
            .field("data", &self.data)
            .finish()
    }
}
