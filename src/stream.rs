//! The lazy pipeline handle.
//!
//! A [`Stream<T>`] is a source plus an ordered chain of stages. Every intermediate
//! operation consumes the stream and returns a new one with one more stage; nothing is
//! read from the source until a terminal operation (see the `terminal` module) runs.
//!
//! Closures follow the crate's borrowing convention: predicates, mappers and key
//! extractors receive `&T`; reducers receive owned values.

use crate::runner::{ExecMode, Runner, Telemetry};
use crate::source::DynSource;
use crate::stage::{
    DistinctOp, DropWhileOp, FilterOp, FlatMapOp, LimitOp, MapOp, PeekOp, Plan, SkipOp,
    SortedOp, Stage, StageNode, TakeWhileOp,
};
use crate::type_token::cursor_ops_for;
use anyhow::Result;
use std::cmp::Ordering;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use crate::metrics::MetricsCollector;

/// Bound for anything that can flow through a stream.
pub trait Element: Send + 'static {}
impl<T: Send + 'static> Element for T {}

/// A lazy, single-use pipeline producing elements of type `T`.
pub struct Stream<T> {
    pub(crate) plan: Plan,
    pub(crate) runner: Runner,
    pub(crate) telemetry: Telemetry,
    _t: PhantomData<fn() -> T>,
}

impl<T: Element> Stream<T> {
    pub(crate) fn from_dyn_source(source: Box<dyn DynSource>) -> Self {
        Self {
            plan: Plan {
                source,
                source_ops: cursor_ops_for::<T>(),
                stages: Vec::new(),
            },
            runner: Runner::sequential(),
            telemetry: Telemetry::default(),
            _t: PhantomData,
        }
    }

    fn push<O: Element>(self, stage: Stage) -> Stream<O> {
        let mut plan = self.plan;
        plan.stages.push(StageNode {
            stage,
            output: cursor_ops_for::<O>(),
        });
        Stream {
            plan,
            runner: self.runner,
            telemetry: self.telemetry,
            _t: PhantomData,
        }
    }

    /* ---------------- execution mode ---------------- */

    /// Run terminals on the worker pool. Keeps an existing parallel configuration.
    #[must_use]
    pub fn parallel(mut self) -> Self {
        if self.runner.mode == ExecMode::Sequential {
            self.runner.mode = ExecMode::Parallel {
                threads: None,
                partitions: None,
            };
        }
        self
    }

    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.runner.mode = ExecMode::Sequential;
        self
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Runner) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn is_parallel(&self) -> bool {
        matches!(self.runner.mode, ExecMode::Parallel { .. })
    }

    /// Report execution counters for every terminal run on this stream.
    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.telemetry = Telemetry::with_metrics(metrics);
        self
    }

    /* ---------------- introspection ---------------- */

    /// Stage names in pipeline order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.plan.stages.iter().map(|n| n.stage.name()).collect()
    }

    /// One line per step: the source, then each stage with its output element type.
    #[must_use]
    pub fn describe(&self) -> String {
        let traits = self.plan.source.source_traits();
        let mut out = format!(
            "source<{}> ordered={} finite={}",
            self.plan.source_ops.tag().name,
            traits.ordered,
            traits.finite
        );
        for node in &self.plan.stages {
            let detail = match &node.stage {
                Stage::Limit(n, _) | Stage::Skip(n, _) => format!("({n})"),
                _ => String::new(),
            };
            out.push_str(&format!(
                "\n  -> {}{detail} : {}",
                node.stage.name(),
                node.output.tag().name
            ));
        }
        out
    }

    /* ---------------- stateless stages ---------------- */

    /// Keep elements matching `pred`.
    #[must_use]
    pub fn filter<P>(self, pred: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.try_filter(move |t| Ok(pred(t)))
    }

    /// Like [`filter`](Self::filter); an `Err` from `pred` aborts the terminal.
    #[must_use]
    pub fn try_filter<P>(self, pred: P) -> Self
    where
        P: Fn(&T) -> Result<bool> + Send + Sync + 'static,
    {
        self.push::<T>(Stage::Filter(Arc::new(FilterOp::<T, P>::new(pred))))
    }

    #[must_use]
    pub fn map<O, F>(self, f: F) -> Stream<O>
    where
        O: Element,
        F: Fn(&T) -> O + Send + Sync + 'static,
    {
        self.try_map(move |t| Ok(f(t)))
    }

    /// Like [`map`](Self::map); an `Err` from `f` aborts the terminal.
    #[must_use]
    pub fn try_map<O, F>(self, f: F) -> Stream<O>
    where
        O: Element,
        F: Fn(&T) -> Result<O> + Send + Sync + 'static,
    {
        self.push::<O>(Stage::Map(Arc::new(MapOp::<T, O, F>::new(f))))
    }

    /// Replace each element with the items of `f(element)`, lazily and in order.
    ///
    /// Any `IntoIterator` works; returning an `Option` keeps `Some` values and drops
    /// `None`s.
    #[must_use]
    pub fn flat_map<I, F>(self, f: F) -> Stream<I::Item>
    where
        I: IntoIterator + 'static,
        I::Item: Element,
        I::IntoIter: Send + 'static,
        F: Fn(&T) -> I + Send + Sync + 'static,
    {
        self.try_flat_map(move |t| Ok(f(t)))
    }

    #[must_use]
    pub fn try_flat_map<I, F>(self, f: F) -> Stream<I::Item>
    where
        I: IntoIterator + 'static,
        I::Item: Element,
        I::IntoIter: Send + 'static,
        F: Fn(&T) -> Result<I> + Send + Sync + 'static,
    {
        self.push::<I::Item>(Stage::FlatMap(Arc::new(FlatMapOp::<T, I, F>::new(f))))
    }

    /// Observe each element as it is pulled, without changing it.
    #[must_use]
    pub fn peek<F>(self, f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.push::<T>(Stage::Peek(Arc::new(PeekOp::<T, F>::new(f))))
    }

    /* ---------------- stateful / order-dependent stages ---------------- */

    /// Stable sort by the natural order. Buffers the whole upstream on the first pull.
    #[must_use]
    pub fn sorted(self) -> Self
    where
        T: Ord,
    {
        self.sorted_by(|a: &T, b: &T| a.cmp(b))
    }

    /// Stable sort by `cmp`. A comparator that is not a total order still yields every
    /// element exactly once, in unspecified order.
    #[must_use]
    pub fn sorted_by<C>(self, cmp: C) -> Self
    where
        C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.push::<T>(Stage::Sorted(Arc::new(SortedOp::<T, C>::new(cmp))))
    }

    #[must_use]
    pub fn sorted_by_key<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.sorted_by(move |a: &T, b: &T| key(a).cmp(&key(b)))
    }

    /// Drop repeats, keeping the first occurrence in encounter order.
    #[must_use]
    pub fn distinct(self) -> Self
    where
        T: Eq + Hash + Clone,
    {
        self.distinct_by_key(T::clone)
    }

    /// Drop elements whose key was already seen.
    #[must_use]
    pub fn distinct_by_key<K, F>(self, key: F) -> Self
    where
        K: Element + Eq + Hash,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.push::<T>(Stage::Distinct(Arc::new(DistinctOp::<T, K, F>::new(key))))
    }

    /// At most `n` elements; upstream is not pulled once `n` have been produced.
    #[must_use]
    pub fn limit(self, n: usize) -> Self {
        self.push::<T>(Stage::Limit(n, Arc::new(LimitOp::<T>::new(n))))
    }

    #[must_use]
    pub fn skip(self, n: usize) -> Self {
        self.push::<T>(Stage::Skip(n, Arc::new(SkipOp::<T>::new(n))))
    }

    /// Elements up to (not including) the first one failing `pred`; nothing after it
    /// is pulled.
    #[must_use]
    pub fn take_while<P>(self, pred: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.push::<T>(Stage::TakeWhile(Arc::new(TakeWhileOp::<T, P>::new(pred))))
    }

    /// Skip the leading run of elements matching `pred`; everything from the first
    /// failure on passes through untested.
    #[must_use]
    pub fn drop_while<P>(self, pred: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.push::<T>(Stage::DropWhile(Arc::new(DropWhileOp::<T, P>::new(pred))))
    }
}

#[cfg(test)]
mod tests {
    use crate::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn building_a_pipeline_pulls_nothing() -> anyhow::Result<()> {
        let pulled = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&pulled);
        let s = range(0, 100)
            .peek(move |_: &i64| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .map(|n: &i64| n * 2)
            .filter(|n: &i64| n % 3 == 0);
        assert_eq!(pulled.load(Ordering::SeqCst), 0);
        assert_eq!(s.limit(2).to_vec()?, vec![0, 6]);
        assert_eq!(pulled.load(Ordering::SeqCst), 4);
        Ok(())
    }

    #[test]
    fn describe_lists_stages_and_types() {
        let s = from_vec(vec![1u32, 2, 3])
            .map(|n: &u32| n.to_string())
            .limit(2);
        assert_eq!(s.stage_names(), vec!["map", "limit"]);
        let text = s.describe();
        assert!(text.starts_with("source<u32> ordered=true finite=true"));
        assert!(text.contains("-> limit(2) : alloc::string::String"));
    }

    #[test]
    fn from_iter_reports_unbounded_iterators_as_infinite() {
        assert!(from_iter(0u64..).describe().contains("finite=false"));
        assert!(from_iter(std::iter::repeat(7u8)).describe().contains("finite=false"));
        assert!(from_iter(vec![1, 2, 3]).describe().contains("finite=true"));
        assert!(from_iter((0..10).filter(|n| n % 2 == 0)).describe().contains("finite=true"));
    }

    #[test]
    fn mode_switches() {
        let s = from_vec(vec![1]).parallel();
        assert!(s.is_parallel());
        assert!(!s.sequential().is_parallel());
    }
}
