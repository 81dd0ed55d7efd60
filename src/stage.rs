//! Pipeline stages.
//!
//! A [`Stage`] is one intermediate operation appended to a [`Stream`](crate::Stream).
//! Each variant wraps a type-erased [`DynOp`] that turns an upstream cursor partition
//! into a downstream one *without pulling anything*: all work happens later, when a
//! terminal operation pulls through the composed cursors.
//!
//! Stateless stages (`Filter`, `Map`, `FlatMap`, `Peek`) are fused and replicated per
//! partition by the parallel runner. The remaining stages depend on encounter order or
//! on everything seen so far, so in parallel mode they act as barriers: the runner
//! gathers all partitions in order, applies the stage once, and re-splits the result.
//! `Limit` and `TakeWhile` are barriers too, but read the partitions lazily in order.

use crate::source::DynSource;
use crate::stream::Element;
use crate::type_token::{
    CursorOps, Cursor, Partition, from_cursor, into_cursor, into_rows, rows_cursor,
};
use anyhow::Result;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::Hash;
use std::any::Any;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A type-erased stage operator.
pub(crate) trait DynOp: Send + Sync {
    /// Wrap an upstream cursor partition lazily.
    fn apply(&self, input: Partition) -> Result<Partition>;

    /// Apply this stage to rows gathered from every parallel partition.
    ///
    /// Only called for barrier stages. The default reopens the rows as a cursor and
    /// delegates to [`apply`](DynOp::apply).
    fn apply_gathered(&self, rows: Partition, ops: &dyn CursorOps) -> Result<Partition> {
        self.apply(ops.rows_into_cursor(rows)?)
    }
}

/// One intermediate operation of a pipeline.
#[derive(Clone)]
pub(crate) enum Stage {
    Filter(Arc<dyn DynOp>),
    Map(Arc<dyn DynOp>),
    FlatMap(Arc<dyn DynOp>),
    Peek(Arc<dyn DynOp>),
    Sorted(Arc<dyn DynOp>),
    Distinct(Arc<dyn DynOp>),
    Limit(usize, Arc<dyn DynOp>),
    Skip(usize, Arc<dyn DynOp>),
    TakeWhile(Arc<dyn DynOp>),
    DropWhile(Arc<dyn DynOp>),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Filter(_) => "filter",
            Self::Map(_) => "map",
            Self::FlatMap(_) => "flat_map",
            Self::Peek(_) => "peek",
            Self::Sorted(_) => "sorted",
            Self::Distinct(_) => "distinct",
            Self::Limit(..) => "limit",
            Self::Skip(..) => "skip",
            Self::TakeWhile(_) => "take_while",
            Self::DropWhile(_) => "drop_while",
        }
    }

    /// Stateless stages can run independently on every partition.
    pub fn is_stateless(&self) -> bool {
        matches!(
            self,
            Self::Filter(_) | Self::Map(_) | Self::FlatMap(_) | Self::Peek(_)
        )
    }

    /// Stages that only ever need an ordered prefix of their input.
    pub fn is_prefix(&self) -> bool {
        matches!(self, Self::Limit(..) | Self::TakeWhile(_))
    }

    pub fn op(&self) -> &Arc<dyn DynOp> {
        match self {
            Self::Filter(op)
            | Self::Map(op)
            | Self::FlatMap(op)
            | Self::Peek(op)
            | Self::Sorted(op)
            | Self::Distinct(op)
            | Self::Limit(_, op)
            | Self::Skip(_, op)
            | Self::TakeWhile(op)
            | Self::DropWhile(op) => op,
        }
    }
}

/// A stage plus typed helpers for the element type it produces.
#[derive(Clone)]
pub(crate) struct StageNode {
    pub(crate) stage: Stage,
    pub(crate) output: Arc<dyn CursorOps>,
}

/// Everything a terminal needs to run: the source and the ordered stage chain.
pub(crate) struct Plan {
    pub(crate) source: Box<dyn DynSource>,
    pub(crate) source_ops: Arc<dyn CursorOps>,
    pub(crate) stages: Vec<StageNode>,
}

/// Run a contiguous run of stages over one partition.
pub(crate) fn fuse(stages: &[StageNode], input: Partition) -> Result<Partition> {
    stages
        .iter()
        .try_fold(input, |part, node| node.stage.op().apply(part))
}

/* ---------------- stateless ops ---------------- */

pub(crate) struct FilterOp<T, P>(Arc<P>, PhantomData<fn(T)>);

impl<T, P> FilterOp<T, P> {
    pub(crate) fn new(pred: P) -> Self {
        Self(Arc::new(pred), PhantomData)
    }
}

impl<T, P> DynOp for FilterOp<T, P>
where
    T: Element,
    P: Fn(&T) -> Result<bool> + Send + Sync + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let pred = Arc::clone(&self.0);
        let upstream = into_cursor::<T>(input, "filter")?;
        let out: Cursor<T> = Box::new(upstream.filter_map(move |item| match item {
            Ok(t) => match pred(&t) {
                Ok(true) => Some(Ok(t)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            },
            Err(e) => Some(Err(e)),
        }));
        Ok(from_cursor(out))
    }
}

pub(crate) struct MapOp<I, O, F>(Arc<F>, PhantomData<fn(I) -> O>);

impl<I, O, F> MapOp<I, O, F> {
    pub(crate) fn new(f: F) -> Self {
        Self(Arc::new(f), PhantomData)
    }
}

impl<I, O, F> DynOp for MapOp<I, O, F>
where
    I: Element,
    O: Element,
    F: Fn(&I) -> Result<O> + Send + Sync + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let f = Arc::clone(&self.0);
        let upstream = into_cursor::<I>(input, "map")?;
        let out: Cursor<O> = Box::new(upstream.map(move |item| item.and_then(|t| f(&t))));
        Ok(from_cursor(out))
    }
}

pub(crate) struct FlatMapOp<I, It, F>(Arc<F>, PhantomData<fn(I) -> It>);

impl<I, It, F> FlatMapOp<I, It, F> {
    pub(crate) fn new(f: F) -> Self {
        Self(Arc::new(f), PhantomData)
    }
}

impl<I, It, F> DynOp for FlatMapOp<I, It, F>
where
    I: Element,
    F: Fn(&I) -> Result<It> + Send + Sync + 'static,
    It: IntoIterator,
    It::Item: Element,
    It::IntoIter: Send + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let f = Arc::clone(&self.0);
        let upstream = into_cursor::<I>(input, "flat_map")?;
        // Each nested sequence is drained before the next outer element is pulled.
        let out: Cursor<It::Item> = Box::new(upstream.flat_map(move |item| -> Cursor<It::Item> {
            match item.and_then(|t| f(&t)) {
                Ok(nested) => Box::new(nested.into_iter().map(Ok)),
                Err(e) => Box::new(std::iter::once(Err(e))),
            }
        }));
        Ok(from_cursor(out))
    }
}

pub(crate) struct PeekOp<T, F>(Arc<F>, PhantomData<fn(T)>);

impl<T, F> PeekOp<T, F> {
    pub(crate) fn new(f: F) -> Self {
        Self(Arc::new(f), PhantomData)
    }
}

impl<T, F> DynOp for PeekOp<T, F>
where
    T: Element,
    F: Fn(&T) + Send + Sync + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let f = Arc::clone(&self.0);
        let upstream = into_cursor::<T>(input, "peek")?;
        let out: Cursor<T> = Box::new(upstream.inspect(move |item| {
            if let Ok(t) = item {
                f(t);
            }
        }));
        Ok(from_cursor(out))
    }
}

/* ---------------- stateful / order-dependent ops ---------------- */

pub(crate) struct SortedOp<T, C>(Arc<C>, PhantomData<fn(T)>);

impl<T, C> SortedOp<T, C> {
    pub(crate) fn new(cmp: C) -> Self {
        Self(Arc::new(cmp), PhantomData)
    }
}

/// Run `sort` over `rows`. A comparator that is not a total order can make the
/// sort panic; that panic is swallowed and `rows` keeps a permutation of its
/// elements in unspecified order. Any other panic resumes.
fn sort_rows<T, S: FnOnce(&mut [T])>(rows: &mut [T], sort: S) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| sort(rows))) {
        if !is_order_violation(payload.as_ref()) {
            panic::resume_unwind(payload);
        }
    }
}

fn is_order_violation(payload: &(dyn Any + Send)) -> bool {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .is_some_and(|msg| msg.contains("total order"))
}

/// Buffers the whole upstream on the first pull, then yields it stably sorted.
struct SortedCursor<T, C> {
    upstream: Option<Cursor<T>>,
    sorted: std::vec::IntoIter<T>,
    cmp: Arc<C>,
}

impl<T, C> Iterator for SortedCursor<T, C>
where
    T: Element,
    C: Fn(&T, &T) -> Ordering,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if let Some(upstream) = self.upstream.take() {
            let mut rows = match upstream.collect::<Result<Vec<T>>>() {
                Ok(rows) => rows,
                Err(e) => return Some(Err(e)),
            };
            let cmp = &self.cmp;
            sort_rows(&mut rows, |rows| rows.sort_by(|a, b| cmp(a, b)));
            self.sorted = rows.into_iter();
        }
        self.sorted.next().map(Ok)
    }
}

impl<T, C> DynOp for SortedOp<T, C>
where
    T: Element,
    C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let out: Cursor<T> = Box::new(SortedCursor {
            upstream: Some(into_cursor::<T>(input, "sorted")?),
            sorted: Vec::new().into_iter(),
            cmp: Arc::clone(&self.0),
        });
        Ok(from_cursor(out))
    }

    fn apply_gathered(&self, rows: Partition, _ops: &dyn CursorOps) -> Result<Partition> {
        let mut rows = into_rows::<T>(rows, "sorted")?;
        let cmp = &self.0;
        sort_rows(&mut rows, |rows| rows.par_sort_by(|a, b| cmp(a, b)));
        Ok(from_cursor(rows_cursor(rows)))
    }
}

pub(crate) struct DistinctOp<T, K, F>(Arc<F>, PhantomData<fn(T) -> K>);

impl<T, K, F> DistinctOp<T, K, F> {
    pub(crate) fn new(key: F) -> Self {
        Self(Arc::new(key), PhantomData)
    }
}

impl<T, K, F> DynOp for DistinctOp<T, K, F>
where
    T: Element,
    K: Element + Eq + Hash,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let key = Arc::clone(&self.0);
        let upstream = into_cursor::<T>(input, "distinct")?;
        let mut seen: HashSet<K> = HashSet::new();
        let out: Cursor<T> = Box::new(upstream.filter(move |item| match item {
            Ok(t) => seen.insert(key(t)),
            Err(_) => true,
        }));
        Ok(from_cursor(out))
    }
}

pub(crate) struct LimitOp<T>(usize, PhantomData<fn(T)>);

impl<T> LimitOp<T> {
    pub(crate) fn new(n: usize) -> Self {
        Self(n, PhantomData)
    }
}

impl<T: Element> DynOp for LimitOp<T> {
    fn apply(&self, input: Partition) -> Result<Partition> {
        // `take` stops pulling upstream as soon as the quota is met.
        let out: Cursor<T> = Box::new(into_cursor::<T>(input, "limit")?.take(self.0));
        Ok(from_cursor(out))
    }
}

pub(crate) struct SkipOp<T>(usize, PhantomData<fn(T)>);

impl<T> SkipOp<T> {
    pub(crate) fn new(n: usize) -> Self {
        Self(n, PhantomData)
    }
}

impl<T: Element> DynOp for SkipOp<T> {
    fn apply(&self, input: Partition) -> Result<Partition> {
        let mut left = self.0;
        let upstream = into_cursor::<T>(input, "skip")?;
        let out: Cursor<T> = Box::new(upstream.filter(move |item| {
            if item.is_ok() && left > 0 {
                left -= 1;
                false
            } else {
                true
            }
        }));
        Ok(from_cursor(out))
    }
}

pub(crate) struct TakeWhileOp<T, P>(Arc<P>, PhantomData<fn(T)>);

impl<T, P> TakeWhileOp<T, P> {
    pub(crate) fn new(pred: P) -> Self {
        Self(Arc::new(pred), PhantomData)
    }
}

impl<T, P> DynOp for TakeWhileOp<T, P>
where
    T: Element,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let pred = Arc::clone(&self.0);
        let upstream = into_cursor::<T>(input, "take_while")?;
        let out: Cursor<T> =
            Box::new(upstream.take_while(move |item| item.as_ref().map_or(true, |t| pred(t))));
        Ok(from_cursor(out))
    }
}

pub(crate) struct DropWhileOp<T, P>(Arc<P>, PhantomData<fn(T)>);

impl<T, P> DropWhileOp<T, P> {
    pub(crate) fn new(pred: P) -> Self {
        Self(Arc::new(pred), PhantomData)
    }
}

impl<T, P> DynOp for DropWhileOp<T, P>
where
    T: Element,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let pred = Arc::clone(&self.0);
        let upstream = into_cursor::<T>(input, "drop_while")?;
        // Once the predicate fails, `skip_while` never consults it again.
        let out: Cursor<T> =
            Box::new(upstream.skip_while(move |item| matches!(item, Ok(t) if pred(t))));
        Ok(from_cursor(out))
    }
}
