//! Terminal operations.
//!
//! A terminal drives the lazy stage chain and produces one result. Internally every
//! terminal is a [`Terminal`]: it evaluates one partition's cursor into a partial
//! result, partials merge left-to-right in encounter order, and the merged partial is
//! finished once. Sequential execution is the one-partition case.
//!
//! Short-circuiting terminals stop pulling as soon as their partition has an answer
//! and, in parallel mode, signal the other partitions to stop early:
//! `find_any` / `any_match` / `all_match` / `none_match` stop everyone, while
//! `find_first` only stops partitions after the one that found a hit.

use crate::collectors::{self, Collector, ToList};
use crate::runner::{ExecMode, Halt, PartitionCtx};
use crate::stream::{Element, Stream};
use crate::type_token::Cursor;
use anyhow::Result;
use std::cmp::Ordering;

/// Partition-wise evaluation contract used by the runner.
pub(crate) trait Terminal<T>: Sync {
    type Partial: Send;
    type Output;

    fn halt(&self) -> Halt {
        Halt::Never
    }

    /// Partial result of a partition that produced nothing.
    fn identity(&self) -> Self::Partial;

    fn evaluate(&self, cursor: Cursor<T>, ctx: &PartitionCtx<'_>) -> Result<Self::Partial>;

    /// `left` covers elements that precede those in `right`.
    fn merge(&self, left: Self::Partial, right: Self::Partial) -> Result<Self::Partial>;

    fn finish(&self, partial: Self::Partial) -> Result<Self::Output>;
}

/* ---------------- implementations ---------------- */

struct CollectWith<C>(C);

impl<T, C: Collector<T>> Terminal<T> for CollectWith<C> {
    type Partial = C::Acc;
    type Output = C::Output;

    fn identity(&self) -> C::Acc {
        self.0.supplier()
    }

    fn evaluate(&self, cursor: Cursor<T>, _ctx: &PartitionCtx<'_>) -> Result<C::Acc> {
        let mut acc = self.0.supplier();
        for item in cursor {
            self.0.accumulate(&mut acc, item?)?;
        }
        Ok(acc)
    }

    fn merge(&self, mut left: C::Acc, right: C::Acc) -> Result<C::Acc> {
        self.0.combine(&mut left, right)?;
        Ok(left)
    }

    fn finish(&self, partial: C::Acc) -> Result<C::Output> {
        Ok(self.0.finish(partial))
    }
}

struct Find(Halt);

impl<T: Send> Terminal<T> for Find {
    type Partial = Option<T>;
    type Output = Option<T>;

    fn halt(&self) -> Halt {
        self.0
    }

    fn identity(&self) -> Option<T> {
        None
    }

    fn evaluate(&self, mut cursor: Cursor<T>, ctx: &PartitionCtx<'_>) -> Result<Option<T>> {
        let hit = cursor.next().transpose()?;
        if hit.is_some() {
            ctx.decide();
        }
        Ok(hit)
    }

    fn merge(&self, left: Option<T>, right: Option<T>) -> Result<Option<T>> {
        Ok(left.or(right))
    }

    fn finish(&self, partial: Option<T>) -> Result<Option<T>> {
        Ok(partial)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quantifier {
    Any,
    All,
    None,
}

/// Searches for a witness: a match for `any`/`none`, a counterexample for `all`.
struct Match<P> {
    pred: P,
    quantifier: Quantifier,
}

impl<T, P> Terminal<T> for Match<P>
where
    P: Fn(&T) -> bool + Send + Sync,
{
    type Partial = bool;
    type Output = bool;

    fn halt(&self) -> Halt {
        Halt::Any
    }

    fn identity(&self) -> bool {
        false
    }

    fn evaluate(&self, cursor: Cursor<T>, ctx: &PartitionCtx<'_>) -> Result<bool> {
        let wanted = self.quantifier != Quantifier::All;
        for item in cursor {
            if (self.pred)(&item?) == wanted {
                ctx.decide();
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn merge(&self, left: bool, right: bool) -> Result<bool> {
        Ok(left || right)
    }

    fn finish(&self, found: bool) -> Result<bool> {
        Ok(match self.quantifier {
            Quantifier::Any => found,
            Quantifier::All | Quantifier::None => !found,
        })
    }
}

struct Count;

impl<T> Terminal<T> for Count {
    type Partial = u64;
    type Output = u64;

    fn identity(&self) -> u64 {
        0
    }

    fn evaluate(&self, mut cursor: Cursor<T>, _ctx: &PartitionCtx<'_>) -> Result<u64> {
        cursor.try_fold(0u64, |n, item| item.map(|_| n + 1))
    }

    fn merge(&self, left: u64, right: u64) -> Result<u64> {
        Ok(left + right)
    }

    fn finish(&self, partial: u64) -> Result<u64> {
        Ok(partial)
    }
}

struct Fold<T, F> {
    identity: T,
    op: F,
}

impl<T, F> Terminal<T> for Fold<T, F>
where
    T: Clone + Send + Sync,
    F: Fn(T, T) -> T + Send + Sync,
{
    type Partial = T;
    type Output = T;

    fn identity(&self) -> T {
        self.identity.clone()
    }

    fn evaluate(&self, mut cursor: Cursor<T>, _ctx: &PartitionCtx<'_>) -> Result<T> {
        cursor.try_fold(self.identity.clone(), |acc, item| Ok((self.op)(acc, item?)))
    }

    fn merge(&self, left: T, right: T) -> Result<T> {
        Ok((self.op)(left, right))
    }

    fn finish(&self, partial: T) -> Result<T> {
        Ok(partial)
    }
}

struct ReduceWith<F>(F);

impl<T, F> Terminal<T> for ReduceWith<F>
where
    T: Send,
    F: Fn(T, T) -> T + Send + Sync,
{
    type Partial = Option<T>;
    type Output = Option<T>;

    fn identity(&self) -> Option<T> {
        None
    }

    fn evaluate(&self, mut cursor: Cursor<T>, _ctx: &PartitionCtx<'_>) -> Result<Option<T>> {
        cursor.try_fold(None, |acc, item| {
            let item = item?;
            Ok(Some(match acc {
                Some(acc) => (self.0)(acc, item),
                None => item,
            }))
        })
    }

    fn merge(&self, left: Option<T>, right: Option<T>) -> Result<Option<T>> {
        Ok(match (left, right) {
            (Some(l), Some(r)) => Some((self.0)(l, r)),
            (l, r) => l.or(r),
        })
    }

    fn finish(&self, partial: Option<T>) -> Result<Option<T>> {
        Ok(partial)
    }
}

struct ForEach<F>(F);

impl<T, F> Terminal<T> for ForEach<F>
where
    F: Fn(T) -> Result<()> + Send + Sync,
{
    type Partial = ();
    type Output = ();

    fn identity(&self) {}

    fn evaluate(&self, cursor: Cursor<T>, _ctx: &PartitionCtx<'_>) -> Result<()> {
        for item in cursor {
            (self.0)(item?)?;
        }
        Ok(())
    }

    fn merge(&self, _left: (), _right: ()) -> Result<()> {
        Ok(())
    }

    fn finish(&self, _partial: ()) -> Result<()> {
        Ok(())
    }
}

/* ---------------- public terminal methods ---------------- */

impl<T: Element> Stream<T> {
    fn run<X: Terminal<T>>(self, terminal: X) -> Result<X::Output> {
        self.runner
            .execute::<T, X>(self.plan, &terminal, &self.telemetry)
    }

    /// Reduce with a [`Collector`].
    pub fn collect<C: Collector<T>>(self, collector: C) -> Result<C::Output> {
        self.run(CollectWith(collector))
    }

    /// All elements in encounter order.
    pub fn to_vec(self) -> Result<Vec<T>> {
        self.collect(ToList)
    }

    /// Sequentially collect to a `Vec`, whatever the stream's mode.
    pub fn collect_seq(self) -> Result<Vec<T>> {
        self.sequential().to_vec()
    }

    /// Collect to a `Vec` in parallel with an explicit worker/partition count.
    pub fn collect_par(self, threads: Option<usize>, partitions: Option<usize>) -> Result<Vec<T>> {
        let mut runner = self.runner;
        runner.mode = ExecMode::Parallel {
            threads,
            partitions,
        };
        self.with_runner(runner).to_vec()
    }

    /// The first element in encounter order, or `None` if the stream is empty.
    pub fn find_first(self) -> Result<Option<T>> {
        self.run(Find(Halt::First))
    }

    /// Some element of the stream. In parallel mode this is whichever partition finds
    /// one first, so repeated runs may return different elements.
    pub fn find_any(self) -> Result<Option<T>> {
        self.run(Find(Halt::Any))
    }

    /// `true` if some element matches; `false` for an empty stream.
    pub fn any_match<P>(self, pred: P) -> Result<bool>
    where
        P: Fn(&T) -> bool + Send + Sync,
    {
        self.run(Match {
            pred,
            quantifier: Quantifier::Any,
        })
    }

    /// `true` if every element matches; `true` for an empty stream.
    pub fn all_match<P>(self, pred: P) -> Result<bool>
    where
        P: Fn(&T) -> bool + Send + Sync,
    {
        self.run(Match {
            pred,
            quantifier: Quantifier::All,
        })
    }

    /// `true` if no element matches; `true` for an empty stream.
    pub fn none_match<P>(self, pred: P) -> Result<bool>
    where
        P: Fn(&T) -> bool + Send + Sync,
    {
        self.run(Match {
            pred,
            quantifier: Quantifier::None,
        })
    }

    pub fn count(self) -> Result<u64> {
        self.run(Count)
    }

    /// Left fold from `identity`.
    ///
    /// In parallel mode every partition folds from its own copy of `identity` and the
    /// partial results are folded with `op` in encounter order, so `identity` must be
    /// a true identity for `op` and `op` must be associative.
    pub fn reduce<F>(self, identity: T, op: F) -> Result<T>
    where
        T: Clone + Sync,
        F: Fn(T, T) -> T + Send + Sync,
    {
        self.run(Fold { identity, op })
    }

    /// Fold without an identity; `None` for an empty stream.
    pub fn reduce_with<F>(self, op: F) -> Result<Option<T>>
    where
        F: Fn(T, T) -> T + Send + Sync,
    {
        self.run(ReduceWith(op))
    }

    /// Smallest element by `cmp`; the earliest one wins a tie.
    pub fn min_by<C>(self, cmp: C) -> Result<Option<T>>
    where
        C: Fn(&T, &T) -> Ordering + Send + Sync,
    {
        self.collect(collectors::min_by(cmp))
    }

    /// Largest element by `cmp`; the earliest one wins a tie.
    pub fn max_by<C>(self, cmp: C) -> Result<Option<T>>
    where
        C: Fn(&T, &T) -> Ordering + Send + Sync,
    {
        self.collect(collectors::max_by(cmp))
    }

    pub fn min(self) -> Result<Option<T>>
    where
        T: Ord,
    {
        self.min_by(|a: &T, b: &T| a.cmp(b))
    }

    pub fn max(self) -> Result<Option<T>>
    where
        T: Ord,
    {
        self.max_by(|a: &T, b: &T| a.cmp(b))
    }

    pub fn min_by_key<K, F>(self, key: F) -> Result<Option<T>>
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync,
    {
        self.min_by(move |a: &T, b: &T| key(a).cmp(&key(b)))
    }

    pub fn max_by_key<K, F>(self, key: F) -> Result<Option<T>>
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync,
    {
        self.max_by(move |a: &T, b: &T| key(a).cmp(&key(b)))
    }

    /// Call `f` on every element. In parallel mode calls happen concurrently and in
    /// no particular order.
    pub fn for_each<F>(self, f: F) -> Result<()>
    where
        F: Fn(T) + Send + Sync,
    {
        self.run(ForEach(move |t| {
            f(t);
            Ok(())
        }))
    }

    /// Call `f` on every element, stopping at the first error, which is returned.
    pub fn try_for_each<F>(self, f: F) -> Result<()>
    where
        F: Fn(T) -> Result<()> + Send + Sync,
    {
        self.run(ForEach(f))
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn quantifiers_on_empty_input() -> anyhow::Result<()> {
        assert!(!empty::<u8>().any_match(|_: &u8| true)?);
        assert!(empty::<u8>().all_match(|_: &u8| false)?);
        assert!(empty::<u8>().none_match(|_: &u8| true)?);
        Ok(())
    }

    #[test]
    fn reduce_with_keeps_encounter_order() -> anyhow::Result<()> {
        let joined = from_vec(vec!["a", "b", "c", "d"])
            .map(|s: &&str| s.to_string())
            .with_runner(Runner::parallel().with_partitions(4))
            .reduce_with(|a, b| a + &b)?;
        assert_eq!(joined.as_deref(), Some("abcd"));
        Ok(())
    }

    #[test]
    fn first_error_wins_over_partial_results() {
        let err = range(0, 10)
            .try_map(|n: &i64| {
                if *n == 3 {
                    anyhow::bail!("bad element {n}")
                }
                Ok(*n)
            })
            .count()
            .unwrap_err();
        assert_eq!(err.to_string(), "bad element 3");
    }
}
