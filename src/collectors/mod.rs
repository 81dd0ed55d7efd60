//! Composable reducers for [`Stream::collect`](crate::Stream::collect).
//!
//! A [`Collector`] is the four-part contract every terminal reduction is built from:
//!
//! - `supplier` -- a fresh, empty accumulator,
//! - `accumulate` -- fold one element into an accumulator,
//! - `combine` -- merge the accumulator of a *later* run of elements into one built from
//!   an earlier run,
//! - `finish` -- turn the accumulator into the result.
//!
//! In parallel mode every leaf partition gets its own accumulator; accumulators are then
//! combined in partition order. `combine` must therefore be associative: folding `x` then
//! `y` into one accumulator must give the same finished result as combining an
//! accumulator holding `x` with one holding `y`.
//!
//! Built-ins, grouped as in the submodules:
//!
//! - containers: [`to_list`], [`to_set`], [`to_map`], [`to_map_merging`]
//! - keyed: [`grouping_by`], [`grouping_by_with`], [`partitioning_by`], [`partitioning_by_with`]
//! - adapters: [`mapping`], [`filtering`], [`flat_mapping`], [`collecting_and_then`], [`teeing`]
//! - reductions: [`counting`], [`joining`], [`joining_with`], [`reducing`], [`min_by`], [`max_by`]
//! - numeric: [`summing`], [`averaging`], [`summarizing_i64`], [`summarizing_f64`]
//!
//! ```
//! use ironstream::*;
//! use ironstream::collectors::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let by_len = from_vec(vec!["a", "bb", "cc", "d"])
//!     .collect(grouping_by_with(|s: &&str| s.len(), counting()))?;
//! assert_eq!(by_len[&1], 2);
//! assert_eq!(by_len[&2], 2);
//! # Ok(())
//! # }
//! ```

mod adapters;
mod basic;
mod keyed;
mod statistical;

pub use adapters::{CollectingAndThen, Filtering, FlatMapping, Mapping, Teeing};
pub use basic::{Counting, Joining, MaxBy, MinBy, Reducing, ToList, ToSet};
pub use keyed::{GroupingBy, PartitioningBy, ToMap};
pub use statistical::{
    Averaging, FloatSummaryStatistics, IntSummaryStatistics, Statistics, Summarizing,
    SummarizingF64, SummarizingI64, Summing,
};

use anyhow::Result;
use std::cmp::Ordering;

/// A mutable reduction over elements of type `T`.
///
/// Implementations must be safe to share between workers: the same collector value is
/// used by every partition, each with its own accumulator.
pub trait Collector<T>: Send + Sync {
    /// Per-partition working state.
    type Acc: Send;
    /// Final result.
    type Output;

    fn supplier(&self) -> Self::Acc;

    fn accumulate(&self, acc: &mut Self::Acc, item: T) -> Result<()>;

    /// Merge `other` into `acc`. `other` was built from elements that come after the
    /// ones in `acc` in encounter order.
    fn combine(&self, acc: &mut Self::Acc, other: Self::Acc) -> Result<()>;

    fn finish(&self, acc: Self::Acc) -> Self::Output;
}

/* ---------------- containers ---------------- */

/// Elements in encounter order.
pub fn to_list() -> ToList {
    ToList
}

/// Distinct elements, unordered.
pub fn to_set() -> ToSet {
    ToSet
}

/// Key/value map; a repeated key fails the terminal with
/// [`StreamError::DuplicateKey`](crate::StreamError::DuplicateKey).
pub fn to_map<T, K, V, KF, VF>(key: KF, value: VF) -> ToMap<KF, VF, fn(V, V) -> V>
where
    KF: Fn(&T) -> K,
    VF: Fn(&T) -> V,
{
    ToMap::new(key, value, None)
}

/// Key/value map; a repeated key resolves to `merge(existing, new)`.
pub fn to_map_merging<T, K, V, KF, VF, M>(key: KF, value: VF, merge: M) -> ToMap<KF, VF, M>
where
    KF: Fn(&T) -> K,
    VF: Fn(&T) -> V,
    M: Fn(V, V) -> V,
{
    ToMap::new(key, value, Some(merge))
}

/* ---------------- keyed ---------------- */

/// Group elements into lists by key.
pub fn grouping_by<T, K, KF>(key: KF) -> GroupingBy<KF, ToList>
where
    KF: Fn(&T) -> K,
{
    GroupingBy::new(key, ToList)
}

/// Group elements by key, reducing each group with `downstream`.
pub fn grouping_by_with<T, K, KF, D>(key: KF, downstream: D) -> GroupingBy<KF, D>
where
    KF: Fn(&T) -> K,
{
    GroupingBy::new(key, downstream)
}

/// Split elements into a `true` list and a `false` list. Both keys are always present.
pub fn partitioning_by<T, P>(pred: P) -> PartitioningBy<P, ToList>
where
    P: Fn(&T) -> bool,
{
    PartitioningBy::new(pred, ToList)
}

pub fn partitioning_by_with<T, P, D>(pred: P, downstream: D) -> PartitioningBy<P, D>
where
    P: Fn(&T) -> bool,
{
    PartitioningBy::new(pred, downstream)
}

/* ---------------- adapters ---------------- */

/// Transform each element before handing it to `downstream`.
pub fn mapping<T, U, F, D>(f: F, downstream: D) -> Mapping<F, D>
where
    F: Fn(&T) -> U,
{
    Mapping::new(f, downstream)
}

/// Only hand elements matching `pred` to `downstream`.
pub fn filtering<T, P, D>(pred: P, downstream: D) -> Filtering<P, D>
where
    P: Fn(&T) -> bool,
{
    Filtering::new(pred, downstream)
}

/// Hand every element of `f(element)` to `downstream`.
pub fn flat_mapping<T, I, F, D>(f: F, downstream: D) -> FlatMapping<F, D>
where
    F: Fn(&T) -> I,
    I: IntoIterator,
{
    FlatMapping::new(f, downstream)
}

/// Post-process the result of `downstream`.
pub fn collecting_and_then<D, F>(downstream: D, finisher: F) -> CollectingAndThen<D, F> {
    CollectingAndThen::new(downstream, finisher)
}

/// Feed every element to both `left` and `right` in one pass, then merge the two
/// results.
pub fn teeing<A, B, F>(left: A, right: B, merger: F) -> Teeing<A, B, F> {
    Teeing::new(left, right, merger)
}

/* ---------------- reductions ---------------- */

pub fn counting() -> Counting {
    Counting
}

/// Concatenate string-like elements with `delimiter` between them.
pub fn joining(delimiter: impl Into<String>) -> Joining {
    Joining::new(delimiter, "", "")
}

/// Like [`joining`], wrapped in `prefix` and `suffix` (also for empty input).
pub fn joining_with(
    delimiter: impl Into<String>,
    prefix: impl Into<String>,
    suffix: impl Into<String>,
) -> Joining {
    Joining::new(delimiter, prefix, suffix)
}

/// Left fold from `identity`; `op` must be associative for parallel use.
pub fn reducing<T, F>(identity: T, op: F) -> Reducing<T, F>
where
    F: Fn(T, T) -> T,
{
    Reducing::new(identity, op)
}

/// Smallest element by `cmp`; the earliest wins a tie.
pub fn min_by<T, C>(cmp: C) -> MinBy<C>
where
    C: Fn(&T, &T) -> Ordering,
{
    MinBy::new(cmp)
}

/// Largest element by `cmp`; the earliest wins a tie.
pub fn max_by<T, C>(cmp: C) -> MaxBy<C>
where
    C: Fn(&T, &T) -> Ordering,
{
    MaxBy::new(cmp)
}

/* ---------------- numeric ---------------- */

/// Sum of `f(element)` in the caller's numeric type; no overflow handling beyond `Add`.
pub fn summing<T, N, F>(f: F) -> Summing<F>
where
    F: Fn(&T) -> N,
{
    Summing::new(f)
}

/// Mean of `f(element)`; 0 for empty input.
pub fn averaging<T, F>(f: F) -> Averaging<F>
where
    F: Fn(&T) -> f64,
{
    Averaging::new(f)
}

/// Count, sum, min, max and average of `f(element)` in one pass.
pub fn summarizing_i64<T, F>(f: F) -> SummarizingI64<F>
where
    F: Fn(&T) -> i64,
{
    Summarizing::new(f)
}

pub fn summarizing_f64<T, F>(f: F) -> SummarizingF64<F>
where
    F: Fn(&T) -> f64,
{
    Summarizing::new(f)
}
