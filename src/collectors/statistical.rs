//! Numeric collectors: `summing`, `averaging`, `summarizing_*`.
//!
//! Float sums (averages and [`FloatSummaryStatistics`]) use Neumaier compensated
//! summation so that merging many partitions does not drift from the sequential result
//! more than rounding allows. [`Summing`] adds in the caller's own numeric type.

use super::Collector;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::mem::take;
use std::ops::Add;

/* ===================== Summing ===================== */

/// Sum of `f(element)`.
///
/// - Accumulator: `N`
/// - Output: `N`
///
/// Requires `N: Add<Output = N> + Default`.
#[derive(Clone, Copy, Debug)]
pub struct Summing<F>(F);

impl<F> Summing<F> {
    pub(crate) fn new(f: F) -> Self {
        Self(f)
    }
}

impl<T, N, F> Collector<T> for Summing<F>
where
    N: Add<Output = N> + Default + Send,
    F: Fn(&T) -> N + Send + Sync,
{
    type Acc = N;
    type Output = N;

    fn supplier(&self) -> N {
        N::default()
    }

    fn accumulate(&self, acc: &mut N, item: T) -> Result<()> {
        *acc = take(acc) + (self.0)(&item);
        Ok(())
    }

    fn combine(&self, acc: &mut N, other: N) -> Result<()> {
        *acc = take(acc) + other;
        Ok(())
    }

    fn finish(&self, acc: N) -> N {
        acc
    }
}

/* ===================== compensated sum ===================== */

/// Neumaier running sum: `sum + compensation` is the corrected total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    fn merge(&mut self, other: Self) {
        self.add(other.sum);
        self.add(other.compensation);
    }

    fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

/* ===================== Averaging ===================== */

/// Arithmetic mean of `f(element)`; `0.0` for empty input.
#[derive(Clone, Copy, Debug)]
pub struct Averaging<F>(F);

impl<F> Averaging<F> {
    pub(crate) fn new(f: F) -> Self {
        Self(f)
    }
}

impl<T, F> Collector<T> for Averaging<F>
where
    F: Fn(&T) -> f64 + Send + Sync,
{
    type Acc = (CompensatedSum, u64);
    type Output = f64;

    fn supplier(&self) -> Self::Acc {
        (CompensatedSum::default(), 0)
    }

    fn accumulate(&self, acc: &mut Self::Acc, item: T) -> Result<()> {
        acc.0.add((self.0)(&item));
        acc.1 += 1;
        Ok(())
    }

    fn combine(&self, acc: &mut Self::Acc, other: Self::Acc) -> Result<()> {
        acc.0.merge(other.0);
        acc.1 += other.1;
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(&self, acc: Self::Acc) -> f64 {
        if acc.1 == 0 {
            0.0
        } else {
            acc.0.value() / acc.1 as f64
        }
    }
}

/* ===================== summary statistics ===================== */

/// Running statistics that [`Summarizing`] folds values into.
pub trait Statistics: Default + Send {
    type Value;

    fn accept(&mut self, value: Self::Value);

    fn combine(&mut self, other: Self);
}

/// Count, sum, min and max of integer values.
///
/// `sum` wraps on overflow. `min`/`max` are `None` until a value is seen and
/// [`average`](Self::average) is 0 for an empty input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntSummaryStatistics {
    pub count: u64,
    pub sum: i64,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl IntSummaryStatistics {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }
}

impl Statistics for IntSummaryStatistics {
    type Value = i64;

    fn accept(&mut self, value: i64) {
        self.count += 1;
        self.sum = self.sum.wrapping_add(value);
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn combine(&mut self, other: Self) {
        self.count += other.count;
        self.sum = self.sum.wrapping_add(other.sum);
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

/// Count, compensated sum, min and max of float values.
///
/// NaN inputs are counted and poison the sum; `min`/`max` ignore them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatSummaryStatistics {
    count: u64,
    sum: CompensatedSum,
    min: Option<f64>,
    max: Option<f64>,
}

impl FloatSummaryStatistics {
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sum.value()
    }

    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.max
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum() / self.count as f64
        }
    }
}

impl Statistics for FloatSummaryStatistics {
    type Value = f64;

    fn accept(&mut self, value: f64) {
        self.count += 1;
        self.sum.add(value);
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn combine(&mut self, other: Self) {
        self.count += other.count;
        self.sum.merge(other.sum);
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

/// Folds `f(element)` into a [`Statistics`] value.
#[derive(Clone, Copy, Debug)]
pub struct Summarizing<F, S> {
    f: F,
    _stats: std::marker::PhantomData<fn() -> S>,
}

pub type SummarizingI64<F> = Summarizing<F, IntSummaryStatistics>;
pub type SummarizingF64<F> = Summarizing<F, FloatSummaryStatistics>;

impl<F, S> Summarizing<F, S> {
    pub(crate) fn new(f: F) -> Self {
        Self {
            f,
            _stats: std::marker::PhantomData,
        }
    }
}

impl<T, F, S> Collector<T> for Summarizing<F, S>
where
    S: Statistics,
    F: Fn(&T) -> S::Value + Send + Sync,
{
    type Acc = S;
    type Output = S;

    fn supplier(&self) -> S {
        S::default()
    }

    fn accumulate(&self, acc: &mut S, item: T) -> Result<()> {
        acc.accept((self.f)(&item));
        Ok(())
    }

    fn combine(&self, acc: &mut S, other: S) -> Result<()> {
        acc.combine(other);
        Ok(())
    }

    fn finish(&self, acc: S) -> S {
        acc
    }
}
