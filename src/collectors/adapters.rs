//! Collectors that wrap other collectors.

use super::Collector;
use anyhow::Result;

/// Feeds `f(element)` to the downstream collector.
#[derive(Clone, Debug)]
pub struct Mapping<F, D> {
    f: F,
    downstream: D,
}

impl<F, D> Mapping<F, D> {
    pub(crate) fn new(f: F, downstream: D) -> Self {
        Self { f, downstream }
    }
}

impl<T, U, F, D> Collector<T> for Mapping<F, D>
where
    F: Fn(&T) -> U + Send + Sync,
    D: Collector<U>,
{
    type Acc = D::Acc;
    type Output = D::Output;

    fn supplier(&self) -> D::Acc {
        self.downstream.supplier()
    }

    fn accumulate(&self, acc: &mut D::Acc, item: T) -> Result<()> {
        self.downstream.accumulate(acc, (self.f)(&item))
    }

    fn combine(&self, acc: &mut D::Acc, other: D::Acc) -> Result<()> {
        self.downstream.combine(acc, other)
    }

    fn finish(&self, acc: D::Acc) -> D::Output {
        self.downstream.finish(acc)
    }
}

/// Drops elements rejected by the predicate before they reach the downstream.
#[derive(Clone, Debug)]
pub struct Filtering<P, D> {
    pred: P,
    downstream: D,
}

impl<P, D> Filtering<P, D> {
    pub(crate) fn new(pred: P, downstream: D) -> Self {
        Self { pred, downstream }
    }
}

impl<T, P, D> Collector<T> for Filtering<P, D>
where
    P: Fn(&T) -> bool + Send + Sync,
    D: Collector<T>,
{
    type Acc = D::Acc;
    type Output = D::Output;

    fn supplier(&self) -> D::Acc {
        self.downstream.supplier()
    }

    fn accumulate(&self, acc: &mut D::Acc, item: T) -> Result<()> {
        if (self.pred)(&item) {
            self.downstream.accumulate(acc, item)?;
        }
        Ok(())
    }

    fn combine(&self, acc: &mut D::Acc, other: D::Acc) -> Result<()> {
        self.downstream.combine(acc, other)
    }

    fn finish(&self, acc: D::Acc) -> D::Output {
        self.downstream.finish(acc)
    }
}

/// Feeds every item of `f(element)` to the downstream, in order.
#[derive(Clone, Debug)]
pub struct FlatMapping<F, D> {
    f: F,
    downstream: D,
}

impl<F, D> FlatMapping<F, D> {
    pub(crate) fn new(f: F, downstream: D) -> Self {
        Self { f, downstream }
    }
}

impl<T, I, F, D> Collector<T> for FlatMapping<F, D>
where
    F: Fn(&T) -> I + Send + Sync,
    I: IntoIterator,
    D: Collector<I::Item>,
{
    type Acc = D::Acc;
    type Output = D::Output;

    fn supplier(&self) -> D::Acc {
        self.downstream.supplier()
    }

    fn accumulate(&self, acc: &mut D::Acc, item: T) -> Result<()> {
        (self.f)(&item)
            .into_iter()
            .try_for_each(|nested| self.downstream.accumulate(acc, nested))
    }

    fn combine(&self, acc: &mut D::Acc, other: D::Acc) -> Result<()> {
        self.downstream.combine(acc, other)
    }

    fn finish(&self, acc: D::Acc) -> D::Output {
        self.downstream.finish(acc)
    }
}

/// Applies a finishing function to the downstream's result.
#[derive(Clone, Debug)]
pub struct CollectingAndThen<D, F> {
    downstream: D,
    finisher: F,
}

impl<D, F> CollectingAndThen<D, F> {
    pub(crate) fn new(downstream: D, finisher: F) -> Self {
        Self {
            downstream,
            finisher,
        }
    }
}

impl<T, R, D, F> Collector<T> for CollectingAndThen<D, F>
where
    D: Collector<T>,
    F: Fn(D::Output) -> R + Send + Sync,
{
    type Acc = D::Acc;
    type Output = R;

    fn supplier(&self) -> D::Acc {
        self.downstream.supplier()
    }

    fn accumulate(&self, acc: &mut D::Acc, item: T) -> Result<()> {
        self.downstream.accumulate(acc, item)
    }

    fn combine(&self, acc: &mut D::Acc, other: D::Acc) -> Result<()> {
        self.downstream.combine(acc, other)
    }

    fn finish(&self, acc: D::Acc) -> R {
        (self.finisher)(self.downstream.finish(acc))
    }
}

/// Two collectors driven by one pass; each element is cloned into the left one.
#[derive(Clone, Debug)]
pub struct Teeing<A, B, F> {
    left: A,
    right: B,
    merger: F,
}

impl<A, B, F> Teeing<A, B, F> {
    pub(crate) fn new(left: A, right: B, merger: F) -> Self {
        Self {
            left,
            right,
            merger,
        }
    }
}

impl<T, R, A, B, F> Collector<T> for Teeing<A, B, F>
where
    T: Clone,
    A: Collector<T>,
    B: Collector<T>,
    F: Fn(A::Output, B::Output) -> R + Send + Sync,
{
    type Acc = (A::Acc, B::Acc);
    type Output = R;

    fn supplier(&self) -> Self::Acc {
        (self.left.supplier(), self.right.supplier())
    }

    fn accumulate(&self, acc: &mut Self::Acc, item: T) -> Result<()> {
        self.left.accumulate(&mut acc.0, item.clone())?;
        self.right.accumulate(&mut acc.1, item)
    }

    fn combine(&self, acc: &mut Self::Acc, other: Self::Acc) -> Result<()> {
        self.left.combine(&mut acc.0, other.0)?;
        self.right.combine(&mut acc.1, other.1)
    }

    fn finish(&self, acc: Self::Acc) -> R {
        (self.merger)(self.left.finish(acc.0), self.right.finish(acc.1))
    }
}
