//! Element producers at the root of every [`Stream`].
//!
//! A [`Source`] hands out elements one at a time through [`Source::next`] and, when it
//! covers a finite, indexable range, can give away a prefix of what it has left through
//! [`Source::try_split`]. The parallel runner uses splitting to build independent leaf
//! partitions; a source that never splits simply runs sequentially.
//!
//! ### Built-in constructors
//! - [`from_vec`] / [`from_iter`] / [`once`] / [`empty`] -- ordered, finite
//! - [`from_set`] -- unordered, finite
//! - [`range`] / [`range_inclusive`] -- ordered, finite, cheap to split
//! - [`iterate`] -- ordered, infinite; [`iterate_while`] -- ordered, finite
//! - [`generate`] -- unordered, infinite
//!
//! ```
//! use ironstream::*;
//!
//! let evens = range(0, 10).filter(|n: &i64| n % 2 == 0).to_vec().unwrap();
//! assert_eq!(evens, vec![0, 2, 4, 6, 8]);
//! ```

use crate::runner::PullGuard;
use crate::stream::{Element, Stream};
use crate::type_token::{Cursor, Partition};
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Static properties a source declares about the elements it produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceTraits {
    /// Encounter order is meaningful and is preserved by ordered operations.
    pub ordered: bool,
    /// The source eventually runs out of elements.
    pub finite: bool,
}

impl SourceTraits {
    pub const ORDERED_FINITE: Self = Self {
        ordered: true,
        finite: true,
    };
    pub const UNORDERED_FINITE: Self = Self {
        ordered: false,
        finite: true,
    };
    pub const ORDERED_INFINITE: Self = Self {
        ordered: true,
        finite: false,
    };
    pub const UNORDERED_INFINITE: Self = Self {
        ordered: false,
        finite: false,
    };
}

/// A sequential cursor over elements, optionally splittable for parallel execution.
///
/// Implementors only need [`next`](Source::next) and [`traits`](Source::traits).
/// Splitting is opt-in: return `Some(prefix)` from [`try_split`](Source::try_split)
/// where `prefix` yields the elements that come *before* everything left in `self`,
/// and both halves are roughly the same size. Only finite sources may split.
pub trait Source: Send + 'static {
    type Item: Element;

    /// Produce the next element, or `None` once the source is exhausted.
    fn next(&mut self) -> Option<Self::Item>;

    /// Give away a leading sub-range of the remaining elements.
    fn try_split(&mut self) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }

    fn traits(&self) -> SourceTraits;

    /// Number of remaining elements, if cheaply known.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

/// Object-safe view of a [`Source`] with its element type erased.
///
/// The runner splits and opens sources without knowing their element type; the
/// opened cursor is a [`Partition`] that the first stage downcasts.
pub(crate) trait DynSource: Send {
    fn split_prefix(&mut self) -> Option<Box<dyn DynSource>>;
    fn source_traits(&self) -> SourceTraits;
    fn remaining(&self) -> Option<usize>;
    fn open(self: Box<Self>, guard: PullGuard) -> Partition;
}

impl<S: Source> DynSource for S {
    fn split_prefix(&mut self) -> Option<Box<dyn DynSource>> {
        if !self.traits().finite {
            return None;
        }
        self.try_split().map(|prefix| Box::new(prefix) as Box<dyn DynSource>)
    }

    fn source_traits(&self) -> SourceTraits {
        self.traits()
    }

    fn remaining(&self) -> Option<usize> {
        self.len_hint()
    }

    fn open(self: Box<Self>, guard: PullGuard) -> Partition {
        let cursor: Cursor<S::Item> = Box::new(SourceCursor {
            source: *self,
            guard,
        });
        Box::new(cursor)
    }
}

/// Pulls from a source until it is exhausted or the guard reports a stop.
struct SourceCursor<S> {
    source: S,
    guard: PullGuard,
}

impl<S: Source> Iterator for SourceCursor<S> {
    type Item = anyhow::Result<S::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.guard.should_stop() {
            return None;
        }
        let item = self.source.next()?;
        self.guard.record_read();
        Some(Ok(item))
    }
}

/* ===================== VecSource ===================== */

/// In-memory source backed by a deque; splits by halving.
pub struct VecSource<T> {
    items: VecDeque<T>,
    ordered: bool,
}

impl<T> VecSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
            ordered: true,
        }
    }

    pub fn unordered(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
            ordered: false,
        }
    }
}

impl<T: Element> Source for VecSource<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    fn try_split(&mut self) -> Option<Self> {
        if self.items.len() < 2 {
            return None;
        }
        let rest = self.items.split_off(self.items.len() / 2);
        let prefix = std::mem::replace(&mut self.items, rest);
        Some(Self {
            items: prefix,
            ordered: self.ordered,
        })
    }

    fn traits(&self) -> SourceTraits {
        if self.ordered {
            SourceTraits::ORDERED_FINITE
        } else {
            SourceTraits::UNORDERED_FINITE
        }
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/* ===================== RangeSource ===================== */

/// Half-open run of `i64` values, split arithmetically without materializing.
pub struct RangeSource {
    next: i64,
    remaining: u64,
}

impl RangeSource {
    pub fn new(start: i64, end: i64) -> Self {
        let remaining = if end > start {
            (i128::from(end) - i128::from(start)) as u64
        } else {
            0
        };
        Self {
            next: start,
            remaining,
        }
    }

    pub fn inclusive(start: i64, end: i64) -> Self {
        let remaining = if end >= start {
            (i128::from(end) - i128::from(start) + 1).min(i128::from(u64::MAX)) as u64
        } else {
            0
        };
        Self {
            next: start,
            remaining,
        }
    }
}

impl Source for RangeSource {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.next;
        self.next = self.next.wrapping_add(1);
        self.remaining -= 1;
        Some(value)
    }

    fn try_split(&mut self) -> Option<Self> {
        if self.remaining < 2 {
            return None;
        }
        let half = self.remaining / 2;
        let prefix = Self {
            next: self.next,
            remaining: half,
        };
        self.next = self.next.wrapping_add_unsigned(half);
        self.remaining -= half;
        Some(prefix)
    }

    fn traits(&self) -> SourceTraits {
        SourceTraits::ORDERED_FINITE
    }

    fn len_hint(&self) -> Option<usize> {
        usize::try_from(self.remaining).ok()
    }
}

/* ===================== Iterator-backed sources ===================== */

/// Wraps any `Iterator`; never splits.
pub struct IterSource<I> {
    iter: I,
    traits: SourceTraits,
}

impl<I> IterSource<I> {
    pub fn new(iter: I, traits: SourceTraits) -> Self {
        Self { iter, traits }
    }
}

impl<I> Source for IterSource<I>
where
    I: Iterator + Send + 'static,
    I::Item: Element,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        self.iter.next()
    }

    fn traits(&self) -> SourceTraits {
        self.traits
    }

    fn len_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lo, Some(hi)) if lo == hi => Some(hi),
            _ => None,
        }
    }
}

/// `seed, f(seed), f(f(seed)), ...`, optionally stopping at the first value
/// rejected by `has_next`. Each successor is computed only when pulled.
pub struct IterateSource<T, F, P> {
    seed: Option<T>,
    last: Option<T>,
    step: F,
    has_next: Option<P>,
}

impl<T, F, P> Source for IterateSource<T, F, P>
where
    T: Element + Clone,
    F: FnMut(&T) -> T + Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let value = match self.seed.take() {
            Some(seed) => seed,
            None => (self.step)(self.last.as_ref()?),
        };
        if let Some(has_next) = self.has_next.as_mut() {
            if !has_next(&value) {
                self.last = None;
                return None;
            }
        }
        self.last = Some(value.clone());
        Some(value)
    }

    fn traits(&self) -> SourceTraits {
        if self.has_next.is_some() {
            SourceTraits::ORDERED_FINITE
        } else {
            SourceTraits::ORDERED_INFINITE
        }
    }
}

/// Endless unordered values from a supplier.
pub struct GenerateSource<F> {
    supplier: F,
}

impl<T, F> Source for GenerateSource<F>
where
    T: Element,
    F: FnMut() -> T + Send + 'static,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        Some((self.supplier)())
    }

    fn traits(&self) -> SourceTraits {
        SourceTraits::UNORDERED_INFINITE
    }
}

/* ===================== Constructors ===================== */

/// Stream over a custom [`Source`].
pub fn from_source<S: Source>(source: S) -> Stream<S::Item> {
    Stream::from_dyn_source(Box::new(source))
}

/// Ordered stream over an owned vector. Splits for parallel execution.
pub fn from_vec<T: Element>(data: Vec<T>) -> Stream<T> {
    from_source(VecSource::new(data))
}

/// Unordered stream over the members of a set. Splits for parallel execution.
pub fn from_set<T: Element + Eq + Hash>(data: HashSet<T>) -> Stream<T> {
    from_source(VecSource::unordered(data.into_iter().collect()))
}

/// Ordered stream over any iterator, consumed lazily. Never splits, so a
/// parallel stream built on it runs sequentially.
///
/// The stream reports itself infinite when the iterator's `size_hint` is
/// `(usize::MAX, None)`, as `0..`, `repeat` and `cycle` do.
pub fn from_iter<I>(iter: I) -> Stream<I::Item>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Element,
{
    let iter = iter.into_iter();
    let traits = match iter.size_hint() {
        (usize::MAX, None) => SourceTraits::ORDERED_INFINITE,
        _ => SourceTraits::ORDERED_FINITE,
    };
    from_source(IterSource::new(iter, traits))
}

/// `start..end` over `i64`.
pub fn range(start: i64, end: i64) -> Stream<i64> {
    from_source(RangeSource::new(start, end))
}

/// `start..=end` over `i64`.
pub fn range_inclusive(start: i64, end: i64) -> Stream<i64> {
    from_source(RangeSource::inclusive(start, end))
}

/// Infinite ordered stream `seed, f(seed), f(f(seed)), ...`.
///
/// Bound it with [`limit`](Stream::limit) or a short-circuiting terminal.
pub fn iterate<T, F>(seed: T, step: F) -> Stream<T>
where
    T: Element + Clone,
    F: FnMut(&T) -> T + Send + 'static,
{
    from_source(IterateSource {
        seed: Some(seed),
        last: None,
        step,
        has_next: None::<fn(&T) -> bool>,
    })
}

/// Like [`iterate`], but ends at the first value for which `has_next` is false.
pub fn iterate_while<T, P, F>(seed: T, has_next: P, step: F) -> Stream<T>
where
    T: Element + Clone,
    P: FnMut(&T) -> bool + Send + 'static,
    F: FnMut(&T) -> T + Send + 'static,
{
    from_source(IterateSource {
        seed: Some(seed),
        last: None,
        step,
        has_next: Some(has_next),
    })
}

/// Infinite unordered stream of supplier results.
pub fn generate<T, F>(supplier: F) -> Stream<T>
where
    T: Element,
    F: FnMut() -> T + Send + 'static,
{
    from_source(GenerateSource { supplier })
}

pub fn empty<T: Element>() -> Stream<T> {
    from_vec(Vec::new())
}

pub fn once<T: Element>(value: T) -> Stream<T> {
    from_vec(vec![value])
}
