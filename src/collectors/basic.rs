//! Containers and simple reductions: list, set, count, join, reduce, min/max.

use super::Collector;
use anyhow::Result;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::Hash;
use std::mem;

/* ===================== ToList ===================== */

/// Elements in encounter order.
///
/// - Accumulator: `Vec<T>`
/// - Output: `Vec<T>`
#[derive(Clone, Copy, Debug, Default)]
pub struct ToList;

impl<T: Send> Collector<T> for ToList {
    type Acc = Vec<T>;
    type Output = Vec<T>;

    fn supplier(&self) -> Vec<T> {
        Vec::new()
    }

    fn accumulate(&self, acc: &mut Vec<T>, item: T) -> Result<()> {
        acc.push(item);
        Ok(())
    }

    fn combine(&self, acc: &mut Vec<T>, mut other: Vec<T>) -> Result<()> {
        acc.append(&mut other);
        Ok(())
    }

    fn finish(&self, acc: Vec<T>) -> Vec<T> {
        acc
    }
}

/* ===================== ToSet ===================== */

#[derive(Clone, Copy, Debug, Default)]
pub struct ToSet;

impl<T: Send + Eq + Hash> Collector<T> for ToSet {
    type Acc = HashSet<T>;
    type Output = HashSet<T>;

    fn supplier(&self) -> HashSet<T> {
        HashSet::new()
    }

    fn accumulate(&self, acc: &mut HashSet<T>, item: T) -> Result<()> {
        acc.insert(item);
        Ok(())
    }

    fn combine(&self, acc: &mut HashSet<T>, other: HashSet<T>) -> Result<()> {
        if acc.len() < other.len() {
            let smaller = mem::replace(acc, other);
            acc.extend(smaller);
        } else {
            acc.extend(other);
        }
        Ok(())
    }

    fn finish(&self, acc: HashSet<T>) -> HashSet<T> {
        acc
    }
}

/* ===================== Counting ===================== */

#[derive(Clone, Copy, Debug, Default)]
pub struct Counting;

impl<T> Collector<T> for Counting {
    type Acc = u64;
    type Output = u64;

    fn supplier(&self) -> u64 {
        0
    }

    fn accumulate(&self, acc: &mut u64, _item: T) -> Result<()> {
        *acc += 1;
        Ok(())
    }

    fn combine(&self, acc: &mut u64, other: u64) -> Result<()> {
        *acc += other;
        Ok(())
    }

    fn finish(&self, acc: u64) -> u64 {
        acc
    }
}

/* ===================== Joining ===================== */

/// `prefix + e1 + delimiter + e2 + ... + suffix`.
///
/// The accumulator is `None` until the first element so that combining with an empty
/// partition never inserts a stray delimiter.
#[derive(Clone, Debug)]
pub struct Joining {
    delimiter: String,
    prefix: String,
    suffix: String,
}

impl Joining {
    pub(crate) fn new(
        delimiter: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            delimiter: delimiter.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    fn append(&self, acc: &mut Option<String>, piece: &str) {
        match acc {
            Some(joined) => {
                joined.push_str(&self.delimiter);
                joined.push_str(piece);
            }
            None => *acc = Some(piece.to_owned()),
        }
    }
}

impl<T: AsRef<str>> Collector<T> for Joining {
    type Acc = Option<String>;
    type Output = String;

    fn supplier(&self) -> Option<String> {
        None
    }

    fn accumulate(&self, acc: &mut Option<String>, item: T) -> Result<()> {
        self.append(acc, item.as_ref());
        Ok(())
    }

    fn combine(&self, acc: &mut Option<String>, other: Option<String>) -> Result<()> {
        if let Some(other) = other {
            self.append(acc, &other);
        }
        Ok(())
    }

    fn finish(&self, acc: Option<String>) -> String {
        let body = acc.unwrap_or_default();
        let mut out = String::with_capacity(self.prefix.len() + body.len() + self.suffix.len());
        out.push_str(&self.prefix);
        out.push_str(&body);
        out.push_str(&self.suffix);
        out
    }
}

/* ===================== Reducing ===================== */

/// Fold from an identity value with a binary operator.
#[derive(Clone, Debug)]
pub struct Reducing<T, F> {
    identity: T,
    op: F,
}

impl<T, F> Reducing<T, F> {
    pub(crate) fn new(identity: T, op: F) -> Self {
        Self { identity, op }
    }
}

impl<T, F> Collector<T> for Reducing<T, F>
where
    T: Clone + Send + Sync,
    F: Fn(T, T) -> T + Send + Sync,
{
    type Acc = T;
    type Output = T;

    fn supplier(&self) -> T {
        self.identity.clone()
    }

    fn accumulate(&self, acc: &mut T, item: T) -> Result<()> {
        let current = mem::replace(acc, self.identity.clone());
        *acc = (self.op)(current, item);
        Ok(())
    }

    fn combine(&self, acc: &mut T, other: T) -> Result<()> {
        self.accumulate(acc, other)
    }

    fn finish(&self, acc: T) -> T {
        acc
    }
}

/* ===================== MinBy / MaxBy ===================== */

/// Smallest element by comparator; `None` for empty input.
#[derive(Clone, Copy, Debug)]
pub struct MinBy<C>(C);

impl<C> MinBy<C> {
    pub(crate) fn new(cmp: C) -> Self {
        Self(cmp)
    }
}

/// Largest element by comparator; `None` for empty input.
#[derive(Clone, Copy, Debug)]
pub struct MaxBy<C>(C);

impl<C> MaxBy<C> {
    pub(crate) fn new(cmp: C) -> Self {
        Self(cmp)
    }
}

/// Replace `acc` with `candidate` only when `cmp(candidate, current)` is `wins`.
fn keep_extreme<T, C>(acc: &mut Option<T>, candidate: T, cmp: &C, wins: Ordering)
where
    C: Fn(&T, &T) -> Ordering,
{
    match acc {
        Some(current) => {
            if cmp(&candidate, current) == wins {
                *current = candidate;
            }
        }
        None => *acc = Some(candidate),
    }
}

impl<T, C> Collector<T> for MinBy<C>
where
    T: Send,
    C: Fn(&T, &T) -> Ordering + Send + Sync,
{
    type Acc = Option<T>;
    type Output = Option<T>;

    fn supplier(&self) -> Option<T> {
        None
    }

    fn accumulate(&self, acc: &mut Option<T>, item: T) -> Result<()> {
        keep_extreme(acc, item, &self.0, Ordering::Less);
        Ok(())
    }

    fn combine(&self, acc: &mut Option<T>, other: Option<T>) -> Result<()> {
        if let Some(b) = other {
            keep_extreme(acc, b, &self.0, Ordering::Less);
        }
        Ok(())
    }

    fn finish(&self, acc: Option<T>) -> Option<T> {
        acc
    }
}

impl<T, C> Collector<T> for MaxBy<C>
where
    T: Send,
    C: Fn(&T, &T) -> Ordering + Send + Sync,
{
    type Acc = Option<T>;
    type Output = Option<T>;

    fn supplier(&self) -> Option<T> {
        None
    }

    fn accumulate(&self, acc: &mut Option<T>, item: T) -> Result<()> {
        keep_extreme(acc, item, &self.0, Ordering::Greater);
        Ok(())
    }

    fn combine(&self, acc: &mut Option<T>, other: Option<T>) -> Result<()> {
        if let Some(b) = other {
            keep_extreme(acc, b, &self.0, Ordering::Greater);
        }
        Ok(())
    }

    fn finish(&self, acc: Option<T>) -> Option<T> {
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold<T, C: Collector<T>>(c: &C, items: Vec<T>) -> Result<C::Acc> {
        let mut acc = c.supplier();
        for item in items {
            c.accumulate(&mut acc, item)?;
        }
        Ok(acc)
    }

    #[test]
    fn joining_skips_delimiter_for_empty_partitions() -> Result<()> {
        let j = Joining::new("-", "<", ">");
        let mut left = fold(&j, vec!["a", "b"])?;
        Collector::<&str>::combine(&j, &mut left, None)?;
        let right = fold(&j, vec!["c"])?;
        Collector::<&str>::combine(&j, &mut left, right)?;
        assert_eq!(Collector::<&str>::finish(&j, left), "<a-b-c>");
        assert_eq!(Collector::<&str>::finish(&j, None), "<>");
        Ok(())
    }

    #[test]
    fn min_and_max_keep_the_earliest_tie() -> Result<()> {
        let by_first = |a: &(u8, char), b: &(u8, char)| a.0.cmp(&b.0);
        let items = vec![(2, 'a'), (1, 'b'), (3, 'c'), (1, 'd'), (3, 'e')];

        let min = MinBy::new(by_first);
        assert_eq!(fold(&min, items.clone())?, Some((1, 'b')));

        let max = MaxBy::new(by_first);
        let mut left = fold(&max, items[..3].to_vec())?;
        Collector::<(u8, char)>::combine(&max, &mut left, fold(&max, items[3..].to_vec())?)?;
        assert_eq!(left, Some((3, 'c')));
        Ok(())
    }

    #[test]
    fn reducing_combines_like_accumulate() -> Result<()> {
        let concat = Reducing::new(String::new(), |a: String, b: String| a + &b);
        let mut left = fold(&concat, vec!["x".to_string(), "y".to_string()])?;
        concat.combine(&mut left, fold(&concat, vec!["z".to_string()])?)?;
        assert_eq!(left, "xyz");
        Ok(())
    }
}
