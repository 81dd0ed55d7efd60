//! Key-routed collectors: `to_map`, `grouping_by`, `partitioning_by`.

use super::Collector;
use crate::error::StreamError;
use anyhow::Result;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Debug;
use std::hash::Hash;

/* ===================== ToMap ===================== */

/// One entry per key. Without a merge function a repeated key is an error.
#[derive(Clone, Debug)]
pub struct ToMap<KF, VF, M> {
    key: KF,
    value: VF,
    merge: Option<M>,
}

impl<KF, VF, M> ToMap<KF, VF, M> {
    pub(crate) fn new(key: KF, value: VF, merge: Option<M>) -> Self {
        Self { key, value, merge }
    }

    fn put<K, V>(&self, acc: &mut HashMap<K, V>, k: K, v: V) -> Result<()>
    where
        K: Eq + Hash + Debug,
        M: Fn(V, V) -> V,
    {
        match acc.entry(k) {
            Entry::Vacant(slot) => {
                slot.insert(v);
            }
            Entry::Occupied(slot) => {
                let Some(merge) = &self.merge else {
                    return Err(StreamError::duplicate_key(slot.key()).into());
                };
                let (k, existing) = slot.remove_entry();
                acc.insert(k, merge(existing, v));
            }
        }
        Ok(())
    }
}

impl<T, K, V, KF, VF, M> Collector<T> for ToMap<KF, VF, M>
where
    K: Eq + Hash + Debug + Send,
    V: Send,
    KF: Fn(&T) -> K + Send + Sync,
    VF: Fn(&T) -> V + Send + Sync,
    M: Fn(V, V) -> V + Send + Sync,
{
    type Acc = HashMap<K, V>;
    type Output = HashMap<K, V>;

    fn supplier(&self) -> HashMap<K, V> {
        HashMap::new()
    }

    fn accumulate(&self, acc: &mut HashMap<K, V>, item: T) -> Result<()> {
        let (k, v) = ((self.key)(&item), (self.value)(&item));
        self.put(acc, k, v)
    }

    fn combine(&self, acc: &mut HashMap<K, V>, other: HashMap<K, V>) -> Result<()> {
        for (k, v) in other {
            self.put(acc, k, v)?;
        }
        Ok(())
    }

    fn finish(&self, acc: HashMap<K, V>) -> HashMap<K, V> {
        acc
    }
}

/* ===================== GroupingBy ===================== */

/// Routes every element to exactly one group and reduces each group with a
/// downstream collector (a list by default).
#[derive(Clone, Debug)]
pub struct GroupingBy<KF, D> {
    key: KF,
    downstream: D,
}

impl<KF, D> GroupingBy<KF, D> {
    pub(crate) fn new(key: KF, downstream: D) -> Self {
        Self { key, downstream }
    }
}

impl<T, K, KF, D> Collector<T> for GroupingBy<KF, D>
where
    K: Eq + Hash + Send,
    KF: Fn(&T) -> K + Send + Sync,
    D: Collector<T>,
{
    type Acc = HashMap<K, D::Acc>;
    type Output = HashMap<K, D::Output>;

    fn supplier(&self) -> Self::Acc {
        HashMap::new()
    }

    fn accumulate(&self, acc: &mut Self::Acc, item: T) -> Result<()> {
        let group = acc
            .entry((self.key)(&item))
            .or_insert_with(|| self.downstream.supplier());
        self.downstream.accumulate(group, item)
    }

    fn combine(&self, acc: &mut Self::Acc, other: Self::Acc) -> Result<()> {
        for (k, theirs) in other {
            match acc.entry(k) {
                Entry::Occupied(mut ours) => self.downstream.combine(ours.get_mut(), theirs)?,
                Entry::Vacant(slot) => {
                    slot.insert(theirs);
                }
            }
        }
        Ok(())
    }

    fn finish(&self, acc: Self::Acc) -> Self::Output {
        acc.into_iter()
            .map(|(k, group)| (k, self.downstream.finish(group)))
            .collect()
    }
}

/* ===================== PartitioningBy ===================== */

/// Exactly two groups keyed `true` / `false`, both present even when empty.
#[derive(Clone, Debug)]
pub struct PartitioningBy<P, D> {
    pred: P,
    downstream: D,
}

impl<P, D> PartitioningBy<P, D> {
    pub(crate) fn new(pred: P, downstream: D) -> Self {
        Self { pred, downstream }
    }
}

impl<T, P, D> Collector<T> for PartitioningBy<P, D>
where
    P: Fn(&T) -> bool + Send + Sync,
    D: Collector<T>,
{
    /// `(rejected, accepted)`
    type Acc = (D::Acc, D::Acc);
    type Output = HashMap<bool, D::Output>;

    fn supplier(&self) -> Self::Acc {
        (self.downstream.supplier(), self.downstream.supplier())
    }

    fn accumulate(&self, acc: &mut Self::Acc, item: T) -> Result<()> {
        if (self.pred)(&item) {
            self.downstream.accumulate(&mut acc.1, item)
        } else {
            self.downstream.accumulate(&mut acc.0, item)
        }
    }

    fn combine(&self, acc: &mut Self::Acc, other: Self::Acc) -> Result<()> {
        self.downstream.combine(&mut acc.0, other.0)?;
        self.downstream.combine(&mut acc.1, other.1)
    }

    fn finish(&self, acc: Self::Acc) -> Self::Output {
        HashMap::from([
            (false, self.downstream.finish(acc.0)),
            (true, self.downstream.finish(acc.1)),
        ])
    }
}
