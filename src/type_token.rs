//! Type tags and type-erased cursor helpers.
//!
//! This module provides:
//! - [`Cursor`]: the lazy pull handle every stage consumes and produces.
//! - [`Partition`]: a type-erased box carried between stages so a stage
//!   chain can change element type without the runner knowing any of the types.
//! - [`TypeTag`]: a lightweight runtime type identifier used for diagnostics.
//! - `CursorOps`: the few typed operations the parallel runner needs at a barrier
//!   (gather or lazily chain partitions in order, reopen rows as a cursor, re-materialize for splitting).
//!
//! A partition holds either a `Cursor<T>` or, between a gather and a barrier stage, a
//! `Vec<T>`. Downcasts that do not match report [`StreamError::TypeMismatch`].

use crate::error::StreamError;
use crate::source::{DynSource, VecSource};
use crate::stream::Element;
use anyhow::Result;
use rayon::prelude::*;
use std::any::{Any, TypeId, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

/// Lazy, fallible pull cursor. An `Err` item aborts whatever terminal pulls it.
pub type Cursor<T> = Box<dyn Iterator<Item = Result<T>> + Send>;

/// A cursor (or gathered rows) with its element type erased.
pub type Partition = Box<dyn Any + Send>;

/// A lightweight runtime type tag for debugging and assertions.
///
/// ```
/// use ironstream::type_token::TypeTag;
/// let tag = TypeTag::of::<u32>();
/// assert_eq!(tag.name, "u32");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag {
    /// Stable Rust type identifier.
    pub id: TypeId,
    /// Human-readable type name (best-effort).
    pub name: &'static str,
}

impl TypeTag {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

pub(crate) fn into_cursor<T: Element>(part: Partition, stage: &'static str) -> Result<Cursor<T>> {
    part.downcast::<Cursor<T>>()
        .map(|c| *c)
        .map_err(|_| StreamError::type_mismatch::<Cursor<T>>(stage).into())
}

pub(crate) fn from_cursor<T: Element>(cursor: Cursor<T>) -> Partition {
    Box::new(cursor)
}

pub(crate) fn into_rows<T: Element>(part: Partition, stage: &'static str) -> Result<Vec<T>> {
    part.downcast::<Vec<T>>()
        .map(|rows| *rows)
        .map_err(|_| StreamError::type_mismatch::<Vec<T>>(stage).into())
}

pub(crate) fn rows_cursor<T: Element>(rows: Vec<T>) -> Cursor<T> {
    Box::new(rows.into_iter().map(Ok))
}

/// Typed helpers the runner calls through a trait object at parallel barriers.
pub(crate) trait CursorOps: Send + Sync {
    fn tag(&self) -> TypeTag;

    /// Drain every cursor partition (in parallel) and concatenate the rows in
    /// partition order. Returns a partition holding `Vec<T>`.
    fn gather(&self, parts: Vec<Partition>) -> Result<Partition>;

    /// Chain cursor partitions lazily in partition order. Nothing is pulled until
    /// the returned cursor is.
    fn chain(&self, parts: Vec<Partition>) -> Result<Partition>;

    /// Reopen gathered `Vec<T>` rows as a cursor partition.
    fn rows_into_cursor(&self, rows: Partition) -> Result<Partition>;

    /// Drain a cursor partition into a splittable in-memory source.
    fn materialize(&self, cursor: Partition, ordered: bool) -> Result<Box<dyn DynSource>>;
}

struct CursorOpsImpl<T>(PhantomData<fn() -> T>);

impl<T: Element> CursorOps for CursorOpsImpl<T> {
    fn tag(&self) -> TypeTag {
        TypeTag::of::<T>()
    }

    fn gather(&self, parts: Vec<Partition>) -> Result<Partition> {
        let chunks = parts
            .into_par_iter()
            .map(|part| into_cursor::<T>(part, "gather")?.collect::<Result<Vec<T>>>())
            .collect::<Result<Vec<Vec<T>>>>()?;
        let rows: Vec<T> = chunks.into_iter().flatten().collect();
        Ok(Box::new(rows))
    }

    fn chain(&self, parts: Vec<Partition>) -> Result<Partition> {
        let cursors = parts
            .into_iter()
            .map(|part| into_cursor::<T>(part, "chain"))
            .collect::<Result<Vec<Cursor<T>>>>()?;
        let chained: Cursor<T> = Box::new(cursors.into_iter().flatten());
        Ok(from_cursor(chained))
    }

    fn rows_into_cursor(&self, rows: Partition) -> Result<Partition> {
        let rows = into_rows::<T>(rows, "gather")?;
        Ok(from_cursor(rows_cursor(rows)))
    }

    fn materialize(&self, cursor: Partition, ordered: bool) -> Result<Box<dyn DynSource>> {
        let rows = into_cursor::<T>(cursor, "materialize")?.collect::<Result<Vec<T>>>()?;
        Ok(if ordered {
            Box::new(VecSource::new(rows))
        } else {
            Box::new(VecSource::unordered(rows))
        })
    }
}

pub(crate) fn cursor_ops_for<T: Element>() -> Arc<dyn CursorOps> {
    Arc::new(CursorOpsImpl::<T>(PhantomData))
}
