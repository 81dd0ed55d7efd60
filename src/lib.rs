//! # Ironstream
//!
//! A **lazy sequence pipeline** library for Rust. Build a chain of stages over a source,
//! then run one terminal operation over it, either sequentially or split across a
//! worker pool. Parallel runs keep the ordering guarantees of sequential ones.
//!
//! ## Key Features
//!
//! - **Lazy pipelines** - nothing is read from the source until a terminal runs
//! - **Stateless stages** - filter, map, flat_map, peek
//! - **Stateful stages** - sorted, distinct, limit, skip, take_while, drop_while
//! - **Short-circuiting terminals** - find_first, find_any, any/all/none_match
//! - **Composable collectors** - to_map with merge, grouping_by, partitioning_by,
//!   mapping, teeing, joining, summarizing, and more
//! - **Parallel execution** - recursive source splitting, ordered associative combine,
//!   and cooperative cancellation
//! - **Fallible closures** - `try_*` variants abort the terminal with the first error
//!
//! ## Quick Start
//!
//! ```
//! use ironstream::*;
//! use ironstream::collectors::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let words = from_vec(vec!["apple", "avocado", "banana", "blueberry", "cherry"]);
//!
//! let by_initial = words
//!     .filter(|w: &&str| w.len() > 5)
//!     .parallel()
//!     .collect(grouping_by_with(
//!         |w: &&str| w.chars().next().unwrap_or(' '),
//!         counting(),
//!     ))?;
//!
//! assert_eq!(by_initial[&'a'], 1);
//! assert_eq!(by_initial[&'b'], 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Sources
//!
//! A [`Source`] yields elements one at a time and may split off a prefix of its
//! remaining elements for parallel work. Built-in sources cover vectors, sets, integer
//! ranges, arbitrary iterators, and unbounded `iterate`/`generate` sequences.
//!
//! ### Streams
//!
//! A [`Stream<T>`] is single-use: every stage and every terminal consumes it. Closures
//! passed to stages receive `&T`.
//!
//! ### Terminals and Collectors
//!
//! Terminal methods (`collect`, `count`, `reduce`, `find_first`, ...) drive the pipeline.
//! [`Collector`]s describe mutable reductions with a supplier, an accumulator, an
//! associative combine, and a finisher; the [`collectors`] module provides the
//! standard set and combinators to nest them.
//!
//! ### Execution Modes
//!
//! - **Sequential** (default) - a single pull loop on the calling thread
//! - **Parallel** - call [`parallel`](Stream::parallel) or attach a [`Runner`]
//!
//! Parallel runs of ordered streams produce the same results as sequential runs.
//! Unordered sources, `find_any`, and `for_each` may observe any order.
//!
//! ## Feature Flags
//!
//! - `metrics` (default) - counters for elements read, partitions, and short-circuits
//!
//! ## Module Overview
//!
//! - [`source`] - sources and stream constructors
//! - [`stream`] - the pipeline handle and its stages
//! - [`terminal`] - terminal operations
//! - [`collectors`] - the collector protocol and built-in collectors
//! - [`runner`] - sequential and parallel executors
//! - [`type_token`] - type-erased cursors passed between stages
//! - [`testing`] - assertions and fixtures for pipeline tests

pub mod collectors;
mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod runner;
pub mod source;
mod stage;
pub mod stream;
pub mod terminal;
pub mod testing;
pub mod type_token;

pub use collectors::Collector;
pub use error::StreamError;
pub use runner::{ExecMode, Runner};
pub use source::*;
pub use stream::{Element, Stream};
