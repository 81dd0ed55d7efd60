//! Testing utilities for stream pipelines.
//!
//! - **Assertions**: compare collected output with expected results, in or out of order.
//! - **Equivalence**: run one pipeline sequentially and under several parallel splits and
//!   check that every run agrees.
//! - **Fixtures**: small domain datasets (priced items, orders).
//!
//! # Quick Start
//!
//! ```
//! use ironstream::*;
//! use ironstream::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let doubled = assert_seq_par_equivalent(|runner| {
//!     range(1, 4).with_runner(runner).map(|x: &i64| x * 2).to_vec()
//! })?;
//! assert_collections_equal(&doubled, &[2, 4, 6]);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod equivalence;
pub mod fixtures;

pub use assertions::*;
pub use equivalence::*;
pub use fixtures::*;
