//! Sequential vs. parallel agreement checks.

use crate::runner::Runner;
use anyhow::Result;
use std::fmt::Debug;

/// Partition counts every parallel run is tried with.
pub const EQUIVALENCE_PARTITIONS: [usize; 4] = [1, 2, 3, 8];

/// Run `run` once sequentially and once per entry of [`EQUIVALENCE_PARTITIONS`] in
/// parallel (splitting down to single elements), and assert all results are equal.
///
/// `run` receives the runner to attach with [`Stream::with_runner`](crate::Stream::with_runner)
/// and returns the terminal's result. The sequential result is returned.
///
/// # Errors
///
/// Returns the first error any run produces.
///
/// # Panics
///
/// Panics if a parallel result differs from the sequential one.
pub fn assert_seq_par_equivalent<R, F>(run: F) -> Result<R>
where
    R: Debug + PartialEq,
    F: Fn(Runner) -> Result<R>,
{
    let expected = run(Runner::sequential())?;
    for partitions in EQUIVALENCE_PARTITIONS {
        let runner = Runner::parallel()
            .with_partitions(partitions)
            .with_min_partition_len(1);
        let actual = run(runner)?;
        assert_eq!(
            actual, expected,
            "parallel run with {partitions} partitions disagrees with the sequential run"
        );
    }
    Ok(expected)
}
