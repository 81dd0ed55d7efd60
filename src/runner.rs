//! Execution of a planned pipeline.
//!
//! A [`Runner`] picks between two executors:
//!
//! - **Sequential**: the source is opened once and every stage is pulled lazily
//!   into the terminal on the calling thread.
//! - **Parallel**: the source is split recursively with `split_prefix` down to
//!   `next_power_of_two(partitions)` leaves. Splitting stops early for sources
//!   reporting fewer than `2 * min_partition_len` elements and never happens for
//!   infinite sources. Leading stateless stages are fused per leaf and run on the
//!   rayon pool (a dedicated pool when `threads` is set).
//!
//! A stateful stage is a barrier. `sorted`, `distinct`, `skip` and `drop_while` gather
//! every leaf in encounter order, run once over the rows and re-split the result.
//! `limit` and `take_while` chain the leaves lazily and pull only the prefix they keep.
//!
//! Per-leaf terminal partials are merged as a balanced tree, left before right, so
//! ordered terminals see partition order. Short-circuiting terminals signal through a
//! shared `StopSignal`: with `Halt::Any` every leaf stops pulling, with `Halt::First`
//! only leaves after the deciding one do. A failed leaf stops all the others.

use crate::error::StreamError;
use crate::source::DynSource;
use crate::stage::{Plan, StageNode, fuse};
use crate::stream::Element;
use crate::terminal::Terminal;
use crate::type_token::into_cursor;
use anyhow::Result;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[cfg(feature = "metrics")]
use crate::metrics::MetricsCollector;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Sequential,
    Parallel {
        threads: Option<usize>,
        partitions: Option<usize>,
    },
}

/// Execution configuration shared by every terminal of a stream.
///
/// - `default_partitions`: leaf partition target when `ExecMode::Parallel` leaves it unset.
/// - `min_partition_len`: a source reporting fewer than `2 * min_partition_len`
///   remaining elements is not split further.
#[derive(Clone, Copy, Debug)]
pub struct Runner {
    pub mode: ExecMode,
    pub default_partitions: usize,
    pub min_partition_len: usize,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            mode: ExecMode::Parallel {
                threads: None,
                partitions: None,
            },
            default_partitions: 2 * num_cpus::get().max(2),
            min_partition_len: 1,
        }
    }
}

impl Runner {
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            mode: ExecMode::Sequential,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn parallel() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.mode = match self.mode {
            ExecMode::Parallel { partitions, .. } => ExecMode::Parallel {
                threads: Some(threads),
                partitions,
            },
            ExecMode::Sequential => ExecMode::Parallel {
                threads: Some(threads),
                partitions: None,
            },
        };
        self
    }

    #[must_use]
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.mode = match self.mode {
            ExecMode::Parallel { threads, .. } => ExecMode::Parallel {
                threads,
                partitions: Some(partitions),
            },
            ExecMode::Sequential => ExecMode::Parallel {
                threads: None,
                partitions: Some(partitions),
            },
        };
        self
    }

    #[must_use]
    pub fn with_min_partition_len(mut self, len: usize) -> Self {
        self.min_partition_len = len;
        self
    }

    pub(crate) fn execute<T: Element, X: Terminal<T>>(
        &self,
        plan: Plan,
        terminal: &X,
        telemetry: &Telemetry,
    ) -> Result<X::Output> {
        telemetry.start();
        let partial = match self.mode {
            ExecMode::Sequential => exec_seq(plan, terminal, telemetry),
            ExecMode::Parallel {
                threads,
                partitions,
            } => {
                let target = partitions.unwrap_or(self.default_partitions).max(1);
                let min_len = self.min_partition_len.max(1);
                match threads {
                    Some(n) => rayon::ThreadPoolBuilder::new()
                        .num_threads(n)
                        .build()
                        .map_err(StreamError::from)?
                        .install(|| exec_par(plan, terminal, target, min_len, telemetry)),
                    None => exec_par(plan, terminal, target, min_len, telemetry),
                }
            }
        };
        telemetry.finish();
        terminal.finish(partial?)
    }
}

/* ---------------- cancellation ---------------- */

/// How a terminal's decision in one partition affects the others.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Halt {
    /// Every partition runs to completion.
    Never,
    /// One decision settles the result; every partition may stop.
    Any,
    /// A decision at partition `i` settles everything after `i`.
    First,
}

pub(crate) struct StopSignal {
    halt: Halt,
    any: AtomicBool,
    first: AtomicUsize,
}

impl StopSignal {
    pub(crate) fn new(halt: Halt) -> Self {
        Self {
            halt,
            any: AtomicBool::new(false),
            first: AtomicUsize::new(usize::MAX),
        }
    }

    fn decide(&self, index: usize) {
        match self.halt {
            Halt::Never => {}
            Halt::Any => self.any.store(true, Ordering::Release),
            Halt::First => {
                self.first.fetch_min(index, Ordering::AcqRel);
            }
        }
    }

    /// A failed partition makes every other partition's work pointless.
    fn abort(&self) {
        self.any.store(true, Ordering::Release);
    }

    fn should_stop(&self, index: usize) -> bool {
        self.any.load(Ordering::Acquire) || self.first.load(Ordering::Acquire) < index
    }

    fn tripped(&self) -> bool {
        self.any.load(Ordering::Acquire) || self.first.load(Ordering::Acquire) != usize::MAX
    }
}

/// What a terminal sees of the partition it is evaluating.
pub(crate) struct PartitionCtx<'a> {
    index: usize,
    stop: &'a StopSignal,
}

impl PartitionCtx<'_> {
    /// Record that this partition has settled the result.
    pub(crate) fn decide(&self) {
        self.stop.decide(self.index);
    }
}

/// Carried by every leaf source cursor: answers "stop pulling?" and counts reads.
pub(crate) struct PullGuard {
    stop: Option<Arc<StopSignal>>,
    index: usize,
    reads: u64,
    telemetry: Telemetry,
}

impl PullGuard {
    pub(crate) fn detached(telemetry: Telemetry) -> Self {
        Self {
            stop: None,
            index: 0,
            reads: 0,
            telemetry,
        }
    }

    fn watching(stop: Arc<StopSignal>, index: usize, telemetry: Telemetry) -> Self {
        Self {
            stop: Some(stop),
            index,
            reads: 0,
            telemetry,
        }
    }

    pub(crate) fn should_stop(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|stop| stop.should_stop(self.index))
    }

    pub(crate) fn record_read(&mut self) {
        self.reads += 1;
    }
}

impl Drop for PullGuard {
    fn drop(&mut self) {
        if self.reads > 0 {
            self.telemetry.add("elements_read", self.reads);
        }
    }
}

/* ---------------- telemetry ---------------- */

/// Counter sink; a no-op unless a [`MetricsCollector`] is attached.
#[derive(Clone, Default)]
pub(crate) struct Telemetry {
    #[cfg(feature = "metrics")]
    metrics: Option<MetricsCollector>,
}

impl Telemetry {
    #[cfg(feature = "metrics")]
    pub(crate) fn with_metrics(metrics: MetricsCollector) -> Self {
        Self {
            metrics: Some(metrics),
        }
    }

    pub(crate) fn add(&self, name: &str, n: u64) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.increment_counter(name, n);
        }
        #[cfg(not(feature = "metrics"))]
        let _ = (name, n);
    }

    fn start(&self) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_start();
        }
    }

    fn finish(&self) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_end();
        }
    }
}

/* ---------------- executors ---------------- */

/// Pull one leaf through `stages` into the terminal. `reads` receives the leaf's
/// `elements_read` count.
fn run_leaf<T: Element, X: Terminal<T>>(
    leaf: Box<dyn DynSource>,
    stages: &[StageNode],
    index: usize,
    terminal: &X,
    stop: &Arc<StopSignal>,
    reads: &Telemetry,
) -> Result<X::Partial> {
    let guard = PullGuard::watching(Arc::clone(stop), index, reads.clone());
    let cursor = into_cursor::<T>(fuse(stages, leaf.open(guard))?, "terminal")?;
    let ctx = PartitionCtx { index, stop };
    terminal.evaluate(cursor, &ctx).inspect_err(|_| stop.abort())
}

/// Sequential executor: one partition, every stage applied lazily in-process.
fn exec_seq<T: Element, X: Terminal<T>>(
    plan: Plan,
    terminal: &X,
    telemetry: &Telemetry,
) -> Result<X::Partial> {
    telemetry.add("partitions", 1);
    let stop = Arc::new(StopSignal::new(terminal.halt()));
    let partial = run_leaf(plan.source, &plan.stages, 0, terminal, &stop, telemetry)?;
    if stop.tripped() {
        telemetry.add("short_circuits", 1);
    }
    Ok(partial)
}

/// Parallel executor.
///
/// Splits the source into leaves, fuses the leading stateless stages per leaf and,
/// at each stateful stage, gathers every leaf in order, applies the stage once and
/// re-splits the result. `limit` and `take_while` chain the leaves lazily instead of
/// gathering them. The final segment feeds the terminal per leaf; partials are merged
/// in leaf order.
fn exec_par<T: Element, X: Terminal<T>>(
    plan: Plan,
    terminal: &X,
    target: usize,
    min_len: usize,
    telemetry: &Telemetry,
) -> Result<X::Partial> {
    let Plan {
        mut source,
        mut source_ops,
        stages,
    } = plan;
    let mut start = 0usize;
    let rereads = Telemetry::default();

    loop {
        let rest = &stages[start..];
        // Rows re-read from a materialized barrier output are not source reads.
        let reads = if start == 0 { telemetry } else { &rereads };
        let ordered = source.source_traits().ordered;
        let mut leaves = split_source(source, target, min_len);

        if leaves.len() == 1 {
            if let Some(leaf) = leaves.pop() {
                // Nothing to run side by side: keep the remaining chain lazy.
                telemetry.add("partitions", 1);
                let stop = Arc::new(StopSignal::new(terminal.halt()));
                let partial = run_leaf(leaf, rest, 0, terminal, &stop, reads)?;
                if stop.tripped() {
                    telemetry.add("short_circuits", 1);
                }
                return Ok(partial);
            }
        }
        telemetry.add("partitions", leaves.len() as u64);

        let Some(at) = rest.iter().position(|node| !node.stage.is_stateless()) else {
            let stop = Arc::new(StopSignal::new(terminal.halt()));
            let partials = leaves
                .into_par_iter()
                .enumerate()
                .map(|(index, leaf)| run_leaf(leaf, rest, index, terminal, &stop, reads))
                .collect::<Result<Vec<_>>>()?;
            if stop.tripped() {
                telemetry.add("short_circuits", 1);
            }
            return combine_tree(terminal, partials);
        };

        let (head, barrier) = (&rest[..at], &rest[at]);
        let input_ops = head.last().map_or(&source_ops, |node| &node.output);
        let parts = leaves
            .into_par_iter()
            .map(|leaf| fuse(head, leaf.open(PullGuard::detached(reads.clone()))))
            .collect::<Result<Vec<_>>>()?;
        let op = barrier.stage.op();
        let out = if barrier.stage.is_prefix() {
            // Leaves are pulled one after another and only until the prefix is complete.
            op.apply(input_ops.chain(parts)?)?
        } else {
            op.apply_gathered(input_ops.gather(parts)?, input_ops.as_ref())?
        };
        telemetry.add("barriers", 1);

        source = barrier.output.materialize(out, ordered)?;
        source_ops = Arc::clone(&barrier.output);
        start += at + 1;
    }
}

/// Split into at most `target` leaves (rounded up to a power of two), prefix first.
fn split_source(
    source: Box<dyn DynSource>,
    target: usize,
    min_len: usize,
) -> Vec<Box<dyn DynSource>> {
    let depth = target.next_power_of_two().trailing_zeros();
    let mut leaves = Vec::new();
    split_into(source, depth, min_len, &mut leaves);
    leaves
}

fn split_into(
    mut source: Box<dyn DynSource>,
    depth: u32,
    min_len: usize,
    out: &mut Vec<Box<dyn DynSource>>,
) {
    let too_small = source
        .remaining()
        .is_some_and(|n| n < min_len.saturating_mul(2));
    if depth == 0 || too_small {
        out.push(source);
        return;
    }
    match source.split_prefix() {
        Some(prefix) => {
            split_into(prefix, depth - 1, min_len, out);
            split_into(source, depth - 1, min_len, out);
        }
        None => out.push(source),
    }
}

/// Merge partials pairwise as a balanced tree, always left before right.
fn combine_tree<T, X: Terminal<T>>(terminal: &X, mut partials: Vec<X::Partial>) -> Result<X::Partial> {
    if partials.len() <= 1 {
        return Ok(partials.pop().unwrap_or_else(|| terminal.identity()));
    }
    let right = partials.split_off(partials.len() / 2);
    let (left, right) = rayon::join(
        || combine_tree(terminal, partials),
        || combine_tree(terminal, right),
    );
    terminal.merge(left?, right?)
}
