//! Parallel execution must agree with sequential execution on ordered streams.

use anyhow::Result;
use ironstream::collectors::*;
use ironstream::testing::*;
use ironstream::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn stateless_chain_matches_sequential() -> Result<()> {
    let out = assert_seq_par_equivalent(|runner| {
        range(0, 500)
            .with_runner(runner)
            .filter(|n: &i64| n % 3 != 0)
            .map(|n: &i64| n * 2)
            .flat_map(|n: &i64| vec![*n, -*n])
            .to_vec()
    })?;
    assert_eq!(out.len(), 2 * 333);
    assert_collections_equal(&out[..4], &[2, -2, 4, -4]);
    Ok(())
}

#[test]
fn barrier_stages_match_sequential() -> Result<()> {
    let data: Vec<u32> = (0..300).map(|i| (i * 37) % 101).collect();

    let sorted = assert_seq_par_equivalent(|runner| {
        from_vec(data.clone()).with_runner(runner).sorted().distinct().to_vec()
    })?;
    assert_eq!(sorted, (0..101).collect::<Vec<u32>>());

    assert_seq_par_equivalent(|runner| {
        from_vec(data.clone())
            .with_runner(runner)
            .map(|n: &u32| n + 1)
            .skip(7)
            .limit(40)
            .take_while(|n: &u32| *n != 0)
            .drop_while(|n: &u32| n % 2 == 0)
            .to_vec()
    })?;
    Ok(())
}

#[test]
fn limit_keeps_the_encounter_prefix() -> Result<()> {
    let out = assert_seq_par_equivalent(|runner| {
        range(0, 10_000)
            .with_runner(runner)
            .filter(|n: &i64| n % 7 == 0)
            .limit(3)
            .to_vec()
    })?;
    assert_collections_equal(&out, &[0, 7, 14]);
    Ok(())
}

fn counting_peek(pulled: &Arc<AtomicUsize>) -> impl Fn(&i64) + Send + Sync + 'static {
    let seen = Arc::clone(pulled);
    move |_: &i64| {
        seen.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn parallel_limit_pulls_only_the_prefix() -> Result<()> {
    let pulled = Arc::new(AtomicUsize::new(0));
    let out = range(0, 2_000_000)
        .with_runner(Runner::parallel().with_partitions(8))
        .peek(counting_peek(&pulled))
        .limit(3)
        .to_vec()?;
    assert_collections_equal(&out, &[0, 1, 2]);
    assert_eq!(pulled.load(Ordering::SeqCst), 3);
    Ok(())
}

#[test]
fn parallel_take_while_stops_at_the_first_rejection() -> Result<()> {
    let pulled = Arc::new(AtomicUsize::new(0));
    let out = range(0, 2_000_000)
        .with_runner(Runner::parallel().with_partitions(8))
        .peek(counting_peek(&pulled))
        .take_while(|n: &i64| *n < 3)
        .to_vec()?;
    assert_collections_equal(&out, &[0, 1, 2]);
    assert_eq!(pulled.load(Ordering::SeqCst), 4);
    Ok(())
}

#[test]
fn parallel_limit_over_a_huge_range_terminates() -> Result<()> {
    let out = range(0, i64::MAX)
        .with_runner(Runner::parallel().with_partitions(16))
        .filter(|n: &i64| n % 2 == 1)
        .limit(4)
        .map(|n: &i64| n * 10)
        .to_vec()?;
    assert_collections_equal(&out, &[10, 30, 50, 70]);
    Ok(())
}

#[test]
fn inconsistent_comparator_keeps_every_element_in_parallel() -> Result<()> {
    let data: Vec<i64> = (0..2_000).map(|i| (i * 7919) % 2_000).collect();
    let out = from_vec(data.clone())
        .with_runner(Runner::parallel().with_partitions(8))
        .map(|n: &i64| *n)
        .sorted_by(|a: &i64, b: &i64| {
            if (a ^ b) & 1 == 0 {
                a.cmp(b)
            } else {
                b.cmp(a)
            }
        })
        .to_vec()?;
    assert_collections_unordered_equal(&out, &data);
    Ok(())
}

#[test]
fn find_first_is_the_encounter_first() -> Result<()> {
    let hit = assert_seq_par_equivalent(|runner| {
        range(0, 100_000)
            .with_runner(runner)
            .filter(|n: &i64| n % 997 == 500)
            .find_first()
    })?;
    assert_eq!(hit, Some(500));
    Ok(())
}

#[test]
fn ordered_collectors_match_sequential() -> Result<()> {
    let words: Vec<String> = (0..200).map(|i| format!("w{}", i % 13)).collect();

    assert_seq_par_equivalent(|runner| {
        from_vec(words.clone())
            .with_runner(runner)
            .collect(grouping_by(|w: &String| w.len()))
    })?;
    assert_seq_par_equivalent(|runner| {
        from_vec(words.clone()).with_runner(runner).collect(joining(","))
    })?;
    assert_seq_par_equivalent(|runner| {
        from_vec(words.clone()).with_runner(runner).collect(to_map_merging(
            |w: &String| w.clone(),
            |_: &String| 1u64,
            |a: u64, b: u64| a + b,
        ))
    })?;
    assert_seq_par_equivalent(|runner| {
        from_vec(words.clone())
            .with_runner(runner)
            .collect(partitioning_by(|w: &String| w.ends_with('1')))
    })?;
    Ok(())
}

#[test]
fn numeric_terminals_match_sequential() -> Result<()> {
    let sum = assert_seq_par_equivalent(|runner| {
        range_inclusive(1, 1_000).with_runner(runner).reduce(0, |a, b| a + b)
    })?;
    assert_eq!(sum, 500_500);

    let count = assert_seq_par_equivalent(|runner| {
        range(0, 1_000).with_runner(runner).filter(|n: &i64| n % 4 == 1).count()
    })?;
    assert_eq!(count, 250);

    let stats = assert_seq_par_equivalent(|runner| {
        range(-50, 50)
            .with_runner(runner)
            .collect(summarizing_i64(|n: &i64| *n))
    })?;
    assert_eq!((stats.min, stats.max, stats.sum), (Some(-50), Some(49), -50));
    Ok(())
}

#[test]
fn ties_resolve_to_the_earliest_element_in_parallel() -> Result<()> {
    let items: Vec<(u32, usize)> = (0..64).map(|i| (i % 4, i as usize)).collect();
    let lowest = assert_seq_par_equivalent(|runner| {
        from_vec(items.clone())
            .with_runner(runner)
            .min_by_key(|p: &(u32, usize)| p.0)
    })?;
    assert_eq!(lowest, Some((0, 0)));
    Ok(())
}

#[test]
fn closure_errors_propagate_from_any_partition() {
    let result = range(0, 1_000)
        .with_runner(Runner::parallel().with_partitions(8))
        .try_map(|n: &i64| {
            if *n == 777 {
                anyhow::bail!("cannot map {n}");
            }
            Ok(*n)
        })
        .to_vec();
    assert_eq!(result.unwrap_err().to_string(), "cannot map 777");
}

#[test]
fn dedicated_pool_runs_the_pipeline() -> Result<()> {
    let out = range(0, 64)
        .with_runner(Runner::parallel().with_threads(2).with_partitions(4))
        .map(|n: &i64| n * n)
        .to_vec()?;
    assert_eq!(out.len(), 64);
    assert_eq!(out[63], 63 * 63);

    let par = range(0, 10).collect_par(Some(3), Some(4))?;
    assert_collections_equal(&par, &(0..10).collect::<Vec<i64>>());
    Ok(())
}

#[test]
fn unordered_sources_keep_their_contents() -> Result<()> {
    let set: std::collections::HashSet<i32> = (0..50).collect();
    let out = from_set(set).parallel().map(|n: &i32| n * 2).to_vec()?;
    let expected: Vec<i32> = (0..50).map(|n| n * 2).collect();
    assert_collections_unordered_equal(&out, &expected);
    Ok(())
}

#[test]
fn infinite_sources_run_lazily_in_parallel_mode() -> Result<()> {
    let first = iterate(1u64, |n: &u64| n * 3)
        .parallel()
        .filter(|n: &u64| n % 2 == 1)
        .limit(4)
        .to_vec()?;
    assert_collections_equal(&first, &[1, 3, 9, 27]);

    let hit = generate(|| 5u8).parallel().find_any()?;
    assert_eq!(hit, Some(5));
    Ok(())
}

#[test]
fn short_circuit_stops_later_partitions() -> Result<()> {
    let pulled = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&pulled);
    let found = range(0, 1_000_000)
        .with_runner(Runner::parallel().with_partitions(8))
        .peek(move |_: &i64| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .any_match(|n: &i64| *n == 0)?;
    assert!(found);
    assert!(pulled.load(Ordering::SeqCst) < 1_000_000);
    Ok(())
}

#[test]
fn for_each_in_parallel_sees_every_element_once() -> Result<()> {
    let total = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&total);
    range(1, 101)
        .with_runner(Runner::parallel().with_partitions(8))
        .for_each(move |n| {
            sink.fetch_add(n as usize, Ordering::SeqCst);
        })?;
    assert_eq!(total.load(Ordering::SeqCst), 5050);
    Ok(())
}
