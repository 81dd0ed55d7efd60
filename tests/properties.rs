//! Property tests: parallel pipelines behave like the equivalent iterator chains.

use ironstream::collectors::*;
use ironstream::*;
use proptest::prelude::*;
use std::collections::HashSet;

fn par(partitions: usize) -> Runner {
    Runner::parallel()
        .with_partitions(partitions)
        .with_min_partition_len(1)
}

fn ok<R>(result: anyhow::Result<R>) -> Result<R, TestCaseError> {
    result.map_err(|e| TestCaseError::fail(e.to_string()))
}

proptest! {
    #[test]
    fn filter_map_matches_iterator(data in prop::collection::vec(any::<i32>(), 0..200), partitions in 1usize..16) {
        let expected: Vec<i64> = data
            .iter()
            .filter(|n| *n % 3 == 0)
            .map(|n| i64::from(*n) * 2)
            .collect();
        let actual = ok(from_vec(data)
            .with_runner(par(partitions))
            .filter(|n: &i32| n % 3 == 0)
            .map(|n: &i32| i64::from(*n) * 2)
            .to_vec())?;
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn sort_is_stable(data in prop::collection::vec((0u8..8, any::<u16>()), 0..200), partitions in 1usize..16) {
        let mut expected = data.clone();
        expected.sort_by_key(|p| p.0);
        let actual = ok(from_vec(data)
            .with_runner(par(partitions))
            .sorted_by_key(|p: &(u8, u16)| p.0)
            .to_vec())?;
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn distinct_keeps_first_occurrences(data in prop::collection::vec(0u8..20, 0..200), partitions in 1usize..16) {
        let mut seen = HashSet::new();
        let expected: Vec<u8> = data.iter().copied().filter(|n| seen.insert(*n)).collect();
        let actual = ok(from_vec(data).with_runner(par(partitions)).distinct().to_vec())?;
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn skip_and_limit_slice_the_prefix(len in 0i64..300, skip in 0usize..50, limit in 0usize..50, partitions in 1usize..16) {
        let expected: Vec<i64> = (0..len).skip(skip).take(limit).collect();
        let actual = ok(range(0, len)
            .with_runner(par(partitions))
            .skip(skip)
            .limit(limit)
            .to_vec())?;
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn take_while_and_drop_while_match_iterator(data in prop::collection::vec(0u8..10, 0..100), cut in 0u8..10) {
        let head: Vec<u8> = data.iter().copied().take_while(|n| *n < cut).collect();
        let tail: Vec<u8> = data.iter().copied().skip_while(|n| *n < cut).collect();
        let par_head = ok(from_vec(data.clone())
            .with_runner(par(4))
            .take_while(move |n: &u8| *n < cut)
            .to_vec())?;
        let par_tail = ok(from_vec(data)
            .with_runner(par(4))
            .drop_while(move |n: &u8| *n < cut)
            .to_vec())?;
        prop_assert_eq!(par_head, head);
        prop_assert_eq!(par_tail, tail);
    }

    #[test]
    fn summary_statistics_combine_across_partitions(data in prop::collection::vec(-1_000i64..1_000, 0..200), partitions in 1usize..16) {
        let stats = ok(from_vec(data.clone())
            .with_runner(par(partitions))
            .collect(summarizing_i64(|n: &i64| *n)))?;
        prop_assert_eq!(stats.count, data.len() as u64);
        prop_assert_eq!(stats.sum, data.iter().sum::<i64>());
        prop_assert_eq!(stats.min, data.iter().copied().min());
        prop_assert_eq!(stats.max, data.iter().copied().max());
    }

    #[test]
    fn find_first_matches_iterator(data in prop::collection::vec(0u16..500, 0..300), partitions in 1usize..16) {
        let expected = data.iter().copied().find(|n| n % 17 == 3);
        let actual = ok(from_vec(data)
            .with_runner(par(partitions))
            .filter(|n: &u16| n % 17 == 3)
            .find_first())?;
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn joining_preserves_order(words in prop::collection::vec("[a-z]{0,4}", 0..50), partitions in 1usize..16) {
        let expected = words.join("-");
        let actual = ok(from_vec(words).with_runner(par(partitions)).collect(joining("-")))?;
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn quantifiers_agree(data in prop::collection::vec(any::<i16>(), 0..100), threshold in any::<i16>()) {
        let some = ok(from_vec(data.clone()).any_match(move |n: &i16| *n > threshold))?;
        let none = ok(from_vec(data.clone()).none_match(move |n: &i16| *n > threshold))?;
        let all_not = ok(from_vec(data).all_match(move |n: &i16| *n <= threshold))?;
        prop_assert_eq!(some, !none);
        prop_assert_eq!(none, all_not);
    }

    #[test]
    fn count_matches_filtered_length(data in prop::collection::vec(any::<u32>(), 0..200), partitions in 1usize..16) {
        let expected = data.iter().filter(|n| *n % 5 < 2).count() as u64;
        let actual = ok(from_vec(data)
            .with_runner(par(partitions))
            .filter(|n: &u32| n % 5 < 2)
            .count())?;
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn distinct_sorted_is_idempotent(data in prop::collection::vec(0u8..30, 0..100)) {
        let once = ok(from_vec(data).distinct().sorted().to_vec())?;
        let twice = ok(from_vec(once.clone()).distinct().sorted().to_vec())?;
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn grouping_is_exhaustive_and_disjoint(data in prop::collection::vec(any::<u16>(), 0..200), partitions in 1usize..16) {
        let groups = ok(from_vec(data.clone())
            .with_runner(par(partitions))
            .collect(grouping_by(|n: &u16| n % 7)))?;
        let mut regrouped: Vec<u16> = Vec::new();
        for (key, members) in &groups {
            prop_assert!(members.iter().all(|n| n % 7 == *key));
            regrouped.extend(members);
        }
        let mut original = data;
        original.sort_unstable();
        regrouped.sort_unstable();
        prop_assert_eq!(regrouped, original);
    }
}
