//! Built-in collectors and their composition.

use anyhow::Result;
use ironstream::collectors::*;
use ironstream::testing::*;
use ironstream::*;
use std::collections::{HashMap, HashSet};

#[test]
fn to_list_and_to_set() -> Result<()> {
    let list = from_vec(vec![3, 1, 3]).collect(to_list())?;
    assert_collections_equal(&list, &[3, 1, 3]);

    let set = from_vec(vec![3, 1, 3]).collect(to_set())?;
    assert_eq!(set, HashSet::from([1, 3]));
    Ok(())
}

#[test]
fn to_map_rejects_duplicate_keys() {
    let err = from_vec(vec!["aa", "b", "cc"])
        .collect(to_map(|s: &&str| s.len(), |s: &&str| s.to_string()))
        .unwrap_err();
    match err.downcast_ref::<StreamError>() {
        Some(StreamError::DuplicateKey { key }) => assert_eq!(key, "2"),
        other => panic!("expected a duplicate key error, got {other:?}"),
    }
}

#[test]
fn to_map_merging_folds_repeated_keys() -> Result<()> {
    let counts = from_vec(vec!["apple", "avocado", "banana", "apricot"])
        .collect(to_map_merging(
            |w: &&str| w.chars().next().unwrap_or(' '),
            |_: &&str| 1u32,
            |a: u32, b: u32| a + b,
        ))?;
    assert_kv_collections_equal(counts, vec![('a', 3), ('b', 1)]);
    Ok(())
}

#[test]
fn to_map_merge_sees_values_in_encounter_order() -> Result<()> {
    let latest = from_vec(vec![("k", 1), ("j", 2), ("k", 3)])
        .collect(to_map_merging(
            |p: &(&str, i32)| p.0.to_string(),
            |p: &(&str, i32)| p.1,
            |_old: i32, new: i32| new,
        ))?;
    assert_kv_collections_equal(latest, vec![("j".to_string(), 2), ("k".to_string(), 3)]);
    Ok(())
}

#[test]
fn grouping_by_keeps_group_order() -> Result<()> {
    let groups = from_vec(sample_orders())
        .collect(grouping_by(|o: &Order| o.customer.clone()))?;
    let alice: Vec<u32> = groups["alice"].iter().map(|o| o.id).collect();
    assert_eq!(alice, vec![1, 3]);
    assert_eq!(groups.len(), 3);
    Ok(())
}

#[test]
fn grouping_by_with_nested_downstreams() -> Result<()> {
    let customers_by_category = from_vec(sample_orders()).collect(grouping_by_with(
        |o: &Order| o.category.clone(),
        mapping(|o: &Order| o.customer.clone(), to_list()),
    ))?;
    assert_kv_collections_equal(
        customers_by_category,
        vec![
            ("books".to_string(), vec!["alice".to_string(), "carol".to_string()]),
            ("garden".to_string(), vec!["bob".to_string(), "alice".to_string()]),
        ],
    );

    let quantity_by_customer = from_vec(sample_orders()).collect(grouping_by_with(
        |o: &Order| o.customer.clone(),
        summing(|o: &Order| o.quantity),
    ))?;
    assert_eq!(quantity_by_customer["alice"], 10);
    assert_eq!(quantity_by_customer["bob"], 0);
    Ok(())
}

#[test]
fn partitioning_always_has_both_keys() -> Result<()> {
    let parts = from_vec(vec![2, 4, 6]).collect(partitioning_by(|n: &i32| n % 2 == 0))?;
    assert_eq!(parts[&true], vec![2, 4, 6]);
    assert!(parts[&false].is_empty());

    let empty_parts = empty::<i32>().collect(partitioning_by_with(|n: &i32| *n > 0, counting()))?;
    assert_eq!(empty_parts, HashMap::from([(true, 0), (false, 0)]));
    Ok(())
}

#[test]
fn joining_with_delimiters() -> Result<()> {
    let joined = from_vec(vec!["A", "B", "C"]).collect(joining(", "))?;
    assert_eq!(joined, "A, B, C");

    assert_eq!(empty::<String>().collect(joining(", "))?, "");

    let bracketed = from_vec(vec!["x".to_string(), "y".to_string()])
        .collect(joining_with("|", "[", "]"))?;
    assert_eq!(bracketed, "[x|y]");
    assert_eq!(empty::<&str>().collect(joining_with("|", "[", "]"))?, "[]");
    Ok(())
}

#[test]
fn teeing_min_and_max_in_one_pass() -> Result<()> {
    let (lo, hi) = from_vec(sample_items()).collect(teeing(
        min_by(|a: &PricedItem, b: &PricedItem| a.price.cmp(&b.price)),
        max_by(|a: &PricedItem, b: &PricedItem| a.price.cmp(&b.price)),
        |lo: Option<PricedItem>, hi: Option<PricedItem>| {
            (lo.map(|i| i.price), hi.map(|i| i.price))
        },
    ))?;
    assert_eq!((lo, hi), (Some(1), Some(9)));
    Ok(())
}

#[test]
fn summarizing_integers() -> Result<()> {
    let stats = from_vec(sample_orders()).collect(summarizing_i64(|o: &Order| o.quantity))?;
    assert_eq!(stats.count, 4);
    assert_eq!(stats.sum, 12);
    assert_eq!(stats.min, Some(0));
    assert_eq!(stats.max, Some(7));
    assert!((stats.average() - 3.0).abs() < f64::EPSILON);

    let none = empty::<i64>().collect(summarizing_i64(|n: &i64| *n))?;
    assert_eq!(none.count, 0);
    assert_eq!(none.min, None);
    assert!(none.average().abs() < f64::EPSILON);
    Ok(())
}

#[test]
fn summarizing_floats() -> Result<()> {
    let stats = from_vec(vec![1.5, -2.0, 4.5]).collect(summarizing_f64(|x: &f64| *x))?;
    assert_eq!(stats.count(), 3);
    assert!((stats.sum() - 4.0).abs() < 1e-12);
    assert_eq!(stats.min(), Some(-2.0));
    assert_eq!(stats.max(), Some(4.5));
    Ok(())
}

#[test]
fn averaging_uses_compensated_sums() -> Result<()> {
    let mut values = vec![1.0e16];
    values.extend(std::iter::repeat_n(1.0, 10));
    values.push(-1.0e16);
    let avg = from_vec(values).collect(averaging(|x: &f64| *x))?;
    assert!((avg - 10.0 / 12.0).abs() < 1e-12);

    assert!(empty::<f64>().collect(averaging(|x: &f64| *x))?.abs() < f64::EPSILON);
    Ok(())
}

#[test]
fn filtering_and_flat_mapping_downstreams() -> Result<()> {
    let big = from_vec(vec![1, 5, 2, 8]).collect(filtering(|n: &i32| *n > 2, counting()))?;
    assert_eq!(big, 2);

    let letters = from_vec(vec!["ab", "bc"]).collect(flat_mapping(
        |s: &&str| s.chars().collect::<Vec<char>>(),
        to_set(),
    ))?;
    assert_eq!(letters, HashSet::from(['a', 'b', 'c']));
    Ok(())
}

#[test]
fn collecting_and_then_finishes_once() -> Result<()> {
    let len = range(0, 7).collect(collecting_and_then(to_list(), |v: Vec<i64>| v.len()))?;
    assert_eq!(len, 7);
    Ok(())
}

#[test]
fn reducing_and_counting() -> Result<()> {
    let total = from_vec(vec![1, 2, 3]).collect(reducing(0, |a: i32, b: i32| a + b))?;
    assert_eq!(total, 6);
    assert_eq!(range(0, 42).collect(counting())?, 42);
    Ok(())
}
