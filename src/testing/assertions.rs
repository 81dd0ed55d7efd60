//! Assertions for collected stream output.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Assert that two collections are equal in order and content.
///
/// # Panics
///
/// Panics with the first differing index if the collections differ.
///
/// ```
/// use ironstream::testing::assert_collections_equal;
///
/// assert_collections_equal(&[1, 2, 3], &[1, 2, 3]);
/// ```
pub fn assert_collections_equal<T: Debug + PartialEq>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected length: {}\n  Actual length: {}\n  Expected: {expected:?}\n  Actual: {actual:?}",
        expected.len(),
        actual.len()
    );
    if let Some(i) = actual.iter().zip(expected).position(|(a, e)| a != e) {
        panic!(
            "Collection mismatch at index {i}:\n  Expected: {:?}\n  Actual: {:?}\n  Full expected: {expected:?}\n  Full actual: {actual:?}",
            expected[i], actual[i]
        );
    }
}

/// Assert that two collections hold the same elements with the same multiplicities,
/// in any order.
///
/// # Panics
///
/// Panics listing the elements whose counts differ.
///
/// ```
/// use ironstream::testing::assert_collections_unordered_equal;
///
/// assert_collections_unordered_equal(&[3, 1, 2, 1], &[1, 1, 2, 3]);
/// ```
pub fn assert_collections_unordered_equal<T: Debug + Eq + Hash>(actual: &[T], expected: &[T]) {
    let mut balance: HashMap<&T, i64> = HashMap::new();
    for item in actual {
        *balance.entry(item).or_default() += 1;
    }
    for item in expected {
        *balance.entry(item).or_default() -= 1;
    }
    let extra: Vec<_> = balance.iter().filter(|(_, n)| **n > 0).map(|(t, _)| t).collect();
    let missing: Vec<_> = balance.iter().filter(|(_, n)| **n < 0).map(|(t, _)| t).collect();
    assert!(
        extra.is_empty() && missing.is_empty(),
        "Collection content mismatch:\n  Missing elements: {missing:?}\n  Extra elements: {extra:?}\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
}

/// Assert that two key/value collections are equal once sorted by key.
///
/// Accepts anything iterable as pairs, so a `HashMap` produced by a grouping
/// collector can be compared against a literal `vec![(k, v), ...]`.
///
/// # Panics
///
/// Panics on the first differing pair after sorting.
///
/// ```
/// use ironstream::testing::assert_kv_collections_equal;
/// use std::collections::HashMap;
///
/// let actual = HashMap::from([("b", 2), ("a", 1)]);
/// assert_kv_collections_equal(actual, vec![("a", 1), ("b", 2)]);
/// ```
pub fn assert_kv_collections_equal<K, V>(
    actual: impl IntoIterator<Item = (K, V)>,
    expected: impl IntoIterator<Item = (K, V)>,
) where
    K: Debug + Ord,
    V: Debug + PartialEq,
{
    let mut actual: Vec<(K, V)> = actual.into_iter().collect();
    let mut expected: Vec<(K, V)> = expected.into_iter().collect();
    actual.sort_by(|a, b| a.0.cmp(&b.0));
    expected.sort_by(|a, b| a.0.cmp(&b.0));
    assert_collections_equal(&actual, &expected);
}

/// Assert that every element satisfies `predicate`.
///
/// # Panics
///
/// Panics on the first element that does not.
pub fn assert_all<T: Debug>(collection: &[T], predicate: impl Fn(&T) -> bool) {
    if let Some(i) = collection.iter().position(|t| !predicate(t)) {
        panic!(
            "Predicate failed for element at index {i}:\n  Element: {:?}\n  Collection: {collection:?}",
            collection[i]
        );
    }
}
