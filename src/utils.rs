//! Utility functions for the library.
use ahash::AHashMap;

pub(crate) fn get_display_form_from_bitset(bitset: &fixedbitset_stack::FixedBitSet) -> Vec<usize> {
    bitset.ones().collect()
}

pub(crate) fn get_deterministic_display_form_from_hash_map<K, V, U: Ord + Clone, Y>(
    map: &AHashMap<K, V>,
    process: impl FnMut((&K, &V)) -> (U, Y),
) -> Vec<(U, Y)> {
    let mut a: Vec<_> = map.iter().map(process).collect();
    a.sort_by_cached_key(|(k, _)| k.clone());
    a
}
