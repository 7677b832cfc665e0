//! Seeded stratified sampling.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Draw `n` items so each group keeps its share of the population.
///
/// Group quotas are floored and the leftover slots go to the groups with the
/// largest remainders (ties broken by key order). The same seed and input
/// always produce the same sample. When `n` covers the whole population every
/// item is returned in its original order.
pub fn stratified_sample<T, K, F>(items: Vec<T>, n: usize, seed: u64, key: F) -> Vec<T>
where
    K: Ord + Copy,
    F: Fn(&T) -> K,
{
    let total = items.len();
    if n >= total {
        return items;
    }

    let mut groups: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for item in items {
        groups.entry(key(&item)).or_default().push(item);
    }

    let quotas = allocate(&groups, n, total);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut sample = Vec::with_capacity(n);
    for (group_key, mut members) in groups {
        let quota = quotas.get(&group_key).copied().unwrap_or(0);
        members.shuffle(&mut rng);
        members.truncate(quota);
        sample.extend(members);
    }

    sample.shuffle(&mut rng);
    sample
}

fn allocate<K: Ord + Copy, T>(
    groups: &BTreeMap<K, Vec<T>>,
    n: usize,
    total: usize,
) -> BTreeMap<K, usize> {
    let mut quotas = BTreeMap::new();
    let mut remainders = Vec::with_capacity(groups.len());
    let mut assigned = 0;

    for (key, members) in groups {
        let scaled = n * members.len();
        let quota = scaled / total;
        assigned += quota;
        quotas.insert(*key, quota);
        remainders.push((scaled % total, *key));
    }

    // Largest remainder first; BTreeMap iteration already ordered keys.
    remainders.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, key) in remainders.into_iter().take(n - assigned) {
        if let Some(quota) = quotas.get_mut(&key) {
            *quota += 1;
        }
    }

    quotas
}
