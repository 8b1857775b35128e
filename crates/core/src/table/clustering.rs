//! Tolerance-based clustering of coordinates and objects.
//!
//! Clusters chain: a value joins the running group when it lies within
//! `tolerance` of the previous value, not of the group's first value, so a
//! group may span more than `tolerance` end to end.

use rustc_hash::FxHashMap;

use super::types::{KeyF64, key_f64};

/// Sorts `xs` and splits it into tolerance chains.
pub fn cluster_list(mut xs: Vec<f64>, tolerance: f64) -> Vec<Vec<f64>> {
    xs.sort_by(f64::total_cmp);
    if tolerance == 0.0 || xs.len() < 2 {
        return xs.into_iter().map(|x| vec![x]).collect();
    }
    let mut groups: Vec<Vec<f64>> = Vec::new();
    let mut current: Vec<f64> = vec![xs[0]];
    let mut last = xs[0];
    for x in xs.into_iter().skip(1) {
        if x <= last + tolerance {
            current.push(x);
        } else {
            groups.push(std::mem::replace(&mut current, vec![x]));
        }
        last = x;
    }
    groups.push(current);
    groups
}

/// Maps each distinct value to the index of its cluster.
pub fn make_cluster_dict(values: Vec<f64>, tolerance: f64) -> FxHashMap<KeyF64, usize> {
    let mut unique = values;
    unique.sort_by(f64::total_cmp);
    unique.dedup();
    let mut dict = FxHashMap::default();
    for (i, cluster) in cluster_list(unique, tolerance).into_iter().enumerate() {
        for val in cluster {
            dict.insert(key_f64(val), i);
        }
    }
    dict
}

/// Groups `xs` by the cluster of `key_fn`, in ascending cluster order.
///
/// Items keep their input order within a cluster.
pub fn cluster_objects<T: Clone, F: Fn(&T) -> f64>(
    xs: &[T],
    key_fn: F,
    tolerance: f64,
) -> Vec<Vec<T>> {
    let dict = make_cluster_dict(xs.iter().map(&key_fn).collect(), tolerance);
    let mut tagged: Vec<(usize, &T)> = xs
        .iter()
        .map(|x| (dict.get(&key_f64(key_fn(x))).copied().unwrap_or(0), x))
        .collect();
    // stable, so input order survives inside a cluster
    tagged.sort_by_key(|(idx, _)| *idx);

    let mut groups: Vec<Vec<T>> = Vec::new();
    let mut last_idx: Option<usize> = None;
    for (idx, item) in tagged {
        match groups.last_mut() {
            Some(current) if last_idx == Some(idx) => current.push(item.clone()),
            _ => groups.push(vec![item.clone()]),
        }
        last_idx = Some(idx);
    }
    groups
}
