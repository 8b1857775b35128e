//! Vertical/horizontal edge crossings.
//!
//! A sweep over y keeps the vertical edges whose (tolerance-padded) span
//! covers the current position in an x-ordered map, so each horizontal edge
//! only inspects verticals inside its own padded x range.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::types::{EdgeObj, HEdgeId, KeyF64, KeyPoint, Orientation, VEdgeId, key_f64, key_point};

/// Merged edges split by orientation; ids index into these vectors.
///
/// Verticals are sorted by (x0, top), horizontals by (top, x0).
#[derive(Clone, Debug, Default, Serialize)]
pub struct EdgeStore {
    pub v: Vec<EdgeObj>,
    pub h: Vec<EdgeObj>,
}

impl EdgeStore {
    pub fn v(&self, id: VEdgeId) -> &EdgeObj {
        &self.v[id.0]
    }

    pub fn h(&self, id: HEdgeId) -> &EdgeObj {
        &self.h[id.0]
    }

    pub fn len(&self) -> usize {
        self.v.len() + self.h.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty() && self.h.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EdgeObj> {
        self.v.iter().chain(self.h.iter())
    }
}

/// Edges passing through one vertex, sorted by id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Intersection {
    pub v: Vec<VEdgeId>,
    pub h: Vec<HEdgeId>,
}

impl Intersection {
    pub(crate) fn shares_v(&self, other: &Intersection) -> bool {
        sorted_lists_intersect(&self.v, &other.v)
    }

    pub(crate) fn shares_h(&self, other: &Intersection) -> bool {
        sorted_lists_intersect(&self.h, &other.h)
    }
}

fn sorted_lists_intersect<T: Ord>(a: &[T], b: &[T]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Equal => return true,
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    false
}

pub type Intersections = FxHashMap<KeyPoint, Intersection>;

fn by_x_then_top(a: &EdgeObj, b: &EdgeObj) -> Ordering {
    a.x0.total_cmp(&b.x0).then(a.top.total_cmp(&b.top))
}

fn by_top_then_x(a: &EdgeObj, b: &EdgeObj) -> Ordering {
    a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0))
}

/// Finds every vertex where a vertical and a horizontal edge cross.
///
/// A pair crosses when `v.top <= h.top + y_tol`, `v.bottom >= h.top - y_tol`
/// and `h.x0 - x_tol <= v.x0 <= h.x1 + x_tol`. The vertex is `(v.x0, h.top)`.
/// Edges without an orientation are ignored.
pub fn edges_to_intersections(
    edges: &[EdgeObj],
    x_tol: f64,
    y_tol: f64,
) -> (EdgeStore, Intersections) {
    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum EventKind {
        AddV,
        QueryH,
        RemoveV,
    }

    struct Event {
        y: f64,
        kind: EventKind,
        idx: usize,
    }

    let mut v_sorted: Vec<EdgeObj> = edges
        .iter()
        .filter(|e| e.orientation == Some(Orientation::Vertical))
        .cloned()
        .collect();
    let mut h_sorted: Vec<EdgeObj> = edges
        .iter()
        .filter(|e| e.orientation == Some(Orientation::Horizontal))
        .cloned()
        .collect();
    v_sorted.sort_by(by_x_then_top);
    h_sorted.sort_by(by_top_then_x);

    let mut events = Vec::with_capacity(v_sorted.len() * 2 + h_sorted.len());
    for (idx, v) in v_sorted.iter().enumerate() {
        events.push(Event {
            y: v.top - y_tol,
            kind: EventKind::AddV,
            idx,
        });
        events.push(Event {
            y: v.bottom + y_tol,
            kind: EventKind::RemoveV,
            idx,
        });
    }
    for (idx, h) in h_sorted.iter().enumerate() {
        events.push(Event {
            y: h.top,
            kind: EventKind::QueryH,
            idx,
        });
    }
    // adds before queries before removals at equal y, so touching spans count
    events.sort_by(|a, b| {
        a.y.total_cmp(&b.y)
            .then(a.kind.cmp(&b.kind))
            .then(a.idx.cmp(&b.idx))
    });

    let mut active: BTreeMap<KeyF64, Vec<usize>> = BTreeMap::new();
    let mut pairs: FxHashMap<KeyPoint, Vec<(VEdgeId, HEdgeId)>> = FxHashMap::default();

    for event in events {
        match event.kind {
            EventKind::AddV => {
                let v = &v_sorted[event.idx];
                active.entry(key_f64(v.x0)).or_default().push(event.idx);
            }
            EventKind::RemoveV => {
                let key = key_f64(v_sorted[event.idx].x0);
                if let Some(bucket) = active.get_mut(&key) {
                    bucket.retain(|&idx| idx != event.idx);
                    if bucket.is_empty() {
                        active.remove(&key);
                    }
                }
            }
            EventKind::QueryH => {
                let h = &h_sorted[event.idx];
                let x_min = key_f64(h.x0 - x_tol);
                let x_max = key_f64(h.x1 + x_tol);
                if x_min > x_max {
                    continue;
                }
                for v_idx in active.range(x_min..=x_max).flat_map(|(_, ids)| ids) {
                    let v = &v_sorted[*v_idx];
                    if v.top <= h.top + y_tol
                        && v.bottom >= h.top - y_tol
                        && v.x0 >= h.x0 - x_tol
                        && v.x0 <= h.x1 + x_tol
                    {
                        pairs
                            .entry(key_point(v.x0, h.top))
                            .or_default()
                            .push((VEdgeId(*v_idx), HEdgeId(event.idx)));
                    }
                }
            }
        }
    }

    let mut intersections = Intersections::default();
    intersections.reserve(pairs.len());
    for (vertex, pair_list) in pairs {
        let (mut v, mut h): (Vec<VEdgeId>, Vec<HEdgeId>) = pair_list.into_iter().unzip();
        v.sort();
        v.dedup();
        h.sort();
        h.dedup();
        intersections.insert(vertex, Intersection { v, h });
    }

    (
        EdgeStore {
            v: v_sorted,
            h: h_sorted,
        },
        intersections,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::types::EdgeKind;

    fn v(x: f64, top: f64, bottom: f64) -> EdgeObj {
        EdgeObj::vertical(x, top, bottom, EdgeKind::Line)
    }

    fn h(y: f64, x0: f64, x1: f64) -> EdgeObj {
        EdgeObj::horizontal(y, x0, x1, EdgeKind::Line)
    }

    fn brute_force(edges: &[EdgeObj], x_tol: f64, y_tol: f64) -> Vec<KeyPoint> {
        let vs: Vec<&EdgeObj> = edges
            .iter()
            .filter(|e| e.orientation == Some(Orientation::Vertical))
            .collect();
        let hs: Vec<&EdgeObj> = edges
            .iter()
            .filter(|e| e.orientation == Some(Orientation::Horizontal))
            .collect();
        let mut out = Vec::new();
        for v in &vs {
            for h in &hs {
                if v.top <= h.top + y_tol
                    && v.bottom >= h.top - y_tol
                    && v.x0 >= h.x0 - x_tol
                    && v.x0 <= h.x1 + x_tol
                {
                    out.push(key_point(v.x0, h.top));
                }
            }
        }
        out.sort();
        out.dedup();
        out
    }

    #[test]
    fn simple_cross() {
        let edges = vec![v(10.0, 0.0, 20.0), h(10.0, 0.0, 20.0)];
        let (store, points) = edges_to_intersections(&edges, 3.0, 3.0);
        assert_eq!(store.len(), 2);
        let hit = &points[&key_point(10.0, 10.0)];
        assert_eq!(hit.v, vec![VEdgeId(0)]);
        assert_eq!(hit.h, vec![HEdgeId(0)]);
    }

    #[test]
    fn near_miss_within_tolerance() {
        // vertical stops 2pt short of the horizontal, horizontal stops 2pt short in x
        let edges = vec![v(22.0, 0.0, 8.0), h(10.0, 0.0, 20.0)];
        let (_, points) = edges_to_intersections(&edges, 3.0, 3.0);
        assert!(points.contains_key(&key_point(22.0, 10.0)));

        let (_, points) = edges_to_intersections(&edges, 1.0, 1.0);
        assert!(points.is_empty());
    }

    #[test]
    fn matches_pairwise_definition() {
        let mut edges = Vec::new();
        for i in 0..6 {
            let x = i as f64 * 17.0 + (i % 3) as f64;
            edges.push(v(x, (i % 2) as f64 * 11.0, 40.0 + i as f64 * 7.0));
        }
        for j in 0..6 {
            let y = j as f64 * 13.0 - (j % 2) as f64 * 2.5;
            edges.push(h(y, (j % 3) as f64 * 9.0, 60.0 + j as f64 * 5.0));
        }
        let (_, points) = edges_to_intersections(&edges, 3.0, 3.0);
        let mut swept: Vec<KeyPoint> = points.keys().copied().collect();
        swept.sort();
        assert_eq!(swept, brute_force(&edges, 3.0, 3.0));
        assert!(!swept.is_empty());
    }

    #[test]
    fn no_edges_no_intersections() {
        let (store, points) = edges_to_intersections(&[], 3.0, 3.0);
        assert!(store.is_empty());
        assert!(points.is_empty());
    }
}
