//! Edge snapping, joining, merging and filtering.
//!
//! Raw edges come from vector graphics, explicit settings or word alignment;
//! this module turns them into the clean axis-aligned set the intersection
//! pass expects.

use std::collections::BTreeMap;

use super::clustering::cluster_objects;
use super::settings::ExplicitLine;
use super::types::{BBox, CharObj, EdgeKind, EdgeObj, KeyF64, Orientation, Point, WordObj, key_f64};

/// A bounding-box coordinate objects can be snapped on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapAttr {
    X0,
    X1,
    Top,
    Bottom,
}

impl SnapAttr {
    pub fn value(self, bbox: &BBox) -> f64 {
        match self {
            SnapAttr::X0 => bbox.x0,
            SnapAttr::X1 => bbox.x1,
            SnapAttr::Top => bbox.top,
            SnapAttr::Bottom => bbox.bottom,
        }
    }
}

/// Objects that can be translated so one coordinate lands on a target.
///
/// Moving on `x0`/`x1` shifts both horizontal bounds; moving on
/// `top`/`bottom` shifts both vertical bounds and `doctop`. Width and height
/// never change.
pub trait Movable: Clone {
    fn bbox(&self) -> BBox;
    fn move_to(&mut self, attr: SnapAttr, value: f64);
}

impl Movable for EdgeObj {
    fn bbox(&self) -> BBox {
        EdgeObj::bbox(self)
    }

    fn move_to(&mut self, attr: SnapAttr, value: f64) {
        match attr {
            SnapAttr::X0 => {
                self.x0 = value;
                self.x1 = value + self.width;
            }
            SnapAttr::X1 => {
                self.x1 = value;
                self.x0 = value - self.width;
            }
            SnapAttr::Top => {
                self.doctop += value - self.top;
                self.top = value;
                self.bottom = value + self.height;
            }
            SnapAttr::Bottom => {
                let top = value - self.height;
                self.doctop += top - self.top;
                self.top = top;
                self.bottom = value;
            }
        }
    }
}

impl Movable for CharObj {
    fn bbox(&self) -> BBox {
        CharObj::bbox(self)
    }

    fn move_to(&mut self, attr: SnapAttr, value: f64) {
        match attr {
            SnapAttr::X0 | SnapAttr::X1 => {
                let x0 = if attr == SnapAttr::X0 {
                    value
                } else {
                    value - self.width
                };
                self.origin.0 += x0 - self.x0;
                self.x0 = x0;
                self.x1 = x0 + self.width;
            }
            SnapAttr::Top | SnapAttr::Bottom => {
                let top = if attr == SnapAttr::Top {
                    value
                } else {
                    value - self.height
                };
                let delta = top - self.top;
                self.origin.1 += delta;
                self.doctop += delta;
                self.top = top;
                self.bottom = top + self.height;
            }
        }
    }
}

impl Movable for WordObj {
    fn bbox(&self) -> BBox {
        WordObj::bbox(self)
    }

    fn move_to(&mut self, attr: SnapAttr, value: f64) {
        match attr {
            SnapAttr::X0 => {
                self.x0 = value;
                self.x1 = value + self.width;
            }
            SnapAttr::X1 => {
                self.x1 = value;
                self.x0 = value - self.width;
            }
            SnapAttr::Top => {
                self.doctop += value - self.top;
                self.top = value;
                self.bottom = value + self.height;
            }
            SnapAttr::Bottom => {
                let top = value - self.height;
                self.doctop += top - self.top;
                self.top = top;
                self.bottom = value;
            }
        }
    }
}

// Exact for identical values, so repeated snapping is stable.
fn cluster_mean(values: &[f64]) -> f64 {
    let first = values[0];
    first + values.iter().map(|v| v - first).sum::<f64>() / values.len() as f64
}

/// Moves every object to the mean `attr` of its tolerance cluster.
///
/// Output is grouped by cluster, ascending.
pub fn snap_objects<T: Movable>(objects: &[T], attr: SnapAttr, tolerance: f64) -> Vec<T> {
    let mut snapped = Vec::with_capacity(objects.len());
    for cluster in cluster_objects(objects, |o| attr.value(&o.bbox()), tolerance) {
        let values: Vec<f64> = cluster.iter().map(|o| attr.value(&o.bbox())).collect();
        let mean = cluster_mean(&values);
        for mut obj in cluster {
            obj.move_to(attr, mean);
            snapped.push(obj);
        }
    }
    snapped
}

/// Snaps vertical edges on `x0` and horizontal edges on `top`.
///
/// An axis with zero tolerance is left untouched. Edges without an
/// orientation are dropped.
pub fn snap_edges(edges: &[EdgeObj], x_tolerance: f64, y_tolerance: f64) -> Vec<EdgeObj> {
    let (mut v_edges, mut h_edges): (Vec<EdgeObj>, Vec<EdgeObj>) = edges
        .iter()
        .filter(|e| e.orientation.is_some())
        .cloned()
        .partition(|e| e.orientation == Some(Orientation::Vertical));

    if x_tolerance > 0.0 {
        v_edges = snap_objects(&v_edges, SnapAttr::X0, x_tolerance);
    }
    if y_tolerance > 0.0 {
        h_edges = snap_objects(&h_edges, SnapAttr::Top, y_tolerance);
    }

    v_edges.into_iter().chain(h_edges).collect()
}

/// Moves one boundary of `edge`, keeping width, height and doctop in step.
pub fn resize_edge(edge: &EdgeObj, boundary: SnapAttr, value: f64) -> EdgeObj {
    let mut out = edge.clone();
    match boundary {
        SnapAttr::X0 => out.x0 = value,
        SnapAttr::X1 => out.x1 = value,
        SnapAttr::Top => {
            out.doctop += value - out.top;
            out.top = value;
        }
        SnapAttr::Bottom => out.bottom = value,
    }
    debug_assert!(
        out.x1 >= out.x0 && out.bottom >= out.top,
        "resize produced an inverted edge: {out:?}"
    );
    out.width = out.x1 - out.x0;
    out.height = out.bottom - out.top;
    out
}

fn extent(edge: &EdgeObj, orientation: Orientation) -> (f64, f64) {
    match orientation {
        Orientation::Horizontal => (edge.x0, edge.x1),
        Orientation::Vertical => (edge.top, edge.bottom),
    }
}

/// Joins collinear edges whose gap is within `tolerance`.
pub fn join_edge_group(
    edges: &[EdgeObj],
    orientation: Orientation,
    tolerance: f64,
) -> Vec<EdgeObj> {
    let far = match orientation {
        Orientation::Horizontal => SnapAttr::X1,
        Orientation::Vertical => SnapAttr::Bottom,
    };
    let mut sorted = edges.to_vec();
    sorted.sort_by(|a, b| extent(a, orientation).0.total_cmp(&extent(b, orientation).0));

    let mut joined: Vec<EdgeObj> = Vec::new();
    for e in sorted {
        let Some(last) = joined.last_mut() else {
            joined.push(e);
            continue;
        };
        let (e_min, e_max) = extent(&e, orientation);
        let last_max = extent(last, orientation).1;
        if e_min <= last_max + tolerance {
            if e_max > last_max {
                *last = resize_edge(last, far, e_max);
            }
        } else {
            joined.push(e);
        }
    }
    joined
}

/// Snaps, then joins edges sharing an orientation and exact position.
///
/// Horizontal groups join with `join_x_tolerance`, vertical groups with
/// `join_y_tolerance`.
pub fn merge_edges(
    edges: Vec<EdgeObj>,
    snap_x_tolerance: f64,
    snap_y_tolerance: f64,
    join_x_tolerance: f64,
    join_y_tolerance: f64,
) -> Vec<EdgeObj> {
    let edges = if snap_x_tolerance > 0.0 || snap_y_tolerance > 0.0 {
        snap_edges(&edges, snap_x_tolerance, snap_y_tolerance)
    } else {
        edges
    };

    let mut grouped: BTreeMap<(Orientation, KeyF64), Vec<EdgeObj>> = BTreeMap::new();
    for e in edges {
        let Some(orientation) = e.orientation else {
            continue;
        };
        let position = match orientation {
            Orientation::Horizontal => e.top,
            Orientation::Vertical => e.x0,
        };
        grouped
            .entry((orientation, key_f64(position)))
            .or_default()
            .push(e);
    }

    let mut merged: Vec<EdgeObj> = Vec::new();
    for ((orientation, _), group) in grouped {
        let tolerance = match orientation {
            Orientation::Horizontal => join_x_tolerance,
            Orientation::Vertical => join_y_tolerance,
        };
        merged.extend(join_edge_group(&group, orientation, tolerance));
    }
    merged
}

/// Keeps edges of at least `min_length`, optionally of one orientation and kind.
pub fn filter_edges(
    edges: Vec<EdgeObj>,
    orientation: Option<Orientation>,
    kind: Option<EdgeKind>,
    min_length: f64,
) -> Vec<EdgeObj> {
    edges
        .into_iter()
        .filter(|e| {
            let kind_ok = kind.is_none_or(|k| e.kind == k);
            let orient_ok = orientation.is_none_or(|o| e.orientation == Some(o));
            kind_ok && orient_ok && e.length() >= min_length
        })
        .collect()
}

/// Gives a straight line its orientation: flat lines are horizontal.
pub fn line_to_edge(line: &EdgeObj) -> EdgeObj {
    let orientation = if line.top == line.bottom {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    };
    EdgeObj {
        orientation: Some(orientation),
        ..line.clone()
    }
}

/// The four borders of a rectangle: top, bottom, left, right.
pub fn rect_to_edges(rect: BBox) -> Vec<EdgeObj> {
    vec![
        EdgeObj::horizontal(rect.top, rect.x0, rect.x1, EdgeKind::RectEdge),
        EdgeObj::horizontal(rect.bottom, rect.x0, rect.x1, EdgeKind::RectEdge),
        EdgeObj::vertical(rect.x0, rect.top, rect.bottom, EdgeKind::RectEdge),
        EdgeObj::vertical(rect.x1, rect.top, rect.bottom, EdgeKind::RectEdge),
    ]
}

/// One chord per consecutive point pair; diagonal chords carry no orientation.
pub fn curve_to_edges(points: &[Point], kind: EdgeKind) -> Vec<EdgeObj> {
    points
        .windows(2)
        .map(|pair| {
            let (p0, p1) = (pair[0], pair[1]);
            let x0 = p0.0.min(p1.0);
            let x1 = p0.0.max(p1.0);
            let top = p0.1.min(p1.1);
            let bottom = p0.1.max(p1.1);
            let orientation = if p0.0 == p1.0 {
                Some(Orientation::Vertical)
            } else if p0.1 == p1.1 {
                Some(Orientation::Horizontal)
            } else {
                None
            };
            EdgeObj {
                x0,
                x1,
                top,
                bottom,
                width: x1 - x0,
                height: bottom - top,
                doctop: top,
                orientation,
                kind,
                page_number: 0,
            }
        })
        .collect()
}

/// Edges contributed by a record-style explicit line.
///
/// Bare coordinates depend on the page extent and yield nothing here.
pub fn obj_to_edges(obj: &ExplicitLine) -> Vec<EdgeObj> {
    match obj {
        ExplicitLine::Coord(_) => Vec::new(),
        ExplicitLine::Curve(points) => curve_to_edges(points, EdgeKind::Explicit),
        ExplicitLine::Edge(edge) if edge.orientation.is_some() => vec![edge.clone()],
        ExplicitLine::Edge(edge) => vec![line_to_edge(edge)],
        ExplicitLine::Rect(rect) => rect_to_edges(*rect)
            .into_iter()
            .map(|e| EdgeObj {
                kind: EdgeKind::Explicit,
                ..e
            })
            .collect(),
    }
}

fn words_bbox(words: &[WordObj]) -> Option<BBox> {
    BBox::enclosing(words.iter().map(WordObj::bbox))
}

// Overlap including boxes that only touch.
fn touches(a: &BBox, b: &BBox) -> bool {
    let w = a.x1.min(b.x1) - a.x0.max(b.x0);
    let h = a.bottom.min(b.bottom) - a.top.max(b.top);
    w >= 0.0 && h >= 0.0 && w + h > 0.0
}

/// Horizontal rules above and below every text line with at least
/// `word_threshold` words, spanning the union width of those lines.
pub fn words_to_edges_h(words: &[WordObj], word_threshold: usize) -> Vec<EdgeObj> {
    let rects: Vec<BBox> = cluster_objects(words, |w| w.top, 1.0)
        .iter()
        .filter(|c| c.len() >= word_threshold)
        .filter_map(|c| words_bbox(c))
        .collect();
    let Some(span) = BBox::enclosing(rects.iter().copied()) else {
        return Vec::new();
    };

    rects
        .iter()
        .flat_map(|r| {
            [
                EdgeObj::horizontal(r.top, span.x0, span.x1, EdgeKind::WordEdge),
                EdgeObj::horizontal(r.bottom, span.x0, span.x1, EdgeKind::WordEdge),
            ]
        })
        .collect()
}

/// Vertical rules from word columns aligned on left, right or centre.
///
/// Larger alignment groups win; a group overlapping an already accepted one
/// is discarded. One rule per accepted group's left edge, plus one at the
/// right-most `x1`.
pub fn words_to_edges_v(words: &[WordObj], word_threshold: usize) -> Vec<EdgeObj> {
    let mut clusters = cluster_objects(words, |w| w.x0, 1.0);
    clusters.extend(cluster_objects(words, |w| w.x1, 1.0));
    clusters.extend(cluster_objects(words, |w| (w.x0 + w.x1) / 2.0, 1.0));
    // stable: equal sizes keep x0, x1, centre order
    clusters.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut condensed: Vec<BBox> = Vec::new();
    for bbox in clusters
        .iter()
        .filter(|c| c.len() >= word_threshold)
        .filter_map(|c| words_bbox(c))
    {
        if !condensed.iter().any(|c| touches(&bbox, c)) {
            condensed.push(bbox);
        }
    }
    let Some(span) = BBox::enclosing(condensed.iter().copied()) else {
        return Vec::new();
    };
    condensed.sort_by(|a, b| a.x0.total_cmp(&b.x0));

    condensed
        .iter()
        .map(|r| r.x0)
        .chain(std::iter::once(span.x1))
        .map(|x| EdgeObj::vertical(x, span.top, span.bottom, EdgeKind::WordEdge))
        .collect()
}
