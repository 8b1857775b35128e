//! Vector drawings to line edges.
//!
//! Only straight, roughly axis-parallel strokes matter for table detection;
//! Bézier segments are ignored.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::edges::line_to_edge;
use super::page::{SmallGlyphHeights, TextSource};
use super::settings::TableSettings;
use super::text::cell_text;
use super::types::{BBox, EdgeKind, EdgeObj, Point, key_f64};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathItem {
    Line { p1: Point, p2: Point },
    Rect { rect: BBox },
    Quad { ul: Point, ur: Point, ll: Point, lr: Point },
    Curve { points: Vec<Point> },
}

impl PathItem {
    fn points(&self) -> Vec<Point> {
        match self {
            PathItem::Line { p1, p2 } => vec![*p1, *p2],
            PathItem::Rect { rect } => vec![(rect.x0, rect.top), (rect.x1, rect.bottom)],
            PathItem::Quad { ul, ur, ll, lr } => vec![*ul, *ur, *ll, *lr],
            PathItem::Curve { points } => points.clone(),
        }
    }
}

/// One vector path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub items: Vec<PathItem>,
    #[serde(default)]
    pub close_path: bool,
    /// Filled without a stroke.
    #[serde(default)]
    pub fill_only: bool,
    #[serde(default)]
    pub width: f64,
}

impl Drawing {
    pub fn new(items: Vec<PathItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn bounds(&self) -> Option<BBox> {
        BBox::enclosing(
            self.items
                .iter()
                .flat_map(PathItem::points)
                .map(|(x, y)| BBox::new(x, y, x, y)),
        )
    }
}

/// A line edge between two points, clipped to `clip`.
///
/// Segments that are not within the snap tolerances of axis-parallel, lie
/// outside the clip, or shrink to a point are rejected.
pub fn make_line(p1: Point, p2: Point, clip: &BBox, snap_x: f64, snap_y: f64) -> Option<EdgeObj> {
    if (p1.0 - p2.0).abs() > snap_x && (p1.1 - p2.1).abs() > snap_y {
        return None;
    }
    let x0 = p1.0.min(p2.0);
    let x1 = p1.0.max(p2.0);
    let y0 = p1.1.min(p2.1);
    let y1 = p1.1.max(p2.1);
    if x0 > clip.x1 || x1 < clip.x0 || y0 > clip.bottom || y1 < clip.top {
        return None;
    }
    let x0 = x0.max(clip.x0);
    let x1 = x1.min(clip.x1);
    let top = y0.max(clip.top);
    let bottom = y1.min(clip.bottom);
    if x1 - x0 == 0.0 && bottom - top == 0.0 {
        return None;
    }
    Some(line_to_edge(&EdgeObj {
        x0,
        x1,
        top,
        bottom,
        width: x1 - x0,
        height: bottom - top,
        doctop: top,
        orientation: None,
        kind: EdgeKind::Line,
        page_number: 0,
    }))
}

fn are_neighbors(r1: &BBox, r2: &BBox, snap_x: f64, snap_y: f64) -> bool {
    let near = |a: &BBox, b: &BBox| {
        let within_x = |x: f64| b.x0 - snap_x <= x && x <= b.x1 + snap_x;
        let within_y = |y: f64| b.top - snap_y <= y && y <= b.bottom + snap_y;
        (within_x(a.x0) || within_x(a.x1)) && (within_y(a.top) || within_y(a.bottom))
    };
    near(r1, r2) || near(r2, r1)
}

/// Joins path boxes that almost touch and keeps the joined boxes that
/// contain text.
fn text_boxes(paths: &[&Drawing], snap_x: f64, snap_y: f64, text: &dyn TextSource) -> Vec<BBox> {
    let mut rects: Vec<BBox> = paths.iter().filter_map(|p| p.bounds()).collect();
    let key = |r: &BBox| (key_f64(r.bottom), key_f64(r.x0), key_f64(r.top), key_f64(r.x1));
    rects.sort_by_key(key);
    rects.dedup_by_key(|r| key(&*r));

    let blocks = {
        let _small = SmallGlyphHeights::enable(text);
        text.blocks(None)
    };
    let mut joined = Vec::new();
    while !rects.is_empty() {
        let mut first = rects[0];
        let mut repeat = true;
        while repeat {
            repeat = false;
            for i in (1..rects.len()).rev() {
                if are_neighbors(&first, &rects[i], snap_x, snap_y) {
                    first = first.union(&rects[i]);
                    rects.remove(i);
                    repeat = true;
                }
            }
        }
        if !cell_text(&blocks, &first).is_empty() {
            joined.push(first);
        }
        rects.remove(0);
    }
    joined
}

/// Turns vector paths into line edges.
///
/// Lines, rectangles and quads become up to four lines each; rectangles
/// thinner than the snap tolerance become one centre line. Neighbouring path
/// boxes are joined and, when they hold text, contribute their borders.
/// `settings.add_lines` are appended last.
pub fn edges_from_drawings(
    drawings: &[Drawing],
    page_rect: BBox,
    clip: Option<BBox>,
    settings: &TableSettings,
    text: &dyn TextSource,
) -> Vec<EdgeObj> {
    let snap_x = settings.snap_x_tolerance;
    let snap_y = settings.snap_y_tolerance;
    let clip = clip.unwrap_or(page_rect);
    let strict = settings.uses_strict_lines();

    let paths: Vec<&Drawing> = drawings
        .iter()
        .filter(|p| {
            !(p.fill_only
                && strict
                && p.bounds()
                    .is_some_and(|b| b.width() > snap_x && b.height() > snap_y))
        })
        .collect();
    let boxes = text_boxes(&paths, snap_x, snap_y, text);

    let mut edges = Vec::new();
    let mut push = |p1: Point, p2: Point| {
        if let Some(edge) = make_line(p1, p2, &clip, snap_x, snap_y) {
            edges.push(edge);
        }
    };

    for path in &paths {
        let mut items: Vec<PathItem> = path.items.clone();
        if path.close_path
            && let (Some(PathItem::Line { p1: start, .. }), Some(PathItem::Line { p2: end, .. })) =
                (items.first(), items.last())
        {
            let closing = PathItem::Line {
                p1: *end,
                p2: *start,
            };
            items.push(closing);
        }

        for item in &items {
            match item {
                PathItem::Line { p1, p2 } => push(*p1, *p2),
                PathItem::Rect { rect } => {
                    let r = BBox::new(
                        rect.x0.min(rect.x1),
                        rect.top.min(rect.bottom),
                        rect.x0.max(rect.x1),
                        rect.top.max(rect.bottom),
                    );
                    if r.height() <= snap_y && r.width() <= snap_x {
                        continue;
                    }
                    if r.width() <= snap_x {
                        let x = (r.x0 + r.x1).abs() / 2.0;
                        push((x, r.top), (x, r.bottom));
                        continue;
                    }
                    if r.height() <= snap_y {
                        let y = (r.top + r.bottom).abs() / 2.0;
                        push((r.x0, y), (r.x1, y));
                        continue;
                    }
                    let (tl, tr) = ((r.x0, r.top), (r.x1, r.top));
                    let (bl, br) = ((r.x0, r.bottom), (r.x1, r.bottom));
                    push(tl, bl);
                    push(bl, br);
                    push(br, tr);
                    push(tr, tl);
                }
                PathItem::Quad { ul, ur, ll, lr } => {
                    push(*ul, *ll);
                    push(*ll, *lr);
                    push(*lr, *ur);
                    push(*ur, *ul);
                }
                PathItem::Curve { .. } => {}
            }
        }
    }

    for b in &boxes {
        let (tl, tr) = ((b.x0, b.top), (b.x1, b.top));
        let (bl, br) = ((b.x0, b.bottom), (b.x1, b.bottom));
        push(tl, tr);
        push(bl, br);
        push(tl, bl);
        push(tr, br);
    }

    for (p1, p2) in &settings.add_lines {
        push(*p1, *p2);
    }

    debug!(
        paths = paths.len(),
        text_boxes = boxes.len(),
        edges = edges.len(),
        "drawings decomposed"
    );
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::page::PageText;
    use crate::table::types::{CharObj, Orientation};

    const PAGE: BBox = BBox::new(0.0, 0.0, 600.0, 800.0);

    #[test]
    fn sloped_segments_are_rejected() {
        assert!(make_line((0.0, 0.0), (50.0, 50.0), &PAGE, 3.0, 3.0).is_none());
        let nearly = make_line((0.0, 10.0), (50.0, 12.0), &PAGE, 3.0, 3.0).unwrap();
        // not flat, so it counts as vertical and is later filtered by length
        assert_eq!(nearly.orientation, Some(Orientation::Vertical));
    }

    #[test]
    fn lines_are_clipped() {
        let clip = BBox::new(10.0, 0.0, 40.0, 100.0);
        let edge = make_line((0.0, 5.0), (100.0, 5.0), &clip, 3.0, 3.0).unwrap();
        assert_eq!((edge.x0, edge.x1, edge.width), (10.0, 40.0, 30.0));
        assert!(make_line((50.0, 5.0), (90.0, 5.0), &clip, 3.0, 3.0).is_none());
        assert!(make_line((5.0, 5.0), (5.0, 5.0), &PAGE, 3.0, 3.0).is_none());
    }

    #[test]
    fn rectangles_decompose() {
        let text = PageText::default();
        let drawings = vec![
            Drawing::new(vec![PathItem::Rect {
                rect: BBox::new(0.0, 0.0, 100.0, 50.0),
            }]),
            // a thin bar is one line
            Drawing::new(vec![PathItem::Rect {
                rect: BBox::new(200.0, 100.0, 300.0, 101.0),
            }]),
            // a dot is nothing
            Drawing::new(vec![PathItem::Rect {
                rect: BBox::new(400.0, 400.0, 401.0, 401.0),
            }]),
        ];
        let edges = edges_from_drawings(&drawings, PAGE, None, &TableSettings::default(), &text);
        assert_eq!(edges.len(), 5);
        let bar = &edges[4];
        assert_eq!(bar.orientation, Some(Orientation::Horizontal));
        assert_eq!(bar.top, 100.5);
    }

    #[test]
    fn closed_path_gets_closing_segment() {
        let text = PageText::default();
        let mut path = Drawing::new(vec![
            PathItem::Line {
                p1: (0.0, 0.0),
                p2: (100.0, 0.0),
            },
            PathItem::Line {
                p1: (100.0, 0.0),
                p2: (100.0, 50.0),
            },
            PathItem::Line {
                p1: (100.0, 50.0),
                p2: (0.0, 50.0),
            },
        ]);
        let open = edges_from_drawings(&[path.clone()], PAGE, None, &TableSettings::default(), &text);
        path.close_path = true;
        let closed = edges_from_drawings(&[path], PAGE, None, &TableSettings::default(), &text);
        assert_eq!(open.len(), 3);
        assert_eq!(closed.len(), 4);
    }

    #[test]
    fn shaded_boxes_with_text_add_borders() {
        let chars = vec![CharObj::new("x", BBox::new(20.0, 20.0, 25.0, 30.0), 10.0)];
        let text = PageText::from_chars(&chars);
        let mut shade = Drawing::new(vec![PathItem::Rect {
            rect: BBox::new(10.0, 10.0, 50.0, 40.0),
        }]);
        shade.fill_only = true;
        let edges = edges_from_drawings(&[shade], PAGE, None, &TableSettings::default(), &text);
        // four from the rectangle, four from the text box around it
        assert_eq!(edges.len(), 8);
    }

    #[test]
    fn add_lines_are_appended() {
        let text = PageText::default();
        let settings = TableSettings {
            add_lines: vec![((0.0, 5.0), (60.0, 5.0))],
            ..Default::default()
        };
        let edges = edges_from_drawings(&[], PAGE, None, &settings, &text);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, EdgeKind::Line);
    }
}
