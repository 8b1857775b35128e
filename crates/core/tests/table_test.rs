//! End-to-end table reconstruction from glyphs, edges and drawings.

use plumbline_core::table::{
    BBox, CharObj, Drawing, EdgeKind, EdgeObj, ExplicitLine, PageGeometry, PageText, PathItem,
    Rotation, Strategy, TableFinder, TableSettings,
};

const PAGE: BBox = BBox::new(0.0, 0.0, 300.0, 300.0);

fn grid_edges(xs: &[f64], ys: &[f64]) -> Vec<EdgeObj> {
    let (x0, x1) = (xs[0], xs[xs.len() - 1]);
    let (y0, y1) = (ys[0], ys[ys.len() - 1]);
    let mut edges: Vec<EdgeObj> = xs
        .iter()
        .map(|x| EdgeObj::vertical(*x, y0, y1, EdgeKind::Line))
        .collect();
    edges.extend(
        ys.iter()
            .map(|y| EdgeObj::horizontal(*y, x0, x1, EdgeKind::Line)),
    );
    edges
}

fn glyph(text: &str, x0: f64, top: f64) -> CharObj {
    CharObj::new(text, BBox::new(x0, top, x0 + 5.0, top + 10.0), 10.0)
}

fn cells(row: &[&str]) -> Vec<Option<String>> {
    row.iter().map(|s| Some(s.to_string())).collect()
}

#[test]
fn test_perfect_three_by_three_grid() {
    let text = PageText::default();
    let page = PageGeometry::new(PAGE, &text)
        .with_edges(grid_edges(&[0.0, 50.0, 100.0, 150.0], &[0.0, 20.0, 40.0, 60.0]));

    let finder = TableFinder::new(&page, TableSettings::default()).unwrap();
    assert_eq!(finder.len(), 1);
    assert_eq!(finder.cells().len(), 9);
    assert_eq!(finder.intersections().len(), 16);

    let table = finder.get(0).unwrap();
    assert_eq!(table.bbox, BBox::new(0.0, 0.0, 150.0, 60.0));
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.col_count(), 3);
    assert!(table.rows.iter().all(|r| r.cells.iter().all(Option::is_some)));
    assert!(!table.header.external);
    assert_eq!(table.header.names, vec!["", "", ""]);
}

#[test]
fn test_two_grids_and_isolated_cell() {
    let text = PageText::default();
    let mut edges = grid_edges(&[0.0, 20.0, 40.0], &[0.0, 20.0, 40.0]);
    edges.extend(grid_edges(&[100.0, 120.0, 140.0], &[100.0, 120.0, 140.0]));
    edges.extend(grid_edges(&[0.0, 20.0], &[200.0, 220.0]));
    let page = PageGeometry::new(PAGE, &text).with_edges(edges);

    let finder = TableFinder::new(&page, TableSettings::default()).unwrap();
    assert_eq!(finder.cells().len(), 9);
    assert_eq!(finder.len(), 2);
    assert_eq!(finder.get(0).unwrap().bbox, BBox::new(0.0, 0.0, 40.0, 40.0));
    assert_eq!(
        finder.get(-1).unwrap().bbox,
        BBox::new(100.0, 100.0, 140.0, 140.0)
    );
}

#[test]
fn test_end_to_end_two_by_three() {
    let chars = vec![
        glyph("A", 10.0, 5.0),
        glyph("B", 40.0, 5.0),
        glyph("C", 70.0, 5.0),
        glyph("D", 10.0, 25.0),
        glyph("E", 40.0, 25.0),
        glyph("F", 70.0, 25.0),
    ];
    let text = PageText::from_chars(&chars);
    let page = PageGeometry::new(PAGE, &text)
        .with_edges(grid_edges(&[0.0, 30.0, 60.0, 90.0], &[0.0, 20.0, 40.0]));

    let finder = TableFinder::new(&page, TableSettings::default()).unwrap();
    assert_eq!(finder.len(), 1);
    let table = &finder.tables()[0];
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.col_count(), 3);
    assert_eq!(
        table.extract(),
        &[cells(&["A", "B", "C"]), cells(&["D", "E", "F"])]
    );
    assert!(!table.header.external);
    assert_eq!(table.header.names, vec!["A", "B", "C"]);
}

#[test]
fn test_rotation_reverses_rows_and_columns() {
    let chars = vec![
        glyph("A", 5.0, 5.0),
        glyph("B", 25.0, 5.0),
        glyph("C", 5.0, 25.0),
        glyph("D", 25.0, 25.0),
    ];
    let text = PageText::from_chars(&chars);
    let edges = grid_edges(&[0.0, 20.0, 40.0], &[0.0, 20.0, 40.0]);

    let upright = PageGeometry::new(PAGE, &text).with_edges(edges.clone());
    let flipped = PageGeometry::new(PAGE, &text)
        .with_edges(edges)
        .with_rotation(Rotation::R180);

    let upright = TableFinder::new(&upright, TableSettings::default()).unwrap();
    let flipped = TableFinder::new(&flipped, TableSettings::default()).unwrap();
    assert_eq!(
        upright.get(0).unwrap().extract(),
        &[cells(&["A", "B"]), cells(&["C", "D"])]
    );
    assert_eq!(
        flipped.get(0).unwrap().extract(),
        &[cells(&["D", "C"]), cells(&["B", "A"])]
    );
}

#[test]
fn test_glyph_needs_half_its_area_in_cell() {
    // 60% of "x" lies in the left cell, 30% of "y" in the left cell
    let chars = vec![glyph("x", 17.0, 5.0), glyph("y", 18.5, 25.0)];
    let text = PageText::from_chars(&chars);
    let page = PageGeometry::new(PAGE, &text)
        .with_edges(grid_edges(&[0.0, 20.0, 40.0], &[0.0, 20.0, 40.0]));

    let finder = TableFinder::new(&page, TableSettings::default()).unwrap();
    assert_eq!(
        finder.get(0).unwrap().extract(),
        &[cells(&["x", ""]), cells(&["", "y"])]
    );
}

#[test]
fn test_text_strategy_builds_grid_from_words() {
    let mut chars = Vec::new();
    for top in [0.0, 20.0, 40.0] {
        chars.push(glyph("a", 0.0, top));
        chars.push(glyph("b", 5.0, top));
        chars.push(glyph("c", 50.0, top));
        chars.push(glyph("d", 55.0, top));
    }
    let text = PageText::from_chars(&chars);
    let page = PageGeometry::new(PAGE, &text);
    let settings = TableSettings {
        vertical_strategy: Strategy::Text,
        horizontal_strategy: Strategy::Text,
        ..Default::default()
    };

    let finder = TableFinder::new(&page, settings).unwrap();
    assert_eq!(finder.len(), 1);
    let table = finder.get(0).unwrap();
    assert_eq!(table.col_count(), 2);
    assert_eq!(table.row_count(), 5);
    assert_eq!(table.extract()[0], cells(&["ab", "cd"]));
    assert_eq!(table.extract()[1], cells(&["", ""]));
    assert!(finder.edges().iter().all(|e| e.kind == EdgeKind::WordEdge));
}

#[test]
fn test_explicit_coordinates_span_page() {
    let text = PageText::default();
    let page = PageGeometry::new(BBox::new(0.0, 0.0, 100.0, 40.0), &text);
    let settings = TableSettings {
        vertical_strategy: Strategy::Explicit,
        horizontal_strategy: Strategy::Explicit,
        explicit_vertical_lines: vec![
            ExplicitLine::Coord(0.0),
            ExplicitLine::Coord(50.0),
            ExplicitLine::Coord(100.0),
        ],
        explicit_horizontal_lines: vec![
            ExplicitLine::Coord(0.0),
            ExplicitLine::Coord(20.0),
            ExplicitLine::Coord(40.0),
        ],
        ..Default::default()
    };

    let finder = TableFinder::new(&page, settings).unwrap();
    assert_eq!(finder.len(), 1);
    assert_eq!(finder.cells().len(), 4);
}

#[test]
fn test_tables_from_drawn_rectangles() {
    let text = PageText::default();
    let drawings: Vec<Drawing> = [(0.0, 0.0), (50.0, 0.0), (0.0, 20.0), (50.0, 20.0)]
        .into_iter()
        .map(|(x, y)| {
            Drawing::new(vec![PathItem::Rect {
                rect: BBox::new(x, y, x + 50.0, y + 20.0),
            }])
        })
        .collect();
    let page = PageGeometry::new(PAGE, &text).with_drawings(drawings);

    let finder = TableFinder::new(&page, TableSettings::default()).unwrap();
    assert_eq!(finder.len(), 1);
    let table = finder.get(0).unwrap();
    assert_eq!(table.bbox, BBox::new(0.0, 0.0, 100.0, 40.0));
    assert_eq!((table.row_count(), table.col_count()), (2, 2));
}

#[test]
fn test_empty_page_has_no_tables() {
    let text = PageText::default();
    let page = PageGeometry::new(PAGE, &text);
    let finder = TableFinder::new(&page, TableSettings::default()).unwrap();
    assert!(finder.is_empty());
    assert!(finder.get(0).is_err());
}

#[test]
fn test_wrapped_cell_beside_populated_cell() {
    let chars = vec![glyph("A", 5.0, 3.0), glyph("B", 35.0, 3.0), glyph("C", 5.0, 15.0)];
    let text = PageText::from_chars(&chars);
    let page =
        PageGeometry::new(PAGE, &text).with_edges(grid_edges(&[0.0, 30.0, 60.0], &[0.0, 30.0]));

    let finder = TableFinder::new(&page, TableSettings::default()).unwrap();
    assert_eq!(finder.get(0).unwrap().extract(), &[cells(&["A\nC", "B"])]);
}

#[test]
fn test_sparse_tables_are_dropped_on_request() {
    let chars = vec![glyph("S", 5.0, 5.0), glyph("Z", 5.0, 205.0)];
    let text = PageText::from_chars(&chars);
    // single column with text, two empty columns, two columns with text
    let mut edges = grid_edges(&[0.0, 30.0], &[0.0, 20.0, 40.0]);
    edges.extend(grid_edges(&[100.0, 130.0, 160.0], &[100.0, 120.0]));
    edges.extend(grid_edges(&[0.0, 30.0, 60.0], &[200.0, 220.0]));
    let page = PageGeometry::new(PAGE, &text).with_edges(edges);

    let kept = TableFinder::new(&page, TableSettings::default()).unwrap();
    assert_eq!(kept.len(), 3);

    let settings = TableSettings {
        drop_sparse_tables: true,
        ..Default::default()
    };
    let finder = TableFinder::new(&page, settings).unwrap();
    assert_eq!(finder.len(), 1);
    let table = finder.get(0).unwrap();
    assert_eq!(table.bbox, BBox::new(0.0, 200.0, 60.0, 220.0));
    assert_eq!(table.extract(), &[cells(&["Z", ""])]);
    assert_eq!(finder.cells().len(), 6);
}
