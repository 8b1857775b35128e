//! TableFinder orchestrator and public API for table extraction.
//!
//! A finder runs the whole pipeline once, in [`TableFinder::new`]: edges per
//! strategy, merge, intersections, cells, tables, then rows, text and header
//! of every table. Everything it exposes is immutable afterwards.

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, TableError};

use super::drawings::edges_from_drawings;
use super::edges::{filter_edges, merge_edges, obj_to_edges, words_to_edges_h, words_to_edges_v};
use super::grid::{CellGroup, cells_to_tables, intersections_to_cells, rows};
use super::header::{TableHeader, detect_header};
use super::intersections::{EdgeStore, Intersections, edges_to_intersections};
use super::page::{PageGeometry, SmallGlyphHeights, TextBlock};
use super::settings::{ExplicitLine, Strategy, TableOptions, TableSettings};
use super::text::{cell_text, extract_rows, extract_words};
use super::types::{BBox, EdgeKind, EdgeObj, KeyF64, Orientation, WordObj, key_f64};

/// One reconstructed table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    pub bbox: BBox,
    pub cells: Vec<BBox>,
    pub rows: Vec<CellGroup>,
    pub header: TableHeader,
    text: Vec<Vec<Option<String>>>,
}

impl Table {
    fn build(cells: Vec<BBox>, page: &PageGeometry<'_>, blocks: &[TextBlock]) -> Self {
        let bbox = BBox::enclosing(cells.iter().copied()).unwrap_or_default();
        let rows = rows(&cells, page.rotation);
        let text = extract_rows(&rows, blocks);
        let header = detect_header(
            page.text,
            &cells,
            &rows,
            text.first().map(Vec::as_slice).unwrap_or_default(),
            bbox,
            page.rect.top,
        );
        Self {
            bbox,
            cells,
            rows,
            header,
            text,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.iter().map(CellGroup::len).max().unwrap_or(0)
    }

    /// Cell text per row; `None` marks a grid gap.
    pub fn extract(&self) -> &[Vec<Option<String>>] {
        &self.text
    }
}

fn explicit_edges(lines: &[ExplicitLine], orientation: Orientation, page: BBox) -> Vec<EdgeObj> {
    let mut edges = Vec::new();
    for line in lines {
        match (line, orientation) {
            (ExplicitLine::Coord(x), Orientation::Vertical) => {
                edges.push(EdgeObj::vertical(*x, page.top, page.bottom, EdgeKind::Explicit));
            }
            (ExplicitLine::Coord(y), Orientation::Horizontal) => {
                edges.push(EdgeObj::horizontal(*y, page.x0, page.x1, EdgeKind::Explicit));
            }
            (record, _) => edges.extend(
                obj_to_edges(record)
                    .into_iter()
                    .filter(|e| e.orientation == Some(orientation)),
            ),
        }
    }
    edges
}

fn strategy_edges(
    strategy: Strategy,
    orientation: Orientation,
    page_edges: &[EdgeObj],
    words: &[WordObj],
    settings: &TableSettings,
) -> Vec<EdgeObj> {
    match (strategy, orientation) {
        (Strategy::Lines, _) => filter_edges(
            page_edges.to_vec(),
            Some(orientation),
            None,
            settings.edge_min_length_prefilter,
        ),
        (Strategy::LinesStrict, _) => filter_edges(
            page_edges.to_vec(),
            Some(orientation),
            Some(EdgeKind::Line),
            settings.edge_min_length_prefilter,
        ),
        (Strategy::Text, Orientation::Vertical) => {
            words_to_edges_v(words, settings.min_words_vertical)
        }
        (Strategy::Text, Orientation::Horizontal) => {
            words_to_edges_h(words, settings.min_words_horizontal)
        }
        (Strategy::Explicit, _) => Vec::new(),
    }
}

/// Fewer than two distinct left or right cell borders, or only whitespace
/// inside the table's bbox.
fn is_sparse(cells: &[BBox], blocks: &[TextBlock]) -> bool {
    let x0s: FxHashSet<KeyF64> = cells.iter().map(|c| key_f64(c.x0)).collect();
    let x1s: FxHashSet<KeyF64> = cells.iter().map(|c| key_f64(c.x1)).collect();
    if x0s.len() < 2 || x1s.len() < 2 {
        return true;
    }
    BBox::enclosing(cells.iter().copied())
        .is_none_or(|bbox| cell_text(blocks, &bbox).trim().is_empty())
}

/// Main table finder that orchestrates the extraction pipeline.
#[derive(Debug)]
pub struct TableFinder {
    settings: TableSettings,
    edges: EdgeStore,
    intersections: Intersections,
    cells: Vec<BBox>,
    tables: Vec<Table>,
}

impl TableFinder {
    /// Finds every table on `page`.
    ///
    /// Settings are validated before any geometry work.
    pub fn new(page: &PageGeometry<'_>, settings: TableSettings) -> Result<Self> {
        settings.validate()?;

        let mut page_edges = page.edges.clone();
        page_edges.extend(edges_from_drawings(
            &page.drawings,
            page.rect,
            page.clip,
            &settings,
            page.text,
        ));

        let words = if settings.uses_text_strategy() {
            extract_words(&page.clipped_chars(), &settings.text_settings)
        } else {
            Vec::new()
        };

        let mut edges = Vec::new();
        for (strategy, orientation, explicit) in [
            (
                settings.vertical_strategy,
                Orientation::Vertical,
                &settings.explicit_vertical_lines,
            ),
            (
                settings.horizontal_strategy,
                Orientation::Horizontal,
                &settings.explicit_horizontal_lines,
            ),
        ] {
            edges.extend(strategy_edges(
                strategy,
                orientation,
                &page_edges,
                &words,
                &settings,
            ));
            edges.extend(explicit_edges(explicit, orientation, page.rect));
        }

        let edges = merge_edges(
            edges,
            settings.snap_x_tolerance,
            settings.snap_y_tolerance,
            settings.join_x_tolerance,
            settings.join_y_tolerance,
        );
        let edges = filter_edges(edges, None, None, settings.edge_min_length);
        let (store, intersections) = edges_to_intersections(
            &edges,
            settings.intersection_x_tolerance,
            settings.intersection_y_tolerance,
        );
        let cells = intersections_to_cells(&intersections);
        let mut groups = cells_to_tables(&cells);

        let blocks = {
            let _small = SmallGlyphHeights::enable(page.text);
            page.text.blocks(None)
        };
        if settings.drop_sparse_tables {
            let before = groups.len();
            groups.retain(|group| !is_sparse(group, &blocks));
            debug!(dropped = before - groups.len(), "sparse tables");
        }
        debug!(
            words = words.len(),
            edges = store.len(),
            intersections = intersections.len(),
            cells = cells.len(),
            tables = groups.len(),
            "table pipeline"
        );

        let tables = groups
            .into_iter()
            .map(|group| Table::build(group, page, &blocks))
            .collect();

        Ok(Self {
            settings,
            edges: store,
            intersections,
            cells,
            tables,
        })
    }

    /// Table at `index`; negative indices count from the end.
    pub fn get(&self, index: isize) -> Result<&Table> {
        let count = self.tables.len();
        let resolved = if index < 0 {
            index + count as isize
        } else {
            index
        };
        usize::try_from(resolved)
            .ok()
            .and_then(|i| self.tables.get(i))
            .ok_or(TableError::Index { index, count })
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Table> {
        self.tables.iter()
    }

    /// Merged edges the intersections were computed from.
    pub fn edges(&self) -> &EdgeStore {
        &self.edges
    }

    pub fn intersections(&self) -> &Intersections {
        &self.intersections
    }

    /// Every cell found on the page, including those of dropped singletons.
    pub fn cells(&self) -> &[BBox] {
        &self.cells
    }

    pub fn settings(&self) -> &TableSettings {
        &self.settings
    }

    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }
}

impl<'a> IntoIterator for &'a TableFinder {
    type Item = &'a Table;
    type IntoIter = std::slice::Iter<'a, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Resolves `options` and finds the tables on `page`.
pub fn find_tables(page: &PageGeometry<'_>, options: &TableOptions) -> Result<TableFinder> {
    TableFinder::new(page, options.resolve()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::page::{PageText, TextSource};

    const PAGE: BBox = BBox::new(0.0, 0.0, 200.0, 200.0);

    fn grid(xs: &[f64], ys: &[f64]) -> Vec<EdgeObj> {
        let mut edges: Vec<EdgeObj> = xs
            .iter()
            .map(|x| EdgeObj::vertical(*x, ys[0], ys[ys.len() - 1], EdgeKind::Line))
            .collect();
        edges.extend(
            ys.iter()
                .map(|y| EdgeObj::horizontal(*y, xs[0], xs[xs.len() - 1], EdgeKind::Line)),
        );
        edges
    }

    #[test]
    fn index_access_wraps_once() {
        let text = PageText::default();
        let page = PageGeometry::new(PAGE, &text).with_edges(grid(&[0.0, 20.0, 40.0], &[0.0, 20.0]));
        let finder = TableFinder::new(&page, TableSettings::default()).unwrap();
        assert_eq!(finder.len(), 1);
        assert_eq!(finder.get(-1).unwrap(), finder.get(0).unwrap());
        assert_eq!(finder.get(1), Err(TableError::Index { index: 1, count: 1 }));
        assert_eq!(
            finder.get(-2),
            Err(TableError::Index {
                index: -2,
                count: 1
            })
        );
    }

    #[test]
    fn explicit_coordinates_span_the_page() {
        let edges = explicit_edges(
            &[ExplicitLine::Coord(10.0), ExplicitLine::Rect(BBox::new(0.0, 0.0, 5.0, 5.0))],
            Orientation::Vertical,
            PAGE,
        );
        assert_eq!(edges.len(), 3);
        assert_eq!((edges[0].top, edges[0].bottom), (0.0, 200.0));
        assert!(edges.iter().all(|e| e.kind == EdgeKind::Explicit));
    }

    #[test]
    fn strict_lines_ignore_rect_edges() {
        let text = PageText::default();
        let mut edges = grid(&[0.0, 20.0, 40.0], &[0.0, 20.0]);
        for e in &mut edges {
            e.kind = EdgeKind::RectEdge;
        }
        let page = PageGeometry::new(PAGE, &text).with_edges(edges);
        let lines = TableFinder::new(&page, TableSettings::default()).unwrap();
        let strict = TableFinder::new(
            &page,
            TableSettings {
                vertical_strategy: Strategy::LinesStrict,
                horizontal_strategy: Strategy::LinesStrict,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(lines.len(), 1);
        assert!(strict.is_empty());
        assert!(strict.edges().is_empty());
    }

    #[test]
    fn sparse_tables_need_two_columns_and_text() {
        let single = [BBox::new(0.0, 0.0, 20.0, 10.0), BBox::new(0.0, 10.0, 20.0, 20.0)];
        assert!(is_sparse(&single, &[]));

        let wide = [BBox::new(0.0, 0.0, 20.0, 10.0), BBox::new(20.0, 0.0, 40.0, 10.0)];
        assert!(is_sparse(&wide, &[]));
        let chars = vec![crate::table::types::CharObj::new(
            "x",
            BBox::new(22.0, 1.0, 27.0, 9.0),
            8.0,
        )];
        let blocks = PageText::from_chars(&chars).blocks(None);
        assert!(!is_sparse(&wide, &blocks));
        assert!(is_sparse(&single, &blocks));
    }

    #[test]
    fn invalid_settings_fail_before_work() {
        let text = PageText::default();
        let page = PageGeometry::new(PAGE, &text);
        let settings = TableSettings {
            snap_x_tolerance: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            TableFinder::new(&page, settings),
            Err(TableError::Validation(_))
        ));
    }
}
