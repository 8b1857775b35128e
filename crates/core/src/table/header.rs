//! Table header detection.
//!
//! Text lines directly above a table form an external header when they sit
//! close to the table, keep bold styling consistent, and have no word
//! straddling a column boundary. Otherwise the first table row is the header.

use serde::Serialize;
use tracing::{debug, trace};

use super::grid::CellGroup;
use super::page::{SmallGlyphHeights, TextSource};
use super::text::cell_text;
use super::types::{BBox, KeyF64, key_f64};

/// Maximum vertical distance for spans to count as one line.
const Y_DELTA: f64 = 3.0;
/// Lines above this many are never part of a header.
const MAX_HEADER_LINES: usize = 5;
/// Cells at most this wide are ignored when rebuilding row 0.
const MIN_REPAIR_WIDTH: f64 = 10.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableHeader {
    pub bbox: BBox,
    pub cells: Vec<BBox>,
    pub names: Vec<String>,
    /// True when the header lies above the table rather than in row 0.
    pub external: bool,
}

/// Rebuilds row 0 when it has gaps: column bounds come from every cell of
/// plausible width, left to right, skipping overlaps.
fn repair_top_row(row_bbox: BBox, table_bbox: BBox, cells: &[BBox]) -> (Vec<BBox>, BBox) {
    let bbox = BBox {
        x0: table_bbox.x0,
        x1: table_bbox.x1,
        ..row_bbox
    };
    let mut pairs: Vec<(KeyF64, KeyF64)> = cells
        .iter()
        .filter(|c| c.width() > MIN_REPAIR_WIDTH && c.width() < table_bbox.width())
        .map(|c| (key_f64(c.x0), key_f64(c.x1)))
        .collect();
    pairs.sort();
    pairs.dedup();

    let mut repaired: Vec<BBox> = Vec::new();
    for (x0, x1) in pairs {
        let (x0, x1) = (x0.into_inner(), x1.into_inner());
        if repaired.last().is_none_or(|last| x0 >= last.x1) {
            repaired.push(BBox::new(x0, row_bbox.top, x1, row_bbox.bottom));
        }
    }
    (repaired, bbox)
}

fn top_row_is_bold(text: &dyn TextSource, row_bbox: BBox) -> bool {
    text.blocks(Some(row_bbox))
        .iter()
        .flat_map(|b| &b.lines)
        .flat_map(|l| &l.spans)
        .any(|s| s.is_bold())
}

struct Candidate {
    bbox: BBox,
    bold: bool,
}

/// Lines found walking up from the table.
#[derive(Default)]
struct Lines {
    bottoms: Vec<f64>,
    heights: Vec<f64>,
    bolds: Vec<bool>,
}

fn collect_lines(spans: &mut [Candidate]) -> Lines {
    let mut lines = Lines::default();
    for span in spans.iter_mut() {
        let y1 = span.bbox.bottom;
        let h = span.bbox.height();
        let (Some(&y0), Some(&h0), Some(&bold0)) =
            (lines.bottoms.last(), lines.heights.last(), lines.bolds.last())
        else {
            lines.bottoms.push(y1);
            lines.heights.push(h);
            lines.bolds.push(span.bold);
            continue;
        };

        if bold0 && !span.bold {
            trace!(y1, "bold line above non-bold text, stop");
            break;
        }
        if y0 - y1 <= Y_DELTA || ((y0 - h0) - span.bbox.top).abs() <= Y_DELTA {
            // same line: stretch the span over it
            span.bbox.top = y0 - h0;
            span.bbox.bottom = y0;
            if span.bold
                && let Some(last) = lines.bolds.last_mut()
            {
                *last = true;
            }
            continue;
        }
        if y0 - y1 > 1.5 * h0 {
            trace!(y0, y1, h0, "line gap too large, stop");
            break;
        }
        trace!(y1, h, bold = span.bold, "new line above table");
        lines.bottoms.push(y1);
        lines.heights.push(h);
        lines.bolds.push(span.bold);
    }
    lines
}

fn clean_name(s: &str) -> String {
    s.replace('\n', " ").replace("  ", " ").trim().to_string()
}

/// Determines the header of one table.
///
/// `rows` and `first_row_text` describe the table; `page_top` bounds the
/// search area above it.
pub fn detect_header(
    text: &dyn TextSource,
    table_cells: &[BBox],
    rows: &[CellGroup],
    first_row_text: &[Option<String>],
    table_bbox: BBox,
    page_top: f64,
) -> TableHeader {
    let _small = SmallGlyphHeights::enable(text);

    let row0 = rows.first();
    let row_bbox = row0.and_then(CellGroup::bbox).unwrap_or(table_bbox);
    let (cells, bbox) = match row0 {
        Some(row) if row.cells.iter().all(Option::is_some) => {
            (row.cells.iter().flatten().copied().collect(), row_bbox)
        }
        _ => repair_top_row(row_bbox, table_bbox, table_cells),
    };

    let first_row = TableHeader {
        bbox,
        cells: cells.clone(),
        names: first_row_text
            .iter()
            .map(|t| t.clone().unwrap_or_default())
            .collect(),
        external: false,
    };
    if rows.len() < 2 || cells.len() < 2 {
        debug!(rows = rows.len(), cols = cells.len(), "header: table too small, first row");
        return first_row;
    }

    let col_x: Vec<f64> = cells[..cells.len() - 1].iter().map(|c| c.x1).collect();
    let top_row_bold = top_row_is_bold(text, bbox);

    let mut clip = BBox::new(bbox.x0, page_top, bbox.x1, bbox.top);
    let mut spans: Vec<Candidate> = text
        .blocks(Some(clip))
        .iter()
        .flat_map(|b| &b.lines)
        .flat_map(|l| &l.spans)
        .filter(|s| !s.is_superscript() && !s.text.trim().is_empty())
        .map(|s| Candidate {
            bbox: s.bbox,
            bold: s.is_bold(),
        })
        .collect();
    spans.sort_by(|a, b| b.bbox.bottom.total_cmp(&a.bbox.bottom));

    let mut lines = collect_lines(&mut spans);
    if lines.bottoms.is_empty() {
        debug!("header: no text above table, first row");
        return first_row;
    }
    lines.bottoms.truncate(MAX_HEADER_LINES);

    if bbox.top - lines.bottoms[0] >= lines.heights[0] {
        debug!(gap = bbox.top - lines.bottoms[0], "header: text too far above table, first row");
        return first_row;
    }
    if top_row_bold && !lines.bolds[0] {
        debug!("header: bold top row under non-bold text, first row");
        return first_row;
    }

    let lowest = lines.bottoms[lines.bottoms.len() - 1];
    if let Some(nclip) = BBox::enclosing(
        spans
            .iter()
            .filter(|s| s.bbox.bottom >= lowest)
            .map(|s| s.bbox),
    ) && !nclip.is_empty()
    {
        clip = nclip;
    }
    clip.bottom = bbox.top;

    let words = text.words(Some(clip));
    let mut tops: Vec<KeyF64> = words.iter().map(|w| key_f64(w.top)).collect();
    tops.sort_by(|a, b| b.cmp(a));
    tops.dedup();

    let mut accepted: Vec<f64> = Vec::new();
    for top in tops {
        let crossing = words
            .iter()
            .filter(|w| key_f64(w.top) == top)
            .any(|w| col_x.iter().any(|&x| w.x0 < x && w.x1 > x));
        if crossing {
            trace!(top = top.into_inner(), "word crosses a column border, stop");
            break;
        }
        accepted.push(top.into_inner());
    }
    let Some(&header_top) = accepted.last() else {
        debug!("header: every line above crosses a column border, first row");
        return first_row;
    };

    let hdr_cells: Vec<BBox> = cells
        .iter()
        .map(|c| BBox::new(c.x0, header_top, c.x1, clip.bottom))
        .collect();
    let hdr_bbox = BBox::new(
        hdr_cells[0].x0,
        header_top,
        hdr_cells[hdr_cells.len() - 1].x1,
        clip.bottom,
    );
    let blocks = text.blocks(None);
    let names = hdr_cells
        .iter()
        .map(|c| clean_name(&cell_text(&blocks, c)))
        .collect();
    debug!(lines = accepted.len(), "header: external");
    TableHeader {
        bbox: hdr_bbox,
        cells: hdr_cells,
        names,
        external: true,
    }
}
