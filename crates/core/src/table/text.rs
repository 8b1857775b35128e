//! Cell text and word formation.
//!
//! Cell text reads the text layer's span hierarchy; word formation works on
//! loose glyphs and feeds the `text` strategy.

use super::clustering::cluster_objects;
use super::grid::CellGroup;
use super::page::TextBlock;
use super::settings::TextSettings;
use super::types::{BBox, CharObj, TextDir, WordObj};

/// Text of the glyphs covering at least half their own area inside `cell`.
///
/// Spans that contribute a glyph are separated by line breaks; trailing
/// breaks and surrounding whitespace are dropped.
pub fn cell_text(blocks: &[TextBlock], cell: &BBox) -> String {
    let mut text = String::new();
    for block in blocks.iter().filter(|b| b.bbox.intersects(cell)) {
        for line in block.lines.iter().filter(|l| l.bbox.intersects(cell)) {
            for span in &line.spans {
                let mut accepted = span
                    .chars
                    .iter()
                    .filter(|ch| ch.bbox.overlap_area(cell) >= 0.5 * ch.bbox.area())
                    .peekable();
                if accepted.peek().is_none() {
                    continue;
                }
                if !text.is_empty() {
                    text.push('\n');
                }
                for ch in accepted {
                    text.push_str(&ch.c);
                }
            }
        }
    }
    text.trim_end_matches('\n').trim().to_string()
}

/// Text of every row; gap cells stay `None`.
pub fn extract_rows(rows: &[CellGroup], blocks: &[TextBlock]) -> Vec<Vec<Option<String>>> {
    rows.iter()
        .map(|row| {
            row.cells
                .iter()
                .map(|cell| cell.as_ref().map(|c| cell_text(blocks, c)))
                .collect()
        })
        .collect()
}

fn char_dir(upright: bool, settings: &TextSettings) -> TextDir {
    if upright {
        settings.char_dir
    } else {
        settings.char_dir_rotated
    }
}

fn line_dir(upright: bool, settings: &TextSettings) -> TextDir {
    if upright {
        settings.line_dir
    } else {
        settings.line_dir_rotated
    }
}

fn line_cluster_key(dir: TextDir, c: &CharObj) -> f64 {
    match dir {
        TextDir::Ttb => c.top,
        TextDir::Btt => -c.bottom,
        TextDir::Ltr => c.x0,
        TextDir::Rtl => -c.x1,
    }
}

fn char_sort_key(dir: TextDir, c: &CharObj) -> (f64, f64) {
    match dir {
        TextDir::Ttb => (c.top, c.bottom),
        TextDir::Btt => (-(c.top + c.height), -c.top),
        TextDir::Ltr => (c.x0, c.x0),
        TextDir::Rtl => (-c.x1, -c.x0),
    }
}

fn expand_ligature(text: &str) -> &str {
    match text {
        "\u{fb00}" => "ff",
        "\u{fb03}" => "ffi",
        "\u{fb04}" => "ffl",
        "\u{fb01}" => "fi",
        "\u{fb02}" => "fl",
        "\u{fb06}" | "\u{fb05}" => "st",
        _ => text,
    }
}

fn begins_new_word(prev: &CharObj, curr: &CharObj, dir: TextDir, x_tol: f64, y_tol: f64) -> bool {
    // (along tolerance, across tolerance, prev across, curr across,
    //  prev start, prev end, curr start)
    let (x, y, ay, cy, ax, bx, cx) = match dir {
        TextDir::Ltr => (x_tol, y_tol, prev.top, curr.top, prev.x0, prev.x1, curr.x0),
        TextDir::Rtl => (x_tol, y_tol, prev.top, curr.top, -prev.x1, -prev.x0, -curr.x1),
        TextDir::Ttb => (y_tol, x_tol, prev.x0, curr.x0, prev.top, prev.bottom, curr.top),
        TextDir::Btt => (
            y_tol,
            x_tol,
            prev.x0,
            curr.x0,
            -prev.bottom,
            -prev.top,
            -curr.bottom,
        ),
    };
    cx < ax || cx > bx + x || cy > ay + y
}

fn merge_chars(chars: &[&CharObj], settings: &TextSettings) -> Option<WordObj> {
    let first = chars.first()?;
    let bbox = BBox::enclosing(chars.iter().map(|c| c.bbox()))?;
    let text = chars
        .iter()
        .map(|c| {
            if settings.expand_ligatures {
                expand_ligature(&c.text)
            } else {
                c.text.as_str()
            }
        })
        .collect();
    Some(WordObj {
        text,
        x0: bbox.x0,
        x1: bbox.x1,
        top: bbox.top,
        bottom: bbox.bottom,
        doctop: bbox.top + (first.doctop - first.top),
        width: bbox.width(),
        height: bbox.height(),
        upright: first.upright,
        direction: char_dir(first.upright, settings),
    })
}

fn chars_to_words<'a>(
    ordered: &[&'a CharObj],
    dir: TextDir,
    settings: &TextSettings,
) -> Vec<Vec<&'a CharObj>> {
    let mut words: Vec<Vec<&CharObj>> = Vec::new();
    let mut current: Vec<&CharObj> = Vec::new();
    for &c in ordered {
        if !settings.keep_blank_chars && c.text.trim().is_empty() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if !c.text.is_empty() && settings.split_at_punctuation.contains(c.text.as_str()) {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            words.push(vec![c]);
        } else if let Some(prev) = current.last() {
            let x_tol = settings
                .x_tolerance_ratio
                .map_or(settings.x_tolerance, |r| r * prev.size);
            let y_tol = settings
                .y_tolerance_ratio
                .map_or(settings.y_tolerance, |r| r * prev.size);
            if begins_new_word(prev, c, dir, x_tol, y_tol) {
                words.push(std::mem::replace(&mut current, vec![c]));
            } else {
                current.push(c);
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn chars_to_lines<'a>(chars: &[&'a CharObj], settings: &TextSettings) -> Vec<Vec<&'a CharObj>> {
    let upright = chars.first().is_none_or(|c| c.upright);
    let ldir = line_dir(upright, settings);
    let cdir = char_dir(upright, settings);
    let tolerance = match ldir {
        TextDir::Ttb | TextDir::Btt => settings.y_tolerance,
        TextDir::Ltr | TextDir::Rtl => settings.x_tolerance,
    };
    cluster_objects(chars, |c| line_cluster_key(ldir, c), tolerance)
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| {
                let (a0, a1) = char_sort_key(cdir, a);
                let (b0, b1) = char_sort_key(cdir, b);
                a0.total_cmp(&b0).then(a1.total_cmp(&b1))
            });
            line
        })
        .collect()
}

/// Forms words from loose glyphs.
///
/// Upright and rotated glyphs are handled separately, upright first.
pub fn extract_words(chars: &[CharObj], settings: &TextSettings) -> Vec<WordObj> {
    let mut words = Vec::new();
    for upright in [true, false] {
        let group: Vec<&CharObj> = chars.iter().filter(|c| c.upright == upright).collect();
        if group.is_empty() {
            continue;
        }
        let lines = if settings.use_text_flow {
            vec![group]
        } else {
            chars_to_lines(&group, settings)
        };
        let dir = char_dir(upright, settings);
        for line in lines {
            words.extend(
                chars_to_words(&line, dir, settings)
                    .iter()
                    .filter_map(|w| merge_chars(w, settings)),
            );
        }
    }
    words
}
