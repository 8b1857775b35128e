//! The page a table finder works on.
//!
//! [`TextSource`] is the query interface of a text layer (block, line, span,
//! char hierarchy plus words); [`PageText`] is an in-memory implementation.
//! [`PageGeometry`] bundles everything one finder run reads.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use super::clustering::cluster_objects;
use super::drawings::Drawing;
use super::settings::TextSettings;
use super::types::{BBox, CharObj, EdgeObj, Point, Primitive, Rotation, TextDir, WordObj};

/// Span flag bits.
pub mod span_flags {
    pub const SUPERSCRIPT: u32 = 1;
    pub const BOLD: u32 = 16;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextChar {
    pub c: String,
    pub bbox: BBox,
    #[serde(default)]
    pub origin: Point,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub bbox: BBox,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub font: String,
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub chars: Vec<TextChar>,
}

impl TextSpan {
    /// A span over `chars`; bbox and text are derived from them.
    pub fn new(font: impl Into<String>, size: f64, flags: u32, chars: Vec<TextChar>) -> Self {
        let bbox = BBox::enclosing(chars.iter().map(|c| c.bbox)).unwrap_or_default();
        let text = chars.iter().map(|c| c.c.as_str()).collect();
        Self {
            bbox,
            text,
            font: font.into(),
            size,
            flags,
            chars,
        }
    }

    pub fn is_bold(&self) -> bool {
        self.flags & span_flags::BOLD != 0
    }

    pub fn is_superscript(&self) -> bool {
        self.flags & span_flags::SUPERSCRIPT != 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub bbox: BBox,
    /// Writing direction as (cos, sin).
    #[serde(default = "default_dir")]
    pub dir: Point,
    pub spans: Vec<TextSpan>,
}

fn default_dir() -> Point {
    (1.0, 0.0)
}

impl TextLine {
    pub fn new(spans: Vec<TextSpan>) -> Self {
        let bbox = BBox::enclosing(spans.iter().map(|s| s.bbox)).unwrap_or_default();
        Self {
            bbox,
            dir: default_dir(),
            spans,
        }
    }

    pub fn is_upright(&self) -> bool {
        self.dir.1 == 0.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub bbox: BBox,
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    pub fn new(lines: Vec<TextLine>) -> Self {
        let bbox = BBox::enclosing(lines.iter().map(|l| l.bbox)).unwrap_or_default();
        Self { bbox, lines }
    }
}

/// Text layer queries used by cell extraction and header detection.
///
/// Boxes reported by `blocks`, `words` and `chars` depend on the
/// small-glyph-heights mode: when on, a glyph's box hugs the glyph; when off,
/// it covers its span's full line height.
///
/// The mode is on while at least one request holds it, so overlapping
/// requests from several threads release in any order.
pub trait TextSource {
    /// Text hierarchy restricted to glyphs whose centre lies in `clip`.
    fn blocks(&self, clip: Option<BBox>) -> Vec<TextBlock>;
    fn words(&self, clip: Option<BBox>) -> Vec<WordObj>;
    fn chars(&self) -> Vec<CharObj>;
    fn small_glyph_heights(&self) -> bool;
    fn acquire_small_glyph_heights(&self);
    fn release_small_glyph_heights(&self);
}

/// Holds small glyph heights on for its lifetime.
pub struct SmallGlyphHeights<'a> {
    source: &'a dyn TextSource,
}

impl<'a> SmallGlyphHeights<'a> {
    pub fn enable(source: &'a dyn TextSource) -> Self {
        source.acquire_small_glyph_heights();
        Self { source }
    }
}

impl Drop for SmallGlyphHeights<'_> {
    fn drop(&mut self) {
        self.source.release_small_glyph_heights();
    }
}

/// In-memory text layer.
///
/// Glyph boxes are stored tight; the loose (line height) form is derived
/// from the enclosing span.
#[derive(Debug)]
pub struct PageText {
    blocks: Vec<TextBlock>,
    small_glyph_heights: AtomicUsize,
    x_tolerance: f64,
}

fn center_in(bbox: &BBox, clip: &BBox) -> bool {
    let cx = (bbox.x0 + bbox.x1) / 2.0;
    let cy = (bbox.top + bbox.bottom) / 2.0;
    cx >= clip.x0 && cx <= clip.x1 && cy >= clip.top && cy <= clip.bottom
}

fn str_attr<'a>(c: &'a CharObj, key: &str) -> &'a str {
    c.attrs.get(key).and_then(|v| v.as_str()).unwrap_or_default()
}

fn flags_attr(c: &CharObj) -> u32 {
    c.attrs
        .get("flags")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

impl PageText {
    pub fn new(blocks: Vec<TextBlock>) -> Self {
        Self {
            blocks,
            small_glyph_heights: AtomicUsize::new(0),
            x_tolerance: TextSettings::default().x_tolerance,
        }
    }

    /// Builds the hierarchy from loose glyphs with default tolerances.
    pub fn from_chars(chars: &[CharObj]) -> Self {
        Self::from_chars_with(chars, &TextSettings::default())
    }

    /// Builds the hierarchy from loose glyphs.
    ///
    /// Lines are clusters of glyph tops within `y_tolerance`, each in its own
    /// block. A line breaks into spans where the `fontname` or `flags`
    /// attribute changes or the horizontal gap exceeds `x_tolerance`.
    pub fn from_chars_with(chars: &[CharObj], settings: &TextSettings) -> Self {
        let mut blocks = Vec::new();
        for mut line_chars in cluster_objects(chars, |c| c.top, settings.y_tolerance) {
            line_chars.sort_by(|a, b| a.x0.total_cmp(&b.x0));
            let mut spans: Vec<TextSpan> = Vec::new();
            let mut run: Vec<&CharObj> = Vec::new();
            for c in &line_chars {
                if let Some(prev) = run.last()
                    && (str_attr(prev, "fontname") != str_attr(c, "fontname")
                        || flags_attr(prev) != flags_attr(c)
                        || c.x0 - prev.x1 > settings.x_tolerance)
                {
                    spans.push(span_from_run(&run));
                    run.clear();
                }
                run.push(c);
            }
            if !run.is_empty() {
                spans.push(span_from_run(&run));
            }
            let mut line = TextLine::new(spans);
            if !line_chars[0].upright {
                line.dir = (0.0, 1.0);
            }
            blocks.push(TextBlock::new(vec![line]));
        }
        Self {
            blocks,
            small_glyph_heights: AtomicUsize::new(0),
            x_tolerance: settings.x_tolerance,
        }
    }

    fn glyph_box(&self, ch: &TextChar, span: &TextSpan) -> BBox {
        if self.small_glyph_heights() {
            ch.bbox
        } else {
            BBox::new(ch.bbox.x0, span.bbox.top, ch.bbox.x1, span.bbox.bottom)
        }
    }
}

fn span_from_run(run: &[&CharObj]) -> TextSpan {
    let size = run.iter().map(|c| c.size).fold(0.0, f64::max);
    let chars = run
        .iter()
        .map(|c| TextChar {
            c: c.text.clone(),
            bbox: c.bbox(),
            origin: c.origin,
        })
        .collect();
    TextSpan::new(
        str_attr(run[0], "fontname"),
        size,
        flags_attr(run[0]),
        chars,
    )
}

impl Default for PageText {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl TextSource for PageText {
    fn blocks(&self, clip: Option<BBox>) -> Vec<TextBlock> {
        let mut out = Vec::new();
        for block in &self.blocks {
            let mut lines = Vec::new();
            for line in &block.lines {
                let mut spans = Vec::new();
                for span in &line.spans {
                    let chars: Vec<TextChar> = span
                        .chars
                        .iter()
                        .map(|ch| TextChar {
                            bbox: self.glyph_box(ch, span),
                            ..ch.clone()
                        })
                        .filter(|ch| clip.is_none_or(|clip| center_in(&ch.bbox, &clip)))
                        .collect();
                    if chars.is_empty() {
                        if clip.is_none() {
                            spans.push(span.clone());
                        }
                        continue;
                    }
                    spans.push(TextSpan::new(
                        span.font.clone(),
                        span.size,
                        span.flags,
                        chars,
                    ));
                }
                if !spans.is_empty() {
                    lines.push(TextLine {
                        dir: line.dir,
                        ..TextLine::new(spans)
                    });
                }
            }
            if !lines.is_empty() {
                out.push(TextBlock::new(lines));
            }
        }
        out
    }

    /// Whitespace-delimited words per line; a horizontal gap wider than the
    /// x tolerance also ends a word.
    fn words(&self, clip: Option<BBox>) -> Vec<WordObj> {
        let mut words = Vec::new();
        for line in self.blocks(clip).iter().flat_map(|b| &b.lines) {
            let upright = line.is_upright();
            let mut current: Vec<&TextChar> = Vec::new();
            let mut flush = |current: &mut Vec<&TextChar>| {
                if let Some(bbox) = BBox::enclosing(current.iter().map(|c| c.bbox)) {
                    words.push(WordObj {
                        text: current.iter().map(|c| c.c.as_str()).collect(),
                        x0: bbox.x0,
                        x1: bbox.x1,
                        top: bbox.top,
                        bottom: bbox.bottom,
                        doctop: bbox.top,
                        width: bbox.width(),
                        height: bbox.height(),
                        upright,
                        direction: if upright { TextDir::Ltr } else { TextDir::Ttb },
                    });
                }
                current.clear();
            };
            for ch in line.spans.iter().flat_map(|s| &s.chars) {
                if ch.c.trim().is_empty() {
                    flush(&mut current);
                    continue;
                }
                if let Some(prev) = current.last()
                    && ch.bbox.x0 - prev.bbox.x1 > self.x_tolerance
                {
                    flush(&mut current);
                }
                current.push(ch);
            }
            flush(&mut current);
        }
        words
    }

    fn chars(&self) -> Vec<CharObj> {
        let mut out = Vec::new();
        for line in self.blocks.iter().flat_map(|b| &b.lines) {
            for span in &line.spans {
                for ch in &span.chars {
                    let bbox = self.glyph_box(ch, span);
                    let mut obj = CharObj::new(ch.c.clone(), bbox, span.size)
                        .with_attr("fontname", span.font.clone())
                        .with_attr("flags", span.flags);
                    obj.origin = ch.origin;
                    obj.upright = line.is_upright();
                    out.push(obj);
                }
            }
        }
        out
    }

    fn small_glyph_heights(&self) -> bool {
        self.small_glyph_heights.load(Ordering::Acquire) > 0
    }

    fn acquire_small_glyph_heights(&self) {
        self.small_glyph_heights.fetch_add(1, Ordering::AcqRel);
    }

    fn release_small_glyph_heights(&self) {
        // Unbalanced releases leave the count at zero
        let _ = self
            .small_glyph_heights
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}

/// Splits collaborator primitives into glyphs and edges.
pub fn split_primitives(
    primitives: impl IntoIterator<Item = Primitive>,
) -> (Vec<CharObj>, Vec<EdgeObj>) {
    let mut chars = Vec::new();
    let mut edges = Vec::new();
    for primitive in primitives {
        match primitive {
            Primitive::Char(c) => chars.push(c),
            Primitive::Edge(e) => edges.push(e),
        }
    }
    (chars, edges)
}

/// Everything one finder run reads: page extent, rotation, glyphs, vector
/// edges and drawings, and the text layer.
pub struct PageGeometry<'t> {
    pub rect: BBox,
    pub rotation: Rotation,
    /// Restricts glyphs (by centre) and edges taken from drawings; the page
    /// rect when unset.
    pub clip: Option<BBox>,
    pub chars: Vec<CharObj>,
    pub edges: Vec<EdgeObj>,
    pub drawings: Vec<Drawing>,
    pub text: &'t dyn TextSource,
}

impl<'t> PageGeometry<'t> {
    /// Glyphs are taken from `text` with small glyph heights on.
    pub fn new(rect: BBox, text: &'t dyn TextSource) -> Self {
        let chars = {
            let _small = SmallGlyphHeights::enable(text);
            text.chars()
        };
        Self {
            rect,
            rotation: Rotation::R0,
            clip: None,
            chars,
            edges: Vec::new(),
            drawings: Vec::new(),
            text,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_edges(mut self, edges: impl IntoIterator<Item = EdgeObj>) -> Self {
        self.edges.extend(edges);
        self
    }

    pub fn with_drawings(mut self, drawings: impl IntoIterator<Item = Drawing>) -> Self {
        self.drawings.extend(drawings);
        self
    }

    pub fn with_clip(mut self, clip: BBox) -> Self {
        self.clip = Some(clip);
        self
    }

    pub fn with_chars(mut self, chars: Vec<CharObj>) -> Self {
        self.chars = chars;
        self
    }

    /// Glyphs whose centre lies in the clip; every glyph when unset.
    pub fn clipped_chars(&self) -> Vec<CharObj> {
        match self.clip {
            Some(clip) => self
                .chars
                .iter()
                .filter(|c| center_in(&c.bbox(), &clip))
                .cloned()
                .collect(),
            None => self.chars.clone(),
        }
    }
}

impl std::fmt::Debug for PageGeometry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageGeometry")
            .field("rect", &self.rect)
            .field("rotation", &self.rotation)
            .field("chars", &self.chars.len())
            .field("clip", &self.clip)
            .field("edges", &self.edges.len())
            .field("drawings", &self.drawings.len())
            .finish_non_exhaustive()
    }
}
