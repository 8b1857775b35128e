//! Table extraction types.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

pub type Point = (f64, f64);

// Key types for ordered float maps
pub type KeyF64 = OrderedFloat<f64>;
pub type KeyPoint = (KeyF64, KeyF64);

pub(crate) fn key_f64(v: f64) -> KeyF64 {
    OrderedFloat(v)
}

pub(crate) const fn key_point(x: f64, y: f64) -> KeyPoint {
    (OrderedFloat(x), OrderedFloat(y))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Where an edge came from.
///
/// `lines_strict` keeps only [`EdgeKind::Line`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    #[default]
    Line,
    RectEdge,
    CurveEdge,
    WordEdge,
    Explicit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextDir {
    Ttb,
    Btt,
    Ltr,
    Rtl,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub const fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Area, zero for degenerate or inverted boxes.
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    /// A box without positive area in both dimensions.
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.top >= self.bottom
    }

    /// Area of the intersection of two boxes.
    pub fn overlap_area(&self, other: &BBox) -> f64 {
        let w = self.x1.min(other.x1) - self.x0.max(other.x0);
        let h = self.bottom.min(other.bottom) - self.top.max(other.top);
        if w <= 0.0 || h <= 0.0 { 0.0 } else { w * h }
    }

    /// True if the boxes share a region of positive area.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.overlap_area(other) > 0.0
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Smallest box holding every box in `boxes`; `None` when there are none.
    pub fn enclosing<I: IntoIterator<Item = BBox>>(boxes: I) -> Option<BBox> {
        boxes.into_iter().reduce(|acc, b| acc.union(&b))
    }

    pub(crate) fn corners(&self) -> [KeyPoint; 4] {
        [
            key_point(self.x0, self.top),
            key_point(self.x0, self.bottom),
            key_point(self.x1, self.top),
            key_point(self.x1, self.bottom),
        ]
    }
}

/// Pass-through metadata the table code never interprets (font name, colors, span flags).
pub type Attrs = BTreeMap<String, serde_json::Value>;

/// A single rendered glyph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharObj {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
    pub doctop: f64,
    pub width: f64,
    pub height: f64,
    pub size: f64,
    #[serde(default = "default_true")]
    pub upright: bool,
    #[serde(default)]
    pub origin: Point,
    #[serde(default)]
    pub page_number: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: Attrs,
}

fn default_true() -> bool {
    true
}

impl CharObj {
    /// An upright glyph on the first page, baseline at the box bottom.
    pub fn new(text: impl Into<String>, bbox: BBox, size: f64) -> Self {
        Self {
            text: text.into(),
            x0: bbox.x0,
            x1: bbox.x1,
            top: bbox.top,
            bottom: bbox.bottom,
            doctop: bbox.top,
            width: bbox.width(),
            height: bbox.height(),
            size,
            upright: true,
            origin: (bbox.x0, bbox.bottom),
            page_number: 1,
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.top, self.x1, self.bottom)
    }
}

/// An axis-aligned segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeObj {
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub doctop: f64,
    pub orientation: Option<Orientation>,
    #[serde(default)]
    pub kind: EdgeKind,
    #[serde(default)]
    pub page_number: usize,
}

impl EdgeObj {
    pub fn horizontal(y: f64, x0: f64, x1: f64, kind: EdgeKind) -> Self {
        Self {
            x0,
            x1,
            top: y,
            bottom: y,
            width: x1 - x0,
            height: 0.0,
            doctop: y,
            orientation: Some(Orientation::Horizontal),
            kind,
            page_number: 0,
        }
    }

    pub fn vertical(x: f64, top: f64, bottom: f64, kind: EdgeKind) -> Self {
        Self {
            x0: x,
            x1: x,
            top,
            bottom,
            width: 0.0,
            height: bottom - top,
            doctop: top,
            orientation: Some(Orientation::Vertical),
            kind,
            page_number: 0,
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.top, self.x1, self.bottom)
    }

    /// Extent along the edge's own orientation.
    pub fn length(&self) -> f64 {
        if self.orientation == Some(Orientation::Vertical) {
            self.height
        } else {
            self.width
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordObj {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
    pub doctop: f64,
    pub width: f64,
    pub height: f64,
    pub upright: bool,
    pub direction: TextDir,
}

impl WordObj {
    pub fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.top, self.x1, self.bottom)
    }
}

/// The closed set of primitives a page collaborator hands over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    Char(CharObj),
    Edge(EdgeObj),
}

/// Page rotation in degrees, clockwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

/// Which cell coordinate drives an ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// The cell's left edge.
    X,
    /// The cell's top edge.
    Y,
}

impl Axis {
    pub fn key(self, cell: &BBox) -> f64 {
        match self {
            Axis::X => cell.x0,
            Axis::Y => cell.top,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn sign(self) -> f64 {
        match self {
            SortOrder::Ascending => 1.0,
            SortOrder::Descending => -1.0,
        }
    }
}

/// How cells are assembled into rows for one page rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowLayout {
    pub row_key: Axis,
    pub col_key: Axis,
    pub row_order: SortOrder,
    pub col_order: SortOrder,
}

const LAYOUT_R0: RowLayout = RowLayout {
    row_key: Axis::Y,
    col_key: Axis::X,
    row_order: SortOrder::Ascending,
    col_order: SortOrder::Ascending,
};
const LAYOUT_R90: RowLayout = RowLayout {
    row_key: Axis::X,
    col_key: Axis::Y,
    row_order: SortOrder::Ascending,
    col_order: SortOrder::Descending,
};
const LAYOUT_R180: RowLayout = RowLayout {
    row_key: Axis::Y,
    col_key: Axis::X,
    row_order: SortOrder::Descending,
    col_order: SortOrder::Descending,
};
const LAYOUT_R270: RowLayout = RowLayout {
    row_key: Axis::X,
    col_key: Axis::Y,
    row_order: SortOrder::Descending,
    col_order: SortOrder::Ascending,
};

impl Rotation {
    pub const fn row_layout(self) -> RowLayout {
        match self {
            Rotation::R0 => LAYOUT_R0,
            Rotation::R90 => LAYOUT_R90,
            Rotation::R180 => LAYOUT_R180,
            Rotation::R270 => LAYOUT_R270,
        }
    }

    pub const fn degrees(self) -> i32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Normalizes any multiple of 90 (negative values included).
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::R0),
            90 => Ok(Rotation::R90),
            180 => Ok(Rotation::R180),
            270 => Ok(Rotation::R270),
            _ => Err(TableError::Validation(format!(
                "page rotation must be a multiple of 90, got {degrees}"
            ))),
        }
    }
}

impl TryFrom<i32> for Rotation {
    type Error = TableError;

    fn try_from(degrees: i32) -> Result<Self> {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> i32 {
        rotation.degrees()
    }
}

// Internal ID types for efficient indexing
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub struct VEdgeId(pub usize);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub struct HEdgeId(pub usize);
