//! Table reconstruction from positioned glyphs and edges.
//!
//! The pipeline runs leaf-first: edges are snapped and merged, crossings
//! become vertices, vertices become cells, corner-sharing cells become
//! tables. Each table then gets rows, cell text and a header.

pub mod clustering;
pub mod drawings;
pub mod edges;
pub mod finder;
pub mod grid;
pub mod header;
pub mod intersections;
pub mod page;
pub mod settings;
pub mod text;
pub mod types;

// Re-export public types
pub use drawings::{Drawing, PathItem};
pub use finder::{Table, TableFinder, find_tables};
pub use grid::CellGroup;
pub use header::TableHeader;
pub use intersections::{EdgeStore, Intersection, Intersections};
pub use page::{
    PageGeometry, PageText, SmallGlyphHeights, TextBlock, TextChar, TextLine, TextSource,
    TextSpan, split_primitives,
};
pub use settings::{ExplicitLine, Strategy, TableOptions, TableSettings, TextSettings};
pub use types::{
    BBox, CharObj, EdgeKind, EdgeObj, HEdgeId, Orientation, Point, Primitive, Rotation, TextDir,
    VEdgeId, WordObj,
};
