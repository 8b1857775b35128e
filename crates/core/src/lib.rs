//! plumbline - table reconstruction from positioned page primitives.
//!
//! Given the glyphs and vector edges of one page, [`table::TableFinder`]
//! recovers the grid of every ruled (or text-aligned) table along with its
//! cell text and header.

pub mod error;
pub mod table;

pub use error::{Result, TableError};
pub use table::{
    BBox, PageGeometry, PageText, Table, TableFinder, TableOptions, TableSettings, find_tables,
};
