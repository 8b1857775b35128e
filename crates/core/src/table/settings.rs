//! Table settings.
//!
//! [`TableOptions`] is the user-facing, serde-deserializable surface where the
//! per-axis tolerances are optional overrides of a shared value.
//! [`TableOptions::resolve`] turns it into a validated [`TableSettings`], the
//! form every pipeline stage reads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

use super::types::{BBox, EdgeObj, Point, TextDir};

// Default constants
pub(crate) const DEFAULT_SNAP_TOLERANCE: f64 = 3.0;
pub(crate) const DEFAULT_JOIN_TOLERANCE: f64 = 3.0;
pub(crate) const DEFAULT_EDGE_MIN_LENGTH: f64 = 3.0;
pub(crate) const DEFAULT_EDGE_MIN_LENGTH_PREFILTER: f64 = 1.0;
pub(crate) const DEFAULT_MIN_WORDS_VERTICAL: usize = 3;
pub(crate) const DEFAULT_MIN_WORDS_HORIZONTAL: usize = 1;
pub(crate) const DEFAULT_INTERSECTION_TOLERANCE: f64 = 3.0;

pub(crate) const DEFAULT_X_TOLERANCE: f64 = 3.0;
pub(crate) const DEFAULT_Y_TOLERANCE: f64 = 3.0;

/// Edge source policy for one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Every vector edge of the page.
    Lines,
    /// Only edges drawn as true lines (no rectangle or curve borders).
    LinesStrict,
    /// Rules inferred from aligned words.
    Text,
    /// Only caller-supplied lines.
    Explicit,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Lines,
        Strategy::LinesStrict,
        Strategy::Text,
        Strategy::Explicit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Lines => "lines",
            Strategy::LinesStrict => "lines_strict",
            Strategy::Text => "text",
            Strategy::Explicit => "explicit",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Strategy::ALL.iter().map(|s| s.as_str()).collect();
                TableError::Validation(format!(
                    "unknown strategy {s:?}, expected one of {{{}}}",
                    names.join(",")
                ))
            })
    }
}

/// A caller-supplied table rule.
///
/// A bare coordinate spans the whole page; records contribute the edges of
/// the matching orientation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExplicitLine {
    Coord(f64),
    Curve(Vec<Point>),
    Edge(EdgeObj),
    Rect(BBox),
}

/// Word formation settings, used by the `text` strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextSettings {
    pub x_tolerance: f64,
    pub y_tolerance: f64,
    pub x_tolerance_ratio: Option<f64>,
    pub y_tolerance_ratio: Option<f64>,
    pub keep_blank_chars: bool,
    pub use_text_flow: bool,
    pub line_dir: TextDir,
    pub char_dir: TextDir,
    pub line_dir_rotated: TextDir,
    pub char_dir_rotated: TextDir,
    pub split_at_punctuation: String,
    pub expand_ligatures: bool,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            x_tolerance: DEFAULT_X_TOLERANCE,
            y_tolerance: DEFAULT_Y_TOLERANCE,
            x_tolerance_ratio: None,
            y_tolerance_ratio: None,
            keep_blank_chars: false,
            use_text_flow: false,
            line_dir: TextDir::Ttb,
            char_dir: TextDir::Ltr,
            line_dir_rotated: TextDir::Ltr,
            char_dir_rotated: TextDir::Ttb,
            split_at_punctuation: String::new(),
            expand_ligatures: true,
        }
    }
}

/// Validated table finder configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSettings {
    pub vertical_strategy: Strategy,
    pub horizontal_strategy: Strategy,
    pub explicit_vertical_lines: Vec<ExplicitLine>,
    pub explicit_horizontal_lines: Vec<ExplicitLine>,
    pub snap_x_tolerance: f64,
    pub snap_y_tolerance: f64,
    pub join_x_tolerance: f64,
    pub join_y_tolerance: f64,
    pub edge_min_length: f64,
    pub edge_min_length_prefilter: f64,
    pub min_words_vertical: usize,
    pub min_words_horizontal: usize,
    pub intersection_x_tolerance: f64,
    pub intersection_y_tolerance: f64,
    pub text_settings: TextSettings,
    /// Extra line segments to treat as drawn lines.
    pub add_lines: Vec<(Point, Point)>,
    /// Drop tables with a single column or without any text.
    pub drop_sparse_tables: bool,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            vertical_strategy: Strategy::Lines,
            horizontal_strategy: Strategy::Lines,
            explicit_vertical_lines: Vec::new(),
            explicit_horizontal_lines: Vec::new(),
            snap_x_tolerance: DEFAULT_SNAP_TOLERANCE,
            snap_y_tolerance: DEFAULT_SNAP_TOLERANCE,
            join_x_tolerance: DEFAULT_JOIN_TOLERANCE,
            join_y_tolerance: DEFAULT_JOIN_TOLERANCE,
            edge_min_length: DEFAULT_EDGE_MIN_LENGTH,
            edge_min_length_prefilter: DEFAULT_EDGE_MIN_LENGTH_PREFILTER,
            min_words_vertical: DEFAULT_MIN_WORDS_VERTICAL,
            min_words_horizontal: DEFAULT_MIN_WORDS_HORIZONTAL,
            intersection_x_tolerance: DEFAULT_INTERSECTION_TOLERANCE,
            intersection_y_tolerance: DEFAULT_INTERSECTION_TOLERANCE,
            text_settings: TextSettings::default(),
            add_lines: Vec::new(),
            drop_sparse_tables: false,
        }
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    // NaN fails this comparison as well
    if value >= 0.0 {
        Ok(())
    } else {
        Err(TableError::Validation(format!(
            "table setting '{name}' cannot be negative (got {value})"
        )))
    }
}

fn check_explicit(axis: &str, strategy: Strategy, lines: &[ExplicitLine]) -> Result<()> {
    if strategy == Strategy::Explicit && lines.len() < 2 {
        return Err(TableError::Validation(format!(
            "if {axis}_strategy == 'explicit', explicit_{axis}_lines must hold two or more lines (got {})",
            lines.len()
        )));
    }
    Ok(())
}

impl TableSettings {
    /// Fails on negative tolerances and under-specified explicit strategies.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("snap_x_tolerance", self.snap_x_tolerance),
            ("snap_y_tolerance", self.snap_y_tolerance),
            ("join_x_tolerance", self.join_x_tolerance),
            ("join_y_tolerance", self.join_y_tolerance),
            ("edge_min_length", self.edge_min_length),
            ("edge_min_length_prefilter", self.edge_min_length_prefilter),
            ("intersection_x_tolerance", self.intersection_x_tolerance),
            ("intersection_y_tolerance", self.intersection_y_tolerance),
            ("text_x_tolerance", self.text_settings.x_tolerance),
            ("text_y_tolerance", self.text_settings.y_tolerance),
        ] {
            check_non_negative(name, value)?;
        }
        check_explicit(
            "vertical",
            self.vertical_strategy,
            &self.explicit_vertical_lines,
        )?;
        check_explicit(
            "horizontal",
            self.horizontal_strategy,
            &self.explicit_horizontal_lines,
        )?;
        Ok(())
    }

    pub fn uses_text_strategy(&self) -> bool {
        self.vertical_strategy == Strategy::Text || self.horizontal_strategy == Strategy::Text
    }

    pub fn uses_strict_lines(&self) -> bool {
        self.vertical_strategy == Strategy::LinesStrict
            || self.horizontal_strategy == Strategy::LinesStrict
    }
}

/// User-facing options, as accepted from configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableOptions {
    pub vertical_strategy: String,
    pub horizontal_strategy: String,
    /// Shorthand setting both strategies.
    pub strategy: Option<String>,
    pub explicit_vertical_lines: Vec<ExplicitLine>,
    pub explicit_horizontal_lines: Vec<ExplicitLine>,
    pub snap_tolerance: f64,
    pub snap_x_tolerance: Option<f64>,
    pub snap_y_tolerance: Option<f64>,
    pub join_tolerance: f64,
    pub join_x_tolerance: Option<f64>,
    pub join_y_tolerance: Option<f64>,
    pub edge_min_length: f64,
    pub min_words_vertical: usize,
    pub min_words_horizontal: usize,
    pub intersection_tolerance: f64,
    pub intersection_x_tolerance: Option<f64>,
    pub intersection_y_tolerance: Option<f64>,
    pub text_settings: TextSettings,
    pub add_lines: Vec<(Point, Point)>,
    pub drop_sparse_tables: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            vertical_strategy: Strategy::Lines.as_str().to_string(),
            horizontal_strategy: Strategy::Lines.as_str().to_string(),
            strategy: None,
            explicit_vertical_lines: Vec::new(),
            explicit_horizontal_lines: Vec::new(),
            snap_tolerance: DEFAULT_SNAP_TOLERANCE,
            snap_x_tolerance: None,
            snap_y_tolerance: None,
            join_tolerance: DEFAULT_JOIN_TOLERANCE,
            join_x_tolerance: None,
            join_y_tolerance: None,
            edge_min_length: DEFAULT_EDGE_MIN_LENGTH,
            min_words_vertical: DEFAULT_MIN_WORDS_VERTICAL,
            min_words_horizontal: DEFAULT_MIN_WORDS_HORIZONTAL,
            intersection_tolerance: DEFAULT_INTERSECTION_TOLERANCE,
            intersection_x_tolerance: None,
            intersection_y_tolerance: None,
            text_settings: TextSettings::default(),
            add_lines: Vec::new(),
            drop_sparse_tables: false,
        }
    }
}

impl TableOptions {
    /// Applies per-axis fallbacks and validates the result.
    pub fn resolve(&self) -> Result<TableSettings> {
        for (name, value) in [
            ("snap_tolerance", self.snap_tolerance),
            ("join_tolerance", self.join_tolerance),
            ("intersection_tolerance", self.intersection_tolerance),
        ] {
            check_non_negative(name, value)?;
        }

        let (vertical, horizontal) = match &self.strategy {
            Some(both) => (both.as_str(), both.as_str()),
            None => (
                self.vertical_strategy.as_str(),
                self.horizontal_strategy.as_str(),
            ),
        };

        let settings = TableSettings {
            vertical_strategy: vertical.parse()?,
            horizontal_strategy: horizontal.parse()?,
            explicit_vertical_lines: self.explicit_vertical_lines.clone(),
            explicit_horizontal_lines: self.explicit_horizontal_lines.clone(),
            snap_x_tolerance: self.snap_x_tolerance.unwrap_or(self.snap_tolerance),
            snap_y_tolerance: self.snap_y_tolerance.unwrap_or(self.snap_tolerance),
            join_x_tolerance: self.join_x_tolerance.unwrap_or(self.join_tolerance),
            join_y_tolerance: self.join_y_tolerance.unwrap_or(self.join_tolerance),
            edge_min_length: self.edge_min_length,
            edge_min_length_prefilter: DEFAULT_EDGE_MIN_LENGTH_PREFILTER,
            min_words_vertical: self.min_words_vertical,
            min_words_horizontal: self.min_words_horizontal,
            intersection_x_tolerance: self
                .intersection_x_tolerance
                .unwrap_or(self.intersection_tolerance),
            intersection_y_tolerance: self
                .intersection_y_tolerance
                .unwrap_or(self.intersection_tolerance),
            text_settings: self.text_settings.clone(),
            add_lines: self.add_lines.clone(),
            drop_sparse_tables: self.drop_sparse_tables,
        };
        settings.validate()?;
        Ok(settings)
    }
}
