//! Option parsing, validation and index errors.

use plumbline_core::table::{
    BBox, ExplicitLine, PageGeometry, PageText, Strategy, TableOptions, find_tables,
};
use plumbline_core::{Result, TableError};

fn empty_page_finder(options: &TableOptions) -> Result<plumbline_core::TableFinder> {
    let text = PageText::default();
    let page = PageGeometry::new(BBox::new(0.0, 0.0, 100.0, 100.0), &text);
    find_tables(&page, options)
}

#[test]
fn test_negative_tolerance_fails_before_detection() {
    let options = TableOptions {
        snap_tolerance: -0.5,
        ..Default::default()
    };
    let err = empty_page_finder(&options).unwrap_err();
    assert!(matches!(err, TableError::Validation(_)));
    assert!(err.to_string().contains("snap_tolerance"));
}

#[test]
fn test_unknown_strategy_is_rejected() {
    let options = TableOptions {
        vertical_strategy: "grid".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        options.resolve(),
        Err(TableError::Validation(_))
    ));
}

#[test]
fn test_explicit_strategy_requires_two_lines() {
    let options = TableOptions {
        horizontal_strategy: "explicit".to_string(),
        explicit_horizontal_lines: vec![ExplicitLine::Coord(10.0)],
        ..Default::default()
    };
    let err = options.resolve().unwrap_err();
    assert!(err.to_string().contains("explicit_horizontal_lines"));
}

#[test]
fn test_options_from_json() {
    let options: TableOptions = serde_json::from_str(
        r#"{
            "strategy": "lines_strict",
            "snap_tolerance": 2.0,
            "snap_y_tolerance": 1.0,
            "explicit_vertical_lines": [
                12.5,
                {"x0": 0.0, "top": 0.0, "x1": 10.0, "bottom": 10.0},
                [[0.0, 0.0], [0.0, 30.0]]
            ],
            "text_settings": {"x_tolerance": 1.5},
            "drop_sparse_tables": true
        }"#,
    )
    .unwrap();
    let settings = options.resolve().unwrap();
    assert_eq!(settings.vertical_strategy, Strategy::LinesStrict);
    assert_eq!(settings.horizontal_strategy, Strategy::LinesStrict);
    assert_eq!(settings.snap_x_tolerance, 2.0);
    assert_eq!(settings.snap_y_tolerance, 1.0);
    assert_eq!(settings.text_settings.x_tolerance, 1.5);
    assert!(settings.drop_sparse_tables);
    assert_eq!(
        settings.explicit_vertical_lines,
        vec![
            ExplicitLine::Coord(12.5),
            ExplicitLine::Rect(BBox::new(0.0, 0.0, 10.0, 10.0)),
            ExplicitLine::Curve(vec![(0.0, 0.0), (0.0, 30.0)]),
        ]
    );
}

#[test]
fn test_unknown_option_keys_are_rejected() {
    let parsed: serde_json::Result<TableOptions> =
        serde_json::from_str(r#"{"snap_tolerence": 2.0}"#);
    assert!(parsed.is_err());
    let parsed: serde_json::Result<TableOptions> =
        serde_json::from_str(r#"{"text_settings": {"tolerance": 2.0}}"#);
    assert!(parsed.is_err());
}

#[test]
fn test_index_out_of_range() {
    let finder = empty_page_finder(&TableOptions::default()).unwrap();
    assert!(finder.is_empty());
    assert_eq!(
        finder.get(0).unwrap_err(),
        TableError::Index { index: 0, count: 0 }
    );
    assert_eq!(
        finder.get(-1).unwrap_err(),
        TableError::Index {
            index: -1,
            count: 0
        }
    );
}
