//! findtables - Reconstruct tables from a JSON page dump
//!
//! Reads one page worth of positioned glyphs, edges and vector drawings and
//! prints the tables found on it as JSON.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use tracing::info;

use plumbline_core::table::{
    BBox, Drawing, PageGeometry, PageText, Primitive, Rotation, Table, TableFinder, TableHeader,
    TableOptions, TextBlock, split_primitives,
};

/// Reconstruct tables from a JSON page dump.
#[derive(Parser, Debug)]
#[command(name = "findtables")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Page dump to read
    input: PathBuf,

    /// Output file ("-" for stdout)
    #[arg(short = 'o', long = "outfile", default_value = "-")]
    outfile: String,

    /// JSON file with table options
    #[arg(long)]
    options: Option<PathBuf>,

    /// Strategy for both axes (lines, lines_strict, text, explicit)
    #[arg(short = 's', long)]
    strategy: Option<String>,

    #[arg(long = "vertical-strategy")]
    vertical_strategy: Option<String>,

    #[arg(long = "horizontal-strategy")]
    horizontal_strategy: Option<String>,

    #[arg(long = "snap-tolerance")]
    snap_tolerance: Option<f64>,

    #[arg(long = "join-tolerance")]
    join_tolerance: Option<f64>,

    #[arg(long = "intersection-tolerance")]
    intersection_tolerance: Option<f64>,

    #[arg(long = "edge-min-length")]
    edge_min_length: Option<f64>,

    /// Drop tables with a single column or without text
    #[arg(long = "drop-sparse", action = ArgAction::SetTrue)]
    drop_sparse: bool,

    /// Print only the cell text of each table
    #[arg(short = 't', long = "text-only", action = ArgAction::SetTrue)]
    text_only: bool,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,
}

/// One page as dumped by an upstream parser.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageDump {
    rect: BBox,
    #[serde(default)]
    rotation: Rotation,
    #[serde(default)]
    primitives: Vec<Primitive>,
    #[serde(default)]
    drawings: Vec<Drawing>,
    /// Text hierarchy; rebuilt from the char primitives when absent.
    #[serde(default)]
    blocks: Option<Vec<TextBlock>>,
}

#[derive(Serialize)]
struct TableReport<'a> {
    bbox: BBox,
    row_count: usize,
    col_count: usize,
    header: &'a TableHeader,
    cells: &'a [Vec<Option<String>>],
}

impl<'a> From<&'a Table> for TableReport<'a> {
    fn from(table: &'a Table) -> Self {
        Self {
            bbox: table.bbox,
            row_count: table.row_count(),
            col_count: table.col_count(),
            header: &table.header,
            cells: table.extract(),
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn build_options(args: &Args) -> Result<TableOptions> {
    let mut options: TableOptions = match &args.options {
        Some(path) => read_json(path)?,
        None => TableOptions::default(),
    };
    if let Some(s) = &args.strategy {
        options.strategy = Some(s.clone());
    }
    if let Some(s) = &args.vertical_strategy {
        options.strategy = None;
        options.vertical_strategy = s.clone();
    }
    if let Some(s) = &args.horizontal_strategy {
        options.strategy = None;
        options.horizontal_strategy = s.clone();
    }
    if let Some(v) = args.snap_tolerance {
        options.snap_tolerance = v;
    }
    if let Some(v) = args.join_tolerance {
        options.join_tolerance = v;
    }
    if let Some(v) = args.intersection_tolerance {
        options.intersection_tolerance = v;
    }
    if let Some(v) = args.edge_min_length {
        options.edge_min_length = v;
    }
    if args.drop_sparse {
        options.drop_sparse_tables = true;
    }
    Ok(options)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let options = build_options(&args)?;
    let settings = options.resolve().context("Invalid table options")?;
    let dump: PageDump = read_json(&args.input)?;

    let (chars, edges) = split_primitives(dump.primitives);
    let text = match dump.blocks {
        Some(blocks) => PageText::new(blocks),
        None => PageText::from_chars_with(&chars, &settings.text_settings),
    };
    let mut page = PageGeometry::new(dump.rect, &text)
        .with_rotation(dump.rotation)
        .with_edges(edges)
        .with_drawings(dump.drawings);
    if !chars.is_empty() {
        page = page.with_chars(chars);
    }

    let finder = TableFinder::new(&page, settings)
        .with_context(|| format!("Table detection failed for {}", args.input.display()))?;
    info!(tables = finder.len(), "done");

    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("Failed to create output file {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };

    if args.text_only {
        let grids: Vec<&[Vec<Option<String>>]> = finder.iter().map(Table::extract).collect();
        serde_json::to_writer_pretty(&mut output, &grids)?;
    } else {
        let reports: Vec<TableReport<'_>> = finder.iter().map(TableReport::from).collect();
        serde_json::to_writer_pretty(&mut output, &reports)?;
    }
    writeln!(output)?;
    output.flush()?;
    Ok(())
}
