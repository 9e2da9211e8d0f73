//! Box-drawn table layout for assembled line records.
//!
//! # Responsibility
//! - Lay out line records as fixed-width columns with box borders.
//! - Negotiate column widths and collapse the label column on overflow.
//!
//! # Invariants
//! - Column order: labels, header flag, running text (right-aligned),
//!   numeral text, values.
//! - Widths are measured in terminal display columns, header row included.
//! - The label column collapses to its trailing `:<digits>` fragment when
//!   `hide_identifier_detail` is set or the non-final widths sum past
//!   [`COLLAPSE_THRESHOLD`].
//! - Rendering is pure: options travel as a parameter, never global state.

use crate::model::uid::SpanDimension;
use crate::service::line_assembler::{LineRecord, LABEL_WIDTH};
use console::Style;
use once_cell::sync::Lazy;
use regex::Regex;

/// Largest allowed sum of all column widths except the last.
pub const COLLAPSE_THRESHOLD: usize = 70;
/// Minimum width of the collapsed label column.
pub const COLLAPSED_LABEL_WIDTH: usize = 5;

const FLAG_HEADER: &str = "  ";
const TEXT_HEADER: &str = "TEXT ";
const NUMERAL_HEADER: &str = "NUMERAL ";
const VALUE_HEADER: &str = "VALUE(S)";
const COLLAPSED_LABEL_HEADER: &str = "LINE ";

static LINE_FRAGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":[0-9]+").expect("valid line fragment regex"));

/// Line decorator applied to every rendered line.
pub type LineDecorator<'a> = &'a dyn Fn(&str) -> String;

/// Table rendering options.
#[derive(Clone, Copy)]
pub struct RenderOptions<'a> {
    /// Always collapse the label column to the line fragment.
    pub hide_identifier_detail: bool,
    /// Render only the first `head` records.
    pub head: Option<usize>,
    pub decorator: Option<LineDecorator<'a>>,
}

impl Default for RenderOptions<'_> {
    fn default() -> Self {
        Self {
            hide_identifier_detail: true,
            head: None,
            decorator: None,
        }
    }
}

impl std::fmt::Debug for RenderOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("hide_identifier_detail", &self.hide_identifier_detail)
            .field("head", &self.head)
            .field("decorator", &self.decorator.is_some())
            .finish()
    }
}

/// Label header: dimension names, each padded to the label width.
pub fn label_header() -> String {
    SpanDimension::ALL
        .iter()
        .map(|dimension| format!("{:<width$}", dimension.label(), width = LABEL_WIDTH))
        .collect()
}

/// Renders line records as table lines. Returns no lines for no records.
pub fn render_table(records: &[LineRecord], options: &RenderOptions<'_>) -> Vec<String> {
    if records.is_empty() {
        return Vec::new();
    }

    let shown = options.head.map_or(records.len(), |head| head.min(records.len()));
    let mut rows: Vec<[String; 5]> = Vec::with_capacity(shown + 1);
    rows.push([
        label_header(),
        FLAG_HEADER.to_string(),
        TEXT_HEADER.to_string(),
        NUMERAL_HEADER.to_string(),
        VALUE_HEADER.to_string(),
    ]);
    rows.extend(records[..shown].iter().map(|record| {
        [
            record.label_cell(),
            record.flag_cell().to_string(),
            record.text.clone(),
            record.numeral.clone(),
            record.value.clone(),
        ]
    }));

    let mut widths = column_widths(&rows);
    if options.hide_identifier_detail || collapses(&widths) {
        for row in rows.iter_mut().skip(1) {
            row[0] = line_fragment(&row[0]);
        }
        rows[0][0] = COLLAPSED_LABEL_HEADER.to_string();
        widths[0] = rows
            .iter()
            .map(|row| display_width(&row[0]))
            .max()
            .unwrap_or(0)
            .max(COLLAPSED_LABEL_WIDTH);
    }

    let emphasis = Style::new().bold().force_styling(true);
    let mut lines = Vec::with_capacity(rows.len() + 3);
    lines.push(emphasis.apply_to(border(&widths, '┌', '┬', '┐')).to_string());
    lines.push(emphasis.apply_to(row_line(&rows[0], &widths)).to_string());
    lines.push(emphasis.apply_to(border(&widths, '├', '┼', '┤')).to_string());
    for row in &rows[1..] {
        lines.push(row_line(row, &widths));
    }
    lines.push(border(&widths, '└', '┴', '┘'));

    match options.decorator {
        Some(decorate) => lines.iter().map(|line| decorate(line.as_str())).collect(),
        None => lines,
    }
}

/// Whether the non-final column widths exceed the collapse threshold.
pub fn collapses(widths: &[usize]) -> bool {
    let Some((_, leading)) = widths.split_last() else {
        return false;
    };
    leading.iter().sum::<usize>() > COLLAPSE_THRESHOLD
}

fn column_widths(rows: &[[String; 5]]) -> Vec<usize> {
    (0..5)
        .map(|column| {
            rows.iter()
                .map(|row| display_width(&row[column]))
                .max()
                .unwrap_or(0)
        })
        .collect()
}

fn line_fragment(cell: &str) -> String {
    LINE_FRAGMENT_RE
        .find_iter(cell)
        .last()
        .map(|found| found.as_str().to_string())
        .unwrap_or_default()
}

fn display_width(value: &str) -> usize {
    console::measure_text_width(value)
}

fn border(widths: &[usize], left: char, join: char, right: char) -> String {
    let segments: Vec<String> = widths.iter().map(|width| "─".repeat(width + 1)).collect();
    format!("{left}{}{right}", segments.join(&join.to_string()))
}

fn row_line(cells: &[String; 5], widths: &[usize]) -> String {
    let mut line = String::from("│");
    for (column, (cell, width)) in cells.iter().zip(widths).enumerate() {
        let padding = " ".repeat(width.saturating_sub(display_width(cell)));
        line.push(' ');
        if column == 2 {
            line.push_str(&padding);
            line.push_str(cell);
        } else {
            line.push_str(cell);
            line.push_str(&padding);
        }
        line.push('│');
    }
    line
}
