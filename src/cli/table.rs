//! Rendering of a BOM table for the terminal
//!
//! CSV and JSON are the export artifacts as-is, so piping `bomx extract`
//! gives exactly the bytes that `--csv`/`--json` would write.
//!
//! # Text Wrapping
//!
//! - Use `TableConfig::with_wrap(width)` to enable word-wrapped multi-line rows
//! - CSV and JSON stay single-line per record
//! - TSV wraps text cells; other formats truncate nothing

use console::style;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::truncate_str;
use crate::cli::OutputFormat;
use crate::core::{BomTable, Cell, ExportKind, Extraction, Presentation};

/// Widest a TSV column grows before truncating
const MAX_COLUMN_WIDTH: usize = 48;

/// Configuration for table output
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Maximum width for text columns before wrapping (None = truncate instead)
    pub wrap_width: Option<usize>,
    /// Show summary line after table (e.g., "5 part(s), total quantity 12")
    pub show_summary: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            wrap_width: None,
            show_summary: true,
        }
    }
}

impl TableConfig {
    /// Create config with text wrapping enabled at the specified width
    pub fn with_wrap(width: usize) -> Self {
        Self {
            wrap_width: Some(width),
            show_summary: true,
        }
    }

    /// Create config optimized for piping (no wrapping, no summary)
    pub fn for_pipe() -> Self {
        Self {
            wrap_width: None,
            show_summary: false,
        }
    }
}

/// Wrap text to fit within a maximum width, breaking at word boundaries
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if text.chars().count() <= max_width || max_width < 5 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();

        if !current.is_empty() && current_len + 1 + word_len <= max_width {
            current.push(' ');
            current.push_str(word);
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        // Force-break words longer than a line
        let chars: Vec<char> = word.chars().collect();
        let mut chunks = chars.chunks(max_width).peekable();
        while let Some(chunk) = chunks.next() {
            let piece: String = chunk.iter().collect();
            if chunks.peek().is_some() {
                lines.push(piece);
            } else {
                current = piece;
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Cell formatting per output format
trait CellFormat {
    fn format_tsv(&self, width: usize) -> String;
    fn format_md(&self) -> String;
    fn display_width(&self) -> usize;
}

impl CellFormat for Cell {
    fn format_tsv(&self, width: usize) -> String {
        match self {
            Cell::Text(s) => {
                format!("{:<width$}", truncate_str(s, width.saturating_sub(2)), width = width)
            }
            Cell::Number(n) => format!("{:<width$}", style(n).cyan(), width = width),
            Cell::Flag(true) => format!("{:<width$}", style("yes").green(), width = width),
            Cell::Flag(false) => format!("{:<width$}", style("no").dim(), width = width),
            Cell::Json(s) => format!(
                "{:<width$}",
                style(truncate_str(s, width.saturating_sub(2))).dim(),
                width = width
            ),
            Cell::Empty => format!("{:<width$}", style("-").dim(), width = width),
        }
    }

    fn format_md(&self) -> String {
        match self {
            Cell::Empty => "-".to_string(),
            other => other.text().replace('|', "\\|").replace('\n', " "),
        }
    }

    fn display_width(&self) -> usize {
        match self {
            Cell::Empty => 1,
            Cell::Flag(_) => 3,
            other => other.text().chars().count(),
        }
    }
}

/// Renders an extraction in the requested format
pub struct TableFormatter {
    config: TableConfig,
}

impl TableFormatter {
    pub fn new(config: TableConfig) -> Self {
        Self { config }
    }

    /// Full output for `format`; empty for a result with no parts
    pub fn render(&self, extraction: &Extraction, format: OutputFormat) -> String {
        let table = match &extraction.presentation {
            Presentation::NoData => return String::new(),
            Presentation::Table { table, .. } => table,
        };

        let body = match format {
            OutputFormat::Csv => export_text(extraction, ExportKind::Csv),
            OutputFormat::Json => {
                let mut json = export_text(extraction, ExportKind::Json);
                json.push('\n');
                json
            }
            OutputFormat::Md => self.render_md(table),
            OutputFormat::Tsv => self.render_tsv(table),
            OutputFormat::Table | OutputFormat::Auto => self.render_boxed(table),
        };

        if self.config.show_summary && matches!(format, OutputFormat::Tsv | OutputFormat::Table) {
            let total = extraction
                .result
                .total_quantity()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "n/a".to_string());
            format!(
                "{}\n{} part(s), total quantity {}\n",
                body,
                style(extraction.result.len()).cyan(),
                style(total).cyan()
            )
        } else {
            body
        }
    }

    /// Print the rendered output to stdout
    pub fn output(&self, extraction: &Extraction, format: OutputFormat) {
        print!("{}", self.render(extraction, format));
    }

    fn render_boxed(&self, table: &BomTable) -> String {
        let mut builder = Builder::default();
        builder.push_record(table.columns().iter().map(String::as_str));
        for row in table.rows() {
            builder.push_record(row.iter().map(|cell| {
                let text = cell.text();
                match self.config.wrap_width {
                    Some(width) => wrap_text(&text, width).join("\n"),
                    None => text,
                }
            }));
        }
        let mut rendered = builder.build();
        rendered.with(Style::rounded());
        format!("{}\n", rendered)
    }

    /// Dynamic column widths: header or content plus padding, capped
    fn calculate_widths(&self, table: &BomTable) -> Vec<usize> {
        table
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let max_content = table
                    .rows()
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.display_width())
                    .max()
                    .unwrap_or(0);
                header
                    .chars()
                    .count()
                    .max(max_content.saturating_add(2))
                    .min(MAX_COLUMN_WIDTH)
            })
            .collect()
    }

    fn render_tsv(&self, table: &BomTable) -> String {
        let widths = self.calculate_widths(table);
        let mut out = String::new();

        let header: Vec<String> = table
            .columns()
            .iter()
            .zip(&widths)
            .map(|(col, w)| format!("{:<w$}", style(col.to_uppercase()).bold(), w = *w))
            .collect();
        out.push_str(header.join(" ").trim_end());
        out.push('\n');

        let total_width: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
        out.push_str(&"-".repeat(total_width));
        out.push('\n');

        for row in table.rows() {
            match self.config.wrap_width {
                Some(wrap) => out.push_str(&tsv_row_wrapped(row, &widths, wrap)),
                None => {
                    let parts: Vec<String> = row
                        .iter()
                        .zip(&widths)
                        .map(|(cell, w)| cell.format_tsv(*w))
                        .collect();
                    out.push_str(parts.join(" ").trim_end());
                    out.push('\n');
                }
            }
        }
        out
    }

    fn render_md(&self, table: &BomTable) -> String {
        let mut out = String::new();
        out.push_str(&format!("| {} |\n", table.columns().join(" | ")));
        let separators: Vec<&str> = table.columns().iter().map(|_| "---").collect();
        out.push_str(&format!("|{}|\n", separators.join("|")));
        for row in table.rows() {
            let values: Vec<String> = row.iter().map(CellFormat::format_md).collect();
            out.push_str(&format!("| {} |\n", values.join(" | ")));
        }
        out
    }
}

fn tsv_row_wrapped(row: &[Cell], widths: &[usize], wrap_width: usize) -> String {
    let wrapped: Vec<Vec<String>> = row
        .iter()
        .map(|cell| match cell {
            Cell::Text(s) => wrap_text(s, wrap_width),
            Cell::Empty => vec!["-".to_string()],
            other => vec![other.text()],
        })
        .collect();
    let max_lines = wrapped.iter().map(Vec::len).max().unwrap_or(1);

    let mut out = String::new();
    for line_idx in 0..max_lines {
        let parts: Vec<String> = wrapped
            .iter()
            .enumerate()
            .map(|(col, lines)| {
                let width = widths.get(col).copied().unwrap_or(10).max(wrap_width.min(MAX_COLUMN_WIDTH));
                let content = lines.get(line_idx).map(String::as_str).unwrap_or("");
                format!("{:<width$}", content, width = width)
            })
            .collect();
        out.push_str(parts.join(" ").trim_end());
        out.push('\n');
    }
    if max_lines > 1 {
        out.push('\n');
    }
    out
}

fn export_text(extraction: &Extraction, kind: ExportKind) -> String {
    extraction
        .export(kind)
        .map(|artifact| artifact.as_text().into_owned())
        .unwrap_or_default()
}
