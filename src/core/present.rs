//! Tabular projection of a BOM and its CSV/JSON exports
//!
//! Columns are the expected BOM fields followed by any extra keys in the
//! order they first appear. Records missing a column get an empty cell.

use serde_json::Value;

use crate::core::bom::{BomResult, EXPECTED_FIELDS};
use crate::core::error::BomError;

/// A single table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(String),
    Flag(bool),
    /// Nested array/object, rendered as compact JSON
    Json(String),
    /// Missing key or JSON null
    Empty,
}

impl Cell {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Cell::Empty,
            Some(Value::String(s)) => Cell::Text(s.clone()),
            Some(Value::Number(n)) => Cell::Number(n.to_string()),
            Some(Value::Bool(b)) => Cell::Flag(*b),
            Some(nested) => Cell::Json(nested.to_string()),
        }
    }

    /// Plain text as written to CSV
    pub fn text(&self) -> String {
        match self {
            Cell::Text(s) | Cell::Number(s) | Cell::Json(s) => s.clone(),
            Cell::Flag(b) => b.to_string(),
            Cell::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// Rectangular view over a BOM
#[derive(Debug, Clone, PartialEq)]
pub struct BomTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl BomTable {
    pub fn from_result(result: &BomResult) -> Self {
        let mut columns: Vec<String> = EXPECTED_FIELDS.iter().map(|f| f.to_string()).collect();
        for part in result.parts() {
            for key in part.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.to_string());
                }
            }
        }

        let rows = result
            .parts()
            .iter()
            .map(|part| {
                columns
                    .iter()
                    .map(|col| Cell::from_value(part.get(col)))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Cell at `row` for the named column
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// UTF-8 CSV: header row, one row per record, no index column
    pub fn to_csv(&self) -> Result<Vec<u8>, BomError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&self.columns)
            .map_err(|e| BomError::Export(e.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(Cell::text))
                .map_err(|e| BomError::Export(e.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| BomError::Export(e.to_string()))
    }
}

/// A downloadable file produced from the current result
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub file_name: &'static str,
    pub mime: &'static str,
    pub data: Vec<u8>,
}

impl ExportArtifact {
    pub const CSV_FILE: &'static str = "bom.csv";
    pub const JSON_FILE: &'static str = "bom.json";

    /// The data as text (both exports are UTF-8)
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// What to show for a result
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    /// Valid but empty result; no table and no exports
    NoData,
    Table {
        table: BomTable,
        csv: ExportArtifact,
        json: ExportArtifact,
    },
}

/// Pretty-printed JSON array, two-space indentation
pub fn to_json(result: &BomResult) -> Result<String, BomError> {
    serde_json::to_string_pretty(result).map_err(|e| BomError::Export(e.to_string()))
}

/// Build the table and both exports, or `NoData` for an empty result
pub fn present(result: &BomResult) -> Result<Presentation, BomError> {
    if result.is_empty() {
        return Ok(Presentation::NoData);
    }

    let table = BomTable::from_result(result);
    let csv = ExportArtifact {
        file_name: ExportArtifact::CSV_FILE,
        mime: "text/csv",
        data: table.to_csv()?,
    };
    let json = ExportArtifact {
        file_name: ExportArtifact::JSON_FILE,
        mime: "application/json",
        data: to_json(result)?.into_bytes(),
    };

    Ok(Presentation::Table { table, csv, json })
}
