//! The tabular batch handed over by the host after file parsing.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::ImportKind;

/// A single uploaded cell.
///
/// Deserializes from JSON `null`, a string or a number, in that order, so
/// that employee numbers such as `"001"` keep their leading zeros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// No value.
    Empty,
    /// A text value.
    Text(String),
    /// A numeric value.
    Number(Decimal),
}

impl Cell {
    /// Returns true for an empty cell or whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Coerces the cell to a decimal; text is trimmed and parsed.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Cell::Empty => None,
            Cell::Number(value) => Some(*value),
            Cell::Text(text) => {
                let text = text.trim();
                Decimal::from_str(text)
                    .or_else(|_| Decimal::from_scientific(text))
                    .ok()
            }
        }
    }

    /// Returns the trimmed text of a non-blank cell; numbers are rendered
    /// without trailing zeros.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(value) => Some(value.normalize().to_string()),
            Cell::Text(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
        }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.to_string())
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Number(value)
    }
}

/// One uploaded row, keyed by column header.
pub type Row = BTreeMap<String, Cell>;

/// Renames uploaded headers to the configured ones before validation.
pub type ColumnMapping = BTreeMap<String, String>;

static EMPTY: Cell = Cell::Empty;

/// A batch of named-column rows with its declared import kind.
///
/// Cells missing from a row read as [`Cell::Empty`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularBatch {
    /// The declared import kind.
    pub kind: ImportKind,
    /// Column headers in upload order.
    pub columns: Vec<String>,
    /// The rows.
    pub rows: Vec<Row>,
}

impl TabularBatch {
    /// Creates a batch whose columns are the union of the rows' keys.
    pub fn from_rows(kind: ImportKind, rows: Vec<Row>) -> Self {
        let columns: BTreeSet<String> = rows.iter().flat_map(|row| row.keys().cloned()).collect();
        Self {
            kind,
            columns: columns.into_iter().collect(),
            rows,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true if the batch declares `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Returns the cell of `row` under `column`.
    pub fn cell<'a>(row: &'a Row, column: &str) -> &'a Cell {
        row.get(column).unwrap_or(&EMPTY)
    }
}
