//! Location cursor carried through discovery and extraction.
//!
//! Every schema, integrity and value error names where it happened as
//! `[table/sheet/column/cell]`, listing only the parts that are known.

use std::fmt::Display;
use thiserror::Error;

/// What kind of rule an addressed error broke.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The sheet layout or header rows are malformed
    Schema,
    /// Keys are duplicated or references dangle
    Integrity,
    /// A cell is empty or does not parse as its declared type
    Value,
}

/// A schema, integrity or value error with its location prefix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{location} - {message}")]
pub struct AddressedError {
    pub kind: ErrorKind,
    /// Formatted address, e.g. `[Item/Item/Rarity/C5]`
    pub location: String,
    pub message: String,
}

/// Mutable `(table, sheet, column, cell)` cursor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableAddress {
    pub table_name: String,
    pub sheet_name: String,
    pub column_name: String,
    pub cell_address: String,
}

impl TableAddress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every field.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Positions the cursor on a sheet, clearing column and cell.
    pub fn enter_sheet(&mut self, table_name: &str, sheet_name: &str) {
        self.table_name = table_name.to_owned();
        self.sheet_name = sheet_name.to_owned();
        self.column_name.clear();
        self.cell_address.clear();
    }

    pub fn set_column(&mut self, column_name: &str) {
        self.column_name = column_name.to_owned();
    }

    pub fn set_cell(&mut self, cell_address: &str) {
        self.cell_address = cell_address.to_owned();
    }

    /// `[a/b/c/d]` over the non-empty fields; `[]` when all are empty.
    pub fn format(&self) -> String {
        let parts: Vec<&str> = [
            self.table_name.as_str(),
            self.sheet_name.as_str(),
            self.column_name.as_str(),
            self.cell_address.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
        format!("[{}]", parts.join("/"))
    }

    /// Builds the error for a broken rule at the current location.
    pub fn error(&self, kind: ErrorKind, message: impl Into<String>) -> AddressedError {
        AddressedError {
            kind,
            location: self.format(),
            message: message.into(),
        }
    }

    /// `Err` of [`TableAddress::error`], for `return address.fail(..)` and `?`.
    pub fn fail<T>(&self, kind: ErrorKind, message: impl Into<String>) -> Result<T, AddressedError> {
        Err(self.error(kind, message))
    }
}

impl Display for TableAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}
