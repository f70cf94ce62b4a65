//! # Sheet schemas
//!
//! A data sheet describes itself in its first four rows:
//!
//! | row | content                                                         |
//! |-----|-----------------------------------------------------------------|
//! | 0   | sheet name in column 1, `@` markers bounding the property columns |
//! | 1   | property descriptions                                           |
//! | 2   | property names (`pkey`, `name[Table]` foreign keys)              |
//! | 3   | property types, resolved through the [`TypeAliasMap`]          |
//!
//! Data rows start at row 4 and carry `@` in the first marker column; the
//! last `@` row closes the block. Column 0 is reserved.

pub mod discovery;
pub mod property;

pub use discovery::CollectedSchemas;
pub use discovery::SchemaCollector;
pub use property::PropertyType;
pub use property::TypeAliasMap;

use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::Sheet;

/// First grid row holding data.
pub const DATA_START_ROW: usize = 4;
/// Row of the sheet name and range markers.
pub const NAME_ROW: usize = 0;
pub const DESCRIPTION_ROW: usize = 1;
pub const PROPERTY_NAME_ROW: usize = 2;
pub const PROPERTY_TYPE_ROW: usize = 3;
/// Grid column holding the sheet name.
pub const NAME_COL: usize = 1;
/// Character marking the column range and the data rows.
pub const RANGE_MARKER: char = '@';

/// A property column that must reference a key of another sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKey {
    /// Property index (0-based, grid column minus one)
    pub column: usize,
    /// Sheet name whose primary keys the values must match
    pub referenced_table: String,
}

/// Structural description of one data sheet, plus the grid it came from.
#[derive(Clone, Debug)]
pub struct SheetSchema {
    /// Workbook file stem
    pub table_name: String,
    /// Name from the header cell; names the output file and generated class
    pub sheet_name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub property_names: Vec<String>,
    pub property_types: Vec<PropertyType>,
    pub property_descriptions: Vec<String>,
    pub primary_key: Option<usize>,
    pub foreign_keys: Vec<ForeignKey>,
    pub sheet: Sheet,
}

impl SheetSchema {
    /// Grid row of a data row index.
    pub fn grid_row(row: usize) -> usize {
        DATA_START_ROW + row
    }

    /// Grid column of a property index.
    pub fn grid_col(property: usize) -> usize {
        property + 1
    }

    /// Canonical text of a data cell.
    pub fn text(&self, row: usize, property: usize) -> String {
        self.sheet.text(Self::grid_row(row), Self::grid_col(property))
    }

    /// A1 reference of a data cell.
    pub fn reference(&self, row: usize, property: usize) -> String {
        index_to_reference(Self::grid_row(row), Self::grid_col(property))
    }

    pub fn is_primary_key(&self, property: usize) -> bool {
        self.primary_key == Some(property)
    }

    /// Indexes of the properties that are not the primary key.
    pub fn value_properties(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.property_names.len()).filter(move |property| !self.is_primary_key(*property))
    }
}
