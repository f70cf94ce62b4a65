//! # Spreadsheet reading
//!
//! Opens `.xlsx`/`.xlsm` (OOXML) and `.xls` (BIFF8) workbooks and loads every
//! worksheet into an in-memory [`Sheet`] grid whose cells expose a canonical
//! text form. Formulas are never evaluated; their cached results are used.

pub mod cell;
pub(crate) mod excel;
pub mod reference;
pub mod sheet;
pub(crate) mod xls;
pub(crate) mod xlsx;

pub use cell::Cell;
pub use cell::CellType;
pub use sheet::Sheet;

use crate::error::RustyTableError;
use crate::helpers::reader::UnifiedReader;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use xls::XlsSpreadsheet;
use xlsx::XlsxSpreadsheet;

/// File extensions recognized as workbooks.
pub const WORKBOOK_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Cannot detect file format for '{0}'")]
    InvalidFileFormat(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Spreadsheet '{0}' has no worksheet")]
    SpreadsheetEmptyError(String),

    #[error("Missing part '{0}' in spreadsheet")]
    FileError(String),

    #[error("Shared string index '{3}' out of range at '{0}' sheet '{1}' cell '{2}'")]
    SharedStringIndexError(String, String, String, String),
}

/// Format-specific workbook reader
pub(crate) trait Spreadsheet {
    /// Name used in error messages
    fn name(&self) -> String;

    /// Loads the shared string table
    fn load_shared_strings(&mut self) -> Result<Vec<String>, RustyTableError>;

    /// Reads all worksheets in workbook order
    fn read_sheets(&mut self) -> Result<Vec<Sheet>, RustyTableError>;
}

/// A workbook loaded into memory.
#[derive(Debug)]
pub struct Workbook {
    pub path: PathBuf,
    /// Worksheets in tab order
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Opens a workbook file, choosing the reader by extension.
    pub fn open(path: &Path) -> Result<Workbook, RustyTableError> {
        let reader = UnifiedReader::open(path)?;
        Self::load(path, reader)
    }

    /// Loads a workbook from bytes; `path` only selects the format and names errors.
    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Workbook, RustyTableError> {
        Self::load(path, UnifiedReader::from_bytes(bytes))
    }

    fn load(path: &Path, reader: UnifiedReader) -> Result<Workbook, RustyTableError> {
        let name = path.to_string_lossy().to_string();
        let extension = path
            .extension()
            .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let mut spreadsheet: Box<dyn Spreadsheet> = match extension.as_str() {
            "xlsx" | "xlsm" => Box::new(XlsxSpreadsheet::open(&name, reader)?),
            "xls" => Box::new(XlsSpreadsheet::open(&name, reader)?),
            _ => Err(SpreadsheetError::InvalidFileFormat(name.to_owned()))?,
        };

        let shared_strings = spreadsheet.load_shared_strings()?;
        let mut sheets = spreadsheet.read_sheets()?;
        for sheet in &mut sheets {
            sheet.resolve_shared_strings(&shared_strings).map_err(|(reference, index)| {
                SpreadsheetError::SharedStringIndexError(spreadsheet.name(), sheet.name.to_owned(), reference, index)
            })?;
        }
        Ok(Workbook { path: path.to_path_buf(), sheets })
    }

    /// File stem of the workbook, used as its table name.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_rejected() {
        let error = Workbook::from_bytes(Path::new("notes.csv"), Vec::new()).unwrap_err();
        assert!(matches!(error, RustyTableError::SpreadsheetError(SpreadsheetError::InvalidFileFormat(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error = Workbook::open(Path::new("does/not/exist.xlsx")).unwrap_err();
        assert!(matches!(error, RustyTableError::IoError(_)));
    }
}
