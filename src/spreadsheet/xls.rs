use crate::error::ResultOptionChain;
use crate::error::RustyTableError;
use crate::helpers::biff8::Biff8Reader;
use crate::helpers::cfb::Cfb;
use crate::helpers::reader::UnifiedReader;
use crate::match_biff8_record;
use crate::spreadsheet::cell::to_error_value;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::excel::load_number_formats;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use either::Either;
use std::collections::HashMap;
use thiserror::Error;

// BIFF8 record types
const FORMULA: u16 = 6;
const EOF: u16 = 10;
const DATE1904: u16 = 34;
const FILE_PASS: u16 = 47;
const CODE_PAGE: u16 = 66;
const BOUND_SHEET8: u16 = 133;
const MUL_RK: u16 = 189;
const XF: u16 = 224;
const SST: u16 = 252;
const LABEL_SST: u16 = 253;
const NUMBER: u16 = 515;
const LABEL: u16 = 516;
const BOOL_ERR: u16 = 517;
const STRING: u16 = 519; // Cached text result following a FORMULA record
const RK: u16 = 638;
const FORMAT: u16 = 1054;
const BOF: u16 = 2057;

#[derive(Error, Debug)]
pub enum XlsError {
    #[error("Invalid Code page '{0}'")]
    CodePageError(u16),

    #[error("Invalid Formula value '{0}'")]
    FormulaValueError(u64),
}

/// Cell payload: either a fixed type or a style index to resolve through the XF table
type CellValue = (Either<CellType, usize>, String);

/// An Excel 97-2003 (`.xls`) workbook
pub(crate) struct XlsSpreadsheet {
    name: String,
    reader: Biff8Reader,
    shared_strings: Vec<String>,
    /// Cell type per XF index
    number_formats: Vec<CellType>,
    /// Worksheets with the stream offset of their BOF record
    sheets: Vec<(String, usize)>,
}

impl XlsSpreadsheet {
    /// Reads the workbook globals substream: code page, date system, formats,
    /// shared strings and the sheet directory
    pub(crate) fn open(file_name: &str, mut reader: UnifiedReader) -> Result<XlsSpreadsheet, RustyTableError> {
        let cfb = Cfb::new(&mut reader)?;
        let mut reader = cfb.read("Workbook")
            .ok_none_else(|| cfb.read("Book"))?
            .map(Biff8Reader::new)
            .ok_or_else(|| SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?;
        let mut is_1904 = false;
        let mut shared_strings = Vec::new();
        let mut custom_formats: HashMap<String, CellType> = HashMap::new();
        let mut format_indexes: Vec<String> = Vec::new();
        let mut sheets: Vec<(String, usize)> = Vec::new();
        match_biff8_record!(reader => {
            EOF => break,
            FILE_PASS => Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?,
            DATE1904 if reader.read_u16()? == 1 => is_1904 = true,
            CODE_PAGE => {
                let code_page = reader.read_u16()?;
                reader.encoding = codepage::to_encoding(code_page).ok_or(XlsError::CodePageError(code_page))?;
            }
            FORMAT => {
                let id = reader.read_u16()?;
                let format = reader.read_xl_unicode_string()?;
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
            XF => {
                reader.skip(2)?;
                let id = reader.read_u16()?;
                format_indexes.push(id.to_string());
            }
            SST => shared_strings = load_shared_strings(&mut reader)?,
            BOUND_SHEET8 => {
                let pointer = reader.read_usize()?;
                let visibility_and_kind = reader.read_u16()?;
                let sheet_name = reader.read_short_xl_unicode_string()?;
                // High byte 0 is a worksheet; charts and macro sheets carry no grid
                if visibility_and_kind >> 8 == 0 {
                    sheets.push((sheet_name, pointer));
                }
            }
        });
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
        }

        let number_formats = load_number_formats(format_indexes, custom_formats, is_1904);

        Ok(XlsSpreadsheet {
            name: file_name.to_owned(),
            reader,
            shared_strings,
            number_formats,
            sheets,
        })
    }

    fn resolve(&self, either: Either<CellType, usize>) -> CellType {
        match either {
            Either::Left(kind) => kind,
            Either::Right(index) => self.number_formats.get(index).copied().unwrap_or(CellType::Number),
        }
    }
}

impl Spreadsheet for XlsSpreadsheet {
    fn name(&self) -> String {
        self.name.clone()
    }

    /// The SST is read with the workbook globals, so this only hands out a copy
    fn load_shared_strings(&mut self) -> Result<Vec<String>, RustyTableError> {
        Ok(self.shared_strings.to_owned())
    }

    /// Reads every worksheet substream; formula cells use their cached result
    fn read_sheets(&mut self) -> Result<Vec<Sheet>, RustyTableError> {
        let mut sheets = Vec::<Sheet>::new();
        for (sheet_name, pointer) in self.sheets.clone() {
            self.reader.goto(pointer);
            self.reader.next()?;
            let mut sheet = Sheet::new(&self.name, &sheet_name);
            while let Some(tag) = self.reader.next()? {
                match tag {
                    BOF | EOF => break,
                    MUL_RK => {
                        let row = self.reader.read_u16()? as usize;
                        let col_lower_bound = self.reader.read_u16()? as usize;
                        let col_upper_bound = self.reader.get_u16_back(2)? as usize;
                        for col in col_lower_bound..=col_upper_bound {
                            let index = self.reader.read_u16()? as usize;
                            let value = self.reader.read_rk_number()?;
                            let kind = self.resolve(Either::Right(index));
                            sheet.push(Cell { row, col, kind, value });
                        }
                    }
                    BOOL_ERR | NUMBER | RK | LABEL_SST | LABEL | FORMULA => {
                        let row = self.reader.read_u16()? as usize;
                        let col = self.reader.read_u16()? as usize;
                        let (either, value) = match tag {
                            BOOL_ERR => read_bool_or_error_cell(&mut self.reader)?,
                            NUMBER => read_number_cell(&mut self.reader)?,
                            RK => read_rk_cell(&mut self.reader)?,
                            LABEL_SST => read_label_sst_cell(&mut self.reader)?,
                            LABEL => read_label_cell(&mut self.reader)?,
                            _ => read_formula_cell(&mut self.reader)?,
                        };
                        let kind = self.resolve(either);
                        if !value.is_empty() {
                            sheet.push(Cell { row, col, kind, value });
                        }
                    }
                    _ => (),
                }
            }
            sheets.push(sheet);
        }

        Ok(sheets)
    }
}

/// SST: total count, unique count, then the strings (spilling over CONTINUE records)
fn load_shared_strings(reader: &mut Biff8Reader) -> Result<Vec<String>, RustyTableError> {
    reader.skip(4)?;
    let count = reader.read_usize()?;
    let mut shared_strings: Vec<String> = Vec::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        shared_strings.push(reader.read_xl_unicode_rich_extended_string()?);
    }
    Ok(shared_strings)
}

fn read_bool_or_error_cell(reader: &mut Biff8Reader) -> Result<CellValue, RustyTableError> {
    reader.skip(2)?;
    let value = reader.read_u8()?;
    let is_error = reader.read_u8()? != 0;
    Ok(if is_error {
        (Either::Left(CellType::Error), to_error_value(value).to_owned())
    } else {
        (Either::Left(CellType::Boolean), value.to_string())
    })
}

fn read_number_cell(reader: &mut Biff8Reader) -> Result<CellValue, RustyTableError> {
    let index = reader.read_u16()? as usize;
    let value = reader.read_f64()?;
    Ok((Either::Right(index), value.to_string()))
}

fn read_rk_cell(reader: &mut Biff8Reader) -> Result<CellValue, RustyTableError> {
    let index = reader.read_u16()? as usize;
    let value = reader.read_rk_number()?;
    Ok((Either::Right(index), value))
}

fn read_label_sst_cell(reader: &mut Biff8Reader) -> Result<CellValue, RustyTableError> {
    reader.skip(2)?;
    let value = reader.read_usize()?;
    Ok((Either::Left(CellType::SharedString), value.to_string()))
}

fn read_label_cell(reader: &mut Biff8Reader) -> Result<CellValue, RustyTableError> {
    reader.skip(2)?;
    let value = reader.read_xl_unicode_string()?;
    Ok((Either::Left(CellType::InlineString), value))
}

/// FORMULA keeps its cached result in an 8-byte field: a plain f64, or a
/// tagged value (0 text in the next STRING record, 1 boolean, 2 error, 3 empty)
fn read_formula_cell(reader: &mut Biff8Reader) -> Result<CellValue, RustyTableError> {
    let index = reader.read_u16()? as usize;
    let formula = reader.read_u64()?;
    if (formula & 0xFFFF_0000_0000_0000) != 0xFFFF_0000_0000_0000 {
        return Ok((Either::Right(index), f64::from_bits(formula).to_string()));
    }
    match formula & 0xFF {
        0 => match reader.next()? {
            Some(STRING) => Ok((Either::Left(CellType::InlineString), reader.read_xl_unicode_string()?)),
            _ => Err(XlsError::FormulaValueError(formula))?,
        },
        1 => {
            let value = if (formula & 0xFF0000) > 0 { "1" } else { "0" };
            Ok((Either::Left(CellType::Boolean), value.to_owned()))
        }
        2 => {
            let code = ((formula >> 16) & 0xFF) as u8;
            Ok((Either::Left(CellType::Error), to_error_value(code).to_owned()))
        }
        3 => Ok((Either::Left(CellType::InlineString), String::new())),
        _ => Err(XlsError::FormulaValueError(formula))?,
    }
}
