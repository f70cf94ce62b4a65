use crate::spreadsheet::reference::index_to_reference;
use chrono::Duration;
use chrono::NaiveDate;

/// How a stored cell value is to be read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CellType {
    #[default]
    Empty,
    /// Boolean stored as `1`/`0`
    Boolean,
    /// Plain number
    Number,
    /// Serial date/time, 1900 epoch
    NumberDateTime1900,
    /// Serial date, 1900 epoch
    NumberDate1900,
    /// Serial time of day, 1900 epoch
    NumberTime1900,
    /// Serial date/time, 1904 epoch
    NumberDateTime1904,
    /// Serial date, 1904 epoch
    NumberDate1904,
    /// Serial time of day, 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time text (`t="d"` cells)
    IsoDateTime,
    /// Text stored in the cell
    InlineString,
    /// Index into the shared string table
    SharedString,
    /// Error code such as `#N/A`
    Error,
}

impl CellType {
    /// Maps built-in number format ids to date/time cell types.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Classifies a custom number format code by its date and time tokens,
    /// ignoring quoted literals, escapes and bracketed sections.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_bracket = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    /// True for cells whose stored value is text.
    pub fn is_text(&self) -> bool {
        matches!(self, CellType::InlineString | CellType::SharedString)
    }
}

/// Converts BIFF error codes to their display form.
pub(crate) fn to_error_value(value: u8) -> &'static str {
    match value {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#ERROR!",
    }
}

/// A single stored cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    pub kind: CellType,
    /// Stored value; shared strings are resolved to their text once the sheet is loaded
    pub value: String,
}

impl Cell {
    /// Returns the A1 reference of this cell (e.g. `B5`).
    pub fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Canonical text of the cell.
    ///
    /// Text is returned as stored, numbers in their shortest round-trip form,
    /// booleans as `true`/`false`, date-formatted numbers as
    /// `yyyy-MM-dd HH:mm:ss`, `yyyy-MM-dd` or `HH:mm:ss`. Error cells have no text.
    pub fn text(&self) -> String {
        let converted = match self.kind {
            CellType::Empty | CellType::Error => Some(String::new()),
            CellType::Boolean => Some(if self.value == "1" || self.value.eq_ignore_ascii_case("true") { "true" } else { "false" }.to_owned()),
            CellType::NumberDateTime1900 => to_datetime_string(&self.value, false),
            CellType::NumberDateTime1904 => to_datetime_string(&self.value, true),
            CellType::NumberDate1900 => to_date_string(&self.value, false),
            CellType::NumberDate1904 => to_date_string(&self.value, true),
            CellType::NumberTime1900 | CellType::NumberTime1904 => to_time_string(&self.value),
            CellType::IsoDateTime => Some(self.value.replacen('T', " ", 1)),
            CellType::Number | CellType::InlineString | CellType::SharedString => None,
        };
        // A date-formatted cell holding a non-numeric value keeps its raw text
        converted.unwrap_or_else(|| self.value.to_owned())
    }
}

/// Splits a serial value into whole days and seconds of the day, rounding to
/// the nearest second and carrying into the next day when needed.
fn split_serial(value: &str) -> Option<(i64, i64)> {
    let serial = value.trim().parse::<f64>().ok()?;
    if !serial.is_finite() {
        return None;
    }
    let mut days = serial.floor() as i64;
    let mut seconds = ((serial - serial.floor()) * 86_400f64).round() as i64;
    if seconds >= 86_400 {
        days += 1;
        seconds -= 86_400;
    }
    Some((days, seconds))
}

fn serial_date(days: i64, is_1904: bool) -> Option<NaiveDate> {
    // The 1900 system counts the nonexistent 1900-02-29 as day 60
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::try_days(days + offset)?)
}

fn format_seconds(seconds: i64) -> String {
    format!("{:02}:{:02}:{:02}", seconds / 3600, seconds / 60 % 60, seconds % 60)
}

fn to_date_string(value: &str, is_1904: bool) -> Option<String> {
    let (days, _) = split_serial(value)?;
    Some(serial_date(days, is_1904)?.format("%Y-%m-%d").to_string())
}

fn to_time_string(value: &str) -> Option<String> {
    let (_, seconds) = split_serial(value)?;
    Some(format_seconds(seconds))
}

fn to_datetime_string(value: &str, is_1904: bool) -> Option<String> {
    let (days, seconds) = split_serial(value)?;
    let date = serial_date(days, is_1904)?;
    Some(format!("{} {}", date.format("%Y-%m-%d"), format_seconds(seconds)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell { row: 4, col: 1, kind, value: value.to_owned() }
    }

    #[test]
    fn canonical_text() {
        assert_eq!(cell(CellType::Number, "1001").text(), "1001");
        assert_eq!(cell(CellType::InlineString, " padded ").text(), " padded ");
        assert_eq!(cell(CellType::Boolean, "1").text(), "true");
        assert_eq!(cell(CellType::Boolean, "0").text(), "false");
        assert_eq!(cell(CellType::Error, "#N/A").text(), "");
        assert_eq!(cell(CellType::IsoDateTime, "2024-03-01T10:20:30").text(), "2024-03-01 10:20:30");
    }

    #[test]
    fn serial_dates_and_times() {
        assert_eq!(cell(CellType::NumberDate1900, "1").text(), "1900-01-01");
        assert_eq!(cell(CellType::NumberDate1900, "61").text(), "1900-03-01");
        assert_eq!(cell(CellType::NumberDate1900, "45292").text(), "2024-01-01");
        assert_eq!(cell(CellType::NumberDate1904, "0").text(), "1904-01-01");
        assert_eq!(cell(CellType::NumberDateTime1900, "45292.5").text(), "2024-01-01 12:00:00");
        assert_eq!(cell(CellType::NumberTime1900, "0.0625").text(), "01:30:00");
        assert_eq!(cell(CellType::NumberTime1900, "0.99999999").text(), "00:00:00");
    }

    #[test]
    fn date_cell_with_text_keeps_raw_value() {
        assert_eq!(cell(CellType::NumberDate1900, "soon").text(), "soon");
    }

    #[test]
    fn custom_formats() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd hh:mm:ss", false), CellType::NumberDateTime1900);
        assert_eq!(CellType::parse_custom_number_format("[h]:mm:ss", false), CellType::NumberTime1900);
        assert_eq!(CellType::parse_custom_number_format("\"days\" 0", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00", true), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("d/m/yy", true), CellType::NumberDate1904);
    }

    #[test]
    fn reference_of_cell() {
        assert_eq!(cell(CellType::Number, "1").reference(), "B5");
    }
}
