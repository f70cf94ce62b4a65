//! Validation and extraction of data and localization sheets.
//!
//! Both extractors run in two phases: keys are catalogued for every sheet
//! first, then references are checked and row values are extracted. Values
//! are stored as their raw cell text; the type check only validates.

pub mod catalog;
pub mod output;
pub mod strings;
pub mod table;

pub use catalog::PrimaryKeyCatalog;
pub use output::DeleteOrphans;
pub use output::KeepOrphans;
pub use output::OrphanResolver;
pub use strings::LanguageTable;
pub use strings::StringExtractor;
pub use table::ExtractedTable;
pub use table::TableExtractor;

use crate::address::AddressedError;
use crate::address::ErrorKind;
use crate::address::TableAddress;
use crate::schema::PropertyType;

/// Checks a cell's text against its declared type and returns it unchanged.
///
/// Empty text is always rejected; callers that tolerate empty keys check
/// for them before calling.
pub fn validate_cell(text: String, kind: PropertyType, address: &TableAddress) -> Result<String, AddressedError> {
    if text.is_empty() {
        return address.fail(ErrorKind::Value, "cell value is empty");
    }
    if !kind.accepts(&text) {
        return address.fail(ErrorKind::Value, format!("'{text}' cannot be converted to {kind}"));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> TableAddress {
        let mut address = TableAddress::new();
        address.enter_sheet("Items", "Item");
        address.set_column("Hp");
        address.set_cell("C5");
        address
    }

    #[test]
    fn returns_raw_text() {
        assert_eq!(validate_cell("1001".to_owned(), PropertyType::Int, &address()).unwrap(), "1001");
        assert_eq!(validate_cell("TRUE".to_owned(), PropertyType::Bool, &address()).unwrap(), "TRUE");
        assert_eq!(validate_cell("1.5".to_owned(), PropertyType::Float, &address()).unwrap(), "1.5");
        assert_eq!(
            validate_cell("2024-01-31 08:00:00".to_owned(), PropertyType::DateTime, &address()).unwrap(),
            "2024-01-31 08:00:00"
        );
        assert_eq!(validate_cell("01:30:00".to_owned(), PropertyType::TimeSpan, &address()).unwrap(), "01:30:00");
    }

    #[test]
    fn empty_is_a_value_error() {
        let error = validate_cell(String::new(), PropertyType::String, &address()).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Value);
        assert_eq!(error.to_string(), "[Items/Item/Hp/C5] - cell value is empty");
    }

    #[test]
    fn unparsable_names_value_and_type() {
        let error = validate_cell("abc".to_owned(), PropertyType::Int, &address()).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Value);
        assert!(error.message.contains("'abc'"));
        assert!(error.message.contains("int"));

        let error = validate_cell("3000000000".to_owned(), PropertyType::Int, &address()).unwrap_err();
        assert!(error.message.contains("'3000000000'"));
        assert!(validate_cell("3000000000".to_owned(), PropertyType::Long, &address()).is_ok());
    }
}
