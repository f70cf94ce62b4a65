//! OOXML package plumbing shared by the workbook readers
use crate::error::RustyTableError;
use crate::helpers::cfb::Cfb;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::Seek;
use std::io::SeekFrom;
use zip::ZipArchive;

const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Worksheets of a package as `(tab name, part path)` in workbook order
pub(super) type SheetParts = Vec<(String, String)>;

/// Opens an OOXML package and loads the parts every reader needs
///
/// # Arguments
/// * `file_name` - Name used in error messages
/// * `reader` - Package bytes
/// * `load_workbook` - Reads the sheet list and the date system
/// * `load_number_formats` - Reads the style table
///
/// # Returns
/// The archive, the number format per style index and the sheet list
pub(super) fn open<W, F>(file_name: &str, mut reader: UnifiedReader, load_workbook: W, load_number_formats: F) -> Result<(
    ZipArchive<UnifiedReader>,
    Vec<CellType>,
    SheetParts,
), RustyTableError>
where
    W: Fn(&mut ZipArchive<UnifiedReader>) -> Result<(SheetParts, bool), RustyTableError>,
    F: Fn(&mut ZipArchive<UnifiedReader>, bool) -> Result<Vec<CellType>, RustyTableError>,
{
    if is_password_protected(&mut reader) {
        Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
    }
    reader.seek(SeekFrom::Start(0))?;

    let mut zip = ZipArchive::new(reader)?;
    let (sheets, is_1904) = load_workbook(&mut zip)?;
    if sheets.is_empty() {
        Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
    }

    let number_formats = load_number_formats(&mut zip, is_1904)?;
    Ok((zip, number_formats, sheets))
}

/// Maps relationship ids to worksheet part paths
pub(super) fn load_relationships(zip: &mut ZipArchive<UnifiedReader>, path: &str) -> Result<HashMap<String, String>, RustyTableError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Resolves each style's number format id to a cell type
pub(super) fn load_number_formats(format_indexes: Vec<String>, custom_formats: HashMap<String, CellType>, is_1904: bool) -> Vec<CellType> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

/// Normalizes a relationship target to a path inside the archive
pub(super) fn to_zip_path(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Encrypted OOXML packages are stored as a compound file holding `EncryptedPackage`
fn is_password_protected(reader: &mut UnifiedReader) -> bool {
    Cfb::new(reader)
        .map(|cfb| cfb.exists("EncryptedPackage"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
    }

    #[test]
    fn style_indexes_resolve_to_cell_types() {
        let mut custom = HashMap::new();
        custom.insert("164".to_owned(), CellType::NumberDateTime1900);
        let formats = load_number_formats(
            vec!["0".to_owned(), "14".to_owned(), "164".to_owned(), "2".to_owned()],
            custom,
            false,
        );
        assert_eq!(formats, vec![
            CellType::Number,
            CellType::NumberDate1900,
            CellType::NumberDateTime1900,
            CellType::Number,
        ]);
    }
}
