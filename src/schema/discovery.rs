use crate::address::AddressedError;
use crate::address::ErrorKind;
use crate::address::TableAddress;
use crate::diagnostics::DiagnosticsSink;
use crate::error::ResultMessage;
use crate::error::RustyTableError;
use crate::schema::ForeignKey;
use crate::schema::PropertyType;
use crate::schema::SheetSchema;
use crate::schema::TypeAliasMap;
use crate::schema::DATA_START_ROW;
use crate::schema::DESCRIPTION_ROW;
use crate::schema::NAME_COL;
use crate::schema::NAME_ROW;
use crate::schema::PROPERTY_NAME_ROW;
use crate::schema::PROPERTY_TYPE_ROW;
use crate::schema::RANGE_MARKER;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::Workbook;
use crate::spreadsheet::WORKBOOK_EXTENSIONS;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Name marking the primary-key column, alone or as `name[pkey]`.
const PRIMARY_KEY_MARKER: &str = "pkey";

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Table directory not found: '{0}'")]
    DirectoryNotFound(String),

    #[error("No workbook (*.xlsx, *.xls) found in '{0}'")]
    NoWorkbooks(String),
}

/// Schemas of one run, split by destination.
#[derive(Debug, Default)]
pub struct CollectedSchemas {
    /// Data sheets, for the table extractor and the code generator
    pub tables: Vec<SheetSchema>,
    /// Sheets of the localization workbook
    pub strings: Vec<SheetSchema>,
}

/// Discovers sheet schemas across a directory of workbooks.
pub struct SchemaCollector {
    aliases: TypeAliasMap,
    enum_file_name: Option<String>,
    string_file_name: Option<String>,
    foreign_key_pattern: Regex,
}

impl SchemaCollector {
    pub fn new(aliases: TypeAliasMap) -> Self {
        Self {
            aliases,
            enum_file_name: None,
            string_file_name: None,
            foreign_key_pattern: Regex::new(r"^(\w+)\[(\w+)\]$").expect("Hardcode regex pattern"),
        }
    }

    /// Workbooks with this file stem are skipped entirely.
    pub fn with_enum_file(mut self, file_stem: Option<&str>) -> Self {
        self.enum_file_name = file_stem.map(str::to_owned);
        self
    }

    /// Workbooks with this file stem hold localization sheets.
    pub fn with_string_file(mut self, file_stem: Option<&str>) -> Self {
        self.string_file_name = file_stem.map(str::to_owned);
        self
    }

    /// Finds `*.xlsx`/`*.xls` files under `dir` recursively, sorted by path.
    /// Office lock files (`~$*`) are ignored.
    pub fn find_workbooks(dir: &Path) -> Result<Vec<PathBuf>, RustyTableError> {
        if !dir.is_dir() {
            Err(CollectError::DirectoryNotFound(dir.display().to_string()))?
        }
        let pattern = format!("{}/**/*", glob::Pattern::escape(&dir.to_string_lossy()));
        let mut files = Vec::new();
        for entry in glob::glob(&pattern)? {
            let path = entry?;
            let is_workbook = path
                .extension()
                .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
                .map(|extension| WORKBOOK_EXTENSIONS.contains(&extension.as_str()))
                .unwrap_or(false);
            let is_lock_file = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("~$"))
                .unwrap_or(false);
            if path.is_file() && is_workbook && !is_lock_file {
                files.push(path);
            }
        }
        if files.is_empty() {
            Err(CollectError::NoWorkbooks(dir.display().to_string()))?
        }
        files.sort();
        Ok(files)
    }

    /// Discovers every sheet of every workbook under `dir`.
    pub fn collect_all(&self, dir: &Path, sink: &dyn DiagnosticsSink) -> Result<CollectedSchemas, RustyTableError> {
        let mut address = TableAddress::new();
        let files = Self::find_workbooks(dir)?;
        sink.info("[Workbooks]");
        for file in &files {
            sink.info(&format!("  * {}", file.file_name().unwrap_or_default().to_string_lossy()));
        }
        sink.info(&format!("Found {} workbook(s)", files.len()));

        let mut collected = CollectedSchemas::default();
        for file in files {
            let stem = file_stem(&file);
            if self.enum_file_name.as_deref() == Some(stem.as_str()) {
                sink.info(&format!("Skipping enum workbook '{stem}'"));
                continue;
            }
            let workbook = Workbook::open(&file).with_prefix(&file.display().to_string())?;
            let schemas = self.collect_workbook(workbook, &mut address, sink)?;
            if self.string_file_name.as_deref() == Some(stem.as_str()) {
                collected.strings.extend(schemas);
            } else {
                collected.tables.extend(schemas);
            }
        }
        Ok(collected)
    }

    /// Discovers every sheet of one workbook; sheet names must be unique within it.
    pub fn collect_workbook(&self, workbook: Workbook, address: &mut TableAddress, sink: &dyn DiagnosticsSink) -> Result<Vec<SheetSchema>, RustyTableError> {
        let table_name = workbook.stem();
        let mut sheet_names = HashSet::new();
        let mut schemas = Vec::new();
        for sheet in workbook.sheets {
            let schema = self.discover_sheet(&table_name, sheet, address)?;
            if !sheet_names.insert(schema.sheet_name.to_owned()) {
                address.enter_sheet(&table_name, &schema.sheet.name);
                Err(address.error(ErrorKind::Schema, format!("duplicate sheet name '{}'", schema.sheet_name)))?
            }
            report_schema(&schema, sink);
            schemas.push(schema);
        }
        Ok(schemas)
    }

    /// Reads the four header rows of a sheet into its schema.
    pub fn discover_sheet(&self, table_name: &str, sheet: Sheet, address: &mut TableAddress) -> Result<SheetSchema, AddressedError> {
        address.enter_sheet(table_name, &sheet.name);

        let sheet_name = read_sheet_name(&sheet, address)?;
        let (row_count, column_count) = read_dimensions(&sheet, address)?;
        let mut property_names = read_property_names(&sheet, column_count, &sheet_name, address)?;
        let property_types = self.read_property_types(&sheet, &property_names, address)?;
        let property_descriptions = (1..=column_count)
            .map(|col| sheet.text(DESCRIPTION_ROW, col))
            .collect();
        let (primary_key, foreign_keys) = self.read_keys(&mut property_names, &sheet_name, address)?;
        address.set_column("");
        address.set_cell("");

        Ok(SheetSchema {
            table_name: table_name.to_owned(),
            sheet_name,
            row_count,
            column_count,
            property_names,
            property_types,
            property_descriptions,
            primary_key,
            foreign_keys,
            sheet,
        })
    }

    fn read_property_types(&self, sheet: &Sheet, property_names: &[String], address: &mut TableAddress) -> Result<Vec<PropertyType>, AddressedError> {
        let mut property_types = Vec::with_capacity(property_names.len());
        for (index, name) in property_names.iter().enumerate() {
            let col = index + 1;
            address.set_column(name);
            address.set_cell(&index_to_reference(PROPERTY_TYPE_ROW, col));
            if !sheet.is_text(PROPERTY_TYPE_ROW, col) {
                return address.fail(ErrorKind::Schema, "property type must be a text cell");
            }
            let alias = sheet.text(PROPERTY_TYPE_ROW, col);
            match self.aliases.resolve(&alias) {
                Some(kind) => property_types.push(kind),
                None => address.fail(ErrorKind::Schema, format!("unsupported property type '{alias}'"))?,
            }
        }
        Ok(property_types)
    }

    /// Finds the primary key and strips `[Table]` suffixes from foreign-key
    /// names, then checks that the stripped names are unique.
    fn read_keys(&self, property_names: &mut [String], sheet_name: &str, address: &mut TableAddress) -> Result<(Option<usize>, Vec<ForeignKey>), AddressedError> {
        let mut primary_key = None;
        let mut foreign_keys = Vec::new();
        let mut seen = HashSet::new();
        for (index, raw_name) in property_names.iter_mut().enumerate() {
            address.set_column(raw_name);
            address.set_cell(&index_to_reference(PROPERTY_NAME_ROW, index + 1));
            if raw_name.eq_ignore_ascii_case(PRIMARY_KEY_MARKER) {
                primary_key.get_or_insert(index);
            } else if let Some(captures) = self.foreign_key_pattern.captures(raw_name) {
                let name = captures[1].to_owned();
                let referenced_table = captures[2].to_owned();
                if referenced_table.eq_ignore_ascii_case(PRIMARY_KEY_MARKER) {
                    primary_key.get_or_insert(index);
                } else {
                    foreign_keys.push(ForeignKey { column: index, referenced_table });
                }
                if name == sheet_name {
                    return address.fail(ErrorKind::Schema, format!("property name '{name}' must differ from the sheet name"));
                }
                *raw_name = name;
            }
            if !seen.insert(raw_name.to_owned()) {
                return address.fail(ErrorKind::Schema, format!("duplicate property name '{raw_name}'"));
            }
        }
        Ok((primary_key, foreign_keys))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn read_sheet_name(sheet: &Sheet, address: &mut TableAddress) -> Result<String, AddressedError> {
    address.set_cell(&index_to_reference(NAME_ROW, NAME_COL));
    if !sheet.is_text(NAME_ROW, NAME_COL) {
        return address.fail(ErrorKind::Schema, "sheet name cell is empty or not text");
    }
    let sheet_name = sheet.text(NAME_ROW, NAME_COL);
    if sheet_name.trim().is_empty() {
        return address.fail(ErrorKind::Schema, "sheet name cell is empty or not text");
    }
    Ok(sheet_name)
}

/// Column count from the outermost `@` markers of row 0; row count from the
/// `@` rows under the first marker, the last of which closes the block.
fn read_dimensions(sheet: &Sheet, address: &mut TableAddress) -> Result<(usize, usize), AddressedError> {
    let markers: Vec<usize> = sheet
        .row(NAME_ROW)
        .into_iter()
        .filter(|cell| cell.text().contains(RANGE_MARKER))
        .map(|cell| cell.col)
        .collect();
    let (first, last) = match (markers.first(), markers.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            address.set_cell("");
            return address.fail(ErrorKind::Schema, "range marker '@' not found in the first row");
        }
    };
    if last <= first {
        address.set_cell(&index_to_reference(NAME_ROW, first));
        return address.fail(ErrorKind::Schema, "range needs an opening and a closing '@' marker");
    }

    let mut row = DATA_START_ROW;
    while sheet.text(row, first).contains(RANGE_MARKER) {
        row += 1;
    }
    let row_count = (row - DATA_START_ROW).saturating_sub(1);
    let column_count = last - first - 1;
    Ok((row_count, column_count))
}

fn read_property_names(sheet: &Sheet, column_count: usize, sheet_name: &str, address: &mut TableAddress) -> Result<Vec<String>, AddressedError> {
    let mut property_names = Vec::with_capacity(column_count);
    for col in 1..=column_count {
        address.set_cell(&index_to_reference(PROPERTY_NAME_ROW, col));
        let name = sheet.text(PROPERTY_NAME_ROW, col);
        if name.trim().is_empty() {
            return address.fail(ErrorKind::Schema, "property name is empty");
        }
        if name.chars().any(char::is_whitespace) {
            return address.fail(ErrorKind::Schema, format!("property name contains whitespace: '{name}'"));
        }
        if name == sheet_name {
            return address.fail(ErrorKind::Schema, format!("property name '{name}' must differ from the sheet name"));
        }
        property_names.push(name);
    }
    Ok(property_names)
}

fn report_schema(schema: &SheetSchema, sink: &dyn DiagnosticsSink) {
    sink.info("----------------------------------------");
    sink.info(&format!(
        "{}/{} size: {} rows x {} columns",
        schema.table_name, schema.sheet_name, schema.row_count, schema.column_count
    ));
    sink.info("[Properties]");
    for (name, kind) in schema.property_names.iter().zip(&schema.property_types) {
        sink.info(&format!("  * {name} : {kind}"));
    }
    sink.info("[Keys]");
    match schema.primary_key {
        Some(index) => sink.info(&format!(
            "  Primary Key: {} ({})",
            schema.property_names[index], schema.property_types[index]
        )),
        None => sink.warning(&format!(
            "  {}/{} has no primary key; row indexes are used as keys",
            schema.table_name, schema.sheet_name
        )),
    }
    if schema.foreign_keys.is_empty() {
        sink.info("  No foreign keys");
    }
    for foreign_key in &schema.foreign_keys {
        sink.info(&format!(
            "  Foreign Key: {} (references {})",
            schema.property_names[foreign_key.column], foreign_key.referenced_table
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Level;
    use crate::diagnostics::MemorySink;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    /// Builds a sheet with the header rows, the markers and `rows` data rows.
    fn grid(sheet_name: &str, names: &[&str], types: &[&str], rows: &[&[&str]]) -> Sheet {
        let mut sheet = Sheet::new("Items.xlsx", "Tab");
        sheet.set_text(0, 0, "@");
        sheet.set_text(0, 1, sheet_name);
        sheet.set_text(0, names.len() + 1, "@");
        for (index, name) in names.iter().enumerate() {
            sheet.set_text(1, index + 1, &format!("{name} description"));
            sheet.set_text(2, index + 1, name);
            sheet.set_text(3, index + 1, types[index]);
        }
        for (row, values) in rows.iter().enumerate() {
            sheet.set_text(4 + row, 0, "@");
            for (index, value) in values.iter().enumerate() {
                sheet.set_text(4 + row, index + 1, value);
            }
        }
        sheet.set_text(4 + rows.len(), 0, "@");
        sheet
    }

    fn discover(sheet: Sheet) -> Result<SheetSchema, AddressedError> {
        SchemaCollector::new(TypeAliasMap::default()).discover_sheet("Items", sheet, &mut TableAddress::new())
    }

    #[test]
    fn discovers_header_rows() {
        let sheet = grid("Item", &["pkey", "Name", "Rarity[Rarity]"], &["int", "String", "string"], &[
            &["1001", "Sword", "common"],
            &["1002", "Shield", "rare"],
        ]);
        let schema = discover(sheet).unwrap();
        assert_eq!(schema.table_name, "Items");
        assert_eq!(schema.sheet_name, "Item");
        assert_eq!(schema.row_count, 2);
        assert_eq!(schema.column_count, 3);
        assert_eq!(schema.property_names, vec!["pkey", "Name", "Rarity"]);
        assert_eq!(schema.property_types, vec![PropertyType::Int, PropertyType::String, PropertyType::String]);
        assert_eq!(schema.property_descriptions[1], "Name description");
        assert_eq!(schema.primary_key, Some(0));
        assert_eq!(schema.foreign_keys, vec![ForeignKey { column: 2, referenced_table: "Rarity".to_owned() }]);
    }

    #[test]
    fn three_data_rows_and_closing_marker() {
        let sheet = grid("Item", &["pkey"], &["int"], &[&["1"], &["2"], &["3"]]);
        assert_eq!(discover(sheet).unwrap().row_count, 3);
    }

    #[test]
    fn markers_two_and_nine_give_six_columns() {
        let mut sheet = Sheet::new("", "Tab");
        sheet.set_text(0, 1, "Item");
        sheet.set_text(0, 2, "@");
        sheet.set_text(0, 9, "@");
        for col in 1..=6 {
            sheet.set_text(2, col, &format!("P{col}"));
            sheet.set_text(3, col, "int");
        }
        let schema = discover(sheet).unwrap();
        assert_eq!(schema.column_count, 6);
        assert_eq!(schema.row_count, 0);
    }

    #[test]
    fn name_suffix_pkey_marks_primary_key() {
        let sheet = grid("Item", &["Id[pkey]", "Name"], &["int", "string"], &[]);
        let schema = discover(sheet).unwrap();
        assert_eq!(schema.property_names, vec!["Id", "Name"]);
        assert_eq!(schema.primary_key, Some(0));
        assert!(schema.foreign_keys.is_empty());
    }

    #[test]
    fn first_primary_key_wins() {
        let sheet = grid("Item", &["Name", "PKEY", "Id[pkey]"], &["string", "int", "int"], &[]);
        assert_eq!(discover(sheet).unwrap().primary_key, Some(1));
    }

    #[test]
    fn missing_marker_is_fatal() {
        let mut sheet = Sheet::new("", "Tab");
        sheet.set_text(0, 1, "Item");
        let error = discover(sheet).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Schema);
        assert!(error.message.contains("'@'"));
        assert_eq!(error.location, "[Items/Tab]");
    }

    #[test]
    fn sheet_name_must_be_text() {
        let mut sheet = grid("Item", &["pkey"], &["int"], &[]);
        sheet.set_number(0, 1, "42");
        let error = discover(sheet).unwrap_err();
        assert_eq!(error.to_string(), "[Items/Tab/B1] - sheet name cell is empty or not text");
    }

    #[test]
    fn property_name_rules() {
        let error = discover(grid("Item", &["pkey", "Max Hp"], &["int", "int"], &[])).unwrap_err();
        assert!(error.message.contains("whitespace"));

        let mut sheet = grid("Item", &["pkey", "x"], &["int", "int"], &[]);
        sheet.set_text(2, 2, "");
        let error = discover(sheet).unwrap_err();
        assert_eq!(error.to_string(), "[Items/Tab/C3] - property name is empty");

        let error = discover(grid("Item", &["pkey", "Item"], &["int", "int"], &[])).unwrap_err();
        assert!(error.message.contains("must differ from the sheet name"));
    }

    #[test]
    fn duplicate_property_name_after_stripping() {
        let error = discover(grid("Item", &["Rarity", "Rarity[Rarity]"], &["string", "string"], &[])).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Schema);
        assert!(error.message.contains("duplicate property name 'Rarity'"));
    }

    #[test]
    fn unknown_type_names_the_type() {
        let error = discover(grid("Item", &["pkey", "Hp"], &["int", "integer"], &[])).unwrap_err();
        assert_eq!(error.to_string(), "[Items/Tab/Hp/C4] - unsupported property type 'integer'");
    }

    #[test]
    fn type_cell_must_be_text() {
        let mut sheet = grid("Item", &["pkey"], &["int"], &[]);
        sheet.set_number(3, 1, "1");
        let error = discover(sheet).unwrap_err();
        assert!(error.message.contains("text cell"));
    }

    #[test]
    fn custom_alias_resolves() {
        let mut aliases = TypeAliasMap::default();
        aliases.insert("text", PropertyType::String);
        let schema = SchemaCollector::new(aliases)
            .discover_sheet("Items", grid("Item", &["pkey", "Name"], &["INT", "Text"], &[]), &mut TableAddress::new())
            .unwrap();
        assert_eq!(schema.property_types, vec![PropertyType::Int, PropertyType::String]);
    }

    #[test]
    fn duplicate_sheet_names_in_one_workbook() {
        let workbook = Workbook {
            path: Path::new("Items.xlsx").to_path_buf(),
            sheets: vec![
                grid("Item", &["pkey"], &["int"], &[]),
                grid("Item", &["pkey"], &["int"], &[]),
            ],
        };
        let sink = MemorySink::new();
        let error = SchemaCollector::new(TypeAliasMap::default())
            .collect_workbook(workbook, &mut TableAddress::new(), &sink)
            .unwrap_err();
        let error = error.as_addressed().unwrap();
        assert_eq!(error.kind, ErrorKind::Schema);
        assert!(error.message.contains("duplicate sheet name 'Item'"));
    }

    #[test]
    fn missing_primary_key_is_reported_as_warning() {
        let workbook = Workbook {
            path: Path::new("Items.xlsx").to_path_buf(),
            sheets: vec![grid("Item", &["Name"], &["string"], &[&["a"]])],
        };
        let sink = MemorySink::new();
        let schemas = SchemaCollector::new(TypeAliasMap::default())
            .collect_workbook(workbook, &mut TableAddress::new(), &sink)
            .unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].primary_key, None);
        assert_eq!(sink.of(Level::Warning).len(), 1);
    }

    #[test]
    fn missing_directory_and_empty_directory() {
        let error = SchemaCollector::find_workbooks(Path::new("no/such/dir")).unwrap_err();
        assert!(matches!(error, RustyTableError::CollectError(CollectError::DirectoryNotFound(_))));

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let error = SchemaCollector::find_workbooks(dir.path()).unwrap_err();
        assert!(matches!(error, RustyTableError::CollectError(CollectError::NoWorkbooks(_))));
    }

    #[test]
    fn workbooks_are_found_recursively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("b").join("Z.xls"), "").unwrap();
        std::fs::write(dir.path().join("a.XLSX"), "").unwrap();
        std::fs::write(dir.path().join("~$a.xlsx"), "").unwrap();
        std::fs::write(dir.path().join("c.csv"), "").unwrap();
        let files = SchemaCollector::find_workbooks(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|file| file.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.XLSX", "b/Z.xls"]);
    }
}
