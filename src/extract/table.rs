use crate::address::AddressedError;
use crate::address::ErrorKind;
use crate::address::TableAddress;
use crate::crypto::DataCipher;
use crate::diagnostics::DiagnosticsSink;
use crate::error::RustyTableError;
use crate::extract::catalog::PrimaryKeyCatalog;
use crate::extract::output;
use crate::extract::output::OrphanResolver;
use crate::extract::output::OutputError;
use crate::extract::validate_cell;
use crate::schema::SheetSchema;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;

/// Property name to raw cell text, in column order.
pub type RowRecord = IndexMap<String, String>;

/// Row key to row record, in row order.
pub type SheetRows = IndexMap<String, RowRecord>;

/// Extracted rows of every data sheet, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedTable {
    pub sheets: IndexMap<String, SheetRows>,
}

impl ExtractedTable {
    pub fn get(&self, sheet_name: &str) -> Option<&SheetRows> {
        self.sheets.get(sheet_name)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Output file stems, one per sheet.
    pub fn active_basenames(&self) -> HashSet<String> {
        self.sheets.keys().cloned().collect()
    }

    /// Writes `<sheet>.json` for every sheet into an existing directory,
    /// after offering stale `*.json` files there to `orphans`.
    pub fn save_tables(&self, dir: &Path, cipher: Option<&DataCipher>, orphans: &dyn OrphanResolver, sink: &dyn DiagnosticsSink) -> Result<(), RustyTableError> {
        if !dir.is_dir() {
            Err(OutputError::DirectoryNotFound(dir.display().to_string()))?
        }
        output::resolve_orphans(dir, &self.active_basenames(), orphans, sink)?;
        for (sheet_name, rows) in &self.sheets {
            let path = dir.join(format!("{sheet_name}.json"));
            output::write_document(&path, rows, cipher)?;
            sink.info(&format!("  * {} ({} rows)", path.display(), rows.len()));
        }
        Ok(())
    }
}

/// Validates keys and references across data sheets and extracts their rows.
pub struct TableExtractor<'a> {
    schemas: &'a [SheetSchema],
    catalog: PrimaryKeyCatalog,
    address: TableAddress,
}

impl<'a> TableExtractor<'a> {
    pub fn new(schemas: &'a [SheetSchema]) -> Self {
        Self {
            schemas,
            catalog: PrimaryKeyCatalog::new(),
            address: TableAddress::new(),
        }
    }

    pub fn catalog(&self) -> &PrimaryKeyCatalog {
        &self.catalog
    }

    /// Catalogues, validates and extracts, in that order.
    pub fn run(&mut self) -> Result<ExtractedTable, AddressedError> {
        self.collect_primary_keys()?;
        self.validate_foreign_keys()?;
        self.extract()
    }

    /// Collects the key set of every sheet.
    ///
    /// Empty primary-key cells are skipped; any other key must pass the cell
    /// check and be unique within its sheet name. Sheets without a primary
    /// key get the row indexes `0..row_count`.
    pub fn collect_primary_keys(&mut self) -> Result<(), AddressedError> {
        let schemas = self.schemas;
        for schema in schemas {
            self.address.enter_sheet(&schema.table_name, &schema.sheet_name);
            self.catalog.register(&schema.sheet_name);
            let Some(primary_key) = schema.primary_key else {
                for row in 0..schema.row_count {
                    self.catalog.insert(&schema.sheet_name, &row.to_string());
                }
                continue;
            };
            for row in 0..schema.row_count {
                self.enter_cell(schema, row, primary_key);
                let text = schema.text(row, primary_key);
                if text.is_empty() {
                    continue;
                }
                let key = validate_cell(text, schema.property_types[primary_key], &self.address)?;
                if !self.catalog.insert(&schema.sheet_name, &key) {
                    return self.address.fail(ErrorKind::Integrity, format!("duplicate primary key value '{key}'"));
                }
            }
        }
        Ok(())
    }

    /// Checks that every foreign-key value names a key of the referenced sheet.
    pub fn validate_foreign_keys(&mut self) -> Result<(), AddressedError> {
        let schemas = self.schemas;
        for schema in schemas {
            self.address.enter_sheet(&schema.table_name, &schema.sheet_name);
            for foreign_key in &schema.foreign_keys {
                let table = &foreign_key.referenced_table;
                if !self.catalog.contains_table(table) {
                    self.address.set_column(&schema.property_names[foreign_key.column]);
                    self.address.set_cell("");
                    return self.address.fail(ErrorKind::Integrity, format!("referenced table '{table}' not found"));
                }
                for row in 0..schema.row_count {
                    self.enter_cell(schema, row, foreign_key.column);
                    let value = validate_cell(
                        schema.text(row, foreign_key.column),
                        schema.property_types[foreign_key.column],
                        &self.address,
                    )?;
                    if !self.catalog.contains(table, &value) {
                        return self.address.fail(
                            ErrorKind::Integrity,
                            format!("foreign key value '{value}' not found in the primary keys of '{table}'"),
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Extracts every row of every sheet, keyed by primary key or row index.
    pub fn extract(&mut self) -> Result<ExtractedTable, AddressedError> {
        let schemas = self.schemas;
        let mut extracted = ExtractedTable::default();
        for schema in schemas {
            self.address.enter_sheet(&schema.table_name, &schema.sheet_name);
            let mut rows = SheetRows::with_capacity(schema.row_count);
            for row in 0..schema.row_count {
                let key = match schema.primary_key {
                    Some(primary_key) => {
                        self.enter_cell(schema, row, primary_key);
                        validate_cell(schema.text(row, primary_key), schema.property_types[primary_key], &self.address)?
                    }
                    None => row.to_string(),
                };
                let mut record = RowRecord::with_capacity(schema.column_count);
                for property in schema.value_properties() {
                    self.enter_cell(schema, row, property);
                    let value = validate_cell(schema.text(row, property), schema.property_types[property], &self.address)?;
                    record.insert(schema.property_names[property].to_owned(), value);
                }
                rows.insert(key, record);
            }
            extracted.sheets.insert(schema.sheet_name.to_owned(), rows);
        }
        self.address.reset();
        Ok(extracted)
    }

    fn enter_cell(&mut self, schema: &SheetSchema, row: usize, property: usize) {
        self.address.set_column(&schema.property_names[property]);
        self.address.set_cell(&schema.reference(row, property));
    }
}
