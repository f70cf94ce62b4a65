use crate::address::AddressedError;
use crate::address::ErrorKind;
use crate::address::TableAddress;
use crate::crypto::DataCipher;
use crate::diagnostics::DiagnosticsSink;
use crate::error::RustyTableError;
use crate::extract::output;
use crate::extract::output::OrphanResolver;
use crate::schema::PropertyType;
use crate::schema::SheetSchema;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;

/// Output file stem prefix for a language.
pub const STRING_FILE_PREFIX: &str = "GSTR_";

/// Localized text by language, then by string key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LanguageTable {
    pub languages: IndexMap<String, IndexMap<String, String>>,
}

impl LanguageTable {
    pub fn get(&self, language: &str) -> Option<&IndexMap<String, String>> {
        self.languages.get(language)
    }

    pub fn file_stem(language: &str) -> String {
        format!("{STRING_FILE_PREFIX}{language}")
    }

    pub fn active_basenames(&self) -> HashSet<String> {
        self.languages.keys().map(|language| Self::file_stem(language)).collect()
    }

    /// Writes `GSTR_<language>.json` per language, creating `dir` if needed.
    pub fn save_strings(&self, dir: &Path, cipher: Option<&DataCipher>, orphans: &dyn OrphanResolver, sink: &dyn DiagnosticsSink) -> Result<(), RustyTableError> {
        std::fs::create_dir_all(dir)?;
        output::resolve_orphans(dir, &self.active_basenames(), orphans, sink)?;
        for (language, texts) in &self.languages {
            let path = dir.join(format!("{}.json", Self::file_stem(language)));
            output::write_document(&path, texts, cipher)?;
            sink.info(&format!("  * {} ({} strings)", path.display(), texts.len()));
        }
        Ok(())
    }
}

/// Validates localization sheets and transposes them into per-language maps.
///
/// Every sheet needs a primary key and every other column is a `string`
/// language column. Keys are unique across all sheets.
pub struct StringExtractor<'a> {
    schemas: &'a [SheetSchema],
    address: TableAddress,
}

impl<'a> StringExtractor<'a> {
    pub fn new(schemas: &'a [SheetSchema]) -> Self {
        Self {
            schemas,
            address: TableAddress::new(),
        }
    }

    pub fn run(&mut self) -> Result<LanguageTable, AddressedError> {
        self.collect_languages()?;
        self.extract()
    }

    /// Checks the column layout of every sheet and returns the languages in
    /// first-seen order.
    pub fn collect_languages(&mut self) -> Result<Vec<String>, AddressedError> {
        let schemas = self.schemas;
        let mut languages: Vec<String> = Vec::new();
        for schema in schemas {
            self.address.enter_sheet(&schema.table_name, &schema.sheet_name);
            if schema.primary_key.is_none() {
                return self.address.fail(ErrorKind::Schema, "string table requires a primary key");
            }
            for property in schema.value_properties() {
                let language = &schema.property_names[property];
                let kind = schema.property_types[property];
                if kind != PropertyType::String {
                    self.address.set_column(language);
                    return self.address.fail(ErrorKind::Schema, format!("language column must be string, found {kind}"));
                }
                if !languages.contains(language) {
                    languages.push(language.to_owned());
                }
            }
        }
        self.address.reset();
        Ok(languages)
    }

    /// Extracts every row; keys must be non-empty and unique across sheets.
    pub fn extract(&mut self) -> Result<LanguageTable, AddressedError> {
        let schemas = self.schemas;
        let mut keys = HashSet::new();
        let mut table = LanguageTable::default();
        for schema in schemas {
            self.address.enter_sheet(&schema.table_name, &schema.sheet_name);
            let Some(primary_key) = schema.primary_key else {
                return self.address.fail(ErrorKind::Schema, "string table requires a primary key");
            };
            for property in schema.value_properties() {
                table.languages.entry(schema.property_names[property].to_owned()).or_default();
            }
            for row in 0..schema.row_count {
                self.enter_cell(schema, row, primary_key);
                let key = schema.text(row, primary_key);
                if key.is_empty() {
                    return self.address.fail(ErrorKind::Integrity, "string key is empty");
                }
                if !keys.insert(key.to_owned()) {
                    return self.address.fail(ErrorKind::Integrity, format!("duplicate string key '{key}'"));
                }
                for property in schema.value_properties() {
                    self.enter_cell(schema, row, property);
                    let text = schema.text(row, property);
                    if text.is_empty() {
                        return self.address.fail(ErrorKind::Value, "string value is empty");
                    }
                    let language = &schema.property_names[property];
                    table
                        .languages
                        .entry(language.to_owned())
                        .or_default()
                        .insert(key.to_owned(), text);
                }
            }
        }
        self.address.reset();
        Ok(table)
    }

    fn enter_cell(&mut self, schema: &SheetSchema, row: usize, property: usize) {
        self.address.set_column(&schema.property_names[property]);
        self.address.set_cell(&schema.reference(row, property));
    }
}
