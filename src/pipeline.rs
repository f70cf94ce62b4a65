use crate::codegen::CodeGenerator;
use crate::config::ConfigError;
use crate::config::ExtractConfig;
use crate::crypto::DataCipher;
use crate::diagnostics::DiagnosticsSink;
use crate::error::RustyTableError;
use crate::extract::ExtractedTable;
use crate::extract::LanguageTable;
use crate::extract::OrphanResolver;
use crate::extract::StringExtractor;
use crate::extract::TableExtractor;
use crate::schema::CollectedSchemas;
use crate::schema::SchemaCollector;
use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;

/// Which outputs a run produces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExtractionKind {
    /// Code, tables and strings
    All,
    /// `GameTables.cs` only
    Script,
    /// `<sheet>.json` only
    Table,
    /// `GSTR_<language>.json` only
    String,
}

impl ExtractionKind {
    fn needs_script(&self) -> bool {
        matches!(self, ExtractionKind::All | ExtractionKind::Script)
    }

    fn needs_tables(&self) -> bool {
        matches!(self, ExtractionKind::All | ExtractionKind::Table)
    }

    fn needs_strings(&self) -> bool {
        matches!(self, ExtractionKind::All | ExtractionKind::String)
    }
}

impl Display for ExtractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExtractionKind::All => "all",
            ExtractionKind::Script => "script",
            ExtractionKind::Table => "table",
            ExtractionKind::String => "string",
        };
        write!(f, "{name}")
    }
}

/// Runs discovery, extraction, code generation and output for one config.
pub struct Pipeline<'a> {
    config: ExtractConfig,
    sink: &'a dyn DiagnosticsSink,
    orphans: &'a dyn OrphanResolver,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: ExtractConfig, sink: &'a dyn DiagnosticsSink, orphans: &'a dyn OrphanResolver) -> Self {
        Self { config, sink, orphans }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Checks that every setting `kind` needs is present.
    pub fn validate(&self, kind: ExtractionKind) -> Result<(), ConfigError> {
        let config = &self.config;
        if config.table_path.is_none() {
            return Err(ConfigError::MissingSetting("table_path"));
        }
        if kind.needs_script() && config.script_output_path.is_none() {
            return Err(ConfigError::MissingSetting("script_output_path"));
        }
        if kind.needs_tables() && config.table_output_path.is_none() {
            return Err(ConfigError::MissingSetting("table_output_path"));
        }
        if kind.needs_strings() {
            if config.string_file_name.is_none() {
                return Err(ConfigError::MissingSetting("string_file_name"));
            }
            if config.string_output_path.is_none() {
                return Err(ConfigError::MissingSetting("string_output_path"));
            }
        }
        Ok(())
    }

    pub fn run(&self, kind: ExtractionKind) -> Result<(), RustyTableError> {
        self.sink.info(&format!("Starting {kind} extraction"));
        self.validate(kind)?;
        let cipher = self.config.cipher()?;
        let collected = self.collect()?;

        if kind.needs_script() {
            self.generate_script(&collected)?;
        }
        let tables = match kind.needs_tables() {
            true => Some(self.extract_tables(&collected)?),
            false => None,
        };
        let strings = match kind.needs_strings() {
            true => Some(self.extract_strings(&collected)?),
            false => None,
        };

        let cipher = cipher.as_ref();
        let (saved_tables, saved_strings) = rayon::join(
            || tables.as_ref().map_or(Ok(()), |tables| self.save_tables(tables, cipher)),
            || strings.as_ref().map_or(Ok(()), |strings| self.save_strings(strings, cipher)),
        );
        saved_tables?;
        saved_strings?;

        self.sink.success(&format!("Completed {kind} extraction"));
        Ok(())
    }

    fn collect(&self) -> Result<CollectedSchemas, RustyTableError> {
        let table_path = required(&self.config.table_path, "table_path")?;
        let collector = SchemaCollector::new(self.config.type_aliases()?)
            .with_enum_file(self.config.enum_file_name.as_deref())
            .with_string_file(self.config.string_file_name.as_deref());
        collector.collect_all(table_path, self.sink)
    }

    fn generate_script(&self, collected: &CollectedSchemas) -> Result<(), RustyTableError> {
        let dir = required(&self.config.script_output_path, "script_output_path")?;
        let path = CodeGenerator::new(&collected.tables).write_to(dir)?;
        self.sink.info(&format!("[Script] {}", path.display()));
        Ok(())
    }

    fn extract_tables(&self, collected: &CollectedSchemas) -> Result<ExtractedTable, RustyTableError> {
        let tables = TableExtractor::new(&collected.tables).run()?;
        self.sink.info(&format!("Extracted {} table(s)", tables.len()));
        Ok(tables)
    }

    fn extract_strings(&self, collected: &CollectedSchemas) -> Result<LanguageTable, RustyTableError> {
        if collected.strings.is_empty() {
            self.sink.warning("No string workbook found; no string files are written");
        }
        let strings = StringExtractor::new(&collected.strings).run()?;
        self.sink.info(&format!("Extracted {} language(s)", strings.languages.len()));
        Ok(strings)
    }

    fn save_tables(&self, tables: &ExtractedTable, cipher: Option<&DataCipher>) -> Result<(), RustyTableError> {
        let dir = required(&self.config.table_output_path, "table_output_path")?;
        self.sink.info("[Tables]");
        tables.save_tables(dir, cipher, self.orphans, self.sink)
    }

    fn save_strings(&self, strings: &LanguageTable, cipher: Option<&DataCipher>) -> Result<(), RustyTableError> {
        let dir = required(&self.config.string_output_path, "string_output_path")?;
        self.sink.info("[Strings]");
        strings.save_strings(dir, cipher, self.orphans, self.sink)
    }
}

fn required<'p>(setting: &'p Option<PathBuf>, name: &'static str) -> Result<&'p Path, ConfigError> {
    setting.as_deref().ok_or(ConfigError::MissingSetting(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::extract::KeepOrphans;

    fn config() -> ExtractConfig {
        ExtractConfig {
            table_path: Some(PathBuf::from("tables")),
            ..Default::default()
        }
    }

    #[test]
    fn validate_names_the_missing_setting() {
        let sink = MemorySink::new();
        let pipeline = Pipeline::new(ExtractConfig::default(), &sink, &KeepOrphans);
        assert_eq!(pipeline.validate(ExtractionKind::Table), Err(ConfigError::MissingSetting("table_path")));

        let pipeline = Pipeline::new(config(), &sink, &KeepOrphans);
        assert_eq!(pipeline.validate(ExtractionKind::Script), Err(ConfigError::MissingSetting("script_output_path")));
        assert_eq!(pipeline.validate(ExtractionKind::Table), Err(ConfigError::MissingSetting("table_output_path")));
        assert_eq!(pipeline.validate(ExtractionKind::String), Err(ConfigError::MissingSetting("string_file_name")));
    }

    #[test]
    fn all_needs_every_output() {
        let sink = MemorySink::new();
        let config = ExtractConfig {
            script_output_path: Some(PathBuf::from("scripts")),
            table_output_path: Some(PathBuf::from("json")),
            string_file_name: Some("Strings".to_owned()),
            ..config()
        };
        let pipeline = Pipeline::new(config.clone(), &sink, &KeepOrphans);
        assert_eq!(pipeline.validate(ExtractionKind::All), Err(ConfigError::MissingSetting("string_output_path")));
        assert!(pipeline.validate(ExtractionKind::Table).is_ok());

        let config = ExtractConfig { string_output_path: Some(PathBuf::from("strings")), ..config };
        assert!(Pipeline::new(config, &sink, &KeepOrphans).validate(ExtractionKind::All).is_ok());
    }

    #[test]
    fn run_fails_before_any_work_on_missing_setting() {
        let sink = MemorySink::new();
        let error = Pipeline::new(config(), &sink, &KeepOrphans).run(ExtractionKind::Script).unwrap_err();
        assert!(matches!(error, RustyTableError::ConfigError(ConfigError::MissingSetting("script_output_path"))));
        assert_eq!(sink.messages().len(), 1);
    }

    #[test]
    fn kind_names() {
        assert_eq!(ExtractionKind::All.to_string(), "all");
        assert_eq!(ExtractionKind::String.to_string(), "string");
    }
}
