//! Persisted extraction settings and the type-alias list.

use crate::crypto::DataCipher;
use crate::error::ResultMessage;
use crate::error::RustyTableError;
use crate::schema::PropertyType;
use crate::schema::TypeAliasMap;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting '{0}'")]
    MissingSetting(&'static str),

    #[error("Type alias '{0}' maps to unknown type '{1}'")]
    UnknownOriginalType(String, String),
}

/// Paths and options of one extraction setup, stored as JSON.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ExtractConfig {
    /// Directory searched recursively for workbooks
    pub table_path: Option<PathBuf>,
    /// File stem of the localization workbook
    pub string_file_name: Option<String>,
    /// File stem of a workbook to skip entirely
    pub enum_file_name: Option<String>,
    pub script_output_path: Option<PathBuf>,
    pub table_output_path: Option<PathBuf>,
    pub string_output_path: Option<PathBuf>,
    /// Encrypts every output document when set
    pub encryption_key: Option<String>,
    /// `type_alias.json`; the identity aliases apply when unset or absent
    pub type_alias_path: Option<PathBuf>,
}

impl ExtractConfig {
    pub fn load(path: &Path) -> Result<Self, RustyTableError> {
        let text = std::fs::read_to_string(path).map_err(RustyTableError::from).with_prefix(&path.display().to_string())?;
        let config = serde_json::from_str(&text).map_err(RustyTableError::from).with_prefix(&path.display().to_string())?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), RustyTableError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Settings present in `overrides` replace the ones in `self`.
    pub fn merge(self, overrides: ExtractConfig) -> Self {
        Self {
            table_path: overrides.table_path.or(self.table_path),
            string_file_name: overrides.string_file_name.or(self.string_file_name),
            enum_file_name: overrides.enum_file_name.or(self.enum_file_name),
            script_output_path: overrides.script_output_path.or(self.script_output_path),
            table_output_path: overrides.table_output_path.or(self.table_output_path),
            string_output_path: overrides.string_output_path.or(self.string_output_path),
            encryption_key: overrides.encryption_key.or(self.encryption_key),
            type_alias_path: overrides.type_alias_path.or(self.type_alias_path),
        }
    }

    pub fn type_aliases(&self) -> Result<TypeAliasMap, RustyTableError> {
        match &self.type_alias_path {
            Some(path) => TypeAliasMap::load(path),
            None => Ok(TypeAliasMap::default()),
        }
    }

    /// The cipher for the configured key, used as given; a blank key means no encryption.
    pub fn cipher(&self) -> Result<Option<DataCipher>, RustyTableError> {
        match self.encryption_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(Some(DataCipher::new(key)?)),
            _ => Ok(None),
        }
    }
}

/// One persisted alias, e.g. `{"AliasType": "text", "OriginalType": "string"}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TypeAliasItem {
    #[serde(rename = "AliasType")]
    pub alias_type: String,
    #[serde(rename = "OriginalType")]
    pub original_type: String,
}

impl TypeAliasMap {
    /// Identity aliases plus the items of a `type_alias.json`; a missing
    /// file leaves the identity aliases alone.
    pub fn load(path: &Path) -> Result<Self, RustyTableError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let items: Vec<TypeAliasItem> = serde_json::from_str(&text)
            .map_err(RustyTableError::from)
            .with_prefix(&path.display().to_string())?;
        Ok(Self::from_items(&items)?)
    }

    pub fn from_items(items: &[TypeAliasItem]) -> Result<Self, ConfigError> {
        let mut aliases = Self::default();
        for item in items {
            let kind = PropertyType::parse(&item.original_type).ok_or_else(|| {
                ConfigError::UnknownOriginalType(item.alias_type.to_owned(), item.original_type.to_owned())
            })?;
            aliases.insert(&item.alias_type, kind);
        }
        Ok(aliases)
    }

    pub fn to_items(&self) -> Vec<TypeAliasItem> {
        self.entries()
            .into_iter()
            .map(|(alias, kind)| TypeAliasItem {
                alias_type: alias,
                original_type: kind.name().to_owned(),
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<(), RustyTableError> {
        std::fs::write(path, serde_json::to_string_pretty(&self.to_items())?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_snake_case_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"table_path": "tables", "string_file_name": "Strings", "encryption_key": "secret key"}"#).unwrap();
        let config = ExtractConfig::load(&path).unwrap();
        assert_eq!(config.table_path, Some(PathBuf::from("tables")));
        assert_eq!(config.string_file_name.as_deref(), Some("Strings"));
        assert_eq!(config.enum_file_name, None);
        assert!(config.cipher().unwrap().is_some());
    }

    #[test]
    fn save_and_load_keep_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = ExtractConfig {
            table_path: Some(PathBuf::from("in")),
            table_output_path: Some(PathBuf::from("out")),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ExtractConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn overrides_win() {
        let base = ExtractConfig {
            table_path: Some(PathBuf::from("a")),
            script_output_path: Some(PathBuf::from("scripts")),
            ..Default::default()
        };
        let overrides = ExtractConfig {
            table_path: Some(PathBuf::from("b")),
            ..Default::default()
        };
        let merged = base.merge(overrides);
        assert_eq!(merged.table_path, Some(PathBuf::from("b")));
        assert_eq!(merged.script_output_path, Some(PathBuf::from("scripts")));
    }

    #[test]
    fn blank_or_short_key() {
        let config = ExtractConfig { encryption_key: Some("  ".to_owned()), ..Default::default() };
        assert!(config.cipher().unwrap().is_none());
        let config = ExtractConfig { encryption_key: Some("short".to_owned()), ..Default::default() };
        assert!(matches!(config.cipher(), Err(RustyTableError::CipherError(_))));
    }

    #[test]
    fn key_is_used_as_given() {
        let config = ExtractConfig { encryption_key: Some(" padded key ".to_owned()), ..Default::default() };
        let encrypted = config.cipher().unwrap().unwrap().encrypt("{}").unwrap();
        let same_key = DataCipher::new(" padded key ").unwrap();
        assert_eq!(same_key.decrypt(&encrypted).unwrap(), "{}");
        let trimmed_key = DataCipher::new("padded key").unwrap();
        assert!(trimmed_key.decrypt(&encrypted).is_err());
    }

    #[test]
    fn alias_file_extends_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("type_alias.json");
        std::fs::write(&path, r#"[{"AliasType": "text", "OriginalType": "string"}, {"AliasType": "i64", "OriginalType": "Long"}]"#).unwrap();
        let aliases = TypeAliasMap::load(&path).unwrap();
        assert_eq!(aliases.resolve("Text"), Some(PropertyType::String));
        assert_eq!(aliases.resolve("i64"), Some(PropertyType::Long));
        assert_eq!(aliases.resolve("int"), Some(PropertyType::Int));
    }

    #[test]
    fn missing_alias_file_uses_defaults() {
        let aliases = TypeAliasMap::load(Path::new("no/such/type_alias.json")).unwrap();
        assert_eq!(aliases, TypeAliasMap::default());
    }

    #[test]
    fn unknown_original_type() {
        let items = vec![TypeAliasItem { alias_type: "vec".to_owned(), original_type: "Vector3".to_owned() }];
        assert_eq!(
            TypeAliasMap::from_items(&items).unwrap_err(),
            ConfigError::UnknownOriginalType("vec".to_owned(), "Vector3".to_owned())
        );
    }

    #[test]
    fn alias_items_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("type_alias.json");
        let mut aliases = TypeAliasMap::default();
        aliases.insert("text", PropertyType::String);
        aliases.save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"AliasType\": \"text\""));
        assert_eq!(TypeAliasMap::load(&path).unwrap(), aliases);
    }
}
