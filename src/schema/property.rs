use chrono::NaiveDateTime;
use chrono::NaiveTime;
use chrono::Timelike;
use std::collections::HashMap;
use std::fmt::Display;

/// Declared type of a property column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyType {
    String,
    Int,
    Long,
    Float,
    Double,
    Bool,
    DateTime,
    TimeSpan,
}

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const TIMESPAN_FORMAT: &str = "%H:%M:%S";

impl PropertyType {
    pub const ALL: [PropertyType; 8] = [
        PropertyType::String,
        PropertyType::Int,
        PropertyType::Long,
        PropertyType::Float,
        PropertyType::Double,
        PropertyType::Bool,
        PropertyType::DateTime,
        PropertyType::TimeSpan,
    ];

    /// Canonical spelling, also the C# keyword or type name.
    pub const fn name(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Int => "int",
            PropertyType::Long => "long",
            PropertyType::Float => "float",
            PropertyType::Double => "double",
            PropertyType::Bool => "bool",
            PropertyType::DateTime => "DateTime",
            PropertyType::TimeSpan => "TimeSpan",
        }
    }

    /// Case-insensitive lookup of a canonical name.
    pub fn parse(name: &str) -> Option<PropertyType> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Whether `text` parses as this type: 32/64-bit integers, single/double
    /// floats, `true`/`false`, `yyyy-MM-dd HH:mm:ss`, `hh:mm:ss`; strings accept anything.
    pub fn accepts(&self, text: &str) -> bool {
        let trimmed = text.trim();
        match self {
            PropertyType::String => true,
            PropertyType::Int => trimmed.parse::<i32>().is_ok(),
            PropertyType::Long => trimmed.parse::<i64>().is_ok(),
            PropertyType::Float => trimmed.parse::<f32>().is_ok_and(|value| value.is_finite() || is_special_float(trimmed)),
            PropertyType::Double => trimmed.parse::<f64>().is_ok_and(|value| value.is_finite() || is_special_float(trimmed)),
            PropertyType::Bool => trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false"),
            PropertyType::DateTime => NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
                .is_ok_and(|parsed| parsed.nanosecond() < 1_000_000_000 && parsed.format(DATETIME_FORMAT).to_string() == text),
            PropertyType::TimeSpan => NaiveTime::parse_from_str(text, TIMESPAN_FORMAT)
                .is_ok_and(|parsed| parsed.nanosecond() < 1_000_000_000 && parsed.format(TIMESPAN_FORMAT).to_string() == text),
        }
    }
}

/// Non-finite spellings the invariant culture parses; `inf` and overflow are not among them.
fn is_special_float(text: &str) -> bool {
    matches!(text, "Infinity" | "-Infinity" | "NaN")
}

impl Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Case-insensitive map from type aliases written in row 3 to property types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeAliasMap {
    aliases: HashMap<String, PropertyType>,
}

impl Default for TypeAliasMap {
    /// Every canonical name maps to itself.
    fn default() -> Self {
        let aliases = PropertyType::ALL
            .into_iter()
            .map(|kind| (kind.name().to_lowercase(), kind))
            .collect();
        Self { aliases }
    }
}

impl TypeAliasMap {
    /// Adds or replaces an alias.
    pub fn insert(&mut self, alias: &str, kind: PropertyType) {
        self.aliases.insert(alias.trim().to_lowercase(), kind);
    }

    pub fn resolve(&self, alias: &str) -> Option<PropertyType> {
        self.aliases.get(&alias.trim().to_lowercase()).copied()
    }

    /// `(alias, type)` pairs sorted by alias.
    pub fn entries(&self) -> Vec<(String, PropertyType)> {
        let mut entries: Vec<(String, PropertyType)> = self.aliases
            .iter()
            .map(|(alias, kind)| (alias.to_owned(), *kind))
            .collect();
        entries.sort();
        entries
    }
}
