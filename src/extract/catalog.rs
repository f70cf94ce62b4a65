use std::collections::HashMap;
use std::collections::HashSet;

/// Primary-key values of every data sheet, by sheet name.
///
/// Sheets with the same name in different workbooks share one key set.
#[derive(Clone, Debug, Default)]
pub struct PrimaryKeyCatalog {
    keys: HashMap<String, HashSet<String>>,
}

impl PrimaryKeyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sheet with no keys yet; existing keys are kept.
    pub fn register(&mut self, sheet_name: &str) {
        self.keys.entry(sheet_name.to_owned()).or_default();
    }

    /// Adds a key, returning `false` when the sheet already has it.
    pub fn insert(&mut self, sheet_name: &str, key: &str) -> bool {
        self.keys
            .entry(sheet_name.to_owned())
            .or_default()
            .insert(key.to_owned())
    }

    pub fn contains_table(&self, sheet_name: &str) -> bool {
        self.keys.contains_key(sheet_name)
    }

    pub fn contains(&self, sheet_name: &str, key: &str) -> bool {
        self.keys
            .get(sheet_name)
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }

    pub fn keys(&self, sheet_name: &str) -> Option<&HashSet<String>> {
        self.keys.get(sheet_name)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
