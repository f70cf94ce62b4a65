//! JSON document output and stale-file handling.

use crate::crypto::DataCipher;
use crate::diagnostics::DiagnosticsSink;
use crate::error::ResultMessage;
use crate::error::RustyTableError;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Output directory not found: '{0}'")]
    DirectoryNotFound(String),
}

/// Decides what happens to `*.json` files in an output directory that no
/// longer correspond to a sheet or language.
pub trait OrphanResolver: Send + Sync {
    /// Returns `true` to delete the file.
    fn should_delete(&self, path: &Path) -> bool;
}

/// Leaves stale files in place.
#[derive(Copy, Clone, Debug, Default)]
pub struct KeepOrphans;

impl OrphanResolver for KeepOrphans {
    fn should_delete(&self, _path: &Path) -> bool {
        false
    }
}

/// Deletes every stale file.
#[derive(Copy, Clone, Debug, Default)]
pub struct DeleteOrphans;

impl OrphanResolver for DeleteOrphans {
    fn should_delete(&self, _path: &Path) -> bool {
        true
    }
}

/// `*.json` files directly in `dir` whose stem is not in `active`, sorted.
pub fn find_orphans(dir: &Path, active: &HashSet<String>) -> Result<Vec<PathBuf>, RustyTableError> {
    let pattern = format!("{}/*.json", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut orphans = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        if path.is_file() && !active.contains(&stem) {
            orphans.push(path);
        }
    }
    orphans.sort();
    Ok(orphans)
}

/// Offers every orphan to `resolver` and deletes the accepted ones.
/// Returns the deleted paths.
pub fn resolve_orphans(dir: &Path, active: &HashSet<String>, resolver: &dyn OrphanResolver, sink: &dyn DiagnosticsSink) -> Result<Vec<PathBuf>, RustyTableError> {
    let mut deleted = Vec::new();
    for orphan in find_orphans(dir, active)? {
        if resolver.should_delete(&orphan) {
            std::fs::remove_file(&orphan)?;
            sink.warning(&format!("Deleted unused file '{}'", orphan.display()));
            deleted.push(orphan);
        } else {
            sink.warning(&format!("Kept unused file '{}'", orphan.display()));
        }
    }
    Ok(deleted)
}

/// Pretty-printed JSON with raw Unicode, optionally encrypted.
pub fn render_document<T: Serialize + ?Sized>(value: &T, cipher: Option<&DataCipher>) -> Result<String, RustyTableError> {
    let text = serde_json::to_string_pretty(value)?;
    match cipher {
        Some(cipher) => Ok(cipher.encrypt(&text)?),
        None => Ok(text),
    }
}

/// Renders `value` and writes it to `path` as UTF-8.
pub fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T, cipher: Option<&DataCipher>) -> Result<(), RustyTableError> {
    let text = render_document(value, cipher).with_prefix(&path.display().to_string())?;
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Level;
    use crate::diagnostics::MemorySink;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn active(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn populate(dir: &Path) {
        for name in ["Item.json", "Old.json", "Ancient.json", "notes.txt"] {
            std::fs::write(dir.join(name), "{}").unwrap();
        }
    }

    #[test]
    fn finds_only_stale_json() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let orphans = find_orphans(dir.path(), &active(&["Item"])).unwrap();
        let names: Vec<String> = orphans
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["Ancient.json", "Old.json"]);
    }

    #[test]
    fn keep_orphans_leaves_files() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let sink = MemorySink::new();
        let deleted = resolve_orphans(dir.path(), &active(&["Item"]), &KeepOrphans, &sink).unwrap();
        assert!(deleted.is_empty());
        assert!(dir.path().join("Old.json").exists());
        assert_eq!(sink.of(Level::Warning).len(), 2);
    }

    #[test]
    fn delete_orphans_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let deleted = resolve_orphans(dir.path(), &active(&["Item"]), &DeleteOrphans, &MemorySink::new()).unwrap();
        assert_eq!(deleted.len(), 2);
        assert!(!dir.path().join("Old.json").exists());
        assert!(!dir.path().join("Ancient.json").exists());
        assert!(dir.path().join("Item.json").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn renders_raw_unicode() {
        let mut value = IndexMap::new();
        value.insert("1", "검");
        assert_eq!(render_document(&value, None).unwrap(), "{\n  \"1\": \"검\"\n}");
    }

    #[test]
    fn encrypted_document_decrypts_to_plain_json() {
        let cipher = DataCipher::new("passphrase").unwrap();
        let mut value = IndexMap::new();
        value.insert("key", "value");
        let encrypted = render_document(&value, Some(&cipher)).unwrap();
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), render_document(&value, None).unwrap());
    }
}
