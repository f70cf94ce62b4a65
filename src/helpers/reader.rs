use crate::error::RustyTableError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

/// A reader over a workbook that lives either on disk or in memory
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// In-memory buffer, used for embedded or already-loaded workbooks
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a local workbook file
    ///
    /// # Arguments
    /// * `path` - Path to the file
    ///
    /// # Returns
    /// * `Result<UnifiedReader, RustyTableError>` - Reader for the file content
    pub(crate) fn open(path: &Path) -> Result<UnifiedReader, RustyTableError> {
        let file = File::open(path)?;
        Ok(UnifiedReader::Local(BufReader::new(file)))
    }

    /// Wraps workbook bytes that are already in memory
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> UnifiedReader {
        UnifiedReader::Memory(Cursor::new(bytes))
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}
