//! OLE Compound File Binary (CFB) reader.
//! Used to reach the `Workbook` stream of legacy `.xls` files and to detect
//! password-protected OOXML packages, which Office wraps in a CFB container.

use crate::error::RustyTableError;
use crate::helpers::string::to_u16;
use crate::helpers::string::to_u64;
use crate::helpers::string::to_usize;
use crate::helpers::string::to_usize_iter;
use encoding_rs::UTF_16LE;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use thiserror::Error;

const SIGNATURE: u64 = 0xE11A_B1A1_E011_CFD0;
const HEADER_SIZE: usize = 512;
const DIRECTORY_ENTRY_SIZE: usize = 128;
const MINI_SECTOR_SIZE: usize = 64;
const MINI_STREAM_CUTOFF: usize = 4096;
// Sector ids at or above this value are markers (free, end of chain, FAT, DIFAT)
const MAX_REG_SECT: usize = 0xFFFFFFFB;

#[derive(Error, Debug)]
pub enum CfbError {
    #[error("The file is corrupted or has an invalid CFB structure")]
    FileFormatError,

    #[error("Invalid OLE signature (not an office document?)")]
    OleSignatureError,

    #[error("Invalid Sector size '2 ^ {1}' for major version '{0}'")]
    SectorSizeError(u16, u16),

    #[error("The number of double indirect file allocation table error: expect '{0}', actual '{1}'")]
    DoubleIndirectFileAllocationTableError(usize, usize),

    #[error("The number of file allocation table error: expect '{0}', actual '{1}'")]
    FileAllocationTableError(usize, usize),

    #[error("Empty Root directory")]
    RootDirectoryError,
}

/// An in-memory compound file: its directory plus both allocation tables
pub(crate) struct Cfb {
    streams: HashMap<String, Stream>,
    allocation_table: Vec<usize>,
    sectors: Sectors,
    mini_allocation_table: Vec<usize>,
    mini_sectors: Sectors,
}

impl Cfb {
    /// Loads the whole compound file and indexes its directory
    pub(crate) fn new<RS: Read + Seek>(reader: &mut RS) -> Result<Cfb, RustyTableError> {
        let size = reader.seek(SeekFrom::End(0))? as usize;
        if size < HEADER_SIZE {
            Err(CfbError::FileFormatError)?;
        }
        reader.seek(SeekFrom::Start(0))?;
        let mut data = vec![0u8; size];
        reader.read_exact(&mut data)?;

        let header = Header::new(&data[..HEADER_SIZE])?;
        let sectors = Sectors { size: header.sector_size()?, data };
        let allocation_table = load_allocation_table(&sectors, &header)?;
        let streams = load_streams(&allocation_table, &sectors, header.directory_start)?;
        let mini_allocation_table = if header.mini_allocation_table_count > 0 {
            let bytes = sectors.chain(&allocation_table, header.mini_allocation_table_start)?;
            to_usize_iter(&bytes).collect()
        } else {
            Vec::new()
        };
        let mini_sectors = match streams.get("Root Entry") {
            Some(root) => {
                let mut data = sectors.chain(&allocation_table, root.start)?;
                data.truncate(root.size);
                Sectors { size: MINI_SECTOR_SIZE, data }
            }
            None => Sectors { size: MINI_SECTOR_SIZE, data: Vec::new() },
        };

        Ok(Cfb {
            streams,
            allocation_table,
            sectors,
            mini_allocation_table,
            mini_sectors,
        })
    }

    pub(crate) fn exists(&self, name: &str) -> bool {
        self.streams.contains_key(name)
    }

    /// Reads a named stream, `None` when the directory has no such entry
    pub(crate) fn read(&self, name: &str) -> Result<Option<Vec<u8>>, RustyTableError> {
        let Some(stream) = self.streams.get(name) else {
            return Ok(None);
        };
        let mut bytes = if stream.size < MINI_STREAM_CUTOFF {
            self.mini_sectors.mini_chain(&self.mini_allocation_table, stream.start)?
        } else {
            self.sectors.chain(&self.allocation_table, stream.start)?
        };
        bytes.truncate(stream.size);
        Ok(Some(bytes))
    }
}

/// Walks the DIFAT (header part, then chained sectors) to assemble the FAT
fn load_allocation_table(sectors: &Sectors, header: &Header) -> Result<Vec<usize>, RustyTableError> {
    let mut difat: Vec<usize> = to_usize_iter(&sectors.data[76..HEADER_SIZE]).collect();

    let mut count = 0usize;
    let mut next = header.difat_start;
    while next < MAX_REG_SECT {
        difat.extend(to_usize_iter(sectors.get(next)?));
        next = difat.pop().ok_or(CfbError::FileFormatError)?;
        count += 1;
        if count > header.difat_count {
            break;
        }
    }
    if count != header.difat_count {
        Err(CfbError::DoubleIndirectFileAllocationTableError(header.difat_count, count))?
    }

    let mut allocation_table = Vec::new();
    let mut count = 0usize;
    for id in difat.into_iter().filter(|id| *id < MAX_REG_SECT) {
        allocation_table.extend(to_usize_iter(sectors.get(id)?));
        count += 1;
    }
    if count != header.allocation_table_count {
        Err(CfbError::FileAllocationTableError(header.allocation_table_count, count))?
    }

    Ok(allocation_table)
}

fn load_streams(allocation_table: &[usize], sectors: &Sectors, start: usize) -> Result<HashMap<String, Stream>, RustyTableError> {
    let bytes = sectors.chain(allocation_table, start)?;
    let streams: HashMap<String, Stream> = bytes
        .chunks_exact(DIRECTORY_ENTRY_SIZE)
        .map(Stream::new)
        .collect();
    if streams.is_empty() {
        Err(CfbError::RootDirectoryError)?
    }
    Ok(streams)
}

/// Raw file data addressed in fixed-size sectors
struct Sectors {
    size: usize,
    data: Vec<u8>,
}

impl Sectors {
    /// Regular sectors are numbered from the end of the header
    fn get(&self, id: usize) -> Result<&[u8], RustyTableError> {
        let lower = (id + 1) * self.size;
        let upper = self.data.len().min(lower + self.size);
        if lower >= upper {
            Err(CfbError::FileFormatError)?
        }
        Ok(&self.data[lower..upper])
    }

    /// Mini sectors are numbered from the start of the mini stream
    fn get_mini(&self, id: usize) -> Result<&[u8], RustyTableError> {
        let lower = id * self.size;
        let upper = self.data.len().min(lower + self.size);
        if lower >= upper {
            Err(CfbError::FileFormatError)?
        }
        Ok(&self.data[lower..upper])
    }

    fn chain(&self, table: &[usize], start: usize) -> Result<Vec<u8>, RustyTableError> {
        self.follow(table, start, Self::get)
    }

    fn mini_chain(&self, table: &[usize], start: usize) -> Result<Vec<u8>, RustyTableError> {
        self.follow(table, start, Self::get_mini)
    }

    /// Concatenates a sector chain; a chain longer than the table is a cycle
    fn follow<'a, F>(&'a self, table: &[usize], start: usize, get: F) -> Result<Vec<u8>, RustyTableError>
    where
        F: Fn(&'a Sectors, usize) -> Result<&'a [u8], RustyTableError>,
    {
        let mut content = Vec::new();
        let mut next = start;
        let mut steps = 0usize;
        while next < MAX_REG_SECT {
            content.extend_from_slice(get(self, next)?);
            next = *table.get(next).ok_or(CfbError::FileFormatError)?;
            steps += 1;
            if steps > table.len() {
                Err(CfbError::FileFormatError)?
            }
        }
        Ok(content)
    }
}

struct Header {
    major_version: u16,
    sector_shift: u16,
    allocation_table_count: usize,
    directory_start: usize,
    mini_allocation_table_start: usize,
    mini_allocation_table_count: usize,
    difat_start: usize,
    difat_count: usize,
}

impl Header {
    fn new(data: &[u8]) -> Result<Self, RustyTableError> {
        if to_u64(&data[0..8]) != SIGNATURE {
            Err(CfbError::OleSignatureError)?;
        }
        Ok(Header {
            major_version: to_u16(&data[26..28]),
            sector_shift: to_u16(&data[30..32]),
            allocation_table_count: to_usize(&data[44..48]),
            directory_start: to_usize(&data[48..52]),
            mini_allocation_table_start: to_usize(&data[60..64]),
            mini_allocation_table_count: to_usize(&data[64..68]),
            difat_start: to_usize(&data[68..72]),
            difat_count: to_usize(&data[72..76]),
        })
    }

    fn sector_size(&self) -> Result<usize, RustyTableError> {
        match (self.major_version, self.sector_shift) {
            (3, 0x0009) => Ok(512),
            // Version 4 pads the rest of the first 4096-byte sector with zeroes
            (4, 0x000C) => Ok(4096),
            (version, shift) => Err(CfbError::SectorSizeError(version, shift))?,
        }
    }
}

/// Directory entry: first sector and byte length of a stream
struct Stream {
    start: usize,
    size: usize,
}

impl Stream {
    fn new(bytes: &[u8]) -> (String, Stream) {
        let length = (to_u16(&bytes[64..66]) as usize).min(64);
        let (name, _, _) = UTF_16LE.decode(&bytes[..length]);
        let name = match name.find('\0') {
            Some(position) => name[..position].to_owned(),
            None => name.into_owned(),
        };
        let start = to_usize(&bytes[116..120]);
        let size = to_u64(&bytes[120..128]) as usize;
        (name, Stream { start, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn short_input_is_not_a_compound_file() {
        let mut reader = Cursor::new(vec![0u8; 100]);
        assert!(matches!(Cfb::new(&mut reader), Err(RustyTableError::CfbHelperError(CfbError::FileFormatError))));
    }

    #[test]
    fn zip_signature_is_rejected() {
        let mut data = vec![0u8; 1024];
        data[..4].copy_from_slice(b"PK\x03\x04");
        let mut reader = Cursor::new(data);
        assert!(matches!(Cfb::new(&mut reader), Err(RustyTableError::CfbHelperError(CfbError::OleSignatureError))));
    }
}
