//! BIFF8 record reader for the `Workbook` stream of Excel 97-2003 files.
//! Records are `(type: u16, size: u16, payload)`; payloads longer than one
//! record spill into CONTINUE records, which are stitched back together here.

use crate::error::RustyTableError;
use crate::helpers::string::to_f64;
use crate::helpers::string::to_u16;
use crate::helpers::string::to_u32;
use crate::helpers::string::to_u64;
use crate::helpers::string::to_usize;
use encoding_rs::Encoding;
use thiserror::Error;

const CONTINUE: u16 = 60;

#[derive(Error, Debug)]
pub enum Biff8Error {
    #[error("Fewer than {0} bytes remaining")]
    NoEnoughDataError(usize),
}

pub(crate) struct Biff8Reader {
    /// Encoding of compressed (8-bit) strings, set from the CODEPAGE record;
    /// code page 1200 (UTF-16) means plain Latin-1 widening
    pub(crate) encoding: &'static Encoding,
    buffer: Vec<u8>,
    // Position of the next record header
    pointer: usize,
    // Payload ranges of the current record and its CONTINUE records
    chunks: Vec<(usize, usize)>,
    index: usize,
    offset: usize,
}

impl Biff8Reader {
    pub(crate) fn new(data: Vec<u8>) -> Biff8Reader {
        Biff8Reader {
            encoding: encoding_rs::UTF_16LE,
            buffer: data,
            pointer: 0,
            chunks: Vec::new(),
            index: 0,
            offset: 0,
        }
    }

    /// Advances to the next record and returns its type, `None` at end of stream
    pub(crate) fn next(&mut self) -> Result<Option<u16>, RustyTableError> {
        if self.pointer + 4 > self.buffer.len() {
            return Ok(None);
        }
        self.index = 0;
        self.offset = 0;
        self.chunks.clear();

        let kind = self.get_u16_at(self.pointer)?;
        self.push_chunk()?;
        while self.pointer + 4 <= self.buffer.len() && self.get_u16_at(self.pointer)? == CONTINUE {
            self.push_chunk()?;
        }
        Ok(Some(kind))
    }

    fn push_chunk(&mut self) -> Result<(), RustyTableError> {
        let size = self.get_u16_at(self.pointer + 2)? as usize;
        let lower = self.pointer + 4;
        let upper = (lower + size).min(self.buffer.len());
        self.chunks.push((lower, upper));
        self.pointer = lower + size;
        Ok(())
    }

    /// Repositions at a record header, e.g. a sheet's BOF from BOUNDSHEET8
    pub(crate) fn goto(&mut self, pointer: usize) {
        self.pointer = pointer;
    }

    fn read_exact(&mut self, length: usize) -> Result<&[u8], RustyTableError> {
        let (data, size) = self.read(length);
        if size == length {
            Ok(data)
        } else {
            Err(Biff8Error::NoEnoughDataError(length))?
        }
    }

    /// Reads up to `length` bytes without crossing into the next chunk
    fn read(&mut self, length: usize) -> (&[u8], usize) {
        if let Some((lower, upper)) = self.chunks.get(self.index).copied() {
            let source = upper.min(lower + self.offset);
            let target = upper.min(source + length);
            let size = target - source;
            if source < upper {
                if target == upper {
                    self.index += 1;
                    self.offset = 0;
                } else {
                    self.offset += size;
                }
                return (&self.buffer[source..target], size);
            }
        }
        (&[], 0)
    }

    pub(crate) fn skip(&mut self, length: usize) -> Result<(), RustyTableError> {
        self.read_exact(length).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, RustyTableError> {
        self.read_exact(1).map(|data| data[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, RustyTableError> {
        self.read_exact(2).map(to_u16)
    }

    pub(crate) fn read_usize(&mut self) -> Result<usize, RustyTableError> {
        self.read_exact(4).map(to_usize)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, RustyTableError> {
        self.read_exact(8).map(to_u64)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, RustyTableError> {
        self.read_exact(8).map(to_f64)
    }

    /// Reads the `u16` that ends `offset` bytes before the end of the record
    pub(crate) fn get_u16_back(&self, offset: usize) -> Result<u16, RustyTableError> {
        let mut offset = offset;
        for (lower, upper) in self.chunks.iter().rev() {
            if *lower + offset <= *upper {
                return self.get_u16_at(*upper - offset);
            }
            offset -= *upper - *lower;
        }
        Err(Biff8Error::NoEnoughDataError(2))?
    }

    fn get_u16_at(&self, index: usize) -> Result<u16, RustyTableError> {
        match self.buffer.get(index..index + 2) {
            Some(bytes) => Ok(to_u16(bytes)),
            None => Err(Biff8Error::NoEnoughDataError(2))?,
        }
    }

    /// Reads an RK number: a 30-bit integer or the high 30 bits of an f64,
    /// optionally scaled by 1/100
    pub(crate) fn read_rk_number(&mut self) -> Result<String, RustyTableError> {
        let rk = self.read_exact(4).map(to_u32)?;
        Ok(decode_rk(rk))
    }

    /// ShortXLUnicodeString: 8-bit character count
    pub(crate) fn read_short_xl_unicode_string(&mut self) -> Result<String, RustyTableError> {
        let mut string = String::new();
        let chars = self.read_u8()? as usize;
        self.read_string_into(chars, false, &mut string)?;
        Ok(string)
    }

    /// XLUnicodeString: 16-bit character count
    pub(crate) fn read_xl_unicode_string(&mut self) -> Result<String, RustyTableError> {
        let mut string = String::new();
        let chars = self.read_u16()? as usize;
        self.read_string_into(chars, false, &mut string)?;
        Ok(string)
    }

    /// XLUnicodeRichExtendedString, as stored in the SST; the characters may
    /// continue in the next CONTINUE record behind a fresh option byte
    pub(crate) fn read_xl_unicode_rich_extended_string(&mut self) -> Result<String, RustyTableError> {
        let mut string = String::new();
        let mut expected = self.read_u16()? as usize;
        let mut actual = self.read_string_into(expected, true, &mut string)?;
        while actual < expected {
            expected -= actual;
            actual = self.read_string_into(expected, false, &mut string)?;
            if actual == 0 {
                Err(Biff8Error::NoEnoughDataError(expected))?
            }
        }
        Ok(string)
    }

    fn read_string_into(&mut self, chars: usize, is_extend: bool, content: &mut String) -> Result<usize, RustyTableError> {
        let flag = self.read_u8()?;
        let is_high_byte = (flag & 0x1) > 0;
        let rich_run_count = if is_extend && (flag & 0x8) > 0 {
            self.read_u16()? as usize
        } else {
            0
        };
        let phonetic_size = if is_extend && (flag & 0x4) > 0 {
            self.read_usize()?
        } else {
            0
        };

        let encoding = self.encoding;
        let expected = if is_high_byte { chars * 2 } else { chars };
        let (bytes, actual) = self.read(expected);
        if is_high_byte {
            let (string, _) = encoding_rs::UTF_16LE.decode_without_bom_handling(bytes);
            content.push_str(&string);
        } else if encoding == encoding_rs::UTF_16LE {
            // Compressed UTF-16: each byte is the low half of a code unit
            content.extend(bytes.iter().map(|byte| *byte as char));
        } else {
            let (string, _) = encoding.decode_without_bom_handling(bytes);
            content.push_str(&string);
        }

        self.skip(4 * rich_run_count)?;
        self.skip(phonetic_size)?;
        Ok(if is_high_byte { actual / 2 } else { actual })
    }
}

fn decode_rk(rk: u32) -> String {
    let is_percentage = (rk & 0x01) != 0;
    let is_integer = (rk & 0x02) != 0;
    if is_integer && !is_percentage {
        return ((rk as i32) >> 2).to_string();
    }
    let mut value = if is_integer {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk >> 2) as u64) << 34)
    };
    if is_percentage {
        value /= 100.0;
    }
    value.to_string()
}

#[macro_export]
macro_rules! match_biff8_record {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(kind) = $reader.next()? {
            match kind {
                $($arms)*
                _ => (),
            }
        }
    };
}
