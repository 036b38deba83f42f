use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use std::io::{Read, Write};
use tracing::debug;

use crate::area::decode_fixed_string;
use crate::{Result, SorterError};

pub const SAVE_TAG: &str = "SAV V1.0";
const SAVE_TAG_LEN: usize = 8;

/// One named, individually compressed entry of a save archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    raw_name: Vec<u8>,
    name: String,
    pub uncompressed_length: u32,
    compressed: Vec<u8>,
}

impl ArchiveEntry {
    /// Builds an entry by compressing `payload`.
    pub fn new(name: &str, payload: &[u8]) -> Result<Self> {
        let (compressed, uncompressed_length) = compress_payload(payload)?;
        Ok(ArchiveEntry {
            raw_name: name.as_bytes().to_vec(),
            name: name.to_string(),
            uncompressed_length,
            compressed,
        })
    }

    fn from_parts(raw_name: Vec<u8>, uncompressed_length: u32, compressed: Vec<u8>) -> Self {
        let name = decode_fixed_string(&raw_name);
        ArchiveEntry {
            raw_name,
            name,
            uncompressed_length,
            compressed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name bytes exactly as stored in the archive.
    pub fn raw_name(&self) -> &[u8] {
        &self.raw_name
    }

    pub fn compressed_length(&self) -> u32 {
        // Entries are only built from a u32 length field or via compress_payload,
        // both of which keep the length in range.
        self.compressed.len() as u32
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        let data = decompress_payload(&self.compressed, self.uncompressed_length)?;
        if data.len() != self.uncompressed_length as usize {
            return Err(SorterError::Integrity {
                name: self.name.clone(),
                expected: self.uncompressed_length,
                actual: data.len(),
            });
        }
        Ok(data)
    }

    /// Same entry name, with `payload` freshly compressed in place of the old body.
    pub fn with_payload(&self, payload: &[u8]) -> Result<Self> {
        let (compressed, uncompressed_length) = compress_payload(payload)?;
        Ok(ArchiveEntry {
            raw_name: self.raw_name.clone(),
            name: self.name.clone(),
            uncompressed_length,
            compressed,
        })
    }
}

pub fn decompress_payload(data: &[u8], size_hint: u32) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    // The hint comes from the archive header; never trust it beyond what the
    // compressed body could plausibly expand to.
    let cap = (size_hint as usize).min(data.len().saturating_mul(16));
    let mut out = Vec::with_capacity(cap);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

pub fn compress_payload(data: &[u8]) -> Result<(Vec<u8>, u32)> {
    let raw_size = u32::try_from(data.len()).map_err(|_| {
        SorterError::Config("area payload exceeds 4 GiB and cannot be stored".to_string())
    })?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    let cmp_data = encoder.finish()?;

    if u32::try_from(cmp_data.len()).is_err() {
        return Err(SorterError::Config(
            "compressed payload exceeds 4 GiB and cannot be stored".to_string(),
        ));
    }

    Ok((cmp_data, raw_size))
}

/// Reads up to `len` bytes; returns fewer only at end of stream.
fn read_up_to<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

fn read_field<R: Read>(reader: &mut R, len: usize, context: &'static str) -> Result<Vec<u8>> {
    let buf = read_up_to(reader, len)?;
    if buf.len() != len {
        return Err(SorterError::Truncated {
            context,
            expected: len,
            got: buf.len(),
        });
    }
    Ok(buf)
}

fn read_u32<R: Read>(reader: &mut R, context: &'static str) -> Result<u32> {
    let buf = read_field(reader, 4, context)?;
    Ok(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Sequential reader over the entries of a save archive.
///
/// The stream ends cleanly when the next entry's name length cannot be read in
/// full; a short read anywhere later in an entry is a truncation error.
pub struct EntryReader<R> {
    inner: R,
    index: usize,
    finished: bool,
}

impl<R: Read> EntryReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let tag = read_field(&mut inner, SAVE_TAG_LEN, "archive tag")?;
        let found = decode_fixed_string(&tag);
        if found != SAVE_TAG {
            return Err(SorterError::Format {
                context: "archive",
                expected: SAVE_TAG,
                found,
            });
        }

        Ok(EntryReader {
            inner,
            index: 0,
            finished: false,
        })
    }

    pub fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        if self.finished {
            return Ok(None);
        }

        // A short name-length read, even a partial one, marks the end of the archive.
        let len_bytes = read_up_to(&mut self.inner, 4)?;
        if len_bytes.len() < 4 {
            if !len_bytes.is_empty() {
                debug!(trailing = len_bytes.len(), "ignoring partial name length at end of archive");
            }
            self.finished = true;
            return Ok(None);
        }
        let name_len =
            u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;

        let raw_name = read_field(&mut self.inner, name_len, "entry name")?;
        let uncompressed_length = read_u32(&mut self.inner, "entry uncompressed length")?;
        let compressed_length = read_u32(&mut self.inner, "entry compressed length")?;
        let compressed = read_field(
            &mut self.inner,
            compressed_length as usize,
            "entry compressed data",
        )?;

        let entry = ArchiveEntry::from_parts(raw_name, uncompressed_length, compressed);
        debug!(
            index = self.index,
            name = entry.name(),
            uncompressed_length,
            compressed_length,
            "read archive entry"
        );
        self.index += 1;
        Ok(Some(entry))
    }
}

impl<R: Read> Iterator for EntryReader<R> {
    type Item = Result<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

/// Writes a save archive entry by entry, tag first.
pub struct ArchiveWriter<W> {
    inner: W,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(mut inner: W) -> Result<Self> {
        inner.write_all(SAVE_TAG.as_bytes())?;
        Ok(ArchiveWriter { inner })
    }

    pub fn write_entry(&mut self, entry: &ArchiveEntry) -> Result<()> {
        let name_len = u32::try_from(entry.raw_name.len()).map_err(|_| {
            SorterError::Config(format!("entry name '{}' is too long", entry.name))
        })?;
        self.inner.write_all(&name_len.to_le_bytes())?;
        self.inner.write_all(&entry.raw_name)?;
        self.inner.write_all(&entry.uncompressed_length.to_le_bytes())?;
        self.inner.write_all(&entry.compressed_length().to_le_bytes())?;
        self.inner.write_all(&entry.compressed)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
