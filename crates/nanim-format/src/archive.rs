//! Named-entry container.
//!
//! A NANIM file is normally a tiny archive: magic, entry count, then
//! sequential `(name, payload)` entries. Animation data lives in the
//! `anim_data` entry; multi-actor packages add `character_data`. Files written
//! before the archive wrapper existed are a bare document; `Archive::open`
//! reports those as [`FormatError::NotAnArchive`] so the loader can fall back
//! to single-document mode.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{FormatError, Result};

pub const ANIM_ENTRY: &str = "anim_data";
pub const CHARACTER_ENTRY: &str = "character_data";

const MAGIC: [u8; 4] = *b"NNAR";
const MAX_ENTRIES: u32 = 64;
const MAX_ENTRY_LEN: u64 = 256 * 1024 * 1024;

/// An archive fully read into memory. Entries are small (animation
/// documents), so there is no lazy payload access.
#[derive(Debug)]
pub struct Archive {
    entries: Vec<(String, Vec<u8>)>,
}

impl Archive {
    /// Parse an archive from a reader. Returns `NotAnArchive` (with the
    /// reader position unspecified) when the magic does not match.
    pub fn read_from(r: &mut impl Read) -> Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(FormatError::NotAnArchive);
        }
        let count = r.read_u32::<LittleEndian>()?;
        if count > MAX_ENTRIES {
            return Err(FormatError::Malformed(format!(
                "entry count {count} exceeds limit"
            )));
        }
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_len = r.read_u32::<LittleEndian>()? as usize;
            if name_len > 1024 {
                return Err(FormatError::Malformed("entry name too long".into()));
            }
            let mut name = vec![0u8; name_len];
            r.read_exact(&mut name)?;
            let name = String::from_utf8(name)
                .map_err(|e| FormatError::Malformed(format!("entry name not utf-8: {e}")))?;
            let data_len = r.read_u64::<LittleEndian>()?;
            if data_len > MAX_ENTRY_LEN {
                return Err(FormatError::Malformed(format!(
                    "entry '{name}' length {data_len} exceeds limit"
                )));
            }
            let mut data = vec![0u8; data_len as usize];
            r.read_exact(&mut data)?;
            entries.push((name, data));
        }
        Ok(Self { entries })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let mut r = BufReader::new(File::open(path)?);
        Self::read_from(&mut r)
    }

    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find_map(|(n, d)| if n == name { Some(d.as_slice()) } else { None })
    }

    /// Entry lookup that errors with the entry name when absent.
    pub fn require(&self, name: &str) -> Result<&[u8]> {
        self.entry(name)
            .ok_or_else(|| FormatError::MissingEntry(name.to_string()))
    }
}

/// Streaming archive writer; entries are appended in call order.
#[derive(Debug)]
pub struct ArchiveWriter {
    entries: Vec<(String, Vec<u8>)>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, name: &str, data: Vec<u8>) {
        self.entries.push((name.to_string(), data));
    }

    pub fn write_to(&self, w: &mut impl Write) -> Result<()> {
        w.write_all(&MAGIC)?;
        w.write_u32::<LittleEndian>(self.entries.len() as u32)?;
        for (name, data) in &self.entries {
            w.write_u32::<LittleEndian>(name.len() as u32)?;
            w.write_all(name.as_bytes())?;
            w.write_u64::<LittleEndian>(data.len() as u64)?;
            w.write_all(data)?;
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trip() {
        let mut writer = ArchiveWriter::new();
        writer.add_entry(ANIM_ENTRY, vec![1, 2, 3]);
        writer.add_entry(CHARACTER_ENTRY, vec![9]);
        let mut bytes = Vec::new();
        writer.write_to(&mut bytes).unwrap();

        let archive = Archive::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(archive.entry(ANIM_ENTRY), Some(&[1u8, 2, 3][..]));
        assert_eq!(archive.entry(CHARACTER_ENTRY), Some(&[9u8][..]));
        assert!(archive.entry("nope").is_none());
    }

    #[test]
    fn bad_magic_is_not_an_archive() {
        let bytes = b"JSON{}..".to_vec();
        assert!(matches!(
            Archive::read_from(&mut bytes.as_slice()),
            Err(FormatError::NotAnArchive)
        ));
    }
}
