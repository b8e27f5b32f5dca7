//! Schemaless binary document tree.
//!
//! A document is a tree of integers, floats, strings, arrays and maps,
//! serialized little-endian with a one-byte tag per node and length prefixes
//! on strings and collections. The outermost document is itself prefixed with
//! its encoded byte length so it can be embedded as an archive entry or stand
//! alone on disk.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{FormatError, Result};

const TAG_I32: u8 = 1;
const TAG_I64: u8 = 2;
const TAG_F32: u8 = 3;
const TAG_F64: u8 = 4;
const TAG_STR: u8 = 5;
const TAG_ARRAY: u8 = 6;
const TAG_MAP: u8 = 7;

/// Upper bound on any single length prefix. Guards against allocating
/// gigabytes for a corrupt prefix before the payload is even read.
const MAX_LEN: u32 = 64 * 1024 * 1024;

/// One node of a schemaless document.
///
/// Maps preserve insertion order (they are written back in the order they
/// were read), so load/save round-trips are byte-stable.
#[derive(Clone, Debug, PartialEq)]
pub enum DocValue {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Array(Vec<DocValue>),
    Map(Vec<(String, DocValue)>),
}

impl DocValue {
    /// Integer accessor accepting both integer widths.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DocValue::I32(v) => Some(*v as i64),
            DocValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Float accessor; integers widen so writers may store whole numbers
    /// either way.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DocValue::F32(v) => Some(*v as f64),
            DocValue::F64(v) => Some(*v),
            DocValue::I32(v) => Some(*v as f64),
            DocValue::I64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|v| v as f32)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DocValue]> {
        match self {
            DocValue::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, DocValue)]> {
        match self {
            DocValue::Map(entries) => Some(entries.as_slice()),
            _ => None,
        }
    }

    /// Map field lookup; `None` for non-maps or absent keys.
    pub fn get(&self, key: &str) -> Option<&DocValue> {
        self.as_map()?
            .iter()
            .find_map(|(k, v)| if k == key { Some(v) } else { None })
    }
}

fn read_len(r: &mut impl Read) -> Result<usize> {
    let len = r.read_u32::<LittleEndian>()?;
    if len > MAX_LEN {
        return Err(FormatError::Malformed(format!(
            "length prefix {len} exceeds limit"
        )));
    }
    Ok(len as usize)
}

fn read_string(r: &mut impl Read) -> Result<String> {
    let len = read_len(r)?;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| FormatError::Malformed(format!("invalid utf-8: {e}")))
}

fn write_string(w: &mut impl Write, s: &str) -> Result<()> {
    w.write_u32::<LittleEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_value(r: &mut impl Read, depth: u32) -> Result<DocValue> {
    if depth > 64 {
        return Err(FormatError::Malformed("nesting too deep".into()));
    }
    let tag = r.read_u8()?;
    Ok(match tag {
        TAG_I32 => DocValue::I32(r.read_i32::<LittleEndian>()?),
        TAG_I64 => DocValue::I64(r.read_i64::<LittleEndian>()?),
        TAG_F32 => DocValue::F32(r.read_f32::<LittleEndian>()?),
        TAG_F64 => DocValue::F64(r.read_f64::<LittleEndian>()?),
        TAG_STR => DocValue::Str(read_string(r)?),
        TAG_ARRAY => {
            let count = read_len(r)?;
            let mut items = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                items.push(read_value(r, depth + 1)?);
            }
            DocValue::Array(items)
        }
        TAG_MAP => {
            let count = read_len(r)?;
            let mut entries = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                let key = read_string(r)?;
                let value = read_value(r, depth + 1)?;
                entries.push((key, value));
            }
            DocValue::Map(entries)
        }
        other => {
            return Err(FormatError::Malformed(format!(
                "unknown value tag {other}"
            )))
        }
    })
}

fn write_value(w: &mut impl Write, value: &DocValue) -> Result<()> {
    match value {
        DocValue::I32(v) => {
            w.write_u8(TAG_I32)?;
            w.write_i32::<LittleEndian>(*v)?;
        }
        DocValue::I64(v) => {
            w.write_u8(TAG_I64)?;
            w.write_i64::<LittleEndian>(*v)?;
        }
        DocValue::F32(v) => {
            w.write_u8(TAG_F32)?;
            w.write_f32::<LittleEndian>(*v)?;
        }
        DocValue::F64(v) => {
            w.write_u8(TAG_F64)?;
            w.write_f64::<LittleEndian>(*v)?;
        }
        DocValue::Str(s) => {
            w.write_u8(TAG_STR)?;
            write_string(w, s)?;
        }
        DocValue::Array(items) => {
            w.write_u8(TAG_ARRAY)?;
            w.write_u32::<LittleEndian>(items.len() as u32)?;
            for item in items {
                write_value(w, item)?;
            }
        }
        DocValue::Map(entries) => {
            w.write_u8(TAG_MAP)?;
            w.write_u32::<LittleEndian>(entries.len() as u32)?;
            for (key, value) in entries {
                write_string(w, key)?;
                write_value(w, value)?;
            }
        }
    }
    Ok(())
}

/// Decode a length-prefixed document from a reader.
pub fn read_document(r: &mut impl Read) -> Result<DocValue> {
    let len = r.read_u64::<LittleEndian>()?;
    if len > MAX_LEN as u64 {
        return Err(FormatError::Malformed(format!(
            "document length {len} exceeds limit"
        )));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    read_value(&mut buf.as_slice(), 0)
}

/// Encode a document with its length prefix.
pub fn write_document(w: &mut impl Write, value: &DocValue) -> Result<()> {
    let mut body = Vec::new();
    write_value(&mut body, value)?;
    w.write_u64::<LittleEndian>(body.len() as u64)?;
    w.write_all(&body)?;
    Ok(())
}

/// Decode a document from an in-memory entry payload.
pub fn document_from_bytes(bytes: &[u8]) -> Result<DocValue> {
    read_document(&mut std::io::Cursor::new(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_trip() {
        let doc = DocValue::Map(vec![
            ("version".into(), DocValue::I32(3)),
            ("duration".into(), DocValue::F32(2.5)),
            ("name".into(), DocValue::Str("walk".into())),
            (
                "keys".into(),
                DocValue::Array(vec![DocValue::F64(0.25), DocValue::I64(7)]),
            ),
        ]);
        let mut bytes = Vec::new();
        write_document(&mut bytes, &doc).unwrap();
        let back = document_from_bytes(&bytes).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.get("version").and_then(DocValue::as_i64), Some(3));
        assert_eq!(back.get("duration").and_then(DocValue::as_f32), Some(2.5));
    }

    #[test]
    fn unknown_tag_is_malformed() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.push(99);
        assert!(matches!(
            document_from_bytes(&bytes),
            Err(FormatError::Malformed(_))
        ));
    }
}
