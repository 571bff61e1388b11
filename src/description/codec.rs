//! Versioned binary encoding of detached descriptions.
//!
//! Layout of one description (little endian):
//!
//! ```text
//! version:u8 | type:str | direction:u8 | absent:u8 | count:u32 | (key:str | predicate)*
//! predicate := TAG_EQUAL value | TAG_ANY | TAG_UNDEFINED
//! value     := TAG_BOOL u8 | TAG_INT i64 | TAG_FLOAT f64 | TAG_STRING str | TAG_BYTES str
//! str       := len:u32 bytes
//! ```
//!
//! The string form used for property keys is `prefix + base64url(encoding)`, so the prefix
//! namespaces independent caches living on the same vertex.

use std::collections::BTreeMap;
use std::convert::TryInto;

use base64::engine::general_purpose::URL_SAFE_NO_PAD as KEY_ENGINE;
use base64::Engine;

use crate::error::{DegreeCacheError, Result};
use crate::model::{Direction, PropertyValue};

use super::edge::DetachedEdgeDescription;
use super::predicate::PropertyPredicate;
use super::properties::{AbsentKeys, DetachedPropertiesDescription};

/// Current encoding version.
pub const CODEC_VERSION: u8 = 1;

const TAG_EQUAL: u8 = 0x01;
const TAG_ANY: u8 = 0x02;
const TAG_UNDEFINED: u8 = 0x03;

const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_FLOAT: u8 = 0x03;
const TAG_STRING: u8 = 0x04;
const TAG_BYTES: u8 = 0x05;

/// Encodes a description into its binary form.
pub fn encode(description: &DetachedEdgeDescription) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.push(CODEC_VERSION);
    write_description(&mut buf, description)?;
    Ok(buf)
}

/// Decodes a description produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<DetachedEdgeDescription> {
    let mut cursor = Cursor::new(bytes);
    cursor.expect_version()?;
    let description = cursor.read_description()?;
    cursor.ensure_consumed()?;
    Ok(description)
}

/// `prefix` followed by the base64url form of [`encode`].
pub fn to_prefixed_string(description: &DetachedEdgeDescription, prefix: &str) -> Result<String> {
    let bytes = encode(description)?;
    let mut out = String::with_capacity(prefix.len() + bytes.len() * 4 / 3 + 4);
    out.push_str(prefix);
    KEY_ENGINE.encode_string(bytes, &mut out);
    Ok(out)
}

/// Inverse of [`to_prefixed_string`]; fails when `value` does not start with `prefix`.
pub fn from_prefixed_string(value: &str, prefix: &str) -> Result<DetachedEdgeDescription> {
    let payload = value.strip_prefix(prefix).ok_or_else(|| {
        DegreeCacheError::Serialization(format!("{value:?} does not start with prefix {prefix:?}"))
    })?;
    let bytes = KEY_ENGINE
        .decode(payload)
        .map_err(|err| DegreeCacheError::Serialization(format!("invalid base64 payload: {err}")))?;
    decode(&bytes)
}

/// Encodes a whole entry map (description to degree) as one blob.
pub fn encode_entries(entries: &BTreeMap<DetachedEdgeDescription, i64>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.push(CODEC_VERSION);
    write_len(&mut buf, entries.len(), "too many entries to serialize")?;
    for (description, degree) in entries {
        write_description(&mut buf, description)?;
        buf.extend_from_slice(&degree.to_le_bytes());
    }
    Ok(buf)
}

/// Decodes a blob produced by [`encode_entries`].
pub fn decode_entries(bytes: &[u8]) -> Result<BTreeMap<DetachedEdgeDescription, i64>> {
    let mut cursor = Cursor::new(bytes);
    cursor.expect_version()?;
    let count = cursor.read_u32()? as usize;
    let mut entries = BTreeMap::new();
    for _ in 0..count {
        let description = cursor.read_description()?;
        let degree = cursor.read_i64()?;
        if entries.insert(description, degree).is_some() {
            return Err(DegreeCacheError::Serialization(
                "duplicate description in entry blob".into(),
            ));
        }
    }
    cursor.ensure_consumed()?;
    Ok(entries)
}

fn write_description(buf: &mut Vec<u8>, description: &DetachedEdgeDescription) -> Result<()> {
    write_string(buf, description.edge_type())?;
    buf.push(direction_tag(description.direction()));
    let properties = description.properties();
    buf.push(match properties.absent_keys() {
        AbsentKeys::Undefined => 0,
        AbsentKeys::Any => 1,
    });
    let predicates = properties.predicates();
    write_len(buf, predicates.len(), "too many predicates to serialize")?;
    for (key, predicate) in predicates {
        write_string(buf, key)?;
        match predicate {
            PropertyPredicate::EqualTo(value) => {
                buf.push(TAG_EQUAL);
                write_property_value(buf, value)?;
            }
            PropertyPredicate::Any => buf.push(TAG_ANY),
            PropertyPredicate::Undefined => buf.push(TAG_UNDEFINED),
        }
    }
    Ok(())
}

fn direction_tag(direction: Direction) -> u8 {
    match direction {
        Direction::Outgoing => 0,
        Direction::Incoming => 1,
        Direction::Both => 2,
    }
}

fn write_property_value(buf: &mut Vec<u8>, value: &PropertyValue) -> Result<()> {
    match value {
        PropertyValue::Bool(v) => {
            buf.push(TAG_BOOL);
            buf.push(u8::from(*v));
        }
        PropertyValue::Int(v) => {
            buf.push(TAG_INT);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        PropertyValue::Float(v) => {
            buf.push(TAG_FLOAT);
            buf.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        PropertyValue::String(s) => {
            buf.push(TAG_STRING);
            write_string(buf, s)?;
        }
        PropertyValue::Bytes(b) => {
            buf.push(TAG_BYTES);
            write_len(buf, b.len(), "byte array length exceeds u32::MAX")?;
            buf.extend_from_slice(b);
        }
    }
    Ok(())
}

fn write_string(buf: &mut Vec<u8>, value: &str) -> Result<()> {
    write_len(buf, value.len(), "string length exceeds u32::MAX")?;
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

fn write_len(buf: &mut Vec<u8>, len: usize, overflow: &str) -> Result<()> {
    let len: u32 = len
        .try_into()
        .map_err(|_| DegreeCacheError::InvalidArgument(overflow.into()))?;
    buf.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

struct Cursor<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, index: 0 }
    }

    fn read_exact(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.index + len > self.data.len() {
            return Err(DegreeCacheError::Serialization(
                "unexpected end of payload".into(),
            ));
        }
        let start = self.index;
        self.index += len;
        Ok(&self.data[start..start + len])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.read_exact(N)?
            .try_into()
            .map_err(|_| DegreeCacheError::Serialization("short read".into()))
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.read_exact(len)?.to_vec())
    }

    fn read_string(&mut self) -> Result<String> {
        String::from_utf8(self.read_bytes()?)
            .map_err(|_| DegreeCacheError::Serialization("invalid UTF-8 string".into()))
    }

    fn expect_version(&mut self) -> Result<()> {
        match self.read_u8()? {
            CODEC_VERSION => Ok(()),
            other => Err(DegreeCacheError::Serialization(format!(
                "unsupported description encoding version {other}"
            ))),
        }
    }

    fn read_description(&mut self) -> Result<DetachedEdgeDescription> {
        let edge_type = self.read_string()?;
        let direction = match self.read_u8()? {
            0 => Direction::Outgoing,
            1 => Direction::Incoming,
            2 => Direction::Both,
            other => {
                return Err(DegreeCacheError::Serialization(format!(
                    "invalid direction tag {other}"
                )))
            }
        };
        let absent = match self.read_u8()? {
            0 => AbsentKeys::Undefined,
            1 => AbsentKeys::Any,
            other => {
                return Err(DegreeCacheError::Serialization(format!(
                    "invalid absent-key tag {other}"
                )))
            }
        };
        let count = self.read_u32()? as usize;
        let mut predicates = BTreeMap::new();
        for _ in 0..count {
            let key = self.read_string()?;
            let predicate = match self.read_u8()? {
                TAG_EQUAL => PropertyPredicate::EqualTo(self.read_property_value()?),
                TAG_ANY => PropertyPredicate::Any,
                TAG_UNDEFINED => PropertyPredicate::Undefined,
                other => {
                    return Err(DegreeCacheError::Serialization(format!(
                        "unknown predicate tag: 0x{other:02X}"
                    )))
                }
            };
            if predicates.insert(key, predicate).is_some() {
                return Err(DegreeCacheError::Serialization(
                    "duplicate predicate key".into(),
                ));
            }
        }
        Ok(DetachedEdgeDescription::new(
            edge_type,
            direction,
            DetachedPropertiesDescription::from_predicates(absent, predicates),
        ))
    }

    fn read_property_value(&mut self) -> Result<PropertyValue> {
        match self.read_u8()? {
            TAG_BOOL => match self.read_u8()? {
                0 => Ok(PropertyValue::Bool(false)),
                1 => Ok(PropertyValue::Bool(true)),
                other => Err(DegreeCacheError::Serialization(format!(
                    "invalid boolean encoding: {other}"
                ))),
            },
            TAG_INT => Ok(PropertyValue::Int(self.read_i64()?)),
            TAG_FLOAT => Ok(PropertyValue::Float(f64::from_bits(u64::from_le_bytes(
                self.read_array()?,
            )))),
            TAG_STRING => Ok(PropertyValue::String(self.read_string()?)),
            TAG_BYTES => Ok(PropertyValue::Bytes(self.read_bytes()?)),
            other => Err(DegreeCacheError::Serialization(format!(
                "unknown property value tag: 0x{other:02X}"
            ))),
        }
    }

    fn ensure_consumed(&self) -> Result<()> {
        if self.index != self.data.len() {
            return Err(DegreeCacheError::Serialization(
                "unexpected trailing bytes in payload".into(),
            ));
        }
        Ok(())
    }
}
