//! Controller type system
//!
//! A Logix5000 value is either an atomic type (BOOL and its bit-packed
//! variants, the signed integer widths, REAL, the fixed 82-character
//! STRING) or a structure described by a [`Template`](crate::Template).
//! Each type knows its wire type tag, its encoded data size and how to
//! encode/decode a single value.

mod value;

pub use value::TagValue;

use crate::error::{LogixError, LogixResult};
use crate::template::Template;
use crate::wire::{put_padding, WireCursor};
use bytes::BufMut;
use std::fmt;
use std::sync::Arc;

/// Wire type code marking a structure, followed by the template crc.
pub const STRUCT_TYPE_CODE: u16 = 0x02A0;

/// Type code of the standard fixed-size string pseudo-structure.
pub const STRING_TYPE_CODE: u16 = 0x0FCE;

/// Encoded size of a STRING value: 4-byte length + 82 chars + 2 pad bytes.
pub const STRING_DATA_SIZE: usize = 88;

/// Maximum number of characters a STRING value can hold.
pub const STRING_MAX_CHARS: usize = 82;

const STRUCT_TAG_BYTES: [u8; 2] = [0xA0, 0x02];
const STRING_TAG_BYTES: [u8; 4] = [0xA0, 0x02, 0xCE, 0x0F];

/// Byte width of an atomic integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    B1,
    B2,
    B4,
    B8,
}

impl IntWidth {
    pub fn bytes(self) -> usize {
        match self {
            IntWidth::B1 => 1,
            IntWidth::B2 => 2,
            IntWidth::B4 => 4,
            IntWidth::B8 => 8,
        }
    }
}

/// A controller type, either atomic or a template (struct definition).
///
/// `Bool` carries the bit index used by bit-packed boolean members: eight
/// sibling booleans share one byte, and the type codes `0x00C1`..`0x07C1`
/// select the bit. Same-offset siblings must be merged by the caller at
/// encode time, never overwritten (see [`Template::encode`]).
#[derive(Debug, Clone, PartialEq)]
pub enum TagType {
    Bool { bit: u8 },
    Int { width: IntWidth, code: u16 },
    Real,
    String,
    Struct(Arc<Template>),
}

impl TagType {
    pub const SINT: TagType = TagType::Int { width: IntWidth::B1, code: 0x00C2 };
    pub const INT: TagType = TagType::Int { width: IntWidth::B2, code: 0x00C3 };
    pub const DINT: TagType = TagType::Int { width: IntWidth::B4, code: 0x00C4 };
    pub const LINT: TagType = TagType::Int { width: IntWidth::B8, code: 0x00C5 };
    /// Generic 32-bit bit collection.
    pub const DWORD: TagType = TagType::Int { width: IntWidth::B4, code: 0x00D3 };

    /// The BOOL variant targeting bit `bit` (0..=7) of its byte.
    pub fn bool_bit(bit: u8) -> TagType {
        TagType::Bool { bit: bit & 0x07 }
    }

    /// The 16-bit type code, masked to its low 12 bits for templates.
    pub fn code(&self) -> u16 {
        match self {
            TagType::Bool { bit } => 0x00C1 | (u16::from(*bit) << 8),
            TagType::Int { code, .. } => *code,
            TagType::Real => 0x00CA,
            TagType::String => STRING_TYPE_CODE,
            TagType::Struct(template) => template.code(),
        }
    }

    /// Byte length of the wire type tag written ahead of write requests.
    pub fn encoded_type_size(&self) -> usize {
        match self {
            TagType::String | TagType::Struct(_) => 4,
            _ => 2,
        }
    }

    /// Encoded byte length of a single value of this type.
    pub fn encoded_data_size(&self) -> usize {
        match self {
            TagType::Bool { .. } => 1,
            TagType::Int { width, .. } => width.bytes(),
            TagType::Real => 4,
            TagType::String => STRING_DATA_SIZE,
            TagType::Struct(template) => template.structure_size(),
        }
    }

    /// Write the wire type tag: a 2-byte numeric code for atomic types, or
    /// the structure marker plus crc for STRING and templates.
    pub fn encode_type(&self, out: &mut Vec<u8>) {
        match self {
            TagType::String => out.extend_from_slice(&STRING_TAG_BYTES),
            TagType::Struct(template) => {
                out.extend_from_slice(&STRUCT_TAG_BYTES);
                out.put_u16_le(template.crc());
            }
            other => out.put_u16_le(other.code()),
        }
    }

    /// Encode one value into a single opaque chunk.
    ///
    /// Boolean encoding produces a full byte with only this type's bit set
    /// (or a zero byte); packing sibling bits into a shared byte is the
    /// template's job.
    pub fn encode_value(&self, value: &TagValue) -> LogixResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_data_size());
        match (self, value) {
            (TagType::Bool { bit }, TagValue::Bool(v)) => {
                out.push(if *v { 1u8 << bit } else { 0 });
            }
            (TagType::Int { width: IntWidth::B1, .. }, TagValue::Sint(v)) => out.put_i8(*v),
            (TagType::Int { width: IntWidth::B2, .. }, TagValue::Int(v)) => out.put_i16_le(*v),
            (TagType::Int { width: IntWidth::B4, .. }, TagValue::Dint(v)) => out.put_i32_le(*v),
            (TagType::Int { width: IntWidth::B8, .. }, TagValue::Lint(v)) => out.put_i64_le(*v),
            (TagType::Real, TagValue::Real(v)) => out.put_f32_le(*v),
            (TagType::String, TagValue::String(v)) => {
                if v.len() > STRING_MAX_CHARS {
                    return Err(LogixError::Encode(format!(
                        "trying to encode a string with more than {STRING_MAX_CHARS} chars: {v}"
                    )));
                }
                if !v.is_ascii() {
                    return Err(LogixError::Encode(format!(
                        "string values must be ASCII: {v}"
                    )));
                }
                out.put_u32_le(v.len() as u32);
                out.extend_from_slice(v.as_bytes());
                put_padding(&mut out, STRING_DATA_SIZE - 4 - v.len());
            }
            (TagType::Struct(template), _) => {
                return Err(LogixError::Encode(format!(
                    "structure values of template {} encode through their tag",
                    template.name()
                )));
            }
            (ty, value) => {
                return Err(LogixError::TypeMismatch(format!(
                    "cannot encode {value} as {ty}"
                )));
            }
        }
        Ok(out)
    }

    /// Decode one value of this type from the cursor.
    pub fn decode_value(&self, cur: &mut WireCursor<'_>) -> LogixResult<TagValue> {
        match self {
            TagType::Bool { bit } => {
                let byte = cur.get_u8()?;
                Ok(TagValue::Bool((byte >> bit) & 0x01 == 0x01))
            }
            TagType::Int { width: IntWidth::B1, .. } => Ok(TagValue::Sint(cur.get_i8()?)),
            TagType::Int { width: IntWidth::B2, .. } => Ok(TagValue::Int(cur.get_i16()?)),
            TagType::Int { width: IntWidth::B4, .. } => Ok(TagValue::Dint(cur.get_i32()?)),
            TagType::Int { width: IntWidth::B8, .. } => Ok(TagValue::Lint(cur.get_i64()?)),
            TagType::Real => Ok(TagValue::Real(cur.get_f32()?)),
            TagType::String => {
                let length = cur.get_u32()? as usize;
                if length > STRING_MAX_CHARS {
                    return Err(LogixError::Decode(format!(
                        "string length prefix {length} exceeds {STRING_MAX_CHARS}"
                    )));
                }
                let bytes = cur.take(length)?;
                let value = std::str::from_utf8(bytes)
                    .map_err(|e| LogixError::Decode(format!("string value is not ASCII: {e}")))?
                    .to_string();
                cur.advance(STRING_DATA_SIZE - 4 - length)?;
                Ok(TagValue::String(value))
            }
            TagType::Struct(template) => Err(LogixError::Decode(format!(
                "structure values of template {} decode through their template",
                template.name()
            ))),
        }
    }

    /// True for templates representing the fixed-size string
    /// pseudo-structure, whose array elements decode as flat strings.
    pub fn is_string_struct(&self) -> bool {
        matches!(self, TagType::Struct(template) if template.is_string())
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagType::Bool { bit } => write!(f, "BOOL{bit}"),
            TagType::Int { code, width } => match *code {
                0x00C2 => write!(f, "SINT"),
                0x00C3 => write!(f, "INT"),
                0x00C4 => write!(f, "DINT"),
                0x00C5 => write!(f, "LINT"),
                0x00D3 => write!(f, "DWORD"),
                code => write!(f, "INT{}(0x{code:04X})", width.bytes() * 8),
            },
            TagType::Real => write!(f, "REAL"),
            TagType::String => write!(f, "STRING"),
            TagType::Struct(template) => write!(f, "{}", template.name()),
        }
    }
}
