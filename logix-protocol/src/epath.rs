//! EPath codec
//!
//! CIP requests address their target with an EPath: a run of segments that
//! is either symbolic (ANSI extended symbol segments, one per dotted part
//! of a tag path, with numeric element segments for `[n]` subscripts) or
//! numeric (logical class/instance segments, used for the symbol and
//! template objects). The encoded size is exact because the write helper
//! subtracts it from the packet budget.

use bytes::BufMut;
use logix_core::{LogixError, LogixResult};

/// One EPath segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// ANSI extended symbolic segment carrying a tag or member name.
    Symbolic(String),
    /// Numeric element segment for an array subscript.
    Element(u32),
    /// Logical class id segment.
    ClassId(u16),
    /// Logical instance id segment.
    InstanceId(u32),
}

impl PathSegment {
    fn wire_size(&self) -> usize {
        match self {
            PathSegment::Symbolic(name) => {
                let length = 2 + name.len();
                length + length % 2
            }
            PathSegment::Element(n) => match n {
                0..=0xFF => 2,
                0x100..=0xFFFF => 4,
                _ => 6,
            },
            PathSegment::ClassId(c) => {
                if *c <= 0xFF {
                    2
                } else {
                    4
                }
            }
            PathSegment::InstanceId(i) => match i {
                0..=0xFF => 2,
                0x100..=0xFFFF => 4,
                _ => 6,
            },
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            PathSegment::Symbolic(name) => {
                out.put_u8(0x91);
                out.put_u8(name.len() as u8);
                out.extend_from_slice(name.as_bytes());
                if name.len() % 2 == 1 {
                    out.put_u8(0);
                }
            }
            PathSegment::Element(n) => match n {
                0..=0xFF => {
                    out.put_u8(0x28);
                    out.put_u8(*n as u8);
                }
                0x100..=0xFFFF => {
                    out.put_u8(0x29);
                    out.put_u8(0);
                    out.put_u16_le(*n as u16);
                }
                _ => {
                    out.put_u8(0x2A);
                    out.put_u8(0);
                    out.put_u32_le(*n);
                }
            },
            PathSegment::ClassId(c) => {
                if *c <= 0xFF {
                    out.put_u8(0x20);
                    out.put_u8(*c as u8);
                } else {
                    out.put_u8(0x21);
                    out.put_u8(0);
                    out.put_u16_le(*c);
                }
            }
            PathSegment::InstanceId(i) => match i {
                0..=0xFF => {
                    out.put_u8(0x24);
                    out.put_u8(*i as u8);
                }
                0x100..=0xFFFF => {
                    out.put_u8(0x25);
                    out.put_u8(0);
                    out.put_u16_le(*i as u16);
                }
                _ => {
                    out.put_u8(0x26);
                    out.put_u8(0);
                    out.put_u32_le(*i);
                }
            },
        }
    }
}

/// A request target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EPath {
    segments: Vec<PathSegment>,
}

impl EPath {
    /// Parse a symbolic tag path like `Motor.Axis[2].Speed` into symbolic
    /// and element segments.
    pub fn symbol(path: &str) -> LogixResult<EPath> {
        let mut segments = Vec::new();
        for part in path.split('.') {
            let (name, indices) = split_part(part)?;
            if name.is_empty() {
                return Err(LogixError::PathResolution(format!(
                    "empty segment in tag path {path}"
                )));
            }
            segments.push(PathSegment::Symbolic(name.to_string()));
            for index in indices {
                segments.push(PathSegment::Element(index));
            }
        }
        Ok(EPath { segments })
    }

    /// A class-only path.
    pub fn class(class_id: u16) -> EPath {
        EPath {
            segments: vec![PathSegment::ClassId(class_id)],
        }
    }

    /// A class + instance path.
    pub fn class_instance(class_id: u16, instance_id: u32) -> EPath {
        EPath {
            segments: vec![
                PathSegment::ClassId(class_id),
                PathSegment::InstanceId(instance_id),
            ],
        }
    }

    /// Replace the instance id, keeping the class. Symbol pagination
    /// re-seeds the same path with the next starting instance.
    pub fn set_instance(&mut self, instance_id: u32) {
        self.segments
            .retain(|segment| !matches!(segment, PathSegment::InstanceId(_)));
        self.segments.push(PathSegment::InstanceId(instance_id));
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Encoded size in bytes, including the leading word-count byte.
    pub fn wire_size(&self) -> usize {
        1 + self.segments.iter().map(PathSegment::wire_size).sum::<usize>()
    }

    /// Encode as a word-count byte followed by the segments.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let bytes: usize = self.segments.iter().map(PathSegment::wire_size).sum();
        out.put_u8((bytes / 2) as u8);
        for segment in &self.segments {
            segment.encode(out);
        }
    }
}

/// Split `Name[1][2]` into the name and its subscripts.
fn split_part(part: &str) -> LogixResult<(&str, Vec<u32>)> {
    let Some(open) = part.find('[') else {
        return Ok((part, Vec::new()));
    };
    let name = &part[..open];
    let mut indices = Vec::new();
    let mut rest = &part[open..];
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(LogixError::PathResolution(format!(
                "malformed subscript in path segment {part}"
            )));
        }
        let Some(close) = rest.find(']') else {
            return Err(LogixError::PathResolution(format!(
                "unterminated subscript in path segment {part}"
            )));
        };
        let index = rest[1..close].parse::<u32>().map_err(|_| {
            LogixError::PathResolution(format!("invalid subscript in path segment {part}"))
        })?;
        indices.push(index);
        rest = &rest[close + 1..];
    }
    Ok((name, indices))
}

/// Split a symbolic path segment into its name and subscripts; shared with
/// the client's path resolution.
pub fn split_path_segment(part: &str) -> LogixResult<(&str, Vec<u32>)> {
    split_part(part)
}
