//! Tag object model
//!
//! A tag mirrors one controller value: a scalar leaf, a fixed-length array
//! or a structure described by a template. Tags own a fixed slot array
//! sized at construction (1 for scalars, the declared length for arrays,
//! the member count for structures) and are populated by decoding wire
//! bytes; nested structure and array children are created lazily with a
//! synthesized path and cached on their owning slot, so repeated lookups
//! return the same object and keep in-memory edits.
//!
//! Everything here is pure; reading from and writing to a controller is
//! wired up in `logix-client`.

use crate::error::{LogixError, LogixResult};
use crate::template::{Member, Template};
use crate::types::{TagType, TagValue};
use crate::wire::WireCursor;
use std::fmt;
use std::sync::Arc;

/// One value slot of a tag.
///
/// Leaf values, nested structures and nested arrays are distinct variants,
/// so a mismatched access is a typed failure instead of a cast fault.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Empty,
    Value(TagValue),
    Structure(StructureTag),
    Array(ArrayTag),
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub fn value(&self) -> Option<&TagValue> {
        match self {
            Slot::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_structure(&self) -> Option<&StructureTag> {
        match self {
            Slot::Structure(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayTag> {
        match self {
            Slot::Array(tag) => Some(tag),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Empty => write!(f, "-"),
            Slot::Value(value) => write!(f, "{value}"),
            Slot::Structure(tag) => tag.fmt_values(f),
            Slot::Array(tag) => tag.fmt_values(f),
        }
    }
}

/// A single leaf value bound to a path.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarTag {
    path: String,
    ty: TagType,
    value: Option<TagValue>,
}

impl ScalarTag {
    pub fn new(path: impl Into<String>, ty: TagType) -> Self {
        Self {
            path: path.into(),
            ty,
            value: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn ty(&self) -> &TagType {
        &self.ty
    }

    pub fn value(&self) -> Option<&TagValue> {
        self.value.as_ref()
    }

    pub fn set_value(&mut self, value: TagValue) {
        self.value = Some(value);
    }

    pub fn encode(&self, parts: &mut Vec<Vec<u8>>) -> LogixResult<()> {
        let value = self.value.as_ref().ok_or_else(|| {
            LogixError::Encode(format!("tag {} has no value to encode", self.path))
        })?;
        parts.push(self.ty.encode_value(value)?);
        Ok(())
    }

    pub fn decode(&mut self, cur: &mut WireCursor<'_>) -> LogixResult<()> {
        self.value = Some(self.ty.decode_value(cur)?);
        Ok(())
    }
}

impl fmt::Display for ScalarTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Tag {}: ", self.path)?;
        match &self.value {
            Some(value) => write!(f, "{value}")?,
            None => write!(f, "-")?,
        }
        write!(f, ">")
    }
}

/// A fixed-length array value bound to a path.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayTag {
    path: String,
    element: TagType,
    slots: Vec<Slot>,
}

impl ArrayTag {
    pub fn new(path: impl Into<String>, element: TagType, length: usize) -> Self {
        Self {
            path: path.into(),
            element,
            slots: (0..length).map(|_| Slot::Empty).collect(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn element_type(&self) -> &TagType {
        &self.element
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> LogixResult<&Slot> {
        self.slots.get(index).ok_or_else(|| {
            LogixError::PathResolution(format!(
                "index {index} is out of bounds for {}[{}]",
                self.path,
                self.slots.len()
            ))
        })
    }

    pub fn value_at(&self, index: usize) -> LogixResult<&TagValue> {
        self.slot(index)?.value().ok_or_else(|| {
            LogixError::TypeMismatch(format!("{}[{index}] does not hold a leaf value", self.path))
        })
    }

    pub fn set_value(&mut self, index: usize, value: TagValue) -> LogixResult<()> {
        let len = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            LogixError::PathResolution(format!("index {index} is out of bounds for [{len}]"))
        })?;
        *slot = Slot::Value(value);
        Ok(())
    }

    pub fn structure_at(&self, index: usize) -> LogixResult<&StructureTag> {
        self.slot(index)?.as_structure().ok_or_else(|| {
            LogixError::TypeMismatch(format!("{}[{index}] does not hold a structure", self.path))
        })
    }

    /// The structure element at `index`, created on first access with the
    /// path `parent[index]` and cached thereafter.
    pub fn structure_at_mut(&mut self, index: usize) -> LogixResult<&mut StructureTag> {
        let len = self.slots.len();
        let path = &self.path;
        let element = &self.element;
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            LogixError::PathResolution(format!("index {index} is out of bounds for {path}[{len}]"))
        })?;
        if slot.is_empty() {
            let template = match element {
                TagType::Struct(template) => Arc::clone(template),
                other => {
                    return Err(LogixError::TypeMismatch(format!(
                        "array {path} holds {other} elements, not structures"
                    )))
                }
            };
            *slot = Slot::Structure(StructureTag::new(format!("{path}[{index}]"), template));
        }
        match slot {
            Slot::Structure(tag) => Ok(tag),
            _ => Err(LogixError::TypeMismatch(format!(
                "{path}[{index}] does not hold a structure"
            ))),
        }
    }

    /// Re-encode every element in index order; structure elements recurse
    /// into their own encoding.
    pub fn encode(&self, parts: &mut Vec<Vec<u8>>) -> LogixResult<()> {
        for (index, slot) in self.slots.iter().enumerate() {
            match slot {
                Slot::Value(value) => {
                    if self.element.is_string_struct() {
                        parts.push(TagType::String.encode_value(value)?);
                    } else {
                        parts.push(self.element.encode_value(value)?);
                    }
                }
                Slot::Structure(tag) => tag.encode(parts)?,
                Slot::Array(tag) => tag.encode(parts)?,
                Slot::Empty => {
                    return Err(LogixError::Encode(format!(
                        "array element {}[{index}] has no value to encode",
                        self.path
                    )))
                }
            }
        }
        Ok(())
    }

    /// Decode every element in index order.
    ///
    /// String pseudo-structure elements decode as flat string values; other
    /// structure elements decode into cached structure children, preserving
    /// their identity across repeated decodes.
    pub fn decode(&mut self, cur: &mut WireCursor<'_>) -> LogixResult<()> {
        let element = self.element.clone();
        match &element {
            TagType::Struct(template) if template.is_string() => {
                for index in 0..self.slots.len() {
                    self.slots[index] = Slot::Value(TagType::String.decode_value(cur)?);
                }
            }
            TagType::Struct(_) => {
                for index in 0..self.slots.len() {
                    self.structure_at_mut(index)?.decode(cur)?;
                }
            }
            _ => {
                for index in 0..self.slots.len() {
                    self.slots[index] = Slot::Value(element.decode_value(cur)?);
                }
            }
        }
        Ok(())
    }

    fn fmt_values(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (index, slot) in self.slots.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{index}: {slot}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for ArrayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Tag {}: {}[{}] ", self.path, self.element, self.slots.len())?;
        self.fmt_values(f)?;
        write!(f, ">")
    }
}

/// A structure value bound to a path, with one slot per addressable member.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureTag {
    path: String,
    template: Arc<Template>,
    slots: Vec<Slot>,
}

impl StructureTag {
    pub fn new(path: impl Into<String>, template: Arc<Template>) -> Self {
        let slots = (0..template.member_count()).map(|_| Slot::Empty).collect();
        Self {
            path: path.into(),
            template,
            slots,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn slot(&self, index: u16) -> LogixResult<&Slot> {
        self.slots.get(index as usize).ok_or_else(|| {
            LogixError::PathResolution(format!(
                "member index {index} is out of bounds for {}",
                self.path
            ))
        })
    }

    pub fn slot_named(&self, name: &str) -> LogixResult<&Slot> {
        let index = self.template.index_of_member(name)?;
        self.slot(index)
    }

    pub fn value(&self, name: &str) -> LogixResult<&TagValue> {
        self.slot_named(name)?.value().ok_or_else(|| {
            LogixError::TypeMismatch(format!(
                "member {name} of {} does not hold a leaf value",
                self.path
            ))
        })
    }

    pub fn set_value(&mut self, index: u16, value: TagValue) -> LogixResult<()> {
        let path = &self.path;
        let slot = self.slots.get_mut(index as usize).ok_or_else(|| {
            LogixError::PathResolution(format!(
                "member index {index} is out of bounds for {path}"
            ))
        })?;
        *slot = Slot::Value(value);
        Ok(())
    }

    pub fn set_value_named(&mut self, name: &str, value: TagValue) -> LogixResult<()> {
        let index = self.template.index_of_member(name)?;
        self.set_value(index, value)
    }

    pub fn bool_value(&self, name: &str) -> LogixResult<bool> {
        self.value(name)?.as_bool().ok_or_else(|| {
            LogixError::TypeMismatch(format!("member {name} of {} is not a BOOL", self.path))
        })
    }

    pub fn dint_value(&self, name: &str) -> LogixResult<i32> {
        self.value(name)?.as_dint().ok_or_else(|| {
            LogixError::TypeMismatch(format!("member {name} of {} is not a DINT", self.path))
        })
    }

    pub fn string_value(&self, name: &str) -> LogixResult<&str> {
        self.value(name)?.as_str().ok_or_else(|| {
            LogixError::TypeMismatch(format!("member {name} of {} is not a STRING", self.path))
        })
    }

    pub fn structure(&self, name: &str) -> LogixResult<&StructureTag> {
        self.slot_named(name)?.as_structure().ok_or_else(|| {
            LogixError::TypeMismatch(format!(
                "member {name} of {} does not hold a structure",
                self.path
            ))
        })
    }

    pub fn array(&self, name: &str) -> LogixResult<&ArrayTag> {
        self.slot_named(name)?.as_array().ok_or_else(|| {
            LogixError::TypeMismatch(format!(
                "member {name} of {} does not hold an array",
                self.path
            ))
        })
    }

    /// The nested structure for `member`, created on first access with the
    /// path `parent.member` and cached on its slot.
    pub fn structure_member_mut(&mut self, member: &Member) -> LogixResult<&mut StructureTag> {
        let path = &self.path;
        let slot = self.slots.get_mut(member.index() as usize).ok_or_else(|| {
            LogixError::PathResolution(format!(
                "member index {} is out of bounds for {path}",
                member.index()
            ))
        })?;
        if slot.is_empty() {
            let template = match member.ty() {
                TagType::Struct(template) => Arc::clone(template),
                other => {
                    return Err(LogixError::TypeMismatch(format!(
                        "member {} is a {other}, not a structure",
                        member.name()
                    )))
                }
            };
            *slot = Slot::Structure(StructureTag::new(
                format!("{path}.{}", member.name()),
                template,
            ));
        }
        match slot {
            Slot::Structure(tag) => Ok(tag),
            _ => Err(LogixError::TypeMismatch(format!(
                "member {} of {path} does not hold a structure",
                member.name()
            ))),
        }
    }

    /// The nested array for `member`, created on first access with the
    /// path `parent.member` and cached on its slot.
    pub fn array_member_mut(&mut self, member: &Member) -> LogixResult<&mut ArrayTag> {
        let path = &self.path;
        let slot = self.slots.get_mut(member.index() as usize).ok_or_else(|| {
            LogixError::PathResolution(format!(
                "member index {} is out of bounds for {path}",
                member.index()
            ))
        })?;
        if slot.is_empty() {
            *slot = Slot::Array(ArrayTag::new(
                format!("{path}.{}", member.name()),
                member.ty().clone(),
                member.array_size() as usize,
            ));
        }
        match slot {
            Slot::Array(tag) => Ok(tag),
            _ => Err(LogixError::TypeMismatch(format!(
                "member {} of {path} does not hold an array",
                member.name()
            ))),
        }
    }

    pub fn encode(&self, parts: &mut Vec<Vec<u8>>) -> LogixResult<()> {
        let template = Arc::clone(&self.template);
        template.encode(self, parts)
    }

    pub fn decode(&mut self, cur: &mut WireCursor<'_>) -> LogixResult<()> {
        let template = Arc::clone(&self.template);
        template.decode_into(cur, self)
    }

    fn fmt_values(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (index, slot) in self.slots.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            let name = self
                .template
                .member(index as u16)
                .map(Member::name)
                .unwrap_or("?");
            write!(f, "{name}: {slot}")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for StructureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Tag {} ", self.path)?;
        self.fmt_values(f)?;
        write!(f, ">")
    }
}

/// A controller tag, one variant per value shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Scalar(ScalarTag),
    Array(ArrayTag),
    Structure(StructureTag),
}

impl Tag {
    pub fn path(&self) -> &str {
        match self {
            Tag::Scalar(tag) => tag.path(),
            Tag::Array(tag) => tag.path(),
            Tag::Structure(tag) => tag.path(),
        }
    }

    /// Element count used by read/write requests: the declared length for
    /// arrays, 1 otherwise.
    pub fn element_count(&self) -> u16 {
        match self {
            Tag::Array(tag) => tag.len() as u16,
            _ => 1,
        }
    }

    /// The type whose wire tag and per-element size describe this tag's
    /// payload.
    pub fn value_type(&self) -> TagType {
        match self {
            Tag::Scalar(tag) => tag.ty().clone(),
            Tag::Array(tag) => tag.element_type().clone(),
            Tag::Structure(tag) => TagType::Struct(Arc::clone(tag.template())),
        }
    }

    pub fn encode(&self, parts: &mut Vec<Vec<u8>>) -> LogixResult<()> {
        match self {
            Tag::Scalar(tag) => tag.encode(parts),
            Tag::Array(tag) => tag.encode(parts),
            Tag::Structure(tag) => tag.encode(parts),
        }
    }

    pub fn decode(&mut self, cur: &mut WireCursor<'_>) -> LogixResult<()> {
        match self {
            Tag::Scalar(tag) => tag.decode(cur),
            Tag::Array(tag) => tag.decode(cur),
            Tag::Structure(tag) => tag.decode(cur),
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarTag> {
        match self {
            Tag::Scalar(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayTag> {
        match self {
            Tag::Array(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_structure(&self) -> Option<&StructureTag> {
        match self {
            Tag::Structure(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_scalar_mut(&mut self) -> Option<&mut ScalarTag> {
        match self {
            Tag::Scalar(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayTag> {
        match self {
            Tag::Array(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_structure_mut(&mut self) -> Option<&mut StructureTag> {
        match self {
            Tag::Structure(tag) => Some(tag),
            _ => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Scalar(tag) => tag.fmt(f),
            Tag::Array(tag) => tag.fmt(f),
            Tag::Structure(tag) => tag.fmt(f),
        }
    }
}

/// Result of resolving a symbolic path against in-memory tags.
#[derive(Debug, Clone, Copy)]
pub enum PathTarget<'a> {
    Value(&'a TagValue),
    Structure(&'a StructureTag),
    Array(&'a ArrayTag),
}

impl<'a> PathTarget<'a> {
    pub fn as_value(&self) -> Option<&'a TagValue> {
        match self {
            PathTarget::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_structure(&self) -> Option<&'a StructureTag> {
        match self {
            PathTarget::Structure(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&'a ArrayTag> {
        match self {
            PathTarget::Array(tag) => Some(tag),
            _ => None,
        }
    }
}
