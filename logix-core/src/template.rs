//! Template (struct definition) layout engine
//!
//! A template describes a controller structure type: an ordered member list
//! with byte offsets, padding and bit-packing groups, plus the sizes and
//! the crc/type-handle that identify the template on the wire. Templates
//! are built in two phases: a fixed attribute read, then a raw definition
//! stream parsed into members. This module is pure layout and codec logic;
//! fetching the bytes and resolving member type codes (which may recurse
//! into further templates) is the client's job.

use crate::error::{LogixError, LogixResult};
use crate::tag::{Slot, StructureTag};
use crate::types::{TagType, STRING_TYPE_CODE};
use crate::wire::{put_padding, WireCursor};
use std::fmt;

/// Member names starting with this literal are compiler-inserted filler
/// fields and are dropped from the addressable member list.
pub const RESERVED_MEMBER_PREFIX: &str = "ZZZZZZZZZZ";

/// Mask extracting the type code proper from a raw member/symbol type code.
pub const TYPE_CODE_MASK: u16 = 0x0FFF;

/// The four template attributes, in controller-validated response order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateAttributes {
    /// Object definition size, in 32-bit words.
    pub object_size: u32,
    /// Encoded structure value size, in bytes.
    pub structure_size: u32,
    /// Declared member count, before filler filtering.
    pub member_count: u16,
    /// Structure handle (crc), used as the wire type tag.
    pub crc: u16,
}

impl TemplateAttributes {
    /// Byte length of the raw definition stream.
    pub fn definition_byte_count(&self) -> u32 {
        self.object_size * 4 - 23
    }
}

/// One member record as it appears in the raw definition stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMember {
    /// Declared array length, 0 for scalars.
    pub array_size: u16,
    /// Unmasked type code, high bits carrying structure/reserved flags.
    pub type_code_raw: u16,
    /// Byte offset of this member inside the structure value.
    pub offset: u32,
}

impl RawMember {
    /// The type code proper, with the flag bits masked off.
    pub fn type_code(&self) -> u16 {
        self.type_code_raw & TYPE_CODE_MASK
    }
}

/// A parsed definition stream: member records and names, still unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDefinition {
    pub structure_name: String,
    pub members: Vec<RawMember>,
    pub member_names: Vec<String>,
}

impl TemplateDefinition {
    /// Parse the raw definition bytes: `member_count` records of
    /// `(array_size:i16, type_code:i16, offset:i32)` followed by one
    /// NUL-terminated name per (structure + member), in declaration order.
    pub fn parse(bytes: &[u8], member_count: u16) -> LogixResult<TemplateDefinition> {
        let mut cur = WireCursor::new(bytes);
        let mut members = Vec::with_capacity(member_count as usize);
        for _ in 0..member_count {
            let array_size = cur.get_u16()?;
            let type_code_raw = cur.get_u16()?;
            let offset = cur.get_u32()?;
            members.push(RawMember {
                array_size,
                type_code_raw,
                offset,
            });
        }
        let structure_name = cur.get_nul_string()?;
        let mut member_names = Vec::with_capacity(member_count as usize);
        for _ in 0..member_count {
            member_names.push(cur.get_nul_string()?);
        }
        Ok(TemplateDefinition {
            structure_name,
            members,
            member_names,
        })
    }
}

/// A resolved, addressable structure member.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    name: String,
    ty: TagType,
    array_size: u16,
    offset: u32,
    padding: usize,
    element_index: u16,
    index: u16,
}

impl Member {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TagType {
        &self.ty
    }

    /// Declared array length, 0 for scalars.
    pub fn array_size(&self) -> u16 {
        self.array_size
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Gap in bytes before this member, relative to the previous member's
    /// end in declaration order.
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Original declaration position, used for wire-level path translation.
    pub fn element_index(&self) -> u16 {
        self.element_index
    }

    /// Dense value-slot index, assigned after filler filtering.
    pub fn index(&self) -> u16 {
        self.index
    }

    /// Encoded byte extent of this member, covering every array element.
    pub fn encoded_data_size(&self) -> usize {
        if self.array_size > 0 {
            self.ty.encoded_data_size() * self.array_size as usize
        } else {
            self.ty.encoded_data_size()
        }
    }

    fn encode_slot(&self, slot: &Slot, parts: &mut Vec<Vec<u8>>) -> LogixResult<()> {
        match slot {
            Slot::Value(value) => {
                parts.push(self.ty.encode_value(value)?);
                Ok(())
            }
            Slot::Structure(tag) => tag.encode(parts),
            Slot::Array(tag) => tag.encode(parts),
            Slot::Empty => Err(LogixError::Encode(format!(
                "member {} has no value to encode",
                self.name
            ))),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.ty)?;
        if self.array_size > 0 {
            write!(f, "[{}]", self.array_size)?;
        }
        write!(f, " offset: {}", self.offset)
    }
}

/// A template that knows how to encode and decode a structure value.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    instance_id: u16,
    attributes: TemplateAttributes,
    name: String,
    members: Vec<Member>,
    trailing_padding: usize,
}

impl Template {
    /// Build a template from its attributes, parsed definition and the
    /// already-resolved type of each declared member (aligned with the
    /// definition's declaration order).
    ///
    /// Padding is computed against a running data offset over every
    /// declared member; filler members are dropped afterwards, survivors
    /// get a dense `index` while `element_index` keeps the declaration
    /// position for everyone.
    pub fn assemble(
        instance_id: u16,
        attributes: TemplateAttributes,
        definition: TemplateDefinition,
        member_types: Vec<TagType>,
    ) -> LogixResult<Template> {
        let TemplateDefinition {
            structure_name,
            members: raw_members,
            member_names,
        } = definition;
        if raw_members.len() != attributes.member_count as usize
            || member_names.len() != raw_members.len()
            || member_types.len() != raw_members.len()
        {
            return Err(LogixError::Protocol(format!(
                "template {instance_id}: definition does not match its attributes"
            )));
        }

        let mut members = Vec::with_capacity(raw_members.len());
        let mut next_data_offset = 0usize;
        for (element_index, ((raw, name), ty)) in raw_members
            .into_iter()
            .zip(member_names)
            .zip(member_types)
            .enumerate()
        {
            let padding = (raw.offset as usize).saturating_sub(next_data_offset);
            let member = Member {
                name,
                ty,
                array_size: raw.array_size,
                offset: raw.offset,
                padding,
                element_index: element_index as u16,
                index: 0,
            };
            next_data_offset = raw.offset as usize + member.encoded_data_size();
            members.push(member);
        }
        let trailing_padding = (attributes.structure_size as usize).saturating_sub(next_data_offset);

        members.retain(|m| !m.name.starts_with(RESERVED_MEMBER_PREFIX));
        for (index, member) in members.iter_mut().enumerate() {
            member.index = index as u16;
        }

        Ok(Template {
            instance_id,
            attributes,
            name: structure_name,
            members,
            trailing_padding,
        })
    }

    /// The template instance id, also usable as its 16-bit type code.
    pub fn code(&self) -> u16 {
        self.instance_id
    }

    pub fn crc(&self) -> u16 {
        self.attributes.crc
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &TemplateAttributes {
        &self.attributes
    }

    /// Encoded structure value size in bytes, including all padding.
    pub fn structure_size(&self) -> usize {
        self.attributes.structure_size as usize
    }

    pub fn definition_byte_count(&self) -> u32 {
        self.attributes.definition_byte_count()
    }

    /// Zero padding after the last member's data, up to the structure size.
    pub fn trailing_padding(&self) -> usize {
        self.trailing_padding
    }

    /// Number of addressable members, after filler filtering.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, index: u16) -> Option<&Member> {
        self.members.get(index as usize)
    }

    pub fn member_named(&self, name: &str) -> LogixResult<&Member> {
        self.members
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| LogixError::UnknownMember {
                template: self.name.clone(),
                member: name.to_string(),
            })
    }

    /// Dense value-slot index of the named member.
    pub fn index_of_member(&self, name: &str) -> LogixResult<u16> {
        Ok(self.member_named(name)?.index)
    }

    /// Declaration position of the named member, for wire path translation.
    pub fn element_index_of_member(&self, name: &str) -> LogixResult<u16> {
        Ok(self.member_named(name)?.element_index)
    }

    pub fn type_of_member(&self, name: &str) -> LogixResult<&TagType> {
        Ok(self.member_named(name)?.ty())
    }

    /// True for the fixed-size string pseudo-structure: its crc is the
    /// STRING type code, and arrays of it decode as flat string values.
    pub fn is_string(&self) -> bool {
        self.attributes.crc == STRING_TYPE_CODE
    }

    /// Encode a structure value as an ordered chunk list.
    ///
    /// Members are visited in declaration order; a member sharing the
    /// previous member's offset is a packed boolean sibling whose 1-byte
    /// chunk is OR-merged into the previous chunk instead of appended.
    /// Merging anything but two 1-byte chunks is a fatal encode error.
    pub fn encode(&self, tag: &StructureTag, parts: &mut Vec<Vec<u8>>) -> LogixResult<()> {
        let mut last_offset: Option<u32> = None;
        for member in &self.members {
            let slot = tag.slot(member.index)?;
            if last_offset == Some(member.offset) {
                let previous = parts.pop().ok_or_else(|| {
                    LogixError::Encode(format!(
                        "member {} shares an offset but has nothing to merge with",
                        member.name
                    ))
                })?;
                let before = parts.len();
                member.encode_slot(slot, parts)?;
                let after = parts.len();
                let current = match parts.last_mut() {
                    Some(current) if after == before + 1 => current,
                    _ => {
                        return Err(LogixError::Encode(format!(
                            "member {} cannot be merged at a shared offset",
                            member.name
                        )))
                    }
                };
                if previous.len() != 1 || current.len() != 1 {
                    return Err(LogixError::Encode(format!(
                        "trying to encode two members at the same offset with sizes {} and {}; only packed booleans share an offset",
                        previous.len(),
                        current.len()
                    )));
                }
                current[0] |= previous[0];
            } else {
                if member.padding > 0 {
                    let mut padding = Vec::new();
                    put_padding(&mut padding, member.padding);
                    parts.push(padding);
                }
                member.encode_slot(slot, parts)?;
            }
            last_offset = Some(member.offset);
        }
        if self.trailing_padding > 0 {
            let mut padding = Vec::new();
            put_padding(&mut padding, self.trailing_padding);
            parts.push(padding);
        }
        Ok(())
    }

    /// Decode a structure value into a tag's slots.
    ///
    /// Each member seeks its absolute offset inside an independent window,
    /// making decode order-independent; the outer cursor advances by the
    /// full structure size so trailing padding is skipped.
    pub fn decode_into(
        &self,
        cur: &mut WireCursor<'_>,
        tag: &mut StructureTag,
    ) -> LogixResult<()> {
        let mut window = cur.window();
        for member in &self.members {
            window.seek(member.offset as usize)?;
            if member.array_size > 0 {
                tag.array_member_mut(member)?.decode(&mut window)?;
            } else if matches!(member.ty, TagType::Struct(_)) {
                tag.structure_member_mut(member)?.decode(&mut window)?;
            } else {
                let value = member.ty.decode_value(&mut window)?;
                tag.set_value(member.index, value)?;
            }
        }
        cur.advance(self.structure_size())
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Template {} {} words {} bytes members [",
            self.instance_id, self.attributes.object_size, self.attributes.structure_size
        )?;
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{member}")?;
        }
        write!(f, "]>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::ArrayTag;
    use crate::types::TagValue;
    use bytes::BufMut;
    use std::sync::Arc;

    fn definition_bytes(records: &[(u16, u16, u32)], names: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for &(array_size, type_code, offset) in records {
            out.put_u16_le(array_size);
            out.put_u16_le(type_code);
            out.put_u32_le(offset);
        }
        for name in names {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }
        out
    }

    fn packed_template() -> Template {
        // two packed booleans at offset 4, a DINT at offset 8
        let bytes = definition_bytes(
            &[(0, 0x00C1, 4), (0, 0x01C1, 4), (0, 0x00C4, 8)],
            &["Packed", "Run", "Stop", "Count"],
        );
        let definition = TemplateDefinition::parse(&bytes, 3).unwrap();
        let attributes = TemplateAttributes {
            object_size: 20,
            structure_size: 12,
            member_count: 3,
            crc: 0x1234,
        };
        Template::assemble(
            7,
            attributes,
            definition,
            vec![TagType::bool_bit(0), TagType::bool_bit(1), TagType::DINT],
        )
        .unwrap()
    }

    #[test]
    fn test_definition_parse() {
        let bytes = definition_bytes(&[(4, 0x8FCE, 0)], &["Outer", "Names"]);
        let definition = TemplateDefinition::parse(&bytes, 1).unwrap();
        assert_eq!(definition.structure_name, "Outer");
        assert_eq!(definition.member_names, vec!["Names".to_string()]);
        assert_eq!(
            definition.members,
            vec![RawMember {
                array_size: 4,
                type_code_raw: 0x8FCE,
                offset: 0
            }]
        );
        assert_eq!(definition.members[0].type_code(), 0x0FCE);
    }

    #[test]
    fn test_padding_computation() {
        let template = packed_template();
        let members = template.members();
        // first bool: gap from structure start to offset 4
        assert_eq!(members[0].padding(), 4);
        // second bool shares the byte, no gap
        assert_eq!(members[1].padding(), 0);
        // booleans end at offset 5, DINT starts at 8
        assert_eq!(members[2].padding(), 3);
        // DINT ends at 12 == structure size
        assert_eq!(template.trailing_padding(), 0);
    }

    #[test]
    fn test_filler_member_filtering() {
        let bytes = definition_bytes(
            &[(0, 0x00C4, 0), (0, 0x00C1, 4), (0, 0x00C2, 5)],
            &["Mix", "Count", "ZZZZZZZZZZMix0", "Small"],
        );
        let definition = TemplateDefinition::parse(&bytes, 3).unwrap();
        let attributes = TemplateAttributes {
            object_size: 20,
            structure_size: 8,
            member_count: 3,
            crc: 0x0001,
        };
        let template = Template::assemble(
            9,
            attributes,
            definition,
            vec![TagType::DINT, TagType::bool_bit(0), TagType::SINT],
        )
        .unwrap();

        assert_eq!(template.member_count(), 2);
        assert_eq!(template.index_of_member("Count").unwrap(), 0);
        // dense index skips the filler, element index does not
        assert_eq!(template.index_of_member("Small").unwrap(), 1);
        assert_eq!(template.element_index_of_member("Small").unwrap(), 2);
        assert!(matches!(
            template.index_of_member("ZZZZZZZZZZMix0"),
            Err(LogixError::UnknownMember { .. })
        ));
    }

    #[test]
    fn test_packed_bool_encode_decode() {
        let template = Arc::new(packed_template());
        let mut tag = StructureTag::new("Motor", Arc::clone(&template));
        tag.set_value(0, TagValue::Bool(true)).unwrap();
        tag.set_value(1, TagValue::Bool(true)).unwrap();
        tag.set_value(2, TagValue::Dint(77)).unwrap();

        let mut parts = Vec::new();
        tag.encode(&mut parts).unwrap();
        let bytes: Vec<u8> = parts.concat();
        assert_eq!(bytes.len(), template.structure_size());
        assert_eq!(bytes[4], 0b0000_0011);
        assert_eq!(&bytes[8..12], &77i32.to_le_bytes());

        let mut decoded = StructureTag::new("Motor", Arc::clone(&template));
        let mut cur = WireCursor::new(&bytes);
        decoded.decode(&mut cur).unwrap();
        assert_eq!(decoded.value("Run").unwrap(), &TagValue::Bool(true));
        assert_eq!(decoded.value("Stop").unwrap(), &TagValue::Bool(true));
        assert_eq!(decoded.value("Count").unwrap(), &TagValue::Dint(77));
        assert!(!cur.has_remaining());
    }

    #[test]
    fn test_same_offset_merge_rejects_wide_members() {
        let bytes = definition_bytes(
            &[(0, 0x00C4, 0), (0, 0x00C4, 0)],
            &["Broken", "A", "B"],
        );
        let definition = TemplateDefinition::parse(&bytes, 2).unwrap();
        let attributes = TemplateAttributes {
            object_size: 16,
            structure_size: 4,
            member_count: 2,
            crc: 0x0002,
        };
        let template = Arc::new(
            Template::assemble(11, attributes, definition, vec![TagType::DINT, TagType::DINT])
                .unwrap(),
        );
        let mut tag = StructureTag::new("Broken", Arc::clone(&template));
        tag.set_value(0, TagValue::Dint(1)).unwrap();
        tag.set_value(1, TagValue::Dint(2)).unwrap();

        let mut parts = Vec::new();
        assert!(matches!(
            tag.encode(&mut parts),
            Err(LogixError::Encode(_))
        ));
    }

    fn inner_template() -> Arc<Template> {
        let bytes = definition_bytes(&[(0, 0x00C4, 0), (0, 0x00C3, 4)], &["Inner", "A", "B"]);
        let definition = TemplateDefinition::parse(&bytes, 2).unwrap();
        let attributes = TemplateAttributes {
            object_size: 16,
            structure_size: 8,
            member_count: 2,
            crc: 0x0A0A,
        };
        Arc::new(
            Template::assemble(21, attributes, definition, vec![TagType::DINT, TagType::INT])
                .unwrap(),
        )
    }

    #[test]
    fn test_nested_array_of_structure_roundtrip() {
        let inner = inner_template();
        let bytes = definition_bytes(&[(0, 0x00C4, 0), (2, 0x8015, 4)], &["Outer", "Id", "Pair"]);
        let definition = TemplateDefinition::parse(&bytes, 2).unwrap();
        let attributes = TemplateAttributes {
            object_size: 24,
            structure_size: 24,
            member_count: 2,
            crc: 0x0B0B,
        };
        let outer = Arc::new(
            Template::assemble(
                22,
                attributes,
                definition,
                vec![TagType::DINT, TagType::Struct(Arc::clone(&inner))],
            )
            .unwrap(),
        );

        let mut tag = StructureTag::new("Outer", Arc::clone(&outer));
        tag.set_value(0, TagValue::Dint(9)).unwrap();
        {
            let pair: &mut ArrayTag = tag
                .array_member_mut(outer.member_named("Pair").unwrap())
                .unwrap();
            for i in 0..2 {
                let element = pair.structure_at_mut(i).unwrap();
                element.set_value(0, TagValue::Dint(100 + i as i32)).unwrap();
                element.set_value(1, TagValue::Int(i as i16)).unwrap();
            }
        }

        let mut parts = Vec::new();
        tag.encode(&mut parts).unwrap();
        let encoded: Vec<u8> = parts.concat();
        assert_eq!(encoded.len(), outer.structure_size());

        let mut decoded = StructureTag::new("Outer", Arc::clone(&outer));
        let mut cur = WireCursor::new(&encoded);
        decoded.decode(&mut cur).unwrap();
        assert_eq!(decoded.value("Id").unwrap(), &TagValue::Dint(9));
        let pair = decoded.array("Pair").unwrap();
        for i in 0..2 {
            let element = pair.structure_at(i).unwrap();
            assert_eq!(element.path(), format!("Outer.Pair[{i}]"));
            assert_eq!(element.value("A").unwrap(), &TagValue::Dint(100 + i as i32));
            assert_eq!(element.value("B").unwrap(), &TagValue::Int(i as i16));
        }
    }

    #[test]
    fn test_decode_skips_trailing_padding() {
        let template = Arc::new(packed_template());
        let mut bytes = vec![0u8; template.structure_size()];
        bytes[4] = 0b10;
        bytes[8..12].copy_from_slice(&5i32.to_le_bytes());
        bytes.extend_from_slice(&[0xEE, 0xFF]); // next value in the stream

        let mut tag = StructureTag::new("Motor", Arc::clone(&template));
        let mut cur = WireCursor::new(&bytes);
        tag.decode(&mut cur).unwrap();
        assert_eq!(cur.position(), template.structure_size());
        assert_eq!(tag.value("Stop").unwrap(), &TagValue::Bool(true));
    }
}
