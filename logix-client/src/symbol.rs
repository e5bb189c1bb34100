//! Controller symbols
//!
//! A symbol is a named top-level controller tag: instance id, raw type
//! code (flag bits split off at construction) and up to three array
//! dimensions. Type and tag are resolved lazily by the controller and
//! cached here as explicit `Option` state.

use logix_core::template::TYPE_CODE_MASK;
use logix_core::{ArrayTag, LogixError, LogixResult, ScalarTag, StructureTag, Tag, TagType};
use logix_protocol::SymbolRecord;
use std::fmt;

const STRUCTURE_FLAG: u16 = 0x8000;
const RESERVED_FLAG: u16 = 0x1000;
const DIMENSION_BITS: u16 = 0x6000;

#[derive(Debug, Clone)]
pub struct Symbol {
    instance_id: u32,
    name: String,
    type_code: u16,
    structure: bool,
    reserved: bool,
    dimension_count: u8,
    dimensions: [u32; 3],
    ty: Option<TagType>,
    tag: Option<Tag>,
}

impl From<SymbolRecord> for Symbol {
    fn from(record: SymbolRecord) -> Symbol {
        let raw = record.type_code_raw;
        Symbol {
            instance_id: record.instance_id,
            name: record.name,
            type_code: raw & TYPE_CODE_MASK,
            structure: raw & STRUCTURE_FLAG != 0,
            reserved: raw & RESERVED_FLAG != 0,
            dimension_count: ((raw & DIMENSION_BITS) >> 13) as u8,
            dimensions: record.dimensions,
            ty: None,
            tag: None,
        }
    }
}

impl Symbol {
    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type code proper, flag bits already masked off.
    pub fn type_code(&self) -> u16 {
        self.type_code
    }

    pub fn is_structure(&self) -> bool {
        self.structure
    }

    pub fn is_reserved(&self) -> bool {
        self.reserved
    }

    pub fn dimension_count(&self) -> u8 {
        self.dimension_count
    }

    pub fn dimensions(&self) -> &[u32; 3] {
        &self.dimensions
    }

    pub fn is_array(&self) -> bool {
        self.dimension_count > 0
    }

    /// Declared first-dimension length for arrays, 1 otherwise.
    pub fn element_count(&self) -> u32 {
        if self.is_array() {
            self.dimensions[0]
        } else {
            1
        }
    }

    pub fn ty(&self) -> Option<&TagType> {
        self.ty.as_ref()
    }

    pub fn set_type(&mut self, ty: TagType) {
        self.ty = Some(ty);
    }

    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    pub fn tag_mut(&mut self) -> Option<&mut Tag> {
        self.tag.as_mut()
    }

    /// The tag mirroring this symbol, created on first access once the
    /// type has been resolved: an array for dimensioned symbols, a
    /// structure for template types, a scalar otherwise.
    pub fn ensure_tag(&mut self) -> LogixResult<&mut Tag> {
        match &mut self.tag {
            Some(tag) => Ok(tag),
            slot @ None => {
                let ty = self.ty.clone().ok_or_else(|| {
                    LogixError::Protocol(format!(
                        "symbol {} has no resolved type to build a tag from",
                        self.name
                    ))
                })?;
                let tag = if self.dimension_count > 0 {
                    Tag::Array(ArrayTag::new(
                        self.name.clone(),
                        ty,
                        self.dimensions[0] as usize,
                    ))
                } else {
                    match ty {
                        TagType::Struct(template) => {
                            Tag::Structure(StructureTag::new(self.name.clone(), template))
                        }
                        other => Tag::Scalar(ScalarTag::new(self.name.clone(), other)),
                    }
                };
                Ok(slot.insert(tag))
            }
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Symbol '{}' id {} type 0x{:04X}",
            self.name, self.instance_id, self.type_code
        )?;
        if self.structure {
            write!(f, " structure")?;
        }
        if self.reserved {
            write!(f, " reserved")?;
        }
        if self.dimension_count > 0 {
            write!(
                f,
                " dims {:?}",
                &self.dimensions[..self.dimension_count as usize]
            )?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logix_core::TagValue;

    fn record(type_code_raw: u16, dimensions: [u32; 3]) -> SymbolRecord {
        SymbolRecord {
            instance_id: 42,
            name: "Foo".into(),
            type_code_raw,
            dimensions,
        }
    }

    #[test]
    fn test_flag_split() {
        let symbol = Symbol::from(record(0x8FCE, [0, 0, 0]));
        assert!(symbol.is_structure());
        assert!(!symbol.is_reserved());
        assert_eq!(symbol.type_code(), 0x0FCE);
        assert_eq!(symbol.dimension_count(), 0);

        let symbol = Symbol::from(record(0x20C4, [10, 0, 0]));
        assert!(!symbol.is_structure());
        assert_eq!(symbol.type_code(), 0x00C4);
        assert_eq!(symbol.dimension_count(), 1);
        assert_eq!(symbol.element_count(), 10);

        let symbol = Symbol::from(record(0x10C1, [0, 0, 0]));
        assert!(symbol.is_reserved());
        assert_eq!(symbol.type_code(), 0x00C1);
    }

    #[test]
    fn test_ensure_tag_variants() {
        let mut scalar = Symbol::from(record(0x00C4, [0, 0, 0]));
        scalar.set_type(TagType::DINT);
        assert!(matches!(scalar.ensure_tag().unwrap(), Tag::Scalar(_)));

        let mut array = Symbol::from(record(0x20C3, [4, 0, 0]));
        array.set_type(TagType::INT);
        let tag = array.ensure_tag().unwrap();
        match tag {
            Tag::Array(tag) => assert_eq!(tag.len(), 4),
            other => panic!("expected an array tag, got {other}"),
        }
    }

    #[test]
    fn test_ensure_tag_requires_resolved_type() {
        let mut symbol = Symbol::from(record(0x00C4, [0, 0, 0]));
        assert!(symbol.ensure_tag().is_err());
    }

    #[test]
    fn test_ensure_tag_preserves_identity() {
        let mut symbol = Symbol::from(record(0x00C4, [0, 0, 0]));
        symbol.set_type(TagType::DINT);
        if let Tag::Scalar(tag) = symbol.ensure_tag().unwrap() {
            tag.set_value(TagValue::Dint(9));
        }
        match symbol.ensure_tag().unwrap() {
            Tag::Scalar(tag) => assert_eq!(tag.value(), Some(&TagValue::Dint(9))),
            other => panic!("expected a scalar tag, got {other}"),
        }
    }
}
