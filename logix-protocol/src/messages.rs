//! Request/response body codecs
//!
//! One codec per CIP operation the tag-access core issues. Requests encode
//! into the opaque body carried by the (out of scope) message-router
//! envelope; responses parse the body that comes back. The partial/complete
//! flag travels next to the body in [`CipReply`](crate::CipReply) and is
//! decided by the transport, not here.

use bytes::BufMut;
use logix_core::types::STRUCT_TYPE_CODE;
use logix_core::wire::WireCursor;
use logix_core::{LogixError, LogixResult, TagType, TemplateAttributes};

/// Fragmented read request: element count plus the byte offset already
/// accumulated by previous round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadFragmentedRequest {
    pub count: u16,
    pub offset: u32,
}

impl ReadFragmentedRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(6);
        out.put_u16_le(self.count);
        out.put_u32_le(self.offset);
        out
    }
}

/// Parsed fragmented read response: the wire type tag (with the template
/// crc when the value is a structure) followed by raw value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFragmentedResponse<'a> {
    pub type_code: u16,
    pub crc: Option<u16>,
    pub data: &'a [u8],
}

impl<'a> ReadFragmentedResponse<'a> {
    pub fn parse(body: &'a [u8]) -> LogixResult<ReadFragmentedResponse<'a>> {
        if body.is_empty() {
            return Ok(ReadFragmentedResponse {
                type_code: 0,
                crc: None,
                data: &[],
            });
        }
        let mut cur = WireCursor::new(body);
        let type_code = cur.get_u16()?;
        let crc = if type_code == STRUCT_TYPE_CODE {
            Some(cur.get_u16()?)
        } else {
            None
        };
        let data = cur.take(cur.remaining())?;
        Ok(ReadFragmentedResponse {
            type_code,
            crc,
            data,
        })
    }
}

/// Single-request write: type tag, element count, full payload.
#[derive(Debug)]
pub struct WriteRequest<'a> {
    pub ty: &'a TagType,
    pub element_count: u16,
    pub data: &'a [u8],
}

impl WriteRequest<'_> {
    pub fn encode(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(self.ty.encoded_type_size() + 2 + self.data.len());
        self.ty.encode_type(&mut out);
        out.put_u16_le(self.element_count);
        out.extend_from_slice(self.data);
        out
    }
}

/// Offset-tagged partial write: type tag, element count, byte offset of
/// this run, run payload.
#[derive(Debug)]
pub struct WriteFragmentedRequest<'a> {
    pub ty: &'a TagType,
    pub element_count: u16,
    pub offset: u32,
    pub data: &'a [u8],
}

impl WriteFragmentedRequest<'_> {
    pub fn encode(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(self.ty.encoded_type_size() + 6 + self.data.len());
        self.ty.encode_type(&mut out);
        out.put_u16_le(self.element_count);
        out.put_u32_le(self.offset);
        out.extend_from_slice(self.data);
        out
    }
}

/// Symbol listing request: ask for name, type and dimensions.
pub fn encode_symbol_list_request() -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    out.put_u16_le(3); // attribute count
    out.put_u16_le(1); // symbol name
    out.put_u16_le(2); // symbol type
    out.put_u16_le(8); // array dimensions
    out
}

/// One symbol record from a listing page, flags still unsplit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    pub instance_id: u32,
    pub name: String,
    pub type_code_raw: u16,
    pub dimensions: [u32; 3],
}

/// Parse a page of symbol records, reading until the body is exhausted.
pub fn parse_symbol_records(body: &[u8]) -> LogixResult<Vec<SymbolRecord>> {
    let mut cur = WireCursor::new(body);
    let mut records = Vec::new();
    while cur.has_remaining() {
        let instance_id = cur.get_u32()?;
        let name_length = cur.get_u16()? as usize;
        let name = cur.take(name_length)?.iter().map(|&b| b as char).collect();
        let type_code_raw = cur.get_u16()?;
        let dimensions = [cur.get_u32()?, cur.get_u32()?, cur.get_u32()?];
        records.push(SymbolRecord {
            instance_id,
            name,
            type_code_raw,
            dimensions,
        });
    }
    Ok(records)
}

/// Template attribute request: object size, structure size, member count,
/// structure handle.
pub fn encode_template_attributes_request() -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    out.put_u16_le(4); // attribute count
    out.put_u16_le(4); // object definition size in words
    out.put_u16_le(5); // structure size in bytes
    out.put_u16_le(2); // member count
    out.put_u16_le(1); // structure handle (crc)
    out
}

fn expect_attribute(cur: &mut WireCursor<'_>, expected: u16) -> LogixResult<()> {
    let attribute = cur.get_u16()?;
    let status = cur.get_u16()?;
    if attribute != expected || status != 0 {
        return Err(LogixError::Protocol(format!(
            "expecting template attribute {expected}, received {attribute} with status {status}"
        )));
    }
    Ok(())
}

/// Parse the template attribute response, validating the controller's
/// fixed attribute order (4, 5, 2, 1) and per-attribute status.
pub fn parse_template_attributes(body: &[u8]) -> LogixResult<TemplateAttributes> {
    let mut cur = WireCursor::new(body);
    let received = cur.get_u16()?;
    if received != 4 {
        return Err(LogixError::Protocol(format!(
            "expecting 4 template attributes, received {received}"
        )));
    }
    expect_attribute(&mut cur, 4)?;
    let object_size = cur.get_u32()?;
    expect_attribute(&mut cur, 5)?;
    let structure_size = cur.get_u32()?;
    expect_attribute(&mut cur, 2)?;
    let member_count = cur.get_u16()?;
    expect_attribute(&mut cur, 1)?;
    let crc = cur.get_u16()?;
    Ok(TemplateAttributes {
        object_size,
        structure_size,
        member_count,
        crc,
    })
}

/// Template definition read request: starting offset plus the bytes still
/// to read out of the full definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateDefinitionRequest {
    pub offset: u32,
    pub total_size: u32,
}

impl TemplateDefinitionRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(6);
        out.put_u32_le(self.offset);
        out.put_u16_le((self.total_size - self.offset) as u16);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_fragmented_request() {
        let request = ReadFragmentedRequest { count: 4, offset: 128 };
        assert_eq!(request.encode(), [4, 0, 128, 0, 0, 0]);
    }

    #[test]
    fn test_read_fragmented_response_atomic() {
        let body = [0xC4, 0x00, 1, 2, 3, 4];
        let response = ReadFragmentedResponse::parse(&body).unwrap();
        assert_eq!(response.type_code, 0x00C4);
        assert_eq!(response.crc, None);
        assert_eq!(response.data, &[1, 2, 3, 4]);
    }

    #[test]
    fn test_read_fragmented_response_structure() {
        let body = [0xA0, 0x02, 0xCE, 0x0F, 9, 9];
        let response = ReadFragmentedResponse::parse(&body).unwrap();
        assert_eq!(response.type_code, STRUCT_TYPE_CODE);
        assert_eq!(response.crc, Some(0x0FCE));
        assert_eq!(response.data, &[9, 9]);
    }

    #[test]
    fn test_read_fragmented_response_empty() {
        let response = ReadFragmentedResponse::parse(&[]).unwrap();
        assert!(response.data.is_empty());
    }

    #[test]
    fn test_write_request_layout() {
        let request = WriteRequest {
            ty: &TagType::DINT,
            element_count: 1,
            data: &[5, 0, 0, 0],
        };
        assert_eq!(request.encode(), [0xC4, 0x00, 1, 0, 5, 0, 0, 0]);
    }

    #[test]
    fn test_write_fragmented_request_layout() {
        let request = WriteFragmentedRequest {
            ty: &TagType::DINT,
            element_count: 2,
            offset: 400,
            data: &[7],
        };
        assert_eq!(
            request.encode(),
            [0xC4, 0x00, 2, 0, 0x90, 0x01, 0, 0, 7]
        );
    }

    #[test]
    fn test_symbol_list_request() {
        assert_eq!(
            encode_symbol_list_request(),
            [3, 0, 1, 0, 2, 0, 8, 0]
        );
    }

    fn symbol_record_bytes(instance_id: u32, name: &str, type_code: u16, dim0: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.put_u32_le(instance_id);
        out.put_u16_le(name.len() as u16);
        out.extend_from_slice(name.as_bytes());
        out.put_u16_le(type_code);
        out.put_u32_le(dim0);
        out.put_u32_le(0);
        out.put_u32_le(0);
        out
    }

    #[test]
    fn test_symbol_record_parse() {
        let mut body = symbol_record_bytes(42, "Foo", 0x8FCE, 0);
        body.extend(symbol_record_bytes(43, "Bar", 0x00C4, 10));
        let records = parse_symbol_records(&body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].instance_id, 42);
        assert_eq!(records[0].name, "Foo");
        assert_eq!(records[1].type_code_raw, 0x00C4);
        assert_eq!(records[1].dimensions, [10, 0, 0]);
    }

    fn attribute_response() -> Vec<u8> {
        let mut out = Vec::new();
        out.put_u16_le(4);
        out.put_u16_le(4);
        out.put_u16_le(0);
        out.put_u32_le(0x40); // object size in words
        out.put_u16_le(5);
        out.put_u16_le(0);
        out.put_u32_le(24); // structure size
        out.put_u16_le(2);
        out.put_u16_le(0);
        out.put_u16_le(3); // member count
        out.put_u16_le(1);
        out.put_u16_le(0);
        out.put_u16_le(0xBEEF); // crc
        out
    }

    #[test]
    fn test_template_attributes_parse() {
        let attributes = parse_template_attributes(&attribute_response()).unwrap();
        assert_eq!(
            attributes,
            TemplateAttributes {
                object_size: 0x40,
                structure_size: 24,
                member_count: 3,
                crc: 0xBEEF,
            }
        );
        assert_eq!(attributes.definition_byte_count(), 0x40 * 4 - 23);
    }

    #[test]
    fn test_template_attributes_rejects_wrong_order() {
        let mut body = attribute_response();
        body[2] = 5; // first attribute id is now wrong
        assert!(matches!(
            parse_template_attributes(&body),
            Err(LogixError::Protocol(_))
        ));
    }

    #[test]
    fn test_template_attributes_rejects_bad_status() {
        let mut body = attribute_response();
        body[4] = 1; // non-zero status on the first attribute
        assert!(matches!(
            parse_template_attributes(&body),
            Err(LogixError::Protocol(_))
        ));
    }

    #[test]
    fn test_template_definition_request() {
        let request = TemplateDefinitionRequest {
            offset: 100,
            total_size: 233,
        };
        assert_eq!(request.encode(), [100, 0, 0, 0, 133, 0]);
    }
}
