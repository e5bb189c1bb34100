//! Symbol and template discovery
//!
//! Symbols are enumerated from the symbol object class with paginated
//! instance-attribute-list requests; templates are read from the template
//! object class as a validated attribute pass followed by a fragmented
//! definition read. Parsing stays in `logix-protocol` and `logix-core`,
//! this module owns the pagination loops.

use crate::link::Link;
use logix_core::{LogixError, LogixResult, TemplateAttributes, TemplateDefinition};
use logix_protocol::{
    encode_symbol_list_request, encode_template_attributes_request, parse_symbol_records,
    parse_template_attributes, CipService, EPath, SymbolRecord, TemplateDefinitionRequest,
};

/// CIP class of the symbol object.
pub const SYMBOL_CLASS: u16 = 0x6B;

/// CIP class of the template object.
pub const TEMPLATE_CLASS: u16 = 0x6C;

/// Enumerate every controller symbol.
///
/// Each page starts at a seed instance id (0 for the first); while the
/// transport marks the reply partial, the next page is seeded with the
/// last returned instance id plus one.
pub async fn list_symbols(link: &Link) -> LogixResult<Vec<SymbolRecord>> {
    let mut records = Vec::new();
    let mut path = EPath::class_instance(SYMBOL_CLASS, 0);
    let body = encode_symbol_list_request();
    loop {
        let reply = link
            .exchange(CipService::GetInstanceAttributeList, &path, &body)
            .await?;
        let page = parse_symbol_records(&reply.body)?;
        log::debug!("symbol page with {} records", page.len());
        let last_id = page.last().map(|record| record.instance_id);
        records.extend(page);
        if !reply.partial {
            return Ok(records);
        }
        match last_id {
            Some(id) => path.set_instance(id + 1),
            None => {
                return Err(LogixError::Protocol(
                    "partial symbol page carried no records".into(),
                ))
            }
        }
    }
}

/// Read one template: attributes, then the raw definition stream.
///
/// The definition is `object_size * 4 - 23` bytes, accumulated across as
/// many plain reads as the transport reports partial. Assembly into a
/// `Template` is the caller's job since member types may need further
/// template reads.
pub async fn read_template(
    link: &Link,
    instance_id: u16,
) -> LogixResult<(TemplateAttributes, TemplateDefinition)> {
    let path = EPath::class_instance(TEMPLATE_CLASS, u32::from(instance_id));
    let reply = link
        .exchange(
            CipService::GetAttributesList,
            &path,
            &encode_template_attributes_request(),
        )
        .await?;
    let attributes = parse_template_attributes(&reply.body)?;
    log::debug!(
        "template {instance_id}: {} members, {} definition bytes",
        attributes.member_count,
        attributes.definition_byte_count()
    );

    let total = attributes.definition_byte_count();
    let mut definition = Vec::with_capacity(total as usize);
    loop {
        let request = TemplateDefinitionRequest {
            offset: definition.len() as u32,
            total_size: total,
        };
        let reply = link
            .exchange(CipService::ReadData, &path, &request.encode())
            .await?;
        if reply.body.is_empty() {
            return Err(LogixError::Protocol(format!(
                "template {instance_id} definition page was empty"
            )));
        }
        definition.extend_from_slice(&reply.body);
        if !reply.partial {
            break;
        }
    }
    let parsed = TemplateDefinition::parse(&definition, attributes.member_count)?;
    Ok((attributes, parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{scripted_link, Script};
    use bytes::BufMut;
    use logix_protocol::CipReply;

    fn symbol_page(records: &[(u32, &str, u16)]) -> Vec<u8> {
        let mut out = Vec::new();
        for &(instance_id, name, type_code) in records {
            out.put_u32_le(instance_id);
            out.put_u16_le(name.len() as u16);
            out.extend_from_slice(name.as_bytes());
            out.put_u16_le(type_code);
            out.put_u32_le(0);
            out.put_u32_le(0);
            out.put_u32_le(0);
        }
        out
    }

    #[tokio::test]
    async fn test_symbol_pagination_seeds_next_page() {
        let script = Script::new();
        let first: Vec<(u32, &str, u16)> =
            (1..=5).map(|id| (id, "A", 0x00C4)).collect();
        let second: Vec<(u32, &str, u16)> =
            (6..=8).map(|id| (id, "B", 0x00C4)).collect();
        script.push_reply(CipReply::partial(symbol_page(&first)));
        script.push_reply(CipReply::complete(symbol_page(&second)));
        let link = scripted_link(&script);

        let records = list_symbols(&link).await.unwrap();
        assert_eq!(records.len(), 8);
        let ids: Vec<u32> = records.iter().map(|r| r.instance_id).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<u32>>());

        let calls = script.calls();
        assert_eq!(calls.len(), 2);
        // first page starts at instance 0, second at last id + 1 = 6
        assert_eq!(calls[0].path, [2, 0x20, 0x6B, 0x24, 0x00]);
        assert_eq!(calls[1].path, [2, 0x20, 0x6B, 0x24, 0x06]);
    }

    #[tokio::test]
    async fn test_partial_empty_page_is_a_protocol_error() {
        let script = Script::new();
        script.push_reply(CipReply::partial(Vec::new()));
        let link = scripted_link(&script);
        assert!(matches!(
            list_symbols(&link).await,
            Err(LogixError::Protocol(_))
        ));
    }

    fn attribute_body(object_size: u32, structure_size: u32, member_count: u16) -> Vec<u8> {
        let mut out = Vec::new();
        out.put_u16_le(4);
        out.put_u16_le(4);
        out.put_u16_le(0);
        out.put_u32_le(object_size);
        out.put_u16_le(5);
        out.put_u16_le(0);
        out.put_u32_le(structure_size);
        out.put_u16_le(2);
        out.put_u16_le(0);
        out.put_u16_le(member_count);
        out.put_u16_le(1);
        out.put_u16_le(0);
        out.put_u16_le(0x55AA);
        out
    }

    fn definition_body() -> Vec<u8> {
        let mut out = Vec::new();
        for offset in [0u32, 4] {
            out.put_u16_le(0);
            out.put_u16_le(0x00C4);
            out.put_u32_le(offset);
        }
        for name in ["PairType", "First", "Second"] {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }
        out
    }

    #[tokio::test]
    async fn test_template_read_accumulates_definition_pages() {
        let script = Script::new();
        script.push_reply(CipReply::complete(attribute_body(16, 8, 2)));
        let body = definition_body();
        let (head, tail) = body.split_at(10);
        script.push_reply(CipReply::partial(head.to_vec()));
        script.push_reply(CipReply::complete(tail.to_vec()));
        let link = scripted_link(&script);

        let (attributes, definition) = read_template(&link, 0x0123).await.unwrap();
        assert_eq!(attributes.member_count, 2);
        assert_eq!(definition.structure_name, "PairType");
        assert_eq!(definition.member_names, vec!["First", "Second"]);

        let calls = script.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].service, CipService::GetAttributesList);
        assert_eq!(calls[1].service, CipService::ReadData);
        // second definition request continues at the accumulated offset
        let offset = u32::from_le_bytes([
            calls[2].body[0],
            calls[2].body[1],
            calls[2].body[2],
            calls[2].body[3],
        ]);
        assert_eq!(offset, 10);
        // remaining byte count shrinks by the offset
        let total = attributes.definition_byte_count();
        let remaining = u16::from_le_bytes([calls[2].body[4], calls[2].body[5]]);
        assert_eq!(u32::from(remaining), total - 10);
    }
}
