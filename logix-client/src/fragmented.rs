//! Fragmented transfer helpers
//!
//! Pure byte-stream orchestration: reads accumulate response payloads while
//! the transport flags the reply partial, writes either fit one request or
//! are split into greedy chunk runs bounded by the packet budget. Value
//! semantics stay with the tag and type codecs.

use crate::link::Link;
use logix_core::{LogixError, LogixResult, TagType};
use logix_protocol::{
    CipService, EPath, ReadFragmentedRequest, ReadFragmentedResponse, WriteFragmentedRequest,
    WriteRequest,
};

/// Per-request payload budget in bytes.
pub const MAX_PACKET_SIZE: usize = 480;

/// Read a tag's full byte extent, one fragmented round trip at a time.
///
/// Each request asks for the original element count at an offset equal to
/// the bytes accumulated so far; the loop stops on the first reply the
/// transport does not mark partial.
pub async fn read_tag_data(link: &Link, path: &EPath, count: u16) -> LogixResult<Vec<u8>> {
    let mut data: Vec<u8> = Vec::new();
    loop {
        let request = ReadFragmentedRequest {
            count,
            offset: data.len() as u32,
        };
        let reply = link
            .exchange(CipService::ReadDataFragmented, path, &request.encode())
            .await?;
        let response = ReadFragmentedResponse::parse(&reply.body)?;
        data.extend_from_slice(response.data);
        log::debug!(
            "read fragment of {} bytes, {} accumulated",
            response.data.len(),
            data.len()
        );
        if !reply.partial {
            return Ok(data);
        }
        if response.data.is_empty() {
            return Err(LogixError::Protocol(
                "partial read returned no data".into(),
            ));
        }
    }
}

/// Pack ordered chunks into runs that never exceed the packet budget.
///
/// A chunk is never split; a run is flushed before the chunk that would
/// overflow it. A single chunk larger than the budget cannot be sent.
fn chunk_runs(chunks: &[Vec<u8>]) -> LogixResult<Vec<Vec<u8>>> {
    let mut runs = Vec::new();
    let mut run: Vec<u8> = Vec::new();
    for chunk in chunks {
        if chunk.len() > MAX_PACKET_SIZE {
            return Err(LogixError::Encode(format!(
                "a single {}-byte chunk exceeds the {MAX_PACKET_SIZE}-byte packet budget",
                chunk.len()
            )));
        }
        if !run.is_empty() && run.len() + chunk.len() > MAX_PACKET_SIZE {
            runs.push(std::mem::take(&mut run));
        }
        run.extend_from_slice(chunk);
    }
    if !run.is_empty() {
        runs.push(run);
    }
    Ok(runs)
}

/// Write a tag's encoded chunk list.
///
/// When the whole payload plus the path fits one packet, a single write
/// request carries it. Otherwise each run goes out as an offset-tagged
/// partial write, offsets monotonic and contiguous.
pub async fn write_tag_data(
    link: &Link,
    path: &EPath,
    ty: &TagType,
    element_count: u16,
    chunks: &[Vec<u8>],
) -> LogixResult<()> {
    let total: usize = chunks.iter().map(Vec::len).sum();
    if total + path.wire_size() <= MAX_PACKET_SIZE {
        let data = chunks.concat();
        let request = WriteRequest {
            ty,
            element_count,
            data: &data,
        };
        link.exchange(CipService::WriteData, path, &request.encode())
            .await?;
        return Ok(());
    }
    let mut offset = 0u32;
    for run in chunk_runs(chunks)? {
        log::debug!("writing {} bytes at offset {offset}", run.len());
        let request = WriteFragmentedRequest {
            ty,
            element_count,
            offset,
            data: &run,
        };
        link.exchange(CipService::WriteDataFragmented, path, &request.encode())
            .await?;
        offset += run.len() as u32;
    }
    Ok(())
}
