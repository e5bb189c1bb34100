//! Tag round trips
//!
//! Bridges the pure tag model to the wire: a read fetches the tag's full
//! byte extent through the fragmented helper and decodes it in one pass,
//! a write encodes the current values into an ordered chunk list and
//! hands it to the fragmented write helper.

use crate::fragmented;
use crate::link::Link;
use async_trait::async_trait;
use logix_core::wire::WireCursor;
use logix_core::{LogixResult, Tag};
use logix_protocol::EPath;

#[async_trait]
pub trait TagTransfer {
    /// Fetch and decode this tag's full value, overwriting prior values.
    async fn read_from_controller(&mut self, link: &Link) -> LogixResult<()>;

    /// Encode and transmit this tag's current values.
    async fn write_to_controller(&self, link: &Link) -> LogixResult<()>;
}

#[async_trait]
impl TagTransfer for Tag {
    async fn read_from_controller(&mut self, link: &Link) -> LogixResult<()> {
        let path = EPath::symbol(self.path())?;
        let data = fragmented::read_tag_data(link, &path, self.element_count()).await?;
        let mut cur = WireCursor::new(&data);
        self.decode(&mut cur)
    }

    async fn write_to_controller(&self, link: &Link) -> LogixResult<()> {
        let path = EPath::symbol(self.path())?;
        let mut chunks = Vec::new();
        self.encode(&mut chunks)?;
        let ty = self.value_type();
        fragmented::write_tag_data(link, &path, &ty, self.element_count(), &chunks).await
    }
}
