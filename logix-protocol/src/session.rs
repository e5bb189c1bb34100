//! Session interface to the encapsulation layer
//!
//! The tag-access core never opens sockets itself. It talks through
//! [`CipSession`], one round trip at a time, and obtains fresh sessions
//! from a [`CipConnect`] factory when the previous one failed. The
//! concrete implementations (EtherNet/IP encapsulation, unconnected send
//! wrapping, backplane routing) live behind these traits.

use async_trait::async_trait;
use logix_core::LogixResult;

use crate::epath::EPath;
use crate::service::CipService;

/// A successful CIP reply body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipReply {
    /// Raw service-specific body, envelope already stripped.
    pub body: Vec<u8>,
    /// True when the controller answered with partial-transfer status,
    /// meaning more data remains at a higher offset.
    pub partial: bool,
}

impl CipReply {
    pub fn complete(body: Vec<u8>) -> Self {
        Self { body, partial: false }
    }

    pub fn partial(body: Vec<u8>) -> Self {
        Self { body, partial: true }
    }
}

/// One established session with a controller.
///
/// `exchange` maps error CIP statuses other than partial-transfer to
/// `Err`; a returned `CipReply` is always usable. Implementations are not
/// required to be cancel-safe, the client serializes round trips.
#[async_trait]
pub trait CipSession: Send {
    /// Send one request and await its reply.
    async fn exchange(
        &mut self,
        service: CipService,
        path: &EPath,
        body: &[u8],
    ) -> LogixResult<CipReply>;

    /// Cheap liveness probe, typically a ListIdentity exchange.
    async fn identity(&mut self) -> LogixResult<()>;
}

/// Factory for sessions, held by the client for transparent reconnects.
#[async_trait]
pub trait CipConnect: Send + Sync {
    async fn connect(&self) -> LogixResult<Box<dyn CipSession + Send>>;
}
