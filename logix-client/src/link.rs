//! Shared controller session handle
//!
//! A [`Link`] owns at most one live [`CipSession`], opened lazily from its
//! [`CipConnect`] factory. Every round trip takes the session lock for the
//! full exchange, so concurrent callers (the background liveness probe
//! included) are serialized onto the one session. Any transport failure
//! drops the session; the next round trip reconnects.

use logix_core::LogixResult;
use logix_protocol::{CipConnect, CipReply, CipService, CipSession, EPath};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Link {
    connect: Arc<dyn CipConnect>,
    session: Mutex<Option<Box<dyn CipSession + Send>>>,
}

impl Link {
    pub fn new(connect: Arc<dyn CipConnect>) -> Link {
        Link {
            connect,
            session: Mutex::new(None),
        }
    }

    /// One request/response round trip. The session is dropped on failure,
    /// so a fragmented loop failing mid-way starts over on a fresh session.
    pub async fn exchange(
        &self,
        service: CipService,
        path: &EPath,
        body: &[u8],
    ) -> LogixResult<CipReply> {
        let mut guard = self.session.lock().await;
        let mut session = match guard.take() {
            Some(session) => session,
            None => {
                log::debug!("opening controller session");
                self.connect.connect().await?
            }
        };
        match session.exchange(service, path, body).await {
            Ok(reply) => {
                *guard = Some(session);
                Ok(reply)
            }
            Err(err) => {
                log::warn!("dropping controller session after failed {service}: {err}");
                Err(err)
            }
        }
    }

    async fn identity(&self) -> LogixResult<()> {
        let mut guard = self.session.lock().await;
        let mut session = match guard.take() {
            Some(session) => session,
            None => {
                log::debug!("opening controller session");
                self.connect.connect().await?
            }
        };
        match session.identity().await {
            Ok(()) => {
                *guard = Some(session);
                Ok(())
            }
            Err(err) => {
                log::warn!("dropping controller session after failed identity probe: {err}");
                Err(err)
            }
        }
    }

    /// Liveness probe: one identity round trip, retried once on failure.
    pub async fn probe(&self) -> bool {
        if self.identity().await.is_ok() {
            return true;
        }
        match self.identity().await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("liveness probe failed after retry: {err}");
                false
            }
        }
    }

    /// Drop the current session, if any. Caches held above the link are
    /// unaffected; see `Controller::invalidate_caches`.
    pub async fn disconnect(&self) {
        let mut guard = self.session.lock().await;
        if guard.take().is_some() {
            log::debug!("closing controller session");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }
}
