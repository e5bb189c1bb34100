//! Scripted in-memory sessions for exercising the I/O paths in tests

use crate::link::Link;
use async_trait::async_trait;
use logix_core::{LogixError, LogixResult};
use logix_protocol::{CipConnect, CipReply, CipService, CipSession, EPath};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub service: CipService,
    pub path: Vec<u8>,
    pub body: Vec<u8>,
}

/// Canned replies plus a record of every exchange issued against them.
#[derive(Default)]
pub struct Script {
    replies: Mutex<VecDeque<LogixResult<CipReply>>>,
    identities: Mutex<VecDeque<LogixResult<()>>>,
    calls: Mutex<Vec<RecordedCall>>,
    connects: AtomicUsize,
}

impl Script {
    pub fn new() -> Arc<Script> {
        Arc::new(Script::default())
    }

    pub fn push_reply(&self, reply: CipReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn push_error(&self, err: LogixError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn push_identity(&self, result: LogixResult<()>) {
        self.identities.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

pub struct ScriptConnect {
    script: Arc<Script>,
}

impl ScriptConnect {
    pub fn new(script: Arc<Script>) -> ScriptConnect {
        ScriptConnect { script }
    }
}

#[async_trait]
impl CipConnect for ScriptConnect {
    async fn connect(&self) -> LogixResult<Box<dyn CipSession + Send>> {
        self.script.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptSession {
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptSession {
    script: Arc<Script>,
}

#[async_trait]
impl CipSession for ScriptSession {
    async fn exchange(
        &mut self,
        service: CipService,
        path: &EPath,
        body: &[u8],
    ) -> LogixResult<CipReply> {
        let mut encoded = Vec::new();
        path.encode(&mut encoded);
        self.script.calls.lock().unwrap().push(RecordedCall {
            service,
            path: encoded,
            body: body.to_vec(),
        });
        self.script
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LogixError::Protocol("script has no reply left".into())))
    }

    async fn identity(&mut self) -> LogixResult<()> {
        self.script.identities.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

pub fn scripted_link(script: &Arc<Script>) -> Link {
    Link::new(Arc::new(ScriptConnect::new(Arc::clone(script))))
}
