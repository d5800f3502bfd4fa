//! Free list for reply envelopes.
//!
//! Every [`Reply`](crate::Reply) borrows an [`Envelope`] from here and hands it
//! back when dropped. Envelopes are reset before they go back on the list, so
//! nothing a previous request put in one can be observed by the next.

use std::sync::{Mutex, PoisonError};

use http::StatusCode;
use once_cell::sync::Lazy;
use serde_json::value::RawValue;

/// Envelopes kept around beyond this are simply freed.
const MAX_IDLE: usize = 1024;

pub(crate) static ENVELOPES: Lazy<EnvelopePool> = Lazy::new(|| EnvelopePool::new(MAX_IDLE));

#[derive(Debug)]
pub(crate) struct Envelope {
    pub(crate) status: StatusCode,
    pub(crate) code: i32,
    pub(crate) message: String,
    /// The configured code messager may replace `message`.
    pub(crate) resolvable: bool,
    /// Payload already encoded as JSON; `None` renders as `null`.
    pub(crate) data: Option<Box<RawValue>>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            code: 0,
            message: String::new(),
            resolvable: false,
            data: None,
        }
    }
}

impl Envelope {
    /// Clears every field. The message buffer keeps its capacity.
    fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.code = 0;
        self.message.clear();
        self.resolvable = false;
        self.data = None;
    }
}

pub(crate) struct EnvelopePool {
    idle: Mutex<Vec<Box<Envelope>>>,
    max_idle: usize,
}

impl EnvelopePool {
    pub(crate) fn new(max_idle: usize) -> Self {
        Self { idle: Mutex::new(Vec::new()), max_idle }
    }

    pub(crate) fn get(&self) -> Box<Envelope> {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default()
    }

    pub(crate) fn put(&self, mut envelope: Box<Envelope>) {
        envelope.reset();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(envelope);
        }
    }

    #[cfg(test)]
    pub(crate) fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
