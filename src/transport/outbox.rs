//! Recording transport for deterministic drivers.
//!
//! Every send is appended to a shared FIFO queue. A driver drains the queue
//! and decides when (and whether) each envelope reaches its target.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::traits::Sender;
use crate::error::{Result, ShuffleError};
use crate::gossip::GossipMessage;
use crate::node::NodeId;

/// An envelope waiting for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboxEntry {
    pub target: NodeId,
    pub message: GossipMessage,
}

/// Shared queue of outbound envelopes. Clones share the same queue.
#[derive(Clone, Debug, Default)]
pub struct Outbox {
    queue: Arc<Mutex<VecDeque<OutboxEntry>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything queued so far, in send order.
    pub fn drain(&self) -> Vec<OutboxEntry> {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.drain(..).collect()
    }

    pub fn pop(&self) -> Option<OutboxEntry> {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Sender for Outbox {
    fn send(&self, target: NodeId, message: GossipMessage) -> Result<()> {
        self.queue
            .lock()
            .map_err(|e| ShuffleError::Concurrency(format!("Mutex lock fail {}", e)))?
            .push_back(OutboxEntry { target, message });
        Ok(())
    }
}
