//! Shuffle Engine
//!
//! Per-node protocol instance of the basic shuffling algorithm. Each node
//! keeps a small cache of neighbors and periodically swaps a random subset
//! of it with one randomly chosen neighbor:
//!
//! - active step (`on_periodic_tick`): pick a neighbor Q, offer it up to
//!   `shuffle_length - 1` other entries and wait for its answer
//! - passive step (`on_envelope_received`): answer requests with a reply or,
//!   while our own round is pending, a reject; fold replies into the cache
//!
//! The engine is not internally synchronized. Whoever drives it must call
//! the two entry points one at a time.
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use super::entry::Entry;
use super::messages::{GossipMessage, MessageType};
use super::view::View;
use crate::config_error;
use crate::error::Result;
use crate::node::NodeId;
use crate::transport::Sender;

/// Construction-time protocol parameters.
///
/// Only `ShuffleConfig::new` builds one, so both sizes are always positive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShuffleConfig {
    /// Maximum number of entries in the cache (N)
    cache_size: usize,
    /// Maximum number of entries offered in one direction (L)
    shuffle_length: usize,
    /// Ticks to wait for a reply before abandoning the round; `None` waits forever
    reply_timeout_rounds: Option<u32>,
}

impl ShuffleConfig {
    pub fn new(cache_size: usize, shuffle_length: usize) -> Result<Self> {
        if cache_size == 0 {
            return Err(config_error!("cache size must be positive"));
        }
        if shuffle_length == 0 {
            return Err(config_error!("shuffle length must be positive"));
        }
        if shuffle_length > cache_size {
            debug!(
                "Shuffle length {} exceeds cache size {}; subsets are capped by the cache",
                shuffle_length, cache_size
            );
        }
        Ok(Self {
            cache_size,
            shuffle_length,
            reply_timeout_rounds: None,
        })
    }

    /// Abandon a pending round after `rounds` skipped ticks. Zero disables expiry.
    pub fn with_reply_timeout(mut self, rounds: u32) -> Self {
        self.reply_timeout_rounds = (rounds > 0).then_some(rounds);
        self
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn shuffle_length(&self) -> usize {
        self.shuffle_length
    }

    pub fn reply_timeout_rounds(&self) -> Option<u32> {
        self.reply_timeout_rounds
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ShuffleState {
    Idle,
    WaitingForReply,
}

/// Counters for one engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ShuffleStats {
    pub rounds_started: u64,
    pub requests_received: u64,
    pub replies_sent: u64,
    pub rejects_sent: u64,
    pub replies_received: u64,
    pub rejects_received: u64,
    pub entries_added: u64,
    pub entries_replaced: u64,
    pub duplicates_suppressed: u64,
    pub entries_dropped: u64,
    pub send_failures: u64,
    pub timed_out_rounds: u64,
    /// Late answers to an abandoned round, dropped unread
    pub stale_answers: u64,
}

impl ShuffleStats {
    /// Fold another engine's counters into this one
    pub fn accumulate(&mut self, other: &ShuffleStats) {
        self.rounds_started += other.rounds_started;
        self.requests_received += other.requests_received;
        self.replies_sent += other.replies_sent;
        self.rejects_sent += other.rejects_sent;
        self.replies_received += other.replies_received;
        self.rejects_received += other.rejects_received;
        self.entries_added += other.entries_added;
        self.entries_replaced += other.entries_replaced;
        self.duplicates_suppressed += other.duplicates_suppressed;
        self.entries_dropped += other.entries_dropped;
        self.send_failures += other.send_failures;
        self.timed_out_rounds += other.timed_out_rounds;
        self.stale_answers += other.stale_answers;
    }
}

pub struct ShuffleEngine<S, R> {
    node_id: NodeId,
    config: ShuffleConfig,
    view: View,
    waiting: bool,
    // target of the round in flight
    pending: Option<NodeId>,
    // target of the last round given up on by reply expiry
    abandoned: Option<NodeId>,
    // ticks skipped while waiting, for reply expiry
    waited_ticks: u32,
    sender: S,
    rng: R,
    stats: ShuffleStats,
}

impl<S, R> std::fmt::Debug for ShuffleEngine<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShuffleEngine")
            .field("node_id", &self.node_id)
            .field("view", &self.view.peers())
            .field("waiting", &self.waiting)
            .field("cache_size", &self.config.cache_size())
            .field("shuffle_length", &self.config.shuffle_length())
            .finish()
    }
}

impl<S: Sender, R: Rng> ShuffleEngine<S, R> {
    pub fn new(node_id: NodeId, config: ShuffleConfig, sender: S, rng: R) -> Self {
        let view = View::new(node_id, config.cache_size());
        Self {
            node_id,
            config,
            view,
            waiting: false,
            pending: None,
            abandoned: None,
            waited_ticks: 0,
            sender,
            rng,
            stats: ShuffleStats::default(),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn config(&self) -> &ShuffleConfig {
        &self.config
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn stats(&self) -> ShuffleStats {
        self.stats
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn state(&self) -> ShuffleState {
        if self.waiting {
            ShuffleState::WaitingForReply
        } else {
            ShuffleState::Idle
        }
    }

    /// Number of neighbors currently in the cache
    pub fn degree(&self) -> usize {
        self.view.len()
    }

    /// Callers must stay within `0..degree()`.
    pub fn neighbor(&self, index: usize) -> NodeId {
        self.view.entry_at(index).peer()
    }

    pub fn neighbors(&self) -> Vec<NodeId> {
        self.view.peers()
    }

    pub fn contains(&self, peer: NodeId) -> bool {
        self.view.contains(peer)
    }

    /// Seed the cache, e.g. from a bootstrap mechanism
    pub fn add_neighbor(&mut self, peer: NodeId) -> bool {
        self.view.try_add(peer)
    }

    /// Active step, called once per round by the scheduler.
    pub fn on_periodic_tick(&mut self) {
        if self.waiting {
            match self.config.reply_timeout_rounds() {
                Some(limit) => {
                    self.waited_ticks += 1;
                    if self.waited_ticks < limit {
                        return;
                    }
                    self.expire_round();
                }
                None => return,
            }
        }
        if self.view.is_empty() {
            return;
        }

        let q = *self.view.entry_at(self.rng.gen_range(0..self.view.len()));
        let target = q.peer();
        if self.view.is_full() {
            self.view.remove(&q);
        }

        let subset = self.generate_subset(self.config.shuffle_length() - 1, target);
        debug!(
            "[{}] Starting shuffle with {} offering {} entries",
            self.node_id,
            target,
            subset.len()
        );
        self.send(target, GossipMessage::request(self.node_id, subset));

        self.waiting = true;
        self.pending = Some(target);
        self.waited_ticks = 0;
        self.stats.rounds_started += 1;
    }

    /// Passive step, called for every envelope addressed to this node.
    pub fn on_envelope_received(&mut self, message: GossipMessage) {
        let origin = message.origin();
        match message.message_type() {
            MessageType::Request => {
                self.stats.requests_received += 1;
                if self.waiting {
                    debug!(
                        "[{}] Rejecting shuffle from {} while own round is pending",
                        self.node_id, origin
                    );
                    self.send(origin, GossipMessage::reject(self.node_id));
                    self.stats.rejects_sent += 1;
                    return;
                }

                let subset = self.generate_subset(self.config.shuffle_length(), origin);
                debug!(
                    "[{}] Replying to {} with {} entries, merging {} offered",
                    self.node_id,
                    origin,
                    subset.len(),
                    message.offered().len()
                );
                self.send(origin, GossipMessage::reply(self.node_id, subset));
                self.stats.replies_sent += 1;

                self.merge(origin, message.offered());
                self.view.try_add(origin);
            }
            MessageType::Reply | MessageType::Reject if self.is_stale_answer(origin) => {
                self.abandoned = None;
                self.stats.stale_answers += 1;
                debug!(
                    "[{}] Dropping late {} from {} for an abandoned round",
                    self.node_id,
                    message.message_type(),
                    origin
                );
            }
            MessageType::Reply => {
                self.stats.replies_received += 1;
                debug!(
                    "[{}] Merging reply from {} with {} entries",
                    self.node_id,
                    origin,
                    message.offered().len()
                );
                self.merge(origin, message.offered());
                self.finish_round(origin);
            }
            MessageType::Reject => {
                self.stats.rejects_received += 1;
                debug!("[{}] Shuffle rejected by {}", self.node_id, origin);
                self.finish_round(origin);
            }
        }
    }

    fn finish_round(&mut self, origin: NodeId) {
        self.view.clear_all_sent_to();
        self.view.try_add(origin);
        self.waiting = false;
        self.pending = None;
        self.waited_ticks = 0;
    }

    /// An answer from the target of an expired round that is not also the
    /// target of the round in flight.
    fn is_stale_answer(&self, origin: NodeId) -> bool {
        self.abandoned == Some(origin) && self.pending != Some(origin)
    }

    fn expire_round(&mut self) {
        warn!(
            "[{}] No answer after {} rounds, abandoning pending shuffle",
            self.node_id, self.waited_ticks
        );
        self.view.clear_all_sent_to();
        self.waiting = false;
        self.abandoned = self.pending.take();
        self.waited_ticks = 0;
        self.stats.timed_out_rounds += 1;
    }

    /// Pick up to `length` entries at random, never `dest`, without replacement.
    ///
    /// The picked cache entries are marked as sent to `dest`; the returned
    /// entries are fresh copies without any marker.
    fn generate_subset(&mut self, length: usize, dest: NodeId) -> Vec<Entry> {
        let mut candidates: Vec<usize> = (0..self.view.len())
            .filter(|&i| self.view.entry_at(i).peer() != dest)
            .collect();
        let mut subset = Vec::with_capacity(length.min(candidates.len()));

        while subset.len() < length && !candidates.is_empty() {
            let index = candidates.remove(self.rng.gen_range(0..candidates.len()));
            let entry = self.view.entry_at_mut(index);
            entry.set_sent_to(Some(dest));
            subset.push(entry.fresh_copy());
        }
        subset
    }

    /// Fold offered entries into the cache.
    ///
    /// Known peers are skipped. Free slots are used first; once full, an
    /// entry previously offered to `origin` makes room, oldest first.
    /// Anything else is dropped.
    fn merge(&mut self, origin: NodeId, offered: &[Entry]) {
        for entry in offered {
            let peer = entry.peer();
            if peer == self.node_id || self.view.contains(peer) {
                self.stats.duplicates_suppressed += 1;
                continue;
            }
            if !self.view.is_full() {
                self.view.try_add(peer);
                self.stats.entries_added += 1;
                continue;
            }
            match self.view.oldest_sent_to(origin) {
                Some(index) => {
                    let evicted = self.view.remove_at(index);
                    self.view.try_add(peer);
                    self.stats.entries_replaced += 1;
                    debug!(
                        "[{}] Replaced {} with {} from {}",
                        self.node_id,
                        evicted.peer(),
                        peer,
                        origin
                    );
                }
                None => self.stats.entries_dropped += 1,
            }
        }
    }

    fn send(&mut self, target: NodeId, message: GossipMessage) {
        if let Err(e) = self.sender.send(target, message) {
            self.stats.send_failures += 1;
            debug!("[{}] Failed to send to {}: {}", self.node_id, target, e);
        }
    }
}
