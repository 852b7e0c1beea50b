// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Peer channels and the broadcast group.
//!
//! The group is a copy-on-write list behind an `ArcSwap`: broadcasts iterate
//! an immutable snapshot with a single atomic load, while membership changes
//! publish a new list. A channel removed during a broadcast still receives
//! the buffer being sent from the snapshot it was part of, never a later one.
//!
//! Members carry the sequence number of the first buffer they may receive,
//! so a late joiner never sees buffers enqueued before it joined.

use arc_swap::ArcSwap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique channel id.
pub fn next_channel_id() -> u64 {
    NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed)
}

/// A connected peer that accepts whole serialized messages.
pub trait Channel: Send + Sync {
    /// Unique id used for membership changes.
    fn id(&self) -> u64;

    /// Write one message buffer (framing is the channel's concern).
    fn write(&self, buffer: &[u8]) -> io::Result<()>;

    /// Close the underlying connection. Must be idempotent.
    fn close(&self);

    fn is_open(&self) -> bool;

    /// Human-readable peer description for logs.
    fn peer(&self) -> String {
        format!("channel#{}", self.id())
    }
}

/// Result of one broadcast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    /// Ids of channels whose write failed (already removed from the group).
    pub failed: Vec<u64>,
}

/// One group member and the first buffer sequence it should receive.
#[derive(Clone)]
struct Member {
    channel: Arc<dyn Channel>,
    first_seq: u64,
}

/// Live set of channels attached to one outgoing queue.
pub struct ChannelGroup {
    members: ArcSwap<Vec<Member>>,
}

impl ChannelGroup {
    pub fn new() -> Self {
        Self {
            members: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Add a channel that receives every later broadcast.
    pub fn add(&self, channel: Arc<dyn Channel>) {
        self.add_from(channel, 0);
    }

    /// Add a channel that only receives buffers with sequence `>= first_seq`.
    pub fn add_from(&self, channel: Arc<dyn Channel>, first_seq: u64) {
        let member = Member { channel, first_seq };
        self.members.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(member.clone());
            next
        });
    }

    /// Remove a channel by id. Returns the removed channel, if present.
    pub fn remove(&self, id: u64) -> Option<Arc<dyn Channel>> {
        let previous = self.members.rcu(|current| {
            current
                .iter()
                .filter(|m| m.channel.id() != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous
            .iter()
            .find(|m| m.channel.id() == id)
            .map(|m| m.channel.clone())
    }

    /// Stable view of the current membership.
    pub fn snapshot(&self) -> Vec<Arc<dyn Channel>> {
        self.members.load().iter().map(|m| m.channel.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.load().is_empty()
    }

    /// Write `buffer` to every member; failed channels are closed and removed.
    pub fn broadcast(&self, buffer: &[u8]) -> BroadcastOutcome {
        self.broadcast_seq(u64::MAX, buffer)
    }

    /// Write buffer number `seq` to every member that joined before it.
    pub fn broadcast_seq(&self, seq: u64, buffer: &[u8]) -> BroadcastOutcome {
        let snapshot = self.members.load_full();
        let mut outcome = BroadcastOutcome::default();
        for member in snapshot.iter().filter(|m| seq >= m.first_seq) {
            let channel = &member.channel;
            match channel.write(buffer) {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    log::warn!(
                        "[ChannelGroup] write to {} failed, removing: {}",
                        channel.peer(),
                        e
                    );
                    outcome.failed.push(channel.id());
                }
            }
        }
        drop(snapshot);
        for id in &outcome.failed {
            if let Some(channel) = self.remove(*id) {
                channel.close();
            }
        }
        outcome
    }

    /// Close and remove every member.
    pub fn close_all(&self) -> usize {
        let previous = self.members.swap(Arc::new(Vec::new()));
        for member in previous.iter() {
            member.channel.close();
        }
        previous.len()
    }
}

impl Default for ChannelGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChannelGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelGroup")
            .field("channels", &self.len())
            .finish()
    }
}

/// In-memory channel recording every buffer it receives.
///
/// Useful for exercising queues without sockets.
#[derive(Debug)]
pub struct MemoryChannel {
    id: u64,
    received: parking_lot::Mutex<Vec<Vec<u8>>>,
    arrived: parking_lot::Condvar,
    open: std::sync::atomic::AtomicBool,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl MemoryChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: next_channel_id(),
            received: parking_lot::Mutex::new(Vec::new()),
            arrived: parking_lot::Condvar::new(),
            open: std::sync::atomic::AtomicBool::new(true),
            fail_writes: std::sync::atomic::AtomicBool::new(false),
        })
    }

    /// Buffers received so far, in arrival order.
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received.lock().clone()
    }

    /// Wait until at least `count` buffers arrived or `timeout` elapses.
    pub fn wait_for(&self, count: usize, timeout: std::time::Duration) -> Vec<Vec<u8>> {
        let deadline = std::time::Instant::now() + timeout;
        let mut received = self.received.lock();
        while received.len() < count {
            if self.arrived.wait_until(&mut received, deadline).timed_out() {
                break;
            }
        }
        received.clone()
    }

    /// Make every later write fail with `BrokenPipe`.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::Relaxed);
    }
}

impl Channel for MemoryChannel {
    fn id(&self) -> u64 {
        self.id
    }

    fn write(&self, buffer: &[u8]) -> io::Result<()> {
        if !self.is_open() || self.fail_writes.load(Ordering::Relaxed) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "channel closed"));
        }
        self.received.lock().push(buffer.to_vec());
        self.arrived.notify_all();
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::Relaxed);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }
}
