// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publisher-side message queue.
//!
//! ```text
//!  put(msg) --serialize--> [ circular slots ] --writer thread--> ChannelGroup
//!                               |                                 |  |  |
//!                          drop oldest                          peers ...
//! ```
//!
//! Lifecycle: `Stopped -> Running -> ShuttingDown -> Stopped`. Only a
//! running queue accepts messages and channels.

use super::channel::{Channel, ChannelGroup};
use super::circular::CircularBlockingQueue;
use super::QueueError;
use crate::config::TransportConfig;
use crate::wire::MessageSerializer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Lifecycle state of an [`OutgoingMessageQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Stopped,
    Running,
    ShuttingDown,
}

/// Counters for one outgoing queue.
#[derive(Debug, Default)]
pub struct QueueMetrics {
    enqueued: AtomicU64,
    evicted: AtomicU64,
    broadcasts: AtomicU64,
    deliveries: AtomicU64,
    write_failures: AtomicU64,
    latched_sends: AtomicU64,
}

/// Point-in-time copy of [`QueueMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueMetricsSnapshot {
    pub enqueued: u64,
    pub evicted: u64,
    pub broadcasts: u64,
    pub deliveries: u64,
    pub write_failures: u64,
    pub latched_sends: u64,
}

impl QueueMetrics {
    pub fn snapshot(&self) -> QueueMetricsSnapshot {
        QueueMetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            latched_sends: self.latched_sends.load(Ordering::Relaxed),
        }
    }
}

type Buffer = Arc<Vec<u8>>;

/// Sequence bookkeeping guarded by one lock so queue order, sequence order and
/// the latched buffer always agree.
#[derive(Default)]
struct Sequencer {
    next_seq: u64,
    latched: Option<(u64, Buffer)>,
}

struct Shared {
    queue: CircularBlockingQueue<(u64, Buffer)>,
    channels: ChannelGroup,
    sequencer: Mutex<Sequencer>,
    // Held by the writer while broadcasting and by `add_channel` while
    // joining, so a latched replay never interleaves with a broadcast.
    delivery: Mutex<()>,
    latch_mode: AtomicBool,
    metrics: QueueMetrics,
}

/// Bounded queue of serialized messages broadcast to every attached channel.
pub struct OutgoingMessageQueue<T> {
    serializer: Box<dyn MessageSerializer<T>>,
    shared: Arc<Shared>,
    state: Mutex<QueueState>,
    // Mirrors `state == Running` so `put` never waits on the state lock.
    running: AtomicBool,
    writer: Mutex<Option<JoinHandle<()>>>,
    thread_name: String,
}

impl<T> OutgoingMessageQueue<T> {
    /// Create a stopped queue with the default configuration.
    pub fn new(serializer: impl MessageSerializer<T> + 'static) -> Self {
        Self::with_config(serializer, &TransportConfig::default())
    }

    /// Create a stopped queue using capacity, latch mode and thread name from `config`.
    pub fn with_config(serializer: impl MessageSerializer<T> + 'static, config: &TransportConfig) -> Self {
        Self {
            serializer: Box::new(serializer),
            shared: Arc::new(Shared {
                queue: CircularBlockingQueue::new(config.queue_capacity),
                channels: ChannelGroup::new(),
                sequencer: Mutex::new(Sequencer::default()),
                delivery: Mutex::new(()),
                latch_mode: AtomicBool::new(config.latch),
                metrics: QueueMetrics::default(),
            }),
            state: Mutex::new(QueueState::Stopped),
            running: AtomicBool::new(false),
            writer: Mutex::new(None),
            thread_name: config.writer_thread_name.clone(),
        }
    }

    pub fn state(&self) -> QueueState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawn the writer thread. Starting a running queue is a no-op.
    pub fn start(&self) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        match *state {
            QueueState::Running => return Ok(()),
            QueueState::ShuttingDown => return Err(QueueError::NotRunning),
            QueueState::Stopped => {}
        }
        self.shared.queue.reopen();
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || writer_loop(&shared))
            .map_err(QueueError::Spawn)?;
        *self.writer.lock() = Some(handle);
        *state = QueueState::Running;
        self.running.store(true, Ordering::Release);
        log::debug!("[OutgoingQueue] writer `{}` started", self.thread_name);
        Ok(())
    }

    /// Serialize `message` and enqueue it. Never blocks on consumers.
    pub fn put(&self, message: &T) -> Result<(), QueueError> {
        if !self.is_running() {
            return Err(QueueError::NotRunning);
        }
        let buffer = self.serializer.serialize(message).map_err(QueueError::Serialize)?;
        self.put_serialized(buffer)
    }

    /// Enqueue an already serialized buffer.
    pub fn put_serialized(&self, buffer: Vec<u8>) -> Result<(), QueueError> {
        if !self.is_running() {
            return Err(QueueError::NotRunning);
        }
        let buffer = Arc::new(buffer);
        let evicted = {
            let mut sequencer = self.shared.sequencer.lock();
            let seq = sequencer.next_seq;
            match self.shared.queue.offer((seq, Arc::clone(&buffer))) {
                Err(_) => return Err(QueueError::NotRunning),
                Ok(evicted) => {
                    sequencer.next_seq += 1;
                    sequencer.latched = Some((seq, buffer));
                    evicted
                }
            }
        };
        self.shared.metrics.enqueued.fetch_add(1, Ordering::Relaxed);
        if let Some((seq, _)) = evicted {
            self.shared.metrics.evicted.fetch_add(1, Ordering::Relaxed);
            log::trace!("[OutgoingQueue] queue full, dropped buffer #{}", seq);
        }
        Ok(())
    }

    /// Attach a peer. Returns `false` (and logs) when the queue is not running.
    ///
    /// In latch mode the most recent buffer is sent to the new channel right away.
    pub fn add_channel(&self, channel: Arc<dyn Channel>) -> bool {
        let state = self.state.lock();
        if *state != QueueState::Running {
            log::warn!(
                "[OutgoingQueue] cannot add channel {} after shutdown",
                channel.peer()
            );
            return false;
        }
        let _delivery = self.shared.delivery.lock();
        let (first_seq, latched) = {
            let sequencer = self.shared.sequencer.lock();
            (sequencer.next_seq, sequencer.latched.clone())
        };
        self.shared.channels.add_from(Arc::clone(&channel), first_seq);
        if self.is_latch_mode() {
            if let Some((seq, buffer)) = latched {
                log::debug!(
                    "[OutgoingQueue] latched buffer #{} -> {}",
                    seq,
                    channel.peer()
                );
                match channel.write(&buffer) {
                    Ok(()) => {
                        self.shared.metrics.latched_sends.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        log::warn!(
                            "[OutgoingQueue] latched write to {} failed: {}",
                            channel.peer(),
                            e
                        );
                        self.shared.metrics.write_failures.fetch_add(1, Ordering::Relaxed);
                        self.shared.channels.remove(channel.id());
                        channel.close();
                    }
                }
            }
        }
        drop(state);
        true
    }

    /// Detach a peer without closing it.
    pub fn remove_channel(&self, id: u64) -> bool {
        self.shared.channels.remove(id).is_some()
    }

    pub fn number_of_channels(&self) -> usize {
        self.shared.channels.len()
    }

    pub fn set_latch_mode(&self, enabled: bool) {
        self.shared.latch_mode.store(enabled, Ordering::Relaxed);
    }

    pub fn is_latch_mode(&self) -> bool {
        self.shared.latch_mode.load(Ordering::Relaxed)
    }

    /// Change the queue capacity; the newest buffers are kept.
    pub fn set_limit(&self, limit: usize) {
        let evicted = self.shared.queue.set_limit(limit);
        if evicted > 0 {
            self.shared.metrics.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }

    pub fn limit(&self) -> usize {
        self.shared.queue.limit()
    }

    /// Buffers waiting for the writer.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn metrics(&self) -> QueueMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Stop the writer and close every channel. Idempotent.
    ///
    /// Channels are closed before the writer is joined, so a write blocked on
    /// a stalled peer fails instead of holding up shutdown. No broadcast
    /// happens once this returns.
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            if *state != QueueState::Running {
                return;
            }
            *state = QueueState::ShuttingDown;
            self.running.store(false, Ordering::Release);
        }
        self.shared.queue.close();
        let closed = self.shared.channels.close_all();
        if let Some(handle) = self.writer.lock().take() {
            if handle.join().is_err() {
                log::warn!("[OutgoingQueue] writer `{}` panicked", self.thread_name);
            }
        }
        *self.state.lock() = QueueState::Stopped;
        log::debug!(
            "[OutgoingQueue] writer `{}` stopped, closed {} channel(s)",
            self.thread_name,
            closed
        );
    }
}

impl<T> Drop for OutgoingMessageQueue<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T> std::fmt::Debug for OutgoingMessageQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutgoingMessageQueue")
            .field("state", &self.state())
            .field("limit", &self.limit())
            .field("pending", &self.pending())
            .field("channels", &self.number_of_channels())
            .field("latch", &self.is_latch_mode())
            .finish()
    }
}

fn writer_loop(shared: &Shared) {
    while let Some((seq, buffer)) = shared.queue.take() {
        let _delivery = shared.delivery.lock();
        if shared.queue.is_closed() {
            break;
        }
        let outcome = shared.channels.broadcast_seq(seq, &buffer);
        shared.metrics.broadcasts.fetch_add(1, Ordering::Relaxed);
        shared
            .metrics
            .deliveries
            .fetch_add(outcome.delivered as u64, Ordering::Relaxed);
        if !outcome.failed.is_empty() {
            shared
                .metrics
                .write_failures
                .fetch_add(outcome.failed.len() as u64, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryChannel;
    use crate::wire::WireError;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    fn raw(bytes: &Vec<u8>) -> Result<Vec<u8>, WireError> {
        Ok(bytes.clone())
    }

    fn queue(capacity: usize) -> OutgoingMessageQueue<Vec<u8>> {
        let config = TransportConfig::default().with_queue_capacity(capacity);
        OutgoingMessageQueue::with_config(raw, &config)
    }

    #[test]
    fn test_put_requires_running() {
        let q = queue(4);
        assert!(matches!(q.put(&b"x".to_vec()), Err(QueueError::NotRunning)));
        let ch = MemoryChannel::new();
        assert!(!q.add_channel(ch));
        assert_eq!(q.state(), QueueState::Stopped);
    }

    #[test]
    fn test_broadcast_in_order() {
        let q = queue(16);
        q.start().unwrap();
        let a = MemoryChannel::new();
        let b = MemoryChannel::new();
        assert!(q.add_channel(a.clone()));
        assert!(q.add_channel(b.clone()));
        assert_eq!(q.number_of_channels(), 2);

        for i in 0..5u8 {
            q.put(&vec![i]).unwrap();
        }
        let expected: Vec<Vec<u8>> = (0..5u8).map(|i| vec![i]).collect();
        assert_eq!(a.wait_for(5, WAIT), expected);
        assert_eq!(b.wait_for(5, WAIT), expected);
        q.shutdown();
    }

    #[test]
    fn test_latch_replays_last() {
        let q = queue(1);
        q.set_latch_mode(true);
        q.start().unwrap();
        q.put(&b"A".to_vec()).unwrap();
        q.put(&b"B".to_vec()).unwrap();

        let ch = MemoryChannel::new();
        assert!(q.add_channel(ch.clone()));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(ch.received(), vec![b"B".to_vec()]);
        q.shutdown();
    }

    #[test]
    fn test_no_latch_no_replay() {
        let q = queue(4);
        q.start().unwrap();
        q.put(&b"A".to_vec()).unwrap();
        let ch = MemoryChannel::new();
        q.add_channel(ch.clone());
        std::thread::sleep(Duration::from_millis(50));
        assert!(ch.received().is_empty());

        q.put(&b"B".to_vec()).unwrap();
        assert_eq!(ch.wait_for(1, WAIT), vec![b"B".to_vec()]);
        q.shutdown();
    }

    #[test]
    fn test_limit() {
        let q = queue(8);
        assert_eq!(q.limit(), 8);
        q.set_limit(3);
        assert_eq!(q.limit(), 3);
    }

    #[test]
    fn test_shutdown_closes_channels_and_is_idempotent() {
        let q = queue(4);
        q.start().unwrap();
        let ch = MemoryChannel::new();
        q.add_channel(ch.clone());
        q.shutdown();
        q.shutdown();
        assert_eq!(q.state(), QueueState::Stopped);
        assert!(!ch.is_open());
        assert_eq!(q.number_of_channels(), 0);
        assert!(!q.add_channel(MemoryChannel::new()));
        assert!(q.put(&b"late".to_vec()).is_err());
    }

    #[test]
    fn test_failed_channel_removed() {
        let q = queue(4);
        q.start().unwrap();
        let bad = MemoryChannel::new();
        bad.fail_writes();
        let good = MemoryChannel::new();
        q.add_channel(bad.clone());
        q.add_channel(good.clone());
        q.put(&b"x".to_vec()).unwrap();
        good.wait_for(1, WAIT);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(q.number_of_channels(), 1);
        assert_eq!(q.metrics().write_failures, 1);
        q.shutdown();
    }

    /// Channel whose writes block until it is closed, like a peer that
    /// stopped reading with a full socket buffer.
    struct StalledChannel {
        id: u64,
        open: Mutex<bool>,
        released: parking_lot::Condvar,
        entered: crossbeam::channel::Sender<()>,
    }

    impl Channel for StalledChannel {
        fn id(&self) -> u64 {
            self.id
        }

        fn write(&self, _buffer: &[u8]) -> std::io::Result<()> {
            let _ = self.entered.send(());
            let mut open = self.open.lock();
            while *open {
                self.released.wait(&mut open);
            }
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn close(&self) {
            *self.open.lock() = false;
            self.released.notify_all();
        }

        fn is_open(&self) -> bool {
            *self.open.lock()
        }
    }

    #[test]
    fn test_shutdown_unblocks_stalled_channel() {
        let q = Arc::new(queue(4));
        q.start().unwrap();
        let (entered_tx, entered_rx) = crossbeam::channel::unbounded();
        let stalled = Arc::new(StalledChannel {
            id: crate::transport::next_channel_id(),
            open: Mutex::new(true),
            released: parking_lot::Condvar::new(),
            entered: entered_tx,
        });
        assert!(q.add_channel(stalled.clone()));
        q.put(&b"x".to_vec()).unwrap();
        entered_rx.recv_timeout(WAIT).expect("writer reached the channel");

        let (done_tx, done_rx) = crossbeam::channel::bounded(1);
        let q2 = Arc::clone(&q);
        std::thread::spawn(move || {
            q2.shutdown();
            let _ = done_tx.send(());
        });
        done_rx.recv_timeout(WAIT).expect("shutdown returned");
        assert_eq!(q.state(), QueueState::Stopped);
        assert!(!stalled.is_open());
    }

    #[test]
    fn test_put_after_ring_closed_is_rejected() {
        let q = queue(4);
        q.start().unwrap();
        // Ring closed while `running` is still set: the window a racing
        // `shutdown` opens.
        q.shared.queue.close();
        assert!(matches!(
            q.put_serialized(b"late".to_vec()),
            Err(QueueError::NotRunning)
        ));
        let metrics = q.metrics();
        assert_eq!(metrics.enqueued, 0);
        assert_eq!(metrics.evicted, 0);
        assert!(q.shared.sequencer.lock().latched.is_none());
        q.shutdown();
    }

    #[test]
    fn test_serialize_error() {
        let failing = |_: &u32| -> Result<Vec<u8>, WireError> { Err(WireError::LengthOverflow(0)) };
        let q: OutgoingMessageQueue<u32> = OutgoingMessageQueue::new(failing);
        q.start().unwrap();
        assert!(matches!(q.put(&1), Err(QueueError::Serialize(_))));
        q.shutdown();
    }
}
