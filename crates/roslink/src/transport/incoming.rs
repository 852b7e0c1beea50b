// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscriber-side message queue.
//!
//! Connections call [`IncomingMessageQueue::deliver`] with one complete
//! payload at a time; local consumers block in [`IncomingMessageQueue::take`].
//! A payload that fails to decode is dropped and the error is returned to the
//! delivering connection; the queue itself is left untouched.

use crate::wire::{MessageDeserializer, WireError};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// FIFO of decoded messages bound to one expected type.
pub struct IncomingMessageQueue<T> {
    deserializer: Box<dyn MessageDeserializer<T>>,
    sender: Mutex<Option<Sender<T>>>,
    receiver: Receiver<T>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl<T> IncomingMessageQueue<T> {
    pub fn new(deserializer: impl MessageDeserializer<T> + 'static) -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            deserializer: Box::new(deserializer),
            sender: Mutex::new(Some(sender)),
            receiver,
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Decode one payload and append it.
    ///
    /// Malformed payloads are counted, logged and reported back; nothing is queued.
    pub fn deliver(&self, payload: &[u8]) -> Result<(), WireError> {
        let message = match self.deserializer.deserialize(payload) {
            Ok(message) => message,
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "[IncomingQueue] dropped malformed payload ({} bytes): {}",
                    payload.len(),
                    e
                );
                return Err(e);
            }
        };
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(tx) if tx.send(message).is_ok() => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("[IncomingQueue] closed, payload discarded");
            }
        }
        Ok(())
    }

    /// Block until a message is available. Returns `None` once closed and drained.
    pub fn take(&self) -> Option<T> {
        self.receiver.recv().ok()
    }

    pub fn try_take(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Stop accepting payloads; queued messages can still be taken.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Messages successfully queued so far.
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Payloads discarded (malformed or after close).
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T> std::fmt::Debug for IncomingMessageQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingMessageQueue")
            .field("len", &self.len())
            .field("delivered", &self.delivered_count())
            .field("dropped", &self.dropped_count())
            .finish()
    }
}
