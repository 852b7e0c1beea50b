// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded FIFO with drop-oldest overflow.
//!
//! ```text
//!   head                 head + len
//!    v                       v
//! [  A  |  B  |  C  |  -  |  -  ]   limit = 5
//! ```
//!
//! `put` never blocks: when `len == limit` the slot at `head` is overwritten
//! and `head` advances. `take` blocks on a condvar until a slot is filled or
//! the queue is closed.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

struct Ring<T> {
    slots: Vec<Option<T>>,
    head: usize,
    len: usize,
    closed: bool,
}

impl<T> Ring<T> {
    fn with_limit(limit: usize) -> Self {
        let mut slots = Vec::with_capacity(limit);
        slots.resize_with(limit, || None);
        Self {
            slots,
            head: 0,
            len: 0,
            closed: false,
        }
    }

    fn limit(&self) -> usize {
        self.slots.len()
    }

    fn push(&mut self, item: T) -> Option<T> {
        let limit = self.limit();
        if self.len == limit {
            let evicted = self.slots[self.head].replace(item);
            self.head = (self.head + 1) % limit;
            evicted
        } else {
            let tail = (self.head + self.len) % limit;
            self.slots[tail] = Some(item);
            self.len += 1;
            None
        }
    }

    fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.limit();
        self.len -= 1;
        item
    }
}

/// Fixed-capacity queue where producers never wait.
pub struct CircularBlockingQueue<T> {
    ring: Mutex<Ring<T>>,
    not_empty: Condvar,
}

impl<T> CircularBlockingQueue<T> {
    /// Create a queue holding at most `limit` items (minimum 1).
    pub fn new(limit: usize) -> Self {
        Self {
            ring: Mutex::new(Ring::with_limit(limit.max(1))),
            not_empty: Condvar::new(),
        }
    }

    /// Append `item`, returning the evicted oldest item when full.
    ///
    /// Items put after `close` are dropped and returned.
    pub fn put(&self, item: T) -> Option<T> {
        self.offer(item).unwrap_or_else(Some)
    }

    /// Like [`put`](Self::put) but hands `item` back as `Err` when closed.
    pub fn offer(&self, item: T) -> Result<Option<T>, T> {
        let mut ring = self.ring.lock();
        if ring.closed {
            return Err(item);
        }
        let evicted = ring.push(item);
        drop(ring);
        self.not_empty.notify_one();
        Ok(evicted)
    }

    /// Block until an item is available. Returns `None` once closed.
    pub fn take(&self) -> Option<T> {
        let mut ring = self.ring.lock();
        loop {
            if ring.closed {
                return None;
            }
            if let Some(item) = ring.pop() {
                return Some(item);
            }
            self.not_empty.wait(&mut ring);
        }
    }

    /// Like [`take`](Self::take) but gives up after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut ring = self.ring.lock();
        loop {
            if ring.closed {
                return None;
            }
            if let Some(item) = ring.pop() {
                return Some(item);
            }
            if self.not_empty.wait_until(&mut ring, deadline).timed_out() {
                return if ring.closed { None } else { ring.pop() };
            }
        }
    }

    pub fn try_take(&self) -> Option<T> {
        let mut ring = self.ring.lock();
        if ring.closed {
            return None;
        }
        ring.pop()
    }

    /// Wake every waiter; later `take`s return `None`.
    pub fn close(&self) {
        self.ring.lock().closed = true;
        self.not_empty.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.ring.lock().closed
    }

    /// Reopen after `close`, discarding anything still queued.
    pub fn reopen(&self) {
        let mut ring = self.ring.lock();
        let limit = ring.limit();
        *ring = Ring::with_limit(limit);
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn limit(&self) -> usize {
        self.ring.lock().limit()
    }

    /// Change capacity, keeping the newest items. Returns how many were evicted.
    pub fn set_limit(&self, limit: usize) -> usize {
        let limit = limit.max(1);
        let mut ring = self.ring.lock();
        if ring.limit() == limit {
            return 0;
        }
        let mut next = Ring::with_limit(limit);
        next.closed = ring.closed;
        let mut evicted = 0;
        while let Some(item) = ring.pop() {
            if next.push(item).is_some() {
                evicted += 1;
            }
        }
        *ring = next;
        evicted
    }
}

impl<T> std::fmt::Debug for CircularBlockingQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ring = self.ring.lock();
        f.debug_struct("CircularBlockingQueue")
            .field("len", &ring.len)
            .field("limit", &ring.limit())
            .field("closed", &ring.closed)
            .finish()
    }
}
