// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TCPROS plumbing: framing, TCP channels and connection setup.
//!
//! After the handshake every message travels as
//!
//! ```text
//! +-----------------+------------------+
//! | length (u32 LE) | serialized msg   |
//! +-----------------+------------------+
//! ```

use super::channel::{next_channel_id, Channel};
use super::handshake::{self, ConnectionHeader, LATCHING, TCP_NODELAY};
use super::incoming::IncomingMessageQueue;
use super::outgoing::OutgoingMessageQueue;
use super::QueueError;
use crate::config::TransportConfig;
use crate::Result;
use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Frame header size (4 bytes for length).
pub const FRAME_HEADER_SIZE: usize = 4;

/// Prefix `payload` with its little-endian length.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

pub fn write_frame<W: Write + ?Sized>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame exceeds u32 length"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Read one frame. Returns `Ok(None)` on a clean EOF at a frame boundary.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R, max_size: usize) -> io::Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; FRAME_HEADER_SIZE];
    let mut filled = 0;
    while filled < FRAME_HEADER_SIZE {
        match reader.read(&mut len_bytes[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "incomplete frame header",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > max_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {} bytes (max {})", len, max_size),
        ));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Apply nodelay/keepalive settings to a connected stream.
pub fn configure_stream(stream: &TcpStream, config: &TransportConfig) -> io::Result<()> {
    let socket = socket2::SockRef::from(stream);
    socket.set_nodelay(config.tcp_nodelay)?;
    socket.set_keepalive(config.tcp_keepalive)?;
    Ok(())
}

/// Bind a blocking listener with `SO_REUSEADDR`.
pub fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        socket2::Domain::IPV4
    } else {
        socket2::Domain::IPV6
    };
    let socket = socket2::Socket::new(domain, socket2::Type::STREAM, Some(socket2::Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    Ok(socket.into())
}

/// Framed TCP connection usable as a broadcast [`Channel`].
#[derive(Debug)]
pub struct TcpChannel {
    id: u64,
    peer: String,
    stream: Mutex<TcpStream>,
    // Second handle on the socket so `close` never waits behind a blocked write.
    control: TcpStream,
    open: AtomicBool,
}

impl TcpChannel {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        let control = stream.try_clone()?;
        Ok(Self {
            id: next_channel_id(),
            peer,
            stream: Mutex::new(stream),
            control,
            open: AtomicBool::new(true),
        })
    }
}

impl Channel for TcpChannel {
    fn id(&self) -> u64 {
        self.id
    }

    fn write(&self, buffer: &[u8]) -> io::Result<()> {
        if !self.is_open() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "channel closed"));
        }
        write_frame(&mut *self.stream.lock(), buffer)
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            let _ = self.control.shutdown(Shutdown::Both);
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }
}

/// Publisher side of a new connection: handshake, then join the queue's channels.
///
/// The reply header advertises the queue's latch mode. Returns the
/// subscriber's header.
pub fn publisher_accept<T>(
    mut stream: TcpStream,
    queue: &OutgoingMessageQueue<T>,
    local: &ConnectionHeader,
    config: &TransportConfig,
) -> Result<ConnectionHeader> {
    configure_stream(&stream, config)?;
    let reply = local
        .clone()
        .with(LATCHING, if queue.is_latch_mode() { "1" } else { "0" });
    let peer = match handshake::accept(&mut stream, &reply) {
        Ok(peer) => peer,
        Err(e) => {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(e.into());
        }
    };
    if peer.get(TCP_NODELAY) == Some("1") {
        stream.set_nodelay(true)?;
    }
    let channel = Arc::new(TcpChannel::new(stream)?);
    if !queue.add_channel(channel.clone()) {
        channel.close();
        return Err(QueueError::NotRunning.into());
    }
    Ok(peer)
}

/// Live subscriber connection feeding an [`IncomingMessageQueue`].
#[derive(Debug)]
pub struct Subscription {
    peer: ConnectionHeader,
    stream: TcpStream,
    malformed: Arc<AtomicU64>,
    receiver: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Header the publisher answered with.
    pub fn peer_header(&self) -> &ConnectionHeader {
        &self.peer
    }

    /// Payloads the publisher sent that failed to decode.
    pub fn malformed_count(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.receiver.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Close the connection and wait for the receiver thread.
    pub fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                log::warn!("[Subscription] receiver thread panicked");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Subscriber side: connect, handshake, then start a receiver thread.
pub fn subscriber_connect<T, A>(
    addr: A,
    local: &ConnectionHeader,
    queue: Arc<IncomingMessageQueue<T>>,
    config: &TransportConfig,
) -> Result<Subscription>
where
    T: Send + 'static,
    A: ToSocketAddrs,
{
    let mut stream = TcpStream::connect(addr)?;
    configure_stream(&stream, config)?;
    let local = local
        .clone()
        .with(TCP_NODELAY, if config.tcp_nodelay { "1" } else { "0" });
    let peer = match handshake::connect(&mut stream, &local) {
        Ok(peer) => peer,
        Err(e) => {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(e.into());
        }
    };

    let reader = stream.try_clone()?;
    let malformed = Arc::new(AtomicU64::new(0));
    let max_frame_size = config.max_frame_size;
    let counter = malformed.clone();
    let name = format!("roslink-recv-{}", peer.get(handshake::CALLER_ID).unwrap_or("peer"));
    let receiver = thread::Builder::new()
        .name(name)
        .spawn(move || receive_loop(reader, &queue, max_frame_size, &counter))?;

    Ok(Subscription {
        peer,
        stream,
        malformed,
        receiver: Some(receiver),
    })
}

fn receive_loop<T>(mut stream: TcpStream, queue: &IncomingMessageQueue<T>, max_frame_size: usize, malformed: &AtomicU64) {
    loop {
        match read_frame(&mut stream, max_frame_size) {
            Ok(Some(payload)) => {
                if queue.deliver(&payload).is_err() {
                    malformed.fetch_add(1, Ordering::Relaxed);
                }
            }
            Ok(None) => {
                log::debug!("[Subscription] publisher closed the connection");
                break;
            }
            Err(e) => {
                log::debug!("[Subscription] receive failed: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_frame_roundtrip() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello").unwrap();
        assert_eq!(buf, encode_frame(b"hello"));
        assert_eq!(&buf[..4], &[5, 0, 0, 0]);

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor, 1024).unwrap(), Some(b"hello".to_vec()));
        assert_eq!(read_frame(&mut cursor, 1024).unwrap(), None);
    }

    #[test]
    fn test_frame_too_large() {
        let mut cursor = Cursor::new(encode_frame(&[0u8; 64]));
        let err = read_frame(&mut cursor, 16).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_close_unblocks_pending_write() {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        // Peer that never reads.
        let _peer = TcpStream::connect(addr).unwrap();
        let (stream, _) = listener.accept().unwrap();
        let channel = Arc::new(TcpChannel::new(stream).unwrap());

        let (done_tx, done_rx) = crossbeam::channel::bounded(1);
        let writer = Arc::clone(&channel);
        thread::spawn(move || {
            let chunk = vec![0u8; 1 << 20];
            let result = loop {
                if let Err(e) = writer.write(&chunk) {
                    break e;
                }
            };
            let _ = done_tx.send(result.kind());
        });

        thread::sleep(std::time::Duration::from_millis(100));
        channel.close();
        assert!(!channel.is_open());
        done_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("blocked write returned after close");
    }

    #[test]
    fn test_truncated_frame() {
        let mut cursor = Cursor::new(vec![5, 0]);
        assert_eq!(
            read_frame(&mut cursor, 1024).unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );

        let mut cursor = Cursor::new(vec![5, 0, 0, 0, b'a']);
        assert_eq!(
            read_frame(&mut cursor, 1024).unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }
}
