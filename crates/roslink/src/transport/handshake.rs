// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TCPROS connection header and handshake.
//!
//! ```text
//! +------------------+------------------+-----------------+-----
//! | total len (u32)  | field len (u32)  | "key=value"     | ...
//! +------------------+------------------+-----------------+-----
//! ```
//!
//! All lengths are little-endian. The subscriber (connecting side) writes its
//! header first; the publisher validates the type checksum and answers with
//! its own header, or with a single `error=` field before closing.

use super::HandshakeError;
use crate::schema::{MessageSchema, ServiceSchema};
use std::io::{Read, Write};

pub const CALLER_ID: &str = "callerid";
pub const TOPIC: &str = "topic";
pub const SERVICE: &str = "service";
pub const TYPE: &str = "type";
pub const MD5SUM: &str = "md5sum";
pub const MESSAGE_DEFINITION: &str = "message_definition";
pub const LATCHING: &str = "latching";
pub const TCP_NODELAY: &str = "tcp_nodelay";
pub const ERROR: &str = "error";

/// Checksum value that matches any type.
pub const MD5_WILDCARD: &str = "*";

/// Largest header accepted from a peer.
pub const MAX_HEADER_SIZE: usize = 1024 * 1024;

/// Ordered key/value header exchanged once per connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionHeader {
    fields: Vec<(String, String)>,
}

impl ConnectionHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header a subscriber or publisher sends for `topic`.
    pub fn for_topic(caller_id: &str, topic: &str, schema: &MessageSchema) -> Result<Self, HandshakeError> {
        let md5 = schema.md5sum().map_err(HandshakeError::Schema)?;
        Ok(Self::new()
            .with(CALLER_ID, caller_id)
            .with(TOPIC, topic)
            .with(TYPE, schema.type_name())
            .with(MD5SUM, md5)
            .with(MESSAGE_DEFINITION, schema.definition()))
    }

    /// Header a service client or server sends for `service`.
    pub fn for_service(caller_id: &str, service: &str, schema: &ServiceSchema) -> Result<Self, HandshakeError> {
        let md5 = schema.md5sum().map_err(HandshakeError::Schema)?;
        Ok(Self::new()
            .with(CALLER_ID, caller_id)
            .with(SERVICE, service)
            .with(TYPE, schema.type_name.as_str())
            .with(MD5SUM, md5))
    }

    /// Header sent by a publisher that refuses the connection.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new().with(ERROR, message)
    }

    /// Set `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn require(&self, key: &'static str) -> Result<&str, HandshakeError> {
        self.get(key).ok_or(HandshakeError::MissingField(key))
    }

    /// Encode with the leading total-length prefix.
    pub fn encode(&self) -> Result<Vec<u8>, HandshakeError> {
        let mut body = Vec::new();
        for (key, value) in &self.fields {
            let len = u32::try_from(key.len() + 1 + value.len())
                .map_err(|_| HandshakeError::Malformed(format!("field `{}` too long", key)))?;
            body.extend_from_slice(&len.to_le_bytes());
            body.extend_from_slice(key.as_bytes());
            body.push(b'=');
            body.extend_from_slice(value.as_bytes());
        }
        let total = u32::try_from(body.len())
            .map_err(|_| HandshakeError::Malformed("header too long".to_string()))?;
        let mut out = Vec::with_capacity(4 + body.len());
        out.extend_from_slice(&total.to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode a header body (without the total-length prefix).
    pub fn decode(body: &[u8]) -> Result<Self, HandshakeError> {
        let mut header = Self::new();
        let mut offset = 0;
        while offset < body.len() {
            let Some(len_bytes) = body.get(offset..offset + 4) else {
                return Err(HandshakeError::Malformed(format!(
                    "truncated field length at offset {}",
                    offset
                )));
            };
            let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
            offset += 4;
            let field = body
                .get(offset..offset.saturating_add(len))
                .ok_or_else(|| HandshakeError::Malformed(format!("truncated field at offset {}", offset)))?;
            offset += len;
            let text = std::str::from_utf8(field)
                .map_err(|_| HandshakeError::Malformed("field is not UTF-8".to_string()))?;
            let (key, value) = text
                .split_once('=')
                .ok_or_else(|| HandshakeError::Malformed(format!("field `{}` has no `=`", text)))?;
            header.insert(key, value);
        }
        Ok(header)
    }

    /// Read one length-prefixed header from a stream.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self, HandshakeError> {
        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_HEADER_SIZE {
            return Err(HandshakeError::Malformed(format!(
                "header too large: {} bytes (max {})",
                len, MAX_HEADER_SIZE
            )));
        }
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body)?;
        Self::decode(&body)
    }

    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), HandshakeError> {
        writer.write_all(&self.encode()?)?;
        writer.flush()?;
        Ok(())
    }
}

/// Check a peer's header against the local one.
///
/// Fails with `Rejected` when the peer sent `error=`, and with
/// `IncompatibleType` when neither checksum is the wildcard and they differ.
pub fn validate_peer(local: &ConnectionHeader, peer: &ConnectionHeader) -> Result<(), HandshakeError> {
    if let Some(message) = peer.get(ERROR) {
        return Err(HandshakeError::Rejected(message.to_string()));
    }
    let local_md5 = local.require(MD5SUM)?;
    let peer_md5 = peer.require(MD5SUM)?;
    if local_md5 != MD5_WILDCARD && peer_md5 != MD5_WILDCARD && local_md5 != peer_md5 {
        return Err(HandshakeError::IncompatibleType {
            expected_type: local.get(TYPE).unwrap_or_default().to_string(),
            expected_md5: local_md5.to_string(),
            got_type: peer.get(TYPE).unwrap_or_default().to_string(),
            got_md5: peer_md5.to_string(),
        });
    }
    Ok(())
}

/// Accepting (publisher/server) side: read, validate, answer.
///
/// On failure an `error=` header is written back before returning.
pub fn accept<S: Read + Write + ?Sized>(
    stream: &mut S,
    local: &ConnectionHeader,
) -> Result<ConnectionHeader, HandshakeError> {
    let peer = ConnectionHeader::read_from(stream)?;
    if let Err(e) = validate_peer(local, &peer) {
        log::warn!(
            "[Handshake] rejecting {}: {}",
            peer.get(CALLER_ID).unwrap_or("<unknown>"),
            e
        );
        let _ = ConnectionHeader::error(e.to_string()).write_to(stream);
        return Err(e);
    }
    local.write_to(stream)?;
    log::debug!(
        "[Handshake] accepted {} for {}",
        peer.get(CALLER_ID).unwrap_or("<unknown>"),
        local.get(TOPIC).or_else(|| local.get(SERVICE)).unwrap_or_default()
    );
    Ok(peer)
}

/// Connecting (subscriber/client) side: send, then read and validate the answer.
pub fn connect<S: Read + Write + ?Sized>(
    stream: &mut S,
    local: &ConnectionHeader,
) -> Result<ConnectionHeader, HandshakeError> {
    local.write_to(stream)?;
    let peer = ConnectionHeader::read_from(stream)?;
    if let Err(e) = validate_peer(local, &peer) {
        log::warn!("[Handshake] connection refused: {}", e);
        return Err(e);
    }
    Ok(peer)
}
