// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport configuration.
//!
//! Defaults match the stock ROS client: an 8192-slot outgoing queue, no
//! latching, Nagle disabled. With the `config-loaders` feature a
//! configuration can be read from YAML:
//!
//! ```yaml
//! # transport.yaml
//! caller_id: /talker
//! queue_capacity: 16
//! latch: true
//! max_frame_size: 1048576
//! ```

use std::fmt;

/// Outgoing queue capacity used by ROS publishers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

/// Default maximum payload size of one TCPROS frame (16 MB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Upper bound accepted for `max_frame_size` (1 GB).
pub const MAX_FRAME_SIZE_LIMIT: usize = 1024 * 1024 * 1024;

/// Errors raised while loading or validating a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io(std::io::Error),
    /// The document is not valid YAML for this structure.
    Parse(String),
    /// A value is out of range.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config: {}", e),
            Self::Parse(msg) => write!(f, "failed to parse config: {}", msg),
            Self::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Settings shared by publishers and subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-loaders", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-loaders", serde(default, deny_unknown_fields))]
pub struct TransportConfig {
    /// Caller identity advertised in connection headers.
    pub caller_id: String,

    /// Outgoing queue slots; the oldest buffer is dropped when full.
    pub queue_capacity: usize,

    /// Replay the last published buffer to late subscribers.
    pub latch: bool,

    /// Largest accepted frame payload in bytes (anti-OOM protection).
    pub max_frame_size: usize,

    /// Disable Nagle's algorithm on TCP connections.
    pub tcp_nodelay: bool,

    /// Enable TCP keep-alive probes.
    pub tcp_keepalive: bool,

    /// Name given to each outgoing queue's writer thread.
    pub writer_thread_name: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            caller_id: "/roslink".to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            latch: false,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            tcp_nodelay: true,
            tcp_keepalive: true,
            writer_thread_name: "roslink-writer".to_string(),
        }
    }
}

impl TransportConfig {
    pub fn with_caller_id(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = caller_id.into();
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_latch(mut self, latch: bool) -> Self {
        self.latch = latch;
        self
    }

    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = nodelay;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be > 0"));
        }
        if self.max_frame_size == 0 {
            return Err(ConfigError::Invalid("max_frame_size must be > 0"));
        }
        if self.max_frame_size > MAX_FRAME_SIZE_LIMIT {
            return Err(ConfigError::Invalid("max_frame_size too large (> 1 GB)"));
        }
        if self.caller_id.is_empty() {
            return Err(ConfigError::Invalid("caller_id must not be empty"));
        }
        Ok(())
    }

    /// Parse and validate a YAML document.
    #[cfg(feature = "config-loaders")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    #[cfg(feature = "config-loaders")]
    pub fn load_yaml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        log::debug!("[TransportConfig] loading {}", path.as_ref().display());
        Self::from_yaml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.queue_capacity, 8192);
        assert!(!config.latch);
        assert_eq!(config.max_frame_size, 16 * 1024 * 1024);
        assert!(config.tcp_nodelay);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(TransportConfig::default()
            .with_queue_capacity(0)
            .validate()
            .is_err());
        assert!(TransportConfig::default()
            .with_max_frame_size(0)
            .validate()
            .is_err());
        assert!(TransportConfig::default()
            .with_caller_id("")
            .validate()
            .is_err());
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_from_yaml_str() {
        let config = TransportConfig::from_yaml_str("caller_id: /talker\nqueue_capacity: 16\nlatch: true\n")
            .expect("valid yaml");
        assert_eq!(config.caller_id, "/talker");
        assert_eq!(config.queue_capacity, 16);
        assert!(config.latch);
        assert_eq!(config.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_yaml_rejects_unknown_and_invalid() {
        assert!(matches!(
            TransportConfig::from_yaml_str("queue_size: 3\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            TransportConfig::from_yaml_str("queue_capacity: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_load_yaml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("transport.yaml");
        std::fs::write(&path, "latch: true\ntcp_nodelay: false\n").expect("write");
        let config = TransportConfig::load_yaml(&path).expect("load");
        assert!(config.latch);
        assert!(!config.tcp_nodelay);

        assert!(matches!(
            TransportConfig::load_yaml(dir.path().join("missing.yaml")),
            Err(ConfigError::Io(_))
        ));
    }
}
