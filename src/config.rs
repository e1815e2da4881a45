//! Session configuration.
//!
//! Every setting has a default; a JSON document only needs to name the
//! settings it overrides. Durations are given in milliseconds.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use punck_link::config::SessionConfig;
//!
//! let json = r#"{ "auto_update": true, "poll": { "playing_ms": 250 } }"#;
//! let config = SessionConfig::from_json_str(json).unwrap();
//! assert!(config.auto_update);
//! assert_eq!(config.poll.playing, Duration::from_millis(250));
//! assert_eq!(config.poll.stopped, Duration::from_millis(1500));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::DEFAULT_MAX_FRAME_LEN;

/// Status poll interval while the device is playing.
pub const DEFAULT_PLAYING_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Status poll interval while the device is stopped.
pub const DEFAULT_STOPPED_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Delay before the first status poll after a start/stop toggle.
pub const DEFAULT_START_STOP_POLL_DELAY: Duration = Duration::from_millis(100);

/// Default read buffer size for the inbound stream.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4 * 1024;

/// Default capacity of the editor command queue and the writer queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Status poll timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollIntervals {
    #[serde(rename = "playing_ms", with = "duration_ms")]
    pub playing: Duration,
    #[serde(rename = "stopped_ms", with = "duration_ms")]
    pub stopped: Duration,
    #[serde(rename = "start_stop_ms", with = "duration_ms")]
    pub start_stop: Duration,
}

impl PollIntervals {
    /// Interval for the next poll given the last known transport state.
    #[inline]
    pub fn next(&self, playing: bool) -> Duration {
        if playing {
            self.playing
        } else {
            self.stopped
        }
    }
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            playing: DEFAULT_PLAYING_POLL_INTERVAL,
            stopped: DEFAULT_STOPPED_POLL_INTERVAL,
            start_stop: DEFAULT_START_STOP_POLL_DELAY,
        }
    }
}

/// Configuration of a [`Session`](crate::session::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub poll: PollIntervals,
    /// Start periodic status polling on connect.
    pub auto_update: bool,
    /// Size of the inbound read buffer.
    pub read_buffer_size: usize,
    /// Capacity of the command and writer queues.
    pub channel_capacity: usize,
    /// Largest accepted inbound frame, markers included.
    pub max_frame_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll: PollIntervals::default(),
            auto_update: false,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.poll.playing, DEFAULT_PLAYING_POLL_INTERVAL);
        assert_eq!(config.poll.stopped, DEFAULT_STOPPED_POLL_INTERVAL);
        assert_eq!(config.poll.start_stop, DEFAULT_START_STOP_POLL_DELAY);
        assert!(!config.auto_update);
        assert_eq!(config.max_frame_len, DEFAULT_MAX_FRAME_LEN);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(SessionConfig::from_json_str("{}").unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config =
            SessionConfig::from_json_str(r#"{"channel_capacity": 8, "poll": {"stopped_ms": 2000}}"#)
                .unwrap();
        assert_eq!(config.channel_capacity, 8);
        assert_eq!(config.poll.stopped, Duration::from_secs(2));
        assert_eq!(config.poll.playing, DEFAULT_PLAYING_POLL_INTERVAL);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = SessionConfig::default();
        config.auto_update = true;
        config.poll.start_stop = Duration::from_millis(50);

        let json = config.to_json_string().unwrap();
        assert!(json.contains("\"start_stop_ms\": 50"));
        assert_eq!(SessionConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_json() {
        assert!(SessionConfig::from_json_str(r#"{"auto_update": "yes"}"#).is_err());
    }

    #[test]
    fn test_next_interval() {
        let poll = PollIntervals::default();
        assert_eq!(poll.next(true), Duration::from_millis(300));
        assert_eq!(poll.next(false), Duration::from_millis(1500));
    }
}
