//! # punck-link
//!
//! SysEx codec and sync engine for editing a Punck drum module over MIDI.
//!
//! The module exposes its state as a set of resources (sample banks,
//! sequence bars, voice parameters, calibration, reverb) that a host can
//! fetch and overwrite. This crate keeps a local [`model::DeviceModel`]
//! mirror of those resources and converges it with the device.
//!
//! ## Architecture
//!
//! - **Codec** ([`codec`], [`protocol`]): framing and the direct and
//!   nibble-packed payload encodings
//! - **Schemas** ([`params`], [`catalog`]): typed parameter blocks and the
//!   static resource catalog
//! - **Sync** ([`sync`]): a one-request-in-flight state machine that pulls
//!   resources and returns the frames to send as effects
//! - **Publishing** ([`publish`], [`export`]): local edits pushed as whole
//!   resources, and sequence files
//! - **Session** ([`session`]): a tokio task wiring the above to a MIDI
//!   byte stream
//!
//! ## Example
//!
//! ```
//! use punck_link::catalog::ResourceCatalog;
//! use punck_link::protocol::Command;
//! use punck_link::sync::{sent_frames, SyncSequencer};
//!
//! let mut sync = SyncSequencer::new(&ResourceCatalog::PUNCK);
//! let frames = sent_frames(&sync.connect());
//! assert_eq!(&frames[0][..], &[0xF0, Command::GetSamples as u8, 0, 0xF7]);
//! ```

pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod params;
pub mod protocol;
pub mod publish;
pub mod session;
pub mod sync;
pub mod writer;

pub use catalog::{ResourceCatalog, Voice};
pub use config::SessionConfig;
pub use error::{PunckError, Result};
pub use session::{Edit, Session, SessionBuilder, SessionHandle};
pub use sync::{SyncEvent, SyncSequencer};
