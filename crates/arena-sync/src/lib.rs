//! Arena Sync -- client-side reconciliation for a server-authoritative arena.
//!
//! The match server owns the simulation. It pushes discrete events (spawn,
//! move, damage, kill, hand refresh, elixir, match end) and the client turns
//! them into a consistent local scene. This crate is that reconciliation
//! layer, with every side effect pushed out through collaborator traits so
//! the whole thing runs headless under test.
//!
//! # Architecture
//!
//! ```text
//!  transport thread(s)                  frame thread
//!  -------------------                  ------------
//!  push_raw(method, json)
//!    -> protocol::decode  --Inbound-->  Inbox (bounded)
//!                                         |
//!                                    FrameLoop::tick(dt)
//!                                         |
//!                                     Reconciler --> VisualFactory
//!                                      |  |  |   --> UiSink
//!                         EntityRegistry  |  HandReconciler --> ArtLoader
//!                                  TaskScheduler
//! ```
//!
//! - [`entity`] / [`registry`]: ids, handles, the id -> live entity map.
//! - [`notification`] / [`protocol`]: typed events and hub wire decoding.
//! - [`ports`]: collaborator traits.
//! - [`inbox`]: the bounded cross-thread queue.
//! - [`scheduler`]: per-entity move interpolation and hit flash tasks.
//! - [`hand`]: hand slots, play bookkeeping, art reveal rounds, elixir.
//! - [`reconciler`]: the core; [`input`] adds the play-card path.
//! - [`frame`]: the per-frame driver that owns everything for one match.
//! - [`config`], [`snapshot`], [`headless`].
//!
//! # Example
//!
//! ```
//! use arena_sync::prelude::*;
//! use serde_json::json;
//!
//! let session = MatchSession::new("session-1", "player-1");
//! let mut frame = FrameLoop::new(
//!     ClientConfig::default(),
//!     session,
//!     HeadlessScene::new(),
//!     HeadlessUi::default(),
//!     HeadlessArt::default(),
//! )
//! .unwrap();
//!
//! let tx = frame.sender();
//! tx.push_raw(
//!     "CardSpawned",
//!     &json!({"unitId": "u1", "cardPlayedId": "caveman", "x": 3, "y": 5,
//!             "health": 100, "maxHealth": 100}),
//! )
//! .unwrap();
//!
//! frame.tick(1.0 / 60.0);
//! assert!(frame.reconciler().get("u1").is_some());
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod entity;
pub mod frame;
pub mod hand;
pub mod headless;
pub mod inbox;
pub mod input;
pub mod notification;
pub mod ports;
pub mod protocol;
pub mod reconciler;
pub mod registry;
pub mod scheduler;
pub mod snapshot;

use std::path::PathBuf;

use arena_spatial::SpatialError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from decoding hub payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown hub method '{0}'")]
    UnknownMethod(String),

    #[error("empty payload for '{method}'")]
    EmptyPayload { method: String },

    #[error("malformed payload for '{method}': {source}")]
    Malformed {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{method}' carried a non-numeric value: {value}")]
    InvalidNumber { method: String, value: String },
}

/// Errors from loading or validating [`ClientConfig`](config::ClientConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

/// Errors from pushing into the [`Inbox`](inbox::Inbox).
#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    /// The queue is at capacity (only from non-blocking sends).
    #[error("inbox is full")]
    Full,

    /// The frame loop that owned the inbox has been dropped.
    #[error("inbox is closed")]
    Closed,

    #[error(transparent)]
    Malformed(#[from] ProtocolError),
}

/// Errors reported by a [`Transport`](ports::Transport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("not connected")]
    Disconnected,

    #[error("call rejected: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{ClientConfig, TimingConfig};
    pub use crate::entity::{EntityId, HealthBarHandle, LiveEntity, VisualHandle};
    pub use crate::frame::{FrameDiagnostics, FrameLoop};
    pub use crate::hand::{ElixirGauge, HandReconciler};
    pub use crate::headless::{HeadlessArt, HeadlessScene, HeadlessUi, RecordingTransport};
    pub use crate::inbox::{Inbound, Inbox, InboxSender};
    pub use crate::input::{PlayRejected, PlayRequest};
    pub use crate::notification::Notification;
    pub use crate::ports::{ArtLoader, Tint, Transport, UiSink, VisualFactory};
    pub use crate::protocol::OutboundCall;
    pub use crate::reconciler::{MatchSession, Reconciler, RegisterOutcome};
    pub use crate::snapshot::RegistrySnapshot;
    pub use crate::{ConfigError, InboxError, ProtocolError, TransportError};
    pub use arena_spatial::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_wraps_spatial_error() {
        let err: ConfigError = SpatialError::DegenerateGrid { rows: 0, cols: 0 }.into();
        assert!(matches!(err, ConfigError::Spatial(_)));
        assert!(err.to_string().contains("0x0"));
    }

    #[test]
    fn inbox_error_wraps_protocol_error() {
        let err: InboxError = ProtocolError::UnknownMethod("Nope".into()).into();
        assert_eq!(err.to_string(), "unknown hub method 'Nope'");
    }
}
