//! Entity identifiers, visual handles and the live-entity record.
//!
//! An [`EntityId`] is the server-assigned key (usually a UUID string) that
//! names a unit or tower for its whole life. It is the only key used by
//! move/damage/kill notifications.
//!
//! [`VisualHandle`] and [`HealthBarHandle`] are opaque tokens minted by the
//! [`VisualFactory`](crate::ports::VisualFactory). The registry owns them
//! exclusively and hands each one back to the factory exactly once for
//! destruction.

use std::borrow::Borrow;
use std::fmt;

use arena_spatial::calibration::GridCell;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Server-assigned entity key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty ids come from malformed payloads and are never registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Opaque reference to an instantiated visual object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisualHandle(pub u64);

/// Opaque reference to a health-bar widget parented under a visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HealthBarHandle(pub u64);

// ---------------------------------------------------------------------------
// LiveEntity
// ---------------------------------------------------------------------------

/// One currently spawned entity.
///
/// `health_fraction` is display state only. The server decides when an
/// entity dies; the client never derives a kill from it.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveEntity {
    pub id: EntityId,
    pub type_id: String,
    /// Cell reported by the spawn notification.
    pub spawn_cell: GridCell,
    pub visual: VisualHandle,
    pub health_bar: Option<HealthBarHandle>,
    /// Last value pushed to the health bar, in `[0, 1]`.
    pub health_fraction: f32,
    /// Current world transform as last pushed to the visual.
    pub position: Vec3,
    pub rotation: Quat,
}

/// `health / max_health` clamped to `[0, 1]`; zero when `max_health <= 0`.
pub fn health_fraction(health: i32, max_health: i32) -> f32 {
    if max_health <= 0 {
        return 0.0;
    }
    (health as f32 / max_health as f32).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
