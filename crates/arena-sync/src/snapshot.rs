//! Registry snapshots with BLAKE3 hashing.
//!
//! [`RegistrySnapshot`] is a serializable, id-ordered view of every live
//! entity plus the retired-id set, with a BLAKE3 digest over the serialized
//! state. Two snapshots with equal hashes describe the same observable
//! registry, which is how tests assert that an ignored event changed nothing.
//!
//! ```
//! use arena_sync::prelude::*;
//!
//! let mut rec = Reconciler::new(
//!     &ClientConfig::default(),
//!     MatchSession::new("s", "me"),
//!     HeadlessScene::new(),
//!     HeadlessUi::default(),
//!     HeadlessArt::default(),
//! )
//! .unwrap();
//! rec.register("u1", "caveman", GridCell::new(2, 2), 10, Some(10));
//!
//! let before = rec.snapshot();
//! rec.apply_damage("nobody", 1, 10);
//! assert_eq!(rec.snapshot().hash, before.hash);
//! assert_eq!(before.hash.len(), 64);
//! ```

use arena_spatial::calibration::GridCell;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, HealthBarHandle, LiveEntity, VisualHandle};
use crate::ports::{ArtLoader, UiSink, VisualFactory};
use crate::reconciler::Reconciler;
use crate::registry::EntityRegistry;

// ---------------------------------------------------------------------------
// EntitySnapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub type_id: String,
    pub spawn_cell: GridCell,
    pub visual: VisualHandle,
    pub health_bar: Option<HealthBarHandle>,
    pub health_fraction: f32,
    pub position: Vec3,
    pub rotation: Quat,
}

impl From<&LiveEntity> for EntitySnapshot {
    fn from(e: &LiveEntity) -> Self {
        Self {
            id: e.id.clone(),
            type_id: e.type_id.clone(),
            spawn_cell: e.spawn_cell,
            visual: e.visual,
            health_bar: e.health_bar,
            health_fraction: e.health_fraction,
            position: e.position,
            rotation: e.rotation,
        }
    }
}

// ---------------------------------------------------------------------------
// RegistrySnapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Live entities in id order.
    pub entities: Vec<EntitySnapshot>,
    /// Retired ids in order.
    pub retired: Vec<EntityId>,
    /// BLAKE3 hex digest of `entities` and `retired`.
    pub hash: String,
}

fn compute_hash(entities: &[EntitySnapshot], retired: &[EntityId]) -> String {
    #[derive(Serialize)]
    struct HashableState<'a> {
        entities: &'a [EntitySnapshot],
        retired: &'a [EntityId],
    }

    // Plain structs with string keys; serialization cannot fail.
    let bytes = serde_json::to_vec(&HashableState { entities, retired }).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

impl RegistrySnapshot {
    pub fn capture(registry: &EntityRegistry) -> Self {
        let entities: Vec<EntitySnapshot> = registry.iter().map(EntitySnapshot::from).collect();
        let retired: Vec<EntityId> = registry.retired().cloned().collect();
        let hash = compute_hash(&entities, &retired);
        Self {
            entities,
            retired,
            hash,
        }
    }

    /// Recompute the digest and compare.
    pub fn verify(&self) -> bool {
        compute_hash(&self.entities, &self.retired) == self.hash
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<V: VisualFactory, U: UiSink, A: ArtLoader> Reconciler<V, U, A> {
    /// Capture the registry for diagnostics or comparison.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot::capture(&self.registry)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
