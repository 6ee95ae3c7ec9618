//! Static per-type placement metadata.
//!
//! Each unit or tower archetype the server can spawn has one
//! [`EntityTypeDescriptor`] describing how its visual sits on the board. The
//! [`TypeCatalog`] is loaded once at startup and never mutated afterwards.
//!
//! Lookups are soft: an unknown type id yields [`EntityTypeDescriptor`]
//! defaults (zero offsets, not a structure) so a missing entry never blocks
//! placement of anything else.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::SpatialError;

// ---------------------------------------------------------------------------
// EntityTypeDescriptor
// ---------------------------------------------------------------------------

/// Placement metadata for one entity archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTypeDescriptor {
    /// Server type identifier (usually a UUID string).
    pub type_id: String,
    /// Human-readable label used in logs.
    #[serde(default)]
    pub name: Option<String>,
    /// World Y of the visual, so differently shaped assets rest on the ground.
    #[serde(default)]
    pub vertical_offset: f32,
    /// (x, z) correction for assets whose pivot is not centred.
    #[serde(default)]
    pub pivot_offset: Vec2,
    /// Structures on the far half of the board are turned to face the centre.
    #[serde(default)]
    pub is_structure: bool,
}

impl EntityTypeDescriptor {
    /// A unit descriptor with only a vertical offset.
    pub fn unit(type_id: impl Into<String>, name: &str, vertical_offset: f32) -> Self {
        Self {
            type_id: type_id.into(),
            name: Some(name.to_owned()),
            vertical_offset,
            pivot_offset: Vec2::ZERO,
            is_structure: false,
        }
    }

    /// A structure (tower) descriptor.
    pub fn structure(type_id: impl Into<String>, name: &str) -> Self {
        Self {
            is_structure: true,
            ..Self::unit(type_id, name, 0.0)
        }
    }

    /// Label for logs: the name when present, otherwise the type id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.type_id)
    }
}

// ---------------------------------------------------------------------------
// TypeCatalog
// ---------------------------------------------------------------------------

/// Immutable map from type id to [`EntityTypeDescriptor`].
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    descriptors: HashMap<String, EntityTypeDescriptor>,
}

impl TypeCatalog {
    /// Build a catalog, rejecting duplicate type ids.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::DuplicateDescriptor`] naming the first repeated
    /// type id.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = EntityTypeDescriptor>,
    ) -> Result<Self, SpatialError> {
        let mut map = HashMap::new();
        for descriptor in descriptors {
            if map.contains_key(&descriptor.type_id) {
                return Err(SpatialError::DuplicateDescriptor(descriptor.type_id));
            }
            map.insert(descriptor.type_id.clone(), descriptor);
        }
        Ok(Self { descriptors: map })
    }

    /// Look up a descriptor. `None` for unknown types.
    pub fn get(&self, type_id: &str) -> Option<&EntityTypeDescriptor> {
        self.descriptors.get(type_id)
    }

    /// Vertical offset for `type_id`, `0.0` when unknown.
    pub fn vertical_offset(&self, type_id: &str) -> f32 {
        self.get(type_id).map_or(0.0, |d| d.vertical_offset)
    }

    /// Pivot offset for `type_id`, zero when unknown.
    pub fn pivot_offset(&self, type_id: &str) -> Vec2 {
        self.get(type_id).map_or(Vec2::ZERO, |d| d.pivot_offset)
    }

    /// Whether `type_id` is a structure. Unknown types are not.
    pub fn is_structure(&self, type_id: &str) -> bool {
        self.get(type_id).is_some_and(|d| d.is_structure)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.descriptors.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// All descriptors, sorted by type id.
    pub fn descriptors(&self) -> Vec<&EntityTypeDescriptor> {
        let mut out: Vec<_> = self.descriptors.values().collect();
        out.sort_by(|a, b| a.type_id.cmp(&b.type_id));
        out
    }
}

/// The eight playable unit archetypes shipped with the arena.
pub fn default_descriptors() -> Vec<EntityTypeDescriptor> {
    vec![
        EntityTypeDescriptor::unit("6ce2da92-188d-4458-b9a3-8f4e7ae02864", "caveman", 1.7),
        EntityTypeDescriptor::unit("1a4b313f-5dff-4163-8dc5-eb2bf2df0a41", "lancer", 2.4),
        EntityTypeDescriptor::unit("8b76c8c0-614f-4783-84f5-a9965eb01093", "mini_dino", 0.9),
        EntityTypeDescriptor::unit("fe53ae3f-9575-48e0-847e-ad675cb51e7b", "mini_dragon", 2.0),
        EntityTypeDescriptor::unit(
            "14a6debd-dc5a-42c6-a46a-ba2f137c6a50",
            "prehistoric_dragon",
            4.4,
        ),
        EntityTypeDescriptor::unit("0a1ae662-f5a3-4826-ab65-42d37b997154", "rock_golem", 1.0),
        EntityTypeDescriptor::unit("29a0c77e-54da-40ec-afbb-cdd5449fd40f", "pterodactyl", 3.4),
        EntityTypeDescriptor::unit(
            "6b75ea3b-a3b5-4ec6-8a38-31ca352bee55",
            "warrior_caveman",
            1.1,
        ),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
