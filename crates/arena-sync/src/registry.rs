//! The id -> live entity map.
//!
//! [`EntityRegistry`] is the single source of truth for which entities exist
//! on the client. It only stores records; the
//! [`Reconciler`](crate::reconciler::Reconciler) decides when to insert or
//! remove them and talks to the visual factory.
//!
//! Per-id lifecycle: `Unregistered -> Live -> Removed`. A removed id is
//! retired and cannot be registered again until [`clear`](EntityRegistry::clear)
//! ends the match.

use std::collections::{btree_map, BTreeMap, BTreeSet};

use crate::entity::{EntityId, LiveEntity};

// ---------------------------------------------------------------------------
// Insert outcome
// ---------------------------------------------------------------------------

/// Why an insert was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertRefusal {
    /// The id is already live.
    AlreadyLive,
    /// The id was live earlier in this match and has been removed.
    Retired,
}

// ---------------------------------------------------------------------------
// EntityRegistry
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct EntityRegistry {
    live: BTreeMap<EntityId, LiveEntity>,
    retired: BTreeSet<EntityId>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` may be inserted right now.
    pub fn check_insert(&self, id: &str) -> Result<(), InsertRefusal> {
        if self.live.contains_key(id) {
            Err(InsertRefusal::AlreadyLive)
        } else if self.retired.contains(id) {
            Err(InsertRefusal::Retired)
        } else {
            Ok(())
        }
    }

    /// Store a new record. The first record for an id wins; a refused entity
    /// is handed back untouched.
    pub fn insert(&mut self, entity: LiveEntity) -> Result<(), (InsertRefusal, LiveEntity)> {
        if let Err(refusal) = self.check_insert(entity.id.as_str()) {
            return Err((refusal, entity));
        }
        match self.live.entry(entity.id.clone()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entity);
                Ok(())
            }
            btree_map::Entry::Occupied(_) => Err((InsertRefusal::AlreadyLive, entity)),
        }
    }

    /// Remove and retire `id`. `None` if it was not live.
    pub fn remove(&mut self, id: &str) -> Option<LiveEntity> {
        let entity = self.live.remove(id)?;
        self.retired.insert(entity.id.clone());
        Some(entity)
    }

    /// Take every live record and forget retired ids.
    ///
    /// Returned in id order so teardown is deterministic.
    pub fn clear(&mut self) -> Vec<LiveEntity> {
        self.retired.clear();
        std::mem::take(&mut self.live).into_values().collect()
    }

    pub fn get(&self, id: &str) -> Option<&LiveEntity> {
        self.live.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut LiveEntity> {
        self.live.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.live.contains_key(id)
    }

    pub fn is_retired(&self, id: &str) -> bool {
        self.retired.contains(id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &LiveEntity> {
        self.live.values()
    }

    /// Retired ids in order.
    pub fn retired(&self) -> impl Iterator<Item = &EntityId> {
        self.retired.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::VisualHandle;
    use arena_spatial::calibration::GridCell;
    use glam::{Quat, Vec3};

    fn record(id: &str, visual: u64) -> LiveEntity {
        LiveEntity {
            id: EntityId::from(id),
            type_id: "t".to_owned(),
            spawn_cell: GridCell::default(),
            visual: VisualHandle(visual),
            health_bar: None,
            health_fraction: 1.0,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    #[test]
    fn first_insert_wins() {
        let mut reg = EntityRegistry::new();
        reg.insert(record("a", 1)).unwrap();
        let (refusal, rejected) = reg.insert(record("a", 2)).unwrap_err();
        assert_eq!(refusal, InsertRefusal::AlreadyLive);
        assert_eq!(rejected.visual, VisualHandle(2));
        assert_eq!(reg.get("a").unwrap().visual, VisualHandle(1));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn removed_ids_are_retired() {
        let mut reg = EntityRegistry::new();
        reg.insert(record("a", 1)).unwrap();
        assert!(reg.remove("a").is_some());
        assert!(reg.remove("a").is_none());
        assert!(reg.is_retired("a"));
        assert_eq!(reg.check_insert("a"), Err(InsertRefusal::Retired));
    }

    #[test]
    fn clear_forgets_retired_ids() {
        let mut reg = EntityRegistry::new();
        reg.insert(record("b", 2)).unwrap();
        reg.insert(record("a", 1)).unwrap();
        reg.remove("b");
        let drained = reg.clear();
        assert_eq!(drained.len(), 1);
        assert!(reg.is_empty());
        assert!(!reg.is_retired("b"));
        assert!(reg.clear().is_empty());
    }
}
