//! Per-entity timed tasks: move interpolation and hit flash.
//!
//! Each live entity has at most one move task and one flash task. Starting a
//! task of a kind replaces the previous one for that id, so superseding moves
//! never stack. Tasks remember the visual handle they were started for; on
//! every [`advance`](TaskScheduler::advance) they re-check that the entity is
//! still live with that same handle and drop themselves silently otherwise.
//!
//! Removal cancels synchronously through [`cancel`](TaskScheduler::cancel),
//! before the visual is destroyed.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use crate::entity::{EntityId, VisualHandle};
use crate::ports::{Tint, VisualFactory};
use crate::registry::EntityRegistry;

#[derive(Debug, Clone, PartialEq)]
struct MoveTask {
    visual: VisualHandle,
    from: Vec3,
    to: Vec3,
    duration: f32,
    elapsed: f32,
    facing: Option<Quat>,
}

#[derive(Debug, Clone, PartialEq)]
struct FlashTask {
    visual: VisualHandle,
    remaining: f32,
}

/// Work done by one [`advance`](TaskScheduler::advance).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    pub moves_finished: usize,
    pub flashes_finished: usize,
    /// Tasks dropped because their entity was gone or re-created.
    pub stale_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct TaskScheduler {
    moves: BTreeMap<EntityId, MoveTask>,
    flashes: BTreeMap<EntityId, FlashTask>,
    turn_rate: f32,
    flash_secs: f32,
}

/// Yaw-only rotation facing along `dir` on the XZ plane.
fn yaw_towards(dir: Vec3) -> Option<Quat> {
    let flat = Vec3::new(dir.x, 0.0, dir.z);
    if flat.length_squared() <= f32::EPSILON {
        return None;
    }
    Some(Quat::from_rotation_y(flat.x.atan2(flat.z)))
}

fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        0.0
    }
}

impl TaskScheduler {
    pub fn new(turn_rate: f32, flash_secs: f32) -> Self {
        Self {
            moves: BTreeMap::new(),
            flashes: BTreeMap::new(),
            turn_rate,
            flash_secs,
        }
    }

    /// Start (or replace) the move task for `id`. `duration` must be positive.
    pub fn start_move(
        &mut self,
        id: EntityId,
        visual: VisualHandle,
        from: Vec3,
        to: Vec3,
        duration: f32,
    ) {
        self.moves.insert(
            id,
            MoveTask {
                visual,
                from,
                to,
                duration,
                elapsed: 0.0,
                facing: yaw_towards(to - from),
            },
        );
    }

    /// Tint `visual` and start (or restart) its flash timer.
    pub fn start_flash<F: VisualFactory>(
        &mut self,
        id: EntityId,
        visual: VisualHandle,
        factory: &mut F,
    ) {
        factory.set_tint(visual, Tint::Hit);
        self.flashes.insert(
            id,
            FlashTask {
                visual,
                remaining: self.flash_secs,
            },
        );
    }

    /// Drop every task for `id`. Returns whether anything was cancelled.
    pub fn cancel(&mut self, id: &str) -> bool {
        let moved = self.moves.remove(id).is_some();
        let flashed = self.flashes.remove(id).is_some();
        moved || flashed
    }

    pub fn cancel_move(&mut self, id: &str) -> bool {
        self.moves.remove(id).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.moves.clear();
        self.flashes.clear();
    }

    /// Step every task by `dt` seconds, pushing transforms and tints.
    pub fn advance<F: VisualFactory>(
        &mut self,
        dt: f32,
        registry: &mut EntityRegistry,
        factory: &mut F,
    ) -> AdvanceReport {
        let dt = sanitize_dt(dt);
        let turn = (self.turn_rate * dt).clamp(0.0, 1.0);
        let mut report = AdvanceReport::default();

        self.moves.retain(|id, task| {
            let Some(entity) = registry.get_mut(id.as_str()) else {
                report.stale_dropped += 1;
                return false;
            };
            if entity.visual != task.visual {
                report.stale_dropped += 1;
                return false;
            }

            task.elapsed += dt;
            let t = (task.elapsed / task.duration).min(1.0);
            entity.position = if t >= 1.0 {
                task.to
            } else {
                task.from.lerp(task.to, t)
            };
            if let Some(facing) = task.facing {
                entity.rotation = entity.rotation.slerp(facing, turn).normalize();
            }
            factory.set_transform(entity.visual, entity.position, entity.rotation);

            if t >= 1.0 {
                report.moves_finished += 1;
                false
            } else {
                true
            }
        });

        self.flashes.retain(|id, task| {
            let live = registry
                .get(id.as_str())
                .is_some_and(|e| e.visual == task.visual);
            if !live {
                report.stale_dropped += 1;
                return false;
            }
            task.remaining -= dt;
            if task.remaining <= 0.0 {
                factory.set_tint(task.visual, Tint::Normal);
                report.flashes_finished += 1;
                false
            } else {
                true
            }
        });

        report
    }

    pub fn has_move(&self, id: &str) -> bool {
        self.moves.contains_key(id)
    }

    pub fn has_flash(&self, id: &str) -> bool {
        self.flashes.contains_key(id)
    }

    /// Target of the in-flight move for `id`.
    pub fn move_target(&self, id: &str) -> Option<Vec3> {
        self.moves.get(id).map(|t| t.to)
    }

    pub fn active_count(&self) -> usize {
        self.moves.len() + self.flashes.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::LiveEntity;
    use crate::headless::HeadlessScene;
    use arena_spatial::calibration::GridCell;
    use arena_spatial::mapper::Placement;

    fn spawn(reg: &mut EntityRegistry, scene: &mut HeadlessScene, id: &str) -> VisualHandle {
        let visual = scene
            .instantiate(
                "t",
                Placement {
                    position: Vec3::ZERO,
                    rotation: Quat::IDENTITY,
                },
            )
            .unwrap();
        reg.insert(LiveEntity {
            id: EntityId::from(id),
            type_id: "t".into(),
            spawn_cell: GridCell::default(),
            visual,
            health_bar: None,
            health_fraction: 1.0,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        })
        .unwrap();
        visual
    }

    // -- moves --------------------------------------------------------------

    #[test]
    fn move_interpolates_then_lands_exactly() {
        let mut reg = EntityRegistry::new();
        let mut scene = HeadlessScene::new();
        let visual = spawn(&mut reg, &mut scene, "a");
        let mut sched = TaskScheduler::new(10.0, 0.2);
        let target = Vec3::new(4.0, 0.0, 0.0);
        sched.start_move(EntityId::from("a"), visual, Vec3::ZERO, target, 1.0);

        sched.advance(0.5, &mut reg, &mut scene);
        let halfway = reg.get("a").unwrap().position;
        assert!((halfway.x - 2.0).abs() < 1e-5);
        assert!(sched.has_move("a"));

        let report = sched.advance(0.6, &mut reg, &mut scene);
        assert_eq!(report.moves_finished, 1);
        assert_eq!(reg.get("a").unwrap().position, target);
        assert!(!sched.has_move("a"));
    }

    #[test]
    fn move_turns_towards_travel_direction() {
        let mut reg = EntityRegistry::new();
        let mut scene = HeadlessScene::new();
        let visual = spawn(&mut reg, &mut scene, "a");
        let mut sched = TaskScheduler::new(10.0, 0.2);
        sched.start_move(
            EntityId::from("a"),
            visual,
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            5.0,
        );
        for _ in 0..60 {
            sched.advance(1.0 / 30.0, &mut reg, &mut scene);
        }
        let forward = reg.get("a").unwrap().rotation * Vec3::Z;
        assert!(forward.x > 0.99, "forward = {forward}");
    }

    #[test]
    fn new_move_replaces_in_flight_move() {
        let mut reg = EntityRegistry::new();
        let mut scene = HeadlessScene::new();
        let visual = spawn(&mut reg, &mut scene, "a");
        let mut sched = TaskScheduler::new(10.0, 0.2);
        sched.start_move(EntityId::from("a"), visual, Vec3::ZERO, Vec3::X, 1.0);
        sched.start_move(EntityId::from("a"), visual, Vec3::ZERO, Vec3::Z, 1.0);
        assert_eq!(sched.active_count(), 1);
        sched.advance(2.0, &mut reg, &mut scene);
        assert_eq!(reg.get("a").unwrap().position, Vec3::Z);
    }

    #[test]
    fn task_for_removed_entity_is_dropped() {
        let mut reg = EntityRegistry::new();
        let mut scene = HeadlessScene::new();
        let visual = spawn(&mut reg, &mut scene, "a");
        let mut sched = TaskScheduler::new(10.0, 0.2);
        sched.start_move(EntityId::from("a"), visual, Vec3::ZERO, Vec3::X, 1.0);
        reg.remove("a");
        let before = scene.transform_calls();
        let report = sched.advance(0.1, &mut reg, &mut scene);
        assert_eq!(report.stale_dropped, 1);
        assert_eq!(scene.transform_calls(), before);
    }

    // -- flashes ------------------------------------------------------------

    #[test]
    fn flash_reverts_after_duration() {
        let mut reg = EntityRegistry::new();
        let mut scene = HeadlessScene::new();
        let visual = spawn(&mut reg, &mut scene, "a");
        let mut sched = TaskScheduler::new(10.0, 0.2);
        sched.start_flash(EntityId::from("a"), visual, &mut scene);
        assert_eq!(scene.tint(visual), Some(Tint::Hit));

        sched.advance(0.1, &mut reg, &mut scene);
        assert_eq!(scene.tint(visual), Some(Tint::Hit));
        sched.advance(0.15, &mut reg, &mut scene);
        assert_eq!(scene.tint(visual), Some(Tint::Normal));
        assert!(!sched.has_flash("a"));
    }

    #[test]
    fn cancel_drops_both_kinds() {
        let mut reg = EntityRegistry::new();
        let mut scene = HeadlessScene::new();
        let visual = spawn(&mut reg, &mut scene, "a");
        let mut sched = TaskScheduler::new(10.0, 0.2);
        sched.start_move(EntityId::from("a"), visual, Vec3::ZERO, Vec3::X, 1.0);
        sched.start_flash(EntityId::from("a"), visual, &mut scene);
        assert!(sched.cancel("a"));
        assert!(!sched.cancel("a"));
        assert_eq!(sched.active_count(), 0);
    }

    #[test]
    fn bad_dt_does_not_advance() {
        let mut reg = EntityRegistry::new();
        let mut scene = HeadlessScene::new();
        let visual = spawn(&mut reg, &mut scene, "a");
        let mut sched = TaskScheduler::new(10.0, 0.2);
        sched.start_move(EntityId::from("a"), visual, Vec3::ZERO, Vec3::X, 1.0);
        sched.advance(f32::NAN, &mut reg, &mut scene);
        sched.advance(-1.0, &mut reg, &mut scene);
        assert_eq!(reg.get("a").unwrap().position, Vec3::ZERO);
    }
}
