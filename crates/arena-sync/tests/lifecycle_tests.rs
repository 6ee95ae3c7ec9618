//! Entity lifecycle through the frame loop: spawn, damage, move, kill.

use arena_sync::prelude::*;
use glam::Vec3;

type TestLoop = FrameLoop<HeadlessScene, HeadlessUi, HeadlessArt>;

const DT: f32 = 1.0 / 60.0;

fn frame() -> TestLoop {
    FrameLoop::new(
        ClientConfig::default(),
        MatchSession::new("session", "me"),
        HeadlessScene::new(),
        HeadlessUi::default(),
        HeadlessArt::default(),
    )
    .unwrap()
}

fn spawn(id: &str, type_id: &str, row: i32, col: i32, health: i32, max: i32) -> Notification {
    Notification::UnitSpawned(arena_sync::notification::SpawnInfo {
        entity_id: EntityId::from(id),
        type_id: type_id.to_owned(),
        cell: GridCell::new(row, col),
        health,
        max_health: Some(max),
    })
}

// ---------------------------------------------------------------------------
// Full lifecycle
// ---------------------------------------------------------------------------

#[test]
fn caveman_lifecycle() {
    use arena_sync::notification::{DamageInfo, KillInfo, MoveInfo};

    let mut frame = frame();
    let tx = frame.sender();

    // Spawn at (5, 3).
    tx.notify(spawn("u1", "caveman", 5, 3, 100, 100)).unwrap();
    frame.tick(DT);
    let rec = frame.reconciler();
    let visual = rec.get("u1").expect("u1 registered");
    let bar = rec.try_get_health_bar("u1").expect("caveman has a health bar");
    let spawn_pos = rec.position("u1").unwrap();
    assert_eq!(
        rec.mapper().world_to_grid(spawn_pos),
        GridCell::new(5, 3),
        "inverse of the spawn position is the spawn cell"
    );
    assert_eq!(rec.ui().health_of(bar), Some(1.0));

    // Damage to 40 / 100.
    tx.notify(Notification::UnitDamaged(DamageInfo {
        attacker_id: None,
        target_id: EntityId::from("u1"),
        damage: 60,
        health: 40,
        max_health: 100,
    }))
    .unwrap();
    frame.tick(DT);
    assert_eq!(frame.reconciler().health_fraction("u1"), Some(0.4));
    assert_eq!(frame.reconciler().ui().health_of(bar), Some(0.4));
    assert_eq!(frame.reconciler().factory().tint(visual), Some(Tint::Hit));

    // Move to (6, 3): one second of interpolation, then it lands exactly.
    tx.notify(Notification::UnitMoved(MoveInfo {
        entity_id: EntityId::from("u1"),
        type_id: "caveman".into(),
        cell: GridCell::new(6, 3),
    }))
    .unwrap();
    frame.tick(DT);
    let target = frame
        .reconciler()
        .mapper()
        .grid_to_world("caveman", GridCell::new(6, 3));
    let mid = frame.reconciler().position("u1").unwrap();
    assert!(mid.distance(spawn_pos) > 0.0);
    assert!(mid.distance(target) < spawn_pos.distance(target));

    frame.run_frames(70, DT);
    assert_eq!(frame.reconciler().position("u1"), Some(target));
    assert_eq!(frame.reconciler().factory().tint(visual), Some(Tint::Normal));
    assert_eq!(frame.reconciler().scheduler().active_count(), 0);

    // Kill.
    tx.notify(Notification::UnitKilled(KillInfo {
        attacker_id: None,
        target_id: EntityId::from("u1"),
    }))
    .unwrap();
    frame.tick(DT);
    let rec = frame.reconciler();
    assert!(rec.get("u1").is_none());
    assert_eq!(rec.factory().destroyed_bars(), &[bar]);
    assert_eq!(rec.factory().destroyed(), &[visual]);

    // A second kill is a no-op.
    let before = rec.snapshot();
    frame.reconciler_mut().remove("u1");
    assert_eq!(frame.reconciler().snapshot().hash, before.hash);
    assert_eq!(frame.reconciler().factory().stale_calls(), 0);
}

#[test]
fn kill_mid_move_stops_all_updates() {
    let mut frame = frame();
    let tx = frame.sender();
    tx.notify(spawn("u1", "caveman", 5, 3, 100, 100)).unwrap();
    frame.tick(DT);

    frame.reconciler_mut().move_to("u1", Vec3::new(0.0, 0.0, 50.0), 1.0);
    frame.reconciler_mut().apply_damage("u1", 50, 100);
    frame.tick(DT);
    assert!(frame.reconciler_mut().remove("u1"));

    let calls = frame.reconciler().factory().transform_calls();
    frame.run_frames(120, DT);
    assert_eq!(frame.reconciler().factory().transform_calls(), calls);
    assert_eq!(frame.reconciler().factory().stale_calls(), 0);
}

#[test]
fn superseding_move_does_not_stack() {
    let mut frame = frame();
    frame.sender().notify(spawn("u1", "caveman", 5, 3, 100, 100)).unwrap();
    frame.tick(DT);

    let first = Vec3::new(-40.0, 1.7, 45.0);
    let second = Vec3::new(-30.0, 1.7, 50.0);
    frame.reconciler_mut().move_to("u1", first, 1.0);
    frame.run_frames(10, DT);
    frame.reconciler_mut().move_to("u1", second, 1.0);
    assert_eq!(frame.reconciler().scheduler().active_count(), 1);
    frame.run_frames(90, DT);
    assert_eq!(frame.reconciler().position("u1"), Some(second));
}

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

#[test]
fn structures_on_far_half_face_the_middle() {
    let mut config = ClientConfig::default();
    config
        .entity_types
        .push(EntityTypeDescriptor::structure("king-tower", "king tower"));
    let mut rec = Reconciler::new(
        &config,
        MatchSession::new("s", "me"),
        HeadlessScene::new(),
        HeadlessUi::default(),
        HeadlessArt::default(),
    )
    .unwrap();

    let rows = config.grid.rows as i32;
    rec.register("far", "king-tower", GridCell::new(rows - 1, 8), 3000, Some(3000));
    rec.register("near", "king-tower", GridCell::new(0, 8), 3000, Some(3000));

    let far = rec.rotation("far").unwrap();
    let near = rec.rotation("near").unwrap();
    let expected = glam::Quat::from_rotation_y(std::f32::consts::PI);
    assert!(far.angle_between(expected) < 1e-4);
    assert!(near.angle_between(glam::Quat::IDENTITY) < 1e-4);

    let visual = rec.get("far").unwrap();
    assert_eq!(rec.factory().object(visual).unwrap().rotation, far);
}

#[test]
fn units_are_never_flipped() {
    let mut rec = Reconciler::new(
        &ClientConfig::default(),
        MatchSession::new("s", "me"),
        HeadlessScene::new(),
        HeadlessUi::default(),
        HeadlessArt::default(),
    )
    .unwrap();
    rec.register("u", "caveman", GridCell::new(29, 4), 10, Some(10));
    assert_eq!(rec.rotation("u"), Some(glam::Quat::IDENTITY));
}

// ---------------------------------------------------------------------------
// Match boundary
// ---------------------------------------------------------------------------

#[test]
fn match_end_tears_down_everything() {
    use arena_sync::notification::EndInfo;

    let mut frame = frame();
    let tx = frame.sender();
    for (i, row) in [1, 2, 3].into_iter().enumerate() {
        tx.notify(spawn(&format!("u{i}"), "caveman", row, 4, 10, 10))
            .unwrap();
    }
    tx.notify(Notification::MatchEnded(EndInfo {
        winner_id: "me".into(),
        winner_towers: 3,
        loser_towers: 2,
    }))
    .unwrap();
    frame.tick(DT);

    let rec = frame.reconciler();
    assert!(rec.is_empty());
    assert_eq!(rec.factory().live_count(), 0);
    assert_eq!(rec.factory().live_bar_count(), 0);
    let result = rec.ui().match_result().unwrap();
    assert!(result.local_won);
    assert_eq!((result.own_towers, result.rival_towers), (3, 2));
}
