//! Replays a scripted hub event stream through the headless backend.
//!
//! A delivery thread pushes raw `(method, payload)` events into the inbox
//! while the main thread runs frames, plays one card, and prints what the
//! scene and UI ended up with.
//!
//! Run with `cargo run -p arena-sync --example headless_match [config.json]`.
//! Set `RUST_LOG=debug` to see every lifecycle event.

use anyhow::Context;
use arena_sync::prelude::*;
use serde_json::{json, Value};

const DT: f32 = 1.0 / 60.0;

fn card(id: &str, cost: u32) -> Value {
    json!({
        "playerCardId": id,
        "cardId": format!("archetype-{id}"),
        "elixir": cost,
        "imageUrl": format!("https://cdn.example/cards/{id}.png"),
    })
}

fn script() -> Vec<(&'static str, Value)> {
    let caveman = "6ce2da92-188d-4458-b9a3-8f4e7ae02864";
    vec![
        (
            "JoinedToGame",
            json!({
                "arena": {
                    "towers": [
                        {"id": "tower-near", "towerTemplateId": "king", "x": 8, "y": 0, "health": 3000, "maxHealth": 3000},
                        {"id": "tower-far", "towerTemplateId": "king", "x": 8, "y": 29, "health": 3000, "maxHealth": 3000}
                    ],
                    "entities": []
                },
                "players": [
                    {"id": "player-1", "currentElixir": 5},
                    {"id": "player-2", "currentElixir": 5}
                ]
            }),
        ),
        (
            "Hand",
            json!({
                "hand": [card("A", 3), card("B", 2), card("C", 4), card("D", 5)],
                "nextCard": card("N", 3)
            }),
        ),
        (
            "CardSpawned",
            json!({"unitId": "u1", "cardPlayedId": caveman, "x": 3, "y": 5, "health": 100, "maxHealth": 100}),
        ),
        (
            "TroopMoved",
            json!({"troopId": "u1", "cardId": caveman, "x": 3, "y": 6}),
        ),
        (
            "UnitDamaged",
            json!({"attackerId": "tower-far", "targetId": "u1", "damage": 60, "health": 40, "maxHealth": 100}),
        ),
        // Arrives as a JSON string, as some transports deliver it.
        ("NewElixir", json!("6.5")),
        ("TroopMoved", json!({"troopId": "ghost", "cardId": caveman, "x": 1, "y": 1})),
        ("UnitKilled", json!({"attackerId": "tower-far", "targetId": "u1"})),
    ]
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => ClientConfig::default(),
    };

    let mut frame = FrameLoop::new(
        config,
        MatchSession::new("session-42", "player-1"),
        HeadlessScene::new(),
        HeadlessUi::default(),
        HeadlessArt::default(),
    )
    .context("building frame loop")?;

    let mut transport = RecordingTransport::default();
    frame.reconciler_mut().join_match(&mut transport)?;

    // Delivery thread.
    let tx = frame.sender();
    let delivery = std::thread::spawn(move || -> Result<(), InboxError> {
        for (method, payload) in script() {
            tx.push_raw(method, &payload)?;
        }
        Ok(())
    });
    delivery
        .join()
        .map_err(|_| anyhow::anyhow!("delivery thread panicked"))??;

    // First frame applies the join, hand and spawn; then let the move run.
    let diag = frame.tick(DT).clone();
    println!(
        "frame 1: drained {} (applied {}, skipped {})",
        diag.drained, diag.applied, diag.skipped
    );
    frame.run_frames(90, DT);

    // Play card B onto the near half.
    let hit = frame
        .reconciler()
        .mapper()
        .transform()
        .cell_center(GridCell::new(4, 9));
    match frame
        .reconciler_mut()
        .release_card(&mut transport, "B", Some(hit))
    {
        Ok(play) => println!(
            "played {} at {} (slot {})",
            play.card_id, play.cell, play.slot_index
        ),
        Err(rejected) => println!("play rejected: {rejected}"),
    }
    frame.sender().push_raw(
        "RefreshHand",
        &json!({"cardToPut": card("E", 3), "nextCard": card("F", 2), "elixir": 3.5}),
    )?;
    frame.tick(DT);
    let rec = frame.reconciler();
    let hand: Vec<&str> = rec.hand().slots().iter().map(|c| c.card_id.as_str()).collect();
    println!("hand: {hand:?}, elixir {}", rec.elixir().label());

    frame.sender().push_raw(
        "EndGame",
        &json!({"winnerId": "player-1", "towersWinner": 3, "towersLosser": 1}),
    )?;
    frame.tick(DT);

    let rec = frame.reconciler();
    println!(
        "scene: {} live, {} destroyed, {} outbound calls",
        rec.factory().live_count(),
        rec.factory().destroyed().len(),
        transport.calls().len()
    );
    if let Some(result) = rec.ui().match_result() {
        println!(
            "match over: {} ({} towers to {})",
            if result.local_won { "victory" } else { "defeat" },
            result.own_towers,
            result.rival_towers
        );
    }
    println!("snapshot {}", rec.snapshot().hash);
    println!("frames run: {}", frame.frame_count());

    Ok(())
}
