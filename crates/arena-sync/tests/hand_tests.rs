//! Hand and elixir flows through the frame loop, including art reveal.

use arena_sync::notification::{CardInfo, HandInfo, RefreshInfo};
use arena_sync::ports::{ArtHandle, ArtSlot, CardArt};
use arena_sync::prelude::*;

type TestLoop = FrameLoop<HeadlessScene, HeadlessUi, HeadlessArt>;

const DT: f32 = 1.0 / 60.0;

fn card(id: &str) -> CardInfo {
    CardInfo {
        card_id: id.to_owned(),
        catalog_id: format!("catalog-{id}"),
        cost: 3,
        image_ref: format!("https://cdn.example/{id}.png"),
    }
}

fn frame_with(art: HeadlessArt) -> TestLoop {
    FrameLoop::new(
        ClientConfig::default(),
        MatchSession::new("session", "me"),
        HeadlessScene::new(),
        HeadlessUi::default(),
        art,
    )
    .unwrap()
}

fn deal(frame: &mut TestLoop, ids: &[&str], next: &str) {
    frame
        .sender()
        .notify(Notification::Hand(HandInfo {
            cards: ids.iter().map(|id| card(id)).collect(),
            next_card: Some(card(next)),
        }))
        .unwrap();
    frame.tick(DT);
}

fn slot_ids(frame: &TestLoop) -> Vec<String> {
    frame
        .reconciler()
        .hand()
        .slots()
        .iter()
        .map(|c| c.card_id.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[test]
fn play_then_refresh_replaces_by_index() {
    let mut frame = frame_with(HeadlessArt::default());
    deal(&mut frame, &["A", "B", "C", "D"], "N");

    // Play B on the near half.
    let hit = frame
        .reconciler()
        .mapper()
        .transform()
        .cell_center(GridCell::new(4, 9));
    let mut transport = RecordingTransport::default();
    let play = frame
        .reconciler_mut()
        .release_card(&mut transport, "B", Some(hit))
        .unwrap();
    assert_eq!(play.slot_index, 1);
    assert_eq!(transport.calls().len(), 1);

    frame
        .sender()
        .notify(Notification::HandRefreshed(RefreshInfo {
            played_card: Some(card("E")),
            next_card: Some(card("F")),
            elixir: 3.5,
        }))
        .unwrap();
    frame.tick(DT);

    assert_eq!(slot_ids(&frame), ["A", "E", "C", "D"]);
    let rec = frame.reconciler();
    assert_eq!(rec.hand().next_card().unwrap().card_id, "F");
    assert_eq!(rec.elixir().whole, 3);
    assert_eq!(rec.ui().last_elixir().unwrap().label(), "3/10");

    let view = rec.ui().last_hand().unwrap();
    let shown: Vec<&str> = view.slots.iter().map(|s| s.card_id.as_str()).collect();
    assert_eq!(shown, ["A", "E", "C", "D"]);
    assert_eq!(view.next.as_ref().unwrap().card_id, "F");
}

#[test]
fn refresh_falls_back_to_card_id_then_append() {
    let mut frame = frame_with(HeadlessArt::default());
    deal(&mut frame, &["A", "B", "C", "D"], "N");

    // No play recorded: append.
    frame
        .sender()
        .notify(Notification::HandRefreshed(RefreshInfo {
            played_card: Some(card("E")),
            next_card: Some(card("F")),
            elixir: 1.0,
        }))
        .unwrap();
    frame.tick(DT);
    assert_eq!(slot_ids(&frame), ["A", "B", "C", "D", "E"]);
}

#[test]
fn malformed_refresh_changes_nothing() {
    let mut frame = frame_with(HeadlessArt::default());
    deal(&mut frame, &["A", "B", "C", "D"], "N");
    let elixir_before = frame.reconciler().elixir();

    frame
        .sender()
        .notify(Notification::HandRefreshed(RefreshInfo {
            played_card: None,
            next_card: Some(card("F")),
            elixir: 9.0,
        }))
        .unwrap();
    let diag = frame.tick(DT).clone();
    assert_eq!(diag.skipped, 1);
    assert_eq!(slot_ids(&frame), ["A", "B", "C", "D"]);
    assert_eq!(frame.reconciler().elixir(), elixir_before);
}

#[test]
fn elixir_notifications_clamp() {
    let mut frame = frame_with(HeadlessArt::default());
    let tx = frame.sender();
    tx.push_raw("NewElixir", &serde_json::json!(14.2)).unwrap();
    frame.tick(DT);
    assert_eq!(frame.reconciler().elixir().label(), "10/10");
    tx.push_raw("NewElixir", &serde_json::json!("0.9")).unwrap();
    frame.tick(DT);
    assert_eq!(frame.reconciler().elixir().label(), "0/10");
}

// ---------------------------------------------------------------------------
// Art reveal
// ---------------------------------------------------------------------------

#[test]
fn hand_stays_hidden_until_late_art_arrives() {
    let slow = "https://cdn.example/C.png";
    let mut frame = frame_with(HeadlessArt::default().with_pending(slow));
    deal(&mut frame, &["A", "B", "C", "D"], "N");
    assert!(!frame.reconciler().hand().is_visible());
    assert_eq!(frame.reconciler().ui().hand_updates(), 0);

    let ticket = frame.reconciler().art().pending_tickets()[0];
    assert_eq!(ticket.slot, ArtSlot::Hand(2));
    let tx = frame.sender();
    std::thread::spawn(move || tx.art_resolved(ticket, Ok(ArtHandle(500))).unwrap())
        .join()
        .unwrap();
    frame.tick(DT);

    let rec = frame.reconciler();
    assert!(rec.hand().is_visible());
    let view = rec.ui().last_hand().unwrap();
    assert_eq!(view.slots[2].art, CardArt::Loaded(ArtHandle(500)));
}

#[test]
fn art_timeout_reveals_with_placeholder() {
    let slow = "https://cdn.example/N.png";
    let mut frame = frame_with(HeadlessArt::default().with_pending(slow));
    deal(&mut frame, &["A", "B", "C", "D"], "N");
    assert!(!frame.reconciler().hand().is_visible());

    // Default timeout is five seconds.
    frame.run_frames(60 * 4, DT);
    assert!(!frame.reconciler().hand().is_visible());
    frame.run_frames(60 * 2, DT);

    let rec = frame.reconciler();
    assert!(rec.hand().is_visible());
    let view = rec.ui().last_hand().unwrap();
    assert_eq!(view.next.as_ref().unwrap().art, CardArt::Placeholder);
    assert!(view.slots.iter().all(|s| matches!(s.art, CardArt::Loaded(_))));
}

#[test]
fn failed_art_uses_placeholder_immediately() {
    let broken = "https://cdn.example/B.png";
    let mut frame = frame_with(HeadlessArt::default().with_failing(broken));
    deal(&mut frame, &["A", "B", "C", "D"], "N");
    let rec = frame.reconciler();
    assert!(rec.hand().is_visible());
    assert_eq!(rec.ui().last_hand().unwrap().slots[1].art, CardArt::Placeholder);
}

#[test]
fn completion_for_superseded_hand_is_ignored() {
    let slow = "https://cdn.example/A.png";
    let mut frame = frame_with(HeadlessArt::default().with_pending(slow));
    deal(&mut frame, &["A", "B"], "N");
    let old = frame.reconciler().art().pending_tickets()[0];
    deal(&mut frame, &["A", "B"], "N");

    frame.sender().art_resolved(old, Ok(ArtHandle(1))).unwrap();
    frame.tick(DT);
    assert!(!frame.reconciler().hand().is_visible());

    let current = *frame.reconciler().art().pending_tickets().last().unwrap();
    frame.sender().art_resolved(current, Ok(ArtHandle(2))).unwrap();
    frame.tick(DT);
    assert!(frame.reconciler().hand().is_visible());
}
