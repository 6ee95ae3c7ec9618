//! Hand state: card slots, play bookkeeping, art reveal rounds and elixir.
//!
//! The hand is a short ordered list of cards plus an optional "next card"
//! preview. Two server events change it:
//!
//! - **Hand**: the full hand. Replaces everything.
//! - **Refresh**: sent after a successful play, carrying the card that takes
//!   the played slot. The slot is found by the remembered play index, then by
//!   the remembered card id, and as a last resort the card is appended.
//!
//! Every change starts a new *reveal round*. The hand is hidden, art is
//! requested for every slot and the preview, and the hand is shown again
//! only once every request has settled (loaded, failed or timed out). Each
//! round has a generation number; late art completions from an older round
//! are ignored.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::notification::CardInfo;
use crate::ports::{
    ArtHandle, ArtLoader, ArtPoll, ArtSlot, ArtTicket, CardArt, ElixirReading, HandView, SlotView,
    UiSink,
};

// ---------------------------------------------------------------------------
// HandReconciler
// ---------------------------------------------------------------------------

/// The most recent play the local player made, awaiting its refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPlay {
    pub index: usize,
    pub card_id: String,
}

#[derive(Debug, Clone)]
pub struct HandReconciler {
    slots: Vec<CardInfo>,
    next: Option<CardInfo>,
    last_play: Option<PendingPlay>,
    generation: u64,
    resolved: BTreeMap<ArtSlot, CardArt>,
    /// Outstanding loads and their deadlines on `clock`.
    pending: BTreeMap<ArtSlot, f32>,
    visible: bool,
    clock: f32,
    art_timeout: f32,
    visible_slots: usize,
}

impl HandReconciler {
    pub fn new(visible_slots: usize, art_timeout: f32) -> Self {
        Self {
            slots: Vec::new(),
            next: None,
            last_play: None,
            generation: 0,
            resolved: BTreeMap::new(),
            pending: BTreeMap::new(),
            visible: false,
            clock: 0.0,
            art_timeout,
            visible_slots,
        }
    }

    // -- server events ------------------------------------------------------

    /// Replace the whole hand and start a reveal round.
    pub fn on_hand_received<A: ArtLoader, U: UiSink>(
        &mut self,
        mut cards: Vec<CardInfo>,
        next: Option<CardInfo>,
        art: &mut A,
        ui: &mut U,
    ) {
        if cards.len() > self.visible_slots {
            warn!(
                received = cards.len(),
                slots = self.visible_slots,
                "hand larger than visible slots, extra cards ignored"
            );
            cards.truncate(self.visible_slots);
        }
        self.slots = cards;
        self.next = next;
        self.last_play = None;
        self.begin_round(art, ui);
    }

    /// Put the refreshed card into the played slot.
    ///
    /// Returns `false` (and forgets the pending play) when the refresh lacks
    /// either card; nothing else changes in that case.
    pub fn on_refresh_received<A: ArtLoader, U: UiSink>(
        &mut self,
        played: Option<CardInfo>,
        next: Option<CardInfo>,
        art: &mut A,
        ui: &mut U,
    ) -> bool {
        let (Some(card), Some(next)) = (played, next) else {
            warn!("refresh without replacement or next card, discarded");
            self.last_play = None;
            return false;
        };

        let target = self.last_play.as_ref().and_then(|play| {
            if play.index < self.slots.len() {
                Some(play.index)
            } else {
                self.card_index(&play.card_id)
            }
        });
        match target {
            Some(index) => {
                debug!(index, card_id = %card.card_id, "replacing played slot");
                self.slots[index] = card;
            }
            None => {
                debug!(card_id = %card.card_id, "played slot unknown, appending");
                self.slots.push(card);
            }
        }

        self.next = Some(next);
        self.last_play = None;
        self.begin_round(art, ui);
        true
    }

    // -- local input --------------------------------------------------------

    /// Remember that `card_id` was played. Last write wins.
    ///
    /// Returns the slot index, or `None` if the card is not in hand.
    pub fn record_play(&mut self, card_id: &str) -> Option<usize> {
        let index = self.card_index(card_id)?;
        self.last_play = Some(PendingPlay {
            index,
            card_id: card_id.to_owned(),
        });
        Some(index)
    }

    pub fn card_index(&self, card_id: &str) -> Option<usize> {
        self.slots.iter().position(|c| c.card_id == card_id)
    }

    // -- art ----------------------------------------------------------------

    fn begin_round<A: ArtLoader, U: UiSink>(&mut self, art: &mut A, ui: &mut U) {
        self.generation += 1;
        self.resolved.clear();
        self.pending.clear();
        self.visible = false;
        ui.hand_hidden();

        let requests: Vec<(ArtSlot, String)> = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, c)| (ArtSlot::Hand(i), c.image_ref.clone()))
            .chain(self.next.iter().map(|c| (ArtSlot::Next, c.image_ref.clone())))
            .collect();

        for (slot, image_ref) in requests {
            if image_ref.trim().is_empty() {
                self.resolved.insert(slot, CardArt::Placeholder);
                continue;
            }
            let ticket = ArtTicket {
                generation: self.generation,
                slot,
            };
            match art.request(ticket, &image_ref) {
                ArtPoll::Ready(handle) => {
                    self.resolved.insert(slot, CardArt::Loaded(handle));
                }
                ArtPoll::Failed(reason) => {
                    warn!(
                        image_ref = %image_ref,
                        reason = %reason,
                        "card art failed, using placeholder"
                    );
                    self.resolved.insert(slot, CardArt::Placeholder);
                }
                ArtPoll::Pending => {
                    self.pending.insert(slot, self.clock + self.art_timeout);
                }
            }
        }

        self.reveal_if_settled(ui);
    }

    /// Apply a late art completion. Stale tickets are ignored.
    pub fn art_resolved<U: UiSink>(
        &mut self,
        ticket: ArtTicket,
        outcome: Result<ArtHandle, String>,
        ui: &mut U,
    ) {
        if ticket.generation != self.generation || self.pending.remove(&ticket.slot).is_none() {
            debug!(
                generation = ticket.generation,
                current = self.generation,
                "ignoring stale art completion"
            );
            return;
        }
        let art = match outcome {
            Ok(handle) => CardArt::Loaded(handle),
            Err(reason) => {
                warn!(slot = ?ticket.slot, reason = %reason, "card art failed, using placeholder");
                CardArt::Placeholder
            }
        };
        self.resolved.insert(ticket.slot, art);
        self.reveal_if_settled(ui);
    }

    /// Advance the hand clock; overdue loads fall back to placeholders.
    ///
    /// Returns the number of loads that timed out.
    pub fn advance<U: UiSink>(&mut self, dt: f32, ui: &mut U) -> usize {
        if dt.is_finite() && dt > 0.0 {
            self.clock += dt;
        }
        let clock = self.clock;
        let expired: Vec<ArtSlot> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= clock)
            .map(|(slot, _)| *slot)
            .collect();
        for slot in &expired {
            warn!(?slot, "card art timed out, using placeholder");
            self.pending.remove(slot);
            self.resolved.insert(*slot, CardArt::Placeholder);
        }
        if !expired.is_empty() {
            self.reveal_if_settled(ui);
        }
        expired.len()
    }

    fn reveal_if_settled<U: UiSink>(&mut self, ui: &mut U) {
        if self.visible || !self.pending.is_empty() {
            return;
        }
        self.visible = true;
        if let Some(view) = self.view() {
            ui.hand_changed(&view);
        }
    }

    /// The fully resolved hand, or `None` while art is outstanding.
    pub fn view(&self) -> Option<HandView> {
        if !self.pending.is_empty() {
            return None;
        }
        let slot_view = |slot: ArtSlot, card: &CardInfo| SlotView {
            card_id: card.card_id.clone(),
            cost: card.cost,
            art: self
                .resolved
                .get(&slot)
                .copied()
                .unwrap_or(CardArt::Placeholder),
        };
        Some(HandView {
            slots: self
                .slots
                .iter()
                .enumerate()
                .map(|(i, c)| slot_view(ArtSlot::Hand(i), c))
                .collect(),
            next: self.next.as_ref().map(|c| slot_view(ArtSlot::Next, c)),
        })
    }

    /// Drop everything; used at match end.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.next = None;
        self.last_play = None;
        self.resolved.clear();
        self.pending.clear();
        self.visible = false;
        self.generation += 1;
    }

    // -- accessors ----------------------------------------------------------

    pub fn slots(&self) -> &[CardInfo] {
        &self.slots
    }

    pub fn next_card(&self) -> Option<&CardInfo> {
        self.next.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_play(&self) -> Option<&PendingPlay> {
        self.last_play.as_ref()
    }

    pub fn pending_art(&self) -> usize {
        self.pending.len()
    }
}

// ---------------------------------------------------------------------------
// ElixirGauge
// ---------------------------------------------------------------------------

/// Elixir bar model: clamps, and shows whole units only.
#[derive(Debug, Clone)]
pub struct ElixirGauge {
    max: f32,
    reading: ElixirReading,
}

impl ElixirGauge {
    pub fn new(max: f32) -> Self {
        let max = if max.is_finite() && max > 0.0 { max } else { 10.0 };
        Self {
            max,
            reading: ElixirReading {
                value: 0.0,
                max,
                fill: 0.0,
                whole: 0,
            },
        }
    }

    /// Store a new value and return what the bar should show.
    pub fn set(&mut self, value: f32) -> ElixirReading {
        let value = if value.is_finite() {
            value.clamp(0.0, self.max)
        } else {
            warn!(value, "non-finite elixir, showing zero");
            0.0
        };
        self.reading = ElixirReading {
            value,
            max: self.max,
            fill: value / self.max,
            whole: value.floor() as u32,
        };
        self.reading
    }

    pub fn reading(&self) -> ElixirReading {
        self.reading
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
