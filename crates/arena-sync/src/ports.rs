//! Collaborator traits at the edge of the core.
//!
//! The reconciler never renders, loads images or touches the network itself.
//! It drives four collaborators:
//!
//! - [`VisualFactory`]: creates, moves, tints and destroys scene objects.
//! - [`UiSink`]: receives derived state (health, hand, elixir, match end).
//!   Push only; the core never reads UI state back.
//! - [`ArtLoader`]: starts card-art loads; results come back through the
//!   [`Inbox`](crate::inbox::Inbox).
//! - [`Transport`]: accepts outbound calls.
//!
//! [`crate::headless`] provides in-memory implementations of all four.

use arena_spatial::mapper::Placement;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::entity::{HealthBarHandle, VisualHandle};
use crate::protocol::OutboundCall;
use crate::TransportError;

// ---------------------------------------------------------------------------
// VisualFactory
// ---------------------------------------------------------------------------

/// Transient colouring of a visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tint {
    Normal,
    Hit,
}

pub trait VisualFactory {
    /// Instantiate the visual for `type_id`. `None` when no asset exists for
    /// the type; the entity is then not registered.
    fn instantiate(&mut self, type_id: &str, placement: Placement) -> Option<VisualHandle>;

    /// The health bar parented under `visual`, if its asset has one.
    fn health_bar(&mut self, visual: VisualHandle) -> Option<HealthBarHandle>;

    fn set_transform(&mut self, visual: VisualHandle, position: Vec3, rotation: Quat);

    fn set_tint(&mut self, visual: VisualHandle, tint: Tint);

    fn destroy_health_bar(&mut self, bar: HealthBarHandle);

    fn destroy(&mut self, visual: VisualHandle);
}

// ---------------------------------------------------------------------------
// UiSink
// ---------------------------------------------------------------------------

/// Card art for one slot once its load settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardArt {
    Loaded(ArtHandle),
    /// Load failed, timed out, or the card had no image.
    Placeholder,
}

/// One rendered hand slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    /// Identity given to the slot's draggable card.
    pub card_id: String,
    pub cost: u32,
    pub art: CardArt,
}

/// A fully resolved hand, ready to show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandView {
    pub slots: Vec<SlotView>,
    pub next: Option<SlotView>,
}

/// Elixir bar state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElixirReading {
    /// Clamped value.
    pub value: f32,
    pub max: f32,
    /// `value / max`, for the bar fill.
    pub fill: f32,
    /// Whole units shown in the label.
    pub whole: u32,
}

impl ElixirReading {
    /// Label text, e.g. `"3/10"`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.whole, self.max.floor() as u32)
    }
}

/// End-of-match summary from the local player's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub winner_id: String,
    pub local_won: bool,
    pub own_towers: u32,
    pub rival_towers: u32,
}

pub trait UiSink {
    fn health_changed(&mut self, bar: HealthBarHandle, fraction: f32);

    /// The hand is being rebuilt; hide it until the next
    /// [`hand_changed`](Self::hand_changed).
    fn hand_hidden(&mut self);

    fn hand_changed(&mut self, view: &HandView);

    fn elixir_changed(&mut self, reading: ElixirReading);

    fn match_ended(&mut self, result: &MatchResult);
}

// ---------------------------------------------------------------------------
// ArtLoader
// ---------------------------------------------------------------------------

/// Opaque reference to a loaded card image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtHandle(pub u64);

/// Which hand position an art load is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtSlot {
    Hand(usize),
    Next,
}

/// Identifies one art request within one hand reveal round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtTicket {
    pub generation: u64,
    pub slot: ArtSlot,
}

/// Immediate answer to an art request.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtPoll {
    /// Already available (e.g. cached).
    Ready(ArtHandle),
    Failed(String),
    /// Will be reported later as
    /// [`Inbound::ArtResolved`](crate::inbox::Inbound::ArtResolved).
    Pending,
}

pub trait ArtLoader {
    fn request(&mut self, ticket: ArtTicket, image_ref: &str) -> ArtPoll;
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

pub trait Transport {
    /// Send an outbound call. Delivery and retries are the transport's concern.
    fn invoke(&mut self, call: OutboundCall) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elixir_label_shows_whole_units() {
        let reading = ElixirReading {
            value: 3.5,
            max: 10.0,
            fill: 0.35,
            whole: 3,
        };
        assert_eq!(reading.label(), "3/10");
    }
}
