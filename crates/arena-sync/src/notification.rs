//! Typed server notifications.
//!
//! The transport hands the core one [`Notification`] per server event. Raw
//! payloads never reach the reconciler: [`crate::protocol`] turns hub method
//! names and JSON into these variants on the delivery thread.
//!
//! Grid coordinates are already semantic here (`row`, `col`); the wire's
//! `x`/`y` convention stays in the protocol module.

use arena_spatial::calibration::GridCell;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A unit or tower appearing on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnInfo {
    pub entity_id: EntityId,
    pub type_id: String,
    pub cell: GridCell,
    pub health: i32,
    /// Absent on some spawn events; the health bar then starts full.
    pub max_health: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveInfo {
    pub entity_id: EntityId,
    pub type_id: String,
    pub cell: GridCell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageInfo {
    pub attacker_id: Option<EntityId>,
    pub target_id: EntityId,
    pub damage: i32,
    pub health: i32,
    pub max_health: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillInfo {
    pub attacker_id: Option<EntityId>,
    pub target_id: EntityId,
}

/// One card as shown in the hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardInfo {
    /// Player-card instance id; this is what a play request names.
    pub card_id: String,
    /// Card archetype id.
    pub catalog_id: String,
    pub cost: u32,
    pub image_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandInfo {
    pub cards: Vec<CardInfo>,
    pub next_card: Option<CardInfo>,
}

/// Sent after a successful play: the card that takes the played slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshInfo {
    pub played_card: Option<CardInfo>,
    pub next_card: Option<CardInfo>,
    pub elixir: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndInfo {
    pub winner_id: String,
    pub winner_towers: u32,
    pub loser_towers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerElixir {
    pub player_id: String,
    pub elixir: f32,
}

/// Initial state delivered on joining a match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JoinInfo {
    pub towers: Vec<SpawnInfo>,
    pub entities: Vec<SpawnInfo>,
    pub players: Vec<PlayerElixir>,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A decoded server event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Notification {
    Joined(JoinInfo),
    UnitSpawned(SpawnInfo),
    TowerSpawned(SpawnInfo),
    UnitMoved(MoveInfo),
    UnitDamaged(DamageInfo),
    UnitKilled(KillInfo),
    Hand(HandInfo),
    HandRefreshed(RefreshInfo),
    Elixir(f32),
    MatchEnded(EndInfo),
    ServerError(String),
}

impl Notification {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Joined(_) => "joined",
            Self::UnitSpawned(_) => "unit_spawned",
            Self::TowerSpawned(_) => "tower_spawned",
            Self::UnitMoved(_) => "unit_moved",
            Self::UnitDamaged(_) => "unit_damaged",
            Self::UnitKilled(_) => "unit_killed",
            Self::Hand(_) => "hand",
            Self::HandRefreshed(_) => "hand_refreshed",
            Self::Elixir(_) => "elixir",
            Self::MatchEnded(_) => "match_ended",
            Self::ServerError(_) => "server_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_json_shape() {
        let n = Notification::UnitKilled(KillInfo {
            attacker_id: None,
            target_id: EntityId::from("u1"),
        });
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "unit_killed");
        assert_eq!(json["data"]["target_id"], "u1");
        let back: Notification = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), "unit_killed");
    }
}
