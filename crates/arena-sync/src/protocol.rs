//! Hub wire format: decoding inbound events and encoding outbound calls.
//!
//! The game hub delivers events as `(method, payload)` pairs where the
//! payload is JSON. Some transports hand the payload over as a JSON *string*
//! holding the document; [`decode`] accepts both.
//!
//! Wire grid convention: `x` is the column and `y` is the row. Everything
//! past this module uses [`GridCell`] with named fields.
//!
//! | method         | variant                              |
//! |----------------|--------------------------------------|
//! | `JoinedToGame` | [`Notification::Joined`]             |
//! | `CardSpawned`  | [`Notification::UnitSpawned`]        |
//! | `TowerSpawned` | [`Notification::TowerSpawned`]       |
//! | `TroopMoved`   | [`Notification::UnitMoved`]          |
//! | `UnitDamaged`  | [`Notification::UnitDamaged`]        |
//! | `UnitKilled`   | [`Notification::UnitKilled`]         |
//! | `Hand`         | [`Notification::Hand`]               |
//! | `RefreshHand`  | [`Notification::HandRefreshed`]      |
//! | `NewElixir`    | [`Notification::Elixir`]             |
//! | `EndGame`      | [`Notification::MatchEnded`]         |
//! | `Error`        | [`Notification::ServerError`]        |

use arena_spatial::calibration::GridCell;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::entity::EntityId;
use crate::notification::{
    CardInfo, DamageInfo, EndInfo, HandInfo, JoinInfo, KillInfo, MoveInfo, Notification,
    PlayerElixir, RefreshInfo, SpawnInfo,
};
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardSpawnedDto {
    unit_id: String,
    card_played_id: String,
    x: i32,
    y: i32,
    #[serde(default)]
    health: Option<i32>,
    #[serde(default)]
    max_health: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TowerDto {
    id: String,
    tower_template_id: String,
    x: i32,
    y: i32,
    #[serde(default)]
    health: Option<i32>,
    #[serde(default)]
    max_health: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TroopMovedDto {
    troop_id: String,
    card_id: String,
    x: i32,
    y: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitDamagedDto {
    #[serde(default)]
    attacker_id: Option<String>,
    target_id: String,
    #[serde(default)]
    damage: i32,
    health: i32,
    max_health: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitKilledDto {
    #[serde(default)]
    attacker_id: Option<String>,
    target_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerCardDto {
    player_card_id: String,
    card_id: String,
    #[serde(default)]
    elixir: u32,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandDto {
    hand: Vec<PlayerCardDto>,
    #[serde(default)]
    next_card: Option<PlayerCardDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshHandDto {
    #[serde(default)]
    card_to_put: Option<PlayerCardDto>,
    #[serde(default)]
    next_card: Option<PlayerCardDto>,
    elixir: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndGameDto {
    winner_id: String,
    towers_winner: u32,
    towers_losser: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerStateDto {
    id: String,
    current_elixir: f32,
}

#[derive(Debug, Default, Deserialize)]
struct ArenaDto {
    #[serde(default)]
    towers: Vec<TowerDto>,
    #[serde(default)]
    entities: Vec<CardSpawnedDto>,
}

#[derive(Debug, Deserialize)]
struct JoinedDto {
    #[serde(default)]
    arena: ArenaDto,
    #[serde(default)]
    players: Vec<PlayerStateDto>,
}

// ---------------------------------------------------------------------------
// DTO -> notification
// ---------------------------------------------------------------------------

fn wire_cell(x: i32, y: i32) -> GridCell {
    GridCell::new(y, x)
}

impl From<CardSpawnedDto> for SpawnInfo {
    fn from(dto: CardSpawnedDto) -> Self {
        Self {
            entity_id: EntityId::from(dto.unit_id),
            type_id: dto.card_played_id,
            cell: wire_cell(dto.x, dto.y),
            health: dto.health.or(dto.max_health).unwrap_or(0),
            max_health: dto.max_health,
        }
    }
}

impl From<TowerDto> for SpawnInfo {
    fn from(dto: TowerDto) -> Self {
        Self {
            entity_id: EntityId::from(dto.id),
            type_id: dto.tower_template_id,
            cell: wire_cell(dto.x, dto.y),
            health: dto.health.or(dto.max_health).unwrap_or(0),
            max_health: dto.max_health,
        }
    }
}

impl From<PlayerCardDto> for CardInfo {
    fn from(dto: PlayerCardDto) -> Self {
        Self {
            card_id: dto.player_card_id,
            catalog_id: dto.card_id,
            cost: dto.elixir,
            image_ref: dto.image_url.unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// decode
// ---------------------------------------------------------------------------

/// Decode one hub event into a [`Notification`].
///
/// # Errors
///
/// - [`ProtocolError::UnknownMethod`] for methods the client does not handle.
/// - [`ProtocolError::EmptyPayload`] for `null` payloads.
/// - [`ProtocolError::Malformed`] when the JSON does not match the event.
/// - [`ProtocolError::InvalidNumber`] for an unparsable elixir value.
pub fn decode(method: &str, payload: &Value) -> Result<Notification, ProtocolError> {
    if payload.is_null() {
        return Err(ProtocolError::EmptyPayload {
            method: method.to_owned(),
        });
    }

    let notification = match method {
        "JoinedToGame" => {
            let dto: JoinedDto = parse(method, payload)?;
            Notification::Joined(JoinInfo {
                towers: dto.arena.towers.into_iter().map(SpawnInfo::from).collect(),
                entities: dto.arena.entities.into_iter().map(SpawnInfo::from).collect(),
                players: dto
                    .players
                    .into_iter()
                    .map(|p| PlayerElixir {
                        player_id: p.id,
                        elixir: p.current_elixir,
                    })
                    .collect(),
            })
        }
        "CardSpawned" => {
            Notification::UnitSpawned(parse::<CardSpawnedDto>(method, payload)?.into())
        }
        "TowerSpawned" => Notification::TowerSpawned(parse::<TowerDto>(method, payload)?.into()),
        "TroopMoved" => {
            let dto: TroopMovedDto = parse(method, payload)?;
            Notification::UnitMoved(MoveInfo {
                entity_id: EntityId::from(dto.troop_id),
                type_id: dto.card_id,
                cell: wire_cell(dto.x, dto.y),
            })
        }
        "UnitDamaged" => {
            let dto: UnitDamagedDto = parse(method, payload)?;
            Notification::UnitDamaged(DamageInfo {
                attacker_id: dto.attacker_id.map(EntityId::from),
                target_id: EntityId::from(dto.target_id),
                damage: dto.damage,
                health: dto.health,
                max_health: dto.max_health,
            })
        }
        "UnitKilled" => {
            let dto: UnitKilledDto = parse(method, payload)?;
            Notification::UnitKilled(KillInfo {
                attacker_id: dto.attacker_id.map(EntityId::from),
                target_id: EntityId::from(dto.target_id),
            })
        }
        "Hand" => {
            let dto: HandDto = parse(method, payload)?;
            Notification::Hand(HandInfo {
                cards: dto.hand.into_iter().map(CardInfo::from).collect(),
                next_card: dto.next_card.map(CardInfo::from),
            })
        }
        "RefreshHand" => {
            let dto: RefreshHandDto = parse(method, payload)?;
            Notification::HandRefreshed(RefreshInfo {
                played_card: dto.card_to_put.map(CardInfo::from),
                next_card: dto.next_card.map(CardInfo::from),
                elixir: dto.elixir,
            })
        }
        "NewElixir" => Notification::Elixir(elixir_value(method, payload)?),
        "EndGame" => {
            let dto: EndGameDto = parse(method, payload)?;
            Notification::MatchEnded(EndInfo {
                winner_id: dto.winner_id,
                winner_towers: dto.towers_winner,
                loser_towers: dto.towers_losser,
            })
        }
        "Error" => Notification::ServerError(match payload {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        other => return Err(ProtocolError::UnknownMethod(other.to_owned())),
    };

    Ok(notification)
}

/// Deserialize a payload, unwrapping a JSON document delivered as a string.
fn parse<T: DeserializeOwned>(method: &str, payload: &Value) -> Result<T, ProtocolError> {
    let result = match payload {
        Value::String(text) => serde_json::from_str(text),
        other => T::deserialize(other),
    };
    result.map_err(|source| ProtocolError::Malformed {
        method: method.to_owned(),
        source,
    })
}

/// Elixir arrives as a bare number, a numeric string, or `{"value": n}`.
fn elixir_value(method: &str, payload: &Value) -> Result<f32, ProtocolError> {
    let invalid = || ProtocolError::InvalidNumber {
        method: method.to_owned(),
        value: payload.to_string(),
    };
    let value = match payload {
        Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        Value::Object(map) => map.get("value").and_then(Value::as_f64).ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(value as f32)
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A call from the client to the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutboundCall {
    JoinGame {
        session_id: String,
        user_id: String,
    },
    PlayCard {
        session_id: String,
        user_id: String,
        card_id: String,
        cell: GridCell,
    },
}

impl OutboundCall {
    /// Hub method name and positional arguments.
    ///
    /// The user is identified by the connection's access token, so it is not
    /// repeated in the arguments.
    pub fn wire(&self) -> (&'static str, Vec<Value>) {
        match self {
            Self::JoinGame { session_id, .. } => ("JoinGame", vec![json!(session_id)]),
            Self::PlayCard {
                session_id,
                card_id,
                cell,
                ..
            } => (
                "SpawnCard",
                vec![json!(session_id), json!(card_id), json!(cell.col), json!(cell.row)],
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
