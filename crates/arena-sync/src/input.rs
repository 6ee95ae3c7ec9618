//! Play-card input: pointer release to outbound request.
//!
//! Releasing a dragged card over the board turns the pointer's world hit
//! into a grid cell, checks that the cell is on the local player's half,
//! remembers which slot was played (so the following refresh can replace
//! it) and sends the play to the hub.

use arena_spatial::calibration::GridCell;
use arena_spatial::mapper::BoardSide;
use glam::Vec3;
use tracing::{debug, warn};

use crate::ports::{ArtLoader, Transport, UiSink, VisualFactory};
use crate::protocol::OutboundCall;
use crate::reconciler::Reconciler;
use crate::TransportError;

/// A play that was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRequest {
    pub card_id: String,
    pub cell: GridCell,
    pub slot_index: usize,
}

/// Why a release did not produce a play.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayRejected {
    /// The pointer was not over the board.
    #[error("pointer is not over the board")]
    NoSurface,

    #[error("cell {cell} is outside the {side:?} half")]
    WrongSide { cell: GridCell, side: BoardSide },

    #[error("card '{0}' is not in hand")]
    UnknownCard(String),

    #[error("play could not be sent: {0}")]
    Transport(#[from] TransportError),
}

impl<V: VisualFactory, U: UiSink, A: ArtLoader> Reconciler<V, U, A> {
    /// Handle a card released at `pointer_hit` (`None` when the pointer ray
    /// hit nothing).
    ///
    /// On success the play is recorded in the hand and sent through
    /// `transport`. A rejected release leaves the hand untouched.
    pub fn release_card<T: Transport>(
        &mut self,
        transport: &mut T,
        card_id: &str,
        pointer_hit: Option<Vec3>,
    ) -> Result<PlayRequest, PlayRejected> {
        let Some(hit) = pointer_hit else {
            debug!(card_id, "card released off the board");
            return Err(PlayRejected::NoSurface);
        };

        let cell = self.mapper.world_to_grid(hit);
        if !self.mapper.is_playable(self.local_side, cell) {
            debug!(card_id, %cell, side = ?self.local_side, "released on the wrong side");
            return Err(PlayRejected::WrongSide {
                cell,
                side: self.local_side,
            });
        }

        if self.hand.card_index(card_id).is_none() {
            warn!(card_id, "released card is not in hand");
            return Err(PlayRejected::UnknownCard(card_id.to_owned()));
        }

        let call = OutboundCall::PlayCard {
            session_id: self.session.session_id.clone(),
            user_id: self.session.user_id.clone(),
            card_id: card_id.to_owned(),
            cell,
        };
        if let Err(err) = transport.invoke(call) {
            warn!(card_id, %cell, error = %err, "play could not be sent");
            return Err(err.into());
        }

        let slot_index = self
            .hand
            .record_play(card_id)
            .ok_or_else(|| PlayRejected::UnknownCard(card_id.to_owned()))?;
        debug!(card_id, %cell, slot_index, "play sent");
        Ok(PlayRequest {
            card_id: card_id.to_owned(),
            cell,
            slot_index,
        })
    }

    /// Ask the hub to join this match.
    pub fn join_match<T: Transport>(&mut self, transport: &mut T) -> Result<(), TransportError> {
        transport.invoke(OutboundCall::JoinGame {
            session_id: self.session.session_id.clone(),
            user_id: self.session.user_id.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
