//! The reconciliation core.
//!
//! [`Reconciler`] owns everything that makes up the client's view of one
//! match: the [`EntityRegistry`], the [`SpatialMapper`], the
//! [`TaskScheduler`], the [`HandReconciler`], the elixir gauge and the three
//! collaborators it drives. It is not thread-safe and is not meant to be:
//! the [`FrameLoop`](crate::frame::FrameLoop) calls it from one thread.
//!
//! Faults never propagate out of [`apply`](Reconciler::apply). Unknown ids,
//! duplicate spawns, missing assets and malformed refreshes are logged and
//! skipped so one bad event cannot stall the ones behind it.
//!
//! # Example
//!
//! ```
//! use arena_sync::prelude::*;
//!
//! let mut rec = Reconciler::new(
//!     &ClientConfig::default(),
//!     MatchSession::new("s", "me"),
//!     HeadlessScene::new(),
//!     HeadlessUi::default(),
//!     HeadlessArt::default(),
//! )
//! .unwrap();
//!
//! let outcome = rec.register("u1", "caveman", GridCell::new(5, 3), 100, Some(100));
//! assert_eq!(outcome, RegisterOutcome::Registered);
//! assert!(rec.apply_damage("u1", 40, 100));
//! assert_eq!(rec.health_fraction("u1"), Some(0.4));
//! assert!(rec.remove("u1"));
//! assert!(!rec.remove("u1"));
//! ```

use arena_spatial::calibration::GridCell;
use arena_spatial::mapper::{BoardSide, SpatialMapper};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::{ClientConfig, TimingConfig};
use crate::entity::{health_fraction, EntityId, HealthBarHandle, LiveEntity, VisualHandle};
use crate::hand::{ElixirGauge, HandReconciler};
use crate::inbox::Inbound;
use crate::notification::{EndInfo, JoinInfo, Notification, SpawnInfo};
use crate::ports::{
    ArtHandle, ArtLoader, ArtTicket, ElixirReading, MatchResult, UiSink, VisualFactory,
};
use crate::registry::EntityRegistry;
use crate::scheduler::{AdvanceReport, TaskScheduler};
use crate::ConfigError;

// ---------------------------------------------------------------------------
// MatchSession
// ---------------------------------------------------------------------------

/// Identity of the local player in the current match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSession {
    pub session_id: String,
    pub user_id: String,
}

impl MatchSession {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// RegisterOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    /// The id is live or was already removed this match; nothing changed.
    Duplicate,
    /// Empty id or no visual for the type; nothing changed.
    Failed,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler<V, U, A> {
    pub(crate) mapper: SpatialMapper,
    pub(crate) registry: EntityRegistry,
    pub(crate) scheduler: TaskScheduler,
    pub(crate) hand: HandReconciler,
    pub(crate) elixir: ElixirGauge,
    pub(crate) session: MatchSession,
    pub(crate) timing: TimingConfig,
    pub(crate) local_side: BoardSide,
    clear_on_match_end: bool,
    factory: V,
    ui: U,
    art: A,
}

impl<V: VisualFactory, U: UiSink, A: ArtLoader> Reconciler<V, U, A> {
    /// Build a reconciler for one match.
    ///
    /// # Errors
    ///
    /// Returns the validation error when `config` is unusable.
    pub fn new(
        config: &ClientConfig,
        session: MatchSession,
        factory: V,
        ui: U,
        art: A,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            mapper: config.build_mapper()?,
            registry: EntityRegistry::new(),
            scheduler: TaskScheduler::new(config.timing.turn_rate, config.timing.hit_flash_secs),
            hand: HandReconciler::new(config.hand_slots, config.timing.art_timeout_secs),
            elixir: ElixirGauge::new(config.elixir_max),
            session,
            timing: config.timing.clone(),
            local_side: config.local_side,
            clear_on_match_end: config.clear_on_match_end,
            factory,
            ui,
            art,
        })
    }

    // -- lifecycle ----------------------------------------------------------

    /// Instantiate and track a new entity.
    ///
    /// The health bar starts at `health / max_health`, or full when the spawn
    /// did not say what the maximum is.
    pub fn register(
        &mut self,
        id: impl Into<EntityId>,
        type_id: &str,
        cell: GridCell,
        health: i32,
        max_health: Option<i32>,
    ) -> RegisterOutcome {
        let id = id.into();
        if id.is_empty() {
            warn!(type_id, %cell, "spawn without an entity id, ignored");
            return RegisterOutcome::Failed;
        }
        if let Err(refusal) = self.registry.check_insert(id.as_str()) {
            warn!(%id, ?refusal, "duplicate spawn ignored");
            return RegisterOutcome::Duplicate;
        }

        let placement = self.mapper.placement(type_id, cell);
        let Some(visual) = self.factory.instantiate(type_id, placement) else {
            warn!(%id, type_id, "no visual for entity type, spawn ignored");
            return RegisterOutcome::Failed;
        };
        let health_bar = self.factory.health_bar(visual);
        let fraction = match max_health {
            Some(max) => health_fraction(health, max),
            None => 1.0,
        };
        if let Some(bar) = health_bar {
            self.ui.health_changed(bar, fraction);
        }

        let entity = LiveEntity {
            id: id.clone(),
            type_id: type_id.to_owned(),
            spawn_cell: cell,
            visual,
            health_bar,
            health_fraction: fraction,
            position: placement.position,
            rotation: placement.rotation,
        };
        if let Err((refusal, rejected)) = self.registry.insert(entity) {
            warn!(%id, ?refusal, "insert refused after instantiation");
            self.destroy_visuals(&rejected);
            return RegisterOutcome::Duplicate;
        }

        debug!(%id, type_id, %cell, fraction, "entity registered");
        RegisterOutcome::Registered
    }

    fn register_spawn(&mut self, spawn: &SpawnInfo) -> RegisterOutcome {
        self.register(
            spawn.entity_id.clone(),
            &spawn.type_id,
            spawn.cell,
            spawn.health,
            spawn.max_health,
        )
    }

    /// Glide `id` toward `target` over `duration` seconds, replacing any move
    /// already in flight. A non-positive duration snaps.
    ///
    /// Returns `false` for unknown ids.
    pub fn move_to(&mut self, id: &str, target: Vec3, duration: f32) -> bool {
        let Some(entity) = self.registry.get_mut(id) else {
            debug!(id, "move for unknown entity ignored");
            return false;
        };
        if duration.is_finite() && duration > 0.0 {
            self.scheduler
                .start_move(entity.id.clone(), entity.visual, entity.position, target, duration);
        } else {
            self.scheduler.cancel_move(id);
            entity.position = target;
            self.factory
                .set_transform(entity.visual, entity.position, entity.rotation);
        }
        true
    }

    /// Update the health bar and flash the visual.
    ///
    /// Returns `false` for unknown ids. Never removes the entity; only a kill
    /// notification does that.
    pub fn apply_damage(&mut self, id: &str, health: i32, max_health: i32) -> bool {
        let Some(entity) = self.registry.get_mut(id) else {
            debug!(id, "damage for unknown entity ignored");
            return false;
        };
        let fraction = health_fraction(health, max_health);
        entity.health_fraction = fraction;
        if let Some(bar) = entity.health_bar {
            self.ui.health_changed(bar, fraction);
        }
        self.scheduler
            .start_flash(entity.id.clone(), entity.visual, &mut self.factory);
        true
    }

    /// Cancel tasks, destroy the visuals and retire the id.
    ///
    /// Returns `false` for unknown ids.
    pub fn remove(&mut self, id: &str) -> bool {
        self.scheduler.cancel(id);
        match self.registry.remove(id) {
            Some(entity) => {
                self.destroy_visuals(&entity);
                debug!(id, "entity removed");
                true
            }
            None => {
                debug!(id, "remove for unknown entity ignored");
                false
            }
        }
    }

    /// Destroy every entity and forget retired ids.
    pub fn clear_all(&mut self) {
        self.scheduler.cancel_all();
        let drained = self.registry.clear();
        let count = drained.len();
        for entity in &drained {
            self.destroy_visuals(entity);
        }
        debug!(count, "registry cleared");
    }

    fn destroy_visuals(&mut self, entity: &LiveEntity) {
        if let Some(bar) = entity.health_bar {
            self.factory.destroy_health_bar(bar);
        }
        self.factory.destroy(entity.visual);
    }

    // -- notifications ------------------------------------------------------

    /// Apply one server notification. Returns whether it changed anything.
    pub fn apply(&mut self, notification: Notification) -> bool {
        match notification {
            Notification::Joined(info) => self.apply_joined(info),
            Notification::UnitSpawned(spawn) | Notification::TowerSpawned(spawn) => {
                self.register_spawn(&spawn) == RegisterOutcome::Registered
            }
            Notification::UnitMoved(mv) => {
                let type_id = if mv.type_id.is_empty() {
                    self.registry
                        .get(mv.entity_id.as_str())
                        .map(|e| e.type_id.clone())
                        .unwrap_or_default()
                } else {
                    mv.type_id
                };
                let target = self.mapper.grid_to_world(&type_id, mv.cell);
                let duration = self.timing.move_duration_secs;
                self.move_to(mv.entity_id.as_str(), target, duration)
            }
            Notification::UnitDamaged(hit) => {
                self.apply_damage(hit.target_id.as_str(), hit.health, hit.max_health)
            }
            Notification::UnitKilled(kill) => self.remove(kill.target_id.as_str()),
            Notification::Hand(hand) => {
                self.hand
                    .on_hand_received(hand.cards, hand.next_card, &mut self.art, &mut self.ui);
                true
            }
            Notification::HandRefreshed(refresh) => {
                let accepted = self.hand.on_refresh_received(
                    refresh.played_card,
                    refresh.next_card,
                    &mut self.art,
                    &mut self.ui,
                );
                if accepted {
                    self.set_elixir(refresh.elixir);
                }
                accepted
            }
            Notification::Elixir(value) => {
                self.set_elixir(value);
                true
            }
            Notification::MatchEnded(end) => {
                self.apply_match_end(end);
                true
            }
            Notification::ServerError(message) => {
                error!(message = %message, "server reported an error");
                false
            }
        }
    }

    /// Route one drained inbox item.
    pub fn handle_inbound(&mut self, item: Inbound) -> bool {
        match item {
            Inbound::Server(notification) => self.apply(notification),
            Inbound::ArtResolved { ticket, outcome } => {
                self.art_resolved(ticket, outcome);
                true
            }
        }
    }

    fn apply_joined(&mut self, info: JoinInfo) -> bool {
        let mut registered = 0usize;
        for spawn in info.towers.iter().chain(info.entities.iter()) {
            if self.register_spawn(spawn) == RegisterOutcome::Registered {
                registered += 1;
            }
        }
        match info
            .players
            .iter()
            .find(|p| p.player_id == self.session.user_id)
        {
            Some(me) => {
                self.set_elixir(me.elixir);
            }
            None => warn!(
                user_id = %self.session.user_id,
                "local player missing from join state"
            ),
        }
        debug!(registered, "joined match");
        true
    }

    fn apply_match_end(&mut self, end: EndInfo) {
        let local_won = end.winner_id == self.session.user_id;
        let (own_towers, rival_towers) = if local_won {
            (end.winner_towers, end.loser_towers)
        } else {
            (end.loser_towers, end.winner_towers)
        };
        let result = MatchResult {
            winner_id: end.winner_id,
            local_won,
            own_towers,
            rival_towers,
        };
        debug!(local_won, own_towers, rival_towers, "match ended");
        self.ui.match_ended(&result);
        if self.clear_on_match_end {
            self.clear_all();
            self.hand.reset();
        }
    }

    fn set_elixir(&mut self, value: f32) -> ElixirReading {
        let reading = self.elixir.set(value);
        self.ui.elixir_changed(reading);
        reading
    }

    pub fn art_resolved(&mut self, ticket: ArtTicket, outcome: Result<ArtHandle, String>) {
        self.hand.art_resolved(ticket, outcome, &mut self.ui);
    }

    // -- time ---------------------------------------------------------------

    /// Step move and flash tasks by `dt` seconds.
    pub fn advance_tasks(&mut self, dt: f32) -> AdvanceReport {
        self.scheduler
            .advance(dt, &mut self.registry, &mut self.factory)
    }

    /// Advance the art clock; returns how many loads timed out.
    pub fn expire_art(&mut self, dt: f32) -> usize {
        self.hand.advance(dt, &mut self.ui)
    }

    // -- lookups ------------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<VisualHandle> {
        self.registry.get(id).map(|e| e.visual)
    }

    pub fn try_get_health_bar(&self, id: &str) -> Option<HealthBarHandle> {
        self.registry.get(id).and_then(|e| e.health_bar)
    }

    pub fn health_fraction(&self, id: &str) -> Option<f32> {
        self.registry.get(id).map(|e| e.health_fraction)
    }

    pub fn position(&self, id: &str) -> Option<Vec3> {
        self.registry.get(id).map(|e| e.position)
    }

    pub fn rotation(&self, id: &str) -> Option<Quat> {
        self.registry.get(id).map(|e| e.rotation)
    }

    pub fn entity(&self, id: &str) -> Option<&LiveEntity> {
        self.registry.get(id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    // -- accessors ----------------------------------------------------------

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn mapper(&self) -> &SpatialMapper {
        &self.mapper
    }

    pub fn hand(&self) -> &HandReconciler {
        &self.hand
    }

    pub fn elixir(&self) -> ElixirReading {
        self.elixir.reading()
    }

    pub fn session(&self) -> &MatchSession {
        &self.session
    }

    pub fn local_side(&self) -> BoardSide {
        self.local_side
    }

    pub fn factory(&self) -> &V {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut V {
        &mut self.factory
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    pub fn art(&self) -> &A {
        &self.art
    }

    pub fn art_mut(&mut self) -> &mut A {
        &mut self.art
    }
}

impl<V, U, A> std::fmt::Debug for Reconciler<V, U, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("session", &self.session)
            .field("live", &self.registry.len())
            .field("tasks", &self.scheduler.active_count())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
