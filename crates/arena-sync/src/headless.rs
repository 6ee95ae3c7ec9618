//! In-memory collaborators for tests, tools and headless runs.
//!
//! - [`HeadlessScene`]: a [`VisualFactory`] that records objects, transforms,
//!   tints, destruction order and which threads touched it.
//! - [`HeadlessUi`]: a [`UiSink`] that keeps everything pushed to it.
//! - [`HeadlessArt`]: an [`ArtLoader`] with a per-ref cache and configurable
//!   pending/failing refs.
//! - [`RecordingTransport`]: a [`Transport`] that stores outbound calls.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::thread::{self, ThreadId};

use arena_spatial::mapper::Placement;
use glam::{Quat, Vec3};

use crate::entity::{HealthBarHandle, VisualHandle};
use crate::ports::{
    ArtHandle, ArtLoader, ArtPoll, ArtTicket, ElixirReading, HandView, MatchResult, Tint,
    Transport, UiSink, VisualFactory,
};
use crate::protocol::OutboundCall;
use crate::TransportError;

// ---------------------------------------------------------------------------
// HeadlessScene
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub type_id: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub tint: Tint,
    pub health_bar: Option<HealthBarHandle>,
}

#[derive(Debug, Default)]
pub struct HeadlessScene {
    next_handle: u64,
    objects: BTreeMap<VisualHandle, SceneObject>,
    live_bars: BTreeSet<HealthBarHandle>,
    missing_types: BTreeSet<String>,
    barless_types: BTreeSet<String>,
    destroyed: Vec<VisualHandle>,
    destroyed_bars: Vec<HealthBarHandle>,
    transform_calls: usize,
    stale_calls: usize,
    threads: HashSet<ThreadId>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `instantiate` return `None` for `type_id`.
    pub fn mark_missing(&mut self, type_id: &str) {
        self.missing_types.insert(type_id.to_owned());
    }

    /// Visuals of `type_id` come without a health bar.
    pub fn without_health_bar(&mut self, type_id: &str) {
        self.barless_types.insert(type_id.to_owned());
    }

    fn touch(&mut self) {
        self.threads.insert(thread::current().id());
    }

    fn mint(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    pub fn object(&self, visual: VisualHandle) -> Option<&SceneObject> {
        self.objects.get(&visual)
    }

    pub fn tint(&self, visual: VisualHandle) -> Option<Tint> {
        self.objects.get(&visual).map(|o| o.tint)
    }

    pub fn is_live(&self, visual: VisualHandle) -> bool {
        self.objects.contains_key(&visual)
    }

    pub fn live_count(&self) -> usize {
        self.objects.len()
    }

    pub fn live_bar_count(&self) -> usize {
        self.live_bars.len()
    }

    pub fn destroyed(&self) -> &[VisualHandle] {
        &self.destroyed
    }

    pub fn destroyed_bars(&self) -> &[HealthBarHandle] {
        &self.destroyed_bars
    }

    pub fn transform_calls(&self) -> usize {
        self.transform_calls
    }

    /// Calls that named a handle that was never minted or already destroyed.
    pub fn stale_calls(&self) -> usize {
        self.stale_calls
    }

    /// Every thread that has called into the scene.
    pub fn touched_threads(&self) -> Vec<ThreadId> {
        self.threads.iter().copied().collect()
    }
}

impl VisualFactory for HeadlessScene {
    fn instantiate(&mut self, type_id: &str, placement: Placement) -> Option<VisualHandle> {
        self.touch();
        if self.missing_types.contains(type_id) {
            return None;
        }
        let visual = VisualHandle(self.mint());
        self.objects.insert(
            visual,
            SceneObject {
                type_id: type_id.to_owned(),
                position: placement.position,
                rotation: placement.rotation,
                tint: Tint::Normal,
                health_bar: None,
            },
        );
        Some(visual)
    }

    fn health_bar(&mut self, visual: VisualHandle) -> Option<HealthBarHandle> {
        self.touch();
        let barless = {
            let object = self.objects.get(&visual)?;
            self.barless_types.contains(&object.type_id)
        };
        if barless {
            return None;
        }
        let bar = HealthBarHandle(self.mint());
        if let Some(object) = self.objects.get_mut(&visual) {
            object.health_bar = Some(bar);
        }
        self.live_bars.insert(bar);
        Some(bar)
    }

    fn set_transform(&mut self, visual: VisualHandle, position: Vec3, rotation: Quat) {
        self.touch();
        self.transform_calls += 1;
        match self.objects.get_mut(&visual) {
            Some(object) => {
                object.position = position;
                object.rotation = rotation;
            }
            None => self.stale_calls += 1,
        }
    }

    fn set_tint(&mut self, visual: VisualHandle, tint: Tint) {
        self.touch();
        match self.objects.get_mut(&visual) {
            Some(object) => object.tint = tint,
            None => self.stale_calls += 1,
        }
    }

    fn destroy_health_bar(&mut self, bar: HealthBarHandle) {
        self.touch();
        if self.live_bars.remove(&bar) {
            self.destroyed_bars.push(bar);
        } else {
            self.stale_calls += 1;
        }
    }

    fn destroy(&mut self, visual: VisualHandle) {
        self.touch();
        if self.objects.remove(&visual).is_some() {
            self.destroyed.push(visual);
        } else {
            self.stale_calls += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// HeadlessUi
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct HeadlessUi {
    health: BTreeMap<HealthBarHandle, f32>,
    hidden: usize,
    hands: Vec<HandView>,
    elixir: Vec<ElixirReading>,
    results: Vec<MatchResult>,
}

impl HeadlessUi {
    pub fn health_of(&self, bar: HealthBarHandle) -> Option<f32> {
        self.health.get(&bar).copied()
    }

    pub fn last_hand(&self) -> Option<&HandView> {
        self.hands.last()
    }

    /// Number of times a fully resolved hand was shown.
    pub fn hand_updates(&self) -> usize {
        self.hands.len()
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden
    }

    pub fn last_elixir(&self) -> Option<ElixirReading> {
        self.elixir.last().copied()
    }

    pub fn match_result(&self) -> Option<&MatchResult> {
        self.results.last()
    }
}

impl UiSink for HeadlessUi {
    fn health_changed(&mut self, bar: HealthBarHandle, fraction: f32) {
        self.health.insert(bar, fraction);
    }

    fn hand_hidden(&mut self) {
        self.hidden += 1;
    }

    fn hand_changed(&mut self, view: &HandView) {
        self.hands.push(view.clone());
    }

    fn elixir_changed(&mut self, reading: ElixirReading) {
        self.elixir.push(reading);
    }

    fn match_ended(&mut self, result: &MatchResult) {
        self.results.push(result.clone());
    }
}

// ---------------------------------------------------------------------------
// HeadlessArt
// ---------------------------------------------------------------------------

/// Art loader that answers from memory. Unconfigured refs load immediately
/// and are cached per ref.
#[derive(Debug, Default)]
pub struct HeadlessArt {
    next_handle: u64,
    cache: BTreeMap<String, ArtHandle>,
    pending: BTreeSet<String>,
    failing: BTreeSet<String>,
    requests: Vec<(ArtTicket, String)>,
}

impl HeadlessArt {
    /// Requests for `image_ref` answer `Pending`.
    pub fn with_pending(mut self, image_ref: &str) -> Self {
        self.pending.insert(image_ref.to_owned());
        self
    }

    /// Requests for `image_ref` answer `Failed`.
    pub fn with_failing(mut self, image_ref: &str) -> Self {
        self.failing.insert(image_ref.to_owned());
        self
    }

    pub fn requests(&self) -> &[(ArtTicket, String)] {
        &self.requests
    }

    /// Tickets that were answered `Pending`, oldest first.
    pub fn pending_tickets(&self) -> Vec<ArtTicket> {
        self.requests
            .iter()
            .filter(|(_, image_ref)| self.pending.contains(image_ref))
            .map(|(ticket, _)| *ticket)
            .collect()
    }
}

impl ArtLoader for HeadlessArt {
    fn request(&mut self, ticket: ArtTicket, image_ref: &str) -> ArtPoll {
        self.requests.push((ticket, image_ref.to_owned()));
        if self.failing.contains(image_ref) {
            return ArtPoll::Failed(format!("no such image: {image_ref}"));
        }
        if self.pending.contains(image_ref) {
            return ArtPoll::Pending;
        }
        if let Some(handle) = self.cache.get(image_ref) {
            return ArtPoll::Ready(*handle);
        }
        self.next_handle += 1;
        let handle = ArtHandle(self.next_handle);
        self.cache.insert(image_ref.to_owned(), handle);
        ArtPoll::Ready(handle)
    }
}

// ---------------------------------------------------------------------------
// RecordingTransport
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: Vec<OutboundCall>,
    fail_with: Option<TransportError>,
}

impl RecordingTransport {
    /// A transport whose every call fails with `err`.
    pub fn failing(err: TransportError) -> Self {
        Self {
            calls: Vec::new(),
            fail_with: Some(err),
        }
    }

    pub fn calls(&self) -> &[OutboundCall] {
        &self.calls
    }
}

impl Transport for RecordingTransport {
    fn invoke(&mut self, call: OutboundCall) -> Result<(), TransportError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        self.calls.push(call);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ArtSlot;

    fn at_origin() -> Placement {
        Placement {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    #[test]
    fn scene_tracks_lifecycle_and_stale_calls() {
        let mut scene = HeadlessScene::new();
        let v = scene.instantiate("t", at_origin()).unwrap();
        let bar = scene.health_bar(v).unwrap();
        assert_ne!(v.0, bar.0);
        scene.destroy_health_bar(bar);
        scene.destroy(v);
        assert_eq!(scene.stale_calls(), 0);
        scene.destroy(v);
        scene.set_tint(v, Tint::Hit);
        assert_eq!(scene.stale_calls(), 2);
        assert_eq!(scene.touched_threads(), vec![thread::current().id()]);
    }

    #[test]
    fn scene_honours_missing_and_barless_types() {
        let mut scene = HeadlessScene::new();
        scene.mark_missing("ghost");
        scene.without_health_bar("tower");
        assert!(scene.instantiate("ghost", at_origin()).is_none());
        let tower = scene.instantiate("tower", at_origin()).unwrap();
        assert!(scene.health_bar(tower).is_none());
    }

    #[test]
    fn art_caches_per_ref() {
        let mut art = HeadlessArt::default().with_failing("bad");
        let ticket = ArtTicket {
            generation: 1,
            slot: ArtSlot::Next,
        };
        let first = art.request(ticket, "a.png");
        assert_eq!(art.request(ticket, "a.png"), first);
        assert!(matches!(art.request(ticket, "bad"), ArtPoll::Failed(_)));
        assert_eq!(art.requests().len(), 3);
    }
}
