//! Per-frame driver.
//!
//! The [`FrameLoop`] owns the [`Reconciler`] and the receiving side of the
//! [`Inbox`] for one match. Each call to [`tick`](FrameLoop::tick):
//!
//! 1. Drains up to `max_notifications_per_tick` queued items in arrival order
//!    and applies each one.
//! 2. Advances move and flash tasks by `dt`.
//! 3. Expires overdue card-art loads.
//! 4. Records [`FrameDiagnostics`].
//!
//! All scene and UI mutation happens inside `tick`, on the thread that owns
//! the loop. `FrameLoop` is `!Send`; delivery threads only ever hold an
//! [`InboxSender`].
//!
//! # Example
//!
//! ```
//! use arena_sync::prelude::*;
//!
//! let mut frame = FrameLoop::new(
//!     ClientConfig::default(),
//!     MatchSession::new("s", "me"),
//!     HeadlessScene::new(),
//!     HeadlessUi::default(),
//!     HeadlessArt::default(),
//! )
//! .unwrap();
//!
//! let tx = frame.sender();
//! std::thread::spawn(move || tx.notify(Notification::Elixir(6.0)).unwrap())
//!     .join()
//!     .unwrap();
//!
//! let diag = frame.tick(1.0 / 60.0);
//! assert_eq!(diag.applied, 1);
//! assert_eq!(frame.reconciler().elixir().whole, 6);
//! ```

use std::marker::PhantomData;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::config::ClientConfig;
use crate::inbox::{Inbound, Inbox, InboxSender};
use crate::ports::{ArtLoader, UiSink, VisualFactory};
use crate::reconciler::{MatchSession, Reconciler};
use crate::ConfigError;

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// What the last tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameDiagnostics {
    /// Inbox items drained this tick.
    pub drained: usize,
    /// Items that changed state.
    pub applied: usize,
    /// Items that were no-ops (unknown ids, duplicates, server errors).
    pub skipped: usize,
    pub moves_finished: usize,
    pub flashes_finished: usize,
    pub art_timeouts: usize,
    /// Move and flash tasks still running after the tick.
    pub active_tasks: usize,
    /// Wall-clock time spent applying queued items.
    pub apply_time: Duration,
    /// Wall-clock time for the whole tick.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

pub struct FrameLoop<V, U, A> {
    reconciler: Reconciler<V, U, A>,
    inbox: Inbox,
    max_per_tick: usize,
    frame_counter: u64,
    last_diagnostics: FrameDiagnostics,
    _frame_thread: PhantomData<Rc<()>>,
}

impl<V: VisualFactory, U: UiSink, A: ArtLoader> FrameLoop<V, U, A> {
    /// Build the reconciler and inbox for one match.
    ///
    /// # Errors
    ///
    /// Returns the validation error when `config` is unusable.
    pub fn new(
        config: ClientConfig,
        session: MatchSession,
        factory: V,
        ui: U,
        art: A,
    ) -> Result<Self, ConfigError> {
        let reconciler = Reconciler::new(&config, session, factory, ui, art)?;
        Ok(Self {
            reconciler,
            inbox: Inbox::bounded(config.inbox_capacity),
            max_per_tick: config.max_notifications_per_tick,
            frame_counter: 0,
            last_diagnostics: FrameDiagnostics::default(),
            _frame_thread: PhantomData,
        })
    }

    /// A handle delivery threads use to queue items for this loop.
    pub fn sender(&self) -> InboxSender {
        self.inbox.sender()
    }

    /// Run one frame of `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> &FrameDiagnostics {
        let tick_start = Instant::now();
        let mut diag = FrameDiagnostics::default();

        // Phase 1: apply queued items.
        let apply_start = Instant::now();
        for item in self.inbox.drain(self.max_per_tick) {
            diag.drained += 1;
            if self.apply_item(item) {
                diag.applied += 1;
            } else {
                diag.skipped += 1;
            }
        }
        diag.apply_time = apply_start.elapsed();

        // Phase 2: scheduled tasks.
        let report = self.reconciler.advance_tasks(dt);
        diag.moves_finished = report.moves_finished;
        diag.flashes_finished = report.flashes_finished;

        // Phase 3: art deadlines.
        diag.art_timeouts = self.reconciler.expire_art(dt);

        self.frame_counter += 1;
        diag.active_tasks = self.reconciler.scheduler().active_count();
        diag.total_time = tick_start.elapsed();
        self.last_diagnostics = diag;
        &self.last_diagnostics
    }

    fn apply_item(&mut self, item: Inbound) -> bool {
        self.reconciler.handle_inbound(item)
    }

    /// Run `count` frames of `dt` seconds each.
    pub fn run_frames(&mut self, count: u64, dt: f32) {
        for _ in 0..count {
            self.tick(dt);
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }

    pub fn reconciler(&self) -> &Reconciler<V, U, A> {
        &self.reconciler
    }

    /// Direct access for input handling and setup, on the frame thread.
    pub fn reconciler_mut(&mut self) -> &mut Reconciler<V, U, A> {
        &mut self.reconciler
    }

    pub fn inbox_capacity(&self) -> usize {
        self.inbox.capacity()
    }
}

impl<V, U, A> std::fmt::Debug for FrameLoop<V, U, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("reconciler", &self.reconciler)
            .field("frame_counter", &self.frame_counter)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
