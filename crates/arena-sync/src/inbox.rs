//! Bounded queue between delivery threads and the frame thread.
//!
//! Transport callbacks and asset loaders run wherever their runtime puts
//! them. None of them touch the scene: they push an [`Inbound`] item through
//! an [`InboxSender`] and the frame loop drains the [`Inbox`] once per tick.
//!
//! Capacity is fixed at construction. [`InboxSender::send`] blocks while the
//! queue is full, [`InboxSender::try_send`] reports [`InboxError::Full`].

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};

use serde_json::Value;
use tracing::warn;

use crate::notification::Notification;
use crate::ports::{ArtHandle, ArtTicket};
use crate::protocol;
use crate::InboxError;

/// One queued item.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Server(Notification),
    /// Completion of an art load that answered
    /// [`ArtPoll::Pending`](crate::ports::ArtPoll::Pending).
    ArtResolved {
        ticket: ArtTicket,
        outcome: Result<ArtHandle, String>,
    },
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

/// Receiving side, owned by the frame loop.
pub struct Inbox {
    rx: Receiver<Inbound>,
    tx: SyncSender<Inbound>,
    capacity: usize,
}

impl Inbox {
    /// A queue holding at most `capacity` items (at least one).
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::sync_channel(capacity);
        Self { rx, tx, capacity }
    }

    pub fn sender(&self) -> InboxSender {
        InboxSender {
            tx: self.tx.clone(),
        }
    }

    /// Take up to `max` queued items in arrival order without blocking.
    pub fn drain(&self, max: usize) -> Vec<Inbound> {
        let mut items = Vec::new();
        while items.len() < max {
            match self.rx.try_recv() {
                Ok(item) => items.push(item),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        items
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for Inbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inbox")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// InboxSender
// ---------------------------------------------------------------------------

/// Cloneable, `Send` handle for pushing into an [`Inbox`].
#[derive(Debug, Clone)]
pub struct InboxSender {
    tx: SyncSender<Inbound>,
}

impl InboxSender {
    /// Queue an item, blocking while the inbox is full.
    pub fn send(&self, item: Inbound) -> Result<(), InboxError> {
        self.tx.send(item).map_err(|_| InboxError::Closed)
    }

    /// Queue an item without blocking.
    pub fn try_send(&self, item: Inbound) -> Result<(), InboxError> {
        self.tx.try_send(item).map_err(|e| match e {
            TrySendError::Full(_) => InboxError::Full,
            TrySendError::Disconnected(_) => InboxError::Closed,
        })
    }

    pub fn notify(&self, notification: Notification) -> Result<(), InboxError> {
        self.send(Inbound::Server(notification))
    }

    pub fn art_resolved(
        &self,
        ticket: ArtTicket,
        outcome: Result<ArtHandle, String>,
    ) -> Result<(), InboxError> {
        self.send(Inbound::ArtResolved { ticket, outcome })
    }

    /// Decode a hub event on the calling thread and queue it.
    ///
    /// Malformed payloads are logged and dropped here; they never reach the
    /// frame thread.
    pub fn push_raw(&self, method: &str, payload: &Value) -> Result<(), InboxError> {
        match protocol::decode(method, payload) {
            Ok(notification) => self.notify(notification),
            Err(err) => {
                warn!(method, error = %err, "dropping undecodable hub event");
                Err(InboxError::Malformed(err))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drain_respects_max_and_order() {
        let inbox = Inbox::bounded(8);
        let tx = inbox.sender();
        for v in [1.0, 2.0, 3.0] {
            tx.notify(Notification::Elixir(v)).unwrap();
        }
        let first = inbox.drain(2);
        assert_eq!(
            first,
            vec![
                Inbound::Server(Notification::Elixir(1.0)),
                Inbound::Server(Notification::Elixir(2.0)),
            ]
        );
        assert_eq!(inbox.drain(10).len(), 1);
        assert!(inbox.drain(10).is_empty());
    }

    #[test]
    fn try_send_reports_full() {
        let inbox = Inbox::bounded(1);
        let tx = inbox.sender();
        tx.try_send(Inbound::Server(Notification::Elixir(1.0)))
            .unwrap();
        assert!(matches!(
            tx.try_send(Inbound::Server(Notification::Elixir(2.0))),
            Err(InboxError::Full)
        ));
    }

    #[test]
    fn send_after_drop_is_closed() {
        let inbox = Inbox::bounded(4);
        let tx = inbox.sender();
        drop(inbox);
        assert!(matches!(
            tx.notify(Notification::Elixir(1.0)),
            Err(InboxError::Closed)
        ));
    }

    #[test]
    fn push_raw_drops_malformed_payloads() {
        let inbox = Inbox::bounded(4);
        let tx = inbox.sender();
        assert!(tx.push_raw("TroopMoved", &json!({"x": 1})).is_err());
        tx.push_raw("NewElixir", &json!("7")).unwrap();
        assert_eq!(
            inbox.drain(4),
            vec![Inbound::Server(Notification::Elixir(7.0))]
        );
    }

    #[test]
    fn sender_is_send_and_clone() {
        fn assert_send<T: Send + Clone>() {}
        assert_send::<InboxSender>();
    }
}
