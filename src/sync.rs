use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::types::sync::ServerEvent;

pub const DEFAULT_ROOM_CAPACITY: usize = 64;

/// Identifies one connected realtime session for the lifetime of its
/// connection. Only used to keep a publisher from hearing its own message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

#[derive(Clone)]
struct Relayed {
    origin: SessionId,
    event: Arc<ServerEvent>,
}

/// Maps a user id to the broadcast group of that user's connected sessions.
///
/// Membership is trust-based: any session asserting a user id may join that
/// room; nothing checks the claim against the credential the same client used
/// for HTTP. Delivery is fire-and-forget with no replay for late joiners, and
/// per-origin FIFO order falls out of the single channel per room.
pub struct SessionRegistry {
    inner: Mutex<Rooms>,
    capacity: usize,
    next_session: AtomicU64,
}

#[derive(Default)]
struct Rooms {
    senders: HashMap<String, broadcast::Sender<Relayed>>,
    members: HashMap<SessionId, String>,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Rooms::default()),
            capacity,
            next_session: AtomicU64::new(1),
        }
    }

    /// Allocates an id for a freshly accepted connection.
    pub fn session(&self) -> SessionId {
        SessionId(self.next_session.fetch_add(1, Ordering::Relaxed))
    }

    /// Adds `session` to the group named by `user_id` and returns its
    /// receiving end. Joining the same room twice just hands back a fresh
    /// receiver; joining a different room moves the session, and the caller
    /// is expected to drop the receiver from the previous join.
    pub fn join(&self, user_id: &str, session: SessionId) -> SessionReceiver {
        let mut rooms = self.inner.lock().expect("session registry lock");
        let previous = rooms.members.insert(session, user_id.to_string());
        let receiver = rooms
            .senders
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        if let Some(previous) = previous
            && previous != user_id
        {
            prune_if_empty(&mut rooms, &previous);
        }
        SessionReceiver { session, receiver }
    }

    /// Removes the session from whatever group it joined; no-op if it never
    /// joined. Callers drop their receiver first so empty rooms can be pruned.
    pub fn leave(&self, session: SessionId) {
        let mut rooms = self.inner.lock().expect("session registry lock");
        if let Some(user_id) = rooms.members.remove(&session) {
            prune_if_empty(&mut rooms, &user_id);
        }
    }

    /// Delivers `event` to every session currently joined to the group named
    /// by its user id, except `origin`. No acknowledgment, no retry: with no
    /// room (or no listeners) the event is simply dropped.
    pub fn publish(&self, origin: SessionId, event: ServerEvent) {
        let rooms = self.inner.lock().expect("session registry lock");
        if let Some(sender) = rooms.senders.get(event.user_id()) {
            let _ = sender.send(Relayed {
                origin,
                event: Arc::new(event),
            });
        }
    }

    pub fn room_count(&self) -> usize {
        self.inner.lock().expect("session registry lock").senders.len()
    }
}

fn prune_if_empty(rooms: &mut Rooms, user_id: &str) {
    let empty = rooms
        .senders
        .get(user_id)
        .is_some_and(|sender| sender.receiver_count() == 0);
    if empty {
        rooms.senders.remove(user_id);
    }
}

/// Receiving end of a joined room; skips the session's own publishes.
pub struct SessionReceiver {
    session: SessionId,
    receiver: broadcast::Receiver<Relayed>,
}

impl SessionReceiver {
    /// The next event published by another session of the same group, or
    /// `None` once the room is gone. A slow session that lags past the room
    /// buffer loses the missed messages; that is logged, never surfaced.
    pub async fn next(&mut self) -> Option<Arc<ServerEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(relayed) if relayed.origin == self.session => continue,
                Ok(relayed) => return Some(relayed.event),
                Err(RecvError::Lagged(missed)) => {
                    eprintln!("sync relay: session {:?} lagged by {missed} messages", self.session);
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
