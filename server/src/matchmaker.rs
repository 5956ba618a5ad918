//! Pairing of waiting connections and the registry of running sessions
//!
//! Connections are paired strictly in arrival order: the earlier of the two
//! becomes slot 0 of the new session. The registry is owned by the server and
//! shared with diagnostics through a single server-level lock, separate from
//! the per-session locks.

use crate::connection::PendingConnection;
use crate::game::Session;
use log::info;
use shared::PLAYERS_PER_SESSION;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// FIFO queue that releases players two at a time
#[derive(Debug)]
pub struct Matchmaker<T> {
    pending: VecDeque<T>,
}

impl<T> Default for Matchmaker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Matchmaker<T> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Queues `item` and returns the two oldest entries once a pair is available.
    pub fn enqueue(&mut self, item: T) -> Option<[T; PLAYERS_PER_SESSION]> {
        self.pending.push_back(item);
        self.take_pair()
    }

    /// Puts `item` back at the head of the queue, ahead of every later arrival.
    pub fn requeue(&mut self, item: T) -> Option<[T; PLAYERS_PER_SESSION]> {
        self.pending.push_front(item);
        self.take_pair()
    }

    /// Removes the oldest queued entry matching `predicate`.
    pub fn remove_where<F>(&mut self, predicate: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let index = self.pending.iter().position(predicate)?;
        self.pending.remove(index)
    }

    fn take_pair(&mut self) -> Option<[T; PLAYERS_PER_SESSION]> {
        if self.pending.len() < PLAYERS_PER_SESSION {
            return None;
        }

        let first = self.pending.pop_front()?;
        let second = self.pending.pop_front()?;
        Some([first, second])
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Server-wide bookkeeping of pending connections and live sessions
pub struct Registry {
    matchmaker: Matchmaker<PendingConnection>,
    sessions: HashMap<u64, Arc<Session>>,
    next_connection_id: u64,
    next_session_id: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            matchmaker: Matchmaker::new(),
            sessions: HashMap::new(),
            next_connection_id: 1,
            next_session_id: 1,
        }
    }

    pub fn allocate_connection_id(&mut self) -> u64 {
        let id = self.next_connection_id;
        self.next_connection_id += 1;
        id
    }

    pub fn allocate_session_id(&mut self) -> u64 {
        let id = self.next_session_id;
        self.next_session_id += 1;
        id
    }

    pub fn enqueue(
        &mut self,
        connection: PendingConnection,
    ) -> Option<[PendingConnection; PLAYERS_PER_SESSION]> {
        self.matchmaker.enqueue(connection)
    }

    /// Queues a connection that was paired but whose partner had already left.
    pub fn requeue(
        &mut self,
        connection: PendingConnection,
    ) -> Option<[PendingConnection; PLAYERS_PER_SESSION]> {
        self.matchmaker.requeue(connection)
    }

    /// Drops a queued connection whose peer went away before pairing.
    pub fn remove_pending(&mut self, connection_id: u64) -> Option<PendingConnection> {
        let removed = self.matchmaker.remove_where(|c| c.id == connection_id);
        if removed.is_some() {
            info!(
                "Connection {} removed from the queue, {} still waiting",
                connection_id,
                self.matchmaker.len()
            );
        }
        removed
    }

    pub fn pending_count(&self) -> usize {
        self.matchmaker.len()
    }

    pub fn register(&mut self, session: Arc<Session>) {
        self.sessions.insert(session.id(), session);
    }

    /// Forgets an ended session. Returns false if it was already gone.
    pub fn remove(&mut self, session_id: u64) -> bool {
        if self.sessions.remove(&session_id).is_some() {
            info!(
                "Session {} reclaimed, {} still active",
                session_id,
                self.sessions.len()
            );
            true
        } else {
            false
        }
    }

    /// Registered sessions ordered by id
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        let mut sessions: Vec<_> = self.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| s.id());
        sessions
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
