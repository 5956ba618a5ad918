//! One two-player game and the task that drives its simulation
//!
//! All mutable state of a session (paddles, ball, score, participants) lives
//! behind a single lock. Connection handlers take it briefly to move a paddle,
//! the tick driver takes it to advance physics and queue the resulting
//! snapshot for every participant. Outbound queues are bounded and written
//! with `try_send`, so a slow client can never stall a tick.

use crate::network::ServerMessage;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    advance, move_paddle, Direction, GameConfig, GameState, Packet, PhysicsEvent, Snapshot,
    PLAYERS_PER_SESSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Largest simulation step, in ticks, taken after a stall
pub const MAX_TICK_DELTA: f32 = 3.0;

/// Outbound side of a player's connection
#[derive(Debug)]
pub struct Participant {
    pub peer: SocketAddr,
    pub outbound: mpsc::Sender<Packet>,
}

/// Diagnostic view of a registered session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: u64,
    pub occupied: [bool; PLAYERS_PER_SESSION],
    pub score: [u32; PLAYERS_PER_SESSION],
    pub tick: u64,
    pub alive: bool,
}

struct SessionState {
    game: GameState,
    participants: [Option<Participant>; PLAYERS_PER_SESSION],
    tick: u64,
    alive: bool,
    rng: StdRng,
}

pub struct Session {
    id: u64,
    config: GameConfig,
    state: Mutex<SessionState>,
    stop_tx: watch::Sender<bool>,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl Session {
    pub fn new(
        id: u64,
        config: GameConfig,
        participants: [Participant; PLAYERS_PER_SESSION],
        server_tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        let mut rng = StdRng::from_entropy();
        let game = GameState::new(&config, &mut rng);
        let (stop_tx, _) = watch::channel(false);

        Self {
            id,
            config,
            state: Mutex::new(SessionState {
                game,
                participants: participants.map(Some),
                tick: 0,
                alive: true,
                rng,
            }),
            stop_tx,
            server_tx,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Moves the paddle in `slot` by one step, clamped to the field.
    pub async fn apply_move(&self, slot: usize, direction: Direction) {
        let mut state = self.state.lock().await;
        if let Some(paddle) = state.game.paddles.get_mut(slot) {
            *paddle = move_paddle(*paddle, direction, &self.config);
        } else {
            warn!("Session {}: move for unknown slot {}", self.id, slot);
        }
    }

    /// Advances the game by `dt` ticks and queues the result for every player.
    ///
    /// While a player is missing the simulation is paused and the remaining
    /// player is sent `Packet::Waiting` instead of a snapshot.
    pub async fn tick(&self, dt: f32) -> Vec<PhysicsEvent> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if !state.alive {
            return Vec::new();
        }

        if state.participants.iter().any(Option::is_none) {
            broadcast(self.id, &state.participants, &Packet::Waiting);
            return Vec::new();
        }

        let (next, events) = advance(&state.game, &self.config, dt, &mut state.rng);
        state.game = next;
        state.tick += 1;

        for event in &events {
            if let PhysicsEvent::Scored(slot) = event {
                info!(
                    "Session {}: player {} scored ({} - {})",
                    self.id, slot, state.game.score[0], state.game.score[1]
                );
            }
        }

        let snapshot = state.game.snapshot(state.tick);
        broadcast(self.id, &state.participants, &Packet::State(snapshot));

        events
    }

    /// Consistent copy of the current game state.
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().await;
        state.game.snapshot(state.tick)
    }

    /// Removes the player in `slot`.
    ///
    /// Returns true if this call emptied the session; it is then marked dead,
    /// its tick driver is told to stop and the server is asked to reclaim it.
    pub async fn disconnect(&self, slot: usize) -> bool {
        let mut state = self.state.lock().await;

        if let Some(participant) = state.participants.get_mut(slot).and_then(Option::take) {
            info!(
                "Session {}: player {} ({}) disconnected",
                self.id, slot, participant.peer
            );
        }

        if !state.alive || state.participants.iter().any(Option::is_some) {
            return false;
        }

        state.alive = false;
        self.stop_tx.send_replace(true);
        if self
            .server_tx
            .send(ServerMessage::SessionEnded {
                session_id: self.id,
            })
            .is_err()
        {
            debug!("Session {} ended after server shutdown", self.id);
        }

        info!(
            "Session {} ended after {} ticks, final score {} - {}",
            self.id, state.tick, state.game.score[0], state.game.score[1]
        );
        true
    }

    pub async fn occupied(&self) -> usize {
        let state = self.state.lock().await;
        state.participants.iter().filter(|p| p.is_some()).count()
    }

    pub async fn is_alive(&self) -> bool {
        self.state.lock().await.alive
    }

    pub async fn summary(&self) -> SessionSummary {
        let state = self.state.lock().await;
        SessionSummary {
            id: self.id,
            occupied: [
                state.participants[0].is_some(),
                state.participants[1].is_some(),
            ],
            score: state.game.score,
            tick: state.tick,
            alive: state.alive,
        }
    }

    /// Receiver that flips to `true` once the session has ended.
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    #[cfg(test)]
    pub(crate) async fn place_ball(&self, ball: shared::Ball) {
        self.state.lock().await.game.ball = ball;
    }
}

fn broadcast(
    session_id: u64,
    participants: &[Option<Participant>; PLAYERS_PER_SESSION],
    packet: &Packet,
) {
    for participant in participants.iter().flatten() {
        match participant.outbound.try_send(packet.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!(
                    "Session {}: outbound queue to {} full, dropping update",
                    session_id, participant.peer
                );
            }
            // Writer already gone; the reader will notice the dead socket
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Runs the fixed-rate simulation of `session` until it ends.
pub async fn run_tick_driver(session: Arc<Session>, tick_duration: Duration) {
    let mut stop = session.stop_signal();
    let mut ticker = interval(tick_duration);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first tick since it fires immediately
    ticker.tick().await;
    let mut last_tick = Instant::now();
    let nominal = tick_duration.as_secs_f32();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let mut dt = (now - last_tick).as_secs_f32() / nominal;
                last_tick = now;

                if dt > MAX_TICK_DELTA {
                    warn!(
                        "Session {}: large tick delta ({:.2} ticks), capping to {:.2}",
                        session.id(), dt, MAX_TICK_DELTA
                    );
                    dt = MAX_TICK_DELTA;
                }

                session.tick(dt).await;
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Session {} tick driver stopped", session.id());
}
