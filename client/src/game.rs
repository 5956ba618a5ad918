//! Client-side view of the current session

use log::{debug, info};
use shared::{Direction, GameConfig, Packet, Snapshot};

/// What the client currently knows about its session
#[derive(Debug, Clone)]
pub struct ClientGameState {
    pub session_id: Option<u64>,
    pub slot: Option<usize>,
    pub config: GameConfig,
    pub latest: Option<Snapshot>,
    pub waiting: bool,
    pub snapshots_received: u64,
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            session_id: None,
            slot: None,
            config: GameConfig::default(),
            latest: None,
            waiting: true,
            snapshots_received: 0,
        }
    }

    /// Folds a server packet into the local view.
    pub fn apply_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Welcome {
                session_id,
                slot,
                config,
            } => {
                info!("Joined session {} as player {}", session_id, slot);
                self.session_id = Some(session_id);
                self.slot = Some(slot);
                self.config = config;
                self.waiting = false;
            }
            Packet::Waiting => {
                if !self.waiting {
                    info!("Waiting for an opponent");
                }
                self.waiting = true;
            }
            Packet::State(snapshot) => {
                if let Some(previous) = &self.latest {
                    if previous.score != snapshot.score {
                        info!("Score {} - {}", snapshot.score[0], snapshot.score[1]);
                    }
                }
                self.waiting = false;
                self.snapshots_received += 1;
                self.latest = Some(snapshot);
            }
            Packet::Move { .. } => debug!("Ignoring move packet from server"),
        }
    }

    /// This client's paddle offset in the latest snapshot
    pub fn own_paddle(&self) -> Option<i32> {
        let slot = self.slot?;
        self.latest.as_ref().map(|s| s.paddles[slot])
    }

    /// Direction that moves the paddle's centre towards the ball's centre.
    pub fn autopilot_direction(&self) -> Direction {
        let (Some(paddle), Some(snapshot)) = (self.own_paddle(), self.latest.as_ref()) else {
            return Direction::Stationary;
        };

        let paddle_centre = paddle as f32 + self.config.paddle_height as f32 / 2.0;
        let ball_centre = snapshot.ball.y + self.config.ball_size as f32 / 2.0;
        let dead_zone = self.config.paddle_step as f32;

        if ball_centre < paddle_centre - dead_zone {
            Direction::Up
        } else if ball_centre > paddle_centre + dead_zone {
            Direction::Down
        } else {
            Direction::Stationary
        }
    }
}
