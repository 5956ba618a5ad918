//! Ball motion, paddle collisions and scoring
//!
//! [`advance`] is a pure state transition: it never touches the network and
//! only depends on its inputs, apart from the random serve direction after a
//! point is scored.

use crate::config::GameConfig;
use crate::protocol::{BallPosition, Direction, Snapshot};
use rand::Rng;

/// Factor applied to horizontal speed on every paddle hit
pub const RALLY_ACCELERATION: f32 = 1.05;

/// Vertical speed, relative to the base ball speed, of a hit on a paddle's edge
pub const PADDLE_DEFLECTION: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Ball {
    /// A ball at the centre of the field heading in a random diagonal.
    pub fn serve<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Self {
        let speed = config.ball_speed;
        Self {
            x: config.field_width as f32 / 2.0,
            y: config.field_height as f32 / 2.0,
            vx: if rng.gen::<bool>() { speed } else { -speed },
            vy: if rng.gen::<bool>() { speed } else { -speed },
        }
    }
}

/// Simulated state of one game
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub paddles: [i32; 2],
    pub ball: Ball,
    pub score: [u32; 2],
}

impl GameState {
    pub fn new<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Self {
        let paddle = config.initial_paddle_position();
        Self {
            paddles: [paddle, paddle],
            ball: Ball::serve(config, rng),
            score: [0, 0],
        }
    }

    pub fn snapshot(&self, tick: u64) -> Snapshot {
        Snapshot {
            tick,
            paddles: self.paddles,
            ball: BallPosition {
                x: self.ball.x,
                y: self.ball.y,
            },
            score: self.score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsEvent {
    WallBounce,
    /// The paddle in this slot returned the ball
    PaddleHit(usize),
    /// The player in this slot won a point
    Scored(usize),
}

/// Moves a paddle one step in `direction`, clamped to the field.
pub fn move_paddle(position: i32, direction: Direction, config: &GameConfig) -> i32 {
    let step = i32::try_from(config.paddle_step).unwrap_or(i32::MAX);
    let next = match direction {
        Direction::Up => position.saturating_sub(step),
        Direction::Down => position.saturating_add(step),
        Direction::Stationary => position,
    };
    next.clamp(0, config.max_paddle_position())
}

/// Advances the game by `dt` ticks.
pub fn advance<R: Rng + ?Sized>(
    state: &GameState,
    config: &GameConfig,
    dt: f32,
    rng: &mut R,
) -> (GameState, Vec<PhysicsEvent>) {
    let mut next = state.clone();
    let mut events = Vec::new();

    let field_width = config.field_width as f32;
    let ball_size = config.ball_size as f32;
    let paddle_width = config.paddle_width as f32;
    let bottom = (config.field_height - config.ball_size) as f32;

    let previous_x = state.ball.x;
    let ball = &mut next.ball;
    ball.x += ball.vx * dt;
    ball.y += ball.vy * dt;

    if ball.y < 0.0 {
        ball.y = 0.0;
        ball.vy = ball.vy.abs();
        events.push(PhysicsEvent::WallBounce);
    } else if ball.y > bottom {
        ball.y = bottom;
        ball.vy = -ball.vy.abs();
        events.push(PhysicsEvent::WallBounce);
    }

    // Left paddle's front face is at x = paddle_width, the right one's at
    // field_width - paddle_width (measured against the ball's right edge).
    let left_plane = paddle_width;
    let right_plane = field_width - paddle_width - ball_size;

    if ball.vx < 0.0 && previous_x >= left_plane && ball.x <= left_plane {
        if covers(next.paddles[0], ball.y, config) {
            ball.x = left_plane;
            return_ball(ball, next.paddles[0], config, 1.0);
            events.push(PhysicsEvent::PaddleHit(0));
        }
    } else if ball.vx > 0.0 && previous_x <= right_plane && ball.x >= right_plane {
        if covers(next.paddles[1], ball.y, config) {
            ball.x = right_plane;
            return_ball(ball, next.paddles[1], config, -1.0);
            events.push(PhysicsEvent::PaddleHit(1));
        }
    }

    let scorer = if ball.x <= 0.0 {
        Some(1)
    } else if ball.x + ball_size >= field_width {
        Some(0)
    } else {
        None
    };

    if let Some(slot) = scorer {
        next.score[slot] += 1;
        next.ball = Ball::serve(config, rng);
        events.push(PhysicsEvent::Scored(slot));
    }

    (next, events)
}

/// True when the ball's vertical extent overlaps the paddle.
fn covers(paddle: i32, ball_y: f32, config: &GameConfig) -> bool {
    let top = paddle as f32;
    let bottom = top + config.paddle_height as f32;
    ball_y + config.ball_size as f32 >= top && ball_y <= bottom
}

/// Sends the ball back towards `heading` (+1 right, -1 left), faster and
/// angled by where it met the paddle.
fn return_ball(ball: &mut Ball, paddle: i32, config: &GameConfig, heading: f32) {
    let half = config.paddle_height as f32 / 2.0;
    let paddle_centre = paddle as f32 + half;
    let ball_centre = ball.y + config.ball_size as f32 / 2.0;
    let offset = ((ball_centre - paddle_centre) / half).clamp(-1.0, 1.0);

    let speed = (ball.vx.abs() * RALLY_ACCELERATION).min(config.max_ball_speed);
    ball.vx = heading * speed;
    ball.vy = offset * config.ball_speed * PADDLE_DEFLECTION;
}
