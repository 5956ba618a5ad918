//! Command line configuration of the server binary

use clap::Parser;
use shared::config::{
    DEFAULT_BALL_SIZE, DEFAULT_BALL_SPEED, DEFAULT_FIELD_HEIGHT, DEFAULT_FIELD_WIDTH,
    DEFAULT_MAX_BALL_SPEED, DEFAULT_PADDLE_HEIGHT, DEFAULT_PADDLE_STEP, DEFAULT_PADDLE_WIDTH,
};
use shared::{ConfigError, GameConfig};
use std::time::Duration;

pub const DEFAULT_TICK_RATE: u32 = 60;
pub const MAX_TICK_RATE: u32 = 1000;

#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative two-player paddle game server")]
pub struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Simulation ticks per second
    #[arg(short, long, default_value_t = DEFAULT_TICK_RATE)]
    pub tick_rate: u32,

    #[arg(long, default_value_t = DEFAULT_FIELD_WIDTH)]
    pub field_width: u32,

    #[arg(long, default_value_t = DEFAULT_FIELD_HEIGHT)]
    pub field_height: u32,

    #[arg(long, default_value_t = DEFAULT_PADDLE_WIDTH)]
    pub paddle_width: u32,

    #[arg(long, default_value_t = DEFAULT_PADDLE_HEIGHT)]
    pub paddle_height: u32,

    /// Distance a paddle moves per command
    #[arg(long, default_value_t = DEFAULT_PADDLE_STEP)]
    pub paddle_step: u32,

    #[arg(long, default_value_t = DEFAULT_BALL_SIZE)]
    pub ball_size: u32,

    /// Serve speed in units per tick
    #[arg(long, default_value_t = DEFAULT_BALL_SPEED)]
    pub ball_speed: f32,

    /// Horizontal speed limit reached during long rallies
    #[arg(long, default_value_t = DEFAULT_MAX_BALL_SPEED)]
    pub max_ball_speed: f32,
}

/// Everything needed to start a [`crate::network::Server`]
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate: u32,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            tick_rate: DEFAULT_TICK_RATE,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 || self.tick_rate > MAX_TICK_RATE {
            return Err(ConfigError::TickRate(self.tick_rate));
        }
        self.game.validate()
    }
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            listen_addr: format!("{}:{}", args.host, args.port),
            tick_rate: args.tick_rate,
            game: GameConfig {
                field_width: args.field_width,
                field_height: args.field_height,
                paddle_width: args.paddle_width,
                paddle_height: args.paddle_height,
                ball_size: args.ball_size,
                ball_speed: args.ball_speed,
                paddle_step: args.paddle_step,
                max_ball_speed: args.max_ball_speed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_command_line() {
        let config = ServerConfig::from(Args::parse_from(["server"]));

        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.game, GameConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "server",
            "-H",
            "0.0.0.0",
            "--port",
            "9000",
            "--tick-rate",
            "30",
            "--field-height",
            "600",
            "--ball-speed",
            "4.5",
        ]);
        let config = ServerConfig::from(args);

        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.game.field_height, 600);
        assert_eq!(config.game.ball_speed, 4.5);
    }

    #[test]
    fn test_tick_duration() {
        let config = ServerConfig::default();
        let micros = config.tick_duration().as_micros();
        assert!((16_600..=16_700).contains(&micros));
    }

    #[test]
    fn test_rejects_zero_tick_rate() {
        let config = ServerConfig {
            tick_rate: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::TickRate(0))));
    }

    #[test]
    fn test_rejects_invalid_game() {
        let config = ServerConfig {
            game: GameConfig {
                paddle_height: 1000,
                ..GameConfig::default()
            },
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
