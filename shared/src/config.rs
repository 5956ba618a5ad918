//! Field, paddle and ball dimensions shared by server and client.

use serde::{Deserialize, Serialize};

pub const DEFAULT_FIELD_WIDTH: u32 = 800;
pub const DEFAULT_FIELD_HEIGHT: u32 = 400;
pub const DEFAULT_PADDLE_WIDTH: u32 = 10;
pub const DEFAULT_PADDLE_HEIGHT: u32 = 60;
pub const DEFAULT_BALL_SIZE: u32 = 10;
pub const DEFAULT_BALL_SPEED: f32 = 3.0;
pub const DEFAULT_PADDLE_STEP: u32 = 5;
pub const DEFAULT_MAX_BALL_SPEED: f32 = 12.0;

/// Geometry and speeds of one game.
///
/// Speeds are expressed in field units per simulation tick. The server sends
/// its configuration to both players when a session starts, so clients never
/// need to guess the field size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub field_width: u32,
    pub field_height: u32,
    pub paddle_width: u32,
    pub paddle_height: u32,
    pub ball_size: u32,
    pub ball_speed: f32,
    /// Distance a paddle travels for a single `Up`/`Down` command
    pub paddle_step: u32,
    /// Upper bound on horizontal ball speed during long rallies
    pub max_ball_speed: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            field_width: DEFAULT_FIELD_WIDTH,
            field_height: DEFAULT_FIELD_HEIGHT,
            paddle_width: DEFAULT_PADDLE_WIDTH,
            paddle_height: DEFAULT_PADDLE_HEIGHT,
            ball_size: DEFAULT_BALL_SIZE,
            ball_speed: DEFAULT_BALL_SPEED,
            paddle_step: DEFAULT_PADDLE_STEP,
            max_ball_speed: DEFAULT_MAX_BALL_SPEED,
        }
    }
}

impl GameConfig {
    /// Highest valid paddle offset, `field_height - paddle_height`.
    pub fn max_paddle_position(&self) -> i32 {
        self.field_height.saturating_sub(self.paddle_height) as i32
    }

    /// Paddle offset that vertically centres a paddle on the field.
    pub fn initial_paddle_position(&self) -> i32 {
        self.max_paddle_position() / 2
    }

    /// Checks that the dimensions describe a playable field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_width == 0 || self.field_height == 0 {
            return Err(ConfigError::Invalid("field dimensions must be non-zero"));
        }
        if self.field_width > i32::MAX as u32 || self.field_height > i32::MAX as u32 {
            return Err(ConfigError::Invalid("field dimensions must fit in an i32"));
        }
        if self.paddle_width == 0 || self.paddle_height == 0 || self.ball_size == 0 {
            return Err(ConfigError::Invalid(
                "paddle and ball dimensions must be non-zero",
            ));
        }
        if self.paddle_height > self.field_height || self.ball_size > self.field_height {
            return Err(ConfigError::Invalid(
                "paddle and ball must fit inside the field height",
            ));
        }
        if self.paddle_width.saturating_mul(2) + self.ball_size >= self.field_width {
            return Err(ConfigError::Invalid(
                "field is too narrow for two paddles and a ball",
            ));
        }
        if self.paddle_step == 0 || self.paddle_step > self.field_height {
            return Err(ConfigError::Invalid(
                "paddle step must be between 1 and the field height",
            ));
        }
        if !self.ball_speed.is_finite() || self.ball_speed <= 0.0 {
            return Err(ConfigError::Invalid("ball speed must be positive"));
        }
        if !self.max_ball_speed.is_finite() || self.max_ball_speed < self.ball_speed {
            return Err(ConfigError::Invalid(
                "max ball speed must be at least the base ball speed",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid game configuration: {0}")]
    Invalid(&'static str),

    #[error("tick rate must be between 1 and 1000 Hz, got {0}")]
    TickRate(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_classic_field() {
        let config = GameConfig::default();
        assert_eq!(config.field_width, 800);
        assert_eq!(config.field_height, 400);
        assert_eq!(config.paddle_width, 10);
        assert_eq!(config.paddle_height, 60);
        assert_eq!(config.ball_size, 10);
        assert_eq!(config.ball_speed, 3.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paddle_positions() {
        let config = GameConfig::default();
        assert_eq!(config.max_paddle_position(), 340);
        assert_eq!(config.initial_paddle_position(), 170);
    }

    #[test]
    fn test_rejects_oversized_paddle() {
        let config = GameConfig {
            paddle_height: 500,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_speeds() {
        let zero_speed = GameConfig {
            ball_speed: 0.0,
            ..GameConfig::default()
        };
        assert!(zero_speed.validate().is_err());

        let low_cap = GameConfig {
            max_ball_speed: 1.0,
            ..GameConfig::default()
        };
        assert!(low_cap.validate().is_err());

        let nan_speed = GameConfig {
            ball_speed: f32::NAN,
            ..GameConfig::default()
        };
        assert!(nan_speed.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_paddle_step() {
        let frozen = GameConfig {
            paddle_step: 0,
            ..GameConfig::default()
        };
        assert!(matches!(frozen.validate(), Err(ConfigError::Invalid(_))));

        let huge = GameConfig {
            paddle_step: 3_000_000_000,
            ..GameConfig::default()
        };
        assert!(matches!(huge.validate(), Err(ConfigError::Invalid(_))));

        let whole_field = GameConfig {
            paddle_step: 400,
            ..GameConfig::default()
        };
        assert!(whole_field.validate().is_ok());
    }

    #[test]
    fn test_rejects_field_beyond_i32() {
        let config = GameConfig {
            field_height: u32::MAX,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_narrow_field() {
        let config = GameConfig {
            field_width: 25,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
