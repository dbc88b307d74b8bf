use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::game::{Board, ByColor, Color};
use crate::queue::{BirthQueue, DEFAULT_QUEUE};

/// Standard chess start position as a FEN placement field
pub const STANDARD_LAYOUT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";
pub const DEFAULT_BIRTH_THRESHOLD: u8 = 2;
pub const DEFAULT_DEATH_THRESHOLD: u8 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid layout: {0}")]
    Layout(String),
    #[error("Invalid birth queue: {0}")]
    Queue(String),
    #[error("Invalid threshold: {0}")]
    Threshold(String),
}

/// Everything needed to set up a game. Missing JSON fields take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// FEN piece placement, rank 8 first
    pub layout: String,
    pub white_queue: String,
    pub black_queue: String,
    pub birth_threshold: u8,
    pub death_threshold: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            layout: STANDARD_LAYOUT.to_string(),
            white_queue: DEFAULT_QUEUE.to_string(),
            black_queue: DEFAULT_QUEUE.to_string(),
            birth_threshold: DEFAULT_BIRTH_THRESHOLD,
            death_threshold: DEFAULT_DEATH_THRESHOLD,
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.initial_position().map(|_| ())
    }

    /// Parses the layout and both queues, checking every constraint
    pub fn initial_position(&self) -> Result<(Board, ByColor<BirthQueue>), ConfigError> {
        if self.birth_threshold == 0 {
            return Err(ConfigError::Threshold("birth threshold must be at least 1".to_string()));
        }
        if self.death_threshold == 0 {
            return Err(ConfigError::Threshold("death threshold must be at least 1".to_string()));
        }

        let board = Board::from_placement(&self.layout)?;
        for color in [Color::White, Color::Black] {
            let kings = board.king_count(color);
            if kings != 1 {
                return Err(ConfigError::Layout(format!(
                    "{} has {} kings, expected exactly one",
                    color, kings
                )));
            }
        }

        let queues = ByColor::new(
            BirthQueue::parse(&self.white_queue)?,
            BirthQueue::parse(&self.black_queue)?,
        );
        Ok((board, queues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GameConfig::default();
        let (board, queues) = config.initial_position().unwrap();
        assert_eq!(board, Board::standard());
        assert_eq!(queues.white, BirthQueue::standard());
        assert_eq!(config.birth_threshold, 2);
        assert_eq!(config.death_threshold, 3);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = GameConfig::from_json(r#"{"white_queue": "NNB"}"#).unwrap();
        assert_eq!(config.white_queue, "NNB");
        assert_eq!(config.black_queue, DEFAULT_QUEUE);
        assert_eq!(config.layout, STANDARD_LAYOUT);
    }

    #[test]
    fn test_king_count_validated() {
        let config = GameConfig {
            layout: "8/8/8/8/8/8/8/K6K".to_string(),
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Layout(_))));

        let no_black_king = GameConfig {
            layout: "8/8/8/8/8/8/8/K7".to_string(),
            ..GameConfig::default()
        };
        assert!(matches!(no_black_king.validate(), Err(ConfigError::Layout(_))));
    }

    #[test]
    fn test_bad_queue_and_threshold_rejected() {
        let queue = GameConfig {
            black_queue: "PPK".to_string(),
            ..GameConfig::default()
        };
        assert!(matches!(queue.validate(), Err(ConfigError::Queue(_))));

        let threshold = GameConfig {
            death_threshold: 0,
            ..GameConfig::default()
        };
        assert!(matches!(threshold.validate(), Err(ConfigError::Threshold(_))));
    }

    #[test]
    fn test_bad_json_reported() {
        assert!(matches!(
            GameConfig::from_json("{\"birth_threshold\": \"two\"}"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            GameConfig::from_json_file("/nonexistent/conway-chess.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
