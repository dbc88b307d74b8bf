use crate::bot::Bot;
use crate::config::GameConfig;
use crate::game::{Color, GameError, GameOverCause, GameState, Move};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub time_per_move: Duration,
    pub max_moves: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            time_per_move: Duration::from_secs(5),
            max_moves: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    WhiteWins {
        winner_name: String,
        moves: usize,
        cause: GameOverCause,
    },
    BlackWins {
        winner_name: String,
        moves: usize,
        cause: GameOverCause,
    },
    Draw {
        moves: usize,
    },
    Timeout {
        violator: String,
        winner: String,
    },
    IllegalMove {
        violator: String,
        winner: String,
    },
}

impl MatchResult {
    pub fn winner(&self) -> Option<&str> {
        match self {
            MatchResult::WhiteWins { winner_name, .. } => Some(winner_name),
            MatchResult::BlackWins { winner_name, .. } => Some(winner_name),
            MatchResult::Timeout { winner, .. } => Some(winner),
            MatchResult::IllegalMove { winner, .. } => Some(winner),
            MatchResult::Draw { .. } => None,
        }
    }
}

/// Two bots playing one game. Every suggested move goes through the same
/// `submit_move` path a human move would.
pub struct Match {
    config: MatchConfig,
    state: GameState,
    white_bot: Box<dyn Bot>,
    black_bot: Box<dyn Bot>,
}

impl Match {
    pub fn new(white_bot: Box<dyn Bot>, black_bot: Box<dyn Bot>, config: MatchConfig) -> Self {
        Match {
            config,
            state: GameState::standard(),
            white_bot,
            black_bot,
        }
    }

    pub fn with_game(
        white_bot: Box<dyn Bot>,
        black_bot: Box<dyn Bot>,
        config: MatchConfig,
        game: GameConfig,
    ) -> Result<Self, GameError> {
        Ok(Match {
            config,
            state: GameState::new(game)?,
            white_bot,
            black_bot,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    fn bot(&self, color: Color) -> &dyn Bot {
        match color {
            Color::White => self.white_bot.as_ref(),
            Color::Black => self.black_bot.as_ref(),
        }
    }

    pub fn play(&mut self) -> MatchResult {
        // Notify bots that game is starting
        self.white_bot.game_start(Color::White);
        self.black_bot.game_start(Color::Black);

        info!(
            white = self.white_bot.name(),
            black = self.black_bot.name(),
            "match starting"
        );
        debug!("initial board:\n{}", self.state.board());

        while !self.state.is_game_over() && self.state.move_count() < self.config.max_moves {
            let current_player = self.state.current_player();
            let bot = match current_player {
                Color::White => &mut self.white_bot,
                Color::Black => &mut self.black_bot,
            };

            // Get move from bot with time limit
            let start = Instant::now();
            let mv = bot.get_move(&self.state, self.config.time_per_move);
            let elapsed = start.elapsed();

            if let Some(result) = self.handle_move_result(mv, elapsed, current_player) {
                return result;
            }
        }

        // Game ended normally
        let result = self.state.result();
        self.white_bot.game_end(result.as_ref());
        self.black_bot.game_end(result.as_ref());

        let moves = self.state.move_count();
        match result {
            Some(result) => {
                let winner_name = self.bot(result.winner).name().to_string();
                info!(%result, winner = %winner_name, moves, "match finished");
                match result.winner {
                    Color::White => MatchResult::WhiteWins {
                        winner_name,
                        moves,
                        cause: result.cause,
                    },
                    Color::Black => MatchResult::BlackWins {
                        winner_name,
                        moves,
                        cause: result.cause,
                    },
                }
            }
            None => {
                info!(max_moves = self.config.max_moves, "move limit reached, draw");
                MatchResult::Draw { moves }
            }
        }
    }

    fn handle_move_result(
        &mut self,
        mv: Option<Move>,
        elapsed: Duration,
        current_player: Color,
    ) -> Option<MatchResult> {
        let bot_name = self.bot(current_player).name().to_string();
        let opponent_name = self.bot(current_player.opponent()).name().to_string();

        // Check timeout
        if elapsed > self.config.time_per_move {
            warn!(
                bot = %bot_name,
                ?elapsed,
                limit = ?self.config.time_per_move,
                "bot exceeded its time limit"
            );
            return Some(MatchResult::Timeout {
                violator: bot_name,
                winner: opponent_name,
            });
        }

        // No legal moves or bot gave up
        let Some(mv) = mv else {
            info!(bot = %bot_name, "bot returned no move");
            return Some(MatchResult::Draw {
                moves: self.state.move_count(),
            });
        };

        let record = match self.state.submit_move(mv) {
            Ok(record) => record.clone(),
            Err(e) => {
                warn!(bot = %bot_name, %mv, error = %e, "illegal move");
                return Some(MatchResult::IllegalMove {
                    violator: bot_name,
                    winner: opponent_name,
                });
            }
        };

        debug!(bot = %bot_name, %record, ?elapsed, "move played");

        // Notify both bots of the move
        self.white_bot.notify_move(&record);
        self.black_bot.notify_move(&record);

        debug!("\n{}", self.state.board());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{GreedyBot, RandomBot};
    use crate::history::MoveRecord;

    /// Always plays the same move, legal or not
    struct StubbornBot {
        mv: Move,
    }

    impl Bot for StubbornBot {
        fn name(&self) -> &str {
            "stubborn"
        }

        fn get_move(&mut self, _state: &GameState, _time_limit: Duration) -> Option<Move> {
            Some(self.mv)
        }
    }

    /// Counts notifications
    struct CountingBot {
        inner: RandomBot,
        seen: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl Bot for CountingBot {
        fn name(&self) -> &str {
            "counting"
        }

        fn get_move(&mut self, state: &GameState, time_limit: Duration) -> Option<Move> {
            self.inner.get_move(state, time_limit)
        }

        fn notify_move(&mut self, _record: &MoveRecord) {
            self.seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    fn quick() -> MatchConfig {
        MatchConfig {
            time_per_move: Duration::from_secs(5),
            max_moves: 60,
        }
    }

    #[test]
    fn test_random_match_terminates() {
        for seed in 0..4 {
            let mut game = Match::new(
                Box::new(RandomBot::with_seed("white".to_string(), seed)),
                Box::new(RandomBot::with_seed("black".to_string(), seed + 100)),
                quick(),
            );
            let result = game.play();
            assert!(game.state().move_count() <= 60);
            match result {
                MatchResult::WhiteWins { moves, .. }
                | MatchResult::BlackWins { moves, .. }
                | MatchResult::Draw { moves } => assert_eq!(moves, game.state().move_count()),
                other => panic!("unexpected result {:?}", other),
            }
        }
    }

    #[test]
    fn test_greedy_wins_by_capture() {
        let mut game = Match::with_game(
            Box::new(GreedyBot::new("greedy".to_string())),
            Box::new(RandomBot::with_seed("random".to_string(), 1)),
            quick(),
            GameConfig {
                layout: "k7/8/8/8/8/8/8/R3K3".to_string(),
                ..GameConfig::default()
            },
        )
        .unwrap();

        assert_eq!(
            game.play(),
            MatchResult::WhiteWins {
                winner_name: "greedy".to_string(),
                moves: 1,
                cause: GameOverCause::KingCaptured,
            }
        );
    }

    #[test]
    fn test_illegal_move_forfeits() {
        let mut game = Match::new(
            Box::new(StubbornBot {
                mv: "e2e5".parse().unwrap(),
            }),
            Box::new(GreedyBot::new("greedy".to_string())),
            quick(),
        );
        let result = game.play();
        assert_eq!(
            result,
            MatchResult::IllegalMove {
                violator: "stubborn".to_string(),
                winner: "greedy".to_string(),
            }
        );
        assert_eq!(result.winner(), Some("greedy"));
        assert_eq!(game.state().move_count(), 0);
    }

    #[test]
    fn test_bots_notified_of_every_turn() {
        let seen = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut game = Match::new(
            Box::new(CountingBot {
                inner: RandomBot::with_seed("inner".to_string(), 3),
                seen: seen.clone(),
            }),
            Box::new(RandomBot::with_seed("random".to_string(), 4)),
            quick(),
        );
        game.play();
        assert_eq!(
            seen.load(std::sync::atomic::Ordering::SeqCst),
            game.state().move_count()
        );
    }

    #[test]
    fn test_invalid_game_config_rejected() {
        let result = Match::with_game(
            Box::new(RandomBot::new("a".to_string())),
            Box::new(RandomBot::new("b".to_string())),
            quick(),
            GameConfig {
                white_queue: String::new(),
                ..GameConfig::default()
            },
        );
        assert!(matches!(result, Err(GameError::Config(_))));
    }
}
