use crate::game::{Color, GameResult, GameState, Move, PieceKind};
use crate::history::MoveRecord;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::time::Duration;

/// Trait that all move-suggestion bots must implement. A suggestion gets no
/// special treatment: it goes through `GameState::submit_move` like any move.
pub trait Bot: Send {
    /// Get the name of the bot
    fn name(&self) -> &str;

    /// Get the next move for the current game state
    /// The bot has a time limit to respond
    fn get_move(&mut self, state: &GameState, time_limit: Duration) -> Option<Move>;

    /// Notified when the game starts
    fn game_start(&mut self, _color: Color) {}

    /// Notified when a turn completes (by either player)
    fn notify_move(&mut self, _record: &MoveRecord) {}

    /// Notified when the game ends
    fn game_end(&mut self, _result: Option<&GameResult>) {}
}

/// Picks uniformly among the legal moves
pub struct RandomBot {
    name: String,
    rng: StdRng,
}

impl RandomBot {
    pub fn new(name: String) -> Self {
        RandomBot {
            name,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic bot for reproducible games
    pub fn with_seed(name: String, seed: u64) -> Self {
        RandomBot {
            name,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Bot for RandomBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_move(&mut self, state: &GameState, _time_limit: Duration) -> Option<Move> {
        let moves = state.legal_moves(state.current_player());
        moves.choose(&mut self.rng).copied()
    }
}

pub fn piece_value(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Pawn => 1,
        PieceKind::Knight | PieceKind::Bishop => 3,
        PieceKind::Rook => 5,
        PieceKind::Queen => 9,
        PieceKind::King => 0,
    }
}

/// Plays each candidate on a copy of the game, including the opponent's
/// turn-start births and deaths, and keeps the best material balance
pub struct GreedyBot {
    name: String,
}

impl GreedyBot {
    pub fn new(name: String) -> Self {
        GreedyBot { name }
    }

    fn evaluate_move(&self, state: &GameState, mv: Move) -> i32 {
        let me = state.current_player();
        let mut temp_state = state.clone();
        if temp_state.submit_move(mv).is_err() {
            return i32::MIN;
        }

        if let Some(result) = temp_state.result() {
            return if result.winner == me { 1000 } else { -1000 };
        }

        temp_state
            .board()
            .pieces()
            .map(|(_, piece)| {
                let value = piece_value(piece.kind);
                if piece.color == me { value } else { -value }
            })
            .sum()
    }
}

impl Bot for GreedyBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_move(&mut self, state: &GameState, _time_limit: Duration) -> Option<Move> {
        let moves = state.legal_moves(state.current_player());

        // Find the move with the best evaluation
        moves
            .into_iter()
            .max_by_key(|&mv| self.evaluate_move(state, mv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    fn game_with(layout: &str) -> GameState {
        GameState::new(GameConfig {
            layout: layout.to_string(),
            ..GameConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_greedy_bot_captures_king() {
        let state = game_with("k7/8/8/8/8/8/8/R3K3");
        let mut bot = GreedyBot::new("greedy".to_string());
        let mv = bot.get_move(&state, Duration::from_secs(1)).unwrap();
        assert_eq!(mv.to_string(), "a1->a8");
    }

    #[test]
    fn test_greedy_bot_prefers_material() {
        let state = game_with("k7/8/8/3q4/8/8/8/3RK3");
        let mut bot = GreedyBot::new("greedy".to_string());
        let mv = bot.get_move(&state, Duration::from_secs(1)).unwrap();
        assert_eq!(mv.to_string(), "d1->d5");
    }

    #[test]
    fn test_random_bot_plays_legal_moves() {
        let state = GameState::standard();
        let mut bot = RandomBot::with_seed("random".to_string(), 7);
        let legal = state.legal_moves(Color::White);
        for _ in 0..10 {
            let mv = bot.get_move(&state, Duration::from_secs(1)).unwrap();
            assert!(legal.contains(&mv));
        }
    }

    #[test]
    fn test_seeded_random_bots_agree() {
        let state = GameState::standard();
        let mut first = RandomBot::with_seed("a".to_string(), 42);
        let mut second = RandomBot::with_seed("b".to_string(), 42);
        for _ in 0..5 {
            assert_eq!(
                first.get_move(&state, Duration::ZERO),
                second.get_move(&state, Duration::ZERO)
            );
        }
    }

    #[test]
    fn test_no_moves_after_game_over() {
        let mut state = game_with("k7/8/8/8/8/8/8/R3K3");
        state.submit_move("a1a8".parse().unwrap()).unwrap();
        let mut bot = GreedyBot::new("greedy".to_string());
        assert!(bot.get_move(&state, Duration::ZERO).is_none());
    }
}
