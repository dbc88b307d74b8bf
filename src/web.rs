use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::bot::{Bot, GreedyBot, RandomBot};
use crate::config::GameConfig;
use crate::game::{Color, GameError, GameState, Move, Square};
use crate::history::SavedGame;
use crate::snapshot::Snapshot;

const BOT_TIME_LIMIT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotType {
    Greedy,
    Random,
    /// Both sides are played over HTTP
    #[default]
    None,
}

/// One game session shared by every request. The mutex is the single writer:
/// moves from all clients are applied one at a time.
#[derive(Clone, Default)]
pub struct AppState {
    game: Arc<Mutex<WebGame>>,
}

struct WebGame {
    state: GameState,
    player_side: Color,
    bot_type: BotType,
}

impl Default for WebGame {
    fn default() -> Self {
        WebGame {
            state: GameState::standard(),
            player_side: Color::White,
            bot_type: BotType::None,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct NewGameRequest {
    #[serde(default = "default_side")]
    pub player_side: Color,
    #[serde(default)]
    pub bot_type: BotType,
    /// Falls back to the config the server was started with
    #[serde(default)]
    pub config: Option<GameConfig>,
}

fn default_side() -> Color {
    Color::White
}

#[derive(Serialize, Deserialize)]
pub struct MoveRequest {
    pub from: Square,
    pub to: Square,
}

#[derive(Serialize)]
pub struct GameResponse {
    #[serde(flatten)]
    snapshot: Snapshot,
    player_side: Color,
    bot_type: BotType,
    message: String,
}

impl AppState {
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        let game = WebGame {
            state: GameState::new(config)?,
            ..WebGame::default()
        };
        Ok(AppState {
            game: Arc::new(Mutex::new(game)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, WebGame> {
        // A panicked request cannot leave a turn half-applied, so the data is still usable
        self.game.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn get_bot_instance(bot_type: BotType) -> Option<Box<dyn Bot>> {
    match bot_type {
        BotType::Greedy => Some(Box::new(GreedyBot::new("Greedy Bot".to_string()))),
        BotType::Random => Some(Box::new(RandomBot::new("Random Bot".to_string()))),
        BotType::None => None,
    }
}

fn error_response(status: StatusCode, error: impl std::fmt::Display) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error.to_string()
        })),
    )
        .into_response()
}

impl WebGame {
    fn bot_active(&self) -> bool {
        self.bot_type != BotType::None
    }

    fn bot_to_move(&self) -> bool {
        self.bot_active()
            && !self.state.is_game_over()
            && self.state.current_player() != self.player_side
    }

    /// Lets the bot play while it is its turn
    fn bot_reply(&mut self) -> Option<String> {
        if !self.bot_to_move() {
            return None;
        }
        let mut bot = get_bot_instance(self.bot_type)?;
        let Some(bot_move) = bot.get_move(&self.state, BOT_TIME_LIMIT) else {
            return Some("Bot failed to make a move".to_string());
        };
        match self.state.submit_move(bot_move) {
            Ok(record) => Some(format!("Bot played: {}", record)),
            Err(e) => {
                warn!(%bot_move, error = %e, "bot suggested an illegal move");
                Some(format!("Bot failed to make a move: {}", e))
            }
        }
    }

    fn response(&self, message: String) -> GameResponse {
        let message = match self.state.result() {
            Some(result) if message.is_empty() => result.to_string(),
            Some(result) => format!("{} {}", message, result),
            None => message,
        };
        GameResponse {
            snapshot: self.state.snapshot(),
            player_side: self.player_side,
            bot_type: self.bot_type,
            message,
        }
    }
}

#[axum::debug_handler]
async fn new_game(State(app_state): State<AppState>, Json(req): Json<NewGameRequest>) -> Response {
    let mut game = app_state.lock();
    let config = req
        .config
        .unwrap_or_else(|| game.state.config().clone());
    let state = match GameState::new(config) {
        Ok(state) => state,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    game.state = state;
    game.player_side = req.player_side;
    game.bot_type = req.bot_type;
    info!(player_side = %req.player_side, bot = ?req.bot_type, "new game");

    // If bot goes first, make its move
    let message = game.bot_reply().unwrap_or_else(|| "Your turn!".to_string());
    Json(game.response(message)).into_response()
}

#[axum::debug_handler]
async fn make_move(State(app_state): State<AppState>, Json(req): Json<MoveRequest>) -> Response {
    let mut game = app_state.lock();

    if game.bot_to_move() {
        return error_response(StatusCode::BAD_REQUEST, "Not your turn");
    }

    let player_move = Move::new(req.from, req.to);
    if let Err(e) = game.state.submit_move(player_move) {
        warn!(%player_move, error = %e, "rejected move");
        let status = match e {
            GameError::GameOver => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        };
        return error_response(status, format!("Invalid move: {}", e));
    }

    // Bot's turn
    let message = game.bot_reply().unwrap_or_default();
    Json(game.response(message)).into_response()
}

/// Takes back turns until it is the player's move again
#[axum::debug_handler]
async fn undo(State(app_state): State<AppState>) -> Response {
    let mut game = app_state.lock();
    if let Err(e) = game.state.undo() {
        return error_response(StatusCode::BAD_REQUEST, e);
    }
    while game.bot_to_move() && game.state.history().can_undo() {
        if let Err(e) = game.state.undo() {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e);
        }
    }
    // The bot may still be left to move once its own turns run out
    let message = game.bot_reply().unwrap_or_else(|| "Move undone".to_string());
    Json(game.response(message)).into_response()
}

#[axum::debug_handler]
async fn redo(State(app_state): State<AppState>) -> Response {
    let mut game = app_state.lock();
    if let Err(e) = game.state.redo() {
        return error_response(StatusCode::BAD_REQUEST, e);
    }
    while game.bot_to_move() && game.state.history().can_redo() {
        if let Err(e) = game.state.redo() {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e);
        }
    }
    // The bot may still be left to move once its own turns run out
    let message = game.bot_reply().unwrap_or_else(|| "Move redone".to_string());
    Json(game.response(message)).into_response()
}

async fn get_game_state(State(app_state): State<AppState>) -> Json<GameResponse> {
    let game = app_state.lock();
    Json(game.response(String::new()))
}

async fn get_history(State(app_state): State<AppState>) -> Json<SavedGame> {
    let game = app_state.lock();
    Json(game.state.saved_game())
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/new-game", post(new_game))
        .route("/api/move", post(make_move))
        .route("/api/undo", post(undo))
        .route("/api/redo", post(redo))
        .route("/api/game-state", get(get_game_state))
        .route("/api/history", get(get_history))
        .fallback_service(ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn run_server(addr: &str, config: GameConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(AppState::new(config)?);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("web server running at http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
