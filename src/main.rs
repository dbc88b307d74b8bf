use conway_chess::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SERVER_ADDR: &str = "127.0.0.1:3000";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conway_chess=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Usage: conway-chess [match|serve] [config.json]
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = args.first().map(String::as_str).unwrap_or("match");
    let config = match args.get(1) {
        Some(path) => GameConfig::from_json_file(path)?,
        None => GameConfig::default(),
    };

    match mode {
        "serve" => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(web::run_server(SERVER_ADDR, config))
        }
        "match" => play_match(config),
        other => Err(format!("unknown mode '{}', expected 'match' or 'serve'", other).into()),
    }
}

fn play_match(config: GameConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Conway Chess - Bot Match");
    println!("========================\n");

    // Create the bots
    let white = Box::new(GreedyBot::new("GreedyBot".to_string()));
    let black = Box::new(RandomBot::new("RandomBot".to_string()));

    // Configure match
    let match_config = MatchConfig {
        time_per_move: Duration::from_secs(2),
        max_moves: 150,
    };

    let mut match_game = Match::with_game(white, black, match_config, config)?;
    let result = match_game.play();

    println!("{}\n", match_game.state().board());
    for (i, record) in match_game.state().history().records().iter().enumerate() {
        println!("{:>3}. {}", i + 1, record);
    }

    // Display result
    println!("\n========================");
    println!("Match Result:");
    match result {
        MatchResult::WhiteWins {
            winner_name,
            moves,
            cause,
        } => {
            println!("  {} wins as White in {} moves ({:?})", winner_name, moves, cause);
        }
        MatchResult::BlackWins {
            winner_name,
            moves,
            cause,
        } => {
            println!("  {} wins as Black in {} moves ({:?})", winner_name, moves, cause);
        }
        MatchResult::Draw { moves } => {
            println!("  Draw after {} moves", moves);
        }
        MatchResult::Timeout { violator, winner } => {
            println!("  {} wins by timeout (opponent: {})", winner, violator);
        }
        MatchResult::IllegalMove { violator, winner } => {
            println!("  {} wins by illegal move (opponent: {})", winner, violator);
        }
    }
    println!("========================");
    Ok(())
}
