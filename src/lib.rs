pub mod arena;
pub mod bot;
pub mod config;
pub mod game;
pub mod history;
pub mod life;
pub mod movegen;
pub mod queue;
pub mod snapshot;
pub mod web;

pub use arena::*;
pub use bot::*;
pub use config::*;
pub use game::*;
pub use history::*;
pub use life::{Indicators, SquareIndicators};
pub use queue::BirthQueue;
pub use snapshot::*;
