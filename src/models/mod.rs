//! Domain models for the PriceCall backend.

pub mod guess;
pub mod player;

pub use guess::{Direction, Guess, GuessStatus};
pub use player::Player;
