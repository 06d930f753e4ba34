pub mod guess_service;
pub mod player_service;

pub use guess_service::{
    CreatedGuess, GuessService, PlayerState, SettlementInvocation, SettlementOutcome,
};
pub use player_service::PlayerService;
