//! Match engine: toss, innings state machine and milestones

pub mod milestone;
pub mod r#match;
pub mod registry;
pub mod rng;
pub mod toss;

pub use milestone::detect_milestone;
pub use r#match::{
    Match, MatchError, MatchEvent, MatchPhase, MatchResult, MoveOutcome, Scoreboard,
};
pub use registry::SessionRegistry;
pub use rng::{MatchRng, SeededRng};
pub use toss::{flip_coin, resolve_toss, CoinFace, CoinToss, TossDecision, TossError, TossResult};

use serde::{Deserialize, Serialize};

/// Lowest hand sign a player can show
pub const MIN_SIGN: u8 = 1;
/// Highest hand sign a player can show
pub const MAX_SIGN: u8 = 6;

/// One of the two sides in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Bot,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Bot,
            Self::Bot => Self::Player,
        }
    }
}

/// The Player's role in the first innings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Batting,
    Bowling,
}

impl Role {
    /// Side that bats while the Player holds this role
    pub fn batting_side(self) -> Side {
        match self {
            Self::Batting => Side::Player,
            Self::Bowling => Side::Bot,
        }
    }
}

/// Receives the Player's final score once a match resolves.
///
/// Called exactly once per resolved match. The engine does not wait on the
/// outcome; persistence failures belong to the implementor.
pub trait ScoreSink {
    fn record_final_score(&mut self, score: u32);
}

impl ScoreSink for Vec<u32> {
    fn record_final_score(&mut self, score: u32) {
        self.push(score);
    }
}
