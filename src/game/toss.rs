//! Coin toss that decides who bats first

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::rng::MatchRng;
use super::{Role, Side};

/// Face of the coin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinFace {
    Heads,
    Tails,
}

impl CoinFace {
    fn from_flip(heads: bool) -> Self {
        if heads {
            Self::Heads
        } else {
            Self::Tails
        }
    }
}

impl fmt::Display for CoinFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heads => f.write_str("heads"),
            Self::Tails => f.write_str("tails"),
        }
    }
}

impl FromStr for CoinFace {
    type Err = TossError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heads" => Ok(Self::Heads),
            "tails" => Ok(Self::Tails),
            _ => Err(TossError::InvalidChoice(s.to_string())),
        }
    }
}

/// What the toss winner elects to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TossDecision {
    Bat,
    Bowl,
}

impl FromStr for TossDecision {
    type Err = TossError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bat" => Ok(Self::Bat),
            "bowl" => Ok(Self::Bowl),
            _ => Err(TossError::InvalidChoice(s.to_string())),
        }
    }
}

/// A flipped coin whose winner may still have to decide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinToss {
    pub outcome: CoinFace,
    pub winner: Side,
}

/// Settled toss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TossResult {
    pub winner: Side,
    pub outcome: CoinFace,
    /// Decision made by the winner
    pub decision: TossDecision,
}

impl TossResult {
    /// Starting role of the Player
    pub fn player_role(&self) -> Role {
        match (self.winner, self.decision) {
            (Side::Player, TossDecision::Bat) | (Side::Bot, TossDecision::Bowl) => Role::Batting,
            (Side::Player, TossDecision::Bowl) | (Side::Bot, TossDecision::Bat) => Role::Bowling,
        }
    }
}

/// Flip the coin against the Player's call
pub fn flip_coin<R: MatchRng + ?Sized>(call: CoinFace, rng: &mut R) -> CoinToss {
    let outcome = CoinFace::from_flip(rng.coin_flip());
    let winner = if outcome == call {
        Side::Player
    } else {
        Side::Bot
    };
    CoinToss { outcome, winner }
}

impl CoinToss {
    /// Settle the decision.
    ///
    /// A Player win needs `player_decision`; a Bot win ignores it and draws the
    /// Bot's decision from `rng`.
    pub fn decide<R: MatchRng + ?Sized>(
        self,
        player_decision: Option<TossDecision>,
        rng: &mut R,
    ) -> Result<TossResult, TossError> {
        let decision = match self.winner {
            Side::Player => player_decision.ok_or(TossError::DecisionRequired)?,
            Side::Bot => {
                if rng.coin_flip() {
                    TossDecision::Bat
                } else {
                    TossDecision::Bowl
                }
            }
        };

        Ok(TossResult {
            winner: self.winner,
            outcome: self.outcome,
            decision,
        })
    }
}

/// Flip and settle in one step
pub fn resolve_toss<R: MatchRng + ?Sized>(
    call: CoinFace,
    player_decision: Option<TossDecision>,
    rng: &mut R,
) -> Result<TossResult, TossError> {
    flip_coin(call, rng).decide(player_decision, rng)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TossError {
    #[error("Invalid toss choice: {0}")]
    InvalidChoice(String),

    #[error("Toss winner must choose to bat or bowl")]
    DecisionRequired,
}
