//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{CoinFace, MatchEvent, MatchResult, Role, Scoreboard, Side, TossDecision};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Call the coin ("heads" or "tails")
    Toss { call: String },

    /// Toss winner elects to "bat" or "bowl"
    ChooseRole { decision: String },

    /// Hand sign for the next ball (1-6)
    PlayMove { value: i64 },

    /// Break a tie
    StartSuperOver,

    /// Discard the current match
    AbandonMatch,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        user_id: Uuid,
        username: String,
        high_score: u32,
        server_time: u64,
    },

    /// Coin landed
    TossResult {
        outcome: CoinFace,
        winner: Side,
        /// `None` while the Player still has to choose
        decision: Option<TossDecision>,
        player_role: Option<Role>,
    },

    /// A side walks out to bat
    InningsStarted {
        batting: Side,
        target: Option<u32>,
        super_over: bool,
        scoreboard: Scoreboard,
    },

    /// One ball played
    Ball {
        player_move: u8,
        bot_move: u8,
        events: Vec<MatchEvent>,
        scoreboard: Scoreboard,
    },

    /// Match has ended
    MatchEnd {
        result: MatchResult,
        player_score: u32,
        bot_score: u32,
        super_over: bool,
        /// Tie: client may send `start_super_over`
        super_over_available: bool,
    },

    /// Current match discarded
    MatchAbandoned,

    /// Final score persisted
    HighScore {
        score: u32,
        new_high_score: u32,
        updated: bool,
    },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
