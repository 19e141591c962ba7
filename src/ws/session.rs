//! Per-connection game session: toss, match and super over

use tracing::{debug, info};
use uuid::Uuid;

use crate::game::{
    flip_coin, CoinFace, CoinToss, Match, MatchError, MatchRng, MoveOutcome,
    ScoreSink, SeededRng, Side, TossDecision, TossResult,
};
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Game state owned by one WebSocket connection
pub struct GameSession<S: ScoreSink, R: MatchRng = SeededRng> {
    user_id: Uuid,
    rng: R,
    sink: S,
    pending_toss: Option<CoinToss>,
    current: Option<Match>,
}

impl<S: ScoreSink, R: MatchRng> GameSession<S, R> {
    pub fn new(user_id: Uuid, rng: R, sink: S) -> Self {
        Self {
            user_id,
            rng,
            sink,
            pending_toss: None,
            current: None,
        }
    }

    pub fn current_match(&self) -> Option<&Match> {
        self.current.as_ref()
    }

    /// Apply one client message and return the replies
    pub fn handle(&mut self, msg: ClientMsg) -> Vec<ServerMsg> {
        match msg {
            ClientMsg::Toss { call } => self.handle_toss(&call),
            ClientMsg::ChooseRole { decision } => self.handle_choose_role(&decision),
            ClientMsg::PlayMove { value } => self.handle_move(value),
            ClientMsg::StartSuperOver => self.handle_super_over(),
            ClientMsg::AbandonMatch => {
                if let Some(game) = self.current.take() {
                    info!(user_id = %self.user_id, match_id = %game.id, "Match abandoned");
                }
                self.pending_toss = None;
                vec![ServerMsg::MatchAbandoned]
            }
            ClientMsg::Ping { t } => vec![ServerMsg::Pong { t }],
        }
    }

    fn in_play(&self) -> bool {
        self.current.as_ref().is_some_and(Match::is_playing)
    }

    fn handle_toss(&mut self, call: &str) -> Vec<ServerMsg> {
        if self.in_play() {
            return vec![ServerMsg::error(
                "match_in_progress",
                "Finish or abandon the current match first",
            )];
        }

        let call: CoinFace = match call.parse() {
            Ok(call) => call,
            Err(e) => return vec![ServerMsg::error("invalid_toss_choice", e.to_string())],
        };

        let toss = flip_coin(call, &mut self.rng);
        debug!(user_id = %self.user_id, outcome = %toss.outcome, winner = ?toss.winner, "Coin tossed");

        match toss.winner {
            Side::Player => {
                self.pending_toss = Some(toss);
                vec![ServerMsg::TossResult {
                    outcome: toss.outcome,
                    winner: toss.winner,
                    decision: None,
                    player_role: None,
                }]
            }
            Side::Bot => match toss.decide(None, &mut self.rng) {
                Ok(result) => self.begin(result),
                Err(e) => vec![ServerMsg::error("invalid_toss_choice", e.to_string())],
            },
        }
    }

    fn handle_choose_role(&mut self, decision: &str) -> Vec<ServerMsg> {
        let Some(toss) = self.pending_toss else {
            return vec![ServerMsg::error("no_pending_toss", "Call the toss first")];
        };

        let decision: TossDecision = match decision.parse() {
            Ok(decision) => decision,
            Err(e) => return vec![ServerMsg::error("invalid_toss_choice", e.to_string())],
        };

        self.pending_toss = None;
        match toss.decide(Some(decision), &mut self.rng) {
            Ok(result) => self.begin(result),
            Err(e) => vec![ServerMsg::error("invalid_toss_choice", e.to_string())],
        }
    }

    /// Announce the settled toss and start the match
    fn begin(&mut self, toss: TossResult) -> Vec<ServerMsg> {
        let player_role = toss.player_role();
        let (game, _) = Match::start(player_role, false);
        let mut replies = vec![ServerMsg::TossResult {
            outcome: toss.outcome,
            winner: toss.winner,
            decision: Some(toss.decision),
            player_role: Some(player_role),
        }];
        replies.push(innings_started(&game));
        self.current = Some(game);
        replies
    }

    fn handle_move(&mut self, value: i64) -> Vec<ServerMsg> {
        let Some(game) = self.current.as_mut() else {
            return vec![ServerMsg::error("no_match", "Call the toss to start a match")];
        };

        // out-of-range values fail the engine's own range check
        let player_move = u8::try_from(value).unwrap_or(u8::MAX);
        match game.submit_move(player_move, &mut self.rng, &mut self.sink) {
            Ok(outcome) => ball_replies(game, outcome),
            Err(MatchError::InvalidMove(_)) => vec![ServerMsg::error(
                "invalid_move",
                format!("Invalid move {}: must be between 1 and 6", value),
            )],
            Err(e) => vec![ServerMsg::error("not_playing", e.to_string())],
        }
    }

    fn handle_super_over(&mut self) -> Vec<ServerMsg> {
        let Some(game) = self.current.as_ref() else {
            return vec![ServerMsg::error("no_tie", MatchError::NoTie.to_string())];
        };

        match game.super_over() {
            Ok((super_over, _)) => {
                let reply = innings_started(&super_over);
                self.current = Some(super_over);
                vec![reply]
            }
            Err(e) => vec![ServerMsg::error("no_tie", e.to_string())],
        }
    }
}

/// "Now batting" message for the current innings of `game`
fn innings_started(game: &Match) -> ServerMsg {
    ServerMsg::InningsStarted {
        batting: game.batting(),
        target: game.target(),
        super_over: game.is_super_over(),
        scoreboard: game.scoreboard(),
    }
}

fn ball_replies(game: &Match, outcome: MoveOutcome) -> Vec<ServerMsg> {
    let result = outcome.result();
    let mut replies = vec![ServerMsg::Ball {
        player_move: outcome.player_move,
        bot_move: outcome.bot_move,
        events: outcome.events,
        scoreboard: game.scoreboard(),
    }];

    if let Some(result) = result {
        replies.push(ServerMsg::MatchEnd {
            result,
            player_score: game.player_score(),
            bot_score: game.bot_score(),
            super_over: game.is_super_over(),
            super_over_available: game.super_over().is_ok(),
        });
    }

    replies
}
