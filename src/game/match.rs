//! Match state and the ball-by-ball state machine

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::milestone::detect_milestone;
use super::rng::MatchRng;
use super::{Role, ScoreSink, Side, MAX_SIGN, MIN_SIGN};

/// Final classification from the Player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Win,
    Loss,
    Tie,
}

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Created but never started
    NotStarted,
    /// First side batting, no target yet
    InningsOne,
    /// Chase in progress
    InningsTwo,
    /// Terminal
    Resolved(MatchResult),
}

/// Structured events for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MatchEvent {
    /// A side walks out to bat
    InningsStarted {
        batting: Side,
        target: Option<u32>,
        super_over: bool,
    },
    /// Runs added to the batting side
    Runs { side: Side, runs: u32, total: u32 },
    /// Player crossed 50 or a multiple of 100
    Milestone { score: u32 },
    /// Signs matched, batting side is out
    Dismissal { side: Side, score: u32 },
    /// First innings over, target fixed
    InningsBreak { target: u32 },
    /// Match over
    Resolved {
        result: MatchResult,
        player_score: u32,
        bot_score: u32,
    },
}

/// What happened on one ball
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub player_move: u8,
    pub bot_move: u8,
    pub events: Vec<MatchEvent>,
}

impl MoveOutcome {
    /// Result, if this ball settled the match
    pub fn result(&self) -> Option<MatchResult> {
        self.events.iter().find_map(|e| match e {
            MatchEvent::Resolved { result, .. } => Some(*result),
            _ => None,
        })
    }
}

/// Display snapshot of the match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scoreboard {
    pub batting: Side,
    pub runs: u32,
    pub target: Option<u32>,
    /// `runs` or `runs/target` while the second side chases
    pub score_line: String,
    pub player_score: u32,
    pub bot_score: u32,
    pub balls_bowled: u32,
    pub super_over: bool,
}

/// One contest between the Player and the Bot (owned by the caller)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub id: Uuid,
    phase: MatchPhase,
    batting: Side,
    first_batting_side: Side,
    player_score: u32,
    bot_score: u32,
    balls_bowled: u32,
    target: Option<u32>,
    is_super_over: bool,
}

impl Default for Match {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            phase: MatchPhase::NotStarted,
            batting: Side::Player,
            first_batting_side: Side::Player,
            player_score: 0,
            bot_score: 0,
            balls_bowled: 0,
            target: None,
            is_super_over: false,
        }
    }
}

impl Match {
    /// Start a fresh match and return the opening announcement
    pub fn start(player_role: Role, is_super_over: bool) -> (Self, MatchEvent) {
        let batting = player_role.batting_side();
        let game = Self {
            id: Uuid::new_v4(),
            phase: MatchPhase::InningsOne,
            batting,
            first_batting_side: batting,
            is_super_over,
            ..Self::default()
        };

        info!(
            match_id = %game.id,
            batting = ?batting,
            super_over = is_super_over,
            "Match started"
        );

        let announcement = game.announcement();
        (game, announcement)
    }

    /// Fresh super-over match after a tie, Player batting first
    pub fn super_over(&self) -> Result<(Self, MatchEvent), MatchError> {
        match self.phase {
            MatchPhase::Resolved(MatchResult::Tie) => Ok(Self::start(Role::Batting, true)),
            _ => Err(MatchError::NoTie),
        }
    }

    /// "Now batting" announcement for the current innings
    pub fn announcement(&self) -> MatchEvent {
        MatchEvent::InningsStarted {
            batting: self.batting,
            target: self.target,
            super_over: self.is_super_over,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.phase, MatchPhase::InningsOne | MatchPhase::InningsTwo)
    }

    pub fn result(&self) -> Option<MatchResult> {
        match self.phase {
            MatchPhase::Resolved(result) => Some(result),
            _ => None,
        }
    }

    pub fn batting(&self) -> Side {
        self.batting
    }

    pub fn first_batting_side(&self) -> Side {
        self.first_batting_side
    }

    pub fn player_score(&self) -> u32 {
        self.player_score
    }

    pub fn bot_score(&self) -> u32 {
        self.bot_score
    }

    pub fn balls_bowled(&self) -> u32 {
        self.balls_bowled
    }

    pub fn target(&self) -> Option<u32> {
        self.target
    }

    pub fn is_super_over(&self) -> bool {
        self.is_super_over
    }

    pub fn score_of(&self, side: Side) -> u32 {
        match side {
            Side::Player => self.player_score,
            Side::Bot => self.bot_score,
        }
    }

    fn score_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::Player => &mut self.player_score,
            Side::Bot => &mut self.bot_score,
        }
    }

    /// Play one ball.
    ///
    /// Validation happens before any draw or mutation, so a rejected move
    /// leaves the match untouched. On resolution `sink` receives the Player's
    /// final score.
    pub fn submit_move<R, S>(
        &mut self,
        player_move: u8,
        rng: &mut R,
        sink: &mut S,
    ) -> Result<MoveOutcome, MatchError>
    where
        R: MatchRng + ?Sized,
        S: ScoreSink + ?Sized,
    {
        if !self.is_playing() {
            return Err(MatchError::NotPlaying);
        }
        if !(MIN_SIGN..=MAX_SIGN).contains(&player_move) {
            return Err(MatchError::InvalidMove(player_move));
        }

        let bot_move = rng.roll_die();
        self.balls_bowled += 1;

        let batting = self.batting;
        let mut events = Vec::new();

        if player_move == bot_move {
            let score = self.score_of(batting);
            events.push(MatchEvent::Dismissal {
                side: batting,
                score,
            });

            match self.target {
                None => {
                    let target = score + 1;
                    self.target = Some(target);
                    self.batting = batting.opponent();
                    self.phase = MatchPhase::InningsTwo;

                    info!(match_id = %self.id, target, "Innings break");

                    events.push(MatchEvent::InningsBreak { target });
                    events.push(self.announcement());
                }
                Some(_) => events.push(self.resolve(sink)),
            }
        } else {
            // the bot's sign is the runs scored, whichever side bats
            let runs = u32::from(bot_move);
            let old_score = self.score_of(batting);
            let total = old_score + runs;
            *self.score_mut(batting) = total;

            events.push(MatchEvent::Runs {
                side: batting,
                runs,
                total,
            });

            if batting == Side::Player {
                if let Some(score) = detect_milestone(old_score, total) {
                    events.push(MatchEvent::Milestone { score });
                }
            }

            if self.target.is_some_and(|target| total >= target) {
                events.push(self.resolve(sink));
            }
        }

        debug!(
            match_id = %self.id,
            player_move,
            bot_move,
            player_score = self.player_score,
            bot_score = self.bot_score,
            "Ball played"
        );

        Ok(MoveOutcome {
            player_move,
            bot_move,
            events,
        })
    }

    fn resolve<S: ScoreSink + ?Sized>(&mut self, sink: &mut S) -> MatchEvent {
        let result = if self.player_score > self.bot_score {
            MatchResult::Win
        } else if self.bot_score > self.player_score {
            MatchResult::Loss
        } else {
            MatchResult::Tie
        };

        self.phase = MatchPhase::Resolved(result);
        sink.record_final_score(self.player_score);

        info!(
            match_id = %self.id,
            result = ?result,
            player_score = self.player_score,
            bot_score = self.bot_score,
            balls = self.balls_bowled,
            "Match resolved"
        );

        MatchEvent::Resolved {
            result,
            player_score: self.player_score,
            bot_score: self.bot_score,
        }
    }

    /// Display snapshot
    pub fn scoreboard(&self) -> Scoreboard {
        let runs = self.score_of(self.batting);
        let chasing = self.batting != self.first_batting_side;
        let score_line = match self.target {
            Some(target) if chasing => format!("{}/{}", runs, target),
            _ => runs.to_string(),
        };

        Scoreboard {
            batting: self.batting,
            runs,
            target: self.target,
            score_line,
            player_score: self.player_score,
            bot_score: self.bot_score,
            balls_bowled: self.balls_bowled,
            super_over: self.is_super_over,
        }
    }
}

/// Match errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("Match is not in play")]
    NotPlaying,

    #[error("Invalid move {0}: must be between 1 and 6")]
    InvalidMove(u8),

    #[error("Super over is only available after a tie")]
    NoTie,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rng::scripted::ScriptedRng;
    use crate::game::SeededRng;

    /// Play `moves` against scripted bot rolls
    fn play(game: &mut Match, moves: &[(u8, u8)], sink: &mut Vec<u32>) -> Vec<MoveOutcome> {
        let mut rng = ScriptedRng::dice(&moves.iter().map(|(_, b)| *b).collect::<Vec<_>>());
        moves
            .iter()
            .map(|(p, _)| game.submit_move(*p, &mut rng, sink).unwrap())
            .collect()
    }

    /// Player bats 35 in seven balls, then is out
    fn player_bats_35(sink: &mut Vec<u32>) -> Match {
        let (mut game, _) = Match::start(Role::Batting, false);
        let mut balls = vec![(1, 5); 7];
        balls.push((3, 3));
        play(&mut game, &balls, sink);
        game
    }

    #[test]
    fn start_announces_the_batting_side() {
        let (game, event) = Match::start(Role::Bowling, false);
        assert!(game.is_playing());
        assert_eq!(game.phase(), MatchPhase::InningsOne);
        assert_eq!(game.batting(), Side::Bot);
        assert_eq!(game.target(), None);
        assert_eq!(
            event,
            MatchEvent::InningsStarted {
                batting: Side::Bot,
                target: None,
                super_over: false,
            }
        );
    }

    #[test]
    fn first_innings_dismissal_sets_target_and_swaps() {
        let mut sink = Vec::new();
        let game = player_bats_35(&mut sink);

        assert_eq!(game.player_score(), 35);
        assert_eq!(game.target(), Some(36));
        assert_eq!(game.batting(), Side::Bot);
        assert_eq!(game.phase(), MatchPhase::InningsTwo);
        assert_eq!(game.balls_bowled(), 8);
        assert!(sink.is_empty());
    }

    #[test]
    fn batting_player_is_credited_the_bot_sign() {
        let (mut game, _) = Match::start(Role::Batting, false);
        let mut rng = ScriptedRng::dice(&[2]);
        let mut sink = Vec::new();

        let outcome = game.submit_move(5, &mut rng, &mut sink).unwrap();

        assert_eq!(outcome.bot_move, 2);
        assert_eq!(game.player_score(), 2);
        assert_eq!(game.bot_score(), 0);
        assert_eq!(
            outcome.events,
            vec![MatchEvent::Runs {
                side: Side::Player,
                runs: 2,
                total: 2,
            }]
        );
    }

    #[test]
    fn dismissal_emits_break_and_new_innings() {
        let (mut game, _) = Match::start(Role::Batting, false);
        let mut sink = Vec::new();
        let outcome = &play(&mut game, &[(4, 2), (6, 6)], &mut sink)[1];

        assert_eq!(
            outcome.events,
            vec![
                MatchEvent::Dismissal {
                    side: Side::Player,
                    score: 2,
                },
                MatchEvent::InningsBreak { target: 3 },
                MatchEvent::InningsStarted {
                    batting: Side::Bot,
                    target: Some(3),
                    super_over: false,
                },
            ]
        );
    }

    #[test]
    fn bot_reaching_target_is_an_immediate_loss() {
        let mut sink = Vec::new();
        let mut game = player_bats_35(&mut sink);

        let outcomes = play(&mut game, &[(1, 6); 6], &mut sink);

        assert_eq!(game.bot_score(), 36);
        assert_eq!(game.result(), Some(MatchResult::Loss));
        assert_eq!(outcomes.last().and_then(MoveOutcome::result), Some(MatchResult::Loss));
        assert_eq!(sink, vec![35]);
        assert_eq!(game.target(), Some(36));
    }

    #[test]
    fn player_reaching_target_wins_without_dismissal() {
        let (mut game, _) = Match::start(Role::Bowling, false);
        let mut sink = Vec::new();
        // bot makes 4 then is out
        play(&mut game, &[(1, 4), (2, 2)], &mut sink);
        assert_eq!(game.target(), Some(5));
        assert_eq!(game.batting(), Side::Player);

        play(&mut game, &[(1, 3), (5, 2)], &mut sink);
        assert_eq!(game.player_score(), 5);
        assert_eq!(game.result(), Some(MatchResult::Win));
        assert_eq!(sink, vec![5]);
    }

    #[test]
    fn chasing_bot_dismissed_short_is_a_win() {
        let (mut game, _) = Match::start(Role::Batting, false);
        let mut sink = Vec::new();
        play(&mut game, &[(1, 6), (1, 6), (4, 4)], &mut sink);
        assert_eq!(game.target(), Some(13));

        let outcomes = play(&mut game, &[(2, 5), (3, 3)], &mut sink);
        assert_eq!(game.result(), Some(MatchResult::Win));
        assert_eq!(
            outcomes[1].events,
            vec![
                MatchEvent::Dismissal {
                    side: Side::Bot,
                    score: 5,
                },
                MatchEvent::Resolved {
                    result: MatchResult::Win,
                    player_score: 12,
                    bot_score: 5,
                },
            ]
        );
        assert_eq!(sink, vec![12]);
    }

    #[test]
    fn level_scores_after_dismissal_tie_and_lead_to_super_over() {
        let (mut game, _) = Match::start(Role::Batting, false);
        let mut sink = Vec::new();
        play(&mut game, &[(1, 4), (1, 4), (2, 2)], &mut sink);
        assert_eq!(game.target(), Some(9));

        play(&mut game, &[(1, 6), (1, 2), (3, 3)], &mut sink);
        assert_eq!(game.bot_score(), 8);
        assert_eq!(game.result(), Some(MatchResult::Tie));
        assert_eq!(sink, vec![8]);

        let (super_over, event) = game.super_over().unwrap();
        assert!(super_over.is_super_over());
        assert_eq!(super_over.batting(), Side::Player);
        assert_eq!(super_over.player_score(), 0);
        assert_eq!(super_over.target(), None);
        assert_eq!(
            event,
            MatchEvent::InningsStarted {
                batting: Side::Player,
                target: None,
                super_over: true,
            }
        );
    }

    #[test]
    fn super_over_needs_a_tie() {
        let mut sink = Vec::new();
        let game = player_bats_35(&mut sink);
        assert_eq!(game.super_over().unwrap_err(), MatchError::NoTie);
    }

    #[test]
    fn moves_after_resolution_are_rejected_without_effect() {
        let mut sink = Vec::new();
        let mut game = player_bats_35(&mut sink);
        play(&mut game, &[(1, 6); 6], &mut sink);
        let before = game.clone();

        let mut rng = ScriptedRng::dice(&[2]);
        let err = game.submit_move(3, &mut rng, &mut sink).unwrap_err();

        assert_eq!(err, MatchError::NotPlaying);
        assert_eq!(game, before);
        assert_eq!(rng.remaining_dice(), 1);
        assert_eq!(sink, vec![35]);
    }

    #[test]
    fn out_of_range_moves_do_not_mutate() {
        let (mut game, _) = Match::start(Role::Batting, false);
        let before = game.clone();
        let mut rng = ScriptedRng::dice(&[1]);
        let mut sink = Vec::new();

        assert_eq!(
            game.submit_move(0, &mut rng, &mut sink).unwrap_err(),
            MatchError::InvalidMove(0)
        );
        assert_eq!(
            game.submit_move(7, &mut rng, &mut sink).unwrap_err(),
            MatchError::InvalidMove(7)
        );
        assert_eq!(game, before);
        assert_eq!(rng.remaining_dice(), 1);
    }

    #[test]
    fn unstarted_match_rejects_moves() {
        let mut game = Match::default();
        let mut rng = ScriptedRng::dice(&[1]);
        let mut sink = Vec::new();
        assert_eq!(
            game.submit_move(1, &mut rng, &mut sink).unwrap_err(),
            MatchError::NotPlaying
        );
    }

    #[test]
    fn milestones_only_for_player_runs() {
        let (mut game, _) = Match::start(Role::Batting, false);
        let mut sink = Vec::new();
        let balls = vec![(1, 6); 9];
        let outcomes = play(&mut game, &balls, &mut sink);
        // 48 -> 54 on the ninth ball
        assert_eq!(
            outcomes[8].events.last(),
            Some(&MatchEvent::Milestone { score: 50 })
        );
        assert_eq!(
            outcomes
                .iter()
                .flat_map(|o| &o.events)
                .filter(|e| matches!(e, MatchEvent::Milestone { .. }))
                .count(),
            1
        );

        let (mut game, _) = Match::start(Role::Bowling, false);
        let outcomes = play(&mut game, &[(1, 6); 10], &mut sink);
        assert!(outcomes
            .iter()
            .flat_map(|o| &o.events)
            .all(|e| !matches!(e, MatchEvent::Milestone { .. })));
    }

    #[test]
    fn scoreboard_shows_chase_only_for_second_side() {
        let (mut game, _) = Match::start(Role::Batting, false);
        let mut sink = Vec::new();
        play(&mut game, &[(1, 5)], &mut sink);
        assert_eq!(game.scoreboard().score_line, "5");

        play(&mut game, &[(2, 2), (1, 4)], &mut sink);
        let board = game.scoreboard();
        assert_eq!(board.batting, Side::Bot);
        assert_eq!(board.score_line, "4/6");
        assert_eq!(board.player_score, 5);
    }

    #[test]
    fn random_matches_resolve_exactly_once() {
        let mut rng = SeededRng::new(2024);
        for round in 0..200u32 {
            let role = if round % 2 == 0 {
                Role::Batting
            } else {
                Role::Bowling
            };
            let (mut game, _) = Match::start(role, false);
            let mut sink = Vec::new();
            let mut first_innings = None;
            let mut balls = 0u32;

            while game.is_playing() {
                let player_move = (balls % 6) as u8 + 1;
                let batting = game.batting();
                let outcome = game.submit_move(player_move, &mut rng, &mut sink).unwrap();
                balls += 1;

                let dismissals = outcome
                    .events
                    .iter()
                    .filter(|e| matches!(e, MatchEvent::Dismissal { .. }))
                    .count();
                assert!(dismissals <= 1);

                if first_innings.is_none() && game.target().is_some() {
                    first_innings = Some(game.score_of(batting));
                }
                if let Some(first) = first_innings {
                    assert_eq!(game.target(), Some(first + 1));
                }
            }

            assert_eq!(game.balls_bowled(), balls);
            assert_eq!(sink, vec![game.player_score()]);
            let result = game.result().unwrap();
            match result {
                MatchResult::Win => assert!(game.player_score() > game.bot_score()),
                MatchResult::Loss => assert!(game.bot_score() > game.player_score()),
                MatchResult::Tie => assert_eq!(game.bot_score(), game.player_score()),
            }
        }
    }
}
