//! Innings lifecycle types
//!
//! An innings is opened once the batting and bowling sides are fixed and is
//! closed exactly once, either automatically by a delivery (all out, overs
//! exhausted, target reached) or by an explicit declaration/forfeit.

use serde::{Deserialize, Serialize};

use crate::ids::{InningsId, MatchId, TeamId};
use crate::numeric::BallCount;

/// Wickets available in a super over.
pub const SUPER_OVER_WICKETS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InningsKind {
    Regular,
    SuperOver,
}

/// Why an innings closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosureReason {
    AllOut,
    OversExhausted,
    TargetReached,
    Declared,
    Forfeited,
}

impl ClosureReason {
    /// Closures caused by a delivery rather than a captain's decision.
    pub fn is_automatic(&self) -> bool {
        matches!(
            self,
            ClosureReason::AllOut | ClosureReason::OversExhausted | ClosureReason::TargetReached
        )
    }
}

/// Terminal state of an innings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closure {
    pub reason: ClosureReason,
    /// Legal balls bowled when the innings closed.
    pub balls: BallCount,
    pub runs: u32,
    pub wickets: u32,
    /// Sequence of the delivery that closed the innings, if any.
    pub at_sequence: Option<u64>,
}

/// Fixed parameters of an innings, decided when it is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InningsMeta {
    pub innings_id: InningsId,
    pub match_id: MatchId,
    /// 1-based position within the match, super overs included.
    pub number: u32,
    pub kind: InningsKind,
    pub batting_team: TeamId,
    pub bowling_team: TeamId,
    /// None for unlimited-overs innings.
    pub overs_limit: Option<u32>,
    /// Wickets that end the innings (team size - 1, or 2 in a super over).
    pub max_wickets: u32,
    /// Runs required to win, set for the final innings of a chase.
    pub target: Option<u32>,
    pub follow_on: bool,
}

impl InningsMeta {
    pub fn ball_limit(&self) -> Option<BallCount> {
        self.overs_limit.map(BallCount::from_overs)
    }
}

/// Totals of an innings as seen by the match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InningsSummary {
    pub innings_id: InningsId,
    pub number: u32,
    pub kind: InningsKind,
    pub batting_team: TeamId,
    pub runs: u32,
    pub wickets: u32,
    pub max_wickets: u32,
    pub balls: BallCount,
    pub target: Option<u32>,
    pub closure: Option<Closure>,
}

impl InningsSummary {
    pub fn is_closed(&self) -> bool {
        self.closure.is_some()
    }

    pub fn closure_reason(&self) -> Option<ClosureReason> {
        self.closure.map(|c| c.reason)
    }

    /// Wickets left in hand when the innings ended.
    pub fn wickets_in_hand(&self) -> u32 {
        self.max_wickets.saturating_sub(self.wickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_automatic_closures() {
        assert!(ClosureReason::AllOut.is_automatic());
        assert!(ClosureReason::TargetReached.is_automatic());
        assert!(!ClosureReason::Declared.is_automatic());
        assert!(!ClosureReason::Forfeited.is_automatic());
    }

    #[test]
    fn test_ball_limit() {
        let meta = InningsMeta {
            innings_id: InningsId::new(),
            match_id: MatchId::new(),
            number: 1,
            kind: InningsKind::Regular,
            batting_team: TeamId::new("home"),
            bowling_team: TeamId::new("away"),
            overs_limit: Some(20),
            max_wickets: 10,
            target: None,
            follow_on: false,
        };
        assert_eq!(meta.ball_limit(), Some(BallCount::from_balls(120)));
    }
}
