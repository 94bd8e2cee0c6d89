//! Match-level types: format, toss, status and result

use serde::{Deserialize, Serialize};

use crate::ids::{InningsId, MatchId, TeamId};
use crate::innings::InningsSummary;

/// Playing format of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchFormat {
    T10,
    T20,
    Odi,
    Test,
    /// Limited-overs match with a custom overs limit per side.
    LimitedOvers { overs: u32 },
}

impl MatchFormat {
    /// Overs per regular innings, None for unlimited formats.
    pub fn overs_limit(&self) -> Option<u32> {
        match self {
            MatchFormat::T10 => Some(10),
            MatchFormat::T20 => Some(20),
            MatchFormat::Odi => Some(50),
            MatchFormat::Test => None,
            MatchFormat::LimitedOvers { overs } => Some(*overs),
        }
    }

    pub fn is_limited_overs(&self) -> bool {
        self.overs_limit().is_some()
    }

    /// Regular innings per match (super overs excluded).
    pub fn regular_innings(&self) -> u32 {
        if self.is_limited_overs() {
            2
        } else {
            4
        }
    }

    /// First-innings lead required to enforce the follow-on.
    pub fn follow_on_margin(&self) -> Option<u32> {
        match self {
            MatchFormat::Test => Some(200),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TossDecision {
    Bat,
    Bowl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toss {
    pub won_by: TeamId,
    pub decision: TossDecision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Scheduled,
    Live,
    InningsBreak,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultKind {
    Win,
    Tie,
    Draw,
}

/// Winning margin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Margin {
    Runs(u32),
    Wickets(u32),
    InningsAndRuns(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub kind: ResultKind,
    pub winner: Option<TeamId>,
    pub margin: Option<Margin>,
}

impl MatchResult {
    pub fn win(winner: TeamId, margin: Margin) -> Self {
        Self {
            kind: ResultKind::Win,
            winner: Some(winner),
            margin: Some(margin),
        }
    }

    pub fn tie() -> Self {
        Self {
            kind: ResultKind::Tie,
            winner: None,
            margin: None,
        }
    }

    pub fn draw() -> Self {
        Self {
            kind: ResultKind::Draw,
            winner: None,
            margin: None,
        }
    }

    pub fn is_tie(&self) -> bool {
        self.kind == ResultKind::Tie
    }
}

/// Parameters for creating a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSetup {
    pub format: MatchFormat,
    pub home: TeamId,
    pub away: TeamId,
}

/// Engine-side record of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub format: MatchFormat,
    pub home: TeamId,
    pub away: TeamId,
    pub toss: Option<Toss>,
    pub status: MatchStatus,
    /// Innings in the order they were opened.
    pub innings: Vec<InningsSummary>,
    pub result: Option<MatchResult>,
}

impl MatchRecord {
    pub fn new(setup: MatchSetup) -> Self {
        Self {
            match_id: MatchId::new(),
            format: setup.format,
            home: setup.home,
            away: setup.away,
            toss: None,
            status: MatchStatus::Scheduled,
            innings: Vec::new(),
            result: None,
        }
    }

    pub fn has_team(&self, team: &TeamId) -> bool {
        &self.home == team || &self.away == team
    }

    pub fn opponent_of(&self, team: &TeamId) -> Option<&TeamId> {
        if &self.home == team {
            Some(&self.away)
        } else if &self.away == team {
            Some(&self.home)
        } else {
            None
        }
    }

    pub fn summary(&self, innings_id: &InningsId) -> Option<&InningsSummary> {
        self.innings.iter().find(|s| &s.innings_id == innings_id)
    }

    pub fn summary_mut(&mut self, innings_id: &InningsId) -> Option<&mut InningsSummary> {
        self.innings.iter_mut().find(|s| &s.innings_id == innings_id)
    }

    pub fn current_innings(&self) -> Option<&InningsSummary> {
        self.innings.last()
    }
}
