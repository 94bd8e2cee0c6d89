//! Highlight generator
//!
//! Compares the previous and the new snapshot of an innings and names what
//! happened in between, so viewers can animate a boundary or a wicket
//! without diffing full snapshots themselves.
//!
//! Flow per publish:
//! 1. Build the new snapshot
//! 2. Diff it against the last one this generator saw
//! 3. Remember the new snapshot for the next diff

use cricket_types::delivery::WicketType;
use cricket_types::fixture::MatchResult;
use cricket_types::ids::PlayerId;
use cricket_types::innings::ClosureReason;
use serde::{Deserialize, Serialize};

use crate::scorecard::BattingFigures;
use crate::snapshot::StateSnapshot;

/// Batting milestones are announced every this many runs.
pub const MILESTONE_STEP: u32 = 50;

/// Why a snapshot was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateCause {
    Delivery,
    Correction { from_sequence: u64 },
    /// Innings opened or closed, match decided.
    Lifecycle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Highlight {
    Boundary {
        sequence: u64,
        batter: PlayerId,
        runs: u32,
    },
    Wicket {
        sequence: u64,
        player_out: PlayerId,
        kind: WicketType,
        wicket: u32,
        score: u32,
    },
    Retirement {
        sequence: u64,
        player: PlayerId,
    },
    OverComplete {
        over_number: u32,
        runs: u32,
        wickets: u32,
        maiden: bool,
    },
    Milestone {
        batter: PlayerId,
        runs: u32,
    },
    FreeHit,
    InningsClosed {
        reason: ClosureReason,
        runs: u32,
        wickets: u32,
    },
    MatchDecided {
        result: MatchResult,
    },
    Correction {
        from_sequence: u64,
    },
}

/// Keeps the last snapshot and diffs each new one against it.
#[derive(Debug, Clone, Default)]
pub struct HighlightGenerator {
    last: Option<StateSnapshot>,
}

impl HighlightGenerator {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn last(&self) -> Option<&StateSnapshot> {
        self.last.as_ref()
    }

    /// Highlights between the remembered snapshot and `after`, then remember `after`.
    pub fn generate(&mut self, after: &StateSnapshot, cause: UpdateCause) -> Vec<Highlight> {
        let highlights = match &self.last {
            Some(before) => diff(before, after, cause),
            None => lifecycle(None, after),
        };
        self.last = Some(after.clone());
        highlights
    }
}

fn diff(before: &StateSnapshot, after: &StateSnapshot, cause: UpdateCause) -> Vec<Highlight> {
    let mut highlights = Vec::new();

    match cause {
        UpdateCause::Delivery => {
            if let Some(ball) = after.last_ball.as_ref().filter(|b| Some(b.sequence) > before.last_sequence) {
                if ball.four || ball.six {
                    highlights.push(Highlight::Boundary {
                        sequence: ball.sequence,
                        batter: ball.striker.clone(),
                        runs: ball.runs_batter,
                    });
                }
                if let Some(dismissal) = &ball.dismissal {
                    if dismissal.kind.counts_as_wicket() {
                        highlights.push(Highlight::Wicket {
                            sequence: ball.sequence,
                            player_out: dismissal.player_out.clone(),
                            kind: dismissal.kind,
                            wicket: after.wickets,
                            score: after.runs,
                        });
                    } else {
                        highlights.push(Highlight::Retirement {
                            sequence: ball.sequence,
                            player: dismissal.player_out.clone(),
                        });
                    }
                }
            }

            let over_changed = after.last_over.as_ref().map(|o| o.over_number)
                != before.last_over.as_ref().map(|o| o.over_number);
            if let Some(over) = after.last_over.as_ref().filter(|_| over_changed) {
                highlights.push(Highlight::OverComplete {
                    over_number: over.over_number,
                    runs: over.runs,
                    wickets: over.wickets,
                    maiden: over.maiden,
                });
            }

            for figures in [&after.striker, &after.non_striker].into_iter().flatten() {
                let previous = runs_before(before, &figures.player);
                if figures.runs / MILESTONE_STEP > previous / MILESTONE_STEP {
                    highlights.push(Highlight::Milestone {
                        batter: figures.player.clone(),
                        runs: figures.runs / MILESTONE_STEP * MILESTONE_STEP,
                    });
                }
            }

            if after.free_hit && !before.free_hit {
                highlights.push(Highlight::FreeHit);
            }
        }
        UpdateCause::Correction { from_sequence } => {
            highlights.push(Highlight::Correction { from_sequence });
        }
        UpdateCause::Lifecycle => {}
    }

    highlights.extend(lifecycle(Some(before), after));
    highlights
}

/// Closure and result changes, whatever the cause.
fn lifecycle(before: Option<&StateSnapshot>, after: &StateSnapshot) -> Vec<Highlight> {
    let mut highlights = Vec::new();
    if let Some(closure) = after.closure {
        if before.and_then(|b| b.closure).is_none() {
            highlights.push(Highlight::InningsClosed {
                reason: closure.reason,
                runs: closure.runs,
                wickets: closure.wickets,
            });
        }
    }
    if let Some(result) = &after.result {
        if before.and_then(|b| b.result.as_ref()).is_none() {
            highlights.push(Highlight::MatchDecided {
                result: result.clone(),
            });
        }
    }
    highlights
}

fn runs_before(before: &StateSnapshot, player: &PlayerId) -> u32 {
    [&before.striker, &before.non_striker]
        .into_iter()
        .flatten()
        .find(|f: &&BattingFigures| &f.player == player)
        .map(|f| f.runs)
        .unwrap_or(0)
}
