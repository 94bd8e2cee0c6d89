//! Match lifecycle rules
//!
//! Pure functions over a [`MatchRecord`]: which side bats next and with what
//! target, and whether the closed innings so far decide the match.

use cricket_types::errors::ScoringError;
use cricket_types::fixture::{Margin, MatchRecord, MatchResult, MatchStatus, TossDecision};
use cricket_types::ids::TeamId;
use cricket_types::innings::{ClosureReason, InningsKind, InningsSummary, SUPER_OVER_WICKETS};

/// Everything needed to open the next innings, minus the players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InningsPlan {
    pub number: u32,
    pub kind: InningsKind,
    pub batting_team: TeamId,
    pub bowling_team: TeamId,
    pub overs_limit: Option<u32>,
    /// Fixed wicket allowance; None means team size − 1.
    pub max_wickets: Option<u32>,
    pub target: Option<u32>,
    pub follow_on: bool,
}

/// Work out the next innings.
///
/// `enforce_follow_on` only matters when opening the third innings of a
/// multi-innings match.
pub fn plan_next_innings(record: &MatchRecord, enforce_follow_on: bool) -> Result<InningsPlan, ScoringError> {
    let Some(toss) = &record.toss else {
        return Err(ScoringError::invalid_match_state("toss has not been recorded"));
    };
    if let Some(last) = record.innings.last() {
        if !last.is_closed() {
            return Err(ScoringError::invalid_match_state(format!(
                "innings {} is still in progress",
                last.number
            )));
        }
    }

    let regular: Vec<&InningsSummary> = record
        .innings
        .iter()
        .filter(|s| s.kind == InningsKind::Regular)
        .collect();
    let super_overs: Vec<&InningsSummary> = record
        .innings
        .iter()
        .filter(|s| s.kind == InningsKind::SuperOver)
        .collect();
    let number = record.innings.len() as u32 + 1;

    if regular.len() as u32 >= record.format.regular_innings() {
        return plan_super_over(record, &super_overs, number);
    }
    if record.status == MatchStatus::Completed {
        return Err(ScoringError::invalid_match_state("match is already decided"));
    }

    let overs_limit = record.format.overs_limit();
    let plan = |batting_team: TeamId, target: Option<u32>, follow_on: bool| -> Result<InningsPlan, ScoringError> {
        let bowling_team = opponent(record, &batting_team)?;
        Ok(InningsPlan {
            number,
            kind: InningsKind::Regular,
            batting_team,
            bowling_team,
            overs_limit,
            max_wickets: None,
            target,
            follow_on,
        })
    };

    match regular.as_slice() {
        [] => {
            let batting = match toss.decision {
                TossDecision::Bat => toss.won_by.clone(),
                TossDecision::Bowl => opponent(record, &toss.won_by)?,
            };
            plan(batting, None, false)
        }
        [first] => {
            let batting = opponent(record, &first.batting_team)?;
            let target = record.format.is_limited_overs().then(|| first.runs + 1);
            plan(batting, target, false)
        }
        [first, second] => {
            if enforce_follow_on {
                let margin = record.format.follow_on_margin().unwrap_or(u32::MAX);
                let lead = first.runs.saturating_sub(second.runs);
                if lead < margin {
                    return Err(ScoringError::invalid_match_state(format!(
                        "follow-on needs a lead of {}, lead is {}",
                        margin, lead
                    )));
                }
                plan(second.batting_team.clone(), None, true)
            } else {
                plan(first.batting_team.clone(), None, false)
            }
        }
        [.., third] => {
            let batting = opponent(record, &third.batting_team)?;
            let own = aggregate(&regular, &batting);
            let other = aggregate(&regular, &third.batting_team);
            plan(batting, Some(other.saturating_sub(own) + 1), false)
        }
    }
}

fn plan_super_over(
    record: &MatchRecord,
    super_overs: &[&InningsSummary],
    number: u32,
) -> Result<InningsPlan, ScoringError> {
    if !record.format.is_limited_overs() {
        return Err(ScoringError::invalid_match_state("all innings have been played"));
    }
    let last = record
        .innings
        .last()
        .ok_or_else(|| ScoringError::invalid_match_state("no innings played"))?;

    let (batting_team, target) = if super_overs.len() % 2 == 0 {
        if !record.result.as_ref().is_some_and(|r| r.is_tie()) {
            return Err(ScoringError::invalid_match_state(
                "a super over can only follow a tie",
            ));
        }
        (last.batting_team.clone(), None)
    } else {
        (opponent(record, &last.batting_team)?, Some(last.runs + 1))
    };

    Ok(InningsPlan {
        number,
        kind: InningsKind::SuperOver,
        bowling_team: opponent(record, &batting_team)?,
        batting_team,
        overs_limit: Some(1),
        max_wickets: Some(SUPER_OVER_WICKETS),
        target,
        follow_on: false,
    })
}

/// Result implied by the closed innings, if the match is decided.
pub fn decide_result(record: &MatchRecord) -> Option<MatchResult> {
    if record.innings.iter().any(|s| !s.is_closed()) {
        return None;
    }

    let super_overs: Vec<&InningsSummary> = record
        .innings
        .iter()
        .filter(|s| s.kind == InningsKind::SuperOver)
        .collect();
    if !super_overs.is_empty() {
        return match super_overs.as_slice() {
            [.., first, second] if super_overs.len() % 2 == 0 => Some(compare_chase(record, first, second)),
            _ => None,
        };
    }

    let regular: Vec<&InningsSummary> = record.innings.iter().collect();
    if record.format.is_limited_overs() {
        return match regular.as_slice() {
            [first, second] => Some(compare_chase(record, first, second)),
            _ => None,
        };
    }

    match regular.as_slice() {
        [_, _, third] => {
            let batted_twice = &third.batting_team;
            let other = opponent(record, batted_twice).ok()?;
            let twice = aggregate(&regular, batted_twice);
            let once = aggregate(&regular, &other);
            (twice < once).then(|| MatchResult::win(other, Margin::InningsAndRuns(once - twice)))
        }
        [.., fourth] if regular.len() == 4 => {
            let target = fourth.target?;
            let defending = opponent(record, &fourth.batting_team).ok()?;
            if fourth.runs >= target {
                Some(MatchResult::win(
                    fourth.batting_team.clone(),
                    Margin::Wickets(fourth.wickets_in_hand()),
                ))
            } else if fourth.closure_reason() == Some(ClosureReason::AllOut) && fourth.runs + 1 == target {
                Some(MatchResult::tie())
            } else {
                Some(MatchResult::win(defending, Margin::Runs(target - 1 - fourth.runs)))
            }
        }
        _ => None,
    }
}

/// One side set a total, the other chased it.
fn compare_chase(record: &MatchRecord, first: &InningsSummary, second: &InningsSummary) -> MatchResult {
    if second.runs > first.runs {
        MatchResult::win(second.batting_team.clone(), Margin::Wickets(second.wickets_in_hand()))
    } else if second.runs < first.runs {
        let winner = opponent(record, &second.batting_team).unwrap_or_else(|_| first.batting_team.clone());
        MatchResult::win(winner, Margin::Runs(first.runs - second.runs))
    } else {
        MatchResult::tie()
    }
}

fn aggregate(innings: &[&InningsSummary], team: &TeamId) -> u32 {
    innings
        .iter()
        .filter(|s| &s.batting_team == team)
        .map(|s| s.runs)
        .sum()
}

fn opponent(record: &MatchRecord, team: &TeamId) -> Result<TeamId, ScoringError> {
    record
        .opponent_of(team)
        .cloned()
        .ok_or_else(|| ScoringError::invalid_match_state(format!("{} is not playing this match", team)))
}
