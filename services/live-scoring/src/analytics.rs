//! Analytics projector
//!
//! Derives chart data from the delivery stream:
//! - Manhattan/worm: one point per completed over
//! - Wagon wheel: shot placement per delivery with a wagon coordinate
//! - Pitch map: landing point per delivery with a pitch coordinate

use cricket_types::delivery::{Delivery, WicketType};
use cricket_types::ids::PlayerId;
use cricket_types::numeric::{round_rate, runs_per_over, BallCount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::state_machine::{LiveRates, Transition};

/// One bar of the manhattan chart and one step of the worm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverPoint {
    pub over_number: u32,
    pub runs: u32,
    pub wickets: u32,
    pub cumulative_runs: u32,
    pub cumulative_wickets: u32,
    pub over_run_rate: Decimal,
    pub cumulative_run_rate: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShotClass {
    Dot,
    Single,
    Multiple,
    Four,
    Six,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotPoint {
    pub sequence: u64,
    pub batter: PlayerId,
    pub x: Decimal,
    pub y: Decimal,
    pub runs: u32,
    pub shot: ShotClass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchPoint {
    pub sequence: u64,
    pub bowler: PlayerId,
    pub x: Decimal,
    pub y: Decimal,
    pub runs_conceded: u32,
    pub wicket: Option<WicketType>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct OverTally {
    runs: u32,
    wickets: u32,
}

/// Analytics accumulator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    overs: Vec<OverPoint>,
    current: OverTally,
    cumulative_runs: u32,
    cumulative_wickets: u32,
    balls: BallCount,
    wagon: Vec<ShotPoint>,
    pitch: Vec<PitchPoint>,
}

impl Analytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, delivery: &Delivery, transition: &Transition) {
        let outcome = &delivery.outcome;
        let total = outcome.total_runs();
        let wicket = u32::from(outcome.is_wicket());

        self.current.runs += total;
        self.current.wickets += wicket;
        self.cumulative_runs += total;
        self.cumulative_wickets += wicket;
        if outcome.is_legal() {
            self.balls.increment();
        }

        if transition.over_completed {
            let tally = std::mem::take(&mut self.current);
            self.overs.push(OverPoint {
                over_number: delivery.over_number,
                runs: tally.runs,
                wickets: tally.wickets,
                cumulative_runs: self.cumulative_runs,
                cumulative_wickets: self.cumulative_wickets,
                over_run_rate: round_rate(Decimal::from(tally.runs)),
                cumulative_run_rate: runs_per_over(self.cumulative_runs, self.balls),
            });
        }

        if let Some(point) = delivery.wagon {
            let shot = if outcome.six_off_bat() {
                ShotClass::Six
            } else if outcome.four_off_bat() {
                ShotClass::Four
            } else {
                match outcome.runs_batter {
                    0 => ShotClass::Dot,
                    1 => ShotClass::Single,
                    _ => ShotClass::Multiple,
                }
            };
            self.wagon.push(ShotPoint {
                sequence: delivery.sequence,
                batter: delivery.striker.clone(),
                x: point.x,
                y: point.y,
                runs: u32::from(outcome.runs_batter),
                shot,
            });
        }

        if let Some(point) = delivery.pitch {
            self.pitch.push(PitchPoint {
                sequence: delivery.sequence,
                bowler: delivery.bowler.clone(),
                x: point.x,
                y: point.y,
                runs_conceded: outcome.bowler_conceded(),
                wicket: outcome.dismissal.as_ref().map(|d| d.kind),
            });
        }
    }

    /// Completed overs only.
    pub fn manhattan(&self) -> &[OverPoint] {
        &self.overs
    }

    pub fn wagon_wheel(&self, batter: Option<&PlayerId>) -> Vec<ShotPoint> {
        self.wagon
            .iter()
            .filter(|s| batter.map_or(true, |b| &s.batter == b))
            .cloned()
            .collect()
    }

    pub fn pitch_map(&self, bowler: Option<&PlayerId>) -> Vec<PitchPoint> {
        self.pitch
            .iter()
            .filter(|s| bowler.map_or(true, |b| &s.bowler == b))
            .cloned()
            .collect()
    }
}

/// Analytics as served to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsView {
    pub rates: LiveRates,
    pub manhattan: Vec<OverPoint>,
    pub wagon_wheel: Vec<ShotPoint>,
    pub pitch_map: Vec<PitchPoint>,
}
