//! Ball counts and scoring rates
//!
//! Every count of deliveries is an integer number of legal balls. The
//! cricket "overs" notation (`15.4` = fifteen overs and four balls) is a
//! display format only and is produced by [`BallCount`]'s `Display`.
//!
//! Rates use rust_decimal with HALF_UP rounding to two places, so derived
//! views are reproducible bit-for-bit across replays.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Legal deliveries in a completed over.
pub const BALLS_PER_OVER: u32 = 6;

/// Decimal places kept on every published rate.
pub const RATE_SCALE: u32 = 2;

/// A count of legal deliveries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BallCount(u32);

impl BallCount {
    pub const ZERO: BallCount = BallCount(0);

    pub fn from_balls(balls: u32) -> Self {
        Self(balls)
    }

    /// Whole overs expressed as balls.
    pub fn from_overs(overs: u32) -> Self {
        Self(overs.saturating_mul(BALLS_PER_OVER))
    }

    pub fn balls(&self) -> u32 {
        self.0
    }

    pub fn completed_overs(&self) -> u32 {
        self.0 / BALLS_PER_OVER
    }

    /// Legal balls bowled in the over currently in progress (0..=5).
    pub fn balls_in_current_over(&self) -> u32 {
        self.0 % BALLS_PER_OVER
    }

    /// True when the count sits exactly on an over boundary (and is non-zero).
    pub fn is_over_boundary(&self) -> bool {
        self.0 > 0 && self.0 % BALLS_PER_OVER == 0
    }

    pub fn increment(&mut self) {
        self.0 += 1;
    }

    /// Balls left before `limit` is reached, zero once it is exceeded.
    pub fn remaining_until(&self, limit: BallCount) -> BallCount {
        BallCount(limit.0.saturating_sub(self.0))
    }
}

impl fmt::Display for BallCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.completed_overs(), self.balls_in_current_over())
    }
}

/// Round a rate to the published scale (HALF_UP).
pub fn round_rate(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(RATE_SCALE);
    rounded
}

/// Runs per six legal balls. Zero before the first legal ball.
pub fn runs_per_over(runs: u32, balls: BallCount) -> Decimal {
    if balls.balls() == 0 {
        return round_rate(Decimal::ZERO);
    }
    round_rate(Decimal::from(runs) * Decimal::from(BALLS_PER_OVER) / Decimal::from(balls.balls()))
}

/// `numerator / denominator`, absent when the denominator is zero.
pub fn ratio(numerator: u32, denominator: u32) -> Option<Decimal> {
    if denominator == 0 {
        return None;
    }
    Some(round_rate(Decimal::from(numerator) / Decimal::from(denominator)))
}

/// Batting strike rate: runs per hundred balls faced. Zero before the first ball.
pub fn strike_rate(runs: u32, balls: u32) -> Decimal {
    if balls == 0 {
        return round_rate(Decimal::ZERO);
    }
    round_rate(Decimal::from(runs) * Decimal::ONE_HUNDRED / Decimal::from(balls))
}
