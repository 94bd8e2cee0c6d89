//! Over/innings state machine
//!
//! Consumes deliveries in sequence order and maintains everything the rules
//! need to judge the next one: legal-ball counter, strike pair, free-hit
//! status, dismissed batters and the innings closure.
//!
//! Validation and application are split: [`InningsState::validate`] never
//! mutates, [`InningsState::apply`] never fails. A rejected delivery
//! therefore leaves the state untouched.

use std::collections::BTreeSet;

use cricket_types::delivery::{Delivery, ExtraType};
use cricket_types::errors::ScoringError;
use cricket_types::ids::{InningsId, PlayerId};
use cricket_types::innings::{Closure, ClosureReason, InningsMeta};
use cricket_types::numeric::{runs_per_over, BallCount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How strictly the batting pair of a delivery is checked against the
/// pair the state machine expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndsCheck {
    /// Striker and non-striker must match the computed ends exactly.
    Strict,
    /// The pair must match, ends follow the recorded labels.
    Lenient,
}

/// Players eligible on each side, fixed when the innings opens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sides {
    pub batting: BTreeSet<PlayerId>,
    pub bowling: BTreeSet<PlayerId>,
}

/// Authoritative label for the next delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub over_number: u32,
    pub ball_in_over: u32,
    pub is_free_hit: bool,
}

/// What a single delivery changed at the innings level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    pub over_completed: bool,
    pub wicket: bool,
    pub closure: Option<Closure>,
}

/// Live rates derived from the counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRates {
    pub run_rate: Decimal,
    pub required_runs: Option<u32>,
    pub balls_remaining: Option<BallCount>,
    pub required_run_rate: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InningsState {
    pub innings_id: InningsId,
    pub max_wickets: u32,
    pub ball_limit: Option<BallCount>,
    pub target: Option<u32>,
    pub enforce_free_hit: bool,
    pub sides: Sides,

    pub runs: u32,
    pub wickets: u32,
    pub balls: BallCount,
    pub striker: Option<PlayerId>,
    pub non_striker: Option<PlayerId>,
    /// Survivor waiting for a new partner after a dismissal or retirement.
    pub awaiting_partner: Option<PlayerId>,
    pub dismissed: BTreeSet<PlayerId>,
    pub retired: BTreeSet<PlayerId>,
    /// Batters in order of first appearance.
    pub batting_order: Vec<PlayerId>,
    pub free_hit_pending: bool,
    /// Deliveries applied so far (legal and illegal).
    pub deliveries: usize,
    pub last_sequence: Option<u64>,
    pub closure: Option<Closure>,
}

impl InningsState {
    pub fn new(meta: &InningsMeta, sides: Sides, enforce_free_hit: bool) -> Self {
        Self {
            innings_id: meta.innings_id,
            max_wickets: meta.max_wickets,
            ball_limit: meta.ball_limit(),
            target: meta.target,
            enforce_free_hit,
            sides,
            runs: 0,
            wickets: 0,
            balls: BallCount::ZERO,
            striker: None,
            non_striker: None,
            awaiting_partner: None,
            dismissed: BTreeSet::new(),
            retired: BTreeSet::new(),
            batting_order: Vec::new(),
            free_hit_pending: false,
            deliveries: 0,
            last_sequence: None,
            closure: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closure.is_some()
    }

    /// Label the next delivery would carry. An illegal delivery carries the
    /// label of the legal ball still to be bowled.
    pub fn next_placement(&self) -> Placement {
        Placement {
            over_number: self.balls.completed_overs() + 1,
            ball_in_over: self.balls.balls_in_current_over() + 1,
            is_free_hit: self.free_hit_pending,
        }
    }

    /// The pair expected at the crease, striker first. None before the first
    /// ball and while a partner is awaited.
    pub fn expected_pair(&self) -> Option<(PlayerId, PlayerId)> {
        if self.awaiting_partner.is_some() {
            return None;
        }
        match (&self.striker, &self.non_striker) {
            (Some(s), Some(n)) => Some((s.clone(), n.clone())),
            _ => None,
        }
    }

    /// Check a fully placed delivery against the rules without mutating.
    pub fn validate(&self, delivery: &Delivery, ends: EndsCheck) -> Result<(), ScoringError> {
        if self.is_closed() {
            return Err(ScoringError::InningsClosed {
                innings_id: self.innings_id.to_string(),
            });
        }

        delivery.outcome.validate()?;

        if let Some(point) = delivery.wagon.iter().chain(delivery.pitch.iter()).find(|p| !p.is_normalized()) {
            return Err(ScoringError::invalid_delivery(format!(
                "coordinate ({}, {}) outside 0..=100",
                point.x, point.y
            )));
        }

        if delivery.striker == delivery.non_striker {
            return Err(ScoringError::invalid_players(format!(
                "{} cannot be both striker and non-striker",
                delivery.striker
            )));
        }
        for batter in [&delivery.striker, &delivery.non_striker] {
            if !self.sides.batting.contains(batter) {
                return Err(ScoringError::invalid_players(format!(
                    "{} is not in the batting side",
                    batter
                )));
            }
        }
        if !self.sides.bowling.contains(&delivery.bowler) {
            return Err(ScoringError::invalid_players(format!(
                "{} is not in the bowling side",
                delivery.bowler
            )));
        }

        if let Some(dismissal) = delivery.dismissal() {
            if self.dismissed.contains(&dismissal.player_out) {
                return Err(ScoringError::DuplicateDismissal {
                    player: dismissal.player_out.to_string(),
                });
            }
            if !delivery.involves_batter(&dismissal.player_out) {
                return Err(ScoringError::invalid_players(format!(
                    "{} is not at the crease",
                    dismissal.player_out
                )));
            }
            if dismissal.kind.striker_only() && dismissal.player_out != delivery.striker {
                return Err(ScoringError::invalid_delivery(format!(
                    "{:?} can only dismiss the striker",
                    dismissal.kind
                )));
            }
            if let Some(fielder) = &dismissal.fielder {
                if !self.sides.bowling.contains(fielder) {
                    return Err(ScoringError::invalid_players(format!(
                        "fielder {} is not in the fielding side",
                        fielder
                    )));
                }
            }
            if delivery.is_free_hit && self.enforce_free_hit && !dismissal.kind.allowed_on_free_hit() {
                return Err(ScoringError::invalid_delivery(format!(
                    "{:?} is not possible on a free hit",
                    dismissal.kind
                )));
            }
        }

        for batter in [&delivery.striker, &delivery.non_striker] {
            if self.dismissed.contains(batter) {
                return Err(ScoringError::invalid_players(format!(
                    "{} has already been dismissed",
                    batter
                )));
            }
        }

        self.check_pair(delivery, ends)
    }

    fn check_pair(&self, delivery: &Delivery, ends: EndsCheck) -> Result<(), ScoringError> {
        if let Some(survivor) = &self.awaiting_partner {
            let incoming = if &delivery.striker == survivor {
                &delivery.non_striker
            } else if &delivery.non_striker == survivor {
                &delivery.striker
            } else {
                return Err(ScoringError::IncomingBatterRequired {
                    survivor: survivor.to_string(),
                });
            };
            let has_batted = self.batting_order.contains(incoming);
            if has_batted && !self.retired.contains(incoming) {
                return Err(ScoringError::invalid_players(format!(
                    "{} cannot come in again",
                    incoming
                )));
            }
            return Ok(());
        }

        let Some((striker, non_striker)) = self.expected_pair() else {
            // First ball of the innings
            return Ok(());
        };

        let exact = delivery.striker == striker && delivery.non_striker == non_striker;
        let swapped = delivery.striker == non_striker && delivery.non_striker == striker;
        match ends {
            EndsCheck::Strict if exact => Ok(()),
            EndsCheck::Lenient if exact || swapped => Ok(()),
            _ => Err(ScoringError::invalid_players(format!(
                "expected {} on strike with {} at the non-striker's end",
                striker, non_striker
            ))),
        }
    }

    /// Apply a delivery that has passed [`InningsState::validate`].
    pub fn apply(&mut self, delivery: &Delivery) -> Transition {
        let outcome = &delivery.outcome;

        for batter in [&delivery.striker, &delivery.non_striker] {
            if !self.batting_order.contains(batter) {
                self.batting_order.push(batter.clone());
            }
            self.retired.remove(batter);
        }
        self.awaiting_partner = None;

        self.runs += outcome.total_runs();
        let legal = outcome.is_legal();
        if legal {
            self.balls.increment();
        }

        self.free_hit_pending = match outcome.extra_type {
            ExtraType::NoBall => true,
            _ if legal => false,
            _ => self.free_hit_pending,
        };

        let mut striker = delivery.striker.clone();
        let mut non_striker = delivery.non_striker.clone();
        // The over-completing ball swaps ends exactly once, whatever was run
        let over_completed = legal && self.balls.is_over_boundary();
        if over_completed || outcome.runs_run() % 2 == 1 {
            std::mem::swap(&mut striker, &mut non_striker);
        }

        let mut wicket = false;
        match outcome.dismissal.as_ref() {
            Some(dismissal) => {
                if dismissal.kind.counts_as_wicket() {
                    self.wickets += 1;
                    self.dismissed.insert(dismissal.player_out.clone());
                    wicket = true;
                } else {
                    self.retired.insert(dismissal.player_out.clone());
                }
                if dismissal.player_out == striker {
                    self.striker = None;
                    self.non_striker = Some(non_striker.clone());
                    self.awaiting_partner = Some(non_striker);
                } else {
                    self.striker = Some(striker.clone());
                    self.non_striker = None;
                    self.awaiting_partner = Some(striker);
                }
            }
            None => {
                self.striker = Some(striker);
                self.non_striker = Some(non_striker);
            }
        }

        self.deliveries += 1;
        self.last_sequence = Some(delivery.sequence);

        let closure = self.automatic_closure().map(|reason| Closure {
            reason,
            balls: self.balls,
            runs: self.runs,
            wickets: self.wickets,
            at_sequence: Some(delivery.sequence),
        });
        self.closure = closure;

        Transition {
            over_completed,
            wicket,
            closure,
        }
    }

    fn automatic_closure(&self) -> Option<ClosureReason> {
        if self.target.is_some_and(|target| self.runs >= target) {
            Some(ClosureReason::TargetReached)
        } else if self.wickets >= self.max_wickets {
            Some(ClosureReason::AllOut)
        } else if self.ball_limit.is_some_and(|limit| self.balls >= limit) {
            Some(ClosureReason::OversExhausted)
        } else {
            None
        }
    }

    /// Close by declaration or forfeit.
    pub fn close(&mut self, reason: ClosureReason) -> Closure {
        let closure = Closure {
            reason,
            balls: self.balls,
            runs: self.runs,
            wickets: self.wickets,
            at_sequence: None,
        };
        self.closure = Some(closure);
        closure
    }

    pub fn balls_remaining(&self) -> Option<BallCount> {
        self.ball_limit.map(|limit| self.balls.remaining_until(limit))
    }

    /// Runs still needed; absent without a target or once it is reached.
    pub fn required_runs(&self) -> Option<u32> {
        self.target
            .filter(|target| *target > self.runs)
            .map(|target| target - self.runs)
    }

    pub fn rates(&self) -> LiveRates {
        let required_runs = self.required_runs();
        let balls_remaining = self.balls_remaining();
        let required_run_rate = match (required_runs, balls_remaining) {
            (Some(needed), Some(left)) if left.balls() > 0 && !self.is_closed() => {
                Some(runs_per_over(needed, left))
            }
            _ => None,
        };
        LiveRates {
            run_rate: runs_per_over(self.runs, self.balls),
            required_runs,
            balls_remaining,
            required_run_rate,
        }
    }
}
