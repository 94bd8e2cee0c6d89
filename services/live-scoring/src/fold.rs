//! The innings fold
//!
//! Every derived view of an innings is a pure fold over its delivery
//! sequence. [`InningsFold`] bundles the state machine with the scorecard and
//! analytics accumulators so live updates, replays and correction refolds all
//! run exactly the same code.

use cricket_types::delivery::Delivery;
use cricket_types::errors::ScoringError;
use cricket_types::innings::InningsMeta;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::analytics::Analytics;
use crate::scorecard::Scorecard;
use crate::state_machine::{EndsCheck, InningsState, Placement, Sides, Transition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InningsFold {
    pub state: InningsState,
    pub scorecard: Scorecard,
    pub analytics: Analytics,
}

impl InningsFold {
    /// Empty fold for a freshly opened innings.
    pub fn new(meta: &InningsMeta, sides: Sides, enforce_free_hit: bool) -> Self {
        Self {
            state: InningsState::new(meta, sides, enforce_free_hit),
            scorecard: Scorecard::new(),
            analytics: Analytics::new(),
        }
    }

    pub fn placement(&self) -> Placement {
        self.state.next_placement()
    }

    pub fn validate(&self, delivery: &Delivery, ends: EndsCheck) -> Result<(), ScoringError> {
        self.state.validate(delivery, ends)
    }

    /// Apply a validated delivery to every accumulator.
    pub fn apply(&mut self, delivery: &Delivery) -> Transition {
        let transition = self.state.apply(delivery);
        self.scorecard.apply(delivery, &transition);
        self.analytics.apply(delivery, &transition);
        transition
    }

    /// Re-place, validate and apply a stored delivery.
    ///
    /// Placement (over/ball labels, free-hit flag) is recomputed from the
    /// fold and written back, since an earlier correction may have shifted it.
    pub fn replay(&mut self, delivery: &mut Delivery, ends: EndsCheck) -> Result<Transition, ScoringError> {
        let placement = self.placement();
        delivery.over_number = placement.over_number;
        delivery.ball_in_over = placement.ball_in_over;
        delivery.is_free_hit = placement.is_free_hit;
        delivery.is_legal_delivery = delivery.outcome.is_legal();

        self.validate(delivery, ends)?;
        Ok(self.apply(delivery))
    }

    /// Deliveries folded so far.
    pub fn len(&self) -> usize {
        self.state.deliveries
    }

    pub fn is_empty(&self) -> bool {
        self.state.deliveries == 0
    }

    /// SHA-256 over the full fold state.
    ///
    /// Every accumulator is BTreeMap/Vec backed, so the serialized form and
    /// therefore the checksum are deterministic.
    pub fn checksum(&self) -> Result<String, serde_json::Error> {
        let mut hasher = Sha256::new();
        serde_json::to_writer(&mut hasher, self)?;
        Ok(format!("{:x}", hasher.finalize()))
    }
}
