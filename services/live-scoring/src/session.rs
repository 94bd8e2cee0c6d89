//! Innings session
//!
//! Owns everything about one innings that must change atomically: the
//! delivery log, the live fold and the checkpoints used for correction
//! refolds. The engine wraps each session in its own `tokio::sync::Mutex`,
//! so every method here runs with exclusive access.
//!
//! Commit order for a new delivery:
//! 1. Idempotency check on the client reference
//! 2. Placement: caller numbering is advisory, the fold decides
//! 3. Validation (pure, nothing mutated on failure)
//! 4. Log append, then fold application (infallible)
//! 5. Checkpoint every `checkpoint_interval` deliveries

use std::collections::BTreeMap;

use cricket_types::delivery::{now_nanos, Delivery, DeliveryDraft};
use cricket_types::errors::ScoringError;
use cricket_types::ids::{ActorId, DeliveryId, InningsId};
use cricket_types::innings::{Closure, ClosureReason, InningsMeta, InningsSummary};
use cricket_types::numeric::BALLS_PER_OVER;
use tracing::{debug, info};

use crate::delta::HighlightGenerator;
use crate::fold::InningsFold;
use crate::log::DeliveryLog;
use crate::replay::{ReplayEngine, ReplayError, ReplayMetrics};
use crate::state_machine::{EndsCheck, Sides, Transition};

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Committed {
        delivery: Delivery,
        transition: Transition,
    },
    /// The client reference was already committed; nothing changed.
    Duplicate(Delivery),
}

impl SubmitOutcome {
    pub fn delivery(&self) -> &Delivery {
        match self {
            SubmitOutcome::Committed { delivery, .. } => delivery,
            SubmitOutcome::Duplicate(delivery) => delivery,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, SubmitOutcome::Duplicate(_))
    }
}

#[derive(Debug, Clone)]
pub struct InningsSession {
    pub(crate) meta: InningsMeta,
    pub(crate) log: DeliveryLog,
    pub(crate) fold: InningsFold,
    /// Fold states keyed by deliveries applied. Key 0 is the empty fold.
    pub(crate) checkpoints: BTreeMap<usize, InningsFold>,
    pub(crate) checkpoint_interval: usize,
    /// Bumped on every commit, correction and closure.
    pub(crate) version: u64,
    pub(crate) highlights: HighlightGenerator,
}

impl InningsSession {
    pub fn new(meta: InningsMeta, sides: Sides, enforce_free_hit: bool, checkpoint_interval: usize) -> Self {
        let fold = InningsFold::new(&meta, sides, enforce_free_hit);
        let mut checkpoints = BTreeMap::new();
        checkpoints.insert(0, fold.clone());
        Self {
            log: DeliveryLog::new(meta.innings_id),
            meta,
            fold,
            checkpoints,
            checkpoint_interval: checkpoint_interval.max(1),
            version: 0,
            highlights: HighlightGenerator::new(),
        }
    }

    pub fn innings_id(&self) -> InningsId {
        self.meta.innings_id
    }

    pub fn meta(&self) -> &InningsMeta {
        &self.meta
    }

    pub fn fold(&self) -> &InningsFold {
        &self.fold
    }

    pub fn log(&self) -> &DeliveryLog {
        &self.log
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn closure(&self) -> Option<Closure> {
        self.fold.state.closure
    }

    pub fn is_closed(&self) -> bool {
        self.fold.state.is_closed()
    }

    pub fn find(&self, delivery_id: &DeliveryId) -> Option<&Delivery> {
        self.log.find(delivery_id)
    }

    /// Validate and commit a delivery draft.
    pub fn submit(&mut self, draft: DeliveryDraft, actor: Option<ActorId>) -> Result<SubmitOutcome, ScoringError> {
        if let Some(existing) = draft
            .client_ref
            .as_deref()
            .and_then(|key| self.log.find_by_client_ref(key))
        {
            debug!(
                innings_id = %self.meta.innings_id,
                sequence = existing.sequence,
                "Duplicate submission answered from log"
            );
            return Ok(SubmitOutcome::Duplicate(existing.clone()));
        }

        if self.is_closed() {
            return Err(ScoringError::InningsClosed {
                innings_id: self.meta.innings_id.to_string(),
            });
        }

        let placement = self.fold.placement();
        if let Some(ball) = draft.ball_in_over {
            if ball > BALLS_PER_OVER {
                return Err(ScoringError::OverOverrun {
                    over: draft.over_number.unwrap_or(placement.over_number),
                    ball,
                });
            }
        }
        let claimed = (draft.over_number, draft.ball_in_over);
        if claimed != (None, None)
            && claimed != (Some(placement.over_number), Some(placement.ball_in_over))
        {
            debug!(
                innings_id = %self.meta.innings_id,
                claimed_over = ?draft.over_number,
                claimed_ball = ?draft.ball_in_over,
                over = placement.over_number,
                ball = placement.ball_in_over,
                "Caller numbering overridden"
            );
        }

        let delivery = Delivery {
            delivery_id: DeliveryId::new(),
            innings_id: self.meta.innings_id,
            sequence: self.log.next_sequence(),
            over_number: placement.over_number,
            ball_in_over: placement.ball_in_over,
            is_legal_delivery: draft.outcome.is_legal(),
            is_free_hit: placement.is_free_hit,
            striker: draft.striker,
            non_striker: draft.non_striker,
            bowler: draft.bowler,
            outcome: draft.outcome,
            wagon: draft.wagon,
            pitch: draft.pitch,
            commentary: draft.commentary,
            timestamp: draft.timestamp.unwrap_or_else(now_nanos),
            recorded_by: actor,
            client_ref: draft.client_ref,
            revision: 0,
        };

        self.fold.validate(&delivery, EndsCheck::Strict)?;
        self.log
            .append(delivery.clone())
            .map_err(|e| ScoringError::invalid_delivery(e.to_string()))?;
        let transition = self.fold.apply(&delivery);
        self.version += 1;

        if self.fold.len() % self.checkpoint_interval == 0 {
            self.checkpoints.insert(self.fold.len(), self.fold.clone());
        }

        debug!(
            innings_id = %self.meta.innings_id,
            sequence = delivery.sequence,
            over = delivery.over_number,
            ball = delivery.ball_in_over,
            runs = delivery.total_runs(),
            "Delivery committed"
        );
        if let Some(closure) = transition.closure {
            info!(
                innings_id = %self.meta.innings_id,
                reason = ?closure.reason,
                runs = closure.runs,
                wickets = closure.wickets,
                "Innings closed"
            );
        }

        Ok(SubmitOutcome::Committed { delivery, transition })
    }

    /// Close the innings by declaration.
    pub fn declare(&mut self) -> Result<Closure, ScoringError> {
        self.close_explicitly(ClosureReason::Declared)
    }

    /// Forfeit the innings. Only possible before the first delivery.
    pub fn forfeit(&mut self) -> Result<Closure, ScoringError> {
        if !self.log.is_empty() {
            return Err(ScoringError::invalid_match_state(
                "an innings can only be forfeited before the first delivery",
            ));
        }
        self.close_explicitly(ClosureReason::Forfeited)
    }

    fn close_explicitly(&mut self, reason: ClosureReason) -> Result<Closure, ScoringError> {
        if self.is_closed() {
            return Err(ScoringError::InningsClosed {
                innings_id: self.meta.innings_id.to_string(),
            });
        }
        let closure = self.fold.state.close(reason);
        self.version += 1;
        info!(
            innings_id = %self.meta.innings_id,
            reason = ?reason,
            runs = closure.runs,
            wickets = closure.wickets,
            "Innings closed"
        );
        Ok(closure)
    }

    /// Refold the whole log from the empty fold and compare against the
    /// live fold. Explicit closures are not deliveries, so they are reapplied
    /// before comparing.
    pub fn verify(&self) -> Result<ReplayMetrics, ReplayError> {
        let seed = self
            .checkpoints
            .get(&0)
            .cloned()
            .ok_or_else(|| ReplayError::LogCorruption {
                sequence: 0,
                reason: "empty checkpoint missing".to_string(),
            })?;
        let expected = self.fold.checksum().map_err(ReplayError::unhashable)?;
        let mut replay = ReplayEngine::new()
            .with_lenient_ends()
            .with_expected_checksum(expected);
        if let Some(closure) = self.closure().filter(|c| !c.reason.is_automatic()) {
            replay = replay.with_closure(closure.reason);
        }
        replay
            .replay_from(seed, self.log.deliveries())
            .map(|result| result.metrics)
    }

    /// Scoreboard line for the match record.
    pub fn summary(&self) -> InningsSummary {
        let state = &self.fold.state;
        InningsSummary {
            innings_id: self.meta.innings_id,
            number: self.meta.number,
            kind: self.meta.kind,
            batting_team: self.meta.batting_team.clone(),
            runs: state.runs,
            wickets: state.wickets,
            max_wickets: state.max_wickets,
            balls: state.balls,
            target: state.target,
            closure: state.closure,
        }
    }
}
