//! Correction handler
//!
//! Applies field-level patches to committed deliveries and refolds the log
//! from the nearest checkpoint at or before the earliest patched delivery.
//! The refold runs on a copy; the session only changes if every delivery in
//! the suffix still validates and no closure already acted upon is disturbed.
//!
//! Closure rules:
//! - A recorded automatic closure must still happen, for the same reason, on
//!   the last delivery
//! - A declaration must still find the innings open at the same ball count
//! - An open innings may become closed by the corrected last delivery
//! - The refold may never close the innings before the last delivery

use std::time::Instant;

use cricket_types::delivery::{Delivery, DeliveryPatch};
use cricket_types::errors::ScoringError;
use cricket_types::ids::{ActorId, DeliveryId};
use cricket_types::innings::Closure;
use tracing::{info, warn};

use crate::replay::{ReplayEngine, ReplayError};
use crate::session::InningsSession;

/// What an applied correction changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionReport {
    /// Patched deliveries as committed.
    pub corrected: Vec<Delivery>,
    /// Sequence of the earliest patched delivery.
    pub from_sequence: u64,
    /// Deliveries refolded, counted from the checkpoint used.
    pub refolded: usize,
    pub runs_before: u32,
    pub runs_after: u32,
    pub wickets_before: u32,
    pub wickets_after: u32,
    pub closure_before: Option<Closure>,
    pub closure_after: Option<Closure>,
}

impl CorrectionReport {
    /// Whether the innings total (runs, wickets) moved.
    pub fn total_changed(&self) -> bool {
        self.runs_before != self.runs_after || self.wickets_before != self.wickets_after
    }
}

impl InningsSession {
    /// Amend one delivery.
    pub fn correct(
        &mut self,
        delivery_id: DeliveryId,
        patch: DeliveryPatch,
        actor: Option<&ActorId>,
    ) -> Result<CorrectionReport, ScoringError> {
        self.correct_many(vec![(delivery_id, patch)], actor)
    }

    /// Amend several deliveries as one atomic correction.
    ///
    /// Needed when a change cascades, e.g. a new dismissal means later
    /// deliveries must name the incoming batter.
    pub fn correct_many(
        &mut self,
        patches: Vec<(DeliveryId, DeliveryPatch)>,
        actor: Option<&ActorId>,
    ) -> Result<CorrectionReport, ScoringError> {
        let start = Instant::now();
        let result = self.refold_with(patches);
        match &result {
            Ok(report) => info!(
                innings_id = %self.meta.innings_id,
                from_sequence = report.from_sequence,
                patched = report.corrected.len(),
                refolded = report.refolded,
                actor = actor.map(|a| a.as_str()).unwrap_or("-"),
                duration_us = start.elapsed().as_micros() as u64,
                "Correction applied"
            ),
            Err(e) => warn!(
                innings_id = %self.meta.innings_id,
                code = e.code(),
                error = %e,
                "Correction rejected"
            ),
        }
        result
    }

    fn refold_with(&mut self, patches: Vec<(DeliveryId, DeliveryPatch)>) -> Result<CorrectionReport, ScoringError> {
        if patches.is_empty() || patches.iter().any(|(_, patch)| patch.is_empty()) {
            return Err(ScoringError::invalid_delivery("correction carries no changes"));
        }

        let mut positions = Vec::with_capacity(patches.len());
        for (delivery_id, _) in &patches {
            let index = self
                .log
                .position(delivery_id)
                .ok_or_else(|| ScoringError::DeliveryNotFound {
                    delivery_id: delivery_id.to_string(),
                })?;
            positions.push(index);
        }
        let earliest = positions.iter().copied().min().unwrap_or(0);

        let (base, seed) = self
            .checkpoints
            .range(..=earliest)
            .next_back()
            .map(|(k, fold)| (*k, fold.clone()))
            .ok_or_else(|| ScoringError::invalid_delivery("no checkpoint covers the corrected delivery"))?;

        let mut suffix = self.log.suffix(base).to_vec();
        for ((_, patch), index) in patches.iter().zip(&positions) {
            if let Some(delivery) = suffix.get_mut(index - base) {
                patch.apply_to(delivery);
            }
        }

        let replayed = ReplayEngine::new()
            .with_lenient_ends()
            .with_checkpoints(self.checkpoint_interval)
            .replay_from(seed, &suffix)
            .map_err(|e| match e {
                ReplayError::Rejected {
                    sequence,
                    source: ScoringError::InningsClosed { .. },
                } => ScoringError::CorrectionInvalidatesClosure {
                    reason: format!("innings would close before delivery {}", sequence),
                },
                ReplayError::Rejected { source, .. } => source,
                other => ScoringError::invalid_delivery(other.to_string()),
            })?;

        let closure_before = self.fold.state.closure;
        let mut fold = replayed.fold;
        let refolded_closure = fold.state.closure;

        match closure_before {
            Some(recorded) if recorded.reason.is_automatic() => {
                if refolded_closure.map(|c| c.reason) != Some(recorded.reason) {
                    return Err(ScoringError::CorrectionInvalidatesClosure {
                        reason: format!("innings no longer closes by {:?}", recorded.reason),
                    });
                }
            }
            Some(recorded) => {
                if let Some(auto) = refolded_closure {
                    return Err(ScoringError::CorrectionInvalidatesClosure {
                        reason: format!(
                            "innings would close by {:?} before the {:?}",
                            auto.reason, recorded.reason
                        ),
                    });
                }
                if fold.state.balls != recorded.balls {
                    return Err(ScoringError::CorrectionInvalidatesClosure {
                        reason: format!(
                            "{:?} was made after {} legal balls, correction gives {}",
                            recorded.reason,
                            recorded.balls.balls(),
                            fold.state.balls.balls()
                        ),
                    });
                }
                fold.state.close(recorded.reason);
            }
            None => {}
        }

        let mut log = self.log.clone();
        for (offset, delivery) in replayed.deliveries.into_iter().enumerate() {
            log.amend(base + offset, delivery)
                .map_err(|e| ScoringError::invalid_delivery(e.to_string()))?;
        }

        let corrected: Vec<Delivery> = positions
            .iter()
            .filter_map(|index| log.get(*index).cloned())
            .collect();
        let from_sequence = log.get(earliest).map(|d| d.sequence).unwrap_or_default();

        let report = CorrectionReport {
            corrected,
            from_sequence,
            refolded: suffix.len(),
            runs_before: self.fold.state.runs,
            runs_after: fold.state.runs,
            wickets_before: self.fold.state.wickets,
            wickets_after: fold.state.wickets,
            closure_before,
            closure_after: fold.state.closure,
        };

        self.checkpoints.retain(|k, _| *k <= base);
        self.checkpoints.extend(replayed.checkpoints);
        self.log = log;
        self.fold = fold;
        self.version += 1;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cricket_types::delivery::{DeliveryDraft, Dismissal, WicketType};
    use cricket_types::ids::{InningsId, MatchId, PlayerId, TeamId};
    use cricket_types::innings::{ClosureReason, InningsKind, InningsMeta};

    use crate::fold::InningsFold;
    use crate::state_machine::Sides;

    fn p(name: &str) -> PlayerId {
        PlayerId::new(name)
    }

    fn meta(overs: u32, max_wickets: u32) -> InningsMeta {
        InningsMeta {
            innings_id: InningsId::new(),
            match_id: MatchId::new(),
            number: 1,
            kind: InningsKind::Regular,
            batting_team: TeamId::new("bat"),
            bowling_team: TeamId::new("bowl"),
            overs_limit: Some(overs),
            max_wickets,
            target: None,
            follow_on: false,
        }
    }

    fn sides() -> Sides {
        Sides {
            batting: ["a", "b", "c", "d"].iter().map(|n| p(n)).collect(),
            bowling: ["x", "y"].iter().map(|n| p(n)).collect(),
        }
    }

    fn session(overs: u32, max_wickets: u32, interval: usize) -> InningsSession {
        InningsSession::new(meta(overs, max_wickets), sides(), true, interval)
    }

    fn ball(striker: &str, non_striker: &str) -> DeliveryDraft {
        DeliveryDraft::new(p(striker), p(non_striker), p("x"))
    }

    fn id_at(s: &InningsSession, index: usize) -> DeliveryId {
        s.log().get(index).map(|d| d.delivery_id).unwrap()
    }

    fn full_replay(s: &InningsSession) -> InningsFold {
        let seed = InningsFold::new(s.meta(), sides(), true);
        ReplayEngine::new()
            .with_lenient_ends()
            .replay_from(seed, s.log().deliveries())
            .unwrap()
            .fold
    }

    #[test]
    fn test_runs_correction_matches_full_replay() {
        let mut s = session(20, 10, 2);
        for _ in 0..5 {
            s.submit(ball("a", "b").runs(2), None).unwrap();
        }
        let target = id_at(&s, 2);
        let report = s
            .correct(target, DeliveryPatch::default().with_runs(4), None)
            .unwrap();

        assert_eq!(report.runs_before, 10);
        assert_eq!(report.runs_after, 12);
        assert_eq!(report.from_sequence, 3);
        // Seeded from the checkpoint after two deliveries
        assert_eq!(report.refolded, 3);
        assert_eq!(s.find(&target).map(|d| d.revision), Some(1));
        assert_eq!(s.fold(), &full_replay(&s));
        assert_eq!(s.version(), 6);
    }

    #[test]
    fn test_wide_to_legal_shifts_placement() {
        let mut s = session(20, 10, 30);
        s.submit(ball("a", "b").wide(1), None).unwrap();
        for _ in 0..6 {
            s.submit(ball("a", "b"), None).unwrap();
        }
        // Sixth legal ball ended the over, strike swapped
        s.submit(ball("b", "a"), None).unwrap();
        assert_eq!(s.log().get(7).map(|d| (d.over_number, d.ball_in_over)), Some((2, 1)));

        let wide = id_at(&s, 0);
        let patch = DeliveryPatch {
            extra_type: Some(cricket_types::delivery::ExtraType::None),
            runs_extras: Some(0),
            ..DeliveryPatch::default()
        };
        // Over now ends one ball earlier; lenient ends accept the recorded pair
        s.correct(wide, patch, None).unwrap();
        assert_eq!(s.log().get(6).map(|d| (d.over_number, d.ball_in_over)), Some((2, 1)));
        assert_eq!(s.log().get(7).map(|d| (d.over_number, d.ball_in_over)), Some((2, 2)));
        assert_eq!(s.fold().state.balls.balls(), 8);
    }

    #[test]
    fn test_new_dismissal_requires_later_batter_changes() {
        let mut s = session(20, 10, 30);
        s.submit(ball("a", "b").runs(2), None).unwrap();
        s.submit(ball("a", "b"), None).unwrap();
        s.submit(ball("a", "b").runs(1), None).unwrap();

        let caught = DeliveryPatch::default()
            .with_runs(0)
            .with_dismissal(Dismissal::new(WicketType::Caught, p("a")).with_fielder(p("y")));
        let before = s.fold().clone();

        // a still bats on the next ball
        let err = s.correct(id_at(&s, 0), caught.clone(), None).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidPlayers { .. }));
        assert_eq!(s.fold(), &before);

        let report = s
            .correct_many(
                vec![
                    (id_at(&s, 0), caught),
                    (id_at(&s, 1), DeliveryPatch::default().with_batters(p("c"), p("b"))),
                    (id_at(&s, 2), DeliveryPatch::default().with_batters(p("c"), p("b"))),
                ],
                Some(&ActorId::new("scorer")),
            )
            .unwrap();
        assert_eq!(report.wickets_after, 1);
        assert_eq!(report.runs_after, 1);
        assert_eq!(s.fold().scorecard.fall_of_wickets().len(), 1);
        assert_eq!(s.fold(), &full_replay(&s));
    }

    #[test]
    fn test_earlier_closure_is_rejected() {
        let mut s = session(20, 1, 30);
        s.submit(ball("a", "b"), None).unwrap();
        s.submit(ball("a", "b"), None).unwrap();

        let bowled = DeliveryPatch::default()
            .with_dismissal(Dismissal::new(WicketType::Bowled, p("a")));
        let err = s.correct(id_at(&s, 0), bowled, None).unwrap_err();
        assert!(matches!(err, ScoringError::CorrectionInvalidatesClosure { .. }));
        assert!(!s.is_closed());
    }

    #[test]
    fn test_last_ball_may_close_open_innings() {
        let mut s = session(20, 1, 30);
        s.submit(ball("a", "b"), None).unwrap();
        let bowled = DeliveryPatch::default()
            .with_dismissal(Dismissal::new(WicketType::Bowled, p("a")));
        let report = s.correct(id_at(&s, 0), bowled, None).unwrap();
        assert_eq!(report.closure_after.map(|c| c.reason), Some(ClosureReason::AllOut));
        assert!(s.is_closed());
    }

    #[test]
    fn test_recorded_closure_must_survive() {
        let mut s = session(20, 1, 30);
        s.submit(ball("a", "b"), None).unwrap();
        s.submit(ball("a", "b").out(WicketType::Bowled, p("a")), None).unwrap();
        assert!(s.is_closed());

        let err = s
            .correct(id_at(&s, 1), DeliveryPatch::default().clear_dismissal(), None)
            .unwrap_err();
        assert!(matches!(err, ScoringError::CorrectionInvalidatesClosure { .. }));

        // Runs may still change on a closed innings
        s.correct(id_at(&s, 0), DeliveryPatch::default().with_runs(3), None)
            .unwrap();
        assert_eq!(s.closure().map(|c| c.runs), Some(3));
    }

    #[test]
    fn test_declaration_ball_count_is_fixed() {
        let mut s = session(20, 10, 30);
        s.submit(ball("a", "b").wide(1), None).unwrap();
        s.submit(ball("a", "b").runs(2), None).unwrap();
        s.declare().unwrap();

        let to_legal = DeliveryPatch {
            extra_type: Some(cricket_types::delivery::ExtraType::None),
            runs_extras: Some(0),
            ..DeliveryPatch::default()
        };
        let err = s.correct(id_at(&s, 0), to_legal, None).unwrap_err();
        assert!(matches!(err, ScoringError::CorrectionInvalidatesClosure { .. }));

        s.correct(id_at(&s, 1), DeliveryPatch::default().with_runs(4), None)
            .unwrap();
        assert_eq!(s.closure().map(|c| (c.reason, c.runs)), Some((ClosureReason::Declared, 5)));
    }

    #[test]
    fn test_unknown_delivery_and_empty_patch() {
        let mut s = session(20, 10, 30);
        s.submit(ball("a", "b"), None).unwrap();
        let err = s
            .correct(DeliveryId::new(), DeliveryPatch::default().with_runs(1), None)
            .unwrap_err();
        assert!(err.is_not_found());

        let err = s.correct(id_at(&s, 0), DeliveryPatch::default(), None).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidDelivery { .. }));
    }
}
