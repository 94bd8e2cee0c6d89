//! Scoring engine
//!
//! Main coordinator: owns the match records, one session per innings, the
//! broadcast hub and the view cache.
//!
//! Every innings session sits behind its own `tokio::sync::Mutex`, so
//! submissions and corrections for one innings are strictly serialized while
//! other innings proceed in parallel. When both locks are needed the innings
//! lock is always taken before the match lock.

use std::sync::Arc;
use std::time::Instant;

use cricket_types::delivery::{now_nanos, Delivery, DeliveryDraft, DeliveryPatch};
use cricket_types::errors::ScoringError;
use cricket_types::fixture::{MatchRecord, MatchResult, MatchSetup, MatchStatus, Toss};
use cricket_types::ids::{ActorId, DeliveryId, InningsId, MatchId, PlayerId, TeamId};
use cricket_types::innings::{ClosureReason, InningsKind, InningsMeta};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::analytics::{AnalyticsView, PitchPoint, ShotPoint};
use crate::cache::{InningsViews, ViewCache};
use crate::config::{EngineConfig, HubConfig, ServiceConfig};
use crate::correction::CorrectionReport;
use crate::delta::UpdateCause;
use crate::hub::{BroadcastHub, SubscribeError, Subscription};
use crate::lifecycle::{decide_result, plan_next_innings};
use crate::metrics::ServiceMetrics;
use crate::replay::{ReplayError, ReplayMetrics};
use crate::roster::{Player, RosterProvider};
use crate::scorecard::{BattingFigures, BowlingFigures, FallOfWicket, OverSummary, Partnership};
use crate::session::{InningsSession, SubmitOutcome};
use crate::snapshot::{SnapshotBuilder, StateSnapshot};
use crate::state_machine::Sides;

/// Result of a delivery submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub delivery: Delivery,
    /// The client reference was already committed; nothing was published.
    pub duplicate: bool,
    pub snapshot: StateSnapshot,
}

/// Result of an applied correction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionReceipt {
    pub report: CorrectionReport,
    pub snapshot: StateSnapshot,
}

/// Match record plus the live view of its current innings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
    pub record: MatchRecord,
    pub live: Option<StateSnapshot>,
}

type Shared<T> = Arc<Mutex<T>>;

pub struct ScoringEngine {
    config: EngineConfig,
    matches: DashMap<MatchId, Shared<MatchRecord>>,
    sessions: DashMap<InningsId, Shared<InningsSession>>,
    /// Delivery id to owning innings, for corrections addressed by delivery.
    delivery_index: DashMap<DeliveryId, InningsId>,
    roster: Arc<dyn RosterProvider>,
    hub: BroadcastHub,
    cache: ViewCache,
    snapshots: SnapshotBuilder,
    metrics: Arc<ServiceMetrics>,
}

impl ScoringEngine {
    pub fn new(config: EngineConfig, hub_config: HubConfig, roster: Arc<dyn RosterProvider>) -> Self {
        let metrics = Arc::new(ServiceMetrics::new());
        Self {
            snapshots: SnapshotBuilder::new(config.recent_balls),
            hub: BroadcastHub::new(hub_config, Arc::clone(&metrics)),
            config,
            matches: DashMap::new(),
            sessions: DashMap::new(),
            delivery_index: DashMap::new(),
            roster,
            cache: ViewCache::new(),
            metrics,
        }
    }

    pub fn from_config(config: &ServiceConfig, roster: Arc<dyn RosterProvider>) -> Self {
        Self::new(config.engine.clone(), config.hub.clone(), roster)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Display name from the roster, falling back to the player reference.
    pub fn display_name(&self, player: &PlayerId) -> String {
        self.roster
            .display_name(player)
            .unwrap_or_else(|| player.to_string())
    }

    // ---------------------------------------------------------------
    // Match lifecycle
    // ---------------------------------------------------------------

    pub fn create_match(&self, setup: MatchSetup) -> Result<MatchRecord, ScoringError> {
        if setup.home == setup.away {
            return Err(ScoringError::invalid_match_state("a team cannot play itself"));
        }
        let record = MatchRecord::new(setup);
        info!(
            match_id = %record.match_id,
            home = %record.home,
            away = %record.away,
            format = ?record.format,
            "Match created"
        );
        self.matches
            .insert(record.match_id, Arc::new(Mutex::new(record.clone())));
        Ok(record)
    }

    pub async fn record_toss(&self, match_id: MatchId, toss: Toss) -> Result<MatchRecord, ScoringError> {
        let handle = self.match_handle(match_id)?;
        let mut record = handle.lock().await;
        if record.status != MatchStatus::Scheduled {
            return Err(ScoringError::invalid_match_state(
                "the toss can only be recorded before play starts",
            ));
        }
        if !record.has_team(&toss.won_by) {
            return Err(ScoringError::invalid_match_state(format!(
                "{} is not playing this match",
                toss.won_by
            )));
        }
        info!(match_id = %match_id, won_by = %toss.won_by, decision = ?toss.decision, "Toss recorded");
        record.toss = Some(toss);
        Ok(record.clone())
    }

    /// Open the next innings of the match.
    pub async fn open_innings(&self, match_id: MatchId, enforce_follow_on: bool) -> Result<StateSnapshot, ScoringError> {
        let handle = self.match_handle(match_id)?;
        let mut record = handle.lock().await;
        let plan = plan_next_innings(&record, enforce_follow_on)?;

        let batting = self.playing_side(&plan.batting_team)?;
        let bowling = self.playing_side(&plan.bowling_team)?;
        let sides = Sides {
            batting: batting.into_iter().map(|p| p.id).collect(),
            bowling: bowling.into_iter().map(|p| p.id).collect(),
        };
        if sides.batting.len() < 2 {
            return Err(ScoringError::invalid_players(format!(
                "{} needs at least two distinct batters",
                plan.batting_team
            )));
        }
        if let Some(both) = sides.batting.intersection(&sides.bowling).next() {
            return Err(ScoringError::invalid_players(format!("{} is listed on both sides", both)));
        }

        let all_out = sides.batting.len() as u32 - 1;
        let meta = InningsMeta {
            innings_id: InningsId::new(),
            match_id,
            number: plan.number,
            kind: plan.kind,
            batting_team: plan.batting_team,
            bowling_team: plan.bowling_team,
            overs_limit: plan.overs_limit,
            max_wickets: plan.max_wickets.map_or(all_out, |w| w.min(all_out)),
            target: plan.target,
            follow_on: plan.follow_on,
        };
        let innings_id = meta.innings_id;
        let mut session = InningsSession::new(
            meta,
            sides,
            self.config.enforce_free_hit,
            self.config.checkpoint_interval,
        );

        if plan.kind == InningsKind::SuperOver {
            record.result = None;
        }
        record.innings.push(session.summary());
        record.status = MatchStatus::Live;

        info!(
            match_id = %match_id,
            innings_id = %innings_id,
            number = plan.number,
            kind = ?plan.kind,
            batting_team = %session.meta().batting_team,
            target = ?plan.target,
            "Innings opened"
        );

        // Published before the session becomes reachable, so nobody else can
        // hold its lock while we hold the match lock.
        let snapshot = self.publish(&mut session, &record, UpdateCause::Lifecycle);
        self.sessions.insert(innings_id, Arc::new(Mutex::new(session)));
        Ok(snapshot)
    }

    /// Declare a multi-innings match drawn.
    pub async fn conclude_draw(&self, match_id: MatchId) -> Result<MatchView, ScoringError> {
        let handle = self.match_handle(match_id)?;
        let current = handle.lock().await.current_innings().map(|s| s.innings_id);
        let session_handle = current.map(|id| self.session_handle(id)).transpose()?;
        let mut session = match &session_handle {
            Some(h) => Some(h.lock().await),
            None => None,
        };
        let mut record = handle.lock().await;

        if record.format.is_limited_overs() {
            return Err(ScoringError::invalid_match_state("limited-overs matches cannot be drawn"));
        }
        match record.status {
            MatchStatus::Live | MatchStatus::InningsBreak => {}
            MatchStatus::Scheduled => return Err(ScoringError::invalid_match_state("match has not started")),
            MatchStatus::Completed => return Err(ScoringError::invalid_match_state("match is already decided")),
        }

        record.result = Some(MatchResult::draw());
        record.status = MatchStatus::Completed;
        info!(match_id = %match_id, innings = record.innings.len(), "Match drawn");

        let live = session
            .as_deref_mut()
            .map(|s| self.publish(s, &record, UpdateCause::Lifecycle));
        Ok(MatchView {
            record: record.clone(),
            live,
        })
    }

    // ---------------------------------------------------------------
    // Scoring
    // ---------------------------------------------------------------

    /// Validate, commit and publish one delivery.
    pub async fn submit(
        &self,
        innings_id: InningsId,
        draft: DeliveryDraft,
        actor: Option<ActorId>,
    ) -> Result<SubmitReceipt, ScoringError> {
        let handle = self.session_handle(innings_id)?;
        let mut session = handle.lock().await;
        let match_handle = self.match_handle(session.meta().match_id)?;
        let mut record = match_handle.lock().await;

        if record.status == MatchStatus::Completed && !session.is_closed() {
            self.metrics.record_rejection();
            return Err(ScoringError::invalid_match_state("match is already decided"));
        }

        let started = Instant::now();
        let outcome = match session.submit(draft, actor) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics.record_rejection();
                debug!(innings_id = %innings_id, code = e.code(), error = %e, "Delivery rejected");
                return Err(e);
            }
        };

        let delivery = match outcome {
            SubmitOutcome::Duplicate(delivery) => {
                self.metrics.record_duplicate();
                return Ok(SubmitReceipt {
                    delivery,
                    duplicate: true,
                    snapshot: self.snapshot_of(&session, &record),
                });
            }
            SubmitOutcome::Committed { delivery, .. } => delivery,
        };

        self.delivery_index.insert(delivery.delivery_id, innings_id);
        self.sync_record(&session, &mut record);
        let snapshot = self.publish(&mut session, &record, UpdateCause::Delivery);
        self.metrics
            .record_commit(u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX));

        Ok(SubmitReceipt {
            delivery,
            duplicate: false,
            snapshot,
        })
    }

    /// Amend one committed delivery.
    pub async fn correct(
        &self,
        delivery_id: DeliveryId,
        patch: DeliveryPatch,
        actor: Option<ActorId>,
    ) -> Result<CorrectionReceipt, ScoringError> {
        let innings_id = self
            .delivery_index
            .get(&delivery_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| ScoringError::DeliveryNotFound {
                delivery_id: delivery_id.to_string(),
            })?;
        self.correct_many(innings_id, vec![(delivery_id, patch)], actor)
            .await
    }

    /// Amend several deliveries of one innings in a single refold.
    pub async fn correct_many(
        &self,
        innings_id: InningsId,
        patches: Vec<(DeliveryId, DeliveryPatch)>,
        actor: Option<ActorId>,
    ) -> Result<CorrectionReceipt, ScoringError> {
        let handle = self.session_handle(innings_id)?;
        let mut session = handle.lock().await;
        let match_handle = self.match_handle(session.meta().match_id)?;
        let mut record = match_handle.lock().await;

        let number = session.meta().number;
        let superseded = record.innings.iter().any(|s| s.number > number);
        let outcome = if superseded {
            // A later innings was opened against this total; the total must hold.
            let mut trial = session.clone();
            match trial.correct_many(patches, actor.as_ref()) {
                Ok(report) if report.total_changed() => Err(ScoringError::CorrectionInvalidatesClosure {
                    reason: format!(
                        "innings {} was opened against {}/{}",
                        number + 1,
                        report.runs_before,
                        report.wickets_before
                    ),
                }),
                Ok(report) => {
                    *session = trial;
                    Ok(report)
                }
                Err(e) => Err(e),
            }
        } else {
            session.correct_many(patches, actor.as_ref())
        };

        let report = match outcome {
            Ok(report) => report,
            Err(e) => {
                self.metrics.record_correction(false);
                warn!(innings_id = %innings_id, code = e.code(), error = %e, "Correction rejected");
                return Err(e);
            }
        };

        self.metrics.record_correction(true);
        self.cache.invalidate(&innings_id);
        self.sync_record(&session, &mut record);
        let snapshot = self.publish(
            &mut session,
            &record,
            UpdateCause::Correction {
                from_sequence: report.from_sequence,
            },
        );
        Ok(CorrectionReceipt { report, snapshot })
    }

    pub async fn declare(&self, innings_id: InningsId) -> Result<StateSnapshot, ScoringError> {
        self.close_innings(innings_id, ClosureReason::Declared).await
    }

    pub async fn forfeit(&self, innings_id: InningsId) -> Result<StateSnapshot, ScoringError> {
        self.close_innings(innings_id, ClosureReason::Forfeited).await
    }

    async fn close_innings(&self, innings_id: InningsId, reason: ClosureReason) -> Result<StateSnapshot, ScoringError> {
        let handle = self.session_handle(innings_id)?;
        let mut session = handle.lock().await;
        let match_handle = self.match_handle(session.meta().match_id)?;
        let mut record = match_handle.lock().await;

        if record.status == MatchStatus::Completed {
            return Err(ScoringError::invalid_match_state("match is already decided"));
        }
        if reason == ClosureReason::Forfeited {
            session.forfeit()?;
        } else {
            session.declare()?;
        }
        self.sync_record(&session, &mut record);
        Ok(self.publish(&mut session, &record, UpdateCause::Lifecycle))
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub async fn innings_snapshot(&self, innings_id: InningsId) -> Result<StateSnapshot, ScoringError> {
        let handle = self.session_handle(innings_id)?;
        let session = handle.lock().await;
        let match_handle = self.match_handle(session.meta().match_id)?;
        let record = match_handle.lock().await;
        Ok(self.snapshot_of(&session, &record))
    }

    pub async fn match_snapshot(&self, match_id: MatchId) -> Result<MatchView, ScoringError> {
        let handle = self.match_handle(match_id)?;
        let current = handle.lock().await.current_innings().map(|s| s.innings_id);
        let Some(innings_id) = current else {
            return Ok(MatchView {
                record: handle.lock().await.clone(),
                live: None,
            });
        };

        let session_handle = self.session_handle(innings_id)?;
        let session = session_handle.lock().await;
        let record = handle.lock().await;
        Ok(MatchView {
            live: Some(self.snapshot_of(&session, &record)),
            record: record.clone(),
        })
    }

    pub async fn batting(&self, innings_id: InningsId) -> Result<Vec<BattingFigures>, ScoringError> {
        Ok(self.views(innings_id).await?.batting.clone())
    }

    pub async fn bowling(&self, innings_id: InningsId) -> Result<Vec<BowlingFigures>, ScoringError> {
        Ok(self.views(innings_id).await?.bowling.clone())
    }

    pub async fn partnerships(&self, innings_id: InningsId) -> Result<Vec<Partnership>, ScoringError> {
        Ok(self.views(innings_id).await?.partnerships.clone())
    }

    pub async fn fall_of_wickets(&self, innings_id: InningsId) -> Result<Vec<FallOfWicket>, ScoringError> {
        Ok(self.views(innings_id).await?.fall_of_wickets.clone())
    }

    pub async fn over_summaries(&self, innings_id: InningsId) -> Result<Vec<OverSummary>, ScoringError> {
        Ok(self.views(innings_id).await?.overs.clone())
    }

    pub async fn analytics(&self, innings_id: InningsId) -> Result<AnalyticsView, ScoringError> {
        Ok(self.views(innings_id).await?.analytics.clone())
    }

    /// Every derived table at the current version, through the cache.
    pub async fn views(&self, innings_id: InningsId) -> Result<Arc<InningsViews>, ScoringError> {
        let handle = self.session_handle(innings_id)?;
        let session = handle.lock().await;
        let (views, hit) = self.cache.get_or_build(&session);
        self.metrics.record_cache(hit);
        Ok(views)
    }

    pub async fn wagon_wheel(&self, innings_id: InningsId, batter: Option<&PlayerId>) -> Result<Vec<ShotPoint>, ScoringError> {
        let handle = self.session_handle(innings_id)?;
        let session = handle.lock().await;
        Ok(session.fold().analytics.wagon_wheel(batter))
    }

    pub async fn pitch_map(&self, innings_id: InningsId, bowler: Option<&PlayerId>) -> Result<Vec<PitchPoint>, ScoringError> {
        let handle = self.session_handle(innings_id)?;
        let session = handle.lock().await;
        Ok(session.fold().analytics.pitch_map(bowler))
    }

    /// The delivery log in sequence order.
    pub async fn deliveries(&self, innings_id: InningsId) -> Result<Vec<Delivery>, ScoringError> {
        let handle = self.session_handle(innings_id)?;
        let session = handle.lock().await;
        Ok(session.log().deliveries().to_vec())
    }

    pub fn subscribe(&self, match_id: MatchId) -> Result<Subscription, SubscribeError> {
        if !self.matches.contains_key(&match_id) {
            return Err(ScoringError::MatchNotFound {
                match_id: match_id.to_string(),
            }
            .into());
        }
        self.hub.subscribe(match_id)
    }

    /// Drop a completed match and everything derived from it: the innings
    /// sessions, their delivery index entries, cached views and the broadcast
    /// channel. Refused while viewers are subscribed. Returns the final record
    /// so the caller can archive it.
    pub async fn release_match(&self, match_id: MatchId) -> Result<MatchRecord, ScoringError> {
        let record = self.match_handle(match_id)?.lock().await.clone();
        if record.status != MatchStatus::Completed {
            return Err(ScoringError::invalid_match_state("only a completed match can be released"));
        }
        let viewers = self.hub.subscriber_count(match_id);
        if viewers > 0 {
            return Err(ScoringError::invalid_match_state(format!(
                "match still has {} live viewers",
                viewers
            )));
        }

        self.matches.remove(&match_id);
        for summary in &record.innings {
            if let Some((_, handle)) = self.sessions.remove(&summary.innings_id) {
                // Waits out any commit already holding the innings
                let session = handle.lock().await;
                for delivery in session.log().deliveries() {
                    self.delivery_index.remove(&delivery.delivery_id);
                }
            }
            self.cache.invalidate(&summary.innings_id);
        }
        self.hub.close(match_id);

        info!(match_id = %match_id, innings = record.innings.len(), "Match released");
        Ok(record)
    }

    /// Refold an innings from its log and check it against the live state.
    pub async fn verify_innings(&self, innings_id: InningsId) -> Result<ReplayMetrics, ReplayError> {
        let handle = self
            .sessions
            .get(&innings_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ReplayError::InningsNotFound {
                innings_id: innings_id.to_string(),
            })?;
        let session = handle.lock().await;
        let metrics = session.verify()?;
        self.metrics.record_replay(
            metrics.deliveries_replayed,
            u64::try_from(metrics.duration_ms).unwrap_or(u64::MAX),
        );
        Ok(metrics)
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn match_handle(&self, match_id: MatchId) -> Result<Shared<MatchRecord>, ScoringError> {
        self.matches
            .get(&match_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ScoringError::MatchNotFound {
                match_id: match_id.to_string(),
            })
    }

    fn session_handle(&self, innings_id: InningsId) -> Result<Shared<InningsSession>, ScoringError> {
        self.sessions
            .get(&innings_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ScoringError::InningsNotFound {
                innings_id: innings_id.to_string(),
            })
    }

    fn playing_side(&self, team: &TeamId) -> Result<Vec<Player>, ScoringError> {
        let players = self
            .roster
            .playing_xi(team)
            .ok_or_else(|| ScoringError::invalid_players(format!("no playing XI registered for {}", team)))?;
        if players.len() > self.config.max_team_size {
            return Err(ScoringError::invalid_players(format!(
                "{} has {} players, at most {} may play",
                team,
                players.len(),
                self.config.max_team_size
            )));
        }
        Ok(players)
    }

    /// Copy the innings totals into the match record and settle the match
    /// once every innings so far is closed.
    fn sync_record(&self, session: &InningsSession, record: &mut MatchRecord) {
        let summary = session.summary();
        if let Some(slot) = record.summary_mut(&summary.innings_id) {
            *slot = summary;
        }
        if !session.is_closed() {
            return;
        }
        match decide_result(record) {
            Some(result) => {
                if record.result.as_ref() != Some(&result) {
                    info!(match_id = %record.match_id, result = ?result, "Match decided");
                }
                record.result = Some(result);
                record.status = MatchStatus::Completed;
            }
            None if record.status != MatchStatus::Completed => {
                record.status = MatchStatus::InningsBreak;
            }
            None => {}
        }
    }

    fn snapshot_of(&self, session: &InningsSession, record: &MatchRecord) -> StateSnapshot {
        self.snapshots
            .build(session, record.status, record.result.clone(), now_nanos())
    }

    /// Build, diff and hand the snapshot to the hub. Runs under the innings lock.
    fn publish(&self, session: &mut InningsSession, record: &MatchRecord, cause: UpdateCause) -> StateSnapshot {
        let snapshot = self.snapshot_of(session, record);
        let highlights = session.highlights.generate(&snapshot, cause);
        let report = self
            .hub
            .publish(record.match_id, cause, snapshot.clone(), highlights);
        debug!(
            match_id = %record.match_id,
            sequence = report.sequence,
            delivered = report.delivered,
            disconnected = report.disconnected,
            "Snapshot published"
        );
        snapshot
    }
}
