//! Live state snapshots
//!
//! A [`StateSnapshot`] is the full live view of one innings as pushed to
//! viewers: score, rates, the batters at the crease, the current bowler,
//! the partnership and the current over. Snapshots are versioned with the
//! innings version and carry a SHA-256 checksum so a reconnecting client can
//! verify what it resynced from.

use cricket_types::delivery::{Delivery, Dismissal, Timestamp};
use cricket_types::fixture::{MatchResult, MatchStatus};
use cricket_types::ids::{InningsId, MatchId, PlayerId, TeamId};
use cricket_types::innings::{Closure, InningsKind};
use cricket_types::numeric::BallCount;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::error;

use crate::scorecard::{BattingFigures, BowlingFigures, ExtrasBreakdown, OverSummary, Partnership};
use crate::session::InningsSession;
use crate::state_machine::LiveRates;

/// The most recent delivery in compact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallSummary {
    pub sequence: u64,
    pub over_number: u32,
    pub ball_in_over: u32,
    pub symbol: String,
    pub striker: PlayerId,
    pub bowler: PlayerId,
    pub runs_batter: u32,
    pub total_runs: u32,
    pub four: bool,
    pub six: bool,
    pub dismissal: Option<Dismissal>,
    pub is_free_hit: bool,
    pub revision: u32,
    pub commentary: Option<String>,
}

impl From<&Delivery> for BallSummary {
    fn from(delivery: &Delivery) -> Self {
        let outcome = &delivery.outcome;
        Self {
            sequence: delivery.sequence,
            over_number: delivery.over_number,
            ball_in_over: delivery.ball_in_over,
            symbol: outcome.symbol(),
            striker: delivery.striker.clone(),
            bowler: delivery.bowler.clone(),
            runs_batter: u32::from(outcome.runs_batter),
            total_runs: outcome.total_runs(),
            four: outcome.four_off_bat(),
            six: outcome.six_off_bat(),
            dismissal: outcome.dismissal.clone(),
            is_free_hit: delivery.is_free_hit,
            revision: delivery.revision,
            commentary: delivery.commentary.clone(),
        }
    }
}

/// A versioned, checksummed snapshot of the live innings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub match_id: MatchId,
    pub innings_id: InningsId,
    pub innings_number: u32,
    pub kind: InningsKind,
    pub batting_team: TeamId,
    pub bowling_team: TeamId,
    /// Innings version this snapshot was taken at.
    pub version: u64,
    pub last_sequence: Option<u64>,

    pub runs: u32,
    pub wickets: u32,
    pub balls: BallCount,
    pub overs_limit: Option<u32>,
    pub target: Option<u32>,
    pub rates: LiveRates,

    pub striker: Option<BattingFigures>,
    pub non_striker: Option<BattingFigures>,
    /// Bowler of the latest delivery.
    pub bowler: Option<BowlingFigures>,
    pub partnership: Option<Partnership>,
    pub recent_balls: Vec<String>,
    /// Over in progress, absent between overs.
    pub this_over: Option<OverSummary>,
    pub last_over: Option<OverSummary>,
    pub last_ball: Option<BallSummary>,
    /// The next delivery is a free hit.
    pub free_hit: bool,
    pub extras: ExtrasBreakdown,

    pub closure: Option<Closure>,
    pub match_status: MatchStatus,
    pub result: Option<MatchResult>,

    /// Unix nanoseconds when the snapshot was built.
    pub timestamp: Timestamp,
    pub checksum: String,
}

/// Builds snapshots from an innings session.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    recent_balls: usize,
}

impl SnapshotBuilder {
    pub fn new(recent_balls: usize) -> Self {
        Self { recent_balls }
    }

    pub fn build(
        &self,
        session: &InningsSession,
        match_status: MatchStatus,
        result: Option<MatchResult>,
        timestamp: Timestamp,
    ) -> StateSnapshot {
        let meta = session.meta();
        let fold = session.fold();
        let state = &fold.state;
        let card = &fold.scorecard;
        let last = session.log().deliveries().last();

        let figures = |player: &Option<PlayerId>| {
            player
                .as_ref()
                .map(|p| card.batter(p).cloned().unwrap_or_else(|| BattingFigures::yet_to_face(p.clone())))
        };

        let mut snapshot = StateSnapshot {
            match_id: meta.match_id,
            innings_id: meta.innings_id,
            innings_number: meta.number,
            kind: meta.kind,
            batting_team: meta.batting_team.clone(),
            bowling_team: meta.bowling_team.clone(),
            version: session.version(),
            last_sequence: state.last_sequence,
            runs: state.runs,
            wickets: state.wickets,
            balls: state.balls,
            overs_limit: meta.overs_limit,
            target: state.target,
            rates: state.rates(),
            striker: figures(&state.striker),
            non_striker: figures(&state.non_striker),
            bowler: last.and_then(|d| card.bowler(&d.bowler).cloned()),
            partnership: card.current_partnership().cloned(),
            recent_balls: card.recent_balls(self.recent_balls),
            this_over: card.overs().last().filter(|o| !o.completed).cloned(),
            last_over: card.last_completed_over().cloned(),
            last_ball: last.map(BallSummary::from),
            free_hit: state.free_hit_pending && !state.is_closed(),
            extras: card.extras(),
            closure: state.closure,
            match_status,
            result,
            timestamp,
            checksum: String::new(),
        };
        match compute_checksum(&snapshot) {
            Ok(checksum) => snapshot.checksum = checksum,
            // Left blank, so the snapshot never passes an integrity check
            Err(e) => error!(
                innings_id = %snapshot.innings_id,
                version = snapshot.version,
                error = %e,
                "Snapshot could not be hashed"
            ),
        }
        snapshot
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new(6)
    }
}

/// SHA-256 over the snapshot content, excluding timestamp and checksum.
fn compute_checksum(snapshot: &StateSnapshot) -> Result<String, serde_json::Error> {
    let mut content = snapshot.clone();
    content.checksum = String::new();
    content.timestamp = 0;

    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut hasher, &content)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify that a snapshot's checksum matches its content. A snapshot whose
/// content cannot be hashed never verifies.
pub fn verify_snapshot_integrity(snapshot: &StateSnapshot) -> bool {
    !snapshot.checksum.is_empty()
        && compute_checksum(snapshot).is_ok_and(|checksum| checksum == snapshot.checksum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cricket_types::delivery::{DeliveryDraft, WicketType};
    use cricket_types::ids::MatchId;
    use cricket_types::innings::InningsMeta;

    use crate::state_machine::Sides;

    fn p(name: &str) -> PlayerId {
        PlayerId::new(name)
    }

    fn session() -> InningsSession {
        let meta = InningsMeta {
            innings_id: InningsId::new(),
            match_id: MatchId::new(),
            number: 2,
            kind: InningsKind::Regular,
            batting_team: TeamId::new("bat"),
            bowling_team: TeamId::new("bowl"),
            overs_limit: Some(20),
            max_wickets: 10,
            target: Some(121),
            follow_on: false,
        };
        let sides = Sides {
            batting: ["a", "b", "c"].iter().map(|n| p(n)).collect(),
            bowling: ["x", "y"].iter().map(|n| p(n)).collect(),
        };
        InningsSession::new(meta, sides, true, 30)
    }

    fn ball(striker: &str, non_striker: &str) -> DeliveryDraft {
        DeliveryDraft::new(p(striker), p(non_striker), p("x"))
    }

    #[test]
    fn test_snapshot_reflects_live_state() {
        let mut s = session();
        s.submit(ball("a", "b").four(), None).unwrap();
        s.submit(ball("a", "b").runs(1), None).unwrap();
        s.submit(ball("b", "a").no_ball(0), None).unwrap();

        let snap = SnapshotBuilder::new(6).build(&s, MatchStatus::Live, None, 1708123456789000000);
        assert_eq!(snap.version, 3);
        assert_eq!((snap.runs, snap.wickets, snap.balls.balls()), (6, 0, 2));
        assert_eq!(snap.rates.required_runs, Some(115));
        assert_eq!(snap.striker.as_ref().map(|f| f.player.clone()), Some(p("b")));
        assert_eq!(snap.non_striker.as_ref().map(|f| f.runs), Some(5));
        assert_eq!(snap.bowler.as_ref().map(|f| f.runs_conceded), Some(6));
        assert_eq!(snap.recent_balls, vec!["4", "1", "nb"]);
        assert!(snap.free_hit);
        assert!(snap.this_over.is_some());
        assert!(snap.last_over.is_none());
        assert_eq!(snap.last_ball.as_ref().map(|b| b.sequence), Some(3));
    }

    #[test]
    fn test_incoming_batter_shown_after_wicket() {
        let mut s = session();
        s.submit(ball("a", "b").out(WicketType::Bowled, p("a")), None).unwrap();
        let snap = SnapshotBuilder::default().build(&s, MatchStatus::Live, None, 0);
        assert_eq!(snap.wickets, 1);
        assert!(snap.striker.is_none());
        assert_eq!(snap.non_striker.map(|f| f.player), Some(p("b")));
        assert_eq!(snap.last_ball.map(|b| b.symbol), Some("W".to_string()));
    }

    #[test]
    fn test_checksum_ignores_timestamp_and_detects_tampering() {
        let mut s = session();
        s.submit(ball("a", "b").runs(2), None).unwrap();
        let builder = SnapshotBuilder::default();
        let one = builder.build(&s, MatchStatus::Live, None, 1);
        let two = builder.build(&s, MatchStatus::Live, None, 2);

        assert_eq!(one.checksum, two.checksum);
        assert!(verify_snapshot_integrity(&one));

        let mut tampered = one.clone();
        tampered.runs += 1;
        assert!(!verify_snapshot_integrity(&tampered));
    }

    #[test]
    fn test_blank_checksum_never_verifies() {
        let s = session();
        let mut snap = SnapshotBuilder::default().build(&s, MatchStatus::Live, None, 0);
        assert_eq!(snap.checksum.len(), 64);
        snap.checksum.clear();
        assert!(!verify_snapshot_integrity(&snap));
    }
}
