//! Request and response bodies for the HTTP edge
//!
//! Overs are rendered as "N.n" strings here and nowhere else; the engine
//! itself only ever counts legal balls.

use std::collections::BTreeMap;

use cricket_types::delivery::{Delivery, DeliveryDraft, DeliveryPatch};
use cricket_types::fixture::{MatchFormat, MatchRecord, MatchResult, MatchSetup, MatchStatus, Toss};
use cricket_types::ids::{ActorId, DeliveryId, InningsId, MatchId, PlayerId, TeamId};
use cricket_types::innings::{ClosureReason, InningsKind, InningsSummary};
use cricket_types::numeric::BallCount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::{AnalyticsView, PitchPoint, ShotPoint};
use crate::correction::CorrectionReport;
use crate::engine::{MatchView, SubmitReceipt};
use crate::metrics::Alert;
use crate::roster::Player;
use crate::scorecard::{BattingFigures, BowlingFigures, FallOfWicket, OverSummary, Partnership};
use crate::snapshot::StateSnapshot;

/// "N.n" label for a legal-ball count.
pub fn overs_label(balls: BallCount) -> String {
    balls.to_string()
}

// -------------------------------------------------------------------
// Requests
// -------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMatchRequest {
    #[serde(flatten)]
    pub format: MatchFormat,
    pub home: TeamId,
    pub away: TeamId,
}

impl From<CreateMatchRequest> for MatchSetup {
    fn from(request: CreateMatchRequest) -> Self {
        MatchSetup {
            format: request.format,
            home: request.home,
            away: request.away,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenInningsRequest {
    #[serde(default)]
    pub enforce_follow_on: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitDeliveryRequest {
    #[serde(flatten)]
    pub draft: DeliveryDraft,
    #[serde(default)]
    pub actor: Option<ActorId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorrectionRequest {
    #[serde(flatten)]
    pub patch: DeliveryPatch,
    #[serde(default)]
    pub actor: Option<ActorId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadRequest {
    pub players: Vec<Player>,
}

/// Optional chart filters on the analytics endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub batter: Option<PlayerId>,
    pub bowler: Option<PlayerId>,
}

// -------------------------------------------------------------------
// Responses
// -------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct InningsLine {
    pub innings_id: InningsId,
    pub number: u32,
    pub kind: InningsKind,
    pub batting_team: TeamId,
    pub score: String,
    pub overs: String,
    pub target: Option<u32>,
    pub closure: Option<ClosureReason>,
}

impl From<&InningsSummary> for InningsLine {
    fn from(summary: &InningsSummary) -> Self {
        Self {
            innings_id: summary.innings_id,
            number: summary.number,
            kind: summary.kind,
            batting_team: summary.batting_team.clone(),
            score: format!("{}/{}", summary.runs, summary.wickets),
            overs: overs_label(summary.balls),
            target: summary.target,
            closure: summary.closure_reason(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResponse {
    pub match_id: MatchId,
    #[serde(flatten)]
    pub format: MatchFormat,
    pub home: TeamId,
    pub away: TeamId,
    pub toss: Option<Toss>,
    pub status: MatchStatus,
    pub innings: Vec<InningsLine>,
    pub result: Option<MatchResult>,
    pub live: Option<InningsResponse>,
}

impl MatchResponse {
    pub fn from_record(record: &MatchRecord, live: Option<StateSnapshot>) -> Self {
        Self {
            match_id: record.match_id,
            format: record.format,
            home: record.home.clone(),
            away: record.away.clone(),
            toss: record.toss.clone(),
            status: record.status,
            innings: record.innings.iter().map(InningsLine::from).collect(),
            result: record.result.clone(),
            live: live.map(InningsResponse::from),
        }
    }
}

impl From<MatchView> for MatchResponse {
    fn from(view: MatchView) -> Self {
        Self::from_record(&view.record, view.live)
    }
}

/// Live snapshot plus its printable score line.
#[derive(Debug, Clone, Serialize)]
pub struct InningsResponse {
    pub score: String,
    pub overs: String,
    #[serde(flatten)]
    pub snapshot: StateSnapshot,
}

impl From<StateSnapshot> for InningsResponse {
    fn from(snapshot: StateSnapshot) -> Self {
        Self {
            score: format!("{}/{}", snapshot.runs, snapshot.wickets),
            overs: overs_label(snapshot.balls),
            snapshot,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResponse {
    pub delivery_id: DeliveryId,
    pub sequence: u64,
    /// Label of the ball, e.g. "3.4" for the fourth ball of the fourth over.
    pub ball: String,
    pub duplicate: bool,
    pub innings: InningsResponse,
}

impl From<SubmitReceipt> for DeliveryResponse {
    fn from(receipt: SubmitReceipt) -> Self {
        Self {
            delivery_id: receipt.delivery.delivery_id,
            sequence: receipt.delivery.sequence,
            ball: ball_label(&receipt.delivery),
            duplicate: receipt.duplicate,
            innings: receipt.snapshot.into(),
        }
    }
}

fn ball_label(delivery: &Delivery) -> String {
    format!("{}.{}", delivery.over_number.saturating_sub(1), delivery.ball_in_over)
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRow {
    pub ball: String,
    #[serde(flatten)]
    pub delivery: Delivery,
}

impl From<Delivery> for DeliveryRow {
    fn from(delivery: Delivery) -> Self {
        Self {
            ball: ball_label(&delivery),
            delivery,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrectionResponse {
    pub corrected: Vec<DeliveryId>,
    pub from_sequence: u64,
    pub refolded: usize,
    pub score_before: String,
    pub score_after: String,
    pub innings: InningsResponse,
}

impl CorrectionResponse {
    pub fn new(report: CorrectionReport, snapshot: StateSnapshot) -> Self {
        Self {
            corrected: report.corrected.iter().map(|d| d.delivery_id).collect(),
            from_sequence: report.from_sequence,
            refolded: report.refolded,
            score_before: format!("{}/{}", report.runs_before, report.wickets_before),
            score_after: format!("{}/{}", report.runs_after, report.wickets_after),
            innings: snapshot.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BattingRow {
    pub player: PlayerId,
    pub name: String,
    pub dismissal: String,
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub strike_rate: Decimal,
}

impl BattingRow {
    pub fn new(figures: &BattingFigures, name: &dyn Fn(&PlayerId) -> String) -> Self {
        Self {
            player: figures.player.clone(),
            name: name(&figures.player),
            dismissal: figures.dismissal_text(name),
            runs: figures.runs,
            balls: figures.balls,
            fours: figures.fours,
            sixes: figures.sixes,
            strike_rate: figures.strike_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BowlingRow {
    pub player: PlayerId,
    pub name: String,
    pub overs: String,
    pub maidens: u32,
    pub runs: u32,
    pub wickets: u32,
    pub economy: Decimal,
    pub wides: u32,
    pub no_balls: u32,
    pub dots: u32,
}

impl BowlingRow {
    pub fn new(figures: &BowlingFigures, name: &dyn Fn(&PlayerId) -> String) -> Self {
        Self {
            player: figures.player.clone(),
            name: name(&figures.player),
            overs: overs_label(figures.overs()),
            maidens: figures.maidens,
            runs: figures.runs_conceded,
            wickets: figures.wickets,
            economy: figures.economy(),
            wides: figures.wides,
            no_balls: figures.no_balls,
            dots: figures.dots,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartnershipRow {
    pub wicket: u32,
    pub batters: [String; 2],
    pub runs: u32,
    pub balls: u32,
    pub contributions: [u32; 2],
    pub extras: u32,
    pub unbroken: bool,
}

impl PartnershipRow {
    pub fn new(p: &Partnership, name: &dyn Fn(&PlayerId) -> String) -> Self {
        Self {
            wicket: p.number,
            batters: [name(&p.batter_one), name(&p.batter_two)],
            runs: p.runs,
            balls: p.balls,
            contributions: [p.batter_one_runs, p.batter_two_runs],
            extras: p.extras,
            unbroken: p.is_unbroken(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FallOfWicketRow {
    pub wicket: u32,
    pub score: String,
    pub overs: String,
    pub player_out: PlayerId,
    pub name: String,
}

impl FallOfWicketRow {
    pub fn new(fow: &FallOfWicket, name: &dyn Fn(&PlayerId) -> String) -> Self {
        Self {
            wicket: fow.wicket,
            score: format!("{}-{}", fow.score, fow.wicket),
            overs: overs_label(fow.balls),
            player_out: fow.player_out.clone(),
            name: name(&fow.player_out),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsResponse {
    #[serde(flatten)]
    pub view: AnalyticsView,
    /// Filtered chart points when a batter or bowler was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batter_wagon_wheel: Option<Vec<ShotPoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bowler_pitch_map: Option<Vec<PitchPoint>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OversResponse {
    pub overs: Vec<OverSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub counters: BTreeMap<String, u64>,
    pub alerts: Vec<Alert>,
}
