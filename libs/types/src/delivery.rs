//! Delivery types
//!
//! A [`Delivery`] is one ball of the innings as committed to the log. It is
//! immutable except through a [`DeliveryPatch`] applied by the correction path.
//!
//! Extras convention: `runs_extras` is the total extras on the ball. Wides and
//! no-balls carry their one-run penalty inside `runs_extras`, so a plain wide
//! has `runs_extras = 1`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ScoringError;
use crate::ids::{ActorId, DeliveryId, InningsId, PlayerId};

/// Unix nanoseconds.
pub type Timestamp = i64;

/// Current wall-clock time in Unix nanoseconds.
pub fn now_nanos() -> Timestamp {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

/// How extras on a delivery arose
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtraType {
    #[default]
    None,
    Bye,
    #[serde(rename = "LEGBYE")]
    LegBye,
    Wide,
    NoBall,
    Penalty,
}

impl ExtraType {
    /// Wides and no-balls must be re-bowled and do not count toward the over.
    pub fn is_legal(&self) -> bool {
        !matches!(self, ExtraType::Wide | ExtraType::NoBall)
    }

    /// Whether extras of this kind are charged to the bowler's figures.
    pub fn charged_to_bowler(&self) -> bool {
        matches!(self, ExtraType::Wide | ExtraType::NoBall)
    }
}

/// Mode of dismissal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WicketType {
    Bowled,
    Caught,
    CaughtAndBowled,
    CaughtBehind,
    Lbw,
    Stumped,
    HitWicket,
    RunOut,
    Obstructing,
    HitBallTwice,
    TimedOut,
    RetiredHurt,
}

impl WicketType {
    /// Dismissals credited to the bowler's wicket column.
    pub fn credited_to_bowler(&self) -> bool {
        matches!(
            self,
            WicketType::Bowled
                | WicketType::Caught
                | WicketType::CaughtAndBowled
                | WicketType::CaughtBehind
                | WicketType::Lbw
                | WicketType::Stumped
                | WicketType::HitWicket
        )
    }

    /// Retirement removes the batter but is not a wicket.
    pub fn counts_as_wicket(&self) -> bool {
        !matches!(self, WicketType::RetiredHurt)
    }

    /// Modes that can only dismiss the batter on strike.
    pub fn striker_only(&self) -> bool {
        matches!(
            self,
            WicketType::Bowled
                | WicketType::Caught
                | WicketType::CaughtAndBowled
                | WicketType::CaughtBehind
                | WicketType::Lbw
                | WicketType::Stumped
                | WicketType::HitWicket
                | WicketType::HitBallTwice
        )
    }

    /// Modes after which no run can have been credited to the bat.
    pub fn forbids_bat_runs(&self) -> bool {
        matches!(
            self,
            WicketType::Bowled
                | WicketType::Caught
                | WicketType::CaughtAndBowled
                | WicketType::CaughtBehind
                | WicketType::Lbw
                | WicketType::Stumped
                | WicketType::HitWicket
        )
    }

    /// Modes still available on a free hit or off a no-ball.
    pub fn allowed_on_free_hit(&self) -> bool {
        matches!(
            self,
            WicketType::RunOut
                | WicketType::Obstructing
                | WicketType::HitBallTwice
                | WicketType::TimedOut
                | WicketType::RetiredHurt
        )
    }

    /// Whether this mode can occur on a delivery with the given extra type.
    pub fn allowed_off(&self, extra: ExtraType) -> bool {
        match extra {
            ExtraType::NoBall => self.allowed_on_free_hit(),
            ExtraType::Wide => matches!(
                self,
                WicketType::Stumped
                    | WicketType::HitWicket
                    | WicketType::RunOut
                    | WicketType::Obstructing
                    | WicketType::TimedOut
                    | WicketType::RetiredHurt
            ),
            _ => true,
        }
    }
}

/// A dismissal recorded on a delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dismissal {
    pub kind: WicketType,
    pub player_out: PlayerId,
    pub fielder: Option<PlayerId>,
}

impl Dismissal {
    pub fn new(kind: WicketType, player_out: PlayerId) -> Self {
        Self {
            kind,
            player_out,
            fielder: None,
        }
    }

    pub fn with_fielder(mut self, fielder: PlayerId) -> Self {
        self.fielder = Some(fielder);
        self
    }
}

/// Normalized field coordinate, both axes in 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: Decimal,
    pub y: Decimal,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self {
            x: Decimal::from(x),
            y: Decimal::from(y),
        }
    }

    pub fn is_normalized(&self) -> bool {
        let range = Decimal::ZERO..=Decimal::ONE_HUNDRED;
        range.contains(&self.x) && range.contains(&self.y)
    }
}

/// What happened on the ball, independent of who was involved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryOutcome {
    pub runs_batter: u8,
    pub runs_extras: u8,
    pub extra_type: ExtraType,
    pub is_four: bool,
    pub is_six: bool,
    pub dismissal: Option<Dismissal>,
}

impl DeliveryOutcome {
    pub fn is_legal(&self) -> bool {
        self.extra_type.is_legal()
    }

    /// Runs added to the team total.
    pub fn total_runs(&self) -> u32 {
        u32::from(self.runs_batter) + u32::from(self.runs_extras)
    }

    /// Runs charged against the bowler: bat runs plus wides and no-balls.
    pub fn bowler_conceded(&self) -> u32 {
        let extras = if self.extra_type.charged_to_bowler() {
            u32::from(self.runs_extras)
        } else {
            0
        };
        u32::from(self.runs_batter) + extras
    }

    /// Runs physically completed between the wickets; drives strike rotation.
    pub fn runs_run(&self) -> u32 {
        let bat = u32::from(self.runs_batter);
        let extras = u32::from(self.runs_extras);
        let run = match self.extra_type {
            ExtraType::None | ExtraType::Penalty => bat,
            ExtraType::Bye | ExtraType::LegBye => extras,
            ExtraType::Wide => extras.saturating_sub(1),
            ExtraType::NoBall => (bat + extras).saturating_sub(1),
        };
        // Boundaries are not run
        if self.is_six {
            run.saturating_sub(6)
        } else if self.is_four {
            run.saturating_sub(4)
        } else {
            run
        }
    }

    pub fn four_off_bat(&self) -> bool {
        self.is_four && self.runs_batter == 4
    }

    pub fn six_off_bat(&self) -> bool {
        self.is_six && self.runs_batter == 6
    }

    pub fn is_wicket(&self) -> bool {
        self.dismissal
            .as_ref()
            .map(|d| d.kind.counts_as_wicket())
            .unwrap_or(false)
    }

    /// Checks the per-ball invariants that do not depend on match context.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.runs_batter > 6 {
            return Err(ScoringError::invalid_delivery(format!(
                "runs_batter {} exceeds 6",
                self.runs_batter
            )));
        }

        match self.extra_type {
            ExtraType::None if self.runs_extras != 0 => {
                return Err(ScoringError::invalid_delivery(
                    "runs_extras without an extra_type",
                ));
            }
            ExtraType::None => {}
            other if self.runs_extras == 0 => {
                return Err(ScoringError::invalid_delivery(format!(
                    "{:?} requires at least one extra run",
                    other
                )));
            }
            _ => {}
        }

        if matches!(
            self.extra_type,
            ExtraType::Wide | ExtraType::Bye | ExtraType::LegBye
        ) && self.runs_batter > 0
        {
            return Err(ScoringError::invalid_delivery(format!(
                "{:?} cannot carry runs off the bat",
                self.extra_type
            )));
        }

        if self.is_four && self.is_six {
            return Err(ScoringError::invalid_delivery(
                "is_four and is_six are mutually exclusive",
            ));
        }
        if self.is_six && self.runs_batter != 6 {
            return Err(ScoringError::invalid_delivery("six must credit 6 runs to the bat"));
        }
        if self.is_four {
            let bat_four = self.runs_batter == 4;
            let extras_four = matches!(self.extra_type, ExtraType::Bye | ExtraType::LegBye)
                && self.runs_extras == 4;
            let wide_four = self.extra_type == ExtraType::Wide && self.runs_extras == 5;
            if !(bat_four || extras_four || wide_four) {
                return Err(ScoringError::invalid_delivery(
                    "four flag does not match the runs recorded",
                ));
            }
        }

        if let Some(dismissal) = &self.dismissal {
            if dismissal.kind.forbids_bat_runs() && self.runs_batter > 0 {
                return Err(ScoringError::invalid_delivery(format!(
                    "{:?} cannot score runs off the bat",
                    dismissal.kind
                )));
            }
            if !dismissal.kind.allowed_off(self.extra_type) {
                return Err(ScoringError::invalid_delivery(format!(
                    "{:?} cannot happen off a {:?}",
                    dismissal.kind, self.extra_type
                )));
            }
        }

        Ok(())
    }

    /// Compact ball symbol for over summaries ("•", "4", "W", "wd", "2nb", "1lb").
    pub fn symbol(&self) -> String {
        if self.is_wicket() {
            return "W".to_string();
        }
        let base = match self.extra_type {
            ExtraType::None if self.runs_batter == 0 => "•".to_string(),
            ExtraType::None => self.runs_batter.to_string(),
            ExtraType::Wide if self.runs_extras == 1 => "wd".to_string(),
            ExtraType::Wide => format!("{}wd", self.runs_extras),
            ExtraType::NoBall if self.total_runs() == 1 => "nb".to_string(),
            ExtraType::NoBall => format!("{}nb", self.total_runs()),
            ExtraType::Bye => format!("{}b", self.runs_extras),
            ExtraType::LegBye => format!("{}lb", self.runs_extras),
            ExtraType::Penalty => format!("{}p", self.total_runs()),
        };
        if self.dismissal.is_some() {
            format!("{}r", base)
        } else {
            base
        }
    }
}

/// A delivery as submitted by the scorer, before the engine numbers it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDraft {
    pub striker: PlayerId,
    pub non_striker: PlayerId,
    pub bowler: PlayerId,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
    #[serde(default)]
    pub wagon: Option<Point>,
    #[serde(default)]
    pub pitch: Option<Point>,
    /// Advisory; the engine assigns the authoritative label.
    #[serde(default)]
    pub over_number: Option<u32>,
    /// Advisory; the engine assigns the authoritative label.
    #[serde(default)]
    pub ball_in_over: Option<u32>,
    #[serde(default)]
    pub commentary: Option<String>,
    /// Idempotency key; resubmitting a committed key returns the committed ball.
    #[serde(default)]
    pub client_ref: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

impl DeliveryDraft {
    /// A dot ball.
    pub fn new(striker: PlayerId, non_striker: PlayerId, bowler: PlayerId) -> Self {
        Self {
            striker,
            non_striker,
            bowler,
            outcome: DeliveryOutcome::default(),
            wagon: None,
            pitch: None,
            over_number: None,
            ball_in_over: None,
            commentary: None,
            client_ref: None,
            timestamp: None,
        }
    }

    pub fn runs(mut self, runs: u8) -> Self {
        self.outcome.runs_batter = runs;
        self
    }

    pub fn four(mut self) -> Self {
        self.outcome.runs_batter = 4;
        self.outcome.is_four = true;
        self
    }

    pub fn six(mut self) -> Self {
        self.outcome.runs_batter = 6;
        self.outcome.is_six = true;
        self
    }

    pub fn extras(mut self, extra_type: ExtraType, runs_extras: u8) -> Self {
        self.outcome.extra_type = extra_type;
        self.outcome.runs_extras = runs_extras;
        self
    }

    /// A wide with `runs_extras` total (1 for a plain wide).
    pub fn wide(self, runs_extras: u8) -> Self {
        self.extras(ExtraType::Wide, runs_extras)
    }

    /// A no-ball with the one-run penalty and `runs_batter` off the bat.
    pub fn no_ball(self, runs_batter: u8) -> Self {
        self.extras(ExtraType::NoBall, 1).runs(runs_batter)
    }

    pub fn byes(self, runs: u8) -> Self {
        self.extras(ExtraType::Bye, runs)
    }

    pub fn leg_byes(self, runs: u8) -> Self {
        self.extras(ExtraType::LegBye, runs)
    }

    pub fn dismissal(mut self, dismissal: Dismissal) -> Self {
        self.outcome.dismissal = Some(dismissal);
        self
    }

    pub fn out(self, kind: WicketType, player_out: PlayerId) -> Self {
        self.dismissal(Dismissal::new(kind, player_out))
    }

    pub fn wagon(mut self, x: u32, y: u32) -> Self {
        self.wagon = Some(Point::new(x, y));
        self
    }

    pub fn pitch(mut self, x: u32, y: u32) -> Self {
        self.pitch = Some(Point::new(x, y));
        self
    }

    pub fn numbered(mut self, over_number: u32, ball_in_over: u32) -> Self {
        self.over_number = Some(over_number);
        self.ball_in_over = Some(ball_in_over);
        self
    }

    pub fn client_ref(mut self, key: impl Into<String>) -> Self {
        self.client_ref = Some(key.into());
        self
    }

    pub fn commentary(mut self, text: impl Into<String>) -> Self {
        self.commentary = Some(text.into());
        self
    }
}

/// A committed delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub delivery_id: DeliveryId,
    pub innings_id: InningsId,
    /// Per-innings commit order; assigned once and never reused.
    pub sequence: u64,
    pub over_number: u32,
    /// Label of the legal ball this delivery belongs to (1..=6).
    pub ball_in_over: u32,
    pub is_legal_delivery: bool,
    pub is_free_hit: bool,
    pub striker: PlayerId,
    pub non_striker: PlayerId,
    pub bowler: PlayerId,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
    pub wagon: Option<Point>,
    pub pitch: Option<Point>,
    pub commentary: Option<String>,
    pub timestamp: Timestamp,
    pub recorded_by: Option<ActorId>,
    pub client_ref: Option<String>,
    /// Number of corrections applied to this delivery.
    pub revision: u32,
}

impl Delivery {
    pub fn total_runs(&self) -> u32 {
        self.outcome.total_runs()
    }

    pub fn dismissal(&self) -> Option<&Dismissal> {
        self.outcome.dismissal.as_ref()
    }

    pub fn involves_batter(&self, player: &PlayerId) -> bool {
        &self.striker == player || &self.non_striker == player
    }
}

/// Replacement for the dismissal on a corrected delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DismissalPatch {
    Clear,
    Set { dismissal: Dismissal },
}

/// Field-level amendment of a committed delivery
///
/// Absent fields are left unchanged. Sequence, identity and placement are
/// never patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPatch {
    #[serde(default)]
    pub striker: Option<PlayerId>,
    #[serde(default)]
    pub non_striker: Option<PlayerId>,
    #[serde(default)]
    pub bowler: Option<PlayerId>,
    #[serde(default)]
    pub runs_batter: Option<u8>,
    #[serde(default)]
    pub runs_extras: Option<u8>,
    #[serde(default)]
    pub extra_type: Option<ExtraType>,
    #[serde(default)]
    pub is_four: Option<bool>,
    #[serde(default)]
    pub is_six: Option<bool>,
    #[serde(default)]
    pub dismissal: Option<DismissalPatch>,
    #[serde(default)]
    pub wagon: Option<Point>,
    #[serde(default)]
    pub pitch: Option<Point>,
    #[serde(default)]
    pub commentary: Option<String>,
}

impl DeliveryPatch {
    pub fn is_empty(&self) -> bool {
        self == &DeliveryPatch::default()
    }

    /// Plain runs off the bat; clears boundary flags.
    pub fn with_runs(mut self, runs: u8) -> Self {
        self.runs_batter = Some(runs);
        self.is_four = Some(false);
        self.is_six = Some(false);
        self
    }

    pub fn with_extras(mut self, extra_type: ExtraType, runs_extras: u8) -> Self {
        self.extra_type = Some(extra_type);
        self.runs_extras = Some(runs_extras);
        self
    }

    pub fn with_dismissal(mut self, dismissal: Dismissal) -> Self {
        self.dismissal = Some(DismissalPatch::Set { dismissal });
        self
    }

    pub fn clear_dismissal(mut self) -> Self {
        self.dismissal = Some(DismissalPatch::Clear);
        self
    }

    pub fn with_batters(mut self, striker: PlayerId, non_striker: PlayerId) -> Self {
        self.striker = Some(striker);
        self.non_striker = Some(non_striker);
        self
    }

    /// Apply to a delivery and bump its revision.
    pub fn apply_to(&self, delivery: &mut Delivery) {
        if let Some(p) = &self.striker {
            delivery.striker = p.clone();
        }
        if let Some(p) = &self.non_striker {
            delivery.non_striker = p.clone();
        }
        if let Some(p) = &self.bowler {
            delivery.bowler = p.clone();
        }
        if let Some(runs) = self.runs_batter {
            delivery.outcome.runs_batter = runs;
        }
        if let Some(runs) = self.runs_extras {
            delivery.outcome.runs_extras = runs;
        }
        if let Some(extra_type) = self.extra_type {
            delivery.outcome.extra_type = extra_type;
            delivery.is_legal_delivery = extra_type.is_legal();
        }
        if let Some(flag) = self.is_four {
            delivery.outcome.is_four = flag;
        }
        if let Some(flag) = self.is_six {
            delivery.outcome.is_six = flag;
        }
        match &self.dismissal {
            Some(DismissalPatch::Clear) => delivery.outcome.dismissal = None,
            Some(DismissalPatch::Set { dismissal }) => {
                delivery.outcome.dismissal = Some(dismissal.clone())
            }
            None => {}
        }
        if let Some(point) = self.wagon {
            delivery.wagon = Some(point);
        }
        if let Some(point) = self.pitch {
            delivery.pitch = Some(point);
        }
        if let Some(text) = &self.commentary {
            delivery.commentary = Some(text.clone());
        }
        delivery.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(extra_type: ExtraType, runs_batter: u8, runs_extras: u8) -> DeliveryOutcome {
        DeliveryOutcome {
            runs_batter,
            runs_extras,
            extra_type,
            ..DeliveryOutcome::default()
        }
    }

    #[test]
    fn test_legality() {
        assert!(ExtraType::None.is_legal());
        assert!(ExtraType::Bye.is_legal());
        assert!(ExtraType::Penalty.is_legal());
        assert!(!ExtraType::Wide.is_legal());
        assert!(!ExtraType::NoBall.is_legal());
    }

    #[test]
    fn test_runs_run_convention() {
        assert_eq!(outcome(ExtraType::None, 3, 0).runs_run(), 3);
        assert_eq!(outcome(ExtraType::LegBye, 0, 1).runs_run(), 1);
        assert_eq!(outcome(ExtraType::Wide, 0, 1).runs_run(), 0);
        assert_eq!(outcome(ExtraType::Wide, 0, 3).runs_run(), 2);
        assert_eq!(outcome(ExtraType::NoBall, 1, 1).runs_run(), 1);
        assert_eq!(outcome(ExtraType::NoBall, 0, 2).runs_run(), 1);
    }

    #[test]
    fn test_boundaries_are_not_run() {
        let mut four = outcome(ExtraType::None, 4, 0);
        four.is_four = true;
        assert_eq!(four.runs_run(), 0);

        let mut bye_four = outcome(ExtraType::Bye, 0, 4);
        bye_four.is_four = true;
        assert_eq!(bye_four.runs_run(), 0);

        // Four all run (no boundary flag) does count as run
        assert_eq!(outcome(ExtraType::None, 4, 0).runs_run(), 4);
    }

    #[test]
    fn test_bowler_conceded_excludes_byes() {
        assert_eq!(outcome(ExtraType::Bye, 0, 4).bowler_conceded(), 0);
        assert_eq!(outcome(ExtraType::LegBye, 0, 2).bowler_conceded(), 0);
        assert_eq!(outcome(ExtraType::Wide, 0, 1).bowler_conceded(), 1);
        assert_eq!(outcome(ExtraType::NoBall, 4, 1).bowler_conceded(), 5);
        assert_eq!(outcome(ExtraType::Penalty, 0, 5).bowler_conceded(), 0);
    }

    #[test]
    fn test_validate_rejects_bat_runs_with_bowled() {
        let mut o = outcome(ExtraType::None, 2, 0);
        o.dismissal = Some(Dismissal::new(WicketType::Bowled, PlayerId::new("a")));
        assert!(matches!(o.validate(), Err(ScoringError::InvalidDelivery { .. })));

        // Run out after completing a run is fine
        o.dismissal = Some(Dismissal::new(WicketType::RunOut, PlayerId::new("a")));
        assert!(o.validate().is_ok());
    }

    #[test]
    fn test_validate_extras_shape() {
        assert!(outcome(ExtraType::None, 0, 1).validate().is_err());
        assert!(outcome(ExtraType::Wide, 0, 0).validate().is_err());
        assert!(outcome(ExtraType::Wide, 1, 1).validate().is_err());
        assert!(outcome(ExtraType::NoBall, 6, 1).validate().is_ok());
        assert!(outcome(ExtraType::None, 7, 0).validate().is_err());
    }

    #[test]
    fn test_validate_boundary_flags() {
        let mut o = outcome(ExtraType::None, 6, 0);
        o.is_four = true;
        o.is_six = true;
        assert!(o.validate().is_err());

        let mut wrong_six = outcome(ExtraType::None, 4, 0);
        wrong_six.is_six = true;
        assert!(wrong_six.validate().is_err());
    }

    #[test]
    fn test_no_ball_only_allows_free_hit_modes() {
        let mut o = outcome(ExtraType::NoBall, 0, 1);
        o.dismissal = Some(Dismissal::new(WicketType::Caught, PlayerId::new("a")));
        assert!(o.validate().is_err());

        o.dismissal = Some(Dismissal::new(WicketType::RunOut, PlayerId::new("a")));
        assert!(o.validate().is_ok());

        let mut w = outcome(ExtraType::Wide, 0, 1);
        w.dismissal = Some(Dismissal::new(WicketType::Stumped, PlayerId::new("a")));
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_symbols() {
        assert_eq!(outcome(ExtraType::None, 0, 0).symbol(), "•");
        assert_eq!(outcome(ExtraType::None, 2, 0).symbol(), "2");
        assert_eq!(outcome(ExtraType::Wide, 0, 1).symbol(), "wd");
        assert_eq!(outcome(ExtraType::Wide, 0, 3).symbol(), "3wd");
        assert_eq!(outcome(ExtraType::NoBall, 4, 1).symbol(), "5nb");
        assert_eq!(outcome(ExtraType::LegBye, 0, 1).symbol(), "1lb");

        let mut w = outcome(ExtraType::None, 0, 0);
        w.dismissal = Some(Dismissal::new(WicketType::Lbw, PlayerId::new("a")));
        assert_eq!(w.symbol(), "W");
    }

    #[test]
    fn test_extra_type_wire_names() {
        assert_eq!(serde_json::to_string(&ExtraType::LegBye).unwrap(), "\"LEGBYE\"");
        assert_eq!(serde_json::to_string(&ExtraType::NoBall).unwrap(), "\"NO_BALL\"");
        assert_eq!(
            serde_json::to_string(&WicketType::CaughtAndBowled).unwrap(),
            "\"CAUGHT_AND_BOWLED\""
        );
    }

    #[test]
    fn test_patch_bumps_revision() {
        let mut delivery = Delivery {
            delivery_id: DeliveryId::new(),
            innings_id: InningsId::new(),
            sequence: 14,
            over_number: 3,
            ball_in_over: 2,
            is_legal_delivery: true,
            is_free_hit: false,
            striker: PlayerId::new("a"),
            non_striker: PlayerId::new("b"),
            bowler: PlayerId::new("x"),
            outcome: outcome(ExtraType::None, 2, 0),
            wagon: None,
            pitch: None,
            commentary: None,
            timestamp: 0,
            recorded_by: None,
            client_ref: None,
            revision: 0,
        };

        DeliveryPatch::default()
            .with_runs(0)
            .with_dismissal(Dismissal::new(WicketType::Caught, PlayerId::new("a")))
            .apply_to(&mut delivery);

        assert_eq!(delivery.sequence, 14);
        assert_eq!(delivery.revision, 1);
        assert_eq!(delivery.outcome.runs_batter, 0);
        assert!(delivery.outcome.is_wicket());
    }

    #[test]
    fn test_draft_deserializes_flattened_outcome() {
        let json = r#"{
            "striker": "a", "non_striker": "b", "bowler": "x",
            "runs_batter": 1, "runs_extras": 0, "extra_type": "NONE",
            "is_four": false, "is_six": false, "dismissal": null
        }"#;
        let draft: DeliveryDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.outcome.runs_batter, 1);
        assert!(draft.client_ref.is_none());
    }
}
