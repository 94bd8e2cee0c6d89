//! Scorecard aggregator
//!
//! Folds deliveries into batting and bowling figures, partnerships, fall of
//! wickets, the extras breakdown and per-over summaries. The accumulator
//! holds no hidden counters: folding the same deliveries from an empty
//! [`Scorecard`] always reproduces the same card.

use std::collections::BTreeMap;

use cricket_types::delivery::{Delivery, ExtraType, WicketType};
use cricket_types::ids::PlayerId;
use cricket_types::numeric::{ratio, runs_per_over, strike_rate, BallCount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::state_machine::Transition;

/// How a batter's innings ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismissalRecord {
    pub kind: WicketType,
    pub bowler: PlayerId,
    pub fielder: Option<PlayerId>,
    pub sequence: u64,
}

impl DismissalRecord {
    /// Conventional scorecard text, e.g. "c Smith b Jones".
    pub fn describe(&self, name: &dyn Fn(&PlayerId) -> String) -> String {
        let bowler = name(&self.bowler);
        if self.kind == WicketType::Caught && self.fielder.as_ref() == Some(&self.bowler) {
            return format!("c & b {}", bowler);
        }
        let fielder = self.fielder.as_ref().map(|f| name(f));
        match (self.kind, fielder) {
            (WicketType::Bowled, _) => format!("b {}", bowler),
            (WicketType::Caught | WicketType::CaughtBehind, Some(f)) => format!("c {} b {}", f, bowler),
            (WicketType::Caught | WicketType::CaughtBehind, None) => format!("c ? b {}", bowler),
            (WicketType::CaughtAndBowled, _) => format!("c & b {}", bowler),
            (WicketType::Lbw, _) => format!("lbw b {}", bowler),
            (WicketType::Stumped, Some(f)) => format!("st {} b {}", f, bowler),
            (WicketType::Stumped, None) => format!("st ? b {}", bowler),
            (WicketType::HitWicket, _) => format!("hit wicket b {}", bowler),
            (WicketType::RunOut, Some(f)) => format!("run out ({})", f),
            (WicketType::RunOut, None) => "run out".to_string(),
            (WicketType::Obstructing, _) => "obstructing the field".to_string(),
            (WicketType::HitBallTwice, _) => "hit the ball twice".to_string(),
            (WicketType::TimedOut, _) => "timed out".to_string(),
            (WicketType::RetiredHurt, _) => "retired hurt".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattingFigures {
    pub player: PlayerId,
    /// 1-based batting position, by first appearance.
    pub position: u32,
    pub runs: u32,
    /// Legal deliveries faced.
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub dots: u32,
    pub dismissal: Option<DismissalRecord>,
}

impl BattingFigures {
    fn new(player: PlayerId, position: u32) -> Self {
        Self {
            player,
            position,
            runs: 0,
            balls: 0,
            fours: 0,
            sixes: 0,
            dots: 0,
            dismissal: None,
        }
    }

    /// Figures for a batter at the crease who has not faced yet.
    pub fn yet_to_face(player: PlayerId) -> Self {
        Self::new(player, 0)
    }

    pub fn strike_rate(&self) -> Decimal {
        strike_rate(self.runs, self.balls)
    }

    pub fn is_out(&self) -> bool {
        self.dismissal
            .as_ref()
            .is_some_and(|d| d.kind.counts_as_wicket())
    }

    pub fn dismissal_text(&self, name: &dyn Fn(&PlayerId) -> String) -> String {
        self.dismissal
            .as_ref()
            .map(|d| d.describe(name))
            .unwrap_or_else(|| "not out".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BowlingFigures {
    pub player: PlayerId,
    pub legal_balls: u32,
    pub runs_conceded: u32,
    pub wickets: u32,
    pub maidens: u32,
    /// Wide deliveries bowled.
    pub wides: u32,
    /// No-ball deliveries bowled.
    pub no_balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub dots: u32,
}

impl BowlingFigures {
    fn new(player: PlayerId) -> Self {
        Self {
            player,
            legal_balls: 0,
            runs_conceded: 0,
            wickets: 0,
            maidens: 0,
            wides: 0,
            no_balls: 0,
            fours: 0,
            sixes: 0,
            dots: 0,
        }
    }

    pub fn overs(&self) -> BallCount {
        BallCount::from_balls(self.legal_balls)
    }

    /// Runs per over, from true balls.
    pub fn economy(&self) -> Decimal {
        runs_per_over(self.runs_conceded, self.overs())
    }

    pub fn average(&self) -> Option<Decimal> {
        ratio(self.runs_conceded, self.wickets)
    }

    pub fn strike_rate(&self) -> Option<Decimal> {
        ratio(self.legal_balls, self.wickets)
    }
}

/// How a partnership ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnershipEnd {
    pub sequence: u64,
    pub player_out: PlayerId,
    pub kind: WicketType,
    /// Wicket number, None for a retirement.
    pub wicket: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partnership {
    /// 1-based partnership number in the innings.
    pub number: u32,
    pub batter_one: PlayerId,
    pub batter_two: PlayerId,
    /// All runs added while the pair was together, extras included.
    pub runs: u32,
    pub balls: u32,
    pub batter_one_runs: u32,
    pub batter_one_balls: u32,
    pub batter_two_runs: u32,
    pub batter_two_balls: u32,
    pub extras: u32,
    pub fours: u32,
    pub sixes: u32,
    pub start_sequence: u64,
    pub end: Option<PartnershipEnd>,
}

impl Partnership {
    fn open(number: u32, striker: &PlayerId, non_striker: &PlayerId, sequence: u64) -> Self {
        Self {
            number,
            batter_one: striker.clone(),
            batter_two: non_striker.clone(),
            runs: 0,
            balls: 0,
            batter_one_runs: 0,
            batter_one_balls: 0,
            batter_two_runs: 0,
            batter_two_balls: 0,
            extras: 0,
            fours: 0,
            sixes: 0,
            start_sequence: sequence,
            end: None,
        }
    }

    pub fn is_unbroken(&self) -> bool {
        self.end.is_none()
    }

    pub fn includes(&self, player: &PlayerId) -> bool {
        &self.batter_one == player || &self.batter_two == player
    }

    fn is_pair(&self, a: &PlayerId, b: &PlayerId) -> bool {
        self.includes(a) && self.includes(b)
    }

    pub fn strike_rate(&self) -> Decimal {
        strike_rate(self.runs, self.balls)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallOfWicket {
    pub wicket: u32,
    /// Team score when the wicket fell.
    pub score: u32,
    pub balls: BallCount,
    pub player_out: PlayerId,
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrasBreakdown {
    pub byes: u32,
    pub leg_byes: u32,
    pub wides: u32,
    pub no_balls: u32,
    pub penalties: u32,
}

impl ExtrasBreakdown {
    pub fn total(&self) -> u32 {
        self.byes + self.leg_byes + self.wides + self.no_balls + self.penalties
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverSummary {
    pub over_number: u32,
    /// Bowlers in order of appearance (more than one if an over was finished by another bowler).
    pub bowlers: Vec<PlayerId>,
    pub legal_balls: u32,
    pub runs: u32,
    pub bowler_runs: u32,
    pub extras: u32,
    pub wickets: u32,
    pub balls: Vec<String>,
    pub completed: bool,
    pub maiden: bool,
}

impl OverSummary {
    fn open(over_number: u32) -> Self {
        Self {
            over_number,
            bowlers: Vec::new(),
            legal_balls: 0,
            runs: 0,
            bowler_runs: 0,
            extras: 0,
            wickets: 0,
            balls: Vec::new(),
            completed: false,
            maiden: false,
        }
    }
}

/// Scorecard accumulator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorecard {
    batting: BTreeMap<PlayerId, BattingFigures>,
    bowling: BTreeMap<PlayerId, BowlingFigures>,
    bowling_order: Vec<PlayerId>,
    partnerships: Vec<Partnership>,
    fall_of_wickets: Vec<FallOfWicket>,
    extras: ExtrasBreakdown,
    overs: Vec<OverSummary>,
    runs: u32,
    wickets: u32,
    balls: BallCount,
}

impl Scorecard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one delivery. `transition` is what the state machine reported for it.
    pub fn apply(&mut self, delivery: &Delivery, transition: &Transition) {
        let outcome = &delivery.outcome;
        let legal = outcome.is_legal();

        self.runs += outcome.total_runs();
        if legal {
            self.balls.increment();
        }

        // Batting
        for batter in [&delivery.striker, &delivery.non_striker] {
            let position = self.batting.len() as u32 + 1;
            let figures = self
                .batting
                .entry(batter.clone())
                .or_insert_with(|| BattingFigures::new(batter.clone(), position));
            // A retired batter resuming their innings
            if figures
                .dismissal
                .as_ref()
                .is_some_and(|d| d.kind == WicketType::RetiredHurt)
            {
                figures.dismissal = None;
            }
        }
        if let Some(figures) = self.batting.get_mut(&delivery.striker) {
            figures.runs += u32::from(outcome.runs_batter);
            if legal {
                figures.balls += 1;
                if outcome.runs_batter == 0 {
                    figures.dots += 1;
                }
            }
            if outcome.four_off_bat() {
                figures.fours += 1;
            }
            if outcome.six_off_bat() {
                figures.sixes += 1;
            }
        }

        // Bowling
        if !self.bowling.contains_key(&delivery.bowler) {
            self.bowling_order.push(delivery.bowler.clone());
        }
        let bowler = self
            .bowling
            .entry(delivery.bowler.clone())
            .or_insert_with(|| BowlingFigures::new(delivery.bowler.clone()));
        let conceded = outcome.bowler_conceded();
        bowler.runs_conceded += conceded;
        if legal {
            bowler.legal_balls += 1;
            if conceded == 0 {
                bowler.dots += 1;
            }
        }
        match outcome.extra_type {
            ExtraType::Wide => bowler.wides += 1,
            ExtraType::NoBall => bowler.no_balls += 1,
            _ => {}
        }
        if outcome.four_off_bat() {
            bowler.fours += 1;
        }
        if outcome.six_off_bat() {
            bowler.sixes += 1;
        }
        if let Some(dismissal) = &outcome.dismissal {
            if dismissal.kind.credited_to_bowler() {
                bowler.wickets += 1;
            }
        }

        // Extras
        let extras = u32::from(outcome.runs_extras);
        match outcome.extra_type {
            ExtraType::None => {}
            ExtraType::Bye => self.extras.byes += extras,
            ExtraType::LegBye => self.extras.leg_byes += extras,
            ExtraType::Wide => self.extras.wides += extras,
            ExtraType::NoBall => self.extras.no_balls += extras,
            ExtraType::Penalty => self.extras.penalties += extras,
        }

        self.apply_partnership(delivery);
        self.apply_over(delivery, transition);

        // Dismissal and fall of wicket
        if let Some(dismissal) = &outcome.dismissal {
            if let Some(figures) = self.batting.get_mut(&dismissal.player_out) {
                figures.dismissal = Some(DismissalRecord {
                    kind: dismissal.kind,
                    bowler: delivery.bowler.clone(),
                    fielder: dismissal.fielder.clone(),
                    sequence: delivery.sequence,
                });
            }
            if dismissal.kind.counts_as_wicket() {
                self.wickets += 1;
                self.fall_of_wickets.push(FallOfWicket {
                    wicket: self.wickets,
                    score: self.runs,
                    balls: self.balls,
                    player_out: dismissal.player_out.clone(),
                    sequence: delivery.sequence,
                });
            }
        }
    }

    fn apply_partnership(&mut self, delivery: &Delivery) {
        let outcome = &delivery.outcome;
        let needs_new = match self.partnerships.last() {
            Some(current) => {
                !current.is_unbroken() || !current.is_pair(&delivery.striker, &delivery.non_striker)
            }
            None => true,
        };
        if needs_new {
            let number = self.partnerships.len() as u32 + 1;
            self.partnerships.push(Partnership::open(
                number,
                &delivery.striker,
                &delivery.non_striker,
                delivery.sequence,
            ));
        }
        let Some(partnership) = self.partnerships.last_mut() else {
            return;
        };

        partnership.runs += outcome.total_runs();
        partnership.extras += u32::from(outcome.runs_extras);
        let legal = u32::from(outcome.is_legal());
        partnership.balls += legal;
        if partnership.batter_one == delivery.striker {
            partnership.batter_one_runs += u32::from(outcome.runs_batter);
            partnership.batter_one_balls += legal;
        } else {
            partnership.batter_two_runs += u32::from(outcome.runs_batter);
            partnership.batter_two_balls += legal;
        }
        if outcome.four_off_bat() {
            partnership.fours += 1;
        }
        if outcome.six_off_bat() {
            partnership.sixes += 1;
        }

        if let Some(dismissal) = &outcome.dismissal {
            partnership.end = Some(PartnershipEnd {
                sequence: delivery.sequence,
                player_out: dismissal.player_out.clone(),
                kind: dismissal.kind,
                wicket: dismissal.kind.counts_as_wicket().then_some(self.wickets + 1),
            });
        }
    }

    fn apply_over(&mut self, delivery: &Delivery, transition: &Transition) {
        let outcome = &delivery.outcome;
        let needs_new = match self.overs.last() {
            Some(over) => over.completed || over.over_number != delivery.over_number,
            None => true,
        };
        if needs_new {
            self.overs.push(OverSummary::open(delivery.over_number));
        }
        let Some(over) = self.overs.last_mut() else {
            return;
        };

        if !over.bowlers.contains(&delivery.bowler) {
            over.bowlers.push(delivery.bowler.clone());
        }
        over.legal_balls += u32::from(outcome.is_legal());
        over.runs += outcome.total_runs();
        over.bowler_runs += outcome.bowler_conceded();
        over.extras += u32::from(outcome.runs_extras);
        over.wickets += u32::from(outcome.is_wicket());
        over.balls.push(outcome.symbol());

        if transition.over_completed {
            over.completed = true;
            over.maiden = over.bowlers.len() == 1 && over.bowler_runs == 0;
            if over.maiden {
                if let Some(bowler) = self.bowling.get_mut(&delivery.bowler) {
                    bowler.maidens += 1;
                }
            }
        }
    }

    /// Batting card in batting order.
    pub fn batting(&self) -> Vec<BattingFigures> {
        let mut card: Vec<BattingFigures> = self.batting.values().cloned().collect();
        card.sort_by_key(|f| f.position);
        card
    }

    pub fn batter(&self, player: &PlayerId) -> Option<&BattingFigures> {
        self.batting.get(player)
    }

    /// Bowling card in order of first appearance.
    pub fn bowling(&self) -> Vec<BowlingFigures> {
        self.bowling_order
            .iter()
            .filter_map(|p| self.bowling.get(p).cloned())
            .collect()
    }

    pub fn bowler(&self, player: &PlayerId) -> Option<&BowlingFigures> {
        self.bowling.get(player)
    }

    pub fn partnerships(&self) -> &[Partnership] {
        &self.partnerships
    }

    pub fn current_partnership(&self) -> Option<&Partnership> {
        self.partnerships.last()
    }

    pub fn fall_of_wickets(&self) -> &[FallOfWicket] {
        &self.fall_of_wickets
    }

    pub fn extras(&self) -> ExtrasBreakdown {
        self.extras
    }

    pub fn overs(&self) -> &[OverSummary] {
        &self.overs
    }

    /// The most recent `n` ball symbols, oldest first.
    pub fn recent_balls(&self, n: usize) -> Vec<String> {
        let mut recent: Vec<String> = self
            .overs
            .iter()
            .rev()
            .flat_map(|over| over.balls.iter().rev())
            .take(n)
            .cloned()
            .collect();
        recent.reverse();
        recent
    }

    pub fn last_completed_over(&self) -> Option<&OverSummary> {
        self.overs.iter().rev().find(|o| o.completed)
    }

    pub fn total(&self) -> (u32, u32, BallCount) {
        (self.runs, self.wickets, self.balls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cricket_types::delivery::{Dismissal, DeliveryOutcome};
    use cricket_types::ids::{DeliveryId, InningsId};

    struct Feed {
        card: Scorecard,
        sequence: u64,
        balls: u32,
    }

    impl Feed {
        fn new() -> Self {
            Self {
                card: Scorecard::new(),
                sequence: 0,
                balls: 0,
            }
        }

        fn push(&mut self, striker: &str, non_striker: &str, bowler: &str, outcome: DeliveryOutcome) {
            self.sequence += 1;
            let legal = outcome.is_legal();
            let over_number = self.balls / 6 + 1;
            if legal {
                self.balls += 1;
            }
            let delivery = Delivery {
                delivery_id: DeliveryId::new(),
                innings_id: InningsId::new(),
                sequence: self.sequence,
                over_number,
                ball_in_over: 1,
                is_legal_delivery: legal,
                is_free_hit: false,
                striker: PlayerId::new(striker),
                non_striker: PlayerId::new(non_striker),
                bowler: PlayerId::new(bowler),
                outcome,
                wagon: None,
                pitch: None,
                commentary: None,
                timestamp: 0,
                recorded_by: None,
                client_ref: None,
                revision: 0,
            };
            let transition = Transition {
                over_completed: legal && self.balls % 6 == 0,
                ..Transition::default()
            };
            self.card.apply(&delivery, &transition);
        }
    }

    fn runs(n: u8) -> DeliveryOutcome {
        DeliveryOutcome {
            runs_batter: n,
            ..DeliveryOutcome::default()
        }
    }

    fn extras(extra_type: ExtraType, n: u8) -> DeliveryOutcome {
        DeliveryOutcome {
            extra_type,
            runs_extras: n,
            ..DeliveryOutcome::default()
        }
    }

    #[test]
    fn test_maiden_allows_byes() {
        let mut feed = Feed::new();
        for _ in 0..5 {
            feed.push("a", "b", "x", runs(0));
        }
        feed.push("a", "b", "x", extras(ExtraType::LegBye, 1));

        let x = feed.card.bowler(&PlayerId::new("x")).unwrap();
        assert_eq!(x.maidens, 1);
        assert_eq!(x.runs_conceded, 0);
        assert_eq!(feed.card.extras().leg_byes, 1);
    }

    #[test]
    fn test_wide_breaks_maiden() {
        let mut feed = Feed::new();
        feed.push("a", "b", "x", extras(ExtraType::Wide, 1));
        for _ in 0..6 {
            feed.push("a", "b", "x", runs(0));
        }
        let x = feed.card.bowler(&PlayerId::new("x")).unwrap();
        assert_eq!(x.maidens, 0);
        assert_eq!(x.wides, 1);
        assert_eq!(x.legal_balls, 6);
        assert_eq!(x.overs().to_string(), "1.0");
    }

    #[test]
    fn test_wide_not_faced() {
        let mut feed = Feed::new();
        feed.push("a", "b", "x", extras(ExtraType::Wide, 1));
        let a = feed.card.batter(&PlayerId::new("a")).unwrap();
        assert_eq!(a.balls, 0);
        assert_eq!(feed.card.extras().total(), 1);
    }

    #[test]
    fn test_partnership_closes_on_wicket() {
        let mut feed = Feed::new();
        feed.push("a", "b", "x", runs(2));
        feed.push("a", "b", "x", extras(ExtraType::Bye, 1));
        let mut out = runs(0);
        out.dismissal = Some(Dismissal::new(WicketType::Bowled, PlayerId::new("b")));
        feed.push("b", "a", "x", out);
        feed.push("c", "a", "x", runs(1));

        let partnerships = feed.card.partnerships();
        assert_eq!(partnerships.len(), 2);
        assert_eq!(partnerships[0].runs, 3);
        assert_eq!(partnerships[0].balls, 3);
        assert_eq!(partnerships[0].batter_one_runs, 2);
        assert_eq!(partnerships[0].end.as_ref().and_then(|e| e.wicket), Some(1));
        assert!(partnerships[1].is_unbroken());

        let fow = feed.card.fall_of_wickets();
        assert_eq!(fow.len(), 1);
        assert_eq!(fow[0].score, 3);
        assert_eq!(fow[0].balls.to_string(), "0.3");
    }

    #[test]
    fn test_run_out_not_credited_to_bowler() {
        let mut feed = Feed::new();
        let mut out = runs(1);
        out.dismissal = Some(
            Dismissal::new(WicketType::RunOut, PlayerId::new("b")).with_fielder(PlayerId::new("y")),
        );
        feed.push("a", "b", "x", out);

        assert_eq!(feed.card.bowler(&PlayerId::new("x")).unwrap().wickets, 0);
        let b = feed.card.batter(&PlayerId::new("b")).unwrap();
        assert_eq!(b.dismissal_text(&|p| p.to_string()), "run out (y)");
    }

    #[test]
    fn test_dismissal_text() {
        let record = DismissalRecord {
            kind: WicketType::Caught,
            bowler: PlayerId::new("jones"),
            fielder: Some(PlayerId::new("smith")),
            sequence: 1,
        };
        let names = |p: &PlayerId| {
            let s = p.as_str();
            format!("{}{}", s[..1].to_uppercase(), &s[1..])
        };
        assert_eq!(record.describe(&names), "c Smith b Jones");

        let own_catch = DismissalRecord {
            fielder: Some(PlayerId::new("jones")),
            ..record
        };
        assert_eq!(own_catch.describe(&names), "c & b Jones");
    }

    #[test]
    fn test_recent_balls_span_overs() {
        let mut feed = Feed::new();
        for n in [1, 0, 4, 0, 0, 2, 6] {
            let mut outcome = runs(n);
            outcome.is_six = n == 6;
            feed.push("a", "b", "x", outcome);
        }
        assert_eq!(
            feed.card.recent_balls(6),
            vec!["•", "4", "•", "•", "2", "6"]
        );
        assert_eq!(feed.card.overs().len(), 2);
        assert!(feed.card.overs()[0].completed);
    }

    #[test]
    fn test_economy_uses_true_balls() {
        let mut feed = Feed::new();
        for _ in 0..10 {
            feed.push("a", "b", "x", runs(1));
        }
        let x = feed.card.bowler(&PlayerId::new("x")).unwrap();
        assert_eq!(x.overs().to_string(), "1.4");
        assert_eq!(x.economy(), Decimal::from(6));
    }
}
