//! Shared fixtures for the integration tests
//!
//! `Scorer` plays deliveries through the engine while tracking who is at the
//! crease, so tests can describe an innings ball by ball without repeating
//! player bookkeeping.

#![allow(dead_code)]

use std::sync::Arc;

use cricket_types::delivery::{DeliveryDraft, Dismissal, WicketType};
use cricket_types::errors::ScoringError;
use cricket_types::fixture::{MatchFormat, MatchSetup, Toss, TossDecision};
use cricket_types::ids::{InningsId, MatchId, PlayerId, TeamId};
use live_scoring::config::{EngineConfig, HubConfig};
use live_scoring::engine::{ScoringEngine, SubmitReceipt};
use live_scoring::roster::{InMemoryRoster, Player};

pub const HOME: &str = "home";
pub const AWAY: &str = "away";

pub fn player(team: &str, number: usize) -> PlayerId {
    PlayerId::new(format!("{team}-{number}"))
}

pub fn engine_with(squad: usize, config: EngineConfig, hub: HubConfig) -> ScoringEngine {
    let roster = InMemoryRoster::new();
    for team in [HOME, AWAY] {
        let players = (1..=squad)
            .map(|i| Player::new(format!("{team}-{i}"), format!("{team} player {i}")))
            .collect();
        roster.register(TeamId::new(team), players);
    }
    ScoringEngine::new(config, hub, Arc::new(roster))
}

pub fn engine() -> ScoringEngine {
    engine_with(11, EngineConfig::default(), HubConfig::default())
}

/// Create a match, home bats first.
pub async fn start_match(engine: &ScoringEngine, format: MatchFormat) -> MatchId {
    let record = engine
        .create_match(MatchSetup {
            format,
            home: TeamId::new(HOME),
            away: TeamId::new(AWAY),
        })
        .unwrap();
    engine
        .record_toss(
            record.match_id,
            Toss {
                won_by: TeamId::new(HOME),
                decision: TossDecision::Bat,
            },
        )
        .await
        .unwrap();
    record.match_id
}

/// Drives one innings, keeping striker and non-striker in step with the engine.
pub struct Scorer<'a> {
    engine: &'a ScoringEngine,
    pub innings_id: InningsId,
    batting: String,
    bowling: String,
    pub striker: PlayerId,
    pub non_striker: PlayerId,
    next_in: usize,
    pub bowler: usize,
}

impl<'a> Scorer<'a> {
    pub fn new(engine: &'a ScoringEngine, innings_id: InningsId, batting: &str, bowling: &str) -> Self {
        Self {
            engine,
            innings_id,
            batting: batting.to_string(),
            bowling: bowling.to_string(),
            striker: player(batting, 1),
            non_striker: player(batting, 2),
            next_in: 3,
            bowler: 11,
        }
    }

    pub fn draft(&self) -> DeliveryDraft {
        DeliveryDraft::new(
            self.striker.clone(),
            self.non_striker.clone(),
            player(&self.bowling, self.bowler),
        )
    }

    pub fn fielder(&self, number: usize) -> PlayerId {
        player(&self.bowling, number)
    }

    pub fn incoming(&self) -> PlayerId {
        player(&self.batting, self.next_in)
    }

    /// Submit a draft built from the current pair and follow the crease.
    pub async fn ball(&mut self, build: impl FnOnce(DeliveryDraft) -> DeliveryDraft) -> SubmitReceipt {
        self.try_ball(build).await.unwrap()
    }

    pub async fn try_ball(
        &mut self,
        build: impl FnOnce(DeliveryDraft) -> DeliveryDraft,
    ) -> Result<SubmitReceipt, ScoringError> {
        let receipt = self.engine.submit(self.innings_id, build(self.draft()), None).await?;
        self.follow(&receipt);
        Ok(receipt)
    }

    pub async fn dots(&mut self, count: usize) {
        for _ in 0..count {
            self.ball(|d| d).await;
        }
    }

    /// Striker out caught by the given fielder.
    pub async fn caught(&mut self, fielder: usize) -> SubmitReceipt {
        let dismissal = Dismissal::new(WicketType::Caught, self.striker.clone()).with_fielder(self.fielder(fielder));
        self.ball(|d| d.dismissal(dismissal)).await
    }

    fn follow(&mut self, receipt: &SubmitReceipt) {
        let snapshot = &receipt.snapshot;
        let at_crease = |figures: &Option<live_scoring::scorecard::BattingFigures>| {
            figures.as_ref().map(|f| f.player.clone())
        };
        match (at_crease(&snapshot.striker), at_crease(&snapshot.non_striker)) {
            (Some(s), Some(n)) => {
                self.striker = s;
                self.non_striker = n;
            }
            (None, Some(n)) => {
                self.striker = self.incoming();
                self.non_striker = n;
                self.next_in += 1;
            }
            (Some(s), None) => {
                self.striker = s;
                self.non_striker = self.incoming();
                self.next_in += 1;
            }
            (None, None) => {}
        }
    }
}
