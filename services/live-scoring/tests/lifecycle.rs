//! Match lifecycle tests
//!
//! Batting order from the toss, targets, results, follow-on and super overs.

mod common;

use common::{engine, start_match, Scorer, AWAY, HOME};
use cricket_types::delivery::DeliveryPatch;
use cricket_types::fixture::{Margin, MatchFormat, MatchResult, MatchSetup, MatchStatus, Toss, TossDecision};
use cricket_types::ids::{InningsId, MatchId, TeamId};
use cricket_types::innings::{ClosureReason, InningsKind};
use live_scoring::engine::ScoringEngine;

async fn open(engine: &ScoringEngine, match_id: MatchId) -> InningsId {
    engine.open_innings(match_id, false).await.unwrap().innings_id
}

async fn status(engine: &ScoringEngine, match_id: MatchId) -> MatchStatus {
    engine.match_snapshot(match_id).await.unwrap().record.status
}

#[tokio::test]
async fn test_toss_decides_who_bats() {
    let engine = engine();
    let record = engine
        .create_match(MatchSetup {
            format: MatchFormat::T20,
            home: TeamId::new(HOME),
            away: TeamId::new(AWAY),
        })
        .unwrap();

    let err = engine.open_innings(record.match_id, false).await.unwrap_err();
    assert_eq!(err.code(), "ERR_INVALID_MATCH_STATE");

    let toss = Toss {
        won_by: TeamId::new(HOME),
        decision: TossDecision::Bowl,
    };
    engine.record_toss(record.match_id, toss.clone()).await.unwrap();
    let first = engine.open_innings(record.match_id, false).await.unwrap();
    assert_eq!(first.batting_team, TeamId::new(AWAY));
    assert_eq!(first.bowling_team, TeamId::new(HOME));
    assert_eq!(first.overs_limit, Some(20));
    assert_eq!(first.target, None);

    // No second toss, no second innings while the first is open
    assert!(engine.record_toss(record.match_id, toss).await.is_err());
    let err = engine.open_innings(record.match_id, false).await.unwrap_err();
    assert_eq!(err.code(), "ERR_INVALID_MATCH_STATE");
}

#[tokio::test]
async fn test_defended_total_wins_by_runs() {
    let engine = engine();
    let match_id = start_match(&engine, MatchFormat::LimitedOvers { overs: 1 }).await;

    let first = open(&engine, match_id).await;
    let mut home = Scorer::new(&engine, first, HOME, AWAY);
    home.ball(|d| d.six()).await;
    home.dots(4).await;
    let last = home.ball(|d| d).await;
    assert_eq!(last.snapshot.closure.map(|c| c.reason), Some(ClosureReason::OversExhausted));
    assert_eq!(status(&engine, match_id).await, MatchStatus::InningsBreak);

    let second = engine.open_innings(match_id, false).await.unwrap();
    assert_eq!(second.target, Some(7));
    let mut away = Scorer::new(&engine, second.innings_id, AWAY, HOME);
    away.ball(|d| d.runs(1)).await;
    away.dots(5).await;

    let view = engine.match_snapshot(match_id).await.unwrap();
    assert_eq!(view.record.status, MatchStatus::Completed);
    assert_eq!(view.record.result, Some(MatchResult::win(TeamId::new(HOME), Margin::Runs(5))));
    assert_eq!(view.record.innings.len(), 2);
    assert!(view.record.innings.iter().all(|s| s.is_closed()));

    // Decided without a tie: nothing further can be opened
    let err = engine.open_innings(match_id, false).await.unwrap_err();
    assert_eq!(err.code(), "ERR_INVALID_MATCH_STATE");
}

#[tokio::test]
async fn test_tie_goes_to_super_over() {
    let engine = engine();
    let match_id = start_match(&engine, MatchFormat::LimitedOvers { overs: 1 }).await;

    let first = open(&engine, match_id).await;
    let mut home = Scorer::new(&engine, first, HOME, AWAY);
    home.ball(|d| d.four()).await;
    home.dots(5).await;

    let second = open(&engine, match_id).await;
    let mut away = Scorer::new(&engine, second, AWAY, HOME);
    away.ball(|d| d.four()).await;
    away.dots(5).await;

    let view = engine.match_snapshot(match_id).await.unwrap();
    assert_eq!(view.record.status, MatchStatus::Completed);
    assert_eq!(view.record.result, Some(MatchResult::tie()));

    // Side that batted second bats first in the super over
    let super_one = engine.open_innings(match_id, false).await.unwrap();
    assert_eq!(super_one.kind, InningsKind::SuperOver);
    assert_eq!(super_one.batting_team, TeamId::new(AWAY));
    assert_eq!(super_one.overs_limit, Some(1));
    assert_eq!(super_one.match_status, MatchStatus::Live);
    assert_eq!(super_one.result, None);

    let mut away = Scorer::new(&engine, super_one.innings_id, AWAY, HOME);
    away.ball(|d| d.six()).await;
    away.dots(5).await;

    let super_two = engine.open_innings(match_id, false).await.unwrap();
    assert_eq!(super_two.batting_team, TeamId::new(HOME));
    assert_eq!(super_two.target, Some(7));

    // Two wickets end a super over innings
    let mut home = Scorer::new(&engine, super_two.innings_id, HOME, AWAY);
    home.caught(3).await;
    let last = home.caught(4).await;
    assert_eq!(last.snapshot.closure.map(|c| c.reason), Some(ClosureReason::AllOut));
    assert_eq!(last.snapshot.match_status, MatchStatus::Completed);
    assert_eq!(last.snapshot.result, Some(MatchResult::win(TeamId::new(AWAY), Margin::Runs(6))));
}

#[tokio::test]
async fn test_follow_on_and_innings_victory() {
    let engine = engine();
    let match_id = start_match(&engine, MatchFormat::Test).await;

    let first = open(&engine, match_id).await;
    let mut home = Scorer::new(&engine, first, HOME, AWAY);
    for _ in 0..34 {
        home.ball(|d| d.six()).await;
    }
    engine.declare(first).await.unwrap();

    let second = open(&engine, match_id).await;
    let mut away = Scorer::new(&engine, second, AWAY, HOME);
    for fielder in 1..=10 {
        away.caught(fielder).await;
    }
    assert_eq!(
        engine.innings_snapshot(second).await.unwrap().closure.map(|c| c.reason),
        Some(ClosureReason::AllOut)
    );

    let third = engine.open_innings(match_id, true).await.unwrap();
    assert_eq!(third.batting_team, TeamId::new(AWAY));
    assert_eq!(third.target, None);

    let mut away = Scorer::new(&engine, third.innings_id, AWAY, HOME);
    away.ball(|d| d.four()).await;
    for fielder in 1..=10 {
        away.caught(fielder).await;
    }

    let view = engine.match_snapshot(match_id).await.unwrap();
    assert_eq!(view.record.status, MatchStatus::Completed);
    assert_eq!(
        view.record.result,
        Some(MatchResult::win(TeamId::new(HOME), Margin::InningsAndRuns(200)))
    );
}

#[tokio::test]
async fn test_fourth_innings_chase() {
    let engine = engine();
    let match_id = start_match(&engine, MatchFormat::Test).await;

    let first = open(&engine, match_id).await;
    Scorer::new(&engine, first, HOME, AWAY).ball(|d| d.six()).await;
    engine.declare(first).await.unwrap();

    let second = open(&engine, match_id).await;
    Scorer::new(&engine, second, AWAY, HOME).ball(|d| d.four()).await;
    engine.declare(second).await.unwrap();

    // Lead of two is far short of the follow-on margin
    let err = engine.open_innings(match_id, true).await.unwrap_err();
    assert_eq!(err.code(), "ERR_INVALID_MATCH_STATE");

    let third = engine.open_innings(match_id, false).await.unwrap();
    assert_eq!(third.batting_team, TeamId::new(HOME));
    Scorer::new(&engine, third.innings_id, HOME, AWAY).ball(|d| d.four()).await;
    engine.declare(third.innings_id).await.unwrap();

    let fourth = engine.open_innings(match_id, false).await.unwrap();
    assert_eq!(fourth.batting_team, TeamId::new(AWAY));
    assert_eq!(fourth.target, Some(7));

    let mut away = Scorer::new(&engine, fourth.innings_id, AWAY, HOME);
    away.ball(|d| d.six()).await;
    let last = away.ball(|d| d.runs(1)).await;
    assert_eq!(last.snapshot.closure.map(|c| c.reason), Some(ClosureReason::TargetReached));
    assert_eq!(
        last.snapshot.result,
        Some(MatchResult::win(TeamId::new(AWAY), Margin::Wickets(10)))
    );
}

#[tokio::test]
async fn test_forfeit_and_draw() {
    let engine = engine();
    let match_id = start_match(&engine, MatchFormat::Test).await;

    let first = open(&engine, match_id).await;
    let forfeited = engine.forfeit(first).await.unwrap();
    assert_eq!(forfeited.closure.map(|c| (c.reason, c.runs)), Some((ClosureReason::Forfeited, 0)));
    assert_eq!(status(&engine, match_id).await, MatchStatus::InningsBreak);

    let second = open(&engine, match_id).await;
    let mut away = Scorer::new(&engine, second, AWAY, HOME);
    away.ball(|d| d.runs(2)).await;
    let err = engine.forfeit(second).await.unwrap_err();
    assert_eq!(err.code(), "ERR_INVALID_MATCH_STATE");

    let view = engine.conclude_draw(match_id).await.unwrap();
    assert_eq!(view.record.result, Some(MatchResult::draw()));
    assert_eq!(view.record.status, MatchStatus::Completed);
    assert!(engine.conclude_draw(match_id).await.is_err());
}

#[tokio::test]
async fn test_release_completed_match() {
    let engine = engine();
    let match_id = start_match(&engine, MatchFormat::LimitedOvers { overs: 1 }).await;

    let first = open(&engine, match_id).await;
    let mut home = Scorer::new(&engine, first, HOME, AWAY);
    home.ball(|d| d.four()).await;
    home.dots(5).await;

    // Still being played
    let err = engine.release_match(match_id).await.unwrap_err();
    assert_eq!(err.code(), "ERR_INVALID_MATCH_STATE");

    let second = open(&engine, match_id).await;
    let mut away = Scorer::new(&engine, second, AWAY, HOME);
    away.dots(6).await;
    assert_eq!(status(&engine, match_id).await, MatchStatus::Completed);
    let first_ball = engine.deliveries(first).await.unwrap()[0].delivery_id;

    // Not while someone is watching
    let viewer = engine.subscribe(match_id).unwrap();
    let err = engine.release_match(match_id).await.unwrap_err();
    assert_eq!(err.code(), "ERR_INVALID_MATCH_STATE");
    engine.hub().unsubscribe(match_id, viewer.id);
    drop(viewer);

    let record = engine.release_match(match_id).await.unwrap();
    assert_eq!(record.result, Some(MatchResult::win(TeamId::new(HOME), Margin::Runs(4))));
    assert_eq!(engine.hub().channel_count(), 0);
    assert!(engine.match_snapshot(match_id).await.unwrap_err().is_not_found());
    assert!(engine.innings_snapshot(first).await.unwrap_err().is_not_found());
    assert!(engine.innings_snapshot(second).await.unwrap_err().is_not_found());
    let err = engine
        .correct(first_ball, DeliveryPatch::default().with_runs(1), None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
