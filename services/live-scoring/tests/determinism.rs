//! Determinism tests
//!
//! The live, incrementally maintained views must equal a replay of the
//! delivery log from empty, before and after corrections.

mod common;

use common::{engine, player, start_match, Scorer, AWAY, HOME};
use cricket_types::delivery::{DeliveryDraft, DeliveryPatch, Dismissal, WicketType};
use cricket_types::fixture::MatchFormat;
use cricket_types::ids::InningsId;
use live_scoring::engine::ScoringEngine;

/// A busy innings: boundaries, extras of every kind, three wickets.
async fn busy_innings(engine: &ScoringEngine) -> InningsId {
    let match_id = start_match(engine, MatchFormat::T20).await;
    let innings_id = engine.open_innings(match_id, false).await.unwrap().innings_id;
    let mut scorer = Scorer::new(engine, innings_id, HOME, AWAY);

    for over in 0..6usize {
        scorer.bowler = if over % 2 == 0 { 11 } else { 9 };
        scorer.ball(|d| d.four().wagon(80, 40).pitch(50, 30)).await;
        scorer.ball(|d| d.runs(1).wagon(20, 60)).await;
        scorer.ball(|d| d.wide(1)).await;
        scorer.ball(|d| d.leg_byes(1)).await;
        if over % 2 == 1 {
            scorer.caught(2 + over).await;
        } else {
            scorer.ball(|d| d.no_ball(2)).await;
            scorer.ball(|d| d.runs(2)).await;
        }
        scorer.ball(|d| d.six().pitch(55, 10)).await;
        scorer.dots(1).await;
    }
    innings_id
}

#[tokio::test]
async fn test_live_views_equal_replay() {
    let engine = engine();
    let innings_id = busy_innings(&engine).await;

    let snapshot = engine.innings_snapshot(innings_id).await.unwrap();
    assert_eq!(snapshot.wickets, 3);
    assert_eq!(snapshot.balls.completed_overs(), 6);

    let metrics = engine.verify_innings(innings_id).await.unwrap();
    assert_eq!(metrics.deliveries_replayed, engine.deliveries(innings_id).await.unwrap().len() as u64);

    // Cached views are the same fold the direct queries read
    let views = engine.views(innings_id).await.unwrap();
    assert_eq!(views.batting, engine.batting(innings_id).await.unwrap());
    assert_eq!(views.bowling, engine.bowling(innings_id).await.unwrap());
    assert_eq!(views.partnerships, engine.partnerships(innings_id).await.unwrap());
    assert_eq!(views.fall_of_wickets, engine.fall_of_wickets(innings_id).await.unwrap());
    assert_eq!(views.overs, engine.over_summaries(innings_id).await.unwrap());
}

#[tokio::test]
async fn test_replay_matches_after_corrections() {
    let engine = engine();
    let innings_id = busy_innings(&engine).await;
    let before = engine.verify_innings(innings_id).await.unwrap();
    let deliveries = engine.deliveries(innings_id).await.unwrap();

    // Wide becomes a legal dot: every later label shifts
    let wide = deliveries.iter().find(|d| !d.is_legal_delivery).unwrap();
    let patch = DeliveryPatch {
        extra_type: Some(cricket_types::delivery::ExtraType::None),
        runs_extras: Some(0),
        ..DeliveryPatch::default()
    };
    engine.correct(wide.delivery_id, patch, None).await.unwrap();

    let after = engine.verify_innings(innings_id).await.unwrap();
    assert_ne!(before.state_checksum, after.state_checksum);

    let views = engine.views(innings_id).await.unwrap();
    assert_eq!(views.batting, engine.batting(innings_id).await.unwrap());
    assert_eq!(views.overs, engine.over_summaries(innings_id).await.unwrap());

    let corrected = engine.deliveries(innings_id).await.unwrap();
    assert_eq!(corrected.len(), deliveries.len());
    assert!(corrected
        .iter()
        .zip(&deliveries)
        .all(|(now, was)| now.sequence == was.sequence && now.delivery_id == was.delivery_id));
}

#[tokio::test]
async fn test_rejected_correction_leaves_state_untouched() {
    let engine = engine();
    let innings_id = busy_innings(&engine).await;
    let before = engine.innings_snapshot(innings_id).await.unwrap();
    let first = engine.deliveries(innings_id).await.unwrap()[0].clone();

    // Opener out on the first ball, but later balls still name them
    let patch = DeliveryPatch::default()
        .with_runs(0)
        .with_dismissal(Dismissal::new(WicketType::Bowled, player(HOME, 1)));
    assert!(engine.correct(first.delivery_id, patch, None).await.is_err());

    let after = engine.innings_snapshot(innings_id).await.unwrap();
    assert_eq!(after.checksum, before.checksum);
    assert_eq!(after.version, before.version);
    assert_eq!(engine.deliveries(innings_id).await.unwrap()[0], first);
    engine.verify_innings(innings_id).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_innings_are_independent() {
    let engine = std::sync::Arc::new(engine());
    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = std::sync::Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let innings_id = busy_innings(&engine).await;
            engine.innings_snapshot(innings_id).await.unwrap()
        }));
    }

    let mut totals = Vec::new();
    for handle in handles {
        let snapshot = handle.await.unwrap();
        totals.push((snapshot.runs, snapshot.wickets, snapshot.balls));
    }
    assert!(totals.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submits_to_one_innings_are_serialized() {
    let engine = std::sync::Arc::new(engine());
    let match_id = start_match(&engine, MatchFormat::T20).await;
    let innings_id = engine.open_innings(match_id, false).await.unwrap().innings_id;

    // Dots keep the same pair on strike within the over, so every draft is valid
    let mut handles = Vec::new();
    for _ in 0..5 {
        let engine = std::sync::Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let draft = DeliveryDraft::new(player(HOME, 1), player(HOME, 2), player(AWAY, 11));
            engine.submit(innings_id, draft, None).await
        }));
    }

    let mut sequences = Vec::new();
    for handle in handles {
        let receipt = handle.await.unwrap().unwrap();
        assert!(!receipt.duplicate);
        sequences.push(receipt.delivery.sequence);
    }
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=5).collect::<Vec<u64>>());

    let log = engine.deliveries(innings_id).await.unwrap();
    assert_eq!(log.iter().map(|d| d.sequence).collect::<Vec<_>>(), sequences);
    assert_eq!(engine.innings_snapshot(innings_id).await.unwrap().balls.balls(), 5);
    engine.verify_innings(innings_id).await.unwrap();
}
