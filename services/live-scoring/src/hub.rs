//! Live broadcast hub
//!
//! Fans snapshots out to the viewers of each match.
//!
//! - Every publish gets the next per-match sequence number
//! - A new subscriber first receives the latest snapshot; enqueueing it
//!   happens under the channel lock, so no concurrent publish can slip in
//!   between catch-up and live updates
//! - Each subscriber has a bounded queue fed with `try_send`; a full queue
//!   disconnects the subscriber and the writer never waits
//! - Receivers drop any update whose sequence they have already seen

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cricket_types::errors::ScoringError;
use cricket_types::ids::MatchId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, warn};

use crate::config::HubConfig;
use crate::delta::{Highlight, UpdateCause};
use crate::metrics::ServiceMetrics;
use crate::snapshot::StateSnapshot;

/// One message on a match feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveUpdate {
    pub match_id: MatchId,
    /// Per-match publish sequence.
    pub sequence: u64,
    /// Replay of the latest update for a subscriber that just joined.
    pub catch_up: bool,
    pub cause: UpdateCause,
    pub snapshot: StateSnapshot,
    pub highlights: Vec<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("match {match_id} already has {limit} subscribers")]
    TooManySubscribers { match_id: MatchId, limit: usize },
}

/// Tracks the highest sequence a subscriber has accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotCursor {
    last_seen: Option<u64>,
}

impl SnapshotCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `sequence` if it is newer than anything seen so far.
    pub fn accept(&mut self, sequence: u64) -> bool {
        if self.last_seen.is_some_and(|last| sequence <= last) {
            return false;
        }
        self.last_seen = Some(sequence);
        true
    }

    pub fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }
}

/// A viewer's handle on a match feed.
#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    pub match_id: MatchId,
    receiver: mpsc::Receiver<LiveUpdate>,
    cursor: SnapshotCursor,
}

impl Subscription {
    /// Next fresh update. None once the hub has dropped this subscriber
    /// and the queue is drained; the viewer must resubscribe.
    pub async fn recv(&mut self) -> Option<LiveUpdate> {
        loop {
            let update = self.receiver.recv().await?;
            if self.cursor.accept(update.sequence) {
                return Some(update);
            }
        }
    }

    pub fn try_recv(&mut self) -> Result<LiveUpdate, TryRecvError> {
        loop {
            let update = self.receiver.try_recv()?;
            if self.cursor.accept(update.sequence) {
                return Ok(update);
            }
        }
    }

    pub fn cursor(&self) -> SnapshotCursor {
        self.cursor
    }
}

/// Outcome of one publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub sequence: u64,
    pub delivered: usize,
    pub disconnected: usize,
}

#[derive(Debug, Default)]
struct MatchChannel {
    sequence: u64,
    latest: Option<LiveUpdate>,
    subscribers: BTreeMap<u64, mpsc::Sender<LiveUpdate>>,
}

pub struct BroadcastHub {
    config: HubConfig,
    channels: DashMap<MatchId, MatchChannel>,
    next_subscriber: AtomicU64,
    metrics: Arc<ServiceMetrics>,
}

impl BroadcastHub {
    pub fn new(config: HubConfig, metrics: Arc<ServiceMetrics>) -> Self {
        Self {
            config,
            channels: DashMap::new(),
            next_subscriber: AtomicU64::new(1),
            metrics,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn subscribe(&self, match_id: MatchId) -> Result<Subscription, SubscribeError> {
        let mut channel = self.channels.entry(match_id).or_default();
        if channel.subscribers.len() >= self.config.max_subscribers_per_match {
            return Err(SubscribeError::TooManySubscribers {
                match_id,
                limit: self.config.max_subscribers_per_match,
            });
        }

        let (sender, receiver) = mpsc::channel(self.config.subscriber_queue_capacity.max(1));
        if let Some(latest) = &channel.latest {
            let catch_up = LiveUpdate {
                catch_up: true,
                highlights: Vec::new(),
                ..latest.clone()
            };
            // Fresh queue with capacity >= 1, cannot be full
            let _ = sender.try_send(catch_up);
        }

        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        channel.subscribers.insert(id, sender);
        self.metrics.subscriber_connected();
        debug!(match_id = %match_id, subscriber_id = id, "Subscriber joined");

        Ok(Subscription {
            id,
            match_id,
            receiver,
            cursor: SnapshotCursor::new(),
        })
    }

    /// Publish a new snapshot to every subscriber of the match. Never blocks.
    pub fn publish(
        &self,
        match_id: MatchId,
        cause: UpdateCause,
        snapshot: StateSnapshot,
        highlights: Vec<Highlight>,
    ) -> PublishReport {
        let mut channel = self.channels.entry(match_id).or_default();
        channel.sequence += 1;
        let update = LiveUpdate {
            match_id,
            sequence: channel.sequence,
            catch_up: false,
            cause,
            snapshot,
            highlights,
        };

        let mut delivered = 0;
        let mut lagging = Vec::new();
        let mut closed = Vec::new();
        for (id, sender) in &channel.subscribers {
            match sender.try_send(update.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => lagging.push(*id),
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in &lagging {
            channel.subscribers.remove(id);
            self.metrics.record_lag_disconnect();
            warn!(
                match_id = %match_id,
                subscriber_id = *id,
                capacity = self.config.subscriber_queue_capacity,
                "Backpressure: disconnecting lagging subscriber"
            );
        }
        for id in &closed {
            channel.subscribers.remove(id);
            self.metrics.subscriber_gone();
        }

        let report = PublishReport {
            sequence: update.sequence,
            delivered,
            disconnected: lagging.len(),
        };
        channel.latest = Some(update);
        self.metrics.record_publish();
        report
    }

    pub fn unsubscribe(&self, match_id: MatchId, subscriber_id: u64) {
        if let Some(mut channel) = self.channels.get_mut(&match_id) {
            if channel.subscribers.remove(&subscriber_id).is_some() {
                self.metrics.subscriber_gone();
            }
        }
    }

    /// Drop a match's channel. Anyone still subscribed sees their stream end.
    pub fn close(&self, match_id: MatchId) -> usize {
        let Some((_, channel)) = self.channels.remove(&match_id) else {
            return 0;
        };
        for _ in channel.subscribers.values() {
            self.metrics.subscriber_gone();
        }
        debug!(match_id = %match_id, dropped = channel.subscribers.len(), "Channel closed");
        channel.subscribers.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn subscriber_count(&self, match_id: MatchId) -> usize {
        self.channels
            .get(&match_id)
            .map(|c| c.subscribers.len())
            .unwrap_or(0)
    }

    pub fn latest(&self, match_id: MatchId) -> Option<LiveUpdate> {
        self.channels.get(&match_id).and_then(|c| c.latest.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cricket_types::delivery::DeliveryDraft;
    use cricket_types::fixture::MatchStatus;
    use cricket_types::ids::{InningsId, PlayerId, TeamId};
    use cricket_types::innings::{InningsKind, InningsMeta};

    use crate::session::InningsSession;
    use crate::snapshot::SnapshotBuilder;
    use crate::state_machine::Sides;

    fn hub(capacity: usize, max: usize) -> BroadcastHub {
        let config = HubConfig {
            subscriber_queue_capacity: capacity,
            max_subscribers_per_match: max,
            ..HubConfig::default()
        };
        BroadcastHub::new(config, Arc::new(ServiceMetrics::new()))
    }

    fn snapshot(match_id: MatchId, dots: usize) -> StateSnapshot {
        let meta = InningsMeta {
            innings_id: InningsId::new(),
            match_id,
            number: 1,
            kind: InningsKind::Regular,
            batting_team: TeamId::new("bat"),
            bowling_team: TeamId::new("bowl"),
            overs_limit: Some(20),
            max_wickets: 10,
            target: None,
            follow_on: false,
        };
        let sides = Sides {
            batting: [PlayerId::new("a"), PlayerId::new("b")].into_iter().collect(),
            bowling: [PlayerId::new("x")].into_iter().collect(),
        };
        let mut session = InningsSession::new(meta, sides, true, 30);
        for _ in 0..dots {
            session
                .submit(DeliveryDraft::new(PlayerId::new("a"), PlayerId::new("b"), PlayerId::new("x")), None)
                .unwrap();
        }
        SnapshotBuilder::default().build(&session, MatchStatus::Live, None, 0)
    }

    #[test]
    fn test_cursor_discards_stale() {
        let mut cursor = SnapshotCursor::new();
        assert!(cursor.accept(3));
        assert!(!cursor.accept(3));
        assert!(!cursor.accept(2));
        assert!(cursor.accept(4));
        assert_eq!(cursor.last_seen(), Some(4));
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_latest_first() {
        let hub = hub(8, 10);
        let match_id = MatchId::new();
        hub.publish(match_id, UpdateCause::Delivery, snapshot(match_id, 1), Vec::new());
        hub.publish(match_id, UpdateCause::Delivery, snapshot(match_id, 2), Vec::new());

        let mut sub = hub.subscribe(match_id).unwrap();
        let first = sub.recv().await.unwrap();
        assert!(first.catch_up);
        assert_eq!(first.sequence, 2);
        assert_eq!(first.snapshot.balls.balls(), 2);

        hub.publish(match_id, UpdateCause::Delivery, snapshot(match_id, 3), Vec::new());
        let next = sub.recv().await.unwrap();
        assert!(!next.catch_up);
        assert_eq!(next.sequence, 3);
    }

    #[tokio::test]
    async fn test_slow_subscriber_disconnected() {
        let hub = hub(2, 10);
        let match_id = MatchId::new();
        let mut slow = hub.subscribe(match_id).unwrap();
        let mut fast = hub.subscribe(match_id).unwrap();

        for i in 1..=4 {
            let report = hub.publish(match_id, UpdateCause::Delivery, snapshot(match_id, i), Vec::new());
            // Keep the fast subscriber drained
            assert_eq!(fast.try_recv().map(|u| u.sequence), Ok(report.sequence));
        }

        assert_eq!(hub.subscriber_count(match_id), 1);
        // Slow subscriber drains what was queued, then sees the end of the feed
        assert_eq!(slow.recv().await.map(|u| u.sequence), Some(1));
        assert_eq!(slow.recv().await.map(|u| u.sequence), Some(2));
        assert!(slow.recv().await.is_none());
    }

    #[test]
    fn test_subscriber_limit() {
        let hub = hub(4, 1);
        let match_id = MatchId::new();
        let _first = hub.subscribe(match_id).unwrap();
        assert!(matches!(
            hub.subscribe(match_id),
            Err(SubscribeError::TooManySubscribers { limit: 1, .. })
        ));
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let hub = hub(4, 10);
        let match_id = MatchId::new();
        let sub = hub.subscribe(match_id).unwrap();
        drop(sub);
        let report = hub.publish(match_id, UpdateCause::Lifecycle, snapshot(match_id, 0), Vec::new());
        assert_eq!(report.delivered, 0);
        assert_eq!(hub.subscriber_count(match_id), 0);
    }

    #[tokio::test]
    async fn test_close_ends_feed_and_frees_channel() {
        let hub = hub(4, 10);
        let match_id = MatchId::new();
        let mut sub = hub.subscribe(match_id).unwrap();
        hub.publish(match_id, UpdateCause::Lifecycle, snapshot(match_id, 1), Vec::new());
        assert_eq!(hub.channel_count(), 1);

        assert_eq!(hub.close(match_id), 1);
        assert_eq!(hub.channel_count(), 0);
        assert!(hub.latest(match_id).is_none());
        assert_eq!(hub.close(match_id), 0);

        assert_eq!(sub.recv().await.map(|u| u.sequence), Some(1));
        assert!(sub.recv().await.is_none());
    }
}
