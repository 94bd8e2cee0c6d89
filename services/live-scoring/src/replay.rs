//! Replay engine
//!
//! Rebuilds innings state by folding a delivery sequence, either from an
//! empty fold or from a checkpoint. Used to audit the live state and by the
//! correction handler to refold the suffix after an amendment.
//!
//! - Strict sequence ordering (no gaps, no repeats)
//! - Deterministic: same deliveries in the same order give the same checksum
//! - Optional post-replay checksum validation, after any explicit closure

use std::time::Instant;

use cricket_types::delivery::Delivery;
use cricket_types::errors::ScoringError;
use cricket_types::innings::ClosureReason;
use tracing::{error, info};

use crate::fold::InningsFold;
use crate::state_machine::EndsCheck;

/// Metrics collected during replay.
#[derive(Debug, Clone)]
pub struct ReplayMetrics {
    pub deliveries_replayed: u64,
    pub duration_ms: u128,
    pub state_checksum: String,
}

/// Result of a replay.
#[derive(Debug)]
pub struct ReplayResult {
    pub fold: InningsFold,
    /// Replayed deliveries with their recomputed placement.
    pub deliveries: Vec<Delivery>,
    /// Fold snapshots keyed by number of deliveries applied.
    pub checkpoints: Vec<(usize, InningsFold)>,
    pub metrics: ReplayMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("log corruption detected at sequence {sequence}: {reason}")]
    LogCorruption { sequence: u64, reason: String },

    #[error("state checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("sequence gap detected: expected {expected}, got {actual}")]
    SequenceGap { expected: u64, actual: u64 },

    #[error("state could not be hashed: {reason}")]
    Unhashable { reason: String },

    #[error("innings not found: {innings_id}")]
    InningsNotFound { innings_id: String },

    #[error("delivery {sequence} rejected on replay: {source}")]
    Rejected {
        sequence: u64,
        #[source]
        source: ScoringError,
    },
}

impl ReplayError {
    pub fn unhashable(err: serde_json::Error) -> Self {
        ReplayError::Unhashable {
            reason: err.to_string(),
        }
    }
}

/// Replays deliveries through an [`InningsFold`].
pub struct ReplayEngine {
    expected_checksum: Option<String>,
    closing: Option<ClosureReason>,
    ends: EndsCheck,
    checkpoint_interval: Option<usize>,
}

impl ReplayEngine {
    pub fn new() -> Self {
        Self {
            expected_checksum: None,
            closing: None,
            ends: EndsCheck::Strict,
            checkpoint_interval: None,
        }
    }

    /// Set the expected state checksum for post-replay validation.
    pub fn with_expected_checksum(mut self, checksum: String) -> Self {
        self.expected_checksum = Some(checksum);
        self
    }

    /// Close the innings after the last delivery. Declarations and forfeits
    /// are not in the log, so a replay must be told about them.
    pub fn with_closure(mut self, reason: ClosureReason) -> Self {
        self.closing = Some(reason);
        self
    }

    /// Follow the recorded striker/non-striker labels instead of the
    /// computed ends. Used when earlier deliveries were amended.
    pub fn with_lenient_ends(mut self) -> Self {
        self.ends = EndsCheck::Lenient;
        self
    }

    /// Emit a fold snapshot every `interval` deliveries.
    pub fn with_checkpoints(mut self, interval: usize) -> Self {
        self.checkpoint_interval = Some(interval.max(1));
        self
    }

    /// Fold `deliveries` on top of `seed`.
    pub fn replay_from(
        &self,
        seed: InningsFold,
        deliveries: &[Delivery],
    ) -> Result<ReplayResult, ReplayError> {
        let start = Instant::now();
        let mut fold = seed;
        let mut replayed = Vec::with_capacity(deliveries.len());
        let mut checkpoints = Vec::new();
        let mut last_sequence = fold.state.last_sequence;

        info!(
            delivery_count = deliveries.len(),
            from = fold.len(),
            "Starting delivery replay"
        );

        for original in deliveries {
            let expected = last_sequence.map_or(1, |s| s + 1);
            if original.sequence < expected {
                return Err(ReplayError::LogCorruption {
                    sequence: original.sequence,
                    reason: format!(
                        "Non-monotonic sequence: {} after {:?}",
                        original.sequence, last_sequence
                    ),
                });
            }
            if original.sequence > expected {
                return Err(ReplayError::SequenceGap {
                    expected,
                    actual: original.sequence,
                });
            }

            let mut delivery = original.clone();
            fold.replay(&mut delivery, self.ends)
                .map_err(|source| ReplayError::Rejected {
                    sequence: delivery.sequence,
                    source,
                })?;

            last_sequence = Some(delivery.sequence);
            replayed.push(delivery);

            if let Some(interval) = self.checkpoint_interval {
                if fold.len() % interval == 0 {
                    checkpoints.push((fold.len(), fold.clone()));
                }
            }
        }

        if let Some(reason) = self.closing {
            if fold.state.closure.is_none() {
                fold.state.close(reason);
            }
        }

        let state_checksum = fold.checksum().map_err(ReplayError::unhashable)?;

        if let Some(ref expected) = self.expected_checksum {
            if &state_checksum != expected {
                error!(
                    expected = %expected,
                    actual = %state_checksum,
                    "State checksum mismatch after replay"
                );
                return Err(ReplayError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual: state_checksum,
                });
            }
        }

        let metrics = ReplayMetrics {
            deliveries_replayed: replayed.len() as u64,
            duration_ms: start.elapsed().as_millis(),
            state_checksum,
        };

        info!(
            deliveries_replayed = metrics.deliveries_replayed,
            duration_ms = metrics.duration_ms,
            "Replay completed successfully"
        );

        Ok(ReplayResult {
            fold,
            deliveries: replayed,
            checkpoints,
            metrics,
        })
    }
}

impl Default for ReplayEngine {
    fn default() -> Self {
        Self::new()
    }
}
