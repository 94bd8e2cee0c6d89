//! Delivery log
//!
//! Append-only, per-innings ordered sequence of committed deliveries; the
//! source of truth every view is folded from.
//!
//! Invariants:
//! - Sequence numbers start at 1, strictly increase, and are never reused
//! - Amendments replace a delivery in place, keeping sequence and position
//! - A client reference maps to at most one committed delivery

use std::collections::BTreeMap;

use cricket_types::delivery::Delivery;
use cricket_types::ids::{DeliveryId, InningsId};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("non-monotonic sequence: expected {expected}, received {received}")]
    NonMonotonic { expected: u64, received: u64 },

    #[error("delivery {0} belongs to another innings")]
    ForeignDelivery(DeliveryId),

    #[error("amendment would move delivery {delivery_id} from sequence {expected} to {received}")]
    SequenceChanged {
        delivery_id: DeliveryId,
        expected: u64,
        received: u64,
    },
}

#[derive(Debug, Clone)]
pub struct DeliveryLog {
    innings_id: InningsId,
    deliveries: Vec<Delivery>,
    by_id: BTreeMap<DeliveryId, usize>,
    by_client_ref: BTreeMap<String, usize>,
    next_sequence: u64,
}

impl DeliveryLog {
    pub fn new(innings_id: InningsId) -> Self {
        Self {
            innings_id,
            deliveries: Vec::new(),
            by_id: BTreeMap::new(),
            by_client_ref: BTreeMap::new(),
            next_sequence: 1,
        }
    }

    pub fn innings_id(&self) -> InningsId {
        self.innings_id
    }

    /// Sequence the next appended delivery must carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.deliveries.last().map(|d| d.sequence)
    }

    pub fn append(&mut self, delivery: Delivery) -> Result<(), LogError> {
        if delivery.innings_id != self.innings_id {
            return Err(LogError::ForeignDelivery(delivery.delivery_id));
        }
        if delivery.sequence != self.next_sequence {
            return Err(LogError::NonMonotonic {
                expected: self.next_sequence,
                received: delivery.sequence,
            });
        }

        let index = self.deliveries.len();
        self.by_id.insert(delivery.delivery_id, index);
        if let Some(key) = &delivery.client_ref {
            self.by_client_ref.insert(key.clone(), index);
        }
        debug!(
            innings_id = %self.innings_id,
            sequence = delivery.sequence,
            "Delivery appended"
        );
        self.next_sequence += 1;
        self.deliveries.push(delivery);
        Ok(())
    }

    /// Replace the delivery at `index`, which must keep its identity and sequence.
    pub fn amend(&mut self, index: usize, delivery: Delivery) -> Result<(), LogError> {
        let Some(existing) = self.deliveries.get(index) else {
            return Err(LogError::ForeignDelivery(delivery.delivery_id));
        };
        if existing.delivery_id != delivery.delivery_id || existing.sequence != delivery.sequence {
            return Err(LogError::SequenceChanged {
                delivery_id: delivery.delivery_id,
                expected: existing.sequence,
                received: delivery.sequence,
            });
        }
        self.deliveries[index] = delivery;
        Ok(())
    }

    pub fn position(&self, delivery_id: &DeliveryId) -> Option<usize> {
        self.by_id.get(delivery_id).copied()
    }

    pub fn get(&self, index: usize) -> Option<&Delivery> {
        self.deliveries.get(index)
    }

    pub fn find(&self, delivery_id: &DeliveryId) -> Option<&Delivery> {
        self.position(delivery_id).and_then(|i| self.deliveries.get(i))
    }

    pub fn find_by_client_ref(&self, key: &str) -> Option<&Delivery> {
        self.by_client_ref
            .get(key)
            .and_then(|i| self.deliveries.get(*i))
    }

    /// Deliveries from `index` to the end.
    pub fn suffix(&self, index: usize) -> &[Delivery] {
        self.deliveries.get(index..).unwrap_or(&[])
    }

    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }
}
