//! Derived view cache
//!
//! Scorecard tables and analytics are derived from the fold; readers get
//! them from here. Entries are tagged with the innings version they were
//! built at and rebuilt on the first read after the version moves, so a
//! correction can never leave a stale view behind.

use std::sync::Arc;

use cricket_types::ids::InningsId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsView;
use crate::scorecard::{BattingFigures, BowlingFigures, ExtrasBreakdown, FallOfWicket, OverSummary, Partnership};
use crate::session::InningsSession;

/// Every derived table of one innings at one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InningsViews {
    pub version: u64,
    pub batting: Vec<BattingFigures>,
    pub bowling: Vec<BowlingFigures>,
    pub partnerships: Vec<Partnership>,
    pub fall_of_wickets: Vec<FallOfWicket>,
    pub extras: ExtrasBreakdown,
    pub overs: Vec<OverSummary>,
    pub analytics: AnalyticsView,
}

impl InningsViews {
    pub fn build(session: &InningsSession) -> Self {
        let fold = session.fold();
        let card = &fold.scorecard;
        Self {
            version: session.version(),
            batting: card.batting(),
            bowling: card.bowling(),
            partnerships: card.partnerships().to_vec(),
            fall_of_wickets: card.fall_of_wickets().to_vec(),
            extras: card.extras(),
            overs: card.overs().to_vec(),
            analytics: AnalyticsView {
                rates: fold.state.rates(),
                manhattan: fold.analytics.manhattan().to_vec(),
                wagon_wheel: fold.analytics.wagon_wheel(None),
                pitch_map: fold.analytics.pitch_map(None),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct ViewCache {
    entries: DashMap<InningsId, Arc<InningsViews>>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached views for `session`, rebuilt if the cached version is behind.
    /// The flag reports whether the cache answered.
    pub fn get_or_build(&self, session: &InningsSession) -> (Arc<InningsViews>, bool) {
        let innings_id = session.innings_id();
        if let Some(entry) = self.entries.get(&innings_id) {
            if entry.version == session.version() {
                return (Arc::clone(entry.value()), true);
            }
        }
        let views = Arc::new(InningsViews::build(session));
        self.entries.insert(innings_id, Arc::clone(&views));
        (views, false)
    }

    pub fn invalidate(&self, innings_id: &InningsId) {
        self.entries.remove(innings_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
