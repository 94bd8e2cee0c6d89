//! Live Scoring Service
//!
//! Turns a stream of ball-by-ball deliveries into live cricket scoring:
//! - Per-innings delivery log with idempotent submission
//! - Over/innings state machine (legality, strike, free hit, closure)
//! - Scorecards, partnerships, fall of wickets and over summaries
//! - Manhattan/worm, wagon wheel and pitch map analytics
//! - Corrections with checkpointed refolds
//! - Versioned snapshots pushed to viewers with highlights
//!
//! Every derived view is a pure fold over the delivery log, so replaying the
//! log from empty reproduces the live state exactly (see [`replay`]).
//!
//! # Architecture
//!
//! ```text
//!   Scorer (HTTP)
//!        │
//!   ┌────▼─────┐
//!   │ Engine   │  ← per-innings lock, match lifecycle
//!   └────┬─────┘
//!        │
//!   ┌────▼─────┐      ┌────────────┐
//!   │ Session  │─────►│ Correction │  checkpoint refold
//!   └────┬─────┘      └────────────┘
//!        │
//!   ┌────▼──────────────────────────┐
//!   │ Fold: state │ card │ analytics │
//!   └────┬──────────────────────────┘
//!        │
//!   ┌────▼─────┐  ┌───────────┐
//!   │ Snapshot │─►│ Highlights│
//!   └────┬─────┘  └───────────┘
//!        │
//!   ┌────▼──────────────┐
//!   │ Broadcast hub (WS)│
//!   └───────────────────┘
//! ```

pub mod analytics;
pub mod api;
pub mod cache;
pub mod config;
pub mod correction;
pub mod delta;
pub mod engine;
pub mod fold;
pub mod hub;
pub mod lifecycle;
pub mod log;
pub mod metrics;
pub mod replay;
pub mod roster;
pub mod scorecard;
pub mod session;
pub mod snapshot;
pub mod state_machine;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
