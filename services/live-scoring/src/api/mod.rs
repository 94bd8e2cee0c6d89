//! HTTP/WebSocket edge
//!
//! Thin axum layer over [`crate::engine::ScoringEngine`]: JSON in, JSON out,
//! rejections mapped to `{"error": code, "message": ...}` bodies.

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
