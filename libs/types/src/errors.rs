//! Error types for the scoring engine
//!
//! Every rejection carries a stable reason code (see [`ScoringError::code`])
//! so callers can branch on the failure without parsing messages.

use thiserror::Error;

/// Scoring rejection taxonomy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("Innings {innings_id} is closed")]
    InningsClosed { innings_id: String },

    #[error("Invalid players: {reason}")]
    InvalidPlayers { reason: String },

    #[error("Over {over} cannot have legal ball {ball}")]
    OverOverrun { over: u32, ball: u32 },

    #[error("Player {player} is already dismissed")]
    DuplicateDismissal { player: String },

    #[error("Incoming batter required to partner {survivor}")]
    IncomingBatterRequired { survivor: String },

    #[error("Invalid delivery: {reason}")]
    InvalidDelivery { reason: String },

    #[error("Correction invalidates innings closure: {reason}")]
    CorrectionInvalidatesClosure { reason: String },

    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: String },

    #[error("Innings not found: {innings_id}")]
    InningsNotFound { innings_id: String },

    #[error("Delivery not found: {delivery_id}")]
    DeliveryNotFound { delivery_id: String },

    #[error("Invalid match state: {reason}")]
    InvalidMatchState { reason: String },
}

impl ScoringError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            ScoringError::InningsClosed { .. } => "ERR_INNINGS_CLOSED",
            ScoringError::InvalidPlayers { .. } => "ERR_INVALID_PLAYERS",
            ScoringError::OverOverrun { .. } => "ERR_OVER_OVERRUN",
            ScoringError::DuplicateDismissal { .. } => "ERR_DUPLICATE_DISMISSAL",
            ScoringError::IncomingBatterRequired { .. } => "ERR_INCOMING_BATTER_REQUIRED",
            ScoringError::InvalidDelivery { .. } => "ERR_INVALID_DELIVERY",
            ScoringError::CorrectionInvalidatesClosure { .. } => {
                "ERR_CORRECTION_INVALIDATES_CLOSURE"
            }
            ScoringError::MatchNotFound { .. }
            | ScoringError::InningsNotFound { .. }
            | ScoringError::DeliveryNotFound { .. } => "ERR_NOT_FOUND",
            ScoringError::InvalidMatchState { .. } => "ERR_INVALID_MATCH_STATE",
        }
    }

    /// Whether the error means the addressed entity does not exist.
    pub fn is_not_found(&self) -> bool {
        self.code() == "ERR_NOT_FOUND"
    }

    pub fn invalid_delivery(reason: impl Into<String>) -> Self {
        ScoringError::InvalidDelivery { reason: reason.into() }
    }

    pub fn invalid_players(reason: impl Into<String>) -> Self {
        ScoringError::InvalidPlayers { reason: reason.into() }
    }

    pub fn invalid_match_state(reason: impl Into<String>) -> Self {
        ScoringError::InvalidMatchState { reason: reason.into() }
    }
}
