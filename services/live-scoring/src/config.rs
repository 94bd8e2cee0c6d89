//! Service configuration
//!
//! Each component owns a plain config struct with defaults; [`ServiceConfig`]
//! composes them and can be overridden from `LIVE_SCORING_*` environment
//! variables. Unset or unparsable variables fall back to the default.

use std::str::FromStr;

/// Scoring engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Keep a fold checkpoint every N deliveries for correction refolds.
    pub checkpoint_interval: usize,
    /// Restrict dismissals on free-hit deliveries.
    pub enforce_free_hit: bool,
    /// Largest playing side accepted from the roster.
    pub max_team_size: usize,
    /// Ball symbols kept in the live snapshot.
    pub recent_balls: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 30,
            enforce_free_hit: true,
            max_team_size: 11,
            recent_balls: 6,
        }
    }
}

/// Broadcast hub settings.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Bounded queue per subscriber; a full queue disconnects the subscriber.
    pub subscriber_queue_capacity: usize,
    pub max_subscribers_per_match: usize,
    pub heartbeat_interval_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_queue_capacity: 64,
            max_subscribers_per_match: 1000,
            heartbeat_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub engine: EngineConfig,
    pub hub: HubConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            engine: EngineConfig::default(),
            hub: HubConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ServiceConfig::default();
        let get = |key: &str, default: String| lookup(key).unwrap_or(default);
        let parse = |key: &str| lookup(key).map(|v| v.trim().to_string());

        Self {
            bind_addr: get("LIVE_SCORING_BIND_ADDR", defaults.bind_addr),
            engine: EngineConfig {
                checkpoint_interval: parsed(
                    parse("LIVE_SCORING_CHECKPOINT_INTERVAL"),
                    defaults.engine.checkpoint_interval,
                )
                .max(1),
                enforce_free_hit: parsed(
                    parse("LIVE_SCORING_ENFORCE_FREE_HIT"),
                    defaults.engine.enforce_free_hit,
                ),
                max_team_size: parsed(
                    parse("LIVE_SCORING_MAX_TEAM_SIZE"),
                    defaults.engine.max_team_size,
                )
                .max(2),
                recent_balls: parsed(parse("LIVE_SCORING_RECENT_BALLS"), defaults.engine.recent_balls),
            },
            hub: HubConfig {
                subscriber_queue_capacity: parsed(
                    parse("LIVE_SCORING_SUBSCRIBER_QUEUE"),
                    defaults.hub.subscriber_queue_capacity,
                )
                .max(1),
                max_subscribers_per_match: parsed(
                    parse("LIVE_SCORING_MAX_SUBSCRIBERS_PER_MATCH"),
                    defaults.hub.max_subscribers_per_match,
                ),
                heartbeat_interval_secs: parsed(
                    parse("LIVE_SCORING_HEARTBEAT_INTERVAL_SECS"),
                    defaults.hub.heartbeat_interval_secs,
                ),
            },
        }
    }
}

fn parsed<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}
