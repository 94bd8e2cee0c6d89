//! Team membership
//!
//! Player and team identity live outside the engine. The engine only asks
//! which players make up a side's playing XI and how to print a name.

use cricket_types::ids::{PlayerId, TeamId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: PlayerId::new(id),
            name: name.into(),
        }
    }
}

/// Source of team sheets.
pub trait RosterProvider: Send + Sync {
    /// Playing XI for a team, None if the team is unknown.
    fn playing_xi(&self, team: &TeamId) -> Option<Vec<Player>>;

    fn display_name(&self, player: &PlayerId) -> Option<String>;
}

/// Roster held in memory, filled through `PUT /teams/{id}/squad` or tests.
#[derive(Debug, Default)]
pub struct InMemoryRoster {
    squads: DashMap<TeamId, Vec<Player>>,
    names: DashMap<PlayerId, String>,
}

impl InMemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a team's playing XI.
    pub fn register(&self, team: TeamId, players: Vec<Player>) {
        for player in &players {
            self.names.insert(player.id.clone(), player.name.clone());
        }
        self.squads.insert(team, players);
    }
}

impl RosterProvider for InMemoryRoster {
    fn playing_xi(&self, team: &TeamId) -> Option<Vec<Player>> {
        self.squads.get(team).map(|squad| squad.value().clone())
    }

    fn display_name(&self, player: &PlayerId) -> Option<String> {
        self.names.get(player).map(|name| name.value().clone())
    }
}
