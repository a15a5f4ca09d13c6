//! Read-only roster collaborator.
//!
//! Team and player administration lives outside this service; the engine only
//! needs to answer "may this player appear for this team". The bundled
//! implementation is fed from the application config file.

use std::collections::{HashMap, HashSet};

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::storage::StorageResult;

/// Read-only list of eligible players per team.
pub trait RosterProvider: Send + Sync {
    /// Player ids allowed to appear for `team_id`, or `None` when the team is
    /// unknown to the provider.
    fn eligible_players(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<HashSet<Uuid>>>>;
}

/// Roster provider backed by a static team → players map.
#[derive(Debug, Default, Clone)]
pub struct StaticRoster {
    teams: HashMap<Uuid, HashSet<Uuid>>,
}

impl StaticRoster {
    /// Build a provider from a team → players map.
    pub fn new(teams: HashMap<Uuid, HashSet<Uuid>>) -> Self {
        Self { teams }
    }
}

impl RosterProvider for StaticRoster {
    fn eligible_players(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<HashSet<Uuid>>>> {
        let roster = self.teams.get(&team_id).cloned();
        Box::pin(async move { Ok(roster) })
    }
}
