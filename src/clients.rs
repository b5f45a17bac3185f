//! Participant tracking and message fan-out
//!
//! Every connection to a session is a client: the host, a registered
//! player, or an unassigned connection that has not picked a name yet.
//! This module tracks which is which and provides the broadcast helpers
//! the session uses to publish each state change to all subscribers.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    str::FromStr,
};

use enum_map::{Enum, EnumMap};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    channel::Channel,
    constants,
    game::{SyncMessage, UpdateMessage},
};

/// A unique identifier for one participant in a session
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random participant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses a participant ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// The role a client currently holds in the session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Connected but not yet registered as a player
    Unassigned,
    /// The host driving the session
    Host,
    /// A registered player
    Player {
        /// The player's validated display name
        name: String,
    },
}

/// [`Role`] without its associated data, for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum RoleKind {
    /// An unassigned connection
    Unassigned,
    /// The session host
    Host,
    /// A registered player
    Player,
}

impl Role {
    /// The kind of this role, without its data
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Unassigned => RoleKind::Unassigned,
            Role::Host => RoleKind::Host,
            Role::Player { .. } => RoleKind::Player,
        }
    }
}

/// Errors raised when adding clients to a session
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The session has reached its participant limit
    #[error("maximum number of participants reached")]
    MaximumParticipants,
}

/// Serialization helper for [`Clients`]
#[derive(Deserialize)]
struct ClientsSerde {
    mapping: HashMap<Id, Role>,
}

/// All clients of one session, indexed by role
///
/// The role-indexed reverse mapping is rebuilt from the primary mapping
/// on deserialization rather than stored.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(from = "ClientsSerde")]
pub struct Clients {
    /// Primary mapping from client ID to role
    mapping: HashMap<Id, Role>,

    /// Role-indexed reverse mapping for broadcast filtering (not serialized)
    #[serde(skip_serializing)]
    reverse_mapping: EnumMap<RoleKind, HashSet<Id>>,
}

impl From<ClientsSerde> for Clients {
    fn from(serde: ClientsSerde) -> Self {
        let ClientsSerde { mapping } = serde;
        let mut reverse_mapping: EnumMap<RoleKind, HashSet<Id>> = EnumMap::default();
        for (id, role) in &mapping {
            reverse_mapping[role.kind()].insert(*id);
        }
        Self {
            mapping,
            reverse_mapping,
        }
    }
}

impl Clients {
    /// Creates the client set for a new session with its host registered
    pub fn with_host_id(host_id: Id) -> Self {
        let mut clients = Self::default();
        clients.mapping.insert(host_id, Role::Host);
        clients.reverse_mapping[RoleKind::Host].insert(host_id);
        clients
    }

    /// Adds a client with the given role
    ///
    /// # Errors
    ///
    /// Returns [`Error::MaximumParticipants`] when the session is full.
    pub fn add_client(&mut self, client_id: Id, role: Role) -> Result<(), Error> {
        if self.mapping.len() >= constants::session::MAX_PLAYER_COUNT {
            return Err(Error::MaximumParticipants);
        }

        let kind = role.kind();
        self.mapping.insert(client_id, role);
        self.reverse_mapping[kind].insert(client_id);

        Ok(())
    }

    /// Changes an existing client's role, keeping the reverse index consistent
    pub fn update_role(&mut self, client_id: Id, role: Role) {
        let Some(old_kind) = self.mapping.get(&client_id).map(Role::kind) else {
            return;
        };
        let new_kind = role.kind();
        if old_kind != new_kind {
            self.reverse_mapping[old_kind].remove(&client_id);
            self.reverse_mapping[new_kind].insert(client_id);
        }
        self.mapping.insert(client_id, role);
    }

    /// The role held by `client_id`, if connected to this session
    pub fn get_role(&self, client_id: Id) -> Option<Role> {
        self.mapping.get(&client_id).map(std::borrow::ToOwned::to_owned)
    }

    /// The display name of `client_id`, if they are a player
    pub fn get_name(&self, client_id: Id) -> Option<String> {
        match self.mapping.get(&client_id) {
            Some(Role::Player { name }) => Some(name.to_owned()),
            _ => None,
        }
    }

    /// Number of clients of one kind
    pub fn count(&self, filter: RoleKind) -> usize {
        self.reverse_mapping[filter].len()
    }

    /// All clients with live channels, with their roles
    pub fn vec<C: Channel, F: Fn(Id) -> Option<C>>(&self, channel_finder: F) -> Vec<(Id, C, Role)> {
        self.reverse_mapping
            .values()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| match (channel_finder(*id), self.mapping.get(id)) {
                (Some(channel), Some(role)) => Some((*id, channel, role.to_owned())),
                _ => None,
            })
            .collect_vec()
    }

    /// Clients of one kind with live channels, with their roles
    pub fn specific_vec<C: Channel, F: Fn(Id) -> Option<C>>(
        &self,
        filter: RoleKind,
        channel_finder: F,
    ) -> Vec<(Id, C, Role)> {
        self.reverse_mapping[filter]
            .iter()
            .filter_map(|id| match (channel_finder(*id), self.mapping.get(id)) {
                (Some(channel), Some(role)) => Some((*id, channel, role.to_owned())),
                _ => None,
            })
            .collect_vec()
    }

    /// Sends an update to a single client, if reachable
    pub fn send_update<C: Channel, F: Fn(Id) -> Option<C>>(
        &self,
        message: &UpdateMessage,
        client_id: Id,
        channel_finder: F,
    ) {
        let Some(channel) = channel_finder(client_id) else {
            return;
        };

        channel.send_update(message);
    }

    /// Sends a full state view to a single client, if reachable
    pub fn send_sync<C: Channel, F: Fn(Id) -> Option<C>>(
        &self,
        message: &SyncMessage,
        client_id: Id,
        channel_finder: F,
    ) {
        let Some(channel) = channel_finder(client_id) else {
            return;
        };

        channel.send_sync(message);
    }

    /// Sends a per-client message computed by `sender` to every reachable client
    ///
    /// `sender` may return `None` to skip a client.
    pub fn announce_with<S, C: Channel, F: Fn(Id) -> Option<C>>(
        &self,
        sender: S,
        channel_finder: F,
    ) where
        S: Fn(Id, RoleKind) -> Option<UpdateMessage>,
    {
        for (client_id, channel, role) in self.vec(channel_finder) {
            let Some(message) = sender(client_id, role.kind()) else {
                continue;
            };

            channel.send_update(&message);
        }
    }

    /// Broadcasts an update to every host and player
    pub fn announce<C: Channel, F: Fn(Id) -> Option<C>>(
        &self,
        message: &UpdateMessage,
        channel_finder: F,
    ) {
        self.announce_with(
            |_, kind| {
                if matches!(kind, RoleKind::Unassigned) {
                    None
                } else {
                    Some(message.to_owned())
                }
            },
            channel_finder,
        );
    }

    /// Broadcasts an update to every client of one kind
    pub fn announce_specific<C: Channel, F: Fn(Id) -> Option<C>>(
        &self,
        filter: RoleKind,
        message: &UpdateMessage,
        channel_finder: F,
    ) {
        for (_, channel, _) in self.specific_vec(filter, channel_finder) {
            channel.send_update(message);
        }
    }

    /// Closes the channel of `client_id`, if one is live
    pub fn close_channel<C: Channel, F: Fn(Id) -> Option<C>>(
        &mut self,
        client_id: &Id,
        channel_finder: F,
    ) {
        if let Some(channel) = channel_finder(*client_id) {
            channel.close();
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_with_host_id_registers_host() {
        let host_id = Id::new();
        let clients = Clients::with_host_id(host_id);

        assert_eq!(clients.get_role(host_id), Some(Role::Host));
        assert_eq!(clients.count(RoleKind::Host), 1);
        assert_eq!(clients.count(RoleKind::Player), 0);
    }

    #[test]
    fn test_update_role_moves_between_kinds() {
        let mut clients = Clients::with_host_id(Id::new());
        let player_id = Id::new();

        clients.add_client(player_id, Role::Unassigned).unwrap();
        assert_eq!(clients.count(RoleKind::Unassigned), 1);

        clients.update_role(
            player_id,
            Role::Player {
                name: "Alice".to_owned(),
            },
        );
        assert_eq!(clients.count(RoleKind::Unassigned), 0);
        assert_eq!(clients.count(RoleKind::Player), 1);
        assert_eq!(clients.get_name(player_id), Some("Alice".to_owned()));
    }

    #[test]
    fn test_update_role_unknown_client_is_noop() {
        let mut clients = Clients::with_host_id(Id::new());
        clients.update_role(Id::new(), Role::Host);

        assert_eq!(clients.count(RoleKind::Host), 1);
    }

    #[test]
    fn test_get_name_only_for_players() {
        let host_id = Id::new();
        let clients = Clients::with_host_id(host_id);

        assert_eq!(clients.get_name(host_id), None);
    }

    #[test]
    fn test_serde_rebuilds_reverse_mapping() {
        let mut clients = Clients::with_host_id(Id::new());
        let player_id = Id::new();
        clients
            .add_client(
                player_id,
                Role::Player {
                    name: "Alice".to_owned(),
                },
            )
            .unwrap();

        let json = serde_json::to_string(&clients).unwrap();
        let restored: Clients = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.count(RoleKind::Host), 1);
        assert_eq!(restored.count(RoleKind::Player), 1);
        assert_eq!(restored.get_name(player_id), Some("Alice".to_owned()));
    }
}
