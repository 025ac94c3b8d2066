//! The authority's canonical player list.

use log::info;
use shared::{PlayerState, Vec3};

/// Outcome of registering a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    /// The id was already registered; its entry was overwritten in place.
    Replaced,
}

/// Players in join order, keyed by their assigned id.
///
/// A `Vec` with linear scans: the list is broadcast in full every interval,
/// and keeping join order makes every snapshot list players the same way.
#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    players: Vec<PlayerState>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: Vec::new(),
        }
    }

    /// Adds a player, or replaces the entry that already uses its id.
    pub fn register(&mut self, player: PlayerState) -> Registration {
        if let Some(existing) = self.players.iter_mut().find(|p| p.id == player.id) {
            info!("Replaced player {}", player.id);
            *existing = player;
            return Registration::Replaced;
        }

        info!(
            "Added player {} at ({}, {}, {})",
            player.id, player.position.x, player.position.y, player.position.z
        );
        self.players.push(player);
        Registration::Added
    }

    /// Overwrites the stored position. Returns false for an unknown id.
    pub fn update_position(&mut self, id: &str, position: Vec3) -> bool {
        match self.players.iter_mut().find(|p| p.id == id) {
            Some(player) => {
                player.position = position;
                true
            }
            None => false,
        }
    }

    /// Removes and returns the entry, if the id was registered.
    pub fn remove(&mut self, id: &str) -> Option<PlayerState> {
        let index = self.players.iter().position(|p| p.id == id)?;
        info!("Removed player {}", id);
        Some(self.players.remove(index))
    }

    /// Looks up a player by the id the authority assigned.
    pub fn get(&self, id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    /// True once a handshake for `id` has been registered and until it is
    /// removed.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// A copy of every entry, for a full-state broadcast.
    pub fn snapshot(&self) -> Vec<PlayerState> {
        self.players.clone()
    }

    /// Entries in join order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.iter()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
