//! Matchmaking queue

use std::collections::VecDeque;
use uuid::Uuid;

/// Authenticated player waiting to be paired
pub struct WaitingPlayer<C> {
    pub user_id: Uuid,
    pub display_name: String,
    pub conn: C,
}

impl<C> WaitingPlayer<C> {
    pub fn new(user_id: Uuid, display_name: String, conn: C) -> Self {
        Self {
            user_id,
            display_name,
            conn,
        }
    }
}

/// FIFO pairing queue
///
/// Generic over the connection handle so the pairing rules can be
/// tested without sockets.
pub struct MatchQueue<C> {
    players: VecDeque<WaitingPlayer<C>>,
}

impl<C> MatchQueue<C> {
    pub fn new() -> Self {
        Self {
            players: VecDeque::new(),
        }
    }

    /// Append a player at the back
    pub fn push(&mut self, player: WaitingPlayer<C>) {
        self.players.push_back(player);
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Position of the first adjacent pair belonging to two different
    /// users, scanning from the front
    ///
    /// Two sockets held by the same user never pair with each other.
    pub fn eligible_pair(&self) -> Option<usize> {
        if self.players.len() < 2 {
            return None;
        }
        (0..self.players.len() - 1)
            .find(|&i| self.players[i].user_id != self.players[i + 1].user_id)
    }

    /// Remove and return the players at `index` and `index + 1`
    pub fn take_pair(&mut self, index: usize) -> Option<(WaitingPlayer<C>, WaitingPlayer<C>)> {
        if index + 1 >= self.players.len() {
            return None;
        }
        let second = self.players.remove(index + 1)?;
        let first = self.players.remove(index)?;
        Some((first, second))
    }

    /// Remove a single player by position
    pub fn remove(&mut self, index: usize) -> Option<WaitingPlayer<C>> {
        self.players.remove(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut WaitingPlayer<C>> {
        self.players.get_mut(index)
    }
}

impl<C> Default for MatchQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}
