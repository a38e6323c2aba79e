//! FIFO waitlist for quick-match pairing.

use std::collections::VecDeque;

use dropfour_protocol::PlayerId;

/// Ordered queue of players awaiting random pairing.
///
/// A player appears at most once; pairing and disconnect each remove
/// exactly that entry, so nobody can be matched twice.
#[derive(Debug, Default)]
pub struct Waitlist {
    queue: VecDeque<PlayerId>,
}

impl Waitlist {
    pub fn new() -> Self {
        Self { queue: VecDeque::new() }
    }

    /// Enqueues `player` unless they are already queued. Returns whether
    /// an entry was added.
    pub fn push(&mut self, player: PlayerId) -> bool {
        if self.contains(player) {
            return false;
        }
        self.queue.push_back(player);
        true
    }

    /// The longest-waiting player, without dequeuing them.
    pub fn peek(&self) -> Option<PlayerId> {
        self.queue.front().copied()
    }

    /// Dequeues the longest-waiting player.
    pub fn pop(&mut self) -> Option<PlayerId> {
        self.queue.pop_front()
    }

    /// Removes `player` wherever they are queued. Idempotent.
    pub fn remove(&mut self, player: PlayerId) -> bool {
        match self.queue.iter().position(|p| *p == player) {
            Some(index) => {
                self.queue.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.queue.contains(&player)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
