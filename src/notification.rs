// nettick - Tick-driven TCP application host over a pluggable wire protocol
// Copyright (C) 2026  nettick contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use thiserror::Error;

use crate::peer::PeerId;
use crate::pool::{Pool, Poolable};
use crate::protocol::MessageSerializer;

/// Dispatch mode for an outgoing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Send,
    BroadcastNarrow,
    BroadcastWide,
    Reset,
}

impl Default for Command {
    fn default() -> Self {
        Command::Send
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("BroadcastNarrow requires a non-empty peer set")]
    EmptyPeerSet,
}

/// Producer-initiated server-to-peer(s) message. Allocated from the
/// center's pool on enqueue, released exactly once after egress.
pub struct Notification<S: MessageSerializer> {
    pub command: Command,
    pub message: Option<S::Message>,
    pub peers: Option<Vec<PeerId>>,
}

impl<S: MessageSerializer> Default for Notification<S> {
    fn default() -> Self {
        Self {
            command: Command::Send,
            message: None,
            peers: None,
        }
    }
}

impl<S: MessageSerializer> Poolable for Notification<S> {
    fn reset(&mut self) {
        self.command = Command::Send;
        self.message = None;
        self.peers = None;
    }
}

/// Thread-affine to the tick thread. Producers (services, scripts,
/// handlers) enqueue through the helpers below; the application drains
/// the queue exactly once per tick.
pub struct NotificationCenter<S: MessageSerializer> {
    pool: Pool<Notification<S>>,
    queue: Vec<Box<Notification<S>>>,
}

impl<S: MessageSerializer> NotificationCenter<S> {
    pub fn new() -> Self {
        Self {
            pool: Pool::new(),
            queue: Vec::new(),
        }
    }

    pub fn send(&mut self, peer: PeerId, message: S::Message) {
        let mut n = self.pool.take();
        n.command = Command::Send;
        n.message = Some(message);
        n.peers = Some(vec![peer]);
        self.queue.push(n);
    }

    pub fn broadcast_narrow(
        &mut self,
        peers: Vec<PeerId>,
        message: S::Message,
    ) -> Result<(), NotificationError> {
        if peers.is_empty() {
            return Err(NotificationError::EmptyPeerSet);
        }

        let mut n = self.pool.take();
        n.command = Command::BroadcastNarrow;
        n.message = Some(message);
        n.peers = Some(peers);
        self.queue.push(n);

        Ok(())
    }

    pub fn broadcast_wide(&mut self, message: S::Message) {
        let mut n = self.pool.take();
        n.command = Command::BroadcastWide;
        n.message = Some(message);
        n.peers = None;
        self.queue.push(n);
    }

    /// `message: None` is allowed: the peers are still disconnected,
    /// just without a farewell payload.
    pub fn reset(&mut self, peers: Vec<PeerId>, message: Option<S::Message>) {
        let mut n = self.pool.take();
        n.command = Command::Reset;
        n.message = message;
        n.peers = Some(peers);
        self.queue.push(n);
    }

    /// Drains every notification queued so far this tick, handing
    /// ownership to the caller. The application invokes this exactly
    /// once per tick.
    pub fn drain(&mut self) -> Vec<Box<Notification<S>>> {
        std::mem::take(&mut self.queue)
    }

    /// Returns a drained notification to the pool. Must be called
    /// exactly once per notification, after egress has finished with it.
    pub fn release(&mut self, item: Box<Notification<S>>) {
        self.pool.give(item);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pre-allocates `count` notifications in the pool's reserve.
    pub fn prewarm(&mut self, count: usize) {
        self.pool.prewarm(count);
    }
}

impl<S: MessageSerializer> Default for NotificationCenter<S> {
    fn default() -> Self {
        Self::new()
    }
}
