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

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;

use crate::error::HostResult;
use crate::listener::Listener;
use crate::peer::{Peer, PeerConnection, PeerId, PeerPollEvent, PeerResetReason};
use crate::pool::PooledBuffer;

/// Everything observed during one [`Server::poll`], in the order the
/// tick pipeline needs to consume it: joins, then resets, then
/// incoming frames.
#[derive(Default)]
pub struct PollOutcome {
    pub joined: Vec<PeerConnection>,
    pub reset: Vec<(PeerConnection, PeerResetReason)>,
    pub incoming: Vec<(PeerConnection, Bytes)>,
    pub released_send_buffers: Vec<usize>,
}

/// Error returned by [`Server::send`]/[`Server::disconnect`] when the
/// peer id is not (or no longer) registered. The buffer, if any, is
/// handed back so the caller can release it to the pool.
pub struct UnknownPeer(pub PooledBuffer);

/// Aggregates peers, routes listener/peer events upward, and exposes
/// connection-management operations. Owns the insertion-order list so
/// `poll()` visits peers in a stable, observable order.
pub struct Server {
    listener: Option<Listener>,
    peers: HashMap<PeerId, Peer>,
    order: Vec<PeerId>,
    next_id: PeerId,
    peer_grace_period: Duration,
}

impl Server {
    pub fn new(peer_grace_period: Duration) -> Self {
        Self {
            listener: None,
            peers: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
            peer_grace_period,
        }
    }

    /// Starts the listener, then performs one immediate poll so the very
    /// first tick can observe connections accepted during startup.
    pub async fn start(&mut self, addr: SocketAddr, backlog: u32) -> HostResult<PollOutcome> {
        self.listener = Some(Listener::listen(addr, backlog).await?);
        Ok(self.poll())
    }

    /// Stops accepting, disconnects every live peer, and polls until all
    /// of them have reached `Disconnected`.
    pub async fn stop(&mut self) {
        if let Some(listener) = &self.listener {
            listener.stop();
        }

        for id in self.order.clone() {
            if let Some(peer) = self.peers.get_mut(&id) {
                peer.begin_disconnect(PeerResetReason::ServerReset);
            }
        }

        while !self.peers.is_empty() {
            let outcome = self.poll();
            for (connection, _) in outcome.reset {
                debug!("Peer disconnected during shutdown (id = {})", connection.id);
            }
            tokio::task::yield_now().await;
        }
    }

    pub fn send(&mut self, peer_id: PeerId, buf: PooledBuffer) -> Result<(), UnknownPeer> {
        match self.peers.get(&peer_id) {
            Some(peer) => {
                if let Err(buf) = peer.send(buf) {
                    // Peer exists but isn't Connected: the send is
                    // silently dropped, not an error.
                    drop(buf);
                }
                Ok(())
            }
            None => Err(UnknownPeer(buf)),
        }
    }

    pub fn disconnect(&mut self, peer_id: PeerId) {
        if let Some(peer) = self.peers.get_mut(&peer_id) {
            peer.begin_disconnect(PeerResetReason::ServerReset);
        } else {
            warn!("Disconnect requested for unknown peer (id = {})", peer_id);
        }
    }

    pub fn is_connected(&self, peer_id: PeerId) -> bool {
        self.peers
            .get(&peer_id)
            .map(|p| p.state() == crate::peer::PeerState::Connected)
            .unwrap_or(false)
    }

    pub fn peers(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.order.iter().copied()
    }

    /// Polls the listener, then every peer in insertion order.
    pub fn poll(&mut self) -> PollOutcome {
        let mut outcome = PollOutcome::default();

        if let Some(listener) = &mut self.listener {
            for connected in listener.poll() {
                let id = self.next_id;
                self.next_id += 1;

                let peer = Peer::spawn(id, connected.endpoint, connected.stream);
                let connection = peer.connection();

                debug!("Peer has connected (id = {}) (addr = {})", id, connection.endpoint);

                self.peers.insert(id, peer);
                self.order.push(id);
                outcome.joined.push(connection);
            }
        }

        let mut events = Vec::new();
        let mut to_remove = Vec::new();

        for &id in &self.order {
            let peer = match self.peers.get_mut(&id) {
                Some(peer) => peer,
                None => continue,
            };

            events.clear();
            peer.poll(
                self.peer_grace_period,
                &mut events,
                &mut outcome.released_send_buffers,
            );

            let connection = peer.connection();

            for event in events.drain(..) {
                match event {
                    PeerPollEvent::Incoming(bytes) => {
                        outcome.incoming.push((connection, bytes));
                    }
                    PeerPollEvent::Reset(reason) => {
                        debug!("Peer has disconnected (id = {}) (reason = {:?})", id, reason);
                        outcome.reset.push((connection, reason));
                        to_remove.push(id);
                    }
                }
            }
        }

        if !to_remove.is_empty() {
            self.order.retain(|id| !to_remove.contains(id));
            for id in to_remove {
                self.peers.remove(&id);
            }
        }

        outcome
    }
}
