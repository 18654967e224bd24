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

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tokio::io;
use tokio::net::TcpStream;
use tokio::select;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tokio_stream::StreamExt;
use tokio_util::codec::{BytesCodec, Decoder, Framed};

use futures::sink::SinkExt;

use crate::pool::PooledBuffer;

pub type PeerId = u32;

/// Identity of a live connection: an assigned monotonic id plus its
/// remote address. Pooled objects (Request/Response/Notification) hold
/// this value rather than a reference to the owning [`Peer`], so peer
/// disposal can never leave them dangling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerConnection {
    pub id: PeerId,
    pub endpoint: SocketAddr,
}

/// Transitions are strictly Connected -> Disconnecting ->
/// Disconnected and never reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Connected,
    Disconnecting,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerResetReason {
    ServerReset,
    RemoteReset,
    TimedOut,
}

/// Receive-buffer size per connection.
pub const RECEIVE_BUFFER_SIZE: usize = 65_536;

/// Event synchronously fired from [`Peer::poll`] on the tick thread.
/// `Poll` is the only place these are produced; background task
/// callbacks only ever push onto the double-buffers `poll` drains.
pub(crate) enum PeerPollEvent {
    Incoming(Bytes),
    Reset(PeerResetReason),
}

/// What the background I/O task observed about the socket, handed back
/// across the inbound double-buffer.
enum TaskEvent {
    Frame(BytesMut),
    Closed,
}

/// One live connection. Owns the socket (via a spawned task performing
/// the concurrent-send/single-receive loop), a monotonic id, and the
/// Connected/Disconnecting/Disconnected state machine.
///
/// The registry half (this struct, owned by the main loop) and the
/// socket half (the spawned task, communicating back over
/// `watch`/`mpsc` channels) are split so the tick thread never awaits
/// socket I/O directly.
pub struct Peer {
    connection: PeerConnection,
    state: PeerState,
    last_activity: Instant,
    pending_reset: Option<PeerResetReason>,
    disconnect_tx: watch::Sender<bool>,
    inbound_rx: mpsc::UnboundedReceiver<TaskEvent>,
    outbound_tx: mpsc::UnboundedSender<(Bytes, usize)>,
    outbound_done_rx: mpsc::UnboundedReceiver<usize>,
}

impl Peer {
    pub(crate) fn spawn(id: PeerId, endpoint: SocketAddr, stream: TcpStream) -> Self {
        let (disconnect_tx, disconnect_rx) = watch::channel(false);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (outbound_done_tx, outbound_done_rx) = mpsc::unbounded_channel();

        let task = PeerTask {
            frame: BytesCodec::new().framed(stream),
            disconnect_rx,
            inbound_tx,
            outbound_rx,
            outbound_done_tx,
        };

        tokio::spawn(task.run());

        Self {
            connection: PeerConnection { id, endpoint },
            state: PeerState::Connected,
            last_activity: Instant::now(),
            pending_reset: None,
            disconnect_tx,
            inbound_rx,
            outbound_tx,
            outbound_done_rx,
        }
    }

    pub fn connection(&self) -> PeerConnection {
        self.connection
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    /// Queues `buf` for sending. Silently dropped outside `Connected`;
    /// the caller gets the buffer back in that case so it can return
    /// it to the pool itself.
    pub(crate) fn send(&self, buf: PooledBuffer) -> Result<(), PooledBuffer> {
        if self.state != PeerState::Connected {
            return Err(buf);
        }

        let (bytes, capacity) = buf.into_bytes();

        if self.outbound_tx.send((bytes, capacity)).is_err() {
            // Task already gone; nothing left to release here, the
            // capacity bookkeeping is lost but the process is tearing
            // down this peer on the next poll regardless.
        }

        Ok(())
    }

    pub(crate) fn begin_disconnect(&mut self, reason: PeerResetReason) {
        if self.state != PeerState::Connected {
            return;
        }

        self.state = PeerState::Disconnecting;
        self.pending_reset = Some(reason);

        if self.disconnect_tx.send(true).is_err() {
            // Task has already exited on its own (e.g. remote reset
            // raced the disconnect signal); poll() will observe the
            // closed inbound channel and finish the transition.
        }
    }

    /// Drains this peer's double-buffers and advances its state machine.
    /// Called once per tick from [`crate::server::Server::poll`]. Never
    /// awaits; `buffers_released` receives the capacities of completed
    /// sends so the caller can reclaim them from the buffer pool.
    pub(crate) fn poll(
        &mut self,
        grace_period: Duration,
        events: &mut Vec<PeerPollEvent>,
        buffers_released: &mut Vec<usize>,
    ) {
        if self.state == PeerState::Disconnected {
            return;
        }

        while let Ok(capacity) = self.outbound_done_rx.try_recv() {
            buffers_released.push(capacity);
        }

        match self.state {
            PeerState::Connected => {
                loop {
                    match self.inbound_rx.try_recv() {
                        Ok(TaskEvent::Frame(buf)) => {
                            self.last_activity = Instant::now();
                            events.push(PeerPollEvent::Incoming(buf.freeze()));
                        }
                        Ok(TaskEvent::Closed) | Err(TryRecvError::Disconnected) => {
                            self.begin_disconnect(PeerResetReason::RemoteReset);
                            break;
                        }
                        Err(TryRecvError::Empty) => break,
                    }
                }

                if self.state == PeerState::Connected
                    && self.last_activity.elapsed() > grace_period
                {
                    self.begin_disconnect(PeerResetReason::TimedOut);
                }
            }
            PeerState::Disconnecting => loop {
                match self.inbound_rx.try_recv() {
                    Ok(TaskEvent::Frame(buf)) => {
                        events.push(PeerPollEvent::Incoming(buf.freeze()));
                    }
                    Ok(TaskEvent::Closed) => {}
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.state = PeerState::Disconnected;
                        events.push(PeerPollEvent::Reset(
                            self.pending_reset
                                .take()
                                .unwrap_or(PeerResetReason::ServerReset),
                        ));
                        break;
                    }
                }
            },
            PeerState::Disconnected => {}
        }
    }
}

struct PeerTask {
    frame: Framed<TcpStream, BytesCodec>,
    disconnect_rx: watch::Receiver<bool>,
    inbound_tx: mpsc::UnboundedSender<TaskEvent>,
    outbound_rx: mpsc::UnboundedReceiver<(Bytes, usize)>,
    outbound_done_tx: mpsc::UnboundedSender<usize>,
}

impl PeerTask {
    /// Sends one already-dequeued buffer and reports its capacity back
    /// for reclaim. Returns `false` if the socket is gone and the task
    /// should stop.
    async fn send_one(&mut self, bytes: Bytes, capacity: usize) -> bool {
        match self.frame.send(bytes).await {
            Ok(()) => {
                let _ = self.outbound_done_tx.send(capacity);
                true
            }
            Err(e) if is_graceful_send_error(&e) => {
                let _ = self.outbound_done_tx.send(capacity);
                true
            }
            Err(_) => false,
        }
    }

    async fn run(mut self) {
        'outer: loop {
            select! {
                biased;

                maybe_bytes = self.outbound_rx.recv() => {
                    match maybe_bytes {
                        Some((bytes, capacity)) => {
                            if !self.send_one(bytes, capacity).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                changed = self.disconnect_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if *self.disconnect_rx.borrow() {
                        // A disconnect can be signalled in the same
                        // synchronous step that queued a reply (e.g. a
                        // Reset-status response sent just before the
                        // peer is torn down); flush anything already
                        // queued before honoring it.
                        while let Ok((bytes, capacity)) = self.outbound_rx.try_recv() {
                            if !self.send_one(bytes, capacity).await {
                                break 'outer;
                            }
                        }
                        break;
                    }
                }
                frame = self.frame.next() => {
                    match frame {
                        Some(Ok(buf)) => {
                            let _ = self.inbound_tx.send(TaskEvent::Frame(buf));
                        }
                        _ => {
                            let _ = self.inbound_tx.send(TaskEvent::Closed);
                            break;
                        }
                    }
                }
            }
        }

        // Dropping `inbound_tx` here closes the channel, which is how
        // `Peer::poll` detects that the pending disconnect has completed.
    }
}

/// Swallows the class of "the other side is gone" errors a send can
/// race against (shutdown / reset / not-connected).
fn is_graceful_send_error(err: &io::Error) -> bool {
    use io::ErrorKind::*;

    matches!(
        err.kind(),
        NotConnected | ConnectionReset | ConnectionAborted | BrokenPipe
    )
}
