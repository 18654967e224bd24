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

use tokio::net::{TcpListener as TokioTcpListener, TcpStream};
use tokio::select;
use tokio::sync::{mpsc, watch};

use crate::error::HostResult;

/// Accepts inbound connections on a background task and exposes them to
/// the tick thread through `poll`.
///
/// The tick thread must never await on socket I/O, so accept runs on its
/// own task feeding an unbounded channel that `poll` drains
/// synchronously.
pub struct Listener {
    accepted_rx: mpsc::UnboundedReceiver<(TcpStream, SocketAddr)>,
    stop_tx: watch::Sender<bool>,
}

/// One accepted connection, not yet registered with a [`crate::server::Server`].
pub struct Connected {
    pub stream: TcpStream,
    pub endpoint: SocketAddr,
}

impl Listener {
    /// Binds and starts accepting immediately. `backlog` is accepted as
    /// part of the listener's interface but `tokio::net::TcpListener`
    /// does not expose OS backlog tuning directly; it is logged so an
    /// operator can see the configured intent.
    pub async fn listen(addr: SocketAddr, backlog: u32) -> HostResult<Self> {
        let listener = TokioTcpListener::bind(addr).await?;

        info!(
            "Listening (addr = {}) (backlog hint = {})",
            addr, backlog
        );

        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        let (stop_tx, mut stop_rx) = watch::channel(false);

        tokio::spawn(async move {
            loop {
                select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, endpoint)) => {
                                if accepted_tx.send((stream, endpoint)).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                // Failures during accept are logged and the
                                // listener stays open.
                                warn!("Accept failed: {}", e);
                            }
                        }
                    }
                }
            }
        });

        Ok(Self { accepted_rx, stop_tx })
    }

    /// Stops accepting new connections. Already-accepted sockets queued
    /// on the channel are still drained by subsequent `poll` calls.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Synchronously drains every connection accepted since the last
    /// poll, emitting one `Connected` per accepted socket.
    pub fn poll(&mut self) -> Vec<Connected> {
        let mut out = Vec::new();

        while let Ok((stream, endpoint)) = self.accepted_rx.try_recv() {
            out.push(Connected { stream, endpoint });
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use tokio::time::sleep;

    use super::*;

    #[tokio::test]
    async fn poll_reports_connections_accepted_since_the_last_call() {
        let addr: SocketAddr = "127.0.0.1:18551".parse().unwrap();
        let mut listener = Listener::listen(addr, 16).await.unwrap();

        assert!(listener.poll().is_empty(), "nothing accepted yet");

        let _client = TcpStream::connect(addr).await.unwrap();

        let mut connected = Vec::new();
        for _ in 0..50 {
            connected.extend(listener.poll());
            if !connected.is_empty() {
                break;
            }
            sleep(StdDuration::from_millis(5)).await;
        }

        assert_eq!(connected.len(), 1);
    }

    #[tokio::test]
    async fn stop_halts_future_accepts_but_poll_still_drains_whats_queued() {
        let addr: SocketAddr = "127.0.0.1:18552".parse().unwrap();
        let mut listener = Listener::listen(addr, 16).await.unwrap();

        let _first = TcpStream::connect(addr).await.unwrap();
        sleep(StdDuration::from_millis(20)).await;

        listener.stop();
        sleep(StdDuration::from_millis(20)).await;

        let connected = listener.poll();
        assert_eq!(connected.len(), 1, "already-accepted connection must still be delivered");

        // A handshake after stop() may still complete against the OS
        // backlog, but the accept task has exited and never hands it
        // to poll().
        let _second = TcpStream::connect(addr).await;
        sleep(StdDuration::from_millis(20)).await;
        assert!(listener.poll().is_empty(), "no further connections are ever surfaced after stop");
    }
}
