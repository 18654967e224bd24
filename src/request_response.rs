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

use std::time::Instant;

use bytes::Bytes;

use crate::peer::PeerConnection;
use crate::pool::Poolable;
use crate::protocol::MessageSerializer;

/// Fine-grained, observational outcome of a dispatched
/// request; these drive logging/client-visible behavior but never drive a
/// retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Empty,
    Ok,
    Reset,
    ServerError,
    BadRequest,
    NoRoute,
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::Empty
    }
}

/// Allocated from a [`crate::pool::Pool`] on deserialize, released
/// exactly once after its terminal pipeline stage. `contents` owns the
/// raw bytes the message was parsed from; `peer` is a value, not a
/// reference, so a disposed peer can never dangle here.
pub struct Request<S: MessageSerializer> {
    pub message: Option<S::Message>,
    pub contents: Option<Bytes>,
    pub peer: Option<PeerConnection>,
    pub timestamp: Option<Instant>,
}

impl<S: MessageSerializer> Default for Request<S> {
    fn default() -> Self {
        Self {
            message: None,
            contents: None,
            peer: None,
            timestamp: None,
        }
    }
}

impl<S: MessageSerializer> Poolable for Request<S> {
    fn reset(&mut self) {
        self.message = None;
        self.contents = None;
        self.peer = None;
        self.timestamp = None;
    }
}

/// Allocated when dispatching a [`Request`], released with it.
pub struct Response<S: MessageSerializer> {
    pub status: StatusCode,
    pub message: Option<S::Message>,
    pub exception: Option<String>,
    pub contains_reply: bool,
}

impl<S: MessageSerializer> Default for Response<S> {
    fn default() -> Self {
        Self {
            status: StatusCode::Empty,
            message: None,
            exception: None,
            contains_reply: false,
        }
    }
}

impl<S: MessageSerializer> Poolable for Response<S> {
    fn reset(&mut self) {
        self.status = StatusCode::Empty;
        self.message = None;
        self.exception = None;
        self.contains_reply = false;
    }
}

/// A request/response pair, released atomically once egress has sent the
/// reply.
pub struct RequestResponse<S: MessageSerializer> {
    pub request: Box<Request<S>>,
    pub response: Box<Response<S>>,
}

#[cfg(test)]
impl<S> Request<S>
where
    S: MessageSerializer<Message = Bytes>,
{
    pub(crate) fn for_test(message: Bytes) -> Self {
        Self {
            contents: Some(message.clone()),
            message: Some(message),
            peer: Some(PeerConnection {
                id: 1,
                endpoint: "127.0.0.1:0".parse().unwrap(),
            }),
            timestamp: Some(Instant::now()),
        }
    }
}
