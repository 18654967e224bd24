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

#[macro_use]
extern crate log;

mod application;
mod builder;
mod clock;
mod config;
mod error;
mod extensions;
mod listener;
mod middleware;
mod notification;
mod peer;
mod pool;
mod protocol;
mod request_response;
mod router;
mod server;

pub use application::{Application, HostObserver, NoopObserver};
pub use builder::HostBuilder;
pub use clock::Clock;
pub use config::{Config, General, Pools};
pub use error::{HostError, HostResult, ScriptLoadError, SerializerError};
pub use extensions::{
    ExtensionContext, ExtensionError, Script, ScriptHost, ScriptKind, Service, ServiceHost,
};
pub use middleware::{
    Middleware, MiddlewarePipeline, NotificationMiddlewareContext, Outcome,
    RequestMiddlewareContext, RequestResponseMiddlewareContext,
};
pub use notification::{Command, Notification, NotificationCenter, NotificationError};
pub use peer::{PeerConnection, PeerId, PeerResetReason};
pub use pool::{BufferPool, Pool, Poolable, PooledBuffer};
pub use protocol::{BytesSerializer, MessageSerializer, FRAME_HEADER_LEN};
pub use request_response::{Request, RequestResponse, Response, StatusCode};
pub use router::{Handler, HandlerError, Matcher, Router};
pub use server::Server;
