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

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;

use crate::clock::Clock;
use crate::config::Pools;
use crate::error::HostResult;
use crate::extensions::{ScriptHost, ServiceHost};
use crate::middleware::{
    MiddlewarePipeline, NotificationMiddlewareContext, RequestMiddlewareContext,
    RequestResponseMiddlewareContext,
};
use crate::notification::{Command, Notification, NotificationCenter};
use crate::peer::{PeerConnection, PeerId, PeerResetReason};
use crate::pool::{BufferPool, Pool};
use crate::protocol::MessageSerializer;
use crate::request_response::{Request, RequestResponse, Response, StatusCode};
use crate::router::Router;
use crate::server::{PollOutcome, Server, UnknownPeer};

/// Host-surface events an embedder can subscribe to without reaching into
/// the dispatch pipeline. Every method defaults to a no-op; implement only
/// the ones you care about.
pub trait HostObserver<S: MessageSerializer>: Send {
    fn on_starting(&mut self) {}
    fn on_shutting_down(&mut self) {}
    fn on_join(&mut self, _connection: PeerConnection) {}
    fn on_reset(&mut self, _connection: PeerConnection, _reason: PeerResetReason) {}
    fn on_bad_request(&mut self, _connection: PeerConnection, _contents: &[u8]) {}
}

/// Default observer installed when a [`crate::builder::HostBuilder`] is
/// never given one of its own.
pub struct NoopObserver;

impl<S: MessageSerializer> HostObserver<S> for NoopObserver {}

/// Runs the tick loop over one [`Server`] and the pipeline (router,
/// middleware, services, scripts, notifications) wired around it.
///
/// `tick()` itself never awaits; only [`Application::bind`] and the
/// shutdown half of [`Application::start`] touch the async listener/peer
/// machinery.
pub struct Application<S: MessageSerializer> {
    clock: Clock,
    server: Server,
    serializer: S,
    router: Router<S>,
    request_middleware: MiddlewarePipeline<RequestMiddlewareContext<S>>,
    response_middleware: MiddlewarePipeline<RequestResponseMiddlewareContext<S>>,
    notification_middleware: MiddlewarePipeline<NotificationMiddlewareContext<S>>,
    notifications: NotificationCenter<S>,
    services: ServiceHost<S>,
    scripts: ScriptHost<S>,
    request_pool: Pool<Request<S>>,
    response_pool: Pool<Response<S>>,
    send_buffers: BufferPool,
    observer: Box<dyn HostObserver<S>>,
    running: bool,
}

impl<S: MessageSerializer> Application<S> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        serializer: S,
        router: Router<S>,
        request_middleware: MiddlewarePipeline<RequestMiddlewareContext<S>>,
        response_middleware: MiddlewarePipeline<RequestResponseMiddlewareContext<S>>,
        notification_middleware: MiddlewarePipeline<NotificationMiddlewareContext<S>>,
        services: ServiceHost<S>,
        scripts: ScriptHost<S>,
        observer: Box<dyn HostObserver<S>>,
        clock: Clock,
        server: Server,
        notifications: NotificationCenter<S>,
    ) -> Self {
        Self {
            clock,
            server,
            serializer,
            router,
            request_middleware,
            response_middleware,
            notification_middleware,
            notifications,
            services,
            scripts,
            request_pool: Pool::new(),
            response_pool: Pool::new(),
            send_buffers: BufferPool::new(),
            observer,
            running: false,
        }
    }

    pub fn notifications(&mut self) -> &mut NotificationCenter<S> {
        &mut self.notifications
    }

    pub fn services(&mut self) -> &mut ServiceHost<S> {
        &mut self.services
    }

    pub fn scripts(&mut self) -> &mut ScriptHost<S> {
        &mut self.scripts
    }

    pub fn ticks(&self) -> u64 {
        self.clock.ticks()
    }

    /// Allocates `pools`' configured reserve up front, so the first
    /// ticks under load don't pay allocation cost for requests,
    /// responses, and notifications.
    pub(crate) fn prewarm(&mut self, pools: &Pools) {
        self.request_pool.prewarm(pools.requests);
        self.response_pool.prewarm(pools.responses);
        self.notifications.prewarm(pools.notifications);
    }

    /// Binds the listener and runs the very first tick so that
    /// connections accepted during startup are observed by the caller's
    /// first call to [`Application::tick`] rather than silently
    /// registered and skipped.
    pub async fn bind(&mut self, addr: SocketAddr, backlog: u32) -> HostResult<()> {
        self.observer.on_starting();
        info!("Starting application (addr = {})", addr);

        let outcome = self.server.start(addr, backlog).await?;
        self.running = true;

        self.clock.tick();
        self.run_tick(outcome);

        Ok(())
    }

    /// Advances the clock, polls the server, and runs one full cycle of
    /// the pipeline. Synchronous: safe to call from a plain loop with no
    /// executor in scope, which is what makes it usable directly from
    /// tests.
    pub fn tick(&mut self) {
        self.clock.tick();
        let outcome = self.server.poll();
        self.run_tick(outcome);
    }

    /// Runs [`Application::bind`] then loops [`Application::tick`] until
    /// [`Application::shutdown`] is called (typically from inside a
    /// handler, service, or script). Yields to the runtime between ticks
    /// so the background accept/peer tasks get scheduled.
    pub async fn start(&mut self, addr: SocketAddr, backlog: u32) -> HostResult<()> {
        self.bind(addr, backlog).await?;

        while self.running {
            self.tick();
            tokio::task::yield_now().await;
        }

        self.observer.on_shutting_down();
        info!("Shutting down application");

        self.scripts.unload_all();
        self.server.stop().await;

        Ok(())
    }

    /// Requests a graceful stop. The in-flight tick, if any, still runs
    /// to completion; the loop exits before the next one starts.
    pub fn shutdown(&mut self) {
        self.running = false;
    }

    fn run_tick(&mut self, outcome: PollOutcome) {
        let mut leaved: HashSet<PeerId> = HashSet::new();

        for connection in &outcome.joined {
            self.observer.on_join(*connection);
        }

        for (connection, reason) in &outcome.reset {
            self.observer.on_reset(*connection, *reason);
            leaved.insert(connection.id);
        }

        for capacity in outcome.released_send_buffers {
            self.send_buffers.reclaim(capacity);
        }

        let requests = self.deserialize_stage(outcome.incoming, &leaved);
        let accepted = self.request_middleware_stage(requests);

        let mut leaving: HashSet<PeerId> = HashSet::new();
        let responses = self.dispatch_stage(accepted, &mut leaving);

        let peer_ids: Vec<PeerId> = self.server.peers().collect();
        self.services.tick_all(&mut self.notifications, &peer_ids);
        self.scripts.tick_all(&mut self.notifications, &peer_ids);

        let sendable = self.response_middleware_stage(responses);
        self.egress_responses(sendable);
        self.notification_stage(&leaving);

        for peer_id in leaving {
            self.server.disconnect(peer_id);
        }
    }

    /// Splits every peer's receive buffer into frames and parses each one.
    /// A peer that disconnected this same tick never reaches the router:
    /// its buffer is simply dropped (leaved peers are
    /// invisible to the rest of the pipeline for the remainder of the
    /// tick they left in).
    fn deserialize_stage(
        &mut self,
        incoming: Vec<(PeerConnection, Bytes)>,
        leaved: &HashSet<PeerId>,
    ) -> Vec<Box<Request<S>>> {
        let mut requests = Vec::new();

        for (connection, buf) in incoming {
            if leaved.contains(&connection.id) {
                continue;
            }

            let mut offset = 0;

            while offset < buf.len() {
                let frame_len = match self.serializer.size_from_buffer(&buf[offset..]) {
                    Ok(len) => len,
                    Err(e) => {
                        warn!("Unparseable frame header (peer = {}): {}", connection.id, e);
                        self.observer.on_bad_request(connection, &buf[offset..]);
                        break;
                    }
                };

                match self.serializer.deserialize(&buf[offset..offset + frame_len]) {
                    Ok(message) => {
                        let mut request = self.request_pool.take();
                        request.contents = Some(buf.slice(offset..offset + frame_len));
                        request.message = Some(message);
                        request.peer = Some(connection);
                        request.timestamp = Some(Instant::now());
                        requests.push(request);
                    }
                    Err(e) => {
                        warn!("Malformed frame (peer = {}): {}", connection.id, e);
                        self.observer
                            .on_bad_request(connection, &buf[offset..offset + frame_len]);
                    }
                }

                offset += frame_len;
            }
        }

        requests
    }

    fn request_middleware_stage(&mut self, requests: Vec<Box<Request<S>>>) -> Vec<Box<Request<S>>> {
        let mut accepted = Vec::with_capacity(requests.len());

        for request in requests {
            let mut ctx = RequestMiddlewareContext { request };
            let drop_it = self.request_middleware.invoke(&mut ctx);

            if drop_it {
                self.request_pool.give(ctx.request);
            } else {
                accepted.push(ctx.request);
            }
        }

        accepted
    }

    /// Dispatches each accepted request through the router. A `Reset`
    /// status marks its peer for disconnect once egress has had a chance
    /// to send a farewell reply; later requests from an already-marked
    /// peer in this same tick are dropped unanswered rather than
    /// dispatched twice.
    fn dispatch_stage(
        &mut self,
        requests: Vec<Box<Request<S>>>,
        leaving: &mut HashSet<PeerId>,
    ) -> Vec<RequestResponse<S>> {
        let mut outgoing = Vec::new();

        for request in requests {
            let peer_id = request.peer.as_ref().map(|p| p.id);

            if let Some(peer_id) = peer_id {
                if leaving.contains(&peer_id) {
                    self.request_pool.give(request);
                    continue;
                }
            }

            let mut response = self.response_pool.take();
            self.router.dispatch(&request, &mut response);

            match response.status {
                StatusCode::Empty => {
                    self.request_pool.give(request);
                    self.response_pool.give(response);
                    continue;
                }
                StatusCode::Reset => {
                    if let Some(peer_id) = peer_id {
                        leaving.insert(peer_id);
                    }
                }
                StatusCode::ServerError | StatusCode::BadRequest | StatusCode::NoRoute => {
                    warn!("Request ended in {:?} (peer = {:?})", response.status, peer_id);
                }
                StatusCode::Ok => {}
            }

            if response.contains_reply {
                outgoing.push(RequestResponse { request, response });
            } else {
                self.request_pool.give(request);
                self.response_pool.give(response);
            }
        }

        outgoing
    }

    fn response_middleware_stage(&mut self, pairs: Vec<RequestResponse<S>>) -> Vec<RequestResponse<S>> {
        let mut sendable = Vec::with_capacity(pairs.len());

        for rr in pairs {
            let mut ctx = RequestResponseMiddlewareContext {
                request: rr.request,
                response: rr.response,
            };
            let drop_it = self.response_middleware.invoke(&mut ctx);

            if drop_it {
                self.request_pool.give(ctx.request);
                self.response_pool.give(ctx.response);
            } else {
                sendable.push(RequestResponse {
                    request: ctx.request,
                    response: ctx.response,
                });
            }
        }

        sendable
    }

    fn egress_responses(&mut self, pairs: Vec<RequestResponse<S>>) {
        for rr in pairs {
            let peer_id = rr.request.peer.as_ref().map(|p| p.id);

            if let (Some(peer_id), Some(message)) = (peer_id, &rr.response.message) {
                self.enqueue_send(peer_id, message);
            }

            self.request_pool.give(rr.request);
            self.response_pool.give(rr.response);
        }
    }

    /// Drains whatever services, scripts, and handlers queued this tick
    /// and runs each through notification middleware before egress
    /// (notification egress drains exactly what's
    /// queued so far, not what middleware or handlers add afterward).
    /// `leaving` excludes peers already marked for disconnect this tick
    /// from every command's target set, including `BroadcastWide`.
    fn notification_stage(&mut self, leaving: &HashSet<PeerId>) {
        let pending = self.notifications.drain();

        for notification in pending {
            let mut ctx = NotificationMiddlewareContext { notification };
            let drop_it = self.notification_middleware.invoke(&mut ctx);
            let notification = ctx.notification;

            if !drop_it {
                self.dispatch_notification(&notification, leaving);
            }

            self.notifications.release(notification);
        }
    }

    fn dispatch_notification(&mut self, notification: &Notification<S>, leaving: &HashSet<PeerId>) {
        let peers: Vec<PeerId> = match notification.command {
            Command::Send | Command::BroadcastNarrow | Command::Reset => {
                notification.peers.clone().unwrap_or_default()
            }
            Command::BroadcastWide => self.server.peers().collect(),
        };

        let peers: Vec<PeerId> = peers.into_iter().filter(|id| !leaving.contains(id)).collect();

        if let Some(message) = &notification.message {
            for &peer_id in &peers {
                self.enqueue_send(peer_id, message);
            }
        }

        if notification.command == Command::Reset {
            for &peer_id in &peers {
                self.server.disconnect(peer_id);
            }
        }
    }

    fn enqueue_send(&mut self, peer_id: PeerId, message: &S::Message) {
        let size = self.serializer.size_from_message(message);
        let mut buf = self.send_buffers.take(size);
        self.serializer.serialize(message, buf.bytes_mut());

        if let Err(UnknownPeer(buf)) = self.server.send(peer_id, buf) {
            self.send_buffers.give(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration as StdDuration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::time::sleep;

    use super::*;
    use crate::extensions::{ExtensionContext, ExtensionError, Service};
    use crate::protocol::BytesSerializer;
    use crate::router::HandlerError;

    fn app_with(
        router: Router<BytesSerializer>,
        observer: Box<dyn HostObserver<BytesSerializer>>,
        grace_period: StdDuration,
    ) -> Application<BytesSerializer> {
        Application::new(
            BytesSerializer,
            router,
            MiddlewarePipeline::new(),
            MiddlewarePipeline::new(),
            MiddlewarePipeline::new(),
            ServiceHost::new(),
            ScriptHost::new(),
            observer,
            Clock::new(),
            Server::new(grace_period),
            NotificationCenter::new(),
        )
    }

    fn echo_router() -> Router<BytesSerializer> {
        let mut router: Router<BytesSerializer> = Router::new();
        router.route(
            |_: &Request<BytesSerializer>| true,
            |req: &Request<BytesSerializer>, resp: &mut Response<BytesSerializer>| -> Result<(), HandlerError> {
                resp.message = req.message.clone();
                resp.status = StatusCode::Ok;
                resp.contains_reply = true;
                Ok(())
            },
        );
        router
    }

    fn app() -> Application<BytesSerializer> {
        app_with(echo_router(), Box::new(NoopObserver), StdDuration::from_secs(30))
    }

    async fn write_frame(stream: &mut TcpStream, payload: &[u8]) {
        let mut header = [0u8; 4];
        header.copy_from_slice(&(payload.len() as u32).to_le_bytes());
        stream.write_all(&header).await.unwrap();
        stream.write_all(payload).await.unwrap();
    }

    async fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
        let mut header = [0u8; 4];
        stream.read_exact(&mut header).await.unwrap();
        let len = u32::from_le_bytes(header) as usize;
        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).await.unwrap();
        body
    }

    #[tokio::test]
    async fn echoes_a_request_back_to_the_sender() {
        let addr: SocketAddr = "127.0.0.1:18471".parse().unwrap();
        let mut application = app();
        application.bind(addr, 16).await.unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        write_frame(&mut client, b"ping").await;

        let mut reply = None;
        for _ in 0..50 {
            application.tick();
            sleep(StdDuration::from_millis(5)).await;

            if let Ok(body) = tokio::time::timeout(StdDuration::from_millis(1), read_frame(&mut client)).await {
                reply = Some(body);
                break;
            }
        }

        assert_eq!(reply, Some(b"ping".to_vec()));
    }

    struct Greeter {
        sent: bool,
    }

    impl Service<BytesSerializer> for Greeter {
        fn tick(&mut self, ctx: &mut ExtensionContext<BytesSerializer>) -> Result<(), ExtensionError> {
            if !self.sent && !ctx.peers.is_empty() {
                ctx.notifications.broadcast_wide(Bytes::from_static(b"hello"));
                self.sent = true;
            }

            Ok(())
        }
    }

    #[tokio::test]
    async fn service_broadcast_reaches_connected_peers() {
        let addr: SocketAddr = "127.0.0.1:18472".parse().unwrap();
        let mut application = app();
        application.services().register(Greeter { sent: false });
        application.bind(addr, 16).await.unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();

        let mut reply = None;
        for _ in 0..50 {
            application.tick();
            sleep(StdDuration::from_millis(5)).await;

            if let Ok(body) = tokio::time::timeout(StdDuration::from_millis(1), read_frame(&mut client)).await {
                reply = Some(body);
                break;
            }
        }

        assert_eq!(reply, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn reset_status_sends_its_reply_before_the_peer_is_torn_down() {
        let addr: SocketAddr = "127.0.0.1:18473".parse().unwrap();

        let mut router: Router<BytesSerializer> = Router::new();
        router.route(
            |req: &Request<BytesSerializer>| req.message.as_deref() == Some(b"bye".as_slice()),
            |_: &Request<BytesSerializer>, resp: &mut Response<BytesSerializer>| -> Result<(), HandlerError> {
                resp.message = Some(Bytes::from_static(b"Goodbye"));
                resp.status = StatusCode::Reset;
                resp.contains_reply = true;
                Ok(())
            },
        );

        let mut application = app_with(router, Box::new(NoopObserver), StdDuration::from_secs(30));
        application.bind(addr, 16).await.unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        write_frame(&mut client, b"bye").await;

        let mut reply = None;
        for _ in 0..50 {
            application.tick();
            sleep(StdDuration::from_millis(5)).await;

            if let Ok(body) = tokio::time::timeout(StdDuration::from_millis(1), read_frame(&mut client)).await {
                reply = Some(body);
                break;
            }
        }

        assert_eq!(
            reply,
            Some(b"Goodbye".to_vec()),
            "the Reset reply must reach the peer before it is torn down"
        );

        let mut closed = false;
        for _ in 0..50 {
            application.tick();
            sleep(StdDuration::from_millis(5)).await;

            let mut probe = [0u8; 1];
            if let Ok(Ok(0)) = tokio::time::timeout(StdDuration::from_millis(1), client.read(&mut probe)).await {
                closed = true;
                break;
            }
        }

        assert!(closed, "peer must be disconnected once its Reset reply has been sent");
    }

    struct NarrowBroadcaster {
        sent: bool,
    }

    impl Service<BytesSerializer> for NarrowBroadcaster {
        fn tick(&mut self, ctx: &mut ExtensionContext<BytesSerializer>) -> Result<(), ExtensionError> {
            if !self.sent && ctx.peers.len() == 3 {
                let _ = ctx
                    .notifications
                    .broadcast_narrow(ctx.peers.to_vec(), Bytes::from_static(b"narrow"));
                self.sent = true;
            }

            Ok(())
        }
    }

    #[tokio::test]
    async fn narrow_broadcast_excludes_a_peer_leaving_in_the_same_tick() {
        let addr: SocketAddr = "127.0.0.1:18474".parse().unwrap();

        let mut router: Router<BytesSerializer> = Router::new();
        router.route(
            |req: &Request<BytesSerializer>| req.message.as_deref() == Some(b"leave".as_slice()),
            |_: &Request<BytesSerializer>, resp: &mut Response<BytesSerializer>| -> Result<(), HandlerError> {
                resp.status = StatusCode::Reset;
                Ok(())
            },
        );

        let mut application = app_with(router, Box::new(NoopObserver), StdDuration::from_secs(30));
        application.services().register(NarrowBroadcaster { sent: false });
        application.bind(addr, 16).await.unwrap();

        let mut a = TcpStream::connect(addr).await.unwrap();
        let mut b = TcpStream::connect(addr).await.unwrap();
        let mut c = TcpStream::connect(addr).await.unwrap();

        // Let all three joins land on their own tick before A asks to leave.
        application.tick();
        sleep(StdDuration::from_millis(5)).await;

        write_frame(&mut a, b"leave").await;

        let mut b_reply = None;
        let mut c_reply = None;
        for _ in 0..50 {
            application.tick();
            sleep(StdDuration::from_millis(5)).await;

            if b_reply.is_none() {
                if let Ok(body) = tokio::time::timeout(StdDuration::from_millis(1), read_frame(&mut b)).await {
                    b_reply = Some(body);
                }
            }
            if c_reply.is_none() {
                if let Ok(body) = tokio::time::timeout(StdDuration::from_millis(1), read_frame(&mut c)).await {
                    c_reply = Some(body);
                }
            }
            if b_reply.is_some() && c_reply.is_some() {
                break;
            }
        }

        assert_eq!(b_reply, Some(b"narrow".to_vec()));
        assert_eq!(c_reply, Some(b"narrow".to_vec()));

        let mut probe = [0u8; 16];
        match tokio::time::timeout(StdDuration::from_millis(5), a.read(&mut probe)).await {
            Ok(Ok(0)) | Err(_) => {}
            Ok(Ok(n)) => panic!("A must not receive the narrow broadcast, got {} bytes", n),
            Ok(Err(e)) => panic!("unexpected read error on A: {}", e),
        }

        let mut a_closed = false;
        for _ in 0..50 {
            application.tick();
            sleep(StdDuration::from_millis(5)).await;

            let mut probe = [0u8; 1];
            if let Ok(Ok(0)) = tokio::time::timeout(StdDuration::from_millis(1), a.read(&mut probe)).await {
                a_closed = true;
                break;
            }
        }

        assert!(a_closed, "A's own disconnect must still proceed");
    }

    #[derive(Default)]
    struct RecordedEvents {
        resets: Vec<(PeerConnection, PeerResetReason)>,
        bad_requests: Vec<Vec<u8>>,
    }

    struct RecordingObserver(Arc<Mutex<RecordedEvents>>);

    impl HostObserver<BytesSerializer> for RecordingObserver {
        fn on_reset(&mut self, connection: PeerConnection, reason: PeerResetReason) {
            self.0.lock().unwrap().resets.push((connection, reason));
        }

        fn on_bad_request(&mut self, _connection: PeerConnection, contents: &[u8]) {
            self.0.lock().unwrap().bad_requests.push(contents.to_vec());
        }
    }

    #[tokio::test]
    async fn idle_peer_times_out_after_the_grace_period_elapses() {
        let addr: SocketAddr = "127.0.0.1:18475".parse().unwrap();
        let events = Arc::new(Mutex::new(RecordedEvents::default()));
        let observer = RecordingObserver(events.clone());

        let mut application = app_with(echo_router(), Box::new(observer), StdDuration::from_millis(50));
        application.bind(addr, 16).await.unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();

        let mut timed_out = false;
        for _ in 0..80 {
            application.tick();
            sleep(StdDuration::from_millis(10)).await;

            if events
                .lock()
                .unwrap()
                .resets
                .iter()
                .any(|(_, reason)| *reason == PeerResetReason::TimedOut)
            {
                timed_out = true;
                break;
            }
        }

        assert!(timed_out, "idle peer must be reset for TimedOut once the grace period elapses");
    }

    #[tokio::test]
    async fn unparseable_frame_header_is_reported_and_the_rest_of_the_buffer_is_discarded() {
        let addr: SocketAddr = "127.0.0.1:18476".parse().unwrap();
        let events = Arc::new(Mutex::new(RecordedEvents::default()));
        let observer = RecordingObserver(events.clone());

        let mut application = app_with(echo_router(), Box::new(observer), StdDuration::from_secs(30));
        application.bind(addr, 16).await.unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&[1, 2]).await.unwrap();

        let mut reported = None;
        for _ in 0..50 {
            application.tick();
            sleep(StdDuration::from_millis(5)).await;

            let recorded = events.lock().unwrap().bad_requests.clone();
            if !recorded.is_empty() {
                reported = Some(recorded);
                break;
            }
        }

        assert_eq!(reported, Some(vec![vec![1, 2]]));
    }
}
