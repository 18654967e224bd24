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

use std::time::Duration;

use crate::application::{Application, HostObserver, NoopObserver};
use crate::clock::Clock;
use crate::config::Pools;
use crate::error::{HostResult, ScriptLoadError};
use crate::extensions::{Script, Service, ScriptHost, ServiceHost};
use crate::middleware::{
    Middleware, MiddlewarePipeline, NotificationMiddlewareContext, RequestMiddlewareContext,
    RequestResponseMiddlewareContext,
};
use crate::notification::NotificationCenter;
use crate::protocol::MessageSerializer;
use crate::router::{Handler, Matcher, Router};
use crate::server::Server;

/// Fluent assembly of an [`Application`]. Every slot the caller does not
/// touch is filled with an in-memory default: an empty router (every
/// request falls through to `NoRoute`), empty middleware pipelines, no
/// services or scripts, a [`NoopObserver`], and a fresh [`Server`]/
/// [`NotificationCenter`]/[`Clock`].
pub struct HostBuilder<S: MessageSerializer> {
    serializer: S,
    router: Router<S>,
    request_middleware: MiddlewarePipeline<RequestMiddlewareContext<S>>,
    response_middleware: MiddlewarePipeline<RequestResponseMiddlewareContext<S>>,
    notification_middleware: MiddlewarePipeline<NotificationMiddlewareContext<S>>,
    services: ServiceHost<S>,
    scripts: ScriptHost<S>,
    observer: Box<dyn HostObserver<S>>,
    peer_grace_period: Duration,
    pools: Pools,
    server: Option<Server>,
    notifications: Option<NotificationCenter<S>>,
    timer: Option<Clock>,
}

impl<S: MessageSerializer> HostBuilder<S> {
    pub fn new(serializer: S) -> Self {
        Self {
            serializer,
            router: Router::new(),
            request_middleware: MiddlewarePipeline::new(),
            response_middleware: MiddlewarePipeline::new(),
            notification_middleware: MiddlewarePipeline::new(),
            services: ServiceHost::new(),
            scripts: ScriptHost::new(),
            observer: Box::new(NoopObserver),
            peer_grace_period: Duration::from_secs(60),
            pools: Pools::default(),
            server: None,
            notifications: None,
            timer: None,
        }
    }

    pub fn route(mut self, matcher: impl Matcher<S> + 'static, handler: impl Handler<S> + 'static) -> Self {
        self.router.route(matcher, handler);
        self
    }

    pub fn request_middleware(mut self, middleware: impl Middleware<RequestMiddlewareContext<S>> + 'static) -> Self {
        self.request_middleware.add(middleware);
        self
    }

    pub fn response_middleware(
        mut self,
        middleware: impl Middleware<RequestResponseMiddlewareContext<S>> + 'static,
    ) -> Self {
        self.response_middleware.add(middleware);
        self
    }

    pub fn notification_middleware(
        mut self,
        middleware: impl Middleware<NotificationMiddlewareContext<S>> + 'static,
    ) -> Self {
        self.notification_middleware.add(middleware);
        self
    }

    pub fn service(mut self, service: impl Service<S> + 'static) -> Self {
        self.services.register(service);
        self
    }

    /// Registers a script. Construction failure (the factory returning
    /// `Err`) aborts the whole builder chain rather than silently
    /// skipping the script.
    pub fn script<T, F>(mut self, factory: F) -> HostResult<Self>
    where
        T: Script<S> + 'static,
        F: FnOnce() -> Result<T, ScriptLoadError>,
    {
        self.scripts.load(factory)?;
        Ok(self)
    }

    pub fn observer(mut self, observer: impl HostObserver<S> + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn peer_grace_period(mut self, period: Duration) -> Self {
        self.peer_grace_period = period;
        self
    }

    /// Sets the request/response/notification pool pre-warm sizes,
    /// typically read from a [`crate::config::Config`].
    pub fn pools(mut self, pools: Pools) -> Self {
        self.pools = pools;
        self
    }

    /// Overrides the connection registry. Useful for tests that want to
    /// observe a `Server` constructed outside the builder. Defaults to a
    /// fresh one built from `peer_grace_period` if never called.
    pub fn server(mut self, server: Server) -> Self {
        self.server = Some(server);
        self
    }

    /// Overrides the notification center, e.g. to pre-seed its pool or
    /// to share one across multiple builders under test.
    pub fn notifications(mut self, notifications: NotificationCenter<S>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    /// Overrides the tick clock.
    pub fn timer(mut self, timer: Clock) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn build(self) -> Application<S> {
        let server = self
            .server
            .unwrap_or_else(|| Server::new(self.peer_grace_period));
        let notifications = self.notifications.unwrap_or_default();
        let timer = self.timer.unwrap_or_default();

        let mut application = Application::new(
            self.serializer,
            self.router,
            self.request_middleware,
            self.response_middleware,
            self.notification_middleware,
            self.services,
            self.scripts,
            self.observer,
            timer,
            server,
            notifications,
        );

        application.prewarm(&self.pools);
        application
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::BytesSerializer;

    #[test]
    fn builds_with_every_default_slot() {
        let application: Application<BytesSerializer> = HostBuilder::new(BytesSerializer).build();
        assert_eq!(application.ticks(), 0);
    }
}
