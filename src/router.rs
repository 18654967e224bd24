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

use std::error::Error;

use crate::request_response::{Request, Response, StatusCode};

pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Predicate choosing whether a handler accepts a request.
pub trait Matcher<S>: Send {
    fn matches(&self, request: &Request<S>) -> bool;
}

impl<S, F> Matcher<S> for F
where
    F: Fn(&Request<S>) -> bool + Send,
{
    fn matches(&self, request: &Request<S>) -> bool {
        self(request)
    }
}

/// Handles a matched request, mutating `response` in place. Handlers
/// MUST set `response.status` on success; the router warns and leaves
/// it `Empty` otherwise. A returned `Err` is caught by `dispatch` and
/// turned into `ServerError` with the error attached as `exception`.
pub trait Handler<S>: Send {
    fn handle(&self, request: &Request<S>, response: &mut Response<S>) -> Result<(), HandlerError>;
}

impl<S, F> Handler<S> for F
where
    F: Fn(&Request<S>, &mut Response<S>) -> Result<(), HandlerError> + Send,
{
    fn handle(&self, request: &Request<S>, response: &mut Response<S>) -> Result<(), HandlerError> {
        self(request, response)
    }
}

/// Ordered list of (matcher, handler) pairs. `dispatch` invokes the first
/// handler whose matcher accepts the request.
pub struct Router<S> {
    routes: Vec<(Box<dyn Matcher<S>>, Box<dyn Handler<S>>)>,
}

impl<S> Router<S> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn route(&mut self, matcher: impl Matcher<S> + 'static, handler: impl Handler<S> + 'static) {
        self.routes.push((Box::new(matcher), Box::new(handler)));
    }

    pub fn dispatch(&self, request: &Request<S>, response: &mut Response<S>) {
        for (matcher, handler) in &self.routes {
            if matcher.matches(request) {
                if let Err(e) = handler.handle(request, response) {
                    warn!("Handler raised an error: {}", e);
                    response.status = StatusCode::ServerError;
                    response.exception = Some(e.to_string());
                    return;
                }

                if response.status == StatusCode::Empty {
                    warn!("Handler did not set a status code; leaving Empty");
                }

                return;
            }
        }

        response.status = StatusCode::NoRoute;
    }
}

impl<S> Default for Router<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::BytesSerializer;
    use bytes::Bytes;

    fn request() -> Request<BytesSerializer> {
        Request::for_test(Bytes::from_static(b"ping"))
    }

    #[test]
    fn dispatches_to_first_matching_route() {
        let mut router: Router<BytesSerializer> = Router::new();

        router.route(
            |_: &Request<BytesSerializer>| false,
            |_: &Request<BytesSerializer>, r: &mut Response<BytesSerializer>| {
                r.status = StatusCode::ServerError;
                Ok(())
            },
        );
        router.route(
            |_: &Request<BytesSerializer>| true,
            |_: &Request<BytesSerializer>, r: &mut Response<BytesSerializer>| {
                r.status = StatusCode::Ok;
                Ok(())
            },
        );

        let req = request();
        let mut resp = Response::default();
        router.dispatch(&req, &mut resp);

        assert_eq!(resp.status, StatusCode::Ok);
    }

    #[test]
    fn no_route_when_nothing_matches() {
        let router: Router<BytesSerializer> = Router::new();

        let req = request();
        let mut resp = Response::default();
        router.dispatch(&req, &mut resp);

        assert_eq!(resp.status, StatusCode::NoRoute);
    }

    #[test]
    fn handler_error_becomes_server_error() {
        let mut router: Router<BytesSerializer> = Router::new();

        router.route(
            |_: &Request<BytesSerializer>| true,
            |_: &Request<BytesSerializer>, _: &mut Response<BytesSerializer>| {
                Err("boom".into())
            },
        );

        let req = request();
        let mut resp = Response::default();
        router.dispatch(&req, &mut resp);

        assert_eq!(resp.status, StatusCode::ServerError);
        assert_eq!(resp.exception.as_deref(), Some("boom"));
    }
}
