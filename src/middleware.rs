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

use crate::notification::Notification;
use crate::peer::PeerId;
use crate::protocol::MessageSerializer;
use crate::request_response::{Request, Response};

/// Result of invoking a single middleware against a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    PassThrough,
    Reject,
    Halt,
}

/// Context for the request-middleware stage.
///
/// Owns the request rather than borrowing it: a pipeline is stored as a
/// plain field on [`crate::application::Application`], so its context
/// type cannot carry a borrow tied to one tick's stack frame. Ownership
/// also makes "must not retain references beyond invocation"
/// trivially true -- there is nothing to dangle.
pub struct RequestMiddlewareContext<S: MessageSerializer> {
    pub request: Box<Request<S>>,
}

/// Context for the response-middleware stage.
pub struct RequestResponseMiddlewareContext<S: MessageSerializer> {
    pub request: Box<Request<S>>,
    pub response: Box<Response<S>>,
}

/// Context for the notification-middleware stage. Target peers, when
/// the command has any, are read off `notification.peers` rather than
/// a separate `peers` field, which would just duplicate data already
/// owned by the notification.
pub struct NotificationMiddlewareContext<S: MessageSerializer> {
    pub notification: Box<Notification<S>>,
}

impl<S: MessageSerializer> NotificationMiddlewareContext<S> {
    pub fn peers(&self) -> Option<&[PeerId]> {
        self.notification.peers.as_deref()
    }
}

/// Generic ordered filter over a context type. Implementors must not
/// retain references borrowed from the context past the call to
/// `invoke` -- the pipeline runs on the tick thread and the borrowed
/// pooled objects are released or forwarded immediately after.
///
/// Deliberately a plain synchronous trait, not an `async_trait`: the
/// tick thread must never suspend, so a middleware that needs to await
/// something must hand off to a service/script instead
/// of blocking the pipeline.
pub trait Middleware<Ctx>: Send {
    fn invoke(&self, ctx: &mut Ctx) -> Outcome;
}

impl<Ctx, F> Middleware<Ctx> for F
where
    F: Fn(&mut Ctx) -> Outcome + Send,
{
    fn invoke(&self, ctx: &mut Ctx) -> Outcome {
        self(ctx)
    }
}

/// Ordered chain of middlewares over one context type.
pub struct MiddlewarePipeline<Ctx> {
    stages: Vec<Box<dyn Middleware<Ctx>>>,
}

impl<Ctx> MiddlewarePipeline<Ctx> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn add(&mut self, middleware: impl Middleware<Ctx> + 'static) {
        self.stages.push(Box::new(middleware));
    }

    /// Walks the chain in insertion order. Returns `true` iff the
    /// context should be dropped, i.e. some middleware returned `Reject`
    /// or `Halt`; returns `false` (accept) only if every middleware
    /// passed through.
    pub fn invoke(&self, ctx: &mut Ctx) -> bool {
        for middleware in &self.stages {
            match middleware.invoke(ctx) {
                Outcome::PassThrough => continue,
                Outcome::Reject => return true,
                Outcome::Halt => return true,
            }
        }

        false
    }
}

impl<Ctx> Default for MiddlewarePipeline<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(i32);

    #[test]
    fn accepts_when_all_pass_through() {
        let mut pipeline: MiddlewarePipeline<Counter> = MiddlewarePipeline::new();
        pipeline.add(|_: &mut Counter| Outcome::PassThrough);
        pipeline.add(|_: &mut Counter| Outcome::PassThrough);

        let mut ctx = Counter(0);
        assert!(!pipeline.invoke(&mut ctx));
    }

    #[test]
    fn short_circuits_on_first_non_pass_through() {
        let mut pipeline: MiddlewarePipeline<Counter> = MiddlewarePipeline::new();
        pipeline.add(|ctx: &mut Counter| {
            ctx.0 += 1;
            Outcome::Reject
        });
        pipeline.add(|ctx: &mut Counter| {
            ctx.0 += 100;
            Outcome::PassThrough
        });

        let mut ctx = Counter(0);
        assert!(pipeline.invoke(&mut ctx));
        assert_eq!(ctx.0, 1, "second middleware must never run");
    }

    #[test]
    fn halt_also_drops_the_context() {
        let mut pipeline: MiddlewarePipeline<Counter> = MiddlewarePipeline::new();
        pipeline.add(|_: &mut Counter| Outcome::Halt);

        let mut ctx = Counter(0);
        assert!(pipeline.invoke(&mut ctx));
    }
}
