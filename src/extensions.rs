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

use crate::error::{HostResult, ScriptLoadError};
use crate::notification::NotificationCenter;
use crate::peer::PeerId;
use crate::protocol::MessageSerializer;

pub type ExtensionError = Box<dyn std::error::Error + Send + Sync>;

/// Shared per-tick context handed to services and scripts: the
/// notification center to enqueue outgoing traffic, and a snapshot of
/// currently connected peer ids.
///
/// `request_unload` is only wired up for script invocations; services
/// have no unload lifecycle, so it is `None` there and the call becomes
/// a no-op.
pub struct ExtensionContext<'a, S: MessageSerializer> {
    pub notifications: &'a mut NotificationCenter<S>,
    pub peers: &'a [PeerId],
    request_unload: Option<&'a mut bool>,
}

impl<'a, S: MessageSerializer> ExtensionContext<'a, S> {
    fn for_service(notifications: &'a mut NotificationCenter<S>, peers: &'a [PeerId]) -> Self {
        Self {
            notifications,
            peers,
            request_unload: None,
        }
    }

    fn for_script(
        notifications: &'a mut NotificationCenter<S>,
        peers: &'a [PeerId],
        unload: &'a mut bool,
    ) -> Self {
        Self {
            notifications,
            peers,
            request_unload: Some(unload),
        }
    }

    /// Called by an [`ScriptKind::Active`] script's `tick` to signal the
    /// `Unloading` event: the script remains enumerable for the rest of
    /// this tick and is purged at the next tick boundary.
    pub fn request_unload(&mut self) {
        if let Some(flag) = self.request_unload.as_deref_mut() {
            *flag = true;
        }
    }
}

/// Long-lived extension, constructed once at startup and bound for the
/// application's lifetime. `tick` is optional; the default no-op makes
/// pure request/notification-driven services trivial to write.
pub trait Service<S: MessageSerializer>: Send {
    fn tick(&mut self, _ctx: &mut ExtensionContext<S>) -> Result<(), ExtensionError> {
        Ok(())
    }
}

/// `Vec`-backed registry of services, ticked in registration order after
/// request handling each cycle.
pub struct ServiceHost<S: MessageSerializer> {
    services: Vec<Box<dyn Service<S>>>,
}

impl<S: MessageSerializer> ServiceHost<S> {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
        }
    }

    pub fn register(&mut self, service: impl Service<S> + 'static) {
        self.services.push(Box::new(service));
    }

    /// Ticks every service. One service's failure is isolated and never
    /// skips a sibling.
    pub fn tick_all(&mut self, notifications: &mut NotificationCenter<S>, peers: &[PeerId]) {
        for service in &mut self.services {
            let mut ctx = ExtensionContext::for_service(&mut *notifications, peers);

            if let Err(e) = service.tick(&mut ctx) {
                warn!("Service tick failed: {}", e);
            }
        }
    }
}

impl<S: MessageSerializer> Default for ServiceHost<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Which of the three script shapes a registration is. Rust has no
/// reflection-based introspection of "does this type also implement a
/// second trait", so the kind is a discriminant the script itself
/// reports rather than something the loader infers structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// `Invoke()` runs once and the host unloads it immediately after.
    Command,
    /// `Tick()` runs every cycle until unloaded.
    Active,
    /// No periodic hook; exists only to hold references/subscriptions.
    Plain,
}

/// Command/active script extension with load/unload lifecycle.
pub trait Script<S: MessageSerializer>: Send {
    fn kind(&self) -> ScriptKind {
        ScriptKind::Plain
    }

    /// Runs once for a [`ScriptKind::Command`] script.
    fn invoke(&mut self, _ctx: &mut ExtensionContext<S>) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Runs every tick for a [`ScriptKind::Active`] script.
    fn tick(&mut self, _ctx: &mut ExtensionContext<S>) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Fired once when the loader unregisters this script, whether
    /// because it requested unload, a command finished, or the
    /// application is shutting down.
    fn on_unload(&mut self) -> Result<(), ExtensionError> {
        Ok(())
    }
}

struct ScriptEntry<S: MessageSerializer> {
    script: Box<dyn Script<S>>,
    unload_requested: bool,
}

/// Dynamic registry of scripts. Scripts are constructed on demand
/// through [`ScriptHost::load`], which validates that construction
/// succeeded (the closest a statically-typed host gets to "concrete,
/// non-abstract, implements the marker") before registering.
pub struct ScriptHost<S: MessageSerializer> {
    active: HashMap<u32, ScriptEntry<S>>,
    pending: Vec<(u32, ScriptEntry<S>)>,
    to_remove: Vec<u32>,
    next_id: u32,
}

impl<S: MessageSerializer> ScriptHost<S> {
    pub fn new() -> Self {
        Self {
            active: HashMap::new(),
            pending: Vec::new(),
            to_remove: Vec::new(),
            next_id: 1,
        }
    }

    /// Constructs a script via `factory` and registers it. Registration
    /// made while `tick_all` is iterating (a script loading another
    /// script) is deferred to the next tick.
    pub fn load<T, F>(&mut self, factory: F) -> HostResult<u32>
    where
        T: Script<S> + 'static,
        F: FnOnce() -> Result<T, ScriptLoadError>,
    {
        let script = factory().map_err(|e| crate::error::HostError::InvalidScriptType(e.to_string()))?;

        let id = self.next_id;
        self.next_id += 1;

        self.pending.push((
            id,
            ScriptEntry {
                script: Box::new(script),
                unload_requested: false,
            },
        ));

        Ok(id)
    }

    /// Runs a [`ScriptKind::Command`] script's `invoke` once, then
    /// unloads it immediately -- this is a direct call outside the
    /// regular tick iteration, so there is no reentrancy concern forcing
    /// a deferral.
    pub fn invoke(
        &mut self,
        id: u32,
        notifications: &mut NotificationCenter<S>,
        peers: &[PeerId],
    ) {
        if let Some(mut entry) = self.active.remove(&id) {
            let mut unload = false;
            let mut ctx = ExtensionContext::for_script(notifications, peers, &mut unload);

            if let Err(e) = entry.script.invoke(&mut ctx) {
                warn!("Command script invoke failed (id = {}): {}", id, e);
            }

            if let Err(e) = entry.script.on_unload() {
                warn!("Script on_unload failed (id = {}): {}", id, e);
            }
        } else {
            warn!("Invoke requested for unknown script (id = {})", id);
        }
    }

    /// Ticks every [`ScriptKind::Active`] script in registration order.
    /// One script's failure is isolated.
    pub fn tick_all(&mut self, notifications: &mut NotificationCenter<S>, peers: &[PeerId]) {
        for id in self.to_remove.drain(..) {
            if let Some(mut entry) = self.active.remove(&id) {
                if let Err(e) = entry.script.on_unload() {
                    warn!("Script on_unload failed (id = {}): {}", id, e);
                }
            }
        }

        for (id, entry) in self.pending.drain(..) {
            self.active.insert(id, entry);
        }

        let ids: Vec<u32> = self.active.keys().copied().collect();

        for id in ids {
            let entry = match self.active.get_mut(&id) {
                Some(entry) => entry,
                None => continue,
            };

            if entry.script.kind() != ScriptKind::Active {
                continue;
            }

            let mut unload = entry.unload_requested;
            let mut ctx = ExtensionContext::for_script(&mut *notifications, peers, &mut unload);

            if let Err(e) = entry.script.tick(&mut ctx) {
                warn!("Script tick failed (id = {}): {}", id, e);
            }

            entry.unload_requested = unload;

            if unload {
                self.to_remove.push(id);
            }
        }
    }

    /// Marks a script to be unloaded at the next tick boundary; it
    /// remains enumerable via [`ScriptHost::ids`] until then.
    pub fn request_unload(&mut self, id: u32) {
        if let Some(entry) = self.active.get_mut(&id) {
            entry.unload_requested = true;
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.active.keys().copied()
    }

    /// Unloads every live script, swallowing per-script errors. Called
    /// once during `ShuttingDown` before `start()` returns.
    pub fn unload_all(&mut self) {
        self.pending.clear();

        for (_, mut entry) in self.active.drain() {
            if let Err(e) = entry.script.on_unload() {
                warn!("Script on_unload failed during shutdown: {}", e);
            }
        }

        self.to_remove.clear();
    }
}

impl<S: MessageSerializer> Default for ScriptHost<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::BytesSerializer;

    struct Failing;

    impl Service<BytesSerializer> for Failing {
        fn tick(&mut self, _ctx: &mut ExtensionContext<BytesSerializer>) -> Result<(), ExtensionError> {
            Err("boom".into())
        }
    }

    struct Counting(std::sync::Arc<std::sync::atomic::AtomicU32>);

    impl Service<BytesSerializer> for Counting {
        fn tick(&mut self, _ctx: &mut ExtensionContext<BytesSerializer>) -> Result<(), ExtensionError> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn one_service_failure_does_not_skip_its_sibling() {
        let count = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));

        let mut host: ServiceHost<BytesSerializer> = ServiceHost::new();
        host.register(Failing);
        host.register(Counting(count.clone()));

        let mut notifications = NotificationCenter::new();
        host.tick_all(&mut notifications, &[]);

        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    struct Loader;

    impl Script<BytesSerializer> for Loader {
        fn kind(&self) -> ScriptKind {
            ScriptKind::Active
        }

        fn tick(&mut self, ctx: &mut ExtensionContext<BytesSerializer>) -> Result<(), ExtensionError> {
            ctx.request_unload();
            Ok(())
        }
    }

    #[test]
    fn registration_made_mid_tick_is_deferred() {
        let mut host: ScriptHost<BytesSerializer> = ScriptHost::new();
        let mut notifications = NotificationCenter::new();

        host.load::<Loader, _>(|| Ok(Loader)).unwrap();
        assert_eq!(host.ids().count(), 0, "pending script not yet active");

        host.tick_all(&mut notifications, &[]);
        assert_eq!(host.ids().count(), 1, "promoted to active after one tick");

        host.tick_all(&mut notifications, &[]);
        assert_eq!(host.ids().count(), 0, "unload requested last tick takes effect this tick");
    }

    #[test]
    fn command_script_invokes_once_then_unloads_immediately() {
        let mut host: ScriptHost<BytesSerializer> = ScriptHost::new();
        let mut notifications = NotificationCenter::new();

        let id = host.load::<Loader, _>(|| Ok(Loader)).unwrap();
        host.tick_all(&mut notifications, &[]);

        host.invoke(id, &mut notifications, &[]);
        assert_eq!(host.ids().count(), 0);
    }
}
