//! Generic name-to-handler dispatch table, decoupling transport event names
//! from the code that reacts to them. Not tied to any particular game.

use std::collections::HashMap;

use crate::games::{GameContext, GameEvent};

/// Handler signature: a plain function mutating the routed-to target.
pub type EventHandler<S> = fn(&mut S, &GameContext<'_>, &GameEvent<'_>);

/// Dispatch table from event name to handler.
pub struct EventRouter<S> {
    handlers: HashMap<&'static str, EventHandler<S>>,
}

impl<S> Default for EventRouter<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> EventRouter<S> {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for an event name, replacing any previous one.
    pub fn register(&mut self, name: &'static str, handler: EventHandler<S>) {
        self.handlers.insert(name, handler);
    }

    /// Invoke the handler registered for `event.name`, if any. Returns
    /// whether a handler was found.
    pub fn dispatch(&self, target: &mut S, ctx: &GameContext<'_>, event: &GameEvent<'_>) -> bool {
        match self.handlers.get(event.name) {
            Some(handler) => {
                handler(target, ctx, event);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use uuid::Uuid;

    use super::*;
    use crate::{
        games::TimerScheduler,
        state::{connections::ConnectionRegistry, rooms::RoomManager},
    };

    #[derive(Default)]
    struct Counter {
        pings: usize,
    }

    fn bump(counter: &mut Counter, _ctx: &GameContext<'_>, _event: &GameEvent<'_>) {
        counter.pings += 1;
    }

    #[test]
    fn dispatch_routes_by_name_and_reports_misses() {
        let mut router = EventRouter::new();
        router.register("ping", bump);

        let rooms = RoomManager::new();
        let connections = ConnectionRegistry::new();
        let timers = TimerScheduler::detached();
        let ctx = GameContext {
            rooms: &rooms,
            connections: &connections,
            timers: &timers,
        };

        let mut counter = Counter::default();
        let payload = Value::Null;
        let ping = GameEvent {
            name: "ping",
            payload: &payload,
            connection_id: Uuid::new_v4(),
        };
        let pong = GameEvent {
            name: "pong",
            payload: &payload,
            connection_id: Uuid::new_v4(),
        };

        assert!(router.dispatch(&mut counter, &ctx, &ping));
        assert!(router.dispatch(&mut counter, &ctx, &ping));
        assert!(!router.dispatch(&mut counter, &ctx, &pong));
        assert_eq!(counter.pings, 2);
    }
}
