//! Synchronous, type-indexed publish/subscribe.
//!
//! Handlers are grouped by event type and run in the order they subscribed,
//! inside `EventBus::emit_event`. All handlers see the same `&mut E`, so a
//! handler observes whatever earlier handlers wrote to the event.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::rc::{Rc, Weak};

type Handler<E> = Box<dyn FnMut(&mut E)>;

struct HandlerList<E: 'static> {
    handlers: Vec<Handler<E>>,
}

/// A bus which routes events to handlers by event type.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<TypeId, Box<dyn Any>>,
}

impl EventBus {
    /// Create an event bus with no subscribers.
    pub fn new() -> EventBus {
        EventBus::default()
    }

    fn handlers<E: 'static>(&self) -> Option<&HandlerList<E>> {
        self.subscribers.get(&TypeId::of::<E>())
            .and_then(|list| list.downcast_ref::<HandlerList<E>>())
    }

    fn handlers_mut<E: 'static>(&mut self) -> Option<&mut HandlerList<E>> {
        self.subscribers.get_mut(&TypeId::of::<E>())
            .and_then(|list| list.downcast_mut::<HandlerList<E>>())
    }

    /// Subscribe a handler to events of type `E`.
    ///
    /// The same handler may be subscribed more than once, in which case it
    /// runs once per subscription.
    pub fn subscribe_to_event<E: 'static>(&mut self, handler: impl FnMut(&mut E) + 'static) {
        let handler: Handler<E> = Box::new(handler);
        match self.handlers_mut::<E>() {
            Some(list) => list.handlers.push(handler),
            None => {
                self.subscribers.insert(TypeId::of::<E>(), Box::new(HandlerList {
                    handlers: vec![handler],
                }));
            }
        }

        tracing::trace!(event = type_name::<E>(), count = self.subscriber_count::<E>(), "subscribed to event");
    }

    /// Subscribe a method of a shared owner, usually a system.
    ///
    /// The bus only keeps a weak reference to the owner. When the event is
    /// emitted after the owner has been dropped, or while the owner is
    /// borrowed, the callback is skipped.
    ///
    /// ```rust,ignore
    /// let damage = registry.add_system(DamageSystem::new())?;
    /// bus.subscribe_bound(&damage, DamageSystem::on_collision);
    /// ```
    pub fn subscribe_bound<E: 'static, O: 'static>(
        &mut self,
        owner: &Rc<RefCell<O>>,
        callback: fn(&mut O, &mut E),
    ) {
        let owner: Weak<RefCell<O>> = Rc::downgrade(owner);
        self.subscribe_to_event(move |event: &mut E| {
            let owner = match owner.upgrade() {
                Some(owner) => owner,
                None => {
                    tracing::trace!(event = type_name::<E>(), owner = type_name::<O>(), "skipped handler of dropped owner");
                    return;
                }
            };

            let borrowed = owner.try_borrow_mut();
            match borrowed {
                Ok(mut owner) => callback(&mut owner, event),
                Err(_) => {
                    tracing::warn!(event = type_name::<E>(), owner = type_name::<O>(), "skipped handler of borrowed owner");
                }
            };
        });
    }

    /// Deliver an event to every handler subscribed to its type.
    ///
    /// Returns the event once every handler has run.
    pub fn emit_event<E: 'static>(&mut self, mut event: E) -> E {
        if let Some(list) = self.handlers_mut::<E>() {
            tracing::trace!(event = type_name::<E>(), handlers = list.handlers.len(), "emitting event");
            for handler in list.handlers.iter_mut() {
                handler(&mut event);
            }
        }
        event
    }

    /// Remove every subscription.
    pub fn reset(&mut self) {
        tracing::trace!(event_types = self.subscribers.len(), "reset event bus");
        self.subscribers.clear();
    }

    /// Return the number of handlers subscribed to `E`.
    pub fn subscriber_count<E: 'static>(&self) -> usize {
        self.handlers::<E>().map_or(0, |list| list.handlers.len())
    }

    pub fn has_subscribers<E: 'static>(&self) -> bool {
        self.subscriber_count::<E>() > 0
    }
}

impl Debug for EventBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Default)]
    struct Collision {
        hits: Vec<&'static str>,
        damage: u32,
    }

    struct Ping;

    #[test]
    fn test_emit_order() {
        let mut bus = EventBus::new();
        bus.subscribe_to_event(|e: &mut Collision| {
            e.hits.push("h1");
            e.damage += 10;
        });
        bus.subscribe_to_event(|e: &mut Collision| {
            e.hits.push("h2");
            e.damage *= 2;
        });
        bus.subscribe_to_event(|e: &mut Collision| e.hits.push("h3"));
        assert_eq!(bus.subscriber_count::<Collision>(), 3);

        let event = bus.emit_event(Collision::default());
        assert_eq!(event.hits, vec!["h1", "h2", "h3"]);
        assert_eq!(event.damage, 20);
    }

    #[test]
    fn test_event_types_isolated() {
        let mut bus = EventBus::new();
        let pings = Rc::new(RefCell::new(0));

        let counter = pings.clone();
        bus.subscribe_to_event(move |_: &mut Ping| *counter.borrow_mut() += 1);

        let event = bus.emit_event(Collision::default());
        assert!(event.hits.is_empty());
        assert_eq!(*pings.borrow(), 0);

        bus.emit_event(Ping);
        bus.emit_event(Ping);
        assert_eq!(*pings.borrow(), 2);
        assert!(!bus.has_subscribers::<Collision>());
    }

    #[test]
    fn test_reset() {
        let mut bus = EventBus::new();
        let calls = Rc::new(RefCell::new(0));

        let counter = calls.clone();
        bus.subscribe_to_event(move |_: &mut Ping| *counter.borrow_mut() += 1);
        bus.reset();

        bus.emit_event(Ping);
        assert_eq!(*calls.borrow(), 0);
        assert!(!bus.has_subscribers::<Ping>());
    }

    #[test]
    fn test_bound_handlers() {
        #[derive(Default)]
        struct Scoreboard {
            damage: u32,
        }

        impl Scoreboard {
            fn on_collision(&mut self, event: &mut Collision) {
                self.damage += event.damage;
            }
        }

        let mut bus = EventBus::new();
        let board = Rc::new(RefCell::new(Scoreboard::default()));
        bus.subscribe_bound(&board, Scoreboard::on_collision);

        bus.emit_event(Collision { hits: vec![], damage: 5 });
        assert_eq!(board.borrow().damage, 5);

        // A borrowed owner is skipped rather than panicking.
        {
            let _guard = board.borrow();
            bus.emit_event(Collision { hits: vec![], damage: 5 });
        }
        assert_eq!(board.borrow().damage, 5);

        drop(board);
        bus.emit_event(Collision { hits: vec![], damage: 5 });
        assert_eq!(bus.subscriber_count::<Collision>(), 1);
    }
}
