//! Typed publish/subscribe channel
//!
//! Indicators embed a [`Publisher`] for the events they emit; dependents
//! subscribe closures to it. Delivery is synchronous and happens on the
//! caller's thread, in subscription order.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// An event with a stable name, e.g. `"update"` or `"cross"`.
pub trait Event {
    /// Event name
    fn name(&self) -> &'static str;
}

/// Handle returned by [`Publisher::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Rc<dyn Fn(&E)>;

/// Event dispatcher for events of type `E`
pub struct Publisher<E> {
    handlers: RefCell<Vec<(SubscriptionId, Handler<E>)>>,
    next_id: Cell<u64>,
}

impl<E> Publisher<E> {
    /// Create new publisher with no subscribers
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Register a handler for every event
    pub fn subscribe(&self, handler: impl Fn(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        handlers.len() != before
    }

    /// Deliver `event` to every handler registered at the time of the call
    pub fn emit(&self, event: &E) {
        // Snapshot so handlers can (un)subscribe while being called.
        let handlers: Vec<Handler<E>> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }

    /// Number of registered handlers
    pub fn subscriber_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

impl<E: Event + 'static> Publisher<E> {
    /// Register a handler for events named `name` only
    pub fn on(&self, name: &'static str, handler: impl Fn(&E) + 'static) -> SubscriptionId {
        self.subscribe(move |event: &E| {
            if event.name() == name {
                handler(event);
            }
        })
    }
}

impl<E> Default for Publisher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Publisher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
