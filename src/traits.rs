//! Shared trait abstractions for common patterns
//!
//! Components that emit notifications compose an [`Observers`] registry and
//! expose it through [`Evented`]. Each component owns a closed event enum,
//! so listeners match on variants instead of string event names.

/// Identifier handed out when a listener is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener<E> = Box<dyn FnMut(&E) + Send>;

/// Listener registry for a single event type
pub struct Observers<E> {
    listeners: Vec<(ListenerId, Listener<E>)>,
    next_id: u64,
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a listener, returning the id used to remove it again
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if the id was unknown.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Deliver an event to every listener in registration order
    pub fn notify(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Trait for components that emit notifications
pub trait Evented {
    type Event;

    /// Access the component's listener registry
    fn observers(&mut self) -> &mut Observers<Self::Event>;

    /// Subscribe to the component's events
    fn on<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Self::Event) + Send + 'static,
    {
        self.observers().subscribe(listener)
    }

    /// Unsubscribe a listener previously registered with [`Evented::on`]
    fn off(&mut self, id: ListenerId) -> bool {
        self.observers().unsubscribe(id)
    }

    /// Fire an event to all listeners
    fn fire(&mut self, event: Self::Event) {
        self.observers().notify(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_notify_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut observers: Observers<u32> = Observers::new();

        let first = Arc::clone(&seen);
        observers.subscribe(move |e| first.lock().unwrap().push(("first", *e)));
        let second = Arc::clone(&seen);
        observers.subscribe(move |e| second.lock().unwrap().push(("second", *e)));

        observers.notify(&7);
        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Arc::new(Mutex::new(0));
        let mut observers: Observers<()> = Observers::new();

        let counter = Arc::clone(&count);
        let id = observers.subscribe(move |_| *counter.lock().unwrap() += 1);
        observers.notify(&());
        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        observers.notify(&());

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(observers.is_empty());
    }
}
