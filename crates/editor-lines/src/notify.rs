//! Subscription lists for change notifications.
//!
//! Components that publish events ([`ChangeTracker`](crate::change_tracker::ChangeTracker),
//! [`FoldingModel`](crate::folding::FoldingModel)) own a [`Subscribers`] list. Callbacks are
//! registered with `subscribe`, which hands back a [`SubscriptionId`] that can later be passed to
//! `unsubscribe`.

use std::fmt;

/// Handle identifying a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Boxed notification callback.
pub type Callback<E> = Box<dyn FnMut(&E) + Send>;

/// An ordered list of callbacks for events of type `E`.
pub struct Subscribers<E> {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Subscribers<E> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            callbacks: Vec::new(),
        }
    }

    /// Register a callback.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&E) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() != before
    }

    /// Invoke every callback, in registration order.
    pub fn notify(&mut self, event: &E) {
        for (_, callback) in &mut self.callbacks {
            callback(event);
        }
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Returns `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Drop every callback.
    pub fn clear(&mut self) {
        self.callbacks.clear();
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_subscribe_notify_unsubscribe() {
        let mut subscribers = Subscribers::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        let id = subscribers.subscribe(move |event| {
            seen_clone.lock().unwrap().push(*event);
        });

        subscribers.notify(&1);
        assert!(subscribers.unsubscribe(id));
        assert!(!subscribers.unsubscribe(id));
        subscribers.notify(&2);

        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert!(subscribers.is_empty());
    }
}
