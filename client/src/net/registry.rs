//! Ordered listener registries shared by the connection and dispatcher.
//!
//! DESIGN
//! ======
//! Each registry maps a key (wire type, or `()` for state listeners) to the
//! handles subscribed under it, in subscription order. Delivery iterates a
//! snapshot of the handles, so listeners may subscribe or unsubscribe while
//! an event is being delivered without touching the live collection.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use crate::net::error::HandlerResult;

/// Opaque id of one subscription within a registry.
pub type HandleId = u64;

/// Listeners keyed by `K`, delivered in subscription order.
pub struct Registry<K, F: ?Sized> {
    next_id: Cell<HandleId>,
    entries: RefCell<BTreeMap<K, Vec<(HandleId, Rc<F>)>>>,
}

impl<K: Ord + Clone, F: ?Sized> Default for Registry<K, F> {
    fn default() -> Self {
        Self { next_id: Cell::new(1), entries: RefCell::new(BTreeMap::new()) }
    }
}

impl<K: Ord + Clone, F: ?Sized> Registry<K, F> {
    /// Append `listener` under `key`.
    pub fn insert(&self, key: K, listener: Rc<F>) -> HandleId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().entry(key).or_default().push((id, listener));
        id
    }

    /// Remove exactly the handle `id` under `key`. Returns whether it existed.
    pub fn remove(&self, key: &K, id: HandleId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let Some(list) = entries.get_mut(key) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            entries.remove(key);
        }
        removed
    }

    /// Listeners under `key`, in subscription order.
    pub fn snapshot(&self, key: &K) -> Vec<Rc<F>> {
        self.entries
            .borrow()
            .get(key)
            .map(|list| list.iter().map(|(_, f)| Rc::clone(f)).collect())
            .unwrap_or_default()
    }

    /// Number of listeners under `key`.
    pub fn count(&self, key: &K) -> usize {
        self.entries.borrow().get(key).map_or(0, Vec::len)
    }
}

/// Handle returned by every `on*` registration.
///
/// Call [`Subscription::unsubscribe`] to stop delivery. Dropping the handle
/// without calling it leaves the listener registered.
#[must_use = "dropping a Subscription keeps the listener registered; call unsubscribe() to remove it"]
pub struct Subscription {
    teardown: Vec<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Subscription that removes handle `id` under `key` from `registry`.
    pub(crate) fn for_handle<K, F>(registry: &Rc<Registry<K, F>>, key: K, id: HandleId) -> Self
    where
        K: Ord + Clone + 'static,
        F: ?Sized + 'static,
    {
        let registry: Weak<Registry<K, F>> = Rc::downgrade(registry);
        Self {
            teardown: vec![Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.remove(&key, id);
                }
            })],
        }
    }

    /// Combine several subscriptions into one that tears all of them down.
    pub fn combine(parts: impl IntoIterator<Item = Subscription>) -> Self {
        Self {
            teardown: parts.into_iter().flat_map(|part| part.teardown).collect(),
        }
    }

    /// Remove every listener this subscription covers.
    pub fn unsubscribe(self) {
        for teardown in self.teardown {
            teardown();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("handles", &self.teardown.len()).finish()
    }
}

/// Run one listener, logging and swallowing its error or panic.
///
/// Returns `true` when the listener completed successfully.
pub(crate) fn invoke_isolated(context: &str, listener: impl FnOnce() -> HandlerResult) -> bool {
    match catch_unwind(AssertUnwindSafe(listener)) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            log::error!("{context} listener failed: {err}");
            false
        }
        Err(panic) => {
            log::error!("{context} listener panicked: {}", panic_message(panic.as_ref()));
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
