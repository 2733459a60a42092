//! Single-consumer notification slots.
//!
//! Each event class (command issued, fault raised, alignment computed,
//! liveness timeout) has exactly one registered consumer. Registration and
//! notification are lock-free: the callback lives behind an `ArcSwapOption`,
//! so a notifier never waits on a concurrent `set`.

use arc_swap::ArcSwapOption;
use std::fmt;
use std::sync::Arc;

type Callback<E> = Box<dyn Fn(&E) + Send + Sync>;

/// One replaceable callback for events of type `E`.
pub struct ListenerSlot<E: ?Sized> {
    slot: ArcSwapOption<Callback<E>>,
}

impl<E: ?Sized> ListenerSlot<E> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
        }
    }

    /// Register `callback`, replacing any previous one.
    pub fn set<F>(&self, callback: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.slot.store(Some(Arc::new(Box::new(callback))));
    }

    /// Remove the registered callback.
    pub fn clear(&self) {
        self.slot.store(None);
    }

    /// Whether a callback is registered.
    pub fn is_set(&self) -> bool {
        self.slot.load().is_some()
    }

    /// Invoke the registered callback, if any.
    ///
    /// The callback is cloned out of the slot first so a listener that
    /// replaces itself does not observe a torn slot.
    pub fn notify(&self, event: &E) {
        if let Some(callback) = self.slot.load_full() {
            callback(event);
        }
    }
}

impl<E: ?Sized> Default for ListenerSlot<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> fmt::Debug for ListenerSlot<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSlot")
            .field("registered", &self.is_set())
            .finish()
    }
}
