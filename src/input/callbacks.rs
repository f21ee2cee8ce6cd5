//! Per-control subscriber sets for button and axis callbacks.
//!
//! Handlers are stored behind an [Arc] so that dispatch can take a snapshot
//! of a set and invoke it without holding the registry lock. This allows a
//! handler to subscribe or unsubscribe (including itself) while it runs.
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    sync::Arc,
};

/// Called when a button is pressed or released
pub type ButtonHandler = Arc<dyn Fn() + Send + Sync>;
/// Called with the new pressed state whenever a button changes
pub type ChangedHandler = Arc<dyn Fn(bool) + Send + Sync>;
/// Called with the new position whenever an axis moves
pub type MovedHandler = Arc<dyn Fn(f64) + Send + Sync>;

/// Identifies a single subscription. Ids are unique for the lifetime of a
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Ordered set of handlers. Handlers are invoked in subscription order.
pub struct HandlerSet<H> {
    handlers: BTreeMap<HandlerId, H>,
}

impl<H: Clone> HandlerSet<H> {
    fn insert(&mut self, id: HandlerId, handler: H) {
        self.handlers.insert(id, handler);
    }

    fn remove(&mut self, id: HandlerId) -> bool {
        self.handlers.remove(&id).is_some()
    }

    /// Copy of the current handlers
    pub fn snapshot(&self) -> Vec<H> {
        self.handlers.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<H> Default for HandlerSet<H> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }
}

impl<H> Debug for HandlerSet<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

/// The three subscriber sets of a single button
#[derive(Debug, Default)]
pub struct ButtonHandlers {
    pub pressed: HandlerSet<ButtonHandler>,
    pub released: HandlerSet<ButtonHandler>,
    pub changed: HandlerSet<ChangedHandler>,
}

#[derive(Debug, Default)]
pub struct CallbackRegistry {
    next_id: u64,
    buttons: HashMap<u8, ButtonHandlers>,
    axes: HashMap<u8, HandlerSet<MovedHandler>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Replace every subscriber set of the given button with empty sets
    pub fn reset_button(&mut self, index: u8) {
        self.buttons.insert(index, ButtonHandlers::default());
    }

    /// Replace the subscriber set of the given axis with an empty set
    pub fn reset_axis(&mut self, index: u8) {
        self.axes.insert(index, HandlerSet::default());
    }

    /// Remove every subscription on every control
    pub fn clear(&mut self) {
        for handlers in self.buttons.values_mut() {
            *handlers = ButtonHandlers::default();
        }
        for handlers in self.axes.values_mut() {
            *handlers = HandlerSet::default();
        }
    }

    pub fn button(&self, index: u8) -> Option<&ButtonHandlers> {
        self.buttons.get(&index)
    }

    pub fn axis(&self, index: u8) -> Option<&HandlerSet<MovedHandler>> {
        self.axes.get(&index)
    }

    pub fn add_pressed(&mut self, index: u8, handler: ButtonHandler) -> HandlerId {
        let id = self.next_id();
        self.buttons.entry(index).or_default().pressed.insert(id, handler);
        id
    }

    pub fn add_released(&mut self, index: u8, handler: ButtonHandler) -> HandlerId {
        let id = self.next_id();
        self.buttons.entry(index).or_default().released.insert(id, handler);
        id
    }

    pub fn add_changed(&mut self, index: u8, handler: ChangedHandler) -> HandlerId {
        let id = self.next_id();
        self.buttons.entry(index).or_default().changed.insert(id, handler);
        id
    }

    pub fn add_moved(&mut self, index: u8, handler: MovedHandler) -> HandlerId {
        let id = self.next_id();
        self.axes.entry(index).or_default().insert(id, handler);
        id
    }

    pub fn remove_pressed(&mut self, index: u8, id: HandlerId) -> bool {
        self.buttons
            .get_mut(&index)
            .is_some_and(|handlers| handlers.pressed.remove(id))
    }

    pub fn remove_released(&mut self, index: u8, id: HandlerId) -> bool {
        self.buttons
            .get_mut(&index)
            .is_some_and(|handlers| handlers.released.remove(id))
    }

    pub fn remove_changed(&mut self, index: u8, id: HandlerId) -> bool {
        self.buttons
            .get_mut(&index)
            .is_some_and(|handlers| handlers.changed.remove(id))
    }

    pub fn remove_moved(&mut self, index: u8, id: HandlerId) -> bool {
        self.axes
            .get_mut(&index)
            .is_some_and(|handlers| handlers.remove(id))
    }

    pub fn pressed_snapshot(&self, index: u8) -> Vec<ButtonHandler> {
        self.buttons
            .get(&index)
            .map(|h| h.pressed.snapshot())
            .unwrap_or_default()
    }

    pub fn released_snapshot(&self, index: u8) -> Vec<ButtonHandler> {
        self.buttons
            .get(&index)
            .map(|h| h.released.snapshot())
            .unwrap_or_default()
    }

    pub fn changed_snapshot(&self, index: u8) -> Vec<ChangedHandler> {
        self.buttons
            .get(&index)
            .map(|h| h.changed.snapshot())
            .unwrap_or_default()
    }

    pub fn moved_snapshot(&self, index: u8) -> Vec<MovedHandler> {
        self.axes
            .get(&index)
            .map(|h| h.snapshot())
            .unwrap_or_default()
    }
}
