use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::{Event, Node, ShimError};
use crate::host::Handle;

/// Callback invoked with the dispatching node as receiver.
pub type Listener = Rc<dyn Fn(&Node, &mut Event) -> Result<(), ShimError>>;

/// Listeners keyed by node handle, then event type.
///
/// Append-only: buckets are created on first registration and never removed,
/// and listeners run in the order they were added.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: HashMap<Handle, HashMap<String, Vec<Listener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handle: Handle, event_type: &str, listener: Listener) {
        self.entries
            .entry(handle)
            .or_default()
            .entry(event_type.to_string())
            .or_default()
            .push(listener);
    }

    /// The listener registered `index`-th for this handle and type.
    pub fn listener_at(&self, handle: Handle, event_type: &str, index: usize) -> Option<Listener> {
        self.entries
            .get(&handle)?
            .get(event_type)?
            .get(index)
            .cloned()
    }

    pub fn count(&self, handle: Handle, event_type: &str) -> usize {
        self.entries
            .get(&handle)
            .and_then(|types| types.get(event_type))
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (handle, types) in &self.entries {
            for (event_type, listeners) in types {
                map.entry(&(handle, event_type), &listeners.len());
            }
        }
        map.finish()
    }
}
