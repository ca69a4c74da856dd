use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::debug;

use super::{handles_to_nodes, DispatchOutcome, DomContext, Event, ShimError};
use crate::host::{Handle, HostValue, Verb};

/// Proxy for one host-side node.
///
/// Nodes are cheap wrappers: several may exist for the same handle, and they
/// compare equal whenever their handles do.
#[derive(Clone)]
pub struct Node {
    handle: Handle,
    context: Rc<DomContext>,
}

impl Node {
    pub(crate) fn new(handle: Handle, context: Rc<DomContext>) -> Self {
        Self { handle, context }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Element children, re-read from the host on every call.
    pub fn children(&self) -> Result<Vec<Node>, ShimError> {
        let verb = Verb::GetChildren;
        let reply = self.context.call(verb, vec![self.handle.into()])?;
        let handles = DomContext::expect_handles(verb, reply)?;
        Ok(handles_to_nodes(&self.context, handles))
    }

    /// Raw attribute value as the host reports it.
    pub fn get_attribute(&self, name: &str) -> Result<HostValue, ShimError> {
        self.context
            .call(Verb::GetAttribute, vec![self.handle.into(), name.into()])
    }

    /// Replace the node's content with `value`, coerced to a string first.
    pub fn set_inner_html(&self, value: impl Into<HostValue>) -> Result<(), ShimError> {
        let markup = value.into().coerce_to_string()?;
        self.context
            .call(Verb::InnerHtmlSet, vec![self.handle.into(), markup.into()])?;
        Ok(())
    }

    /// Register `listener` for `event_type`. Stays local; the host is not told.
    pub fn add_event_listener<F>(&self, event_type: &str, listener: F)
    where
        F: Fn(&Node, &mut Event) -> Result<(), ShimError> + 'static,
    {
        self.context
            .listeners
            .borrow_mut()
            .add(self.handle, event_type, Rc::new(listener));
    }

    /// Run every listener registered for this handle and the event's type.
    ///
    /// Listeners run in registration order and all of them run even after one
    /// calls [`Event::stop_propagation`]; the flag is only reported back. The
    /// registry is re-read between listeners, so a listener added during the
    /// dispatch to the same bucket runs as well. The first listener error
    /// ends the dispatch.
    pub fn dispatch_event(&self, mut event: Event) -> Result<DispatchOutcome, ShimError> {
        let mut index = 0;
        loop {
            let listener =
                self.context
                    .listeners
                    .borrow()
                    .listener_at(self.handle, event.event_type(), index);
            let Some(listener) = listener else {
                break;
            };
            listener(self, &mut event)?;
            index += 1;
        }

        debug!(
            target: "domshim",
            handle = %self.handle,
            event_type = event.event_type(),
            listeners = index,
            "dispatched event"
        );
        Ok(event.outcome())
    }

    /// Append `child` and hand the same reference back.
    pub fn append_child<'a>(&self, child: &'a Node) -> Result<&'a Node, ShimError> {
        self.context
            .call(Verb::AppendChild, vec![self.handle.into(), child.handle.into()])?;
        Ok(child)
    }

    /// Insert `new_node` before `reference`, or append when there is none.
    pub fn insert_before<'a>(
        &self,
        new_node: &'a Node,
        reference: Option<&Node>,
    ) -> Result<&'a Node, ShimError> {
        let Some(reference) = reference else {
            return self.append_child(new_node);
        };
        self.context.call(
            Verb::InsertBefore,
            vec![
                self.handle.into(),
                new_node.handle.into(),
                reference.handle.into(),
            ],
        )?;
        Ok(new_node)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("handle", &self.handle).finish()
    }
}
