//! Proxies for `document`, `Node`, `Event` and `console` that forward every
//! operation to a [`Host`] and wrap the handles it replies with.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;
use tracing::trace;

use crate::host::{CoercionError, Handle, Host, HostError, HostValue, Verb};

mod console;
mod event;
mod listeners;
mod node;

pub use console::Console;
pub use event::{DispatchOutcome, Event};
pub use listeners::{Listener, ListenerRegistry};
pub use node::Node;

#[derive(Debug, Error)]
pub enum ShimError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error("host replied to `{verb}` with {found}, expected {expected}")]
    UnexpectedReply {
        verb: Verb,
        expected: &'static str,
        found: &'static str,
    },
}

/// State shared by a document and every node wrapped from it.
pub(crate) struct DomContext {
    host: Rc<dyn Host>,
    listeners: RefCell<ListenerRegistry>,
}

impl DomContext {
    fn call(&self, verb: Verb, args: Vec<HostValue>) -> Result<HostValue, ShimError> {
        trace!(target: "domshim", %verb, args = args.len(), "host call");
        Ok(self.host.call(verb, args)?)
    }

    fn expect_handle(verb: Verb, reply: HostValue) -> Result<Handle, ShimError> {
        match reply {
            HostValue::Handle(handle) => Ok(handle),
            other => Err(ShimError::UnexpectedReply {
                verb,
                expected: "a node handle",
                found: other.kind(),
            }),
        }
    }

    fn expect_handles(verb: Verb, reply: HostValue) -> Result<Vec<Handle>, ShimError> {
        match reply {
            HostValue::List(items) => items
                .into_iter()
                .map(|item| match item {
                    HostValue::Handle(handle) => Ok(handle),
                    other => Err(ShimError::UnexpectedReply {
                        verb,
                        expected: "a list of node handles",
                        found: other.kind(),
                    }),
                })
                .collect(),
            other => Err(ShimError::UnexpectedReply {
                verb,
                expected: "a list of node handles",
                found: other.kind(),
            }),
        }
    }
}

fn handles_to_nodes(context: &Rc<DomContext>, handles: Vec<Handle>) -> Vec<Node> {
    handles
        .into_iter()
        .map(|handle| Node::new(handle, Rc::clone(context)))
        .collect()
}

/// Entry point for script-facing DOM access.
///
/// Owns the listener registry for its nodes; every [`Node`] wrapped from this
/// document (directly or through another node) shares it.
#[derive(Clone)]
pub struct Document {
    context: Rc<DomContext>,
}

impl Document {
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self {
            context: Rc::new(DomContext {
                host,
                listeners: RefCell::new(ListenerRegistry::new()),
            }),
        }
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, ShimError> {
        let verb = Verb::QuerySelectorAll;
        let reply = self.context.call(verb, vec![selector.into()])?;
        let handles = DomContext::expect_handles(verb, reply)?;
        Ok(self.handles_to_nodes(handles))
    }

    pub fn create_element(&self, tag: &str) -> Result<Node, ShimError> {
        let verb = Verb::CreateElement;
        let reply = self.context.call(verb, vec![tag.into()])?;
        let handle = DomContext::expect_handle(verb, reply)?;
        Ok(self.wrap(handle))
    }

    /// Wrap each handle into a fresh node, keeping order.
    pub fn handles_to_nodes(&self, handles: Vec<Handle>) -> Vec<Node> {
        handles_to_nodes(&self.context, handles)
    }

    pub fn wrap(&self, handle: Handle) -> Node {
        Node::new(handle, Rc::clone(&self.context))
    }

    pub fn console(&self) -> Console {
        Console::new(Rc::clone(&self.context))
    }

    /// Number of listeners registered for `event_type` on `handle`.
    pub fn listener_count(&self, handle: Handle, event_type: &str) -> usize {
        self.context.listeners.borrow().count(handle, event_type)
    }
}
