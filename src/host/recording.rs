use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{Host, HostError, HostValue, Verb};

/// One boundary call as seen by a [`RecordingHost`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostCall {
    pub verb: Verb,
    pub args: Vec<HostValue>,
}

impl HostCall {
    pub fn new(verb: Verb, args: Vec<HostValue>) -> Self {
        Self { verb, args }
    }
}

/// Forwards every call to an inner host and keeps a log of what crossed.
pub struct RecordingHost {
    inner: Rc<dyn Host>,
    calls: RefCell<Vec<HostCall>>,
}

impl RecordingHost {
    pub fn new(inner: Rc<dyn Host>) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.borrow().clone()
    }

    pub fn take_calls(&self) -> Vec<HostCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }
}

impl Host for RecordingHost {
    fn call(&self, verb: Verb, args: Vec<HostValue>) -> Result<HostValue, HostError> {
        // Failed calls are recorded too.
        self.calls
            .borrow_mut()
            .push(HostCall::new(verb, args.clone()));
        self.inner.call(verb, args)
    }
}
