use std::rc::Rc;

use super::{DomContext, ShimError};
use crate::host::{HostValue, Verb};

/// Forwards log calls to the host as-is.
#[derive(Clone)]
pub struct Console {
    context: Rc<DomContext>,
}

impl Console {
    pub(crate) fn new(context: Rc<DomContext>) -> Self {
        Self { context }
    }

    pub fn log(&self, value: impl Into<HostValue>) -> Result<(), ShimError> {
        self.context.call(Verb::Log, vec![value.into()])?;
        Ok(())
    }
}
