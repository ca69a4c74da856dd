use serde::{Deserialize, Serialize};

/// One event on its way through a dispatch.
///
/// Both flags only move one way: `do_default` can be cleared and
/// `stop_propagation` can be set, never the reverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    event_type: String,
    do_default: bool,
    stop_propagation: bool,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            do_default: true,
            stop_propagation: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn prevent_default(&mut self) {
        self.do_default = false;
    }

    pub fn stop_propagation(&mut self) {
        self.stop_propagation = true;
    }

    pub fn do_default(&self) -> bool {
        self.do_default
    }

    pub fn propagation_stopped(&self) -> bool {
        self.stop_propagation
    }

    pub(crate) fn outcome(&self) -> DispatchOutcome {
        DispatchOutcome {
            do_default: self.do_default,
            stop_propagation: self.stop_propagation,
        }
    }
}

/// Final flags of a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub do_default: bool,
    pub stop_propagation: bool,
}

impl Default for DispatchOutcome {
    fn default() -> Self {
        Self {
            do_default: true,
            stop_propagation: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_only_move_one_way() {
        let mut event = Event::new("click");
        assert_eq!(event.outcome(), DispatchOutcome::default());

        event.stop_propagation();
        event.prevent_default();
        event.prevent_default();
        event.stop_propagation();
        assert!(!event.do_default());
        assert!(event.propagation_stopped());
        assert_eq!(
            event.outcome(),
            DispatchOutcome {
                do_default: false,
                stop_propagation: true
            }
        );
    }
}
