use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod html;
mod recording;
mod value;

pub use html::HtmlHost;
pub use recording::{HostCall, RecordingHost};
pub use value::{CoercionError, HostValue};

/// Opaque identifier the host hands out for one of its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(pub u64);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operations understood by the boundary primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    #[serde(rename = "log")]
    Log,
    #[serde(rename = "querySelectorAll")]
    QuerySelectorAll,
    #[serde(rename = "create_element")]
    CreateElement,
    #[serde(rename = "get_children")]
    GetChildren,
    #[serde(rename = "getAttribute")]
    GetAttribute,
    #[serde(rename = "innerHTML_set")]
    InnerHtmlSet,
    #[serde(rename = "append_child")]
    AppendChild,
    #[serde(rename = "insert_before")]
    InsertBefore,
}

impl Verb {
    pub const ALL: [Verb; 8] = [
        Verb::Log,
        Verb::QuerySelectorAll,
        Verb::CreateElement,
        Verb::GetChildren,
        Verb::GetAttribute,
        Verb::InnerHtmlSet,
        Verb::AppendChild,
        Verb::InsertBefore,
    ];

    /// Name of the verb as it crosses the boundary.
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Log => "log",
            Verb::QuerySelectorAll => "querySelectorAll",
            Verb::CreateElement => "create_element",
            Verb::GetChildren => "get_children",
            Verb::GetAttribute => "getAttribute",
            Verb::InnerHtmlSet => "innerHTML_set",
            Verb::AppendChild => "append_child",
            Verb::InsertBefore => "insert_before",
        }
    }

    /// Number of leading arguments that are node handles.
    pub fn handle_arity(self) -> usize {
        match self {
            Verb::Log | Verb::QuerySelectorAll | Verb::CreateElement => 0,
            Verb::GetChildren | Verb::GetAttribute | Verb::InnerHtmlSet => 1,
            Verb::AppendChild => 2,
            Verb::InsertBefore => 3,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = HostError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str() == name)
            .ok_or_else(|| HostError::UnknownVerb(name.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown node handle {0}")]
    UnknownHandle(Handle),
    #[error("`{verb}` expects {expected} at argument {index}")]
    BadArguments {
        verb: Verb,
        index: usize,
        expected: &'static str,
    },
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
    #[error("node {child} is not a child of node {parent}")]
    NotAChild { parent: Handle, child: Handle },
    #[error("node {0} is not an element")]
    NotAnElement(Handle),
    #[error("unknown host verb `{0}`")]
    UnknownVerb(String),
    #[error("{0}")]
    Other(String),
}

/// The single synchronous call that crosses into the host document model.
///
/// Hosts are single-threaded and use interior mutability; every call runs to
/// completion before returning.
pub trait Host {
    fn call(&self, verb: Verb, args: Vec<HostValue>) -> Result<HostValue, HostError>;
}

/// Positional view over the arguments of one boundary call.
pub struct CallArgs<'a> {
    verb: Verb,
    values: &'a [HostValue],
}

impl<'a> CallArgs<'a> {
    pub fn new(verb: Verb, values: &'a [HostValue]) -> Self {
        Self { verb, values }
    }

    pub fn value(&self, index: usize) -> Result<&'a HostValue, HostError> {
        self.values.get(index).ok_or(HostError::BadArguments {
            verb: self.verb,
            index,
            expected: "a value",
        })
    }

    pub fn handle(&self, index: usize) -> Result<Handle, HostError> {
        match self.values.get(index) {
            Some(HostValue::Handle(handle)) => Ok(*handle),
            _ => Err(HostError::BadArguments {
                verb: self.verb,
                index,
                expected: "a node handle",
            }),
        }
    }

    pub fn string(&self, index: usize) -> Result<&'a str, HostError> {
        match self.values.get(index) {
            Some(HostValue::String(value)) => Ok(value.as_str()),
            _ => Err(HostError::BadArguments {
                verb: self.verb,
                index,
                expected: "a string",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_parse_from_wire_names() {
        for verb in Verb::ALL {
            assert_eq!(verb.as_str().parse::<Verb>().unwrap(), verb);
        }
        assert!(matches!(
            "remove_child".parse::<Verb>(),
            Err(HostError::UnknownVerb(name)) if name == "remove_child"
        ));
    }

    #[test]
    fn verb_serializes_as_wire_name() {
        let json = serde_json::to_string(&Verb::InnerHtmlSet).unwrap();
        assert_eq!(json, "\"innerHTML_set\"");
    }

    #[test]
    fn call_args_report_position_on_mismatch() {
        let values = vec![HostValue::String("div".into())];
        let args = CallArgs::new(Verb::GetChildren, &values);
        let err = args.handle(0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "`get_children` expects a node handle at argument 0"
        );
        assert!(args.value(1).is_err());
        assert_eq!(args.string(0).unwrap(), "div");
    }
}
