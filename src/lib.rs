// Library exports for the DOM shim

pub mod config;
pub mod dom;
pub mod host;
pub mod js;

pub use config::{ConfigError, ShimConfig};
pub use dom::{Console, DispatchOutcome, Document, Event, Node, ShimError};
pub use host::{Handle, Host, HostError, HostValue, HtmlHost, RecordingHost, Verb};
pub use js::ScriptEnvironment;
