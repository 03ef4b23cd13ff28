//! Helpers for testing code that watches logs, without a node.

pub mod macros;
mod mock_source;
mod recorder;

pub use mock_source::{Call, MockLogSource};
pub use recorder::{AsLog, Recorder};
