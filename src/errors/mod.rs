//! Centralized error handling for the stream relay.
//!
//! Request-level failures are owned entirely by the worker serving that
//! request and surface to the client as a plain `404`; the fine-grained
//! error kind is only visible in the server logs.

pub mod types;

pub use types::*;

/// Convenience type alias for Results using RelayError
pub type RelayResult<T> = Result<T, RelayError>;

/// Convenience type alias for stream transport Results
pub type StreamResult<T> = Result<T, StreamError>;
