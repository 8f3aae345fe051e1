//! Signal-tracking API port.

pub mod port;
pub mod types;

pub use port::SignalApi;
pub use types::{NewComment, NewSignal, SignalApiError};
