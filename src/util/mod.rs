//! Small shared utilities.

pub mod timeout;

pub use timeout::{with_timeout, with_timeout_and_cancel};
