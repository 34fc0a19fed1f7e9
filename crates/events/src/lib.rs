//! Import-progress event broadcasting.
//!
//! Single process-wide publish point with any number of independent,
//! per-user-filtered subscribers.

pub mod bus;

pub use bus::{ImportProgressEvent, ProgressBus, UserSubscription};
