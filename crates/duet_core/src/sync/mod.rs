//! Live change fan-out.
//!
//! # Responsibility
//! - Keep registered listeners and deliver change notifications to them.
//! - Hand out cancellation handles for every registration.
//!
//! # Invariants
//! - Listeners are invoked without any registry lock held.
//! - Cancelling a subscription twice is a no-op.

pub mod listeners;

pub use listeners::{ListenerSet, Subscription};
