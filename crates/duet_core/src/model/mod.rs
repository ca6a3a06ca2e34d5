//! Domain model for the shared diary.
//!
//! # Responsibility
//! - Define the preferences document, its patches and merge rules.
//! - Define the activity map and calendar day key helpers.
//! - Define typed, tolerant views over feature collections.
//!
//! # Invariants
//! - Decoding a stored record never fails because a field is missing or
//!   mistyped.

pub mod activity;
pub mod lenient;
pub mod preferences;
pub mod records;
