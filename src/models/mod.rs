//! Data shapes that flow through one invocation.
//!
//! The trigger event comes in, credentials are fetched, one metadata row is
//! written, and exactly one processing result leaves as both the result
//! artifact and the notification content.

pub mod credentials;
pub mod event;
pub mod metadata;
pub mod result;
