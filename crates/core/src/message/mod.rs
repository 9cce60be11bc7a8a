//! Chat message module
//!
//! Envelope types exchanged between agents, teams and clients.

mod model;

pub use model::*;

/// Source name used for envelopes produced by the server itself.
pub const SYSTEM_SOURCE: &str = "system";

/// Source name of the human participant.
pub const USER_SOURCE: &str = "user";
