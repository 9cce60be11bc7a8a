//! Core library for agentchat
//!
//! This crate contains the pieces shared by the team runtime and the server:
//! - Chat message envelopes
//! - Model client configuration
//! - JSON history and state persistence

pub mod config;
pub mod error;
pub mod message;
pub mod store;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
