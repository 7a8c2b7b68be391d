//! Shared domain types for Bookbound.
//!
//! This crate contains the core domain types used across the Bookbound
//! platform: books, characters, messages, psychological state snapshots,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod book;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod psyche;
