//! Business logic and repository trait definitions for Bookbound.
//!
//! This crate defines the "ports" (repository traits) that the
//! infrastructure layer implements, and the turn pipeline that sequences
//! three dependent generation calls into one reliable turn. It depends
//! only on `bookbound-types` -- never on `bookbound-infra` or any
//! database/IO crate.

pub mod chat;
pub mod infer;
pub mod library;
pub mod llm;
