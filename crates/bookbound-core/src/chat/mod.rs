//! Turn orchestration and message persistence abstractions.
//!
//! `MessageRepository` is the port the infrastructure layer implements
//! for the append-only history store; `TurnService` drives a full turn
//! end to end.

pub mod repository;
pub mod service;
