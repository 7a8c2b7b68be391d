//! The staged inference pipeline and its supporting pieces.
//!
//! - `extract`: locates and schema-checks JSON objects in free-form
//!   generation output
//! - `prompt`: builders for the three stage prompts
//! - `pipeline`: the three-stage turn state machine

pub mod extract;
pub mod pipeline;
pub mod prompt;
