//! SQLite persistence for Bookbound.
//!
//! - `pool`: split reader/writer pools in WAL mode, migrations on startup
//! - `library`: books and characters
//! - `message`: the append-only per-character message log

pub mod library;
pub mod message;
pub mod pool;
