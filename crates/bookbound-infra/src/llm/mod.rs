//! Generation-capability provider implementations.

pub mod groq;
