//! Helpers shared by the engine tasks.

pub mod sampling;
