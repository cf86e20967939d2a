//! # Workflows Module
//!
//! High-level procedures that drive a configuration through repeated iterations of the engine
//! tasks.
//!
//! ## Overview
//!
//! A workflow owns the iteration loop: it seeds the random number generator, calls the tasks in
//! order, reports phases through the [`ProgressReporter`](crate::engine::progress::ProgressReporter)
//! and decides when to stop. Everything that must survive a restart goes through the
//! [`ModuleStore`](crate::engine::store::ModuleStore) passed in by the caller.
//!
//! ## Architecture
//!
//! - **Evolve Workflow** ([`evolve`]) - Intramolecular shake, energy (with stability tracking) and
//!   optional forces, repeated for a fixed number of iterations or until the energy is stable.

pub mod evolve;
