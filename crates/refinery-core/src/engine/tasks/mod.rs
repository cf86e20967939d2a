//! Tasks executed once per iteration of a simulation.
//!
//! Each task is a single entry point (`run`) that reads its settings from the engine
//! configuration, persists whatever must survive a restart in the
//! [`ModuleStore`](super::store::ModuleStore) under its unique module name, and reports progress
//! through a [`ProgressReporter`](super::progress::ProgressReporter).
//!
//! - [`intra_shake`] - Metropolis Monte Carlo on bond lengths, angles and torsions
//! - [`energy`] - Configuration energy, its history and stability, and the energy self-test
//! - [`forces`] - Per-atom forces and the force self-test

pub mod energy;
pub mod forces;
pub mod intra_shake;
