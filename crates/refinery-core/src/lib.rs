//! # Refinery Core Library
//!
//! Pair-potential tabulation, energy and force evaluation, and intramolecular Monte Carlo for
//! refining atomistic models of disordered materials (liquids, glasses, amorphous solids).
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Configuration`, `Species`), the pure
//!   mathematics of the forcefield (`potentials`, `PairPotential`, bonded forms), interpolation and
//!   regression utilities, and file export.
//!
//! - **[`engine`]: The Logic Core.** Stateful machinery that drives a simulation: the process pool
//!   with its collective reductions, energy and force kernels, `ChangeStore` transactions for trial
//!   moves, the restart-persistable module store, and the tasks (intramolecular shake, energy,
//!   forces) built on them.
//!
//! - **[`workflows`]: The Public API.** Complete procedures, such as evolving a configuration for a
//!   number of iterations, assembled from the `engine` tasks.

pub mod core;
pub mod engine;
pub mod workflows;
