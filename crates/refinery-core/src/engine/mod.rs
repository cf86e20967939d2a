//! # Engine Module
//!
//! This module implements the stateful machinery that advances a simulation: evaluating energies
//! and forces across a process pool, perturbing molecules with Monte Carlo trial moves, and keeping
//! the per-module data that must survive a restart.
//!
//! ## Overview
//!
//! The engine operates on a [`Configuration`](crate::core::models::configuration::Configuration)
//! and a read-only [`PotentialMap`](crate::core::forcefield::potential_map::PotentialMap). Work is
//! divided across the ranks of a [`process_pool::ProcessPool`] and combined through explicit
//! collective operations (sum-reduction and all-agree), so every decision that depends on a total
//! is taken only after all contributions have been accumulated.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Builders for the shake, energy, forces and evolve settings
//! - **Error Handling** ([`error`]) - Engine-specific error types and error propagation
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Parallelism** ([`process_pool`]) - Rank partitioning and collective reductions
//! - **Kernels** ([`kernel`]) - Production and reference energy/force evaluation
//! - **Transactions** ([`change_store`]) - Snapshot and rollback of trial moves
//! - **Persistence** ([`store`]) - Restart-persistable module data
//! - **Tasks** ([`tasks`]) - Intramolecular shake, energy and forces
//!
//! ## Key Capabilities
//!
//! - **Cutoff-limited pair energies** with intramolecular scaling of bonded neighbours
//! - **Metropolis trial moves** on bonds, angles and torsions with adaptive step sizes
//! - **Serial self-tests** that cross-check production results against straightforward loops
//! - **Energy stability detection** from the trailing slope of the total energy

pub mod change_store;
pub mod config;
pub mod error;
pub mod kernel;
pub mod process_pool;
pub mod progress;
pub mod store;
pub mod tasks;
pub(crate) mod utils;
