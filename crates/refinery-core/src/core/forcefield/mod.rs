//! # Force Field Module
//!
//! This module provides the interaction model used by the refinement engine: per-type
//! short-range parameters and charges, the bonded functional forms of each species, and the
//! tabulated pair potentials through which all interatomic energies and forces are evaluated.
//!
//! ## Overview
//!
//! Every unordered pair of atom types present in a configuration is assigned a
//! [`pair_potential::PairPotential`]. The potential combines the short-range parameters of both
//! types, tabulates the truncated analytic energy (plus an optional Coulomb term) on a uniform
//! radial grid and differentiates the table numerically. An externally refined correction can be
//! superposed on the table at any point between sweeps. Lookups during energy evaluation go
//! through the read-only [`potential_map::PotentialMap`].
//!
//! - **Short-range forms** - Lennard-Jones 12-6 with Lorentz-Berthelot or geometric combination
//! - **Electrostatics** - plain or shifted-force Coulomb in real space
//! - **Truncation** - shifted or cosine-tapered short-range, shifted Coulomb
//! - **Bonded terms** - harmonic and Morse bonds, harmonic and cosine angles, cosine-series
//!   torsions
//!
//! ## Key Components
//!
//! - [`params`] - Atom types and forcefield files
//! - [`pair_potential`] - Tabulation, interpolation and analytic evaluation for one type pair
//! - [`potential_map`] - Type-pair lookup over all tabulated potentials
//! - [`intramolecular`] - Bond, angle and torsion functional forms
//! - [`truncation`] - Truncation schemes and tabulation settings shared by one simulation
//! - [`term`] - Intramolecular energy aggregation
//!
//! ## Usage
//!
//! ```ignore
//! use refinery::core::forcefield::potential_map::PotentialMap;
//!
//! let map = PotentialMap::build(&forcefield, configuration.atom_types(), &settings)?;
//! let energy = map.energy(type_i, type_j, r);
//! ```

pub mod intramolecular;
pub mod pair_potential;
pub mod params;
pub mod potential_map;
pub mod potentials;
pub mod term;
pub mod truncation;
