//! # Core Module
//!
//! This module provides the stateless building blocks of the simulation: how atoms, molecules and
//! periodic cells are represented, how pair potentials are combined, truncated and tabulated, and
//! how bonded terms are evaluated.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, species templates, molecules, configurations
//!   and the periodic simulation box
//! - **Energy Calculations** ([`forcefield`]) - Atom types, analytic potentials, truncation schemes,
//!   tabulated pair potentials and bonded functional forms
//! - **File I/O** ([`io`]) - Pair potential export (Block, DL_POLY TABLE) and energy logs
//! - **Numerics** ([`utils`]) - Interpolated curves, linear regression and geometry helpers
//!
//! ## Units
//!
//! Distances are in Angstroms, energies in kJ/mol, charges in elementary charges and angles are
//! exchanged in degrees. Temperatures are in Kelvin.

pub mod forcefield;
pub mod io;
pub mod models;
pub mod utils;
