//! Provides input/output for tabulated potentials and simulation diagnostics.
//!
//! Pair potentials can be written per type pair in a column-oriented block format or as a single
//! DL_POLY `TABLE` file, externally refined corrections are read back from two-column CSV files,
//! and the energy module appends one fixed-width record per iteration to a per-configuration log.

pub mod curve;
pub mod energy_log;
pub mod error;
pub mod format;
pub mod pair_potential;
