//! Energy and force evaluation over a configuration.
//!
//! [`energy::EnergyKernel`] and [`force::ForceKernel`] are the production paths: pair terms are
//! looked up in the tabulated [`PotentialMap`](crate::core::forcefield::potential_map::PotentialMap),
//! rejected by squared distance before any square root is taken, and split over the ranks of a
//! [`ProcessPool`](super::process_pool::ProcessPool). [`reference`] recomputes the same totals with
//! plain serial loops and serves as the oracle for the self-tests.
//!
//! Pairs of atoms in the same molecule are weighted by the species scaling matrix; pairs whose
//! scaling is negligible (below [`MIN_SCALING`]) are skipped outright.

use crate::core::forcefield::potential_map::PotentialMap;
use crate::core::models::configuration::Configuration;
use crate::engine::error::EngineError;

pub mod energy;
pub mod force;
pub mod reference;

/// Intramolecular pair scalings below this value are treated as exclusions.
pub const MIN_SCALING: f64 = 1.0e-3;

/// How the work of a single evaluation is divided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// One rank does all the work.
    Solo,
    /// Work is interleaved over every rank of the pool and sum-reduced.
    Pool,
}

/// Fails unless `potentials` was built for the atom types of `configuration`, in order.
fn check_coverage(potentials: &PotentialMap, configuration: &Configuration) -> Result<(), EngineError> {
    if potentials.type_names() != configuration.atom_types() {
        return Err(EngineError::Initialization(format!(
            "pair potentials cover atom types [{}] but configuration '{}' uses [{}]",
            potentials.type_names().join(", "),
            configuration.name(),
            configuration.atom_types().join(", ")
        )));
    }
    Ok(())
}
