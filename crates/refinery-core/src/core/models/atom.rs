use nalgebra::Point3;

/// A single atom of a [`Configuration`](super::configuration::Configuration).
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Index into the configuration's list of atom type names, and therefore into the rows and
    /// columns of the [`PotentialMap`](crate::core::forcefield::potential_map::PotentialMap).
    pub type_index: usize,
    /// Index of the owning molecule within the configuration.
    pub molecule: usize,
    /// Index of this atom within its molecule's species.
    pub local_index: usize,
    /// Cartesian position in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    pub fn new(
        type_index: usize,
        molecule: usize,
        local_index: usize,
        position: Point3<f64>,
    ) -> Self {
        Self {
            type_index,
            molecule,
            local_index,
            position,
        }
    }
}
