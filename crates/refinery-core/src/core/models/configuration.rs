use super::atom::Atom;
use super::error::ModelError;
use super::molecule::Molecule;
use super::simulation_box::SimulationBox;
use super::species::Species;
use nalgebra::Point3;
use std::sync::Arc;

/// The complete simulated system: atoms, the molecules they belong to, and their cell.
///
/// Atom type names are collected in order of first appearance as molecules are added; an atom's
/// `type_index` indexes this list, which is what a
/// [`PotentialMap`](crate::core::forcefield::potential_map::PotentialMap) is built from.
#[derive(Debug, Clone)]
pub struct Configuration {
    name: String,
    simulation_box: SimulationBox,
    temperature: f64,
    atom_types: Vec<String>,
    atoms: Vec<Atom>,
    molecules: Vec<Molecule>,
    contents_version: u64,
}

impl Configuration {
    /// Creates an empty configuration.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique name, used for output file names.
    /// * `simulation_box` - The containing cell.
    /// * `temperature` - Temperature in Kelvin used for Metropolis acceptance.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTemperature`] for non-positive or non-finite temperatures.
    pub fn new(
        name: &str,
        simulation_box: SimulationBox,
        temperature: f64,
    ) -> Result<Self, ModelError> {
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(ModelError::InvalidTemperature(temperature));
        }
        Ok(Self {
            name: name.to_string(),
            simulation_box,
            temperature,
            atom_types: Vec::new(),
            atoms: Vec::new(),
            molecules: Vec::new(),
            contents_version: 0,
        })
    }

    /// Adds a molecule of `species` with the given atom positions.
    ///
    /// # Arguments
    ///
    /// * `species` - The template to instantiate.
    /// * `positions` - One position per species atom, in local index order.
    ///
    /// # Return
    ///
    /// The index of the new molecule.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PositionCountMismatch`] if `positions` does not match the species.
    pub fn add_molecule(
        &mut self,
        species: &Arc<Species>,
        positions: &[Point3<f64>],
    ) -> Result<usize, ModelError> {
        if positions.len() != species.n_atoms() {
            return Err(ModelError::PositionCountMismatch {
                species: species.name().to_string(),
                expected: species.n_atoms(),
                found: positions.len(),
            });
        }

        let molecule_index = self.molecules.len();
        let first_atom = self.atoms.len();
        for (local_index, (type_name, position)) in
            species.atom_types().iter().zip(positions).enumerate()
        {
            let type_index = self.type_index_or_insert(type_name);
            self.atoms
                .push(Atom::new(type_index, molecule_index, local_index, *position));
        }

        let atoms = (first_atom..self.atoms.len()).collect();
        self.molecules
            .push(Molecule::new(Arc::clone(species), atoms));
        self.contents_version += 1;
        Ok(molecule_index)
    }

    fn type_index_or_insert(&mut self, type_name: &str) -> usize {
        match self.atom_types.iter().position(|name| name == type_name) {
            Some(index) => index,
            None => {
                self.atom_types.push(type_name.to_string());
                self.atom_types.len() - 1
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn simulation_box(&self) -> &SimulationBox {
        &self.simulation_box
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Atom type names present in the configuration, indexed by `Atom::type_index`.
    pub fn atom_types(&self) -> &[String] {
        &self.atom_types
    }

    #[inline]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    #[inline]
    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn atom(&self, index: usize) -> &Atom {
        &self.atoms[index]
    }

    #[inline]
    pub fn position(&self, index: usize) -> &Point3<f64> {
        &self.atoms[index].position
    }

    /// Moves an atom.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::AtomNotFound`] if `index` is out of range.
    pub fn set_position(&mut self, index: usize, position: Point3<f64>) -> Result<(), ModelError> {
        let n_atoms = self.atoms.len();
        let atom = self
            .atoms
            .get_mut(index)
            .ok_or(ModelError::AtomNotFound { index, n_atoms })?;
        atom.position = position;
        Ok(())
    }

    /// Unchecked mutable access for callers that validated `index` when they started tracking it.
    #[inline]
    pub(crate) fn position_mut(&mut self, index: usize) -> &mut Point3<f64> {
        &mut self.atoms[index].position
    }

    #[inline]
    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    #[inline]
    pub fn molecule(&self, index: usize) -> &Molecule {
        &self.molecules[index]
    }

    #[inline]
    pub fn n_molecules(&self) -> usize {
        self.molecules.len()
    }

    /// Counter incremented whenever atoms are added or coordinates are changed by accepted moves.
    pub fn contents_version(&self) -> u64 {
        self.contents_version
    }

    pub fn increment_contents_version(&mut self) {
        self.contents_version += 1;
    }
}
