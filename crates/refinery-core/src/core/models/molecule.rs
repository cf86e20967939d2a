use super::species::Species;
use std::sync::Arc;

/// One instance of a [`Species`] within a configuration.
#[derive(Debug, Clone)]
pub struct Molecule {
    species: Arc<Species>,
    atoms: Vec<usize>,
}

impl Molecule {
    pub(crate) fn new(species: Arc<Species>, atoms: Vec<usize>) -> Self {
        Self { species, atoms }
    }

    #[inline]
    pub fn species(&self) -> &Species {
        &self.species
    }

    /// Configuration atom indices, ordered by local (species) index.
    #[inline]
    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    #[inline]
    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Maps a local species atom index to its configuration atom index.
    #[inline]
    pub fn global_index(&self, local: usize) -> usize {
        self.atoms[local]
    }
}
