use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Species '{species}' term references atom index {index}, but the species has {n_atoms} atom(s)")]
    AtomIndexOutOfRange {
        species: String,
        index: usize,
        n_atoms: usize,
    },

    #[error("Species '{species}' term references the same atom ({index}) more than once")]
    DegenerateTerm { species: String, index: usize },

    #[error("Species '{species}' has {expected} atom(s) but {found} position(s) were supplied")]
    PositionCountMismatch {
        species: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid box length {0}: periodic box lengths must be positive and finite")]
    InvalidBoxLength(f64),

    #[error("Invalid temperature {0} K: temperature must be positive and finite")]
    InvalidTemperature(f64),

    #[error("Atom index {index} is out of range for a configuration with {n_atoms} atom(s)")]
    AtomNotFound { index: usize, n_atoms: usize },

    #[error("Molecule index {index} is out of range for a configuration with {n_molecules} molecule(s)")]
    MoleculeNotFound { index: usize, n_molecules: usize },
}
