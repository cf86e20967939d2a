use crate::core::models::configuration::Configuration;
use crate::core::models::error::ModelError;
use nalgebra::Point3;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tracked {
    atom: usize,
    baseline: Point3<f64>,
}

/// Snapshot of a set of atom positions that trial moves can roll back to.
///
/// Atoms are registered with [`ChangeStore::add_atom`] / [`ChangeStore::add_molecule`], which
/// capture their current coordinates as the baseline. After a trial move the caller either commits
/// ([`ChangeStore::update_all`], the current coordinates become the baseline) or rolls back
/// ([`ChangeStore::revert_all`]). Prefer [`ChangeStore::begin`] or [`ChangeStore::trial`], which
/// guarantee one of the two happens on every exit path.
#[derive(Debug, Clone, Default)]
pub struct ChangeStore {
    targets: Vec<Tracked>,
    pending: Vec<(usize, Point3<f64>)>,
}

impl ChangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking atom `index`. Atoms already tracked keep their existing baseline.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::AtomNotFound`] if `index` is not an atom of `configuration`.
    pub fn add_atom(&mut self, configuration: &Configuration, index: usize) -> Result<(), ModelError> {
        if index >= configuration.n_atoms() {
            return Err(ModelError::AtomNotFound {
                index,
                n_atoms: configuration.n_atoms(),
            });
        }
        if !self.targets.iter().any(|t| t.atom == index) {
            self.targets.push(Tracked {
                atom: index,
                baseline: *configuration.position(index),
            });
        }
        Ok(())
    }

    /// Starts tracking every atom of molecule `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MoleculeNotFound`] if `index` is not a molecule of `configuration`.
    pub fn add_molecule(
        &mut self,
        configuration: &Configuration,
        index: usize,
    ) -> Result<(), ModelError> {
        let molecule = configuration
            .molecules()
            .get(index)
            .ok_or(ModelError::MoleculeNotFound {
                index,
                n_molecules: configuration.n_molecules(),
            })?;
        for &atom in molecule.atoms() {
            self.add_atom(configuration, atom)?;
        }
        Ok(())
    }

    #[inline]
    pub fn n_targets(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn n_pending(&self) -> usize {
        self.pending.len()
    }

    /// Restores every tracked atom to its baseline.
    pub fn revert_all(&self, configuration: &mut Configuration) {
        for tracked in &self.targets {
            *configuration.position_mut(tracked.atom) = tracked.baseline;
        }
    }

    /// Makes the current coordinates of every tracked atom the new baseline.
    pub fn update_all(&mut self, configuration: &Configuration) {
        for tracked in &mut self.targets {
            tracked.baseline = *configuration.position(tracked.atom);
        }
    }

    /// Moves the committed baselines into the pending buffer and stops tracking all atoms.
    pub fn store_and_reset(&mut self) {
        self.pending
            .extend(self.targets.drain(..).map(|t| (t.atom, t.baseline)));
    }

    /// Applies every pending position to `configuration` and empties the buffer.
    ///
    /// # Return
    ///
    /// The number of positions applied.
    pub fn distribute_and_apply(&mut self, configuration: &mut Configuration) -> usize {
        let n_applied = self.pending.len();
        for (atom, position) in self.pending.drain(..) {
            *configuration.position_mut(atom) = position;
        }
        trace!(n_applied, "Applied stored positions.");
        n_applied
    }

    /// Forgets all tracked and pending atoms without touching any coordinates.
    pub fn reset(&mut self) {
        self.targets.clear();
        self.pending.clear();
    }

    /// Opens a transaction over the tracked atoms of `configuration`.
    ///
    /// The transaction rolls the atoms back when dropped unless [`Transaction::commit`] was called.
    pub fn begin<'s, 'c>(&'s mut self, configuration: &'c mut Configuration) -> Transaction<'s, 'c> {
        Transaction {
            store: self,
            configuration,
            committed: false,
        }
    }

    /// Runs `action` inside a transaction, committing if it returns `Ok(true)` and rolling back
    /// on `Ok(false)` or on error.
    pub fn trial<E, F>(&mut self, configuration: &mut Configuration, action: F) -> Result<bool, E>
    where
        F: FnOnce(&mut Configuration) -> Result<bool, E>,
    {
        let mut transaction = self.begin(configuration);
        let accepted = action(transaction.configuration_mut())?;
        if accepted {
            transaction.commit();
        }
        Ok(accepted)
    }
}

/// Scoped trial move: either committed explicitly or reverted on drop.
pub struct Transaction<'s, 'c> {
    store: &'s mut ChangeStore,
    configuration: &'c mut Configuration,
    committed: bool,
}

impl Transaction<'_, '_> {
    pub fn configuration(&self) -> &Configuration {
        &*self.configuration
    }

    pub fn configuration_mut(&mut self) -> &mut Configuration {
        &mut *self.configuration
    }

    pub fn commit(mut self) {
        self.store.update_all(&*self.configuration);
        self.committed = true;
    }
}

impl Drop for Transaction<'_, '_> {
    fn drop(&mut self) {
        if !self.committed {
            self.store.revert_all(&mut *self.configuration);
        }
    }
}
