use super::MIN_SCALING;
use super::force::add_molecule_bonded_forces;
use crate::core::forcefield::potential_map::PotentialMap;
use crate::core::forcefield::term::IntramolecularEnergy;
use crate::core::models::configuration::Configuration;
use itertools::Itertools;
use nalgebra::Vector3;

/// Serial oracle for the self-tests.
///
/// Every unordered atom pair is visited in a plain double loop on a single rank with no early
/// rejection, so any partitioning or cutoff bookkeeping error in the production kernels shows up
/// as a difference. With `analytic` set, pair terms come from the analytic potentials rather than
/// the tables.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceKernel<'a> {
    potentials: &'a PotentialMap,
    analytic: bool,
}

impl<'a> ReferenceKernel<'a> {
    pub fn new(potentials: &'a PotentialMap, analytic: bool) -> Self {
        Self {
            potentials,
            analytic,
        }
    }

    fn energy_at(&self, type_i: usize, type_j: usize, r: f64) -> f64 {
        if self.analytic {
            self.potentials.analytic_energy(type_i, type_j, r)
        } else {
            self.potentials.energy(type_i, type_j, r)
        }
    }

    fn force_at(&self, type_i: usize, type_j: usize, r: f64) -> f64 {
        if self.analytic {
            self.potentials.analytic_force(type_i, type_j, r)
        } else {
            self.potentials.force(type_i, type_j, r)
        }
    }

    fn scaling(configuration: &Configuration, i: usize, j: usize) -> f64 {
        let (a, b) = (configuration.atom(i), configuration.atom(j));
        if a.molecule == b.molecule {
            configuration
                .molecule(a.molecule)
                .species()
                .scaling(a.local_index, b.local_index)
        } else {
            1.0
        }
    }

    pub fn interatomic_energy(&self, configuration: &Configuration) -> f64 {
        let cell = configuration.simulation_box();
        (0..configuration.n_atoms())
            .tuple_combinations()
            .map(|(i, j)| {
                let scale = Self::scaling(configuration, i, j);
                if scale < MIN_SCALING {
                    return 0.0;
                }
                let (a, b) = (configuration.atom(i), configuration.atom(j));
                let r = cell.minimum_distance(&a.position, &b.position);
                self.energy_at(a.type_index, b.type_index, r) * scale
            })
            .sum()
    }

    pub fn intramolecular_energy(&self, configuration: &Configuration) -> IntramolecularEnergy {
        let cell = configuration.simulation_box();
        let mut total = IntramolecularEnergy::default();
        for molecule in configuration.molecules() {
            let species = molecule.species();
            let at = |local: usize| configuration.position(molecule.global_index(local));
            for bond in species.bonds() {
                let [i, j] = bond.indices;
                total.bond += bond.form.energy(cell.minimum_distance(at(i), at(j)));
            }
            for angle in species.angles() {
                let [i, j, k] = angle.indices;
                total.angle += angle.form.energy(cell.angle(at(i), at(j), at(k)));
            }
            for torsion in species.torsions() {
                let [i, j, k, l] = torsion.indices;
                total.torsion += torsion
                    .form
                    .energy(cell.dihedral(at(i), at(j), at(k), at(l)));
            }
        }
        total
    }

    pub fn interatomic_forces(&self, configuration: &Configuration) -> Vec<Vector3<f64>> {
        let cell = configuration.simulation_box();
        let mut forces = vec![Vector3::zeros(); configuration.n_atoms()];
        for (i, j) in (0..configuration.n_atoms()).tuple_combinations() {
            let scale = Self::scaling(configuration, i, j);
            if scale < MIN_SCALING {
                continue;
            }
            let (a, b) = (configuration.atom(i), configuration.atom(j));
            let v = cell.minimum_vector(&a.position, &b.position);
            let r = v.norm();
            let f = v * (self.force_at(a.type_index, b.type_index, r) * scale / r);
            forces[i] += f;
            forces[j] -= f;
        }
        forces
    }

    pub fn intramolecular_forces(&self, configuration: &Configuration) -> Vec<Vector3<f64>> {
        let mut forces = vec![Vector3::zeros(); configuration.n_atoms()];
        for m in 0..configuration.n_molecules() {
            add_molecule_bonded_forces(configuration, m, &mut forces);
        }
        forces
    }
}
