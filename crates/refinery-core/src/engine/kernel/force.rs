use super::{MIN_SCALING, Reduction, check_coverage};
use crate::core::forcefield::intramolecular::{AngleForm, BondForm, TorsionForm};
use crate::core::forcefield::potential_map::PotentialMap;
use crate::core::models::configuration::Configuration;
use crate::core::models::simulation_box::SimulationBox;
use crate::core::utils::geometry::dihedral_angle;
use crate::engine::error::EngineError;
use crate::engine::process_pool::ProcessPool;
use nalgebra::{Point3, Vector3};

const DEGENERATE: f64 = 1e-12;

/// Production force evaluation. All forces are `-dU/dx` in kJ/mol/Angstrom, one per atom.
#[derive(Debug, Clone, Copy)]
pub struct ForceKernel<'a> {
    potentials: &'a PotentialMap,
    pool: &'a ProcessPool,
    cutoff_squared: f64,
}

impl<'a> ForceKernel<'a> {
    pub fn new(potentials: &'a PotentialMap, pool: &'a ProcessPool, cutoff: Option<f64>) -> Self {
        let cutoff = cutoff.unwrap_or_else(|| potentials.range());
        Self {
            potentials,
            pool,
            cutoff_squared: cutoff * cutoff,
        }
    }

    /// See [`EnergyKernel::validate`](super::energy::EnergyKernel::validate).
    pub fn validate(&self, configuration: &Configuration) -> Result<(), EngineError> {
        check_coverage(self.potentials, configuration)
    }

    fn ranks(&self, reduction: Reduction) -> ProcessPool {
        match reduction {
            Reduction::Solo => ProcessPool::serial(),
            Reduction::Pool => *self.pool,
        }
    }

    /// Adds the force of pair `i`-`j` to both atoms, scaled by `scale`.
    #[inline]
    fn add_pair_force(
        &self,
        configuration: &Configuration,
        i: usize,
        j: usize,
        scale: f64,
        forces: &mut [Vector3<f64>],
    ) {
        let (a, b) = (configuration.atom(i), configuration.atom(j));
        let v = configuration
            .simulation_box()
            .minimum_vector(&a.position, &b.position);
        let r_squared = v.norm_squared();
        if r_squared > self.cutoff_squared {
            return;
        }
        let r = r_squared.sqrt();
        let du = self.potentials.force(a.type_index, b.type_index, r) * scale;
        let f = v * (du / r);
        forces[i] += f;
        forces[j] -= f;
    }

    /// Pair forces on every atom; intramolecular pairs are scaled or excluded.
    pub fn interatomic_forces(
        &self,
        configuration: &Configuration,
        reduction: Reduction,
    ) -> Vec<Vector3<f64>> {
        let n_atoms = configuration.n_atoms();
        let ranks = self.ranks(reduction);
        ranks.all_sum_forces(n_atoms, |rank, forces| {
            for i in ranks.partition(rank, n_atoms) {
                let a = configuration.atom(i);
                for j in i + 1..n_atoms {
                    let b = configuration.atom(j);
                    let scale = if a.molecule == b.molecule {
                        configuration
                            .molecule(a.molecule)
                            .species()
                            .scaling(a.local_index, b.local_index)
                    } else {
                        1.0
                    };
                    if scale < MIN_SCALING {
                        continue;
                    }
                    self.add_pair_force(configuration, i, j, scale, forces);
                }
            }
        })
    }

    /// Bonded forces on every atom, molecules interleaved over the ranks.
    pub fn intramolecular_forces(
        &self,
        configuration: &Configuration,
        reduction: Reduction,
    ) -> Vec<Vector3<f64>> {
        let ranks = self.ranks(reduction);
        ranks.all_sum_forces(configuration.n_atoms(), |rank, forces| {
            for m in ranks.partition(rank, configuration.n_molecules()) {
                add_molecule_bonded_forces(configuration, m, forces);
            }
        })
    }

    /// Sum of the pair and bonded forces.
    pub fn total_forces(
        &self,
        configuration: &Configuration,
        reduction: Reduction,
    ) -> Vec<Vector3<f64>> {
        let mut forces = self.interatomic_forces(configuration, reduction);
        for (total, bonded) in forces
            .iter_mut()
            .zip(self.intramolecular_forces(configuration, reduction))
        {
            *total += bonded;
        }
        forces
    }
}

/// Accumulates the bond, angle and torsion forces of molecule `m`.
pub(crate) fn add_molecule_bonded_forces(
    configuration: &Configuration,
    m: usize,
    forces: &mut [Vector3<f64>],
) {
    let molecule = configuration.molecule(m);
    let species = molecule.species();
    let cell = configuration.simulation_box();
    let position = |local: usize| configuration.position(molecule.global_index(local));

    for bond in species.bonds() {
        let [i, j] = bond.indices;
        let [fi, fj] = bond_forces(cell, position(i), position(j), &bond.form);
        forces[molecule.global_index(i)] += fi;
        forces[molecule.global_index(j)] += fj;
    }
    for angle in species.angles() {
        let [i, j, k] = angle.indices;
        let f = angle_forces(cell, position(i), position(j), position(k), &angle.form);
        for (local, force) in angle.indices.iter().zip(f) {
            forces[molecule.global_index(*local)] += force;
        }
    }
    for torsion in species.torsions() {
        let [i, j, k, l] = torsion.indices;
        let f = torsion_forces(
            cell,
            [position(i), position(j), position(k), position(l)],
            &torsion.form,
        );
        for (local, force) in torsion.indices.iter().zip(f) {
            forces[molecule.global_index(*local)] += force;
        }
    }
}

/// Forces on the two atoms of a bond.
pub(crate) fn bond_forces(
    cell: &SimulationBox,
    ri: &Point3<f64>,
    rj: &Point3<f64>,
    form: &BondForm,
) -> [Vector3<f64>; 2] {
    let v = cell.minimum_vector(ri, rj);
    let r = v.norm();
    if r < DEGENERATE {
        return [Vector3::zeros(); 2];
    }
    let f = v * (form.derivative(r) / r);
    [f, -f]
}

/// Forces on the three atoms of an angle `i-j-k`.
///
/// Zero for (numerically) linear or collapsed angles, where the gradient is undefined.
pub(crate) fn angle_forces(
    cell: &SimulationBox,
    ri: &Point3<f64>,
    rj: &Point3<f64>,
    rk: &Point3<f64>,
    form: &AngleForm,
) -> [Vector3<f64>; 3] {
    let u = cell.minimum_vector(rj, ri);
    let w = cell.minimum_vector(rj, rk);
    let (u_norm, w_norm) = (u.norm(), w.norm());
    if u_norm < DEGENERATE || w_norm < DEGENERATE {
        return [Vector3::zeros(); 3];
    }
    let (u_hat, w_hat) = (u / u_norm, w / w_norm);
    let cos_theta = u_hat.dot(&w_hat).clamp(-1.0, 1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
    if sin_theta < DEGENERATE {
        return [Vector3::zeros(); 3];
    }

    let du = form.derivative(cos_theta.acos().to_degrees()) / sin_theta;
    let fi = (w_hat - u_hat * cos_theta) * (du / u_norm);
    let fk = (u_hat - w_hat * cos_theta) * (du / w_norm);
    [fi, -fi - fk, fk]
}

/// Forces on the four atoms of a torsion `i-j-k-l`.
///
/// Zero when either bond plane is undefined (three collinear atoms).
pub(crate) fn torsion_forces(
    cell: &SimulationBox,
    [ri, rj, rk, rl]: [&Point3<f64>; 4],
    form: &TorsionForm,
) -> [Vector3<f64>; 4] {
    let f = cell.minimum_vector(rj, ri);
    let g = cell.minimum_vector(rk, rj);
    let h = cell.minimum_vector(rk, rl);

    let a = f.cross(&g);
    let b = h.cross(&g);
    let (a_squared, b_squared, g_norm) = (a.norm_squared(), b.norm_squared(), g.norm());
    if a_squared < DEGENERATE || b_squared < DEGENERATE || g_norm < DEGENERATE {
        return [Vector3::zeros(); 4];
    }

    let phi = dihedral_angle(&-f, &-g, &h);
    let du = form.derivative(phi);

    let d_i = a * (-g_norm / a_squared);
    let d_l = b * (g_norm / b_squared);
    let fg = f.dot(&g) / (a_squared * g_norm);
    let hg = h.dot(&g) / (b_squared * g_norm);
    let d_j = a * (g_norm / a_squared) + a * fg - b * hg;
    let d_k = b * (-g_norm / b_squared) - a * fg + b * hg;

    [d_i * -du, d_j * -du, d_k * -du, d_l * -du]
}
