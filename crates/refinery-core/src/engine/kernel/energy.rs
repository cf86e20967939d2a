use super::{MIN_SCALING, Reduction, check_coverage};
use crate::core::forcefield::potential_map::PotentialMap;
use crate::core::forcefield::term::IntramolecularEnergy;
use crate::core::models::configuration::Configuration;
use crate::core::models::molecule::Molecule;
use crate::core::models::species::{SpeciesAngle, SpeciesBond, SpeciesTorsion};
use crate::engine::error::EngineError;
use crate::engine::process_pool::ProcessPool;

/// Production energy evaluation.
///
/// The kernel borrows the potentials and the pool but not the configuration, so coordinates can be
/// changed between calls.
#[derive(Debug, Clone, Copy)]
pub struct EnergyKernel<'a> {
    potentials: &'a PotentialMap,
    pool: &'a ProcessPool,
    cutoff_squared: f64,
}

impl<'a> EnergyKernel<'a> {
    /// Creates a kernel whose pair cutoff is `cutoff`, or the potential range when `None`.
    pub fn new(potentials: &'a PotentialMap, pool: &'a ProcessPool, cutoff: Option<f64>) -> Self {
        let cutoff = cutoff.unwrap_or_else(|| potentials.range());
        Self {
            potentials,
            pool,
            cutoff_squared: cutoff * cutoff,
        }
    }

    #[inline]
    pub fn cutoff(&self) -> f64 {
        self.cutoff_squared.sqrt()
    }

    pub fn potentials(&self) -> &'a PotentialMap {
        self.potentials
    }

    /// Checks that the potentials were built for the atom types of `configuration`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Initialization`] naming the first mismatch.
    pub fn validate(&self, configuration: &Configuration) -> Result<(), EngineError> {
        check_coverage(self.potentials, configuration)
    }

    fn ranks(&self, reduction: Reduction) -> ProcessPool {
        match reduction {
            Reduction::Solo => ProcessPool::serial(),
            Reduction::Pool => *self.pool,
        }
    }

    /// Unscaled pair energy between atoms `i` and `j`; zero beyond the cutoff.
    #[inline]
    pub fn pair_energy(&self, configuration: &Configuration, i: usize, j: usize) -> f64 {
        let (a, b) = (configuration.atom(i), configuration.atom(j));
        let r_squared = configuration
            .simulation_box()
            .minimum_distance_squared(&a.position, &b.position);
        if r_squared > self.cutoff_squared {
            return 0.0;
        }
        self.potentials
            .energy(a.type_index, b.type_index, r_squared.sqrt())
    }

    /// Pair energy including the intramolecular scaling when `i` and `j` share a molecule.
    #[inline]
    fn scaled_pair_energy(&self, configuration: &Configuration, i: usize, j: usize) -> f64 {
        let (a, b) = (configuration.atom(i), configuration.atom(j));
        if a.molecule != b.molecule {
            return self.pair_energy(configuration, i, j);
        }
        let scale = configuration
            .molecule(a.molecule)
            .species()
            .scaling(a.local_index, b.local_index);
        if scale < MIN_SCALING {
            return 0.0;
        }
        self.pair_energy(configuration, i, j) * scale
    }

    /// Pair energy of one molecule: its internal pairs (scaled) plus every pair with an atom
    /// outside it. Each pair is counted once.
    pub fn molecule_energy(
        &self,
        configuration: &Configuration,
        molecule: usize,
        reduction: Reduction,
    ) -> f64 {
        let members = configuration.molecule(molecule).atoms();
        let n_atoms = configuration.n_atoms();
        let ranks = self.ranks(reduction);
        ranks.all_sum(|rank| {
            ranks
                .partition(rank, members.len())
                .map(|m| {
                    let i = members[m];
                    let internal: f64 = members[m + 1..]
                        .iter()
                        .map(|&j| self.scaled_pair_energy(configuration, i, j))
                        .sum();
                    let environment: f64 = (0..n_atoms)
                        .filter(|&j| configuration.atom(j).molecule != molecule)
                        .map(|j| self.pair_energy(configuration, i, j))
                        .sum();
                    internal + environment
                })
                .sum::<f64>()
        })
    }

    /// Total pair energy of the configuration, every unordered pair counted once.
    pub fn interatomic_energy(&self, configuration: &Configuration, reduction: Reduction) -> f64 {
        let n_atoms = configuration.n_atoms();
        let ranks = self.ranks(reduction);
        ranks.all_sum(|rank| {
            ranks
                .partition(rank, n_atoms)
                .map(|i| {
                    (i + 1..n_atoms)
                        .map(|j| self.scaled_pair_energy(configuration, i, j))
                        .sum::<f64>()
                })
                .sum::<f64>()
        })
    }

    pub fn bond_energy(
        &self,
        configuration: &Configuration,
        molecule: &Molecule,
        bond: &SpeciesBond,
    ) -> f64 {
        let [i, j] = bond.indices.map(|local| molecule.global_index(local));
        let r = configuration
            .simulation_box()
            .minimum_distance(configuration.position(i), configuration.position(j));
        bond.form.energy(r)
    }

    pub fn angle_energy(
        &self,
        configuration: &Configuration,
        molecule: &Molecule,
        angle: &SpeciesAngle,
    ) -> f64 {
        let [i, j, k] = angle.indices.map(|local| molecule.global_index(local));
        let theta = configuration.simulation_box().angle(
            configuration.position(i),
            configuration.position(j),
            configuration.position(k),
        );
        angle.form.energy(theta)
    }

    pub fn torsion_energy(
        &self,
        configuration: &Configuration,
        molecule: &Molecule,
        torsion: &SpeciesTorsion,
    ) -> f64 {
        let [i, j, k, l] = torsion.indices.map(|local| molecule.global_index(local));
        let phi = configuration.simulation_box().dihedral(
            configuration.position(i),
            configuration.position(j),
            configuration.position(k),
            configuration.position(l),
        );
        torsion.form.energy(phi)
    }

    /// Bonded energy of one molecule, split by term kind.
    pub fn intramolecular_energy(
        &self,
        configuration: &Configuration,
        molecule: usize,
    ) -> IntramolecularEnergy {
        let molecule = configuration.molecule(molecule);
        let species = molecule.species();
        IntramolecularEnergy::new(
            species
                .bonds()
                .iter()
                .map(|b| self.bond_energy(configuration, molecule, b))
                .sum(),
            species
                .angles()
                .iter()
                .map(|a| self.angle_energy(configuration, molecule, a))
                .sum(),
            species
                .torsions()
                .iter()
                .map(|t| self.torsion_energy(configuration, molecule, t))
                .sum(),
        )
    }

    /// Bonded energy of every molecule in the configuration.
    pub fn total_intramolecular_energy(
        &self,
        configuration: &Configuration,
        reduction: Reduction,
    ) -> IntramolecularEnergy {
        let ranks = self.ranks(reduction);
        ranks.all_sum(|rank| {
            ranks
                .partition(rank, configuration.n_molecules())
                .map(|m| self.intramolecular_energy(configuration, m))
                .sum::<IntramolecularEnergy>()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::intramolecular::{AngleForm, BondForm, TorsionForm};
    use crate::core::forcefield::params::{AtomType, Forcefield, ShortRangeForm};
    use crate::core::forcefield::truncation::TabulationSettings;
    use crate::core::models::simulation_box::SimulationBox;
    use crate::core::models::species::{DEFAULT_SCALE_14, SpeciesBuilder};
    use nalgebra::Point3;
    use std::sync::Arc;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE * a.abs().max(1.0)
    }

    fn potentials(names: &[&str]) -> PotentialMap {
        let mut forcefield = Forcefield::new();
        forcefield.insert(AtomType::new(
            "Ar",
            ShortRangeForm::LennardJones,
            vec![0.99, 3.4],
            0.0,
        ));
        forcefield.insert(AtomType::new(
            "C",
            ShortRangeForm::LennardJones,
            vec![0.3, 3.5],
            0.0,
        ));
        let settings = TabulationSettings {
            range: 9.0,
            delta: 0.005,
            include_coulomb: false,
            ..TabulationSettings::default()
        };
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        PotentialMap::build(&forcefield, &names, &settings).unwrap()
    }

    fn argon_pair(separation: f64) -> Configuration {
        let mut builder = SpeciesBuilder::new("Argon");
        builder.add_atom("Ar");
        let argon = Arc::new(builder.build().unwrap());
        let mut cfg =
            Configuration::new("Argon", SimulationBox::cubic(30.0).unwrap(), 120.0).unwrap();
        cfg.add_molecule(&argon, &[Point3::new(1.0, 1.0, 1.0)]).unwrap();
        cfg.add_molecule(&argon, &[Point3::new(1.0 + separation, 1.0, 1.0)])
            .unwrap();
        cfg
    }

    /// A four-carbon chain with one bond, angle and torsion, so pair 0-3 is a scaled 1-4 pair.
    fn butane_like(positions: [Point3<f64>; 4]) -> Configuration {
        let mut builder = SpeciesBuilder::new("Chain");
        for _ in 0..4 {
            builder.add_atom("C");
        }
        builder
            .add_bond(0, 1, BondForm::Harmonic { k: 1000.0, eq: 1.5 })
            .add_bond(1, 2, BondForm::Harmonic { k: 1000.0, eq: 1.5 })
            .add_bond(2, 3, BondForm::Harmonic { k: 1000.0, eq: 1.5 })
            .add_angle(0, 1, 2, AngleForm::Harmonic { k: 400.0, eq: 110.0 })
            .add_torsion(
                [0, 1, 2, 3],
                TorsionForm::Cos3 {
                    k1: 5.0,
                    k2: -1.0,
                    k3: 2.0,
                },
                DEFAULT_SCALE_14,
            );
        let chain = Arc::new(builder.build().unwrap());
        let mut cfg =
            Configuration::new("Chain", SimulationBox::cubic(30.0).unwrap(), 300.0).unwrap();
        cfg.add_molecule(&chain, &positions).unwrap();
        cfg
    }

    fn zigzag() -> [Point3<f64>; 4] {
        [
            Point3::new(0.0, 1.2, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.5, 0.0, 0.0),
            Point3::new(1.9, -1.1, 0.8),
        ]
    }

    #[test]
    fn pair_energy_matches_potential_within_cutoff() {
        let map = potentials(&["Ar"]);
        let pool = ProcessPool::serial();
        let kernel = EnergyKernel::new(&map, &pool, None);
        let cfg = argon_pair(3.8);
        assert!(f64_approx_equal(
            kernel.pair_energy(&cfg, 0, 1),
            map.energy(0, 0, 3.8)
        ));
        assert_eq!(kernel.interatomic_energy(&cfg, Reduction::Solo), kernel.pair_energy(&cfg, 0, 1));
    }

    #[test]
    fn custom_cutoff_rejects_distant_pairs() {
        let map = potentials(&["Ar"]);
        let pool = ProcessPool::serial();
        let kernel = EnergyKernel::new(&map, &pool, Some(4.0));
        assert_eq!(kernel.pair_energy(&argon_pair(4.5), 0, 1), 0.0);
        assert_ne!(kernel.pair_energy(&argon_pair(3.9), 0, 1), 0.0);
        assert!(f64_approx_equal(kernel.cutoff(), 4.0));
    }

    #[test]
    fn minimum_image_is_used_across_the_boundary() {
        let map = potentials(&["Ar"]);
        let pool = ProcessPool::serial();
        let kernel = EnergyKernel::new(&map, &pool, None);
        // 26 Angstroms apart in a 30 Angstrom box is 4 Angstroms through the boundary.
        let cfg = argon_pair(26.0);
        assert!(f64_approx_equal(
            kernel.pair_energy(&cfg, 0, 1),
            map.energy(0, 0, 4.0)
        ));
    }

    #[test]
    fn intramolecular_pairs_are_scaled_or_excluded() {
        let map = potentials(&["C"]);
        let pool = ProcessPool::serial();
        let kernel = EnergyKernel::new(&map, &pool, None);
        let cfg = butane_like(zigzag());

        // Only the 1-4 pair survives the exclusions, at half weight.
        let expected = 0.5 * kernel.pair_energy(&cfg, 0, 3);
        assert!(f64_approx_equal(kernel.interatomic_energy(&cfg, Reduction::Solo), expected));
        assert!(f64_approx_equal(kernel.molecule_energy(&cfg, 0, Reduction::Solo), expected));
    }

    #[test]
    fn pool_reduction_matches_solo() {
        let map = potentials(&["Ar"]);
        let pool = ProcessPool::new(3).unwrap();
        let kernel = EnergyKernel::new(&map, &pool, None);

        let mut builder = SpeciesBuilder::new("Argon");
        builder.add_atom("Ar");
        let argon = Arc::new(builder.build().unwrap());
        let mut cfg =
            Configuration::new("Argon", SimulationBox::cubic(12.0).unwrap(), 120.0).unwrap();
        for n in 0..8 {
            let x = (n % 2) as f64 * 4.1;
            let y = ((n / 2) % 2) as f64 * 3.9;
            let z = (n / 4) as f64 * 4.3;
            cfg.add_molecule(&argon, &[Point3::new(x, y, z)]).unwrap();
        }

        let solo = kernel.interatomic_energy(&cfg, Reduction::Solo);
        let pooled = kernel.interatomic_energy(&cfg, Reduction::Pool);
        assert!(f64_approx_equal(solo, pooled));
        assert!(solo < 0.0);

        let per_molecule: f64 = (0..cfg.n_molecules())
            .map(|m| kernel.molecule_energy(&cfg, m, Reduction::Pool))
            .sum();
        assert!(f64_approx_equal(per_molecule, 2.0 * solo));
    }

    #[test]
    fn bonded_energies_follow_the_functional_forms() {
        let map = potentials(&["C"]);
        let pool = ProcessPool::serial();
        let kernel = EnergyKernel::new(&map, &pool, None);
        let cfg = butane_like(zigzag());
        let molecule = cfg.molecule(0);
        let species = molecule.species();

        let bond = kernel.bond_energy(&cfg, molecule, &species.bonds()[0]);
        assert!(f64_approx_equal(bond, 0.5 * 1000.0 * (1.2f64 - 1.5).powi(2)));

        let angle = kernel.angle_energy(&cfg, molecule, &species.angles()[0]);
        assert!(f64_approx_equal(
            angle,
            0.5 * 400.0 * (90.0f64.to_radians() - 110.0f64.to_radians()).powi(2)
        ));

        let total = kernel.intramolecular_energy(&cfg, 0);
        let summed = kernel.total_intramolecular_energy(&cfg, Reduction::Pool);
        assert_eq!(total, summed);
        assert!(total.torsion > 0.0);
        assert!(f64_approx_equal(total.angle, angle));
    }

    #[test]
    fn validate_detects_mismatched_type_order() {
        let map = potentials(&["C", "Ar"]);
        let pool = ProcessPool::serial();
        let kernel = EnergyKernel::new(&map, &pool, None);
        assert!(matches!(
            kernel.validate(&argon_pair(4.0)),
            Err(EngineError::Initialization(_))
        ));
        let map = potentials(&["Ar"]);
        let kernel = EnergyKernel::new(&map, &pool, None);
        assert!(kernel.validate(&argon_pair(4.0)).is_ok());
    }
}
