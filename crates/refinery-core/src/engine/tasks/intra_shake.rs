use crate::core::forcefield::potential_map::PotentialMap;
use crate::core::models::configuration::Configuration;
use crate::core::models::molecule::Molecule;
use crate::core::utils::geometry::rotation_from_axis_angle;
use crate::engine::change_store::ChangeStore;
use crate::engine::config::{IntraShakeConfig, StepSize};
use crate::engine::error::EngineError;
use crate::engine::kernel::Reduction;
use crate::engine::kernel::energy::EnergyKernel;
use crate::engine::process_pool::ProcessPool;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::store::ModuleStore;
use crate::engine::utils::sampling::{beta, metropolis_accept};
use nalgebra::{Point3, Rotation3, Vector3};
use rand::Rng;
use tracing::{debug, info, instrument};

const BOND_STEP_ITEM: &str = "BondStepSize";
const ANGLE_STEP_ITEM: &str = "AngleStepSize";
const TORSION_STEP_ITEM: &str = "TorsionStepSize";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveCounts {
    pub attempted: usize,
    pub accepted: usize,
}

impl MoveCounts {
    fn record(&mut self, accepted: bool) {
        self.attempted += 1;
        if accepted {
            self.accepted += 1;
        }
    }

    pub fn rate(&self) -> Option<f64> {
        (self.attempted > 0).then(|| self.accepted as f64 / self.attempted as f64)
    }
}

/// Outcome of one shake sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ShakeReport {
    pub bonds: MoveCounts,
    pub angles: MoveCounts,
    pub torsions: MoveCounts,
    /// Sum of the energy changes of all accepted moves, in kJ/mol.
    pub energy_change: f64,
    pub bond_step: f64,
    pub angle_step: f64,
    pub torsion_step: f64,
}

impl ShakeReport {
    pub fn n_attempted(&self) -> usize {
        self.bonds.attempted + self.angles.attempted + self.torsions.attempted
    }

    pub fn n_accepted(&self) -> usize {
        self.bonds.accepted + self.angles.accepted + self.torsions.accepted
    }
}

/// Trial-move state for the molecule currently being shaken.
struct MoleculeShake<'k> {
    kernel: EnergyKernel<'k>,
    index: usize,
    beta: f64,
    term_energy_only: bool,
    pair_energy: f64,
    changes: ChangeStore,
    energy_change: f64,
}

impl MoleculeShake<'_> {
    fn pair_energy_of(&self, configuration: &Configuration) -> f64 {
        if self.term_energy_only {
            0.0
        } else {
            self.kernel
                .molecule_energy(configuration, self.index, Reduction::Pool)
        }
    }

    /// Displaces atoms with `displace`, then keeps or reverts the change by the Metropolis
    /// criterion on the molecule pair energy plus the bonded energy from `term_energy`.
    fn attempt<D, T>(
        &mut self,
        configuration: &mut Configuration,
        rng: &mut impl Rng,
        term: &mut f64,
        displace: D,
        term_energy: T,
    ) -> Result<bool, EngineError>
    where
        D: FnOnce(&mut Configuration),
        T: Fn(&Configuration) -> f64,
    {
        let (beta, term_energy_only, index, kernel) =
            (self.beta, self.term_energy_only, self.index, self.kernel);
        let pair_energy = &mut self.pair_energy;
        let energy_change = &mut self.energy_change;

        self.changes.trial(configuration, |configuration| {
            displace(configuration);
            let new_pair = if term_energy_only {
                0.0
            } else {
                kernel.molecule_energy(configuration, index, Reduction::Pool)
            };
            let new_term = term_energy(&*configuration);
            let delta = (new_pair + new_term) - (*pair_energy + *term);

            let accepted = metropolis_accept(delta, beta, rng);
            if accepted {
                *pair_energy = new_pair;
                *term = new_term;
                *energy_change += delta;
            }
            Ok(accepted)
        })
    }
}

fn translate(configuration: &mut Configuration, atoms: &[usize], shift: &Vector3<f64>) {
    for &atom in atoms {
        *configuration.position_mut(atom) += shift;
    }
}

fn rotate(
    configuration: &mut Configuration,
    atoms: &[usize],
    pivot: &Point3<f64>,
    rotation: &Rotation3<f64>,
) {
    for &atom in atoms {
        let arm = configuration
            .simulation_box()
            .minimum_vector(pivot, configuration.position(atom));
        *configuration.position_mut(atom) = pivot + rotation * arm;
    }
}

fn global_atoms(molecule: &Molecule, locals: &[usize]) -> Vec<usize> {
    locals.iter().map(|&l| molecule.global_index(l)).collect()
}

#[inline]
fn random_terminus(rng: &mut impl Rng) -> usize {
    if rng.r#gen::<f64>() > 0.5 { 1 } else { 0 }
}

#[inline]
fn plus_minus_one(rng: &mut impl Rng) -> f64 {
    rng.gen_range(-1.0..=1.0)
}

fn load_step(
    store: &ModuleStore,
    module: &str,
    item: &str,
    default: StepSize,
) -> Result<StepSize, EngineError> {
    let value = store.float(module, item)?.unwrap_or(default.value);
    Ok(StepSize {
        value: value.clamp(default.min, default.max),
        ..default
    })
}

/// Runs one intramolecular shake sweep over the target molecules of `configuration`.
///
/// Molecules are processed strictly in order, so an accepted move is seen by every later
/// molecule. For each molecule the bonds, then the angles, then the torsions are each shaken
/// `shakes_per_term` times, moving the rigid sub-tree on one randomly chosen side of the term.
/// A term that lies in a ring moves only one of its terminal atoms, and its moves are judged on
/// the whole bonded energy of the molecule instead of the term's own energy.
///
/// Step sizes are read from and written back to `store` under the module name, so they carry
/// over between sweeps and across restarts. The configuration's contents version is bumped if any
/// move was accepted.
///
/// # Errors
///
/// Returns [`EngineError::Initialization`] if `potentials` does not cover the configuration's
/// atom types, or [`EngineError::Store`] if a stored step size has the wrong type.
#[instrument(skip_all, name = "intra_shake_task")]
pub fn run(
    configuration: &mut Configuration,
    potentials: &PotentialMap,
    pool: &ProcessPool,
    config: &IntraShakeConfig,
    store: &mut ModuleStore,
    rng: &mut impl Rng,
    reporter: &ProgressReporter,
) -> Result<ShakeReport, EngineError> {
    let kernel = EnergyKernel::new(potentials, pool, config.cutoff);
    kernel.validate(configuration)?;

    let mut bond_step = load_step(store, &config.name, BOND_STEP_ITEM, config.bond_step)?;
    let mut angle_step = load_step(store, &config.name, ANGLE_STEP_ITEM, config.angle_step)?;
    let mut torsion_step =
        load_step(store, &config.name, TORSION_STEP_ITEM, config.torsion_step)?;

    let targets: Vec<usize> = (0..configuration.n_molecules())
        .filter(|&m| {
            config.restrict_to_species.is_empty()
                || config
                    .restrict_to_species
                    .iter()
                    .any(|name| name == configuration.molecule(m).species().name())
        })
        .collect();

    info!(
        n_molecules = targets.len(),
        bond_step = bond_step.value,
        angle_step = angle_step.value,
        torsion_step = torsion_step.value,
        "Starting intramolecular shake."
    );
    reporter.report(Progress::TaskStart {
        total_steps: targets.len() as u64,
    });

    let (mut bonds, mut angles, mut torsions) = (
        MoveCounts::default(),
        MoveCounts::default(),
        MoveCounts::default(),
    );
    let mut shake = MoleculeShake {
        kernel,
        index: 0,
        beta: beta(configuration.temperature()),
        term_energy_only: config.term_energy_only,
        pair_energy: 0.0,
        changes: ChangeStore::new(),
        energy_change: 0.0,
    };

    for &m in &targets {
        let molecule = configuration.molecule(m).clone();
        let species = molecule.species();
        shake.index = m;
        shake.changes.add_molecule(configuration, m)?;
        shake.pair_energy = shake.pair_energy_of(configuration);

        if config.adjust_bonds {
            for bond in species.bonds() {
                let judged = |c: &Configuration| {
                    if bond.attachment.is_in_cycle() {
                        kernel.intramolecular_energy(c, m).total()
                    } else {
                        kernel.bond_energy(c, &molecule, bond)
                    }
                };
                let mut term = judged(&*configuration);
                let terminus = random_terminus(rng);
                let moving = global_atoms(&molecule, bond.attachment.side(terminus));
                let [i, j] = bond.indices.map(|l| molecule.global_index(l));

                for _ in 0..config.shakes_per_term {
                    let v = configuration
                        .simulation_box()
                        .minimum_vector(configuration.position(i), configuration.position(j));
                    let Some(direction) = v.try_normalize(f64::EPSILON) else {
                        continue;
                    };
                    let shift = direction * (plus_minus_one(rng) * bond_step.value);
                    let accepted = shake.attempt(
                        configuration,
                        rng,
                        &mut term,
                        |c| translate(c, &moving, &shift),
                        &judged,
                    )?;
                    bonds.record(accepted);
                }
            }
        }

        if config.adjust_angles {
            for angle in species.angles() {
                let judged = |c: &Configuration| {
                    if angle.attachment.is_in_cycle() {
                        kernel.intramolecular_energy(c, m).total()
                    } else {
                        kernel.angle_energy(c, &molecule, angle)
                    }
                };
                let mut term = judged(&*configuration);
                let terminus = random_terminus(rng);
                let moving = global_atoms(&molecule, angle.attachment.side(terminus));
                let [i, j, k] = angle.indices.map(|l| molecule.global_index(l));

                for _ in 0..config.shakes_per_term {
                    let cell = configuration.simulation_box();
                    let pivot = *configuration.position(j);
                    let axis = cell
                        .minimum_vector(&pivot, configuration.position(i))
                        .cross(&cell.minimum_vector(&pivot, configuration.position(k)));
                    let Some(rotation) =
                        rotation_from_axis_angle(&axis, plus_minus_one(rng) * angle_step.value)
                    else {
                        continue;
                    };
                    let accepted = shake.attempt(
                        configuration,
                        rng,
                        &mut term,
                        |c| rotate(c, &moving, &pivot, &rotation),
                        &judged,
                    )?;
                    angles.record(accepted);
                }
            }
        }

        if config.adjust_torsions {
            for torsion in species.torsions() {
                let judged = |c: &Configuration| {
                    if torsion.attachment.is_in_cycle() {
                        kernel.intramolecular_energy(c, m).total()
                    } else {
                        kernel.torsion_energy(c, &molecule, torsion)
                    }
                };
                let mut term = judged(&*configuration);
                let terminus = random_terminus(rng);
                let moving = global_atoms(&molecule, torsion.attachment.side(terminus));
                let [_, j, k, _] = torsion.indices.map(|l| molecule.global_index(l));

                for _ in 0..config.shakes_per_term {
                    let axis = configuration
                        .simulation_box()
                        .minimum_vector(configuration.position(j), configuration.position(k));
                    let pivot = *configuration.position(if terminus == 0 { j } else { k });
                    let Some(rotation) =
                        rotation_from_axis_angle(&axis, plus_minus_one(rng) * torsion_step.value)
                    else {
                        continue;
                    };
                    let accepted = shake.attempt(
                        configuration,
                        rng,
                        &mut term,
                        |c| rotate(c, &moving, &pivot, &rotation),
                        &judged,
                    )?;
                    torsions.record(accepted);
                }
            }
        }

        shake.changes.store_and_reset();
        reporter.report(Progress::TaskIncrement);
    }

    let n_applied = shake.changes.distribute_and_apply(configuration);
    shake.changes.reset();
    reporter.report(Progress::TaskFinish);
    debug!(n_applied, "Distributed shaken positions.");

    for (enabled, counts, step, item, kind) in [
        (config.adjust_bonds, bonds, &mut bond_step, BOND_STEP_ITEM, "bond"),
        (config.adjust_angles, angles, &mut angle_step, ANGLE_STEP_ITEM, "angle"),
        (
            config.adjust_torsions,
            torsions,
            &mut torsion_step,
            TORSION_STEP_ITEM,
            "torsion",
        ),
    ] {
        if !enabled {
            continue;
        }
        if let Some(rate) = counts.rate() {
            step.rescale(counts.accepted, counts.attempted, config.target_acceptance_rate);
            info!(
                kind,
                rate_percent = 100.0 * rate,
                accepted = counts.accepted,
                attempted = counts.attempted,
                step = step.value,
                "Shake acceptance rate; step size updated."
            );
        }
        store.set_float(&config.name, item, step.value);
    }

    let report = ShakeReport {
        bonds,
        angles,
        torsions,
        energy_change: shake.energy_change,
        bond_step: bond_step.value,
        angle_step: angle_step.value,
        torsion_step: torsion_step.value,
    };

    if report.n_accepted() > 0 {
        configuration.increment_contents_version();
    }
    info!(
        energy_change = report.energy_change,
        attempted = report.n_attempted(),
        accepted = report.n_accepted(),
        "Intramolecular shake complete."
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::intramolecular::{AngleForm, BondForm, TorsionForm};
    use crate::core::forcefield::params::{AtomType, Forcefield, ShortRangeForm};
    use crate::core::forcefield::truncation::TabulationSettings;
    use crate::core::models::simulation_box::SimulationBox;
    use crate::core::models::species::{DEFAULT_SCALE_14, Species, SpeciesBuilder};
    use crate::engine::config::IntraShakeConfigBuilder;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;

    fn potentials(cfg: &Configuration) -> PotentialMap {
        let mut forcefield = Forcefield::new();
        for name in ["C", "Ar"] {
            forcefield.insert(AtomType::new(
                name,
                ShortRangeForm::LennardJones,
                vec![0.05, 3.0],
                0.0,
            ));
        }
        let settings = TabulationSettings {
            range: 8.0,
            delta: 0.01,
            include_coulomb: false,
            ..TabulationSettings::default()
        };
        PotentialMap::build(&forcefield, cfg.atom_types(), &settings).unwrap()
    }

    fn chain_species() -> Arc<Species> {
        let mut builder = SpeciesBuilder::new("Chain");
        for _ in 0..4 {
            builder.add_atom("C");
        }
        let bond = BondForm::Harmonic { k: 1000.0, eq: 1.5 };
        let angle = AngleForm::Harmonic { k: 300.0, eq: 110.0 };
        builder
            .add_bond(0, 1, bond)
            .add_bond(1, 2, bond)
            .add_bond(2, 3, bond)
            .add_angle(0, 1, 2, angle)
            .add_angle(1, 2, 3, angle)
            .add_torsion(
                [0, 1, 2, 3],
                TorsionForm::Cos3 {
                    k1: 3.0,
                    k2: 0.5,
                    k3: 2.0,
                },
                DEFAULT_SCALE_14,
            );
        Arc::new(builder.build().unwrap())
    }

    fn chain_positions(offset: f64) -> [Point3<f64>; 4] {
        [
            Point3::new(offset, 1.3, 0.0),
            Point3::new(offset, 0.0, 0.0),
            Point3::new(offset + 1.7, 0.0, 0.0),
            Point3::new(offset + 2.2, -1.0, 0.9),
        ]
    }

    fn chains(n: usize) -> Configuration {
        let species = chain_species();
        let mut cfg =
            Configuration::new("Chains", SimulationBox::cubic(40.0).unwrap(), 300.0).unwrap();
        for m in 0..n {
            cfg.add_molecule(&species, &chain_positions(10.0 * m as f64))
                .unwrap();
        }
        cfg
    }

    fn distance(cfg: &Configuration, i: usize, j: usize) -> f64 {
        cfg.simulation_box()
            .minimum_distance(cfg.position(i), cfg.position(j))
    }

    fn sweep(
        cfg: &mut Configuration,
        map: &PotentialMap,
        config: &IntraShakeConfig,
        store: &mut ModuleStore,
        rng: &mut StdRng,
    ) -> ShakeReport {
        run(
            cfg,
            map,
            &ProcessPool::serial(),
            config,
            store,
            rng,
            &ProgressReporter::new(),
        )
        .unwrap()
    }

    #[test]
    fn stretched_bonds_relax_towards_equilibrium() {
        let mut cfg = chains(1);
        let map = potentials(&cfg);
        let config = IntraShakeConfigBuilder::new()
            .adjust_angles(false)
            .adjust_torsions(false)
            .build()
            .unwrap();
        let mut store = ModuleStore::new();
        let mut rng = StdRng::seed_from_u64(11);

        assert!((distance(&cfg, 1, 2) - 1.7).abs() < 1e-12);
        for _ in 0..300 {
            sweep(&mut cfg, &map, &config, &mut store, &mut rng);
        }
        for (i, j) in [(0, 1), (1, 2), (2, 3)] {
            assert!(
                (distance(&cfg, i, j) - 1.5).abs() < 0.25,
                "bond {i}-{j} is {}",
                distance(&cfg, i, j)
            );
        }
    }

    #[test]
    fn step_sizes_are_persisted_and_reused() {
        let mut cfg = chains(2);
        let map = potentials(&cfg);
        let config = IntraShakeConfig::default();
        let mut store = ModuleStore::new();
        let mut rng = StdRng::seed_from_u64(5);

        let report = sweep(&mut cfg, &map, &config, &mut store, &mut rng);
        assert_eq!(report.bonds.attempted, 6);
        assert_eq!(report.angles.attempted, 4);
        assert_eq!(report.torsions.attempted, 2);
        assert_eq!(
            store.float("IntraShake", BOND_STEP_ITEM).unwrap(),
            Some(report.bond_step)
        );
        assert!(report.bond_step >= 0.001 && report.bond_step <= 0.2);
        assert!(report.angle_step >= 0.01 && report.angle_step <= 90.0);

        store.set_float("IntraShake", TORSION_STEP_ITEM, 1000.0);
        let report = sweep(&mut cfg, &map, &config, &mut store, &mut rng);
        assert!(report.torsion_step <= 45.0);
    }

    #[test]
    fn accepted_moves_bump_the_contents_version() {
        let mut cfg = chains(2);
        let map = potentials(&cfg);
        let config = IntraShakeConfigBuilder::new().shakes_per_term(3).build().unwrap();
        let mut store = ModuleStore::new();
        let mut rng = StdRng::seed_from_u64(8);
        let version = cfg.contents_version();

        let report = sweep(&mut cfg, &map, &config, &mut store, &mut rng);
        assert!(report.n_accepted() > 0);
        assert_eq!(cfg.contents_version(), version + 1);
    }

    #[test]
    fn rotations_preserve_bond_lengths() {
        let mut cfg = chains(1);
        let map = potentials(&cfg);
        let config = IntraShakeConfigBuilder::new()
            .adjust_bonds(false)
            .shakes_per_term(5)
            .build()
            .unwrap();
        let mut store = ModuleStore::new();
        let mut rng = StdRng::seed_from_u64(21);

        let before: Vec<f64> = [(0, 1), (1, 2), (2, 3)]
            .iter()
            .map(|&(i, j)| distance(&cfg, i, j))
            .collect();
        for _ in 0..20 {
            let report = sweep(&mut cfg, &map, &config, &mut store, &mut rng);
            assert_eq!(report.bonds.attempted, 0);
        }
        for (&(i, j), length) in [(0, 1), (1, 2), (2, 3)].iter().zip(before) {
            assert!((distance(&cfg, i, j) - length).abs() < 1e-9);
        }
    }

    fn triangle() -> (Configuration, [Point3<f64>; 3]) {
        let mut builder = SpeciesBuilder::new("Triangle");
        for _ in 0..3 {
            builder.add_atom("C");
        }
        let bond = BondForm::Harmonic { k: 1000.0, eq: 1.5 };
        builder
            .add_bond(0, 1, bond)
            .add_bond(1, 2, bond)
            .add_bond(2, 0, bond)
            .add_angle(0, 1, 2, AngleForm::Harmonic { k: 300.0, eq: 60.0 });
        let triangle = Arc::new(builder.build().unwrap());
        let mut cfg =
            Configuration::new("Ring", SimulationBox::cubic(20.0).unwrap(), 300.0).unwrap();
        let positions = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.6, 0.0, 0.0),
            Point3::new(0.8, 1.3, 0.0),
        ];
        cfg.add_molecule(&triangle, &positions).unwrap();
        (cfg, positions)
    }

    #[test]
    fn every_term_of_a_ring_is_shaken() {
        let (mut cfg, _) = triangle();
        let map = potentials(&cfg);
        let report = sweep(
            &mut cfg,
            &map,
            &IntraShakeConfig::default(),
            &mut ModuleStore::new(),
            &mut StdRng::seed_from_u64(1),
        );
        assert_eq!(report.bonds.attempted, 3);
        assert_eq!(report.angles.attempted, 1);
    }

    #[test]
    fn ring_angle_moves_are_judged_on_the_whole_bonded_energy() {
        let (mut cfg, positions) = triangle();
        let map = potentials(&cfg);
        let pool = ProcessPool::serial();
        let bonded = |cfg: &Configuration| {
            EnergyKernel::new(&map, &pool, None)
                .intramolecular_energy(cfg, 0)
                .total()
        };
        let config = IntraShakeConfigBuilder::new()
            .adjust_bonds(false)
            .shakes_per_term(10)
            .build()
            .unwrap();
        let mut store = ModuleStore::new();
        let mut rng = StdRng::seed_from_u64(1);

        let before = bonded(&cfg);
        let (mut accepted, mut energy_change) = (0, 0.0);
        for _ in 0..20 {
            let report = sweep(&mut cfg, &map, &config, &mut store, &mut rng);
            assert_eq!(report.angles.attempted, 10);
            accepted += report.n_accepted();
            energy_change += report.energy_change;
            assert_eq!(*cfg.position(1), positions[1]);
        }
        assert!(accepted > 0);
        let expected = bonded(&cfg) - before;
        assert!(
            (energy_change - expected).abs() < 1e-6,
            "accepted moves summed to {energy_change}, bonded energy changed by {expected}"
        );
    }

    fn argon() -> Arc<Species> {
        let mut builder = SpeciesBuilder::new("Argon");
        builder.add_atom("Ar");
        Arc::new(builder.build().unwrap())
    }

    /// One chain at the origin plus a lone argon atom at `neighbour`.
    fn chain_and_argon(neighbour: Point3<f64>) -> Configuration {
        let mut cfg = chains(1);
        cfg.add_molecule(&argon(), &[neighbour]).unwrap();
        cfg
    }

    fn shaken_chain(
        mut cfg: Configuration,
        config: &IntraShakeConfig,
    ) -> (Vec<Point3<f64>>, Vec<ShakeReport>) {
        let map = potentials(&cfg);
        let mut store = ModuleStore::new();
        let mut rng = StdRng::seed_from_u64(29);
        let reports = (0..5)
            .map(|_| sweep(&mut cfg, &map, config, &mut store, &mut rng))
            .collect();
        let chain = cfg.atoms()[..4].iter().map(|a| a.position).collect();
        (chain, reports)
    }

    #[test]
    fn term_energy_only_ignores_a_repulsive_neighbour() {
        let crowded = chain_and_argon(Point3::new(2.2, -1.0, 1.9));
        let map = potentials(&crowded);
        let pool = ProcessPool::serial();
        let kernel = EnergyKernel::new(&map, &pool, None);
        assert!(kernel.molecule_energy(&crowded, 0, Reduction::Solo) > 1e4);

        let config = IntraShakeConfigBuilder::new()
            .term_energy_only(true)
            .shakes_per_term(4)
            .build()
            .unwrap();
        let (crowded_chain, crowded_reports) = shaken_chain(crowded, &config);
        let (free_chain, free_reports) =
            shaken_chain(chain_and_argon(Point3::new(20.0, 20.0, 20.0)), &config);

        assert!(crowded_reports.iter().any(|r| r.n_accepted() > 0));
        assert_eq!(crowded_chain, free_chain);
        assert_eq!(crowded_reports, free_reports);
    }

    #[test]
    fn molecules_beyond_the_cutoff_do_not_affect_moves() {
        let near = chain_and_argon(Point3::new(2.2, -1.0, 7.4));
        let far = chain_and_argon(Point3::new(20.0, 20.0, 20.0));
        let map = potentials(&near);
        let pool = ProcessPool::serial();
        let full_range = EnergyKernel::new(&map, &pool, None);
        assert_ne!(
            full_range.molecule_energy(&near, 0, Reduction::Solo),
            full_range.molecule_energy(&far, 0, Reduction::Solo)
        );

        let config = IntraShakeConfigBuilder::new()
            .cutoff(4.0)
            .shakes_per_term(4)
            .build()
            .unwrap();
        let (near_chain, near_reports) = shaken_chain(near, &config);
        let (far_chain, far_reports) = shaken_chain(far, &config);

        assert!(near_reports.iter().any(|r| r.n_accepted() > 0));
        assert_eq!(near_chain, far_chain);
        assert_eq!(near_reports, far_reports);
    }

    #[test]
    fn restricted_species_leave_other_molecules_untouched() {
        let mut builder = SpeciesBuilder::new("Dimer");
        let a = builder.add_atom("Ar");
        let b = builder.add_atom("Ar");
        builder.add_bond(a, b, BondForm::Harmonic { k: 500.0, eq: 3.0 });
        let dimer = Arc::new(builder.build().unwrap());

        let mut cfg = chains(1);
        let dimer_positions = [Point3::new(20.0, 20.0, 20.0), Point3::new(24.0, 20.0, 20.0)];
        cfg.add_molecule(&dimer, &dimer_positions).unwrap();
        let map = potentials(&cfg);
        let config = IntraShakeConfigBuilder::new()
            .restrict_to_species(vec!["Chain".to_string()])
            .shakes_per_term(4)
            .build()
            .unwrap();

        let report = sweep(
            &mut cfg,
            &map,
            &config,
            &mut ModuleStore::new(),
            &mut StdRng::seed_from_u64(2),
        );
        assert_eq!(report.bonds.attempted, 12);
        assert_eq!(*cfg.position(4), dimer_positions[0]);
        assert_eq!(*cfg.position(5), dimer_positions[1]);
    }

    #[test]
    fn mismatched_potentials_are_rejected() {
        let mut cfg = chains(1);
        let mut argon_cfg =
            Configuration::new("Argon", SimulationBox::cubic(40.0).unwrap(), 300.0).unwrap();
        argon_cfg.add_molecule(&argon(), &[Point3::origin()]).unwrap();
        let map = potentials(&argon_cfg);

        let result = run(
            &mut cfg,
            &map,
            &ProcessPool::serial(),
            &IntraShakeConfig::default(),
            &mut ModuleStore::new(),
            &mut StdRng::seed_from_u64(3),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::Initialization(_))));
    }
}
