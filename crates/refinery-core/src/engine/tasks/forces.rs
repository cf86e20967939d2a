use crate::core::forcefield::potential_map::PotentialMap;
use crate::core::models::configuration::Configuration;
use crate::engine::config::ForcesConfig;
use crate::engine::error::EngineError;
use crate::engine::kernel::Reduction;
use crate::engine::kernel::force::ForceKernel;
use crate::engine::kernel::reference::ReferenceKernel;
use crate::engine::process_pool::ProcessPool;
use crate::engine::store::{ModuleStore, StoredValue};
use nalgebra::Vector3;
use tracing::{debug, info, instrument, warn};

pub const FX_ITEM: &str = "FX";
pub const FY_ITEM: &str = "FY";
pub const FZ_ITEM: &str = "FZ";

/// Reference components smaller than this are compared by absolute rather than relative error.
const RELATIVE_FLOOR: f64 = 1.0e-6;

/// Per-component error of `actual` against `correct`: a percentage of `correct`, or the plain
/// difference when `correct` is close to zero.
fn component_errors(correct: &Vector3<f64>, actual: &Vector3<f64>) -> Vector3<f64> {
    Vector3::from_fn(|k, _| {
        let diff = correct[k] - actual[k];
        if correct[k].abs() > RELATIVE_FLOOR {
            diff * 100.0 / correct[k]
        } else {
            diff
        }
    })
}

/// Outcome of comparing one set of forces against another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceComparison {
    pub n_failed: usize,
    /// Mean absolute error over all compared components.
    pub mean_error: f64,
}

/// Compares `actual` against `correct` atom by atom, logging every atom with a component error
/// above `threshold`.
fn compare(label: &str, correct: &[Vector3<f64>], actual: &[Vector3<f64>], threshold: f64) -> ForceComparison {
    let mut n_failed = 0;
    let mut sum_error = 0.0;
    for (n, (c, a)) in correct.iter().zip(actual).enumerate() {
        let errors = component_errors(c, a);
        sum_error += errors.abs().sum();
        if errors.iter().any(|e| e.abs() > threshold) {
            n_failed += 1;
            warn!(
                atom = n,
                dx = c.x - a.x,
                dy = c.y - a.y,
                dz = c.z - a.z,
                ex = errors.x,
                ey = errors.y,
                ez = errors.z,
                "{label}: atom has erroneous force components."
            );
        }
    }
    let n_components = 3 * correct.len().max(1);
    let comparison = ForceComparison {
        n_failed,
        mean_error: sum_error / n_components as f64,
    };
    let verdict = if n_failed == 0 { "OK" } else { "NOT OK" };
    info!(
        mean_error = comparison.mean_error,
        "{label}: number of atoms with failed force components = {n_failed} = {verdict}."
    );
    comparison
}

fn sum(a: &[Vector3<f64>], b: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

fn self_test(
    configuration: &Configuration,
    kernel: &ForceKernel<'_>,
    potentials: &PotentialMap,
    pool: &ProcessPool,
    config: &ForcesConfig,
) -> Result<(), EngineError> {
    info!(
        configuration = configuration.name(),
        analytic = config.test_analytic,
        threshold_percent = config.test_threshold,
        "Calculating forces in serial test mode."
    );

    let reference = ReferenceKernel::new(potentials, config.test_analytic);
    let correct_inter = reference.interatomic_forces(configuration);
    let correct_intra = reference.intramolecular_forces(configuration);
    let inter = kernel.interatomic_forces(configuration, Reduction::Pool);
    let intra = kernel.intramolecular_forces(configuration, Reduction::Pool);

    let mut failures = Vec::new();
    for (label, correct, actual) in [
        ("inter reference vs production", &correct_inter, &inter),
        ("intra reference vs production", &correct_intra, &intra),
    ] {
        let outcome = compare(label, correct, actual, config.test_threshold);
        if outcome.n_failed > 0 {
            failures.push(format!("{label}: {} atoms failed", outcome.n_failed));
        }
    }

    if let Some(external) = &config.reference_forces {
        if external.len() != configuration.n_atoms() {
            return Err(EngineError::Initialization(format!(
                "{} reference forces supplied but configuration '{}' has {} atoms",
                external.len(),
                configuration.name(),
                configuration.n_atoms()
            )));
        }
        let external: Vec<Vector3<f64>> = external.iter().map(|f| Vector3::from(*f)).collect();
        let correct_total = sum(&correct_inter, &correct_intra);
        let production_total = sum(&inter, &intra);
        for (label, correct, actual) in [
            ("external vs reference", &correct_total, &external),
            ("external vs production", &production_total, &external),
        ] {
            let outcome = compare(label, correct, actual, config.test_threshold);
            if outcome.n_failed > 0 {
                failures.push(format!("{label}: {} atoms failed", outcome.n_failed));
            }
        }
    }

    if pool.all_true(|_| failures.is_empty()) {
        Ok(())
    } else {
        Err(EngineError::SelfTestFailed {
            details: failures.join("; "),
        })
    }
}

/// Calculates the total force on every atom and stores the components as the `FX`, `FY` and `FZ`
/// series under `config.name`.
///
/// With `config.test` set, the production pair and bonded forces are first checked against the
/// serial reference (and against `config.reference_forces` when given).
///
/// # Errors
///
/// Returns [`EngineError::SelfTestFailed`] if any atom fails the comparison, or
/// [`EngineError::Initialization`] if the potentials or reference forces do not fit the
/// configuration.
#[instrument(skip_all, name = "forces_task")]
pub fn run(
    configuration: &Configuration,
    potentials: &PotentialMap,
    pool: &ProcessPool,
    config: &ForcesConfig,
    store: &mut ModuleStore,
) -> Result<Vec<Vector3<f64>>, EngineError> {
    let kernel = ForceKernel::new(potentials, pool, None);
    kernel.validate(configuration)?;

    if config.test {
        self_test(configuration, &kernel, potentials, pool, config)?;
    }

    let forces = kernel.total_forces(configuration, Reduction::Pool);
    let net: Vector3<f64> = forces.iter().sum();
    debug!(
        n_atoms = forces.len(),
        net = net.norm(),
        "Total forces calculated."
    );

    for (item, k) in [(FX_ITEM, 0), (FY_ITEM, 1), (FZ_ITEM, 2)] {
        store.set(
            &config.name,
            item,
            StoredValue::Series(forces.iter().map(|f| f[k]).collect()),
        );
    }
    Ok(forces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::intramolecular::{AngleForm, BondForm};
    use crate::core::forcefield::params::{AtomType, Forcefield, ShortRangeForm};
    use crate::core::forcefield::truncation::TabulationSettings;
    use crate::core::models::simulation_box::SimulationBox;
    use crate::core::models::species::SpeciesBuilder;
    use nalgebra::Point3;
    use std::sync::Arc;

    fn triatomic_box() -> (Configuration, PotentialMap) {
        let mut forcefield = Forcefield::new();
        forcefield.insert(AtomType::new(
            "C",
            ShortRangeForm::LennardJones,
            vec![0.3, 3.2],
            0.0,
        ));
        let mut builder = SpeciesBuilder::new("Bent");
        let a = builder.add_atom("C");
        let b = builder.add_atom("C");
        let c = builder.add_atom("C");
        builder
            .add_bond(a, b, BondForm::Harmonic { k: 2000.0, eq: 1.4 })
            .add_bond(b, c, BondForm::Harmonic { k: 2000.0, eq: 1.4 })
            .add_angle(a, b, c, AngleForm::Harmonic { k: 400.0, eq: 105.0 });
        let bent = Arc::new(builder.build().unwrap());

        let mut cfg =
            Configuration::new("Bent", SimulationBox::cubic(12.0).unwrap(), 300.0).unwrap();
        for [x, y, z] in [[1.0, 1.0, 1.0], [4.6, 1.3, 0.8], [1.2, 4.9, 2.0]] {
            let origin = Point3::new(x, y, z);
            cfg.add_molecule(
                &bent,
                &[
                    origin,
                    origin + Vector3::new(1.5, 0.1, 0.0),
                    origin + Vector3::new(1.9, 1.45, 0.1),
                ],
            )
            .unwrap();
        }
        let settings = TabulationSettings {
            range: 6.0,
            delta: 0.001,
            include_coulomb: false,
            ..TabulationSettings::default()
        };
        let map = PotentialMap::build(&forcefield, cfg.atom_types(), &settings).unwrap();
        (cfg, map)
    }

    #[test]
    fn component_errors_are_relative_unless_reference_is_tiny() {
        let errors = component_errors(&Vector3::new(10.0, 1.0e-8, -2.0), &Vector3::new(9.0, 0.0, -2.0));
        assert!((errors.x - 10.0).abs() < 1e-12);
        assert!((errors.y - 1.0e-8).abs() < 1e-20);
        assert_eq!(errors.z, 0.0);
    }

    #[test]
    fn run_stores_components_and_net_force_vanishes() {
        let (cfg, map) = triatomic_box();
        let pool = ProcessPool::new(2).unwrap();
        let mut store = ModuleStore::new();
        let forces = run(&cfg, &map, &pool, &ForcesConfig::default(), &mut store).unwrap();

        assert_eq!(forces.len(), cfg.n_atoms());
        let net: Vector3<f64> = forces.iter().sum();
        assert!(net.norm() < 1e-8);
        let fx = store.series("Forces", FX_ITEM).unwrap();
        assert_eq!(fx.len(), cfg.n_atoms());
        assert_eq!(fx[4], forces[4].x);
        assert_eq!(store.series("Forces", FZ_ITEM).unwrap()[2], forces[2].z);
    }

    #[test]
    fn self_test_passes_for_consistent_kernels() {
        let (cfg, map) = triatomic_box();
        let pool = ProcessPool::new(3).unwrap();
        let config = ForcesConfig {
            test: true,
            ..ForcesConfig::default()
        };
        assert!(run(&cfg, &map, &pool, &config, &mut ModuleStore::new()).is_ok());
    }

    #[test]
    fn self_test_accepts_matching_external_forces() {
        let (cfg, map) = triatomic_box();
        let pool = ProcessPool::serial();
        let expected = ForceKernel::new(&map, &pool, None).total_forces(&cfg, Reduction::Solo);
        let config = ForcesConfig {
            test: true,
            reference_forces: Some(expected.iter().map(|f| [f.x, f.y, f.z]).collect()),
            ..ForcesConfig::default()
        };
        assert!(run(&cfg, &map, &pool, &config, &mut ModuleStore::new()).is_ok());
    }

    #[test]
    fn self_test_rejects_wrong_external_forces() {
        let (cfg, map) = triatomic_box();
        let config = ForcesConfig {
            test: true,
            reference_forces: Some(vec![[1.0e3, -1.0e3, 5.0e2]; cfg.n_atoms()]),
            ..ForcesConfig::default()
        };
        let result = run(&cfg, &map, &ProcessPool::serial(), &config, &mut ModuleStore::new());
        assert!(matches!(result, Err(EngineError::SelfTestFailed { .. })));
    }

    #[test]
    fn external_forces_must_cover_every_atom() {
        let (cfg, map) = triatomic_box();
        let config = ForcesConfig {
            test: true,
            reference_forces: Some(vec![[0.0; 3]; 2]),
            ..ForcesConfig::default()
        };
        let result = run(&cfg, &map, &ProcessPool::serial(), &config, &mut ModuleStore::new());
        assert!(matches!(result, Err(EngineError::Initialization(_))));
    }
}
