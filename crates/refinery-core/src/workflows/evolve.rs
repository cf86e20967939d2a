use crate::core::forcefield::potential_map::PotentialMap;
use crate::core::io::format::scientific;
use crate::core::models::configuration::Configuration;
use crate::engine::config::EvolveConfig;
use crate::engine::error::EngineError;
use crate::engine::process_pool::ProcessPool;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::store::{ModuleStore, StoredValue};
use crate::engine::tasks::energy::{self, EnergyReport};
use crate::engine::tasks::forces;
use crate::engine::tasks::intra_shake::{self, ShakeReport};
use nalgebra::{Point3, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, instrument};

pub const WORKFLOW_MODULE: &str = "Evolve";
pub const ITERATION_ITEM: &str = "Iteration";
pub const POSITIONS_ITEM: &str = "Positions";

#[derive(Debug, Clone)]
pub struct EvolveResult {
    /// Iterations performed by this call.
    pub iterations_run: usize,
    /// Iteration counter after the last iteration, including any carried over from a restart.
    pub last_iteration: usize,
    pub stable: bool,
    pub energy: Option<EnergyReport>,
    pub shake: Option<ShakeReport>,
    pub forces: Option<Vec<Vector3<f64>>>,
}

/// Records the coordinates of `configuration` in `store` under the configuration's name, as one
/// flat `x, y, z` series.
pub fn store_positions(configuration: &Configuration, store: &mut ModuleStore) {
    let coordinates = configuration
        .atoms()
        .iter()
        .flat_map(|atom| [atom.position.x, atom.position.y, atom.position.z])
        .collect();
    store.set(
        configuration.name(),
        POSITIONS_ITEM,
        StoredValue::Series(coordinates),
    );
}

/// Moves every atom of `configuration` to the coordinates recorded by [`store_positions`].
///
/// Returns `Ok(false)`, leaving the configuration untouched, when `store` holds no coordinates
/// for it.
///
/// # Errors
///
/// Returns [`EngineError::Initialization`] if the number of stored coordinates does not match the
/// configuration, or [`EngineError::Store`] if the item is not a series.
pub fn restore_positions(
    configuration: &mut Configuration,
    store: &ModuleStore,
) -> Result<bool, EngineError> {
    if !store.contains(configuration.name(), POSITIONS_ITEM) {
        return Ok(false);
    }
    let coordinates = store.series(configuration.name(), POSITIONS_ITEM)?;
    if coordinates.len() != 3 * configuration.n_atoms() {
        return Err(EngineError::Initialization(format!(
            "Restart data holds {} coordinates for configuration '{}', which needs {}.",
            coordinates.len(),
            configuration.name(),
            3 * configuration.n_atoms()
        )));
    }
    for (index, xyz) in coordinates.chunks_exact(3).enumerate() {
        configuration.set_position(index, Point3::new(xyz[0], xyz[1], xyz[2]))?;
    }
    configuration.increment_contents_version();
    info!(
        configuration = configuration.name(),
        n_atoms = configuration.n_atoms(),
        "Restored atom positions from module data."
    );
    Ok(true)
}

/// Evolves `configuration` for `config.iterations` iterations.
///
/// Each iteration runs the intramolecular shake (when configured), then the energy task, then the
/// forces task (when configured). The iteration counter continues from the value held in `store`,
/// so a run resumed from a restart file numbers its iterations after the previous run.
///
/// # Arguments
///
/// * `store` - Module data carried between iterations. The final coordinates are recorded in it
///   (see [`store_positions`]) and it is saved to `config.restart_path` on success.
///
/// # Errors
///
/// Returns the first error raised by a task, or [`EngineError::Store`] if the restart file cannot
/// be written.
#[instrument(skip_all, name = "evolve_workflow")]
pub fn run(
    configuration: &mut Configuration,
    potentials: &PotentialMap,
    pool: &ProcessPool,
    config: &EvolveConfig,
    store: &mut ModuleStore,
    reporter: &ProgressReporter,
) -> Result<EvolveResult, EngineError> {
    let first_iteration = store
        .integer(WORKFLOW_MODULE, ITERATION_ITEM)?
        .map_or(0, |n| usize::try_from(n).unwrap_or(0));
    let mut rng = StdRng::seed_from_u64(config.seed);

    info!(
        configuration = configuration.name(),
        iterations = config.iterations,
        first_iteration = first_iteration + 1,
        n_processes = pool.n_processes(),
        "Starting evolution."
    );

    let mut result = EvolveResult {
        iterations_run: 0,
        last_iteration: first_iteration,
        stable: false,
        energy: None,
        shake: None,
        forces: None,
    };

    for iteration in first_iteration + 1..=first_iteration + config.iterations {
        reporter.report(Progress::StatusUpdate {
            text: format!("Iteration {iteration}"),
        });

        if let Some(shake) = &config.shake {
            reporter.report(Progress::PhaseStart {
                name: "Intramolecular Shake",
            });
            result.shake = Some(intra_shake::run(
                configuration,
                potentials,
                pool,
                shake,
                store,
                &mut rng,
                reporter,
            )?);
            reporter.report(Progress::PhaseFinish);
        }

        reporter.report(Progress::PhaseStart { name: "Energy" });
        let report = energy::run(configuration, potentials, pool, &config.energy, store, iteration)?;
        reporter.report(Progress::PhaseFinish);

        if let Some(forces_config) = &config.forces {
            reporter.report(Progress::PhaseStart { name: "Forces" });
            result.forces = Some(forces::run(
                configuration,
                potentials,
                pool,
                forces_config,
                store,
            )?);
            reporter.report(Progress::PhaseFinish);
        }

        store.set_integer(WORKFLOW_MODULE, ITERATION_ITEM, iteration as i64);
        reporter.report(Progress::Message(format!(
            "Iteration {iteration}: total energy {} kJ/mol{}",
            scientific(report.total, 0, 6),
            if report.stable { " (stable)" } else { "" }
        )));

        result.iterations_run += 1;
        result.last_iteration = iteration;
        result.stable = report.stable;
        result.energy = Some(report);

        if config.stop_when_stable && result.stable {
            info!(iteration, "Energy is stable; stopping early.");
            break;
        }
    }

    store_positions(configuration, store);
    if let Some(path) = &config.restart_path {
        store.save(path)?;
    }

    info!(
        iterations_run = result.iterations_run,
        last_iteration = result.last_iteration,
        stable = result.stable,
        "Evolution complete."
    );
    Ok(result)
}
