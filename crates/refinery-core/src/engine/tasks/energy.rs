use crate::core::forcefield::potential_map::PotentialMap;
use crate::core::forcefield::term::IntramolecularEnergy;
use crate::core::io::energy_log::{EnergyLog, EnergyRecord};
use crate::core::models::configuration::Configuration;
use crate::core::utils::regression::linear_fit_tail;
use crate::engine::config::{EnergyConfig, EnergyTestConfig};
use crate::engine::error::EngineError;
use crate::engine::kernel::Reduction;
use crate::engine::kernel::energy::EnergyKernel;
use crate::engine::kernel::reference::ReferenceKernel;
use crate::engine::process_pool::ProcessPool;
use crate::engine::store::ModuleStore;
use tracing::{debug, info, instrument, warn};

pub const INTER_ITEM: &str = "Inter";
pub const INTRA_ITEM: &str = "Intra";
pub const BOND_ITEM: &str = "Bond";
pub const ANGLE_ITEM: &str = "Angle";
pub const TORSION_ITEM: &str = "Torsion";
pub const TOTAL_ITEM: &str = "Total";
pub const GRADIENT_ITEM: &str = "EnergyGradient";
pub const STABLE_ITEM: &str = "EnergyStable";
pub const STABILITY_ITEM: &str = "EnergyStability";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stability {
    /// Slope of the fitted line, in kJ/mol per iteration.
    pub gradient: f64,
    /// `|threshold * mean|` of the fitted window.
    pub limit: f64,
    pub stable: bool,
}

/// Fits the last `window` points of `history` and calls the energy stable when the absolute slope
/// is below `threshold` times the absolute mean.
///
/// Returns `None` while fewer than `window` points exist.
pub fn assess_stability(history: &[f64], window: usize, threshold: f64) -> Option<Stability> {
    let fit = linear_fit_tail(history, window)?;
    let limit = (threshold * fit.mean).abs();
    Some(Stability {
        gradient: fit.slope,
        limit,
        stable: fit.slope.abs() < limit,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyReport {
    pub inter: f64,
    pub intra: IntramolecularEnergy,
    pub total: f64,
    pub gradient: f64,
    pub stable: bool,
}

/// One row of the energy self-test.
struct Comparison {
    label: &'static str,
    delta: f64,
}

impl Comparison {
    fn new(label: &'static str, expected: f64, actual: f64) -> Self {
        Self {
            label,
            delta: expected - actual,
        }
    }

    fn passes(&self, threshold: f64) -> bool {
        self.delta.abs() < threshold
    }
}

fn self_test(
    configuration: &Configuration,
    kernel: &EnergyKernel<'_>,
    pool: &ProcessPool,
    test: &EnergyTestConfig,
) -> Result<(), EngineError> {
    info!(
        analytic = test.analytic,
        threshold = test.threshold,
        "All energies will be calculated in serial test mode and compared to production values."
    );

    let reference = ReferenceKernel::new(kernel.potentials(), test.analytic);
    let correct_inter = reference.interatomic_energy(configuration);
    let correct_intra = reference.intramolecular_energy(configuration).total();
    info!(
        inter = correct_inter,
        intra = correct_intra,
        total = correct_inter + correct_intra,
        "Reference energies (kJ/mol)."
    );

    let inter = kernel.interatomic_energy(configuration, Reduction::Pool);
    let intra = kernel
        .total_intramolecular_energy(configuration, Reduction::Pool)
        .total();
    info!(
        inter,
        intra,
        total = inter + intra,
        "Production energies (kJ/mol)."
    );

    let mut comparisons = Vec::with_capacity(6);
    if let Some(expected) = test.reference_inter {
        comparisons.push(Comparison::new("external inter vs reference", expected, correct_inter));
        comparisons.push(Comparison::new("external inter vs production", expected, inter));
    }
    if let Some(expected) = test.reference_intra {
        comparisons.push(Comparison::new("external intra vs reference", expected, correct_intra));
        comparisons.push(Comparison::new("external intra vs production", expected, intra));
    }
    comparisons.push(Comparison::new("inter reference vs production", correct_inter, inter));
    comparisons.push(Comparison::new("intra reference vs production", correct_intra, intra));

    let mut failures = Vec::new();
    for comparison in &comparisons {
        let ok = comparison.passes(test.threshold);
        let verdict = if ok { "OK" } else { "NOT OK" };
        if ok {
            info!(
                delta = comparison.delta,
                "{} delta is {verdict} (threshold is {:e} kJ/mol).",
                comparison.label,
                test.threshold
            );
        } else {
            warn!(
                delta = comparison.delta,
                "{} delta is {verdict} (threshold is {:e} kJ/mol).",
                comparison.label,
                test.threshold
            );
            failures.push(format!("{} differs by {:e} kJ/mol", comparison.label, comparison.delta));
        }
    }

    let threshold = test.threshold;
    if pool.all_true(|_| comparisons.iter().all(|c| c.passes(threshold))) {
        Ok(())
    } else {
        Err(EngineError::SelfTestFailed {
            details: failures.join("; "),
        })
    }
}

/// Calculates the energy of `configuration`, appends it to the stored history under
/// `config.name` and judges whether the total has stabilised.
///
/// When `config.test` is set, the serial reference is computed first and compared with the
/// production values; the production pass only runs if every comparison passes.
///
/// # Arguments
///
/// * `iteration` - Iteration number written to the energy log.
///
/// # Errors
///
/// Returns [`EngineError::SelfTestFailed`] if the self-test finds a difference above its
/// threshold, [`EngineError::Initialization`] if `potentials` does not cover the configuration,
/// and store or export errors from persisting the results.
#[instrument(skip_all, name = "energy_task")]
pub fn run(
    configuration: &Configuration,
    potentials: &PotentialMap,
    pool: &ProcessPool,
    config: &EnergyConfig,
    store: &mut ModuleStore,
    iteration: usize,
) -> Result<EnergyReport, EngineError> {
    let kernel = EnergyKernel::new(potentials, pool, None);
    kernel.validate(configuration)?;

    if let Some(test) = &config.test {
        self_test(configuration, &kernel, pool, test)?;
    }

    let inter = kernel.interatomic_energy(configuration, Reduction::Pool);
    let intra = kernel.total_intramolecular_energy(configuration, Reduction::Pool);
    let total = inter + intra.total();
    info!(
        configuration = configuration.name(),
        total,
        inter,
        intra = intra.total(),
        "Total energy (kJ/mol)."
    );
    debug!(
        bond = intra.bond,
        angle = intra.angle,
        torsion = intra.torsion,
        "Intramolecular contributions (kJ/mol)."
    );

    let module = config.name.as_str();
    for (item, value) in [
        (INTER_ITEM, inter),
        (INTRA_ITEM, intra.total()),
        (BOND_ITEM, intra.bond),
        (ANGLE_ITEM, intra.angle),
        (TORSION_ITEM, intra.torsion),
        (TOTAL_ITEM, total),
    ] {
        store.push_to_series(module, item, value)?;
    }

    let (gradient, stable) = match assess_stability(
        store.series(module, TOTAL_ITEM)?,
        config.stability_window,
        config.stability_threshold,
    ) {
        Some(stability) => {
            info!(
                "Gradient of last {} points is {:e} kJ/mol/step (absolute threshold value is {:e}, stable = {}).",
                config.stability_window, stability.gradient, stability.limit, stability.stable
            );
            (stability.gradient, stability.stable)
        }
        None => {
            info!("Too few points to assess stability.");
            (0.0, false)
        }
    };
    store.set_float(module, GRADIENT_ITEM, gradient);
    store.set_bool(module, STABLE_ITEM, stable);
    store.push_to_series(module, STABILITY_ITEM, f64::from(u8::from(stable)))?;

    if let Some(directory) = &config.log_directory {
        EnergyLog::new(directory, configuration.name()).append(&EnergyRecord {
            iteration,
            inter,
            bond: intra.bond,
            angle: intra.angle,
            torsion: intra.torsion,
            gradient,
            stable,
        })?;
    }

    Ok(EnergyReport {
        inter,
        intra,
        total,
        gradient,
        stable,
    })
}
