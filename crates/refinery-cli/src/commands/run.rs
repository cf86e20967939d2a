use crate::cli::RunArgs;
use crate::config::PartialInputFile;
use crate::error::Result;
use crate::setup::build_simulation;
use crate::utils::progress::CliProgressHandler;
use refinery::core::io::format::scientific;
use refinery::core::models::configuration::Configuration;
use refinery::engine::error::EngineError;
use refinery::engine::progress::ProgressReporter;
use refinery::engine::store::ModuleStore;
use refinery::engine::tasks::energy::EnergyReport;
use refinery::workflows;
use refinery::workflows::evolve::restore_positions;
use std::path::Path;
use tracing::info;

/// Loads the module data at `path`, if it exists, and moves the configuration's atoms to the
/// coordinates recorded there.
fn load_restart(path: Option<&Path>, configuration: &mut Configuration) -> Result<ModuleStore> {
    let Some(path) = path.filter(|p| p.exists()) else {
        return Ok(ModuleStore::new());
    };
    info!("Restarting from {:?}", path);
    let store = ModuleStore::load(path).map_err(EngineError::from)?;
    if !restore_positions(configuration, &store)? {
        info!("Restart data holds no coordinates; keeping the input positions.");
    }
    Ok(store)
}

fn energy_summary(energy: &EnergyReport) -> [String; 2] {
    [
        format!(
            "  Total energy: {} kJ/mol (inter {}, intra {})",
            scientific(energy.total, 0, 6),
            scientific(energy.inter, 0, 6),
            scientific(energy.intra.total(), 0, 6)
        ),
        format!(
            "  Energy gradient: {} ({})",
            scientific(energy.gradient, 0, 6),
            if energy.stable { "stable" } else { "not stable" }
        ),
    ]
}

pub fn run(args: RunArgs, threads: Option<usize>, quiet: bool) -> Result<()> {
    let input = PartialInputFile::from_file(&args.input)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = input.merge_with_run_args(&args)?;
    let pool = super::process_pool(threads, &input)?;

    let mut simulation = build_simulation(&input)?;

    if let Some(directory) = &config.energy.log_directory {
        std::fs::create_dir_all(directory)?;
    }

    let mut store = load_restart(config.restart_path.as_deref(), &mut simulation.configuration)?;

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Evolving '{}' for {} iteration(s)...",
        simulation.configuration.name(),
        config.iterations
    );
    info!("Invoking the core evolve workflow...");

    let result = workflows::evolve::run(
        &mut simulation.configuration,
        &simulation.potentials,
        &pool,
        &config,
        &mut store,
        &reporter,
    )?;

    println!(
        "Ran {} iteration(s), last iteration {}.",
        result.iterations_run, result.last_iteration
    );
    if let Some(energy) = &result.energy {
        for line in energy_summary(energy) {
            println!("{line}");
        }
    }
    if let Some(shake) = &result.shake {
        println!(
            "  Last shake: {} of {} moves accepted",
            shake.n_accepted(),
            shake.n_attempted()
        );
    }
    if let Some(path) = &config.restart_path {
        println!("  Restart data written to: {}", path.display());
    }

    Ok(())
}
