use crate::cli::TestArgs;
use crate::config::PartialInputFile;
use crate::error::Result;
use crate::setup::build_simulation;
use refinery::core::io::format::scientific;
use refinery::engine::store::ModuleStore;
use refinery::engine::tasks::{energy, forces};
use tracing::info;

/// Runs one energy pass and, unless disabled, one force pass with their self-tests enabled.
///
/// Nothing is persisted: the module store lives only for the duration of the command.
pub fn run(args: TestArgs, threads: Option<usize>) -> Result<()> {
    let input = PartialInputFile::from_file(&args.input)?;
    let (energy_config, forces_config) = input.merge_with_test_args(&args)?;
    let pool = super::process_pool(threads, &input)?;
    let simulation = build_simulation(&input)?;
    let mut store = ModuleStore::new();

    info!("Running energy self-test...");
    let report = energy::run(
        &simulation.configuration,
        &simulation.potentials,
        &pool,
        &energy_config,
        &mut store,
        0,
    )?;
    println!(
        "Energy self-test passed: total {} kJ/mol (inter {}, intra {})",
        scientific(report.total, 0, 6),
        scientific(report.inter, 0, 6),
        scientific(report.intra.total(), 0, 6)
    );

    if let Some(forces_config) = forces_config {
        info!("Running force self-test...");
        let forces = forces::run(
            &simulation.configuration,
            &simulation.potentials,
            &pool,
            &forces_config,
            &mut store,
        )?;
        let max = forces.iter().map(|f| f.norm()).fold(0.0, f64::max);
        println!(
            "Force self-test passed for {} atoms (largest force magnitude {})",
            forces.len(),
            scientific(max, 0, 6)
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use crate::setup::tests::write_water_input;
    use refinery::engine::error::EngineError;
    use tempfile::tempdir;

    fn args(input: std::path::PathBuf) -> TestArgs {
        TestArgs {
            input,
            analytic: false,
            energy_threshold: None,
            force_threshold: None,
            no_forces: false,
        }
    }

    #[test]
    fn production_results_agree_with_the_reference() {
        let dir = tempdir().unwrap();
        let input = write_water_input(dir.path(), "");
        run(args(input), Some(3)).unwrap();
    }

    #[test]
    fn wrong_external_reference_fails_the_test() {
        let dir = tempdir().unwrap();
        let input = write_water_input(dir.path(), "[energy]\ntest-reference-inter = 1.0e6\n");
        let result = run(args(input), Some(2));
        assert!(matches!(
            result,
            Err(CliError::Core(EngineError::SelfTestFailed { .. }))
        ));
    }
}
