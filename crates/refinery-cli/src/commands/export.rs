use crate::cli::{ExportArgs, ExportFormat};
use crate::config::PartialInputFile;
use crate::error::Result;
use crate::setup::build_simulation;
use refinery::core::io::pair_potential::{save_blocks, save_dlpoly_table};
use refinery::engine::error::EngineError;
use tracing::info;

pub fn run(args: ExportArgs) -> Result<()> {
    let input = PartialInputFile::from_file(&args.input)?;
    let simulation = build_simulation(&input)?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match args.format {
        ExportFormat::Block => {
            let paths =
                save_blocks(&simulation.potentials, &args.output).map_err(EngineError::from)?;
            info!("Wrote {} pair potential block file(s).", paths.len());
            println!("Wrote {} pair potential file(s):", paths.len());
            for path in paths {
                println!("  {}", path.display());
            }
        }
        ExportFormat::Dlpoly => {
            let title = format!("Pair potentials for {}", simulation.configuration.name());
            save_dlpoly_table(&simulation.potentials, &args.output, &title)
                .map_err(EngineError::from)?;
            info!("Wrote DL_POLY table to {:?}", args.output);
            println!("DL_POLY table written to: {}", args.output.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::tests::write_water_input;
    use tempfile::tempdir;

    #[test]
    fn block_export_writes_one_file_per_type_pair() {
        let dir = tempdir().unwrap();
        let input = write_water_input(dir.path(), "");
        let prefix = dir.path().join("pp").join("water");

        run(ExportArgs {
            input,
            format: ExportFormat::Block,
            output: prefix,
        })
        .unwrap();

        let mut written: Vec<_> = std::fs::read_dir(dir.path().join("pp"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        written.sort();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|name| name.starts_with("water-") && name.ends_with(".pp")));
    }

    #[test]
    fn dlpoly_export_writes_a_single_table() {
        let dir = tempdir().unwrap();
        let input = write_water_input(dir.path(), "");
        let output = dir.path().join("TABLE");

        run(ExportArgs {
            input,
            format: ExportFormat::Dlpoly,
            output: output.clone(),
        })
        .unwrap();

        let content = std::fs::read_to_string(output).unwrap();
        assert!(content.starts_with("Pair potentials for Water"));
    }
}
