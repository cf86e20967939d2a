use super::error::ExportError;
use super::format::scientific;
use crate::core::forcefield::pair_potential::PairPotential;
use crate::core::forcefield::potential_map::PotentialMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const DLPOLY_TITLE_WIDTH: usize = 72;
const DLPOLY_VALUES_PER_LINE: usize = 4;

/// Writes one potential in the block format: a commented header followed by one row per grid
/// point holding `r`, the full energy and derivative, the original and additional parts, and the
/// analytic energy and derivative.
///
/// The analytic columns at `r = 0` follow the table convention of ten times the value at the
/// first grid point.
pub fn write_block<W: Write>(writer: &mut W, potential: &PairPotential) -> io::Result<()> {
    let (name_i, name_j) = potential.type_names().unwrap_or(("?", "?"));
    writeln!(writer, "# Pair potential {name_i}-{name_j}")?;
    writeln!(
        writer,
        "#{:>9}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}",
        "", "Full", "Derivative", "Original", "Additional", "Exact(Orig)", "Exact(Deriv)"
    )?;
    writeln!(
        writer,
        "#{:>9}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}",
        "r(Angs)",
        "U(kJ/mol)",
        "dU(kJ/mol/Ang)",
        "U(kJ/mol)",
        "U(kJ/mol)",
        "U(kJ/mol)",
        "dU(kJ/mol/Ang)"
    )?;

    let delta = potential.delta();
    for n in 0..potential.n_points() {
        let r = n as f64 * delta;
        let (exact_energy, exact_force) = if n == 0 {
            (
                10.0 * potential.analytic_energy(delta),
                10.0 * potential.analytic_force(delta),
            )
        } else {
            (potential.analytic_energy(r), potential.analytic_force(r))
        };
        writeln!(
            writer,
            "{}  {}  {}  {}  {}  {}  {}",
            scientific(r, 10, 6),
            scientific(potential.u_full().value(n), 12, 6),
            scientific(potential.du_full().value(n), 12, 6),
            scientific(potential.u_original().value(n), 12, 6),
            scientific(potential.u_additional().value(n), 12, 6),
            scientific(exact_energy, 12, 6),
            scientific(exact_force, 12, 6),
        )?;
    }
    Ok(())
}

/// Writes every tabulated potential in `map` to `<prefix>-<I>-<J>.pp`, returning the paths written.
pub fn save_blocks(map: &PotentialMap, prefix: &Path) -> Result<Vec<PathBuf>, ExportError> {
    let mut written = Vec::with_capacity(map.potentials().len());
    for potential in map.potentials().iter().filter(|p| p.is_tabulated()) {
        let (name_i, name_j) = potential.type_names().unwrap_or(("?", "?"));
        let path = PathBuf::from(format!(
            "{}-{name_i}-{name_j}.pp",
            prefix.to_string_lossy()
        ));
        let file = File::create(&path).map_err(|e| ExportError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        write_block(&mut writer, potential)
            .and_then(|_| writer.flush())
            .map_err(|e| ExportError::io(&path, e))?;
        written.push(path);
    }
    info!(n_files = written.len(), "Saved pair potentials in block format.");
    Ok(written)
}

/// Writes all tabulated potentials of `map` as a DL_POLY `TABLE` file.
///
/// The file holds a title record (truncated to 72 characters), a mesh record
/// `delta range n_points`, and for each pair a header `I J 0.0 0.0` followed by the energies and
/// then `-r dU/dr`, four values per line.
pub fn write_dlpoly_table<W: Write>(
    writer: &mut W,
    map: &PotentialMap,
    title: &str,
) -> io::Result<()> {
    let title: String = title.chars().take(DLPOLY_TITLE_WIDTH).collect();
    writeln!(writer, "{title}")?;

    let settings = map.settings();
    let n_points = map
        .potentials()
        .first()
        .map_or(0, PairPotential::n_points);
    writeln!(
        writer,
        "{}{}{:>10}",
        scientific(settings.delta, 15, 7),
        scientific(settings.range, 15, 7),
        n_points
    )?;

    for potential in map.potentials().iter().filter(|p| p.is_tabulated()) {
        let (name_i, name_j) = potential.type_names().unwrap_or(("?", "?"));
        writeln!(
            writer,
            "{name_i:<8}{name_j:<8}{}{}",
            scientific(0.0, 15, 7),
            scientific(0.0, 15, 7)
        )?;

        write_dlpoly_values(writer, potential.u_full().y())?;

        let virial: Vec<f64> = potential
            .du_full()
            .x()
            .iter()
            .zip(potential.du_full().y())
            .map(|(r, du)| -r * du)
            .collect();
        write_dlpoly_values(writer, &virial)?;
    }
    Ok(())
}

fn write_dlpoly_values<W: Write>(writer: &mut W, values: &[f64]) -> io::Result<()> {
    for chunk in values.chunks(DLPOLY_VALUES_PER_LINE) {
        let line: String = chunk.iter().map(|&v| scientific(v, 15, 7)).collect();
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

pub fn save_dlpoly_table(map: &PotentialMap, path: &Path, title: &str) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_dlpoly_table(&mut writer, map, title)
        .and_then(|_| writer.flush())
        .map_err(|e| ExportError::io(path, e))?;
    info!(path = %path.display(), n_pairs = map.potentials().len(), "Saved DL_POLY TABLE file.");
    Ok(())
}
