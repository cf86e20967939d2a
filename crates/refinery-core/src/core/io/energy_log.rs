use super::error::ExportError;
use super::format::scientific;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// One line of the per-configuration energy log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyRecord {
    pub iteration: usize,
    pub inter: f64,
    pub bond: f64,
    pub angle: f64,
    pub torsion: f64,
    pub gradient: f64,
    pub stable: bool,
}

impl EnergyRecord {
    pub fn total(&self) -> f64 {
        self.inter + self.bond + self.angle + self.torsion
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "  {:>10}  {}  {}  {}  {}  {}  {}  {}",
            self.iteration,
            scientific(self.total(), 12, 6),
            scientific(self.inter, 12, 6),
            scientific(self.bond, 12, 6),
            scientific(self.angle, 12, 6),
            scientific(self.torsion, 12, 6),
            scientific(self.gradient, 12, 6),
            u8::from(self.stable)
        )
    }
}

/// Append-only energy log `<configuration>.energy.txt`.
///
/// The header is written only when the file does not exist yet, so logs continue across restarts.
#[derive(Debug, Clone)]
pub struct EnergyLog {
    path: PathBuf,
    configuration: String,
}

impl EnergyLog {
    pub fn new(directory: &Path, configuration: &str) -> Self {
        Self {
            path: directory.join(format!("{configuration}.energy.txt")),
            configuration: configuration.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &EnergyRecord) -> Result<(), ExportError> {
        let write_header = !self.path.exists();
        let mut file = self.open().map_err(|e| ExportError::io(&self.path, e))?;
        if write_header {
            self.write_header(&mut file)
                .map_err(|e| ExportError::io(&self.path, e))?;
        }
        record
            .write_to(&mut file)
            .map_err(|e| ExportError::io(&self.path, e))
    }

    fn open(&self) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
    }

    fn write_header<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "# Energies for Configuration '{}'.", self.configuration)?;
        writeln!(writer, "# All values in kJ/mol.")?;
        writeln!(
            writer,
            "# Iteration   Total         Inter         Bond          Angle         Torsion       Gradient      S?"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record(iteration: usize, stable: bool) -> EnergyRecord {
        EnergyRecord {
            iteration,
            inter: -1234.5,
            bond: 10.0,
            angle: 4.5,
            torsion: 0.0,
            gradient: -0.25,
            stable,
        }
    }

    #[test]
    fn header_is_written_once_and_rows_append() {
        let dir = tempdir().unwrap();
        let log = EnergyLog::new(dir.path(), "water");
        log.append(&record(1, false)).unwrap();
        log.append(&record(2, true)).unwrap();

        let text = fs::read_to_string(dir.path().join("water.energy.txt")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "# Energies for Configuration 'water'.");
        assert_eq!(lines[1], "# All values in kJ/mol.");
        assert_eq!(
            lines[3],
            "           1  -1.220000e+03  -1.234500e+03  1.000000e+01  4.500000e+00  0.000000e+00  -2.500000e-01  0"
        );
        assert!(lines[4].ends_with("  1"));
    }

    #[test]
    fn reopening_an_existing_log_does_not_repeat_the_header() {
        let dir = tempdir().unwrap();
        EnergyLog::new(dir.path(), "water")
            .append(&record(1, false))
            .unwrap();
        EnergyLog::new(dir.path(), "water")
            .append(&record(2, false))
            .unwrap();

        let text = fs::read_to_string(dir.path().join("water.energy.txt")).unwrap();
        assert_eq!(text.matches("# Energies").count(), 1);
    }

    #[test]
    fn append_reports_unwritable_directory() {
        let dir = tempdir().unwrap();
        let log = EnergyLog::new(&dir.path().join("missing"), "water");
        assert!(matches!(
            log.append(&record(1, false)),
            Err(ExportError::Io { .. })
        ));
    }
}
