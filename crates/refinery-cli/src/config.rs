mod defaults;

use self::defaults::DefaultsConfig;
use crate::cli::{RunArgs, TestArgs};
use crate::error::{CliError, Result};
use refinery::core::forcefield::truncation::{
    CoulombTruncation, ShortRangeTruncation, TabulationSettings, TruncationSettings,
};
use refinery::engine::config as core_config;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case", tag = "type", deny_unknown_fields)]
pub enum PartialBox {
    NonPeriodic,
    Cubic { length: f64 },
    Orthorhombic { lengths: [f64; 3] },
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case", tag = "type", deny_unknown_fields)]
enum PartialShortRangeTruncation {
    None,
    Shifted,
    Cosine { width: f64 },
}

impl From<PartialShortRangeTruncation> for ShortRangeTruncation {
    fn from(p: PartialShortRangeTruncation) -> Self {
        match p {
            PartialShortRangeTruncation::None => ShortRangeTruncation::None,
            PartialShortRangeTruncation::Shifted => ShortRangeTruncation::Shifted,
            PartialShortRangeTruncation::Cosine { width } => ShortRangeTruncation::Cosine { width },
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
enum PartialCoulombTruncation {
    None,
    Shifted,
}

impl From<PartialCoulombTruncation> for CoulombTruncation {
    fn from(p: PartialCoulombTruncation) -> Self {
        match p {
            PartialCoulombTruncation::None => CoulombTruncation::None,
            PartialCoulombTruncation::Shifted => CoulombTruncation::Shifted,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialTabulation {
    range: Option<f64>,
    delta: Option<f64>,
    include_coulomb: Option<bool>,
    short_range_truncation: Option<PartialShortRangeTruncation>,
    coulomb_truncation: Option<PartialCoulombTruncation>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialBond {
    pub atoms: [usize; 2],
    pub form: String,
    #[serde(default)]
    pub parameters: Vec<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialAngle {
    pub atoms: [usize; 3],
    pub form: String,
    #[serde(default)]
    pub parameters: Vec<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialTorsion {
    pub atoms: [usize; 4],
    pub form: String,
    #[serde(default)]
    pub parameters: Vec<f64>,
    /// 1-4 pair scaling; the species default when absent.
    pub scale_14: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialSpecies {
    pub name: String,
    pub atoms: Vec<String>,
    #[serde(default)]
    pub bonds: Vec<PartialBond>,
    #[serde(default)]
    pub angles: Vec<PartialAngle>,
    #[serde(default)]
    pub torsions: Vec<PartialTorsion>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialMolecule {
    pub species: String,
    pub positions: Vec<[f64; 3]>,
}

/// A tabulated correction added to one pair potential.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialAdditional {
    pub types: [String; 2],
    /// Two-column `r,u` CSV file.
    pub path: PathBuf,
}

#[derive(Deserialize, Debug, Default, Clone, Copy)]
#[serde(deny_unknown_fields)]
struct PartialStepSize {
    value: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

impl PartialStepSize {
    fn merge(self, default: core_config::StepSize) -> core_config::StepSize {
        core_config::StepSize::new(
            self.value.unwrap_or(default.value),
            self.min.unwrap_or(default.min),
            self.max.unwrap_or(default.max),
        )
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialIntraShake {
    name: Option<String>,
    adjust_bonds: Option<bool>,
    adjust_angles: Option<bool>,
    adjust_torsions: Option<bool>,
    bond_step: Option<PartialStepSize>,
    angle_step: Option<PartialStepSize>,
    torsion_step: Option<PartialStepSize>,
    target_acceptance_rate: Option<f64>,
    shakes_per_term: Option<usize>,
    term_energy_only: Option<bool>,
    cutoff: Option<f64>,
    restrict_to_species: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialEnergy {
    name: Option<String>,
    stability_window: Option<usize>,
    stability_threshold: Option<f64>,
    /// Append to `<configuration>.energy.txt` in the output directory.
    save: Option<bool>,
    test: Option<bool>,
    test_analytic: Option<bool>,
    test_threshold: Option<f64>,
    test_reference_inter: Option<f64>,
    test_reference_intra: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialForces {
    name: Option<String>,
    test: Option<bool>,
    test_analytic: Option<bool>,
    test_threshold: Option<f64>,
    reference_forces: Option<Vec<[f64; 3]>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialEvolve {
    iterations: Option<usize>,
    seed: Option<u64>,
    stop_when_stable: Option<bool>,
    restart: Option<PathBuf>,
}

/// The simulation input file as written by the user; every section is optional until merged.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialInputFile {
    name: Option<String>,
    temperature: Option<f64>,
    forcefield: Option<PathBuf>,
    #[serde(rename = "box")]
    cell: Option<PartialBox>,
    processes: Option<usize>,
    tabulation: Option<PartialTabulation>,
    #[serde(default)]
    species: Vec<PartialSpecies>,
    #[serde(default)]
    molecules: Vec<PartialMolecule>,
    #[serde(default)]
    additional: Vec<PartialAdditional>,
    evolve: Option<PartialEvolve>,
    intra_shake: Option<PartialIntraShake>,
    energy: Option<PartialEnergy>,
    forces: Option<PartialForces>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl PartialInputFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading input from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut input: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        input.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(input)
    }

    /// Resolves `path` against the directory holding the input file.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| DefaultsConfig::default().configuration_name)
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
            .unwrap_or(DefaultsConfig::default().temperature)
    }

    pub fn forcefield_path(&self) -> Result<PathBuf> {
        self.forcefield
            .as_deref()
            .map(|p| self.resolve(p))
            .ok_or_else(|| CliError::Config("`forcefield` is required.".to_string()))
    }

    pub fn cell(&self) -> Result<PartialBox> {
        self.cell
            .ok_or_else(|| CliError::Config("`box` section is required.".to_string()))
    }

    pub fn processes(&self) -> Option<usize> {
        self.processes
    }

    pub fn species(&self) -> &[PartialSpecies] {
        &self.species
    }

    pub fn molecules(&self) -> &[PartialMolecule] {
        &self.molecules
    }

    pub fn additional(&self) -> &[PartialAdditional] {
        &self.additional
    }

    pub fn tabulation(&self) -> TabulationSettings {
        let defaults = TabulationSettings::default();
        let Some(p) = &self.tabulation else {
            return defaults;
        };
        TabulationSettings {
            range: p.range.unwrap_or(defaults.range),
            delta: p.delta.unwrap_or(defaults.delta),
            include_coulomb: p.include_coulomb.unwrap_or(defaults.include_coulomb),
            truncation: TruncationSettings::new(
                p.short_range_truncation
                    .map(Into::into)
                    .unwrap_or(defaults.truncation.short_range),
                p.coulomb_truncation
                    .map(Into::into)
                    .unwrap_or(defaults.truncation.coulomb),
            ),
        }
    }

    /// Merges the `[evolve]`, `[intra-shake]`, `[energy]` and `[forces]` sections with the `run`
    /// arguments. Command-line values win over the file, the file over the defaults.
    pub fn merge_with_run_args(&self, args: &RunArgs) -> Result<core_config::EvolveConfig> {
        let defaults = DefaultsConfig::default();
        let evolve = self.evolve.as_ref();

        let iterations = args
            .iterations
            .or(evolve.and_then(|e| e.iterations))
            .unwrap_or(defaults.iterations);
        let seed = match args.seed.or(evolve.and_then(|e| e.seed)) {
            Some(seed) => seed,
            None => {
                let seed = rand::random::<u64>();
                info!(seed, "No seed given; using a random one.");
                seed
            }
        };

        let mut builder = core_config::EvolveConfigBuilder::new()
            .iterations(iterations)
            .seed(seed)
            .stop_when_stable(
                args.until_stable || evolve.and_then(|e| e.stop_when_stable).unwrap_or(false),
            );

        if let Some(shake) = &self.intra_shake {
            builder = builder.shake(Self::merge_intra_shake(shake)?);
        }

        let energy_file = self.energy.as_ref();
        let save = energy_file
            .and_then(|e| e.save)
            .unwrap_or(defaults.energy_log);
        let log_directory = args.output_dir.clone().filter(|_| save);
        builder = builder.energy(Self::merge_energy(energy_file, log_directory, None)?);

        if let Some(forces) = &self.forces {
            builder = builder.forces(Self::merge_forces(Some(forces), None));
        }

        let restart = args
            .restart
            .clone()
            .or_else(|| evolve.and_then(|e| e.restart.as_deref()).map(|p| self.resolve(p)));
        if let Some(path) = restart {
            builder = builder.restart_path(path);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    /// Energy and force settings for a single self-test pass; the tests are always enabled.
    pub fn merge_with_test_args(
        &self,
        args: &TestArgs,
    ) -> Result<(core_config::EnergyConfig, Option<core_config::ForcesConfig>)> {
        let energy_file = self.energy.as_ref();
        let defaults = core_config::EnergyTestConfig::default();
        let test = core_config::EnergyTestConfig {
            analytic: args.analytic || energy_file.and_then(|e| e.test_analytic).unwrap_or(false),
            threshold: args
                .energy_threshold
                .or(energy_file.and_then(|e| e.test_threshold))
                .unwrap_or(defaults.threshold),
            reference_inter: energy_file.and_then(|e| e.test_reference_inter),
            reference_intra: energy_file.and_then(|e| e.test_reference_intra),
        };
        let energy = Self::merge_energy(energy_file, None, Some(test))?;

        let forces = (!args.no_forces).then(|| {
            let mut forces = Self::merge_forces(self.forces.as_ref(), args.force_threshold);
            forces.test = true;
            forces.test_analytic |= args.analytic;
            forces
        });
        Ok((energy, forces))
    }

    fn merge_intra_shake(p: &PartialIntraShake) -> Result<core_config::IntraShakeConfig> {
        let defaults = core_config::IntraShakeConfig::default();
        let mut builder = core_config::IntraShakeConfigBuilder::new()
            .adjust_bonds(p.adjust_bonds.unwrap_or(defaults.adjust_bonds))
            .adjust_angles(p.adjust_angles.unwrap_or(defaults.adjust_angles))
            .adjust_torsions(p.adjust_torsions.unwrap_or(defaults.adjust_torsions))
            .bond_step(p.bond_step.unwrap_or_default().merge(defaults.bond_step))
            .angle_step(p.angle_step.unwrap_or_default().merge(defaults.angle_step))
            .torsion_step(p.torsion_step.unwrap_or_default().merge(defaults.torsion_step))
            .target_acceptance_rate(
                p.target_acceptance_rate
                    .unwrap_or(defaults.target_acceptance_rate),
            )
            .shakes_per_term(p.shakes_per_term.unwrap_or(defaults.shakes_per_term))
            .term_energy_only(p.term_energy_only.unwrap_or(defaults.term_energy_only))
            .restrict_to_species(p.restrict_to_species.clone().unwrap_or_default());
        if let Some(name) = &p.name {
            builder = builder.name(name);
        }
        if let Some(cutoff) = p.cutoff {
            builder = builder.cutoff(cutoff);
        }
        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_energy(
        p: Option<&PartialEnergy>,
        log_directory: Option<PathBuf>,
        test_override: Option<core_config::EnergyTestConfig>,
    ) -> Result<core_config::EnergyConfig> {
        let defaults = core_config::EnergyConfig::default();
        let mut builder = core_config::EnergyConfigBuilder::new()
            .stability_window(
                p.and_then(|e| e.stability_window)
                    .unwrap_or(defaults.stability_window),
            )
            .stability_threshold(
                p.and_then(|e| e.stability_threshold)
                    .unwrap_or(defaults.stability_threshold),
            );
        if let Some(name) = p.and_then(|e| e.name.as_deref()) {
            builder = builder.name(name);
        }
        if let Some(directory) = log_directory {
            builder = builder.log_directory(directory);
        }

        let file_test = p.filter(|e| e.test.unwrap_or(false)).map(|e| {
            let test_defaults = core_config::EnergyTestConfig::default();
            core_config::EnergyTestConfig {
                analytic: e.test_analytic.unwrap_or(test_defaults.analytic),
                threshold: e.test_threshold.unwrap_or(test_defaults.threshold),
                reference_inter: e.test_reference_inter,
                reference_intra: e.test_reference_intra,
            }
        });
        if let Some(test) = test_override.or(file_test) {
            builder = builder.test(test);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_forces(
        p: Option<&PartialForces>,
        threshold_override: Option<f64>,
    ) -> core_config::ForcesConfig {
        let defaults = core_config::ForcesConfig::default();
        let Some(p) = p else {
            return core_config::ForcesConfig {
                test_threshold: threshold_override.unwrap_or(defaults.test_threshold),
                ..defaults
            };
        };
        core_config::ForcesConfig {
            name: p.name.clone().unwrap_or(defaults.name),
            test: p.test.unwrap_or(defaults.test),
            test_analytic: p.test_analytic.unwrap_or(defaults.test_analytic),
            test_threshold: threshold_override
                .or(p.test_threshold)
                .unwrap_or(defaults.test_threshold),
            reference_forces: p.reference_forces.clone(),
        }
    }
}
