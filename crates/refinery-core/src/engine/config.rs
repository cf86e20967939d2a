use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// An adaptive step size bounded by `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSize {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl StepSize {
    pub fn new(value: f64, min: f64, max: f64) -> Self {
        Self { value, min, max }
    }

    /// Rescales the step towards `target` acceptance: shrinks by 0.8 when nothing was accepted,
    /// otherwise scales by `rate / target`, then clamps into the bounds. Unchanged when nothing
    /// was attempted.
    pub fn rescale(&mut self, accepted: usize, attempted: usize, target: f64) {
        if attempted == 0 {
            return;
        }
        let factor = if accepted == 0 {
            0.8
        } else {
            (accepted as f64 / attempted as f64) / target
        };
        self.value = (self.value * factor).clamp(self.min, self.max);
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if !(self.min > 0.0 && self.min <= self.max) {
            return Err(ConfigError::InvalidParameter {
                name,
                reason: format!("bounds [{}, {}] must satisfy 0 < min <= max", self.min, self.max),
            });
        }
        if !(self.min..=self.max).contains(&self.value) {
            return Err(ConfigError::InvalidParameter {
                name,
                reason: format!(
                    "step {} lies outside [{}, {}]",
                    self.value, self.min, self.max
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntraShakeConfig {
    /// Key under which step sizes are persisted in the module store.
    pub name: String,
    pub adjust_bonds: bool,
    pub adjust_angles: bool,
    pub adjust_torsions: bool,
    /// Bond step in Angstroms.
    pub bond_step: StepSize,
    /// Angle step in degrees.
    pub angle_step: StepSize,
    /// Torsion step in degrees.
    pub torsion_step: StepSize,
    pub target_acceptance_rate: f64,
    pub shakes_per_term: usize,
    /// Drive acceptance with the bonded term energy alone, ignoring pair energies.
    pub term_energy_only: bool,
    /// Pair cutoff in Angstroms; the pair potential range when `None`.
    pub cutoff: Option<f64>,
    /// Only shake molecules of these species; every molecule when empty.
    pub restrict_to_species: Vec<String>,
}

impl Default for IntraShakeConfig {
    fn default() -> Self {
        Self {
            name: "IntraShake".to_string(),
            adjust_bonds: true,
            adjust_angles: true,
            adjust_torsions: true,
            bond_step: StepSize::new(0.01, 0.001, 0.2),
            angle_step: StepSize::new(10.0, 0.01, 90.0),
            torsion_step: StepSize::new(20.0, 0.5, 45.0),
            target_acceptance_rate: 0.33,
            shakes_per_term: 1,
            term_energy_only: false,
            cutoff: None,
            restrict_to_species: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct IntraShakeConfigBuilder {
    config: IntraShakeConfig,
}

impl IntraShakeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }
    pub fn adjust_bonds(mut self, enabled: bool) -> Self {
        self.config.adjust_bonds = enabled;
        self
    }
    pub fn adjust_angles(mut self, enabled: bool) -> Self {
        self.config.adjust_angles = enabled;
        self
    }
    pub fn adjust_torsions(mut self, enabled: bool) -> Self {
        self.config.adjust_torsions = enabled;
        self
    }
    pub fn bond_step(mut self, step: StepSize) -> Self {
        self.config.bond_step = step;
        self
    }
    pub fn angle_step(mut self, step: StepSize) -> Self {
        self.config.angle_step = step;
        self
    }
    pub fn torsion_step(mut self, step: StepSize) -> Self {
        self.config.torsion_step = step;
        self
    }
    pub fn target_acceptance_rate(mut self, rate: f64) -> Self {
        self.config.target_acceptance_rate = rate;
        self
    }
    pub fn shakes_per_term(mut self, n: usize) -> Self {
        self.config.shakes_per_term = n;
        self
    }
    pub fn term_energy_only(mut self, enabled: bool) -> Self {
        self.config.term_energy_only = enabled;
        self
    }
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.config.cutoff = Some(cutoff);
        self
    }
    pub fn restrict_to_species(mut self, species: Vec<String>) -> Self {
        self.config.restrict_to_species = species;
        self
    }

    pub fn build(self) -> Result<IntraShakeConfig, ConfigError> {
        let config = self.config;
        config.bond_step.validate("bond_step")?;
        config.angle_step.validate("angle_step")?;
        config.torsion_step.validate("torsion_step")?;
        if !(config.target_acceptance_rate > 0.0 && config.target_acceptance_rate <= 1.0) {
            return Err(ConfigError::InvalidParameter {
                name: "target_acceptance_rate",
                reason: format!("{} is not in (0, 1]", config.target_acceptance_rate),
            });
        }
        if config.shakes_per_term == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "shakes_per_term",
                reason: "at least one shake per term is required".to_string(),
            });
        }
        if let Some(cutoff) = config.cutoff {
            if !(cutoff.is_finite() && cutoff > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name: "cutoff",
                    reason: format!("{cutoff} is not a positive distance"),
                });
            }
        }
        Ok(config)
    }
}

/// Serial self-test settings for the energy task.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyTestConfig {
    /// Compute the reference from analytic potentials instead of the tabulated ones.
    pub analytic: bool,
    /// Largest acceptable absolute difference, in kJ/mol.
    pub threshold: f64,
    pub reference_inter: Option<f64>,
    pub reference_intra: Option<f64>,
}

impl Default for EnergyTestConfig {
    fn default() -> Self {
        Self {
            analytic: false,
            threshold: 0.1,
            reference_inter: None,
            reference_intra: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyConfig {
    pub name: String,
    pub stability_window: usize,
    /// Relative slope below which the energy counts as stable.
    pub stability_threshold: f64,
    /// Directory receiving `<configuration>.energy.txt`; no log when `None`.
    pub log_directory: Option<PathBuf>,
    pub test: Option<EnergyTestConfig>,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            name: "Energy".to_string(),
            stability_window: 10,
            stability_threshold: 0.01,
            log_directory: None,
            test: None,
        }
    }
}

#[derive(Default)]
pub struct EnergyConfigBuilder {
    config: EnergyConfig,
}

impl EnergyConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }
    pub fn stability_window(mut self, window: usize) -> Self {
        self.config.stability_window = window;
        self
    }
    pub fn stability_threshold(mut self, threshold: f64) -> Self {
        self.config.stability_threshold = threshold;
        self
    }
    pub fn log_directory(mut self, directory: PathBuf) -> Self {
        self.config.log_directory = Some(directory);
        self
    }
    pub fn test(mut self, test: EnergyTestConfig) -> Self {
        self.config.test = Some(test);
        self
    }

    pub fn build(self) -> Result<EnergyConfig, ConfigError> {
        let config = self.config;
        if config.stability_window < 2 {
            return Err(ConfigError::InvalidParameter {
                name: "stability_window",
                reason: format!("{} points cannot define a slope", config.stability_window),
            });
        }
        if config.test.as_ref().is_some_and(|t| !(t.threshold >= 0.0)) {
            return Err(ConfigError::InvalidParameter {
                name: "test_threshold",
                reason: "threshold must be non-negative".to_string(),
            });
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForcesConfig {
    pub name: String,
    /// Run the serial self-test against the production forces.
    pub test: bool,
    pub test_analytic: bool,
    /// Largest acceptable per-component error, in percent of the reference component.
    pub test_threshold: f64,
    /// Externally computed forces (kJ/mol/Angstrom), one per atom, to compare against.
    pub reference_forces: Option<Vec<[f64; 3]>>,
}

impl Default for ForcesConfig {
    fn default() -> Self {
        Self {
            name: "Forces".to_string(),
            test: false,
            test_analytic: false,
            test_threshold: 0.1,
            reference_forces: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvolveConfig {
    pub iterations: usize,
    pub seed: u64,
    pub stop_when_stable: bool,
    pub shake: Option<IntraShakeConfig>,
    pub energy: EnergyConfig,
    pub forces: Option<ForcesConfig>,
    /// Module store written after the final iteration.
    pub restart_path: Option<PathBuf>,
}

#[derive(Default)]
pub struct EvolveConfigBuilder {
    iterations: Option<usize>,
    seed: Option<u64>,
    stop_when_stable: bool,
    shake: Option<IntraShakeConfig>,
    energy: Option<EnergyConfig>,
    forces: Option<ForcesConfig>,
    restart_path: Option<PathBuf>,
}

impl EvolveConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = Some(iterations);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn stop_when_stable(mut self, enabled: bool) -> Self {
        self.stop_when_stable = enabled;
        self
    }
    pub fn shake(mut self, config: IntraShakeConfig) -> Self {
        self.shake = Some(config);
        self
    }
    pub fn energy(mut self, config: EnergyConfig) -> Self {
        self.energy = Some(config);
        self
    }
    pub fn forces(mut self, config: ForcesConfig) -> Self {
        self.forces = Some(config);
        self
    }
    pub fn restart_path(mut self, path: PathBuf) -> Self {
        self.restart_path = Some(path);
        self
    }

    pub fn build(self) -> Result<EvolveConfig, ConfigError> {
        Ok(EvolveConfig {
            iterations: self
                .iterations
                .ok_or(ConfigError::MissingParameter("iterations"))?,
            seed: self.seed.ok_or(ConfigError::MissingParameter("seed"))?,
            stop_when_stable: self.stop_when_stable,
            shake: self.shake,
            energy: self.energy.unwrap_or_default(),
            forces: self.forces,
            restart_path: self.restart_path,
        })
    }
}
