use crate::core::utils::interpolation::CurveError;
use phf::phf_map;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Short-range functional form declared by an atom type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum ShortRangeForm {
    /// No short-range interaction.
    None,
    /// Lennard-Jones 12-6, combined with Lorentz-Berthelot rules.
    LennardJones,
    /// Lennard-Jones 12-6, combined with geometric means for both parameters.
    LennardJonesGeometric,
}

static SHORT_RANGE_KEYWORDS: phf::Map<&'static str, ShortRangeForm> = phf_map! {
    "none" => ShortRangeForm::None,
    "lj" => ShortRangeForm::LennardJones,
    "lennardjones" => ShortRangeForm::LennardJones,
    "ljgeometric" => ShortRangeForm::LennardJonesGeometric,
    "lennardjonesgeometric" => ShortRangeForm::LennardJonesGeometric,
};

impl ShortRangeForm {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::LennardJones => "LJ",
            Self::LennardJonesGeometric => "LJGeometric",
        }
    }

    /// Number of leading entries of an atom type's parameter list this form reads.
    pub fn n_parameters(&self) -> usize {
        match self {
            Self::None => 0,
            Self::LennardJones | Self::LennardJonesGeometric => 2,
        }
    }
}

impl fmt::Display for ShortRangeForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unrecognised short-range functional form '{0}'")]
pub struct UnknownFormError(pub String);

impl FromStr for ShortRangeForm {
    type Err = UnknownFormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SHORT_RANGE_KEYWORDS
            .get(s.to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| UnknownFormError(s.to_string()))
    }
}

impl TryFrom<String> for ShortRangeForm {
    type Error = UnknownFormError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A named category of atom sharing short-range parameters and charge.
///
/// For the Lennard-Jones forms, `parameters[0]` is epsilon (kJ/mol) and `parameters[1]` is sigma
/// (Angstroms).
#[derive(Debug, Clone, PartialEq)]
pub struct AtomType {
    pub name: String,
    pub form: ShortRangeForm,
    pub parameters: Vec<f64>,
    pub charge: f64,
}

impl AtomType {
    pub fn new(name: &str, form: ShortRangeForm, parameters: Vec<f64>, charge: f64) -> Self {
        Self {
            name: name.to_string(),
            form,
            parameters,
            charge,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AtomTypeRecord {
    form: ShortRangeForm,
    #[serde(default)]
    parameters: Vec<f64>,
    #[serde(default)]
    charge: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ForcefieldFile {
    #[serde(rename = "atom-types", default)]
    atom_types: BTreeMap<String, AtomTypeRecord>,
}

/// The set of atom types available to a simulation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forcefield {
    atom_types: BTreeMap<String, AtomType>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid curve in '{path}': {source}")]
    Curve {
        path: String,
        source: CurveError,
    },
}

impl Forcefield {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads atom types from a TOML file of the form
    ///
    /// ```toml
    /// [atom-types.OW]
    /// form = "LJ"
    /// parameters = [0.6503, 3.165492]
    /// charge = -0.8476
    /// ```
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let file: ForcefieldFile = toml::from_str(content)?;
        let atom_types = file
            .atom_types
            .into_iter()
            .map(|(name, record)| {
                let atom_type =
                    AtomType::new(&name, record.form, record.parameters, record.charge);
                (name, atom_type)
            })
            .collect();
        Ok(Self { atom_types })
    }

    pub fn insert(&mut self, atom_type: AtomType) {
        self.atom_types.insert(atom_type.name.clone(), atom_type);
    }

    pub fn atom_type(&self, name: &str) -> Option<&AtomType> {
        self.atom_types.get(name)
    }

    pub fn atom_types(&self) -> impl Iterator<Item = &AtomType> {
        self.atom_types.values()
    }

    pub fn len(&self) -> usize {
        self.atom_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atom_types.is_empty()
    }
}
