use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access module data file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse module data file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize module data: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Item '{item}' of module '{module}' is not a {expected}")]
    TypeMismatch {
        module: String,
        item: String,
        expected: &'static str,
    },
}

/// A single restart-persistable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Series(Vec<f64>),
}

impl StoredValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Series(_) => "series",
        }
    }
}

/// Per-module key/value data that survives between iterations and across restarts.
///
/// Items are addressed by the unique name of the owning module and an item name, e.g.
/// `("IntraShake", "BondStepSize")`. The store round-trips through a TOML file with one table
/// per module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleStore {
    modules: BTreeMap<String, BTreeMap<String, StoredValue>>,
}

impl ModuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let store: Self = toml::from_str(&content).map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!(path = %path.display(), n_modules = store.modules.len(), "Loaded module data.");
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let content = toml::to_string(self)?;
        fs::write(path, content).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!(path = %path.display(), n_modules = self.modules.len(), "Saved module data.");
        Ok(())
    }

    pub fn contains(&self, module: &str, item: &str) -> bool {
        self.get(module, item).is_some()
    }

    pub fn get(&self, module: &str, item: &str) -> Option<&StoredValue> {
        self.modules.get(module).and_then(|items| items.get(item))
    }

    pub fn set(&mut self, module: &str, item: &str, value: StoredValue) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(item.to_string(), value);
    }

    /// A float item; integers are widened.
    pub fn float(&self, module: &str, item: &str) -> Result<Option<f64>, StoreError> {
        match self.get(module, item) {
            None => Ok(None),
            Some(StoredValue::Float(value)) => Ok(Some(*value)),
            Some(StoredValue::Integer(value)) => Ok(Some(*value as f64)),
            Some(_) => Err(mismatch(module, item, "float")),
        }
    }

    pub fn set_float(&mut self, module: &str, item: &str, value: f64) {
        self.set(module, item, StoredValue::Float(value));
    }

    pub fn bool(&self, module: &str, item: &str) -> Result<Option<bool>, StoreError> {
        match self.get(module, item) {
            None => Ok(None),
            Some(StoredValue::Bool(value)) => Ok(Some(*value)),
            Some(_) => Err(mismatch(module, item, "boolean")),
        }
    }

    pub fn set_bool(&mut self, module: &str, item: &str, value: bool) {
        self.set(module, item, StoredValue::Bool(value));
    }

    pub fn integer(&self, module: &str, item: &str) -> Result<Option<i64>, StoreError> {
        match self.get(module, item) {
            None => Ok(None),
            Some(StoredValue::Integer(value)) => Ok(Some(*value)),
            Some(_) => Err(mismatch(module, item, "integer")),
        }
    }

    pub fn set_integer(&mut self, module: &str, item: &str, value: i64) {
        self.set(module, item, StoredValue::Integer(value));
    }

    /// A float series; a missing item is an empty series.
    pub fn series(&self, module: &str, item: &str) -> Result<&[f64], StoreError> {
        match self.get(module, item) {
            None => Ok(&[]),
            Some(StoredValue::Series(values)) => Ok(values.as_slice()),
            Some(_) => Err(mismatch(module, item, "series")),
        }
    }

    /// Appends to a series, creating it if absent.
    pub fn push_to_series(&mut self, module: &str, item: &str, value: f64) -> Result<(), StoreError> {
        let slot = self
            .modules
            .entry(module.to_string())
            .or_default()
            .entry(item.to_string())
            .or_insert_with(|| StoredValue::Series(Vec::new()));
        match slot {
            StoredValue::Series(values) => {
                values.push(value);
                Ok(())
            }
            other => Err(StoreError::TypeMismatch {
                module: module.to_string(),
                item: format!("{item} ({})", other.kind()),
                expected: "series",
            }),
        }
    }
}

fn mismatch(module: &str, item: &str, expected: &'static str) -> StoreError {
    StoreError::TypeMismatch {
        module: module.to_string(),
        item: item.to_string(),
        expected,
    }
}
