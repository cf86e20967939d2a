use super::config::ConfigError;
use super::store::StoreError;
use crate::core::forcefield::pair_potential::PairPotentialError;
use crate::core::forcefield::params::ParamLoadError;
use crate::core::io::error::ExportError;
use crate::core::models::error::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Pair potential error: {source}")]
    PairPotential {
        #[from]
        source: PairPotentialError,
    },

    #[error("Model error: {source}")]
    Model {
        #[from]
        source: ModelError,
    },

    #[error("Failed to load parameters: {source}")]
    ParamLoad {
        #[from]
        source: ParamLoadError,
    },

    #[error("Export failed: {source}")]
    Export {
        #[from]
        source: ExportError,
    },

    #[error("Module data error: {source}")]
    Store {
        #[from]
        source: StoreError,
    },

    #[error("Self-test failed: {details}")]
    SelfTestFailed { details: String },

    #[error("Phase '{phase}' failed: {reason}")]
    PhaseFailed { phase: &'static str, reason: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
