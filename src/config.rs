// src/config.rs - Planner configuration file
//! # Planner Configuration
//!
//! Machine limits and per-plan options, loaded from TOML.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [limits]
//! v_max = { x = 300.0, y = 300.0, z = 150.0 }
//! a_max = { x = 50.0, y = 50.0, z = 25.0 }
//! junction_speed = 0.01
//! junction_deviation = 0.001
//!
//! [planner]
//! entry_velocity = 0.0
//! exit_velocity = 0.0
//! nominal_speed = 120.0
//! collinear_junction = "floor"      # or "unlimited"
//! reversal_junction = "full_stop"   # or "unconstrained"
//! ```
//!
//! Every key is optional; missing ones fall back to the defaults in
//! [`KinematicLimits`] and [`PlannerOptions`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::motion::{KinematicLimits, PlannerOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct: machine limits plus planner options.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub limits: KinematicLimits,
    #[serde(default)]
    pub planner: PlannerOptions,
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.limits.validate().map_err(|e| format!("[limits] {}", e))?;
        self.planner.validate().map_err(|e| format!("[planner] {}", e))?;
        Ok(())
    }
}

/// Parse and validate a configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<PlannerConfig, ConfigError> {
    let config: PlannerConfig = toml::from_str(contents)?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<PlannerConfig, ConfigError> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_config(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to load config '{}': {}", path.display(), e);
                Err(e)
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path.display(), e);
            Err(ConfigError::Io(e))
        }
    }
}

pub fn save_config(config: &PlannerConfig, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let toml_string = toml::to_string(config)?;
    std::fs::write(path, toml_string)?;
    Ok(())
}
