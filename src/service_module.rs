//! Jellyfin-RPC service module
//!
//! Takes the rust representation of the `services.jellyfin-rpc` options
//! and evaluates them into the rendered `main.json` plus the user unit
//! that runs the presence binary against it.

use format_serde_error::SerdeError;
use log::{debug, info};

use crate::{Error, Result};

pub mod compiler;
pub mod deployment;
pub mod options;
pub mod structured_config;
pub mod unit;

pub use compiler::Artifact;
pub use deployment::Deployment;
pub use options::ServiceConfig;
pub use structured_config::StructuredConfig;
pub use unit::UnitDescriptor;

/// Where an evaluation leaves the service
///
/// Starting and stopping a declared unit is up to the supervision system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// No unit exists
    Disabled,

    /// The unit exists and is pulled in by its targets
    Declared,
}

/// Service Module Struct
///
/// Owns one set of module options for the duration of an evaluation
pub struct ServiceModule {
    options: ServiceConfig,
}

impl ServiceModule {
    /// Create a new module instance
    pub fn new(options: ServiceConfig) -> Self {
        Self { options }
    }

    /// Parse the json representation of the module options
    pub fn from_json(input: &str) -> Result<Self> {
        let options = serde_json::from_str(input)
            .map_err(|e| Error::Schema(SerdeError::new(input.to_string(), e)))?;

        Ok(Self::new(options))
    }

    /// Options this module was created from
    pub fn options(&self) -> &ServiceConfig {
        &self.options
    }

    /// Evaluate the options
    ///
    /// Pure: nothing is written. Every error the module can detect is
    /// raised here, so a failed evaluation never leaves a half applied
    /// deployment behind.
    pub fn evaluate(&self) -> Result<Evaluation> {
        let Some(unit) = UnitDescriptor::build(&self.options)? else {
            info!("Service disabled, nothing to declare");
            return Ok(Evaluation::disabled());
        };

        let artifact = Artifact::compile(&self.options.config_path, &self.options.config)?;

        debug!(
            "Rendered {:?} (sha256 {})",
            artifact.path(),
            artifact.digest()
        );
        info!(
            "Declared {} running {} {:?}",
            unit.name,
            unit.process.binary(),
            unit.process.args()
        );

        Ok(Evaluation {
            artifact: Some(artifact),
            unit: Some(unit),
        })
    }
}

/// Result of evaluating the module options
///
/// Either both the artifact and the unit are present, or neither is.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Rendered `main.json`
    pub artifact: Option<Artifact>,

    /// Unit running the presence binary
    pub unit: Option<UnitDescriptor>,
}

impl Evaluation {
    fn disabled() -> Self {
        Self {
            artifact: None,
            unit: None,
        }
    }

    /// Whether a unit was declared
    pub fn state(&self) -> UnitState {
        match self.unit {
            Some(_) => UnitState::Declared,
            None => UnitState::Disabled,
        }
    }
}
