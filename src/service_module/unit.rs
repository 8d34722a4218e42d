//! Service definition builder
//!
//! Turns the module options into the user unit that runs the presence
//! binary. A disabled service produces no unit at all.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, service_module::ServiceConfig};

mod process;

pub use process::Process;

/// File name of the installed unit
pub const UNIT_NAME: &str = "jellyfin-rpc.service";

/// Target that pulls the unit in once the user session is up
pub const DEFAULT_TARGET: &str = "default.target";

const DESCRIPTION: &str = "Jellyfin-RPC: Discord rich presence for Jellyfin";

/// Unit Descriptor Struct
///
/// Everything the supervision system needs to know about the service. Only
/// exists for enabled services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDescriptor {
    /// Unit file name
    pub name: String,

    /// Human readable description
    pub description: String,

    /// Targets that start the unit
    #[serde(rename = "wantedBy")]
    pub wanted_by: Vec<String>,

    /// Command the unit runs
    pub process: Process,
}

impl UnitDescriptor {
    /// Build the unit for `options`
    ///
    /// Returns `None` when the service is disabled, whatever else is set.
    pub fn build(options: &ServiceConfig) -> Result<Option<Self>> {
        if !options.enable {
            return Ok(None);
        }

        Ok(Some(Self {
            name: UNIT_NAME.to_string(),
            description: DESCRIPTION.to_string(),
            wanted_by: vec![DEFAULT_TARGET.to_string()],
            process: command(options)?,
        }))
    }

    /// Render as a systemd user unit file
    pub fn to_unit_file(&self) -> String {
        let mut unit = String::new();

        // Writing into a String can't fail
        let _ = writeln!(unit, "[Unit]");
        let _ = writeln!(unit, "Description={}", self.description);
        let _ = writeln!(unit);
        let _ = writeln!(unit, "[Service]");
        let _ = writeln!(unit, "ExecStart={}", self.process.exec_start());
        let _ = writeln!(unit);
        let _ = writeln!(unit, "[Install]");
        let _ = writeln!(unit, "WantedBy={}", self.wanted_by.join(" "));

        unit
    }
}

/// Build the argv for the presence binary
///
/// `-c` always comes first, then `-j` and `-a` when their secret files are
/// set. The binary's argument parser depends on this order.
pub fn command(options: &ServiceConfig) -> Result<Process> {
    let config_path = &options.config_path;

    if config_path.as_os_str().is_empty() {
        return Err(Error::MissingConfigPath);
    }
    if !config_path.is_absolute() {
        return Err(Error::RelativeConfigPath(config_path.clone()));
    }

    let mut process = Process::new(options.package.as_str());
    process.push_flag("-c", config_path);

    if let Some(path) = options.jellyfin_secret() {
        process.push_flag("-j", path);
    }

    if let Some(path) = options.imgbb_secret() {
        process.push_flag("-a", path);
    }

    Ok(process)
}
