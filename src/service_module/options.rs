//! Jellyfin-RPC module options
//!
//! Holds the nix configurable options of the `jellyfin-rpc` user service

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::service_module::StructuredConfig;

/// Binary invoked when no `package` is given
pub const DEFAULT_PACKAGE: &str = "jellyfin-rpc";

/// Location of the rendered config, relative to the user config directory
pub const CONFIG_RELATIVE_PATH: &str = "jellyfin-rpc/main.json";

/// Service Config Struct
///
/// Rust mirror of the `services.jellyfin-rpc` options. Built once per
/// evaluation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceConfig {
    /// Whether the service is materialized at all
    #[serde(default)]
    pub enable: bool,

    /// Path or name of the presence binary
    #[serde(default = "default_package")]
    pub package: String,

    /// Where the rendered config gets written
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,

    /// Contents of the rendered config
    #[serde(default)]
    pub config: StructuredConfig,

    /// File holding the Jellyfin API key, empty when unused
    #[serde(default)]
    pub jellyfin_secret_path: PathBuf,

    /// File holding the ImgBB API token, empty when unused
    #[serde(default)]
    pub imgbb_secret_path: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enable: false,
            package: default_package(),
            config_path: default_config_path(),
            config: StructuredConfig::default(),
            jellyfin_secret_path: PathBuf::new(),
            imgbb_secret_path: PathBuf::new(),
        }
    }
}

impl ServiceConfig {
    /// Jellyfin key file override, if one was given
    pub fn jellyfin_secret(&self) -> Option<&Path> {
        non_empty(&self.jellyfin_secret_path)
    }

    /// ImgBB token file override, if one was given
    pub fn imgbb_secret(&self) -> Option<&Path> {
        non_empty(&self.imgbb_secret_path)
    }
}

fn non_empty(path: &Path) -> Option<&Path> {
    (!path.as_os_str().is_empty()).then_some(path)
}

fn default_package() -> String {
    DEFAULT_PACKAGE.to_string()
}

/// Default location of the rendered config
///
/// Resolves to `$XDG_CONFIG_HOME/jellyfin-rpc/main.json` (or the platform
/// equivalent). Empty when no config directory can be found, which an
/// enabled service then rejects.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_RELATIVE_PATH))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_keys_are_absent() {
        let options: ServiceConfig = serde_json::from_str("{}").unwrap();

        assert!(!options.enable);
        assert_eq!(options.package, "jellyfin-rpc");
        assert_eq!(options.config, StructuredConfig::default());
        assert_eq!(options.jellyfin_secret(), None);
        assert_eq!(options.imgbb_secret(), None);
        assert_eq!(options.config_path, default_config_path());
    }

    #[test]
    fn default_config_path_ends_with_fixed_suffix() {
        let path = default_config_path();
        if !path.as_os_str().is_empty() {
            assert!(path.ends_with("jellyfin-rpc/main.json"));
        }
    }

    #[test]
    fn reads_camel_case_keys() {
        let options: ServiceConfig = serde_json::from_str(
            r#"{
                "enable": true,
                "configPath": "/c.json",
                "jellyfinSecretPath": "/run/secrets/jellyfin",
                "imgbbSecretPath": ""
            }"#,
        )
        .unwrap();

        assert!(options.enable);
        assert_eq!(options.config_path, PathBuf::from("/c.json"));
        assert_eq!(
            options.jellyfin_secret(),
            Some(Path::new("/run/secrets/jellyfin"))
        );
        assert_eq!(options.imgbb_secret(), None);
    }

    #[test]
    fn rejects_unknown_option() {
        let err = serde_json::from_str::<ServiceConfig>(r#"{"enabled": true}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn rejects_mistyped_enable() {
        assert!(serde_json::from_str::<ServiceConfig>(r#"{"enable": "yes"}"#).is_err());
    }
}
