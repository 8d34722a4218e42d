#![warn(missing_docs)]

//! Evaluator for the `services.jellyfin-rpc` user service module.
//!
//! Renders the [Jellyfin-RPC](https://github.com/Radiicall/jellyfin-rpc)
//! config file and the systemd user unit that keeps the presence binary
//! running.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::{Context, ContextCompat};
use log::{info, warn};
use std::io::Write;

pub use crate::error::{Error, Result};
use crate::service_module::{
    Deployment, ServiceModule,
    deployment::{Change, RELOAD_COMMAND},
    structured_config::DEFAULT_IMGBB_EXPIRATION,
};

pub mod error;
pub mod service_module;

/// Jellyfin-RPC service module evaluator
///
/// # Examples
///
/// ## Options as produced by the nix module
///
/// ```nix
/// services.jellyfin-rpc = {
///   enable = true;
///   config = {
///     jellyfin = {
///       url = "https://jellyfin.example.com";
///       username = "me";
///       self_signed_cert = false;
///       show_simple = false;
///     };
///     images.enable_images = true;
///   };
///   jellyfinSecretPath = "/run/secrets/jellyfin-api-key";
/// };
/// ```
///
/// ## Interact with the json form of those options
/// ```bash
/// jellyfin-rpc-service --options ./options.json validate
/// jellyfin-rpc-service --options ./options.json apply --reload
/// ```
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the json representation of the module options
    #[arg(short, long)]
    pub options: PathBuf,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// The subcommand to run
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate the options without writing anything
    Validate,

    /// Print the rendered config file
    Render,

    /// Print the generated unit file
    Unit,

    /// Write the config file and install (or remove) the unit
    Apply {
        /// Directory the unit gets installed into
        ///
        /// Defaults to `$XDG_CONFIG_HOME/systemd/user`
        #[arg(long)]
        unit_dir: Option<PathBuf>,

        /// Run `systemctl --user daemon-reload` afterwards
        #[arg(long)]
        reload: bool,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let input = tokio::fs::read_to_string(&args.options)
        .await
        .wrap_err_with(|| format!("Failed to read options file: {:?}", args.options))?;
    let module = ServiceModule::from_json(&input)?;
    let evaluation = module.evaluate()?;

    match args.command {
        Command::Validate => {
            let config = &module.options().config;
            if module.options().enable
                && config.imgbb.as_ref().is_none_or(|imgbb| imgbb.expiration.is_none())
            {
                info!(
                    "imgbb.expiration unset, jellyfin-rpc falls back to {}s",
                    DEFAULT_IMGBB_EXPIRATION
                );
            }
            info!("Options are valid (state: {:?})", evaluation.state());
        }
        Command::Render => {
            let artifact = evaluation
                .artifact
                .wrap_err("Service is disabled, no config gets rendered")?;
            std::io::stdout()
                .write_all(artifact.contents())
                .wrap_err("Failed to write config to stdout")?;
        }
        Command::Unit => {
            let unit = evaluation
                .unit
                .wrap_err("Service is disabled, no unit gets declared")?;
            print!("{}", unit.to_unit_file());
        }
        Command::Apply { unit_dir, reload } => {
            let unit_dir = match unit_dir {
                Some(dir) => dir,
                None => Deployment::default_unit_dir()
                    .wrap_err("Could not determine the user unit directory")?,
            };

            let report = Deployment::new(unit_dir).apply(&evaluation).await?;
            let config_path = &module.options().config_path;
            if report.artifact == Change::Absent && config_path.exists() {
                warn!("Service disabled, {:?} is left in place", config_path);
            }

            if reload {
                info!("Reloading user units...");
                Deployment::reload_supervisor(&RELOAD_COMMAND).await?;
            }
        }
    }

    Ok(())
}
