//! Deployment of an evaluation
//!
//! Writes the rendered config and the unit file, or removes the unit of a
//! disabled service.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use eyre::{Context, ContextCompat, Result};
use log::{debug, error, info};
use tokio::{fs, process::Command};

mod staged_file;

pub use staged_file::StagedFile;

use crate::service_module::{Evaluation, UnitState};

/// Command that makes the user manager pick up unit changes
pub const RELOAD_COMMAND: [&str; 3] = ["systemctl", "--user", "daemon-reload"];

/// What happened to a file during a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// New contents were moved into place
    Written,

    /// The file already held the rendered contents
    Unchanged,

    /// A previously installed file was deleted
    Removed,

    /// Nothing to write and nothing on disk
    Absent,
}

/// Outcome of [`Deployment::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// State the evaluation leaves the service in
    pub state: UnitState,

    /// What happened to the rendered config
    pub artifact: Change,

    /// What happened to the unit file
    pub unit: Change,
}

/// Responsible for materializing an evaluation on disk
pub struct Deployment {
    unit_dir: PathBuf,
}

impl Deployment {
    /// Create a deployment installing units into `unit_dir`
    pub fn new(unit_dir: PathBuf) -> Self {
        Self { unit_dir }
    }

    /// `$XDG_CONFIG_HOME/systemd/user`, where the user manager looks for units
    pub fn default_unit_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("systemd").join("user"))
    }

    /// Write the artifact and unit of `evaluation`
    ///
    /// Both files are staged before either is moved into place. A disabled
    /// evaluation removes the installed unit but keeps the last rendered
    /// config, which may then go stale.
    pub async fn apply(&self, evaluation: &Evaluation) -> Result<Report> {
        let mut pending = Vec::new();

        if let Some(artifact) = &evaluation.artifact {
            pending.push((artifact.path().to_path_buf(), artifact.contents().to_vec()));
        }

        let unit_change = match &evaluation.unit {
            Some(unit) => {
                let path = self.unit_dir.join(&unit.name);
                pending.push((path, unit.to_unit_file().into_bytes()));
                None
            }
            None => Some(self.remove_installed_units().await?),
        };

        let written = Self::write_all(pending).await?;

        let artifact = match &evaluation.artifact {
            Some(artifact) if written.iter().any(|p| p == artifact.path()) => Change::Written,
            Some(_) => Change::Unchanged,
            None => Change::Absent,
        };

        let unit = match (&evaluation.unit, unit_change) {
            (_, Some(change)) => change,
            (Some(unit), None) if written.contains(&self.unit_dir.join(&unit.name)) => {
                Change::Written
            }
            _ => Change::Unchanged,
        };

        let report = Report {
            state: evaluation.state(),
            artifact,
            unit,
        };
        info!(
            "Deployment finished (state: {:?}, config: {:?}, unit: {:?})",
            report.state, report.artifact, report.unit
        );

        Ok(report)
    }

    /// Stage every changed file, then commit them all
    ///
    /// Returns the targets that were written.
    async fn write_all(pending: Vec<(PathBuf, Vec<u8>)>) -> Result<Vec<PathBuf>> {
        let mut staged: Vec<StagedFile> = Vec::new();

        for (target, contents) in pending {
            let result = match staged_file::read_existing(&target).await {
                Ok(Some(existing)) if existing == contents => {
                    debug!("{:?} is up to date", target);
                    continue;
                }
                Ok(previous) => StagedFile::stage(&target, &contents, previous).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(file) => staged.push(file),
                Err(e) => {
                    for file in &staged {
                        file.discard().await;
                    }
                    return Err(e);
                }
            }
        }

        Self::commit_all(staged).await
    }

    /// Commit staged files in order
    ///
    /// If any commit fails, the files committed before it are rolled back
    /// and the remaining temp files removed, so either every file changes or
    /// none does.
    async fn commit_all(staged: Vec<StagedFile>) -> Result<Vec<PathBuf>> {
        for (index, file) in staged.iter().enumerate() {
            let Err(e) = file.commit().await else {
                debug!("Wrote {:?}", file.target());
                continue;
            };

            for pending in &staged[index..] {
                pending.discard().await;
            }
            for committed in staged[..index].iter().rev() {
                if let Err(rollback_err) = committed.rollback().await {
                    error!(
                        "Failed to roll back {:?}: {:?}",
                        committed.target(),
                        rollback_err
                    );
                }
            }

            return Err(e);
        }

        Ok(staged.iter().map(|file| file.target().to_path_buf()).collect())
    }

    async fn remove_installed_units(&self) -> Result<Change> {
        let path = self.unit_dir.join(crate::service_module::unit::UNIT_NAME);

        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Removed unit {:?}", path);
                Ok(Change::Removed)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Change::Absent),
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to remove unit {:?}", path)),
        }
    }

    /// Ask the supervision system to reread its units
    pub async fn reload_supervisor(command: &[&str]) -> Result<()> {
        let (&bin, args) = command
            .split_first()
            .wrap_err("Reload command must not be empty")?;

        let output = Command::new(bin)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .wrap_err_with(|| format!("Failed to run reload command: {:?}", command))?;

        debug!(target: bin, "{}", String::from_utf8_lossy(&output.stdout));
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            error!(target: bin, "{}", stderr);
        }

        eyre::ensure!(
            output.status.success(),
            "Reload command {:?} exited with status: {}",
            command,
            output.status
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service_module::{ServiceConfig, ServiceModule};

    fn module(enable: bool, config_path: &Path, config: &str) -> ServiceModule {
        ServiceModule::new(ServiceConfig {
            enable,
            config_path: config_path.to_path_buf(),
            config: serde_json::from_str(config).unwrap(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn enabled_writes_config_and_unit() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("home/.config/jellyfin-rpc/main.json");
        let deployment = Deployment::new(dir.path().join("units"));

        let evaluation = module(true, &config_path, r#"{"jellyfin": {"url": "https://j.example"}}"#)
            .evaluate()
            .unwrap();
        let report = deployment.apply(&evaluation).await.unwrap();

        assert_eq!(
            report,
            Report {
                state: UnitState::Declared,
                artifact: Change::Written,
                unit: Change::Written,
            }
        );
        assert_eq!(
            std::fs::read(&config_path).unwrap(),
            br#"{"jellyfin":{"url":"https://j.example"}}"#
        );

        let unit = std::fs::read_to_string(dir.path().join("units/jellyfin-rpc.service")).unwrap();
        assert!(unit.contains(&format!("ExecStart=jellyfin-rpc -c {}", config_path.display())));
        assert!(unit.contains("WantedBy=default.target"));
    }

    #[tokio::test]
    async fn reapplying_leaves_files_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("main.json");
        let deployment = Deployment::new(dir.path().join("units"));
        let evaluation = module(true, &config_path, r#"{"discord": {"show_paused": false}}"#)
            .evaluate()
            .unwrap();

        deployment.apply(&evaluation).await.unwrap();
        let first = std::fs::read(&config_path).unwrap();

        let report = deployment.apply(&evaluation).await.unwrap();
        assert_eq!(report.artifact, Change::Unchanged);
        assert_eq!(report.unit, Change::Unchanged);
        assert_eq!(std::fs::read(&config_path).unwrap(), first);
    }

    #[tokio::test]
    async fn disabling_removes_unit_but_keeps_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("main.json");
        let unit_path = dir.path().join("units/jellyfin-rpc.service");
        let deployment = Deployment::new(dir.path().join("units"));

        let enabled = module(true, &config_path, r#"{"imgbb": {"api_token": "t"}}"#);
        deployment.apply(&enabled.evaluate().unwrap()).await.unwrap();
        assert!(unit_path.exists());

        let disabled = module(false, &config_path, r#"{"imgbb": {"api_token": "other"}}"#);
        let report = deployment.apply(&disabled.evaluate().unwrap()).await.unwrap();

        assert_eq!(
            report,
            Report {
                state: UnitState::Disabled,
                artifact: Change::Absent,
                unit: Change::Removed,
            }
        );
        assert!(!unit_path.exists());
        assert_eq!(
            std::fs::read(&config_path).unwrap(),
            br#"{"imgbb":{"api_token":"t"}}"#
        );
    }

    #[tokio::test]
    async fn disabled_without_prior_deployment_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("main.json");
        let deployment = Deployment::new(dir.path().join("units"));

        let report = deployment
            .apply(&module(false, &config_path, "{}").evaluate().unwrap())
            .await
            .unwrap();

        assert_eq!(report.unit, Change::Absent);
        assert!(!config_path.exists());
        assert!(!dir.path().join("units").exists());
    }

    #[tokio::test]
    async fn unwritable_config_dir_commits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        // Parent of the config path is a regular file
        let config_path = blocker.join("main.json");
        let deployment = Deployment::new(dir.path().join("units"));

        let evaluation = module(true, &config_path, "{}").evaluate().unwrap();
        assert!(deployment.apply(&evaluation).await.is_err());
        assert!(!dir.path().join("units/jellyfin-rpc.service").exists());
    }

    #[tokio::test]
    async fn unwritable_unit_dir_commits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("main.json");

        // Unit dir is a regular file
        let unit_dir = dir.path().join("units");
        std::fs::write(&unit_dir, b"").unwrap();
        let deployment = Deployment::new(unit_dir);

        let evaluation = module(true, &config_path, r#"{"jellyfin": {"url": "u"}}"#)
            .evaluate()
            .unwrap();
        assert!(deployment.apply(&evaluation).await.is_err());

        assert!(!config_path.exists());
        assert!(!dir.path().join(".main.json.tmp").exists());
    }

    #[tokio::test]
    async fn failed_unit_commit_restores_previous_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("main.json");
        let unit_path = dir.path().join("units/jellyfin-rpc.service");
        std::fs::write(&config_path, b"old").unwrap();

        let artifact = StagedFile::stage(&config_path, b"new", Some(b"old".to_vec()))
            .await
            .unwrap();
        let unit = StagedFile::stage(&unit_path, b"[Unit]\n", None).await.unwrap();

        // The unit's temp file vanishes, so its rename fails
        std::fs::remove_file(dir.path().join("units/.jellyfin-rpc.service.tmp")).unwrap();

        assert!(Deployment::commit_all(vec![artifact, unit]).await.is_err());

        assert_eq!(std::fs::read(&config_path).unwrap(), b"old");
        assert!(!unit_path.exists());
        assert!(!dir.path().join(".main.json.tmp").exists());
    }

    #[tokio::test]
    async fn failed_commit_removes_config_that_did_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("main.json");
        let unit_path = dir.path().join("units/jellyfin-rpc.service");

        let artifact = StagedFile::stage(&config_path, b"new", None).await.unwrap();
        let unit = StagedFile::stage(&unit_path, b"[Unit]\n", None).await.unwrap();
        std::fs::remove_file(dir.path().join("units/.jellyfin-rpc.service.tmp")).unwrap();

        assert!(Deployment::commit_all(vec![artifact, unit]).await.is_err());

        assert!(!config_path.exists());
        assert_eq!(std::fs::read_dir(dir.path().join("units")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failing_reload_command_is_an_error() {
        assert!(Deployment::reload_supervisor(&["false"]).await.is_err());
        assert!(Deployment::reload_supervisor(&["true"]).await.is_ok());
        assert!(Deployment::reload_supervisor(&[]).await.is_err());
    }
}
