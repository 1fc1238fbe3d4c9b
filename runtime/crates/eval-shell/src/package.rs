//! Package-manager collaborator.
//!
//! The shell never talks to a package registry itself. It is handed an
//! implementation of [`PackageManager`] at creation time, bootstraps it once
//! with [`PackageManager::load`], and calls [`PackageManager::install`] for
//! every `%module` command. [`Npm`] drives the `npm` executable.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{program} is not usable: {reason}")]
    Unavailable { program: String, reason: String },

    #[error("package manager used before load")]
    NotLoaded,

    #[error("install exited with {}: {stderr}", exit_status(.status))]
    Failed { status: Option<i32>, stderr: String },
}

fn exit_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

/// Options passed to [`PackageManager::load`]. They only affect the
/// package manager's own behaviour and output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManagerOptions {
    /// Install prefix, the shell's modules directory.
    pub prefix: PathBuf,
    /// Directory under `prefix` the shell expects one directory per package in.
    pub package_root: String,
    pub log_level: String,
    pub progress: bool,
    pub color: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// One-time bootstrap, run before the shell is constructed.
    async fn load(&self, options: &PackageManagerOptions) -> Result<(), PackageError>;

    /// Install `names` into `target`. Resolves once the packages are on disk.
    async fn install(&self, target: &Path, names: &[String]) -> Result<(), PackageError>;
}

/// The only layout `npm install --prefix` produces.
const NPM_PACKAGE_ROOT: &str = "node_modules";

/// [`PackageManager`] backed by the `npm` command line client.
///
/// `npm` always installs into `<prefix>/node_modules`, so loading fails for
/// any other `package_root`.
pub struct Npm {
    program: String,
    options: RwLock<Option<PackageManagerOptions>>,
}

impl Npm {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            options: RwLock::new(None),
        }
    }

    fn install_command(&self, options: &PackageManagerOptions, target: &Path, names: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("install")
            .arg("--prefix")
            .arg(target)
            .arg("--loglevel")
            .arg(&options.log_level)
            .arg("--color")
            .arg(if options.color { "always" } else { "false" });
        if !options.progress {
            cmd.arg("--no-progress");
        }
        cmd.args(names)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for Npm {
    fn default() -> Self {
        Self::new("npm")
    }
}

#[async_trait]
impl PackageManager for Npm {
    async fn load(&self, options: &PackageManagerOptions) -> Result<(), PackageError> {
        if options.package_root != NPM_PACKAGE_ROOT {
            return Err(PackageError::Unavailable {
                program: self.program.clone(),
                reason: format!(
                    "installs into {NPM_PACKAGE_ROOT}, not package_root \"{}\"",
                    options.package_root
                ),
            });
        }
        tokio::fs::create_dir_all(&options.prefix).await?;

        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| PackageError::Unavailable {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(PackageError::Unavailable {
                program: self.program.clone(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        tracing::debug!(
            program = %self.program,
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "package manager loaded"
        );

        *self.options.write().unwrap_or_else(PoisonError::into_inner) = Some(options.clone());
        Ok(())
    }

    async fn install(&self, target: &Path, names: &[String]) -> Result<(), PackageError> {
        let options = self
            .options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(PackageError::NotLoaded)?;

        tracing::info!(prefix = %target.display(), ?names, "npm install");
        let output = self.install_command(&options, target, names).output().await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(PackageError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(prefix: &Path) -> PackageManagerOptions {
        PackageManagerOptions {
            prefix: prefix.to_path_buf(),
            package_root: "node_modules".into(),
            log_level: "silent".into(),
            progress: false,
            color: false,
        }
    }

    #[test]
    fn test_install_command_line() {
        let npm = Npm::default();
        let cmd = npm.install_command(
            &options(Path::new("/m")),
            Path::new("/m"),
            &["lodash".to_string()],
        );
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec![
                "install", "--prefix", "/m", "--loglevel", "silent", "--color", "false",
                "--no-progress", "lodash"
            ]
        );
        assert_eq!(cmd.as_std().get_program(), "npm");
    }

    #[tokio::test]
    async fn test_install_before_load_fails() {
        let npm = Npm::default();
        let err = npm
            .install(Path::new("/nowhere"), &["x".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::NotLoaded));
    }

    #[tokio::test]
    async fn test_load_with_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let npm = Npm::new("definitely-not-a-real-npm-binary");
        let err = npm.load(&options(dir.path())).await.unwrap_err();
        assert!(matches!(err, PackageError::Unavailable { .. }));
    }

    #[test]
    fn test_failed_display() {
        let err = PackageError::Failed {
            status: Some(1),
            stderr: "404 Not Found".into(),
        };
        assert_eq!(err.to_string(), "install exited with 1: 404 Not Found");
    }

    #[tokio::test]
    async fn test_load_rejects_foreign_package_root() {
        let dir = tempfile::tempdir().unwrap();
        let npm = Npm::default();
        let mut opts = options(dir.path());
        opts.package_root = "pkgs".into();
        match npm.load(&opts).await.unwrap_err() {
            PackageError::Unavailable { program, reason } => {
                assert_eq!(program, "npm");
                assert!(reason.contains("\"pkgs\""), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let err = npm.install(dir.path(), &["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, PackageError::NotLoaded));
    }
}
