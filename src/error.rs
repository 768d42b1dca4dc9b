// src/error.rs
// Error taxonomy shared by the harness components

use std::path::PathBuf;
use std::process::ExitStatus;

#[derive(Debug)]
pub enum HarnessError {
    /// The configuration template references a placeholder with no binding.
    UnresolvedPlaceholder(String),
    /// The server's pid file is missing; the handle is not usable.
    ServerNotRunning(PathBuf),
    /// The reload command exited with a non-zero status.
    ReloadFailed(ExitStatus),
    /// The reload command did not exit within its deadline.
    ReloadTimeout,
    /// The sentinel probe never matched the case identifier.
    ReadinessTimeout { attempts: u32 },
    /// A transport could not establish a connection.
    ConnectFailure(String),
    /// A transport established a connection but no response arrived in time.
    ResponseTimeout(String),
    /// Staging or restoring fixture files failed.
    FixtureIo(String),
    /// Harness settings were missing or invalid.
    Settings(String),
    /// One or more case assertions failed; all failures are collected.
    ChecksFailed(Vec<String>),
    IoError(std::io::Error),
}

impl std::fmt::Display for HarnessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarnessError::UnresolvedPlaceholder(name) => {
                write!(f, "Unresolved template placeholder: %%{}%%", name)
            }
            HarnessError::ServerNotRunning(pid_file) => {
                write!(f, "Server not running: pid file {} missing", pid_file.display())
            }
            HarnessError::ReloadFailed(status) => {
                write!(f, "Configuration reload failed: {}", status)
            }
            HarnessError::ReloadTimeout => write!(f, "Configuration reload did not exit in time"),
            HarnessError::ReadinessTimeout { attempts } => {
                write!(f, "New configuration not applied after {} probe attempts", attempts)
            }
            HarnessError::ConnectFailure(detail) => write!(f, "Connect failure: {}", detail),
            HarnessError::ResponseTimeout(detail) => write!(f, "Response timeout: {}", detail),
            HarnessError::FixtureIo(detail) => write!(f, "Fixture staging failed: {}", detail),
            HarnessError::Settings(detail) => write!(f, "Invalid harness settings: {}", detail),
            HarnessError::ChecksFailed(failures) => {
                writeln!(f, "{} check(s) failed:", failures.len())?;
                for failure in failures {
                    writeln!(f, "  - {}", failure)?;
                }
                Ok(())
            }
            HarnessError::IoError(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for HarnessError {}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::IoError(err)
    }
}
