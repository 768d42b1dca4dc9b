// src/settings.rs
// Harness settings: environment overrides on top of defaults

use std::env;
use std::path::{Path, PathBuf};

use crate::error::HarnessError;

const ENV_HOST: &str = "UKAGUZI_HOST";
const ENV_PORT: &str = "UKAGUZI_PORT";
const ENV_WORK_DIR: &str = "UKAGUZI_WORK_DIR";
const ENV_SERVER_BIN: &str = "UKAGUZI_SERVER_BIN";

/// Where the server under test lives and how to reach it.
///
/// The harness does not parse configuration files of its own; everything is
/// an environment override on top of the conventional layout below
/// `work_dir`:
///
/// ```text
/// <work_dir>/install/conf     configuration written per test case
/// <work_dir>/install/logs     server logs and its pid file
/// <work_dir>/install/html     served-content root (fixture target)
/// <work_dir>/target/server    reload executable (unless overridden)
/// ```
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub work_dir: PathBuf,
    pub server_bin: PathBuf,
}

impl Settings {
    pub fn new(host: &str, port: u16, work_dir: &Path, server_bin: &Path) -> Self {
        Settings {
            host: host.to_string(),
            port,
            work_dir: work_dir.to_path_buf(),
            server_bin: server_bin.to_path_buf(),
        }
    }

    /// Build settings from `UKAGUZI_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, HarnessError> {
        let host = env::var(ENV_HOST).unwrap_or_else(|_| "localhost".to_string());

        let port = match env::var(ENV_PORT) {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| HarnessError::Settings(format!("{} is not a port: {}", ENV_PORT, raw)))?,
            Err(_) => 8000,
        };

        let work_dir = env::var(ENV_WORK_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let server_bin = env::var(ENV_SERVER_BIN)
            .map(PathBuf::from)
            .unwrap_or_else(|_| work_dir.join("target").join("server"));

        let settings = Settings {
            host,
            port,
            work_dir,
            server_bin,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), HarnessError> {
        if self.host.is_empty() {
            return Err(HarnessError::Settings("host cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(HarnessError::Settings("port cannot be 0".to_string()));
        }
        Ok(())
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    fn install_dir(&self) -> PathBuf {
        self.work_dir.join("install")
    }

    /// Directory the rendered configuration is written into.
    pub fn conf_dir(&self) -> PathBuf {
        self.install_dir().join("conf")
    }

    /// Directory holding server logs and the pid file.
    pub fn log_dir(&self) -> PathBuf {
        self.install_dir().join("logs")
    }

    /// Served-content root; fixture staging targets live under here.
    pub fn content_dir(&self) -> PathBuf {
        self.install_dir().join("html")
    }
}
