// src/server.rs
// Server under test: configuration handoff, reload, readiness confirmation

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use port_check::is_port_reachable;
use tokio::process::Command;
use tokio::time::{sleep, timeout};

use crate::client::StructuredClient;
use crate::error::HarnessError;
use crate::settings::Settings;

/// Fixed route polled to confirm a reload has taken effect.
pub const SENTINEL_PATH: &str = "/test-info";
/// Header on the sentinel route carrying the current case identifier.
pub const SENTINEL_HEADER: &str = "test-class";

const CONFIG_FILE: &str = "server.conf";
const RELOAD_TIMEOUT: Duration = Duration::from_millis(1000);
const READY_ATTEMPTS: u32 = 10;
const READY_DELAY: Duration = Duration::from_secs(1);

/// Route block answering the readiness probe with the case identifier.
///
/// Injected into every rendered configuration through the `test-info`
/// placeholder; the grammar around it stays opaque to the harness.
pub fn sentinel_route(case_id: &str) -> String {
    format!(
        "location {} {{ add_header {} \"{}\"; return 200; }}",
        SENTINEL_PATH, SENTINEL_HEADER, case_id
    )
}

/// Filesystem identity of the server under test.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    pub conf_dir: PathBuf,
    pub log_dir: PathBuf,
    pub binary: PathBuf,
    pub pid_file: PathBuf,
}

impl ServerHandle {
    /// The pid file is named after the binary, next to the server logs.
    pub fn new(conf_dir: &Path, log_dir: &Path, binary: &Path) -> Self {
        let bin_name = binary
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "server".to_string());

        ServerHandle {
            conf_dir: conf_dir.to_path_buf(),
            log_dir: log_dir.to_path_buf(),
            binary: binary.to_path_buf(),
            pid_file: log_dir.join(format!("{}.pid", bin_name)),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        ServerHandle::new(
            &settings.conf_dir(),
            &settings.log_dir(),
            &settings.server_bin,
        )
    }

    pub fn config_path(&self) -> PathBuf {
        self.conf_dir.join(CONFIG_FILE)
    }

    pub fn pid_is_live(&self) -> bool {
        self.pid_file.exists()
    }

    fn ensure_running(&self) -> Result<(), HarnessError> {
        if self.pid_is_live() {
            Ok(())
        } else {
            Err(HarnessError::ServerNotRunning(self.pid_file.clone()))
        }
    }
}

/// Drives one configuration handoff:
///
/// ```text
/// Idle -> ConfigWritten -> ReloadIssued -> ReloadConfirmed -> Ready
///                                       \-> ReloadFailed / ReloadTimeout
///                                          Ready miss -> ReadinessTimeout
/// ```
///
/// A zero reload exit only means the signal was accepted; the sentinel poll
/// is what proves the new configuration is serving traffic.
pub struct ServerController {
    handle: ServerHandle,
    client: StructuredClient,
    host: String,
    port: u16,
    reload_timeout: Duration,
    ready_attempts: u32,
    ready_delay: Duration,
}

impl ServerController {
    pub fn new(handle: ServerHandle, host: &str, port: u16) -> Result<Self, HarnessError> {
        let client = StructuredClient::new(&format!("http://{}:{}", host, port))?;
        Ok(ServerController {
            handle,
            client,
            host: host.to_string(),
            port,
            reload_timeout: RELOAD_TIMEOUT,
            ready_attempts: READY_ATTEMPTS,
            ready_delay: READY_DELAY,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, HarnessError> {
        ServerController::new(
            ServerHandle::from_settings(settings),
            &settings.host,
            settings.port,
        )
    }

    pub fn with_reload_timeout(mut self, reload_timeout: Duration) -> Self {
        self.reload_timeout = reload_timeout;
        self
    }

    pub fn with_ready_attempts(mut self, ready_attempts: u32) -> Self {
        self.ready_attempts = ready_attempts;
        self
    }

    pub fn with_ready_delay(mut self, ready_delay: Duration) -> Self {
        self.ready_delay = ready_delay;
        self
    }

    pub fn handle(&self) -> &ServerHandle {
        &self.handle
    }

    /// Fail before touching the configuration if the server is clearly gone:
    /// pid file missing or nothing listening on the probe port.
    pub fn preflight(&self) -> Result<(), HarnessError> {
        self.handle.ensure_running()?;
        let addr = format!("{}:{}", self.host, self.port);
        if !is_port_reachable(&addr) {
            return Err(HarnessError::ConnectFailure(format!(
                "{}: server port not reachable",
                addr
            )));
        }
        Ok(())
    }

    /// Replace the server's configuration file with the rendered text.
    pub fn write_config(&self, rendered: &str) -> Result<(), HarnessError> {
        self.handle.ensure_running()?;
        let path = self.handle.config_path();
        fs::write(&path, rendered)?;
        log::info!("Configuration written to {}", path.display());
        Ok(())
    }

    /// Invoke `<binary> -s reload` with inherited stdio and a hard deadline.
    pub async fn reload(&self) -> Result<(), HarnessError> {
        self.handle.ensure_running()?;

        log::info!("Reloading via {} -s reload", self.handle.binary.display());
        let mut child = Command::new(&self.handle.binary)
            .args(["-s", "reload"])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;

        match timeout(self.reload_timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                log::info!("Reload accepted (exit status 0)");
                Ok(())
            }
            Ok(Ok(status)) => Err(HarnessError::ReloadFailed(status)),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                let _ = child.start_kill();
                Err(HarnessError::ReloadTimeout)
            }
        }
    }

    /// Poll the sentinel route until its header equals `case_id` exactly.
    pub async fn await_ready(&self, case_id: &str) -> Result<(), HarnessError> {
        for attempt in 1..=self.ready_attempts {
            log::info!(
                "Checking new configuration applied, attempt {}/{}",
                attempt,
                self.ready_attempts
            );

            match self.client.get(SENTINEL_PATH).await {
                Ok(response) if response.header_first(SENTINEL_HEADER) == Some(case_id) => {
                    log::info!("New configuration applied for case {}", case_id);
                    return Ok(());
                }
                Ok(response) => {
                    log::debug!(
                        "Sentinel answered {} with {}={:?}",
                        response.status,
                        SENTINEL_HEADER,
                        response.header_first(SENTINEL_HEADER)
                    );
                }
                Err(e) => log::debug!("Sentinel probe failed: {}", e),
            }

            if attempt < self.ready_attempts {
                sleep(self.ready_delay).await;
            }
        }

        Err(HarnessError::ReadinessTimeout {
            attempts: self.ready_attempts,
        })
    }

    /// Full handoff: write the rendered configuration, reload, wait until the
    /// sentinel confirms it is live.
    pub async fn apply(&self, rendered: &str, case_id: &str) -> Result<(), HarnessError> {
        self.preflight()?;
        self.write_config(rendered)?;
        self.reload().await?;
        self.await_ready(case_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pid_file_named_after_binary() {
        let handle = ServerHandle::new(
            Path::new("/srv/install/conf"),
            Path::new("/srv/install/logs"),
            Path::new("/srv/target/nginx"),
        );
        assert_eq!(handle.pid_file, PathBuf::from("/srv/install/logs/nginx.pid"));
        assert_eq!(
            handle.config_path(),
            PathBuf::from("/srv/install/conf/server.conf")
        );
    }

    #[test]
    fn test_handle_without_pid_file_fails_fast() {
        let temp_dir = TempDir::new().unwrap();
        let handle = ServerHandle::new(temp_dir.path(), temp_dir.path(), Path::new("server"));

        assert!(!handle.pid_is_live());
        assert!(matches!(
            handle.ensure_running(),
            Err(HarnessError::ServerNotRunning(_))
        ));

        fs::write(&handle.pid_file, "4242").unwrap();
        assert!(handle.pid_is_live());
        assert!(handle.ensure_running().is_ok());
    }

    #[test]
    fn test_sentinel_route_carries_identifier() {
        let route = sentinel_route("IndexSuite");
        assert!(route.contains(SENTINEL_PATH));
        assert!(route.contains("test-class \"IndexSuite\""));
        assert!(route.contains("return 200"));
    }
}
