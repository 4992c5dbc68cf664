//! DBMS process control
//!
//! Each instance ships its own control executable (`bin/neo4j`). The
//! supervisor runs it as a subprocess, returns its stdout, and derives a
//! structured status from the exit code of `status` plus the pid file the
//! server keeps under `run/`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, instrument, warn};

use crate::batch::{self, BatchResult};
use crate::constants::{CONTROL_EXECUTABLE, PID_FILE};
use crate::error::{RelateError, Result};
use crate::installer::dbms_dir_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbmsStatus {
    Running,
    NotRunning,
}

impl fmt::Display for DbmsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbmsStatus::Running => write!(f, "running"),
            DbmsStatus::NotRunning => write!(f, "not running"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: DbmsStatus,
    pub pid: Option<u32>,
    /// Control executable output, verbatim.
    pub output: String,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Start,
    Stop,
    Status,
}

impl Action {
    fn as_arg(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Status => "status",
        }
    }
}

struct ControlOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    install_root: PathBuf,
}

impl ProcessSupervisor {
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
        }
    }

    /// Root directory of an installed instance.
    pub fn dbms_root(&self, id: &str) -> Result<PathBuf> {
        let not_found = || RelateError::NotFound(format!("DBMS \"{}\" not found", id));

        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(not_found());
        }

        let root = self.install_root.join(dbms_dir_name(id));
        if root.is_dir() {
            Ok(root)
        } else {
            Err(not_found())
        }
    }

    #[instrument(skip(self))]
    pub async fn status(&self, id: &str) -> Result<StatusReport> {
        let root = self.dbms_root(id)?;
        let out = run_control(&root, Action::Status).await?;

        let status = if out.success {
            DbmsStatus::Running
        } else {
            DbmsStatus::NotRunning
        };

        let pid = match status {
            DbmsStatus::Running => read_pid(&root).await.filter(|pid| is_process_alive(*pid)),
            DbmsStatus::NotRunning => {
                remove_stale_pid(&root).await;
                None
            }
        };

        Ok(StatusReport {
            status,
            pid,
            output: out.stdout,
        })
    }

    /// Start an instance; a running instance is left alone.
    #[instrument(skip(self))]
    pub async fn start(&self, id: &str) -> Result<String> {
        let current = self.status(id).await?;
        if current.status == DbmsStatus::Running {
            debug!("DBMS {} already running", id);
            return Ok(current.output);
        }

        let root = self.dbms_root(id)?;
        let out = run_control(&root, Action::Start).await?;
        expect_success(id, Action::Start, out)
    }

    /// Stop an instance; a stopped instance is left alone.
    #[instrument(skip(self))]
    pub async fn stop(&self, id: &str) -> Result<String> {
        let current = self.status(id).await?;
        if current.status == DbmsStatus::NotRunning {
            debug!("DBMS {} already stopped", id);
            return Ok(current.output);
        }

        let root = self.dbms_root(id)?;
        let out = run_control(&root, Action::Stop).await?;
        expect_success(id, Action::Stop, out)
    }

    pub async fn start_all(&self, ids: &[String]) -> BatchResult<String> {
        batch::for_each(ids, |id| async move { self.start(&id).await }).await
    }

    pub async fn stop_all(&self, ids: &[String]) -> BatchResult<String> {
        batch::for_each(ids, |id| async move { self.stop(&id).await }).await
    }

    pub async fn status_all(&self, ids: &[String]) -> BatchResult<String> {
        batch::for_each(ids, |id| async move { self.status(&id).await.map(|r| r.output) }).await
    }
}

fn expect_success(id: &str, action: Action, out: ControlOutput) -> Result<String> {
    if out.success {
        return Ok(out.stdout);
    }
    let detail = if out.stderr.is_empty() {
        out.stdout
    } else {
        out.stderr
    };
    Err(RelateError::Process(format!(
        "Failed to {} DBMS \"{}\": {}",
        action.as_arg(),
        id,
        detail
    )))
}

async fn run_control(root: &Path, action: Action) -> Result<ControlOutput> {
    let executable = root.join(CONTROL_EXECUTABLE);
    if !executable.exists() {
        return Err(RelateError::NotFound(format!(
            "Control executable not found: {}",
            executable.display()
        )));
    }

    let output = tokio::process::Command::new(&executable)
        .arg(action.as_arg())
        .current_dir(root)
        .env("NEO4J_HOME", root)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            RelateError::Process(format!("Failed to run {}: {}", executable.display(), e))
        })?;

    Ok(ControlOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

async fn read_pid(root: &Path) -> Option<u32> {
    let raw = tokio::fs::read_to_string(root.join(PID_FILE)).await.ok()?;
    raw.trim().parse().ok()
}

/// Remove the pid file unless the process it names is still alive.
async fn remove_stale_pid(root: &Path) {
    let pid_file = root.join(PID_FILE);
    if !pid_file.exists() {
        return;
    }
    if let Some(pid) = read_pid(root).await {
        if is_process_alive(pid) {
            warn!(
                "Control script reports DBMS not running but pid {} is alive, keeping {}",
                pid,
                pid_file.display()
            );
            return;
        }
    }
    if let Err(e) = tokio::fs::remove_file(&pid_file).await {
        warn!("Failed to remove stale PID file {}: {}", pid_file.display(), e);
    }
}

/// Check if a process is alive (signal 0)
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    kill(Pid::from_raw(raw), None).is_ok()
}

/// Without signal 0, trust the pid file the control script keeps.
#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    true
}
