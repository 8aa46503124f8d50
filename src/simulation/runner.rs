use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;

use super::command::SimulationCommand;
use super::params::SimulationParams;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not start `{program}`: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("{output}")]
    Failed {
        status: ExitStatus,
        output: String,
    },

    #[error("result file {0} not found")]
    ResultMissing(PathBuf),

    #[error("result file {path} could not be read: {source}")]
    ResultUnreadable { path: PathBuf, source: io::Error },
}

/// Spawns the external simulator and collects its result file.
///
/// Clones share the optional run lock.
#[derive(Debug, Clone)]
pub struct SimulationRunner {
    config: Arc<SimulationConfig>,
    run_lock: Option<Arc<Mutex<()>>>,
}

impl SimulationRunner {
    pub fn new(config: SimulationConfig) -> Self {
        let run_lock = config.serialize_runs.then(|| Arc::new(Mutex::new(())));
        Self {
            config: Arc::new(config),
            run_lock,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run the simulator on `staged_file` and return the result file bytes.
    ///
    /// A relative `staged_file` resolves against `working_dir`, like every
    /// other path the simulator sees.
    ///
    /// Without `serialize_runs`, concurrent runs write the same result file
    /// and a caller may read another run's output.
    pub async fn run(
        &self,
        staged_file: &Path,
        params: &SimulationParams,
    ) -> Result<Vec<u8>, RunError> {
        let command = SimulationCommand::build(&self.config, staged_file, params);

        let _guard = match &self.run_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        info!(command = %command, "Starting simulation");
        let started = Instant::now();
        let output = {
            let mut process = command.to_tokio(self.config.working_dir());
            let child = process.output();
            let result = match self.config.timeout() {
                Some(limit) => tokio::time::timeout(limit, child)
                    .await
                    .map_err(|_| RunError::TimedOut(limit))?,
                None => child.await,
            };
            result.map_err(|source| RunError::Spawn {
                program: command.program.clone(),
                source,
            })?
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if !output.status.success() {
            let captured = collect_output(&output.stdout, &output.stderr);
            warn!(
                status = %output.status,
                elapsed_ms,
                output = %captured,
                "Simulation exited with failure"
            );
            return Err(RunError::Failed {
                status: output.status,
                output: captured,
            });
        }
        debug!(elapsed_ms, "Simulation finished");

        let result_path = self.config.result_path();
        let bytes = read_result(&result_path).await?;
        info!(
            result = %result_path.display(),
            bytes = bytes.len(),
            elapsed_ms,
            "Simulation result read"
        );
        Ok(bytes)
    }
}

async fn read_result(path: &Path) -> Result<Vec<u8>, RunError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(RunError::ResultMissing(path.to_path_buf()))
        }
        Err(source) => Err(RunError::ResultUnreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Output lines with trailing whitespace removed, stdout before stderr.
pub fn collect_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}
