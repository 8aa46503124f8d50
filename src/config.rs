use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "SIMGW__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path the simulation endpoint is mounted on
    pub endpoint_path: String,
    pub enable_cors: bool,
    pub cors_origin: Option<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            endpoint_path: "/simulate".to_string(),
            enable_cors: false,
            cors_origin: None,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Executable spawned for every run
    pub program: String,
    /// Arguments placed before the staged file path (usually the script)
    pub script_args: Vec<String>,
    /// Working directory of the subprocess; relative paths below resolve against it
    pub working_dir: PathBuf,
    pub uploads_dir: PathBuf,
    /// Output file the simulator writes on success
    pub result_file: PathBuf,
    pub timeout_secs: Option<u64>,
    /// Hold a process-wide lock from spawn until the result file is read
    pub serialize_runs: bool,
    pub remove_staged_after_run: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            script_args: vec!["simulation_grid_battery_vanilla.py".to_string()],
            working_dir: PathBuf::from("."),
            uploads_dir: PathBuf::from("uploads"),
            result_file: PathBuf::from("simulation_output.csv"),
            timeout_secs: None,
            serialize_runs: false,
            remove_staged_after_run: false,
        }
    }
}

impl SimulationConfig {
    pub fn uploads_path(&self) -> PathBuf {
        self.working_dir.join(&self.uploads_dir)
    }

    pub fn result_path(&self) -> PathBuf {
        self.working_dir.join(&self.result_file)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

impl Config {
    /// Defaults, then `config/default.toml`, then `SIMGW__*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }
        if !self.server.endpoint_path.starts_with('/') {
            bail!(
                "server.endpoint_path must start with '/', got {:?}",
                self.server.endpoint_path
            );
        }
        if self.simulation.program.trim().is_empty() {
            bail!("simulation.program must not be empty");
        }
        if self.simulation.result_file.as_os_str().is_empty() {
            bail!("simulation.result_file must not be empty");
        }
        if self.simulation.timeout_secs == Some(0) {
            bail!("simulation.timeout_secs must be greater than zero when set");
        }
        Ok(())
    }
}
