use std::fmt;
use std::path::Path;
use std::process::Stdio;

use crate::config::SimulationConfig;

use super::params::SimulationParams;

/// Argument vector for one simulator run.
///
/// The process is spawned directly from `program` and `args`, so a value with
/// shell metacharacters stays one argument. [`fmt::Display`] renders the
/// equivalent shell command line with every argument quoted, for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl SimulationCommand {
    pub fn build(config: &SimulationConfig, staged_file: &Path, params: &SimulationParams) -> Self {
        let mut args = config.script_args.clone();
        args.push(staged_file.to_string_lossy().into_owned());
        args.extend(params.to_args());
        Self {
            program: config.program.clone(),
            args,
        }
    }

    pub fn to_tokio(&self, working_dir: &Path) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for SimulationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Quote `value` as one POSIX shell word.
///
/// Wraps in single quotes and rewrites embedded quotes as `'\''`.
pub fn shell_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}
