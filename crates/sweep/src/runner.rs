use std::{
    ffi::OsString,
    path::PathBuf,
    process::Command,
};

use crate::{
    config::{BenchmarkConfig, RuntimeConfig},
    errors::RunnerError,
    grid::BenchmarkPoint,
};

pub const SEED_ENV: &str = "BENCH_SEED";
pub const DEVICE_ENV: &str = "CUDA_VISIBLE_DEVICES";

/// Captured output of one benchmark invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the child was terminated by a signal or the runner
    /// has no process behind it.
    pub exit_code: Option<i32>,
}

impl RawOutput {
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs the external benchmark for a single grid point and blocks until
/// it is done.
pub trait BenchmarkRunner {
    fn invoke(&mut self, point: &BenchmarkPoint) -> Result<RawOutput, RunnerError>;

    /// Human readable form of the invocation, used for dry runs.
    fn describe(&self, point: &BenchmarkPoint) -> String {
        format!(
            "{} kv_len={} bsz={}",
            point.model, point.kv_length, point.batch_size
        )
    }
}

impl<R: BenchmarkRunner + ?Sized> BenchmarkRunner for &mut R {
    fn invoke(&mut self, point: &BenchmarkPoint) -> Result<RawOutput, RunnerError> {
        (**self).invoke(point)
    }

    fn describe(&self, point: &BenchmarkPoint) -> String {
        (**self).describe(point)
    }
}

/// Spawns the configured executable as a child process. No timeout is
/// applied; a hung benchmark blocks the sweep.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    leading_args: Vec<String>,
    config_path: PathBuf,
    min_run_time: f64,
    working_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl ProcessRunner {
    pub fn new(benchmark: &BenchmarkConfig, runtime: &RuntimeConfig) -> Self {
        let mut env = vec![(SEED_ENV.to_string(), runtime.seed.to_string())];
        if let Some(device) = runtime.device {
            env.push((DEVICE_ENV.to_string(), device.to_string()));
        }
        Self {
            program: benchmark.program.clone(),
            leading_args: benchmark.args.clone(),
            config_path: benchmark.config_path.clone(),
            min_run_time: benchmark.min_run_time,
            working_dir: benchmark.working_dir.clone(),
            env,
        }
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Arguments after the program name for `point`.
    pub fn arguments(&self, point: &BenchmarkPoint) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.leading_args.iter().map(OsString::from).collect();
        args.push("--bench".into());
        args.push(point.model.clone().into());
        args.push("--kv_len".into());
        args.push(point.kv_length.to_string().into());
        args.push(format!("--bsz={}", point.batch_size).into());
        let mut config_flag = OsString::from("--config=");
        config_flag.push(self.config_path.as_os_str());
        args.push(config_flag);
        args.push(format!("--min_run_time={}", format_seconds(self.min_run_time)).into());
        args
    }

    fn command(&self, point: &BenchmarkPoint) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.arguments(point));
        command.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = self.working_dir.as_ref() {
            command.current_dir(dir);
        }
        command
    }
}

impl BenchmarkRunner for ProcessRunner {
    fn invoke(&mut self, point: &BenchmarkPoint) -> Result<RawOutput, RunnerError> {
        let output = self
            .command(point)
            .output()
            .map_err(|source| RunnerError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        Ok(RawOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }

    fn describe(&self, point: &BenchmarkPoint) -> String {
        let mut line = self.program.clone();
        for arg in self.arguments(point) {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Seconds always carry a fractional part (`2` prints as `2.0`).
fn format_seconds(seconds: f64) -> String {
    if seconds.fract() == 0.0 {
        format!("{seconds:.1}")
    } else {
        seconds.to_string()
    }
}
