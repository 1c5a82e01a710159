use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::errors::{Result, SweepError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SweepConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SweepConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut config: SweepConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            Some("toml") | Some("tml") | None => toml::from_str(&contents)?,
            Some(other) => {
                return Err(SweepError::ConfigFormat(format!(
                    "unsupported configuration extension '{}'",
                    other
                )));
            }
        };

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.apply_base_path(base_dir);
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.grid.models.is_empty() {
            errors.push("grid.models must not be empty".to_string());
        }

        for model in &self.grid.models {
            if model.trim().is_empty() {
                errors.push("grid.models must not contain blank identifiers".to_string());
            } else if model.contains(['/', '\\']) {
                errors.push(format!(
                    "grid.models entry '{}' must not contain path separators",
                    model
                ));
            }
        }

        let mut lowered: Vec<String> = self.grid.models.iter().map(|m| m.to_lowercase()).collect();
        lowered.sort();
        if lowered.windows(2).any(|pair| pair[0] == pair[1]) {
            errors.push(
                "grid.models must be unique ignoring case (table files use lowercased names)"
                    .to_string(),
            );
        }

        if self.grid.batch_size == 0 {
            errors.push("grid.batch_size must be greater than 0".to_string());
        }

        if self.grid.num_lengths == 0 {
            errors.push("grid.num_lengths must be greater than 0".to_string());
        }

        if !self.grid.lower_exponent.is_finite() || !self.grid.upper_exponent.is_finite() {
            errors.push("grid exponents must be finite".to_string());
        } else {
            if self.grid.lower_exponent > self.grid.upper_exponent {
                errors.push("grid.lower_exponent cannot exceed grid.upper_exponent".to_string());
            }
            if self.grid.lower_exponent < 0.0 {
                errors.push("grid.lower_exponent must be >= 0".to_string());
            }
            // 10^upper must stay representable as a kv length
            if self.grid.upper_exponent > 15.0 {
                errors.push("grid.upper_exponent must be <= 15".to_string());
            }
        }

        if self.benchmark.program.trim().is_empty() {
            errors.push("benchmark.program must not be empty".to_string());
        }

        if self.benchmark.config_path.as_os_str().is_empty() {
            errors.push("benchmark.config_path must not be empty".to_string());
        }

        if !(self.benchmark.min_run_time.is_finite() && self.benchmark.min_run_time > 0.0) {
            errors.push("benchmark.min_run_time must be greater than 0".to_string());
        }

        if self.runtime.results_dir.as_os_str().is_empty() {
            errors.push("runtime.results_dir must not be empty".to_string());
        }

        if !errors.is_empty() {
            return Err(SweepError::validation(errors));
        }

        Ok(())
    }

    fn apply_base_path(&mut self, base: &Path) {
        self.runtime.apply_base_path(base);
        self.logging.apply_base_path(base);
        if let Some(dir) = self.benchmark.working_dir.as_mut() {
            absolutize_in_place(dir, base);
        }
    }
}

/// Swept parameter space: which variants, which batch size, and how the
/// kv lengths are spaced.
#[derive(Debug, Clone, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_lower_exponent")]
    pub lower_exponent: f64,
    #[serde(default = "default_upper_exponent")]
    pub upper_exponent: f64,
    #[serde(default = "default_num_lengths")]
    pub num_lengths: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            batch_size: default_batch_size(),
            lower_exponent: default_lower_exponent(),
            upper_exponent: default_upper_exponent(),
            num_lengths: default_num_lengths(),
        }
    }
}

/// How the external benchmark executable is launched.
///
/// `args` come first on the command line; the per-point flags follow.
/// `config_path` is handed to the child verbatim and resolved relative to
/// the child's working directory, not the sweep config file.
#[derive(Debug, Clone, Deserialize)]
pub struct BenchmarkConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_program_args")]
    pub args: Vec<String>,
    #[serde(default = "default_benchmark_config_path")]
    pub config_path: PathBuf,
    #[serde(default = "default_min_run_time")]
    pub min_run_time: f64,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_program_args(),
            config_path: default_benchmark_config_path(),
            min_run_time: default_min_run_time(),
            working_dir: None,
        }
    }
}

/// Seed and accelerator forwarded to every benchmark child, plus where
/// tables go.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub device: Option<usize>,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            device: None,
            results_dir: default_results_dir(),
        }
    }
}

impl RuntimeConfig {
    fn apply_base_path(&mut self, base: &Path) {
        absolutize_in_place(&mut self.results_dir, base);
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_enable_stdout")]
    pub enable_stdout: bool,
    #[serde(default)]
    pub run_log: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_stdout: default_enable_stdout(),
            run_log: None,
        }
    }
}

impl LoggingConfig {
    fn apply_base_path(&mut self, base: &Path) {
        if let Some(path) = self.run_log.as_mut() {
            absolutize_in_place(path, base);
        }
    }
}

fn absolutize_in_place(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

pub const DEFAULT_MODELS: [&str; 3] = [
    "SimpleAttention",
    "SimpleCompressedAttention",
    "SimpleAbsorbedAttention",
];

fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}

fn default_batch_size() -> usize {
    32
}

fn default_lower_exponent() -> f64 {
    2.0
}

fn default_upper_exponent() -> f64 {
    4.8
}

fn default_num_lengths() -> usize {
    8
}

fn default_program() -> String {
    "python3".to_string()
}

fn default_program_args() -> Vec<String> {
    vec!["mla/benchmark.py".to_string()]
}

fn default_benchmark_config_path() -> PathBuf {
    PathBuf::from("mla/config.json")
}

fn default_min_run_time() -> f64 {
    2.0
}

fn default_seed() -> u64 {
    50
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_enable_stdout() -> bool {
    true
}
