use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::Serialize;

use crate::{
    config::LoggingConfig,
    errors::{Result, SweepError},
    grid::BenchmarkPoint,
    report::ResultRecord,
};

#[derive(Clone, Debug, Default)]
pub struct LoggingSettings {
    pub enable_stdout: bool,
    pub run_log: Option<PathBuf>,
}

impl LoggingSettings {
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            enable_stdout: config.enable_stdout,
            run_log: config.run_log.clone(),
        }
    }

    pub fn quiet() -> Self {
        Self::default()
    }
}

/// What happened at one grid point, as recorded in the run log.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PointEvent<'a> {
    Recorded {
        #[serde(flatten)]
        point: &'a BenchmarkPoint,
        record: &'a ResultRecord,
        exit_code: Option<i32>,
    },
    Skipped {
        #[serde(flatten)]
        point: &'a BenchmarkPoint,
        exit_code: Option<i32>,
    },
    Failed {
        #[serde(flatten)]
        point: &'a BenchmarkPoint,
        error: String,
    },
}

/// Progress lines on stdout plus an optional JSON-lines run log.
pub struct ProgressLogger {
    settings: LoggingSettings,
    run_log: Option<RunLogWriter>,
}

impl ProgressLogger {
    pub fn new(settings: LoggingSettings) -> Result<Self> {
        let run_log = match settings.run_log.as_ref() {
            Some(path) => Some(RunLogWriter::create(path)?),
            None => None,
        };
        Ok(Self { settings, run_log })
    }

    pub fn sweep_started(&self, points: usize, models: usize) {
        if self.settings.enable_stdout {
            println!("Starting benchmarks... ({points} runs across {models} models)");
        }
    }

    pub fn point_started(&self, point: &BenchmarkPoint) {
        log::info!(
            "running {} kv_length={} bsz={}",
            point.model,
            point.kv_length,
            point.batch_size
        );
        if self.settings.enable_stdout {
            println!(
                "\nRunning benchmark for {} with sequence length {}",
                point.model, point.kv_length
            );
        }
    }

    pub fn point_finished(&mut self, event: &PointEvent<'_>) -> Result<()> {
        let point = match event {
            PointEvent::Recorded { point, .. } => point,
            PointEvent::Skipped { point, exit_code } => {
                log::info!(
                    "no output from {} kv_length={} (exit code {:?}); skipping",
                    point.model,
                    point.kv_length,
                    exit_code
                );
                point
            }
            PointEvent::Failed { point, error } => {
                log::warn!(
                    "benchmark {} kv_length={} failed: {}",
                    point.model,
                    point.kv_length,
                    error
                );
                point
            }
        };
        if self.settings.enable_stdout {
            println!("Completed benchmark for length {}", point.kv_length);
        }
        if let Some(writer) = self.run_log.as_mut() {
            writer.append(event)?;
        }
        Ok(())
    }

    pub fn table_saved(&self, model: &str, path: &Path, rows: usize) {
        if let Some(warning) = empty_table_warning(model, path, rows) {
            log::warn!("{warning}");
        }
        if self.settings.enable_stdout {
            println!("Results saved to {}", path.display());
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.run_log.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

struct RunLogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

#[derive(Serialize)]
struct LogLine<'a, T: Serialize> {
    wall_time: f64,
    #[serde(flatten)]
    event: &'a T,
}

impl RunLogWriter {
    fn create(path: &Path) -> Result<Self> {
        let io_err = |source: std::io::Error| SweepError::RunLog {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    fn append<T: Serialize>(&mut self, event: &T) -> Result<()> {
        let line = LogLine {
            wall_time: current_wall_time(),
            event,
        };
        let encoded = serde_json::to_string(&line).map_err(|err| self.error(err.into()))?;
        writeln!(self.writer, "{encoded}").map_err(|source| self.error(source))?;
        // one line per grid point; keep the file current if the sweep is killed
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|source| self.error(source))
    }

    fn error(&self, source: std::io::Error) -> SweepError {
        SweepError::RunLog {
            path: self.path.clone(),
            source,
        }
    }
}

/// Warning for a table written without data rows.
fn empty_table_warning(model: &str, path: &Path, rows: usize) -> Option<String> {
    (rows == 0).then(|| {
        format!(
            "every run for {} failed or produced no output; {} holds only the header",
            model,
            path.display()
        )
    })
}

fn current_wall_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_secs_f64())
        .unwrap_or(0.0)
}
