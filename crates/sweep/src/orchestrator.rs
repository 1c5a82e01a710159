//! Drives the sweep: one benchmark invocation per grid point, one table
//! per model.

use std::path::PathBuf;

use crate::{
    config::SweepConfig,
    errors::{PointError, Result},
    grid::{BenchmarkPoint, SweepGrid},
    logging::{LoggingSettings, PointEvent, ProgressLogger},
    report::{is_blank, ResultRecord},
    runner::{BenchmarkRunner, RawOutput},
    summary::{ModelSummary, SummaryBuilder, SweepSummary},
    table::{ensure_batch_dir, table_path, ResultTable},
};

/// Result of a single grid point.
#[derive(Debug)]
pub enum PointOutcome {
    Recorded(ResultRecord),
    /// The benchmark printed nothing; there is no measurement to record.
    Skipped,
    Failed(PointError),
}

impl PointOutcome {
    /// Classify a finished invocation. A non-zero exit code does not matter
    /// as long as stdout parses.
    pub fn from_output(point: &BenchmarkPoint, output: &RawOutput) -> Self {
        if is_blank(&output.stdout) {
            return PointOutcome::Skipped;
        }
        match ResultRecord::from_report(point, &output.stdout) {
            Ok(record) => PointOutcome::Recorded(record),
            Err(err) => PointOutcome::Failed(err.into()),
        }
    }
}

pub struct Orchestrator<R> {
    grid: SweepGrid,
    results_dir: PathBuf,
    runner: R,
    logger: ProgressLogger,
}

impl<R: BenchmarkRunner> Orchestrator<R> {
    pub fn new(grid: SweepGrid, results_dir: PathBuf, runner: R, logger: ProgressLogger) -> Self {
        Self {
            grid,
            results_dir,
            runner,
            logger,
        }
    }

    pub fn from_config(config: &SweepConfig, runner: R) -> Result<Self> {
        Self::with_settings(config, runner, LoggingSettings::from_config(&config.logging))
    }

    /// Validate `config` without opening the run log. Enough for [`Self::plan`].
    pub fn planner(config: &SweepConfig, runner: R) -> Result<Self> {
        Self::with_settings(config, runner, LoggingSettings::quiet())
    }

    fn with_settings(config: &SweepConfig, runner: R, settings: LoggingSettings) -> Result<Self> {
        config.validate()?;
        let logger = ProgressLogger::new(settings)?;
        Ok(Self::new(
            SweepGrid::from_config(&config.grid),
            config.runtime.results_dir.clone(),
            runner,
            logger,
        ))
    }

    pub fn grid(&self) -> &SweepGrid {
        &self.grid
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Command line (or description) of every point, in sweep order.
    pub fn plan(&self) -> Vec<String> {
        self.grid
            .points()
            .map(|point| self.runner.describe(&point))
            .collect()
    }

    pub fn run(&mut self) -> Result<SweepSummary> {
        self.run_with_shutdown(|| false)
    }

    /// Run the full sweep. `should_stop` is polled before each point; once it
    /// returns true the current model's table is written with the rows it has
    /// and the remaining points are abandoned. A model stopped before its first
    /// point keeps whatever table it already had on disk.
    pub fn run_with_shutdown<F>(&mut self, should_stop: F) -> Result<SweepSummary>
    where
        F: Fn() -> bool,
    {
        let batch_size = self.grid.batch_size();
        ensure_batch_dir(&self.results_dir, batch_size)?;
        self.logger
            .sweep_started(self.grid.len(), self.grid.models().len());

        let mut summary = SummaryBuilder::new();
        let mut interrupted = false;
        let models = self.grid.models().to_vec();
        for model in &models {
            let (table, mut model_summary, stopped) = self.run_model(model, &should_stop)?;
            if stopped && model_summary.attempted() == 0 {
                // nothing ran for this model; leave any earlier table alone
                interrupted = true;
                break;
            }
            let path = self.persist(&table)?;
            model_summary.table = Some(path);
            summary.push(model_summary);
            if stopped {
                interrupted = true;
                break;
            }
        }

        self.logger.flush()?;
        Ok(summary.finish(interrupted))
    }

    /// Benchmark every length for `model`. The returned flag is set when
    /// `should_stop` cut the model short.
    pub fn run_model<F>(
        &mut self,
        model: &str,
        should_stop: F,
    ) -> Result<(ResultTable, ModelSummary, bool)>
    where
        F: Fn() -> bool,
    {
        let mut table = ResultTable::new(model);
        let mut model_summary = ModelSummary::new(model);
        let points: Vec<BenchmarkPoint> = self.grid.points_for(model).collect();

        for point in &points {
            if should_stop() {
                log::warn!("stop requested; abandoning {} at kv_length={}", model, point.kv_length);
                return Ok((table, model_summary, true));
            }
            match self.run_point(point)? {
                PointOutcome::Recorded(record) => {
                    model_summary.recorded += 1;
                    table.push(record);
                }
                PointOutcome::Skipped => model_summary.skipped += 1,
                PointOutcome::Failed(_) => model_summary.failed += 1,
            }
        }

        Ok((table, model_summary, false))
    }

    /// Invoke the benchmark for one point. Grid-point failures come back as
    /// [`PointOutcome::Failed`]; only run-log write errors are returned as `Err`.
    pub fn run_point(&mut self, point: &BenchmarkPoint) -> Result<PointOutcome> {
        self.logger.point_started(point);

        let (outcome, exit_code) = match self.runner.invoke(point) {
            Ok(output) => {
                if !output.success() {
                    log::debug!(
                        "{} kv_length={} exited with {:?}",
                        point.model,
                        point.kv_length,
                        output.exit_code
                    );
                }
                if !output.stderr.trim().is_empty() {
                    log::debug!("stderr from {}: {}", point.model, output.stderr.trim_end());
                }
                (PointOutcome::from_output(point, &output), output.exit_code)
            }
            Err(err) => (PointOutcome::Failed(err.into()), None),
        };

        let event = match &outcome {
            PointOutcome::Recorded(record) => PointEvent::Recorded {
                point,
                record,
                exit_code,
            },
            PointOutcome::Skipped => PointEvent::Skipped { point, exit_code },
            PointOutcome::Failed(err) => PointEvent::Failed {
                point,
                error: err.to_string(),
            },
        };
        self.logger.point_finished(&event)?;

        Ok(outcome)
    }

    /// Write `table` under the batch-size directory and return its path.
    pub fn persist(&self, table: &ResultTable) -> Result<PathBuf> {
        ensure_batch_dir(&self.results_dir, self.grid.batch_size())?;
        let path = table_path(&self.results_dir, self.grid.batch_size(), table.model());
        table.write_csv(&path)?;
        self.logger.table_saved(table.model(), &path, table.len());
        Ok(path)
    }
}
