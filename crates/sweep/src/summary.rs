use std::{
    fmt,
    path::PathBuf,
    time::{Duration, Instant},
};

/// Per-model outcome counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSummary {
    pub model: String,
    pub recorded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub table: Option<PathBuf>,
}

impl ModelSummary {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn attempted(&self) -> usize {
        self.recorded + self.skipped + self.failed
    }
}

/// Totals for a whole sweep.
#[derive(Debug, Clone)]
pub struct SweepSummary {
    pub models: Vec<ModelSummary>,
    /// Set when the sweep stopped before visiting every point.
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl SweepSummary {
    pub fn recorded(&self) -> usize {
        self.models.iter().map(|m| m.recorded).sum()
    }

    pub fn skipped(&self) -> usize {
        self.models.iter().map(|m| m.skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.models.iter().map(|m| m.failed).sum()
    }

    /// Every visited point produced a row.
    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.skipped() == 0 && self.failed() == 0
    }

    /// Closing line for the console.
    pub fn headline(&self) -> &'static str {
        if self.interrupted {
            "Benchmarks interrupted; partial results saved."
        } else {
            "Benchmarks complete!"
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = &PathBuf> {
        self.models.iter().filter_map(|m| m.table.as_ref())
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for model in &self.models {
            writeln!(
                f,
                "{}: recorded={} skipped={} failed={}",
                model.model, model.recorded, model.skipped, model.failed
            )?;
        }
        write!(
            f,
            "total: recorded={} skipped={} failed={} elapsed={:.1}s{}",
            self.recorded(),
            self.skipped(),
            self.failed(),
            self.elapsed.as_secs_f64(),
            if self.interrupted { " (interrupted)" } else { "" }
        )
    }
}

/// Accumulates model summaries while a sweep runs.
#[derive(Debug)]
pub struct SummaryBuilder {
    start_time: Instant,
    models: Vec<ModelSummary>,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            models: Vec::new(),
        }
    }

    pub fn push(&mut self, model: ModelSummary) {
        self.models.push(model);
    }

    pub fn finish(self, interrupted: bool) -> SweepSummary {
        SweepSummary {
            models: self.models,
            interrupted,
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for SummaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
