//! Sweep of KV-cache lengths across attention variants, driving an external
//! micro-benchmark once per grid point and collecting its timing reports
//! into one CSV table per variant.

pub mod config;
pub mod errors;
pub mod grid;
pub mod logging;
pub mod orchestrator;
pub mod report;
pub mod runner;
pub mod summary;
pub mod table;

pub use config::SweepConfig;
pub use errors::{PointError, ReportError, RunnerError, SweepError};
pub use grid::{log_spaced_lengths, BenchmarkPoint, SweepGrid};
pub use logging::{LoggingSettings, ProgressLogger};
pub use orchestrator::{Orchestrator, PointOutcome};
pub use report::{parse_report, ReportFields, ResultRecord};
pub use runner::{BenchmarkRunner, ProcessRunner, RawOutput};
pub use summary::SweepSummary;
pub use table::{ResultTable, TABLE_HEADER};
