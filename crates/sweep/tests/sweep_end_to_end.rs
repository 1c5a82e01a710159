use std::{collections::HashMap, fs, path::Path};

use sweep::{
    config::{BenchmarkConfig, GridConfig, LoggingConfig, RuntimeConfig},
    logging::LoggingSettings,
    BenchmarkPoint, BenchmarkRunner, Orchestrator, ProcessRunner, ProgressLogger, RawOutput,
    RunnerError, SweepConfig, SweepGrid,
};
use tempfile::tempdir;

const HEADER: &str = "bsz,kv_length,Cache_Size,Mean,Median,P25,P75";

/// Stands in for the benchmark executable: fixed stdout per grid point,
/// nothing for points it does not know.
#[derive(Default)]
struct FakeBenchmark {
    replies: HashMap<(String, usize), String>,
    invocations: usize,
}

impl FakeBenchmark {
    fn with(mut self, model: &str, kv_length: usize, stdout: &str) -> Self {
        self.replies
            .insert((model.to_string(), kv_length), stdout.to_string());
        self
    }
}

impl BenchmarkRunner for FakeBenchmark {
    fn invoke(&mut self, point: &BenchmarkPoint) -> Result<RawOutput, RunnerError> {
        self.invocations += 1;
        let stdout = self
            .replies
            .get(&(point.model.clone(), point.kv_length))
            .cloned()
            .unwrap_or_default();
        Ok(RawOutput::from_stdout(stdout))
    }
}

fn quiet_orchestrator<R: BenchmarkRunner>(
    results_dir: &Path,
    models: &[&str],
    kv_lengths: Vec<usize>,
    runner: R,
) -> Orchestrator<R> {
    let grid = SweepGrid::new(models.iter().map(|m| m.to_string()).collect(), 32, kv_lengths);
    let logger = ProgressLogger::new(LoggingSettings::quiet()).expect("logger");
    Orchestrator::new(grid, results_dir.to_path_buf(), runner, logger)
}

fn read_table(results_dir: &Path, file: &str) -> String {
    fs::read_to_string(results_dir.join("bsz-32").join(file)).expect("table written")
}

#[test]
fn single_point_row_matches_report() {
    let tmp = tempdir().expect("tempdir");
    let runner = FakeBenchmark::default().with(
        "SimpleAttention",
        100,
        "Cache_Size: 1024\nMean: 1.23\nMedian: 1.10\nP25: 0.95\nP75: 1.40",
    );
    let mut orchestrator = quiet_orchestrator(tmp.path(), &["SimpleAttention"], vec![100], runner);
    let summary = orchestrator.run().expect("sweep");

    assert!(summary.is_complete());
    assert_eq!(
        read_table(tmp.path(), "benchmark_results_simpleattention.csv"),
        format!("{HEADER}\n32,100,1024,1.23,1.10,0.95,1.40\n")
    );
}

#[test]
fn empty_output_skips_one_point_per_model() {
    let tmp = tempdir().expect("tempdir");
    let runner = FakeBenchmark::default()
        .with(
            "SimpleAttention",
            1000,
            "Cache_Size: 4096\nMean: 2.0\nMedian: 1.9\nP25: 1.8\nP75: 2.2\n",
        )
        .with(
            "SimpleAbsorbedAttention",
            100,
            "Mean: 0.5\nP75: 0.6\nCache_Size: 512\nMedian: 0.45\nP25: 0.4\n",
        )
        .with("SimpleAbsorbedAttention", 1000, "   \n\n");
    let mut orchestrator = quiet_orchestrator(
        tmp.path(),
        &["SimpleAttention", "SimpleAbsorbedAttention"],
        vec![100, 1000],
        runner,
    );
    let summary = orchestrator.run().expect("sweep");

    assert_eq!(summary.recorded(), 2);
    assert_eq!(summary.skipped(), 2);
    assert_eq!(summary.failed(), 0);
    assert_eq!(orchestrator.runner().invocations, 4);

    assert_eq!(
        read_table(tmp.path(), "benchmark_results_simpleattention.csv"),
        format!("{HEADER}\n32,1000,4096,2.0,1.9,1.8,2.2\n")
    );
    assert_eq!(
        read_table(tmp.path(), "benchmark_results_simpleabsorbedattention.csv"),
        format!("{HEADER}\n32,100,512,0.5,0.45,0.4,0.6\n")
    );

    let mut files: Vec<String> = fs::read_dir(tmp.path().join("bsz-32"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec![
            "benchmark_results_simpleabsorbedattention.csv",
            "benchmark_results_simpleattention.csv"
        ]
    );
}

#[test]
fn missing_key_drops_only_that_point() {
    let tmp = tempdir().expect("tempdir");
    let runner = FakeBenchmark::default()
        .with("SimpleAttention", 100, "Cache_Size: 1\nMean: 1.0\nMedian: 1.0\nP25: 1.0\n")
        .with(
            "SimpleAttention",
            1000,
            "Cache_Size: 2\nMean: 2.0\nMedian: 2.0\nP25: 2.0\nP75: 2.0\n",
        );
    let mut orchestrator =
        quiet_orchestrator(tmp.path(), &["SimpleAttention"], vec![100, 1000], runner);
    let summary = orchestrator.run().expect("sweep");

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.recorded(), 1);
    assert_eq!(
        read_table(tmp.path(), "benchmark_results_simpleattention.csv"),
        format!("{HEADER}\n32,1000,2,2.0,2.0,2.0,2.0\n")
    );
}

#[test]
fn repeated_sweeps_write_identical_tables() {
    let tmp = tempdir().expect("tempdir");
    let script = || {
        FakeBenchmark::default()
            .with(
                "SimpleCompressedAttention",
                100,
                "Cache_Size: 77\nMean: 0.125\nMedian: 0.12\nP25: 0.1\nP75: 0.15\nExtra: ignored\n",
            )
            .with(
                "SimpleCompressedAttention",
                1000,
                "Cache_Size: 770\nMean: 1.25e0\nMedian: 1.2\nP25: 1.0\nP75: 1.5\n",
            )
    };
    let path = tmp
        .path()
        .join("bsz-32")
        .join("benchmark_results_simplecompressedattention.csv");

    quiet_orchestrator(tmp.path(), &["SimpleCompressedAttention"], vec![100, 1000], script())
        .run()
        .expect("first sweep");
    let first = fs::read(&path).unwrap();

    quiet_orchestrator(tmp.path(), &["SimpleCompressedAttention"], vec![100, 1000], script())
        .run()
        .expect("second sweep");
    let second = fs::read(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.iter().filter(|&&b| b == b'\n').count(), 3);
}

#[test]
fn unusable_results_dir_is_fatal() {
    let tmp = tempdir().expect("tempdir");
    let blocker = tmp.path().join("results");
    fs::write(&blocker, "not a directory").unwrap();

    let mut orchestrator =
        quiet_orchestrator(&blocker, &["SimpleAttention"], vec![100], FakeBenchmark::default());
    let err = orchestrator.run().expect_err("results dir is a file");
    assert!(matches!(err, sweep::SweepError::ResultsDir { .. }));
}

#[test]
fn from_config_validates_and_uses_results_dir() {
    let tmp = tempdir().expect("tempdir");
    let config = SweepConfig {
        grid: GridConfig {
            models: vec!["SimpleAttention".into()],
            batch_size: 32,
            lower_exponent: 2.0,
            upper_exponent: 3.0,
            num_lengths: 2,
        },
        runtime: RuntimeConfig {
            results_dir: tmp.path().join("results"),
            ..RuntimeConfig::default()
        },
        logging: LoggingConfig {
            enable_stdout: false,
            run_log: Some(tmp.path().join("run.jsonl")),
        },
        ..SweepConfig::default()
    };

    let mut orchestrator =
        Orchestrator::from_config(&config, FakeBenchmark::default()).expect("valid config");
    assert_eq!(orchestrator.grid().kv_lengths(), &[100, 1000]);
    let summary = orchestrator.run().expect("sweep");
    assert_eq!(summary.skipped(), 2);

    let log = fs::read_to_string(tmp.path().join("run.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 2);
    assert_eq!(
        read_table(&tmp.path().join("results"), "benchmark_results_simpleattention.csv"),
        format!("{HEADER}\n")
    );

    let mut invalid = config.clone();
    invalid.grid.models.clear();
    assert!(Orchestrator::from_config(&invalid, FakeBenchmark::default()).is_err());
}

#[cfg(unix)]
#[test]
fn process_runner_drives_a_real_child() {
    let tmp = tempdir().expect("tempdir");
    // $2 is the model name: the script sees `--bench <model> --kv_len <n> ...`
    let script = r#"
case "$2" in
  Good) printf 'Cache_Size: %s\nMean: 1.50\nMedian: 1.25\nP25: 1.00\nP75: 2.00\n' "$4" ;;
  Noisy) echo "loading weights"; exit 1 ;;
  *) exit 1 ;;
esac
"#;
    let benchmark = BenchmarkConfig {
        program: "sh".into(),
        args: vec!["-c".into(), script.into(), "fake-benchmark".into()],
        ..BenchmarkConfig::default()
    };
    let runner = ProcessRunner::new(&benchmark, &RuntimeConfig::default());
    let mut orchestrator = quiet_orchestrator(
        tmp.path(),
        &["Good", "Noisy", "Silent"],
        vec![100, 251],
        runner,
    );
    let summary = orchestrator.run().expect("sweep");

    assert_eq!(summary.recorded(), 2);
    assert_eq!(summary.failed(), 2);
    assert_eq!(summary.skipped(), 2);
    assert_eq!(
        read_table(tmp.path(), "benchmark_results_good.csv"),
        format!("{HEADER}\n32,100,100,1.50,1.25,1.00,2.00\n32,251,251,1.50,1.25,1.00,2.00\n")
    );
    assert_eq!(
        read_table(tmp.path(), "benchmark_results_noisy.csv"),
        format!("{HEADER}\n")
    );
}
