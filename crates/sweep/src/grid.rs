//! Sweep grid: log-spaced kv lengths crossed with the model list.

use serde::Serialize;

use crate::config::GridConfig;

/// One grid coordinate. Consumed by exactly one benchmark invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkPoint {
    pub model: String,
    pub batch_size: usize,
    pub kv_length: usize,
}

/// `n` integers spaced evenly in log10 between `10^lower` and `10^upper`,
/// rounded to nearest. Adjacent values may coincide after rounding.
pub fn log_spaced_lengths(lower: f64, upper: f64, n: usize) -> Vec<usize> {
    match n {
        0 => Vec::new(),
        1 => vec![round_pow10(lower)],
        _ => {
            let step = (upper - lower) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    // pin the last exponent so float drift cannot overshoot the bound
                    let exponent = if i == n - 1 {
                        upper
                    } else {
                        lower + step * i as f64
                    };
                    round_pow10(exponent)
                })
                .collect()
        }
    }
}

fn round_pow10(exponent: f64) -> usize {
    10f64.powf(exponent).round() as usize
}

/// Fully expanded sweep. Models keep list order; lengths are ascending.
#[derive(Debug, Clone)]
pub struct SweepGrid {
    models: Vec<String>,
    batch_size: usize,
    kv_lengths: Vec<usize>,
}

impl SweepGrid {
    pub fn new(models: Vec<String>, batch_size: usize, kv_lengths: Vec<usize>) -> Self {
        Self {
            models,
            batch_size,
            kv_lengths,
        }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        let kv_lengths = log_spaced_lengths(
            config.lower_exponent,
            config.upper_exponent,
            config.num_lengths,
        );
        Self::new(config.models.clone(), config.batch_size, kv_lengths)
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn kv_lengths(&self) -> &[usize] {
        &self.kv_lengths
    }

    pub fn len(&self) -> usize {
        self.models.len() * self.kv_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Points for a single model, ascending kv length.
    pub fn points_for<'a>(&'a self, model: &'a str) -> impl Iterator<Item = BenchmarkPoint> + 'a {
        self.kv_lengths.iter().map(move |&kv_length| BenchmarkPoint {
            model: model.to_string(),
            batch_size: self.batch_size,
            kv_length,
        })
    }

    /// Every point: all lengths for the first model, then the second, and so on.
    pub fn points(&self) -> impl Iterator<Item = BenchmarkPoint> + '_ {
        self.models
            .iter()
            .flat_map(move |model| self.points_for(model.as_str()))
    }
}
