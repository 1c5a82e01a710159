use std::{
    fs,
    path::{Path, PathBuf},
};

use csv::Writer;

use crate::{
    errors::{Result, SweepError},
    report::ResultRecord,
};

/// Column names downstream analysis reads. Capitalisation is part of the
/// file format.
pub const TABLE_HEADER: [&str; 7] = ["bsz", "kv_length", "Cache_Size", "Mean", "Median", "P25", "P75"];

/// Rows for one model in the order they were measured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    model: String,
    records: Vec<ResultRecord>,
}

impl ResultTable {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            records: Vec::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn push(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the header and every row to `path`, replacing any existing file.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let persist_err = |source: csv::Error| SweepError::Persist {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = Writer::from_path(path).map_err(persist_err)?;
        writer.write_record(TABLE_HEADER).map_err(persist_err)?;
        for record in &self.records {
            writer.write_record(record.to_row()).map_err(persist_err)?;
        }
        writer
            .flush()
            .map_err(|err| persist_err(csv::Error::from(err)))?;
        Ok(())
    }
}

/// `<results_dir>/bsz-<N>`; one directory per batch size.
pub fn batch_dir(results_dir: &Path, batch_size: usize) -> PathBuf {
    results_dir.join(format!("bsz-{batch_size}"))
}

pub fn table_file_name(model: &str) -> String {
    format!("benchmark_results_{}.csv", model.to_lowercase())
}

pub fn table_path(results_dir: &Path, batch_size: usize, model: &str) -> PathBuf {
    batch_dir(results_dir, batch_size).join(table_file_name(model))
}

/// Create the batch-size directory. Succeeds when it already exists.
pub fn ensure_batch_dir(results_dir: &Path, batch_size: usize) -> Result<PathBuf> {
    let dir = batch_dir(results_dir, batch_size);
    fs::create_dir_all(&dir).map_err(|source| SweepError::ResultsDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
