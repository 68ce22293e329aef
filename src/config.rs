use serde::Deserialize;

use std::path::Path;

use crate::errors::*;
use crate::fastq::{MAX_LINE_LEN, SINGLE_MAX_LINE_LEN};

/// Number of read pairs sent to a worker at once in paired mode.
pub const BATCH_SIZE: usize = 1000;
/// Work and result queue capacity in paired mode.
pub const PAIRED_QUEUE_CAPACITY: usize = 1000;
/// Queue slots per worker thread in single-end mode.
pub const SINGLE_QUEUE_SLOTS_PER_THREAD: usize = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Single,
    Paired,
}

/// Tuning options for one run, as read from a YAML file.
///
/// Every field is optional; unset fields get a default that depends on the [`Mode`]
/// when the config is resolved into [`Settings`].
///
/// ```yaml
/// threads: 8
/// batch_size: 500
/// queue_capacity: 64
/// max_line_len: 1048576
/// ordered: true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub threads: Option<usize>,
    pub batch_size: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub max_line_len: Option<usize>,
    pub ordered: bool,
}

/// Fully resolved pipeline settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub mode: Mode,
    pub threads: usize,
    pub batch_size: usize,
    pub queue_capacity: usize,
    pub max_line_len: usize,
    pub ordered: bool,
}

impl PipelineConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config {
            context: "YAML string".to_owned(),
            source: e,
        })
    }

    pub fn from_path(file: impl AsRef<Path>) -> Result<Self> {
        let path = file.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::FileIo {
            file: path.display().to_string(),
            source: e,
        })?;

        serde_yaml::from_str(&yaml).map_err(|e| Error::Config {
            context: format!("\"{}\"", path.display()),
            source: e,
        })
    }

    /// Fill in defaults for `mode` and check that every setting is usable.
    pub fn resolve(&self, mode: Mode) -> Result<Settings> {
        let threads = self.threads.unwrap_or(match mode {
            Mode::Single => num_cpus::get(),
            Mode::Paired => 1,
        });
        if threads == 0 {
            return Err(Error::InvalidConfig("threads must be greater than zero"));
        }

        let batch_size = self.batch_size.unwrap_or(BATCH_SIZE);
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be greater than zero"));
        }

        let queue_capacity = self.queue_capacity.unwrap_or(match mode {
            Mode::Single => threads.saturating_mul(SINGLE_QUEUE_SLOTS_PER_THREAD),
            Mode::Paired => PAIRED_QUEUE_CAPACITY,
        });
        if queue_capacity == 0 {
            return Err(Error::InvalidConfig("queue_capacity must be greater than zero"));
        }

        let max_line_len = self.max_line_len.unwrap_or(match mode {
            Mode::Single => SINGLE_MAX_LINE_LEN,
            Mode::Paired => MAX_LINE_LEN,
        });
        if max_line_len == 0 {
            return Err(Error::InvalidConfig("max_line_len must be greater than zero"));
        }

        Ok(Settings {
            mode,
            threads,
            batch_size,
            queue_capacity,
            max_line_len,
            ordered: self.ordered,
        })
    }
}
