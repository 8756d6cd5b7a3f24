use std::{fmt, num::NonZeroUsize, path::PathBuf, str::FromStr};

use crate::error::ConfigError;

/// Default maximum number of events per output file
pub const DEFAULT_MAX_EVENT_SIZE: NonZeroUsize = match NonZeroUsize::new(100_000) {
    Some(n) => n,
    None => panic!("default chunk size must be positive"),
};

/// Which part of the sample to convert
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Condition {
    Train,
    Val,
    Test,
}

impl Condition {
    /// Input tables, relative to the sample directory
    pub fn inputs(self) -> &'static [&'static str] {
        match self {
            Condition::Train => &["train.parquet"],
            Condition::Val => &["val.parquet"],
            Condition::Test => &["test.parquet"],
        }
    }

    /// Base name of the output chunks
    pub fn output_prefix(self) -> &'static str {
        match self {
            Condition::Train => "top_train",
            Condition::Val => "top_val",
            Condition::Test => "top_test",
        }
    }
}

impl FromStr for Condition {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Condition::Train),
            "val" => Ok(Condition::Val),
            "test" => Ok(Condition::Test),
            other => Err(ConfigError::InvalidCondition(other.to_owned())),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Condition::Train => "train",
            Condition::Val => "val",
            Condition::Test => "test",
        };
        f.write_str(name)
    }
}

/// Settings for one conversion run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub condition: Condition,
    /// Maximum number of events per output file
    pub max_event_size: NonZeroUsize,
    /// Directory containing the input tables
    pub samples_dir: PathBuf,
    /// Directory receiving the output chunks
    pub output_dir: PathBuf,
    /// Show a progress bar
    pub progress: bool,
}

impl Config {
    pub fn new(condition: Condition) -> Self {
        Self {
            condition,
            max_event_size: DEFAULT_MAX_EVENT_SIZE,
            samples_dir: PathBuf::from("samples"),
            output_dir: PathBuf::from("."),
            progress: true,
        }
    }
}
