pub mod batch;
pub mod config;
pub mod error;
pub mod event;
mod kinematics;
#[cfg(feature = "parquet")]
pub mod parquet_io;
pub mod source;
pub mod transform;

pub use crate::config::{Condition, Config};
pub use crate::error::Error;
pub use crate::event::{Event, RawEvent};
pub use crate::transform::{EventTransformer, Summary};

/// Convert the input tables selected by `config` into Parquet chunks
#[cfg(feature = "parquet")]
pub fn run(config: &Config) -> Result<Summary, Error> {
    use crate::parquet_io::{ParquetSink, ParquetSource};

    let source = ParquetSource::new(&config.samples_dir);
    let sink = ParquetSink::new(&config.output_dir);
    EventTransformer::new(source, sink)
        .with_progress(config.progress)
        .transform(
            config.condition.inputs(),
            config.condition.output_prefix(),
            config.max_event_size,
        )
}
