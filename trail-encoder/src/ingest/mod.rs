//! Observation ingest (tabular files, feed frames)
//!
//! Parsers here turn transport payloads into `Observation`s. Each parser works
//! record by record so one bad record never blocks the ones after it.

use crate::types::{EncoderError, Observation, Result};

pub mod frame;
pub mod tabular;

pub use frame::parse_frame;
pub use tabular::CsvReader;

/// Observations from one bulk load, split into usable and rejected records
#[derive(Debug, Default)]
pub struct Batch {
    pub observations: Vec<Observation>,
    pub rejected: Vec<EncoderError>,
}

impl Batch {
    /// Drain a record iterator, keeping good rows in file order
    ///
    /// Record-level errors are collected in `rejected`. Any other error (I/O,
    /// for instance) stops the load and is returned.
    pub fn collect<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Observation>>,
    {
        let mut batch = Batch::default();
        for record in records {
            match record {
                Ok(obs) => batch.observations.push(obs),
                Err(e) if e.is_record_error() => {
                    log::warn!("Dropping row: {}", e);
                    batch.rejected.push(e);
                }
                Err(e) => return Err(e),
            }
        }
        log::info!(
            "Loaded {} observations ({} rejected)",
            batch.observations.len(),
            batch.rejected.len()
        );
        Ok(batch)
    }
}
