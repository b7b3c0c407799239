//! Trail Encoder Library
//!
//! Turns a stream of tagged point observations into a visual encoding and
//! paints it onto a drawing surface.
//!
//! # Architecture
//!
//! Observations carry coordinates and two categorical tags, a *type* and a
//! *property*:
//! - Each distinct type gets a regular polygon with a unique side count
//!   (3, 4, 5, ... in first-seen order)
//! - Each distinct property gets a randomly generated color
//! - Each observation links to the next later observation with the same
//!   (type, property), and the renderer draws a trail line along that link
//!
//! The library does NOT:
//! - Own the transport (socket feed, file fetch) or any reconnect logic
//! - Own a concrete drawing target (implement [`Surface`] for that)
//! - Persist observations between runs
//!
//! Transport, output and configuration files live in the application layer
//! (trail-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use trail_encoder::{Batch, CsvReader, EncoderConfig, EncoderState, RecordingSurface};
//! use std::path::Path;
//!
//! let batch = Batch::collect(CsvReader::from_path(Path::new("canvas01.csv")).unwrap()).unwrap();
//!
//! let config = EncoderConfig::new().with_shape_base(3);
//! let mut state = EncoderState::new(config.clone()).unwrap();
//! let encoded = state.encode(&batch.observations);
//!
//! let mut surface = RecordingSurface::new(1000.0, 1000.0);
//! trail_encoder::render(&mut surface, &encoded, &config);
//!
//! for (kind, shape) in encoded.legend.shapes() {
//!     println!("{} -> {}", kind, shape);
//! }
//! ```

// Public modules
pub mod color;
pub mod config;
pub mod encoder;
pub mod ingest;
pub mod legend;
pub mod render;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use color::Color;
pub use config::EncoderConfig;
pub use encoder::{link_successors, Encoded, EncoderState};
pub use ingest::{parse_frame, Batch, CsvReader};
pub use legend::{Legend, ShapeId};
pub use render::{
    draw_polygon, hit_test, probe, redraw, render, DrawOp, RecordingSurface, Surface,
};
pub use session::Session;
pub use types::{EncoderError, EnrichedObservation, Observation, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
