//! Accumulated observation history and its render cycle
//!
//! A `Session` buffers every observation received so far. Each refresh
//! re-encodes the whole history and redraws the surface from scratch; there is
//! no incremental legend update. The session does not know or care whether
//! observations arrive from a live feed or a bulk file.

use crate::config::EncoderConfig;
use crate::encoder::{EncoderState, Encoded};
use crate::ingest::parse_frame;
use crate::render::{hit_test, redraw, Surface};
use crate::types::{Observation, Result};
use std::hash::Hash;

pub struct Session<K: Hash + Eq = String> {
    state: EncoderState,
    history: Vec<Observation<K>>,
    latest: Encoded<K>,
    dirty: bool,
}

impl<K: Hash + Eq + Clone> Session<K> {
    pub fn new(config: EncoderConfig) -> Result<Self> {
        Ok(Self {
            state: EncoderState::new(config)?,
            history: Vec::new(),
            latest: Encoded::default(),
            dirty: false,
        })
    }

    /// Append one observation to the history
    pub fn deliver(&mut self, observation: Observation<K>) {
        self.history.push(observation);
        self.dirty = true;
    }

    /// Replace the whole history (bulk load, reload)
    pub fn replace(&mut self, observations: Vec<Observation<K>>) {
        log::info!(
            "Replacing {} buffered observations with {}",
            self.history.len(),
            observations.len()
        );
        self.history = observations;
        self.dirty = true;
    }

    /// Re-encode and redraw if anything arrived since the last refresh
    pub fn refresh<S: Surface + ?Sized>(&mut self, surface: &mut S) -> &Encoded<K> {
        if self.dirty {
            self.latest = self.state.encode(&self.history);
            redraw(surface, &self.latest, self.state.config());
            self.dirty = false;
        }
        &self.latest
    }

    /// Result of the most recent refresh
    pub fn latest(&self) -> &Encoded<K> {
        &self.latest
    }

    /// Observation under a pointer position in the last rendered frame
    pub fn probe(&self, x: f64, y: f64) -> Option<&Observation<K>> {
        hit_test(&self.latest.rows, x, y, self.state.config().hit_radius)
    }

    pub fn history(&self) -> &[Observation<K>] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// True if observations arrived since the last refresh
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn config(&self) -> &EncoderConfig {
        self.state.config()
    }
}

impl Session<String> {
    /// Parse a feed message and append it
    ///
    /// A malformed message is returned as an error and dropped; the session
    /// keeps accepting later messages.
    pub fn deliver_frame(&mut self, text: &str) -> Result<()> {
        let observation = parse_frame(text)?;
        log::trace!("Delivered {}", observation);
        self.deliver(observation);
        Ok(())
    }
}
