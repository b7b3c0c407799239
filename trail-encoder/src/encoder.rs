//! Main encoder API
//!
//! The encoder turns an ordered batch of observations into a legend and a
//! sequence of enriched rows. Each row links to the nearest later row with the
//! same (type, prop) in arrival order; that link drives trail rendering.

use crate::config::EncoderConfig;
use crate::legend::{Legend, LegendBuilder};
use crate::types::{EnrichedObservation, Observation, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::hash::Hash;

/// Output of one encode pass
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded<K: Hash + Eq = String> {
    pub legend: Legend<K>,
    pub rows: Vec<EnrichedObservation<K>>,
}

impl<K: Hash + Eq> Encoded<K> {
    /// Resolve the successor link of row `index`
    pub fn successor(&self, index: usize) -> Option<&EnrichedObservation<K>> {
        self.rows
            .get(index)
            .and_then(|row| row.successor)
            .and_then(|next| self.rows.get(next))
    }

    /// Number of rows that link to a successor
    pub fn num_trails(&self) -> usize {
        self.rows.iter().filter(|r| r.successor.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<K: Hash + Eq> Default for Encoded<K> {
    fn default() -> Self {
        Self {
            legend: Legend::default(),
            rows: Vec::new(),
        }
    }
}

/// Encoder state: configuration plus the color source
///
/// Owned by whoever drives encode cycles and passed in explicitly, so two
/// states never share a shape counter or RNG.
pub struct EncoderState {
    config: EncoderConfig,
    rng: StdRng,
}

impl EncoderState {
    /// Create a new encoder state
    ///
    /// Fails if the configuration does not validate.
    pub fn new(config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.color_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode a batch of observations
    ///
    /// The legend is rebuilt from scratch: the shape counter starts at
    /// `shape_base` on every call. Colors are drawn from this state's RNG.
    pub fn encode<K>(&mut self, observations: &[Observation<K>]) -> Encoded<K>
    where
        K: Hash + Eq + Clone,
    {
        log::debug!("Encoding {} observations", observations.len());

        let successors = link_successors(observations);
        let mut builder = LegendBuilder::new(self.config.shape_base, &mut self.rng);

        let rows = observations
            .iter()
            .zip(successors)
            .map(|(obs, successor)| {
                builder.observe(&obs.kind, &obs.prop);
                EnrichedObservation {
                    observation: obs.clone(),
                    successor,
                }
            })
            .collect();

        let encoded = Encoded {
            legend: builder.finish(),
            rows,
        };

        log::debug!(
            "Encoded {} rows: {} types, {} properties, {} trails",
            encoded.rows.len(),
            encoded.legend.num_types(),
            encoded.legend.num_props(),
            encoded.num_trails()
        );
        encoded
    }
}

/// Find each observation's successor index
///
/// For position `i` the result is the smallest `j > i` whose type and prop
/// both equal those of `i`, or `None`. Indices are grouped per (type, prop) in
/// arrival order, so each group is walked once and each entry links to the
/// entry after it.
pub fn link_successors<K>(observations: &[Observation<K>]) -> Vec<Option<usize>>
where
    K: Hash + Eq,
{
    let mut series: HashMap<(&K, &K), Vec<usize>> = HashMap::new();
    for (index, obs) in observations.iter().enumerate() {
        series.entry((&obs.kind, &obs.prop)).or_default().push(index);
    }

    let mut successors = vec![None; observations.len()];
    for indices in series.values() {
        for pair in indices.windows(2) {
            successors[pair[0]] = Some(pair[1]);
        }
    }
    successors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legend::ShapeId;
    use crate::types::EncoderError;

    fn obs(x: f64, y: f64, kind: &'static str, prop: &'static str) -> Observation<&'static str> {
        Observation::new(x, y, kind, prop)
    }

    fn seeded() -> EncoderState {
        EncoderState::new(EncoderConfig::new().with_color_seed(11)).unwrap()
    }

    /// Straight forward scan from the next position, one element at a time
    fn scan_successors<K: PartialEq>(observations: &[Observation<K>]) -> Vec<Option<usize>> {
        (0..observations.len())
            .map(|i| {
                observations[i + 1..]
                    .iter()
                    .position(|o| o.same_series(&observations[i]))
                    .map(|offset| i + 1 + offset)
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let encoded = seeded().encode::<&str>(&[]);
        assert!(encoded.is_empty());
        assert!(encoded.legend.is_empty());
    }

    #[test]
    fn test_reference_example() {
        let input = [
            obs(0.0, 0.0, "A", "red"),
            obs(1.0, 1.0, "B", "red"),
            obs(2.0, 2.0, "A", "red"),
        ];
        let encoded = seeded().encode(&input);

        assert_eq!(encoded.rows.len(), 3);
        assert_eq!(encoded.rows[0].successor, Some(2));
        assert_eq!(encoded.rows[1].successor, None);
        assert_eq!(encoded.rows[2].successor, None);
        assert_eq!(encoded.successor(0).map(|r| r.x()), Some(2.0));

        assert_eq!(encoded.legend.shape_of(&"A"), Some(ShapeId(3)));
        assert_eq!(encoded.legend.shape_of(&"B"), Some(ShapeId(4)));
        assert_eq!(encoded.legend.num_props(), 1);
        assert!(encoded.legend.color_of(&"red").is_some());
    }

    #[test]
    fn test_identical_rows_link_to_next_in_order() {
        let input = [
            obs(5.0, 5.0, "A", "red"),
            obs(5.0, 5.0, "A", "red"),
            obs(5.0, 5.0, "A", "red"),
        ];
        assert_eq!(link_successors(&input), vec![Some(1), Some(2), None]);
    }

    #[test]
    fn test_nearest_in_order_not_in_space() {
        let input = [
            obs(0.0, 0.0, "A", "red"),
            obs(900.0, 900.0, "A", "red"),
            obs(0.0, 0.0, "A", "red"),
        ];
        assert_eq!(link_successors(&input)[0], Some(1));
    }

    #[test]
    fn test_both_tags_must_match() {
        let input = [
            obs(0.0, 0.0, "A", "red"),
            obs(1.0, 0.0, "A", "blue"),
            obs(2.0, 0.0, "B", "red"),
            obs(3.0, 0.0, "A", "red"),
        ];
        assert_eq!(
            link_successors(&input),
            vec![Some(3), None, None, None]
        );
    }

    #[test]
    fn test_matches_forward_scan() {
        let kinds = ["A", "B", "C"];
        let props = ["red", "blue"];
        let input: Vec<_> = (0..40)
            .map(|i| obs(i as f64, 0.0, kinds[(i * 7) % 3], props[(i * 5) % 2]))
            .collect();
        assert_eq!(link_successors(&input), scan_successors(&input));
    }

    #[test]
    fn test_shape_base_restarts_each_encode() {
        let mut state =
            EncoderState::new(EncoderConfig::new().with_shape_base(6)).unwrap();
        let input = [obs(0.0, 0.0, "A", "red"), obs(0.0, 0.0, "B", "red")];

        let first = state.encode(&input);
        let second = state.encode(&input);
        assert_eq!(first.legend.shape_of(&"A"), Some(ShapeId(6)));
        assert_eq!(second.legend.shape_of(&"A"), Some(ShapeId(6)));
        assert_eq!(second.legend.shape_of(&"B"), Some(ShapeId(7)));
    }

    #[test]
    fn test_links_deterministic_across_runs() {
        let input = [
            obs(0.0, 0.0, "A", "red"),
            obs(0.0, 0.0, "B", "blue"),
            obs(0.0, 0.0, "A", "red"),
            obs(0.0, 0.0, "B", "blue"),
        ];
        let mut state = EncoderState::new(EncoderConfig::new()).unwrap();
        let a = state.encode(&input);
        let b = state.encode(&input);
        let links = |e: &Encoded<&str>| e.rows.iter().map(|r| r.successor).collect::<Vec<_>>();
        assert_eq!(links(&a), links(&b));
    }

    #[test]
    fn test_seeded_colors_reproducible() {
        let input = [obs(0.0, 0.0, "A", "red"), obs(0.0, 0.0, "A", "blue")];
        let a = seeded().encode(&input);
        let b = seeded().encode(&input);
        assert_eq!(a.legend, b.legend);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(EncoderState::new(EncoderConfig::new().with_shape_base(1)).is_err());
        assert!(matches!(
            EncoderState::new(EncoderConfig::new().with_shape_base(u32::MAX)),
            Err(EncoderError::InvalidConfig(_))
        ));
    }
}
