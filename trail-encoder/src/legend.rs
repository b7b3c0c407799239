//! Legend: the visual encoding of each categorical tag
//!
//! Types map to polygon side counts, properties map to colors. Entries keep
//! first-seen order and are never revised once assigned.

use crate::color::Color;
use crate::config::MIN_SIDES;
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Polygon side count used as the encoding for a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(pub u32);

impl ShapeId {
    pub fn sides(self) -> u32 {
        self.0
    }

    /// True if the shape has enough sides to draw
    pub fn is_drawable(self) -> bool {
        self.0 >= MIN_SIDES
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-gon", self.0)
    }
}

/// Read-only mapping from tags to shape and color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize + Hash + Eq",
    deserialize = "K: Deserialize<'de> + Hash + Eq"
))]
pub struct Legend<K = String>
where
    K: Hash + Eq,
{
    shapes: IndexMap<K, ShapeId>,
    colors: IndexMap<K, Color>,
}

impl<K: Hash + Eq> Default for Legend<K> {
    fn default() -> Self {
        Self {
            shapes: IndexMap::new(),
            colors: IndexMap::new(),
        }
    }
}

impl<K: Hash + Eq> Legend<K> {
    /// Shape assigned to a type, if it was observed
    pub fn shape_of(&self, kind: &K) -> Option<ShapeId> {
        self.shapes.get(kind).copied()
    }

    /// Color assigned to a property, if it was observed
    pub fn color_of(&self, prop: &K) -> Option<Color> {
        self.colors.get(prop).copied()
    }

    /// Type entries in first-seen order
    pub fn shapes(&self) -> impl Iterator<Item = (&K, ShapeId)> {
        self.shapes.iter().map(|(k, s)| (k, *s))
    }

    /// Property entries in first-seen order
    pub fn colors(&self) -> impl Iterator<Item = (&K, Color)> {
        self.colors.iter().map(|(k, c)| (k, *c))
    }

    pub fn num_types(&self) -> usize {
        self.shapes.len()
    }

    pub fn num_props(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.colors.is_empty()
    }
}

/// Single-pass builder that hands out shapes and colors on first sight
pub(crate) struct LegendBuilder<'r, K: Hash + Eq, R: Rng + ?Sized> {
    legend: Legend<K>,
    /// `None` once every id up to `u32::MAX` has been handed out
    next_shape: Option<u32>,
    rng: &'r mut R,
}

impl<'r, K: Hash + Eq + Clone, R: Rng + ?Sized> LegendBuilder<'r, K, R> {
    pub(crate) fn new(shape_base: u32, rng: &'r mut R) -> Self {
        Self {
            legend: Legend::default(),
            next_shape: Some(shape_base),
            rng,
        }
    }

    /// Record one observation's tags; already-seen tags keep their entry
    pub(crate) fn observe(&mut self, kind: &K, prop: &K) {
        if !self.legend.shapes.contains_key(kind) {
            match self.next_shape {
                Some(sides) => {
                    let shape = ShapeId(sides);
                    self.next_shape = sides.checked_add(1);
                    log::trace!("New type assigned {}", shape);
                    self.legend.shapes.insert(kind.clone(), shape);
                }
                // Unassigned types stay out of the legend and are not drawn
                None => log::warn!("Shape ids exhausted, type left without a shape"),
            }
        }
        if !self.legend.colors.contains_key(prop) {
            let color = Color::random(&mut *self.rng);
            log::trace!("New property assigned {}", color);
            self.legend.colors.insert(prop.clone(), color);
        }
    }

    pub(crate) fn finish(self) -> Legend<K> {
        self.legend
    }
}
