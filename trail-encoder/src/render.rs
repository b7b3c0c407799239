//! Renderer: paints encoded rows onto a drawing surface
//!
//! This module provides:
//! - [`Surface`] trait for implementing drawing targets (SVG, canvas, etc.)
//! - [`render`] to paint rows with their trails
//! - [`hit_test`] / [`probe`] for pointer lookups
//! - [`RecordingSurface`], an in-memory surface that records every call
//!
//! # Drawing order
//!
//! Rows are painted in sequence order. For each row the trail line to its
//! successor is stroked first and the polygon is drawn on top, so later rows
//! cover earlier rows' lines where they meet.
//!
//! # Hit testing
//!
//! [`hit_test`] returns the *first* row in arrival order within the threshold,
//! not the nearest one. When markers overlap, the answer depends on arrival
//! order.

use crate::color::Color;
use crate::config::{EncoderConfig, MIN_SIDES};
use crate::encoder::Encoded;
use crate::types::{EnrichedObservation, Observation};
use std::f64::consts::TAU;
use std::hash::Hash;

/// Trait for drawing targets.
///
/// Path commands accumulate into the current path; `stroke` and `fill` paint
/// it. The path is reset by `begin_path`.
pub trait Surface {
    /// Start a new, empty path.
    fn begin_path(&mut self);

    /// Move the current point without drawing.
    fn move_to(&mut self, x: f64, y: f64);

    /// Add a segment from the current point to (x, y).
    fn line_to(&mut self, x: f64, y: f64);

    /// Close the current sub-path back to its start.
    fn close_path(&mut self);

    /// Stroke the current path with the surface's stroke color.
    fn stroke(&mut self);

    /// Fill the current path with `color`.
    fn fill(&mut self, color: Color);

    /// Erase everything drawn so far.
    fn clear(&mut self);

    /// Current pointer position in surface-local coordinates, if any.
    fn pointer_position(&self) -> Option<(f64, f64)>;

    /// Logical size of the surface (width, height).
    fn size(&self) -> (f64, f64);
}

/// Draw a regular polygon centred on (cx, cy).
///
/// Vertex `k` sits at angle `2πk/sides` on a circle of `radius`. Fewer than
/// three sides draws nothing.
pub fn draw_polygon<S: Surface + ?Sized>(
    surface: &mut S,
    cx: f64,
    cy: f64,
    radius: f64,
    sides: u32,
    color: Color,
) {
    if sides < MIN_SIDES {
        log::trace!("Skipping degenerate polygon with {} sides", sides);
        return;
    }

    let step = TAU / sides as f64;
    surface.begin_path();
    surface.move_to(cx + radius, cy);
    for k in 1..sides {
        let angle = step * k as f64;
        surface.line_to(cx + radius * angle.cos(), cy + radius * angle.sin());
    }
    surface.close_path();
    surface.stroke();
    surface.fill(color);
}

/// Stroke a straight segment between two points.
pub fn draw_line<S: Surface + ?Sized>(surface: &mut S, from: (f64, f64), to: (f64, f64)) {
    surface.begin_path();
    surface.move_to(from.0, from.1);
    surface.line_to(to.0, to.1);
    surface.stroke();
}

/// Paint every row: trail line first, then the row's polygon.
///
/// Rows whose tags are missing from the legend are skipped.
pub fn render<S, K>(surface: &mut S, encoded: &Encoded<K>, config: &EncoderConfig)
where
    S: Surface + ?Sized,
    K: Hash + Eq,
{
    let legend = &encoded.legend;
    let mut skipped = 0usize;

    for (index, row) in encoded.rows.iter().enumerate() {
        let (Some(shape), Some(color)) = (legend.shape_of(row.kind()), legend.color_of(row.prop()))
        else {
            skipped += 1;
            continue;
        };

        if config.draw_trails {
            if let Some(next) = encoded.successor(index) {
                draw_line(surface, (row.x(), row.y()), (next.x(), next.y()));
            }
        }

        draw_polygon(
            surface,
            row.x(),
            row.y(),
            config.marker_radius,
            shape.sides(),
            color,
        );
    }

    if skipped > 0 {
        log::warn!("Skipped {} rows with no legend entry", skipped);
    }
    log::debug!("Rendered {} rows", encoded.rows.len() - skipped);
}

/// Clear the surface and paint everything again.
pub fn redraw<S, K>(surface: &mut S, encoded: &Encoded<K>, config: &EncoderConfig)
where
    S: Surface + ?Sized,
    K: Hash + Eq,
{
    surface.clear();
    render(surface, encoded, config);
}

/// First row (in arrival order) closer than `threshold` to the pointer.
pub fn hit_test<K>(
    rows: &[EnrichedObservation<K>],
    pointer_x: f64,
    pointer_y: f64,
    threshold: f64,
) -> Option<&Observation<K>> {
    rows.iter()
        .map(|row| &row.observation)
        .find(|obs| obs.distance_to(pointer_x, pointer_y) < threshold)
}

/// Hit-test at the surface's current pointer position.
pub fn probe<'a, S, K>(
    surface: &S,
    rows: &'a [EnrichedObservation<K>],
    threshold: f64,
) -> Option<&'a Observation<K>>
where
    S: Surface + ?Sized,
{
    let (x, y) = surface.pointer_position()?;
    hit_test(rows, x, y, threshold)
}

/// A single recorded surface call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    BeginPath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    ClosePath,
    Stroke,
    Fill(Color),
    Clear,
}

/// Surface that records calls instead of drawing
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
    pointer: Option<(f64, f64)>,
    width: f64,
    height: f64,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            ops: Vec::new(),
            pointer: None,
            width,
            height,
        }
    }

    /// Move the simulated pointer.
    pub fn set_pointer(&mut self, x: f64, y: f64) {
        self.pointer = Some((x, y));
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Number of filled shapes recorded since the last clear.
    pub fn fill_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, DrawOp::Fill(_))).count()
    }
}

impl Surface for RecordingSurface {
    fn begin_path(&mut self) {
        self.ops.push(DrawOp::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ops.push(DrawOp::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ops.push(DrawOp::LineTo(x, y));
    }

    fn close_path(&mut self) {
        self.ops.push(DrawOp::ClosePath);
    }

    fn stroke(&mut self) {
        self.ops.push(DrawOp::Stroke);
    }

    fn fill(&mut self, color: Color) {
        self.ops.push(DrawOp::Fill(color));
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear);
    }

    fn pointer_position(&self) -> Option<(f64, f64)> {
        self.pointer
    }

    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncoderState;

    fn encode(input: &[Observation<&'static str>]) -> Encoded<&'static str> {
        EncoderState::new(EncoderConfig::new().with_color_seed(5))
            .unwrap()
            .encode(input)
    }

    #[test]
    fn test_degenerate_polygon_draws_nothing() {
        let mut surface = RecordingSurface::new(100.0, 100.0);
        draw_polygon(&mut surface, 10.0, 10.0, 5.0, 2, Color::BLACK);
        draw_polygon(&mut surface, 10.0, 10.0, 5.0, 0, Color::BLACK);
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn test_triangle_vertices() {
        let mut surface = RecordingSurface::new(100.0, 100.0);
        let red = Color::rgb(255, 0, 0);
        draw_polygon(&mut surface, 10.0, 20.0, 5.0, 3, red);

        let ops = surface.ops();
        assert_eq!(ops.len(), 7);
        assert_eq!(ops[0], DrawOp::BeginPath);
        assert_eq!(ops[1], DrawOp::MoveTo(15.0, 20.0));
        let DrawOp::LineTo(x, y) = ops[2] else {
            panic!("expected LineTo, got {:?}", ops[2]);
        };
        assert!((x - 7.5).abs() < 1e-9);
        assert!((y - (20.0 + 5.0 * (TAU / 3.0).sin())).abs() < 1e-9);
        assert_eq!(ops[4], DrawOp::ClosePath);
        assert_eq!(ops[5], DrawOp::Stroke);
        assert_eq!(ops[6], DrawOp::Fill(red));
    }

    #[test]
    fn test_line_drawn_before_polygon() {
        let encoded = encode(&[
            Observation::new(0.0, 0.0, "A", "red"),
            Observation::new(50.0, 50.0, "A", "red"),
        ]);
        let mut surface = RecordingSurface::new(100.0, 100.0);
        render(&mut surface, &encoded, &EncoderConfig::new());

        let ops = surface.ops();
        // Row 0: line to row 1, then its triangle
        assert_eq!(
            &ops[..4],
            &[
                DrawOp::BeginPath,
                DrawOp::MoveTo(0.0, 0.0),
                DrawOp::LineTo(50.0, 50.0),
                DrawOp::Stroke,
            ]
        );
        assert_eq!(ops[4], DrawOp::BeginPath);
        assert_eq!(ops[5], DrawOp::MoveTo(5.0, 0.0));
        // Row 1 has no successor: just its polygon
        assert_eq!(surface.fill_count(), 2);
        assert_eq!(
            ops.iter().filter(|op| **op == DrawOp::Stroke).count(),
            3
        );
    }

    #[test]
    fn test_trails_disabled() {
        let encoded = encode(&[
            Observation::new(0.0, 0.0, "A", "red"),
            Observation::new(50.0, 50.0, "A", "red"),
        ]);
        let mut surface = RecordingSurface::new(100.0, 100.0);
        render(&mut surface, &encoded, &EncoderConfig::new().with_trails(false));
        assert_eq!(surface.ops()[1], DrawOp::MoveTo(5.0, 0.0));
        assert_eq!(surface.fill_count(), 2);
    }

    #[test]
    fn test_fill_uses_property_color() {
        let encoded = encode(&[Observation::new(0.0, 0.0, "A", "red")]);
        let red = encoded.legend.color_of(&"red").unwrap();
        let mut surface = RecordingSurface::new(100.0, 100.0);
        render(&mut surface, &encoded, &EncoderConfig::new());
        assert_eq!(surface.ops().last(), Some(&DrawOp::Fill(red)));
    }

    #[test]
    fn test_redraw_clears_first() {
        let encoded = encode(&[Observation::new(0.0, 0.0, "A", "red")]);
        let mut surface = RecordingSurface::new(100.0, 100.0);
        redraw(&mut surface, &encoded, &EncoderConfig::new());
        redraw(&mut surface, &encoded, &EncoderConfig::new());
        assert_eq!(surface.ops()[0], DrawOp::Clear);
        assert_eq!(surface.fill_count(), 1);
    }

    #[test]
    fn test_hit_test_first_match_wins() {
        let encoded = encode(&[
            Observation::new(10.0, 10.5, "A", "red"),
            Observation::new(10.0, 10.0, "B", "red"),
        ]);
        // Row 1 is exactly under the pointer, row 0 still wins
        let hit = hit_test(&encoded.rows, 10.0, 10.0, 5.0).unwrap();
        assert_eq!(hit.kind, "A");
    }

    #[test]
    fn test_hit_test_threshold_is_strict() {
        let encoded = encode(&[Observation::new(0.0, 0.0, "A", "red")]);
        assert!(hit_test(&encoded.rows, 3.0, 4.0, 5.0).is_none());
        assert!(hit_test(&encoded.rows, 3.0, 3.9, 5.0).is_some());
        assert!(hit_test::<&str>(&[], 0.0, 0.0, 5.0).is_none());
    }

    #[test]
    fn test_probe_uses_pointer() {
        let encoded = encode(&[Observation::new(40.0, 40.0, "A", "red")]);
        let mut surface = RecordingSurface::new(100.0, 100.0);
        assert!(probe(&surface, &encoded.rows, 5.0).is_none());

        surface.set_pointer(41.0, 39.0);
        assert_eq!(probe(&surface, &encoded.rows, 5.0).map(|o| o.x), Some(40.0));
    }
}
