//! Legend report generation
//!
//! Plain-text summary of one render: which shape stands for which type,
//! which color for which property, and how many rows and trails were drawn.

use chrono::Utc;
use std::fmt::Write;
use trail_encoder::Encoded;

const RULE: &str = "───────────────────────────────────────────────";

/// Build the text report for an encoded batch
pub fn legend_report(encoded: &Encoded, source: &str) -> String {
    let legend = &encoded.legend;
    let mut out = String::new();

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "  Trail Legend");
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "Source:    {}", source);
    let _ = writeln!(out, "Generated: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "Rows:      {}", encoded.rows.len());
    let _ = writeln!(out, "Trails:    {}", encoded.num_trails());

    let width = legend
        .shapes()
        .map(|(k, _)| k.chars().count())
        .chain(legend.colors().map(|(k, _)| k.chars().count()))
        .max()
        .unwrap_or(0)
        .max(4);

    let _ = writeln!(out, "\nTypes ({}):", legend.num_types());
    for (kind, shape) in legend.shapes() {
        let _ = writeln!(out, "  {:<width$}  {:>2} sides", kind, shape.sides(), width = width);
    }

    let _ = writeln!(out, "\nProperties ({}):", legend.num_props());
    for (prop, color) in legend.colors() {
        let _ = writeln!(out, "  {:<width$}  {}", prop, color, width = width);
    }

    out
}
