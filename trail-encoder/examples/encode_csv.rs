//! Standalone observation encoder tool
//!
//! Reads an `x,y,type,prop` CSV file, encodes it and prints the legend, the
//! trail links and the draw-call summary of a headless render.
//!
//! Usage:
//!   encode_csv <observations.csv> [--seed <n>] [--limit <count>]
//!
//! Example:
//!   encode_csv canvas01.csv --seed 7 --limit 20

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use trail_encoder::{
    Batch, CsvReader, DrawOp, EncoderConfig, EncoderState, RecordingSurface,
};

struct RenderStats {
    paths: usize,
    strokes: usize,
    fills: usize,
    fills_per_color: HashMap<String, usize>,
}

impl RenderStats {
    fn from_ops(ops: &[DrawOp]) -> Self {
        let mut stats = Self {
            paths: 0,
            strokes: 0,
            fills: 0,
            fills_per_color: HashMap::new(),
        };
        for op in ops {
            match op {
                DrawOp::BeginPath => stats.paths += 1,
                DrawOp::Stroke => stats.strokes += 1,
                DrawOp::Fill(color) => {
                    stats.fills += 1;
                    *stats.fills_per_color.entry(color.to_string()).or_default() += 1;
                }
                _ => {}
            }
        }
        stats
    }

    fn print_summary(&self) {
        println!("\n=== RENDER SUMMARY ===");
        println!("Paths begun: {}", self.paths);
        println!("Strokes: {}", self.strokes);
        println!("Filled polygons: {}", self.fills);
        let mut sorted: Vec<_> = self.fills_per_color.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(a.1));
        for (color, count) in sorted {
            println!("  {}: {} polygons", color, count);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <observations.csv> [--seed <n>] [--limit <count>]", args[0]);
        std::process::exit(1);
    }

    let path = PathBuf::from(&args[1]);
    let mut config = EncoderConfig::new();
    let mut limit = usize::MAX;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" if i + 1 < args.len() => {
                config = config.with_color_seed(args[i + 1].parse()?);
                i += 2;
            }
            "--limit" if i + 1 < args.len() => {
                limit = args[i + 1].parse()?;
                i += 2;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
    }

    let batch = Batch::collect(CsvReader::from_path(&path)?)?;
    for error in &batch.rejected {
        println!("✗ {}", error);
    }

    let mut state = EncoderState::new(config.clone())?;
    let encoded = state.encode(&batch.observations);

    println!("=== LEGEND ===");
    for (kind, shape) in encoded.legend.shapes() {
        println!("  type {:<12} {}", kind, shape);
    }
    for (prop, color) in encoded.legend.colors() {
        println!("  prop {:<12} {}", prop, color);
    }

    println!("\n=== ROWS ===");
    for (index, row) in encoded.rows.iter().enumerate().take(limit) {
        match encoded.successor(index) {
            Some(next) => println!(
                "[{:>4}] {} -> ({}, {})",
                index,
                row.observation,
                next.x(),
                next.y()
            ),
            None => println!("[{:>4}] {} (end of trail)", index, row.observation),
        }
    }

    let mut surface = RecordingSurface::new(1000.0, 1000.0);
    trail_encoder::render(&mut surface, &encoded, &config);
    RenderStats::from_ops(surface.ops()).print_summary();

    Ok(())
}
