//! Trail Plot CLI Application
//!
//! Command-line front end for the trail-encoder library. It adds:
//! - Configuration files (config.toml) with command-line overrides
//! - Bulk ingest from CSV files
//! - Live ingest from a WebSocket feed with reconnection
//! - SVG output, legend JSON and a text legend report

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use trail_encoder::{Batch, CsvReader, Session};

mod config;
mod feed;
mod report;
mod svg;

use config::{AppConfig, Source};
use feed::{FeedConnection, FeedEvent};
use svg::SvgSurface;

/// How long the feed loop waits before checking for an unrendered backlog
const FEED_IDLE: Duration = Duration::from_millis(500);

/// Trail Plot - Render tagged point observations as shapes and trails
#[derive(Parser, Debug)]
#[command(name = "trail-cli")]
#[command(about = "Render tagged point observations as shapes connected by trails", long_about = None)]
#[command(version)]
struct Args {
    /// CSV file with x,y,type,prop rows
    #[arg(long, value_name = "FILE", conflicts_with = "feed")]
    csv: Option<PathBuf>,

    /// WebSocket feed URL delivering [x, y, type, prop] frames
    #[arg(long, value_name = "URL")]
    feed: Option<String>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SVG output file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write the legend as JSON to this file
    #[arg(long, value_name = "FILE")]
    legend: Option<PathBuf>,

    /// Canvas width
    #[arg(long)]
    width: Option<f64>,

    /// Canvas height
    #[arg(long)]
    height: Option<f64>,

    /// Seed for property colors (same seed, same colors)
    #[arg(long)]
    seed: Option<u64>,

    /// Side count of the first type's polygon
    #[arg(long, value_name = "SIDES")]
    shape_base: Option<u32>,

    /// Do not draw trail lines between successive observations
    #[arg(long)]
    no_trails: bool,

    /// Report the observation under this point, e.g. --probe 120,340
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    probe: Option<(f64, f64)>,

    /// Stop the feed after this many frames
    #[arg(long, value_name = "COUNT")]
    max_frames: Option<usize>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn parse_point(text: &str) -> std::result::Result<(f64, f64), String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {:?}", text))?;
    let coordinate = |s: &str| {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("not a number: {:?}", s))
    };
    Ok((coordinate(x)?, coordinate(y)?))
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Trail Plot CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using encoder library v{}", trail_encoder::VERSION);

    if args.csv.is_none() && args.feed.is_none() && args.config.is_none() {
        println!("Trail Plot - No input specified");
        println!("\nQuick Start:");
        println!("  trail-cli --csv canvas01.csv -o trails.svg");
        println!("  trail-cli --feed ws://127.0.0.1:8080/ -o live.svg");
        println!("\nFor all settings:");
        println!("  trail-cli --config config.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    let config = build_config(&args)?;
    let mut run = Run::new(&config, args.probe)?;

    match config.source()? {
        Source::Csv(path) => run.bulk(&path),
        Source::Feed(url) => run.live(&url),
    }
}

/// Merge the config file (if any) with command-line overrides
fn build_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    if let Some(csv) = &args.csv {
        config.input.csv = Some(csv.clone());
        config.input.feed_url = None;
    }
    if let Some(url) = &args.feed {
        config.input.feed_url = Some(url.clone());
        config.input.csv = None;
    }
    if let Some(output) = &args.output {
        config.output.svg = output.clone();
    }
    if let Some(legend) = &args.legend {
        config.output.legend = Some(legend.clone());
    }
    if let Some(width) = args.width {
        config.canvas.width = width;
    }
    if let Some(height) = args.height {
        config.canvas.height = height;
    }
    if let Some(seed) = args.seed {
        config.encoding.color_seed = Some(seed);
    }
    if let Some(base) = args.shape_base {
        config.encoding.shape_base = base;
    }
    if args.no_trails {
        config.encoding.draw_trails = false;
    }
    if args.max_frames.is_some() {
        config.feed.max_frames = args.max_frames;
    }
    if args.quiet {
        config.output.report = false;
    }

    config.validate()?;
    log::debug!("Configuration: {:?}", config);
    Ok(config)
}

/// One ingest-and-render run: session, surface and outputs
struct Run<'a> {
    config: &'a AppConfig,
    session: Session,
    surface: SvgSurface,
    probe: Option<(f64, f64)>,
}

impl<'a> Run<'a> {
    fn new(config: &'a AppConfig, probe: Option<(f64, f64)>) -> Result<Self> {
        let session = Session::new(config.encoding.clone())
            .context("Failed to set up encoder")?;
        let mut surface = SvgSurface::new(config.canvas.clone());
        if let Some((x, y)) = probe {
            surface.set_pointer(x, y);
        }
        Ok(Self {
            config,
            session,
            surface,
            probe,
        })
    }

    /// Load a whole CSV file and render it once
    fn bulk(&mut self, path: &Path) -> Result<()> {
        let reader = CsvReader::from_path(path)
            .with_context(|| format!("Failed to open observations: {:?}", path))?;
        let batch = Batch::collect(reader)
            .with_context(|| format!("Failed to read observations: {:?}", path))?;
        if !batch.rejected.is_empty() {
            log::warn!("{} malformed rows were dropped", batch.rejected.len());
        }

        self.session.replace(batch.observations);
        self.render()?;
        self.finish(&path.display().to_string())
    }

    /// Follow a live feed, re-rendering the full history as frames arrive
    fn live(&mut self, url: &str) -> Result<()> {
        let config: &'a AppConfig = self.config;
        let feed_config = &config.feed;
        let feed = FeedConnection::open(url, feed_config);
        let mut frames = 0usize;
        let mut pending = 0usize;

        while let Some(event) = feed.next_event(FEED_IDLE) {
            match event {
                Ok(FeedEvent::Connected { at }) => {
                    log::info!("Feed {} connected at {}", feed.url(), at);
                }
                Ok(FeedEvent::Frame(text)) => {
                    frames += 1;
                    match self.session.deliver_frame(&text) {
                        Ok(()) => pending += 1,
                        Err(e) => log::warn!("Dropping frame {}: {}", frames, e),
                    }
                    if pending >= feed_config.render_every {
                        self.render()?;
                        pending = 0;
                    }
                    if feed_config.max_frames.is_some_and(|max| frames >= max) {
                        log::info!("Reached {} frames, stopping", frames);
                        break;
                    }
                }
                Ok(FeedEvent::Disconnected { reason }) => {
                    log::warn!("Feed lost ({}), waiting for reconnect", reason);
                    self.render_pending(&mut pending)?;
                }
                Ok(FeedEvent::GaveUp { attempts }) => {
                    log::error!("Feed unavailable after {} reconnect attempts", attempts);
                    break;
                }
                // Quiet period: flush anything not yet drawn
                Err(_) => self.render_pending(&mut pending)?,
            }
        }

        feed.close();
        self.render()?;
        self.finish(url)
    }

    fn render_pending(&mut self, pending: &mut usize) -> Result<()> {
        if *pending > 0 {
            self.render()?;
            *pending = 0;
        }
        Ok(())
    }

    /// Refresh the session and write the SVG (and legend, if requested)
    fn render(&mut self) -> Result<()> {
        let encoded = self.session.refresh(&mut self.surface);
        log::info!(
            "Rendered {} observations ({} trails)",
            encoded.rows.len(),
            encoded.num_trails()
        );

        self.surface.write_to(&self.config.output.svg)?;

        if let Some(path) = &self.config.output.legend {
            let json = serde_json::to_string_pretty(&encoded.legend)
                .context("Failed to serialise legend")?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write legend: {:?}", path))?;
        }
        Ok(())
    }

    /// Print the report and probe result for the final frame
    fn finish(&self, source: &str) -> Result<()> {
        let encoded = self.session.latest();

        if self.config.output.report {
            print!("{}", report::legend_report(encoded, source));
            println!("\n✓ Wrote {:?}", self.config.output.svg);
        }

        if let Some((x, y)) = self.probe {
            let hit = trail_encoder::probe(
                &self.surface,
                &encoded.rows,
                self.session.config().hit_radius,
            );
            match hit {
                Some(obs) => println!("Probe ({}, {}): {}", x, y, obs),
                None => println!("Probe ({}, {}): nothing", x, y),
            }
        }
        Ok(())
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("10,20.5"), Ok((10.0, 20.5)));
        assert_eq!(parse_point(" 1 , 2 "), Ok((1.0, 2.0)));
        assert!(parse_point("10").is_err());
        assert!(parse_point("a,2").is_err());
        assert!(parse_point("inf,2").is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "trail-cli",
            "--feed",
            "ws://localhost:8080/",
            "--seed",
            "3",
            "--shape-base",
            "5",
            "--no-trails",
            "--max-frames",
            "100",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.source().unwrap(), Source::Feed("ws://localhost:8080/".into()));
        assert_eq!(config.encoding.color_seed, Some(3));
        assert_eq!(config.encoding.shape_base, 5);
        assert!(!config.encoding.draw_trails);
        assert_eq!(config.feed.max_frames, Some(100));
    }

    #[test]
    fn test_csv_and_feed_conflict() {
        let result = Args::try_parse_from([
            "trail-cli",
            "--csv",
            "a.csv",
            "--feed",
            "ws://localhost/",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bulk_run_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("canvas01.csv");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "0,0,A,red").unwrap();
        writeln!(file, "10,10,B,red").unwrap();
        writeln!(file, "broken").unwrap();
        writeln!(file, "20,20,A,red").unwrap();

        let mut config = AppConfig::default();
        config.input.csv = Some(csv_path.clone());
        config.output.svg = dir.path().join("trails.svg");
        config.output.legend = Some(dir.path().join("legend.json"));
        config.output.report = false;
        config.encoding.color_seed = Some(1);

        let mut run = Run::new(&config, Some((10.0, 10.0))).unwrap();
        run.bulk(&csv_path).unwrap();

        assert_eq!(run.session.latest().rows.len(), 3);
        assert_eq!(run.session.latest().rows[0].successor, Some(2));

        let svg = std::fs::read_to_string(dir.path().join("trails.svg")).unwrap();
        assert!(svg.contains("<path d=\"M0 0 L20 20\""));

        let legend: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("legend.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(legend["shapes"]["A"], 3);
        assert_eq!(legend["shapes"]["B"], 4);
        assert!(legend["colors"]["red"].is_string());

        let hit = trail_encoder::probe(&run.surface, &run.session.latest().rows, 5.0);
        assert_eq!(hit.map(|o| o.kind.as_str()), Some("B"));
    }
}
