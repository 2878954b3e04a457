//! Dry-run driver for the tile-streaming engine.
//!
//! Loads a document source and optional configuration, mounts a viewer
//! at the given viewport width, executes a navigation script, and
//! prints the crop requests and page states the engine produced. This
//! makes tile behavior inspectable without wiring up a render host.

use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;
use simplelog::{Config as LogConfig, LevelFilter, WriteLogger};

use foliant::input::{self, Gesture};
use foliant::page::PagePhase;
use foliant::{Viewer, ViewerConfig, manifest};

#[derive(Parser)]
#[command(
    name = "foliant",
    about = "Dry-run a scanned-document viewer session and print the crop requests it generates"
)]
struct Cli {
    /// Document source file: an XML page manifest.
    manifest: PathBuf,

    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Viewport width in pixels.
    #[arg(long, default_value_t = 1024.0)]
    width: f64,

    /// Write a debug log to this file.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Navigation script, applied in order: `next`, `previous`,
    /// `page=N`, `zoom=F`, `move=H,V`, `drag=DX,DY`, `pinch=S`,
    /// `wheel=N`, `resize=W`, `settle`.
    script: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log {
        WriteLogger::init(
            LevelFilter::Debug,
            LogConfig::default(),
            File::create(path).with_context(|| format!("creating log file {}", path.display()))?,
        )?;
    }

    let sources = manifest::parse_file(&cli.manifest)
        .with_context(|| format!("loading document source {}", cli.manifest.display()))?;
    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading configuration {}", path.display()))?;
            ViewerConfig::from_yaml(&text)?
        }
        None => ViewerConfig::default(),
    };

    let mut now = Instant::now();
    let settle_step = Duration::from_millis(config.delay.max(config.duration) + 1);
    let mut viewer = Viewer::mount(&sources, config, cli.width, now)?;
    info!("driver mounted {} pages", sources.len());

    for step in &cli.script {
        apply_step(&mut viewer, step, &mut now, settle_step)
            .with_context(|| format!("script step `{step}`"))?;
    }

    // Let any pending recomputation land before reporting.
    now += settle_step;
    viewer.tick(now);

    report(&mut viewer);
    Ok(())
}

fn apply_step(
    viewer: &mut Viewer,
    step: &str,
    now: &mut Instant,
    settle_step: Duration,
) -> Result<()> {
    match step.split_once('=') {
        None => match step {
            "next" => viewer.page_by(1, *now),
            "previous" | "prev" => viewer.page_by(-1, *now),
            "settle" => {
                *now += settle_step;
                viewer.tick(*now);
            }
            other => bail!("unknown command `{other}`"),
        },
        Some(("page", value)) => {
            let number: i64 = value.parse().context("page number")?;
            viewer.page_to(number, *now);
        }
        Some(("zoom", value)) => {
            let factor: f64 = value.parse().context("zoom factor")?;
            viewer.zoom_to(factor, *now);
        }
        Some(("move", value)) => {
            let (h, v) = parse_pair(value).context("move anchor")?;
            viewer.move_to(h, v, *now);
        }
        Some(("drag", value)) => {
            let (dx, dy) = parse_pair(value).context("drag deltas")?;
            input::apply(
                viewer,
                Gesture::Drag {
                    horizontal: dx,
                    vertical: dy,
                },
                *now,
            );
        }
        Some(("pinch", value)) => {
            let scale: f64 = value.parse().context("pinch scale")?;
            input::apply(viewer, Gesture::Pinch { scale }, *now);
        }
        Some(("wheel", value)) => {
            let steps: i32 = value.parse().context("wheel steps")?;
            input::apply(viewer, Gesture::Wheel { steps }, *now);
        }
        Some(("resize", value)) => {
            let width: f64 = value.parse().context("viewport width")?;
            viewer.resized(width, *now);
        }
        Some((other, _)) => bail!("unknown command `{other}`"),
    }
    Ok(())
}

fn parse_pair(value: &str) -> Result<(f64, f64)> {
    let (a, b) = value
        .split_once(',')
        .context("expected two comma-separated numbers")?;
    Ok((a.trim().parse()?, b.trim().parse()?))
}

fn report(viewer: &mut Viewer) {
    let status = viewer.status();
    println!(
        "status: page {}/{}, zoom x{:.2} (max x{:.2})",
        status.page_display, status.page_count, status.magnification, status.max_magnification
    );

    let phases: Vec<String> = viewer
        .spread()
        .pages()
        .iter()
        .map(|page| {
            let phase = match page.phase() {
                PagePhase::Hidden => "hidden",
                PagePhase::Closed => "closed",
                PagePhase::Open => "open",
                PagePhase::Staying => "staying",
            };
            format!("{}:{phase}", page.index)
        })
        .collect();
    println!("pages: {}", phases.join(" "));
    println!("tiles created: {}", viewer.spread().tiles_created());

    let requests = viewer.drain_requests();
    println!("requests ({}):", requests.len());
    for request in requests {
        println!("  {}", request.url);
    }
}
