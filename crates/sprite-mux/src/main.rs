//! Headless demo: bouncing sprites multiplexed onto the TIA's two players.
//!
//! Set `RUST_LOG=sprite_mux=debug` to watch allocation and deferral
//! decisions.

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use atari_tia::Tia;
use clap::Parser;
use sprite_mux::{
    Background, Engine, Model, ModelCatalog, MuxConfig, MuxError, PlayfieldRow, SpriteId, Style,
    capture,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(version, about = "Bouncing sprites multiplexed onto two TIA players")]
struct Cli {
    /// Sprites to spawn.
    #[arg(long, default_value_t = 8)]
    sprites: usize,

    /// Frames to run.
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// JSON engine configuration; missing fields take their defaults.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Save the last frame as a PNG.
    #[arg(long, value_name = "FILE")]
    screenshot: Option<PathBuf>,

    /// Save every frame as `DIR/NNNNNN.png`.
    #[arg(long, value_name = "DIR")]
    record: Option<PathBuf>,

    /// Print one JSON frame report per line on stdout.
    #[arg(long)]
    report: bool,
}

/// A sprite and its velocity.
struct Bouncer {
    id: SpriteId,
    dx: i16,
    dy: i16,
    /// Frames this sprite was on screen.
    shown: u32,
}

fn catalog() -> ModelCatalog {
    let ship = Model {
        graphics: vec![0x18, 0x3C, 0x7E, 0xFF, 0xDB, 0x7E, 0x24, 0x42],
        colors: vec![0x0E, 0x0C, 0x0A, 0x98, 0x98, 0x0A, 0x44, 0x44],
    };
    let ball = Model::solid(&[0x3C, 0x7E, 0xFF, 0xFF, 0xFF, 0xFF, 0x7E, 0x3C], 0x1E);
    let invader = Model {
        graphics: vec![0x24, 0x18, 0x3C, 0x5A, 0xFF, 0xBD, 0xA5, 0x18],
        colors: vec![0xC6, 0xC6, 0xC8, 0xC8, 0xCA, 0xCA, 0xCC, 0xCC],
    };
    ModelCatalog::new(vec![ship, ball, invader])
}

/// Side walls with a few ledges.
fn scenery() -> Background {
    let mut rows = vec![PlayfieldRow::new(0x10, 0x00, 0x00); 96];
    for band in [24, 25, 60, 61] {
        rows[band] = PlayfieldRow::new(0x10, 0x0F, 0x00);
    }
    Background::new(rows)
}

fn spawn(engine: &mut Engine, count: usize) -> Vec<Bouncer> {
    let config = engine.config().clone();
    let span = config.visible_lines.saturating_sub(u16::from(config.sprite_height)).max(1);
    let models = engine.catalog().len().max(1);
    let mut bouncers = Vec::with_capacity(count);
    for i in 0..count {
        let x = (17 + i * 37) % 150;
        let y = usize::from(config.y_offset) + (i * 23) % usize::from(span);
        let style = if i % 4 == 3 { Style::REFLECT } else { Style::empty() };
        match engine.new_sprite((i % models) as u8, x as u8, y as u8, style) {
            Ok(id) => bouncers.push(Bouncer {
                id,
                dx: if i % 2 == 0 { 1 } else { -2 },
                dy: 1 + (i % 3) as i16,
                shown: 0,
            }),
            Err(e) => {
                warn!("stopped spawning after {i} sprites: {e}");
                break;
            }
        }
    }
    bouncers
}

/// Advance `pos` by `vel`, reflecting off `[min, max]`.
fn bounce(pos: i16, vel: i16, min: i16, max: i16) -> (i16, i16) {
    let next = pos + vel;
    if next < min || next > max {
        ((pos - vel).clamp(min, max), -vel)
    } else {
        (next, vel)
    }
}

fn step(engine: &mut Engine, bouncer: &mut Bouncer) -> Result<(), MuxError> {
    let sprite = *engine.sprite(bouncer.id)?;
    let config = engine.config();
    let top = i16::from(config.y_offset);
    let bottom = (config.y_bottom() - u16::from(config.sprite_height)) as i16;
    let (x, dx) = bounce(i16::from(sprite.x), bouncer.dx, 0, 152);
    let (y, dy) = bounce(i16::from(sprite.y), bouncer.dy, top, bottom);
    bouncer.dx = dx;
    bouncer.dy = dy;
    engine.move_sprite(bouncer.id, x as u8, y as u8)?;

    let hits = engine.take_collisions(bouncer.id)?;
    if !hits.is_empty() {
        debug!(sprite = %bouncer.id, ?hits, "collision");
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => MuxConfig::from_json(&fs::read_to_string(path)?)?,
        None => MuxConfig::default(),
    };
    let mut tia = Tia::new(usize::from(config.visible_lines));
    let mut engine = Engine::new(config, catalog())?;
    engine.init(scenery());
    let mut bouncers = spawn(&mut engine, cli.sprites);

    if let Some(dir) = &cli.record {
        fs::create_dir_all(dir)?;
    }

    let mut drawn = 0usize;
    let mut deferred = 0usize;
    let mut worst = 0u16;
    for frame in 1..=cli.frames {
        for bouncer in &mut bouncers {
            step(&mut engine, bouncer)?;
        }
        let report = engine.run_frame(&mut tia);
        drawn += report.drawn.len();
        deferred += report.deferred.len();
        worst = worst.max(report.worst_line_cycles);
        for bouncer in &mut bouncers {
            bouncer.shown += u32::from(report.was_drawn(bouncer.id));
        }
        if cli.report {
            println!("{}", serde_json::to_string(&report)?);
        }
        if let Some(dir) = &cli.record {
            capture::save_screenshot(&tia, &dir.join(format!("{frame:06}.png")))?;
        }
    }

    info!(
        frames = cli.frames,
        sprites = bouncers.len(),
        drawn,
        deferred,
        worst_line_cycles = worst,
        least_shown = bouncers.iter().map(|b| b.shown).min().unwrap_or(0),
        "run complete"
    );

    if let Some(path) = &cli.screenshot {
        capture::save_screenshot(&tia, path)?;
        info!("screenshot saved to {}", path.display());
    }
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!("{e}");
        std::process::exit(1);
    }
}
