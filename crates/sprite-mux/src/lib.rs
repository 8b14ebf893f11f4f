//! Dynamic sprite multiplexing for the Atari 2600.
//!
//! The TIA has two player objects, each fed one byte of graphics per
//! scanline. This crate shares those two channels among up to
//! [`MAX_SPRITES`] logical sprites:
//!
//! - [`Registry`] and [`YOrder`] hold the sprites, sorted by `y` and kept
//!   sorted incrementally as they move.
//! - [`overlap`] counts vertical neighbours, which bounds how far the kernel
//!   looks ahead for a deferred sprite.
//! - [`hpos`] holds the compile-time positioning tables.
//! - The dispatch kernel runs one frame against any `Bus + Tickable`,
//!   charging every operation to a per-line cycle budget ([`timing`]).
//!
//! A frame is 3 lines of VSYNC, 37 of vertical blank, the visible area in
//! two-line bands, and 30 of overscan. Sprites are mutated only between
//! frames; [`Engine`] owns everything and is the API game logic uses.
//!
//! ```no_run
//! use atari_tia::Tia;
//! use sprite_mux::{Engine, Model, ModelCatalog, MuxConfig, Style};
//!
//! let catalog = ModelCatalog::new(vec![Model::solid(&[0x3C; 8], 0x1E)]);
//! let mut engine = Engine::new(MuxConfig::default(), catalog)?;
//! let ship = engine.new_sprite(0, 80, 120, Style::empty())?;
//! let mut tia = Tia::new(192);
//! let report = engine.run_frame(&mut tia);
//! assert!(report.drawn.contains(&ship));
//! # Ok::<(), sprite_mux::MuxError>(())
//! ```

mod background;
#[cfg(feature = "native")]
pub mod capture;
pub mod channel;
mod config;
mod engine;
mod error;
pub mod hpos;
mod kernel;
pub mod overlap;
mod registry;
mod report;
mod sprite;
pub mod timing;
mod yorder;

pub use background::{Background, PlayfieldRow};
pub use config::{BAND_LINES, MAX_SPRITES, MuxConfig};
pub use engine::Engine;
pub use error::MuxError;
pub use kernel::{OVERSCAN_LINES, VBLANK_LINES, VSYNC_LINES};
pub use registry::Registry;
pub use report::FrameReport;
pub use sprite::{Model, ModelCatalog, Sprite, SpriteId, Style};
pub use yorder::{Entry, YOrder};
