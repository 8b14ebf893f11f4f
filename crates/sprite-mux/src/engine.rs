//! Engine context.
//!
//! Owns the registry, the Y-order index, the model catalog, the background
//! and the kernel. Game logic mutates sprites between frames; the kernel
//! reads them while a frame is drawn.

use kernel_core::{Bus, Observable, Tickable, Value};
use tracing::{debug, warn};

use crate::background::Background;
use crate::channel::{CHANNELS, ChannelState};
use crate::config::MuxConfig;
use crate::kernel::{Kernel, Scene};
use crate::overlap;
use crate::registry::Registry;
use crate::report::FrameReport;
use crate::sprite::{ModelCatalog, Sprite, SpriteId, Style};
use crate::yorder::YOrder;
use crate::MuxError;

/// The multiplexing engine.
#[derive(Debug, Clone)]
pub struct Engine {
    config: MuxConfig,
    catalog: ModelCatalog,
    background: Background,
    registry: Registry,
    index: YOrder,
    kernel: Kernel,
    frame_count: u32,
}

impl Engine {
    /// Build an engine with a fixed sprite capacity.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` or `InvalidModel` if the configuration or the
    /// catalog is unusable.
    pub fn new(config: MuxConfig, catalog: ModelCatalog) -> Result<Self, MuxError> {
        config.validate()?;
        catalog.validate(config.sprite_height)?;
        Ok(Self {
            registry: Registry::with_capacity(config.capacity),
            index: YOrder::with_capacity(config.capacity),
            catalog,
            background: Background::empty(),
            kernel: Kernel::default(),
            frame_count: 0,
            config,
        })
    }

    /// Bind the playfield drawn behind the sprites.
    pub fn init(&mut self, background: Background) {
        self.background = background;
    }

    #[must_use]
    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Create a sprite. `x` wraps at the 160-pixel line width.
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` when the registry is full and
    /// `UnknownModel` for a model outside the catalog. Either way nothing
    /// changes.
    pub fn new_sprite(&mut self, model: u8, x: u8, y: u8, style: Style) -> Result<SpriteId, MuxError> {
        self.check_model(model)?;
        let sprite = Sprite {
            x: wrap_x(x),
            y,
            model,
            style,
        };
        let id = self.registry.allocate(sprite).inspect_err(|_| {
            warn!(capacity = self.registry.capacity(), "sprite registry full");
        })?;
        let pos = self.index.insert(id, y);
        self.kernel.invalidate();
        debug!(sprite = %id, x, y, pos, "new sprite");
        Ok(id)
    }

    /// Move a sprite. Only its own place in the Y-order changes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHandle` for a freed or out-of-range handle.
    pub fn move_sprite(&mut self, id: SpriteId, x: u8, y: u8) -> Result<(), MuxError> {
        let live = self.registry.live_mut(id)?;
        let x = wrap_x(x);
        if live.sprite.x != x {
            live.sprite.x = x;
            self.kernel.invalidate();
        }
        if live.sprite.y == y {
            return Ok(());
        }
        live.sprite.y = y;
        self.index.reposition(id, y);
        self.kernel.invalidate();
        Ok(())
    }

    /// Delete a sprite and free its handle for reuse.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHandle` for a freed or out-of-range handle.
    pub fn delete_sprite(&mut self, id: SpriteId) -> Result<Sprite, MuxError> {
        let sprite = self.registry.release(id)?;
        self.index.remove(id);
        self.kernel.invalidate();
        debug!(sprite = %id, "deleted");
        Ok(sprite)
    }

    /// # Errors
    ///
    /// Returns `InvalidHandle` or `UnknownModel`.
    pub fn set_model(&mut self, id: SpriteId, model: u8) -> Result<(), MuxError> {
        self.check_model(model)?;
        self.registry.live_mut(id)?.sprite.model = model;
        self.kernel.invalidate();
        Ok(())
    }

    /// Replace the style flags, sticky collision flags included.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHandle` for a freed or out-of-range handle.
    pub fn set_style(&mut self, id: SpriteId, style: Style) -> Result<(), MuxError> {
        self.registry.live_mut(id)?.sprite.style = style;
        self.kernel.invalidate();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InvalidHandle` for a freed or out-of-range handle.
    pub fn sprite(&self, id: SpriteId) -> Result<&Sprite, MuxError> {
        self.registry.get(id)
    }

    /// Return and clear the collision flags the kernel recorded.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHandle` for a freed or out-of-range handle.
    pub fn take_collisions(&mut self, id: SpriteId) -> Result<Style, MuxError> {
        let style = &mut self.registry.live_mut(id)?.sprite.style;
        let hits = *style & Style::COLLISIONS;
        style.remove(Style::COLLISIONS);
        Ok(hits)
    }

    /// Overlap count as of the last recompute.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHandle` for a freed or out-of-range handle.
    pub fn overlap(&self, id: SpriteId) -> Result<u8, MuxError> {
        Ok(self.registry.live(id)?.overlap)
    }

    /// Consecutive frames the sprite has been deferred.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHandle` for a freed or out-of-range handle.
    pub fn deferred_streak(&self, id: SpriteId) -> Result<u32, MuxError> {
        Ok(self.registry.live(id)?.deferred_streak)
    }

    /// Whether the sprite is marked for priority retry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHandle` for a freed or out-of-range handle.
    pub fn is_deferred(&self, id: SpriteId) -> Result<bool, MuxError> {
        self.index
            .position(id)
            .and_then(|pos| self.index.get(pos))
            .map(|entry| entry.deferred)
            .ok_or(MuxError::InvalidHandle(id))
    }

    /// Recount vertical neighbours for every sprite.
    pub fn recompute_overlap(&mut self) {
        overlap::recompute(&self.index, &mut self.registry, self.config.interval());
        debug!(sprites = self.index.len(), "overlap recomputed");
    }

    #[must_use]
    pub fn yorder(&self) -> &YOrder {
        &self.index
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Live sprites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Frames prepared so far.
    #[must_use]
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// State of channel `channel` (0 or 1).
    #[must_use]
    pub fn channel_state(&self, channel: usize) -> Option<ChannelState> {
        self.kernel.channels().get(channel).map(|ch| ch.state)
    }

    /// Vertical sync and blank, binding the first two sprites.
    pub fn prepare_frame<B: Bus + Tickable>(&mut self, bus: &mut B) {
        self.frame_count = self.frame_count.wrapping_add(1);
        let mut scene = Scene {
            config: &self.config,
            catalog: &self.catalog,
            background: &self.background,
            registry: &mut self.registry,
            index: &mut self.index,
        };
        self.kernel.prepare(&mut scene, bus, self.frame_count);
    }

    /// Draw the visible area and overscan. Prepares the frame first if
    /// `prepare_frame` was not called or sprites changed since.
    pub fn run_active_phase<B: Bus + Tickable>(&mut self, bus: &mut B) -> FrameReport {
        if !self.kernel.is_primed() {
            warn!("active phase without a fresh prepare_frame; preparing now");
            self.prepare_frame(bus);
        }
        let mut scene = Scene {
            config: &self.config,
            catalog: &self.catalog,
            background: &self.background,
            registry: &mut self.registry,
            index: &mut self.index,
        };
        let report = self.kernel.run(&mut scene, bus);
        debug!(
            frame = report.frame,
            drawn = report.drawn.len(),
            deferred = report.deferred.len(),
            "frame done"
        );
        report
    }

    /// One whole frame, recomputing overlap every `overlap_cadence` frames.
    pub fn run_frame<B: Bus + Tickable>(&mut self, bus: &mut B) -> FrameReport {
        let cadence = self.config.overlap_cadence;
        if cadence > 0 && self.frame_count % cadence == 0 {
            self.recompute_overlap();
        }
        self.prepare_frame(bus);
        self.run_active_phase(bus)
    }

    fn check_model(&self, model: u8) -> Result<(), MuxError> {
        if self.catalog.get(model).is_none() {
            return Err(MuxError::UnknownModel(model));
        }
        Ok(())
    }
}

fn wrap_x(x: u8) -> u8 {
    (usize::from(x) % atari_tia::WIDTH) as u8
}

impl From<SpriteId> for Value {
    fn from(id: SpriteId) -> Self {
        Value::U8(id.index() as u8)
    }
}

/// `sprite.<id>.<field>`
fn query_sprite(engine: &Engine, rest: &str) -> Option<Value> {
    let (id, field) = rest.split_once('.')?;
    let id = SpriteId::new(id.parse().ok()?);
    let sprite = engine.registry.get(id).ok()?;
    match field {
        "x" => Some(sprite.x.into()),
        "y" => Some(sprite.y.into()),
        "model" => Some(sprite.model.into()),
        "style" => Some(sprite.style.bits().into()),
        "overlap" => engine.overlap(id).ok().map(Value::from),
        "deferred" => engine.is_deferred(id).ok().map(Value::from),
        "streak" => engine.deferred_streak(id).ok().map(Value::from),
        _ => None,
    }
}

impl Observable for Engine {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("sprite.") {
            return query_sprite(self, rest);
        }
        for c in 0..CHANNELS {
            let Some(field) = path
                .strip_prefix("channel")
                .and_then(|p| p.strip_prefix(char::from(b'0' + c as u8)))
                .and_then(|p| p.strip_prefix('.'))
            else {
                continue;
            };
            let state = self.kernel.channels()[c].state;
            return match field {
                "state" => Some(state.name().into()),
                "sprite" => Some(state.sprite().into()),
                _ => None,
            };
        }
        match path {
            "frame_count" => Some(self.frame_count.into()),
            "sprites.live" => Some((self.registry.len() as u8).into()),
            "sprites.capacity" => Some((self.registry.capacity() as u8).into()),
            "yorder" => Some(Value::Array(self.index.ids().map(Value::from).collect())),
            "deferred" => Some(Value::Array(
                self.index
                    .entries()
                    .iter()
                    .filter(|e| e.deferred)
                    .map(|e| e.id.into())
                    .collect(),
            )),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "frame_count",
            "sprites.live",
            "sprites.capacity",
            "channel0.state",
            "channel0.sprite",
            "channel1.state",
            "channel1.sprite",
            "yorder",
            "deferred",
            "sprite.<id>.x",
            "sprite.<id>.y",
            "sprite.<id>.model",
            "sprite.<id>.style",
            "sprite.<id>.overlap",
            "sprite.<id>.deferred",
            "sprite.<id>.streak",
        ]
    }
}
