//! Widget texture resolution
//!
//! Built-in textures come from a `SpriteAtlas` owned by the host. External
//! textures are PNG files inside the owning layout's `textures/` folder.
//! Resolution never fails: anything missing or undecodable is logged and
//! the widget is drawn without that sprite.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use crate::config::button::{ButtonConfig, TextureSource};
use crate::constants::paths::TEXTURES_DIR;

/// Decoded 8-bit RGBA image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Built-in sprite lookup provided by the host
pub trait SpriteAtlas {
    fn load_sprite(&self, texture: &str, sprite: Option<&str>) -> Option<Sprite>;
}

/// Atlas backed by a map, for hosts that preload their sprites and for tests
#[derive(Debug, Clone, Default)]
pub struct MemoryAtlas {
    sprites: HashMap<(String, Option<String>), Sprite>,
}

impl MemoryAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, texture: &str, sprite: Option<&str>, image: Sprite) {
        self.sprites.insert((texture.to_string(), sprite.map(str::to_string)), image);
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

impl SpriteAtlas for MemoryAtlas {
    fn load_sprite(&self, texture: &str, sprite: Option<&str>) -> Option<Sprite> {
        self.sprites
            .get(&(texture.to_string(), sprite.map(str::to_string)))
            .cloned()
    }
}

/// Main and knob sprites of one widget
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTextures {
    pub main: Option<Sprite>,
    pub knob: Option<Sprite>,
}

pub struct TextureResolver {
    layouts_root: PathBuf,
    atlas: Box<dyn SpriteAtlas>,
}

impl std::fmt::Debug for TextureResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureResolver")
            .field("layouts_root", &self.layouts_root)
            .finish_non_exhaustive()
    }
}

impl TextureResolver {
    pub fn new(layouts_root: impl Into<PathBuf>, atlas: impl SpriteAtlas + 'static) -> Self {
        Self {
            layouts_root: layouts_root.into(),
            atlas: Box::new(atlas),
        }
    }

    pub fn layouts_root(&self) -> &Path {
        &self.layouts_root
    }

    pub fn resolve(&self, button: &ButtonConfig) -> ResolvedTextures {
        match &button.textures {
            TextureSource::BuiltIn {
                texture,
                sprite,
                knob_texture,
                knob_sprite,
            } => ResolvedTextures {
                main: self.built_in(button, texture, sprite.as_deref()),
                knob: knob_texture
                    .as_deref()
                    .and_then(|knob| self.built_in(button, knob, knob_sprite.as_deref())),
            },
            TextureSource::External { texture, knob_texture } => ResolvedTextures {
                main: self.external(button, texture),
                knob: knob_texture.as_deref().and_then(|knob| self.external(button, knob)),
            },
        }
    }

    fn built_in(&self, button: &ButtonConfig, texture: &str, sprite: Option<&str>) -> Option<Sprite> {
        if texture.is_empty() {
            return None;
        }
        let found = self.atlas.load_sprite(texture, sprite);
        if found.is_none() {
            warn!(widget = %button.name, texture = %texture, sprite = ?sprite, "Built-in sprite not found");
        }
        found
    }

    fn external(&self, button: &ButtonConfig, relative: &str) -> Option<Sprite> {
        if relative.is_empty() {
            return None;
        }
        let Some(path) = external_texture_path(&self.layouts_root, &button.parent_layout, relative) else {
            warn!(widget = %button.name, layout = %button.parent_layout, path = %relative, "Rejected texture path outside the layout folder");
            return None;
        };

        match decode_png(&path) {
            Ok(sprite) => {
                debug!(widget = %button.name, path = %path.display(), width = sprite.width, height = sprite.height, "Loaded custom texture");
                Some(sprite)
            }
            Err(e) => {
                warn!(widget = %button.name, path = %path.display(), error = %format!("{e:#}"), "Failed to load custom texture");
                None
            }
        }
    }
}

/// `<root>/<layout>/textures/<relative>`, or `None` if `relative` would escape that folder
pub fn external_texture_path(layouts_root: &Path, layout: &str, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let plain = relative.components().all(|c| matches!(c, Component::Normal(_)));
    if layout.is_empty() || !plain {
        return None;
    }
    Some(layouts_root.join(layout).join(TEXTURES_DIR).join(relative))
}

/// Decode a PNG file into 8-bit RGBA
pub fn decode_png(path: &Path) -> Result<Sprite> {
    let file = File::open(path).with_context(|| format!("Failed to open texture {:?}", path))?;
    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .with_context(|| format!("Failed to read PNG header from {:?}", path))?;

    let (color_type, _) = reader.output_color_type();
    let (width, height) = {
        let info = reader.info();
        (info.width, info.height)
    };
    let mut buf = vec![0; width as usize * height as usize * color_type.samples()];
    let frame = reader
        .next_frame(&mut buf)
        .with_context(|| format!("Failed to decode PNG data from {:?}", path))?;
    let pixels = &buf[..frame.buffer_size()];

    let rgba = match color_type {
        png::ColorType::Rgba => pixels.to_vec(),
        png::ColorType::Rgb => pixels
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 0xFF])
            .collect(),
        png::ColorType::GrayscaleAlpha => pixels
            .chunks_exact(2)
            .flat_map(|px| [px[0], px[0], px[0], px[1]])
            .collect(),
        png::ColorType::Grayscale => pixels.iter().flat_map(|&g| [g, g, g, 0xFF]).collect(),
        other => return Err(anyhow!("Unsupported PNG color type {:?} in {:?}", other, path)),
    };

    Ok(Sprite { width, height, rgba })
}
