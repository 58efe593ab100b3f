use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{SkitcastError, SkitcastResult};
use crate::timeline::plan::{RenderPlan, VisualContent};

/// Prepared raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub(crate) struct PreparedImage {
    /// Width in pixels.
    pub(crate) width: u32,
    /// Height in pixels.
    pub(crate) height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub(crate) rgba8_premul: Arc<Vec<u8>>,
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub(crate) fn decode_image(bytes: &[u8]) -> SkitcastResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Validate an emotion name before it becomes part of a sprite path.
///
/// Names are bare file stems; anything that could traverse directories is
/// rejected here rather than surfacing as a confusing read error.
pub(crate) fn validated_sprite_stem(name: &str) -> SkitcastResult<&str> {
    if name.is_empty() {
        return Err(SkitcastError::media("emotion name must be non-empty"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(SkitcastError::media(format!(
            "emotion name '{name}' is not a valid sprite name"
        )));
    }
    Ok(name)
}

/// RGBA8 brush color carried through Parley text layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// The resolved caption font, kept both as raw bytes for shaping and as a
/// `FontData` handle for glyph rasterization.
#[derive(Clone, Debug)]
pub(crate) struct CaptionFont {
    pub(crate) bytes: Arc<Vec<u8>>,
    pub(crate) data: vello_cpu::peniko::FontData,
}

/// Font files probed when no explicit font is given and the assets directory
/// carries none.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:/Windows/Fonts/arial.ttf",
];

fn resolve_font(explicit: Option<&Path>, assets_dir: &Path) -> SkitcastResult<(PathBuf, Vec<u8>)> {
    if let Some(path) = explicit {
        let bytes = std::fs::read(path).map_err(|e| {
            SkitcastError::media(format!("failed to read font '{}': {e}", path.display()))
        })?;
        return Ok((path.to_path_buf(), bytes));
    }

    let mut candidates: Vec<PathBuf> = vec![assets_dir.join("font.ttf"), assets_dir.join("font.otf")];
    candidates.extend(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));
    for path in candidates {
        if let Ok(bytes) = std::fs::read(&path) {
            return Ok((path, bytes));
        }
    }
    Err(SkitcastError::media(
        "no usable caption font found; pass --font or put font.ttf in the assets directory",
    ))
}

/// Sprite images and the caption font, fully loaded before rendering starts.
///
/// [`AssetStore::preload_for_plan`] pulls in every sprite a plan references so
/// unknown emotion names fail before the first frame is rendered; after that
/// the store is only read, which lets render workers share it.
#[derive(Debug)]
pub struct AssetStore {
    assets_dir: PathBuf,
    sprites: HashMap<String, Arc<PreparedImage>>,
    font: CaptionFont,
}

impl AssetStore {
    /// Open a store rooted at `assets_dir`, resolving the caption font now.
    pub fn open(assets_dir: impl Into<PathBuf>, font_override: Option<&Path>) -> SkitcastResult<Self> {
        let assets_dir = assets_dir.into();
        let (font_path, font_bytes) = resolve_font(font_override, &assets_dir)?;
        tracing::debug!(path = %font_path.display(), "caption font resolved");
        let bytes = Arc::new(font_bytes);
        let data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
            0,
        );
        Ok(Self {
            assets_dir,
            sprites: HashMap::new(),
            font: CaptionFont { bytes, data },
        })
    }

    /// Load every sprite the plan references, failing with the offending
    /// directive's line on a bad emotion name or unreadable file.
    pub fn preload_for_plan(&mut self, plan: &RenderPlan) -> SkitcastResult<()> {
        for segment in &plan.segments {
            if let VisualContent::Sprite { emotion } = &segment.visual {
                self.load_sprite(emotion).map_err(|e| {
                    SkitcastError::media(format!("line {}: {e}", segment.line))
                })?;
            }
        }
        tracing::debug!(sprites = self.sprites.len(), "sprites preloaded");
        Ok(())
    }

    /// A preloaded sprite image.
    pub(crate) fn sprite(&self, name: &str) -> SkitcastResult<&Arc<PreparedImage>> {
        self.sprites.get(name).ok_or_else(|| {
            SkitcastError::media(format!("sprite '{name}' was not preloaded for this plan"))
        })
    }

    pub(crate) fn font(&self) -> &CaptionFont {
        &self.font
    }

    fn load_sprite(&mut self, name: &str) -> SkitcastResult<()> {
        if self.sprites.contains_key(name) {
            return Ok(());
        }
        let stem = validated_sprite_stem(name)?;
        let path = self.assets_dir.join("character").join(format!("{stem}.png"));
        let bytes = std::fs::read(&path).map_err(|e| {
            SkitcastError::media(format!(
                "unknown emotion '{name}': failed to read sprite '{}': {e}",
                path.display()
            ))
        })?;
        let image = decode_image(&bytes)
            .map_err(|e| SkitcastError::media(format!("sprite '{}': {e}", path.display())))?;
        self.sprites.insert(name.to_string(), Arc::new(image));
        Ok(())
    }
}

/// Stateful caption shaper built around Parley contexts.
///
/// Parley contexts are not shareable across threads, so each render worker
/// owns one, all registered with the same caption font.
pub(crate) struct CaptionEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
}

impl CaptionEngine {
    pub(crate) fn new(font: &CaptionFont) -> SkitcastResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(font.bytes.as_ref().clone()),
            None,
        );
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| SkitcastError::media("no font families registered from font bytes"))?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| SkitcastError::media("registered font family has no name"))?
            .to_string();
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        })
    }

    /// Shape and word-wrap caption text to the given width.
    pub(crate) fn layout(
        &mut self,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
        max_width_px: f32,
    ) -> SkitcastResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(SkitcastError::validation(
                "caption size_px must be finite and > 0",
            ));
        }
        if !max_width_px.is_finite() || max_width_px <= 0.0 {
            return Err(SkitcastError::validation(
                "caption wrap width must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(Some(max_width_px));
        layout.align(
            Some(max_width_px),
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );
        Ok(layout)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
