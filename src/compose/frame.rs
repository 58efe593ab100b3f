use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::assets::media::{VideoSourceInfo, decode_video_frame_rgba8};
use crate::assets::store::{AssetStore, CaptionEngine, CaptionFont, TextBrushRgba8};
use crate::compose::surface::{
    affine_to_cpu, canvas_dims_u16, image_from_prepared, image_from_straight_bytes,
};
use crate::foundation::{
    core::{Canvas, FrameIndex, Rgba8},
    error::{SkitcastError, SkitcastResult},
};
use crate::timeline::plan::{RenderPlan, Segment, VisualContent};

/// Sprite height as a fraction of canvas height.
const SPRITE_HEIGHT_DIVISOR: f64 = 1.4;
/// Sprite bottom margin in pixels at 1080p, scaled by canvas height.
const SPRITE_BOTTOM_MARGIN_1080: f64 = 10.0;
/// Caption font size in pixels at 1080p, scaled by canvas height.
const CAPTION_FONT_SIZE_1080: f64 = 70.0;
/// Caption side margin in pixels at 1080p, scaled by canvas height.
const CAPTION_SIDE_MARGIN_1080: f64 = 160.0;
/// Caption fade in/out length in seconds, clamped to half the segment.
const CAPTION_FADE_SECS: f64 = 0.5;

const CAPTION_BRUSH: TextBrushRgba8 = TextBrushRgba8 {
    r: 0,
    g: 0,
    b: 0,
    a: 255,
};

/// A rendered frame as tightly packed premultiplied RGBA8 bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Composition policy knobs.
#[derive(Clone, Copy, Debug)]
pub struct ComposeOptions {
    /// Crossfade window between adjacent distinct sprite segments, in
    /// seconds. 0 disables crossfading.
    pub crossfade_secs: f64,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            crossfade_secs: 0.0,
        }
    }
}

/// Where a sprite lands on the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SpritePlacement {
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) scale: f64,
}

/// Bottom-right placement with the sprite scaled to a fixed share of the
/// canvas height.
pub(crate) fn sprite_placement(canvas: Canvas, sprite_w: u32, sprite_h: u32) -> SpritePlacement {
    let ch = f64::from(canvas.height);
    let target_h = ch / SPRITE_HEIGHT_DIVISOR;
    let scale = if sprite_h == 0 {
        1.0
    } else {
        target_h / f64::from(sprite_h)
    };
    let target_w = f64::from(sprite_w) * scale;
    let margin = SPRITE_BOTTOM_MARGIN_1080 * ch / 1080.0;
    SpritePlacement {
        x: f64::from(canvas.width) - target_w,
        y: ch - target_h - margin,
        scale,
    }
}

/// Caption opacity at `t_local` seconds into a segment of the given length.
pub(crate) fn caption_alpha(t_local: f64, duration_secs: f64) -> f32 {
    if duration_secs <= 0.0 {
        return 1.0;
    }
    let fade = CAPTION_FADE_SECS.min(duration_secs / 2.0);
    if fade <= 0.0 {
        return 1.0;
    }
    let fade_in = (t_local / fade).clamp(0.0, 1.0);
    let fade_out = ((duration_secs - t_local) / fade).clamp(0.0, 1.0);
    fade_in.min(fade_out) as f32
}

/// Source timestamp for an inserted video, snapped to the nearest source
/// frame so target-fps resampling drops or duplicates whole frames.
pub(crate) fn sub_video_source_time(t_local: f64, source_fps: f64, source_duration: f64) -> f64 {
    if source_fps <= 0.0 {
        return 0.0;
    }
    let frame = (t_local.max(0.0) * source_fps).round();
    let t = frame / source_fps;
    let last = (source_duration - 1.0 / source_fps).max(0.0);
    t.clamp(0.0, last)
}

/// A crossfade to draw instead of a plain sprite hold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CrossfadeDraw<'a> {
    pub(crate) base: &'a str,
    pub(crate) overlay: &'a str,
    /// Overlay opacity, rising 0 to 1 across the window.
    pub(crate) alpha: f32,
}

/// Crossfade state at time `t` within segment `seg_idx`, if any.
///
/// The window straddles the boundary between two adjacent distinct sprite
/// segments; its length is `window_secs` clamped to half of each neighbor, so
/// the front and back windows of one segment never overlap.
pub(crate) fn crossfade_at(
    plan: &RenderPlan,
    seg_idx: usize,
    t: f64,
    window_secs: f64,
) -> Option<CrossfadeDraw<'_>> {
    if window_secs <= 0.0 {
        return None;
    }
    let segment = plan.segments.get(seg_idx)?;
    let VisualContent::Sprite { emotion: current } = &segment.visual else {
        return None;
    };

    if let Some(next) = plan.segments.get(seg_idx + 1)
        && let VisualContent::Sprite { emotion: next_emotion } = &next.visual
        && next_emotion != current
    {
        let w = window_secs
            .min(segment.duration_secs / 2.0)
            .min(next.duration_secs / 2.0);
        let boundary = segment.end_secs();
        if w > 0.0 && t >= boundary - w / 2.0 {
            let alpha = ((t - (boundary - w / 2.0)) / w).clamp(0.0, 1.0);
            return Some(CrossfadeDraw {
                base: current,
                overlay: next_emotion,
                alpha: alpha as f32,
            });
        }
    }

    if seg_idx > 0
        && let Some(prev) = plan.segments.get(seg_idx - 1)
        && let VisualContent::Sprite { emotion: prev_emotion } = &prev.visual
        && prev_emotion != current
    {
        let w = window_secs
            .min(segment.duration_secs / 2.0)
            .min(prev.duration_secs / 2.0);
        let boundary = segment.start_secs;
        if w > 0.0 && t < boundary + w / 2.0 {
            let alpha = ((t - (boundary - w / 2.0)) / w).clamp(0.0, 1.0);
            return Some(CrossfadeDraw {
                base: prev_emotion,
                overlay: current,
                alpha: alpha as f32,
            });
        }
    }

    None
}

/// Seek-window frame cache for one inserted video.
///
/// Keys quantize the source timestamp to milliseconds; the LRU bound keeps
/// per-worker memory flat on long inserts.
struct SubVideoDecoder {
    info: VideoSourceInfo,
    frame_cache: HashMap<u64, vello_cpu::Image>,
    lru: VecDeque<u64>,
    capacity: usize,
}

impl SubVideoDecoder {
    fn new(info: VideoSourceInfo) -> Self {
        let capacity = std::env::var("SKITCAST_VIDEO_CACHE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(64);
        Self {
            info,
            frame_cache: HashMap::new(),
            lru: VecDeque::new(),
            capacity,
        }
    }

    fn decode_at(&mut self, source_time_s: f64) -> SkitcastResult<vello_cpu::Image> {
        let key = ((source_time_s.max(0.0)) * 1000.0).round() as u64;
        if let Some(img) = self.frame_cache.get(&key).cloned() {
            self.touch(key);
            return Ok(img);
        }

        let rgba = decode_video_frame_rgba8(&self.info, source_time_s)?;
        let image = image_from_straight_bytes(&rgba, self.info.width, self.info.height)?;
        self.frame_cache.insert(key, image.clone());
        self.touch(key);
        while self.lru.len() > self.capacity {
            if let Some(old) = self.lru.pop_front() {
                self.frame_cache.remove(&old);
            }
        }
        Ok(image)
    }

    fn touch(&mut self, key: u64) {
        if let Some(pos) = self.lru.iter().position(|x| *x == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key);
    }
}

/// Per-worker frame renderer.
///
/// Owns the Parley contexts, the vello context and target pixmap, and the
/// per-plan caches (sprite image paints, one caption layout per segment, one
/// sub-video decoder per insert segment). Build one per render run; caches
/// key on segment indices of that run's plan.
pub struct FrameComposer {
    options: ComposeOptions,
    engine: CaptionEngine,
    font: CaptionFont,
    ctx: Option<vello_cpu::RenderContext>,
    pixmap: Option<vello_cpu::Pixmap>,
    sprite_images: HashMap<String, vello_cpu::Image>,
    caption_layouts: HashMap<usize, Arc<parley::Layout<TextBrushRgba8>>>,
    video_decoders: HashMap<usize, SubVideoDecoder>,
}

impl FrameComposer {
    pub fn new(assets: &AssetStore, options: ComposeOptions) -> SkitcastResult<Self> {
        let engine = CaptionEngine::new(assets.font())?;
        Ok(Self {
            options,
            engine,
            font: assets.font().clone(),
            ctx: None,
            pixmap: None,
            sprite_images: HashMap::new(),
            caption_layouts: HashMap::new(),
            video_decoders: HashMap::new(),
        })
    }

    /// Render one output frame of the plan.
    pub fn compose(
        &mut self,
        plan: &RenderPlan,
        assets: &AssetStore,
        frame: FrameIndex,
    ) -> SkitcastResult<FrameRgba> {
        let (w16, h16) = canvas_dims_u16(plan.canvas)?;
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w16 && ctx.height() == h16 => ctx,
            _ => vello_cpu::RenderContext::new(w16, h16),
        };
        ctx.reset();
        let mut pixmap = match self.pixmap.take() {
            Some(pm) if pm.width() == w16 && pm.height() == h16 => pm,
            _ => vello_cpu::Pixmap::new(w16, h16),
        };

        let drawn = self.draw_frame(&mut ctx, &mut pixmap, plan, assets, frame);
        self.ctx = Some(ctx);

        match drawn {
            Ok(()) => {
                let data = pixmap.data_as_u8_slice().to_vec();
                self.pixmap = Some(pixmap);
                Ok(FrameRgba {
                    width: plan.canvas.width,
                    height: plan.canvas.height,
                    data,
                })
            }
            Err(e) => {
                self.pixmap = Some(pixmap);
                Err(e)
            }
        }
    }

    fn draw_frame(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        pixmap: &mut vello_cpu::Pixmap,
        plan: &RenderPlan,
        assets: &AssetStore,
        frame: FrameIndex,
    ) -> SkitcastResult<()> {
        let t = plan.fps.frames_to_secs(frame.0);

        let Some((seg_idx, segment)) = plan.segment_for_frame(frame) else {
            // Boundary rounding can leave the final output frame just past
            // the last segment; hold its background.
            let background = plan
                .segments
                .last()
                .map(|s| s.background)
                .unwrap_or(Rgba8::WHITE);
            fill_background(ctx, plan.canvas, background);
            ctx.flush();
            ctx.render_to_pixmap(pixmap);
            return Ok(());
        };

        fill_background(ctx, plan.canvas, segment.background);
        match &segment.visual {
            VisualContent::Background => {}
            VisualContent::Sprite { emotion } => {
                match crossfade_at(plan, seg_idx, t, self.options.crossfade_secs) {
                    Some(cross) => {
                        self.draw_sprite(ctx, plan.canvas, assets, cross.base)?;
                        ctx.push_opacity_layer(cross.alpha);
                        self.draw_sprite(ctx, plan.canvas, assets, cross.overlay)?;
                        ctx.pop_layer();
                    }
                    None => self.draw_sprite(ctx, plan.canvas, assets, emotion)?,
                }
            }
            VisualContent::Caption { text } => {
                self.draw_caption(ctx, plan.canvas, seg_idx, segment, text, t)?;
            }
            VisualContent::SubVideo { source } => {
                self.draw_sub_video(ctx, plan.canvas, seg_idx, segment, source, t)?;
            }
        }

        ctx.flush();
        ctx.render_to_pixmap(pixmap);
        Ok(())
    }

    fn draw_sprite(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: Canvas,
        assets: &AssetStore,
        emotion: &str,
    ) -> SkitcastResult<()> {
        let prepared = assets.sprite(emotion)?.clone();
        let image = match self.sprite_images.get(emotion) {
            Some(img) => img.clone(),
            None => {
                let img = image_from_prepared(&prepared)?;
                self.sprite_images.insert(emotion.to_string(), img.clone());
                img
            }
        };
        let place = sprite_placement(canvas, prepared.width, prepared.height);
        let affine = kurbo::Affine::translate((place.x, place.y)) * kurbo::Affine::scale(place.scale);
        ctx.set_transform(affine_to_cpu(affine));
        ctx.set_paint(image);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(prepared.width),
            f64::from(prepared.height),
        ));
        Ok(())
    }

    fn draw_caption(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: Canvas,
        seg_idx: usize,
        segment: &Segment,
        text: &str,
        t: f64,
    ) -> SkitcastResult<()> {
        let alpha = caption_alpha(t - segment.start_secs, segment.duration_secs);
        if alpha <= 0.0 {
            return Ok(());
        }
        let layout = self.caption_layout(seg_idx, canvas, text)?;

        let x = (f64::from(canvas.width) - f64::from(layout.width())) / 2.0;
        let y = (f64::from(canvas.height) - f64::from(layout.height())) / 2.0;
        ctx.set_transform(affine_to_cpu(kurbo::Affine::translate((
            x.max(0.0),
            y.max(0.0),
        ))));
        if alpha < 1.0 {
            ctx.push_opacity_layer(alpha);
        }
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&self.font.data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        if alpha < 1.0 {
            ctx.pop_layer();
        }
        Ok(())
    }

    fn caption_layout(
        &mut self,
        seg_idx: usize,
        canvas: Canvas,
        text: &str,
    ) -> SkitcastResult<Arc<parley::Layout<TextBrushRgba8>>> {
        if let Some(layout) = self.caption_layouts.get(&seg_idx) {
            return Ok(layout.clone());
        }
        let scale = f64::from(canvas.height) / 1080.0;
        let size_px = (CAPTION_FONT_SIZE_1080 * scale) as f32;
        let side = CAPTION_SIDE_MARGIN_1080 * scale;
        let max_width = (f64::from(canvas.width) - 2.0 * side).max(1.0) as f32;
        let layout = Arc::new(self.engine.layout(text, size_px, CAPTION_BRUSH, max_width)?);
        self.caption_layouts.insert(seg_idx, layout.clone());
        Ok(layout)
    }

    fn draw_sub_video(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: Canvas,
        seg_idx: usize,
        segment: &Segment,
        source: &VideoSourceInfo,
        t: f64,
    ) -> SkitcastResult<()> {
        if source.width == 0 || source.height == 0 {
            return Err(SkitcastError::render(format!(
                "inserted video '{}' has zero dimensions",
                source.source_path.display()
            )));
        }
        let t_local = t - segment.start_secs;
        let src_time = sub_video_source_time(t_local, source.fps, source.duration_secs);
        let decoder = self
            .video_decoders
            .entry(seg_idx)
            .or_insert_with(|| SubVideoDecoder::new(source.clone()));
        let image = decoder.decode_at(src_time)?;

        // Letterbox fit: scale to the canvas preserving aspect, centered,
        // background showing through the bars.
        let sw = f64::from(source.width);
        let sh = f64::from(source.height);
        let scale = (f64::from(canvas.width) / sw).min(f64::from(canvas.height) / sh);
        let x = (f64::from(canvas.width) - sw * scale) / 2.0;
        let y = (f64::from(canvas.height) - sh * scale) / 2.0;
        let affine = kurbo::Affine::translate((x, y)) * kurbo::Affine::scale(scale);
        ctx.set_transform(affine_to_cpu(affine));
        ctx.set_paint(image);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, sw, sh));
        Ok(())
    }
}

fn fill_background(ctx: &mut vello_cpu::RenderContext, canvas: Canvas, color: Rgba8) {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        color.r, color.g, color.b, color.a,
    ));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(canvas.width),
        f64::from(canvas.height),
    ));
}

#[cfg(test)]
#[path = "../../tests/unit/compose/frame.rs"]
mod tests;
