use std::sync::Arc;

use crate::assets::store::{PreparedImage, premultiply_rgba8_in_place};
use crate::foundation::{
    core::Canvas,
    error::{SkitcastError, SkitcastResult},
};

/// Canvas dimensions narrowed to the raster backend's u16 surface limits.
pub(crate) fn canvas_dims_u16(canvas: Canvas) -> SkitcastResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| SkitcastError::render("canvas width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| SkitcastError::render("canvas height exceeds u16"))?;
    Ok((w, h))
}

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> SkitcastResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| SkitcastError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| SkitcastError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(SkitcastError::render("pixmap byte len mismatch"));
    }
    // Pixmap stores PremulRgba8; the bytes are already premultiplied.
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

pub(crate) fn image_from_premul_bytes(
    bytes_premul: &[u8],
    width: u32,
    height: u32,
) -> SkitcastResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes_premul, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

/// Build an image paint from straight-alpha bytes, e.g. raw ffmpeg output.
pub(crate) fn image_from_straight_bytes(
    bytes_rgba: &[u8],
    width: u32,
    height: u32,
) -> SkitcastResult<vello_cpu::Image> {
    let mut tmp = bytes_rgba.to_vec();
    premultiply_rgba8_in_place(&mut tmp);
    image_from_premul_bytes(&tmp, width, height)
}

pub(crate) fn image_from_prepared(img: &PreparedImage) -> SkitcastResult<vello_cpu::Image> {
    image_from_premul_bytes(&img.rgba8_premul, img.width, img.height)
}

pub(crate) fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}
