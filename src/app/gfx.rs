// src/app/gfx.rs
use eframe::egui::{self as eg, ColorImage, TextureHandle};
use image::{imageops::FilterType, DynamicImage};

use crate::error::ImageError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThumbBounds {
    pub max_w: u32,
    pub max_h: u32,
}

/// Fit inside the bounds keeping aspect; never enlarges.
pub fn thumbnail(img: DynamicImage, bounds: ThumbBounds) -> DynamicImage {
    if img.width() > bounds.max_w || img.height() > bounds.max_h {
        img.resize(bounds.max_w, bounds.max_h, FilterType::Lanczos3)
    } else {
        img
    }
}

/// Decode downloaded bytes into a paintable thumbnail. (any thread)
pub fn decode_thumbnail(bytes: &[u8], bounds: ThumbBounds) -> Result<ColorImage, ImageError> {
    let img = image::load_from_memory(bytes)?;
    let thumb = thumbnail(img, bounds);
    let rgba = thumb.to_rgba8();
    let (w, h) = rgba.dimensions();
    Ok(ColorImage::from_rgba_unmultiplied(
        [w as usize, h as usize],
        rgba.as_raw(),
    ))
}

/// Texture name derived from the poster url.
pub fn texture_key(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))
}

/// Upload a decoded poster to a GPU texture. (UI thread only)
pub fn upload_poster(ctx: &eg::Context, image: &ColorImage, name: &str) -> TextureHandle {
    ctx.load_texture(name.to_string(), image.clone(), eg::TextureOptions::LINEAR)
}
