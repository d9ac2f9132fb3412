//! Texture file loading.
//!
//! The demo ships two BMP textures loaded once at startup. Decoding goes
//! through the `image` crate; the renderer only ever sees tightly packed
//! RGBA8 pixels.

use std::path::Path;

/// Decoded, tightly packed RGBA8 pixels.
pub struct RgbaPixels {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Loads and decodes an image file to RGBA8.
pub fn load_rgba8(path: impl AsRef<Path>) -> Result<RgbaPixels, Box<dyn std::error::Error>> {
    let path = path.as_ref();
    let image = image::open(path)
        .map_err(|e| format!("failed to load texture {}: {e}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok(RgbaPixels {
        pixels: image.into_raw(),
        width,
        height,
    })
}
