//! Procedural soft-circle sprite used for every particle.

use image::{Rgba, RgbaImage};

/// A square RGBA image: white, with alpha falling linearly from the centre
/// to zero at the inscribed circle's edge.
#[derive(Debug, Clone)]
pub struct SpriteTexture {
    image: RgbaImage,
}

impl SpriteTexture {
    /// Generate a `size` x `size` radial-gradient sprite.
    pub fn soft_circle(size: u32) -> Self {
        let size = size.max(2);
        let half = size as f32 / 2.0;
        let image = RgbaImage::from_fn(size, size, |x, y| {
            let dx = x as f32 + 0.5 - half;
            let dy = y as f32 + 0.5 - half;
            let d = (dx * dx + dy * dy).sqrt() / half;
            let alpha = (1.0 - d).clamp(0.0, 1.0);
            Rgba([255, 255, 255, (alpha * 255.0).round() as u8])
        });
        Self { image }
    }

    /// Edge length in pixels.
    #[inline]
    pub fn size(&self) -> u32 {
        self.image.width()
    }

    /// The underlying image.
    #[inline]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Raw RGBA8 bytes, row-major, for texture upload.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Alpha at normalized coordinates `(u, v)` in `[0, 1]`, nearest texel.
    pub fn alpha_at(&self, u: f32, v: f32) -> f32 {
        let size = self.size();
        let max = (size - 1) as f32;
        let x = (u * size as f32).floor().clamp(0.0, max) as u32;
        let y = (v * size as f32).floor().clamp(0.0, max) as u32;
        self.image.get_pixel(x, y)[3] as f32 / 255.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centre_opaque_corner_clear() {
        let sprite = SpriteTexture::soft_circle(64);
        assert_eq!(sprite.size(), 64);
        assert!(sprite.alpha_at(0.5, 0.5) > 0.95);
        assert_eq!(sprite.alpha_at(0.0, 0.0), 0.0);
        assert_eq!(sprite.alpha_at(1.0, 1.0), 0.0);
    }

    #[test]
    fn test_alpha_falls_off_radially() {
        let sprite = SpriteTexture::soft_circle(64);
        let samples: Vec<f32> = (0..8)
            .map(|i| sprite.alpha_at(0.5 + i as f32 / 16.0, 0.5))
            .collect();
        assert!(samples.windows(2).all(|w| w[0] >= w[1]), "{:?}", samples);
    }

    #[test]
    fn test_rgb_is_white() {
        let sprite = SpriteTexture::soft_circle(8);
        assert!(sprite.image().pixels().all(|p| p[0] == 255 && p[1] == 255 && p[2] == 255));
        assert_eq!(sprite.as_bytes().len(), 8 * 8 * 4);
    }
}
