//! CPU rendition of the frame pipeline.
//!
//! [`SoftwareRenderer`] runs the same three stages as the GPU path into a
//! linear HDR [`Frame`]. It is slow but exact, which makes it the reference
//! for headless snapshots and for checking stage behaviour in tests.

use std::path::Path;

use glam::{Mat4, Vec3, Vec4, Vec4Swizzles};
use image::{Rgba, RgbaImage};

use super::{
    gaussian_kernel, luminance, smoothstep, sprite_pixel_radius, RenderPipeline, SpriteTexture,
    Stage, AFTERIMAGE_CUTOFF, BLOOM_KERNEL_RADII, BLOOM_KNEE, BLOOM_MIP_COUNT,
};
use crate::camera::NEAR;

/// A linear RGBA image with `f32` channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
}

impl Frame {
    /// A frame of the given size with every pixel set to `color`.
    pub fn filled(width: u32, height: u32, color: Vec4) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![color; (width * height) as usize],
        }
    }

    /// A transparent black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Vec4::ZERO)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixels in row-major order.
    #[inline]
    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[(y * self.width + x) as usize]
    }

    #[inline]
    fn get_mut(&mut self, x: u32, y: u32) -> &mut Vec4 {
        &mut self.pixels[(y * self.width + x) as usize]
    }

    /// Largest per-channel absolute difference to another frame of the same size.
    pub fn max_difference(&self, other: &Frame) -> f32 {
        assert_eq!(
            (self.width, self.height),
            (other.width, other.height),
            "frame size mismatch"
        );
        self.pixels
            .iter()
            .zip(&other.pixels)
            .map(|(a, b)| (*a - *b).abs().max_element())
            .fold(0.0, f32::max)
    }

    /// Clamp to `[0, 1]` and quantize to an 8-bit image.
    pub fn to_rgba8(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let c = self.get(x, y).clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
            Rgba([
                c.x.round() as u8,
                c.y.round() as u8,
                c.z.round() as u8,
                c.w.round() as u8,
            ])
        })
    }

    /// Write the frame as a PNG file.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.to_rgba8().save_with_format(path, image::ImageFormat::Png)
    }

    fn map(&self, f: impl Fn(Vec4) -> Vec4) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|&p| f(p)).collect(),
        }
    }

    fn clamped(&self, x: i64, y: i64) -> Vec4 {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.get(x, y)
    }

    /// Bilinear sample at normalized `(u, v)`, clamped to the edge.
    fn sample(&self, u: f32, v: f32) -> Vec4 {
        let x = u * self.width as f32 - 0.5;
        let y = v * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.clamped(x0, y0).lerp(self.clamped(x0 + 1, y0), tx);
        let bottom = self.clamped(x0, y0 + 1).lerp(self.clamped(x0 + 1, y0 + 1), tx);
        top.lerp(bottom, ty)
    }

    /// Half-resolution copy, each texel the mean of a 2x2 block.
    fn downsample(&self) -> Frame {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut out = Frame::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let (sx, sy) = (2 * x as i64, 2 * y as i64);
                *out.get_mut(x, y) = (self.clamped(sx, sy)
                    + self.clamped(sx + 1, sy)
                    + self.clamped(sx, sy + 1)
                    + self.clamped(sx + 1, sy + 1))
                    * 0.25;
            }
        }
        out
    }

    /// Separable Gaussian blur with one-sided `kernel` weights.
    fn blur(&self, kernel: &[f32]) -> Frame {
        let pass = |src: &Frame, dx: i64, dy: i64| {
            let mut out = Frame::new(src.width, src.height);
            for y in 0..src.height {
                for x in 0..src.width {
                    let (cx, cy) = (x as i64, y as i64);
                    let mut sum = src.get(x, y) * kernel[0];
                    for (i, &w) in kernel.iter().enumerate().skip(1) {
                        let i = i as i64;
                        sum += (src.clamped(cx + dx * i, cy + dy * i)
                            + src.clamped(cx - dx * i, cy - dy * i))
                            * w;
                    }
                    *out.get_mut(x, y) = sum;
                }
            }
            out
        };
        let horizontal = pass(self, 1, 0);
        pass(&horizontal, 0, 1)
    }
}

/// Reference CPU implementation of the frame pipeline.
#[derive(Debug, Clone)]
pub struct SoftwareRenderer {
    pipeline: RenderPipeline,
    sprite: SpriteTexture,
    width: u32,
    height: u32,
    history: Option<Frame>,
}

impl SoftwareRenderer {
    /// Create a renderer producing `width` x `height` frames.
    pub fn new(pipeline: RenderPipeline, width: u32, height: u32) -> Self {
        Self {
            sprite: SpriteTexture::soft_circle(pipeline.sprite.texture_size),
            pipeline,
            width: width.max(1),
            height: height.max(1),
            history: None,
        }
    }

    /// Change the output size. Drops the afterimage history.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.history = None;
    }

    /// Render one frame of `positions` seen through `view` and `proj`.
    ///
    /// The afterimage history is updated, so consecutive calls produce
    /// trails exactly as the windowed renderer would.
    pub fn render(&mut self, positions: &[Vec3], view: Mat4, proj: Mat4) -> Frame {
        let mut frame = self.clear_frame();
        for stage in self.pipeline.stages() {
            match stage {
                Stage::Base => self.draw_sprites(&mut frame, positions, view, proj),
                Stage::Bloom => self.apply_bloom(&mut frame),
                Stage::Afterimage => self.apply_afterimage(&mut frame),
            }
        }
        frame
    }

    /// Only the sprite stage, without touching the afterimage history.
    pub fn base_pass(&self, positions: &[Vec3], view: Mat4, proj: Mat4) -> Frame {
        let mut frame = self.clear_frame();
        self.draw_sprites(&mut frame, positions, view, proj);
        frame
    }

    fn clear_frame(&self) -> Frame {
        Frame::filled(self.width, self.height, self.pipeline.background.extend(1.0))
    }

    fn draw_sprites(&self, frame: &mut Frame, positions: &[Vec3], view: Mat4, proj: Mat4) {
        let sprite = &self.pipeline.sprite;
        let tint = sprite.color * sprite.opacity;
        let (w, h) = (frame.width as f32, frame.height as f32);

        for &p in positions {
            let eye = view * p.extend(1.0);
            if eye.z > -NEAR {
                continue;
            }
            let clip = proj * eye;
            let ndc = clip.xy() / clip.w;
            let cx = (ndc.x * 0.5 + 0.5) * w;
            let cy = (0.5 - ndc.y * 0.5) * h;
            let r = sprite_pixel_radius(sprite.size, -eye.z, h);
            if r <= 0.0 || !cx.is_finite() || !cy.is_finite() {
                continue;
            }

            let x0 = (cx - r).floor().max(0.0) as u32;
            let y0 = (cy - r).floor().max(0.0) as u32;
            let x1 = (cx + r).ceil().min(w) as u32;
            let y1 = (cy + r).ceil().min(h) as u32;
            for y in y0..y1 {
                for x in x0..x1 {
                    let u = (x as f32 + 0.5 - (cx - r)) / (2.0 * r);
                    let v = (y as f32 + 0.5 - (cy - r)) / (2.0 * r);
                    if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
                        continue;
                    }
                    let alpha = self.sprite.alpha_at(u, v);
                    if alpha > 0.0 {
                        let px = frame.get_mut(x, y);
                        *px += (tint * alpha).extend(0.0);
                    }
                }
            }
        }
    }

    fn apply_bloom(&self, frame: &mut Frame) {
        if !self.pipeline.bloom_active() {
            return;
        }
        let threshold = self.pipeline.bloom.threshold;
        let bright = frame.map(|c| {
            let rgb = c.xyz();
            let a = smoothstep(threshold, threshold + BLOOM_KNEE, luminance(rgb));
            (rgb * a).extend(a * c.w)
        });

        let mut mips = Vec::with_capacity(BLOOM_MIP_COUNT);
        let mut source = bright;
        for &radius in &BLOOM_KERNEL_RADII {
            let blurred = source.downsample().blur(&gaussian_kernel(radius));
            source = blurred.clone();
            mips.push(blurred);
        }

        let weights = self.pipeline.bloom_weights();
        let (w, h) = (frame.width, frame.height);
        for y in 0..h {
            for x in 0..w {
                let u = (x as f32 + 0.5) / w as f32;
                let v = (y as f32 + 0.5) / h as f32;
                let glow: Vec3 = mips
                    .iter()
                    .zip(weights)
                    .map(|(mip, weight)| mip.sample(u, v).xyz() * weight)
                    .sum();
                *frame.get_mut(x, y) += glow.extend(0.0);
            }
        }
    }

    fn apply_afterimage(&mut self, frame: &mut Frame) {
        let damping = self.pipeline.afterimage.damping;
        if let Some(history) = &self.history {
            if history.width == frame.width && history.height == frame.height {
                for (new, &old) in frame.pixels.iter_mut().zip(&history.pixels) {
                    let keep = Vec4::select(old.cmpgt(Vec4::splat(AFTERIMAGE_CUTOFF)), Vec4::ONE, Vec4::ZERO);
                    *new = new.max(old * damping * keep);
                }
            }
        }
        self.history = Some(frame.clone());
    }
}
