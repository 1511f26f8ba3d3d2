/// Color and depth buffers owned by a render device
use image::{ImageBuffer, Luma, Rgb, RgbImage};

use crate::error::{RenderError, Result};

/// One `f32` depth per pixel, row-major like the color buffer.
pub type DepthImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Depth of a pixel nothing has been drawn to.
pub const DEPTH_SENTINEL: f32 = f32::INFINITY;

pub const DEFAULT_CLEAR_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Color buffer, depth buffer and the base layer they reset to.
///
/// Depth convention: normalized device depth, smaller is nearer. A pixel
/// passes the depth test when its depth is strictly less than the stored one.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    color: RgbImage,
    depth: DepthImage,
    background: Option<RgbImage>,
    clear_color: Rgb<u8>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32, clear_color: Rgb<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        log::debug!("allocating {}x{} color and depth buffers", width, height);
        Ok(Self {
            color: RgbImage::from_pixel(width, height, clear_color),
            depth: DepthImage::from_pixel(width, height, Luma([DEPTH_SENTINEL])),
            background: None,
            clear_color,
        })
    }

    /// Fresh buffers of a new size with the same clear color.
    ///
    /// The background does not carry over: it no longer matches.
    pub fn resized(&self, width: u32, height: u32) -> Result<Self> {
        Self::new(width, height, self.clear_color)
    }

    pub fn width(&self) -> u32 {
        self.color.width()
    }

    pub fn height(&self) -> u32 {
        self.color.height()
    }

    pub fn color(&self) -> &RgbImage {
        &self.color
    }

    pub fn depth(&self) -> &DepthImage {
        &self.depth
    }

    pub fn background(&self) -> Option<&RgbImage> {
        self.background.as_ref()
    }

    pub fn clear_color(&self) -> Rgb<u8> {
        self.clear_color
    }

    /// Takes effect on the next [`Framebuffer::reset`] when no background is set.
    pub fn set_clear_color(&mut self, color: Rgb<u8>) {
        self.clear_color = color;
    }

    /// Install `image` as the base layer and copy it into the color buffer.
    pub fn set_background(&mut self, image: RgbImage) -> Result<()> {
        if image.dimensions() != self.color.dimensions() {
            return Err(RenderError::BackgroundSizeMismatch {
                width: self.width(),
                height: self.height(),
                actual_width: image.width(),
                actual_height: image.height(),
            });
        }
        self.color.copy_from_slice(&image);
        self.background = Some(image);
        Ok(())
    }

    pub fn clear_background(&mut self) {
        self.background = None;
    }

    /// Color back to the background (or clear color), depth back to the sentinel.
    pub fn reset(&mut self) {
        match &self.background {
            Some(background) => self.color.copy_from_slice(background),
            None => {
                let clear = self.clear_color;
                self.color.pixels_mut().for_each(|pixel| *pixel = clear);
            }
        }
        self.depth.fill(DEPTH_SENTINEL);
    }

    fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width()) && y < i64::from(self.height())
    }

    /// Write a color without consulting depth. Out-of-range pixels are ignored.
    pub fn put_color(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if self.in_bounds(x, y) {
            self.color.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Depth-tested write. Returns whether the pixel was written.
    pub fn test_and_set(&mut self, x: i64, y: i64, depth: f32, color: Rgb<u8>) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let (x, y) = (x as u32, y as u32);
        let stored = self.depth.get_pixel_mut(x, y);
        if depth < stored.0[0] {
            stored.0[0] = depth;
            self.color.put_pixel(x, y, color);
            true
        } else {
            false
        }
    }
}
