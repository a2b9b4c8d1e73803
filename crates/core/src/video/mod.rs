use std::path::Path;

use glam::Vec2;

use crate::{math::Bounds, render::Color, Result, SketchError};

/// One camera frame as RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl VideoFrame {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SketchError::msg("video frame must not be empty"));
        }
        if pixels.len() != width as usize * height as usize * 4 {
            return Err(SketchError::msg(format!(
                "video frame of {width}x{height} needs {} bytes, got {}",
                width as usize * height as usize * 4,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decodes a still image to stand in for the camera feed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let image = image::open(path)?.to_rgba8();
        let (width, height) = image.dimensions();
        Self::from_rgba(width, height, image.into_raw())
    }

    /// Colourful diagonal gradient, handy when no camera is available.
    pub fn test_pattern(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let hue = (x as f32 / width as f32 + y as f32 / height as f32) * 180.0;
                let color = Color::hsba(hue, 70.0, 90.0, 255.0);
                pixels.extend_from_slice(&[color.r, color.g, color.b, 255]);
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.pixels[i..i + 4];
        Color::rgba(p[0], p[1], p[2], p[3])
    }

    /// Colour under a canvas position, with the frame stretched over
    /// `canvas`. With `mirrored` the frame is read right to left so it lines
    /// up with a mirrored display.
    pub fn sample(&self, position: Vec2, canvas: Bounds, mirrored: bool) -> Color {
        let u = if canvas.width > 0.0 {
            position.x / canvas.width
        } else {
            0.0
        };
        let v = if canvas.height > 0.0 {
            position.y / canvas.height
        } else {
            0.0
        };
        let x = (u.clamp(0.0, 1.0) * self.width as f32).floor() as u32;
        let y = (v.clamp(0.0, 1.0) * self.height as f32).floor() as u32;
        let x = x.min(self.width - 1);
        let x = if mirrored { self.width - 1 - x } else { x };
        self.pixel(x, y)
    }
}
