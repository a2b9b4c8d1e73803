use std::path::Path;

use glam::Vec2;
use image::RgbaImage;

use super::{Canvas, Color};
use crate::{math::Bounds, video::VideoFrame, Result, SketchError};

/// Software RGBA8 surface with source-over blending. Pixel centres sit at
/// half-integer coordinates.
#[derive(Debug, Clone)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        let mut raster = Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        };
        raster.background(Color::BLACK);
        raster
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        let p = &self.pixels[i..i + 4];
        Some(Color::rgba(p[0], p[1], p[2], p[3]))
    }

    /// Rebuilds the surface at a new size, cleared to black.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }

    pub fn to_image(&self) -> Result<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| SketchError::msg("raster buffer does not match its dimensions"))
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_image()?.save(path)?;
        Ok(())
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    fn blend(&mut self, x: u32, y: u32, color: Color) {
        if color.a == 0 {
            return;
        }
        let i = self.offset(x, y);
        let dst = &mut self.pixels[i..i + 4];
        if color.a == 255 {
            dst.copy_from_slice(&[color.r, color.g, color.b, 255]);
            return;
        }
        let alpha = color.a as u32;
        let inverse = 255 - alpha;
        for (channel, src) in dst.iter_mut().take(3).zip([color.r, color.g, color.b]) {
            *channel = ((src as u32 * alpha + *channel as u32 * inverse + 127) / 255) as u8;
        }
        dst[3] = (alpha + (dst[3] as u32 * inverse + 127) / 255).min(255) as u8;
    }

    /// Visits every pixel whose centre lies in the clipped box and passes
    /// `inside`.
    fn fill_where(&mut self, min: Vec2, max: Vec2, color: Color, inside: impl Fn(Vec2) -> bool) {
        let x0 = min.x.floor().max(0.0) as u32;
        let y0 = min.y.floor().max(0.0) as u32;
        let x1 = (max.x.ceil().max(0.0) as u32).min(self.width);
        let y1 = (max.y.ceil().max(0.0) as u32).min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                if inside(Vec2::new(x as f32 + 0.5, y as f32 + 0.5)) {
                    self.blend(x, y, color);
                }
            }
        }
    }
}

impl Canvas for Raster {
    fn bounds(&self) -> Bounds {
        Bounds::new(self.width as f32, self.height as f32)
    }

    fn background(&mut self, color: Color) {
        for y in 0..self.height {
            for x in 0..self.width {
                self.blend(x, y, color);
            }
        }
    }

    fn fill_circle(&mut self, center: Vec2, diameter: f32, color: Color) {
        let radius = (diameter * 0.5).max(0.5);
        let r_sq = radius * radius;
        self.fill_where(
            center - Vec2::splat(radius),
            center + Vec2::splat(radius),
            color,
            |p| p.distance_squared(center) <= r_sq,
        );
    }

    fn fill_ellipse(&mut self, center: Vec2, size: Vec2, color: Color) {
        let radii = (size * 0.5).max(Vec2::splat(0.5));
        self.fill_where(center - radii, center + radii, color, |p| {
            let d = (p - center) / radii;
            d.length_squared() <= 1.0
        });
    }

    fn line(&mut self, from: Vec2, to: Vec2, weight: f32, color: Color) {
        let half = (weight * 0.5).max(0.5);
        self.fill_where(
            from.min(to) - Vec2::splat(half),
            from.max(to) + Vec2::splat(half),
            color,
            |p| crate::math::distance_to_segment(p, from, to) <= half,
        );
    }

    fn fill_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, color: Color) {
        let edge = |p: Vec2, q: Vec2, r: Vec2| (q - p).perp_dot(r - p);
        let area = edge(a, b, c);
        if area.abs() <= f32::EPSILON {
            return;
        }
        self.fill_where(a.min(b).min(c), a.max(b).max(c), color, |p| {
            let w0 = edge(b, c, p) * area;
            let w1 = edge(c, a, p) * area;
            let w2 = edge(a, b, p) * area;
            w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0
        });
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Color) {
        self.fill_where(origin, origin + size, color, |_| true);
    }

    fn video(&mut self, frame: &VideoFrame, alpha: u8, mirrored: bool) {
        let bounds = self.bounds();
        for y in 0..self.height {
            for x in 0..self.width {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let sample = frame.sample(p, bounds, mirrored);
                self.blend(x, y, Color { a: alpha, ..sample });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_circle_covers_centre_only() {
        let mut raster = Raster::new(20, 20);
        raster.fill_circle(Vec2::new(10.0, 10.0), 6.0, Color::WHITE);
        assert_eq!(raster.pixel(10, 10), Some(Color::WHITE));
        assert_eq!(raster.pixel(0, 0), Some(Color::BLACK));
    }

    #[test]
    fn translucent_background_fades() {
        let mut raster = Raster::new(4, 4);
        raster.background(Color::WHITE);
        raster.background(Color::rgba(0, 0, 0, 128));
        let p = raster.pixel(1, 1).unwrap();
        assert!(p.r > 100 && p.r < 150, "{p:?}");
    }

    #[test]
    fn triangle_winding_does_not_matter() {
        let mut cw = Raster::new(16, 16);
        let mut ccw = Raster::new(16, 16);
        let (a, b, c) = (Vec2::new(1.0, 1.0), Vec2::new(14.0, 2.0), Vec2::new(6.0, 14.0));
        cw.fill_triangle(a, b, c, Color::WHITE);
        ccw.fill_triangle(a, c, b, Color::WHITE);
        assert_eq!(cw.pixels, ccw.pixels);
        assert_eq!(cw.pixel(7, 6), Some(Color::WHITE));
    }

    #[test]
    fn shapes_outside_are_clipped() {
        let mut raster = Raster::new(8, 8);
        raster.line(Vec2::new(-50.0, -50.0), Vec2::new(-10.0, -10.0), 4.0, Color::WHITE);
        raster.fill_rect(Vec2::new(6.0, 6.0), Vec2::new(100.0, 100.0), Color::WHITE);
        assert_eq!(raster.pixel(0, 0), Some(Color::BLACK));
        assert_eq!(raster.pixel(7, 7), Some(Color::WHITE));
    }

    #[test]
    fn exports_image_with_same_size() {
        let raster = Raster::new(5, 3);
        let image = raster.to_image().unwrap();
        assert_eq!(image.dimensions(), (5, 3));
    }
}
