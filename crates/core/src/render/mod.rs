//! Immediate-mode drawing surface the layers paint onto.
//!
//! Layers only ever see the [`Canvas`] trait. [`DrawList`] records the calls
//! for inspection and JSON dumps; [`Raster`] rasterises them into RGBA pixels.

mod raster;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{math::Bounds, video::VideoFrame};

pub use raster::Raster;

/// Straight (non-premultiplied) RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Colour with a floating point alpha in `0..=255`, clamped.
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: alpha.round().clamp(0.0, 255.0) as u8,
            ..self
        }
    }

    /// Hue in degrees, saturation and brightness in `0..=100`, alpha in
    /// `0..=255`.
    pub fn hsba(hue: f32, saturation: f32, brightness: f32, alpha: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = (saturation / 100.0).clamp(0.0, 1.0);
        let v = (brightness / 100.0).clamp(0.0, 1.0);

        let c = v * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let channel = |value: f32| ((value + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::rgb(channel(r), channel(g), channel(b)).with_alpha(alpha)
    }
}

/// The drawing primitives every layer renders with.
pub trait Canvas {
    fn bounds(&self) -> Bounds;

    /// Paints the whole surface. Translucent colours blend over the previous
    /// frame, leaving trails.
    fn background(&mut self, color: Color);

    fn fill_circle(&mut self, center: Vec2, diameter: f32, color: Color);

    fn fill_ellipse(&mut self, center: Vec2, size: Vec2, color: Color);

    fn line(&mut self, from: Vec2, to: Vec2, weight: f32, color: Color);

    fn fill_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, color: Color);

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Color);

    /// Stretches a video frame over the surface at the given opacity.
    fn video(&mut self, frame: &VideoFrame, alpha: u8, mirrored: bool);

    fn polyline(&mut self, points: &[Vec2], weight: f32, color: Color) {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], weight, color);
        }
    }
}

/// A recorded canvas call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Background {
        color: Color,
    },
    Circle {
        center: Vec2,
        diameter: f32,
        color: Color,
    },
    Ellipse {
        center: Vec2,
        size: Vec2,
        color: Color,
    },
    Line {
        from: Vec2,
        to: Vec2,
        weight: f32,
        color: Color,
    },
    Triangle {
        points: [Vec2; 3],
        color: Color,
    },
    Rect {
        origin: Vec2,
        size: Vec2,
        color: Color,
    },
    Polyline {
        points: Vec<Vec2>,
        weight: f32,
        color: Color,
    },
    Video {
        width: u32,
        height: u32,
        alpha: u8,
        mirrored: bool,
    },
}

/// Canvas that records calls instead of rasterising them.
#[derive(Debug, Clone)]
pub struct DrawList {
    bounds: Bounds,
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn count(&self, predicate: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(&self.commands)?)
    }

    /// Replays the recorded calls onto another canvas.
    pub fn replay(&self, target: &mut dyn Canvas) {
        for command in &self.commands {
            match command {
                DrawCommand::Background { color } => target.background(*color),
                DrawCommand::Circle {
                    center,
                    diameter,
                    color,
                } => target.fill_circle(*center, *diameter, *color),
                DrawCommand::Ellipse {
                    center,
                    size,
                    color,
                } => target.fill_ellipse(*center, *size, *color),
                DrawCommand::Line {
                    from,
                    to,
                    weight,
                    color,
                } => target.line(*from, *to, *weight, *color),
                DrawCommand::Triangle { points, color } => {
                    target.fill_triangle(points[0], points[1], points[2], *color)
                }
                DrawCommand::Rect {
                    origin,
                    size,
                    color,
                } => target.fill_rect(*origin, *size, *color),
                DrawCommand::Polyline {
                    points,
                    weight,
                    color,
                } => target.polyline(points, *weight, *color),
                // Video frames are not retained by the list.
                DrawCommand::Video { .. } => {}
            }
        }
    }
}

impl Canvas for DrawList {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn background(&mut self, color: Color) {
        self.commands.push(DrawCommand::Background { color });
    }

    fn fill_circle(&mut self, center: Vec2, diameter: f32, color: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            diameter,
            color,
        });
    }

    fn fill_ellipse(&mut self, center: Vec2, size: Vec2, color: Color) {
        self.commands.push(DrawCommand::Ellipse {
            center,
            size,
            color,
        });
    }

    fn line(&mut self, from: Vec2, to: Vec2, weight: f32, color: Color) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            weight,
            color,
        });
    }

    fn fill_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, color: Color) {
        self.commands.push(DrawCommand::Triangle {
            points: [a, b, c],
            color,
        });
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Color) {
        self.commands.push(DrawCommand::Rect {
            origin,
            size,
            color,
        });
    }

    fn video(&mut self, frame: &VideoFrame, alpha: u8, mirrored: bool) {
        self.commands.push(DrawCommand::Video {
            width: frame.width(),
            height: frame.height(),
            alpha,
            mirrored,
        });
    }

    fn polyline(&mut self, points: &[Vec2], weight: f32, color: Color) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            weight,
            color,
        });
    }
}
