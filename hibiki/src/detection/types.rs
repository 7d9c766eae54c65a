use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Axis-aligned box; `x`/`y` is the minimum corner.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Pod, Zeroable, Deserialize, Serialize,
)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn iou(
        &self,
        other: &BoundingBox,
    ) -> f32 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);

        let intersection = (right - left).max(0.0) * (bottom - top).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    pub fn scaled(
        &self,
        scale_x: f32,
        scale_y: f32,
    ) -> Self {
        Self {
            x: self.x * scale_x,
            y: self.y * scale_y,
            width: self.width * scale_x,
            height: self.height * scale_y,
        }
    }
}

/// One kept detection. The layout matches the kernel's output buffer record,
/// so readback bytes reinterpret directly.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Pod, Zeroable, Deserialize, Serialize,
)]
pub struct Detection {
    pub rect: BoundingBox,
    pub score: f32,
    pub class_id: i32,
}
