//! Push constant block of the bar pipeline.

use bytemuck::{Pod, Zeroable};

/// Matches `layout(push_constant) uniform Bar { float x; }` in `bar.vert`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BarPushConstants {
    /// Left edge offset in `[0, 2)`; the shader places it at NDC `-1 + x`.
    pub x: f32,
}

impl BarPushConstants {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(x: f32) -> Self {
        Self { x }
    }
}
