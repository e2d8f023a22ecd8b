// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! State descriptors for the fixed-function stages.
//!
//! A [`RenderState`] is a plain value: draw commands copy it, compare it and never share
//! it mutably, so the ignore-show and pick command lists can hold their own copies.

use super::enums::*;
use crate::drapery_bitflags;

/// Describes one vertex attribute a program reads, bound by name to a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeDescriptor {
    /// The attribute's name in the vertex stage.
    pub name: &'static str,
    /// The input location of this attribute in the vertex shader.
    pub shader_location: u32,
    /// The format of the attribute's data in its vertex buffer.
    pub format: VertexFormat,
}

/// Describes the stencil test and operations for a single face of a primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StencilFaceState {
    /// The comparison function used for the stencil test.
    pub compare: CompareFunction,
    /// The operation to perform if the stencil test fails.
    pub fail_op: StencilOperation,
    /// The operation to perform if the stencil test passes but the depth test fails.
    pub depth_fail_op: StencilOperation,
    /// The operation to perform if both the stencil and depth tests pass.
    pub depth_pass_op: StencilOperation,
}

/// Describes the stencil test for both faces together with its masks and reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StencilState {
    /// The stencil state for front-facing primitives.
    pub front: StencilFaceState,
    /// The stencil state for back-facing primitives.
    pub back: StencilFaceState,
    /// The reference value used by the comparison and `Replace`.
    pub reference: u32,
    /// A bitmask for reading from the stencil buffer.
    pub read_mask: u32,
    /// A bitmask for writing to the stencil buffer.
    pub write_mask: u32,
}

/// Describes the depth test. When absent from a [`RenderState`] the test is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    /// The comparison function used for the depth test.
    pub compare: CompareFunction,
    /// If `true`, depth values will be written to the depth buffer.
    pub write_enabled: bool,
}

/// Describes a complete blend equation for a single color component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponentDescriptor {
    /// The blend factor for the source color.
    pub src_factor: BlendFactor,
    /// The blend factor for the destination color.
    pub dst_factor: BlendFactor,
    /// The operation to combine the source and destination factors.
    pub operation: BlendOperation,
}

/// Describes the blend state for a single color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendStateDescriptor {
    /// The blend equation for the RGB color components.
    pub color: BlendComponentDescriptor,
    /// The blend equation for the Alpha component.
    pub alpha: BlendComponentDescriptor,
}

impl BlendStateDescriptor {
    /// Blending for colors whose RGB has already been multiplied by alpha.
    pub const PREMULTIPLIED_ALPHA: Self = Self {
        color: BlendComponentDescriptor {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            operation: BlendOperation::Add,
        },
        alpha: BlendComponentDescriptor {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            operation: BlendOperation::Add,
        },
    };
}

drapery_bitflags! {
    /// A bitmask to enable or disable writes to individual color channels.
    pub struct ColorWrites: u8 {
        /// Enable writes to the Red channel.
        const R = 0b0001;
        /// Enable writes to the Green channel.
        const G = 0b0010;
        /// Enable writes to the Blue channel.
        const B = 0b0100;
        /// Enable writes to the Alpha channel.
        const A = 0b1000;
        /// Enable writes to all channels.
        const ALL = 0b1111;
    }
}

/// The full fixed-function configuration of one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderState {
    /// Which color channels are written.
    pub color_writes: ColorWrites,
    /// The depth test, or `None` to disable it.
    pub depth: Option<DepthState>,
    /// The stencil test, or `None` to disable it.
    pub stencil: Option<StencilState>,
    /// The blend state, or `None` to overwrite the target.
    pub blend: Option<BlendStateDescriptor>,
}

impl Default for RenderState {
    /// All color channels, no depth, no stencil, no blending.
    fn default() -> Self {
        Self {
            color_writes: ColorWrites::ALL,
            depth: None,
            stencil: None,
            blend: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_render_state_is_unrestricted() {
        let rs = RenderState::default();
        assert_eq!(rs.color_writes, ColorWrites::ALL);
        assert!(rs.depth.is_none() && rs.stencil.is_none() && rs.blend.is_none());
    }

    #[test]
    fn stencil_face_defaults_to_keep_always() {
        let face = StencilFaceState::default();
        assert_eq!(face.compare, CompareFunction::Always);
        assert_eq!(face.depth_pass_op, StencilOperation::Keep);
    }
}
