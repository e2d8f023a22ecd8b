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

//! Built-in shader sources for classification volumes.
//!
//! The sources are deliberately minimal: the host's batch table rewrites them to add
//! per-feature color, visibility and pick color lookups keyed by `a_batchId`.
//!
//! - [`CLASSIFICATION_VS`] - Transforms center-relative positions by the modified MVP.
//! - [`CLASSIFICATION_FS`] - Writes the highlight color.
//! - [`CLASSIFICATION_PICK_FS`] - Writes the pick color varying.

use drapery_core::renderer::{VertexAttributeDescriptor, VertexFormat};

/// Vertex stage shared by every classification program.
pub const CLASSIFICATION_VS: &str = include_str!("classification.vert");

/// Color fragment stage.
pub const CLASSIFICATION_FS: &str = include_str!("classification.frag");

/// Pick fragment stage; reads [`PICK_COLOR_VARYING`](super::PICK_COLOR_VARYING).
pub const CLASSIFICATION_PICK_FS: &str = include_str!("classification_pick.frag");

/// Define added to the fragment stage of every classification program.
pub const VECTOR_TILE_DEFINE: &str = "VECTOR_TILE";

/// Relative-to-center model-view-projection uniform.
pub const MODIFIED_MVP_UNIFORM: &str = "u_modifiedModelViewProjection";

/// Debug highlight color uniform.
pub const HIGHLIGHT_COLOR_UNIFORM: &str = "u_highlightColor";

/// Attributes of the classification vertex stage. Mesh ids are uploaded as floats, so
/// ids stay exact up to 2^24.
pub const ATTRIBUTES: &[VertexAttributeDescriptor] = &[
    VertexAttributeDescriptor {
        name: "position",
        shader_location: 0,
        format: VertexFormat::Float32x3,
    },
    VertexAttributeDescriptor {
        name: "a_batchId",
        shader_location: 1,
        format: VertexFormat::Float32,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_reference_bound_attributes_and_uniforms() {
        for attribute in ATTRIBUTES {
            assert!(CLASSIFICATION_VS.contains(attribute.name));
        }
        assert!(CLASSIFICATION_VS.contains("in float a_batchId"));
        assert!(CLASSIFICATION_VS.contains("in vec3 position"));
        assert!(CLASSIFICATION_VS.contains(MODIFIED_MVP_UNIFORM));
        assert!(CLASSIFICATION_FS.contains(HIGHLIGHT_COLOR_UNIFORM));
        assert!(CLASSIFICATION_PICK_FS.contains(super::super::PICK_COLOR_VARYING));
    }
}
