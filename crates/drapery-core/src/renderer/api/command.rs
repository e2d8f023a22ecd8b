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

//! Draw commands produced by the classification lanes and consumed by a host renderer.
//!
//! A [`DrawCommand`] is a self-contained description of one indexed draw: which
//! buffers, which program, which fixed-function state, which index range and which
//! render pass it belongs to. Commands are plain values; the host's render queue is a
//! `Vec<DrawCommand>` that commands are cloned into every frame.

use super::{
    buffer::{BufferId, IndexFormat},
    pipeline::{PrimitiveTopology, RenderState},
    shader::ShaderProgramId,
};
use crate::math::{Aabb, LinearRgba, Mat4};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The render pass a command is executed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pass {
    /// Classification of terrain.
    TerrainClassification,
    /// Classification of tiled 3D geometry.
    TileClassification,
    /// Stencil-only classification of tiled geometry whose features are hidden, used
    /// when the host renders inverted classification.
    TileClassificationIgnoreShow,
}

/// Which kinds of underlying geometry a classification primitive drapes onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClassificationType {
    /// Terrain only.
    Terrain,
    /// Tiled 3D geometry only.
    Tile,
    /// Both terrain and tiled geometry.
    #[default]
    Both,
}

impl ClassificationType {
    /// Returns `true` if commands must be queued to the terrain pass.
    #[inline]
    pub fn classifies_terrain(&self) -> bool {
        !matches!(self, ClassificationType::Tile)
    }

    /// Returns `true` if commands must be queued to the tile pass.
    #[inline]
    pub fn classifies_tiles(&self) -> bool {
        !matches!(self, ClassificationType::Terrain)
    }
}

/// An opaque token identifying who owns a command or a feature, used by picking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PickOwner(pub u64);

/// The buffers a classification draw reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArray {
    /// Vertex positions, relative to the primitive's center.
    pub positions: BufferId,
    /// Per-vertex mesh id tags.
    pub mesh_ids: BufferId,
    /// The index buffer the command's `offset`/`count` refer to.
    pub index_buffer: BufferId,
    /// The element width of `index_buffer`.
    pub index_format: IndexFormat,
}

/// A value produced by a uniform binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// A 4x4 matrix.
    Mat4(Mat4),
    /// A color.
    Color(LinearRgba),
    /// A scalar.
    Float(f32),
}

/// A deferred uniform: evaluated by the host when the command is executed, so it always
/// sees the latest frame's state.
pub type UniformFn = Arc<dyn Fn() -> UniformValue + Send + Sync>;

/// Named uniform bindings shared by a set of draw commands.
///
/// Cloning is cheap; the bindings themselves are reference counted. Two maps compare
/// equal when they bind the same names to the very same closures.
#[derive(Clone, Default)]
pub struct UniformMap {
    entries: BTreeMap<Cow<'static, str>, UniformFn>,
}

impl UniformMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `binding`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<Cow<'static, str>>, binding: UniformFn) {
        self.entries.insert(name.into(), binding);
    }

    /// Builder-style [`UniformMap::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<Cow<'static, str>>, binding: UniformFn) -> Self {
        self.insert(name, binding);
        self
    }

    /// Evaluates the binding for `name`, if any.
    pub fn evaluate(&self, name: &str) -> Option<UniformValue> {
        self.entries.get(name).map(|binding| binding())
    }

    /// Returns `true` if `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterates over the bound names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_ref())
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for UniformMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && Arc::ptr_eq(va, vb))
    }
}

impl fmt::Debug for UniformMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// One indexed draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// Who issued the command.
    pub owner: PickOwner,
    /// The buffers to draw from.
    pub vertex_array: VertexArray,
    /// How the indices are assembled.
    pub primitive_topology: PrimitiveTopology,
    /// Fixed-function state.
    pub render_state: RenderState,
    /// The linked program.
    pub shader_program: ShaderProgramId,
    /// Uniform bindings.
    pub uniform_map: UniformMap,
    /// First index, in elements.
    pub offset: u32,
    /// Number of indices.
    pub count: u32,
    /// Model transform; vertices are already relative to center so this stays identity.
    pub model_matrix: Mat4,
    /// Bounding volume used for culling.
    pub bounding_volume: Aabb,
    /// Whether the host may frustum-cull the command.
    pub cull: bool,
    /// The render pass.
    pub pass: Pass,
    /// Name of the varying that carries the pick color, for pick commands.
    pub pick_id: Option<Cow<'static, str>>,
}
