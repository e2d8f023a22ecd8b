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

//! The host collaborator that owns per-feature data on the GPU.

use drapery_core::renderer::{ShaderSource, UniformMap};
use std::fmt::Debug;

/// Per-feature data (color, visibility, pick color) stored by the host and exposed to
/// shaders.
///
/// The primitive never reads feature data itself. It lets the batch table rewrite its
/// shader sources so they look the data up by `a_batchId`, and extend its uniform maps
/// with whatever bindings those lookups need.
pub trait BatchTable: Debug + Send + Sync {
    /// Rewrites the vertex stage of the color program.
    fn vertex_shader(&self, source: ShaderSource) -> ShaderSource;

    /// Rewrites the fragment stage of the color program.
    fn fragment_shader(&self, source: ShaderSource) -> ShaderSource;

    /// Rewrites the vertex stage of the pick program.
    fn pick_vertex_shader(&self, source: ShaderSource) -> ShaderSource;

    /// Rewrites the fragment stage of the pick program.
    fn pick_fragment_shader(&self, source: ShaderSource) -> ShaderSource;

    /// Extends the primitive's uniforms for color commands. Called whenever the color
    /// commands are rebuilt.
    fn uniform_map(&self, base: UniformMap) -> UniformMap;

    /// Extends the primitive's uniforms for pick commands. Called whenever the pick
    /// commands are rebuilt.
    fn pick_uniform_map(&self, base: UniformMap) -> UniformMap;
}
