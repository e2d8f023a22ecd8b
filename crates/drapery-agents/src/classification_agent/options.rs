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

//! Construction inputs of a classification primitive.

use super::BatchTable;
use drapery_core::{
    math::{Aabb, Vec3},
    renderer::PickOwner,
};
use drapery_lanes::{BatchDescriptor, ClassificationSettings, IndexData};
use std::sync::Arc;

/// The flat arrays a [`ClassificationPrimitive`](super::ClassificationPrimitive) is
/// built from.
///
/// Per-mesh tables (`index_offsets`, `index_counts`, `bounding_volumes`) are indexed
/// like `mesh_ids`. The initial `batches` must partition the whole index array.
#[derive(Debug, Clone)]
pub struct ClassificationPrimitiveOptions {
    /// Vertex positions relative to `center`.
    pub positions: Vec<Vec3>,
    /// Mesh id of every vertex, fed to shaders as `a_batchId`.
    pub vertex_mesh_ids: Vec<u32>,
    /// The shared triangle index array.
    pub indices: IndexData,
    /// First index of every mesh.
    pub index_offsets: Vec<u32>,
    /// Index count of every mesh.
    pub index_counts: Vec<u32>,
    /// Initial runs of the index array.
    pub batches: Vec<BatchDescriptor>,
    /// World position the vertex positions are relative to.
    pub center: Vec3,
    /// Bounding volume of every mesh.
    pub bounding_volumes: Vec<Aabb>,
    /// Bounding volume of the whole primitive.
    pub bounding_volume: Aabb,
    /// Stable id of every mesh.
    pub mesh_ids: Vec<u32>,
    /// Opaque token identifying the primitive's owner in pick results.
    pub owner: PickOwner,
    /// Per-feature data provider.
    pub batch_table: Arc<dyn BatchTable>,
    /// Tunables.
    pub settings: ClassificationSettings,
}
