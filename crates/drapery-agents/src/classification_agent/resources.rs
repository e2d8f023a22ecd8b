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

//! One-time creation and release of a primitive's GPU resources.

use super::BatchTable;
use drapery_core::{
    math::Vec3,
    renderer::{
        BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, ResourceError, ShaderProgramDescriptor,
        ShaderProgramId, ShaderSource,
    },
};
use drapery_lanes::{shaders, ClassificationPrograms};
use std::borrow::Cow;

/// CPU geometry waiting for upload.
#[derive(Debug, Default)]
pub(crate) struct PendingGeometry {
    pub(crate) positions: Vec<Vec3>,
    pub(crate) vertex_mesh_ids: Vec<u32>,
}

/// Handles owned by a primitive once its resources exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GpuResources {
    pub(crate) positions: BufferId,
    pub(crate) mesh_ids: BufferId,
    pub(crate) programs: ClassificationPrograms,
}

/// Lazy lifecycle of the GPU resources. Moves from `Uninitialized` to `Ready` once.
#[derive(Debug)]
pub(crate) enum ResourceState {
    Uninitialized(PendingGeometry),
    Ready(GpuResources),
}

// Tracks what has been created so far so a failure can release it.
struct Created<'a> {
    device: &'a dyn GraphicsDevice,
    buffers: Vec<BufferId>,
    programs: Vec<ShaderProgramId>,
}

impl Created<'_> {
    fn rollback(self) {
        for id in self.buffers {
            if let Err(e) = self.device.destroy_buffer(id) {
                log::warn!("Failed to release buffer {id:?} after a setup error: {e}");
            }
        }
        for id in self.programs {
            if let Err(e) = self.device.release_program(id) {
                log::warn!("Failed to release program {id:?} after a setup error: {e}");
            }
        }
    }
}

/// Uploads the geometry and links the three programs. On failure everything created
/// so far is released.
pub(crate) fn create_resources(
    device: &dyn GraphicsDevice,
    geometry: &PendingGeometry,
    batch_table: &dyn BatchTable,
) -> Result<GpuResources, ResourceError> {
    let mut created = Created {
        device,
        buffers: Vec::new(),
        programs: Vec::new(),
    };
    match create_all(&mut created, geometry, batch_table) {
        Ok(resources) => Ok(resources),
        Err(err) => {
            created.rollback();
            Err(err)
        }
    }
}

fn create_all(
    created: &mut Created<'_>,
    geometry: &PendingGeometry,
    batch_table: &dyn BatchTable,
) -> Result<GpuResources, ResourceError> {
    let device = created.device;

    let position_bytes: &[u8] = bytemuck::cast_slice(&geometry.positions);
    let positions = device.create_buffer_with_data(
        &BufferDescriptor {
            label: Some(Cow::Borrowed("classification_positions")),
            size: position_bytes.len() as u64,
            usage: BufferUsage::VERTEX,
        },
        position_bytes,
    )?;
    created.buffers.push(positions);

    // Matches the `Float32` format the vertex stage declares for `a_batchId`.
    let float_ids: Vec<f32> = geometry.vertex_mesh_ids.iter().map(|&id| id as f32).collect();
    let id_bytes: &[u8] = bytemuck::cast_slice(&float_ids);
    let mesh_ids = device.create_buffer_with_data(
        &BufferDescriptor {
            label: Some(Cow::Borrowed("classification_mesh_ids")),
            size: id_bytes.len() as u64,
            usage: BufferUsage::VERTEX,
        },
        id_bytes,
    )?;
    created.buffers.push(mesh_ids);

    let vs = || ShaderSource::new(shaders::CLASSIFICATION_VS);
    let fs = || ShaderSource::new(shaders::CLASSIFICATION_FS).with_define(shaders::VECTOR_TILE_DEFINE);

    let mut link = |label: &'static str, vertex: ShaderSource, fragment: ShaderSource| {
        let id = device.get_or_create_program(&ShaderProgramDescriptor {
            label: Some(label),
            vertex,
            fragment,
            attributes: shaders::ATTRIBUTES,
        })?;
        created.programs.push(id);
        Ok::<_, ResourceError>(id)
    };

    let color = link(
        "classification_color",
        batch_table.vertex_shader(vs()),
        batch_table.fragment_shader(fs()),
    )?;
    let stencil = link("classification_stencil", vs(), fs())?;
    let pick = link(
        "classification_pick",
        batch_table.pick_vertex_shader(vs()),
        batch_table.pick_fragment_shader(
            ShaderSource::new(shaders::CLASSIFICATION_PICK_FS).with_define(shaders::VECTOR_TILE_DEFINE),
        ),
    )?;

    Ok(GpuResources {
        positions,
        mesh_ids,
        programs: ClassificationPrograms {
            color,
            stencil,
            pick,
        },
    })
}

/// Releases buffers and programs, attempting every release and returning the first error.
pub(crate) fn release_resources(
    device: &dyn GraphicsDevice,
    resources: GpuResources,
) -> Result<(), ResourceError> {
    let results = [
        device.destroy_buffer(resources.positions),
        device.destroy_buffer(resources.mesh_ids),
        device.release_program(resources.programs.color),
        device.release_program(resources.programs.stencil),
        device.release_program(resources.programs.pick),
    ];
    results.into_iter().collect()
}
