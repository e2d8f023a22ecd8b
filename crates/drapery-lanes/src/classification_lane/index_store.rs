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

//! The shared index buffer and the per-mesh tables pointing into it.

use ahash::AHashMap;
use drapery_core::renderer::{
    BufferDescriptor, BufferFactory, BufferId, BufferUsage, IndexFormat, ResourceError,
};
use std::borrow::Cow;

/// CPU-resident triangle indices in one of the two supported widths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexData {
    /// 16-bit indices.
    U16(Vec<u16>),
    /// 32-bit indices.
    U32(Vec<u32>),
}

impl IndexData {
    /// Number of indices.
    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(v) => v.len(),
            IndexData::U32(v) => v.len(),
        }
    }

    /// Returns `true` if there are no indices.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element width.
    pub fn format(&self) -> IndexFormat {
        match self {
            IndexData::U16(_) => IndexFormat::Uint16,
            IndexData::U32(_) => IndexFormat::Uint32,
        }
    }

    /// Raw bytes, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(v) => bytemuck::cast_slice(v),
            IndexData::U32(v) => bytemuck::cast_slice(v),
        }
    }

    /// A zeroed array of the same width and length.
    pub fn zeroed_like(&self) -> Self {
        match self {
            IndexData::U16(v) => IndexData::U16(vec![0; v.len()]),
            IndexData::U32(v) => IndexData::U32(vec![0; v.len()]),
        }
    }

    /// Reads `count` indices starting at `offset`, widened to `u32`.
    pub fn range_u32(&self, offset: u32, count: u32) -> Vec<u32> {
        let range = offset as usize..(offset + count) as usize;
        match self {
            IndexData::U16(v) => v[range].iter().map(|&i| i as u32).collect(),
            IndexData::U32(v) => v[range].to_vec(),
        }
    }

    /// Copies `count` indices from `source[source_offset..]` into `self[offset..]`.
    ///
    /// # Panics
    ///
    /// Panics if either range is out of bounds or the widths differ.
    fn copy_within_from(&mut self, source: &IndexData, source_offset: u32, offset: u32, count: u32) {
        let src = source_offset as usize..(source_offset + count) as usize;
        let dst = offset as usize..(offset + count) as usize;
        match (self, source) {
            (IndexData::U16(d), IndexData::U16(s)) => d[dst].copy_from_slice(&s[src]),
            (IndexData::U32(d), IndexData::U32(s)) => d[dst].copy_from_slice(&s[src]),
            _ => panic!("index width mismatch between source and destination"),
        }
    }
}

/// Maps stable mesh ids to positions in the offset/count tables.
#[derive(Debug, Clone)]
pub enum MeshLookup {
    /// Direct-indexed table, used when ids are small and mostly contiguous.
    Dense(Vec<Option<u32>>),
    /// Hash map for sparse or very large ids.
    Sparse(AHashMap<u32, u32>),
}

impl MeshLookup {
    /// Builds the lookup for `mesh_ids`, where `mesh_ids[i]` lives at table index `i`.
    ///
    /// A dense table is used when the largest id is at most twice the mesh count.
    pub fn build(mesh_ids: &[u32]) -> Self {
        let max_id = mesh_ids.iter().copied().max().unwrap_or(0) as usize;
        if max_id <= mesh_ids.len().saturating_mul(2) {
            let mut table = vec![None; max_id + 1];
            for (index, &id) in mesh_ids.iter().enumerate() {
                table[id as usize] = Some(index as u32);
            }
            MeshLookup::Dense(table)
        } else {
            MeshLookup::Sparse(
                mesh_ids
                    .iter()
                    .enumerate()
                    .map(|(index, &id)| (id, index as u32))
                    .collect(),
            )
        }
    }

    /// Returns the table index of `mesh_id`, if known.
    #[inline]
    pub fn get(&self, mesh_id: u32) -> Option<usize> {
        match self {
            MeshLookup::Dense(table) => table.get(mesh_id as usize).copied().flatten(),
            MeshLookup::Sparse(map) => map.get(&mesh_id).copied(),
        }
        .map(|i| i as usize)
    }

    /// Returns `true` for the direct-indexed representation.
    pub fn is_dense(&self) -> bool {
        matches!(self, MeshLookup::Dense(_))
    }
}

/// The GPU side of the index store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBuffers {
    /// The buffer draws read from.
    pub active: BufferId,
    /// The swap target of device copies. Present only when the device can copy buffers.
    pub secondary: Option<BufferId>,
}

/// Owns the shared index buffer of a classification primitive and the per-mesh
/// offset/count tables into it.
///
/// The tables are always kept pointing at each mesh's current triangles, however many
/// times the buffer contents have been reshuffled by rebatching.
#[derive(Debug)]
pub struct IndexStore {
    // CPU copy of the indices. Dropped once uploaded when device copies are used.
    indices: Option<IndexData>,
    format: IndexFormat,
    len: u32,
    offsets: Vec<u32>,
    counts: Vec<u32>,
    lookup: MeshLookup,
    buffers: Option<IndexBuffers>,
}

impl IndexStore {
    /// Creates a store from the flat construction arrays.
    ///
    /// `offsets[i]`, `counts[i]` describe the mesh `mesh_ids[i]`.
    ///
    /// # Panics
    ///
    /// Panics if the tables have different lengths or a range exceeds `indices`.
    pub fn new(indices: IndexData, offsets: Vec<u32>, counts: Vec<u32>, mesh_ids: &[u32]) -> Self {
        assert_eq!(offsets.len(), counts.len(), "offset and count tables differ in length");
        assert_eq!(offsets.len(), mesh_ids.len(), "mesh id table differs in length");
        let len = indices.len() as u32;
        assert!(
            offsets.iter().zip(&counts).all(|(o, c)| o + c <= len),
            "mesh index range exceeds the index buffer"
        );

        Self {
            format: indices.format(),
            indices: Some(indices),
            len,
            offsets,
            counts,
            lookup: MeshLookup::build(mesh_ids),
            buffers: None,
        }
    }

    /// Total number of indices.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Returns `true` if the store holds no indices.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The element width of the buffer.
    pub fn format(&self) -> IndexFormat {
        self.format
    }

    /// Number of meshes in the tables.
    pub fn mesh_count(&self) -> usize {
        self.offsets.len()
    }

    /// The id lookup.
    pub fn lookup(&self) -> &MeshLookup {
        &self.lookup
    }

    /// Table index of `mesh_id`, or `None` for an unknown id.
    pub fn table_index(&self, mesh_id: u32) -> Option<usize> {
        self.lookup.get(mesh_id)
    }

    /// Current `(offset, count)` of the mesh at `table_index`.
    pub fn range(&self, table_index: usize) -> (u32, u32) {
        (self.offsets[table_index], self.counts[table_index])
    }

    /// Current offset of every mesh, by table index.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Index count of every mesh, by table index.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// The CPU indices, when still resident.
    pub fn cpu_indices(&self) -> Option<&IndexData> {
        self.indices.as_ref()
    }

    /// The GPU buffers, once created.
    pub fn buffers(&self) -> Option<IndexBuffers> {
        self.buffers
    }

    /// Returns `true` if rebatching copies on the device instead of on the CPU.
    pub fn uses_device_copy(&self) -> bool {
        matches!(self.buffers, Some(IndexBuffers { secondary: Some(_), .. }))
    }

    /// Uploads the indices to the device.
    ///
    /// With `device_copy` set and a device that supports buffer copies, a second buffer
    /// of identical size is created for ping-pong rebatching and the CPU copy is dropped.
    pub fn create_buffers<D: BufferFactory + ?Sized>(
        &mut self,
        device: &D,
        device_copy: bool,
    ) -> Result<IndexBuffers, ResourceError> {
        if let Some(buffers) = self.buffers {
            return Ok(buffers);
        }
        let Some(indices) = self.indices.as_ref() else {
            return Err(ResourceError::NotFound);
        };

        let size = u64::from(self.len) * self.format.size();
        let usage = BufferUsage::INDEX | BufferUsage::COPY_SRC | BufferUsage::COPY_DST;
        let active = device.create_buffer_with_data(
            &BufferDescriptor {
                label: Some(Cow::Borrowed("classification_indices")),
                size,
                usage,
            },
            indices.as_bytes(),
        )?;

        let secondary = if device_copy && device.supports_buffer_copy() {
            match device.create_buffer(&BufferDescriptor {
                label: Some(Cow::Borrowed("classification_indices_swap")),
                size,
                usage,
            }) {
                Ok(id) => Some(id),
                Err(err) => {
                    device.destroy_buffer(active)?;
                    return Err(err);
                }
            }
        } else {
            None
        };

        if secondary.is_some() {
            self.indices = None;
        }

        let buffers = IndexBuffers { active, secondary };
        self.buffers = Some(buffers);
        Ok(buffers)
    }

    /// Destroys the GPU buffers, if any.
    pub fn destroy_buffers<D: BufferFactory + ?Sized>(
        &mut self,
        device: &D,
    ) -> Result<(), ResourceError> {
        if let Some(buffers) = self.buffers.take() {
            device.destroy_buffer(buffers.active)?;
            if let Some(secondary) = buffers.secondary {
                device.destroy_buffer(secondary)?;
            }
        }
        Ok(())
    }

    /// Appends the triangles of `mesh_ids` into `destination` starting at `offset`,
    /// rewriting each mesh's table offset. Returns the offset after the last copy.
    ///
    /// # Panics
    ///
    /// Panics if the CPU indices are not resident, a mesh id is unknown or a range is
    /// out of bounds.
    pub fn copy_mesh_indices_cpu(
        &mut self,
        destination: &mut IndexData,
        mesh_ids: &[u32],
        mut offset: u32,
    ) -> u32 {
        let Some(source) = self.indices.as_ref() else {
            panic!("CPU index copy requested without resident CPU indices");
        };

        for &id in mesh_ids {
            let index = self.lookup.get(id).unwrap_or_else(|| panic!("unknown mesh id {id}"));
            let count = self.counts[index];
            destination.copy_within_from(source, self.offsets[index], offset, count);
            self.offsets[index] = offset;
            offset += count;
        }
        offset
    }

    /// Enqueues device copies of the triangles of `mesh_ids` from the active buffer into
    /// the secondary one starting at `offset`, rewriting each mesh's table offset.
    /// Returns the offset after the last copy.
    ///
    /// # Panics
    ///
    /// Panics if the store is not in device-copy mode, a mesh id is unknown or a range
    /// lies outside the buffer.
    pub fn copy_mesh_indices_device<D: BufferFactory + ?Sized>(
        &mut self,
        device: &D,
        mesh_ids: &[u32],
        mut offset: u32,
    ) -> Result<u32, ResourceError> {
        let Some(IndexBuffers {
            active,
            secondary: Some(secondary),
        }) = self.buffers
        else {
            panic!("device index copy requested without a swap buffer");
        };
        let element = self.format.size();

        for &id in mesh_ids {
            let index = self.lookup.get(id).unwrap_or_else(|| panic!("unknown mesh id {id}"));
            let count = self.counts[index];
            assert!(offset + count <= self.len, "device copy exceeds the index buffer");
            device.copy_buffer_to_buffer(
                active,
                u64::from(self.offsets[index]) * element,
                secondary,
                u64::from(offset) * element,
                u64::from(count) * element,
            )?;
            self.offsets[index] = offset;
            offset += count;
        }
        Ok(offset)
    }

    /// Replaces the CPU indices with a rebatched array and uploads it wholesale.
    pub fn commit_cpu<D: BufferFactory + ?Sized>(
        &mut self,
        device: &D,
        indices: IndexData,
    ) -> Result<(), ResourceError> {
        assert_eq!(indices.len() as u32, self.len, "rebatched index array changed length");
        if let Some(buffers) = self.buffers {
            device.write_buffer(buffers.active, 0, indices.as_bytes())?;
        }
        self.indices = Some(indices);
        Ok(())
    }

    /// Swaps the active and secondary buffers after a device rebatch.
    pub fn swap_buffers(&mut self) {
        if let Some(IndexBuffers {
            active,
            secondary: Some(secondary),
        }) = self.buffers
        {
            self.buffers = Some(IndexBuffers {
                active: secondary,
                secondary: Some(active),
            });
        }
    }

    pub(crate) fn offsets_snapshot(&self) -> Vec<u32> {
        self.offsets.clone()
    }

    pub(crate) fn restore_offsets(&mut self, offsets: Vec<u32>) {
        debug_assert_eq!(offsets.len(), self.offsets.len());
        self.offsets = offsets;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification_lane::test_device::TestDevice;

    fn store() -> IndexStore {
        // Three meshes of one triangle each, ids 10, 11, 12.
        IndexStore::new(
            IndexData::U16(vec![0, 1, 2, 3, 4, 5, 6, 7, 8]),
            vec![0, 3, 6],
            vec![3, 3, 3],
            &[10, 11, 12],
        )
    }

    #[test]
    fn lookup_picks_dense_or_sparse() {
        let dense = MeshLookup::build(&[0, 1, 2, 5]);
        assert!(dense.is_dense());
        assert_eq!(dense.get(5), Some(3));
        assert_eq!(dense.get(3), None);
        assert_eq!(dense.get(100), None);

        let sparse = MeshLookup::build(&[7, 1_000_000]);
        assert!(!sparse.is_dense());
        assert_eq!(sparse.get(1_000_000), Some(1));
        assert_eq!(sparse.get(8), None);
    }

    #[test]
    fn cpu_copy_moves_ranges_and_updates_offsets() {
        let mut store = store();
        let mut destination = store.cpu_indices().map(IndexData::zeroed_like).unwrap();

        let end = store.copy_mesh_indices_cpu(&mut destination, &[12, 10], 0);
        assert_eq!(end, 6);
        let end = store.copy_mesh_indices_cpu(&mut destination, &[11], end);
        assert_eq!(end, 9);

        assert_eq!(destination, IndexData::U16(vec![6, 7, 8, 0, 1, 2, 3, 4, 5]));
        assert_eq!(store.offsets(), &[3, 6, 0]);
        assert_eq!(destination.range_u32(store.range(2).0, 3), vec![6, 7, 8]);
    }

    #[test]
    fn device_mode_drops_cpu_copy_and_swaps() {
        let device = TestDevice::new(true);
        let mut store = store();
        let buffers = store.create_buffers(&device, true).unwrap();
        assert!(store.uses_device_copy());
        assert!(store.cpu_indices().is_none());
        let secondary = buffers.secondary.unwrap();

        let end = store.copy_mesh_indices_device(&device, &[11, 12, 10], 0).unwrap();
        assert_eq!(end, 9);
        assert_eq!(device.copy_count(), 3);
        store.swap_buffers();
        assert_eq!(store.buffers().unwrap().active, secondary);
        assert_eq!(
            device.read_u16(secondary),
            vec![3, 4, 5, 6, 7, 8, 0, 1, 2]
        );
        assert_eq!(store.offsets(), &[6, 0, 3]);
    }

    #[test]
    fn cpu_mode_without_device_copy_support() {
        let device = TestDevice::new(false);
        let mut store = store();
        let buffers = store.create_buffers(&device, true).unwrap();
        assert!(buffers.secondary.is_none());
        assert!(!store.uses_device_copy());
        assert!(store.cpu_indices().is_some());
        assert_eq!(device.live_buffers(), 1);

        store.destroy_buffers(&device).unwrap();
        assert_eq!(device.live_buffers(), 0);
    }
}
