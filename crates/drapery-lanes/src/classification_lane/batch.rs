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

//! Batch descriptors: contiguous runs of the shared index buffer drawn with one color.

use ahash::AHashSet;
use drapery_core::math::LinearRgba;

/// One contiguous run of the shared index buffer sharing a single color.
///
/// Colors are compared through their packed RGBA8 key, so two descriptors whose
/// float colors differ below 8-bit precision are treated as the same color.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDescriptor {
    /// The color every mesh in the run is drawn with.
    pub color: LinearRgba,
    /// First index of the run, in elements.
    pub offset: u32,
    /// Number of indices in the run.
    pub count: u32,
    /// The meshes whose triangles make up the run, in buffer order.
    pub mesh_ids: Vec<u32>,
}

impl BatchDescriptor {
    /// Creates a descriptor.
    pub fn new(color: LinearRgba, offset: u32, count: u32, mesh_ids: Vec<u32>) -> Self {
        Self {
            color,
            offset,
            count,
            mesh_ids,
        }
    }

    /// The packed RGBA8 key colors are compared and sorted by.
    #[inline]
    pub fn color_key(&self) -> u32 {
        self.color.to_packed()
    }

    /// Returns `true` if both descriptors draw with the same packed color.
    #[inline]
    pub fn same_color(&self, other: &BatchDescriptor) -> bool {
        self.color_key() == other.color_key()
    }

    /// One past the last index of the run.
    #[inline]
    pub fn end(&self) -> u32 {
        self.offset + self.count
    }

    /// Returns `true` if `mesh_id` is one of the run's members.
    ///
    /// Membership, not offset, identifies a mesh's run: a mesh with no indices occupies
    /// no offset of any run.
    #[inline]
    pub fn contains_mesh(&self, mesh_id: u32) -> bool {
        self.mesh_ids.contains(&mesh_id)
    }
}

/// Returns `true` if at least two descriptors share a packed color, which is the only
/// condition under which consolidating runs reduces the number of draws.
pub fn needs_rebatch(batches: &[BatchDescriptor]) -> bool {
    let mut seen = AHashSet::with_capacity(batches.len());
    batches.iter().any(|batch| !seen.insert(batch.color_key()))
}

/// Returns `true` if the descriptors' ranges cover `[0, total)` with no gap and no overlap.
pub fn is_partition(batches: &[BatchDescriptor], total: u32) -> bool {
    let mut ranges: Vec<(u32, u32)> = batches.iter().map(|b| (b.offset, b.end())).collect();
    ranges.sort_unstable();

    let mut cursor = 0;
    for (start, end) in ranges {
        if start != cursor || end < start {
            return false;
        }
        cursor = end;
    }
    cursor == total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(color: LinearRgba, offset: u32, count: u32) -> BatchDescriptor {
        BatchDescriptor::new(color, offset, count, vec![offset])
    }

    #[test]
    fn duplicate_colors_require_rebatch() {
        let distinct = [batch(LinearRgba::RED, 0, 3), batch(LinearRgba::BLUE, 3, 3)];
        assert!(!needs_rebatch(&distinct));

        let duplicated = [
            batch(LinearRgba::RED, 0, 3),
            batch(LinearRgba::BLUE, 3, 3),
            batch(LinearRgba::RED, 6, 3),
        ];
        assert!(needs_rebatch(&duplicated));
    }

    #[test]
    fn colors_compare_through_packed_key() {
        let a = batch(LinearRgba::new(0.5, 0.5, 0.5, 1.0), 0, 3);
        let b = batch(LinearRgba::new(0.5001, 0.5, 0.5, 1.0), 3, 3);
        assert!(a.same_color(&b));
        assert!(needs_rebatch(&[a, b]));
    }

    #[test]
    fn partition_detection() {
        let ok = [batch(LinearRgba::RED, 3, 6), batch(LinearRgba::BLUE, 0, 3)];
        assert!(is_partition(&ok, 9));
        assert!(!is_partition(&ok, 12));

        let gap = [batch(LinearRgba::RED, 0, 3), batch(LinearRgba::BLUE, 6, 3)];
        assert!(!is_partition(&gap, 9));

        let overlap = [batch(LinearRgba::RED, 0, 6), batch(LinearRgba::BLUE, 3, 6)];
        assert!(!is_partition(&overlap, 9));
    }

    #[test]
    fn membership_ignores_ranges() {
        let empty = BatchDescriptor::new(LinearRgba::RED, 9, 0, vec![4]);
        assert!(empty.contains_mesh(4));
        assert!(!empty.contains_mesh(5));
        assert_eq!(empty.end(), 9);

        let full = BatchDescriptor::new(LinearRgba::BLUE, 0, 9, vec![0, 1, 2]);
        assert!(is_partition(&[full, empty], 9));
    }
}
