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

//! Throttled consolidation of batch descriptors into color-sorted contiguous runs.

use super::{needs_rebatch, BatchDescriptor, IndexStore};
use drapery_core::renderer::{BufferFactory, ResourceError};

/// How the index data was moved during a rebatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Copied into a fresh CPU array, then uploaded wholesale.
    Cpu,
    /// Copied buffer-to-buffer into the swap buffer, then swapped.
    Device,
}

/// The result of one [`Rebatcher::rebatch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebatchOutcome {
    /// No two descriptors share a color; nothing to consolidate.
    Clean,
    /// A rebatch is pending but was throttled this frame.
    Deferred {
        /// Frames the pending rebatch has now been deferred.
        stale_frames: u32,
    },
    /// The descriptors were consolidated.
    Rebatched {
        /// Number of runs after consolidation.
        runs: usize,
        /// How the indices were moved.
        mode: CopyMode,
    },
}

/// Consolidates descriptors sharing a color into single contiguous runs.
///
/// Rebatching reshuffles the whole index buffer, so it is throttled: a pending rebatch
/// is deferred on every call until the `max_stale_frames`-th call since it became
/// pending, which performs it. A forced call performs it immediately.
#[derive(Debug, Clone)]
pub struct Rebatcher {
    max_stale_frames: u32,
    stale_frames: u32,
}

impl Rebatcher {
    /// Creates a rebatcher that rebatches on the `max_stale_frames`-th pending call.
    pub fn new(max_stale_frames: u32) -> Self {
        Self {
            max_stale_frames,
            stale_frames: 0,
        }
    }

    /// Frames the current pending rebatch has been deferred.
    pub fn stale_frames(&self) -> u32 {
        self.stale_frames
    }

    /// The deferral cap.
    pub fn max_stale_frames(&self) -> u32 {
        self.max_stale_frames
    }

    /// Forgets a pending rebatch, e.g. after the descriptors were replaced wholesale.
    pub fn reset(&mut self) {
        self.stale_frames = 0;
    }

    /// Consolidates `batches`, moving the indices in `store` accordingly.
    ///
    /// The descriptors are stably sorted by packed color, descending, and every
    /// descriptor's meshes are copied in that order, so equal colors end up adjacent and
    /// are folded into one run. On error the descriptors and the store's offset table are
    /// left untouched.
    ///
    /// # Panics
    ///
    /// Panics if the descriptors do not reference every index of the store exactly once.
    pub fn rebatch<D: BufferFactory + ?Sized>(
        &mut self,
        device: &D,
        store: &mut IndexStore,
        batches: &mut Vec<BatchDescriptor>,
        force: bool,
    ) -> Result<RebatchOutcome, ResourceError> {
        if !needs_rebatch(batches) {
            self.stale_frames = 0;
            return Ok(RebatchOutcome::Clean);
        }

        if !force {
            self.stale_frames += 1;
        }
        if !force && self.stale_frames < self.max_stale_frames {
            log::trace!(
                "Deferring classification rebatch ({}/{})",
                self.stale_frames,
                self.max_stale_frames
            );
            return Ok(RebatchOutcome::Deferred {
                stale_frames: self.stale_frames,
            });
        }

        let mode = if store.uses_device_copy() {
            CopyMode::Device
        } else {
            CopyMode::Cpu
        };

        let original = batches.clone();
        let saved_offsets = store.offsets_snapshot();
        match consolidate(device, store, std::mem::take(batches), mode) {
            Ok(runs) => {
                log::debug!(
                    "Rebatched {} descriptors into {} runs ({:?} copy, {} stale frames)",
                    original.len(),
                    runs.len(),
                    mode,
                    self.stale_frames
                );
                *batches = runs;
                self.stale_frames = 0;
                Ok(RebatchOutcome::Rebatched {
                    runs: batches.len(),
                    mode,
                })
            }
            Err(err) => {
                store.restore_offsets(saved_offsets);
                *batches = original;
                Err(err)
            }
        }
    }
}

fn consolidate<D: BufferFactory + ?Sized>(
    device: &D,
    store: &mut IndexStore,
    mut sorted: Vec<BatchDescriptor>,
    mode: CopyMode,
) -> Result<Vec<BatchDescriptor>, ResourceError> {
    sorted.sort_by(|a, b| b.color_key().cmp(&a.color_key()));

    let mut destination = match mode {
        CopyMode::Cpu => match store.cpu_indices() {
            Some(indices) => Some(indices.zeroed_like()),
            None => panic!("CPU rebatch requested without resident CPU indices"),
        },
        CopyMode::Device => None,
    };

    let mut runs: Vec<BatchDescriptor> = Vec::with_capacity(sorted.len());
    let mut offset = 0;
    for next in sorted {
        let start = offset;
        offset = match destination.as_mut() {
            Some(destination) => store.copy_mesh_indices_cpu(destination, &next.mesh_ids, offset),
            None => store.copy_mesh_indices_device(device, &next.mesh_ids, offset)?,
        };

        match runs.last_mut() {
            Some(current) if current.same_color(&next) => {
                current.mesh_ids.extend(next.mesh_ids);
                current.count = offset - current.offset;
            }
            _ => runs.push(BatchDescriptor {
                offset: start,
                count: offset - start,
                ..next
            }),
        }
    }
    assert_eq!(offset, store.len(), "descriptors do not cover the index buffer");

    match destination {
        Some(indices) => store.commit_cpu(device, indices)?,
        None => store.swap_buffers(),
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification_lane::{is_partition, test_device::TestDevice, IndexData};
    use drapery_core::math::LinearRgba;

    // Four meshes of one triangle each, ids 0..4, every mesh in its own descriptor.
    fn fixture(colors: [LinearRgba; 4]) -> (IndexStore, Vec<BatchDescriptor>) {
        fixture_with(IndexData::U16((0..12).collect()), colors)
    }

    // Vertex indices past u16::MAX so that truncated copies show up.
    const WIDE_BASE: u32 = 70_000;

    fn wide_indices() -> IndexData {
        IndexData::U32((WIDE_BASE..WIDE_BASE + 12).collect())
    }

    fn fixture_with(
        indices: IndexData,
        colors: [LinearRgba; 4],
    ) -> (IndexStore, Vec<BatchDescriptor>) {
        let store = IndexStore::new(
            indices,
            vec![0, 3, 6, 9],
            vec![3; 4],
            &[0, 1, 2, 3],
        );
        let batches = colors
            .iter()
            .enumerate()
            .map(|(i, &c)| BatchDescriptor::new(c, i as u32 * 3, 3, vec![i as u32]))
            .collect();
        (store, batches)
    }

    fn assert_meshes_intact(store: &IndexStore, indices: &IndexData) {
        assert_meshes_intact_from(store, indices, 0);
    }

    fn assert_meshes_intact_from(store: &IndexStore, indices: &IndexData, base: u32) {
        for mesh in 0..store.mesh_count() {
            let (offset, count) = store.range(mesh);
            let first = base + mesh as u32 * 3;
            let expected: Vec<u32> = (first..first + 3).collect();
            assert_eq!(indices.range_u32(offset, count), expected);
        }
    }

    #[test]
    fn distinct_colors_are_clean() {
        let device = TestDevice::new(false);
        let (mut store, mut batches) = fixture([
            LinearRgba::RED,
            LinearRgba::GREEN,
            LinearRgba::BLUE,
            LinearRgba::WHITE,
        ]);
        let mut rebatcher = Rebatcher::new(120);
        let outcome = rebatcher
            .rebatch(&device, &mut store, &mut batches, false)
            .unwrap();
        assert_eq!(outcome, RebatchOutcome::Clean);
        assert_eq!(batches.len(), 4);
    }

    #[test]
    fn throttled_until_cap_then_runs() {
        let device = TestDevice::new(false);
        let (mut store, mut batches) = fixture([
            LinearRgba::RED,
            LinearRgba::BLUE,
            LinearRgba::RED,
            LinearRgba::BLUE,
        ]);
        let before = store.offsets().to_vec();
        let mut rebatcher = Rebatcher::new(120);

        for frame in 1..120 {
            let outcome = rebatcher
                .rebatch(&device, &mut store, &mut batches, false)
                .unwrap();
            assert_eq!(outcome, RebatchOutcome::Deferred { stale_frames: frame });
            assert_eq!(store.offsets(), before.as_slice());
        }

        let outcome = rebatcher
            .rebatch(&device, &mut store, &mut batches, false)
            .unwrap();
        assert_eq!(
            outcome,
            RebatchOutcome::Rebatched {
                runs: 2,
                mode: CopyMode::Cpu
            }
        );
        assert_eq!(rebatcher.stale_frames(), 0);
    }

    #[test]
    fn zero_cap_rebatches_on_first_call() {
        let device = TestDevice::new(false);
        let (mut store, mut batches) = fixture([
            LinearRgba::RED,
            LinearRgba::RED,
            LinearRgba::BLUE,
            LinearRgba::BLUE,
        ]);
        let mut rebatcher = Rebatcher::new(0);
        let outcome = rebatcher
            .rebatch(&device, &mut store, &mut batches, false)
            .unwrap();
        assert!(matches!(outcome, RebatchOutcome::Rebatched { runs: 2, .. }));
    }

    #[test]
    fn forced_cpu_rebatch_sorts_and_merges() {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = TestDevice::new(false);
        let (mut store, mut batches) = fixture([
            LinearRgba::RED,
            LinearRgba::BLUE,
            LinearRgba::RED,
            LinearRgba::BLUE,
        ]);
        store.create_buffers(&device, true).unwrap();
        let mut rebatcher = Rebatcher::new(120);

        rebatcher
            .rebatch(&device, &mut store, &mut batches, true)
            .unwrap();

        // Red packs above blue, so red comes first.
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].color, LinearRgba::RED);
        assert_eq!((batches[0].offset, batches[0].count), (0, 6));
        assert_eq!(batches[0].mesh_ids, vec![0, 2]);
        assert_eq!(batches[1].color, LinearRgba::BLUE);
        assert_eq!((batches[1].offset, batches[1].count), (6, 6));
        assert_eq!(batches[1].mesh_ids, vec![1, 3]);
        assert!(is_partition(&batches, store.len()));

        let indices = store.cpu_indices().unwrap();
        assert_meshes_intact(&store, indices);
        assert_eq!(device.write_count(), 1);
        let active = store.buffers().unwrap().active;
        assert_eq!(
            device.read_u16(active),
            vec![0, 1, 2, 6, 7, 8, 3, 4, 5, 9, 10, 11]
        );
    }

    #[test]
    fn forced_device_rebatch_ping_pongs() {
        let device = TestDevice::new(true);
        let (mut store, mut batches) = fixture([
            LinearRgba::BLUE,
            LinearRgba::RED,
            LinearRgba::BLUE,
            LinearRgba::GREEN,
        ]);
        let first = store.create_buffers(&device, true).unwrap();
        let mut rebatcher = Rebatcher::new(120);

        let outcome = rebatcher
            .rebatch(&device, &mut store, &mut batches, true)
            .unwrap();
        assert_eq!(
            outcome,
            RebatchOutcome::Rebatched {
                runs: 3,
                mode: CopyMode::Device
            }
        );
        assert_eq!(device.copy_count(), 4);
        assert_eq!(store.buffers().unwrap().active, first.secondary.unwrap());
        assert_eq!(store.buffers().unwrap().secondary, Some(first.active));
        assert!(is_partition(&batches, store.len()));

        let active = store.buffers().unwrap().active;
        let contents = IndexData::U16(device.read_u16(active));
        assert_meshes_intact(&store, &contents);
    }

    #[test]
    fn forced_cpu_rebatch_keeps_32_bit_indices() {
        let device = TestDevice::new(false);
        let (mut store, mut batches) = fixture_with(
            wide_indices(),
            [
                LinearRgba::GREEN,
                LinearRgba::RED,
                LinearRgba::GREEN,
                LinearRgba::RED,
            ],
        );
        store.create_buffers(&device, true).unwrap();
        let mut rebatcher = Rebatcher::new(120);

        let outcome = rebatcher
            .rebatch(&device, &mut store, &mut batches, true)
            .unwrap();
        assert_eq!(
            outcome,
            RebatchOutcome::Rebatched {
                runs: 2,
                mode: CopyMode::Cpu
            }
        );
        assert!(is_partition(&batches, store.len()));
        assert_eq!(batches[0].mesh_ids, vec![1, 3]);
        assert_eq!(batches[1].mesh_ids, vec![0, 2]);

        let indices = store.cpu_indices().unwrap();
        assert!(matches!(indices, IndexData::U32(_)));
        assert_meshes_intact_from(&store, indices, WIDE_BASE);

        let active = store.buffers().unwrap().active;
        let uploaded = IndexData::U32(device.read_u32(active));
        assert_meshes_intact_from(&store, &uploaded, WIDE_BASE);
    }

    #[test]
    fn forced_device_rebatch_keeps_32_bit_indices() {
        let device = TestDevice::new(true);
        let (mut store, mut batches) = fixture_with(
            wide_indices(),
            [
                LinearRgba::BLUE,
                LinearRgba::RED,
                LinearRgba::BLUE,
                LinearRgba::GREEN,
            ],
        );
        let first = store.create_buffers(&device, true).unwrap();
        let mut rebatcher = Rebatcher::new(120);

        let outcome = rebatcher
            .rebatch(&device, &mut store, &mut batches, true)
            .unwrap();
        assert_eq!(
            outcome,
            RebatchOutcome::Rebatched {
                runs: 3,
                mode: CopyMode::Device
            }
        );
        assert_eq!(store.buffers().unwrap().active, first.secondary.unwrap());
        assert!(is_partition(&batches, store.len()));

        let active = store.buffers().unwrap().active;
        let contents = IndexData::U32(device.read_u32(active));
        assert_eq!(contents.len(), 12);
        assert_meshes_intact_from(&store, &contents, WIDE_BASE);
    }
}
