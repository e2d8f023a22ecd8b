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

//! In-memory buffer factory for lane unit tests.

use drapery_core::renderer::{BufferDescriptor, BufferFactory, BufferId, ResourceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
pub(crate) struct TestDevice {
    next_id: AtomicUsize,
    buffers: Mutex<HashMap<BufferId, Vec<u8>>>,
    copies: AtomicUsize,
    writes: AtomicUsize,
    supports_copy: bool,
}

impl TestDevice {
    pub(crate) fn new(supports_copy: bool) -> Self {
        Self {
            next_id: AtomicUsize::new(1),
            buffers: Mutex::new(HashMap::new()),
            copies: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            supports_copy,
        }
    }

    pub(crate) fn copy_count(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub(crate) fn live_buffers(&self) -> usize {
        self.buffers.lock().unwrap().len()
    }

    pub(crate) fn read_u16(&self, id: BufferId) -> Vec<u16> {
        let buffers = self.buffers.lock().unwrap();
        buffers[&id]
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    pub(crate) fn read_u32(&self, id: BufferId) -> Vec<u32> {
        let buffers = self.buffers.lock().unwrap();
        buffers[&id]
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }
}

impl BufferFactory for TestDevice {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.buffers
            .lock()
            .unwrap()
            .insert(id, vec![0; descriptor.size as usize]);
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let id = self.create_buffer(descriptor)?;
        self.buffers.lock().unwrap().get_mut(&id).unwrap()[..data.len()].copy_from_slice(data);
        Ok(id)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut buffers = self.buffers.lock().unwrap();
        let buffer = buffers.get_mut(&id).ok_or(ResourceError::InvalidHandle)?;
        let start = offset as usize;
        buffer[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn copy_buffer_to_buffer(
        &self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    ) -> Result<(), ResourceError> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        let mut buffers = self.buffers.lock().unwrap();
        let bytes = buffers
            .get(&source)
            .ok_or(ResourceError::InvalidHandle)?
            .get(source_offset as usize..(source_offset + size) as usize)
            .ok_or(ResourceError::OutOfBounds)?
            .to_vec();
        let target = buffers
            .get_mut(&destination)
            .ok_or(ResourceError::InvalidHandle)?
            .get_mut(destination_offset as usize..(destination_offset + size) as usize)
            .ok_or(ResourceError::OutOfBounds)?;
        target.copy_from_slice(&bytes);
        Ok(())
    }

    fn supports_buffer_copy(&self) -> bool {
        self.supports_copy
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        self.buffers
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }
}
