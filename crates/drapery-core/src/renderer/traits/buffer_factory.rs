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

use crate::renderer::api::{BufferDescriptor, BufferId};
use crate::renderer::error::ResourceError;

/// Allocates and manipulates GPU buffers.
///
/// Implementations must be thread-safe, although the classification lanes only ever
/// call into them from the host's frame loop.
pub trait BufferFactory: Send + Sync {
    /// Creates a new, uninitialized GPU buffer.
    /// ## Arguments
    /// * `descriptor` - The size, usage and label of the buffer.
    /// ## Returns
    /// A `Result` containing the ID of the created buffer or an error if the creation fails.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Creates a new GPU buffer and initializes it with the provided data.
    /// ## Arguments
    /// * `descriptor` - The size, usage and label of the buffer.
    /// * `data` - The initial contents; its length must not exceed `descriptor.size`.
    /// ## Returns
    /// A `Result` containing the ID of the created buffer or an error if the creation fails.
    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError>;

    /// Writes data into an existing buffer at a byte offset.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Enqueues a copy of `size` bytes from `source` to `destination`.
    ///
    /// The copy is ordered before every draw submitted afterwards.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If either range exceeds its buffer.
    /// * `ResourceError::InvalidHandle` - If either buffer is unknown.
    fn copy_buffer_to_buffer(
        &self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    ) -> Result<(), ResourceError>;

    /// Returns `true` if [`BufferFactory::copy_buffer_to_buffer`] is available.
    fn supports_buffer_copy(&self) -> bool;

    /// Destroys a buffer. The ID must not be used afterwards.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;
}
