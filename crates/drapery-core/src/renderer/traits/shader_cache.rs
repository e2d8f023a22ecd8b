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

use crate::renderer::api::{ShaderProgramDescriptor, ShaderProgramId};
use crate::renderer::error::ResourceError;

/// Hands out linked shader programs, sharing identical ones between callers.
pub trait ShaderCache: Send + Sync {
    /// Returns a program for `descriptor`, compiling it on first request.
    ///
    /// Every successful call must be balanced by one [`ShaderCache::release_program`].
    fn get_or_create_program(
        &self,
        descriptor: &ShaderProgramDescriptor,
    ) -> Result<ShaderProgramId, ResourceError>;

    /// Releases one reference to a program obtained from this cache.
    fn release_program(&self, id: ShaderProgramId) -> Result<(), ResourceError>;
}
