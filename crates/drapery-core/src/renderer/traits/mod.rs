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

//! Defines the capability traits a host renderer implements.
//!
//! - [`BufferFactory`]: creation, upload, copy and destruction of GPU buffers.
//! - [`ShaderCache`]: acquisition and release of linked shader programs.
//! - [`GraphicsDevice`]: the union of both, used as a single trait object by the agents.

mod buffer_factory;
mod graphics_device;
mod shader_cache;

pub use self::buffer_factory::BufferFactory;
pub use self::graphics_device::GraphicsDevice;
pub use self::shader_cache::ShaderCache;
