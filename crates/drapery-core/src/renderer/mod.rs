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

//! Provides the backend-agnostic rendering contracts used by the classification lanes.
//!
//! This module defines the "common language" for the draped-mesh renderer: descriptor
//! types (buffers, render state, shader programs, draw commands), the capability
//! traits a host renderer implements ([`BufferFactory`], [`ShaderCache`]) and the error
//! type those capabilities report. The lanes and agents crates only ever talk to a
//! GPU through these traits.

pub mod api;
pub mod error;
pub mod traits;

pub use self::api::*;
pub use self::error::ResourceError;
pub use self::traits::{BufferFactory, GraphicsDevice, ShaderCache};
