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

use super::{BufferFactory, ShaderCache};
use std::fmt::Debug;

/// A full graphics device: everything the classification agents need from a backend.
///
/// Implemented automatically for any type providing both capabilities. Code that only
/// touches one capability should be generic over that trait (`D: BufferFactory + ?Sized`)
/// so it also accepts a `&dyn GraphicsDevice`.
pub trait GraphicsDevice: BufferFactory + ShaderCache + Debug + Send + Sync + 'static {}

impl<T> GraphicsDevice for T where T: BufferFactory + ShaderCache + Debug + Send + Sync + 'static {}
