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

//! Classification lane - batching and stencil-volume command generation.

mod batch;
mod commands;
mod error;
mod index_store;
mod rebatch;
mod settings;
pub mod shaders;

#[cfg(test)]
pub(crate) mod test_device;

pub use batch::*;
pub use commands::*;
pub use error::*;
pub use index_store::*;
pub use rebatch::*;
pub use settings::*;
