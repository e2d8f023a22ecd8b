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

//! Acts as the **[A]gent** for draped classification meshes.
//!
//! A [`ClassificationPrimitive`] owns the geometry of many independently colorable
//! meshes sharing one index buffer. The host edits colors through styles or direct
//! per-mesh updates; once per frame it calls [`ClassificationPrimitive::update`], which
//! decides what the lanes must rebuild and appends the resulting draw commands to the
//! frame's queue.

mod batch_table;
mod frame;
mod options;
mod primitive;
mod resources;
mod stats;
mod style;

pub use batch_table::*;
pub use frame::*;
pub use options::*;
pub use primitive::*;
pub use stats::*;
pub use style::*;
