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

//! # Drapery Lanes
//!
//! The hot-path data engines behind draped classification meshes: the batch
//! descriptors, the shared index store, the throttled rebatcher and the builder that
//! turns runs of indices into stencil-volume draw commands.
//!
//! Lanes hold no policy. They are driven every frame by the classification agent in
//! `drapery-agents`, which decides when to rebatch and which command sets to rebuild.

#![warn(missing_docs)]

pub mod classification_lane;

pub use classification_lane::*;
