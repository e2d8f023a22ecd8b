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

//! The per-frame context handed to classification primitives.

use drapery_core::{
    math::Mat4,
    renderer::{DrawCommand, GraphicsDevice},
};

/// Which passes the host renders this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FramePasses {
    /// The regular color pass.
    pub render: bool,
    /// The pick pass.
    pub pick: bool,
}

/// Everything a primitive needs from the host for one frame.
pub struct FrameState<'a> {
    /// The device resources are created on and copies are enqueued to.
    pub device: &'a dyn GraphicsDevice,
    /// World to eye transform.
    pub view: Mat4,
    /// Eye to clip transform.
    pub projection: Mat4,
    /// Requested passes.
    pub passes: FramePasses,
    /// If `true`, the host renders hidden features of tiled geometry as well, which
    /// requires the ignore-show stencil commands.
    pub invert_classification: bool,
    /// The frame's draw queue.
    pub command_list: &'a mut Vec<DrawCommand>,
}
