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

//! Counters exposed by classification primitives.

/// Statistics of one classification primitive, refreshed by every update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationStats {
    /// Number of updates processed.
    pub frame_number: u64,
    /// Current number of batch runs.
    pub runs: usize,
    /// Completed rebatches since creation.
    pub rebatches: u64,
    /// Frames the pending rebatch has been deferred, zero when none is pending.
    pub deferred_frames: u32,
    /// Draw commands appended to the queue by the last update.
    pub commands_queued: usize,
}
