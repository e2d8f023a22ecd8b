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

//! The interface shared by per-frame controllers.

/// A subsystem the host drives once per frame.
///
/// The context type borrows whatever frame data the agent needs, so an agent can
/// hold no reference to the host between calls.
pub trait Agent: Send + Sync {
    /// Per-frame data handed to [`update`](Agent::update).
    type Context<'a>;
    /// Snapshot returned by [`report_status`](Agent::report_status).
    type Status;
    /// Failure raised by an update.
    type Error;

    /// Brings the agent up to date for the current frame.
    fn update(&mut self, context: &mut Self::Context<'_>) -> Result<(), Self::Error>;

    /// Reports the agent's current status.
    fn report_status(&self) -> Self::Status;
}
