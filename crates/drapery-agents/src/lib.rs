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

//! # Drapery Agents
//!
//! Controllers that own classification primitives and drive the lanes from the host's
//! frame loop: lazy resource creation, dirty tracking, throttled rebatching, debug
//! toggles and per-frame command submission.

#![warn(missing_docs)]

pub mod classification_agent;

pub use classification_agent::*;
