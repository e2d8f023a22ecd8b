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

//! Errors surfaced by the classification lanes.

use drapery_core::renderer::ResourceError;
use thiserror::Error;

/// A failure that a caller can recover from, typically by dropping the primitive.
///
/// Violated invariants (malformed descriptor sets, unknown ids in internal tables, use
/// after destroy) are panics, not errors.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The device failed to create, fill or copy a resource.
    #[error("Device resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Settings text could not be parsed.
    #[error("Invalid classification settings: {0}")]
    Settings(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn resource_errors_convert_and_chain() {
        let err: ClassificationError = ResourceError::OutOfBounds.into();
        assert_eq!(
            err.to_string(),
            "Device resource error: Resource access out of bounds."
        );
        assert!(err.source().is_some());
    }
}
