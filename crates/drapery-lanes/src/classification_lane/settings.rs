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

//! Tunables for classification primitives.

use super::ClassificationError;
use drapery_core::renderer::ClassificationType;
use serde::{Deserialize, Serialize};

/// Settings shared by every classification primitive of a host.
///
/// Missing fields take their default when loaded from RON:
///
/// ```
/// use drapery_lanes::ClassificationSettings;
///
/// let settings = ClassificationSettings::from_ron_str("(max_stale_frames: 30)").unwrap();
/// assert_eq!(settings.max_stale_frames, 30);
/// assert!(settings.uniform_style_fast_path);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSettings {
    /// Frames a pending rebatch may be deferred before it is forced.
    pub max_stale_frames: u32,
    /// If `true`, a style that colors every feature identically collapses the batches to
    /// a single run without going through the per-mesh split path.
    pub uniform_style_fast_path: bool,
    /// If `true`, rebatching uses device buffer copies when the device supports them.
    pub prefer_device_copy: bool,
    /// Which passes draw commands are queued to.
    pub classification_type: ClassificationType,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            max_stale_frames: 120,
            uniform_style_fast_path: true,
            prefer_device_copy: true,
            classification_type: ClassificationType::Both,
        }
    }
}

impl ClassificationSettings {
    /// Parses settings from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ClassificationError> {
        ron::de::from_str(text).map_err(|e| ClassificationError::Settings(e.to_string()))
    }

    /// Serializes the settings to pretty RON text.
    pub fn to_ron_string(&self) -> Result<String, ClassificationError> {
        let pretty_config = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        ron::ser::to_string_pretty(self, pretty_config)
            .map_err(|e| ClassificationError::Settings(e.to_string()))
    }
}
