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

//! Feature records and the styles evaluated against them.

use drapery_core::{math::LinearRgba, renderer::PickOwner};

/// Color of a feature with no style applied.
pub const DEFAULT_COLOR: LinearRgba = LinearRgba::WHITE;
/// Visibility of a feature with no style applied.
pub const DEFAULT_SHOW: bool = true;

/// The host-side record of one mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationFeature {
    /// The primitive owning the mesh.
    pub owner: PickOwner,
    /// The mesh's stable id.
    pub mesh_id: u32,
    /// Display color.
    pub color: LinearRgba,
    /// Visibility.
    pub show: bool,
}

impl ClassificationFeature {
    /// Creates a record with the default color and visibility.
    pub fn new(owner: PickOwner, mesh_id: u32) -> Self {
        Self {
            owner,
            mesh_id,
            color: DEFAULT_COLOR,
            show: DEFAULT_SHOW,
        }
    }
}

/// Evaluates a color and a visibility per feature.
pub trait ClassificationStyle {
    /// Returns `true` only if [`color`](Self::color) and [`show`](Self::show) are known
    /// to produce the same result for every feature.
    fn is_uniform(&self) -> bool;

    /// The color of `feature`.
    fn color(&self, feature: &ClassificationFeature) -> LinearRgba;

    /// The visibility of `feature`.
    fn show(&self, feature: &ClassificationFeature) -> bool;
}

/// A style giving every feature the same color and visibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantStyle {
    /// Color of every feature.
    pub color: LinearRgba,
    /// Visibility of every feature.
    pub show: bool,
}

impl ClassificationStyle for ConstantStyle {
    fn is_uniform(&self) -> bool {
        true
    }

    fn color(&self, _feature: &ClassificationFeature) -> LinearRgba {
        self.color
    }

    fn show(&self, _feature: &ClassificationFeature) -> bool {
        self.show
    }
}

/// A style computed by a closure per feature. Never considered uniform.
pub struct FnStyle<F>(pub F);

impl<F> ClassificationStyle for FnStyle<F>
where
    F: Fn(&ClassificationFeature) -> (LinearRgba, bool),
{
    fn is_uniform(&self) -> bool {
        false
    }

    fn color(&self, feature: &ClassificationFeature) -> LinearRgba {
        (self.0)(feature).0
    }

    fn show(&self, feature: &ClassificationFeature) -> bool {
        (self.0)(feature).1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_features_start_white_and_visible() {
        let feature = ClassificationFeature::new(PickOwner(1), 7);
        assert_eq!(feature.color, DEFAULT_COLOR);
        assert!(feature.show);
        assert_eq!(feature.mesh_id, 7);
    }

    #[test]
    fn fn_style_is_never_uniform() {
        let style = FnStyle(|f: &ClassificationFeature| (LinearRgba::RED, f.mesh_id > 2));
        let feature = ClassificationFeature::new(PickOwner(1), 3);
        assert!(!style.is_uniform());
        assert_eq!(style.color(&feature), LinearRgba::RED);
        assert!(style.show(&feature));

        let constant = ConstantStyle {
            color: LinearRgba::BLUE,
            show: false,
        };
        assert!(constant.is_uniform());
        assert!(!constant.show(&feature));
    }
}
