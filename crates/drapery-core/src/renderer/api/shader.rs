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

//! Shader sources and program descriptors handed to a [`ShaderCache`](crate::renderer::ShaderCache).

use super::pipeline::VertexAttributeDescriptor;
use std::borrow::Cow;

/// One shader stage's source: a list of preprocessor defines and concatenated chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShaderSource {
    /// Names emitted as `#define NAME` before the sources.
    pub defines: Vec<Cow<'static, str>>,
    /// Source chunks concatenated in order.
    pub sources: Vec<Cow<'static, str>>,
}

impl ShaderSource {
    /// Creates a source from a single chunk with no defines.
    pub fn new(source: impl Into<Cow<'static, str>>) -> Self {
        Self {
            defines: Vec::new(),
            sources: vec![source.into()],
        }
    }

    /// Adds a define, builder style.
    #[must_use]
    pub fn with_define(mut self, define: impl Into<Cow<'static, str>>) -> Self {
        self.defines.push(define.into());
        self
    }

    /// Produces the final text: one `#define` line per define followed by every chunk.
    pub fn combine(&self) -> String {
        let mut text = String::new();
        for define in &self.defines {
            text.push_str("#define ");
            text.push_str(define);
            text.push('\n');
        }
        for source in &self.sources {
            text.push_str(source);
            text.push('\n');
        }
        text
    }
}

/// Describes a linked vertex + fragment program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderProgramDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The vertex stage.
    pub vertex: ShaderSource,
    /// The fragment stage.
    pub fragment: ShaderSource,
    /// The vertex attributes the program reads.
    pub attributes: &'a [VertexAttributeDescriptor],
}

/// An opaque handle representing a linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderProgramId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_emits_defines_first() {
        let source = ShaderSource::new("void main() {}").with_define("VECTOR_TILE");
        assert_eq!(source.combine(), "#define VECTOR_TILE\nvoid main() {}\n");
    }

    #[test]
    fn program_id_equality() {
        assert_eq!(ShaderProgramId(1), ShaderProgramId(1));
        assert_ne!(ShaderProgramId(1), ShaderProgramId(2));
    }
}
