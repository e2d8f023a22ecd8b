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

//! Translation of batch runs into the stencil-volume draw sequence.
//!
//! Every run is drawn three times:
//!
//! 1. **Stencil preload**: no color, no depth test. Front faces decrement and back faces
//!    increment the classification bits, counting how many volume surfaces lie in front.
//! 2. **Stencil depth**: depth tested against the scene. Passing front faces increment,
//!    passing back faces decrement, leaving a non-zero value where the scene surface lies
//!    inside the volume.
//! 3. **Color**: draws wherever the classification bits are non-zero and clears them.
//!
//! Pick commands follow the same scheme per mesh instead of per run so that every mesh
//! writes its own pick color.

use super::{BatchDescriptor, IndexStore};
use drapery_core::{
    math::{Aabb, Mat4},
    renderer::{
        BlendStateDescriptor, ClassificationType, ColorWrites, CompareFunction, DepthState,
        DrawCommand, Pass, PickOwner, PrimitiveTopology, RenderState, ShaderProgramId,
        StencilFaceState, StencilOperation, StencilState, UniformMap, VertexArray,
    },
};
use std::borrow::Cow;

/// Stencil bits owned by classification volumes.
pub const CLASSIFICATION_MASK: u32 = 0x0F;
/// Stencil bit set by the host wherever tiled geometry was drawn.
pub const TILE_MASK: u32 = 0x80;
/// The varying pick commands read the pick color from.
pub const PICK_COLOR_VARYING: &str = "v_pickColor";

/// The fixed-function states of the classification draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationRenderStates {
    /// First stencil pass.
    pub stencil_preload: RenderState,
    /// Second, depth-tested stencil pass.
    pub stencil_depth: RenderState,
    /// Color pass.
    pub color: RenderState,
    /// Pick color pass.
    pub pick: RenderState,
    /// Color pass replacement when wireframe debugging is on.
    pub wireframe: RenderState,
}

impl Default for ClassificationRenderStates {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassificationRenderStates {
    /// Builds the states.
    pub fn new() -> Self {
        let volume_face = |pass_op| StencilFaceState {
            compare: CompareFunction::Always,
            fail_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::Keep,
            depth_pass_op: pass_op,
        };

        let stencil_preload = RenderState {
            color_writes: ColorWrites::EMPTY,
            depth: None,
            stencil: Some(StencilState {
                front: StencilFaceState {
                    depth_fail_op: StencilOperation::DecrementWrap,
                    ..volume_face(StencilOperation::DecrementWrap)
                },
                back: StencilFaceState {
                    depth_fail_op: StencilOperation::IncrementWrap,
                    ..volume_face(StencilOperation::IncrementWrap)
                },
                reference: TILE_MASK,
                read_mask: TILE_MASK,
                write_mask: CLASSIFICATION_MASK,
            }),
            blend: None,
        };

        let stencil_depth = RenderState {
            color_writes: ColorWrites::EMPTY,
            depth: Some(DepthState {
                compare: CompareFunction::LessEqual,
                write_enabled: false,
            }),
            stencil: Some(StencilState {
                front: volume_face(StencilOperation::IncrementWrap),
                back: volume_face(StencilOperation::DecrementWrap),
                reference: TILE_MASK,
                read_mask: TILE_MASK,
                write_mask: CLASSIFICATION_MASK,
            }),
            blend: None,
        };

        let color_face = StencilFaceState {
            compare: CompareFunction::NotEqual,
            fail_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::DecrementWrap,
            depth_pass_op: StencilOperation::DecrementWrap,
        };
        let color_stencil = StencilState {
            front: color_face,
            back: color_face,
            reference: 0,
            read_mask: CLASSIFICATION_MASK,
            write_mask: CLASSIFICATION_MASK,
        };

        let color = RenderState {
            color_writes: ColorWrites::ALL,
            depth: None,
            stencil: Some(color_stencil),
            blend: Some(BlendStateDescriptor::PREMULTIPLIED_ALPHA),
        };

        let pick = RenderState {
            blend: None,
            ..color
        };

        Self {
            stencil_preload,
            stencil_depth,
            color,
            pick,
            wireframe: RenderState::default(),
        }
    }
}

/// The three programs a classification primitive draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationPrograms {
    /// Per-feature colored program, used for the per-run triple.
    pub color: ShaderProgramId,
    /// Position-only program, used for pick and ignore-show stencil passes.
    pub stencil: ShaderProgramId,
    /// Pick color program.
    pub pick: ShaderProgramId,
}

/// Parameters shared by every command of one primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandTemplate {
    /// The issuing primitive.
    pub owner: PickOwner,
    /// Buffers to draw from. Must name the currently active index buffer.
    pub vertex_array: VertexArray,
    /// Model transform.
    pub model_matrix: Mat4,
    /// Bounding volume of the whole primitive.
    pub bounding_volume: Aabb,
}

impl CommandTemplate {
    fn fresh(&self, program: ShaderProgramId) -> DrawCommand {
        DrawCommand {
            owner: self.owner,
            vertex_array: self.vertex_array,
            primitive_topology: PrimitiveTopology::TriangleList,
            render_state: RenderState::default(),
            shader_program: program,
            uniform_map: UniformMap::new(),
            offset: 0,
            count: 0,
            model_matrix: self.model_matrix,
            bounding_volume: self.bounding_volume,
            cull: false,
            pass: Pass::TerrainClassification,
            pick_id: None,
        }
    }
}

// Returns the command at `index`, appending a fresh one when the list is one short.
fn slot<'a>(
    commands: &'a mut Vec<DrawCommand>,
    index: usize,
    template: &CommandTemplate,
    program: ShaderProgramId,
) -> &'a mut DrawCommand {
    if index == commands.len() {
        commands.push(template.fresh(program));
    }
    &mut commands[index]
}

#[allow(clippy::too_many_arguments)]
fn write_draw(
    command: &mut DrawCommand,
    template: &CommandTemplate,
    render_state: RenderState,
    program: ShaderProgramId,
    uniform_map: &UniformMap,
    offset: u32,
    count: u32,
    bounding_volume: Aabb,
) {
    command.owner = template.owner;
    command.vertex_array = template.vertex_array;
    command.primitive_topology = PrimitiveTopology::TriangleList;
    command.render_state = render_state;
    command.shader_program = program;
    command.uniform_map = uniform_map.clone();
    command.offset = offset;
    command.count = count;
    command.model_matrix = template.model_matrix;
    command.bounding_volume = bounding_volume;
    command.cull = false;
    command.pass = Pass::TerrainClassification;
    command.pick_id = None;
}

/// Rebuilds the per-run command triples into `commands`, reusing existing slots.
///
/// After the call `commands.len() == 3 * batches.len()`.
pub fn build_color_commands(
    commands: &mut Vec<DrawCommand>,
    batches: &[BatchDescriptor],
    template: &CommandTemplate,
    states: &ClassificationRenderStates,
    program: ShaderProgramId,
    uniform_map: &UniformMap,
) {
    let length = batches.len() * 3;
    commands.truncate(length);

    for (i, batch) in batches.iter().enumerate() {
        let passes = [states.stencil_preload, states.stencil_depth, states.color];
        for (j, render_state) in passes.into_iter().enumerate() {
            let command = slot(commands, i * 3 + j, template, program);
            write_draw(
                command,
                template,
                render_state,
                program,
                uniform_map,
                batch.offset,
                batch.count,
                template.bounding_volume,
            );
        }
    }
    log::trace!("Rebuilt {} classification color commands", length);
}

/// Rebuilds the ignore-show commands from the stencil pair of every triple in
/// `commands`, drawn with the position-only program.
///
/// After the call `ignore_show.len() == 2 * commands.len() / 3`.
pub fn build_ignore_show_commands(
    ignore_show: &mut Vec<DrawCommand>,
    commands: &[DrawCommand],
    stencil_program: ShaderProgramId,
) {
    ignore_show.clear();
    ignore_show.reserve(commands.len() / 3 * 2);
    for triple in commands.chunks_exact(3) {
        for source in &triple[..2] {
            ignore_show.push(DrawCommand {
                shader_program: stencil_program,
                pass: Pass::TileClassificationIgnoreShow,
                ..source.clone()
            });
        }
    }
}

/// Rebuilds the per-mesh pick triples into `pick_commands`, reusing existing slots.
///
/// Each mesh is drawn with its current range in `store` and its own bounding volume.
/// After the call `pick_commands.len() == 3 * store.mesh_count()`.
pub fn build_pick_commands(
    pick_commands: &mut Vec<DrawCommand>,
    store: &IndexStore,
    bounding_volumes: &[Aabb],
    template: &CommandTemplate,
    states: &ClassificationRenderStates,
    programs: &ClassificationPrograms,
    uniform_map: &UniformMap,
) {
    let length = store.mesh_count() * 3;
    assert_eq!(
        bounding_volumes.len(),
        store.mesh_count(),
        "one bounding volume per mesh is required"
    );
    pick_commands.truncate(length);

    for (mesh, &bounding_volume) in bounding_volumes.iter().enumerate() {
        let (offset, count) = store.range(mesh);
        let passes = [
            (states.stencil_preload, programs.stencil),
            (states.stencil_depth, programs.stencil),
            (states.pick, programs.pick),
        ];
        for (j, (render_state, program)) in passes.into_iter().enumerate() {
            let command = slot(pick_commands, mesh * 3 + j, template, program);
            write_draw(
                command,
                template,
                render_state,
                program,
                uniform_map,
                offset,
                count,
                bounding_volume,
            );
        }
        pick_commands[mesh * 3 + 2].pick_id = Some(Cow::Borrowed(PICK_COLOR_VARYING));
    }
    log::trace!("Rebuilt {} classification pick commands", length);
}

/// Switches the color command of every triple between filled and wireframe drawing.
/// The stencil commands are left alone.
pub fn apply_wireframe(
    commands: &mut [DrawCommand],
    states: &ClassificationRenderStates,
    enabled: bool,
) {
    let (render_state, topology) = if enabled {
        (states.wireframe, PrimitiveTopology::LineList)
    } else {
        (states.color, PrimitiveTopology::TriangleList)
    };
    for triple in commands.chunks_exact_mut(3) {
        triple[2].render_state = render_state;
        triple[2].primitive_topology = topology;
    }
}

/// Appends `commands` to `queue` for the passes `classification_type` selects, followed
/// by `ignore_show` when tiles are classified. Returns the number of commands appended.
///
/// With [`ClassificationType::Both`] every command is queued twice: once for terrain and
/// once as a tile-classification copy.
pub fn queue_commands(
    queue: &mut Vec<DrawCommand>,
    commands: &[DrawCommand],
    ignore_show: Option<&[DrawCommand]>,
    classification_type: ClassificationType,
) -> usize {
    let start = queue.len();
    let terrain = classification_type.classifies_terrain();
    let tiles = classification_type.classifies_tiles();

    for command in commands {
        if terrain {
            queue.push(DrawCommand {
                pass: Pass::TerrainClassification,
                ..command.clone()
            });
        }
        if tiles {
            queue.push(DrawCommand {
                pass: Pass::TileClassification,
                ..command.clone()
            });
        }
    }

    if let (Some(ignore_show), true) = (ignore_show, tiles) {
        queue.extend_from_slice(ignore_show);
    }
    queue.len() - start
}

/// Appends `commands` to `queue` unchanged, for wireframe debugging. Returns the number
/// of commands appended.
pub fn queue_wireframe_commands(queue: &mut Vec<DrawCommand>, commands: &[DrawCommand]) -> usize {
    queue.extend_from_slice(commands);
    commands.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification_lane::IndexData;
    use drapery_core::math::{LinearRgba, Vec3};
    use drapery_core::renderer::{BufferId, IndexFormat, UniformValue};
    use std::sync::Arc;

    const PROGRAMS: ClassificationPrograms = ClassificationPrograms {
        color: ShaderProgramId(1),
        stencil: ShaderProgramId(2),
        pick: ShaderProgramId(3),
    };

    fn template() -> CommandTemplate {
        CommandTemplate {
            owner: PickOwner(9),
            vertex_array: VertexArray {
                positions: BufferId(1),
                mesh_ids: BufferId(2),
                index_buffer: BufferId(3),
                index_format: IndexFormat::Uint16,
            },
            model_matrix: Mat4::IDENTITY,
            bounding_volume: Aabb::from_min_max(Vec3::ZERO, Vec3::ONE),
        }
    }

    fn batches() -> Vec<BatchDescriptor> {
        vec![
            BatchDescriptor::new(LinearRgba::RED, 0, 3, vec![0]),
            BatchDescriptor::new(LinearRgba::BLUE, 3, 6, vec![1, 2]),
        ]
    }

    fn uniforms() -> UniformMap {
        UniformMap::new().with("u_alpha", Arc::new(|| UniformValue::Float(1.0)))
    }

    #[test]
    fn stencil_states_follow_volume_algorithm() {
        let states = ClassificationRenderStates::new();

        let preload = states.stencil_preload.stencil.unwrap();
        assert!(states.stencil_preload.color_writes.is_empty());
        assert!(states.stencil_preload.depth.is_none());
        assert_eq!(preload.front.depth_fail_op, StencilOperation::DecrementWrap);
        assert_eq!(preload.front.depth_pass_op, StencilOperation::DecrementWrap);
        assert_eq!(preload.back.depth_fail_op, StencilOperation::IncrementWrap);
        assert_eq!(preload.back.depth_pass_op, StencilOperation::IncrementWrap);

        let depth = states.stencil_depth.stencil.unwrap();
        assert_eq!(
            states.stencil_depth.depth.unwrap().compare,
            CompareFunction::LessEqual
        );
        assert_eq!(depth.front.depth_pass_op, StencilOperation::IncrementWrap);
        assert_eq!(depth.back.depth_pass_op, StencilOperation::DecrementWrap);
        assert_eq!(depth.front.depth_fail_op, StencilOperation::Keep);

        let color = states.color.stencil.unwrap();
        assert_eq!(color.front.compare, CompareFunction::NotEqual);
        assert_eq!(color.reference, 0);
        assert_eq!(color.front.depth_pass_op, StencilOperation::DecrementWrap);
        assert_eq!(
            states.color.blend,
            Some(BlendStateDescriptor::PREMULTIPLIED_ALPHA)
        );
        assert!(states.pick.blend.is_none());
        assert!(states.wireframe.stencil.is_none());
    }

    #[test]
    fn color_commands_are_ordered_triples() {
        let states = ClassificationRenderStates::new();
        let mut commands = Vec::new();
        build_color_commands(&mut commands, &batches(), &template(), &states, PROGRAMS.color, &uniforms());

        assert_eq!(commands.len(), 6);
        assert_eq!(commands[0].render_state, states.stencil_preload);
        assert_eq!(commands[1].render_state, states.stencil_depth);
        assert_eq!(commands[2].render_state, states.color);
        assert_eq!((commands[3].offset, commands[3].count), (3, 6));
        assert!(commands.iter().all(|c| !c.cull && c.pick_id.is_none()));
        assert!(commands.iter().all(|c| c.bounding_volume == template().bounding_volume));
    }

    #[test]
    fn color_commands_resize_with_run_count() {
        let states = ClassificationRenderStates::new();
        let map = uniforms();
        let mut commands = Vec::new();
        build_color_commands(&mut commands, &batches(), &template(), &states, PROGRAMS.color, &map);

        let single = vec![BatchDescriptor::new(LinearRgba::WHITE, 0, 9, vec![0, 1, 2])];
        build_color_commands(&mut commands, &single, &template(), &states, PROGRAMS.color, &map);
        assert_eq!(commands.len(), 3);
        assert_eq!((commands[2].offset, commands[2].count), (0, 9));

        let before = commands.clone();
        build_color_commands(&mut commands, &single, &template(), &states, PROGRAMS.color, &map);
        assert_eq!(commands, before);
    }

    #[test]
    fn ignore_show_copies_stencil_pairs() {
        let states = ClassificationRenderStates::new();
        let mut commands = Vec::new();
        build_color_commands(&mut commands, &batches(), &template(), &states, PROGRAMS.color, &uniforms());

        let mut ignore_show = Vec::new();
        build_ignore_show_commands(&mut ignore_show, &commands, PROGRAMS.stencil);
        assert_eq!(ignore_show.len(), 4);
        assert_eq!(ignore_show[2].render_state, states.stencil_preload);
        assert_eq!(ignore_show[3].render_state, states.stencil_depth);
        assert_eq!(ignore_show[3].offset, 3);
        assert!(ignore_show.iter().all(|c| c.shader_program == PROGRAMS.stencil
            && c.pass == Pass::TileClassificationIgnoreShow));
        // The primary list is untouched.
        assert!(commands.iter().all(|c| c.shader_program == PROGRAMS.color));
    }

    #[test]
    fn pick_commands_are_per_mesh() {
        let states = ClassificationRenderStates::new();
        let store = IndexStore::new(
            IndexData::U32((0..9).collect()),
            vec![0, 3, 6],
            vec![3, 3, 3],
            &[0, 1, 2],
        );
        let volumes: Vec<Aabb> = (0..3)
            .map(|i| Aabb::from_min_max(Vec3::new(i as f32, 0.0, 0.0), Vec3::ONE * 4.0))
            .collect();
        let mut pick = Vec::new();
        build_pick_commands(&mut pick, &store, &volumes, &template(), &states, &PROGRAMS, &uniforms());

        // Two runs would give six color commands; picking is still one triple per mesh.
        assert_eq!(pick.len(), 9);
        for mesh in 0..3 {
            let triple = &pick[mesh * 3..mesh * 3 + 3];
            assert!(triple.iter().all(|c| c.offset == mesh as u32 * 3 && c.count == 3));
            assert!(triple.iter().all(|c| c.bounding_volume == volumes[mesh]));
            assert_eq!(triple[0].shader_program, PROGRAMS.stencil);
            assert_eq!(triple[2].shader_program, PROGRAMS.pick);
            assert_eq!(triple[2].render_state, states.pick);
            assert_eq!(triple[2].pick_id.as_deref(), Some(PICK_COLOR_VARYING));
            assert!(triple[0].pick_id.is_none());
        }
    }

    #[test]
    fn wireframe_only_touches_color_commands() {
        let states = ClassificationRenderStates::new();
        let mut commands = Vec::new();
        build_color_commands(&mut commands, &batches(), &template(), &states, PROGRAMS.color, &uniforms());
        let filled = commands.clone();

        apply_wireframe(&mut commands, &states, true);
        assert_eq!(commands[2].primitive_topology, PrimitiveTopology::LineList);
        assert!(commands[5].render_state.stencil.is_none());
        assert_eq!(commands[0], filled[0]);
        assert_eq!(commands[4], filled[4]);

        apply_wireframe(&mut commands, &states, false);
        assert_eq!(commands, filled);
    }

    #[test]
    fn queueing_follows_classification_type() {
        let states = ClassificationRenderStates::new();
        let mut commands = Vec::new();
        build_color_commands(&mut commands, &batches(), &template(), &states, PROGRAMS.color, &uniforms());
        let mut ignore_show = Vec::new();
        build_ignore_show_commands(&mut ignore_show, &commands, PROGRAMS.stencil);

        let mut queue = Vec::new();
        let n = queue_commands(&mut queue, &commands, Some(&ignore_show), ClassificationType::Terrain);
        assert_eq!(n, 6);
        assert!(queue.iter().all(|c| c.pass == Pass::TerrainClassification));

        queue.clear();
        let n = queue_commands(&mut queue, &commands, Some(&ignore_show), ClassificationType::Tile);
        assert_eq!(n, 10);
        assert!(queue[..6].iter().all(|c| c.pass == Pass::TileClassification));

        queue.clear();
        let n = queue_commands(&mut queue, &commands, None, ClassificationType::Both);
        assert_eq!(n, 12);
        assert_eq!(queue[0].pass, Pass::TerrainClassification);
        assert_eq!(queue[1].pass, Pass::TileClassification);
        assert_eq!(queue[0].offset, queue[1].offset);
    }
}
