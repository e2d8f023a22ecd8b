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

//! Defines the ClassificationPrimitive, the controller of one batch of draped meshes.

use super::{
    resources::{create_resources, release_resources, GpuResources, PendingGeometry, ResourceState},
    BatchTable, ClassificationFeature, ClassificationPrimitiveOptions, ClassificationStats,
    ClassificationStyle, FrameState, DEFAULT_COLOR, DEFAULT_SHOW,
};
use drapery_core::{
    agent::Agent,
    math::{Aabb, LinearRgba, Mat4, Vec3},
    renderer::{
        ClassificationType, DrawCommand, GraphicsDevice, PickOwner, ResourceError, UniformFn,
        UniformMap, UniformValue, VertexArray,
    },
};
use drapery_lanes::{
    apply_wireframe, build_color_commands, build_ignore_show_commands, build_pick_commands,
    is_partition, queue_commands, queue_wireframe_commands, shaders, BatchDescriptor,
    ClassificationError, ClassificationRenderStates, ClassificationSettings, CommandTemplate,
    IndexStore, RebatchOutcome, Rebatcher,
};
use std::sync::{Arc, PoisonError, RwLock};

/// Largest mesh id the `Float32` id attribute represents exactly.
pub const MAX_MESH_ID: u32 = 1 << 24;

// State read by the uniform closures when the host executes a command.
#[derive(Debug, Clone, Copy)]
struct SharedUniforms {
    modified_model_view_projection: Mat4,
    highlight_color: LinearRgba,
}

/// A batch of independently colorable meshes draped onto the scene with stencil volumes.
///
/// All meshes share one index buffer. Meshes drawn with the same color are kept in
/// contiguous runs ([`BatchDescriptor`]s) so that each run costs one stencil-volume draw
/// triple. Recoloring a mesh splits its run immediately; merging runs that ended up with
/// equal colors is deferred and throttled because it rewrites the whole index buffer.
///
/// GPU resources are created on the first [`update`](Self::update) and must be released
/// with [`destroy`](Self::destroy), which needs the device.
pub struct ClassificationPrimitive {
    // Geometry before upload, GPU handles after.
    state: ResourceState,
    // Index buffer plus per-mesh offset/count tables.
    store: IndexStore,
    // Current runs of the index buffer.
    batches: Vec<BatchDescriptor>,
    rebatcher: Rebatcher,
    mesh_ids: Vec<u32>,
    center: Vec3,
    bounding_volumes: Vec<Aabb>,
    bounding_volume: Aabb,
    owner: PickOwner,
    batch_table: Arc<dyn BatchTable>,
    settings: ClassificationSettings,
    classification_type: ClassificationType,
    render_states: ClassificationRenderStates,
    uniforms: Arc<RwLock<SharedUniforms>>,
    // Base bindings handed to the batch table; built once so rebuilt commands compare equal.
    base_uniform_map: UniformMap,

    color_commands: Vec<DrawCommand>,
    ignore_show_commands: Vec<DrawCommand>,
    pick_commands: Vec<DrawCommand>,

    // --- Dirty tracking ---
    batch_dirty: bool,
    color_commands_dirty: bool,
    ignore_show_dirty: bool,
    pick_dirty: bool,
    wireframe_dirty: bool,
    updating_all_commands: bool,

    // --- Debug toggles ---
    force_rebatch: bool,
    debug_wireframe: bool,
    // Wireframe state currently written into the color commands.
    applied_wireframe: bool,

    stats: ClassificationStats,
    destroyed: bool,
}

impl ClassificationPrimitive {
    /// Creates a primitive. No GPU work happens until the first update.
    ///
    /// # Panics
    ///
    /// Panics if the per-mesh tables differ in length, if a mesh range exceeds the index
    /// array, if the meshes do not account for every index, if `batches` does not
    /// partition the index array, or if a mesh id is not exactly representable as the
    /// `f32` vertex attribute (ids above 2^24).
    pub fn new(options: ClassificationPrimitiveOptions) -> Self {
        let ClassificationPrimitiveOptions {
            positions,
            vertex_mesh_ids,
            indices,
            index_offsets,
            index_counts,
            batches,
            center,
            bounding_volumes,
            bounding_volume,
            mesh_ids,
            owner,
            batch_table,
            settings,
        } = options;

        assert_eq!(
            positions.len(),
            vertex_mesh_ids.len(),
            "one mesh id per vertex is required"
        );
        assert_eq!(
            bounding_volumes.len(),
            mesh_ids.len(),
            "one bounding volume per mesh is required"
        );
        assert!(
            mesh_ids.iter().chain(&vertex_mesh_ids).all(|&id| id <= MAX_MESH_ID),
            "mesh ids above {MAX_MESH_ID} do not fit the float id attribute"
        );
        let total: u64 = index_counts.iter().map(|&c| u64::from(c)).sum();
        assert_eq!(
            total,
            indices.len() as u64,
            "mesh index counts do not cover the index array"
        );

        let store = IndexStore::new(indices, index_offsets, index_counts, &mesh_ids);
        assert!(
            is_partition(&batches, store.len()),
            "initial batches do not partition the index array"
        );

        let uniforms = Arc::new(RwLock::new(SharedUniforms {
            modified_model_view_projection: Mat4::IDENTITY,
            highlight_color: DEFAULT_COLOR,
        }));
        let base_uniform_map = base_uniform_map(&uniforms);

        Self {
            state: ResourceState::Uninitialized(PendingGeometry {
                positions,
                vertex_mesh_ids,
            }),
            store,
            batches,
            rebatcher: Rebatcher::new(settings.max_stale_frames),
            mesh_ids,
            center,
            bounding_volumes,
            bounding_volume,
            owner,
            batch_table,
            classification_type: settings.classification_type,
            settings,
            render_states: ClassificationRenderStates::new(),
            uniforms,
            base_uniform_map,
            color_commands: Vec::new(),
            ignore_show_commands: Vec::new(),
            pick_commands: Vec::new(),
            batch_dirty: true,
            color_commands_dirty: true,
            ignore_show_dirty: true,
            pick_dirty: true,
            wireframe_dirty: false,
            updating_all_commands: false,
            force_rebatch: false,
            debug_wireframe: false,
            applied_wireframe: false,
            stats: ClassificationStats::default(),
            destroyed: false,
        }
    }

    // --- Accessors ---

    /// The current runs of the index buffer.
    pub fn batches(&self) -> &[BatchDescriptor] {
        &self.batches
    }

    /// The index buffer and per-mesh tables.
    pub fn index_store(&self) -> &IndexStore {
        &self.store
    }

    /// The stable ids of the meshes, in table order.
    pub fn mesh_ids(&self) -> &[u32] {
        &self.mesh_ids
    }

    /// The current per-run color commands.
    pub fn color_commands(&self) -> &[DrawCommand] {
        &self.color_commands
    }

    /// The current ignore-show commands.
    pub fn ignore_show_commands(&self) -> &[DrawCommand] {
        &self.ignore_show_commands
    }

    /// The current per-mesh pick commands.
    pub fn pick_commands(&self) -> &[DrawCommand] {
        &self.pick_commands
    }

    /// Statistics as of the last update.
    pub fn stats(&self) -> &ClassificationStats {
        &self.stats
    }

    /// The settings the primitive was created with.
    pub fn settings(&self) -> &ClassificationSettings {
        &self.settings
    }

    /// Returns `true` once the GPU resources exist.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ResourceState::Ready(_))
    }

    /// Returns `true` after [`destroy`](Self::destroy). Every other operation panics
    /// on a destroyed primitive.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The color the highlight uniform currently evaluates to.
    pub fn highlight_color(&self) -> LinearRgba {
        self.read_uniforms().highlight_color
    }

    /// The relative-to-center model-view-projection computed by the last update.
    pub fn modified_model_view_projection(&self) -> Mat4 {
        self.read_uniforms().modified_model_view_projection
    }

    // --- Debug toggles and properties ---

    /// Which passes commands are queued to.
    pub fn classification_type(&self) -> ClassificationType {
        self.classification_type
    }

    /// Changes which passes commands are queued to.
    pub fn set_classification_type(&mut self, classification_type: ClassificationType) {
        self.assert_alive();
        if self.classification_type != classification_type {
            self.classification_type = classification_type;
            self.ignore_show_dirty = true;
        }
    }

    /// Returns `true` if pending rebatches run without throttling.
    pub fn force_rebatch(&self) -> bool {
        self.force_rebatch
    }

    /// Makes pending rebatches run on the next update instead of being throttled.
    pub fn set_force_rebatch(&mut self, force: bool) {
        self.assert_alive();
        self.force_rebatch = force;
    }

    /// Returns `true` if color commands are drawn as wireframes.
    pub fn debug_wireframe(&self) -> bool {
        self.debug_wireframe
    }

    /// Draws color commands as unstenciled wireframes, for debugging the volumes.
    pub fn set_debug_wireframe(&mut self, enabled: bool) {
        self.assert_alive();
        self.debug_wireframe = enabled;
    }

    /// Returns `true` while [`update_commands`](Self::update_commands) is suppressed.
    pub fn updating_all_commands(&self) -> bool {
        self.updating_all_commands
    }

    /// Suppresses [`update_commands`](Self::update_commands) while the host rewrites
    /// every feature at once, typically before applying a style.
    pub fn set_updating_all_commands(&mut self, updating: bool) {
        self.assert_alive();
        self.updating_all_commands = updating;
    }

    // --- Public operations ---

    /// Creates a feature record for every mesh, stored at `features[mesh_id]`.
    pub fn create_features(
        &self,
        owner: PickOwner,
        features: &mut Vec<Option<ClassificationFeature>>,
    ) {
        self.assert_alive();
        if let Some(&max_id) = self.mesh_ids.iter().max() {
            if features.len() <= max_id as usize {
                features.resize(max_id as usize + 1, None);
            }
        }
        for &id in &self.mesh_ids {
            features[id as usize] = Some(ClassificationFeature::new(owner, id));
        }
    }

    /// Highlights every feature with `color` when `enabled`, or restores white.
    pub fn apply_debug_settings(&mut self, enabled: bool, color: LinearRgba) {
        self.assert_alive();
        let mut uniforms = self.uniforms.write().unwrap_or_else(PoisonError::into_inner);
        uniforms.highlight_color = if enabled { color } else { DEFAULT_COLOR };
    }

    /// Applies `style` to the features of this primitive, or clears them to the default
    /// color and visibility with `None`.
    ///
    /// A uniform style (with the fast path enabled) and `None` both collapse the batches
    /// into a single full-range run right away. Any other style is evaluated per mesh and
    /// each changed color is routed through [`update_commands`](Self::update_commands).
    pub fn apply_style(
        &mut self,
        style: Option<&dyn ClassificationStyle>,
        features: &mut [Option<ClassificationFeature>],
    ) {
        self.assert_alive();

        let Some(style) = style else {
            self.clear_style(features);
            return;
        };

        if style.is_uniform() && self.settings.uniform_style_fast_path {
            // A uniform style gives every feature the same color, records or not.
            let placeholder =
                ClassificationFeature::new(self.owner, self.mesh_ids.first().copied().unwrap_or(0));
            let run_color = style.color(&placeholder);

            self.updating_all_commands = true;
            for &id in &self.mesh_ids {
                if let Some(feature) = feature_mut(features, id) {
                    feature.color = style.color(feature);
                    feature.show = style.show(feature);
                }
            }
            self.updating_all_commands = false;
            self.collapse(run_color);
            return;
        }

        for i in 0..self.mesh_ids.len() {
            let id = self.mesh_ids[i];
            let Some(feature) = feature_mut(features, id) else {
                continue;
            };
            let color = style.color(feature);
            feature.show = style.show(feature);
            if color.to_packed() != feature.color.to_packed() {
                feature.color = color;
                self.update_commands(id, color);
            }
        }
    }

    /// Moves mesh `mesh_id` into a run of its own drawn with `color`.
    ///
    /// The run containing the mesh is split around it: meshes before it stay in the
    /// original run, meshes after it form a new run. No index data moves; merging runs
    /// of equal color is left to the next eligible rebatch. Unknown ids are ignored, as
    /// are all calls while [`updating_all_commands`](Self::updating_all_commands) is set.
    pub fn update_commands(&mut self, mesh_id: u32, color: LinearRgba) {
        self.assert_alive();
        if self.updating_all_commands {
            return;
        }
        let Some(index) = self.store.table_index(mesh_id) else {
            return;
        };
        let (offset, count) = self.store.range(index);

        let Some(position) = self.batches.iter().position(|b| b.contains_mesh(mesh_id)) else {
            panic!("mesh {mesh_id} is not a member of any batch");
        };

        self.batches
            .push(BatchDescriptor::new(color, offset, count, vec![mesh_id]));

        let (start_ids, end_ids): (Vec<u32>, Vec<u32>) = self.batches[position]
            .mesh_ids
            .iter()
            .copied()
            .filter(|&id| id != mesh_id)
            .partition(|&id| {
                let member = self
                    .store
                    .table_index(id)
                    .unwrap_or_else(|| panic!("batch references unknown mesh {id}"));
                self.store.range(member).0 < offset
            });

        let original = &self.batches[position];
        if !end_ids.is_empty() {
            let end_offset = offset + count;
            let end = BatchDescriptor::new(
                original.color,
                end_offset,
                original.end() - end_offset,
                end_ids,
            );
            self.batches.push(end);
        }

        if start_ids.is_empty() {
            self.batches.remove(position);
        } else {
            let original = &mut self.batches[position];
            original.count = offset - original.offset;
            original.mesh_ids = start_ids;
        }

        self.batch_dirty = true;
        self.color_commands_dirty = true;
    }

    /// Brings the primitive up to date and appends its commands to the frame's queue.
    ///
    /// Creates GPU resources on first use, rebatches when due, rebuilds whichever
    /// command sets are stale and queues the color commands (render pass) and the pick
    /// commands (pick pass).
    pub fn update(&mut self, frame: &mut FrameState<'_>) -> Result<(), ClassificationError> {
        self.assert_alive();
        let resources = self.ensure_resources(frame.device)?;
        self.update_uniforms(&frame.view, &frame.projection);

        let mut queued = 0;
        if frame.passes.render {
            self.ensure_color_commands(frame.device, &resources)?;

            let invert = frame.invert_classification && self.classification_type.classifies_tiles();
            if invert && self.ignore_show_dirty {
                build_ignore_show_commands(
                    &mut self.ignore_show_commands,
                    &self.color_commands,
                    resources.programs.stencil,
                );
                self.ignore_show_dirty = false;
            }

            self.update_wireframe();

            queued += if self.applied_wireframe {
                queue_wireframe_commands(frame.command_list, &self.color_commands)
            } else {
                queue_commands(
                    frame.command_list,
                    &self.color_commands,
                    invert.then_some(self.ignore_show_commands.as_slice()),
                    self.classification_type,
                )
            };
        }

        if frame.passes.pick {
            self.ensure_pick_commands(&resources)?;
            queued += queue_commands(
                frame.command_list,
                &self.pick_commands,
                None,
                self.classification_type,
            );
        }

        self.stats.frame_number += 1;
        self.stats.runs = self.batches.len();
        self.stats.deferred_frames = self.rebatcher.stale_frames();
        self.stats.commands_queued = queued;
        Ok(())
    }

    /// Releases every GPU resource. Must be called exactly once, with the device the
    /// resources were created on.
    ///
    /// # Panics
    ///
    /// Panics if the primitive was already destroyed.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) -> Result<(), ClassificationError> {
        self.assert_alive();
        self.destroyed = true;

        let state = std::mem::replace(
            &mut self.state,
            ResourceState::Uninitialized(PendingGeometry::default()),
        );
        let released = match state {
            ResourceState::Ready(resources) => release_resources(device, resources),
            ResourceState::Uninitialized(_) => Ok(()),
        };
        let indices = self.store.destroy_buffers(device);

        self.color_commands.clear();
        self.ignore_show_commands.clear();
        self.pick_commands.clear();
        log::info!("Destroyed classification primitive {:?}", self.owner);

        released?;
        indices?;
        Ok(())
    }

    // --- Internals ---

    fn assert_alive(&self) {
        assert!(!self.destroyed, "classification primitive used after destroy");
    }

    fn read_uniforms(&self) -> SharedUniforms {
        *self.uniforms.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_resources(
        &mut self,
        device: &dyn GraphicsDevice,
    ) -> Result<GpuResources, ClassificationError> {
        let geometry = match &self.state {
            ResourceState::Ready(resources) => return Ok(*resources),
            ResourceState::Uninitialized(geometry) => geometry,
        };

        let resources = create_resources(device, geometry, self.batch_table.as_ref())?;
        if let Err(err) = self
            .store
            .create_buffers(device, self.settings.prefer_device_copy)
        {
            if let Err(e) = release_resources(device, resources) {
                log::warn!("Failed to release classification resources after a setup error: {e}");
            }
            return Err(err.into());
        }

        log::info!(
            "Created classification resources for {:?}: {} meshes, {} indices, {} copy",
            self.owner,
            self.store.mesh_count(),
            self.store.len(),
            if self.store.uses_device_copy() { "device" } else { "CPU" },
        );
        self.state = ResourceState::Ready(resources);
        Ok(resources)
    }

    fn update_uniforms(&self, view: &Mat4, projection: &Mat4) {
        let center_in_eye = view.transform_point(self.center);
        let modified = *projection * view.with_translation(center_in_eye);
        let mut uniforms = self.uniforms.write().unwrap_or_else(PoisonError::into_inner);
        uniforms.modified_model_view_projection = modified;
    }

    fn command_template(&self, resources: &GpuResources) -> Result<CommandTemplate, ClassificationError> {
        let buffers = self.store.buffers().ok_or(ResourceError::NotFound)?;
        Ok(CommandTemplate {
            owner: self.owner,
            vertex_array: VertexArray {
                positions: resources.positions,
                mesh_ids: resources.mesh_ids,
                index_buffer: buffers.active,
                index_format: self.store.format(),
            },
            model_matrix: Mat4::IDENTITY,
            bounding_volume: self.bounding_volume,
        })
    }

    fn ensure_color_commands(
        &mut self,
        device: &dyn GraphicsDevice,
        resources: &GpuResources,
    ) -> Result<(), ClassificationError> {
        if self.batch_dirty {
            match self
                .rebatcher
                .rebatch(device, &mut self.store, &mut self.batches, self.force_rebatch)?
            {
                RebatchOutcome::Clean => self.batch_dirty = false,
                RebatchOutcome::Deferred { .. } => {}
                RebatchOutcome::Rebatched { .. } => {
                    self.batch_dirty = false;
                    self.color_commands_dirty = true;
                    self.pick_dirty = true;
                    self.stats.rebatches += 1;
                }
            }
        }

        if self.color_commands_dirty {
            let template = self.command_template(resources)?;
            let uniform_map = self.batch_table.uniform_map(self.base_uniform_map.clone());
            build_color_commands(
                &mut self.color_commands,
                &self.batches,
                &template,
                &self.render_states,
                resources.programs.color,
                &uniform_map,
            );
            self.color_commands_dirty = false;
            self.ignore_show_dirty = true;
            self.wireframe_dirty = true;
        }
        Ok(())
    }

    fn ensure_pick_commands(&mut self, resources: &GpuResources) -> Result<(), ClassificationError> {
        if self.pick_dirty {
            let template = self.command_template(resources)?;
            let uniform_map = self.batch_table.pick_uniform_map(self.base_uniform_map.clone());
            build_pick_commands(
                &mut self.pick_commands,
                &self.store,
                &self.bounding_volumes,
                &template,
                &self.render_states,
                &resources.programs,
                &uniform_map,
            );
            self.pick_dirty = false;
        }
        Ok(())
    }

    fn update_wireframe(&mut self) {
        let unchanged = self.debug_wireframe == self.applied_wireframe;
        // Rebuilt color commands come back filled and need the wireframe state again.
        if unchanged && !(self.debug_wireframe && self.wireframe_dirty) {
            self.wireframe_dirty = false;
            return;
        }
        apply_wireframe(&mut self.color_commands, &self.render_states, self.debug_wireframe);
        self.applied_wireframe = self.debug_wireframe;
        self.wireframe_dirty = false;
    }

    // Replaces the batches with one run over the whole buffer, members in buffer order.
    fn collapse(&mut self, color: LinearRgba) {
        let mut ids = self.mesh_ids.clone();
        ids.sort_by_key(|&id| self.store.table_index(id).map(|i| self.store.range(i).0));
        self.batches = vec![BatchDescriptor::new(color, 0, self.store.len(), ids)];
        self.rebatcher.reset();
        self.batch_dirty = false;
        self.color_commands_dirty = true;
    }

    fn clear_style(&mut self, features: &mut [Option<ClassificationFeature>]) {
        self.updating_all_commands = true;
        for &id in &self.mesh_ids {
            if let Some(feature) = feature_mut(features, id) {
                feature.color = DEFAULT_COLOR;
                feature.show = DEFAULT_SHOW;
            }
        }
        self.updating_all_commands = false;
        self.collapse(DEFAULT_COLOR);
    }
}

impl Agent for ClassificationPrimitive {
    type Context<'a> = FrameState<'a>;
    type Status = ClassificationStats;
    type Error = ClassificationError;

    fn update(&mut self, frame: &mut FrameState<'_>) -> Result<(), ClassificationError> {
        ClassificationPrimitive::update(self, frame)
    }

    fn report_status(&self) -> ClassificationStats {
        self.stats.clone()
    }
}

impl Drop for ClassificationPrimitive {
    fn drop(&mut self) {
        if !self.destroyed && self.is_ready() {
            log::warn!(
                "Classification primitive {:?} dropped without destroy; its GPU resources leak",
                self.owner
            );
        }
    }
}

fn feature_mut(
    features: &mut [Option<ClassificationFeature>],
    mesh_id: u32,
) -> Option<&mut ClassificationFeature> {
    features.get_mut(mesh_id as usize).and_then(Option::as_mut)
}

fn base_uniform_map(uniforms: &Arc<RwLock<SharedUniforms>>) -> UniformMap {
    let mvp = Arc::clone(uniforms);
    let highlight = Arc::clone(uniforms);
    let mvp: UniformFn = Arc::new(move || {
        let state = mvp.read().unwrap_or_else(PoisonError::into_inner);
        UniformValue::Mat4(state.modified_model_view_projection)
    });
    let highlight: UniformFn = Arc::new(move || {
        let state = highlight.read().unwrap_or_else(PoisonError::into_inner);
        UniformValue::Color(state.highlight_color)
    });
    UniformMap::new()
        .with(shaders::MODIFIED_MVP_UNIFORM, mvp)
        .with(shaders::HIGHLIGHT_COLOR_UNIFORM, highlight)
}
