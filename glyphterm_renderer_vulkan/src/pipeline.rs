//! Graphics pipelines for the terminal grid
//!
//! Two draw paths cover the same visual output:
//! - Mesh path: task + mesh + fragment shaders, a single
//!   `draw_mesh_tasks(1, 1, 1)` expands the whole grid on the GPU from the
//!   cell-index buffer.
//! - Vertex path: the CPU builds six vertices per cell and draws them with a
//!   classic vertex + fragment pipeline.
//!
//! The grid's distinct-character count reaches the shaders through a
//! specialization constant, so pipelines are rebuilt on every content update.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glyphterm_engine::{term_debug, term_err, Result, TerminalGrid};
use std::path::Path;
use std::sync::Arc;

use crate::context::VulkanContext;
use crate::spirv::SpirvFile;

/// Specialization constant ID carrying the atlas cell count into shaders.
pub const CHAR_COUNT_CONSTANT_ID: u32 = 555;

/// Which pipeline family renders the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPath {
    /// Task/mesh shader expansion (requires VK_EXT_mesh_shader).
    Mesh,
    /// CPU-built per-cell quads through the classic vertex stage.
    Vertex,
}

/// One vertex of a cell quad: NDC position and atlas UV.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CellVertex {
    pub x: f32,
    pub y: f32,
    pub u: f32,
    pub v: f32,
}

/// Build six vertices per grid cell for the vertex draw path.
///
/// Cell (col, row) maps to the NDC rectangle
/// `[-1 + 2*col/w, -1 + 2*(col+1)/w] x [-1 + 2*row/h, -1 + 2*(row+1)/h]`;
/// its U range is the cell's atlas strip slice `[i/n, (i+1)/n]` with V
/// spanning the full strip height. `indices` is row-major per-cell atlas
/// indices, `atlas_cells` the strip's total cell count.
pub fn build_cell_vertices(
    grid: &TerminalGrid,
    indices: &[u32],
    atlas_cells: u32,
) -> Vec<CellVertex> {
    let w = grid.width() as f32;
    let h = grid.height() as f32;
    let n = atlas_cells as f32;
    let mut vertices = Vec::with_capacity(indices.len() * 6);

    for (cell, &index) in indices.iter().enumerate() {
        let col = (cell % grid.width()) as f32;
        let row = (cell / grid.width()) as f32;

        let x0 = -1.0 + 2.0 * col / w;
        let x1 = -1.0 + 2.0 * (col + 1.0) / w;
        let y0 = -1.0 + 2.0 * row / h;
        let y1 = -1.0 + 2.0 * (row + 1.0) / h;
        let u0 = index as f32 / n;
        let u1 = (index + 1) as f32 / n;

        vertices.extend_from_slice(&[
            CellVertex { x: x0, y: y0, u: u0, v: 0.0 },
            CellVertex { x: x1, y: y0, u: u1, v: 0.0 },
            CellVertex { x: x0, y: y1, u: u0, v: 1.0 },
            CellVertex { x: x1, y: y0, u: u1, v: 0.0 },
            CellVertex { x: x1, y: y1, u: u1, v: 1.0 },
            CellVertex { x: x0, y: y1, u: u0, v: 1.0 },
        ]);
    }

    vertices
}

/// The mapped SPIR-V binaries for one draw path.
pub struct ShaderSet {
    pub task: Option<SpirvFile>,
    pub mesh: Option<SpirvFile>,
    pub vertex: Option<SpirvFile>,
    pub fragment: SpirvFile,
}

impl ShaderSet {
    /// Load the shader binaries for `draw_path` from `dir`.
    ///
    /// Mesh path expects `task.spv`, `mesh.spv`, `fragment.spv`; vertex path
    /// expects `vertex.spv`, `fragment.spv`.
    pub fn from_dir(dir: &Path, draw_path: DrawPath) -> Result<Self> {
        let fragment = SpirvFile::open(&dir.join("fragment.spv"))?;
        match draw_path {
            DrawPath::Mesh => Ok(Self {
                task: Some(SpirvFile::open(&dir.join("task.spv"))?),
                mesh: Some(SpirvFile::open(&dir.join("mesh.spv"))?),
                vertex: None,
                fragment,
            }),
            DrawPath::Vertex => Ok(Self {
                task: None,
                mesh: None,
                vertex: Some(SpirvFile::open(&dir.join("vertex.spv"))?),
                fragment,
            }),
        }
    }
}

/// A compiled grid pipeline, specialized to one atlas cell count.
pub struct GridPipeline {
    context: Arc<VulkanContext>,
    pub handle: vk::Pipeline,
    pub draw_path: DrawPath,
}

fn create_shader_module(context: &VulkanContext, spirv: &SpirvFile) -> Result<vk::ShaderModule> {
    let words = spirv.words()?;
    let create_info = vk::ShaderModuleCreateInfo::default().code(words);
    unsafe {
        context
            .device
            .create_shader_module(&create_info, None)
            .map_err(|e| {
                term_err!(
                    "glyphterm::pipeline",
                    "Failed to create shader module from {}: {:?}",
                    spirv.path(),
                    e
                )
            })
    }
}

impl GridPipeline {
    /// Build the pipeline for `draw_path`, specialized to `atlas_cells`.
    pub fn new(
        context: Arc<VulkanContext>,
        shaders: &ShaderSet,
        draw_path: DrawPath,
        pipeline_layout: vk::PipelineLayout,
        render_pass: vk::RenderPass,
        atlas_cells: u32,
    ) -> Result<Self> {
        let device = &context.device;

        let spec_data = atlas_cells.to_ne_bytes();
        let spec_entries = [vk::SpecializationMapEntry::default()
            .constant_id(CHAR_COUNT_CONSTANT_ID)
            .offset(0)
            .size(std::mem::size_of::<u32>())];
        let spec_info = vk::SpecializationInfo::default()
            .map_entries(&spec_entries)
            .data(&spec_data);

        let mut modules: Vec<vk::ShaderModule> = Vec::with_capacity(3);
        let result = Self::build(
            &context,
            shaders,
            draw_path,
            pipeline_layout,
            render_pass,
            &spec_info,
            &mut modules,
        );
        // Modules are only needed during pipeline creation.
        unsafe {
            for module in modules {
                device.destroy_shader_module(module, None);
            }
        }
        let handle = result?;

        term_debug!(
            "glyphterm::pipeline",
            "{:?} pipeline created for {} atlas cells",
            draw_path,
            atlas_cells
        );

        Ok(Self { context, handle, draw_path })
    }

    fn build(
        context: &VulkanContext,
        shaders: &ShaderSet,
        draw_path: DrawPath,
        pipeline_layout: vk::PipelineLayout,
        render_pass: vk::RenderPass,
        spec_info: &vk::SpecializationInfo,
        modules: &mut Vec<vk::ShaderModule>,
    ) -> Result<vk::Pipeline> {
        let device = &context.device;

        let mut stages: Vec<vk::PipelineShaderStageCreateInfo> = Vec::with_capacity(3);
        match draw_path {
            DrawPath::Mesh => {
                let task = shaders.task.as_ref().ok_or_else(|| {
                    term_err!("glyphterm::pipeline", "Mesh path requires a task shader")
                })?;
                let mesh = shaders.mesh.as_ref().ok_or_else(|| {
                    term_err!("glyphterm::pipeline", "Mesh path requires a mesh shader")
                })?;
                let task_module = create_shader_module(context, task)?;
                modules.push(task_module);
                let mesh_module = create_shader_module(context, mesh)?;
                modules.push(mesh_module);
                stages.push(
                    vk::PipelineShaderStageCreateInfo::default()
                        .stage(vk::ShaderStageFlags::TASK_EXT)
                        .module(task_module)
                        .name(c"main"),
                );
                stages.push(
                    vk::PipelineShaderStageCreateInfo::default()
                        .stage(vk::ShaderStageFlags::MESH_EXT)
                        .module(mesh_module)
                        .name(c"main")
                        .specialization_info(spec_info),
                );
            }
            DrawPath::Vertex => {
                let vertex = shaders.vertex.as_ref().ok_or_else(|| {
                    term_err!("glyphterm::pipeline", "Vertex path requires a vertex shader")
                })?;
                let vertex_module = create_shader_module(context, vertex)?;
                modules.push(vertex_module);
                stages.push(
                    vk::PipelineShaderStageCreateInfo::default()
                        .stage(vk::ShaderStageFlags::VERTEX)
                        .module(vertex_module)
                        .name(c"main")
                        .specialization_info(spec_info),
                );
            }
        }
        let fragment_module = create_shader_module(context, &shaders.fragment)?;
        modules.push(fragment_module);
        stages.push(
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module)
                .name(c"main"),
        );

        let vertex_bindings = [vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(std::mem::size_of::<CellVertex>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)];
        let vertex_attributes = [
            vk::VertexInputAttributeDescription::default()
                .location(0)
                .binding(0)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(0),
            vk::VertexInputAttributeDescription::default()
                .location(1)
                .binding(0)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(8),
        ];
        let vertex_input = match draw_path {
            DrawPath::Mesh => vk::PipelineVertexInputStateCreateInfo::default(),
            DrawPath::Vertex => vk::PipelineVertexInputStateCreateInfo::default()
                .vertex_binding_descriptions(&vertex_bindings)
                .vertex_attribute_descriptions(&vertex_attributes),
        };

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

        // Viewport and scissor are dynamic so pipelines survive resizes.
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::CLOCKWISE)
            .line_width(1.0);

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL);

        let blend_attachment = [vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD)
            .color_write_mask(vk::ColorComponentFlags::RGBA)];
        let color_blend =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachment);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let mut create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(pipeline_layout)
            .render_pass(render_pass)
            .subpass(0);
        if draw_path == DrawPath::Vertex {
            create_info = create_info
                .vertex_input_state(&vertex_input)
                .input_assembly_state(&input_assembly);
        }

        unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, e)| {
                    term_err!("glyphterm::pipeline", "Failed to create pipeline: {:?}", e)
                })?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    term_err!("glyphterm::pipeline", "Pipeline creation returned no pipelines")
                })
        }
    }
}

impl Drop for GridPipeline {
    fn drop(&mut self) {
        unsafe {
            self.context.device.destroy_pipeline(self.handle, None);
        }
    }
}
