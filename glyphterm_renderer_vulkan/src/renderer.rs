//! TerminalRenderer - frame presentation and GPU resource lifecycle
//!
//! Construction runs as an ordered chain of stages, each consuming the
//! previous stage's output: device context, then presentation resources
//! (swapchain, render pass, per-image set), then the draw machinery
//! (descriptors, commands, sync pool), then one content-update pass to
//! populate the atlas and index buffer before the first frame.
//!
//! Steady state is the acquire -> submit -> present cycle in [`TerminalRenderer::run`],
//! bounded by the sync pool, with [`TerminalRenderer::notify_update`]
//! rebuilding the content resources whenever the grid changes.
//!
//! Single-threaded by contract: one CPU thread drives the frame loop and
//! content updates; CPU/GPU overlap is coordinated entirely through the
//! sync pool's fences and the per-image semaphores.

use ash::vk;
use glyphterm_engine::{
    term_debug, term_err, term_info, term_warn, Error, FontRaster, FrameControl, RendererConfig,
    Result, TerminalGrid,
};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::atlas::{self, AtlasImage};
use crate::buffer::HostBuffer;
use crate::commands::{CommandSuite, DrawParams};
use crate::context::VulkanContext;
use crate::descriptor::DescriptorSuite;
use crate::frame_resources::FrameResources;
use crate::pipeline::{build_cell_vertices, DrawPath, GridPipeline, ShaderSet};
use crate::render_pass::GridRenderPass;
use crate::swapchain::{PresentOutcome, SwapchainBundle};
use crate::sync_pool::FrameSyncPool;

/// Content-dependent GPU resources, replaced wholesale on every update.
struct ContentResources {
    atlas: AtlasImage,
    index_buffer: HostBuffer,
    /// Vertex-path quads; `None` on the mesh path.
    vertex_buffer: Option<HostBuffer>,
    pipeline: GridPipeline,
    cell_count: u32,
}

// Construction stages. Each stage owns everything built so far and hands it
// to the next; a failure anywhere aborts the whole chain.

struct DeviceStage {
    context: Arc<VulkanContext>,
    config: RendererConfig,
    draw_path: DrawPath,
}

struct PresentationStage {
    context: Arc<VulkanContext>,
    config: RendererConfig,
    draw_path: DrawPath,
    swapchain: SwapchainBundle,
    render_pass: GridRenderPass,
    frames: FrameResources,
}

struct MachineryStage {
    context: Arc<VulkanContext>,
    config: RendererConfig,
    draw_path: DrawPath,
    swapchain: SwapchainBundle,
    render_pass: GridRenderPass,
    frames: FrameResources,
    descriptors: DescriptorSuite,
    commands: CommandSuite,
    sync_pool: FrameSyncPool,
    shaders: ShaderSet,
}

impl DeviceStage {
    fn new<W: HasDisplayHandle>(
        window: &W,
        config: RendererConfig,
        requested_path: Option<DrawPath>,
    ) -> Result<Self> {
        let context = VulkanContext::new(window, &config)?;

        let draw_path = match requested_path {
            Some(DrawPath::Mesh) if !context.mesh_shader_enabled => {
                return Err(Error::InitializationFailed(
                    "Mesh draw path requested but VK_EXT_mesh_shader is unavailable".to_string(),
                ));
            }
            Some(path) => path,
            None if context.mesh_shader_enabled => DrawPath::Mesh,
            None => DrawPath::Vertex,
        };
        term_info!("glyphterm::renderer", "Selected {:?} draw path", draw_path);

        Ok(Self { context, config, draw_path })
    }

    fn into_presentation<W: HasDisplayHandle + HasWindowHandle>(
        self,
        window: &W,
    ) -> Result<PresentationStage> {
        // Failures here happen before the renderer exists; they surface as
        // InitializationFailed rather than per-frame backend errors.
        let swapchain =
            SwapchainBundle::new(Arc::clone(&self.context), window).map_err(Error::into_init)?;
        let render_pass = GridRenderPass::new(Arc::clone(&self.context), swapchain.format)
            .map_err(Error::into_init)?;
        let frames = FrameResources::new(
            Arc::clone(&self.context),
            swapchain.images(),
            swapchain.format,
            swapchain.extent,
            render_pass.handle,
        )
        .map_err(Error::into_init)?;

        Ok(PresentationStage {
            context: self.context,
            config: self.config,
            draw_path: self.draw_path,
            swapchain,
            render_pass,
            frames,
        })
    }
}

impl PresentationStage {
    fn into_machinery(self, shader_dir: &Path) -> Result<MachineryStage> {
        let descriptors = DescriptorSuite::new(Arc::clone(&self.context), self.draw_path)
            .map_err(Error::into_init)?;
        let commands = CommandSuite::new(Arc::clone(&self.context), self.swapchain.image_count())
            .map_err(Error::into_init)?;
        let sync_pool = FrameSyncPool::new(
            Arc::clone(&self.context),
            self.config.frames_in_flight,
            self.config.fence_wait_timeout_ns,
        )
        .map_err(Error::into_init)?;
        let shaders = ShaderSet::from_dir(shader_dir, self.draw_path)?;

        Ok(MachineryStage {
            context: self.context,
            config: self.config,
            draw_path: self.draw_path,
            swapchain: self.swapchain,
            render_pass: self.render_pass,
            frames: self.frames,
            descriptors,
            commands,
            sync_pool,
            shaders,
        })
    }
}

/// Ordered construction of a [`TerminalRenderer`].
pub struct RendererBuilder {
    config: RendererConfig,
    shader_dir: PathBuf,
    draw_path: Option<DrawPath>,
}

impl RendererBuilder {
    pub fn new(shader_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: RendererConfig::default(),
            shader_dir: shader_dir.into(),
            draw_path: None,
        }
    }

    pub fn config(mut self, config: RendererConfig) -> Self {
        self.config = config;
        self
    }

    /// Force a draw path instead of auto-detecting mesh shader support.
    pub fn draw_path(mut self, path: DrawPath) -> Self {
        self.draw_path = Some(path);
        self
    }

    /// Run the construction chain and the initial content update.
    pub fn build<W: HasDisplayHandle + HasWindowHandle>(
        self,
        window: &W,
        grid: TerminalGrid,
        font: Box<dyn FontRaster>,
    ) -> Result<TerminalRenderer> {
        let machinery = DeviceStage::new(window, self.config, self.draw_path)?
            .into_presentation(window)?
            .into_machinery(&self.shader_dir)?;

        let mut renderer = TerminalRenderer {
            context: machinery.context,
            config: machinery.config,
            draw_path: machinery.draw_path,
            grid,
            font,
            content: None,
            commands: machinery.commands,
            descriptors: machinery.descriptors,
            sync_pool: machinery.sync_pool,
            frames: machinery.frames,
            render_pass: machinery.render_pass,
            swapchain: machinery.swapchain,
            shaders: machinery.shaders,
        };
        renderer.notify_update()?;
        term_info!("glyphterm::renderer", "Renderer initialized");
        Ok(renderer)
    }
}

/// The terminal grid renderer.
///
/// Field order doubles as teardown order: content resources first, then the
/// draw machinery, then presentation state, with the shared device context
/// released last.
pub struct TerminalRenderer {
    context: Arc<VulkanContext>,
    config: RendererConfig,
    draw_path: DrawPath,
    grid: TerminalGrid,
    font: Box<dyn FontRaster>,
    content: Option<ContentResources>,
    commands: CommandSuite,
    descriptors: DescriptorSuite,
    sync_pool: FrameSyncPool,
    frames: FrameResources,
    render_pass: GridRenderPass,
    swapchain: SwapchainBundle,
    shaders: ShaderSet,
}

impl TerminalRenderer {
    pub fn builder(shader_dir: impl Into<PathBuf>) -> RendererBuilder {
        RendererBuilder::new(shader_dir)
    }

    pub fn grid(&self) -> &TerminalGrid {
        &self.grid
    }

    /// Mutable access to the grid. Call [`Self::notify_update`] afterwards;
    /// the GPU keeps drawing the previous content until then.
    pub fn grid_mut(&mut self) -> &mut TerminalGrid {
        &mut self.grid
    }

    pub fn draw_path(&self) -> DrawPath {
        self.draw_path
    }

    /// Rebuild all content-dependent resources from the current grid.
    ///
    /// Creates the new atlas, index buffer and pipeline first, drains all
    /// in-flight frames, then swaps the descriptor bindings (both in one
    /// update), re-records every command buffer, and only then releases the
    /// superseded resources.
    pub fn notify_update(&mut self) -> Result<()> {
        let distinct = atlas::distinct_characters(&self.grid);
        atlas::check_capacity(&self.context, distinct.len(), self.config.cell_width)?;

        let index_map = atlas::atlas_indices(&distinct);
        let cells = atlas::cell_indices(&self.grid, &index_map)?;
        let pixels = atlas::compose_atlas(
            self.font.as_mut(),
            &distinct,
            self.config.cell_width,
            self.config.cell_height,
        )?;

        let atlas_image = AtlasImage::new(
            Arc::clone(&self.context),
            &pixels,
            distinct.len() as u32,
        )?;

        let index_bytes = (cells.len() * std::mem::size_of::<u32>()) as vk::DeviceSize;
        let mut index_buffer = HostBuffer::new(
            Arc::clone(&self.context),
            "glyphterm cell indices",
            index_bytes,
            vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        index_buffer.write(&cells)?;

        let vertex_buffer = match self.draw_path {
            DrawPath::Mesh => None,
            DrawPath::Vertex => {
                let vertices = build_cell_vertices(&self.grid, &cells, distinct.len() as u32);
                let bytes =
                    (vertices.len() * std::mem::size_of::<crate::pipeline::CellVertex>())
                        as vk::DeviceSize;
                let mut buffer = HostBuffer::new(
                    Arc::clone(&self.context),
                    "glyphterm cell vertices",
                    bytes,
                    vk::BufferUsageFlags::VERTEX_BUFFER,
                )?;
                buffer.write(&vertices)?;
                Some(buffer)
            }
        };

        let pipeline = GridPipeline::new(
            Arc::clone(&self.context),
            &self.shaders,
            self.draw_path,
            self.descriptors.pipeline_layout,
            self.render_pass.handle,
            distinct.len() as u32,
        )?;

        // Nothing in flight may still reference the old atlas or buffers
        // once the descriptor set points at the new ones.
        self.sync_pool.wait_all()?;

        self.commands
            .submit_one_shot(|cb| atlas_image.record_prepare_barrier(cb))?;

        self.descriptors
            .write(atlas_image.view, index_buffer.handle, index_bytes);

        self.content = Some(ContentResources {
            atlas: atlas_image,
            index_buffer,
            vertex_buffer,
            pipeline,
            cell_count: self.grid.len() as u32,
        });
        self.record_all_commands()?;

        if let Some(content) = &self.content {
            term_debug!(
                "glyphterm::renderer",
                "Content updated: {} atlas cells, {} grid cells",
                content.atlas.cell_count,
                content.cell_count
            );
        }
        Ok(())
    }

    fn record_all_commands(&self) -> Result<()> {
        let content = self.content.as_ref().ok_or_else(|| {
            term_err!("glyphterm::renderer", "Command recording before first content update")
        })?;

        for (index, image) in self.frames.images.iter().enumerate() {
            let params = DrawParams {
                render_pass: self.render_pass.handle,
                framebuffer: image.framebuffer,
                extent: self.swapchain.extent,
                pipeline: &content.pipeline,
                pipeline_layout: self.descriptors.pipeline_layout,
                descriptor_set: self.descriptors.set,
                vertex_buffer: content.vertex_buffer.as_ref(),
                index_buffer: &content.index_buffer,
                cell_count: content.cell_count,
            };
            self.commands.record(index, &params)?;
        }
        Ok(())
    }

    /// Tear down and rebuild everything tied to the swapchain after the
    /// surface changed (resize, out-of-date, suboptimal present).
    fn rebuild_presentation(&mut self) -> Result<()> {
        term_info!("glyphterm::renderer", "Rebuilding presentation resources");
        self.sync_pool.wait_all()?;
        unsafe {
            self.context.device.device_wait_idle().map_err(|e| {
                term_err!("glyphterm::renderer", "Wait-idle before rebuild failed: {:?}", e)
            })?;
        }

        // Old color views reference images owned by the old swapchain, so
        // they go first.
        self.frames.clear();
        self.swapchain.recreate()?;
        self.frames.rebuild(
            self.swapchain.images(),
            self.swapchain.format,
            self.swapchain.extent,
            self.render_pass.handle,
        )?;

        if self.commands.len() != self.swapchain.image_count() {
            self.commands = CommandSuite::new(
                Arc::clone(&self.context),
                self.swapchain.image_count(),
            )?;
        }
        self.record_all_commands()
    }

    /// Drive one tick of the presentation state machine:
    /// acquire a sync slot and a swapchain image, submit the pre-recorded
    /// commands, present, and report whether the loop should continue.
    ///
    /// Out-of-date surfaces are handled by rebuilding the presentation
    /// resources and skipping the tick; the next call presents normally.
    pub fn run(&mut self) -> Result<FrameControl> {
        let (slot_fence, acquire_semaphore) = {
            let slot = self.sync_pool.acquire_slot()?;
            (slot.fence, slot.acquire_semaphore)
        };

        let image_index = match self.swapchain.acquire_next_image(acquire_semaphore) {
            Ok(index) => index,
            Err(Error::SurfaceOutOfDate) => {
                // The slot fence was reset but never armed; re-arm it so the
                // ring does not deadlock a full cycle later.
                self.sync_pool.signal_slot(slot_fence)?;
                self.rebuild_presentation()?;
                return Ok(FrameControl::Continue);
            }
            Err(e) => {
                self.sync_pool.signal_slot(slot_fence)?;
                return Err(e);
            }
        };

        let image = &self.frames.images[image_index as usize];
        let render_complete = image.render_complete;
        let frame_retired = image.frame_retired;
        let command_buffer = self.commands.buffer(image_index as usize);

        unsafe {
            // First submission: render into the acquired image once it is
            // ready, then signal both present and retirement semaphores.
            let wait_infos = [vk::SemaphoreSubmitInfo::default()
                .semaphore(acquire_semaphore)
                .stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)];
            let cb_infos =
                [vk::CommandBufferSubmitInfo::default().command_buffer(command_buffer)];
            let signal_infos = [
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(render_complete)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS),
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(frame_retired)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS),
            ];
            let render_submit = vk::SubmitInfo2::default()
                .wait_semaphore_infos(&wait_infos)
                .command_buffer_infos(&cb_infos)
                .signal_semaphore_infos(&signal_infos);

            // Second submission: no commands, just turns frame retirement
            // into the slot's fence signal.
            let retire_wait = [vk::SemaphoreSubmitInfo::default()
                .semaphore(frame_retired)
                .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)];
            let retire_submit = vk::SubmitInfo2::default().wait_semaphore_infos(&retire_wait);

            self.context
                .device
                .queue_submit2(
                    self.context.graphics_queue,
                    &[render_submit],
                    vk::Fence::null(),
                )
                .map_err(|e| {
                    self.sync_pool.signal_slot(slot_fence).ok();
                    term_err!("glyphterm::renderer", "Render submission failed: {:?}", e)
                })?;
            self.context
                .device
                .queue_submit2(self.context.graphics_queue, &[retire_submit], slot_fence)
                .map_err(|e| {
                    term_err!("glyphterm::renderer", "Retire submission failed: {:?}", e)
                })?;
        }

        match self.swapchain.present(image_index, render_complete) {
            Ok(PresentOutcome::Presented) => {}
            Ok(PresentOutcome::Suboptimal) => {
                term_warn!("glyphterm::renderer", "Surface suboptimal after present");
                self.rebuild_presentation()?;
            }
            Err(Error::SurfaceOutOfDate) => {
                self.rebuild_presentation()?;
            }
            Err(e) => return Err(e),
        }

        Ok(FrameControl::Continue)
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        // Drain everything before the field drops start releasing resources
        // the GPU might still reference.
        if let Err(e) = self.sync_pool.wait_all() {
            term_warn!("glyphterm::renderer", "Drain on teardown failed: {}", e);
        }
        unsafe {
            self.context.device.device_wait_idle().ok();
        }
        term_debug!("glyphterm::renderer", "Renderer torn down");
    }
}
