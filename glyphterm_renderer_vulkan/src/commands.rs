//! Command pool and per-image command buffers
//!
//! Commands are recorded once per content update, not per frame: each
//! swapchain image keeps a long-lived command buffer recorded with
//! SIMULTANEOUS_USE so consecutive frames can replay it while an earlier
//! submission of the same buffer is still in flight.

use ash::vk;
use glyphterm_engine::{term_err, term_trace, Result};
use std::sync::Arc;

use crate::buffer::HostBuffer;
use crate::context::VulkanContext;
use crate::pipeline::{DrawPath, GridPipeline};

/// Everything needed to record one grid draw.
pub struct DrawParams<'a> {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub pipeline: &'a GridPipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub descriptor_set: vk::DescriptorSet,
    /// Quad vertices; present on the vertex path only.
    pub vertex_buffer: Option<&'a HostBuffer>,
    /// Per-cell atlas indices.
    pub index_buffer: &'a HostBuffer,
    /// Number of grid cells.
    pub cell_count: u32,
}

pub struct CommandSuite {
    context: Arc<VulkanContext>,
    mesh_loader: Option<ash::ext::mesh_shader::Device>,
    pool: vk::CommandPool,
    buffers: Vec<vk::CommandBuffer>,
}

impl CommandSuite {
    /// Create the pool and allocate one command buffer per swapchain image.
    pub fn new(context: Arc<VulkanContext>, image_count: usize) -> Result<Self> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(context.graphics_queue_family);
        let pool = unsafe {
            context.device.create_command_pool(&pool_info, None).map_err(|e| {
                term_err!("glyphterm::commands", "Failed to create command pool: {:?}", e)
            })?
        };

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(image_count as u32);
        let buffers = unsafe {
            context
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| {
                    context.device.destroy_command_pool(pool, None);
                    term_err!(
                        "glyphterm::commands",
                        "Failed to allocate command buffers: {:?}",
                        e
                    )
                })?
        };

        let mesh_loader = if context.mesh_shader_enabled {
            Some(ash::ext::mesh_shader::Device::new(&context.instance, &context.device))
        } else {
            None
        };

        Ok(Self {
            context,
            mesh_loader,
            pool,
            buffers,
        })
    }

    pub fn buffer(&self, image_index: usize) -> vk::CommandBuffer {
        self.buffers[image_index]
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Re-record the command buffer for one swapchain image.
    ///
    /// The caller must guarantee the buffer is not in flight (the renderer
    /// drains the sync pool before re-recording).
    pub fn record(&self, image_index: usize, params: &DrawParams<'_>) -> Result<()> {
        let device = &self.context.device;
        let cb = self.buffers[image_index];

        unsafe {
            device
                .reset_command_buffer(cb, vk::CommandBufferResetFlags::empty())
                .map_err(|e| {
                    term_err!("glyphterm::commands", "Failed to reset command buffer: {:?}", e)
                })?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::SIMULTANEOUS_USE);
            device.begin_command_buffer(cb, &begin_info).map_err(|e| {
                term_err!("glyphterm::commands", "Failed to begin command buffer: {:?}", e)
            })?;

            // White background; glyph coverage is blended on top.
            let clear_values = [
                vk::ClearValue {
                    color: vk::ClearColorValue { float32: [1.0, 1.0, 1.0, 1.0] },
                },
                vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
                },
            ];
            let render_pass_begin = vk::RenderPassBeginInfo::default()
                .render_pass(params.render_pass)
                .framebuffer(params.framebuffer)
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: params.extent,
                })
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(cb, &render_pass_begin, vk::SubpassContents::INLINE);

            device.cmd_bind_pipeline(
                cb,
                vk::PipelineBindPoint::GRAPHICS,
                params.pipeline.handle,
            );
            device.cmd_bind_descriptor_sets(
                cb,
                vk::PipelineBindPoint::GRAPHICS,
                params.pipeline_layout,
                0,
                &[params.descriptor_set],
                &[],
            );

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: params.extent.width as f32,
                height: params.extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(cb, 0, &[viewport]);
            device.cmd_set_scissor(
                cb,
                0,
                &[vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: params.extent,
                }],
            );

            match params.pipeline.draw_path {
                DrawPath::Mesh => {
                    let loader = self.mesh_loader.as_ref().ok_or_else(|| {
                        term_err!(
                            "glyphterm::commands",
                            "Mesh draw recorded without mesh shader support"
                        )
                    })?;
                    loader.cmd_draw_mesh_tasks(cb, 1, 1, 1);
                }
                DrawPath::Vertex => {
                    let vertex_buffer = params.vertex_buffer.ok_or_else(|| {
                        term_err!("glyphterm::commands", "Vertex draw without a vertex buffer")
                    })?;
                    device.cmd_bind_vertex_buffers(
                        cb,
                        0,
                        &[vertex_buffer.handle, params.index_buffer.handle],
                        &[0, 0],
                    );
                    device.cmd_draw(cb, params.cell_count * 6, 1, 0, 0);
                }
            }

            device.cmd_end_render_pass(cb);
            device.end_command_buffer(cb).map_err(|e| {
                term_err!("glyphterm::commands", "Failed to end command buffer: {:?}", e)
            })?;
        }

        term_trace!(
            "glyphterm::commands",
            "Recorded command buffer for image {} ({} cells)",
            image_index,
            params.cell_count
        );
        Ok(())
    }

    /// Record and submit a one-shot command buffer, then block on its fence.
    /// Used for the atlas layout transition after a content update.
    pub fn submit_one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        let device = &self.context.device;
        unsafe {
            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let cb = device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| {
                    term_err!("glyphterm::commands", "Failed to allocate one-shot buffer: {:?}", e)
                })?[0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device.begin_command_buffer(cb, &begin_info).map_err(|e| {
                device.free_command_buffers(self.pool, &[cb]);
                term_err!("glyphterm::commands", "Failed to begin one-shot buffer: {:?}", e)
            })?;

            record(cb);

            device.end_command_buffer(cb).map_err(|e| {
                device.free_command_buffers(self.pool, &[cb]);
                term_err!("glyphterm::commands", "Failed to end one-shot buffer: {:?}", e)
            })?;

            let fence = device
                .create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| {
                    device.free_command_buffers(self.pool, &[cb]);
                    term_err!("glyphterm::commands", "Failed to create one-shot fence: {:?}", e)
                })?;

            let cb_infos = [vk::CommandBufferSubmitInfo::default().command_buffer(cb)];
            let submit = vk::SubmitInfo2::default().command_buffer_infos(&cb_infos);
            let result = device
                .queue_submit2(self.context.graphics_queue, &[submit], fence)
                .map_err(|e| {
                    term_err!("glyphterm::commands", "One-shot submit failed: {:?}", e)
                })
                .and_then(|_| {
                    device.wait_for_fences(&[fence], true, u64::MAX).map_err(|e| {
                        term_err!("glyphterm::commands", "One-shot fence wait failed: {:?}", e)
                    })
                });

            device.destroy_fence(fence, None);
            device.free_command_buffers(self.pool, &[cb]);
            result
        }
    }
}

impl Drop for CommandSuite {
    fn drop(&mut self) {
        unsafe {
            self.context.device.destroy_command_pool(self.pool, None);
        }
    }
}
