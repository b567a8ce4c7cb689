//! Per-swapchain-image resources
//!
//! Each swapchain image gets its own color view, depth buffer, framebuffer
//! and present-side semaphores. Everything here is torn down and rebuilt as
//! one unit whenever the swapchain is recreated, so the per-image vectors
//! always have exactly one entry per swapchain image.

use ash::vk;
use glyphterm_engine::{term_debug, term_err, Result};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::context::VulkanContext;
use crate::render_pass::DEPTH_FORMAT;

/// Resources owned per swapchain image.
pub struct ImageResources {
    /// View over the swapchain's color image (the image itself belongs to
    /// the swapchain).
    pub color_view: vk::ImageView,

    /// Dedicated depth image for this swapchain image.
    pub depth_image: vk::Image,
    pub depth_view: vk::ImageView,
    depth_allocation: Option<Allocation>,

    /// Framebuffer binding color + depth to the grid render pass.
    pub framebuffer: vk::Framebuffer,

    /// Signaled by the frame's render submission, waited by present.
    pub render_complete: vk::Semaphore,

    /// Signaled alongside `render_complete`, waited by the frame's second
    /// (fence-carrying) submission so the slot fence observes the render.
    pub frame_retired: vk::Semaphore,
}

/// All per-image resources for the current swapchain generation.
pub struct FrameResources {
    context: Arc<VulkanContext>,
    pub images: Vec<ImageResources>,
}

impl FrameResources {
    pub fn new(
        context: Arc<VulkanContext>,
        swapchain_images: &[vk::Image],
        color_format: vk::Format,
        extent: vk::Extent2D,
        render_pass: vk::RenderPass,
    ) -> Result<Self> {
        let mut resources = Self {
            context,
            images: Vec::with_capacity(swapchain_images.len()),
        };

        for (index, &image) in swapchain_images.iter().enumerate() {
            let per_image =
                resources.build_image_resources(index, image, color_format, extent, render_pass)?;
            resources.images.push(per_image);
        }

        term_debug!(
            "glyphterm::frame_resources",
            "Per-image resources created for {} swapchain images",
            resources.images.len()
        );
        Ok(resources)
    }

    fn build_image_resources(
        &self,
        index: usize,
        swapchain_image: vk::Image,
        color_format: vk::Format,
        extent: vk::Extent2D,
        render_pass: vk::RenderPass,
    ) -> Result<ImageResources> {
        let device = &self.context.device;

        let color_range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };
        let color_view_info = vk::ImageViewCreateInfo::default()
            .image(swapchain_image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(color_format)
            .subresource_range(color_range);
        let color_view = unsafe {
            device.create_image_view(&color_view_info, None).map_err(|e| {
                term_err!(
                    "glyphterm::frame_resources",
                    "Failed to create color view {}: {:?}",
                    index,
                    e
                )
            })?
        };

        let depth_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let depth_image = unsafe {
            device.create_image(&depth_info, None).map_err(|e| {
                term_err!(
                    "glyphterm::frame_resources",
                    "Failed to create depth image {}: {:?}",
                    index,
                    e
                )
            })?
        };

        let requirements = unsafe { device.get_image_memory_requirements(depth_image) };
        let depth_allocation = self
            .context
            .allocator
            .lock()
            .map_err(|e| {
                term_err!("glyphterm::frame_resources", "Allocator mutex poisoned: {:?}", e)
            })?
            .allocate(&AllocationCreateDesc {
                name: "glyphterm depth buffer",
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                term_err!(
                    "glyphterm::frame_resources",
                    "Failed to allocate depth memory: {:?}",
                    e
                )
            })?;
        unsafe {
            device
                .bind_image_memory(
                    depth_image,
                    depth_allocation.memory(),
                    depth_allocation.offset(),
                )
                .map_err(|e| {
                    term_err!(
                        "glyphterm::frame_resources",
                        "Failed to bind depth memory: {:?}",
                        e
                    )
                })?;
        }

        let depth_range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::DEPTH,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };
        let depth_view_info = vk::ImageViewCreateInfo::default()
            .image(depth_image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .subresource_range(depth_range);
        let depth_view = unsafe {
            device.create_image_view(&depth_view_info, None).map_err(|e| {
                term_err!(
                    "glyphterm::frame_resources",
                    "Failed to create depth view {}: {:?}",
                    index,
                    e
                )
            })?
        };

        let attachments = [color_view, depth_view];
        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        let framebuffer = unsafe {
            device.create_framebuffer(&framebuffer_info, None).map_err(|e| {
                term_err!(
                    "glyphterm::frame_resources",
                    "Failed to create framebuffer {}: {:?}",
                    index,
                    e
                )
            })?
        };

        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let render_complete = unsafe {
            device.create_semaphore(&semaphore_info, None).map_err(|e| {
                term_err!(
                    "glyphterm::frame_resources",
                    "Failed to create render-complete semaphore: {:?}",
                    e
                )
            })?
        };
        let frame_retired = unsafe {
            device.create_semaphore(&semaphore_info, None).map_err(|e| {
                term_err!(
                    "glyphterm::frame_resources",
                    "Failed to create frame-retired semaphore: {:?}",
                    e
                )
            })?
        };

        Ok(ImageResources {
            color_view,
            depth_image,
            depth_view,
            depth_allocation: Some(depth_allocation),
            framebuffer,
            render_complete,
            frame_retired,
        })
    }

    /// Destroy the current per-image resources and build a fresh set against
    /// a recreated swapchain. The caller must have drained all in-flight
    /// frames first; the old color views reference swapchain images that are
    /// about to disappear.
    pub fn rebuild(
        &mut self,
        swapchain_images: &[vk::Image],
        color_format: vk::Format,
        extent: vk::Extent2D,
        render_pass: vk::RenderPass,
    ) -> Result<()> {
        self.clear();
        for (index, &image) in swapchain_images.iter().enumerate() {
            let per_image =
                self.build_image_resources(index, image, color_format, extent, render_pass)?;
            self.images.push(per_image);
        }
        term_debug!(
            "glyphterm::frame_resources",
            "Per-image resources rebuilt for {} swapchain images",
            self.images.len()
        );
        Ok(())
    }

    /// Destroy all per-image resources, leaving the set empty. Safe to call
    /// with in-flight work drained only.
    pub fn clear(&mut self) {
        let device = &self.context.device;
        unsafe {
            for image in &mut self.images {
                device.destroy_semaphore(image.render_complete, None);
                device.destroy_semaphore(image.frame_retired, None);
                device.destroy_framebuffer(image.framebuffer, None);
                device.destroy_image_view(image.depth_view, None);
                if let Some(allocation) = image.depth_allocation.take() {
                    if let Ok(mut allocator) = self.context.allocator.lock() {
                        allocator.free(allocation).ok();
                    }
                }
                device.destroy_image(image.depth_image, None);
                device.destroy_image_view(image.color_view, None);
            }
        }
        self.images.clear();
    }
}

impl Drop for FrameResources {
    fn drop(&mut self) {
        self.clear();
    }
}
