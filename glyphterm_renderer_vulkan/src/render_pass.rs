//! Render pass for the terminal grid
//!
//! One color attachment (swapchain image) plus one D16 depth attachment, both
//! cleared at the start of the pass. Two external subpass dependencies order
//! color-attachment output and early-fragment depth access against whatever
//! touched the attachments last frame.

use ash::vk;
use glyphterm_engine::{term_debug, term_err, Result};
use std::sync::Arc;

use crate::context::VulkanContext;

/// Fixed depth format for the terminal renderer. D16 is universally
/// supported and a 16-bit depth range is plenty for a flat grid of quads.
pub const DEPTH_FORMAT: vk::Format = vk::Format::D16_UNORM;

pub struct GridRenderPass {
    context: Arc<VulkanContext>,
    pub handle: vk::RenderPass,
}

impl GridRenderPass {
    pub fn new(context: Arc<VulkanContext>, color_format: vk::Format) -> Result<Self> {
        let attachments = [
            vk::AttachmentDescription::default()
                .format(color_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
            vk::AttachmentDescription::default()
                .format(DEPTH_FORMAT)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        ];

        let color_ref = [vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
        let depth_ref = vk::AttachmentReference::default()
            .attachment(1)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let subpass = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_ref)
            .depth_stencil_attachment(&depth_ref)];

        let dependencies = [
            vk::SubpassDependency::default()
                .src_subpass(vk::SUBPASS_EXTERNAL)
                .dst_subpass(0)
                .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
                .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE),
            vk::SubpassDependency::default()
                .src_subpass(vk::SUBPASS_EXTERNAL)
                .dst_subpass(0)
                .src_stage_mask(
                    vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                        | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
                )
                .dst_stage_mask(
                    vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                        | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
                )
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE),
        ];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpass)
            .dependencies(&dependencies);

        let handle = unsafe {
            context
                .device
                .create_render_pass(&create_info, None)
                .map_err(|e| {
                    term_err!("glyphterm::render_pass", "Failed to create render pass: {:?}", e)
                })?
        };

        term_debug!(
            "glyphterm::render_pass",
            "Render pass created (color {:?}, depth {:?})",
            color_format,
            DEPTH_FORMAT
        );

        Ok(Self { context, handle })
    }
}

impl Drop for GridRenderPass {
    fn drop(&mut self) {
        unsafe {
            self.context.device.destroy_render_pass(self.handle, None);
        }
    }
}
