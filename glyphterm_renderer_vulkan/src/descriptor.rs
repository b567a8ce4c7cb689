//! Descriptor set and pipeline layout for the grid shaders
//!
//! One descriptor set serves the whole renderer: binding 0 samples the glyph
//! atlas in the fragment stage, binding 1 exposes the per-cell character
//! indices to the geometry stage (mesh or vertex, depending on the draw
//! path). Content updates rewrite both bindings in a single update call so
//! the set never mixes old and new resources.

use ash::vk;
use glyphterm_engine::{term_err, Result};
use std::sync::Arc;

use crate::context::VulkanContext;
use crate::pipeline::DrawPath;

pub struct DescriptorSuite {
    context: Arc<VulkanContext>,
    pub set_layout: vk::DescriptorSetLayout,
    pub pipeline_layout: vk::PipelineLayout,
    pool: vk::DescriptorPool,
    pub set: vk::DescriptorSet,
    pub sampler: vk::Sampler,
}

impl DescriptorSuite {
    pub fn new(context: Arc<VulkanContext>, draw_path: DrawPath) -> Result<Self> {
        let device = &context.device;

        let index_stage = match draw_path {
            DrawPath::Mesh => vk::ShaderStageFlags::MESH_EXT,
            DrawPath::Vertex => vk::ShaderStageFlags::VERTEX,
        };

        let bindings = [
            vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
            vk::DescriptorSetLayoutBinding::default()
                .binding(1)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(index_stage),
        ];
        let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let set_layout = unsafe {
            device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(|e| {
                    term_err!(
                        "glyphterm::descriptor",
                        "Failed to create descriptor set layout: {:?}",
                        e
                    )
                })?
        };

        let set_layouts = [set_layout];
        let pipeline_layout_info =
            vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        let pipeline_layout = unsafe {
            device
                .create_pipeline_layout(&pipeline_layout_info, None)
                .map_err(|e| {
                    term_err!(
                        "glyphterm::descriptor",
                        "Failed to create pipeline layout: {:?}",
                        e
                    )
                })?
        };

        let pool_sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1),
        ];
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(1)
            .pool_sizes(&pool_sizes);
        let pool = unsafe {
            device.create_descriptor_pool(&pool_info, None).map_err(|e| {
                term_err!("glyphterm::descriptor", "Failed to create descriptor pool: {:?}", e)
            })?
        };

        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&set_layouts);
        let set = unsafe {
            device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(|e| {
                    term_err!(
                        "glyphterm::descriptor",
                        "Failed to allocate descriptor set: {:?}",
                        e
                    )
                })?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    term_err!("glyphterm::descriptor", "Descriptor allocation returned no sets")
                })?
        };

        let sampler_info = vk::SamplerCreateInfo::default();
        let sampler = unsafe {
            device.create_sampler(&sampler_info, None).map_err(|e| {
                term_err!("glyphterm::descriptor", "Failed to create sampler: {:?}", e)
            })?
        };

        Ok(Self {
            context,
            set_layout,
            pipeline_layout,
            pool,
            set,
            sampler,
        })
    }

    /// Point both bindings at the current content resources in one update.
    pub fn write(&self, atlas_view: vk::ImageView, index_buffer: vk::Buffer, index_bytes: vk::DeviceSize) {
        let image_info = [vk::DescriptorImageInfo::default()
            .sampler(self.sampler)
            .image_view(atlas_view)
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)];
        let buffer_info = [vk::DescriptorBufferInfo::default()
            .buffer(index_buffer)
            .offset(0)
            .range(index_bytes)];

        let writes = [
            vk::WriteDescriptorSet::default()
                .dst_set(self.set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(&image_info),
            vk::WriteDescriptorSet::default()
                .dst_set(self.set)
                .dst_binding(1)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(&buffer_info),
        ];
        unsafe {
            self.context.device.update_descriptor_sets(&writes, &[]);
        }
    }
}

impl Drop for DescriptorSuite {
    fn drop(&mut self) {
        let device = &self.context.device;
        unsafe {
            device.destroy_sampler(self.sampler, None);
            device.destroy_descriptor_pool(self.pool, None);
            device.destroy_pipeline_layout(self.pipeline_layout, None);
            device.destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}
