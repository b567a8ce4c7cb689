//! Glyph atlas construction
//!
//! The atlas is a single-row strip: one fixed-width slot per distinct
//! character in the grid, in sorted character order, two cells tall so
//! descenders below the baseline keep their rows. Composition is pure CPU
//! work over a `FontRaster`; the result is uploaded into a linear-tiled
//! R8_UNORM image that the fragment shader samples directly.

use ash::vk;
use glyphterm_engine::{term_debug, term_err, Error, FontRaster, Result, TerminalGrid};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::context::VulkanContext;

/// CPU-side atlas pixels, one byte per texel, row-major.
pub struct AtlasPixels {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// The distinct characters of a grid, in sorted order.
///
/// Sorting keeps the atlas layout stable for a given character set, so two
/// grids with the same characters in different positions share identical
/// atlas content.
pub fn distinct_characters(grid: &TerminalGrid) -> Vec<char> {
    let set: BTreeSet<char> = grid.iter().copied().collect();
    set.into_iter().collect()
}

/// Map each distinct character to its atlas cell index.
pub fn atlas_indices(distinct: &[char]) -> FxHashMap<char, u32> {
    distinct
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, i as u32))
        .collect()
}

/// Per-cell atlas indices for the whole grid, in row-major grid order.
///
/// Every grid character must be present in `indices`; the map is built from
/// the same grid via [`distinct_characters`] + [`atlas_indices`].
pub fn cell_indices(grid: &TerminalGrid, indices: &FxHashMap<char, u32>) -> Result<Vec<u32>> {
    grid.iter()
        .map(|c| {
            indices.get(c).copied().ok_or_else(|| {
                term_err!("glyphterm::atlas", "Character {:?} missing from atlas index map", c)
            })
        })
        .collect()
}

/// Rasterize every distinct character into a one-row strip of fixed slots.
///
/// The strip is two cells tall with the baseline on the last row of the
/// upper cell: the top row of each bitmap lands at
/// `cell_height - bearing_y - 1` and its left edge at `bearing_x`, so
/// descenders extend into the lower cell instead of being cut off. Pixels
/// falling outside the slot are clipped.
pub fn compose_atlas(
    font: &mut dyn FontRaster,
    distinct: &[char],
    cell_width: u32,
    cell_height: u32,
) -> Result<AtlasPixels> {
    let width = cell_width * distinct.len() as u32;
    let height = cell_height * 2;
    let mut pixels = vec![0u8; (width * height) as usize];

    for (cell, &c) in distinct.iter().enumerate() {
        let bitmap = font.rasterize(c, cell_width, cell_height)?;
        let cell_x = cell as u32 * cell_width;

        let start_row = cell_height as i32 - bitmap.bearing_y - 1;
        let start_col = bitmap.bearing_x;

        for row in 0..bitmap.height as i32 {
            let dst_row = start_row + row;
            if dst_row < 0 || dst_row >= height as i32 {
                continue;
            }
            for col in 0..bitmap.width as i32 {
                let dst_col = start_col + col;
                if dst_col < 0 || dst_col >= cell_width as i32 {
                    continue;
                }
                let src = (row as u32 * bitmap.width + col as u32) as usize;
                let dst =
                    (dst_row as u32 * width + cell_x + dst_col as u32) as usize;
                pixels[dst] = bitmap.pixels[src];
            }
        }
    }

    Ok(AtlasPixels { width, height, pixels })
}

/// The glyph atlas on the GPU: a linear-tiled R8_UNORM image whose content
/// is written through a host mapping, then transitioned from PREINITIALIZED
/// to shader-read once.
pub struct AtlasImage {
    context: Arc<VulkanContext>,
    pub image: vk::Image,
    pub view: vk::ImageView,
    allocation: Option<Allocation>,
    /// Number of glyph cells in the strip.
    pub cell_count: u32,
}

impl AtlasImage {
    /// Largest distinct-character count the device can hold in one strip.
    pub fn capacity(context: &VulkanContext, cell_width: u32) -> usize {
        (context.limits.max_image_dimension2_d / cell_width) as usize
    }

    /// Create the atlas image and write `pixels` into it through the host
    /// mapping, honoring the driver's row pitch.
    pub fn new(
        context: Arc<VulkanContext>,
        pixels: &AtlasPixels,
        cell_count: u32,
    ) -> Result<Self> {
        let device = &context.device;

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(vk::Format::R8_UNORM)
            .extent(vk::Extent3D {
                width: pixels.width,
                height: pixels.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::LINEAR)
            .usage(vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::PREINITIALIZED);
        let image = unsafe {
            device.create_image(&image_info, None).map_err(|e| {
                term_err!("glyphterm::atlas", "Failed to create atlas image: {:?}", e)
            })?
        };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let allocation = context
            .allocator
            .lock()
            .map_err(|e| term_err!("glyphterm::atlas", "Allocator mutex poisoned: {:?}", e))?
            .allocate(&AllocationCreateDesc {
                name: "glyphterm glyph atlas",
                requirements,
                location: MemoryLocation::CpuToGpu,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                unsafe { device.destroy_image(image, None) };
                term_err!("glyphterm::atlas", "Failed to allocate atlas memory: {:?}", e)
            })?;

        unsafe {
            device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .map_err(|e| {
                    term_err!("glyphterm::atlas", "Failed to bind atlas memory: {:?}", e)
                })?;
        }

        // Linear images can have padded rows; copy row by row at the
        // driver's pitch.
        let subresource = vk::ImageSubresource {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            array_layer: 0,
        };
        let layout = unsafe { device.get_image_subresource_layout(image, subresource) };
        let ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| term_err!("glyphterm::atlas", "Atlas image is not host mapped"))?;

        unsafe {
            let base = (ptr.as_ptr() as *mut u8).add(layout.offset as usize);
            for row in 0..pixels.height as usize {
                let src = &pixels.pixels[row * pixels.width as usize..][..pixels.width as usize];
                let dst = base.add(row * layout.row_pitch as usize);
                std::ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len());
            }
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(vk::Format::R8_UNORM)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        let view = unsafe {
            device.create_image_view(&view_info, None).map_err(|e| {
                term_err!("glyphterm::atlas", "Failed to create atlas view: {:?}", e)
            })?
        };

        term_debug!(
            "glyphterm::atlas",
            "Atlas image created: {} cells, {}x{}",
            cell_count,
            pixels.width,
            pixels.height
        );

        Ok(Self {
            context,
            image,
            view,
            allocation: Some(allocation),
            cell_count,
        })
    }

    /// Record the one-time PREINITIALIZED -> SHADER_READ_ONLY transition.
    /// The host write is made visible to fragment-stage sampling.
    pub fn record_prepare_barrier(&self, command_buffer: vk::CommandBuffer) {
        let barrier = vk::ImageMemoryBarrier2::default()
            .src_stage_mask(vk::PipelineStageFlags2::HOST)
            .src_access_mask(vk::AccessFlags2::HOST_WRITE)
            .dst_stage_mask(vk::PipelineStageFlags2::FRAGMENT_SHADER)
            .dst_access_mask(vk::AccessFlags2::SHADER_SAMPLED_READ)
            .old_layout(vk::ImageLayout::PREINITIALIZED)
            .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        let barriers = [barrier];
        let dependency = vk::DependencyInfo::default().image_memory_barriers(&barriers);
        unsafe {
            self.context
                .device
                .cmd_pipeline_barrier2(command_buffer, &dependency);
        }
    }
}

impl Drop for AtlasImage {
    fn drop(&mut self) {
        unsafe {
            self.context.device.destroy_image_view(self.view, None);
        }
        if let Some(allocation) = self.allocation.take() {
            if let Ok(mut allocator) = self.context.allocator.lock() {
                allocator.free(allocation).ok();
            }
        }
        unsafe {
            self.context.device.destroy_image(self.image, None);
        }
    }
}

/// Guard against grids whose distinct-character strip would exceed the
/// device's maximum image width.
pub fn check_capacity(
    context: &VulkanContext,
    distinct: usize,
    cell_width: u32,
) -> Result<()> {
    let capacity = AtlasImage::capacity(context, cell_width);
    if distinct > capacity {
        return Err(Error::AtlasCapacityExceeded { distinct, capacity });
    }
    Ok(())
}
