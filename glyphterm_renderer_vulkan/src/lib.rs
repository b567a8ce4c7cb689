/*!
# Glyphterm - Vulkan Renderer Backend

Vulkan implementation of the glyphterm terminal-grid renderer.

This crate turns a [`glyphterm_engine::TerminalGrid`] into presented frames:
it owns the device context, swapchain, per-image resources, the bounded
frame-synchronization pool, and the content update pipeline that re-bakes
the glyph atlas whenever the grid changes. Vulkan access goes through the
Ash bindings with gpu-allocator for memory management.
*/

mod context;
mod spirv;
mod swapchain;
mod render_pass;
mod frame_resources;
mod sync_pool;
mod buffer;
mod atlas;
mod descriptor;
mod pipeline;
mod commands;
mod renderer;

pub use context::VulkanContext;
pub use spirv::SpirvFile;
pub use pipeline::{DrawPath, ShaderSet, CellVertex, build_cell_vertices};
pub use atlas::{
    atlas_indices, cell_indices, check_capacity, compose_atlas, distinct_characters, AtlasImage,
    AtlasPixels,
};
pub use sync_pool::FrameSyncPool;
pub use renderer::{RendererBuilder, TerminalRenderer};
pub use swapchain::PresentOutcome;

#[cfg(test)]
mod atlas_tests;
#[cfg(test)]
mod pipeline_tests;
#[cfg(test)]
mod spirv_tests;
