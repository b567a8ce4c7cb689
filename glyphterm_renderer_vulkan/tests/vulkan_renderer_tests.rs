//! Integration tests for the Vulkan backend
//!
//! All tests require a GPU and a display and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_renderer_tests -- --ignored

use ash::vk;
use glyphterm_engine::{Error, FontRaster, GlyphBitmap, RendererConfig, Result, TerminalGrid};
use glyphterm_renderer_vulkan::{
    compose_atlas, distinct_characters, AtlasImage, FrameSyncPool, VulkanContext,
};
use std::sync::Arc;
use winit::event_loop::EventLoop;
use winit::window::Window;

/// Helper to create a hidden test window for Vulkan
#[allow(deprecated)]
fn create_test_window() -> (Window, EventLoop<()>) {
    let event_loop = EventLoop::new().unwrap();
    let window_attrs = Window::default_attributes()
        .with_title("Glyphterm Renderer Test")
        .with_inner_size(winit::dpi::LogicalSize::new(800, 600))
        .with_visible(false);
    let window = event_loop.create_window(window_attrs).unwrap();
    (window, event_loop)
}

fn create_test_context(window: &Window) -> Arc<VulkanContext> {
    VulkanContext::new(window, &RendererConfig::default()).unwrap()
}

struct SolidFont;

impl FontRaster for SolidFont {
    fn rasterize(&mut self, _c: char, cell_width: u32, cell_height: u32) -> Result<GlyphBitmap> {
        Ok(GlyphBitmap {
            width: cell_width,
            height: cell_height,
            bearing_x: 0,
            bearing_y: cell_height as i32 - 1,
            pixels: vec![255; (cell_width * cell_height) as usize],
        })
    }
}

#[test]
#[ignore] // Requires GPU
fn test_context_creation() {
    let (window, _event_loop) = create_test_window();
    let context = create_test_context(&window);

    assert_ne!(context.limits.max_image_dimension2_d, 0);
}

#[test]
#[ignore] // Requires GPU
fn test_sync_pool_acquire_cycles_through_slots() {
    let (window, _event_loop) = create_test_window();
    let context = create_test_context(&window);

    let mut pool = FrameSyncPool::new(Arc::clone(&context), 4, 1_000_000_000).unwrap();
    assert_eq!(pool.depth(), 4);

    // All fences start signaled, so a full pass over the ring succeeds;
    // each slot is re-armed immediately so the ring can cycle again.
    for _ in 0..8 {
        let fence = pool.acquire_slot().unwrap().fence;
        pool.signal_slot(fence).unwrap();
    }
    pool.wait_all().unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_sync_pool_bounds_in_flight_frames() {
    let (window, _event_loop) = create_test_window();
    let context = create_test_context(&window);

    // Short timeout so the blocked acquire returns quickly.
    let mut pool = FrameSyncPool::new(Arc::clone(&context), 3, 50_000_000).unwrap();

    // Drain all K slots without arming any fence: the (K+1)-th acquire must
    // block on slot 0's unsignaled fence and report a timeout rather than
    // hand out the slot again.
    let mut fences = Vec::new();
    for _ in 0..3 {
        fences.push(pool.acquire_slot().unwrap().fence);
    }
    match pool.acquire_slot() {
        Err(Error::Timeout(_)) => {}
        other => panic!("expected timeout, got {:?}", other.map(|s| s.fence)),
    }

    // Re-arm so teardown can drain.
    for fence in fences {
        pool.signal_slot(fence).unwrap();
    }
}

#[test]
#[ignore] // Requires GPU
fn test_atlas_image_upload() {
    let (window, _event_loop) = create_test_window();
    let context = create_test_context(&window);

    let grid = TerminalGrid::from_cells(2, 1, vec!['A', 'B']).unwrap();
    let distinct = distinct_characters(&grid);
    let pixels = compose_atlas(&mut SolidFont, &distinct, 32, 32).unwrap();

    let atlas = AtlasImage::new(Arc::clone(&context), &pixels, distinct.len() as u32).unwrap();
    assert_eq!(atlas.cell_count, 2);
    assert_ne!(atlas.view, vk::ImageView::null());
}

#[test]
#[ignore] // Requires GPU
fn test_atlas_capacity_guard() {
    let (window, _event_loop) = create_test_window();
    let context = create_test_context(&window);

    let capacity = AtlasImage::capacity(&context, 32);
    assert!(capacity > 0);

    let result = glyphterm_renderer_vulkan::check_capacity(&context, capacity + 1, 32);
    assert!(matches!(
        result,
        Err(Error::AtlasCapacityExceeded { .. })
    ));
    glyphterm_renderer_vulkan::check_capacity(&context, capacity, 32).unwrap();
}
