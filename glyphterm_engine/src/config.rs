//! Renderer configuration

/// Configuration for a terminal renderer backend.
///
/// All fields have working defaults; construct with `..Default::default()`
/// and override what you need.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Size of the synchronization pool: how many frames the CPU may have
    /// in flight before `run()` blocks on a fence.
    pub frames_in_flight: u32,

    /// Upper bound, in nanoseconds, for any single fence wait. Exceeding it
    /// surfaces as `Error::Timeout` instead of blocking the calling thread
    /// forever.
    pub fence_wait_timeout_ns: u64,

    /// Width in pixels of one glyph cell in the atlas strip.
    pub cell_width: u32,

    /// Height in pixels of one glyph cell. The atlas strip is two cells
    /// tall so descenders below the baseline keep their rows.
    pub cell_height: u32,

    /// Enable the Vulkan validation layer if the backend supports it.
    pub enable_validation: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 10,
            fence_wait_timeout_ns: 5_000_000_000,
            cell_width: 32,
            cell_height: 32,
            enable_validation: false,
        }
    }
}
