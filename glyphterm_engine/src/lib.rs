/*!
# Glyphterm Engine

Core types for the glyphterm terminal-grid renderer.

This crate provides the platform-agnostic half of the system: the terminal
character grid, the font-rasterization collaborator trait, error and logging
infrastructure, and the renderer configuration. Backend implementations
(currently Vulkan via `glyphterm_renderer_vulkan`) consume these types and
provide the actual presentation engine.
*/

// Internal modules
mod error;
mod config;
mod control;
pub mod log;
pub mod grid;
pub mod font;

pub use error::{Error, Result};
pub use config::RendererConfig;
pub use control::FrameControl;
pub use grid::TerminalGrid;
pub use font::{FontRaster, GlyphBitmap};

#[cfg(test)]
mod error_tests;
#[cfg(test)]
mod grid_tests;
#[cfg(test)]
mod log_tests;
