//! Glyphterm demo - renders a mutating character grid in a window.
//!
//! Usage: glyphterm_demo [FONT_PATH] [SHADER_DIR]
//!
//! FONT_PATH defaults to the DejaVu Sans Mono system font, SHADER_DIR to
//! `shaders/` next to the working directory. The shader directory must hold
//! the compiled SPIR-V for the selected draw path (`vertex.spv` +
//! `fragment.spv`, or `task.spv` + `mesh.spv` + `fragment.spv`).

use glyphterm_engine::{
    term_error, term_info, Error, FontRaster, FrameControl, GlyphBitmap, RendererConfig, Result,
    TerminalGrid,
};
use glyphterm_renderer_vulkan::TerminalRenderer;
use std::path::PathBuf;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

const DEFAULT_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf";

const GRID_WIDTH: usize = 40;
const GRID_HEIGHT: usize = 12;

/// Font collaborator backed by fontdue.
struct FontdueRaster {
    font: fontdue::Font,
}

impl FontdueRaster {
    fn from_path(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            term_error!("glyphterm::demo", "Failed to read font {}: {}", path.display(), e);
            Error::InitializationFailed(format!("Failed to read font {}: {}", path.display(), e))
        })?;
        let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(|e| {
                term_error!("glyphterm::demo", "Failed to parse font: {}", e);
                Error::InitializationFailed(format!("Failed to parse font: {}", e))
            })?;
        Ok(Self { font })
    }
}

impl FontRaster for FontdueRaster {
    fn rasterize(&mut self, c: char, _cell_width: u32, cell_height: u32) -> Result<GlyphBitmap> {
        let (metrics, pixels) = self.font.rasterize(c, cell_height as f32 * 0.8);
        Ok(GlyphBitmap {
            width: metrics.width as u32,
            height: metrics.height as u32,
            bearing_x: metrics.xmin,
            // fontdue's ymin is the bitmap bottom relative to the baseline.
            bearing_y: metrics.height as i32 + metrics.ymin,
            pixels,
        })
    }
}

fn demo_grid() -> TerminalGrid {
    let mut grid = TerminalGrid::new(GRID_WIDTH, GRID_HEIGHT);
    grid.write_str(2, 1, "glyphterm demo");
    grid.write_str(2, 3, "a live character grid on the GPU");
    grid.write_str(2, 5, "0123456789 abcdefghijklmnopqrstuvwxyz");
    grid
}

struct App {
    font_path: PathBuf,
    shader_dir: PathBuf,
    window: Option<Arc<Window>>,
    renderer: Option<TerminalRenderer>,
    frame: u64,
}

impl App {
    fn new(font_path: PathBuf, shader_dir: PathBuf) -> Self {
        Self {
            font_path,
            shader_dir,
            window: None,
            renderer: None,
            frame: 0,
        }
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title("Glyphterm")
            .with_inner_size(PhysicalSize::new(1280, 720));
        let window = event_loop.create_window(attributes).map_err(|e| {
            term_error!("glyphterm::demo", "Failed to create window: {}", e);
            Error::InitializationFailed(format!("Failed to create window: {}", e))
        })?;
        let window = Arc::new(window);

        let font = FontdueRaster::from_path(&self.font_path)?;
        let renderer = TerminalRenderer::builder(self.shader_dir.clone())
            .config(RendererConfig::default())
            .build(window.as_ref(), demo_grid(), Box::new(font))?;

        term_info!(
            "glyphterm::demo",
            "Renderer ready ({:?} draw path)",
            renderer.draw_path()
        );
        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    /// Animate one cell per second so the content update path stays busy.
    fn tick(&mut self) -> Result<FrameControl> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(FrameControl::Stop);
        };

        self.frame += 1;
        if self.frame % 60 == 0 {
            let spinner = ['|', '/', '-', '\\'][(self.frame / 60) as usize % 4];
            renderer.grid_mut().set(GRID_WIDTH - 3, GRID_HEIGHT - 2, spinner);
            renderer.notify_update()?;
        }

        renderer.run()
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_none() {
            if let Err(e) = self.initialize(event_loop) {
                term_error!("glyphterm::demo", "Initialization failed: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                match self.tick() {
                    Ok(FrameControl::Continue) => {
                        if let Some(window) = &self.window {
                            window.request_redraw();
                        }
                    }
                    Ok(FrameControl::Stop) => event_loop.exit(),
                    Err(e) => {
                        term_error!("glyphterm::demo", "Frame failed: {}", e);
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let font_path = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_FONT.to_string()));
    let shader_dir = PathBuf::from(args.next().unwrap_or_else(|| "shaders".to_string()));

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            term_error!("glyphterm::demo", "Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(font_path, shader_dir);
    if let Err(e) = event_loop.run_app(&mut app) {
        term_error!("glyphterm::demo", "Event loop error: {}", e);
        std::process::exit(1);
    }
}
