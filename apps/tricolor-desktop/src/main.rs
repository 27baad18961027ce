use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tricolor_render::{RenderConfig, Renderer, SurfaceSize};
use tricolor_render_wgpu::{TRIANGLE_SHADERS, WgpuDevice, WgpuProvider};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

const TITLE: &str = "Tricolor";

#[derive(Parser)]
#[command(name = "tricolor-desktop", about = "Draw the tricolor triangle in a window")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML renderer config
    #[arg(long)]
    config: Option<PathBuf>,
}

struct App {
    config: RenderConfig,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer<WgpuDevice>>,
}

impl App {
    fn new(config: RenderConfig) -> Self {
        Self {
            config,
            window: None,
            renderer: None,
        }
    }

    /// Draw and present one frame. Errors are logged and shown in the title.
    fn redraw(&mut self) {
        let (Some(window), Some(renderer)) = (&self.window, &mut self.renderer) else {
            return;
        };
        match renderer.render_frame() {
            Ok(()) => {
                renderer.device_mut().present();
            }
            Err(e) => {
                tracing::error!("render failed: {e}");
                window.set_title(&format!("{TITLE}: {e}"));
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let size = self.config.surface;
        let attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(PhysicalSize::new(size.width, size.height));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let mut provider = WgpuProvider::window(Arc::clone(&window));
        match Renderer::setup(&mut provider, &self.config, &TRIANGLE_SHADERS) {
            Ok(renderer) => {
                let info = renderer.device().adapter_info();
                tracing::info!(
                    "rendering with {} context on {} ({})",
                    renderer.candidate(),
                    info.name,
                    info.backend.to_str()
                );
                self.renderer = Some(renderer);
            }
            Err(e) => {
                tracing::error!("setup failed: {e}");
                window.set_title(&format!("{TITLE}: {e}"));
            }
        }
        self.window = Some(window);
        self.redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(renderer) = self.renderer.take() {
                    renderer.teardown();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                let size = SurfaceSize::new(new_size.width, new_size.height);
                if let Some(renderer) = &mut self.renderer {
                    renderer.device_mut().resize(size);
                    renderer.resize(size);
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };

    tracing::info!("tricolor-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
