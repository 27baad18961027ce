use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tricolor_render::shaders::GLSL_TRIANGLE;
use tricolor_render::{
    ContextCandidate, RecordingDevice, RecordingProvider, RenderConfig, Renderer, ShaderStage,
    SurfaceSize,
};
use tricolor_render_wgpu::{TRIANGLE_SHADERS, WgpuProvider};

#[derive(Parser)]
#[command(name = "tricolor-cli", about = "Draw the tricolor triangle without a window")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML renderer config
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions and the effective config
    Info,
    /// Run setup and one frame against the recording driver and print every call
    Trace {
        /// Make every context candidate fail
        #[arg(long)]
        no_context: bool,
        /// Make compilation of one stage fail
        #[arg(long, value_enum)]
        fail_compile: Option<StageArg>,
        /// Make program linking fail
        #[arg(long)]
        fail_link: bool,
        /// Tear the renderer down after the frame
        #[arg(long)]
        teardown: bool,
    },
    /// Render one frame offscreen on the GPU and sample pixel colors
    Render {
        /// Context candidate to try; repeat to set the order
        #[arg(short, long)]
        candidate: Vec<ContextCandidate>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    Vertex,
    Fragment,
}

impl From<StageArg> for ShaderStage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Vertex => ShaderStage::Vertex,
            StageArg::Fragment => ShaderStage::Fragment,
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RenderConfig> {
    match path {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("reading config {}", path.display())),
        None => Ok(RenderConfig::default()),
    }
}

fn hex(rgba: [u8; 4]) -> String {
    format!(
        "#{:02x}{:02x}{:02x}{:02x}",
        rgba[0], rgba[1], rgba[2], rgba[3]
    )
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    tracing::debug!("config: {config:?}");

    match cli.command {
        Commands::Info => {
            println!("tricolor-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("render: {}", tricolor_render::crate_info());
            println!("render-wgpu: {}", tricolor_render_wgpu::crate_info());
            print!("{}", config.to_yaml()?);
        }
        Commands::Trace {
            no_context,
            fail_compile,
            fail_link,
            teardown,
        } => {
            let mut device = RecordingDevice::new();
            if let Some(stage) = fail_compile {
                device = device.failing_compile(stage.into());
            }
            if fail_link {
                device = device.failing_link();
            }
            let available: &[ContextCandidate] = if no_context {
                &[]
            } else {
                &[
                    ContextCandidate::Primary,
                    ContextCandidate::Gl,
                    ContextCandidate::Fallback,
                ]
            };
            let mut provider = RecordingProvider::new(config.surface)
                .with_available(available)
                .with_device(device);

            let mut renderer = match Renderer::setup(&mut provider, &config, &GLSL_TRIANGLE) {
                Ok(renderer) => renderer,
                Err(e) => {
                    for candidate in provider.attempts() {
                        println!("tried context: {candidate}");
                    }
                    return Err(e.into());
                }
            };
            println!("context: {}", renderer.candidate());
            renderer.render_frame()?;

            let commands = if teardown {
                renderer.teardown().take_commands()
            } else {
                renderer.device_mut().take_commands()
            };
            for command in &commands {
                println!("{command}");
            }
        }
        Commands::Render {
            candidate,
            width,
            height,
        } => {
            if !candidate.is_empty() {
                config.candidates = candidate;
            }
            config.surface = SurfaceSize::new(
                width.unwrap_or(config.surface.width),
                height.unwrap_or(config.surface.height),
            );

            let mut provider = WgpuProvider::offscreen(config.surface);
            let mut renderer = Renderer::setup(&mut provider, &config, &TRIANGLE_SHADERS)?;
            renderer.render_frame()?;

            let device = renderer.device();
            let info = device.adapter_info();
            println!(
                "adapter: {} ({:?}, {})",
                info.name,
                info.device_type,
                info.backend.to_str()
            );
            println!("context: {}", renderer.candidate());

            let pixels = device.read_pixels()?;
            println!("size: {}", pixels.size());
            println!("center: {}", hex(pixels.center()));
            println!(
                "corner: {}",
                hex(pixels.get(0, 0).unwrap_or_default())
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_formats_rgba() {
        assert_eq!(hex([255, 0, 16, 255]), "#ff0010ff");
    }

    #[test]
    fn cli_parses_repeated_candidates() {
        let cli = Cli::parse_from(["tricolor-cli", "render", "-c", "gl", "-c", "fallback"]);
        match cli.command {
            Commands::Render { candidate, .. } => {
                assert_eq!(
                    candidate,
                    vec![ContextCandidate::Gl, ContextCandidate::Fallback]
                );
            }
            _ => panic!("expected render"),
        }
    }
}
