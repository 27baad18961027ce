use crate::device::WgpuDevice;
use crate::target::RenderTarget;
use std::sync::Arc;
use tricolor_render::{ContextCandidate, ContextProvider, DeviceError, SurfaceSize};
use winit::window::Window;

/// What a [`WgpuProvider`] renders into.
#[derive(Debug, Clone)]
pub enum SurfaceTarget {
    /// A texture of the given size, readable with [`WgpuDevice::read_pixels`].
    Offscreen(SurfaceSize),
    /// The window's swapchain, sized to its inner size.
    Window(Arc<Window>),
}

/// Hands out a [`WgpuDevice`] per context candidate.
///
/// Candidates map to backend sets: `primary` is Vulkan, Metal, DX12 or
/// WebGPU; `gl` is GL/WebGL2; `fallback` is any software adapter.
pub struct WgpuProvider {
    target: SurfaceTarget,
    power_preference: wgpu::PowerPreference,
}

impl WgpuProvider {
    pub fn offscreen(size: SurfaceSize) -> Self {
        Self {
            target: SurfaceTarget::Offscreen(size),
            power_preference: wgpu::PowerPreference::default(),
        }
    }

    pub fn window(window: Arc<Window>) -> Self {
        Self {
            target: SurfaceTarget::Window(window),
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }

    pub fn with_power_preference(mut self, power_preference: wgpu::PowerPreference) -> Self {
        self.power_preference = power_preference;
        self
    }

    pub fn target(&self) -> &SurfaceTarget {
        &self.target
    }
}

fn backends_for(candidate: ContextCandidate) -> wgpu::Backends {
    match candidate {
        ContextCandidate::Primary => wgpu::Backends::PRIMARY,
        ContextCandidate::Gl => wgpu::Backends::GL,
        ContextCandidate::Fallback => wgpu::Backends::all(),
    }
}

/// Reject surfaces the device cannot allocate a texture for.
fn check_size(size: SurfaceSize, max_dimension: u32) -> Result<(), DeviceError> {
    if size.width > max_dimension || size.height > max_dimension {
        return Err(DeviceError::Surface(format!(
            "surface {size} exceeds the {max_dimension}px texture limit"
        )));
    }
    Ok(())
}

impl ContextProvider for WgpuProvider {
    type Device = WgpuDevice;

    fn surface_size(&self) -> SurfaceSize {
        match &self.target {
            SurfaceTarget::Offscreen(size) => *size,
            SurfaceTarget::Window(window) => {
                let size = window.inner_size();
                SurfaceSize::new(size.width, size.height)
            }
        }
    }

    fn try_candidate(&mut self, candidate: ContextCandidate) -> Result<WgpuDevice, DeviceError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: backends_for(candidate),
            ..Default::default()
        });

        let surface = match &self.target {
            SurfaceTarget::Window(window) => Some(
                instance
                    .create_surface(Arc::clone(window))
                    .map_err(|e| DeviceError::Unavailable(e.to_string()))?,
            ),
            SurfaceTarget::Offscreen(_) => None,
        };

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: self.power_preference,
            compatible_surface: surface.as_ref(),
            force_fallback_adapter: candidate == ContextCandidate::Fallback,
        }))
        .ok_or_else(|| DeviceError::Unavailable(format!("no {candidate} adapter")))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("tricolor_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| DeviceError::Unavailable(e.to_string()))?;

        let size = self.surface_size();
        check_size(size, device.limits().max_texture_dimension_2d)?;
        let target = match surface {
            Some(surface) => RenderTarget::window(surface, &adapter, &device, size)?,
            None => RenderTarget::offscreen(&device, size),
        };

        let info = adapter.get_info();
        tracing::debug!(
            "{candidate} adapter: {} ({})",
            info.name,
            info.backend.to_str()
        );
        Ok(WgpuDevice::new(device, queue, target, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::TRIANGLE_SHADERS;
    use tricolor_render::{
        GraphicsDevice, Primitive, RenderConfig, RenderError, Renderer, ShaderSources, ShaderStage,
    };

    const VALID_VERTEX: &str = r#"
        struct VertexOutput {
            @builtin(position) clip_position: vec4<f32>,
            @location(0) color: vec4<f32>,
        };

        @vertex
        fn vs_main(
            @location(0) aVertexPosition: vec3<f32>,
            @location(1) aVertexColor: vec4<f32>,
        ) -> VertexOutput {
            var out: VertexOutput;
            out.clip_position = vec4<f32>(aVertexPosition, 1.0);
            out.color = aVertexColor;
            return out;
        }
    "#;

    fn config(size: SurfaceSize) -> RenderConfig {
        RenderConfig {
            surface: size,
            candidates: vec![
                ContextCandidate::Primary,
                ContextCandidate::Gl,
                ContextCandidate::Fallback,
            ],
            ..RenderConfig::default()
        }
    }

    /// Offscreen setup; `None` when no adapter is available.
    fn setup_offscreen(
        size: SurfaceSize,
        shaders: &ShaderSources<'_>,
    ) -> Option<Result<Renderer<WgpuDevice>, RenderError>> {
        let mut provider = WgpuProvider::offscreen(size);
        match Renderer::setup(&mut provider, &config(size), shaders) {
            Err(RenderError::ContextAcquisition { .. }) => {
                eprintln!("no GPU adapter available, skipping");
                None
            }
            result => Some(result),
        }
    }

    #[test]
    fn backend_sets_per_candidate() {
        assert_eq!(backends_for(ContextCandidate::Gl), wgpu::Backends::GL);
        assert!(backends_for(ContextCandidate::Fallback).contains(wgpu::Backends::PRIMARY));
        assert!(!backends_for(ContextCandidate::Primary).contains(wgpu::Backends::GL));
    }

    #[test]
    fn offscreen_surface_size() {
        let provider = WgpuProvider::offscreen(SurfaceSize::new(64, 32));
        assert_eq!(provider.surface_size(), SurfaceSize::new(64, 32));
    }

    #[test]
    fn size_limit() {
        assert!(check_size(SurfaceSize::new(8192, 8192), 8192).is_ok());
        assert!(matches!(
            check_size(SurfaceSize::new(40000, 16), 16384),
            Err(DeviceError::Surface(_))
        ));
        assert!(check_size(SurfaceSize::new(16, 16385), 16384).is_err());
    }

    #[test]
    fn oversized_surface_skips_every_candidate() {
        let size = SurfaceSize::new(40000, 16);
        let mut provider = WgpuProvider::offscreen(size);
        let result = Renderer::setup(&mut provider, &config(size), &TRIANGLE_SHADERS);
        assert!(matches!(
            result.err(),
            Some(RenderError::ContextAcquisition { .. })
        ));
    }

    #[test]
    fn renders_triangle_offscreen() {
        let size = SurfaceSize::new(64, 64);
        let Some(result) = setup_offscreen(size, &TRIANGLE_SHADERS) else {
            return;
        };
        let mut renderer = result.unwrap_or_else(|e| panic!("setup failed: {e}"));
        renderer.render_frame().unwrap();

        let pixels = renderer.device().read_pixels().unwrap();
        assert_eq!(pixels.size(), size);
        assert_eq!(pixels.get(0, 0), Some([255, 255, 255, 255]));
        assert_ne!(pixels.center(), [255, 255, 255, 255]);
    }

    #[test]
    fn other_primitive_modes_build_their_own_pipeline() {
        let Some(result) = setup_offscreen(SurfaceSize::new(32, 32), &TRIANGLE_SHADERS) else {
            return;
        };
        let mut renderer = result.unwrap_or_else(|e| panic!("setup failed: {e}"));
        renderer.render_frame().unwrap();

        let device = renderer.device_mut();
        device.draw_arrays(Primitive::Lines, 0, 2).unwrap();
        device.draw_arrays(Primitive::Points, 0, 3).unwrap();
        device.draw_arrays(Primitive::TriangleStrip, 0, 3).unwrap();
    }

    #[test]
    fn invalid_fragment_source_fails_to_compile() {
        let shaders = ShaderSources {
            vertex: VALID_VERTEX,
            fragment: "@fragment fn fs_main() -> @location(0) vec4<f32> { return undefined_color; }",
        };
        let Some(result) = setup_offscreen(SurfaceSize::new(16, 16), &shaders) else {
            return;
        };
        assert!(matches!(
            result.err(),
            Some(RenderError::ShaderCompile {
                stage: ShaderStage::Fragment,
                ..
            })
        ));
    }

    #[test]
    fn mismatched_stage_interface_fails_to_link() {
        let shaders = ShaderSources {
            vertex: r#"
                @vertex
                fn vs_main(
                    @location(0) aVertexPosition: vec3<f32>,
                    @location(1) aVertexColor: vec4<f32>,
                ) -> @builtin(position) vec4<f32> {
                    return vec4<f32>(aVertexPosition, aVertexColor.a);
                }
            "#,
            fragment: r#"
                @fragment
                fn fs_main(@location(3) tint: vec4<f32>) -> @location(0) vec4<f32> {
                    return tint;
                }
            "#,
        };
        let Some(result) = setup_offscreen(SurfaceSize::new(16, 16), &shaders) else {
            return;
        };
        assert!(matches!(
            result.err(),
            Some(RenderError::ShaderLink { .. })
        ));
    }
}
