use tricolor_render::{DeviceError, SurfaceSize};

/// Format of offscreen targets. Linear, so cleared and interpolated colors
/// read back unchanged.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Where a [`crate::WgpuDevice`] draws.
pub(crate) enum RenderTarget {
    Offscreen {
        texture: wgpu::Texture,
        size: SurfaceSize,
    },
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        /// Frame acquired by the first clear or draw, held until present.
        frame: Option<wgpu::SurfaceTexture>,
    },
}

impl RenderTarget {
    pub fn offscreen(device: &wgpu::Device, size: SurfaceSize) -> Self {
        Self::Offscreen {
            texture: create_offscreen_texture(device, size),
            size,
        }
    }

    pub fn window(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        device: &wgpu::Device,
        size: SurfaceSize,
    ) -> Result<Self, DeviceError> {
        let caps = surface.get_capabilities(adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| DeviceError::Unavailable("surface has no supported formats".into()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(device, &config);

        Ok(Self::Window {
            surface,
            config,
            frame: None,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match self {
            Self::Offscreen { .. } => OFFSCREEN_FORMAT,
            Self::Window { config, .. } => config.format,
        }
    }

    pub fn size(&self) -> SurfaceSize {
        match self {
            Self::Offscreen { size, .. } => *size,
            Self::Window { config, .. } => SurfaceSize::new(config.width, config.height),
        }
    }

    /// View of the texture the next pass renders into.
    pub fn view(&mut self, device: &wgpu::Device) -> Result<wgpu::TextureView, DeviceError> {
        match self {
            Self::Offscreen { texture, .. } => Ok(texture.create_view(&Default::default())),
            Self::Window {
                surface,
                config,
                frame,
            } => {
                if frame.is_none() {
                    let texture = match surface.get_current_texture() {
                        Ok(t) => t,
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            surface.configure(device, config);
                            surface
                                .get_current_texture()
                                .map_err(|e| DeviceError::Surface(e.to_string()))?
                        }
                        Err(e) => return Err(DeviceError::Surface(e.to_string())),
                    };
                    *frame = Some(texture);
                }
                match frame {
                    Some(f) => Ok(f.texture.create_view(&Default::default())),
                    None => Err(DeviceError::Surface("no frame acquired".into())),
                }
            }
        }
    }

    /// Show the pending window frame, if any. Returns whether one was shown.
    pub fn present(&mut self) -> bool {
        match self {
            Self::Window { frame, .. } => match frame.take() {
                Some(f) => {
                    f.present();
                    true
                }
                None => false,
            },
            Self::Offscreen { .. } => false,
        }
    }

    /// Reallocate at `new_size`, clamped to the device's texture limit.
    pub fn resize(&mut self, device: &wgpu::Device, new_size: SurfaceSize) {
        if new_size.is_empty() {
            return;
        }
        let max = device.limits().max_texture_dimension_2d;
        let new_size = SurfaceSize::new(new_size.width.min(max), new_size.height.min(max));
        match self {
            Self::Offscreen { texture, size } => {
                *texture = create_offscreen_texture(device, new_size);
                *size = new_size;
            }
            Self::Window {
                surface,
                config,
                frame,
            } => {
                frame.take();
                config.width = new_size.width;
                config.height = new_size.height;
                surface.configure(device, config);
            }
        }
    }

    /// Copy the offscreen texture back to the CPU.
    pub fn read_pixels(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Pixels, DeviceError> {
        let Self::Offscreen { texture, size } = self else {
            return Err(DeviceError::Surface(
                "pixel readback needs an offscreen target".into(),
            ));
        };

        let unpadded_row = size.width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = unpadded_row.div_ceil(align) * align;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: padded_row as u64 * size.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(size.height),
                },
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| DeviceError::Surface(e.to_string()))?
            .map_err(|e| DeviceError::Surface(e.to_string()))?;

        let mut data = Vec::with_capacity((size.width * size.height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded_row as usize) {
                let texels: &[[u8; 4]] = bytemuck::cast_slice(&row[..unpadded_row as usize]);
                data.extend_from_slice(texels);
            }
        }
        staging.unmap();

        Ok(Pixels { size: *size, data })
    }
}

fn create_offscreen_texture(device: &wgpu::Device, size: SurfaceSize) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen_target"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

/// RGBA8 pixels read back from an offscreen target, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixels {
    size: SurfaceSize,
    data: Vec<[u8; 4]>,
}

impl Pixels {
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.data
            .get((y * self.size.width + x) as usize)
            .copied()
    }

    pub fn center(&self) -> [u8; 4] {
        self.get(self.size.width / 2, self.size.height / 2)
            .unwrap_or_default()
    }
}
