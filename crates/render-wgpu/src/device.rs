use crate::reflect::{self, VertexInput};
use crate::target::{Pixels, RenderTarget};
use glam::Vec4;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tricolor_render::{
    AttributeLayout, AttributeLocation, BufferId, BufferUsage, DeviceError, GraphicsDevice,
    Primitive, ProgramId, ShaderId, ShaderStage, SurfaceSize,
};
use wgpu::util::DeviceExt;

struct CompiledShader {
    stage: ShaderStage,
    module: Arc<wgpu::ShaderModule>,
    /// Reflected vertex inputs; empty for fragment stages.
    inputs: Vec<VertexInput>,
}

#[derive(Default)]
struct ProgramState {
    vertex: Option<ShaderId>,
    fragment: Option<ShaderId>,
    linked: Option<LinkedProgram>,
}

/// Stages and inputs captured at link time, so shaders may be deleted
/// afterwards. Pipelines are built per primitive type on first use.
struct LinkedProgram {
    vertex: Arc<wgpu::ShaderModule>,
    fragment: Arc<wgpu::ShaderModule>,
    inputs: Vec<VertexInput>,
    pipelines: HashMap<Primitive, wgpu::RenderPipeline>,
}

#[derive(Default)]
struct GpuBuffer {
    buffer: Option<wgpu::Buffer>,
    /// Length in floats.
    len: usize,
}

/// [`GraphicsDevice`] over wgpu.
///
/// Each vertex input of the linked program gets its own vertex buffer slot,
/// in location order. `clear` and `draw_arrays` each submit one render pass.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: RenderTarget,
    adapter_info: wgpu::AdapterInfo,
    next_id: u32,
    shaders: HashMap<ShaderId, CompiledShader>,
    programs: HashMap<ProgramId, ProgramState>,
    buffers: HashMap<BufferId, GpuBuffer>,
    bound_buffer: Option<BufferId>,
    current_program: Option<ProgramId>,
    enabled: BTreeSet<u32>,
    described: BTreeMap<u32, (BufferId, AttributeLayout)>,
    viewport: (i32, i32, u32, u32),
    clear_color: Vec4,
}

impl WgpuDevice {
    pub(crate) fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target: RenderTarget,
        adapter_info: wgpu::AdapterInfo,
    ) -> Self {
        let size = target.size();
        Self {
            device,
            queue,
            target,
            adapter_info,
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            bound_buffer: None,
            current_program: None,
            enabled: BTreeSet::new(),
            described: BTreeMap::new(),
            viewport: (0, 0, size.width, size.height),
            clear_color: Vec4::ZERO,
        }
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    pub fn target_size(&self) -> SurfaceSize {
        self.target.size()
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target.format()
    }

    /// Reallocate the offscreen texture or reconfigure the window surface.
    pub fn resize(&mut self, size: SurfaceSize) {
        self.target.resize(&self.device, size);
    }

    /// Present the window frame drawn since the last present.
    pub fn present(&mut self) -> bool {
        self.target.present()
    }

    /// Read back an offscreen target.
    pub fn read_pixels(&self) -> Result<Pixels, DeviceError> {
        self.target.read_pixels(&self.device, &self.queue)
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The viewport converted to wgpu's top-left origin and clipped to the
    /// target. `None` when nothing of it is visible.
    fn viewport_rect(&self) -> Option<[f32; 4]> {
        let size = self.target.size();
        let (tw, th) = (size.width as i64, size.height as i64);
        let (x, y, w, h) = self.viewport;
        let (x, y, w, h) = (x as i64, y as i64, w as i64, h as i64);

        let left = x.clamp(0, tw);
        let right = (x + w).clamp(0, tw);
        let top = (th - (y + h)).clamp(0, th);
        let bottom = (th - y).clamp(0, th);
        if right <= left || bottom <= top {
            return None;
        }
        Some([
            left as f32,
            top as f32,
            (right - left) as f32,
            (bottom - top) as f32,
        ])
    }
}

/// Encode one render pass over `view` and submit it.
fn submit_pass(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    view: &wgpu::TextureView,
    label: &str,
    load: wgpu::LoadOp<wgpu::Color>,
    draw: impl FnOnce(&mut wgpu::RenderPass<'_>),
) {
    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });
        draw(&mut pass);
    }
    queue.submit(std::iter::once(encoder.finish()));
}

fn topology(mode: Primitive) -> wgpu::PrimitiveTopology {
    match mode {
        Primitive::Points => wgpu::PrimitiveTopology::PointList,
        Primitive::Lines => wgpu::PrimitiveTopology::LineList,
        Primitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
        Primitive::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    program: &LinkedProgram,
    mode: Primitive,
) -> wgpu::RenderPipeline {
    let attributes: Vec<[wgpu::VertexAttribute; 1]> = program
        .inputs
        .iter()
        .map(|input| {
            [wgpu::VertexAttribute {
                format: input.format(),
                offset: 0,
                shader_location: input.location,
            }]
        })
        .collect();
    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = program
        .inputs
        .iter()
        .zip(&attributes)
        .map(|(input, attributes)| wgpu::VertexBufferLayout {
            array_stride: input.format().size(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        })
        .collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("triangle_pipeline"),
        layout: None,
        vertex: wgpu::VertexState {
            module: &program.vertex,
            entry_point: None,
            compilation_options: Default::default(),
            buffers: &buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: &program.fragment,
            entry_point: None,
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: topology(mode),
            ..Default::default()
        },
        depth_stencil: None,
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

impl GraphicsDevice for WgpuDevice {
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderId, DeviceError> {
        let inputs = match stage {
            ShaderStage::Vertex => reflect::vertex_inputs(source).map_err(|e| {
                DeviceError::Compile {
                    stage,
                    log: e.to_string(),
                }
            })?,
            ShaderStage::Fragment => Vec::new(),
        };

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(match stage {
                    ShaderStage::Vertex => "vertex_shader",
                    ShaderStage::Fragment => "fragment_shader",
                }),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(DeviceError::Compile {
                stage,
                log: err.to_string(),
            });
        }

        let id = ShaderId(self.next_id());
        self.shaders.insert(
            id,
            CompiledShader {
                stage,
                module: Arc::new(module),
                inputs,
            },
        );
        tracing::debug!("compiled {stage} shader {}", id.0);
        Ok(id)
    }

    fn create_program(&mut self) -> ProgramId {
        let id = ProgramId(self.next_id());
        self.programs.insert(id, ProgramState::default());
        id
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) -> Result<(), DeviceError> {
        let stage = self
            .shaders
            .get(&shader)
            .map(|s| s.stage)
            .ok_or(DeviceError::UnknownShader(shader))?;
        let state = self
            .programs
            .get_mut(&program)
            .ok_or(DeviceError::UnknownProgram(program))?;
        match stage {
            ShaderStage::Vertex => state.vertex = Some(shader),
            ShaderStage::Fragment => state.fragment = Some(shader),
        }
        Ok(())
    }

    fn link_program(&mut self, program: ProgramId) -> Result<(), DeviceError> {
        let state = self
            .programs
            .get(&program)
            .ok_or(DeviceError::UnknownProgram(program))?;
        let lookup = |id: Option<ShaderId>, stage: ShaderStage| {
            id.and_then(|id| self.shaders.get(&id))
                .ok_or_else(|| DeviceError::Link {
                    log: format!("missing {stage} shader"),
                })
        };
        let vertex = lookup(state.vertex, ShaderStage::Vertex)?;
        let fragment = lookup(state.fragment, ShaderStage::Fragment)?;

        let mut linked = LinkedProgram {
            vertex: Arc::clone(&vertex.module),
            fragment: Arc::clone(&fragment.module),
            inputs: vertex.inputs.clone(),
            pipelines: HashMap::new(),
        };

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = create_pipeline(
            &self.device,
            self.target.format(),
            &linked,
            Primitive::Triangles,
        );
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(DeviceError::Link {
                log: err.to_string(),
            });
        }
        linked.pipelines.insert(Primitive::Triangles, pipeline);

        if let Some(state) = self.programs.get_mut(&program) {
            state.linked = Some(linked);
        }
        tracing::debug!("linked program {}", program.0);
        Ok(())
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), DeviceError> {
        let state = self
            .programs
            .get(&program)
            .ok_or(DeviceError::UnknownProgram(program))?;
        if state.linked.is_none() {
            return Err(DeviceError::NotLinked(program));
        }
        self.current_program = Some(program);
        Ok(())
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation> {
        let linked = self.programs.get(&program)?.linked.as_ref()?;
        linked
            .inputs
            .iter()
            .find(|input| input.name == name)
            .map(|input| AttributeLocation(input.location))
    }

    fn enable_attribute(&mut self, location: AttributeLocation) -> Result<(), DeviceError> {
        if location.0 >= self.device.limits().max_vertex_attributes {
            return Err(DeviceError::InvalidLocation(location.0));
        }
        self.enabled.insert(location.0);
        Ok(())
    }

    fn create_buffer(&mut self) -> BufferId {
        let id = BufferId(self.next_id());
        self.buffers.insert(id, GpuBuffer::default());
        id
    }

    fn bind_array_buffer(&mut self, buffer: BufferId) -> Result<(), DeviceError> {
        if !self.buffers.contains_key(&buffer) {
            return Err(DeviceError::UnknownBuffer(buffer));
        }
        self.bound_buffer = Some(buffer);
        Ok(())
    }

    fn buffer_data(&mut self, data: &[f32], usage: BufferUsage) -> Result<(), DeviceError> {
        let id = self.bound_buffer.ok_or(DeviceError::NoBufferBound)?;
        let slot = self
            .buffers
            .get_mut(&id)
            .ok_or(DeviceError::UnknownBuffer(id))?;

        if data.is_empty() {
            *slot = GpuBuffer::default();
            return Ok(());
        }
        let usage = match usage {
            BufferUsage::Static => wgpu::BufferUsages::VERTEX,
            BufferUsage::Dynamic => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("vertex_buffer"),
                contents: bytemuck::cast_slice(data),
                usage,
            });
        *slot = GpuBuffer {
            buffer: Some(buffer),
            len: data.len(),
        };
        Ok(())
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: AttributeLocation,
        layout: AttributeLayout,
    ) -> Result<(), DeviceError> {
        let buffer = self.bound_buffer.ok_or(DeviceError::NoBufferBound)?;
        if !(1..=4).contains(&layout.components) || layout.offset % 4 != 0 {
            return Err(DeviceError::UnsupportedLayout {
                location: location.0,
                layout,
            });
        }
        self.described.insert(location.0, (buffer, layout));
        Ok(())
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = (x, y, width, height);
    }

    fn clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }

    fn clear(&mut self) -> Result<(), DeviceError> {
        let c = self.clear_color.as_dvec4();
        let color = wgpu::Color {
            r: c.x,
            g: c.y,
            b: c.z,
            a: c.w,
        };
        let view = self.target.view(&self.device)?;
        submit_pass(
            &self.device,
            &self.queue,
            &view,
            "clear_pass",
            wgpu::LoadOp::Clear(color),
            |_| {},
        );
        Ok(())
    }

    fn draw_arrays(&mut self, mode: Primitive, first: u32, count: u32) -> Result<(), DeviceError> {
        let program = self.current_program.ok_or(DeviceError::NoProgram)?;
        let end = first.saturating_add(count);
        let format = self.target.format();
        let linked = self
            .programs
            .get_mut(&program)
            .and_then(|p| p.linked.as_mut())
            .ok_or(DeviceError::NoProgram)?;

        // One (buffer, byte offset) per vertex buffer slot.
        let mut bindings = Vec::with_capacity(linked.inputs.len());
        for input in &linked.inputs {
            let location = input.location;
            let (buffer_id, layout) = self
                .described
                .get(&location)
                .filter(|_| self.enabled.contains(&location))
                .ok_or(DeviceError::UndescribedAttribute(location))?;
            if layout.components != input.components
                || layout.effective_stride() != input.components * 4
            {
                return Err(DeviceError::UnsupportedLayout {
                    location,
                    layout: *layout,
                });
            }
            let slot = self
                .buffers
                .get(buffer_id)
                .ok_or(DeviceError::UnknownBuffer(*buffer_id))?;
            if slot.buffer.is_none() {
                return Err(DeviceError::EmptyBuffer(*buffer_id));
            }
            let bytes = (slot.len * std::mem::size_of::<f32>()) as u64;
            let stride = layout.effective_stride() as u64;
            let available = (bytes.saturating_sub(layout.offset as u64) / stride) as u32;
            if end > available {
                return Err(DeviceError::VertexRangeOutOfBounds {
                    location,
                    first,
                    end,
                    available,
                });
            }
            bindings.push((*buffer_id, layout.offset as u64));
        }

        if !linked.pipelines.contains_key(&mode) {
            self.device.push_error_scope(wgpu::ErrorFilter::Validation);
            let pipeline = create_pipeline(&self.device, format, linked, mode);
            if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
                return Err(DeviceError::Link {
                    log: format!("{mode} pipeline: {err}"),
                });
            }
            linked.pipelines.insert(mode, pipeline);
        }

        let Some([x, y, w, h]) = self.viewport_rect() else {
            tracing::trace!("viewport is off target, skipping draw");
            return Ok(());
        };
        let view = self.target.view(&self.device)?;

        let Some(pipeline) = self
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .and_then(|l| l.pipelines.get(&mode))
        else {
            return Err(DeviceError::NotLinked(program));
        };
        let buffers = &self.buffers;

        submit_pass(
            &self.device,
            &self.queue,
            &view,
            "draw_pass",
            wgpu::LoadOp::Load,
            |pass| {
                pass.set_viewport(x, y, w, h, 0.0, 1.0);
                pass.set_pipeline(pipeline);
                for (slot, (id, offset)) in bindings.iter().enumerate() {
                    if let Some(buffer) = buffers.get(id).and_then(|b| b.buffer.as_ref()) {
                        pass.set_vertex_buffer(slot as u32, buffer.slice(*offset..));
                    }
                }
                pass.draw(first..end, 0..1);
            },
        );
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_some() && self.bound_buffer == Some(buffer) {
            self.bound_buffer = None;
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() && self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }
}
