//! Headless driver that records every call instead of touching a GPU.
//!
//! Validates calls the way a GL driver would (unknown handles, nothing
//! bound, unlinked program) so the pipeline's ordering can be tested, and
//! keeps uploaded buffer contents so they can be read back.

use crate::device::{ContextProvider, DeviceError, GraphicsDevice};
use crate::shaders::{COLOR_ATTRIBUTE, POSITION_ATTRIBUTE};
use crate::types::{
    AttributeLayout, AttributeLocation, BufferId, BufferUsage, ContextCandidate, Primitive,
    ProgramId, ShaderId, ShaderStage, SurfaceSize,
};
use glam::Vec4;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CompileShader { stage: ShaderStage, shader: ShaderId },
    CreateProgram(ProgramId),
    AttachShader { program: ProgramId, shader: ShaderId },
    LinkProgram(ProgramId),
    UseProgram(ProgramId),
    EnableAttribute(AttributeLocation),
    CreateBuffer(BufferId),
    BindArrayBuffer(BufferId),
    BufferData {
        buffer: BufferId,
        len: usize,
        usage: BufferUsage,
    },
    VertexAttribPointer {
        location: AttributeLocation,
        buffer: BufferId,
        layout: AttributeLayout,
    },
    Viewport {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    ClearColor(Vec4),
    Clear,
    DrawArrays {
        mode: Primitive,
        first: u32,
        count: u32,
    },
    DeleteBuffer(BufferId),
    DeleteProgram(ProgramId),
    DeleteShader(ShaderId),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::CompileShader { stage, shader } => {
                write!(f, "compileShader({stage}) -> {}", shader.0)
            }
            Command::CreateProgram(p) => write!(f, "createProgram() -> {}", p.0),
            Command::AttachShader { program, shader } => {
                write!(f, "attachShader({}, {})", program.0, shader.0)
            }
            Command::LinkProgram(p) => write!(f, "linkProgram({})", p.0),
            Command::UseProgram(p) => write!(f, "useProgram({})", p.0),
            Command::EnableAttribute(l) => write!(f, "enableVertexAttribArray({})", l.0),
            Command::CreateBuffer(b) => write!(f, "createBuffer() -> {}", b.0),
            Command::BindArrayBuffer(b) => write!(f, "bindBuffer(ARRAY_BUFFER, {})", b.0),
            Command::BufferData { buffer, len, usage } => {
                let usage = match usage {
                    BufferUsage::Static => "STATIC_DRAW",
                    BufferUsage::Dynamic => "DYNAMIC_DRAW",
                };
                write!(f, "bufferData(ARRAY_BUFFER <{}>, {len} floats, {usage})", buffer.0)
            }
            Command::VertexAttribPointer {
                location,
                buffer,
                layout,
            } => write!(
                f,
                "vertexAttribPointer({}, {}, FLOAT, {}, {}, {}) <- buffer {}",
                location.0,
                layout.components,
                layout.normalized,
                layout.stride,
                layout.offset,
                buffer.0
            ),
            Command::Viewport {
                x,
                y,
                width,
                height,
            } => write!(f, "viewport({x}, {y}, {width}, {height})"),
            Command::ClearColor(c) => {
                write!(f, "clearColor({:.1}, {:.1}, {:.1}, {:.1})", c.x, c.y, c.z, c.w)
            }
            Command::Clear => f.write_str("clear(COLOR_BUFFER_BIT)"),
            Command::DrawArrays { mode, first, count } => {
                write!(f, "drawArrays({mode}, {first}, {count})")
            }
            Command::DeleteBuffer(b) => write!(f, "deleteBuffer({})", b.0),
            Command::DeleteProgram(p) => write!(f, "deleteProgram({})", p.0),
            Command::DeleteShader(s) => write!(f, "deleteShader({})", s.0),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ProgramState {
    shaders: Vec<ShaderId>,
    linked: bool,
}

/// A [`GraphicsDevice`] that records calls and keeps buffer contents in memory.
#[derive(Debug, Clone)]
pub struct RecordingDevice {
    commands: Vec<Command>,
    next_id: u32,
    /// Declared vertex inputs; the index is the location.
    inputs: Vec<String>,
    failing_stage: Option<ShaderStage>,
    failing_link: bool,
    shaders: HashMap<ShaderId, ShaderStage>,
    programs: HashMap<ProgramId, ProgramState>,
    buffers: HashMap<BufferId, Vec<f32>>,
    bound_buffer: Option<BufferId>,
    current_program: Option<ProgramId>,
    enabled: BTreeSet<u32>,
    described: BTreeMap<u32, (BufferId, AttributeLayout)>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    /// A device whose programs expose the triangle's two vertex inputs.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            next_id: 1,
            inputs: vec![POSITION_ATTRIBUTE.to_string(), COLOR_ATTRIBUTE.to_string()],
            failing_stage: None,
            failing_link: false,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            bound_buffer: None,
            current_program: None,
            enabled: BTreeSet::new(),
            described: BTreeMap::new(),
        }
    }

    /// Replace the vertex inputs linked programs report.
    pub fn with_inputs(mut self, inputs: &[&str]) -> Self {
        self.inputs = inputs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Make every compile of `stage` fail.
    pub fn failing_compile(mut self, stage: ShaderStage) -> Self {
        self.failing_stage = Some(stage);
        self
    }

    /// Make every link fail.
    pub fn failing_link(mut self) -> Self {
        self.failing_link = true;
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Recorded draws as `(mode, first, count)`.
    pub fn draw_calls(&self) -> Vec<(Primitive, u32, u32)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::DrawArrays { mode, first, count } => Some((*mode, *first, *count)),
                _ => None,
            })
            .collect()
    }

    /// Contents last uploaded into `buffer`.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[f32]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn is_linked(&self, program: ProgramId) -> bool {
        self.programs.get(&program).is_some_and(|p| p.linked)
    }

    /// Number of live driver objects (shaders, programs, buffers).
    pub fn live_objects(&self) -> usize {
        self.shaders.len() + self.programs.len() + self.buffers.len()
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn active_program(&self) -> Result<ProgramId, DeviceError> {
        match self.current_program {
            Some(p) if self.is_linked(p) => Ok(p),
            _ => Err(DeviceError::NoProgram),
        }
    }
}

impl GraphicsDevice for RecordingDevice {
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderId, DeviceError> {
        if source.trim().is_empty() {
            return Err(DeviceError::Compile {
                stage,
                log: "empty source".into(),
            });
        }
        if self.failing_stage == Some(stage) {
            return Err(DeviceError::Compile {
                stage,
                log: "ERROR: 0:1: syntax error".into(),
            });
        }
        let shader = ShaderId(self.next_id());
        self.shaders.insert(shader, stage);
        self.commands.push(Command::CompileShader { stage, shader });
        Ok(shader)
    }

    fn create_program(&mut self) -> ProgramId {
        let program = ProgramId(self.next_id());
        self.programs.insert(program, ProgramState::default());
        self.commands.push(Command::CreateProgram(program));
        program
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) -> Result<(), DeviceError> {
        if !self.shaders.contains_key(&shader) {
            return Err(DeviceError::UnknownShader(shader));
        }
        let state = self
            .programs
            .get_mut(&program)
            .ok_or(DeviceError::UnknownProgram(program))?;
        state.shaders.push(shader);
        self.commands.push(Command::AttachShader { program, shader });
        Ok(())
    }

    fn link_program(&mut self, program: ProgramId) -> Result<(), DeviceError> {
        let state = self
            .programs
            .get(&program)
            .ok_or(DeviceError::UnknownProgram(program))?;
        self.commands.push(Command::LinkProgram(program));

        let has = |stage| {
            state
                .shaders
                .iter()
                .any(|s| self.shaders.get(s) == Some(&stage))
        };
        let log = if self.failing_link {
            Some("link status false")
        } else if !has(ShaderStage::Vertex) {
            Some("missing vertex shader")
        } else if !has(ShaderStage::Fragment) {
            Some("missing fragment shader")
        } else {
            None
        };
        if let Some(log) = log {
            return Err(DeviceError::Link { log: log.into() });
        }
        if let Some(state) = self.programs.get_mut(&program) {
            state.linked = true;
        }
        Ok(())
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), DeviceError> {
        if !self.programs.contains_key(&program) {
            return Err(DeviceError::UnknownProgram(program));
        }
        if !self.is_linked(program) {
            return Err(DeviceError::NotLinked(program));
        }
        self.current_program = Some(program);
        self.commands.push(Command::UseProgram(program));
        Ok(())
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation> {
        if !self.is_linked(program) {
            return None;
        }
        self.inputs
            .iter()
            .position(|input| input == name)
            .map(|i| AttributeLocation(i as u32))
    }

    fn enable_attribute(&mut self, location: AttributeLocation) -> Result<(), DeviceError> {
        if location.0 as usize >= self.inputs.len() {
            return Err(DeviceError::InvalidLocation(location.0));
        }
        self.enabled.insert(location.0);
        self.commands.push(Command::EnableAttribute(location));
        Ok(())
    }

    fn create_buffer(&mut self) -> BufferId {
        let buffer = BufferId(self.next_id());
        self.buffers.insert(buffer, Vec::new());
        self.commands.push(Command::CreateBuffer(buffer));
        buffer
    }

    fn bind_array_buffer(&mut self, buffer: BufferId) -> Result<(), DeviceError> {
        if !self.buffers.contains_key(&buffer) {
            return Err(DeviceError::UnknownBuffer(buffer));
        }
        self.bound_buffer = Some(buffer);
        self.commands.push(Command::BindArrayBuffer(buffer));
        Ok(())
    }

    fn buffer_data(&mut self, data: &[f32], usage: BufferUsage) -> Result<(), DeviceError> {
        let buffer = self.bound_buffer.ok_or(DeviceError::NoBufferBound)?;
        let contents = self
            .buffers
            .get_mut(&buffer)
            .ok_or(DeviceError::UnknownBuffer(buffer))?;
        contents.clear();
        contents.extend_from_slice(data);
        self.commands.push(Command::BufferData {
            buffer,
            len: data.len(),
            usage,
        });
        Ok(())
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: AttributeLocation,
        layout: AttributeLayout,
    ) -> Result<(), DeviceError> {
        let buffer = self.bound_buffer.ok_or(DeviceError::NoBufferBound)?;
        if location.0 as usize >= self.inputs.len() {
            return Err(DeviceError::InvalidLocation(location.0));
        }
        if !(1..=4).contains(&layout.components) {
            return Err(DeviceError::UnsupportedLayout {
                location: location.0,
                layout,
            });
        }
        self.described.insert(location.0, (buffer, layout));
        self.commands.push(Command::VertexAttribPointer {
            location,
            buffer,
            layout,
        });
        Ok(())
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.commands.push(Command::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn clear_color(&mut self, color: Vec4) {
        self.commands.push(Command::ClearColor(color));
    }

    fn clear(&mut self) -> Result<(), DeviceError> {
        self.commands.push(Command::Clear);
        Ok(())
    }

    fn draw_arrays(&mut self, mode: Primitive, first: u32, count: u32) -> Result<(), DeviceError> {
        self.active_program()?;
        let end = first.saturating_add(count);
        for &location in &self.enabled {
            let (buffer, layout) = self
                .described
                .get(&location)
                .ok_or(DeviceError::UndescribedAttribute(location))?;
            let contents = self
                .buffers
                .get(buffer)
                .ok_or(DeviceError::UnknownBuffer(*buffer))?;
            if contents.is_empty() {
                return Err(DeviceError::EmptyBuffer(*buffer));
            }
            let bytes = contents.len() as u32 * std::mem::size_of::<f32>() as u32;
            let available = bytes.saturating_sub(layout.offset) / layout.effective_stride();
            if end > available {
                return Err(DeviceError::VertexRangeOutOfBounds {
                    location,
                    first,
                    end,
                    available,
                });
            }
        }
        self.commands.push(Command::DrawArrays { mode, first, count });
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_some() {
            if self.bound_buffer == Some(buffer) {
                self.bound_buffer = None;
            }
            self.commands.push(Command::DeleteBuffer(buffer));
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() {
            if self.current_program == Some(program) {
                self.current_program = None;
            }
            self.commands.push(Command::DeleteProgram(program));
        }
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if self.shaders.remove(&shader).is_some() {
            self.commands.push(Command::DeleteShader(shader));
        }
    }
}

/// A fake surface whose context candidates succeed or fail on demand.
#[derive(Debug, Clone)]
pub struct RecordingProvider {
    size: SurfaceSize,
    available: Vec<ContextCandidate>,
    template: RecordingDevice,
    attempts: Vec<ContextCandidate>,
}

impl RecordingProvider {
    /// A surface on which every candidate succeeds.
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            available: vec![
                ContextCandidate::Primary,
                ContextCandidate::Gl,
                ContextCandidate::Fallback,
            ],
            template: RecordingDevice::new(),
            attempts: Vec::new(),
        }
    }

    /// Restrict which candidates succeed.
    pub fn with_available(mut self, available: &[ContextCandidate]) -> Self {
        self.available = available.to_vec();
        self
    }

    /// Device handed out on success.
    pub fn with_device(mut self, device: RecordingDevice) -> Self {
        self.template = device;
        self
    }

    /// Every candidate tried so far, in order.
    pub fn attempts(&self) -> &[ContextCandidate] {
        &self.attempts
    }
}

impl ContextProvider for RecordingProvider {
    type Device = RecordingDevice;

    fn surface_size(&self) -> SurfaceSize {
        self.size
    }

    fn try_candidate(&mut self, candidate: ContextCandidate) -> Result<RecordingDevice, DeviceError> {
        self.attempts.push(candidate);
        if self.available.contains(&candidate) {
            Ok(self.template.clone())
        } else {
            Err(DeviceError::Unavailable(format!("{candidate} not supported")))
        }
    }
}
