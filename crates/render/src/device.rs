use crate::types::{
    AttributeLayout, AttributeLocation, BufferId, BufferUsage, ContextCandidate, Primitive,
    ProgramId, ShaderId, ShaderStage, SurfaceSize,
};
use glam::Vec4;

/// Errors reported by a graphics driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("context unavailable: {0}")]
    Unavailable(String),
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("program failed to link: {log}")]
    Link { log: String },
    #[error("unknown shader {0:?}")]
    UnknownShader(ShaderId),
    #[error("unknown program {0:?}")]
    UnknownProgram(ProgramId),
    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferId),
    #[error("no array buffer is bound")]
    NoBufferBound,
    #[error("buffer {0:?} has no data")]
    EmptyBuffer(BufferId),
    #[error("no linked program is in use")]
    NoProgram,
    #[error("program {0:?} is not linked")]
    NotLinked(ProgramId),
    #[error("attribute location {0} is not a vertex input of the program in use")]
    InvalidLocation(u32),
    #[error("attribute location {0} is enabled but no buffer was described to it")]
    UndescribedAttribute(u32),
    #[error("layout {layout:?} does not match the vertex input at location {location}")]
    UnsupportedLayout {
        location: u32,
        layout: AttributeLayout,
    },
    #[error("draw of vertices {first}..{end} exceeds the {available} vertices bound at location {location}")]
    VertexRangeOutOfBounds {
        location: u32,
        first: u32,
        end: u32,
        available: u32,
    },
    #[error("surface error: {0}")]
    Surface(String),
}

/// The driver seam. Every call the pipeline makes against the GPU goes
/// through this trait, in the bind-then-describe style of GL-like APIs:
/// buffer uploads and attribute descriptions act on the currently bound
/// array buffer, and draws use the program in use.
pub trait GraphicsDevice {
    /// Compile one shader stage from source text.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str)
    -> Result<ShaderId, DeviceError>;

    fn create_program(&mut self) -> ProgramId;

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) -> Result<(), DeviceError>;

    /// Link the attached stages. Returns [`DeviceError::Link`] with the
    /// driver's log when link status is false.
    fn link_program(&mut self, program: ProgramId) -> Result<(), DeviceError>;

    fn use_program(&mut self, program: ProgramId) -> Result<(), DeviceError>;

    /// Look up a named vertex input of a linked program.
    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation>;

    fn enable_attribute(&mut self, location: AttributeLocation) -> Result<(), DeviceError>;

    fn create_buffer(&mut self) -> BufferId;

    /// Make `buffer` the current array buffer.
    fn bind_array_buffer(&mut self, buffer: BufferId) -> Result<(), DeviceError>;

    /// Upload `data` into the current array buffer, replacing its contents.
    fn buffer_data(&mut self, data: &[f32], usage: BufferUsage) -> Result<(), DeviceError>;

    /// Feed the vertex input at `location` from the current array buffer.
    fn vertex_attrib_pointer(
        &mut self,
        location: AttributeLocation,
        layout: AttributeLayout,
    ) -> Result<(), DeviceError>;

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    fn clear_color(&mut self, color: Vec4);

    /// Clear the color target to the current clear color.
    fn clear(&mut self) -> Result<(), DeviceError>;

    fn draw_arrays(&mut self, mode: Primitive, first: u32, count: u32) -> Result<(), DeviceError>;

    fn delete_buffer(&mut self, buffer: BufferId);

    fn delete_program(&mut self, program: ProgramId);

    fn delete_shader(&mut self, shader: ShaderId);
}

/// A drawable surface that can hand out a device for one context candidate.
pub trait ContextProvider {
    type Device: GraphicsDevice;

    /// Current pixel dimensions of the surface.
    fn surface_size(&self) -> SurfaceSize;

    /// Attempt to create a device of the given kind. An error means the
    /// candidate is skipped; the reason is only logged.
    fn try_candidate(&mut self, candidate: ContextCandidate) -> Result<Self::Device, DeviceError>;
}
