//! Backend-agnostic triangle pipeline.
//!
//! Acquires a context from an ordered list of candidates, links a fixed
//! vertex + fragment program, uploads a static position buffer and color
//! buffer, and draws them as one triangle per frame.
//!
//! # Invariants
//! - A [`ShaderProgram`] only exists after a successful link.
//! - Both vertex buffers hold the same number of vertices.
//! - Nothing reaches the driver until a context has been acquired.
//!
//! The [`GraphicsDevice`] trait is the driver seam. [`RecordingDevice`] is a
//! headless implementation used for tests and command traces; GPU backends
//! live in their own crates.

mod buffer;
mod config;
mod context;
mod device;
mod error;
pub mod mesh;
mod program;
mod recording;
mod renderer;
pub mod shaders;
mod types;

pub use buffer::VertexBuffer;
pub use config::{ConfigError, RenderConfig};
pub use context::GraphicsContext;
pub use device::{ContextProvider, DeviceError, GraphicsDevice};
pub use error::RenderError;
pub use program::ShaderProgram;
pub use recording::{Command, RecordingDevice, RecordingProvider};
pub use renderer::Renderer;
pub use shaders::ShaderSources;
pub use types::{
    AttributeLayout, AttributeLocation, BufferId, BufferUsage, ContextCandidate, Primitive,
    ProgramId, ShaderId, ShaderStage, SurfaceSize, UnknownCandidate,
};

pub fn crate_info() -> &'static str {
    "tricolor-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
