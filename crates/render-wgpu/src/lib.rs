//! wgpu backend for the triangle pipeline.
//!
//! [`WgpuProvider`] turns each context candidate into a wgpu backend set and
//! returns a [`WgpuDevice`] that implements the GL-style driver seam on top
//! of render pipelines. Shaders are WGSL; vertex input names and locations
//! are read from the vertex entry point.
//!
//! # Invariants
//! - A program is only linked once its render pipeline validates.
//! - Draws and clears on a window target go to one frame until `present`.
//! - The GL viewport origin (bottom-left) is flipped to wgpu's top-left.

mod device;
mod provider;
mod reflect;
mod shaders;
mod target;

pub use device::WgpuDevice;
pub use provider::{SurfaceTarget, WgpuProvider};
pub use reflect::{ReflectError, VertexInput, vertex_inputs};
pub use shaders::TRIANGLE_SHADERS;
pub use target::{OFFSCREEN_FORMAT, Pixels};

pub fn crate_info() -> &'static str {
    "tricolor-render-wgpu v0.1.0"
}
