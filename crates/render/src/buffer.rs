use crate::device::GraphicsDevice;
use crate::error::RenderError;
use crate::types::{AttributeLayout, AttributeLocation, BufferId, BufferUsage};

/// A write-once block of float vertex data and the shape needed to describe
/// it to a vertex input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBuffer {
    handle: BufferId,
    components_per_vertex: u32,
    vertex_count: u32,
}

impl VertexBuffer {
    /// Allocate a buffer and upload `data` once.
    pub fn upload<D: GraphicsDevice>(
        device: &mut D,
        data: &[f32],
        components_per_vertex: u32,
        usage: BufferUsage,
    ) -> Result<Self, RenderError> {
        let vertex_count = count_vertices(data, components_per_vertex)?;

        let handle = device.create_buffer();
        device.bind_array_buffer(handle)?;
        device.buffer_data(data, usage)?;

        Ok(Self {
            handle,
            components_per_vertex,
            vertex_count,
        })
    }

    pub fn handle(&self) -> BufferId {
        self.handle
    }

    pub fn components_per_vertex(&self) -> u32 {
        self.components_per_vertex
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn layout(&self) -> AttributeLayout {
        AttributeLayout::packed(self.components_per_vertex)
    }

    /// Bind this buffer, then describe it to the input at `location`.
    pub fn attach<D: GraphicsDevice>(
        &self,
        device: &mut D,
        location: AttributeLocation,
    ) -> Result<(), RenderError> {
        device.bind_array_buffer(self.handle)?;
        device.vertex_attrib_pointer(location, self.layout())?;
        Ok(())
    }

    pub fn delete<D: GraphicsDevice>(self, device: &mut D) {
        device.delete_buffer(self.handle);
    }
}

/// Number of whole vertices in `data`, or `InvalidVertexData` when it is
/// empty, ragged, or the component count is outside 1..=4.
pub(crate) fn count_vertices(data: &[f32], components_per_vertex: u32) -> Result<u32, RenderError> {
    let components = components_per_vertex as usize;
    if !(1..=4).contains(&components) || data.is_empty() || data.len() % components != 0 {
        return Err(RenderError::InvalidVertexData {
            len: data.len(),
            components: components_per_vertex,
        });
    }
    Ok((data.len() / components) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh;
    use crate::recording::{Command, RecordingDevice};

    #[test]
    fn position_buffer_shape_and_contents() {
        let mut device = RecordingDevice::new();
        let buffer =
            VertexBuffer::upload(&mut device, &mesh::position_data(), 3, BufferUsage::Static)
                .unwrap();

        let expected: [f32; 9] = [0.0, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0];
        assert_eq!(buffer.components_per_vertex(), 3);
        assert_eq!(buffer.vertex_count(), 3);
        assert_eq!(device.buffer_contents(buffer.handle()), Some(&expected[..]));
    }

    #[test]
    fn color_buffer_shape_and_contents() {
        let mut device = RecordingDevice::new();
        let buffer =
            VertexBuffer::upload(&mut device, &mesh::color_data(), 4, BufferUsage::Static).unwrap();

        let expected: [f32; 12] = [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0];
        assert_eq!(buffer.components_per_vertex(), 4);
        assert_eq!(buffer.vertex_count(), 3);
        assert_eq!(device.buffer_contents(buffer.handle()), Some(&expected[..]));
    }

    #[test]
    fn upload_is_static_and_bound_first() {
        let mut device = RecordingDevice::new();
        let buffer = VertexBuffer::upload(&mut device, &[0.0; 6], 2, BufferUsage::Static).unwrap();
        assert_eq!(
            device.commands(),
            &[
                Command::CreateBuffer(buffer.handle()),
                Command::BindArrayBuffer(buffer.handle()),
                Command::BufferData {
                    buffer: buffer.handle(),
                    len: 6,
                    usage: BufferUsage::Static,
                },
            ]
        );
    }

    #[test]
    fn ragged_data_is_rejected() {
        let mut device = RecordingDevice::new();
        let err = VertexBuffer::upload(&mut device, &[0.0; 7], 3, BufferUsage::Static).unwrap_err();
        assert_eq!(
            err,
            RenderError::InvalidVertexData {
                len: 7,
                components: 3
            }
        );
        assert!(device.commands().is_empty());

        assert!(VertexBuffer::upload(&mut device, &[], 3, BufferUsage::Static).is_err());
        assert!(VertexBuffer::upload(&mut device, &[0.0; 5], 5, BufferUsage::Static).is_err());
    }
}
