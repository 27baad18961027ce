use crate::device::GraphicsDevice;
use crate::error::RenderError;
use crate::shaders::{COLOR_ATTRIBUTE, POSITION_ATTRIBUTE, ShaderSources};
use crate::types::{AttributeLocation, ProgramId, ShaderId, ShaderStage};

/// A linked vertex + fragment pair with its two vertex inputs resolved.
///
/// Only [`ShaderProgram::build`] creates one, so holding a value means the
/// program reported a successful link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderProgram {
    id: ProgramId,
    vertex: ShaderId,
    fragment: ShaderId,
    position: AttributeLocation,
    color: AttributeLocation,
}

impl ShaderProgram {
    /// Compile both stages, link them, make the program current and enable
    /// the position and color inputs.
    pub fn build<D: GraphicsDevice>(
        device: &mut D,
        sources: &ShaderSources<'_>,
    ) -> Result<Self, RenderError> {
        let vertex = device.compile_shader(ShaderStage::Vertex, sources.vertex)?;
        let fragment = device.compile_shader(ShaderStage::Fragment, sources.fragment)?;

        let id = device.create_program();
        device.attach_shader(id, vertex)?;
        device.attach_shader(id, fragment)?;
        if let Err(e) = device.link_program(id) {
            tracing::error!("failed to setup shaders: {e}");
            return Err(e.into());
        }
        device.use_program(id)?;

        let position = resolve(device, id, POSITION_ATTRIBUTE)?;
        let color = resolve(device, id, COLOR_ATTRIBUTE)?;
        device.enable_attribute(position)?;
        device.enable_attribute(color)?;

        tracing::debug!(
            "program {} linked: {POSITION_ATTRIBUTE}@{} {COLOR_ATTRIBUTE}@{}",
            id.0,
            position.0,
            color.0
        );

        Ok(Self {
            id,
            vertex,
            fragment,
            position,
            color,
        })
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn position_location(&self) -> AttributeLocation {
        self.position
    }

    pub fn color_location(&self) -> AttributeLocation {
        self.color
    }

    /// Release the program and both stages.
    pub fn delete<D: GraphicsDevice>(self, device: &mut D) {
        device.delete_program(self.id);
        device.delete_shader(self.fragment);
        device.delete_shader(self.vertex);
    }
}

fn resolve<D: GraphicsDevice>(
    device: &D,
    program: ProgramId,
    name: &str,
) -> Result<AttributeLocation, RenderError> {
    device
        .attribute_location(program, name)
        .ok_or_else(|| RenderError::MissingAttribute {
            name: name.to_string(),
        })
}
