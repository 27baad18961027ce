use crate::buffer::{VertexBuffer, count_vertices};
use crate::config::RenderConfig;
use crate::context::GraphicsContext;
use crate::device::{ContextProvider, GraphicsDevice};
use crate::error::RenderError;
use crate::mesh;
use crate::program::ShaderProgram;
use crate::shaders::ShaderSources;
use crate::types::{BufferUsage, ContextCandidate, Primitive, SurfaceSize};
use glam::Vec4;

/// Owns everything needed to draw the triangle: the context, the linked
/// program and the two vertex buffers.
///
/// Setup order is context, program, buffers; a failure at any step returns
/// before the next one starts.
pub struct Renderer<D: GraphicsDevice> {
    context: GraphicsContext<D>,
    program: ShaderProgram,
    positions: VertexBuffer,
    colors: VertexBuffer,
    clear_color: Vec4,
}

impl<D: GraphicsDevice> Renderer<D> {
    /// Acquire a context from `provider`, then build the program and upload
    /// the triangle.
    pub fn setup<P>(
        provider: &mut P,
        config: &RenderConfig,
        shaders: &ShaderSources<'_>,
    ) -> Result<Self, RenderError>
    where
        P: ContextProvider<Device = D>,
    {
        let context = GraphicsContext::acquire(provider, &config.candidates)?;
        Self::with_context(context, shaders, config.clear_color)
    }

    /// Program and buffer setup against an already acquired context.
    pub fn with_context(
        context: GraphicsContext<D>,
        shaders: &ShaderSources<'_>,
        clear_color: Vec4,
    ) -> Result<Self, RenderError> {
        Self::with_mesh(
            context,
            shaders,
            clear_color,
            &mesh::position_data(),
            &mesh::color_data(),
        )
    }

    /// Vertex counts are checked before anything is created on the device.
    fn with_mesh(
        mut context: GraphicsContext<D>,
        shaders: &ShaderSources<'_>,
        clear_color: Vec4,
        position_data: &[f32],
        color_data: &[f32],
    ) -> Result<Self, RenderError> {
        let position = count_vertices(position_data, mesh::POSITION_COMPONENTS)?;
        let color = count_vertices(color_data, mesh::COLOR_COMPONENTS)?;
        if position != color {
            return Err(RenderError::VertexCountMismatch { position, color });
        }

        let device = context.device_mut();
        let program = ShaderProgram::build(device, shaders)?;
        let positions = VertexBuffer::upload(
            device,
            position_data,
            mesh::POSITION_COMPONENTS,
            BufferUsage::Static,
        )?;
        let colors = VertexBuffer::upload(
            device,
            color_data,
            mesh::COLOR_COMPONENTS,
            BufferUsage::Static,
        )?;

        tracing::debug!(
            "uploaded {} vertices ({} + {} components)",
            positions.vertex_count(),
            positions.components_per_vertex(),
            colors.components_per_vertex()
        );

        Ok(Self {
            context,
            program,
            positions,
            colors,
            clear_color,
        })
    }

    /// Draw one frame: viewport, clear, bind both inputs, draw.
    pub fn render_frame(&mut self) -> Result<(), RenderError> {
        let viewport = self.context.viewport();
        let device = self.context.device_mut();

        device.viewport(0, 0, viewport.width, viewport.height);
        device.clear_color(self.clear_color);
        device.clear()?;

        self.positions
            .attach(device, self.program.position_location())?;
        self.colors.attach(device, self.program.color_location())?;

        device.draw_arrays(Primitive::Triangles, 0, self.positions.vertex_count())?;
        tracing::trace!("drew {} vertices at {viewport}", self.positions.vertex_count());
        Ok(())
    }

    /// Track a new surface size; the next frame uses it as the viewport.
    pub fn resize(&mut self, size: SurfaceSize) {
        if size.is_empty() {
            return;
        }
        self.context.set_viewport(size);
    }

    pub fn viewport(&self) -> SurfaceSize {
        self.context.viewport()
    }

    pub fn candidate(&self) -> ContextCandidate {
        self.context.candidate()
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn position_buffer(&self) -> &VertexBuffer {
        &self.positions
    }

    pub fn color_buffer(&self) -> &VertexBuffer {
        &self.colors
    }

    pub fn device(&self) -> &D {
        self.context.device()
    }

    pub fn device_mut(&mut self) -> &mut D {
        self.context.device_mut()
    }

    /// Release buffers and program in reverse creation order and hand the
    /// device back.
    pub fn teardown(self) -> D {
        let Self {
            context,
            program,
            positions,
            colors,
            ..
        } = self;
        let mut device = context.into_device();
        colors.delete(&mut device);
        positions.delete(&mut device);
        program.delete(&mut device);
        tracing::debug!("renderer torn down");
        device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{Command, RecordingDevice, RecordingProvider};
    use crate::shaders::GLSL_TRIANGLE;
    use crate::types::{AttributeLayout, ShaderStage};

    fn setup(provider: &mut RecordingProvider) -> Result<Renderer<RecordingDevice>, RenderError> {
        Renderer::setup(provider, &RenderConfig::default(), &GLSL_TRIANGLE)
    }

    #[test]
    fn one_frame_issues_one_triangle_draw() {
        let mut provider = RecordingProvider::new(SurfaceSize::new(400, 300));
        let mut renderer = setup(&mut provider).unwrap();
        renderer.render_frame().unwrap();

        assert_eq!(
            renderer.device().draw_calls(),
            vec![(Primitive::Triangles, 0, 3)]
        );
    }

    #[test]
    fn frame_commands_follow_bind_then_describe() {
        let mut provider = RecordingProvider::new(SurfaceSize::new(400, 300));
        let mut renderer = setup(&mut provider).unwrap();
        renderer.device_mut().take_commands();
        renderer.render_frame().unwrap();

        let positions = renderer.position_buffer().handle();
        let colors = renderer.color_buffer().handle();
        let pos_loc = renderer.program().position_location();
        let color_loc = renderer.program().color_location();

        assert_eq!(
            renderer.device().commands(),
            &[
                Command::Viewport {
                    x: 0,
                    y: 0,
                    width: 400,
                    height: 300
                },
                Command::ClearColor(Vec4::ONE),
                Command::Clear,
                Command::BindArrayBuffer(positions),
                Command::VertexAttribPointer {
                    location: pos_loc,
                    buffer: positions,
                    layout: AttributeLayout::packed(3),
                },
                Command::BindArrayBuffer(colors),
                Command::VertexAttribPointer {
                    location: color_loc,
                    buffer: colors,
                    layout: AttributeLayout::packed(4),
                },
                Command::DrawArrays {
                    mode: Primitive::Triangles,
                    first: 0,
                    count: 3
                },
            ]
        );
    }

    #[test]
    fn buffers_match_fixture() {
        let mut provider = RecordingProvider::new(SurfaceSize::default());
        let renderer = setup(&mut provider).unwrap();
        let device = renderer.device();

        let positions = renderer.position_buffer();
        assert_eq!(
            (positions.components_per_vertex(), positions.vertex_count()),
            (3, 3)
        );
        assert_eq!(
            device.buffer_contents(positions.handle()).unwrap(),
            mesh::position_data().as_slice()
        );

        let colors = renderer.color_buffer();
        assert_eq!((colors.components_per_vertex(), colors.vertex_count()), (4, 3));
        assert_eq!(
            device.buffer_contents(colors.handle()).unwrap(),
            mesh::color_data().as_slice()
        );
    }

    #[test]
    fn acquisition_failure_is_repeatable() {
        let mut provider = RecordingProvider::new(SurfaceSize::default()).with_available(&[]);
        let first = setup(&mut provider).err();
        let second = setup(&mut provider).err();

        let expected = RenderError::ContextAcquisition {
            candidates: ContextCandidate::DEFAULT_ORDER.to_vec(),
        };
        assert_eq!(first, Some(expected.clone()));
        assert_eq!(second, Some(expected));
        assert_eq!(provider.attempts().len(), 4);
    }

    #[test]
    fn compile_failure_issues_no_draw() {
        let mut provider = RecordingProvider::new(SurfaceSize::default())
            .with_device(RecordingDevice::new().failing_compile(ShaderStage::Vertex));
        let err = setup(&mut provider).err().unwrap();
        assert!(matches!(
            err,
            RenderError::ShaderCompile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn link_failure_is_reported() {
        let mut provider = RecordingProvider::new(SurfaceSize::default())
            .with_device(RecordingDevice::new().failing_link());
        assert!(matches!(
            setup(&mut provider).err(),
            Some(RenderError::ShaderLink { .. })
        ));
    }

    #[test]
    fn vertex_count_mismatch_is_caught_before_any_driver_call() {
        let mut provider = RecordingProvider::new(SurfaceSize::default())
            .with_device(RecordingDevice::new().failing_compile(ShaderStage::Vertex));
        let context =
            GraphicsContext::acquire(&mut provider, &ContextCandidate::DEFAULT_ORDER).unwrap();
        let colors: [f32; 8] = [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        // The vertex stage would fail to compile, so getting the mismatch
        // back shows the check ran first.
        let err = Renderer::with_mesh(
            context,
            &GLSL_TRIANGLE,
            Vec4::ONE,
            &mesh::position_data(),
            &colors,
        )
        .err();
        assert_eq!(
            err,
            Some(RenderError::VertexCountMismatch {
                position: 3,
                color: 2
            })
        );
    }

    #[test]
    fn resize_moves_the_viewport() {
        let mut provider = RecordingProvider::new(SurfaceSize::new(100, 100));
        let mut renderer = setup(&mut provider).unwrap();
        renderer.resize(SurfaceSize::new(0, 50));
        assert_eq!(renderer.viewport(), SurfaceSize::new(100, 100));

        renderer.resize(SurfaceSize::new(200, 150));
        renderer.device_mut().take_commands();
        renderer.render_frame().unwrap();
        assert_eq!(
            renderer.device().commands()[0],
            Command::Viewport {
                x: 0,
                y: 0,
                width: 200,
                height: 150
            }
        );
    }

    #[test]
    fn rendering_twice_repeats_the_draw() {
        let mut provider = RecordingProvider::new(SurfaceSize::default());
        let mut renderer = setup(&mut provider).unwrap();
        renderer.render_frame().unwrap();
        renderer.render_frame().unwrap();
        assert_eq!(renderer.device().draw_calls().len(), 2);
    }

    #[test]
    fn teardown_releases_all_objects() {
        let mut provider = RecordingProvider::new(SurfaceSize::default());
        let renderer = setup(&mut provider).unwrap();
        assert_eq!(renderer.device().live_objects(), 5);
        let device = renderer.teardown();
        assert_eq!(device.live_objects(), 0);
    }
}
