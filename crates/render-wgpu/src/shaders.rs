use tricolor_render::ShaderSources;

/// WGSL pair for the triangle. Vertex inputs keep the names the pipeline
/// resolves: `aVertexPosition` and `aVertexColor`.
pub const TRIANGLE_SHADERS: ShaderSources<'static> = ShaderSources {
    vertex: TRIANGLE_VERTEX,
    fragment: TRIANGLE_FRAGMENT,
};

const TRIANGLE_VERTEX: &str = r#"
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

const TRIANGLE_FRAGMENT: &str = r#"
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;
