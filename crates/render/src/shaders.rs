/// Vertex input fed from the position buffer.
pub const POSITION_ATTRIBUTE: &str = "aVertexPosition";
/// Vertex input fed from the color buffer.
pub const COLOR_ATTRIBUTE: &str = "aVertexColor";

/// A vertex + fragment source pair, passed verbatim to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderSources<'a> {
    pub vertex: &'a str,
    pub fragment: &'a str,
}

/// GLSL ES 1.00 pair for GL-style drivers.
pub const GLSL_TRIANGLE: ShaderSources<'static> = ShaderSources {
    vertex: GLSL_VERTEX,
    fragment: GLSL_FRAGMENT,
};

const GLSL_VERTEX: &str = r#"
attribute vec3 aVertexPosition;
attribute vec4 aVertexColor;

varying vec4 vColor;

void main() {
    vColor = aVertexColor;
    gl_Position = vec4(aVertexPosition, 1.0);
}
"#;

const GLSL_FRAGMENT: &str = r#"
precision mediump float;

varying vec4 vColor;

void main() {
    gl_FragColor = vColor;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glsl_pair_declares_both_inputs() {
        assert!(GLSL_TRIANGLE.vertex.contains("attribute vec3 aVertexPosition;"));
        assert!(GLSL_TRIANGLE.vertex.contains("attribute vec4 aVertexColor;"));
        assert!(GLSL_TRIANGLE.fragment.contains("gl_FragColor = vColor;"));
    }
}
