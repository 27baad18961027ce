//! Vertex input reflection for WGSL vertex stages.
//!
//! Parses the source with naga and collects every `@location(n)` input of
//! the `@vertex` entry point, whether declared as a parameter or as a member
//! of a struct parameter. `@builtin` inputs are skipped.

use naga::{Binding, ScalarKind, TypeInner, VectorSize};

/// One named vertex input of a vertex entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInput {
    pub name: String,
    pub location: u32,
    /// Number of `f32` components (1 to 4).
    pub components: u32,
}

impl VertexInput {
    pub fn format(&self) -> wgpu::VertexFormat {
        match self.components {
            1 => wgpu::VertexFormat::Float32,
            2 => wgpu::VertexFormat::Float32x2,
            3 => wgpu::VertexFormat::Float32x3,
            _ => wgpu::VertexFormat::Float32x4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReflectError {
    #[error("{0}")]
    Parse(String),
    #[error("no @vertex entry point")]
    NoVertexEntry,
    #[error("vertex input at location {0} has no name")]
    Unnamed(u32),
    #[error("unsupported type for vertex input `{0}`; expected f32 or vecN<f32>")]
    UnsupportedType(String),
    #[error("location {0} is used twice")]
    DuplicateLocation(u32),
}

/// Collect the vertex inputs of the first `@vertex` entry point, sorted by
/// location.
pub fn vertex_inputs(source: &str) -> Result<Vec<VertexInput>, ReflectError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| ReflectError::Parse(e.emit_to_string(source)))?;
    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga::ShaderStage::Vertex)
        .ok_or(ReflectError::NoVertexEntry)?;

    let mut inputs = Vec::new();
    for arg in &entry.function.arguments {
        match (&arg.binding, &module.types[arg.ty].inner) {
            (Some(binding), inner) => {
                collect(&mut inputs, arg.name.as_deref(), binding, inner)?;
            }
            (None, TypeInner::Struct { members, .. }) => {
                for member in members {
                    if let Some(binding) = &member.binding {
                        let inner = &module.types[member.ty].inner;
                        collect(&mut inputs, member.name.as_deref(), binding, inner)?;
                    }
                }
            }
            (None, _) => {}
        }
    }
    inputs.sort_by_key(|i| i.location);
    Ok(inputs)
}

fn collect(
    inputs: &mut Vec<VertexInput>,
    name: Option<&str>,
    binding: &Binding,
    inner: &TypeInner,
) -> Result<(), ReflectError> {
    let Binding::Location { location, .. } = *binding else {
        return Ok(());
    };
    let name = name.ok_or(ReflectError::Unnamed(location))?;
    let components = float_components(inner)
        .ok_or_else(|| ReflectError::UnsupportedType(name.to_string()))?;
    if inputs.iter().any(|i| i.location == location) {
        return Err(ReflectError::DuplicateLocation(location));
    }
    inputs.push(VertexInput {
        name: name.to_string(),
        location,
        components,
    });
    Ok(())
}

fn float_components(inner: &TypeInner) -> Option<u32> {
    let is_f32 = |s: &naga::Scalar| s.kind == ScalarKind::Float && s.width == 4;
    match inner {
        TypeInner::Scalar(s) if is_f32(s) => Some(1),
        TypeInner::Vector { size, scalar } if is_f32(scalar) => Some(match size {
            VectorSize::Bi => 2,
            VectorSize::Tri => 3,
            VectorSize::Quad => 4,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_locations_and_components() {
        let src = r#"
            @vertex
            fn main(
                @location(1) color: vec4<f32>,
                @builtin(vertex_index) index: u32,
                @location(0) position: vec3f,
            ) -> @builtin(position) vec4<f32> {
                return vec4<f32>(position, 1.0);
            }
        "#;
        let inputs = vertex_inputs(src).unwrap();
        assert_eq!(
            inputs,
            vec![
                VertexInput {
                    name: "position".into(),
                    location: 0,
                    components: 3
                },
                VertexInput {
                    name: "color".into(),
                    location: 1,
                    components: 4
                },
            ]
        );
        assert_eq!(inputs[1].format(), wgpu::VertexFormat::Float32x4);
    }

    #[test]
    fn comments_between_parameters() {
        let src = r#"
            @vertex
            fn vs_main(
                @location(0) aVertexPosition: vec3<f32>, // xyz, in NDC
                /* rgba, premultiplied */ @location(1) aVertexColor: vec4<f32>,
            ) -> @builtin(position) vec4<f32> {
                return vec4<f32>(aVertexPosition, aVertexColor.a);
            }
        "#;
        let inputs = vertex_inputs(src).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].name, "aVertexPosition");
        assert_eq!(inputs[1].name, "aVertexColor");
    }

    #[test]
    fn struct_inputs() {
        let src = r#"
            struct VertexInput {
                @location(0) position: vec3<f32>,
                @location(1) normal: vec3<f32>,
                @builtin(instance_index) instance: u32,
            };

            @vertex
            fn vs_main(v: VertexInput, @location(5) weight: f32) -> @builtin(position) vec4<f32> {
                return vec4<f32>(v.position + v.normal * weight, 1.0);
            }
        "#;
        let inputs = vertex_inputs(src).unwrap();
        let found: Vec<_> = inputs
            .iter()
            .map(|i| (i.name.as_str(), i.location, i.components))
            .collect();
        assert_eq!(
            found,
            vec![("position", 0, 3), ("normal", 1, 3), ("weight", 5, 1)]
        );
    }

    #[test]
    fn no_parameters() {
        let src = "@vertex fn vs() -> @builtin(position) vec4<f32> { return vec4<f32>(); }";
        assert!(vertex_inputs(src).unwrap().is_empty());
    }

    #[test]
    fn rejects_fragment_only_source() {
        let src = "@fragment fn fs() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        assert_eq!(vertex_inputs(src), Err(ReflectError::NoVertexEntry));
    }

    #[test]
    fn rejects_integer_inputs() {
        let src = "@vertex fn vs(@location(0) id: u32) -> @builtin(position) vec4<f32> { return vec4<f32>(); }";
        assert_eq!(
            vertex_inputs(src),
            Err(ReflectError::UnsupportedType("id".into()))
        );
    }

    #[test]
    fn syntax_errors_carry_the_parser_message() {
        let err = vertex_inputs("@vertex fn vs(@location(0) a: f32").unwrap_err();
        assert!(matches!(err, ReflectError::Parse(msg) if !msg.is_empty()));
    }
}
