use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pixel dimensions of a drawable surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero; nothing can be drawn to it.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self::new(500, 500)
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One entry in the ordered list of context types tried at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextCandidate {
    /// The platform's native graphics API.
    Primary,
    /// OpenGL, GLES or WebGL.
    Gl,
    /// A software adapter.
    Fallback,
}

impl ContextCandidate {
    pub const DEFAULT_ORDER: [ContextCandidate; 2] = [ContextCandidate::Primary, ContextCandidate::Gl];

    pub fn name(&self) -> &'static str {
        match self {
            ContextCandidate::Primary => "primary",
            ContextCandidate::Gl => "gl",
            ContextCandidate::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ContextCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown context candidate `{0}` (expected primary, gl or fallback)")]
pub struct UnknownCandidate(pub String);

impl FromStr for ContextCandidate {
    type Err = UnknownCandidate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(ContextCandidate::Primary),
            "gl" => Ok(ContextCandidate::Gl),
            "fallback" => Ok(ContextCandidate::Fallback),
            _ => Err(UnknownCandidate(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Driver handle for a compiled shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

/// Driver handle for a program object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Driver handle for a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Location of a named vertex input inside a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Uploaded once, drawn many times.
    Static,
    /// Rewritten between draws.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Points,
    Lines,
    Triangles,
    TriangleStrip,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Points => f.write_str("POINTS"),
            Primitive::Lines => f.write_str("LINES"),
            Primitive::Triangles => f.write_str("TRIANGLES"),
            Primitive::TriangleStrip => f.write_str("TRIANGLE_STRIP"),
        }
    }
}

/// How the currently bound buffer feeds one vertex input.
///
/// Components are always 32-bit floats. A stride of 0 means tightly packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeLayout {
    pub components: u32,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
}

impl AttributeLayout {
    /// Tightly packed, unnormalized floats starting at offset 0.
    pub const fn packed(components: u32) -> Self {
        Self {
            components,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    /// Distance in bytes between consecutive vertices.
    pub fn effective_stride(&self) -> u32 {
        if self.stride == 0 {
            self.components * std::mem::size_of::<f32>() as u32
        } else {
            self.stride
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_parses_case_insensitively() {
        assert_eq!("GL".parse::<ContextCandidate>(), Ok(ContextCandidate::Gl));
        assert_eq!(
            " primary ".parse::<ContextCandidate>(),
            Ok(ContextCandidate::Primary)
        );
        assert!("webgl2".parse::<ContextCandidate>().is_err());
    }

    #[test]
    fn packed_layout_stride() {
        assert_eq!(AttributeLayout::packed(3).effective_stride(), 12);
        assert_eq!(AttributeLayout::packed(4).effective_stride(), 16);
        let strided = AttributeLayout {
            stride: 28,
            ..AttributeLayout::packed(3)
        };
        assert_eq!(strided.effective_stride(), 28);
    }

    #[test]
    fn empty_surface() {
        assert!(SurfaceSize::new(0, 10).is_empty());
        assert!(!SurfaceSize::default().is_empty());
        assert_eq!(SurfaceSize::new(640, 480).to_string(), "640x480");
    }
}
