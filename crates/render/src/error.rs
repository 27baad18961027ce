use crate::device::DeviceError;
use crate::types::{ContextCandidate, ShaderStage, SurfaceSize};

/// Fatal setup and render failures. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("failed to acquire a graphics context (tried: {})", candidate_list(.candidates))]
    ContextAcquisition { candidates: Vec<ContextCandidate> },
    #[error("surface {0} has no drawable area")]
    InvalidSurface(SurfaceSize),
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },
    #[error("failed to setup shaders: {log}")]
    ShaderLink { log: String },
    #[error("linked program has no vertex input named `{name}`")]
    MissingAttribute { name: String },
    #[error("{len} floats cannot be split into vertices of {components} components")]
    InvalidVertexData { len: usize, components: u32 },
    #[error("position buffer holds {position} vertices but color buffer holds {color}")]
    VertexCountMismatch { position: u32, color: u32 },
    #[error(transparent)]
    Device(DeviceError),
}

impl From<DeviceError> for RenderError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Compile { stage, log } => RenderError::ShaderCompile { stage, log },
            DeviceError::Link { log } => RenderError::ShaderLink { log },
            other => RenderError::Device(other),
        }
    }
}

fn candidate_list(candidates: &[ContextCandidate]) -> String {
    if candidates.is_empty() {
        return "none".to_string();
    }
    candidates
        .iter()
        .map(ContextCandidate::name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_and_link_errors_are_lifted() {
        let err: RenderError = DeviceError::Compile {
            stage: ShaderStage::Fragment,
            log: "bad token".into(),
        }
        .into();
        assert_eq!(
            err,
            RenderError::ShaderCompile {
                stage: ShaderStage::Fragment,
                log: "bad token".into()
            }
        );

        let err: RenderError = DeviceError::NoBufferBound.into();
        assert_eq!(err, RenderError::Device(DeviceError::NoBufferBound));
    }

    #[test]
    fn acquisition_message_lists_candidates() {
        let err = RenderError::ContextAcquisition {
            candidates: ContextCandidate::DEFAULT_ORDER.to_vec(),
        };
        assert_eq!(
            err.to_string(),
            "failed to acquire a graphics context (tried: primary, gl)"
        );

        let err = RenderError::ContextAcquisition { candidates: vec![] };
        assert!(err.to_string().ends_with("(tried: none)"));
    }
}
