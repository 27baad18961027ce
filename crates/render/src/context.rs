use crate::device::{ContextProvider, GraphicsDevice};
use crate::error::RenderError;
use crate::types::{ContextCandidate, SurfaceSize};

/// The device all drawing goes through, plus the viewport it was created for.
pub struct GraphicsContext<D> {
    device: D,
    viewport: SurfaceSize,
    candidate: ContextCandidate,
}

impl<D: GraphicsDevice> GraphicsContext<D> {
    /// Try each candidate in order and keep the first device that comes up.
    ///
    /// The viewport is taken from the provider's surface at the moment of
    /// acquisition.
    pub fn acquire<P>(provider: &mut P, candidates: &[ContextCandidate]) -> Result<Self, RenderError>
    where
        P: ContextProvider<Device = D>,
    {
        let viewport = provider.surface_size();
        if viewport.is_empty() {
            return Err(RenderError::InvalidSurface(viewport));
        }

        for &candidate in candidates {
            match provider.try_candidate(candidate) {
                Ok(device) => {
                    tracing::info!("acquired `{candidate}` context for {viewport} surface");
                    return Ok(Self {
                        device,
                        viewport,
                        candidate,
                    });
                }
                Err(e) => {
                    tracing::warn!("skipping `{candidate}` context: {e}");
                }
            }
        }

        tracing::error!("no context candidate succeeded");
        Err(RenderError::ContextAcquisition {
            candidates: candidates.to_vec(),
        })
    }

    pub fn viewport(&self) -> SurfaceSize {
        self.viewport
    }

    /// Which candidate produced this context.
    pub fn candidate(&self) -> ContextCandidate {
        self.candidate
    }

    pub fn set_viewport(&mut self, viewport: SurfaceSize) {
        self.viewport = viewport;
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }
}
