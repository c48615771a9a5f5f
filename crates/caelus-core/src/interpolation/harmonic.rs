use super::{ReverseLinear, SurfaceInterpolationScheme};
use crate::{
    config::{SchemeError, SchemeStream},
    field::{SurfaceField, VolField},
    mesh::FvMesh,
};

/// Harmonic mean of the cell values:
/// the reciprocal of the reverse-linear interpolate of the reciprocal.
///
/// Suited to diffusivities, where the smaller value should dominate.
#[derive(Clone, Copy, Debug)]
pub struct Harmonic<'m> {
    mesh: &'m FvMesh,
}

impl<'m> Harmonic<'m> {
    /// Create the scheme on a mesh.
    pub fn new(mesh: &'m FvMesh) -> Self {
        Self { mesh }
    }
}

impl SurfaceInterpolationScheme<f64> for Harmonic<'_> {
    fn mesh(&self) -> &FvMesh {
        self.mesh
    }

    fn weights(&self, vf: &VolField<f64>) -> SurfaceField<f64> {
        ReverseLinear::new(self.mesh).weights(vf)
    }

    fn interpolate(&self, vf: &VolField<f64>) -> SurfaceField<f64> {
        let inverse = vf.map(format!("1/{}", vf.name()), |v| 1.0 / v);
        ReverseLinear::new(self.mesh)
            .interpolate(&inverse)
            .map(format!("interpolate({})", vf.name()), |v| 1.0 / v)
    }
}

pub(super) fn construct<'m>(
    mesh: &'m FvMesh,
    _args: &mut SchemeStream<'_>,
) -> Result<Box<dyn SurfaceInterpolationScheme<f64> + 'm>, SchemeError> {
    Ok(Box::new(Harmonic::new(mesh)))
}
