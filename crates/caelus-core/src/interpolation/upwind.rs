use std::rc::Rc;

use super::{lookup_flux, pos, SurfaceInterpolationScheme};
use crate::{
    config::{SchemeError, SchemeStream},
    field::{FieldValue, SurfaceField, VolField},
    mesh::FvMesh,
};

/// Takes the value of the cell the flux comes from.
#[derive(Clone, Debug)]
pub struct Upwind<'m> {
    mesh: &'m FvMesh,
    face_flux: Rc<SurfaceField<f64>>,
}

impl<'m> Upwind<'m> {
    /// Create the scheme with a given flux field.
    pub fn new(mesh: &'m FvMesh, face_flux: Rc<SurfaceField<f64>>) -> Self {
        Self { mesh, face_flux }
    }

    /// Create the scheme with the flux field named by the next token,
    /// looked up in the mesh registry.
    pub fn from_stream(
        mesh: &'m FvMesh,
        stream: &mut SchemeStream<'_>,
        scheme: &'static str,
    ) -> Result<Self, SchemeError> {
        Ok(Self::new(mesh, lookup_flux(mesh, stream, scheme)?))
    }

    /// The flux field deciding the upwind direction.
    #[inline]
    pub fn face_flux(&self) -> &SurfaceField<f64> {
        &self.face_flux
    }

    /// 1 where the owner is upwind, 0 where the neighbour is.
    pub fn upwind_weights(&self) -> SurfaceField<f64> {
        self.face_flux.map("upwindWeights", pos)
    }
}

impl<T: FieldValue> SurfaceInterpolationScheme<T> for Upwind<'_> {
    fn mesh(&self) -> &FvMesh {
        self.mesh
    }

    fn weights(&self, _vf: &VolField<T>) -> SurfaceField<f64> {
        self.upwind_weights()
    }
}

pub(super) fn construct<'m, T: FieldValue>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError> {
    Ok(Box::new(Upwind::from_stream(mesh, args, "upwind")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{interpolation::new_scheme, mesh::line_mesh};

    #[test]
    fn follows_the_flux() {
        let mesh = line_mesh(4, 4.0);
        let phi = SurfaceField::from_fn(&mesh, "phi", |f| if f == 1 { -1.0 } else { 1.0 });
        mesh.registry().store("phi", Rc::new(phi));

        let vf = VolField::zero_gradient(&mesh, "T", vec![1.0, 2.0, 3.0, 4.0]);
        let sf = new_scheme::<f64>(&mesh, "upwind phi").unwrap().interpolate(&vf);
        assert_eq!(sf.internal(), &[1.0, 3.0, 3.0]);
        assert_eq!(sf.patch(0), &[1.0]);
        assert_eq!(sf.patch(1), &[4.0]);
    }
}
