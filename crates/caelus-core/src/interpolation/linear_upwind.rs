use itertools::izip;

use super::{SurfaceInterpolationScheme, Upwind};
use crate::{
    config::{SchemeError, SchemeStream},
    field::{FieldValue, Gradable, SurfaceField, VolField},
    grad::{GaussGrad, GradScheme},
    mesh::FvMesh,
};

/// Upwind weights with a second-order explicit correction
/// extrapolating from the upwind cell along its gradient.
#[derive(Clone, Debug)]
pub struct LinearUpwind<'m> {
    upwind: Upwind<'m>,
}

impl<'m> LinearUpwind<'m> {
    /// Create the scheme from an upwind scheme giving the flux direction.
    pub fn new(upwind: Upwind<'m>) -> Self {
        Self { upwind }
    }
}

impl<'m, T: Gradable> SurfaceInterpolationScheme<T> for LinearUpwind<'m> {
    fn mesh(&self) -> &FvMesh {
        SurfaceInterpolationScheme::<T>::mesh(&self.upwind)
    }

    fn weights(&self, _vf: &VolField<T>) -> SurfaceField<f64> {
        self.upwind.upwind_weights()
    }

    fn corrected(&self) -> bool {
        true
    }

    fn correction(&self, vf: &VolField<T>) -> Option<SurfaceField<T>> {
        let mesh = SurfaceInterpolationScheme::<T>::mesh(self);
        let flux = self.upwind.face_flux();
        let (c, cf) = (mesh.C(), mesh.Cf());
        let grad = GaussGrad::linear(mesh).grad(vf);
        let gi = grad.internal();

        let internal = izip!(0.., mesh.owner(), mesh.neighbour(), flux.internal())
            .map(|(face, &own, &nei, &f)| {
                if f > 0.0 {
                    T::dot_grad(&(cf[face] - c[own]), &gi[own])
                } else {
                    T::dot_grad(&(cf[face] - c[nei]), &gi[nei])
                }
            })
            .collect();

        let boundary = mesh
            .patches()
            .iter()
            .enumerate()
            .map(|(patch_id, patch)| {
                if !vf.boundary()[patch_id].is_coupled() {
                    return vec![T::zero(); patch.size];
                }
                let grad_own = grad.patch_internal_field(mesh, patch_id);
                let grad_nbr = grad.patch_neighbour_field(mesh, patch_id);
                let face_cells = mesh.face_cells(patch_id);
                izip!(patch.range(), face_cells, flux.patch(patch_id), grad_own, grad_nbr)
                    .map(|(face, &own, &f, g_own, g_nbr)| {
                        let d_own = cf[face] - c[own];
                        if f > 0.0 {
                            T::dot_grad(&d_own, &g_own)
                        } else {
                            // neighbour centre in this side's frame is own + delta
                            T::dot_grad(&(d_own - mesh.deltas()[face]), &g_nbr)
                        }
                    })
                    .collect()
            })
            .collect();

        Some(SurfaceField::new(
            mesh,
            format!("linearUpwindCorrection({})", vf.name()),
            internal,
            boundary,
        ))
    }
}

pub(super) fn construct<'m, T: Gradable>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError> {
    Ok(Box::new(LinearUpwind::new(Upwind::from_stream(
        mesh,
        args,
        "linearUpwind",
    )?)))
}
