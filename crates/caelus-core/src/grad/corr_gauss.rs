use itertools::izip;

use super::{correct_boundary_conditions, gauss_sum, GradScheme};
use crate::{
    config::{SchemeError, SchemeStream},
    field::{BoundaryCondition, Gradable, SurfaceField, VolField},
    interpolation::{self, Linear, SurfaceInterpolationScheme},
    mesh::FvMesh,
};

/// Number of correction passes when none is given.
pub const DEFAULT_CORR_ITER: usize = 2;

/// Gauss gradient with face values iteratively re-extrapolated
/// from cell gradients, which reduces the error from skewed faces.
pub struct CorrGaussGrad<'m, T: Gradable> {
    mesh: &'m FvMesh,
    interpolation: Box<dyn SurfaceInterpolationScheme<T> + 'm>,
    corr_iter: usize,
}

impl<'m, T: Gradable> CorrGaussGrad<'m, T> {
    /// Create the scheme with a face interpolation for the initial pass
    /// and a number of correction passes.
    pub fn new(
        mesh: &'m FvMesh,
        interpolation: Box<dyn SurfaceInterpolationScheme<T> + 'm>,
        corr_iter: usize,
    ) -> Self {
        Self {
            mesh,
            interpolation,
            corr_iter,
        }
    }

    /// Face values extrapolated from both sides of each face along the cell gradients.
    fn extrapolate(&self, vf: &VolField<T>, grad: &VolField<T::Grad>) -> SurfaceField<T> {
        let mesh = self.mesh;
        let (c, cf, w) = (mesh.C(), mesh.Cf(), mesh.weights());
        let (vi, gi) = (vf.internal(), grad.internal());

        let internal = izip!(0.., mesh.owner(), mesh.neighbour())
            .map(|(face, &own, &nei)| {
                let from_own = vi[own] + T::dot_grad(&(cf[face] - c[own]), &gi[own]);
                let from_nei = vi[nei] + T::dot_grad(&(cf[face] - c[nei]), &gi[nei]);
                from_own * w[face] + from_nei * (1.0 - w[face])
            })
            .collect();

        let boundary = mesh
            .patches()
            .iter()
            .enumerate()
            .map(|(patch_id, patch)| {
                let pf = &vf.boundary()[patch_id];
                let face_cells = mesh.face_cells(patch_id);
                match pf.condition {
                    BoundaryCondition::Cyclic => {
                        let nbr_values = vf.patch_neighbour_field(mesh, patch_id);
                        let nbr_grads = grad.patch_neighbour_field(mesh, patch_id);
                        izip!(patch.range(), face_cells, nbr_values, nbr_grads)
                            .map(|(face, &own, v_nbr, g_nbr)| {
                                let d_own = cf[face] - c[own];
                                let from_own = vi[own] + T::dot_grad(&d_own, &gi[own]);
                                let from_nbr =
                                    v_nbr + T::dot_grad(&(d_own - mesh.deltas()[face]), &g_nbr);
                                from_own * w[face] + from_nbr * (1.0 - w[face])
                            })
                            .collect()
                    }
                    BoundaryCondition::ZeroGradient | BoundaryCondition::FixedGradient(_) => {
                        // tangential part from the cell gradient,
                        // normal part from the prescribed normal gradient
                        let sn_grad = vf.sn_grad(mesh, patch_id);
                        izip!(patch.range(), face_cells, sn_grad)
                            .map(|(face, &own, sn)| {
                                let d = cf[face] - c[own];
                                let n = mesh.face_normal(face);
                                let g = &gi[own];
                                vi[own] + T::dot_grad(&d, g) + (sn - T::dot_grad(&n, g)) * n.dot(&d)
                            })
                            .collect()
                    }
                    _ => pf.values.clone(),
                }
            })
            .collect();

        SurfaceField::new(mesh, format!("interpolate({})", vf.name()), internal, boundary)
    }
}

impl<T: Gradable> GradScheme<T> for CorrGaussGrad<'_, T> {
    fn mesh(&self) -> &FvMesh {
        self.mesh
    }

    fn calc_grad(&self, vf: &VolField<T>, name: &str) -> VolField<T::Grad> {
        let ssf = self.interpolation.interpolate(vf);
        let mut grad = gauss_sum(self.mesh, &ssf, name);
        correct_boundary_conditions(self.mesh, vf, &mut grad);

        for _ in 0..self.corr_iter {
            let ssf = self.extrapolate(vf, &grad);
            grad = gauss_sum(self.mesh, &ssf, name);
            correct_boundary_conditions(self.mesh, vf, &mut grad);
        }
        grad
    }
}

pub(super) fn construct<'m, T: Gradable>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
) -> Result<Box<dyn GradScheme<T> + 'm>, SchemeError> {
    let interpolation: Box<dyn SurfaceInterpolationScheme<T> + 'm> = if args.is_empty() {
        Box::new(Linear::new(mesh))
    } else {
        interpolation::new_scheme_from_stream(mesh, args)?
    };
    let corr_iter = match args.peek().map(str::parse::<usize>) {
        Some(Ok(n)) => {
            args.next_word();
            n
        }
        _ => DEFAULT_CORR_ITER,
    };
    Ok(Box::new(CorrGaussGrad::new(mesh, interpolation, corr_iter)))
}
