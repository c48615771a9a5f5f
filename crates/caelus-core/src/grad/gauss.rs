use itertools::izip;

use super::GradScheme;
use crate::{
    config::{SchemeError, SchemeStream},
    field::{BoundaryCondition, FieldValue, Gradable, SurfaceField, VolField},
    interpolation::{self, Linear, SurfaceInterpolationScheme},
    mesh::{FvMesh, PatchKind},
};

/// Green-Gauss gradient: the sum of face area vectors
/// times interpolated face values over the cell volume.
pub struct GaussGrad<'m, T: Gradable> {
    mesh: &'m FvMesh,
    interpolation: Box<dyn SurfaceInterpolationScheme<T> + 'm>,
}

impl<'m, T: Gradable> GaussGrad<'m, T> {
    /// Create the scheme with a given face interpolation.
    pub fn new(mesh: &'m FvMesh, interpolation: Box<dyn SurfaceInterpolationScheme<T> + 'm>) -> Self {
        Self { mesh, interpolation }
    }

    /// Gauss with linear interpolation.
    pub fn linear(mesh: &'m FvMesh) -> Self {
        Self::new(mesh, Box::new(Linear::new(mesh)))
    }

    /// The face interpolation used.
    pub fn interpolation(&self) -> &dyn SurfaceInterpolationScheme<T> {
        self.interpolation.as_ref()
    }
}

impl<T: Gradable> GradScheme<T> for GaussGrad<'_, T> {
    fn mesh(&self) -> &FvMesh {
        self.mesh
    }

    fn calc_grad(&self, vf: &VolField<T>, name: &str) -> VolField<T::Grad> {
        let ssf = self.interpolation.interpolate(vf);
        let mut grad = gauss_sum(self.mesh, &ssf, name);
        correct_boundary_conditions(self.mesh, vf, &mut grad);
        grad
    }
}

/// The Gauss sum of face values over each cell, divided by its volume.
///
/// Empty patches don't contribute.
/// Boundary values of the result are the adjacent cell values.
pub fn gauss_sum<T: Gradable>(mesh: &FvMesh, ssf: &SurfaceField<T>, name: &str) -> VolField<T::Grad> {
    let sf = mesh.Sf();
    let mut grad = vec![<T::Grad>::zero(); mesh.n_cells()];

    for (face, &own, &nei, value) in izip!(0.., mesh.owner(), mesh.neighbour(), ssf.internal()) {
        let sf_value = T::outer(&sf[face], value);
        grad[own] += sf_value;
        grad[nei] -= sf_value;
    }

    for (patch_id, patch) in mesh.patches().iter().enumerate() {
        if patch.kind == PatchKind::Empty {
            continue;
        }
        for (face, &cell, value) in izip!(patch.range(), mesh.face_cells(patch_id), ssf.patch(patch_id)) {
            grad[cell] += T::outer(&sf[face], value);
        }
    }

    for (g, &v) in izip!(grad.iter_mut(), mesh.V()) {
        *g = *g * (1.0 / v);
    }

    VolField::calculated(mesh, name, grad)
}

/// Replace the normal component of the gradient on uncoupled patches
/// with the field's own normal gradient there.
pub fn correct_boundary_conditions<T: Gradable>(mesh: &FvMesh, vf: &VolField<T>, grad: &mut VolField<T::Grad>) {
    for patch_id in 0..mesh.patches().len() {
        if matches!(
            vf.boundary()[patch_id].condition,
            BoundaryCondition::Cyclic | BoundaryCondition::Empty
        ) {
            continue;
        }
        let n = mesh.nf(patch_id);
        let sn_grad = vf.sn_grad(mesh, patch_id);
        let gb = &mut grad.boundary_mut()[patch_id].values;
        for (g, n, sn) in izip!(gb.iter_mut(), &n, sn_grad) {
            let corr = T::outer(n, &(sn - T::dot_grad(n, g)));
            *g += corr;
        }
    }
}

pub(super) fn construct<'m, T: Gradable>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
) -> Result<Box<dyn GradScheme<T> + 'm>, SchemeError> {
    let scheme = if args.is_empty() {
        GaussGrad::linear(mesh)
    } else {
        GaussGrad::new(mesh, interpolation::new_scheme_from_stream(mesh, args)?)
    };
    Ok(Box::new(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        field::PatchField,
        mesh::cuboid_mesh,
        primitives::{Tensor, Vector},
    };
    use approx::assert_relative_eq;

    fn linear_field(mesh: &FvMesh) -> VolField<f64> {
        let f = |p: &Vector| 2.0 * p.x() - 3.0 * p.y() + 0.5 * p.z();
        let internal = mesh.C().iter().map(f).collect();
        let boundary = mesh
            .patches()
            .iter()
            .map(|p| PatchField::fixed_value(p.range().map(|face| f(&mesh.Cf()[face])).collect()))
            .collect();
        VolField::new(mesh, "T", internal, boundary)
    }

    #[test]
    fn exact_for_linear_fields() {
        let mesh = cuboid_mesh([3, 4, 2], [1.5, 2.0, 1.0]);
        let vf = linear_field(&mesh);
        let grad = GaussGrad::linear(&mesh).grad(&vf);
        assert_eq!(grad.name(), "grad(T)");
        let exact = Vector::from_xyz(2.0, -3.0, 0.5);
        for g in grad.internal() {
            assert!(g.equal(&exact, 1e-10), "{g:?}");
        }
        for pf in grad.boundary() {
            for g in &pf.values {
                assert!(g.equal(&exact, 1e-10), "{g:?}");
            }
        }
    }

    #[test]
    fn boundary_normal_gradient() {
        let mesh = cuboid_mesh([4, 1, 1], [4.0, 1.0, 1.0]);
        let mut boundary: Vec<PatchField<f64>> =
            mesh.patches().iter().map(|p| PatchField::zero_gradient(p.size)).collect();
        boundary[1] = PatchField::fixed_gradient(vec![3.0]);
        let vf = VolField::new(&mesh, "T", vec![0.0, 1.0, 2.0, 3.0], boundary);
        let grad = GaussGrad::linear(&mesh).grad(&vf);
        // the boundary gradient takes its normal part from the condition
        assert_relative_eq!(grad.patch_values(1)[0].x(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(grad.patch_values(0)[0].x(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(grad.internal()[1].x(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn vector_gradient_and_cyclics() {
        let mesh = cuboid_mesh([4, 1, 1], [4.0, 1.0, 1.0])
            .with_patch_kind("left", PatchKind::Cyclic { neighbour_patch: 1 })
            .unwrap();
        let u = VolField::zero_gradient(
            &mesh,
            "U",
            vec![
                Vector::from_xyz(0.0, 1.0, 0.0),
                Vector::from_xyz(1.0, 1.0, 0.0),
                Vector::from_xyz(0.0, 1.0, 0.0),
                Vector::from_xyz(-1.0, 1.0, 0.0),
            ],
        );
        let grad: std::rc::Rc<VolField<Tensor>> = GaussGrad::linear(&mesh).grad(&u);
        // cell 0 sees face values -0.5 across the cyclic and 0.5 inside
        assert_relative_eq!(grad.internal()[0].at(0, 0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(grad.internal()[2].at(0, 0), -1.0, epsilon = 1e-12);
        // uniform y component has no gradient
        for g in grad.internal() {
            assert_relative_eq!(g.at(0, 1), 0.0, epsilon = 1e-12);
        }
    }
}
