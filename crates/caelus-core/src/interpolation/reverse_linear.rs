use super::SurfaceInterpolationScheme;
use crate::{
    config::{SchemeError, SchemeStream},
    field::{FieldValue, SurfaceField, VolField},
    mesh::FvMesh,
};

/// Linear interpolation with the owner and neighbour weights swapped.
#[derive(Clone, Copy, Debug)]
pub struct ReverseLinear<'m> {
    mesh: &'m FvMesh,
}

impl<'m> ReverseLinear<'m> {
    /// Create the scheme on a mesh.
    pub fn new(mesh: &'m FvMesh) -> Self {
        Self { mesh }
    }
}

impl<T: FieldValue> SurfaceInterpolationScheme<T> for ReverseLinear<'_> {
    fn mesh(&self) -> &FvMesh {
        self.mesh
    }

    fn weights(&self, _vf: &VolField<T>) -> SurfaceField<f64> {
        let mesh = self.mesh;
        let cdw = mesh.weights();
        // uncoupled boundary faces keep weight 1 so they take the patch value
        SurfaceField::from_fn(mesh, "reverseLinearWeights", |face| match mesh.which_patch(face) {
            Some((patch_id, _)) if !mesh.patch(patch_id).is_coupled() => cdw[face],
            _ => 1.0 - cdw[face],
        })
    }
}

pub(super) fn construct<'m, T: FieldValue>(
    mesh: &'m FvMesh,
    _args: &mut SchemeStream<'_>,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError> {
    Ok(Box::new(ReverseLinear::new(mesh)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{cuboid_mesh, FvMesh};
    use approx::assert_relative_eq;

    #[test]
    fn swapped_weights() {
        // cells of width 1 and 3
        let m = cuboid_mesh([2, 1, 1], [2.0, 1.0, 1.0]);
        let points = m
            .points()
            .iter()
            .map(|p| {
                let mut p = *p;
                if p.x() > 1.5 {
                    p.replace(0, 4.0);
                }
                p
            })
            .collect();
        let mesh = FvMesh::new(
            points,
            (0..m.n_faces()).map(|f| m.face_points(f).to_vec()).collect(),
            m.owner().to_vec(),
            m.neighbour().to_vec(),
            m.patches().to_vec(),
        )
        .unwrap();
        let vf = VolField::zero_gradient(&mesh, "T", vec![0.0, 4.0]);
        let w = SurfaceInterpolationScheme::<f64>::weights(&ReverseLinear::new(&mesh), &vf);
        assert_relative_eq!(w.internal()[0], 0.25, epsilon = 1e-12);
        assert_eq!(w.patch(0), &[1.0]);
        let sf = ReverseLinear::new(&mesh).interpolate(&vf);
        assert_relative_eq!(sf.internal()[0], 3.0, epsilon = 1e-12);
    }
}
