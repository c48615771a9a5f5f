use super::SurfaceInterpolationScheme;
use crate::{
    config::{SchemeError, SchemeStream},
    field::{FieldValue, SurfaceField, VolField},
    mesh::FvMesh,
};

/// Central differencing with the mesh's geometric weights.
#[derive(Clone, Copy, Debug)]
pub struct Linear<'m> {
    mesh: &'m FvMesh,
}

impl<'m> Linear<'m> {
    /// Create the scheme on a mesh.
    pub fn new(mesh: &'m FvMesh) -> Self {
        Self { mesh }
    }
}

impl<T: FieldValue> SurfaceInterpolationScheme<T> for Linear<'_> {
    fn mesh(&self) -> &FvMesh {
        self.mesh
    }

    fn weights(&self, _vf: &VolField<T>) -> SurfaceField<f64> {
        SurfaceField::from_face_values(self.mesh, "weights", self.mesh.weights())
    }
}

pub(super) fn construct<'m, T: FieldValue>(
    mesh: &'m FvMesh,
    _args: &mut SchemeStream<'_>,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError> {
    Ok(Box::new(Linear::new(mesh)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        interpolation::new_scheme,
        mesh::{cuboid_mesh, line_mesh, PatchKind},
        primitives::Vector,
    };
    use approx::assert_relative_eq;

    #[test]
    fn linear_field_on_a_line() {
        let mesh = line_mesh(10, 10.0);
        let vf = VolField::zero_gradient(&mesh, "T", (0..10).map(|i| i as f64).collect());
        let sf = new_scheme::<f64>(&mesh, "linear").unwrap().interpolate(&vf);
        for (i, v) in sf.internal().iter().enumerate() {
            assert_relative_eq!(*v, i as f64 + 0.5, epsilon = 1e-12);
        }
        assert_eq!(sf.patch(0), &[0.0]);
        assert_eq!(sf.patch(1), &[9.0]);
    }

    #[test]
    fn vectors_and_cyclics() {
        let mesh = cuboid_mesh([4, 1, 1], [4.0, 1.0, 1.0])
            .with_patch_kind("left", PatchKind::Cyclic { neighbour_patch: 1 })
            .unwrap();
        let vf = VolField::zero_gradient(
            &mesh,
            "U",
            (0..4).map(|i| Vector::from_xyz(i as f64, 1.0, 0.0)).collect(),
        );
        let sf = Linear::new(&mesh).interpolate(&vf);
        assert_relative_eq!(sf.internal()[0].x(), 0.5, epsilon = 1e-12);
        // halfway between the last and first cells
        assert_relative_eq!(sf.patch(0)[0].x(), 1.5, epsilon = 1e-12);
        assert_relative_eq!(sf.patch(1)[0].x(), 1.5, epsilon = 1e-12);
        assert_relative_eq!(sf.patch(1)[0].y(), 1.0, epsilon = 1e-12);
    }
}
