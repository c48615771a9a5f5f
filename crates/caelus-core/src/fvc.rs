//! Explicit finite-volume calculus with schemes chosen by the mesh's settings.

use std::rc::Rc;

use crate::{
    config::SchemeError,
    field::{FieldValue, Gradable, SurfaceField, VolField},
    grad::new_grad_scheme,
    interpolation::new_scheme,
    mesh::FvMesh,
};

/// Interpolate a field onto faces with the scheme set for `interpolate(<name>)`.
pub fn interpolate<T: FieldValue>(mesh: &FvMesh, vf: &VolField<T>) -> Result<SurfaceField<T>, SchemeError> {
    let spec = mesh.schemes().interpolation_scheme(vf.name())?;
    interpolate_with(mesh, vf, spec)
}

/// Interpolate a field onto faces with an explicitly given scheme.
pub fn interpolate_with<T: FieldValue>(
    mesh: &FvMesh,
    vf: &VolField<T>,
    spec: &str,
) -> Result<SurfaceField<T>, SchemeError> {
    Ok(new_scheme::<T>(mesh, spec)?.interpolate(vf))
}

/// The gradient of a field with the scheme set for `grad(<name>)`,
/// cached if the settings ask for it.
pub fn grad<T: Gradable>(mesh: &FvMesh, vf: &VolField<T>) -> Result<Rc<VolField<T::Grad>>, SchemeError> {
    let spec = mesh.schemes().grad_scheme(vf.name())?;
    grad_with(mesh, vf, spec)
}

/// The gradient of a field with an explicitly given scheme.
pub fn grad_with<T: Gradable>(
    mesh: &FvMesh,
    vf: &VolField<T>,
    spec: &str,
) -> Result<Rc<VolField<T::Grad>>, SchemeError> {
    Ok(new_grad_scheme::<T>(mesh, spec)?.grad(vf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::FvSchemes, mesh::line_mesh, primitives::Vector};
    use approx::assert_relative_eq;

    #[test]
    fn schemes_from_settings() {
        let schemes = FvSchemes::from_json_str(
            r#"{
                "interpolation": { "default": "linear", "interpolate(k)": "harmonic" },
                "grad": { "grad(T)": "Gauss linear" },
                "cache": ["grad(T)"]
            }"#,
        )
        .unwrap();
        let mesh = line_mesh(2, 2.0).with_schemes(schemes);

        let k = VolField::zero_gradient(&mesh, "k", vec![1.0, 3.0]);
        assert_relative_eq!(interpolate(&mesh, &k).unwrap().internal()[0], 1.5, epsilon = 1e-12);
        let t = VolField::zero_gradient(&mesh, "T", vec![1.0, 3.0]);
        assert_relative_eq!(interpolate(&mesh, &t).unwrap().internal()[0], 2.0, epsilon = 1e-12);

        let g = grad(&mesh, &t).unwrap();
        assert!(Rc::ptr_eq(&g, &grad(&mesh, &t).unwrap()));
        assert_relative_eq!(g.internal()[0].x(), 1.0, epsilon = 1e-12);

        let u = VolField::uniform(&mesh, "U", Vector::X);
        assert_eq!(
            grad(&mesh, &u).err(),
            Some(SchemeError::NotSpecified("grad(U)".to_string()))
        );
    }
}
