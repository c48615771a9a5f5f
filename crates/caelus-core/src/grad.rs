//! Cell gradients of volume fields.
//!
//! Gradients are computed by a [`GradScheme`] selected at runtime,
//! and optionally cached in the mesh registry under `grad(<field name>)`
//! so repeated requests for the same unchanged field reuse the result.

use std::{collections::BTreeMap, rc::Rc};

use crate::{
    config::{SchemeError, SchemeStream},
    field::{Gradable, VolField},
    mesh::FvMesh,
};

mod gauss;
pub use gauss::{correct_boundary_conditions, gauss_sum, GaussGrad};

mod corr_gauss;
pub use corr_gauss::CorrGaussGrad;

pub mod cell_limited;
pub use cell_limited::CellLimitedGrad;

/// A method of computing cell gradients.
pub trait GradScheme<T: Gradable> {
    /// The mesh the scheme operates on.
    fn mesh(&self) -> &FvMesh;

    /// Compute the gradient of a field, naming the result `name`.
    fn calc_grad(&self, vf: &VolField<T>, name: &str) -> VolField<T::Grad>;

    /// The gradient of a field, named `grad(<field name>)`.
    fn grad(&self, vf: &VolField<T>) -> Rc<VolField<T::Grad>> {
        self.grad_named(vf, &format!("grad({})", vf.name()))
    }

    /// The gradient of a field under an explicit name.
    ///
    /// If the mesh caches this name, a stored result is reused
    /// unless it is older than `vf`.
    fn grad_named(&self, vf: &VolField<T>, name: &str) -> Rc<VolField<T::Grad>> {
        let registry = self.mesh().registry();
        if !self.mesh().cache(name) {
            if registry.check_out(name) {
                log::debug!("Deleting cached {name}, caching is off");
            }
            return Rc::new(self.calc_grad(vf, name));
        }

        match registry.lookup_object::<VolField<T::Grad>>(name) {
            None => {
                log::debug!("Calculating and caching {name}");
                let grad = Rc::new(self.calc_grad(vf, name));
                registry.store(name, grad.clone());
                grad
            }
            Some(stored) if stored.event_no() < vf.event_no() => {
                log::debug!("Updating {name}");
                let grad = Rc::new(self.calc_grad(vf, name));
                registry.store(name, grad.clone());
                grad
            }
            Some(stored) => {
                log::debug!("Reusing {name}");
                stored
            }
        }
    }
}

/// Function constructing a gradient scheme from the arguments following its name.
pub type GradSchemeConstructor<T> =
    for<'m> fn(&'m FvMesh, &mut SchemeStream<'_>) -> Result<Box<dyn GradScheme<T> + 'm>, SchemeError>;

/// Gradient schemes by name.
pub fn grad_schemes<T: Gradable>() -> BTreeMap<&'static str, GradSchemeConstructor<T>> {
    let mut table = BTreeMap::<&'static str, GradSchemeConstructor<T>>::new();
    table.insert("Gauss", gauss::construct::<T>);
    table.insert("corrGauss", corr_gauss::construct::<T>);
    table.insert("cellLimited", cell_limited::construct_minmod::<T>);
    table.insert(
        "cellLimited<Venkatakrishnan>",
        cell_limited::construct_venkatakrishnan::<T>,
    );
    table
}

/// Construct a gradient scheme from a whole specification string
/// like `"cellLimited Gauss linear 1"`.
pub fn new_grad_scheme<'m, T: Gradable>(
    mesh: &'m FvMesh,
    spec: &str,
) -> Result<Box<dyn GradScheme<T> + 'm>, SchemeError> {
    let mut stream = SchemeStream::new(spec);
    let scheme = new_grad_scheme_from_stream(mesh, &mut stream)?;
    stream.finish()?;
    Ok(scheme)
}

/// Construct a gradient scheme from the front of a token stream.
pub fn new_grad_scheme_from_stream<'m, T: Gradable>(
    mesh: &'m FvMesh,
    stream: &mut SchemeStream<'_>,
) -> Result<Box<dyn GradScheme<T> + 'm>, SchemeError> {
    let name = stream
        .next_word()
        .ok_or_else(|| SchemeError::NotSpecified("grad scheme".to_string()))?;
    let table = grad_schemes::<T>();
    let constructor = table.get(name).ok_or_else(|| SchemeError::Unknown {
        kind: "grad",
        name: name.to_string(),
        valid: table.keys().map(|k| k.to_string()).collect(),
    })?;
    log::debug!("Selecting grad scheme {name}");
    constructor(mesh, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::FvSchemes, mesh::cuboid_mesh, primitives::Vector};

    #[test]
    fn selection() {
        let mesh = cuboid_mesh([2, 2, 2], [1.0, 1.0, 1.0]);
        for spec in [
            "Gauss linear",
            "Gauss",
            "corrGauss linear 3",
            "cellLimited Gauss linear 1",
            "cellLimited<Venkatakrishnan> corrGauss linear 0.5",
        ] {
            assert!(new_grad_scheme::<f64>(&mesh, spec).is_ok(), "{spec}");
        }
        match new_grad_scheme::<Vector>(&mesh, "leastSquares").err() {
            Some(SchemeError::Unknown { kind, valid, .. }) => {
                assert_eq!(kind, "grad");
                assert_eq!(valid[0], "Gauss");
            }
            other => panic!("expected unknown scheme error, got {other:?}"),
        }
        assert!(matches!(
            new_grad_scheme::<f64>(&mesh, "cellLimited Gauss linear 1.5"),
            Err(SchemeError::InvalidCoefficient { .. })
        ));
        assert!(matches!(
            new_grad_scheme::<f64>(&mesh, "Gauss linear 1"),
            Err(SchemeError::TrailingInput(_))
        ));
    }

    #[test]
    fn caching() {
        let schemes = FvSchemes {
            cache: vec!["grad(p)".to_string()],
            ..Default::default()
        };
        let mesh = cuboid_mesh([3, 2, 1], [3.0, 2.0, 1.0]).with_schemes(schemes);
        let scheme = new_grad_scheme::<f64>(&mesh, "Gauss linear").unwrap();

        let mut p = VolField::zero_gradient(&mesh, "p", vec![1.0; 6]);
        let g0 = scheme.grad(&p);
        assert!(mesh.registry().found_object::<VolField<Vector>>("grad(p)"));
        let g1 = scheme.grad(&p);
        assert!(Rc::ptr_eq(&g0, &g1));

        p.internal_mut()[0] = 2.0;
        let g2 = scheme.grad(&p);
        assert!(!Rc::ptr_eq(&g0, &g2));
        assert!(g2.internal()[1].x() != 0.0);

        // uncached names are computed fresh every time
        let t = VolField::zero_gradient(&mesh, "T", vec![1.0; 6]);
        let a = scheme.grad(&t);
        let b = scheme.grad(&t);
        assert!(!Rc::ptr_eq(&a, &b));
        assert!(!mesh.registry().found_object::<VolField<Vector>>("grad(T)"));
    }
}
