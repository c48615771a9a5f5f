//! Interpolation of cell values onto faces.
//!
//! A scheme supplies per-face weights `w` such that the face value is
//! `w * owner + (1 - w) * neighbour`, and optionally an explicit correction
//! added on top. Schemes are selected at runtime by name from a table
//! of constructors that depends on the value type, e.g.
//! ```
//! # use caelus_core::{interpolation, mesh::line_mesh, VolField};
//! let mesh = line_mesh(10, 10.0);
//! let scheme = interpolation::new_scheme::<f64>(&mesh, "linear").unwrap();
//! let vf = VolField::zero_gradient(&mesh, "T", (0..10).map(|i| i as f64).collect());
//! let sf = scheme.interpolate(&vf);
//! assert_eq!(sf.internal()[0], 0.5);
//! ```

use itertools::izip;
use std::{collections::BTreeMap, rc::Rc};

use crate::{
    config::{SchemeError, SchemeStream},
    field::{FieldValue, Gradable, SurfaceField, VolField},
    mesh::FvMesh,
};

mod linear;
pub use linear::Linear;

mod reverse_linear;
pub use reverse_linear::ReverseLinear;

mod harmonic;
pub use harmonic::Harmonic;

mod upwind;
pub use upwind::Upwind;

mod linear_upwind;
pub use linear_upwind::LinearUpwind;

pub mod limited;
pub use limited::LimitedScheme;

/// Function constructing a scheme from the arguments following its name.
pub type SchemeConstructor<T> = for<'m> fn(
    &'m FvMesh,
    &mut SchemeStream<'_>,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError>;

/// Constructors by scheme name, sorted so error messages list names in order.
pub type SchemeTable<T> = BTreeMap<&'static str, SchemeConstructor<T>>;

/// A method of interpolating a [`VolField`] onto faces.
pub trait SurfaceInterpolationScheme<T: FieldValue> {
    /// The mesh the scheme operates on.
    fn mesh(&self) -> &FvMesh;

    /// Owner-side weights per face.
    fn weights(&self, vf: &VolField<T>) -> SurfaceField<f64>;

    /// Whether [`correction`][Self::correction] gives anything.
    fn corrected(&self) -> bool {
        false
    }

    /// Explicit correction added to the weighted interpolate.
    fn correction(&self, _vf: &VolField<T>) -> Option<SurfaceField<T>> {
        None
    }

    /// Interpolate a field onto faces using the scheme's weights
    /// and correction.
    fn interpolate(&self, vf: &VolField<T>) -> SurfaceField<T> {
        let weights = self.weights(vf);
        let mut sf = interpolate_with_weights(self.mesh(), vf, &weights);
        if self.corrected() {
            if let Some(corr) = self.correction(vf) {
                sf += &corr;
            }
        }
        sf
    }
}

/// Interpolate with given owner-side weights.
///
/// Uncoupled patches take the boundary values of the field,
/// coupled ones are weighted between the cells on either side.
pub fn interpolate_with_weights<T: FieldValue>(
    mesh: &FvMesh,
    vf: &VolField<T>,
    weights: &SurfaceField<f64>,
) -> SurfaceField<T> {
    let vi = vf.internal();
    let internal = izip!(mesh.owner(), mesh.neighbour(), weights.internal())
        .map(|(&own, &nei, &w)| vi[own] * w + vi[nei] * (1.0 - w))
        .collect();

    let boundary = (0..mesh.patches().len())
        .map(|patch_id| {
            if vf.boundary()[patch_id].is_coupled() {
                let pi = vf.patch_internal_field(mesh, patch_id);
                let pn = vf.patch_neighbour_field(mesh, patch_id);
                izip!(weights.patch(patch_id), pi, pn)
                    .map(|(&w, i, n)| i * w + n * (1.0 - w))
                    .collect()
            } else {
                vf.patch_values(patch_id).to_vec()
            }
        })
        .collect();

    SurfaceField::new(mesh, format!("interpolate({})", vf.name()), internal, boundary)
}

/// Interpolate with separate owner and neighbour weights,
/// `lambda * owner + y * neighbour`.
pub fn interpolate_with_weights_and_ys<T: FieldValue>(
    mesh: &FvMesh,
    vf: &VolField<T>,
    lambdas: &SurfaceField<f64>,
    ys: &SurfaceField<f64>,
) -> SurfaceField<T> {
    let vi = vf.internal();
    let internal = izip!(mesh.owner(), mesh.neighbour(), lambdas.internal(), ys.internal())
        .map(|(&own, &nei, &l, &y)| vi[own] * l + vi[nei] * y)
        .collect();

    let boundary = (0..mesh.patches().len())
        .map(|patch_id| {
            if vf.boundary()[patch_id].is_coupled() {
                let pi = vf.patch_internal_field(mesh, patch_id);
                let pn = vf.patch_neighbour_field(mesh, patch_id);
                izip!(lambdas.patch(patch_id), ys.patch(patch_id), pi, pn)
                    .map(|(&l, &y, i, n)| i * l + n * y)
                    .collect()
            } else {
                vf.patch_values(patch_id).to_vec()
            }
        })
        .collect();

    SurfaceField::new(mesh, format!("interpolate({})", vf.name()), internal, boundary)
}

//
// runtime selection
//

/// Construct a scheme from a whole specification string like `"upwind phi"`.
/// Every token must be used.
pub fn new_scheme<'m, T: FieldValue>(
    mesh: &'m FvMesh,
    spec: &str,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError> {
    let mut stream = SchemeStream::new(spec);
    let scheme = new_scheme_from_stream(mesh, &mut stream)?;
    stream.finish()?;
    Ok(scheme)
}

/// Construct a scheme from the front of a token stream,
/// leaving any tokens it doesn't need.
pub fn new_scheme_from_stream<'m, T: FieldValue>(
    mesh: &'m FvMesh,
    stream: &mut SchemeStream<'_>,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError> {
    let name = stream
        .next_word()
        .ok_or_else(|| SchemeError::NotSpecified("interpolation scheme".to_string()))?;
    let table = T::interpolation_schemes();
    let constructor = table.get(name).ok_or_else(|| SchemeError::Unknown {
        kind: "interpolation",
        name: name.to_string(),
        valid: table.keys().map(|k| k.to_string()).collect(),
    })?;
    log::debug!("Selecting interpolation scheme {name}");
    constructor(mesh, stream)
}

/// Schemes available for every value type.
pub(crate) fn basic_schemes<T: FieldValue>() -> SchemeTable<T> {
    let mut table = SchemeTable::<T>::new();
    table.insert("linear", linear::construct::<T>);
    table.insert("reverseLinear", reverse_linear::construct::<T>);
    table.insert("upwind", upwind::construct::<T>);
    table.insert("vanLeer", limited::construct_van_leer::<T>);
    table.insert("Minmod", limited::construct_minmod::<T>);
    table.insert("SuperBee", limited::construct_super_bee::<T>);
    table.insert("MUSCL", limited::construct_muscl::<T>);
    table.insert("limitedLinear", limited::construct_limited_linear::<T>);
    table
}

/// Schemes for value types that have a gradient.
pub(crate) fn gradable_schemes<T: Gradable>() -> SchemeTable<T> {
    let mut table = basic_schemes::<T>();
    table.insert("linearUpwind", linear_upwind::construct::<T>);
    table
}

/// Schemes for scalars.
pub(crate) fn scalar_schemes() -> SchemeTable<f64> {
    let mut table = gradable_schemes::<f64>();
    table.insert("harmonic", harmonic::construct);
    table
}

/// Read a flux field name and look it up in the mesh registry.
pub(crate) fn lookup_flux(
    mesh: &FvMesh,
    stream: &mut SchemeStream<'_>,
    scheme: &'static str,
) -> Result<Rc<SurfaceField<f64>>, SchemeError> {
    let name = stream.next_word().ok_or(SchemeError::MissingArgument {
        scheme,
        what: "flux field name",
    })?;
    mesh.registry()
        .lookup_object::<SurfaceField<f64>>(name)
        .ok_or_else(|| SchemeError::FluxNotFound(name.to_string()))
}

/// 1 where the flux leaves the owner (or is zero), 0 otherwise.
#[inline]
pub(crate) fn pos(x: f64) -> f64 {
    if x >= 0.0 {
        1.0
    } else {
        0.0
    }
}
