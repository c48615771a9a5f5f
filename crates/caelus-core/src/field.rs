//! Geometric fields: values per cell ([`VolField`]) or per face ([`SurfaceField`])
//! of a mesh, with boundary values per patch.
//!
//! Every field carries an event number drawn from a global counter
//! when it is created or mutably accessed,
//! so derived results can tell whether they are older than their source.

use itertools::izip;
use std::{
    fmt::Debug,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    interpolation::{self, SchemeTable},
    mesh::{FvMesh, PatchKind},
    primitives::{InnerProduct, OuterProduct, SphericalTensor, SymmTensor, Tensor, Vector},
};

static EVENT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Take a fresh event number. Numbers increase monotonically over the program.
pub fn next_event_no() -> u64 {
    EVENT_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

/// A value type that can be stored in a field and interpolated.
pub trait FieldValue:
    Copy
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + 'static
{
    /// Number of scalar components.
    const N_CMPTS: usize;

    /// All components zero.
    fn zero() -> Self;
    /// All components one.
    fn one() -> Self;
    /// Component `d` as a scalar.
    fn cmpt(&self, d: usize) -> f64;
    /// Set component `d`.
    fn set_cmpt(&mut self, d: usize, value: f64);
    /// Component-wise maximum.
    fn max_with(&self, other: &Self) -> Self;
    /// Component-wise minimum.
    fn min_with(&self, other: &Self) -> Self;
    /// The scalar that TVD limiters act on:
    /// the value itself for scalars, the squared magnitude otherwise.
    fn limit_value(&self) -> f64;
    /// The interpolation schemes that can be selected by name for this type.
    fn interpolation_schemes() -> SchemeTable<Self>;
}

impl FieldValue for f64 {
    const N_CMPTS: usize = 1;

    #[inline]
    fn zero() -> Self {
        0.0
    }
    #[inline]
    fn one() -> Self {
        1.0
    }
    #[inline]
    fn cmpt(&self, _d: usize) -> f64 {
        *self
    }
    #[inline]
    fn set_cmpt(&mut self, _d: usize, value: f64) {
        *self = value;
    }
    #[inline]
    fn max_with(&self, other: &Self) -> Self {
        f64::max(*self, *other)
    }
    #[inline]
    fn min_with(&self, other: &Self) -> Self {
        f64::min(*self, *other)
    }
    #[inline]
    fn limit_value(&self) -> f64 {
        *self
    }
    fn interpolation_schemes() -> SchemeTable<Self> {
        interpolation::scalar_schemes()
    }
}

macro_rules! impl_field_value {
    ($t:ty, $schemes:expr) => {
        impl FieldValue for $t {
            const N_CMPTS: usize = <$t>::N_COMPONENTS;

            #[inline]
            fn zero() -> Self {
                <$t>::zero()
            }
            #[inline]
            fn one() -> Self {
                <$t>::one()
            }
            #[inline]
            fn cmpt(&self, d: usize) -> f64 {
                self.component(d)
            }
            #[inline]
            fn set_cmpt(&mut self, d: usize, value: f64) {
                self.replace(d, value)
            }
            #[inline]
            fn max_with(&self, other: &Self) -> Self {
                self.max(other)
            }
            #[inline]
            fn min_with(&self, other: &Self) -> Self {
                self.min(other)
            }
            #[inline]
            fn limit_value(&self) -> f64 {
                self.mag_sqr()
            }
            fn interpolation_schemes() -> SchemeTable<Self> {
                $schemes()
            }
        }
    };
}
impl_field_value!(Vector, interpolation::gradable_schemes::<Vector>);
impl_field_value!(SphericalTensor, interpolation::basic_schemes::<SphericalTensor>);
impl_field_value!(SymmTensor, interpolation::basic_schemes::<SymmTensor>);
impl_field_value!(Tensor, interpolation::basic_schemes::<Tensor>);

/// A field value type with a gradient.
pub trait Gradable: FieldValue {
    /// The type of the gradient, one rank higher.
    type Grad: FieldValue;

    /// The outer product `v * value`, e.g. face area times face value.
    fn outer(v: &Vector, value: &Self) -> Self::Grad;
    /// The directional derivative `d & grad`.
    fn dot_grad(d: &Vector, grad: &Self::Grad) -> Self;
    /// Scale a gradient by per-component limiters.
    fn limit_grad(limiter: &Self, grad: &Self::Grad) -> Self::Grad;
}

impl Gradable for f64 {
    type Grad = Vector;

    #[inline]
    fn outer(v: &Vector, value: &f64) -> Vector {
        v.outer(value)
    }
    #[inline]
    fn dot_grad(d: &Vector, grad: &Vector) -> f64 {
        d.dot(grad)
    }
    #[inline]
    fn limit_grad(limiter: &f64, grad: &Vector) -> Vector {
        *grad * *limiter
    }
}

impl Gradable for Vector {
    type Grad = Tensor;

    #[inline]
    fn outer(v: &Vector, value: &Vector) -> Tensor {
        v.outer(value)
    }
    #[inline]
    fn dot_grad(d: &Vector, grad: &Tensor) -> Vector {
        d.inner(grad)
    }
    /// Each value component's derivatives are scaled by that component's limiter.
    fn limit_grad(limiter: &Vector, grad: &Tensor) -> Tensor {
        Tensor::from_rows(
            &limiter.cmpt_multiply(&grad.x()),
            &limiter.cmpt_multiply(&grad.y()),
            &limiter.cmpt_multiply(&grad.z()),
        )
    }
}

//
// volume fields
//

/// How a patch of a [`VolField`] gets its values.
#[derive(Clone, Debug, PartialEq)]
pub enum BoundaryCondition<T> {
    /// Values are given and kept.
    FixedValue,
    /// Values equal the adjacent cell values.
    ZeroGradient,
    /// Values follow from the adjacent cell values and a given normal gradient.
    FixedGradient(Vec<T>),
    /// Values are set by whatever computed the field.
    Calculated,
    /// Values are interpolated from the cells on both sides of a cyclic pair.
    Cyclic,
    /// The patch is not part of the solution domain.
    Empty,
}

/// Boundary values of a [`VolField`] on one patch.
#[derive(Clone, Debug, PartialEq)]
pub struct PatchField<T> {
    /// How the values are updated.
    pub condition: BoundaryCondition<T>,
    /// One value per patch face.
    pub values: Vec<T>,
}

impl<T: FieldValue> PatchField<T> {
    /// Fixed values per face.
    pub fn fixed_value(values: Vec<T>) -> Self {
        Self {
            condition: BoundaryCondition::FixedValue,
            values,
        }
    }

    /// The same fixed value on every face.
    pub fn uniform_fixed_value(size: usize, value: T) -> Self {
        Self::fixed_value(vec![value; size])
    }

    /// Zero normal gradient.
    pub fn zero_gradient(size: usize) -> Self {
        Self {
            condition: BoundaryCondition::ZeroGradient,
            values: vec![T::zero(); size],
        }
    }

    /// A fixed normal gradient per face.
    pub fn fixed_gradient(gradient: Vec<T>) -> Self {
        let size = gradient.len();
        Self {
            condition: BoundaryCondition::FixedGradient(gradient),
            values: vec![T::zero(); size],
        }
    }

    /// Values set from outside.
    pub fn calculated(values: Vec<T>) -> Self {
        Self {
            condition: BoundaryCondition::Calculated,
            values,
        }
    }

    /// Whether the patch is coupled to another part of the mesh.
    #[inline]
    pub fn is_coupled(&self) -> bool {
        matches!(self.condition, BoundaryCondition::Cyclic)
    }

    /// Whether the values are prescribed rather than derived from the interior.
    #[inline]
    pub fn fixes_value(&self) -> bool {
        matches!(self.condition, BoundaryCondition::FixedValue)
    }
}

/// A field with one value per cell and boundary values per patch.
#[derive(Clone, Debug)]
pub struct VolField<T> {
    name: String,
    internal: Vec<T>,
    boundary: Vec<PatchField<T>>,
    event_no: u64,
}

impl<T: FieldValue> VolField<T> {
    /// Create a field from cell values and patch fields,
    /// then evaluate the boundary conditions.
    ///
    /// Cyclic and empty patches always get the matching condition
    /// regardless of what is given for them.
    pub fn new(
        mesh: &FvMesh,
        name: impl Into<String>,
        internal: Vec<T>,
        boundary: Vec<PatchField<T>>,
    ) -> Self {
        assert_eq!(internal.len(), mesh.n_cells(), "one value per cell required");
        assert_eq!(
            boundary.len(),
            mesh.patches().len(),
            "one patch field per patch required"
        );
        let boundary = izip!(mesh.patches(), boundary)
            .map(|(patch, mut pf)| {
                assert_eq!(pf.values.len(), patch.size, "one value per patch face required");
                match patch.kind {
                    PatchKind::Cyclic { .. } => pf.condition = BoundaryCondition::Cyclic,
                    PatchKind::Empty => pf.condition = BoundaryCondition::Empty,
                    _ => {
                        if matches!(pf.condition, BoundaryCondition::Cyclic | BoundaryCondition::Empty) {
                            log::warn!(
                                "{:?} condition on patch {:?} of kind {:?}, using zero gradient",
                                pf.condition,
                                patch.name,
                                patch.kind
                            );
                            pf.condition = BoundaryCondition::ZeroGradient;
                        }
                    }
                }
                pf
            })
            .collect();

        let mut field = Self {
            name: name.into(),
            internal,
            boundary,
            event_no: next_event_no(),
        };
        field.correct_boundary_conditions(mesh);
        field
    }

    /// A field whose boundary values are the adjacent cell values,
    /// marked as calculated.
    pub fn calculated(mesh: &FvMesh, name: impl Into<String>, internal: Vec<T>) -> Self {
        let boundary = (0..mesh.patches().len())
            .map(|p| PatchField::calculated(mesh.face_cells(p).iter().map(|&c| internal[c]).collect()))
            .collect();
        Self::new(mesh, name, internal, boundary)
    }

    /// A field with zero normal gradient on every uncoupled patch.
    pub fn zero_gradient(mesh: &FvMesh, name: impl Into<String>, internal: Vec<T>) -> Self {
        let boundary = mesh
            .patches()
            .iter()
            .map(|p| PatchField::zero_gradient(p.size))
            .collect();
        Self::new(mesh, name, internal, boundary)
    }

    /// The same value everywhere, with calculated boundaries.
    pub fn uniform(mesh: &FvMesh, name: impl Into<String>, value: T) -> Self {
        Self::calculated(mesh, name, vec![value; mesh.n_cells()])
    }

    /// Name of the field.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The event number of the last modification.
    #[inline]
    pub fn event_no(&self) -> u64 {
        self.event_no
    }

    /// Values per cell.
    #[inline]
    pub fn internal(&self) -> &[T] {
        &self.internal
    }

    /// Mutable values per cell. Marks the field as modified.
    pub fn internal_mut(&mut self) -> &mut [T] {
        self.event_no = next_event_no();
        &mut self.internal
    }

    /// Patch fields in patch order.
    #[inline]
    pub fn boundary(&self) -> &[PatchField<T>] {
        &self.boundary
    }

    /// Mutable patch fields. Marks the field as modified.
    pub fn boundary_mut(&mut self) -> &mut [PatchField<T>] {
        self.event_no = next_event_no();
        &mut self.boundary
    }

    /// Boundary values of one patch.
    #[inline]
    pub fn patch_values(&self, patch_id: usize) -> &[T] {
        &self.boundary[patch_id].values
    }

    /// Replace the patch field of one patch and re-evaluate the boundary.
    pub fn set_patch_field(&mut self, mesh: &FvMesh, patch_id: usize, pf: PatchField<T>) {
        let mut boundary = std::mem::take(&mut self.boundary);
        boundary[patch_id] = pf;
        let internal = std::mem::take(&mut self.internal);
        *self = Self::new(mesh, std::mem::take(&mut self.name), internal, boundary);
    }

    /// A new field with every value mapped through `f`.
    /// Uncoupled patches become calculated.
    pub fn map<U: FieldValue>(&self, name: impl Into<String>, f: impl Fn(T) -> U) -> VolField<U> {
        let boundary = self
            .boundary
            .iter()
            .map(|pf| PatchField {
                condition: match pf.condition {
                    BoundaryCondition::Cyclic => BoundaryCondition::Cyclic,
                    BoundaryCondition::Empty => BoundaryCondition::Empty,
                    _ => BoundaryCondition::Calculated,
                },
                values: pf.values.iter().map(|&v| f(v)).collect(),
            })
            .collect();
        VolField {
            name: name.into(),
            internal: self.internal.iter().map(|&v| f(v)).collect(),
            boundary,
            event_no: next_event_no(),
        }
    }

    /// The values of the cells next to a patch.
    pub fn patch_internal_field(&self, mesh: &FvMesh, patch_id: usize) -> Vec<T> {
        mesh.face_cells(patch_id)
            .iter()
            .map(|&c| self.internal[c])
            .collect()
    }

    /// The values on the other side of a patch:
    /// the cells next to the partner patch for a cyclic,
    /// otherwise the boundary values themselves.
    pub fn patch_neighbour_field(&self, mesh: &FvMesh, patch_id: usize) -> Vec<T> {
        match mesh.patch(patch_id).neighbour_patch() {
            Some(nbr) => self.patch_internal_field(mesh, nbr),
            None => self.boundary[patch_id].values.clone(),
        }
    }

    /// Normal gradient at the faces of a patch.
    pub fn sn_grad(&self, mesh: &FvMesh, patch_id: usize) -> Vec<T> {
        let patch = mesh.patch(patch_id);
        let delta_coeffs = &mesh.delta_coeffs()[patch.range()];
        let internal = self.patch_internal_field(mesh, patch_id);
        let pf = &self.boundary[patch_id];
        match &pf.condition {
            BoundaryCondition::FixedGradient(g) => g.clone(),
            BoundaryCondition::ZeroGradient | BoundaryCondition::Empty => {
                vec![T::zero(); patch.size]
            }
            BoundaryCondition::Cyclic => {
                let nbr = self.patch_neighbour_field(mesh, patch_id);
                izip!(delta_coeffs, nbr, internal)
                    .map(|(&dc, n, i)| (n - i) * dc)
                    .collect()
            }
            BoundaryCondition::FixedValue | BoundaryCondition::Calculated => {
                izip!(delta_coeffs, &pf.values, internal)
                    .map(|(&dc, &b, i)| (b - i) * dc)
                    .collect()
            }
        }
    }

    /// Re-evaluate the boundary values that depend on the cell values.
    pub fn correct_boundary_conditions(&mut self, mesh: &FvMesh) {
        for patch_id in 0..self.boundary.len() {
            let internal = self.patch_internal_field(mesh, patch_id);
            let patch = mesh.patch(patch_id);
            let new_values = match &self.boundary[patch_id].condition {
                BoundaryCondition::FixedValue | BoundaryCondition::Calculated => continue,
                BoundaryCondition::ZeroGradient | BoundaryCondition::Empty => internal,
                BoundaryCondition::FixedGradient(g) => {
                    let delta_coeffs = &mesh.delta_coeffs()[patch.range()];
                    izip!(internal, g, delta_coeffs)
                        .map(|(i, &g, &dc)| i + g * (1.0 / dc))
                        .collect()
                }
                BoundaryCondition::Cyclic => {
                    let weights = &mesh.weights()[patch.range()];
                    let nbr = self.patch_neighbour_field(mesh, patch_id);
                    izip!(weights, internal, nbr)
                        .map(|(&w, i, n)| i * w + n * (1.0 - w))
                        .collect()
                }
            };
            self.boundary[patch_id].values = new_values;
        }
        self.event_no = next_event_no();
    }
}

//
// surface fields
//

/// A field with one value per face,
/// stored as internal face values and values per patch.
#[derive(Clone, Debug)]
pub struct SurfaceField<T> {
    name: String,
    internal: Vec<T>,
    boundary: Vec<Vec<T>>,
    event_no: u64,
}

impl<T: FieldValue> SurfaceField<T> {
    /// Create a field from internal face values and values per patch.
    pub fn new(mesh: &FvMesh, name: impl Into<String>, internal: Vec<T>, boundary: Vec<Vec<T>>) -> Self {
        assert_eq!(internal.len(), mesh.n_internal_faces(), "one value per internal face required");
        assert_eq!(boundary.len(), mesh.patches().len(), "one value list per patch required");
        for (patch, values) in izip!(mesh.patches(), &boundary) {
            assert_eq!(values.len(), patch.size, "one value per patch face required");
        }
        Self {
            name: name.into(),
            internal,
            boundary,
            event_no: next_event_no(),
        }
    }

    /// The same value on every face.
    pub fn uniform(mesh: &FvMesh, name: impl Into<String>, value: T) -> Self {
        Self::from_fn(mesh, name, |_| value)
    }

    /// Values given per mesh face index.
    pub fn from_face_values(mesh: &FvMesh, name: impl Into<String>, values: &[T]) -> Self {
        assert_eq!(values.len(), mesh.n_faces(), "one value per face required");
        Self::from_fn(mesh, name, |f| values[f])
    }

    /// Values computed per mesh face index.
    pub fn from_fn(mesh: &FvMesh, name: impl Into<String>, f: impl Fn(usize) -> T) -> Self {
        Self {
            name: name.into(),
            internal: (0..mesh.n_internal_faces()).map(&f).collect(),
            boundary: mesh
                .patches()
                .iter()
                .map(|p| p.range().map(&f).collect())
                .collect(),
            event_no: next_event_no(),
        }
    }

    /// Name of the field.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The event number of the last modification.
    #[inline]
    pub fn event_no(&self) -> u64 {
        self.event_no
    }

    /// Values on internal faces.
    #[inline]
    pub fn internal(&self) -> &[T] {
        &self.internal
    }

    /// Mutable values on internal faces. Marks the field as modified.
    pub fn internal_mut(&mut self) -> &mut [T] {
        self.event_no = next_event_no();
        &mut self.internal
    }

    /// Values per patch.
    #[inline]
    pub fn boundary(&self) -> &[Vec<T>] {
        &self.boundary
    }

    /// Values of one patch.
    #[inline]
    pub fn patch(&self, patch_id: usize) -> &[T] {
        &self.boundary[patch_id]
    }

    /// Mutable values per patch. Marks the field as modified.
    pub fn boundary_mut(&mut self) -> &mut [Vec<T>] {
        self.event_no = next_event_no();
        &mut self.boundary
    }

    /// All values in mesh face order.
    pub fn face_values(&self) -> Vec<T> {
        self.internal
            .iter()
            .chain(self.boundary.iter().flatten())
            .copied()
            .collect()
    }

    /// A new field with every value mapped through `f`.
    pub fn map<U: FieldValue>(&self, name: impl Into<String>, f: impl Fn(T) -> U) -> SurfaceField<U> {
        SurfaceField {
            name: name.into(),
            internal: self.internal.iter().map(|&v| f(v)).collect(),
            boundary: self
                .boundary
                .iter()
                .map(|values| values.iter().map(|&v| f(v)).collect())
                .collect(),
            event_no: next_event_no(),
        }
    }

    /// Rename the field.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<T: FieldValue> AddAssign<&SurfaceField<T>> for SurfaceField<T> {
    fn add_assign(&mut self, rhs: &SurfaceField<T>) {
        for (a, &b) in izip!(self.internal.iter_mut(), &rhs.internal) {
            *a += b;
        }
        for (a, b) in izip!(self.boundary.iter_mut(), &rhs.boundary) {
            for (a, &b) in izip!(a.iter_mut(), b) {
                *a += b;
            }
        }
        self.event_no = next_event_no();
    }
}
