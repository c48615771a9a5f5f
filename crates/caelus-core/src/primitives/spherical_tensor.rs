use super::{
    tensor::TensorOf,
    vector::VectorOf,
    vector_space::{Cmpt, Form, InnerProduct, VectorSpace},
};

/// Form tag for spherical (isotropic) tensors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SphericalTensorForm;
impl Form for SphericalTensorForm {
    const NAME: &'static str = "sphericalTensor";
}

/// An isotropic tensor `ii I`, stored as its single diagonal value.
pub type SphericalTensorOf<C> = VectorSpace<SphericalTensorForm, 1, C>;
/// A spherical tensor of `f64`.
pub type SphericalTensor = SphericalTensorOf<f64>;

impl<C: Cmpt> SphericalTensorOf<C> {
    /// The diagonal value.
    #[inline]
    pub fn ii(&self) -> C {
        self.v[0]
    }

    /// The identity tensor.
    #[inline]
    pub fn identity() -> Self {
        Self::one()
    }

    /// The equivalent full tensor.
    #[inline]
    pub fn to_tensor(&self) -> TensorOf<C> {
        TensorOf::diag_from(&VectorOf::uniform(self.ii()))
    }
}

impl<C: Cmpt> InnerProduct<VectorOf<C>> for SphericalTensorOf<C> {
    type Output = VectorOf<C>;
    #[inline]
    fn inner(&self, v: &VectorOf<C>) -> VectorOf<C> {
        *v * self.ii()
    }
}
