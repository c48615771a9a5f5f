use super::{
    tensor::TensorOf,
    vector::VectorOf,
    vector_space::{Cmpt, Form, InnerProduct, VectorSpace},
};

/// Form tag for symmetric 3x3 tensors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymmTensorForm;
impl Form for SymmTensorForm {
    const NAME: &'static str = "symmTensor";
}

/// A symmetric 3x3 tensor stored as its upper triangle
/// (`xx xy xz yy yz zz`).
pub type SymmTensorOf<C> = VectorSpace<SymmTensorForm, 6, C>;
/// A symmetric tensor of `f64`.
pub type SymmTensor = SymmTensorOf<f64>;

impl<C: Cmpt> SymmTensorOf<C> {
    /// Construct from the upper triangle.
    #[inline]
    pub const fn from_cmpts(xx: C, xy: C, xz: C, yy: C, yz: C, zz: C) -> Self {
        Self::new([xx, xy, xz, yy, yz, zz])
    }

    /// The identity tensor.
    #[inline]
    pub fn identity() -> Self {
        Self::from_cmpts(C::ONE, C::ZERO, C::ZERO, C::ONE, C::ZERO, C::ONE)
    }

    /// The symmetric part of a full tensor.
    pub fn from_tensor(t: &TensorOf<C>) -> Self {
        let half = C::cast_f64(0.5);
        Self::from_cmpts(
            t.xx(),
            half * (t.xy() + t.yx()),
            half * (t.xz() + t.zx()),
            t.yy(),
            half * (t.yz() + t.zy()),
            t.zz(),
        )
    }

    /// The equivalent full tensor.
    pub fn to_tensor(&self) -> TensorOf<C> {
        let [xx, xy, xz, yy, yz, zz] = self.v;
        TensorOf::from_cmpts(xx, xy, xz, xy, yy, yz, xz, yz, zz)
    }

    /// Trace.
    #[inline]
    pub fn tr(&self) -> C {
        self.v[0] + self.v[3] + self.v[5]
    }
}

impl<C: Cmpt> InnerProduct<VectorOf<C>> for SymmTensorOf<C> {
    type Output = VectorOf<C>;
    #[inline]
    fn inner(&self, v: &VectorOf<C>) -> VectorOf<C> {
        self.to_tensor().inner(v)
    }
}
