use nalgebra as na;

use super::{
    tensor::{Tensor, TensorOf},
    vector_space::{Cmpt, Form, InnerProduct, OuterProduct, VectorSpace},
};

/// Form tag for 3-component vectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VectorForm;
impl Form for VectorForm {
    const NAME: &'static str = "vector";
}

/// A 3-component vector with components of type `C`.
pub type VectorOf<C> = VectorSpace<VectorForm, 3, C>;
/// A 3-component vector of `f64`.
pub type Vector = VectorOf<f64>;

impl<C: Cmpt> VectorOf<C> {
    /// Unit vector along x.
    pub const X: Self = Self::new([C::ONE, C::ZERO, C::ZERO]);
    /// Unit vector along y.
    pub const Y: Self = Self::new([C::ZERO, C::ONE, C::ZERO]);
    /// Unit vector along z.
    pub const Z: Self = Self::new([C::ZERO, C::ZERO, C::ONE]);

    /// Construct from components.
    #[inline]
    pub const fn from_xyz(x: C, y: C, z: C) -> Self {
        Self::new([x, y, z])
    }

    /// The x component.
    #[inline]
    pub fn x(&self) -> C {
        self.v[0]
    }
    /// The y component.
    #[inline]
    pub fn y(&self) -> C {
        self.v[1]
    }
    /// The z component.
    #[inline]
    pub fn z(&self) -> C {
        self.v[2]
    }

    /// Cross product.
    #[inline]
    pub fn cross(&self, o: &Self) -> Self {
        let [a0, a1, a2] = self.v;
        let [b0, b1, b2] = o.v;
        Self::new([a1 * b2 - a2 * b1, a2 * b0 - a0 * b2, a0 * b1 - a1 * b0])
    }
}

impl<C: Cmpt> InnerProduct<VectorOf<C>> for VectorOf<C> {
    type Output = C;
    #[inline]
    fn inner(&self, rhs: &VectorOf<C>) -> C {
        self.dot(rhs)
    }
}

impl<C: Cmpt> InnerProduct<TensorOf<C>> for VectorOf<C> {
    type Output = VectorOf<C>;
    /// `v & T`, i.e. `Tᵀ v`.
    fn inner(&self, t: &TensorOf<C>) -> VectorOf<C> {
        VectorOf::from_fn(|j| (0..3).map(|i| self.v[i] * t.v[3 * i + j]).sum())
    }
}

impl<C: Cmpt> OuterProduct<VectorOf<C>> for VectorOf<C> {
    type Output = TensorOf<C>;
    #[inline]
    fn outer(&self, rhs: &VectorOf<C>) -> TensorOf<C> {
        TensorOf::from_fn(|k| self.v[k / 3] * rhs.v[k % 3])
    }
}

// vector times scalar as an outer product,
// needed for gradients of scalar fields
impl OuterProduct<f64> for Vector {
    type Output = Vector;
    #[inline]
    fn outer(&self, rhs: &f64) -> Vector {
        *self * *rhs
    }
}

impl<C: Cmpt + na::Scalar> From<VectorOf<C>> for na::Vector3<C> {
    #[inline]
    fn from(v: VectorOf<C>) -> Self {
        na::Vector3::new(v.v[0], v.v[1], v.v[2])
    }
}

impl<C: Cmpt + na::Scalar> From<na::Vector3<C>> for VectorOf<C> {
    #[inline]
    fn from(v: na::Vector3<C>) -> Self {
        VectorOf::new([v.x, v.y, v.z])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cross_and_dot() {
        assert_eq!(Vector::X.cross(&Vector::Y), Vector::Z);
        assert_eq!(Vector::Y.cross(&Vector::Z), Vector::X);
        assert_eq!(Vector::Z.cross(&Vector::X), Vector::Y);

        let a = Vector::from_xyz(1.0, 2.0, 3.0);
        let b = Vector::from_xyz(-4.0, 0.5, 2.0);
        let c = a.cross(&b);
        assert_relative_eq!(c.dot(&a), 0.0, epsilon = 1e-12);
        assert_relative_eq!(c.dot(&b), 0.0, epsilon = 1e-12);
        assert_eq!(a.inner(&b), 3.0);
    }

    #[test]
    fn outer_product_and_contraction() {
        let a = Vector::from_xyz(1.0, 2.0, 3.0);
        let b = Vector::from_xyz(4.0, 5.0, 6.0);
        let t = a.outer(&b);
        assert_eq!(t.xy(), 5.0);
        assert_eq!(t.zx(), 12.0);
        // (a b) & b = a |b|^2, b & (a b) = (b.a) b
        assert!(t.inner(&b).equal(&(a * b.mag_sqr()), 1e-12));
        assert!(b.inner(&t).equal(&(b * a.dot(&b)), 1e-12));
    }

    #[test]
    fn nalgebra_interop() {
        let a = Vector::from_xyz(1.0, -2.0, 0.5);
        let n: na::Vector3<f64> = a.into();
        assert_eq!(n, na::Vector3::new(1.0, -2.0, 0.5));
        assert_eq!(Vector::from(n), a);
        let parsed: Vector = "(1 -2 0.5)".parse().unwrap();
        assert_eq!(parsed, a);
    }
}
