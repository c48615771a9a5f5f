use nalgebra as na;

use super::{
    vector::VectorOf,
    vector_space::{Cmpt, Form, InnerProduct, VectorSpace},
};

/// Form tag for 3x3 tensors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TensorForm;
impl Form for TensorForm {
    const NAME: &'static str = "tensor";
}

/// A 3x3 tensor with components of type `C`,
/// stored row by row (`xx xy xz yx yy yz zx zy zz`).
pub type TensorOf<C> = VectorSpace<TensorForm, 9, C>;
/// A 3x3 tensor of `f64`.
pub type Tensor = TensorOf<f64>;

macro_rules! accessors {
    ($($name:ident = $idx:expr),* $(,)?) => {
        $(
            #[doc = concat!("The `", stringify!($name), "` component.")]
            #[inline]
            pub fn $name(&self) -> C {
                self.v[$idx]
            }
        )*
    };
}

impl<C: Cmpt> TensorOf<C> {
    accessors!(xx = 0, xy = 1, xz = 2, yx = 3, yy = 4, yz = 5, zx = 6, zy = 7, zz = 8);

    /// Construct from components in row order.
    #[allow(clippy::too_many_arguments)]
    #[inline]
    pub const fn from_cmpts(
        xx: C,
        xy: C,
        xz: C,
        yx: C,
        yy: C,
        yz: C,
        zx: C,
        zy: C,
        zz: C,
    ) -> Self {
        Self::new([xx, xy, xz, yx, yy, yz, zx, zy, zz])
    }

    /// Construct from three row vectors.
    #[inline]
    pub fn from_rows(x: &VectorOf<C>, y: &VectorOf<C>, z: &VectorOf<C>) -> Self {
        Self::from_fn(|k| [x, y, z][k / 3].v[k % 3])
    }

    /// The identity tensor `I`.
    #[inline]
    pub fn identity() -> Self {
        Self::diag_from(&VectorOf::one())
    }

    /// A diagonal tensor with the given diagonal.
    #[inline]
    pub fn diag_from(d: &VectorOf<C>) -> Self {
        let mut t = Self::zero();
        for i in 0..3 {
            t.v[4 * i] = d.v[i];
        }
        t
    }

    /// The x row.
    #[inline]
    pub fn x(&self) -> VectorOf<C> {
        VectorOf::new([self.v[0], self.v[1], self.v[2]])
    }
    /// The y row.
    #[inline]
    pub fn y(&self) -> VectorOf<C> {
        VectorOf::new([self.v[3], self.v[4], self.v[5]])
    }
    /// The z row.
    #[inline]
    pub fn z(&self) -> VectorOf<C> {
        VectorOf::new([self.v[6], self.v[7], self.v[8]])
    }

    /// Entry at row `i`, column `j`.
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> C {
        self.v[3 * i + j]
    }

    /// Transpose.
    #[inline]
    pub fn t(&self) -> Self {
        Self::from_fn(|k| self.v[3 * (k % 3) + k / 3])
    }

    /// The diagonal as a vector.
    #[inline]
    pub fn diag(&self) -> VectorOf<C> {
        VectorOf::new([self.v[0], self.v[4], self.v[8]])
    }

    /// Trace.
    #[inline]
    pub fn tr(&self) -> C {
        self.v[0] + self.v[4] + self.v[8]
    }

    /// Symmetric part.
    #[inline]
    pub fn symm(&self) -> Self {
        (*self + self.t()) * C::cast_f64(0.5)
    }

    /// Skew-symmetric part.
    #[inline]
    pub fn skew(&self) -> Self {
        (*self - self.t()) * C::cast_f64(0.5)
    }

    /// Determinant.
    pub fn det(&self) -> C {
        let [xx, xy, xz, yx, yy, yz, zx, zy, zz] = self.v;
        xx * yy * zz + xy * yz * zx + xz * yx * zy - xx * yz * zy - xy * yx * zz - xz * yy * zx
    }

    /// Cofactor tensor, `det(T) inv(T)ᵀ`.
    fn cof(&self) -> Self {
        let [xx, xy, xz, yx, yy, yz, zx, zy, zz] = self.v;
        Self::new([
            yy * zz - zy * yz,
            zx * yz - yx * zz,
            yx * zy - yy * zx,
            xz * zy - xy * zz,
            xx * zz - xz * zx,
            xy * zx - xx * zy,
            xy * yz - xz * yy,
            yx * xz - xx * yz,
            xx * yy - yx * xy,
        ])
    }

    /// Inverse via cofactors.
    ///
    /// No check is made for singularity;
    /// a singular tensor gives non-finite components.
    #[inline]
    pub fn inv(&self) -> Self {
        self.cof().t() / self.det()
    }

    /// Double inner product `A && B`.
    #[inline]
    pub fn double_inner(&self, other: &Self) -> C {
        self.dot(other)
    }
}

impl<C: Cmpt> InnerProduct<VectorOf<C>> for TensorOf<C> {
    type Output = VectorOf<C>;
    #[inline]
    fn inner(&self, v: &VectorOf<C>) -> VectorOf<C> {
        VectorOf::from_fn(|i| (0..3).map(|j| self.v[3 * i + j] * v.v[j]).sum())
    }
}

impl<C: Cmpt> InnerProduct<TensorOf<C>> for TensorOf<C> {
    type Output = TensorOf<C>;
    #[inline]
    fn inner(&self, o: &TensorOf<C>) -> TensorOf<C> {
        TensorOf::from_fn(|k| {
            let (i, j) = (k / 3, k % 3);
            (0..3).map(|m| self.v[3 * i + m] * o.v[3 * m + j]).sum()
        })
    }
}

impl<C: Cmpt + na::Scalar> From<TensorOf<C>> for na::Matrix3<C> {
    #[inline]
    fn from(t: TensorOf<C>) -> Self {
        na::Matrix3::from_row_slice(&t.v)
    }
}

impl<C: Cmpt + na::Scalar> From<na::Matrix3<C>> for TensorOf<C> {
    #[inline]
    fn from(m: na::Matrix3<C>) -> Self {
        TensorOf::from_fn(|k| m[(k / 3, k % 3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Vector;
    use approx::assert_relative_eq;

    fn sample() -> Tensor {
        Tensor::from_cmpts(2.0, 1.0, 0.5, -1.0, 3.0, 0.0, 0.25, 2.0, 4.0)
    }

    #[test]
    fn transpose_and_parts() {
        let t = sample();
        assert_eq!(t.t().xy(), t.yx());
        assert_eq!(t.t().t(), t);
        assert!((t.symm() + t.skew()).equal(&t, 1e-14));
        assert_eq!(t.tr(), 9.0);
        assert_eq!(t.diag(), Vector::from_xyz(2.0, 3.0, 4.0));
        assert_eq!(t.y(), Vector::from_xyz(-1.0, 3.0, 0.0));
    }

    #[test]
    fn inverse_matches_nalgebra() {
        let t = sample();
        let inv = t.inv();
        assert!(t.inner(&inv).equal(&Tensor::identity(), 1e-12));

        let m: na::Matrix3<f64> = t.into();
        let na_inv = m.try_inverse().expect("sample is invertible");
        assert!(Tensor::from(na_inv).equal(&inv, 1e-12));
        assert_relative_eq!(t.det(), m.determinant(), epsilon = 1e-12);
    }

    #[test]
    fn tensor_vector_products() {
        let t = sample();
        let v = Vector::from_xyz(1.0, -1.0, 2.0);
        let m: na::Matrix3<f64> = t.into();
        let nv: na::Vector3<f64> = v.into();
        assert!(t.inner(&v).equal(&Vector::from(m * nv), 1e-12));
        assert!(v.inner(&t).equal(&Vector::from(m.transpose() * nv), 1e-12));
        assert_relative_eq!(t.double_inner(&Tensor::identity()), t.tr());
    }
}
