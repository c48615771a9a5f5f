//! Conversions between scalar, diagonal and full tensor representations,
//! as used when promoting block coefficients.

use super::{tensor::TensorOf, vector::VectorOf, vector_space::Cmpt};

/// `s I`.
#[inline]
pub fn expand_scalar<C: Cmpt>(s: C) -> TensorOf<C> {
    TensorOf::diag_from(&VectorOf::uniform(s))
}

/// A diagonal tensor holding `v`.
#[inline]
pub fn expand_linear<C: Cmpt>(v: &VectorOf<C>) -> TensorOf<C> {
    TensorOf::diag_from(v)
}

/// The diagonal of `t`.
#[inline]
pub fn contract_linear<C: Cmpt>(t: &TensorOf<C>) -> VectorOf<C> {
    t.diag()
}

/// The mean of the diagonal of `t`.
#[inline]
pub fn contract_scalar<C: Cmpt>(t: &TensorOf<C>) -> C {
    t.tr() / C::cast_f64(3.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Vector;

    #[test]
    fn expand_then_contract() {
        let v = Vector::from_xyz(1.0, 2.0, 3.0);
        assert_eq!(contract_linear(&expand_linear(&v)), v);
        assert_eq!(contract_scalar(&expand_scalar(4.0)), 4.0);
        assert_eq!(contract_scalar(&expand_linear(&v)), 2.0);
    }
}
