use nalgebra as na;
use std::fmt;

use crate::primitives::{
    expand_tensor,
    vector_space::{parse_components, strip_parens},
    Cmpt, InnerProduct, ParseError, TensorOf, VectorOf, VectorSpace,
};

/// A type that can serve as the linear (diagonal) level of a block coefficient,
/// together with the operations a coefficient needs from it
/// and from its square (outer-product) type.
///
/// Implemented for [`VectorOf`] (square type [`TensorOf`])
/// and for `nalgebra` vectors of any fixed size (square type `SMatrix`).
pub trait BlockType: Clone + fmt::Debug + PartialEq {
    /// Component type, also used for the scalar level.
    type Cmpt: Cmpt;
    /// The full-matrix representation.
    type Square: Clone + fmt::Debug + PartialEq;

    /// Number of components.
    const N_COMPONENTS: usize;

    /// All components one.
    fn one() -> Self;
    /// All components zero.
    fn zero() -> Self;
    /// The zero matrix.
    fn square_zero() -> Self::Square;

    /// Component `d`.
    fn component(&self, d: usize) -> Self::Cmpt;
    /// Multiply every component by `s`.
    fn scale(&self, s: Self::Cmpt) -> Self;
    /// Component-wise product.
    fn cmpt_multiply(&self, other: &Self) -> Self;
    /// Component-wise quotient.
    fn cmpt_divide(&self, other: &Self) -> Self;

    /// `s I`.
    fn expand_scalar(s: Self::Cmpt) -> Self::Square;
    /// A diagonal matrix holding `self`.
    fn expand_linear(&self) -> Self::Square;
    /// The diagonal of a matrix.
    fn contract_linear(sq: &Self::Square) -> Self;

    /// Matrix-vector product.
    fn square_apply(sq: &Self::Square, x: &Self) -> Self;
    /// Matrix-matrix product.
    fn square_mul(a: &Self::Square, b: &Self::Square) -> Self::Square;
    /// Matrix times scalar.
    fn square_scale(sq: &Self::Square, s: Self::Cmpt) -> Self::Square;
    /// Matrix inverse. Singular matrices give non-finite entries.
    fn square_inv(sq: &Self::Square) -> Self::Square;
    /// Matrix transpose.
    fn square_transpose(sq: &Self::Square) -> Self::Square;

    /// Write the text form of the linear level.
    fn fmt_linear(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    /// Write the text form of the square level.
    fn fmt_square(sq: &Self::Square, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    /// Read the text form of the linear level.
    fn parse_linear(s: &str) -> Result<Self, ParseError>;
    /// Read the text form of the square level.
    fn parse_square(s: &str) -> Result<Self::Square, ParseError>;
}

impl<C: Cmpt> BlockType for VectorOf<C> {
    type Cmpt = C;
    type Square = TensorOf<C>;

    const N_COMPONENTS: usize = 3;

    fn one() -> Self {
        VectorOf::one()
    }
    fn zero() -> Self {
        VectorOf::zero()
    }
    fn square_zero() -> TensorOf<C> {
        TensorOf::zero()
    }

    fn component(&self, d: usize) -> C {
        self.v[d]
    }
    fn scale(&self, s: C) -> Self {
        *self * s
    }
    fn cmpt_multiply(&self, other: &Self) -> Self {
        VectorSpace::cmpt_multiply(self, other)
    }
    fn cmpt_divide(&self, other: &Self) -> Self {
        VectorSpace::cmpt_divide(self, other)
    }

    fn expand_scalar(s: C) -> TensorOf<C> {
        expand_tensor::expand_scalar(s)
    }
    fn expand_linear(&self) -> TensorOf<C> {
        expand_tensor::expand_linear(self)
    }
    fn contract_linear(sq: &TensorOf<C>) -> Self {
        expand_tensor::contract_linear(sq)
    }

    fn square_apply(sq: &TensorOf<C>, x: &Self) -> Self {
        sq.inner(x)
    }
    fn square_mul(a: &TensorOf<C>, b: &TensorOf<C>) -> TensorOf<C> {
        a.inner(b)
    }
    fn square_scale(sq: &TensorOf<C>, s: C) -> TensorOf<C> {
        *sq * s
    }
    fn square_inv(sq: &TensorOf<C>) -> TensorOf<C> {
        sq.inv()
    }
    fn square_transpose(sq: &TensorOf<C>) -> TensorOf<C> {
        sq.t()
    }

    fn fmt_linear(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
    fn fmt_square(sq: &TensorOf<C>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{sq}")
    }
    fn parse_linear(s: &str) -> Result<Self, ParseError> {
        s.parse()
    }
    fn parse_square(s: &str) -> Result<TensorOf<C>, ParseError> {
        s.parse()
    }
}

impl<const N: usize> BlockType for na::SVector<f64, N> {
    type Cmpt = f64;
    type Square = na::SMatrix<f64, N, N>;

    const N_COMPONENTS: usize = N;

    fn one() -> Self {
        Self::repeat(1.0)
    }
    fn zero() -> Self {
        Self::zeros()
    }
    fn square_zero() -> Self::Square {
        Self::Square::zeros()
    }

    fn component(&self, d: usize) -> f64 {
        self[d]
    }
    fn scale(&self, s: f64) -> Self {
        self * s
    }
    fn cmpt_multiply(&self, other: &Self) -> Self {
        self.component_mul(other)
    }
    fn cmpt_divide(&self, other: &Self) -> Self {
        self.component_div(other)
    }

    fn expand_scalar(s: f64) -> Self::Square {
        Self::Square::identity() * s
    }
    fn expand_linear(&self) -> Self::Square {
        Self::Square::from_diagonal(self)
    }
    fn contract_linear(sq: &Self::Square) -> Self {
        sq.diagonal()
    }

    fn square_apply(sq: &Self::Square, x: &Self) -> Self {
        sq * x
    }
    fn square_mul(a: &Self::Square, b: &Self::Square) -> Self::Square {
        a * b
    }
    fn square_scale(sq: &Self::Square, s: f64) -> Self::Square {
        sq * s
    }
    fn square_inv(sq: &Self::Square) -> Self::Square {
        sq.try_inverse()
            .unwrap_or_else(|| Self::Square::from_element(f64::NAN))
    }
    fn square_transpose(sq: &Self::Square) -> Self::Square {
        sq.transpose()
    }

    fn fmt_linear(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, self.iter().copied())
    }
    fn fmt_square(sq: &Self::Square, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // row by row to match the tensor layout
        write_list(f, (0..N * N).map(|k| sq[(k / N, k % N)]))
    }
    fn parse_linear(s: &str) -> Result<Self, ParseError> {
        let values = parse_exact(s, N)?;
        Ok(Self::from_column_slice(&values))
    }
    fn parse_square(s: &str) -> Result<Self::Square, ParseError> {
        let values = parse_exact(s, N * N)?;
        Ok(Self::Square::from_row_slice(&values))
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: impl Iterator<Item = f64>) -> fmt::Result {
    write!(f, "(")?;
    for (i, v) in values.enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{v}")?;
    }
    write!(f, ")")
}

fn parse_exact(s: &str, expected: usize) -> Result<Vec<f64>, ParseError> {
    let values = parse_components::<f64>(strip_parens(s)?)?;
    if values.len() != expected {
        return Err(ParseError::WrongCount {
            expected,
            found: values.len(),
        });
    }
    Ok(values)
}
