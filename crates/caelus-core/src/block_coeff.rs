//! Coefficients of block-coupled matrices.
//!
//! A [`BlockCoeff`] stores one off-diagonal or diagonal entry
//! of a matrix whose unknowns are vectors rather than scalars.
//! Depending on how strongly the components are coupled,
//! the entry is a scalar, a vector acting on each component separately
//! (the "linear" level), or a full matrix (the "square" level).
//! Storage starts out unallocated and is promoted on demand,
//! strictly in the order scalar → linear → square.
//! Asking for a narrower level than the active one is always an error.

mod block_type;
#[doc(inline)]
pub use block_type::BlockType;

mod decoupled;
#[doc(inline)]
pub use decoupled::DecoupledBlockCoeff;

use std::{fmt, str::FromStr};

use num_traits::{ConstOne, ConstZero};

use crate::primitives::{Cmpt, ParseError};

/// The representation currently held by a coefficient,
/// ordered by promotion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActiveLevel {
    /// Nothing has been stored yet.
    Unallocated,
    /// A single scalar.
    Scalar,
    /// One value per component.
    Linear,
    /// A full matrix.
    Square,
}

impl ActiveLevel {
    /// The keywords used in the text form, in promotion order.
    pub const NAMES: [&'static str; 4] = ["unallocated", "scalar", "linear", "square"];

    /// The keyword used in the text form.
    pub fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }
}

impl fmt::Display for ActiveLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActiveLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unallocated" => Ok(Self::Unallocated),
            "scalar" => Ok(Self::Scalar),
            "linear" => Ok(Self::Linear),
            "square" => Ok(Self::Square),
            other => Err(ParseError::UnknownKeyword {
                found: other.to_string(),
                expected: &Self::NAMES,
            }),
        }
    }
}

/// Misuse of the promotion discipline of a block coefficient.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCoeffError {
    /// A narrower representation than the active one was requested.
    #[error("Detected demotion to {requested} (active type is {active}). Probably an error")]
    Demotion {
        /// The level asked for.
        requested: ActiveLevel,
        /// The level currently held.
        active: ActiveLevel,
    },
    /// A read-only accessor was called for a level that isn't active.
    #[error("Requested {requested} coefficient but the active type is {active}")]
    LevelMismatch {
        /// The level asked for.
        requested: ActiveLevel,
        /// The level currently held.
        active: ActiveLevel,
    },
    /// The operation needs a value but nothing has been stored.
    #[error("Coefficient not allocated")]
    Unallocated,
}

#[derive(Clone, Debug, PartialEq)]
enum Active<T: BlockType> {
    Unallocated,
    Scalar(T::Cmpt),
    Linear(T),
    Square(T::Square),
}

impl<T: BlockType> Active<T> {
    fn level(&self) -> ActiveLevel {
        match self {
            Self::Unallocated => ActiveLevel::Unallocated,
            Self::Scalar(_) => ActiveLevel::Scalar,
            Self::Linear(_) => ActiveLevel::Linear,
            Self::Square(_) => ActiveLevel::Square,
        }
    }
}

/// A block-matrix coefficient holding at most one of
/// a scalar, a linear (per-component) or a square (full matrix) value.
///
/// # Example
/// ```
/// # use caelus_core::{block_coeff::{ActiveLevel, BlockCoeff}, Vector};
/// let mut c = BlockCoeff::<Vector>::new();
/// *c.as_scalar().unwrap() = 2.0;
/// // promotion broadcasts the scalar over the components
/// assert_eq!(*c.as_linear().unwrap(), Vector::uniform(2.0));
/// assert_eq!(c.active_type(), ActiveLevel::Linear);
/// // going back is an error
/// assert!(c.as_scalar().is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BlockCoeff<T: BlockType> {
    active: Active<T>,
}

impl<T: BlockType> Default for BlockCoeff<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: BlockType> BlockCoeff<T> {
    /// Create an unallocated coefficient.
    #[inline]
    pub fn new() -> Self {
        Self {
            active: Active::Unallocated,
        }
    }

    /// Create a coefficient holding a scalar.
    #[inline]
    pub fn from_scalar(s: T::Cmpt) -> Self {
        Self {
            active: Active::Scalar(s),
        }
    }

    /// Create a coefficient holding a linear value.
    #[inline]
    pub fn from_linear(l: T) -> Self {
        Self {
            active: Active::Linear(l),
        }
    }

    /// Create a coefficient holding a full matrix.
    #[inline]
    pub fn from_square(sq: T::Square) -> Self {
        Self {
            active: Active::Square(sq),
        }
    }

    /// The level currently held.
    #[inline]
    pub fn active_type(&self) -> ActiveLevel {
        self.active.level()
    }

    /// Release the stored value, returning to the unallocated state.
    #[inline]
    pub fn clear(&mut self) {
        self.active = Active::Unallocated;
    }

    //
    // read access
    //

    fn mismatch(&self, requested: ActiveLevel) -> BlockCoeffError {
        BlockCoeffError::LevelMismatch {
            requested,
            active: self.active_type(),
        }
    }

    /// The scalar value, if that is the active level.
    pub fn scalar(&self) -> Result<&T::Cmpt, BlockCoeffError> {
        match &self.active {
            Active::Scalar(s) => Ok(s),
            _ => Err(self.mismatch(ActiveLevel::Scalar)),
        }
    }

    /// The linear value, if that is the active level.
    pub fn linear(&self) -> Result<&T, BlockCoeffError> {
        match &self.active {
            Active::Linear(l) => Ok(l),
            _ => Err(self.mismatch(ActiveLevel::Linear)),
        }
    }

    /// The square value, if that is the active level.
    pub fn square(&self) -> Result<&T::Square, BlockCoeffError> {
        match &self.active {
            Active::Square(sq) => Ok(sq),
            _ => Err(self.mismatch(ActiveLevel::Square)),
        }
    }

    //
    // promoting access
    //

    /// Mutable access to the scalar level,
    /// allocating it (as zero) if nothing is stored yet.
    pub fn as_scalar(&mut self) -> Result<&mut T::Cmpt, BlockCoeffError> {
        let active = self.active_type();
        if active == ActiveLevel::Unallocated {
            self.active = Active::Scalar(<T::Cmpt as ConstZero>::ZERO);
        }
        match &mut self.active {
            Active::Scalar(s) => Ok(s),
            _ => Err(BlockCoeffError::Demotion {
                requested: ActiveLevel::Scalar,
                active,
            }),
        }
    }

    /// Mutable access to the linear level,
    /// promoting a scalar `s` to `s * one` if necessary.
    pub fn as_linear(&mut self) -> Result<&mut T, BlockCoeffError> {
        let active = self.active_type();
        let promoted = match &self.active {
            Active::Unallocated => Some(T::zero()),
            Active::Scalar(s) => Some(T::one().scale(*s)),
            Active::Linear(_) | Active::Square(_) => None,
        };
        if let Some(l) = promoted {
            self.active = Active::Linear(l);
        }
        match &mut self.active {
            Active::Linear(l) => Ok(l),
            _ => Err(BlockCoeffError::Demotion {
                requested: ActiveLevel::Linear,
                active,
            }),
        }
    }

    /// Mutable access to the square level,
    /// expanding a scalar or linear value onto the diagonal if necessary.
    pub fn as_square(&mut self) -> Result<&mut T::Square, BlockCoeffError> {
        let promoted = match &self.active {
            Active::Unallocated => Some(T::square_zero()),
            Active::Scalar(s) => Some(T::expand_scalar(*s)),
            Active::Linear(l) => Some(l.expand_linear()),
            Active::Square(_) => None,
        };
        if let Some(sq) = promoted {
            self.active = Active::Square(sq);
        }
        match &mut self.active {
            Active::Square(sq) => Ok(sq),
            // every level promotes to square
            _ => unreachable!("coefficient was just promoted to square"),
        }
    }

    /// A copy of this coefficient promoted to at least `level`.
    fn promoted(&self, level: ActiveLevel) -> Result<Self, BlockCoeffError> {
        let mut out = self.clone();
        match level {
            ActiveLevel::Unallocated => {}
            ActiveLevel::Scalar => {
                out.as_scalar()?;
            }
            ActiveLevel::Linear => {
                out.as_linear()?;
            }
            ActiveLevel::Square => {
                out.as_square()?;
            }
        }
        Ok(out)
    }

    /// The scalar coefficient acting on component `dir`,
    /// contracting a square value to its diagonal.
    pub fn component(&self, dir: usize) -> Result<T::Cmpt, BlockCoeffError> {
        match &self.active {
            Active::Unallocated => Err(BlockCoeffError::Unallocated),
            Active::Scalar(s) => Ok(*s),
            Active::Linear(l) => Ok(l.component(dir)),
            Active::Square(sq) => Ok(T::contract_linear(sq).component(dir)),
        }
    }

    /// Copy the value of `other` into this coefficient,
    /// promoting this one if `other` holds a wider level.
    ///
    /// Fails if `other` holds a narrower level than this,
    /// since that would be a demotion.
    /// Assigning an unallocated coefficient clears this one.
    pub fn assign(&mut self, other: &Self) -> Result<(), BlockCoeffError> {
        match &other.active {
            Active::Unallocated => self.clear(),
            Active::Scalar(s) => *self.as_scalar()? = *s,
            Active::Linear(l) => *self.as_linear()? = l.clone(),
            Active::Square(sq) => *self.as_square()? = sq.clone(),
        }
        Ok(())
    }

    //
    // multiplication
    //

    /// Apply the coefficient to a value: `c x`, `c ∘ x` or `c · x`
    /// depending on the active level. An unallocated coefficient gives zero.
    pub fn multiply(&self, x: &T) -> T {
        match &self.active {
            Active::Unallocated => T::zero(),
            Active::Scalar(s) => x.scale(*s),
            Active::Linear(l) => l.cmpt_multiply(x),
            Active::Square(sq) => T::square_apply(sq, x),
        }
    }

    /// Product of two coefficients at the wider of their two levels.
    pub fn active_type_multiply(&self, other: &Self) -> Result<Self, BlockCoeffError> {
        let level = self.active_type().max(other.active_type());
        let (a, b) = (self.promoted(level)?, other.promoted(level)?);
        let active = match (&a.active, &b.active) {
            (Active::Scalar(a), Active::Scalar(b)) => Active::Scalar(*a * *b),
            (Active::Linear(a), Active::Linear(b)) => Active::Linear(a.cmpt_multiply(b)),
            (Active::Square(a), Active::Square(b)) => Active::Square(T::square_mul(a, b)),
            _ => return Err(BlockCoeffError::Unallocated),
        };
        Ok(Self { active })
    }

    /// The inverse coefficient: `1/s`, `1 ⊘ l` or `inv(sq)`.
    pub fn inverse(&self) -> Result<Self, BlockCoeffError> {
        let active = match &self.active {
            Active::Unallocated => return Err(BlockCoeffError::Unallocated),
            Active::Scalar(s) => Active::Scalar(<T::Cmpt as ConstOne>::ONE / *s),
            Active::Linear(l) => Active::Linear(T::one().cmpt_divide(l)),
            Active::Square(sq) => Active::Square(T::square_inv(sq)),
        };
        Ok(Self { active })
    }

    /// The transposed coefficient.
    /// Only the square level is affected.
    pub fn transpose(&self) -> Self {
        match &self.active {
            Active::Square(sq) => Self::from_square(T::square_transpose(sq)),
            _ => self.clone(),
        }
    }

    /// The triple product `a b⁻¹ c`.
    ///
    /// Each combination of levels has its own closed form;
    /// when `b` is wider than `a` and `c`, those stay at their
    /// (common) level, otherwise all three are brought to the widest level.
    pub fn triple_product(a: &Self, b: &Self, c: &Self) -> Result<Self, BlockCoeffError> {
        use ActiveLevel as L;

        if [a, b, c]
            .iter()
            .any(|x| x.active_type() == L::Unallocated)
        {
            return Err(BlockCoeffError::Unallocated);
        }

        let outer = a.active_type().max(c.active_type());
        let inner = b.active_type();
        let (a, b, c) = if inner > outer {
            (a.promoted(outer)?, b.clone(), c.promoted(outer)?)
        } else {
            (a.promoted(outer)?, b.promoted(outer)?, c.promoted(outer)?)
        };

        let active = match (&a.active, &b.active, &c.active) {
            (Active::Scalar(a), Active::Scalar(b), Active::Scalar(c)) => {
                Active::Scalar(*a * *c / *b)
            }
            (Active::Scalar(a), Active::Linear(b), Active::Scalar(c)) => {
                Active::Linear(T::one().cmpt_divide(b).scale(*a * *c))
            }
            (Active::Linear(a), Active::Linear(b), Active::Linear(c)) => {
                Active::Linear(a.cmpt_multiply(c).cmpt_divide(b))
            }
            (Active::Scalar(a), Active::Square(b), Active::Scalar(c)) => {
                Active::Square(T::square_scale(&T::square_inv(b), *a * *c))
            }
            (Active::Linear(a), Active::Square(b), Active::Linear(c)) => {
                // diag(a) inv(b) diag(c)
                let left = T::square_mul(&a.expand_linear(), &T::square_inv(b));
                Active::Square(T::square_mul(&left, &c.expand_linear()))
            }
            (Active::Square(a), Active::Square(b), Active::Square(c)) => {
                Active::Square(T::square_mul(&T::square_mul(a, &T::square_inv(b)), c))
            }
            _ => unreachable!("triple product operands promoted to a supported combination"),
        };
        Ok(Self { active })
    }
}

//
// text form
//

impl<T: BlockType> fmt::Display for BlockCoeff<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.active_type())?;
        match &self.active {
            Active::Unallocated => Ok(()),
            Active::Scalar(s) => write!(f, "\n{s}"),
            Active::Linear(l) => {
                writeln!(f)?;
                l.fmt_linear(f)
            }
            Active::Square(sq) => {
                writeln!(f)?;
                T::fmt_square(sq, f)
            }
        }
    }
}

/// Split the text form of a coefficient into its level keyword and payload.
pub(crate) fn split_keyword(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim()),
        None => (s, ""),
    }
}

pub(crate) fn parse_cmpt<C: Cmpt>(s: &str) -> Result<C, ParseError> {
    s.parse::<C>()
        .map_err(|_| ParseError::InvalidNumber(s.to_string()))
}

impl<T: BlockType> FromStr for BlockCoeff<T> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (keyword, payload) = split_keyword(s);
        let active = match keyword.parse::<ActiveLevel>()? {
            ActiveLevel::Unallocated => Active::Unallocated,
            ActiveLevel::Scalar => Active::Scalar(parse_cmpt(payload)?),
            ActiveLevel::Linear => Active::Linear(T::parse_linear(payload)?),
            ActiveLevel::Square => Active::Square(T::parse_square(payload)?),
        };
        Ok(Self { active })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{InnerProduct, Tensor, Vector};
    use nalgebra as na;

    type Coeff = BlockCoeff<Vector>;

    #[test]
    fn promotion_sequence() {
        let mut c = Coeff::new();
        assert_eq!(c.active_type(), ActiveLevel::Unallocated);

        *c.as_scalar().unwrap() = 3.0;
        assert_eq!(c.active_type(), ActiveLevel::Scalar);
        assert_eq!(c.scalar(), Ok(&3.0));

        let lin = *c.as_linear().unwrap();
        assert_eq!(c.active_type(), ActiveLevel::Linear);
        assert_eq!(lin, Vector::one() * 3.0);

        let sq = *c.as_square().unwrap();
        assert_eq!(sq, Tensor::identity() * 3.0);

        c.clear();
        assert_eq!(c.active_type(), ActiveLevel::Unallocated);
        assert_eq!(*c.as_linear().unwrap(), Vector::zero());
    }

    #[test]
    fn demotion_is_an_error() {
        let mut c = Coeff::from_linear(Vector::from_xyz(1.0, 2.0, 3.0));
        assert_eq!(
            c.as_scalar(),
            Err(BlockCoeffError::Demotion {
                requested: ActiveLevel::Scalar,
                active: ActiveLevel::Linear,
            })
        );
        // the failed request leaves the value alone
        assert_eq!(c.linear(), Ok(&Vector::from_xyz(1.0, 2.0, 3.0)));

        let mut sq = Coeff::from_square(Tensor::identity());
        assert!(sq.as_linear().is_err());
        assert!(sq.assign(&Coeff::from_scalar(1.0)).is_err());

        assert_eq!(
            c.square(),
            Err(BlockCoeffError::LevelMismatch {
                requested: ActiveLevel::Square,
                active: ActiveLevel::Linear,
            })
        );
        assert!(c.scalar().is_err());
    }

    #[test]
    fn component_contracts_wider_levels() {
        assert_eq!(Coeff::from_scalar(2.0).component(1), Ok(2.0));
        let v = Vector::from_xyz(1.0, 2.0, 3.0);
        assert_eq!(Coeff::from_linear(v).component(2), Ok(3.0));
        let t = Tensor::from_cmpts(1.0, 9.0, 9.0, 9.0, 5.0, 9.0, 9.0, 9.0, 7.0);
        assert_eq!(Coeff::from_square(t).component(1), Ok(5.0));
        assert_eq!(Coeff::new().component(0), Err(BlockCoeffError::Unallocated));
    }

    #[test]
    fn assignment_promotes() {
        let mut c = Coeff::from_scalar(2.0);
        c.assign(&Coeff::from_linear(Vector::from_xyz(1.0, 2.0, 3.0)))
            .unwrap();
        assert_eq!(c.active_type(), ActiveLevel::Linear);
        assert_eq!(c.linear(), Ok(&Vector::from_xyz(1.0, 2.0, 3.0)));
        c.assign(&Coeff::new()).unwrap();
        assert_eq!(c.active_type(), ActiveLevel::Unallocated);
    }

    #[test]
    fn multiplication_by_level() {
        let x = Vector::from_xyz(1.0, -2.0, 0.5);
        assert_eq!(Coeff::new().multiply(&x), Vector::zero());
        assert_eq!(Coeff::from_scalar(2.0).multiply(&x), x * 2.0);
        let l = Vector::from_xyz(2.0, 3.0, 4.0);
        assert_eq!(
            Coeff::from_linear(l).multiply(&x),
            Vector::from_xyz(2.0, -6.0, 2.0)
        );
        let t = Tensor::from_cmpts(0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        assert_eq!(
            Coeff::from_square(t).multiply(&x),
            Vector::from_xyz(-2.0, 1.0, 0.5)
        );

        let prod = Coeff::from_scalar(2.0)
            .active_type_multiply(&Coeff::from_linear(l))
            .unwrap();
        assert_eq!(prod.linear(), Ok(&(l * 2.0)));
        assert!(Coeff::new().active_type_multiply(&Coeff::new()).is_err());
    }

    #[test]
    fn inverse_and_transpose() {
        let l = Vector::from_xyz(2.0, 4.0, 0.5);
        let inv = Coeff::from_linear(l).inverse().unwrap();
        assert_eq!(inv.linear(), Ok(&Vector::from_xyz(0.5, 0.25, 2.0)));
        assert_eq!(
            Coeff::from_scalar(4.0).inverse().unwrap().scalar(),
            Ok(&0.25)
        );

        let t = Tensor::from_cmpts(2.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 3.0);
        let c = Coeff::from_square(t);
        let inv = c.inverse().unwrap();
        let prod = c.active_type_multiply(&inv).unwrap();
        assert!(prod.square().unwrap().equal(&Tensor::identity(), 1e-12));
        assert_eq!(c.transpose().square(), Ok(&t.t()));
        assert_eq!(Coeff::from_scalar(2.0).transpose(), Coeff::from_scalar(2.0));
    }

    #[test]
    fn scalar_triple_product_is_exact() {
        for (a, b, c) in [(3.0, 7.0, 11.0), (0.1, 0.3, 0.7), (-2.5, 1e-3, 4.0)] {
            let tp = Coeff::triple_product(
                &Coeff::from_scalar(a),
                &Coeff::from_scalar(b),
                &Coeff::from_scalar(c),
            )
            .unwrap();
            assert_eq!(tp.scalar(), Ok(&(a * c / b)));
        }
    }

    #[test]
    fn mixed_triple_products_match_full_matrices() {
        let a = Vector::from_xyz(1.0, 2.0, 3.0);
        let c = Vector::from_xyz(-1.0, 0.5, 2.0);
        let b_lin = Vector::from_xyz(2.0, 4.0, 8.0);
        let b_sq = Tensor::from_cmpts(4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0);

        let full = |a: Tensor, b: Tensor, c: Tensor| a.inner(&b.inv()).inner(&c);

        // (scalar, linear, scalar)
        let tp = Coeff::triple_product(
            &Coeff::from_scalar(2.0),
            &Coeff::from_linear(b_lin),
            &Coeff::from_scalar(3.0),
        )
        .unwrap();
        assert!(tp
            .linear()
            .unwrap()
            .equal(&Vector::from_xyz(3.0, 1.5, 0.75), 1e-14));

        // (linear, linear, linear)
        let tp = Coeff::triple_product(
            &Coeff::from_linear(a),
            &Coeff::from_linear(b_lin),
            &Coeff::from_linear(c),
        )
        .unwrap();
        assert!(tp
            .linear()
            .unwrap()
            .equal(&Vector::from_xyz(-0.5, 0.25, 0.75), 1e-14));

        // (scalar, square, scalar)
        let tp = Coeff::triple_product(
            &Coeff::from_scalar(2.0),
            &Coeff::from_square(b_sq),
            &Coeff::from_scalar(3.0),
        )
        .unwrap();
        assert!(tp.square().unwrap().equal(&(b_sq.inv() * 6.0), 1e-12));

        // (linear, square, linear) against the dense product
        let tp = Coeff::triple_product(
            &Coeff::from_linear(a),
            &Coeff::from_square(b_sq),
            &Coeff::from_linear(c),
        )
        .unwrap();
        let expected = full(Tensor::diag_from(&a), b_sq, Tensor::diag_from(&c));
        assert!(tp.square().unwrap().equal(&expected, 1e-12));

        // (square, square, square)
        let a_sq = Tensor::from_cmpts(1.0, 2.0, 0.0, 0.0, 1.0, 0.0, 3.0, 0.0, 1.0);
        let tp = Coeff::triple_product(
            &Coeff::from_square(a_sq),
            &Coeff::from_square(b_sq),
            &Coeff::from_square(a_sq.t()),
        )
        .unwrap();
        assert!(tp
            .square()
            .unwrap()
            .equal(&full(a_sq, b_sq, a_sq.t()), 1e-12));

        // mixed outer levels are promoted
        let tp = Coeff::triple_product(
            &Coeff::from_scalar(2.0),
            &Coeff::from_scalar(4.0),
            &Coeff::from_linear(c),
        )
        .unwrap();
        assert!(tp.linear().unwrap().equal(&(c * 0.5), 1e-14));

        assert_eq!(
            Coeff::triple_product(&Coeff::new(), &Coeff::from_scalar(1.0), &Coeff::new()),
            Err(BlockCoeffError::Unallocated)
        );
    }

    #[test]
    fn text_round_trip() {
        let c = Coeff::from_linear(Vector::from_xyz(1.5, -2.0, 3.0));
        let text = c.to_string();
        assert_eq!(text, "linear\n(1.5 -2 3)");
        let back: Coeff = text.parse().unwrap();
        assert_eq!(back.active_type(), ActiveLevel::Linear);
        assert_eq!(back, c);

        for c in [
            Coeff::new(),
            Coeff::from_scalar(0.25),
            Coeff::from_square(Tensor::identity() * 2.0),
        ] {
            assert_eq!(c.to_string().parse::<Coeff>().unwrap(), c);
        }

        assert!(matches!(
            "diagonal (1 2 3)".parse::<Coeff>(),
            Err(ParseError::UnknownKeyword { .. })
        ));
    }

    #[test]
    fn nalgebra_block_type() {
        type V4 = na::SVector<f64, 4>;
        let mut c = BlockCoeff::<V4>::from_scalar(2.0);
        let sq = *c.as_square().unwrap();
        assert_eq!(sq, na::SMatrix::<f64, 4, 4>::identity() * 2.0);

        let a = BlockCoeff::<V4>::from_linear(V4::new(1.0, 2.0, 3.0, 4.0));
        let b = BlockCoeff::<V4>::from_square(na::SMatrix::<f64, 4, 4>::from_diagonal(
            &V4::new(2.0, 2.0, 2.0, 2.0),
        ));
        let tp = BlockCoeff::triple_product(&a, &b, &a).unwrap();
        let expected = na::SMatrix::<f64, 4, 4>::from_diagonal(&V4::new(0.5, 2.0, 4.5, 8.0));
        assert!((tp.square().unwrap() - expected).norm() < 1e-12);

        let text = a.to_string();
        assert_eq!(text, "linear\n(1 2 3 4)");
        assert_eq!(text.parse::<BlockCoeff<V4>>().unwrap(), a);
    }
}
