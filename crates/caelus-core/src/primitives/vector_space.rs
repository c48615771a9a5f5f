//! The generic fixed-size tuple underlying every vector and tensor type.
//!
//! A [`VectorSpace`] is `N` components of a [`Cmpt`] type
//! tagged with a zero-sized `Form` marker,
//! so that e.g. a 9-component tensor and a 9-component generic tuple
//! are distinct types with no runtime cost.
//! Everything here is component-wise;
//! form-specific operations (cross products, transposes, ...)
//! live with the concrete forms.

use std::{
    fmt,
    iter::Sum,
    marker::PhantomData,
    ops::{
        Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign,
    },
    str::FromStr,
};

use num_traits::{ConstOne, ConstZero, Float, FromPrimitive, NumAssign};

use super::{constants::ROOTVSMALL, ParseError};

/// Scalar types usable as components of a [`VectorSpace`].
///
/// Implemented for every float type with compile-time zero and one,
/// which in practice means `f32` and `f64`.
pub trait Cmpt:
    Float
    + FromPrimitive
    + NumAssign
    + ConstZero
    + ConstOne
    + fmt::Debug
    + fmt::Display
    + FromStr
    + Sum
    + 'static
{
    /// Conversion from an `f64` constant, rounding if `Self` is narrower.
    #[inline]
    fn cast_f64(x: f64) -> Self {
        <Self as FromPrimitive>::from_f64(x).unwrap_or_else(Self::nan)
    }

    /// Widening conversion to `f64`.
    #[inline]
    fn widen(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

impl<T> Cmpt for T where
    T: Float
        + FromPrimitive
        + NumAssign
        + ConstZero
        + ConstOne
        + fmt::Debug
        + fmt::Display
        + FromStr
        + Sum
        + 'static
{
}

/// Marker trait for the zero-sized form tags of [`VectorSpace`].
pub trait Form: 'static {
    /// Human-readable name of the form.
    const NAME: &'static str;
}

/// Form tag for tuples with no further structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenericForm;
impl Form for GenericForm {
    const NAME: &'static str = "vectorSpace";
}

/// A fixed-size tuple of `N` components of type `C`,
/// with its role given by the `Form` tag.
pub struct VectorSpace<F, const N: usize, C = f64> {
    pub(crate) v: [C; N],
    _form: PhantomData<F>,
}

/// The inner product `&` between two (possibly different) forms.
pub trait InnerProduct<Rhs> {
    /// Result type of the product.
    type Output;
    /// Compute the inner product.
    fn inner(&self, rhs: &Rhs) -> Self::Output;
}

/// The outer product `*` between two (possibly different) forms.
pub trait OuterProduct<Rhs> {
    /// Result type of the product.
    type Output;
    /// Compute the outer product.
    fn outer(&self, rhs: &Rhs) -> Self::Output;
}

// std trait impls done by hand
// so that the form marker doesn't need to implement them

impl<F, const N: usize, C: Copy> Clone for VectorSpace<F, N, C> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}
impl<F, const N: usize, C: Copy> Copy for VectorSpace<F, N, C> {}

impl<F, const N: usize, C: PartialEq> PartialEq for VectorSpace<F, N, C> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.v == other.v
    }
}

impl<F: Form, const N: usize, C: fmt::Debug> fmt::Debug for VectorSpace<F, N, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", F::NAME, self.v)
    }
}

impl<F, const N: usize, C: Cmpt> Default for VectorSpace<F, N, C> {
    #[inline]
    fn default() -> Self {
        Self::zero()
    }
}

impl<F, const N: usize, C: Cmpt> VectorSpace<F, N, C> {
    /// Number of components.
    pub const N_COMPONENTS: usize = N;

    /// Construct from an array of components.
    #[inline]
    pub const fn new(v: [C; N]) -> Self {
        Self {
            v,
            _form: PhantomData,
        }
    }

    /// All components zero.
    #[inline]
    pub fn zero() -> Self {
        Self::uniform(C::ZERO)
    }

    /// All components one.
    #[inline]
    pub fn one() -> Self {
        Self::uniform(C::ONE)
    }

    /// All components set to the same value.
    #[inline]
    pub fn uniform(s: C) -> Self {
        Self::new([s; N])
    }

    /// Construct by evaluating a function for each component index.
    #[inline]
    pub fn from_fn(f: impl FnMut(usize) -> C) -> Self {
        Self::new(std::array::from_fn(f))
    }

    /// Get the components as an array.
    #[inline]
    pub fn as_array(&self) -> &[C; N] {
        &self.v
    }

    /// Iterate over the components.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = C> + '_ {
        self.v.iter().copied()
    }

    /// Get component `d`.
    ///
    /// Panics if `d >= N`.
    #[inline]
    pub fn component(&self, d: usize) -> C {
        self.v[d]
    }

    /// Set component `d` to `value`.
    ///
    /// Panics if `d >= N`.
    #[inline]
    pub fn replace(&mut self, d: usize, value: C) {
        self.v[d] = value;
    }

    /// Apply a function to every component.
    #[inline]
    pub fn map(&self, mut f: impl FnMut(C) -> C) -> Self {
        Self::from_fn(|i| f(self.v[i]))
    }

    /// Combine two tuples component by component.
    #[inline]
    pub fn zip_map(&self, other: &Self, mut f: impl FnMut(C, C) -> C) -> Self {
        Self::from_fn(|i| f(self.v[i], other.v[i]))
    }

    //
    // norms
    //

    /// Sum of squared components.
    #[inline]
    pub fn mag_sqr(&self) -> C {
        self.iter().map(|c| c * c).sum()
    }

    /// Euclidean norm.
    #[inline]
    pub fn mag(&self) -> C {
        self.mag_sqr().sqrt()
    }

    /// This divided by its magnitude, or zero if the magnitude vanishes.
    pub fn normalised(&self) -> Self {
        let m = self.mag();
        if m.widen() < ROOTVSMALL {
            Self::zero()
        } else {
            *self / m
        }
    }

    /// Full contraction with another tuple of the same form.
    #[inline]
    pub fn dot(&self, other: &Self) -> C {
        self.iter().zip(other.iter()).map(|(a, b)| a * b).sum()
    }

    //
    // component-wise operations
    //

    /// Component-wise product.
    #[inline]
    pub fn cmpt_multiply(&self, other: &Self) -> Self {
        self.zip_map(other, |a, b| a * b)
    }

    /// Component-wise quotient.
    #[inline]
    pub fn cmpt_divide(&self, other: &Self) -> Self {
        self.zip_map(other, |a, b| a / b)
    }

    /// Component-wise power.
    #[inline]
    pub fn cmpt_pow(&self, other: &Self) -> Self {
        self.zip_map(other, |a, b| a.powf(b))
    }

    /// Component-wise square.
    #[inline]
    pub fn cmpt_sqr(&self) -> Self {
        self.map(|a| a * a)
    }

    /// Component-wise absolute value.
    #[inline]
    pub fn cmpt_mag(&self) -> Self {
        self.map(|a| a.abs())
    }

    /// Push every component away from zero by `small`,
    /// keeping its sign (zero counts as positive).
    #[inline]
    pub fn stabilise(&self, small: C) -> Self {
        self.map(|a| if a >= C::ZERO { a + small } else { a - small })
    }

    /// The largest component.
    #[inline]
    pub fn cmpt_max(&self) -> C {
        self.v[self.find_max()]
    }

    /// The smallest component.
    #[inline]
    pub fn cmpt_min(&self) -> C {
        self.v[self.find_min()]
    }

    /// Sum of components.
    #[inline]
    pub fn cmpt_sum(&self) -> C {
        self.iter().sum()
    }

    /// Average of components.
    #[inline]
    pub fn cmpt_av(&self) -> C {
        self.cmpt_sum() / C::cast_f64(N as f64)
    }

    /// Product of components.
    #[inline]
    pub fn cmpt_product(&self) -> C {
        self.iter().fold(C::ONE, |acc, c| acc * c)
    }

    /// Index of the largest component (the first one on ties).
    pub fn find_max(&self) -> usize {
        let mut best = 0;
        for i in 1..N {
            if self.v[i] > self.v[best] {
                best = i;
            }
        }
        best
    }

    /// Index of the smallest component (the first one on ties).
    pub fn find_min(&self) -> usize {
        let mut best = 0;
        for i in 1..N {
            if self.v[i] < self.v[best] {
                best = i;
            }
        }
        best
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(&self, other: &Self) -> Self {
        self.zip_map(other, |a, b| if a > b { a } else { b })
    }

    /// Component-wise minimum.
    #[inline]
    pub fn min(&self, other: &Self) -> Self {
        self.zip_map(other, |a, b| if a < b { a } else { b })
    }

    /// Component-wise min-mod: the smaller-magnitude of the two components
    /// if they share a sign, otherwise zero.
    pub fn min_mod(&self, other: &Self) -> Self {
        self.zip_map(other, |a, b| {
            if a * b < C::ZERO {
                C::ZERO
            } else if a.abs() < b.abs() {
                a
            } else {
                b
            }
        })
    }

    /// Equality within an absolute tolerance on each component.
    pub fn equal(&self, other: &Self, tol: C) -> bool {
        self.iter().zip(other.iter()).all(|(a, b)| (a - b).abs() <= tol)
    }

    /// Comma-separated text form used in object names, e.g. `(1,2,3)`.
    pub fn name(&self) -> String {
        let parts: Vec<String> = self.iter().map(|c| c.to_string()).collect();
        format!("({})", parts.join(","))
    }
}

//
// arithmetic
//

impl<F, const N: usize, C: Cmpt> Neg for VectorSpace<F, N, C> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.map(|a| -a)
    }
}

impl<F, const N: usize, C: Cmpt> Neg for &VectorSpace<F, N, C> {
    type Output = VectorSpace<F, N, C>;
    #[inline]
    fn neg(self) -> Self::Output {
        self.map(|a| -a)
    }
}

// owned and borrowed permutations of the component-wise binary ops
macro_rules! impl_binop {
    ($Trait:ident, $fn:ident, $AssignTrait:ident, $assign_fn:ident, $op:tt) => {
        impl<F, const N: usize, C: Cmpt> $Trait for VectorSpace<F, N, C> {
            type Output = Self;
            #[inline]
            fn $fn(self, rhs: Self) -> Self {
                self.zip_map(&rhs, |a, b| a $op b)
            }
        }
        impl<F, const N: usize, C: Cmpt> $Trait<&VectorSpace<F, N, C>> for VectorSpace<F, N, C> {
            type Output = Self;
            #[inline]
            fn $fn(self, rhs: &Self) -> Self {
                self.zip_map(rhs, |a, b| a $op b)
            }
        }
        impl<F, const N: usize, C: Cmpt> $Trait<VectorSpace<F, N, C>> for &VectorSpace<F, N, C> {
            type Output = VectorSpace<F, N, C>;
            #[inline]
            fn $fn(self, rhs: VectorSpace<F, N, C>) -> Self::Output {
                self.zip_map(&rhs, |a, b| a $op b)
            }
        }
        impl<F, const N: usize, C: Cmpt> $Trait for &VectorSpace<F, N, C> {
            type Output = VectorSpace<F, N, C>;
            #[inline]
            fn $fn(self, rhs: Self) -> Self::Output {
                self.zip_map(rhs, |a, b| a $op b)
            }
        }
        impl<F, const N: usize, C: Cmpt> $AssignTrait for VectorSpace<F, N, C> {
            #[inline]
            fn $assign_fn(&mut self, rhs: Self) {
                for (a, b) in self.v.iter_mut().zip(rhs.v) {
                    *a = *a $op b;
                }
            }
        }
    };
}
impl_binop!(Add, add, AddAssign, add_assign, +);
impl_binop!(Sub, sub, SubAssign, sub_assign, -);

impl<F, const N: usize, C: Cmpt> Mul<C> for VectorSpace<F, N, C> {
    type Output = Self;
    #[inline]
    fn mul(self, s: C) -> Self {
        self.map(|a| a * s)
    }
}

impl<F, const N: usize, C: Cmpt> Mul<C> for &VectorSpace<F, N, C> {
    type Output = VectorSpace<F, N, C>;
    #[inline]
    fn mul(self, s: C) -> Self::Output {
        self.map(|a| a * s)
    }
}

impl<F, const N: usize, C: Cmpt> Div<C> for VectorSpace<F, N, C> {
    type Output = Self;
    #[inline]
    fn div(self, s: C) -> Self {
        self.map(|a| a / s)
    }
}

impl<F, const N: usize, C: Cmpt> Div<C> for &VectorSpace<F, N, C> {
    type Output = VectorSpace<F, N, C>;
    #[inline]
    fn div(self, s: C) -> Self::Output {
        self.map(|a| a / s)
    }
}

impl<F, const N: usize, C: Cmpt> MulAssign<C> for VectorSpace<F, N, C> {
    #[inline]
    fn mul_assign(&mut self, s: C) {
        for a in self.v.iter_mut() {
            *a *= s;
        }
    }
}

impl<F, const N: usize, C: Cmpt> DivAssign<C> for VectorSpace<F, N, C> {
    #[inline]
    fn div_assign(&mut self, s: C) {
        for a in self.v.iter_mut() {
            *a /= s;
        }
    }
}

// scalar on the left can't be generic over the component type
macro_rules! impl_left_scalar_mul {
    ($t:ty) => {
        impl<F, const N: usize> Mul<VectorSpace<F, N, $t>> for $t {
            type Output = VectorSpace<F, N, $t>;
            #[inline]
            fn mul(self, rhs: VectorSpace<F, N, $t>) -> Self::Output {
                rhs * self
            }
        }
        impl<F, const N: usize> Mul<&VectorSpace<F, N, $t>> for $t {
            type Output = VectorSpace<F, N, $t>;
            #[inline]
            fn mul(self, rhs: &VectorSpace<F, N, $t>) -> Self::Output {
                rhs * self
            }
        }
    };
}
impl_left_scalar_mul!(f32);
impl_left_scalar_mul!(f64);

impl<F, const N: usize, C: Cmpt> Sum for VectorSpace<F, N, C> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

impl<F, const N: usize, C> Index<usize> for VectorSpace<F, N, C> {
    type Output = C;
    #[inline]
    fn index(&self, d: usize) -> &C {
        &self.v[d]
    }
}

impl<F, const N: usize, C> IndexMut<usize> for VectorSpace<F, N, C> {
    #[inline]
    fn index_mut(&mut self, d: usize) -> &mut C {
        &mut self.v[d]
    }
}

//
// text form
//

impl<F, const N: usize, C: Cmpt> fmt::Display for VectorSpace<F, N, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.v.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}

impl<F, const N: usize, C: Cmpt> FromStr for VectorSpace<F, N, C> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = strip_parens(s)?;
        let values = parse_components::<C>(inner)?;
        if values.len() != N {
            return Err(ParseError::WrongCount {
                expected: N,
                found: values.len(),
            });
        }
        Ok(Self::from_fn(|i| values[i]))
    }
}

/// Remove one level of enclosing parentheses, ignoring surrounding whitespace.
pub(crate) fn strip_parens(s: &str) -> Result<&str, ParseError> {
    let s = s.trim();
    let s = s.strip_prefix('(').ok_or_else(|| ParseError::MissingDelimiter {
        expected: '(',
        input: s.to_string(),
    })?;
    s.strip_suffix(')')
        .ok_or_else(|| ParseError::MissingDelimiter {
            expected: ')',
            input: s.to_string(),
        })
}

/// Read a whitespace-separated list of numbers.
pub(crate) fn parse_components<C: Cmpt>(s: &str) -> Result<Vec<C>, ParseError> {
    s.split_whitespace()
        .map(|tok| {
            tok.parse::<C>()
                .map_err(|_| ParseError::InvalidNumber(tok.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    type V5 = VectorSpace<GenericForm, 5>;

    fn sample() -> (V5, V5) {
        (
            V5::new([1.0, -2.5, 3.25, 0.0, 7.0]),
            V5::new([-0.5, 4.0, 1.5, 2.0, -3.0]),
        )
    }

    #[test]
    fn single_precision_components() {
        type V3f = VectorSpace<GenericForm, 3, f32>;
        let v = V3f::new([3.0, 0.0, -4.0]);
        assert_eq!(v.mag(), 5.0f32);
        assert_eq!(v.normalised(), V3f::new([0.6, 0.0, -0.8]));
        assert_eq!(V3f::zero().normalised(), V3f::zero());
        assert_eq!(v.cmpt_av(), -1.0f32 / 3.0);
        assert_eq!(v.stabilise(0.5), V3f::new([3.5, 0.5, -4.5]));
        assert_eq!("(1 2.5 -3)".parse::<V3f>().unwrap(), V3f::new([1.0, 2.5, -3.0]));
        assert_eq!(<f32 as Cmpt>::cast_f64(0.1), 0.1f32);
        assert_eq!(0.25f32.widen(), 0.25);
    }

    #[test]
    fn addition_and_subtraction_cancel() {
        let (a, b) = sample();
        let c = a + b - b;
        assert!(c.equal(&a, 1e-12), "got {c:?}");
        let d = &a - &b + &b;
        assert!(d.equal(&a, 1e-12));
    }

    #[test]
    fn magnitude_matches_mag_sqr() {
        let (a, b) = sample();
        for v in [a, b, a - b, V5::zero()] {
            assert_relative_eq!(v.mag() * v.mag(), v.mag_sqr(), epsilon = 1e-12);
        }
        assert_eq!(V5::zero().normalised(), V5::zero());
        assert_relative_eq!(a.normalised().mag(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn component_operations() {
        let (a, b) = sample();
        assert_eq!(
            a.cmpt_multiply(&b),
            V5::new([-0.5, -10.0, 4.875, 0.0, -21.0])
        );
        assert_eq!(a.cmpt_max(), 7.0);
        assert_eq!(a.cmpt_min(), -2.5);
        assert_eq!(a.find_max(), 4);
        assert_eq!(b.find_min(), 4);
        assert_relative_eq!(a.cmpt_sum(), 8.75);
        assert_relative_eq!(a.cmpt_av(), 1.75);
        assert_eq!(b.cmpt_product(), 0.5 * 4.0 * 1.5 * 2.0 * 3.0);
        assert_eq!(a.max(&b), V5::new([1.0, 4.0, 3.25, 2.0, 7.0]));
        assert_eq!(a.min(&b), V5::new([-0.5, -2.5, 1.5, 0.0, -3.0]));
        assert_eq!(a.min_mod(&b), V5::new([0.0, 0.0, 1.5, 0.0, 0.0]));
        assert_eq!(a.cmpt_mag(), V5::new([1.0, 2.5, 3.25, 0.0, 7.0]));

        let s = a.stabilise(0.5);
        assert_eq!(s, V5::new([1.5, -3.0, 3.75, 0.5, 7.5]));

        let p = V5::uniform(2.0).cmpt_pow(&V5::new([0.0, 1.0, 2.0, 3.0, -1.0]));
        assert_eq!(p, V5::new([1.0, 2.0, 4.0, 8.0, 0.5]));
        assert_eq!(
            V5::one().cmpt_divide(&V5::uniform(4.0)),
            V5::uniform(0.25)
        );
    }

    #[test]
    fn scalar_arithmetic() {
        let (a, _) = sample();
        assert_eq!(2.0 * a, a + a);
        assert_eq!(a * 2.0 / 2.0, a);
        let mut m = a;
        m *= 3.0;
        m /= 3.0;
        m += a;
        m -= a;
        assert!(m.equal(&a, 1e-14));
        assert_eq!(-(-a), a);
    }

    #[test]
    fn text_round_trip() {
        let (a, _) = sample();
        let text = a.to_string();
        assert_eq!(text, "(1 -2.5 3.25 0 7)");
        let back: V5 = text.parse().expect("valid text");
        assert_eq!(back, a);
        assert_eq!(a.name(), "(1,-2.5,3.25,0,7)");

        let spaced: V5 = "  ( 1\t-2.5 3.25\n0 7 ) ".parse().unwrap();
        assert_eq!(spaced, a);

        assert!(matches!(
            "(1 2 3)".parse::<V5>(),
            Err(ParseError::WrongCount {
                expected: 5,
                found: 3
            })
        ));
        assert!(matches!(
            "1 2 3 4 5)".parse::<V5>(),
            Err(ParseError::MissingDelimiter { expected: '(', .. })
        ));
        assert!(matches!(
            "(1 2 x 4 5)".parse::<V5>(),
            Err(ParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn single_precision_components_2d() {
        let a = VectorSpace::<GenericForm, 2, f32>::new([3.0, 4.0]);
        assert_eq!(a.mag(), 5.0f32);
        assert_eq!(2.0f32 * a, a + a);
    }
}
