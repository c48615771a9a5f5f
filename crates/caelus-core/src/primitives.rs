//! Value types the rest of the crate is built on:
//! the generic [`VectorSpace`] tuple and its vector and tensor forms,
//! quaternions, and a handful of numeric constants.

pub mod vector_space;
#[doc(inline)]
pub use vector_space::{Cmpt, Form, GenericForm, InnerProduct, OuterProduct, VectorSpace};

mod vector;
#[doc(inline)]
pub use vector::{Vector, VectorForm, VectorOf};

mod tensor;
#[doc(inline)]
pub use tensor::{Tensor, TensorForm, TensorOf};

mod symm_tensor;
#[doc(inline)]
pub use symm_tensor::{SymmTensor, SymmTensorForm, SymmTensorOf};

mod spherical_tensor;
#[doc(inline)]
pub use spherical_tensor::{SphericalTensor, SphericalTensorForm, SphericalTensorOf};

pub mod expand_tensor;

pub mod quaternion;
#[doc(inline)]
pub use quaternion::{Quaternion, RotationSequence};

/// Numerical tolerances shared across the crate.
pub mod constants {
    /// Small relative to unity, used to guard denominators and comparisons.
    pub const SMALL: f64 = 1.0e-15;
    /// Very small, just above the smallest normal `f64`.
    pub const VSMALL: f64 = 1.0e-300;
    /// Square root of [`VSMALL`].
    pub const ROOTVSMALL: f64 = 1.0e-150;
    /// Large relative to unity; marks unset distances.
    pub const GREAT: f64 = 1.0e15;
    /// Very large, just below the largest `f64`.
    pub const VGREAT: f64 = 1.0e300;
}

/// Errors from reading the text form of primitive values.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// An opening or closing parenthesis was missing.
    #[error("expected '{expected}' in {input:?}")]
    MissingDelimiter {
        /// The delimiter that was expected.
        expected: char,
        /// The text being parsed.
        input: String,
    },
    /// The list had the wrong number of entries.
    #[error("expected {expected} components, found {found}")]
    WrongCount {
        /// Number of components the type holds.
        expected: usize,
        /// Number of components read.
        found: usize,
    },
    /// A token could not be read as a number.
    #[error("cannot read {0:?} as a number")]
    InvalidNumber(String),
    /// A leading keyword was not one of the recognized ones.
    #[error("unknown keyword {found:?}, expected one of {expected:?}")]
    UnknownKeyword {
        /// The token read.
        found: String,
        /// The keywords that would have been accepted.
        expected: &'static [&'static str],
    },
}
