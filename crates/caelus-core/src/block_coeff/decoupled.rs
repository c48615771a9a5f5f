use std::{fmt, str::FromStr};

use super::{parse_cmpt, split_keyword, ActiveLevel, BlockCoeffError, BlockType};
use crate::primitives::{Cmpt, ParseError};

const NAMES: [&str; 3] = ["unallocated", "scalar", "linear"];

#[derive(Clone, Debug, PartialEq)]
enum Active<T> {
    Unallocated,
    Scalar(f64),
    Linear(T),
}

/// A block coefficient whose components never couple:
/// it is either a scalar or a per-component (linear) value, never a full matrix.
///
/// The scalar level is always `f64` regardless of the component type of `T`.
#[derive(Clone, Debug, PartialEq)]
pub struct DecoupledBlockCoeff<T: BlockType> {
    active: Active<T>,
}

impl<T: BlockType> Default for DecoupledBlockCoeff<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: BlockType> DecoupledBlockCoeff<T> {
    /// Create an unallocated coefficient.
    #[inline]
    pub fn new() -> Self {
        Self {
            active: Active::Unallocated,
        }
    }

    /// Create a coefficient holding a scalar.
    #[inline]
    pub fn from_scalar(s: f64) -> Self {
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

    /// The level currently held. Never [`ActiveLevel::Square`].
    pub fn active_type(&self) -> ActiveLevel {
        match self.active {
            Active::Unallocated => ActiveLevel::Unallocated,
            Active::Scalar(_) => ActiveLevel::Scalar,
            Active::Linear(_) => ActiveLevel::Linear,
        }
    }

    /// Release the stored value.
    #[inline]
    pub fn clear(&mut self) {
        self.active = Active::Unallocated;
    }

    /// The scalar value, if that is the active level.
    pub fn scalar(&self) -> Result<f64, BlockCoeffError> {
        match self.active {
            Active::Scalar(s) => Ok(s),
            _ => Err(BlockCoeffError::LevelMismatch {
                requested: ActiveLevel::Scalar,
                active: self.active_type(),
            }),
        }
    }

    /// The linear value, if that is the active level.
    pub fn linear(&self) -> Result<&T, BlockCoeffError> {
        match &self.active {
            Active::Linear(l) => Ok(l),
            _ => Err(BlockCoeffError::LevelMismatch {
                requested: ActiveLevel::Linear,
                active: self.active_type(),
            }),
        }
    }

    /// Mutable access to the scalar level, allocating it if necessary.
    pub fn as_scalar(&mut self) -> Result<&mut f64, BlockCoeffError> {
        let active = self.active_type();
        if active == ActiveLevel::Unallocated {
            self.active = Active::Scalar(0.0);
        }
        match &mut self.active {
            Active::Scalar(s) => Ok(s),
            _ => Err(BlockCoeffError::Demotion {
                requested: ActiveLevel::Scalar,
                active,
            }),
        }
    }

    /// Mutable access to the linear level, broadcasting a scalar if necessary.
    pub fn as_linear(&mut self) -> Result<&mut T, BlockCoeffError> {
        let promoted = match self.active {
            Active::Unallocated => Some(T::zero()),
            Active::Scalar(s) => Some(T::one().scale(<T::Cmpt as Cmpt>::cast_f64(s))),
            Active::Linear(_) => None,
        };
        if let Some(l) = promoted {
            self.active = Active::Linear(l);
        }
        match &mut self.active {
            Active::Linear(l) => Ok(l),
            _ => unreachable!("coefficient was just promoted to linear"),
        }
    }

    /// The scalar coefficient acting on component `dir`.
    pub fn component(&self, dir: usize) -> Result<f64, BlockCoeffError> {
        match &self.active {
            Active::Unallocated => Err(BlockCoeffError::Unallocated),
            Active::Scalar(s) => Ok(*s),
            Active::Linear(l) => Ok(l.component(dir).widen()),
        }
    }

    /// Copy the value of `other` into this coefficient, promoting if needed.
    pub fn assign(&mut self, other: &Self) -> Result<(), BlockCoeffError> {
        match &other.active {
            Active::Unallocated => self.clear(),
            Active::Scalar(s) => *self.as_scalar()? = *s,
            Active::Linear(l) => *self.as_linear()? = l.clone(),
        }
        Ok(())
    }

    /// Apply the coefficient to a value.
    pub fn multiply(&self, x: &T) -> T {
        match &self.active {
            Active::Unallocated => T::zero(),
            Active::Scalar(s) => x.scale(<T::Cmpt as Cmpt>::cast_f64(*s)),
            Active::Linear(l) => l.cmpt_multiply(x),
        }
    }

    fn to_linear(&self) -> Result<T, BlockCoeffError> {
        match &self.active {
            Active::Unallocated => Err(BlockCoeffError::Unallocated),
            Active::Scalar(s) => Ok(T::one().scale(<T::Cmpt as Cmpt>::cast_f64(*s))),
            Active::Linear(l) => Ok(l.clone()),
        }
    }

    /// Product of two coefficients at the wider of their levels.
    pub fn active_type_multiply(&self, other: &Self) -> Result<Self, BlockCoeffError> {
        match (&self.active, &other.active) {
            (Active::Unallocated, _) | (_, Active::Unallocated) => {
                Err(BlockCoeffError::Unallocated)
            }
            (Active::Scalar(a), Active::Scalar(b)) => Ok(Self::from_scalar(a * b)),
            _ => Ok(Self::from_linear(
                self.to_linear()?.cmpt_multiply(&other.to_linear()?),
            )),
        }
    }

    /// The inverse coefficient.
    pub fn inverse(&self) -> Result<Self, BlockCoeffError> {
        match &self.active {
            Active::Unallocated => Err(BlockCoeffError::Unallocated),
            Active::Scalar(s) => Ok(Self::from_scalar(1.0 / s)),
            Active::Linear(l) => Ok(Self::from_linear(T::one().cmpt_divide(l))),
        }
    }

    /// The transposed coefficient, which for a decoupled one is itself.
    #[inline]
    pub fn transpose(&self) -> Self {
        self.clone()
    }

    /// The triple product `a b⁻¹ c`.
    pub fn triple_product(a: &Self, b: &Self, c: &Self) -> Result<Self, BlockCoeffError> {
        match (&a.active, &b.active, &c.active) {
            (Active::Unallocated, _, _) | (_, Active::Unallocated, _) | (_, _, Active::Unallocated) => {
                Err(BlockCoeffError::Unallocated)
            }
            (Active::Scalar(a), Active::Scalar(b), Active::Scalar(c)) => {
                Ok(Self::from_scalar(a * c / b))
            }
            (Active::Scalar(a), Active::Linear(b), Active::Scalar(c)) => Ok(Self::from_linear(
                T::one()
                    .cmpt_divide(b)
                    .scale(<T::Cmpt as Cmpt>::cast_f64(a * c)),
            )),
            _ => Ok(Self::from_linear(
                a.to_linear()?
                    .cmpt_multiply(&c.to_linear()?)
                    .cmpt_divide(&b.to_linear()?),
            )),
        }
    }
}

impl<T: BlockType> fmt::Display for DecoupledBlockCoeff<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.active_type())?;
        match &self.active {
            Active::Unallocated => Ok(()),
            Active::Scalar(s) => write!(f, "\n{s}"),
            Active::Linear(l) => {
                writeln!(f)?;
                l.fmt_linear(f)
            }
        }
    }
}

impl<T: BlockType> FromStr for DecoupledBlockCoeff<T> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (keyword, payload) = split_keyword(s);
        let active = match keyword {
            "unallocated" => Active::Unallocated,
            "scalar" => Active::Scalar(parse_cmpt(payload)?),
            "linear" => Active::Linear(T::parse_linear(payload)?),
            other => {
                return Err(ParseError::UnknownKeyword {
                    found: other.to_string(),
                    expected: &NAMES,
                })
            }
        };
        Ok(Self { active })
    }
}
