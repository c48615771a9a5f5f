//! Discretization settings: which interpolation and gradient schemes to use
//! for which fields, which results to cache, and wall distance options.
//!
//! Settings are read from JSON, e.g.
//! ```
//! # use caelus_core::config::FvSchemes;
//! let schemes = FvSchemes::from_json_str(r#"{
//!     "interpolation": { "default": "linear", "interpolate(U)": "upwind phi" },
//!     "grad": { "default": "Gauss linear" },
//!     "cache": ["grad(p)"],
//!     "wall_dist": { "patches": ["wall"] }
//! }"#).unwrap();
//! assert_eq!(schemes.interpolation_scheme("U").unwrap(), "upwind phi");
//! assert_eq!(schemes.interpolation_scheme("p").unwrap(), "linear");
//! assert!(schemes.wall_dist.correct_walls);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors from reading settings.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The text wasn't valid JSON for the settings structure.
    #[error("invalid scheme settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from selecting and constructing schemes at runtime.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SchemeError {
    /// No scheme was given for a key and there is no default.
    #[error("no scheme specified for {0:?} and no default")]
    NotSpecified(String),
    /// The scheme name isn't in the table of the value type.
    #[error("unknown {kind} scheme {name:?}, valid schemes are {valid:?}")]
    Unknown {
        /// The family of scheme being selected.
        kind: &'static str,
        /// The name given.
        name: String,
        /// Valid names in sorted order.
        valid: Vec<String>,
    },
    /// A flux-based scheme was given a name that isn't a registered flux field.
    #[error("flux field {0:?} not found in the mesh registry")]
    FluxNotFound(String),
    /// A scheme parameter was missing.
    #[error("scheme {scheme:?} expects a {what}")]
    MissingArgument {
        /// The scheme being constructed.
        scheme: &'static str,
        /// Description of the missing parameter.
        what: &'static str,
    },
    /// A numeric parameter was out of range or unreadable.
    #[error("scheme {scheme:?} coefficient {value:?} {reason}")]
    InvalidCoefficient {
        /// The scheme being constructed.
        scheme: &'static str,
        /// The parameter as given.
        value: String,
        /// What the value should be.
        reason: &'static str,
    },
    /// Tokens were left over after constructing a scheme.
    #[error("unexpected {0:?} after scheme specification")]
    TrailingInput(String),
}

/// Wall distance settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallDistSettings {
    /// Replace the approximate distance of near-wall cells
    /// with an exact nearest-face search.
    pub correct_walls: bool,
    /// Patches to measure distance from.
    /// If empty, all wall patches are used.
    pub patches: Vec<String>,
}

impl Default for WallDistSettings {
    fn default() -> Self {
        Self {
            correct_walls: true,
            patches: Vec::new(),
        }
    }
}

/// Scheme selections and caching settings for a mesh.
///
/// Interpolation keys have the form `interpolate(<field>)`
/// and gradient keys `grad(<field>)`.
/// The key `default` applies to anything not listed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FvSchemes {
    /// Interpolation scheme specifications.
    pub interpolation: BTreeMap<String, String>,
    /// Gradient scheme specifications.
    pub grad: BTreeMap<String, String>,
    /// Names of results to cache in the mesh registry, e.g. `grad(p)`.
    pub cache: Vec<String>,
    /// Wall distance settings.
    pub wall_dist: WallDistSettings,
}

impl FvSchemes {
    /// Read settings from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let schemes: Self = serde_json::from_str(s)?;
        log::debug!(
            "Read schemes: {} interpolation, {} grad, {} cached",
            schemes.interpolation.len(),
            schemes.grad.len(),
            schemes.cache.len()
        );
        Ok(schemes)
    }

    /// The interpolation scheme specification for a field.
    pub fn interpolation_scheme(&self, field_name: &str) -> Result<&str, SchemeError> {
        Self::lookup(&self.interpolation, &format!("interpolate({field_name})"))
    }

    /// The gradient scheme specification for a field.
    pub fn grad_scheme(&self, field_name: &str) -> Result<&str, SchemeError> {
        Self::lookup(&self.grad, &format!("grad({field_name})"))
    }

    fn lookup<'a>(table: &'a BTreeMap<String, String>, key: &str) -> Result<&'a str, SchemeError> {
        table
            .get(key)
            .or_else(|| table.get("default"))
            .map(String::as_str)
            .ok_or_else(|| SchemeError::NotSpecified(key.to_string()))
    }
}

/// Whitespace-separated tokens of a scheme specification like
/// `"cellLimited Gauss linear 1"`, consumed by nested scheme constructors.
#[derive(Clone, Debug)]
pub struct SchemeStream<'a> {
    tokens: Vec<&'a str>,
    front: usize,
}

impl<'a> SchemeStream<'a> {
    /// Split a specification into tokens.
    pub fn new(spec: &'a str) -> Self {
        Self {
            tokens: spec.split_whitespace().collect(),
            front: 0,
        }
    }

    /// Take the next token.
    pub fn next_word(&mut self) -> Option<&'a str> {
        let word = self.tokens.get(self.front).copied()?;
        self.front += 1;
        Some(word)
    }

    /// Look at the next token without taking it.
    pub fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.front).copied()
    }

    /// Take the last token, for trailing parameters
    /// that follow a nested specification of unknown length.
    pub fn take_last(&mut self) -> Option<&'a str> {
        if self.front < self.tokens.len() {
            self.tokens.pop()
        } else {
            None
        }
    }

    /// Whether all tokens have been consumed.
    pub fn is_empty(&self) -> bool {
        self.front >= self.tokens.len()
    }

    /// Error if any tokens are left.
    pub fn finish(&self) -> Result<(), SchemeError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(SchemeError::TrailingInput(
                self.tokens[self.front..].join(" "),
            ))
        }
    }

    /// Read the next token as a number, with errors attributed to `scheme`.
    pub fn read_scalar(&mut self, scheme: &'static str, what: &'static str) -> Result<f64, SchemeError> {
        let word = self
            .next_word()
            .ok_or(SchemeError::MissingArgument { scheme, what })?;
        word.parse().map_err(|_| SchemeError::InvalidCoefficient {
            scheme,
            value: word.to_string(),
            reason: "is not a number",
        })
    }
}
