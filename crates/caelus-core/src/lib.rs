//! Core numerics of the Caelus finite-volume CFD library:
//! tensor algebra, block matrix coefficients, a polyhedral mesh with fields,
//! face interpolation and gradient schemes, and mesh-wave wall distance.

#![warn(missing_docs)]

pub mod primitives;
#[doc(inline)]
pub use primitives::{
    InnerProduct, OuterProduct, Quaternion, SphericalTensor, SymmTensor, Tensor, Vector,
    VectorSpace,
};

pub mod block_coeff;
#[doc(inline)]
pub use block_coeff::{BlockCoeff, DecoupledBlockCoeff};

pub mod mesh;
#[doc(inline)]
pub use mesh::{FvMesh, Patch, PatchKind};

pub mod field;
#[doc(inline)]
pub use field::{BoundaryCondition, PatchField, SurfaceField, VolField};

pub mod config;
#[doc(inline)]
pub use config::FvSchemes;

pub mod interpolation;
#[doc(inline)]
pub use interpolation::SurfaceInterpolationScheme;

pub mod grad;
#[doc(inline)]
pub use grad::GradScheme;

pub mod fvc;

pub mod wave;
#[doc(inline)]
pub use wave::{MeshWave, WallDist, WallDistData, WallDistReflection};

pub use nalgebra as na;
