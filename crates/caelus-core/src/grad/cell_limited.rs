//! Gradients limited cell by cell so that values extrapolated to the faces
//! stay within the range of the neighbouring cell values.

use itertools::izip;

use super::{correct_boundary_conditions, new_grad_scheme_from_stream, GradScheme};
use crate::{
    config::{SchemeError, SchemeStream},
    field::{Gradable, VolField},
    mesh::{FvMesh, PatchKind},
    primitives::constants::SMALL,
};

/// A limiter function of the ratio of allowed to extrapolated change.
pub trait GradientLimiter {
    /// Name of the limited scheme.
    const NAME: &'static str;

    /// Limiter value for ratio `r`.
    fn limiter(&self, r: f64) -> f64;
}

/// Clips the gradient at the ratio.
#[derive(Clone, Copy, Debug, Default)]
pub struct MinmodGradientLimiter;

impl GradientLimiter for MinmodGradientLimiter {
    const NAME: &'static str = "cellLimited";

    fn limiter(&self, r: f64) -> f64 {
        r.min(1.0)
    }
}

/// Venkatakrishnan's smooth limiter, which converges better than minmod
/// at the cost of slight overshoots.
#[derive(Clone, Copy, Debug, Default)]
pub struct VenkatakrishnanGradientLimiter;

impl GradientLimiter for VenkatakrishnanGradientLimiter {
    const NAME: &'static str = "cellLimited<Venkatakrishnan>";

    fn limiter(&self, r: f64) -> f64 {
        (r * r + 2.0 * r) / (r * r + r + 2.0)
    }
}

/// A gradient scheme whose results are limited per cell and component.
///
/// The coefficient `k` in [0, 1] relaxes the limit:
/// 1 limits fully and 0 not at all.
pub struct CellLimitedGrad<'m, T: Gradable, L> {
    mesh: &'m FvMesh,
    basic: Box<dyn GradScheme<T> + 'm>,
    k: f64,
    limiter: L,
}

impl<'m, T: Gradable, L: GradientLimiter> CellLimitedGrad<'m, T, L> {
    /// Limit the results of `basic` with coefficient `k`.
    pub fn new(
        mesh: &'m FvMesh,
        basic: Box<dyn GradScheme<T> + 'm>,
        k: f64,
        limiter: L,
    ) -> Result<Self, SchemeError> {
        if !(0.0..=1.0).contains(&k) {
            return Err(SchemeError::InvalidCoefficient {
                scheme: L::NAME,
                value: k.to_string(),
                reason: "should be >= 0 and <= 1",
            });
        }
        Ok(Self {
            mesh,
            basic,
            k,
            limiter,
        })
    }

    fn limit_face(&self, limiter: &mut T, max_delta: &T, min_delta: &T, extrapolate: &T) {
        for d in 0..T::N_CMPTS {
            let mut lim = limiter.cmpt(d);
            self.limit_face_cmpt(&mut lim, max_delta.cmpt(d), min_delta.cmpt(d), extrapolate.cmpt(d));
            limiter.set_cmpt(d, lim);
        }
    }

    fn limit_face_cmpt(&self, limiter: &mut f64, max_delta: f64, min_delta: f64, extrapolate: f64) {
        let r = if extrapolate > SMALL {
            max_delta / extrapolate
        } else if extrapolate < -SMALL {
            min_delta / extrapolate
        } else {
            return;
        };
        *limiter = limiter.min(self.limiter.limiter(r));
    }
}

impl<T: Gradable, L: GradientLimiter> GradScheme<T> for CellLimitedGrad<'_, T, L> {
    fn mesh(&self) -> &FvMesh {
        self.mesh
    }

    fn calc_grad(&self, vf: &VolField<T>, name: &str) -> VolField<T::Grad> {
        let grad = self.basic.calc_grad(vf, name);
        if self.k < SMALL {
            return grad;
        }

        let mesh = self.mesh;
        let (c, cf) = (mesh.C(), mesh.Cf());
        let vsf = vf.internal();

        let mut max_vsf = vsf.to_vec();
        let mut min_vsf = vsf.to_vec();
        for (&own, &nei) in izip!(mesh.owner(), mesh.neighbour()) {
            let (v_own, v_nei) = (vsf[own], vsf[nei]);
            max_vsf[own] = max_vsf[own].max_with(&v_nei);
            min_vsf[own] = min_vsf[own].min_with(&v_nei);
            max_vsf[nei] = max_vsf[nei].max_with(&v_own);
            min_vsf[nei] = min_vsf[nei].min_with(&v_own);
        }
        for (patch_id, patch) in mesh.patches().iter().enumerate() {
            if patch.kind == PatchKind::Empty {
                continue;
            }
            let values = if patch.is_coupled() {
                vf.patch_neighbour_field(mesh, patch_id)
            } else {
                vf.patch_values(patch_id).to_vec()
            };
            for (&cell, v) in izip!(mesh.face_cells(patch_id), &values) {
                max_vsf[cell] = max_vsf[cell].max_with(v);
                min_vsf[cell] = min_vsf[cell].min_with(v);
            }
        }

        for (max, min, &v) in izip!(max_vsf.iter_mut(), min_vsf.iter_mut(), vsf) {
            *max -= v;
            *min -= v;
        }

        if self.k < 1.0 {
            let widen = 1.0 / self.k - 1.0;
            for (max, min) in izip!(max_vsf.iter_mut(), min_vsf.iter_mut()) {
                let max_min = (*max - *min) * widen;
                *max += max_min;
                *min -= max_min;
            }
        }

        let gi = grad.internal();
        let mut limiter = vec![T::one(); mesh.n_cells()];
        for (face, &own, &nei) in izip!(0.., mesh.owner(), mesh.neighbour()) {
            for cell in [own, nei] {
                let extrapolate = T::dot_grad(&(cf[face] - c[cell]), &gi[cell]);
                self.limit_face(&mut limiter[cell], &max_vsf[cell], &min_vsf[cell], &extrapolate);
            }
        }
        for (patch_id, patch) in mesh.patches().iter().enumerate() {
            if patch.kind == PatchKind::Empty {
                continue;
            }
            for (face, &cell) in izip!(patch.range(), mesh.face_cells(patch_id)) {
                let extrapolate = T::dot_grad(&(cf[face] - c[cell]), &gi[cell]);
                self.limit_face(&mut limiter[cell], &max_vsf[cell], &min_vsf[cell], &extrapolate);
            }
        }

        if log::log_enabled!(log::Level::Debug) {
            let n_limited = limiter.iter().filter(|l| **l != T::one()).count();
            log::debug!("{}: limited {n_limited} of {} cells of {name}", L::NAME, mesh.n_cells());
        }

        let limited = izip!(&limiter, gi)
            .map(|(l, g)| T::limit_grad(l, g))
            .collect();
        // boundary values are re-extrapolated from the limited cell values
        let mut limited = VolField::calculated(mesh, name, limited);
        correct_boundary_conditions(mesh, vf, &mut limited);
        limited
    }
}

fn construct_with<'m, T: Gradable, L: GradientLimiter + 'm>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
    limiter: L,
) -> Result<Box<dyn GradScheme<T> + 'm>, SchemeError> {
    // the coefficient follows a nested specification of any length
    let k_word = args.take_last().ok_or(SchemeError::MissingArgument {
        scheme: L::NAME,
        what: "limiter coefficient k",
    })?;
    let k: f64 = k_word.parse().map_err(|_| SchemeError::InvalidCoefficient {
        scheme: L::NAME,
        value: k_word.to_string(),
        reason: "is not a number",
    })?;
    let basic = new_grad_scheme_from_stream(mesh, args)?;
    Ok(Box::new(CellLimitedGrad::new(mesh, basic, k, limiter)?))
}

pub(super) fn construct_minmod<'m, T: Gradable>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
) -> Result<Box<dyn GradScheme<T> + 'm>, SchemeError> {
    construct_with(mesh, args, MinmodGradientLimiter)
}

pub(super) fn construct_venkatakrishnan<'m, T: Gradable>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
) -> Result<Box<dyn GradScheme<T> + 'm>, SchemeError> {
    construct_with(mesh, args, VenkatakrishnanGradientLimiter)
}
