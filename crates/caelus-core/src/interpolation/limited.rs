//! TVD-limited schemes blending central differencing and upwind
//! by a limiter of the ratio of successive gradients.
//!
//! The face weight is `pos(flux) + psi * (cdW - pos(flux))`,
//! so `psi = 1` recovers linear and `psi = 0` upwind.
//! Non-scalar fields are limited on the square magnitude of their values.

use itertools::izip;

use super::{pos, SurfaceInterpolationScheme, Upwind};
use crate::{
    config::{SchemeError, SchemeStream},
    field::{FieldValue, Gradable, SurfaceField, VolField},
    grad::{GaussGrad, GradScheme},
    mesh::FvMesh,
    primitives::{constants::SMALL, Vector},
};

/// A limiter function of the gradient ratio `r`.
pub trait Limiter {
    /// Name the scheme is selected by.
    const NAME: &'static str;

    /// The limiter value for a gradient ratio.
    fn limit(&self, r: f64) -> f64;

    /// The limiter for a face given the cell values on both sides,
    /// their gradients and the owner-to-neighbour distance.
    #[allow(clippy::too_many_arguments)]
    fn limiter(
        &self,
        _cd_weight: f64,
        face_flux: f64,
        phi_p: f64,
        phi_n: f64,
        grad_p: &Vector,
        grad_n: &Vector,
        d: &Vector,
    ) -> f64 {
        self.limit(gradient_ratio(face_flux, phi_p, phi_n, grad_p, grad_n, d))
    }
}

/// The ratio of the upwind-extrapolated gradient to the face gradient,
/// `r = 2 (d · grad_upwind) / (phi_n - phi_p) - 1`,
/// with the ratio clipped at 1000 when the face gradient vanishes.
pub fn gradient_ratio(
    face_flux: f64,
    phi_p: f64,
    phi_n: f64,
    grad_p: &Vector,
    grad_n: &Vector,
    d: &Vector,
) -> f64 {
    let grad_f = phi_n - phi_p;
    let grad_cf = if face_flux > 0.0 {
        d.dot(grad_p)
    } else {
        d.dot(grad_n)
    };

    if grad_cf.abs() >= 1000.0 * grad_f.abs() {
        2.0 * 1000.0 * sign(grad_cf) * sign(grad_f) - 1.0
    } else {
        2.0 * (grad_cf / grad_f) - 1.0
    }
}

/// Sign with zero counted as positive.
#[inline]
fn sign(x: f64) -> f64 {
    if x >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// van Leer's smooth limiter.
#[derive(Clone, Copy, Debug, Default)]
pub struct VanLeer;

impl Limiter for VanLeer {
    const NAME: &'static str = "vanLeer";

    fn limit(&self, r: f64) -> f64 {
        (r + r.abs()) / (1.0 + r.abs())
    }
}

/// The most diffusive TVD limiter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Minmod;

impl Limiter for Minmod {
    const NAME: &'static str = "Minmod";

    fn limit(&self, r: f64) -> f64 {
        r.min(1.0).min(2.0).max(0.0)
    }
}

/// Roe's superbee, the least diffusive TVD limiter.
#[derive(Clone, Copy, Debug, Default)]
pub struct SuperBee;

impl Limiter for SuperBee {
    const NAME: &'static str = "SuperBee";

    fn limit(&self, r: f64) -> f64 {
        (2.0 * r).min(1.0).max(r.min(2.0)).max(0.0)
    }
}

/// van Leer's monotonic upstream-centred limiter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Muscl;

impl Limiter for Muscl {
    const NAME: &'static str = "MUSCL";

    fn limit(&self, r: f64) -> f64 {
        (2.0 * r).min(0.5 * r + 0.5).min(2.0).max(0.0)
    }
}

/// Linear with a sharp switch to upwind where the ratio falls below `k / 2`.
#[derive(Clone, Copy, Debug)]
pub struct LimitedLinear {
    two_by_k: f64,
}

impl LimitedLinear {
    /// Create the limiter with coefficient `k` in [0, 1].
    pub fn new(k: f64) -> Result<Self, SchemeError> {
        if !(0.0..=1.0).contains(&k) {
            return Err(SchemeError::InvalidCoefficient {
                scheme: Self::NAME,
                value: k.to_string(),
                reason: "should be >= 0 and <= 1",
            });
        }
        Ok(Self {
            two_by_k: 2.0 / k.max(SMALL),
        })
    }
}

impl Limiter for LimitedLinear {
    const NAME: &'static str = "limitedLinear";

    fn limit(&self, r: f64) -> f64 {
        (self.two_by_k * r).min(1.0).max(0.0)
    }
}

/// A TVD scheme with limiter `L`.
#[derive(Clone, Debug)]
pub struct LimitedScheme<'m, L> {
    upwind: Upwind<'m>,
    limiter: L,
}

impl<'m, L: Limiter> LimitedScheme<'m, L> {
    /// Create the scheme from an upwind scheme giving the flux direction.
    pub fn new(upwind: Upwind<'m>, limiter: L) -> Self {
        Self { upwind, limiter }
    }

    /// The limiter value per face.
    pub fn limiter<T: FieldValue>(&self, vf: &VolField<T>) -> SurfaceField<f64> {
        let mesh = SurfaceInterpolationScheme::<T>::mesh(&self.upwind);
        let flux = self.upwind.face_flux();
        let cdw = mesh.weights();
        let c = mesh.C();

        let lphi = vf.map(format!("limit({})", vf.name()), |v| v.limit_value());
        let gradc = GaussGrad::linear(mesh).calc_grad(&lphi, &format!("grad({})", lphi.name()));
        let (li, gi) = (lphi.internal(), gradc.internal());

        let internal = izip!(0.., mesh.owner(), mesh.neighbour(), flux.internal())
            .map(|(face, &own, &nei, &f)| {
                self.limiter.limiter(
                    cdw[face],
                    f,
                    li[own],
                    li[nei],
                    &gi[own],
                    &gi[nei],
                    &(c[nei] - c[own]),
                )
            })
            .collect();

        let boundary = mesh
            .patches()
            .iter()
            .enumerate()
            .map(|(patch_id, patch)| {
                if !lphi.boundary()[patch_id].is_coupled() {
                    return vec![1.0; patch.size];
                }
                izip!(
                    patch.range(),
                    flux.patch(patch_id),
                    lphi.patch_internal_field(mesh, patch_id),
                    lphi.patch_neighbour_field(mesh, patch_id),
                    gradc.patch_internal_field(mesh, patch_id),
                    gradc.patch_neighbour_field(mesh, patch_id),
                )
                .map(|(face, &f, p, n, gp, gn)| {
                    self.limiter
                        .limiter(cdw[face], f, p, n, &gp, &gn, &mesh.deltas()[face])
                })
                .collect()
            })
            .collect();

        SurfaceField::new(mesh, format!("{}Limiter({})", L::NAME, vf.name()), internal, boundary)
    }
}

impl<T: FieldValue, L: Limiter> SurfaceInterpolationScheme<T> for LimitedScheme<'_, L> {
    fn mesh(&self) -> &FvMesh {
        SurfaceInterpolationScheme::<T>::mesh(&self.upwind)
    }

    fn weights(&self, vf: &VolField<T>) -> SurfaceField<f64> {
        let mesh = SurfaceInterpolationScheme::<T>::mesh(self);
        let limiter = self.limiter(vf);
        let cdw = mesh.weights();
        let flux = self.upwind.face_flux();
        let weight = |face: usize, lim: f64, f: f64| lim * cdw[face] + (1.0 - lim) * pos(f);

        let internal = izip!(0.., limiter.internal(), flux.internal())
            .map(|(face, &lim, &f)| weight(face, lim, f))
            .collect();
        let boundary = mesh
            .patches()
            .iter()
            .enumerate()
            .map(|(patch_id, patch)| {
                izip!(patch.range(), limiter.patch(patch_id), flux.patch(patch_id))
                    .map(|(face, &lim, &f)| weight(face, lim, f))
                    .collect()
            })
            .collect();
        SurfaceField::new(mesh, format!("{}Weights({})", L::NAME, vf.name()), internal, boundary)
    }
}

fn construct_with<'m, T: FieldValue, L: Limiter + 'm>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
    read_limiter: impl FnOnce(&mut SchemeStream<'_>) -> Result<L, SchemeError>,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError> {
    let upwind = Upwind::from_stream(mesh, args, L::NAME)?;
    let limiter = read_limiter(args)?;
    Ok(Box::new(LimitedScheme::new(upwind, limiter)))
}

pub(super) fn construct_van_leer<'m, T: FieldValue>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError> {
    construct_with(mesh, args, |_| Ok(VanLeer))
}

pub(super) fn construct_minmod<'m, T: FieldValue>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError> {
    construct_with(mesh, args, |_| Ok(Minmod))
}

pub(super) fn construct_super_bee<'m, T: FieldValue>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError> {
    construct_with(mesh, args, |_| Ok(SuperBee))
}

pub(super) fn construct_muscl<'m, T: FieldValue>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError> {
    construct_with(mesh, args, |_| Ok(Muscl))
}

pub(super) fn construct_limited_linear<'m, T: FieldValue>(
    mesh: &'m FvMesh,
    args: &mut SchemeStream<'_>,
) -> Result<Box<dyn SurfaceInterpolationScheme<T> + 'm>, SchemeError> {
    construct_with(mesh, args, |args| {
        LimitedLinear::new(args.read_scalar(LimitedLinear::NAME, "coefficient k")?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{interpolation::new_scheme, mesh::line_mesh};
    use approx::assert_relative_eq;
    use std::rc::Rc;

    #[test]
    fn limiter_functions() {
        assert_eq!(VanLeer.limit(-1.0), 0.0);
        assert_relative_eq!(VanLeer.limit(1.0), 1.0);
        assert_relative_eq!(VanLeer.limit(3.0), 1.5);
        assert_eq!(Minmod.limit(0.5), 0.5);
        assert_eq!(Minmod.limit(5.0), 1.0);
        assert_eq!(SuperBee.limit(0.25), 0.5);
        assert_eq!(SuperBee.limit(1.5), 1.5);
        assert_eq!(SuperBee.limit(3.0), 2.0);
        assert_eq!(Muscl.limit(0.25), 0.5);
        assert_eq!(Muscl.limit(2.0), 1.5);
        assert_eq!(Muscl.limit(-1.0), 0.0);
        let ll = LimitedLinear::new(0.5).unwrap();
        assert_eq!(ll.limit(0.1), 0.4);
        assert_eq!(ll.limit(0.5), 1.0);
        assert!(LimitedLinear::new(1.5).is_err());
    }

    #[test]
    fn ratio_clipping() {
        let d = Vector::X;
        let g = Vector::from_xyz(2.0, 0.0, 0.0);
        // smooth: upwind gradient matches the face difference
        assert_relative_eq!(gradient_ratio(1.0, 0.0, 2.0, &g, &Vector::zero(), &d), 1.0);
        // flat face difference
        assert_eq!(gradient_ratio(1.0, 1.0, 1.0, &g, &g, &d), 1999.0);
        assert_eq!(gradient_ratio(-1.0, 1.0, 1.0, &g, &-g, &d), -2001.0);
        // zero gradients count as positive, whatever the sign of the zero
        let z = -Vector::zero();
        assert_eq!(gradient_ratio(1.0, 1.0, 1.0, &z, &z, &-d), 1999.0);
        assert_eq!(gradient_ratio(-1.0, 1.0, 1.0, &z, &z, &d), 1999.0);
    }

    #[test]
    fn smooth_fields_interpolate_linearly() {
        let mesh = line_mesh(6, 6.0);
        mesh.registry()
            .store("phi", Rc::new(SurfaceField::uniform(&mesh, "phi", 1.0)));
        let vf = VolField::zero_gradient(&mesh, "T", (0..6).map(|i| i as f64).collect());
        for name in ["vanLeer", "Minmod", "SuperBee", "MUSCL", "limitedLinear"] {
            let spec = if name == "limitedLinear" {
                format!("{name} phi 1")
            } else {
                format!("{name} phi")
            };
            let sf = new_scheme::<f64>(&mesh, &spec).unwrap().interpolate(&vf);
            // interior faces away from the zero-gradient ends are smooth
            for face in 1..4 {
                assert_relative_eq!(sf.internal()[face], face as f64 + 0.5, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn extrema_fall_back_to_upwind() {
        let mesh = line_mesh(4, 4.0);
        mesh.registry()
            .store("phi", Rc::new(SurfaceField::uniform(&mesh, "phi", 1.0)));
        let vf = VolField::zero_gradient(&mesh, "T", vec![0.0, 1.0, 0.0, 0.0]);
        let scheme = LimitedScheme::new(
            Upwind::new(&mesh, mesh.registry().lookup_object("phi").unwrap()),
            Minmod,
        );
        let sf = scheme.interpolate(&vf);
        // cell 1 is a local maximum, so the face downstream of it is upwind
        assert_eq!(sf.internal()[1], 1.0);

        assert!(matches!(
            new_scheme::<f64>(&mesh, "limitedLinear phi 2"),
            Err(SchemeError::InvalidCoefficient { .. })
        ));
        assert!(matches!(
            new_scheme::<f64>(&mesh, "limitedLinear phi"),
            Err(SchemeError::MissingArgument { .. })
        ));
    }
}
