use itertools::izip;

use super::{FvMesh, PatchKind};
use crate::primitives::{constants::VSMALL, Vector};

/// Per-face geometry for interpolation, indexed by mesh face.
#[derive(Clone, Debug)]
pub(super) struct SurfaceGeometry {
    pub weights: Vec<f64>,
    pub deltas: Vec<Vector>,
    pub delta_coeffs: Vec<f64>,
    pub non_orth_delta_coeffs: Vec<f64>,
    pub non_orth_correction_vectors: Vec<Vector>,
}

pub(super) fn compute(mesh: &FvMesh) -> SurfaceGeometry {
    let n_faces = mesh.n_faces();
    let owner = mesh.owner();
    let (c, cf, sf) = (mesh.C(), mesh.Cf(), mesh.Sf());

    let mut weights = vec![1.0; n_faces];
    let mut deltas = vec![Vector::zero(); n_faces];

    for (face, (&own, &nei)) in izip!(owner, mesh.neighbour()).enumerate() {
        // distances along the face normal, so that skewed faces
        // still split the owner-neighbour distance sensibly
        let sfd_own = sf[face].dot(&(cf[face] - c[own])).abs();
        let sfd_nei = sf[face].dot(&(c[nei] - cf[face])).abs();
        weights[face] = sfd_nei / (sfd_own + sfd_nei).max(VSMALL);
        deltas[face] = c[nei] - c[own];
    }

    for patch in mesh.patches() {
        match patch.kind {
            PatchKind::Cyclic { neighbour_patch } => {
                let nbr = mesh.patch(neighbour_patch);
                for (face, nbr_face) in izip!(patch.range(), nbr.range()) {
                    let own_d = cf[face] - c[owner[face]];
                    let nbr_d = cf[nbr_face] - c[owner[nbr_face]];
                    let di = mesh.face_normal(face).dot(&own_d);
                    let dni = mesh.face_normal(nbr_face).dot(&nbr_d);
                    weights[face] = dni / (di + dni).max(VSMALL);
                    // the partner's delta points out of the domain on its side,
                    // so the difference spans both cells
                    deltas[face] = own_d - nbr_d;
                }
            }
            _ => {
                for face in patch.range() {
                    deltas[face] = cf[face] - c[owner[face]];
                }
            }
        }
    }

    let delta_coeffs: Vec<f64> = deltas.iter().map(|d| 1.0 / d.mag().max(VSMALL)).collect();

    let mut non_orth_delta_coeffs = vec![0.0; n_faces];
    let mut non_orth_correction_vectors = vec![Vector::zero(); n_faces];
    for face in 0..n_faces {
        let d = deltas[face];
        let n = mesh.face_normal(face);
        non_orth_delta_coeffs[face] = 1.0 / n.dot(&d).max(0.05 * d.mag()).max(VSMALL);
    }
    let coupled_boundary = mesh
        .patches()
        .iter()
        .filter(|p| p.is_coupled())
        .flat_map(|p| p.range());
    for face in (0..mesh.n_internal_faces()).chain(coupled_boundary) {
        non_orth_correction_vectors[face] =
            mesh.face_normal(face) - deltas[face] * non_orth_delta_coeffs[face];
    }

    SurfaceGeometry {
        weights,
        deltas,
        delta_coeffs,
        non_orth_delta_coeffs,
        non_orth_correction_vectors,
    }
}
