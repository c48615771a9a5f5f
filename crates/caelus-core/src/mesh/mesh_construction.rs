use nalgebra_sparse as nas;

use itertools::{iproduct, izip};
use std::cell::OnceCell;

use super::{FvMesh, MeshError, ObjectRegistry, Patch, PatchKind};
use crate::{
    config::FvSchemes,
    primitives::{
        constants::{ROOTVSMALL, VSMALL},
        Vector,
    },
};

/// Validate the connectivity and build a mesh with its geometry.
pub fn build_mesh(
    points: Vec<Vector>,
    faces: Vec<Vec<usize>>,
    owner: Vec<usize>,
    neighbour: Vec<usize>,
    patches: Vec<Patch>,
) -> Result<FvMesh, MeshError> {
    let n_faces = faces.len();
    let n_internal = neighbour.len();
    if owner.len() != n_faces {
        return Err(MeshError::SizeMismatch {
            what: "owner",
            expected: n_faces,
            found: owner.len(),
        });
    }
    if n_internal > n_faces {
        return Err(MeshError::SizeMismatch {
            what: "neighbour",
            expected: n_faces,
            found: n_internal,
        });
    }

    let mut face_indices = Vec::with_capacity(4 * n_faces);
    let mut face_offsets = Vec::with_capacity(n_faces + 1);
    face_offsets.push(0);
    for (face, face_points) in faces.iter().enumerate() {
        if face_points.len() < 3 {
            return Err(MeshError::DegenerateFace {
                face,
                n_points: face_points.len(),
            });
        }
        if let Some(&point) = face_points.iter().find(|&&p| p >= points.len()) {
            return Err(MeshError::InvalidPoint {
                face,
                point,
                n_points: points.len(),
            });
        }
        face_indices.extend_from_slice(face_points);
        face_offsets.push(face_indices.len());
    }

    for (face, (&o, &n)) in izip!(&owner, &neighbour).enumerate() {
        if o >= n {
            return Err(MeshError::OwnerNotBelowNeighbour {
                face,
                owner: o,
                neighbour: n,
            });
        }
    }

    // patches must tile the boundary faces in order
    let mut expected = n_internal;
    for patch in &patches {
        if patch.start != expected {
            return Err(MeshError::PatchNotContiguous {
                patch: patch.name.clone(),
                start: patch.start,
                expected,
            });
        }
        expected += patch.size;
    }
    if expected != n_faces {
        return Err(MeshError::BoundaryNotCovered {
            covered: expected,
            n_faces,
        });
    }
    for (id, patch) in patches.iter().enumerate() {
        let Some(nbr) = patch.neighbour_patch() else {
            continue;
        };
        let invalid = |reason: String| MeshError::InvalidCyclic {
            patch: patch.name.clone(),
            reason,
        };
        let Some(partner) = patches.get(nbr) else {
            return Err(invalid(format!("patch index {nbr} out of range")));
        };
        if partner.neighbour_patch() != Some(id) {
            return Err(invalid(format!("{:?} is not coupled back", partner.name)));
        }
        if partner.size != patch.size {
            return Err(invalid(format!(
                "{:?} has {} faces, expected {}",
                partner.name, partner.size, patch.size
            )));
        }
    }

    let n_cells = owner
        .iter()
        .chain(neighbour.iter())
        .max()
        .map_or(0, |&c| c + 1);

    let mut cell_face_coo = nas::CooMatrix::new(n_cells, n_faces);
    for (face, &o) in owner.iter().enumerate() {
        cell_face_coo.push(o, face, 1i8);
    }
    for (face, &n) in neighbour.iter().enumerate() {
        cell_face_coo.push(n, face, -1i8);
    }
    let cell_face_map = nas::CsrMatrix::from(&cell_face_coo);

    let (face_centres, face_areas) = face_centres_and_areas(&points, &face_indices, &face_offsets);
    let mag_face_areas = face_areas.iter().map(Vector::mag).collect();
    let (cell_centres, cell_volumes) =
        cell_centres_and_volumes(n_cells, &owner, &neighbour, &face_centres, &face_areas);

    Ok(FvMesh {
        points,
        face_indices,
        face_offsets,
        owner,
        neighbour,
        patches,
        n_cells,
        cell_face_map,
        face_centres,
        face_areas,
        mag_face_areas,
        cell_centres,
        cell_volumes,
        point_faces: OnceCell::new(),
        point_cells: OnceCell::new(),
        surface_geometry: OnceCell::new(),
        registry: ObjectRegistry::new(),
        schemes: FvSchemes::default(),
    })
}

/// Face centres and area vectors.
///
/// Triangles are computed directly. Other polygons are split into triangles
/// around their point average and the centre is the area-weighted triangle centroid,
/// which is exact for non-planar faces as well.
fn face_centres_and_areas(
    points: &[Vector],
    face_indices: &[usize],
    face_offsets: &[usize],
) -> (Vec<Vector>, Vec<Vector>) {
    let n_faces = face_offsets.len() - 1;
    let mut centres = Vec::with_capacity(n_faces);
    let mut areas = Vec::with_capacity(n_faces);

    for w in face_offsets.windows(2) {
        let f = &face_indices[w[0]..w[1]];
        let n_points = f.len();

        if n_points == 3 {
            let (p0, p1, p2) = (points[f[0]], points[f[1]], points[f[2]]);
            centres.push((p0 + p1 + p2) / 3.0);
            areas.push((p1 - p0).cross(&(p2 - p0)) * 0.5);
            continue;
        }

        let f_centre: Vector = f.iter().map(|&p| points[p]).sum::<Vector>() / n_points as f64;

        let mut sum_n = Vector::zero();
        let mut sum_a = 0.0;
        let mut sum_ac = Vector::zero();
        for pi in 0..n_points {
            let this_p = points[f[pi]];
            let next_p = points[f[(pi + 1) % n_points]];

            let c = this_p + next_p + f_centre;
            let n = (next_p - this_p).cross(&(f_centre - this_p));
            let a = n.mag();

            sum_n += n;
            sum_a += a;
            sum_ac += c * a;
        }

        if sum_a < ROOTVSMALL {
            centres.push(f_centre);
            areas.push(Vector::zero());
        } else {
            centres.push(sum_ac / (3.0 * sum_a));
            areas.push(sum_n * 0.5);
        }
    }

    (centres, areas)
}

/// Cell centres and volumes by decomposing each cell into pyramids
/// from an estimated centre to each of its faces.
fn cell_centres_and_volumes(
    n_cells: usize,
    owner: &[usize],
    neighbour: &[usize],
    face_centres: &[Vector],
    face_areas: &[Vector],
) -> (Vec<Vector>, Vec<f64>) {
    // first estimate: average of the face centres
    let mut c_est = vec![Vector::zero(); n_cells];
    let mut n_cell_faces = vec![0usize; n_cells];
    for (&o, cf) in izip!(owner, face_centres) {
        c_est[o] += *cf;
        n_cell_faces[o] += 1;
    }
    for (&n, cf) in izip!(neighbour, face_centres) {
        c_est[n] += *cf;
        n_cell_faces[n] += 1;
    }
    for (c, &count) in izip!(c_est.iter_mut(), &n_cell_faces) {
        *c /= count.max(1) as f64;
    }

    let mut centres = vec![Vector::zero(); n_cells];
    let mut volumes = vec![0.0; n_cells];

    for (&o, cf, sf) in izip!(owner, face_centres, face_areas) {
        // three times the pyramid volume
        let pyr3_vol = sf.dot(&(*cf - c_est[o])).max(VSMALL);
        let pyr_centre = *cf * 0.75 + c_est[o] * 0.25;
        centres[o] += pyr_centre * pyr3_vol;
        volumes[o] += pyr3_vol;
    }
    for (&n, cf, sf) in izip!(neighbour, face_centres, face_areas) {
        let pyr3_vol = sf.dot(&(c_est[n] - *cf)).max(VSMALL);
        let pyr_centre = *cf * 0.75 + c_est[n] * 0.25;
        centres[n] += pyr_centre * pyr3_vol;
        volumes[n] += pyr3_vol;
    }

    for (c, v, est) in izip!(centres.iter_mut(), volumes.iter_mut(), &c_est) {
        if v.abs() > VSMALL {
            *c /= *v;
        } else {
            *c = *est;
        }
        *v /= 3.0;
    }

    (centres, volumes)
}

/// A box `[0, lx] x [0, ly] x [0, lz]` split into `nx * ny * nz` hexahedra,
/// with the six generic patches
/// `left`, `right` (x), `bottom`, `top` (y), `back` and `front` (z).
///
/// Cell `(i, j, k)` has index `i + nx * (j + ny * k)`.
/// Faces on opposite patches are listed in the same order
/// so either pair can be made cyclic.
pub fn cuboid_mesh(n: [usize; 3], l: [f64; 3]) -> FvMesh {
    let [nx, ny, nz] = n;
    let d = [l[0] / nx as f64, l[1] / ny as f64, l[2] / nz as f64];

    let point_idx = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);
    let cell_idx = |i: usize, j: usize, k: usize| i + nx * (j + ny * k);

    let points: Vec<Vector> = iproduct!(0..=nz, 0..=ny, 0..=nx)
        .map(|(k, j, i)| Vector::from_xyz(i as f64 * d[0], j as f64 * d[1], k as f64 * d[2]))
        .collect();

    // quads with normals in the positive axis direction
    // at the plane through point (i, j, k)
    let x_face = |i, j, k| {
        vec![
            point_idx(i, j, k),
            point_idx(i, j + 1, k),
            point_idx(i, j + 1, k + 1),
            point_idx(i, j, k + 1),
        ]
    };
    let y_face = |i, j, k| {
        vec![
            point_idx(i, j, k),
            point_idx(i, j, k + 1),
            point_idx(i + 1, j, k + 1),
            point_idx(i + 1, j, k),
        ]
    };
    let z_face = |i, j, k| {
        vec![
            point_idx(i, j, k),
            point_idx(i + 1, j, k),
            point_idx(i + 1, j + 1, k),
            point_idx(i, j + 1, k),
        ]
    };
    let flipped = |mut f: Vec<usize>| {
        f.reverse();
        f
    };

    let mut faces = Vec::new();
    let mut owner = Vec::new();
    let mut neighbour = Vec::new();

    // internal faces in upper triangular order:
    // by owner, then by neighbour, which for each cell is +x, +y, +z
    for (k, j, i) in iproduct!(0..nz, 0..ny, 0..nx) {
        let c = cell_idx(i, j, k);
        if i + 1 < nx {
            faces.push(x_face(i + 1, j, k));
            owner.push(c);
            neighbour.push(cell_idx(i + 1, j, k));
        }
        if j + 1 < ny {
            faces.push(y_face(i, j + 1, k));
            owner.push(c);
            neighbour.push(cell_idx(i, j + 1, k));
        }
        if k + 1 < nz {
            faces.push(z_face(i, j, k + 1));
            owner.push(c);
            neighbour.push(cell_idx(i, j, k + 1));
        }
    }

    let mut patches = Vec::with_capacity(6);
    let mut add_patch = |name: &str, patch_faces: Vec<(Vec<usize>, usize)>| {
        let start = faces.len();
        let size = patch_faces.len();
        for (f, c) in patch_faces {
            faces.push(f);
            owner.push(c);
        }
        patches.push(Patch::new(name, start, size));
    };

    add_patch(
        "left",
        iproduct!(0..nz, 0..ny)
            .map(|(k, j)| (flipped(x_face(0, j, k)), cell_idx(0, j, k)))
            .collect(),
    );
    add_patch(
        "right",
        iproduct!(0..nz, 0..ny)
            .map(|(k, j)| (x_face(nx, j, k), cell_idx(nx - 1, j, k)))
            .collect(),
    );
    add_patch(
        "bottom",
        iproduct!(0..nz, 0..nx)
            .map(|(k, i)| (flipped(y_face(i, 0, k)), cell_idx(i, 0, k)))
            .collect(),
    );
    add_patch(
        "top",
        iproduct!(0..nz, 0..nx)
            .map(|(k, i)| (y_face(i, ny, k), cell_idx(i, ny - 1, k)))
            .collect(),
    );
    add_patch(
        "back",
        iproduct!(0..ny, 0..nx)
            .map(|(j, i)| (flipped(z_face(i, j, 0)), cell_idx(i, j, 0)))
            .collect(),
    );
    add_patch(
        "front",
        iproduct!(0..ny, 0..nx)
            .map(|(j, i)| (z_face(i, j, nz), cell_idx(i, j, nz - 1)))
            .collect(),
    );

    build_mesh(points, faces, owner, neighbour, patches)
        .expect("cuboid connectivity is valid by construction")
}

/// A one-dimensional mesh of `n` cubic cells along the x axis.
/// The `left` and `right` patches are generic
/// and the four side patches are empty.
pub fn line_mesh(n: usize, length: f64) -> FvMesh {
    let dx = length / n as f64;
    let mut mesh = cuboid_mesh([n, 1, 1], [length, dx, dx]);
    for patch in mesh.patches.iter_mut().skip(2) {
        patch.kind = PatchKind::Empty;
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cuboid_geometry() {
        let mesh = cuboid_mesh([2, 3, 4], [1.0, 3.0, 2.0]);

        assert_eq!(mesh.n_cells(), 24);
        // (nx-1) ny nz + nx (ny-1) nz + nx ny (nz-1)
        assert_eq!(mesh.n_internal_faces(), 12 + 16 + 18);
        assert_eq!(mesh.n_faces(), 46 + 2 * (12 + 8 + 6));
        assert_eq!(mesh.patches().len(), 6);

        let total_volume: f64 = mesh.V().iter().sum();
        assert_relative_eq!(total_volume, 6.0, epsilon = 1e-12);
        for v in mesh.V() {
            assert_relative_eq!(*v, 0.25, epsilon = 1e-12);
        }

        // cell (1, 2, 3)
        let c = mesh.C()[1 + 2 * (2 + 3 * 3)];
        assert_relative_eq!(c.x(), 0.75, epsilon = 1e-12);
        assert_relative_eq!(c.y(), 2.5, epsilon = 1e-12);
        assert_relative_eq!(c.z(), 1.75, epsilon = 1e-12);

        // internal area vectors point from owner to neighbour
        for face in 0..mesh.n_internal_faces() {
            let d = mesh.C()[mesh.neighbour()[face]] - mesh.C()[mesh.owner()[face]];
            assert!(mesh.Sf()[face].dot(&d) > 0.0);
        }
        // boundary ones point outwards
        for face in mesh.n_internal_faces()..mesh.n_faces() {
            let d = mesh.Cf()[face] - mesh.C()[mesh.owner()[face]];
            assert!(mesh.Sf()[face].dot(&d) > 0.0);
        }

        // closed cells: area vectors sum to zero
        for cell in 0..mesh.n_cells() {
            let sum: Vector = mesh
                .cell_faces_oriented(cell)
                .map(|(f, o)| mesh.Sf()[f] * o as f64)
                .sum();
            assert_relative_eq!(sum.mag(), 0.0, epsilon = 1e-12);
            assert_eq!(mesh.cell_faces(cell).len(), 6);
        }

        let left = mesh.find_patch("left").unwrap();
        assert_eq!(mesh.patch(left).size, 12);
        for n in mesh.nf(left) {
            assert_relative_eq!(n.x(), -1.0);
        }
    }

    #[test]
    fn general_polygon_face() {
        // a planar pentagon's area and centroid
        let points = vec![
            Vector::from_xyz(0.0, 0.0, 0.0),
            Vector::from_xyz(2.0, 0.0, 0.0),
            Vector::from_xyz(2.0, 1.0, 0.0),
            Vector::from_xyz(1.0, 2.0, 0.0),
            Vector::from_xyz(0.0, 1.0, 0.0),
        ];
        let (centres, areas) = face_centres_and_areas(&points, &[0, 1, 2, 3, 4], &[0, 5]);
        // 2x1 rectangle plus a triangle of area 1 above it
        assert_relative_eq!(areas[0].z(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(centres[0].x(), 1.0, epsilon = 1e-12);
        // (2 * 0.5 + 1 * 4/3) / 3
        assert_relative_eq!(centres[0].y(), (1.0 + 4.0 / 3.0) / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn point_connectivity() {
        let mesh = cuboid_mesh([2, 2, 2], [1.0, 1.0, 1.0]);
        // the centre point touches all cells and the 12 internal faces through it
        let centre = 1 + 3 * (1 + 3 * 1);
        assert_eq!(mesh.point_cells()[centre], (0..8).collect::<Vec<_>>());
        assert_eq!(mesh.point_faces()[centre].len(), 12);
        // a corner touches one cell and three boundary faces
        assert_eq!(mesh.point_cells()[0], vec![0]);
        assert_eq!(mesh.point_faces()[0].len(), 3);
    }

    #[test]
    fn invalid_meshes_are_rejected() {
        let mesh = cuboid_mesh([1, 1, 1], [1.0, 1.0, 1.0]);
        let points = mesh.points().to_vec();
        let faces: Vec<Vec<usize>> = (0..6).map(|f| mesh.face_points(f).to_vec()).collect();

        let mut patches: Vec<Patch> = mesh.patches().to_vec();
        patches[1].start += 1;
        let err = FvMesh::new(points.clone(), faces.clone(), vec![0; 6], vec![], patches);
        assert!(matches!(err, Err(MeshError::PatchNotContiguous { .. })));

        let patches = mesh.patches()[..5].to_vec();
        let err = FvMesh::new(points.clone(), faces.clone(), vec![0; 6], vec![], patches);
        assert!(matches!(err, Err(MeshError::BoundaryNotCovered { .. })));

        let mut patches = mesh.patches().to_vec();
        patches[0].kind = PatchKind::Cyclic { neighbour_patch: 1 };
        let err = FvMesh::new(points.clone(), faces.clone(), vec![0; 6], vec![], patches);
        assert!(matches!(err, Err(MeshError::InvalidCyclic { .. })));

        let err = FvMesh::new(points, faces, vec![0; 5], vec![], mesh.patches().to_vec());
        assert!(matches!(err, Err(MeshError::SizeMismatch { .. })));

        let err = cuboid_mesh([2, 1, 1], [1.0, 1.0, 1.0]).with_patch_kind("nowhere", PatchKind::Wall);
        assert!(matches!(err, Err(MeshError::UnknownPatch(_))));
    }

    #[test]
    fn cyclic_pairs() {
        let mesh = cuboid_mesh([4, 2, 1], [4.0, 2.0, 1.0])
            .with_patch_kind("left", PatchKind::Cyclic { neighbour_patch: 1 })
            .unwrap();
        assert_eq!(
            mesh.patch(1).kind,
            PatchKind::Cyclic { neighbour_patch: 0 }
        );
        let left_face = mesh.patch(0).start;
        let right_face = mesh.coupled_face(left_face).unwrap();
        assert_eq!(right_face, mesh.patch(1).start);
        assert_relative_eq!(mesh.Cf()[left_face].y(), mesh.Cf()[right_face].y());

        let err = cuboid_mesh([4, 2, 1], [4.0, 2.0, 1.0])
            .with_patch_kind("left", PatchKind::Cyclic { neighbour_patch: 2 });
        assert!(matches!(err, Err(MeshError::InvalidCyclic { .. })));
    }

    #[test]
    fn changing_a_cyclic_releases_its_partner() {
        let cyclic = |n| PatchKind::Cyclic { neighbour_patch: n };
        let cube = || cuboid_mesh([2, 2, 2], [1.0, 1.0, 1.0]);

        let mesh = cube()
            .with_patch_kind("left", cyclic(1))
            .and_then(|m| m.with_patch_kind("left", PatchKind::Wall))
            .unwrap();
        assert_eq!(mesh.patch(0).kind, PatchKind::Wall);
        assert_eq!(mesh.patch(1).kind, PatchKind::Patch);
        assert!(mesh.patches().iter().all(|p| !p.is_coupled()));

        // moving to a new partner releases the old one
        let mesh = cube()
            .with_patch_kind("left", cyclic(1))
            .and_then(|m| m.with_patch_kind("left", cyclic(2)))
            .unwrap();
        assert_eq!(mesh.patch(0).kind, cyclic(2));
        assert_eq!(mesh.patch(1).kind, PatchKind::Patch);
        assert_eq!(mesh.patch(2).kind, cyclic(0));

        // setting the same pair again from the other side is fine
        let mesh = cube()
            .with_patch_kind("left", cyclic(1))
            .and_then(|m| m.with_patch_kind("right", cyclic(0)))
            .unwrap();
        assert_eq!(mesh.patch(0).kind, cyclic(1));
        assert_eq!(mesh.patch(1).kind, cyclic(0));

        // a partner already coupled elsewhere is rejected
        let err = cube()
            .with_patch_kind("left", cyclic(1))
            .and_then(|m| m.with_patch_kind("bottom", cyclic(1)));
        assert!(matches!(err, Err(MeshError::InvalidCyclic { .. })));
        let err = cube().with_patch_kind("left", cyclic(0));
        assert!(matches!(err, Err(MeshError::InvalidCyclic { .. })));
    }

    #[test]
    fn line_mesh_has_empty_sides() {
        let mesh = line_mesh(10, 10.0);
        assert_eq!(mesh.n_cells(), 10);
        assert_eq!(mesh.n_internal_faces(), 9);
        for patch in &mesh.patches()[2..] {
            assert_eq!(patch.kind, PatchKind::Empty);
        }
        assert_relative_eq!(mesh.C()[3].x(), 3.5, epsilon = 1e-12);
    }
}
