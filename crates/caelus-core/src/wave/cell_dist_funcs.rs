//! Exact distances from points to boundary faces,
//! used to correct wave distances next to walls
//! where the nearest wall point may lie anywhere on a face.

use fixedbitset as fb;
use std::collections::HashMap;

use crate::{
    mesh::{FvMesh, Patch},
    primitives::{
        constants::{GREAT, VSMALL},
        Vector,
    },
};

/// The point of triangle `abc` nearest to `p`.
pub fn nearest_point_on_triangle(p: &Vector, a: &Vector, b: &Vector, c: &Vector) -> Vector {
    let ab = *b - *a;
    let ac = *c - *a;

    // vertex and edge regions in turn, then the interior
    let ap = *p - *a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = *p - *b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return *a + ab * (d1 / (d1 - d3));
    }

    let cp = *p - *c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return *a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return *b + (*c - *b) * w;
    }

    let sum = va + vb + vc;
    if sum.abs() < VSMALL {
        return *a;
    }
    *a + ab * (vb / sum) + ac * (vc / sum)
}

/// The point of a face nearest to `p` and its distance.
///
/// Faces with more than three points are split into triangles
/// around the face centre.
pub fn nearest_point_on_face(mesh: &FvMesh, face: usize, p: &Vector) -> (Vector, f64) {
    let points = mesh.points();
    let fp = mesh.face_points(face);
    if fp.len() == 3 {
        let hit = nearest_point_on_triangle(p, &points[fp[0]], &points[fp[1]], &points[fp[2]]);
        return (hit, (hit - *p).mag());
    }

    let centre = mesh.Cf()[face];
    let mut nearest = (centre, GREAT);
    for (i, &pi) in fp.iter().enumerate() {
        let pj = fp[(i + 1) % fp.len()];
        let hit = nearest_point_on_triangle(p, &points[pi], &points[pj], &centre);
        let dist = (hit - *p).mag();
        if dist < nearest.1 {
            nearest = (hit, dist);
        }
    }
    nearest
}

/// The distance from `p` to the nearest of `faces` and that face,
/// or `GREAT` and `None` if there are no faces.
pub fn smallest_dist(mesh: &FvMesh, p: &Vector, faces: &[usize]) -> (f64, Option<usize>) {
    let mut min_dist = GREAT;
    let mut min_face = None;
    for &face in faces {
        let (_, dist) = nearest_point_on_face(mesh, face, p);
        if dist < min_dist {
            min_dist = dist;
            min_face = Some(face);
        }
    }
    (min_dist, min_face)
}

/// Faces of the patch that share a point with `face`, including `face` itself.
pub fn point_neighbours(mesh: &FvMesh, patch: &Patch, face: usize) -> Vec<usize> {
    let range = patch.range();
    let mut neighbours: Vec<usize> = mesh
        .face_points(face)
        .iter()
        .flat_map(|&pt| mesh.point_faces()[pt].iter().copied())
        .filter(|f| range.contains(f))
        .collect();
    neighbours.sort_unstable();
    neighbours.dedup();
    neighbours
}

/// Total number of faces in the selected patches.
pub fn sum_patch_size(mesh: &FvMesh, patch_ids: &fb::FixedBitSet) -> usize {
    patch_ids.ones().map(|p| mesh.patch(p).size).sum()
}

fn store_nearest(
    cell: usize,
    dist: f64,
    face: Option<usize>,
    wall_dist: &mut [f64],
    nearest_face: &mut HashMap<usize, usize>,
) {
    let Some(face) = face else {
        return;
    };
    // a cell next to several wall faces keeps the nearest result
    match nearest_face.get(&cell) {
        Some(_) if wall_dist[cell] <= dist => {}
        _ => {
            wall_dist[cell] = dist;
            nearest_face.insert(cell, face);
        }
    }
}

/// Exact distances for cells with a face on the selected patches,
/// searching the faces sharing a point with that face.
///
/// Corrected cells are recorded in `nearest_face` with their nearest wall face.
pub fn correct_boundary_face_cells(
    mesh: &FvMesh,
    patch_ids: &fb::FixedBitSet,
    wall_dist: &mut [f64],
    nearest_face: &mut HashMap<usize, usize>,
) {
    let c = mesh.C();
    for patch_id in patch_ids.ones() {
        let patch = mesh.patch(patch_id);
        for (face, &cell) in patch.range().zip(mesh.face_cells(patch_id)) {
            let neighbours = point_neighbours(mesh, patch, face);
            let (dist, min_face) = smallest_dist(mesh, &c[cell], &neighbours);
            store_nearest(cell, dist, min_face, wall_dist, nearest_face);
        }
    }
}

/// Exact distances for cells touching the selected patches only at a point,
/// i.e. those not already in `nearest_face`,
/// searching the patch faces around that point.
pub fn correct_boundary_point_cells(
    mesh: &FvMesh,
    patch_ids: &fb::FixedBitSet,
    wall_dist: &mut [f64],
    nearest_face: &mut HashMap<usize, usize>,
) {
    let c = mesh.C();
    let face_corrected: fb::FixedBitSet = nearest_face.keys().copied().collect();
    for patch_id in patch_ids.ones() {
        let patch = mesh.patch(patch_id);
        let range = patch.range();

        let mut patch_points: Vec<usize> = range
            .clone()
            .flat_map(|face| mesh.face_points(face).iter().copied())
            .collect();
        patch_points.sort_unstable();
        patch_points.dedup();

        for pt in patch_points {
            let wall_faces: Vec<usize> = mesh.point_faces()[pt]
                .iter()
                .copied()
                .filter(|f| range.contains(f))
                .collect();
            for &cell in &mesh.point_cells()[pt] {
                if face_corrected.contains(cell) {
                    continue;
                }
                let (dist, min_face) = smallest_dist(mesh, &c[cell], &wall_faces);
                store_nearest(cell, dist, min_face, wall_dist, nearest_face);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::cuboid_mesh;
    use approx::assert_relative_eq;

    #[test]
    fn triangle_regions() {
        let a = Vector::zero();
        let b = Vector::X;
        let c = Vector::Y;
        let near = |p: Vector| nearest_point_on_triangle(&p, &a, &b, &c);

        assert!(near(Vector::from_xyz(0.2, 0.2, 1.0)).equal(&Vector::from_xyz(0.2, 0.2, 0.0), 1e-12));
        assert_eq!(near(Vector::from_xyz(-1.0, -1.0, 0.0)), a);
        assert_eq!(near(Vector::from_xyz(2.0, -0.5, 0.0)), b);
        assert_eq!(near(Vector::from_xyz(0.5, -1.0, 3.0)), Vector::from_xyz(0.5, 0.0, 0.0));
        let hyp = near(Vector::from_xyz(1.0, 1.0, 0.0));
        assert!(hyp.equal(&Vector::from_xyz(0.5, 0.5, 0.0), 1e-12));
    }

    #[test]
    fn nearest_on_quad_faces() {
        let mesh = cuboid_mesh([1, 1, 1], [1.0, 1.0, 1.0]);
        // the bottom face lies in y = 0
        let bottom = mesh.patch(mesh.find_patch("bottom").unwrap()).start;
        let (hit, dist) = nearest_point_on_face(&mesh, bottom, &Vector::from_xyz(2.0, 0.5, 0.5));
        assert!(hit.equal(&Vector::from_xyz(1.0, 0.0, 0.5), 1e-12));
        assert_relative_eq!(dist, 0.5f64.hypot(1.0), epsilon = 1e-12);
    }

    #[test]
    fn wall_adjacent_cells() {
        let mesh = cuboid_mesh([3, 3, 1], [3.0, 3.0, 1.0]);
        let bottom = mesh.find_patch("bottom").unwrap();
        let left = mesh.find_patch("left").unwrap();
        let mut ids = fb::FixedBitSet::with_capacity(mesh.patches().len());
        ids.insert(bottom);
        ids.insert(left);
        assert_eq!(sum_patch_size(&mesh, &ids), 6);

        let mut dist = vec![GREAT; mesh.n_cells()];
        let mut nearest = HashMap::new();
        correct_boundary_face_cells(&mesh, &ids, &mut dist, &mut nearest);
        // the corner cell is half a cell from both walls
        for cell in [0, 1, 2, 3, 6] {
            assert_relative_eq!(dist[cell], 0.5, epsilon = 1e-12);
            assert!(nearest.contains_key(&cell));
        }
        assert_eq!(dist[4], GREAT);
        assert_eq!(nearest.len(), 5);
        let first = mesh.patch(left).start;
        assert_eq!(nearest[&3], first + 1);

        // cells touching the walls, searched from the wall points alone
        let mut dist = vec![GREAT; mesh.n_cells()];
        let mut nearest = HashMap::new();
        correct_boundary_point_cells(&mesh, &ids, &mut dist, &mut nearest);
        for cell in [0, 1, 2, 3, 6] {
            assert_relative_eq!(dist[cell], 0.5, epsilon = 1e-12);
        }
        assert_eq!(nearest.len(), 5);
        assert_eq!(dist[8], GREAT);
    }
}
