use fixedbitset as fb;
use std::collections::HashMap;

use super::{cell_dist_funcs, MeshWave, WallPointData, WaveError, WaveInfo};
use crate::{field::FieldValue, mesh::FvMesh, primitives::constants::SMALL};

/// Distance to the nearest face of a set of patches for every cell and face,
/// together with data carried from that face.
#[derive(Clone, Debug)]
pub struct PatchDataWave<T> {
    patch_ids: fb::FixedBitSet,
    correct_walls: bool,
    distance: Vec<f64>,
    patch_distance: Vec<Vec<f64>>,
    cell_data: Vec<T>,
    patch_data: Vec<Vec<T>>,
    n_unset: usize,
    n_evals: usize,
}

impl<T: FieldValue> PatchDataWave<T> {
    /// Run the wave from every face of the patches in `patch_ids`.
    ///
    /// `initial_patch_values` holds one list per mesh patch;
    /// the lists of the selected patches give the data of each face.
    /// With `correct_walls`, cells touching the patches get exact distances
    /// from a search over nearby patch faces.
    pub fn new(
        mesh: &FvMesh,
        patch_ids: fb::FixedBitSet,
        initial_patch_values: &[Vec<T>],
        correct_walls: bool,
    ) -> Result<Self, WaveError> {
        let mut wave = Self {
            patch_ids,
            correct_walls,
            distance: Vec::new(),
            patch_distance: Vec::new(),
            cell_data: Vec::new(),
            patch_data: Vec::new(),
            n_unset: 0,
            n_evals: 0,
        };
        wave.correct(mesh, initial_patch_values)?;
        Ok(wave)
    }

    /// Recompute everything, e.g. after the mesh or the patch values changed.
    pub fn correct(&mut self, mesh: &FvMesh, initial_patch_values: &[Vec<T>]) -> Result<(), WaveError> {
        if initial_patch_values.len() != mesh.patches().len() {
            return Err(WaveError::SizeMismatch {
                what: "initial patch value list",
                expected: mesh.patches().len(),
                found: initial_patch_values.len(),
            });
        }

        let n_walls = cell_dist_funcs::sum_patch_size(mesh, &self.patch_ids);
        let mut changed_faces = Vec::with_capacity(n_walls);
        let mut face_dist = Vec::with_capacity(n_walls);
        for patch_id in self.patch_ids.ones() {
            let patch = mesh.patch(patch_id);
            let values = &initial_patch_values[patch_id];
            if values.len() != patch.size {
                return Err(WaveError::SizeMismatch {
                    what: "initial patch value",
                    expected: patch.size,
                    found: values.len(),
                });
            }
            for (face, &value) in patch.range().zip(values) {
                changed_faces.push(face);
                face_dist.push(WallPointData::new(mesh.Cf()[face], value, 0.0));
            }
        }

        let unset = WallPointData::unset(T::zero());
        let wave = MeshWave::with_seeds(
            mesh,
            &changed_faces,
            &face_dist,
            vec![unset.clone(); mesh.n_faces()],
            vec![unset; mesh.n_cells()],
            mesh.n_cells() + 1,
        )?;
        self.n_evals = wave.n_evals();
        self.n_unset = self.get_values(mesh, &wave);

        if self.correct_walls {
            let mut nearest_face = HashMap::with_capacity(2 * n_walls);
            cell_dist_funcs::correct_boundary_face_cells(
                mesh,
                &self.patch_ids,
                &mut self.distance,
                &mut nearest_face,
            );
            cell_dist_funcs::correct_boundary_point_cells(
                mesh,
                &self.patch_ids,
                &mut self.distance,
                &mut nearest_face,
            );
            let face_info = wave.all_face_info();
            for (&cell, &face) in &nearest_face {
                self.cell_data[cell] = *face_info[face].data();
            }
        }

        if self.n_unset > 0 {
            log::warn!(
                "{} cells and faces not reached from the wall patches, \
                 possibly a region not connected to any of them",
                self.n_unset
            );
        }
        Ok(())
    }

    /// Copy distances and data out of the wave.
    /// Returns the number of cells and faces the wave didn't reach.
    fn get_values(&mut self, mesh: &FvMesh, wave: &MeshWave<'_, WallPointData<T>>) -> usize {
        let mut n_illegal = 0;

        let cell_info = wave.all_cell_info();
        self.distance = Vec::with_capacity(cell_info.len());
        self.cell_data = Vec::with_capacity(cell_info.len());
        for info in cell_info {
            if info.valid() {
                self.distance.push(info.dist_sqr().sqrt());
            } else {
                self.distance.push(info.dist_sqr().abs());
                n_illegal += 1;
            }
            self.cell_data.push(*info.data());
        }

        let face_info = wave.all_face_info();
        self.patch_distance.clear();
        self.patch_data.clear();
        for patch in mesh.patches() {
            let mut distances = Vec::with_capacity(patch.size);
            let mut data = Vec::with_capacity(patch.size);
            for info in &face_info[patch.range()] {
                if info.valid() {
                    // kept off zero so wall distances can be divided by
                    distances.push(info.dist_sqr().sqrt() + SMALL);
                } else {
                    distances.push(info.dist_sqr().abs());
                    n_illegal += 1;
                }
                data.push(*info.data());
            }
            self.patch_distance.push(distances);
            self.patch_data.push(data);
        }

        n_illegal
    }

    /// Distance per cell.
    #[inline]
    pub fn distance(&self) -> &[f64] {
        &self.distance
    }

    /// Distance per face of each patch.
    #[inline]
    pub fn patch_distance(&self) -> &[Vec<f64>] {
        &self.patch_distance
    }

    /// Data of the nearest wall face per cell.
    #[inline]
    pub fn cell_data(&self) -> &[T] {
        &self.cell_data
    }

    /// Data of the nearest wall face per face of each patch.
    #[inline]
    pub fn patch_data(&self) -> &[Vec<T>] {
        &self.patch_data
    }

    /// Number of cells and faces the wave didn't reach.
    #[inline]
    pub fn n_unset(&self) -> usize {
        self.n_unset
    }

    /// Number of update evaluations the wave took.
    #[inline]
    pub fn n_evals(&self) -> usize {
        self.n_evals
    }

    /// The patches distances are measured from.
    #[inline]
    pub fn patch_ids(&self) -> &fb::FixedBitSet {
        &self.patch_ids
    }
}
