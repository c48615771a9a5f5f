//! Propagation of information from seed faces across a mesh,
//! alternating between faces and cells until nothing changes.
//!
//! What is propagated is defined by a [`WaveInfo`] type,
//! e.g. [`WallPointData`] carrying the nearest wall point.
//! Cyclic patches pass information across to their partner,
//! translated by the patches' relative position.

use fixedbitset as fb;

use crate::{
    mesh::{FvMesh, MeshError, Patch},
    primitives::Vector,
};

mod wall_point;
pub use wall_point::WallPointData;

pub mod cell_dist_funcs;

mod patch_data_wave;
pub use patch_data_wave::PatchDataWave;

mod wall_dist;
pub use wall_dist::{WallDist, WallDistData, WallDistReflection};

/// Relative improvement below which an update isn't propagated further.
pub const DEFAULT_PROPAGATION_TOL: f64 = 0.01;

/// Errors from running a mesh wave.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum WaveError {
    /// Initial information had the wrong length.
    #[error("expected {expected} {what} entries, found {found}")]
    SizeMismatch {
        /// Which entries.
        what: &'static str,
        /// Number required by the mesh.
        expected: usize,
        /// Number given.
        found: usize,
    },
    /// The wave was still changing after the maximum number of iterations.
    #[error("wave did not converge in {max_iter} iterations, {n_unvisited_cells} cells unvisited")]
    MaxIterReached {
        /// The iteration limit.
        max_iter: usize,
        /// Cells without valid information when the wave stopped.
        n_unvisited_cells: usize,
    },
    /// The mesh didn't have the requested patches.
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Information carried by a mesh wave.
///
/// Update methods merge neighbouring information into `self`
/// and return whether `self` changed enough to propagate further.
pub trait WaveInfo: Clone {
    /// Whether the information has been set.
    fn valid(&self) -> bool;

    /// Merge information from a face into a cell.
    fn update_cell(
        &mut self,
        mesh: &FvMesh,
        cell: usize,
        nbr_face: usize,
        nbr_info: &Self,
        tol: f64,
    ) -> bool;

    /// Merge information from a cell into one of its faces.
    fn update_face_from_cell(
        &mut self,
        mesh: &FvMesh,
        face: usize,
        nbr_cell: usize,
        nbr_info: &Self,
        tol: f64,
    ) -> bool;

    /// Merge information from the same face, e.g. across a cyclic patch.
    fn update_face(&mut self, mesh: &FvMesh, face: usize, nbr_info: &Self, tol: f64) -> bool;

    /// Whether two pieces of information are the same
    /// so that an update can be skipped.
    fn equal(&self, other: &Self) -> bool;

    /// Convert to a form relative to a face on `patch`
    /// before passing it to the coupled patch.
    fn leave_domain(&mut self, mesh: &FvMesh, patch: &Patch, face_centre: &Vector);

    /// Convert back from the relative form after arriving on `patch`.
    fn enter_domain(&mut self, mesh: &FvMesh, patch: &Patch, face_centre: &Vector);
}

/// Face-cell wave propagation state.
#[derive(Clone, Debug)]
pub struct MeshWave<'a, I> {
    mesh: &'a FvMesh,
    all_face_info: Vec<I>,
    all_cell_info: Vec<I>,
    changed_face: fb::FixedBitSet,
    changed_faces: Vec<usize>,
    changed_cell: fb::FixedBitSet,
    changed_cells: Vec<usize>,
    has_cyclic_patches: bool,
    n_evals: usize,
    n_unvisited_cells: usize,
    n_unvisited_faces: usize,
    propagation_tol: f64,
}

impl<'a, I: WaveInfo> MeshWave<'a, I> {
    /// Set up a wave with initial information on every face and cell
    /// but no changes to propagate yet.
    pub fn new(mesh: &'a FvMesh, all_face_info: Vec<I>, all_cell_info: Vec<I>) -> Result<Self, WaveError> {
        if all_face_info.len() != mesh.n_faces() {
            return Err(WaveError::SizeMismatch {
                what: "face",
                expected: mesh.n_faces(),
                found: all_face_info.len(),
            });
        }
        if all_cell_info.len() != mesh.n_cells() {
            return Err(WaveError::SizeMismatch {
                what: "cell",
                expected: mesh.n_cells(),
                found: all_cell_info.len(),
            });
        }
        let n_unvisited_cells = all_cell_info.iter().filter(|i| !i.valid()).count();
        let n_unvisited_faces = all_face_info.iter().filter(|i| !i.valid()).count();
        Ok(Self {
            mesh,
            all_face_info,
            all_cell_info,
            changed_face: fb::FixedBitSet::with_capacity(mesh.n_faces()),
            changed_faces: Vec::new(),
            changed_cell: fb::FixedBitSet::with_capacity(mesh.n_cells()),
            changed_cells: Vec::new(),
            has_cyclic_patches: mesh.patches().iter().any(Patch::is_coupled),
            n_evals: 0,
            n_unvisited_cells,
            n_unvisited_faces,
            propagation_tol: DEFAULT_PROPAGATION_TOL,
        })
    }

    /// Set up a wave, seed it and iterate until it stops changing.
    pub fn with_seeds(
        mesh: &'a FvMesh,
        changed_faces: &[usize],
        changed_faces_info: &[I],
        all_face_info: Vec<I>,
        all_cell_info: Vec<I>,
        max_iter: usize,
    ) -> Result<Self, WaveError> {
        let mut wave = Self::new(mesh, all_face_info, all_cell_info)?;
        wave.set_face_info(changed_faces, changed_faces_info)?;
        let iter = wave.iterate(max_iter);
        if iter >= max_iter {
            return Err(WaveError::MaxIterReached {
                max_iter,
                n_unvisited_cells: wave.n_unvisited_cells,
            });
        }
        Ok(wave)
    }

    /// Set the relative tolerance below which improvements aren't propagated.
    pub fn with_propagation_tol(mut self, tol: f64) -> Self {
        self.propagation_tol = tol;
        self
    }

    /// Overwrite the information of some faces and mark them changed.
    pub fn set_face_info(&mut self, faces: &[usize], infos: &[I]) -> Result<(), WaveError> {
        if faces.len() != infos.len() {
            return Err(WaveError::SizeMismatch {
                what: "seed face info",
                expected: faces.len(),
                found: infos.len(),
            });
        }
        for (&face, info) in faces.iter().zip(infos) {
            let was_valid = self.all_face_info[face].valid();
            self.all_face_info[face] = info.clone();
            if !was_valid && info.valid() {
                self.n_unvisited_faces -= 1;
            }
            self.mark_face_changed(face);
        }
        Ok(())
    }

    //
    // propagation
    //

    fn mark_face_changed(&mut self, face: usize) {
        if !self.changed_face[face] {
            self.changed_face.insert(face);
            self.changed_faces.push(face);
        }
    }

    fn mark_cell_changed(&mut self, cell: usize) {
        if !self.changed_cell[cell] {
            self.changed_cell.insert(cell);
            self.changed_cells.push(cell);
        }
    }

    fn update_cell(&mut self, cell: usize, nbr_face: usize, nbr_info: &I) -> bool {
        self.n_evals += 1;
        let info = &mut self.all_cell_info[cell];
        let was_valid = info.valid();
        let propagate = info.update_cell(self.mesh, cell, nbr_face, nbr_info, self.propagation_tol);
        let now_valid = info.valid();
        if propagate {
            self.mark_cell_changed(cell);
        }
        if !was_valid && now_valid {
            self.n_unvisited_cells -= 1;
        }
        propagate
    }

    fn update_face_from_cell(&mut self, face: usize, nbr_cell: usize, nbr_info: &I) -> bool {
        self.n_evals += 1;
        let info = &mut self.all_face_info[face];
        let was_valid = info.valid();
        let propagate =
            info.update_face_from_cell(self.mesh, face, nbr_cell, nbr_info, self.propagation_tol);
        let now_valid = info.valid();
        if propagate {
            self.mark_face_changed(face);
        }
        if !was_valid && now_valid {
            self.n_unvisited_faces -= 1;
        }
        propagate
    }

    fn update_face(&mut self, face: usize, nbr_info: &I) -> bool {
        self.n_evals += 1;
        let info = &mut self.all_face_info[face];
        let was_valid = info.valid();
        let propagate = info.update_face(self.mesh, face, nbr_info, self.propagation_tol);
        let now_valid = info.valid();
        if propagate {
            self.mark_face_changed(face);
        }
        if !was_valid && now_valid {
            self.n_unvisited_faces -= 1;
        }
        propagate
    }

    /// Pass changed face information across cyclic patches.
    fn handle_cyclic_patches(&mut self) {
        let mesh = self.mesh;
        for patch in mesh.patches() {
            let Some(nbr_id) = patch.neighbour_patch() else {
                continue;
            };
            let nbr = mesh.patch(nbr_id);
            let received: Vec<(usize, I)> = nbr
                .range()
                .enumerate()
                .filter(|&(_, nbr_face)| self.changed_face[nbr_face])
                .map(|(i, nbr_face)| {
                    let mut info = self.all_face_info[nbr_face].clone();
                    info.leave_domain(mesh, nbr, &mesh.Cf()[nbr_face]);
                    info.enter_domain(mesh, patch, &mesh.Cf()[patch.start + i]);
                    (patch.start + i, info)
                })
                .collect();

            for (face, info) in received {
                if !self.all_face_info[face].equal(&info) {
                    self.update_face(face, &info);
                }
            }
        }
    }

    /// Propagate changed faces to their cells.
    /// Returns the number of changed cells.
    pub fn face_to_cell(&mut self) -> usize {
        let mesh = self.mesh;
        let changed_faces = std::mem::take(&mut self.changed_faces);
        for &face in &changed_faces {
            debug_assert!(self.changed_face[face], "face {face} in list but not marked");
            let nbr_info = self.all_face_info[face].clone();

            let own = mesh.owner()[face];
            if !self.all_cell_info[own].equal(&nbr_info) {
                self.update_cell(own, face, &nbr_info);
            }
            if let Some(&nei) = mesh.neighbour().get(face) {
                if !self.all_cell_info[nei].equal(&nbr_info) {
                    self.update_cell(nei, face, &nbr_info);
                }
            }

            self.changed_face.set(face, false);
        }
        log::trace!("Changed cells: {}", self.changed_cells.len());
        self.changed_cells.len()
    }

    /// Propagate changed cells to their faces and across cyclics.
    /// Returns the number of changed faces.
    pub fn cell_to_face(&mut self) -> usize {
        let mesh = self.mesh;
        let changed_cells = std::mem::take(&mut self.changed_cells);
        for &cell in &changed_cells {
            debug_assert!(self.changed_cell[cell], "cell {cell} in list but not marked");
            let nbr_info = self.all_cell_info[cell].clone();
            for &face in mesh.cell_faces(cell) {
                if !self.all_face_info[face].equal(&nbr_info) {
                    self.update_face_from_cell(face, cell, &nbr_info);
                }
            }
            self.changed_cell.set(cell, false);
        }

        if self.has_cyclic_patches {
            self.handle_cyclic_patches();
        }
        log::trace!("Changed faces: {}", self.changed_faces.len());
        self.changed_faces.len()
    }

    /// Alternate face-to-cell and cell-to-face propagation
    /// until nothing changes or `max_iter` sweeps have run.
    /// Returns the number of complete sweeps.
    pub fn iterate(&mut self, max_iter: usize) -> usize {
        if self.has_cyclic_patches {
            self.handle_cyclic_patches();
        }

        let mut iter = 0;
        while iter < max_iter {
            let n_cells = self.face_to_cell();
            if n_cells == 0 {
                break;
            }
            let n_faces = self.cell_to_face();
            if n_faces == 0 {
                break;
            }
            iter += 1;
        }
        log::debug!(
            "Mesh wave stopped after {iter} iterations and {} evaluations, {} cells unvisited",
            self.n_evals,
            self.n_unvisited_cells
        );
        iter
    }

    //
    // results
    //

    /// The mesh the wave runs on.
    #[inline]
    pub fn mesh(&self) -> &'a FvMesh {
        self.mesh
    }

    /// Information on every face.
    #[inline]
    pub fn all_face_info(&self) -> &[I] {
        &self.all_face_info
    }

    /// Information on every cell.
    #[inline]
    pub fn all_cell_info(&self) -> &[I] {
        &self.all_cell_info
    }

    /// Take ownership of the face and cell information.
    pub fn into_info(self) -> (Vec<I>, Vec<I>) {
        (self.all_face_info, self.all_cell_info)
    }

    /// Number of cells without valid information.
    #[inline]
    pub fn unset_cells(&self) -> usize {
        self.n_unvisited_cells
    }

    /// Number of faces without valid information.
    #[inline]
    pub fn unset_faces(&self) -> usize {
        self.n_unvisited_faces
    }

    /// Total number of update evaluations.
    #[inline]
    pub fn n_evals(&self) -> usize {
        self.n_evals
    }
}
