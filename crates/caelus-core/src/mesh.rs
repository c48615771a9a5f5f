//! The polyhedral finite-volume mesh everything else is discretized on.
//!
//! Faces are stored in the usual finite-volume order:
//! internal faces first, each with an owner cell of lower index than its neighbour
//! and an area vector pointing from owner to neighbour,
//! followed by boundary faces grouped into contiguous patches
//! whose area vectors point out of the domain.

/// Low-level mesh construction: validation, derived geometry and test meshes.
mod mesh_construction;
/// re-export the testing meshes for use in other modules' tests
#[doc(hidden)]
pub use mesh_construction::{cuboid_mesh, line_mesh};

mod registry;
pub use registry::ObjectRegistry;

/// Geometry used for interpolating cell values to faces.
mod surface_interpolation;
use surface_interpolation::SurfaceGeometry;

//

use fixedbitset as fb;
use nalgebra_sparse as nas;

use itertools::izip;
use std::{cell::OnceCell, ops::Range};

use crate::{config::FvSchemes, primitives::Vector};

/// Errors detected while building or modifying a mesh.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// Two per-face or per-point arrays disagree in length.
    #[error("expected {expected} entries in {what}, found {found}")]
    SizeMismatch {
        /// The array with the wrong length.
        what: &'static str,
        /// The length implied by the rest of the mesh.
        expected: usize,
        /// The actual length.
        found: usize,
    },
    /// A face has fewer than three points.
    #[error("face {face} has only {n_points} points")]
    DegenerateFace {
        /// Index of the face.
        face: usize,
        /// Number of points it has.
        n_points: usize,
    },
    /// A face refers to a point that doesn't exist.
    #[error("face {face} refers to point {point} but the mesh has {n_points} points")]
    InvalidPoint {
        /// Index of the face.
        face: usize,
        /// The offending point index.
        point: usize,
        /// Number of points in the mesh.
        n_points: usize,
    },
    /// An internal face whose owner is not the lower-indexed cell.
    #[error("internal face {face} has owner {owner} not below neighbour {neighbour}")]
    OwnerNotBelowNeighbour {
        /// Index of the face.
        face: usize,
        /// Its owner cell.
        owner: usize,
        /// Its neighbour cell.
        neighbour: usize,
    },
    /// A patch doesn't start where the previous one ended.
    #[error("patch {patch:?} starts at face {start}, expected {expected}")]
    PatchNotContiguous {
        /// Name of the patch.
        patch: String,
        /// Where it starts.
        start: usize,
        /// Where it should start.
        expected: usize,
    },
    /// The patches end before the last face.
    #[error("patches cover faces up to {covered} but the mesh has {n_faces} faces")]
    BoundaryNotCovered {
        /// One past the last face covered by a patch.
        covered: usize,
        /// Number of faces in the mesh.
        n_faces: usize,
    },
    /// No patch has the given name.
    #[error("no patch named {0:?}")]
    UnknownPatch(String),
    /// A cyclic patch whose partner is missing or doesn't match.
    #[error("cyclic patch {patch:?} has an invalid partner: {reason}")]
    InvalidCyclic {
        /// Name of the patch.
        patch: String,
        /// What is wrong with the partner.
        reason: String,
    },
}

/// The kind of a boundary patch,
/// which decides how fields and algorithms treat its faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatchKind {
    /// A generic boundary with no special meaning.
    Patch,
    /// A solid wall, the default seed for wall distance computations.
    Wall,
    /// A symmetry plane.
    SymmetryPlane,
    /// Faces normal to a direction the mesh doesn't resolve (1D and 2D cases).
    /// Fields ignore these faces.
    Empty,
    /// A translational periodic boundary coupled face by face to another patch.
    Cyclic {
        /// Index of the partner patch.
        neighbour_patch: usize,
    },
}

impl PatchKind {
    /// Whether the patch is coupled to another part of the mesh.
    #[inline]
    pub fn is_coupled(&self) -> bool {
        matches!(self, Self::Cyclic { .. })
    }

    /// The partner patch if the kind is cyclic.
    #[inline]
    pub fn neighbour_patch(&self) -> Option<usize> {
        match *self {
            Self::Cyclic { neighbour_patch } => Some(neighbour_patch),
            _ => None,
        }
    }
}

/// A named, contiguous range of boundary faces.
#[derive(Clone, Debug, PartialEq)]
pub struct Patch {
    /// Name used to refer to the patch in configuration.
    pub name: String,
    /// Index of the first face.
    pub start: usize,
    /// Number of faces.
    pub size: usize,
    /// How the patch is treated.
    pub kind: PatchKind,
}

impl Patch {
    /// Create a patch of the generic kind.
    pub fn new(name: impl Into<String>, start: usize, size: usize) -> Self {
        Self {
            name: name.into(),
            start,
            size,
            kind: PatchKind::Patch,
        }
    }

    /// The range of mesh face indices in the patch.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.size
    }

    /// Shorthand for `self.kind.is_coupled()`.
    #[inline]
    pub fn is_coupled(&self) -> bool {
        self.kind.is_coupled()
    }

    /// The partner patch of a cyclic patch.
    #[inline]
    pub fn neighbour_patch(&self) -> Option<usize> {
        self.kind.neighbour_patch()
    }
}

/// A polyhedral finite-volume mesh with its derived geometry
/// and a registry of objects computed on it.
#[derive(Debug)]
pub struct FvMesh {
    points: Vec<Vector>,
    /// point indices of all faces in one flat Vec,
    /// with face `i` at `face_offsets[i]..face_offsets[i + 1]`
    face_indices: Vec<usize>,
    face_offsets: Vec<usize>,
    owner: Vec<usize>,
    neighbour: Vec<usize>,
    patches: Vec<Patch>,
    n_cells: usize,
    /// rows are cells, columns faces,
    /// values 1 where the cell owns the face and -1 where it is the neighbour
    cell_face_map: nas::CsrMatrix<i8>,
    face_centres: Vec<Vector>,
    face_areas: Vec<Vector>,
    mag_face_areas: Vec<f64>,
    cell_centres: Vec<Vector>,
    cell_volumes: Vec<f64>,
    // connectivity and geometry that not every computation needs
    // are built on first access
    point_faces: OnceCell<Vec<Vec<usize>>>,
    point_cells: OnceCell<Vec<Vec<usize>>>,
    surface_geometry: OnceCell<SurfaceGeometry>,
    registry: ObjectRegistry,
    schemes: FvSchemes,
}

impl FvMesh {
    /// Construct a mesh from points, faces given as lists of point indices,
    /// the owner cell of every face, the neighbour cell of every internal face
    /// and the boundary patches.
    ///
    /// The first `neighbour.len()` faces are internal
    /// and the patches must cover the rest contiguously in order.
    pub fn new(
        points: Vec<Vector>,
        faces: Vec<Vec<usize>>,
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        patches: Vec<Patch>,
    ) -> Result<Self, MeshError> {
        mesh_construction::build_mesh(points, faces, owner, neighbour, patches)
    }

    /// Attach scheme settings to the mesh,
    /// enabling caching for the objects they list.
    pub fn with_schemes(mut self, schemes: FvSchemes) -> Self {
        for name in &schemes.cache {
            self.registry.set_cached(name, true);
        }
        self.schemes = schemes;
        self
    }

    /// Change the kind of the patch with the given name.
    ///
    /// Making a patch cyclic also makes its partner cyclic,
    /// pointing back to this patch.
    /// A partner the patch was coupled to before becomes a plain [`Patch`][PatchKind::Patch].
    pub fn with_patch_kind(mut self, name: &str, kind: PatchKind) -> Result<Self, MeshError> {
        let patch_id = self
            .find_patch(name)
            .ok_or_else(|| MeshError::UnknownPatch(name.to_string()))?;
        let invalid = |reason: String| MeshError::InvalidCyclic {
            patch: name.to_string(),
            reason,
        };

        if let PatchKind::Cyclic { neighbour_patch } = kind {
            let Some(partner) = self.patches.get(neighbour_patch) else {
                return Err(invalid(format!("patch index {neighbour_patch} out of range")));
            };
            if neighbour_patch == patch_id {
                return Err(invalid("a patch can't be its own partner".to_string()));
            }
            if partner.size != self.patches[patch_id].size {
                return Err(invalid(format!(
                    "partner {:?} has {} faces, expected {}",
                    partner.name, partner.size, self.patches[patch_id].size
                )));
            }
            if let Some(other) = partner.neighbour_patch() {
                if other != patch_id {
                    return Err(invalid(format!(
                        "partner {:?} is already coupled to {:?}",
                        partner.name, self.patches[other].name
                    )));
                }
            }
        }

        if let Some(old_partner) = self.patches[patch_id].neighbour_patch() {
            if kind.neighbour_patch() != Some(old_partner) {
                log::debug!(
                    "Uncoupling {:?} from {:?}",
                    self.patches[old_partner].name,
                    name
                );
                self.patches[old_partner].kind = PatchKind::Patch;
            }
        }
        if let PatchKind::Cyclic { neighbour_patch } = kind {
            self.patches[neighbour_patch].kind = PatchKind::Cyclic {
                neighbour_patch: patch_id,
            };
        }
        self.patches[patch_id].kind = kind;
        // weights and deltas depend on coupling
        self.surface_geometry = OnceCell::new();
        Ok(self)
    }

    //
    // sizes and connectivity
    //

    /// Number of cells.
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// Number of faces, internal and boundary.
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.owner.len()
    }

    /// Number of internal faces.
    #[inline]
    pub fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }

    /// Number of points.
    #[inline]
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    /// The mesh points.
    #[inline]
    pub fn points(&self) -> &[Vector] {
        &self.points
    }

    /// Owner cell of every face.
    #[inline]
    pub fn owner(&self) -> &[usize] {
        &self.owner
    }

    /// Neighbour cell of every internal face.
    #[inline]
    pub fn neighbour(&self) -> &[usize] {
        &self.neighbour
    }

    /// The boundary patches in face order.
    #[inline]
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// The patch with the given index.
    #[inline]
    pub fn patch(&self, patch_id: usize) -> &Patch {
        &self.patches[patch_id]
    }

    /// Find the index of a patch by name.
    pub fn find_patch(&self, name: &str) -> Option<usize> {
        self.patches.iter().position(|p| p.name == name)
    }

    /// The set of patches with the given names.
    pub fn patch_set<S: AsRef<str>>(&self, names: &[S]) -> Result<fb::FixedBitSet, MeshError> {
        let mut set = fb::FixedBitSet::with_capacity(self.patches.len());
        for name in names {
            let name = name.as_ref();
            let id = self
                .find_patch(name)
                .ok_or_else(|| MeshError::UnknownPatch(name.to_string()))?;
            set.insert(id);
        }
        Ok(set)
    }

    /// The set of patches whose kind satisfies a predicate.
    pub fn patch_set_where(&self, pred: impl Fn(&PatchKind) -> bool) -> fb::FixedBitSet {
        let mut set = fb::FixedBitSet::with_capacity(self.patches.len());
        for (id, patch) in self.patches.iter().enumerate() {
            set.set(id, pred(&patch.kind));
        }
        set
    }

    /// The cells next to the faces of a patch.
    #[inline]
    pub fn face_cells(&self, patch_id: usize) -> &[usize] {
        &self.owner[self.patches[patch_id].range()]
    }

    /// The faces of a cell, sorted by index.
    #[inline]
    pub fn cell_faces(&self, cell: usize) -> &[usize] {
        self.cell_face_map.pattern().lane(cell)
    }

    /// The faces of a cell together with their orientation relative to it:
    /// 1 if the face points out of the cell, -1 if it points in.
    pub fn cell_faces_oriented(&self, cell: usize) -> impl Iterator<Item = (usize, i8)> + '_ {
        let offsets = self.cell_face_map.row_offsets();
        let values = &self.cell_face_map.values()[offsets[cell]..offsets[cell + 1]];
        izip!(self.cell_faces(cell), values).map(|(&f, &o)| (f, o))
    }

    /// The point indices of a face in order.
    #[inline]
    pub fn face_points(&self, face: usize) -> &[usize] {
        &self.face_indices[self.face_offsets[face]..self.face_offsets[face + 1]]
    }

    /// The faces touching each point, built on first access.
    pub fn point_faces(&self) -> &[Vec<usize>] {
        self.point_faces.get_or_init(|| {
            let mut pf = vec![Vec::new(); self.points.len()];
            for face in 0..self.n_faces() {
                for &p in self.face_points(face) {
                    pf[p].push(face);
                }
            }
            pf
        })
    }

    /// The cells touching each point, sorted and built on first access.
    pub fn point_cells(&self) -> &[Vec<usize>] {
        self.point_cells.get_or_init(|| {
            self.point_faces()
                .iter()
                .map(|faces| {
                    let mut cells: Vec<usize> = faces
                        .iter()
                        .flat_map(|&f| {
                            std::iter::once(self.owner[f]).chain(self.neighbour.get(f).copied())
                        })
                        .collect();
                    cells.sort_unstable();
                    cells.dedup();
                    cells
                })
                .collect()
        })
    }

    /// The patch a boundary face belongs to, with its index within the patch.
    pub fn which_patch(&self, face: usize) -> Option<(usize, usize)> {
        if face < self.n_internal_faces() {
            return None;
        }
        self.patches
            .iter()
            .position(|p| p.range().contains(&face))
            .map(|id| (id, face - self.patches[id].start))
    }

    /// The face a cyclic boundary face is coupled to.
    pub fn coupled_face(&self, face: usize) -> Option<usize> {
        let (patch_id, local) = self.which_patch(face)?;
        let nbr = self.patches[patch_id].neighbour_patch()?;
        Some(self.patches[nbr].start + local)
    }

    //
    // geometry
    //

    /// Cell centres.
    #[allow(non_snake_case)]
    #[inline]
    pub fn C(&self) -> &[Vector] {
        &self.cell_centres
    }

    /// Face centres.
    #[allow(non_snake_case)]
    #[inline]
    pub fn Cf(&self) -> &[Vector] {
        &self.face_centres
    }

    /// Face area vectors.
    #[allow(non_snake_case)]
    #[inline]
    pub fn Sf(&self) -> &[Vector] {
        &self.face_areas
    }

    /// Face area magnitudes.
    #[allow(non_snake_case)]
    #[inline]
    pub fn magSf(&self) -> &[f64] {
        &self.mag_face_areas
    }

    /// Cell volumes.
    #[allow(non_snake_case)]
    #[inline]
    pub fn V(&self) -> &[f64] {
        &self.cell_volumes
    }

    /// Unit normal of a face.
    #[inline]
    pub fn face_normal(&self, face: usize) -> Vector {
        self.face_areas[face] / self.mag_face_areas[face]
    }

    /// Unit outward normals of the faces of a patch.
    pub fn nf(&self, patch_id: usize) -> Vec<Vector> {
        self.patches[patch_id]
            .range()
            .map(|f| self.face_normal(f))
            .collect()
    }

    //
    // surface interpolation geometry
    //

    fn surface_geometry(&self) -> &SurfaceGeometry {
        self.surface_geometry
            .get_or_init(|| surface_interpolation::compute(self))
    }

    /// Central-differencing weights of all faces:
    /// the fraction of the face value taken from the owner cell.
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.surface_geometry().weights
    }

    /// Owner-to-neighbour cell centre deltas of all faces.
    /// On uncoupled boundary faces these are face centre minus cell centre.
    #[inline]
    pub fn deltas(&self) -> &[Vector] {
        &self.surface_geometry().deltas
    }

    /// Inverse lengths of the deltas.
    #[inline]
    pub fn delta_coeffs(&self) -> &[f64] {
        &self.surface_geometry().delta_coeffs
    }

    /// Inverse of the delta projected on the face normal,
    /// bounded away from zero for strongly non-orthogonal faces.
    #[inline]
    pub fn non_orth_delta_coeffs(&self) -> &[f64] {
        &self.surface_geometry().non_orth_delta_coeffs
    }

    /// The part of the face normal not aligned with the delta,
    /// zero on uncoupled boundary faces.
    #[inline]
    pub fn non_orth_correction_vectors(&self) -> &[Vector] {
        &self.surface_geometry().non_orth_correction_vectors
    }

    //
    // objects
    //

    /// The registry of objects stored on the mesh.
    #[inline]
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Whether the object with the given name should be cached.
    #[inline]
    pub fn cache(&self, name: &str) -> bool {
        self.registry.cache(name)
    }

    /// The scheme settings of the mesh.
    #[inline]
    pub fn schemes(&self) -> &FvSchemes {
        &self.schemes
    }
}
