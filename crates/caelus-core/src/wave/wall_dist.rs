use fixedbitset as fb;

use super::{PatchDataWave, WaveError};
use crate::{
    config::WallDistSettings,
    field::{FieldValue, PatchField, VolField},
    mesh::{FvMesh, PatchKind},
    primitives::Vector,
};

/// The patches named in the settings, or every wall patch if none are named.
fn settings_patches(mesh: &FvMesh, settings: &WallDistSettings) -> Result<fb::FixedBitSet, WaveError> {
    if settings.patches.is_empty() {
        Ok(wall_patches(mesh))
    } else {
        Ok(mesh.patch_set(&settings.patches)?)
    }
}

fn wall_patches(mesh: &FvMesh) -> fb::FixedBitSet {
    mesh.patch_set_where(|kind| *kind == PatchKind::Wall)
}

/// Per-patch lists with `f` applied to the selected patches
/// and empty lists elsewhere.
fn selected_values<T>(
    mesh: &FvMesh,
    patch_ids: &fb::FixedBitSet,
    f: impl Fn(usize) -> Vec<T>,
) -> Vec<Vec<T>> {
    (0..mesh.patches().len())
        .map(|p| if patch_ids.contains(p) { f(p) } else { Vec::new() })
        .collect()
}

/// Assemble a field from wave results, with calculated patch values.
fn wave_field<T: FieldValue>(
    mesh: &FvMesh,
    name: &str,
    internal: &[T],
    patch_values: &[Vec<T>],
) -> VolField<T> {
    let boundary = patch_values
        .iter()
        .map(|values| PatchField::calculated(values.clone()))
        .collect();
    VolField::new(mesh, name, internal.to_vec(), boundary)
}

//
// distance only
//

/// Distance from every cell to the nearest face of a set of patches,
/// by default the walls.
#[derive(Clone, Debug)]
pub struct WallDist {
    y: VolField<f64>,
    n_unset: usize,
}

impl WallDist {
    /// Distance to all patches of kind [`Wall`][PatchKind::Wall].
    pub fn new(mesh: &FvMesh, correct_walls: bool) -> Result<Self, WaveError> {
        Self::with_patch_set(mesh, wall_patches(mesh), correct_walls)
    }

    /// Distance to the patches with the given names.
    pub fn from_patches<S: AsRef<str>>(
        mesh: &FvMesh,
        names: &[S],
        correct_walls: bool,
    ) -> Result<Self, WaveError> {
        let patch_ids = mesh.patch_set(names)?;
        Self::with_patch_set(mesh, patch_ids, correct_walls)
    }

    /// Distance as configured in the mesh's scheme settings.
    pub fn from_settings(mesh: &FvMesh, settings: &WallDistSettings) -> Result<Self, WaveError> {
        let patch_ids = settings_patches(mesh, settings)?;
        Self::with_patch_set(mesh, patch_ids, settings.correct_walls)
    }

    fn with_patch_set(
        mesh: &FvMesh,
        patch_ids: fb::FixedBitSet,
        correct_walls: bool,
    ) -> Result<Self, WaveError> {
        let initial = selected_values(mesh, &patch_ids, |p| vec![0.0; mesh.patch(p).size]);
        let wave = PatchDataWave::new(mesh, patch_ids, &initial, correct_walls)?;
        Ok(Self {
            y: wave_field(mesh, "y", wave.distance(), wave.patch_distance()),
            n_unset: wave.n_unset(),
        })
    }

    /// The distance field.
    #[inline]
    pub fn y(&self) -> &VolField<f64> {
        &self.y
    }

    /// Take the distance field.
    #[inline]
    pub fn into_y(self) -> VolField<f64> {
        self.y
    }

    /// Number of cells and faces no patch could reach.
    #[inline]
    pub fn n_unset(&self) -> usize {
        self.n_unset
    }
}

//
// distance with data
//

/// Distance to the walls together with the value a field has
/// on the nearest wall face.
#[derive(Clone, Debug)]
pub struct WallDistData<T> {
    y: VolField<f64>,
    data: VolField<T>,
    n_unset: usize,
}

impl<T: FieldValue> WallDistData<T> {
    /// Carry the wall values of `field` into the domain.
    pub fn new(mesh: &FvMesh, field: &VolField<T>, correct_walls: bool) -> Result<Self, WaveError> {
        Self::with_patch_set(mesh, field, wall_patches(mesh), correct_walls)
    }

    /// Like [`new`][Self::new], measuring from the configured patches.
    pub fn from_settings(
        mesh: &FvMesh,
        field: &VolField<T>,
        settings: &WallDistSettings,
    ) -> Result<Self, WaveError> {
        let patch_ids = settings_patches(mesh, settings)?;
        Self::with_patch_set(mesh, field, patch_ids, settings.correct_walls)
    }

    fn with_patch_set(
        mesh: &FvMesh,
        field: &VolField<T>,
        patch_ids: fb::FixedBitSet,
        correct_walls: bool,
    ) -> Result<Self, WaveError> {
        let initial = selected_values(mesh, &patch_ids, |p| field.patch_values(p).to_vec());
        let wave = PatchDataWave::new(mesh, patch_ids, &initial, correct_walls)?;
        Ok(Self {
            y: wave_field(mesh, "y", wave.distance(), wave.patch_distance()),
            data: wave_field(mesh, field.name(), wave.cell_data(), wave.patch_data()),
            n_unset: wave.n_unset(),
        })
    }

    /// The distance field.
    #[inline]
    pub fn y(&self) -> &VolField<f64> {
        &self.y
    }

    /// The nearest wall value per cell, named after the source field.
    #[inline]
    pub fn data(&self) -> &VolField<T> {
        &self.data
    }

    /// Number of cells and faces no wall could reach.
    #[inline]
    pub fn n_unset(&self) -> usize {
        self.n_unset
    }
}

/// Distance to the walls together with the unit normal
/// of the nearest wall face.
#[derive(Clone, Debug)]
pub struct WallDistReflection {
    y: VolField<f64>,
    n: VolField<Vector>,
    n_unset: usize,
}

impl WallDistReflection {
    /// Reflection vectors from all wall patches.
    pub fn new(mesh: &FvMesh, correct_walls: bool) -> Result<Self, WaveError> {
        Self::with_patch_set(mesh, wall_patches(mesh), correct_walls)
    }

    /// Reflection vectors from the configured patches.
    pub fn from_settings(mesh: &FvMesh, settings: &WallDistSettings) -> Result<Self, WaveError> {
        let patch_ids = settings_patches(mesh, settings)?;
        Self::with_patch_set(mesh, patch_ids, settings.correct_walls)
    }

    fn with_patch_set(
        mesh: &FvMesh,
        patch_ids: fb::FixedBitSet,
        correct_walls: bool,
    ) -> Result<Self, WaveError> {
        let initial = selected_values(mesh, &patch_ids, |p| mesh.nf(p));
        let wave = PatchDataWave::new(mesh, patch_ids, &initial, correct_walls)?;
        Ok(Self {
            y: wave_field(mesh, "y", wave.distance(), wave.patch_distance()),
            n: wave_field(mesh, "n", wave.cell_data(), wave.patch_data()),
            n_unset: wave.n_unset(),
        })
    }

    /// The distance field.
    #[inline]
    pub fn y(&self) -> &VolField<f64> {
        &self.y
    }

    /// Unit normal of the nearest wall face per cell.
    #[inline]
    pub fn n(&self) -> &VolField<Vector> {
        &self.n
    }

    /// Number of cells and faces no wall could reach.
    #[inline]
    pub fn n_unset(&self) -> usize {
        self.n_unset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mesh::{cuboid_mesh, MeshError, Patch},
        primitives::constants::GREAT,
    };
    use approx::assert_relative_eq;

    fn channel() -> FvMesh {
        cuboid_mesh([4, 3, 2], [2.0, 1.5, 1.0])
            .with_patch_kind("bottom", PatchKind::Wall)
            .unwrap()
    }

    #[test]
    fn distance_to_a_flat_wall() {
        let mesh = channel();
        for correct_walls in [false, true] {
            let wd = WallDist::new(&mesh, correct_walls).unwrap();
            assert_eq!(wd.n_unset(), 0);
            assert_eq!(wd.y().name(), "y");
            for (y, c) in wd.y().internal().iter().zip(mesh.C()) {
                assert_relative_eq!(*y, c.y(), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn former_cyclic_partner_is_not_coupled() {
        let mesh = cuboid_mesh([3, 1, 1], [3.0, 1.0, 1.0])
            .with_patch_kind("left", PatchKind::Cyclic { neighbour_patch: 1 })
            .and_then(|m| m.with_patch_kind("left", PatchKind::Wall))
            .unwrap();
        let wd = WallDist::new(&mesh, true).unwrap();
        assert_eq!(wd.n_unset(), 0);
        for (y, expected) in wd.y().internal().iter().zip([0.5, 1.5, 2.5]) {
            assert_relative_eq!(*y, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn no_walls_leaves_everything_unset() {
        let mesh = cuboid_mesh([3, 2, 1], [3.0, 2.0, 1.0]);
        let wd = WallDist::new(&mesh, true).unwrap();
        let n_patch_faces: usize = mesh.patches().iter().map(|p| p.size).sum();
        assert_eq!(wd.n_unset(), mesh.n_cells() + n_patch_faces);
        for y in wd.y().internal() {
            assert_eq!(*y, GREAT);
        }
    }

    /// Two unit cubes that share no faces or points,
    /// with a wall on the -x side of the first.
    fn two_cubes() -> FvMesh {
        let mut points = Vec::new();
        let mut faces = Vec::new();
        for (cube, x0) in [0.0, 2.0].into_iter().enumerate() {
            let base = 8 * cube;
            for k in 0..2 {
                for j in 0..2 {
                    for i in 0..2 {
                        points.push(Vector::from_xyz(x0 + i as f64, j as f64, k as f64));
                    }
                }
            }
            let p = |i: usize, j: usize, k: usize| base + i + 2 * j + 4 * k;
            faces.push(vec![p(0, 0, 0), p(0, 0, 1), p(0, 1, 1), p(0, 1, 0)]);
            faces.push(vec![p(1, 0, 0), p(1, 1, 0), p(1, 1, 1), p(1, 0, 1)]);
            faces.push(vec![p(0, 0, 0), p(1, 0, 0), p(1, 0, 1), p(0, 0, 1)]);
            faces.push(vec![p(0, 1, 0), p(0, 1, 1), p(1, 1, 1), p(1, 1, 0)]);
            faces.push(vec![p(0, 0, 0), p(0, 1, 0), p(1, 1, 0), p(1, 0, 0)]);
            faces.push(vec![p(0, 0, 1), p(1, 0, 1), p(1, 1, 1), p(0, 1, 1)]);
        }
        let owner = [0; 6].into_iter().chain([1; 6]).collect();
        let patches = vec![Patch::new("wall", 0, 1), Patch::new("rest", 1, 11)];
        FvMesh::new(points, faces, owner, Vec::new(), patches)
            .unwrap()
            .with_patch_kind("wall", PatchKind::Wall)
            .unwrap()
    }

    #[test]
    fn disconnected_region_is_unset() {
        let mesh = two_cubes();
        for correct_walls in [false, true] {
            let wd = WallDist::new(&mesh, correct_walls).unwrap();
            assert_relative_eq!(wd.y().internal()[0], 0.5, epsilon = 1e-12);
            assert_eq!(wd.y().internal()[1], GREAT);
            // the second cube and its six faces
            assert_eq!(wd.n_unset(), 7);
        }
    }

    #[test]
    fn named_and_configured_patches() {
        let mesh = channel();
        let wd = WallDist::from_patches(&mesh, &["left"], true).unwrap();
        for (y, c) in wd.y().internal().iter().zip(mesh.C()) {
            assert_relative_eq!(*y, c.x(), epsilon = 1e-12);
        }

        let settings = WallDistSettings {
            correct_walls: false,
            patches: vec!["top".to_string()],
        };
        let wd = WallDist::from_settings(&mesh, &settings).unwrap();
        for (y, c) in wd.y().internal().iter().zip(mesh.C()) {
            assert_relative_eq!(*y, 1.5 - c.y(), epsilon = 1e-12);
        }

        // no names means all walls
        let wd = WallDist::from_settings(&mesh, &WallDistSettings::default()).unwrap();
        assert_relative_eq!(wd.y().internal()[0], 0.25, epsilon = 1e-12);

        assert!(matches!(
            WallDist::from_patches(&mesh, &["nowhere"], true),
            Err(WaveError::Mesh(MeshError::UnknownPatch(_)))
        ));
    }

    #[test]
    fn data_from_wall_values() {
        let mesh = channel();
        let bottom = mesh.find_patch("bottom").unwrap();
        let internal = mesh.C().iter().map(|c| c.x()).collect();
        let mut field = VolField::zero_gradient(&mesh, "T", internal);
        let wall_values = mesh.patch(bottom).range().map(|f| 10.0 + mesh.Cf()[f].x()).collect();
        field.set_patch_field(&mesh, bottom, PatchField::fixed_value(wall_values));

        let wdd = WallDistData::new(&mesh, &field, true).unwrap();
        assert_eq!(wdd.data().name(), "T");
        for (d, c) in wdd.data().internal().iter().zip(mesh.C()) {
            assert_relative_eq!(*d, 10.0 + c.x(), epsilon = 1e-12);
        }
        for (y, c) in wdd.y().internal().iter().zip(mesh.C()) {
            assert_relative_eq!(*y, c.y(), epsilon = 1e-12);
        }
    }

    #[test]
    fn reflection_vectors() {
        let mesh = channel();
        let refl = WallDistReflection::new(&mesh, true).unwrap();
        assert_eq!(refl.n().name(), "n");
        let down = -Vector::Y;
        for n in refl.n().internal() {
            assert!(n.equal(&down, 1e-12));
        }
    }
}
