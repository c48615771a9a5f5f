use super::WaveInfo;
use crate::{
    mesh::{FvMesh, Patch},
    primitives::{
        constants::{GREAT, SMALL, VGREAT},
        Vector,
    },
};

/// The nearest wall point found so far, its squared distance
/// and data carried from the wall.
#[derive(Clone, Debug, PartialEq)]
pub struct WallPointData<T> {
    origin: Vector,
    dist_sqr: f64,
    data: T,
}

impl<T: Default> Default for WallPointData<T> {
    fn default() -> Self {
        Self::unset(T::default())
    }
}

impl<T> WallPointData<T> {
    /// Information from a wall point at `origin`.
    pub fn new(origin: Vector, data: T, dist_sqr: f64) -> Self {
        Self {
            origin,
            dist_sqr,
            data,
        }
    }

    /// Information not yet reached by any wall.
    pub fn unset(data: T) -> Self {
        Self {
            origin: Vector::uniform(VGREAT),
            dist_sqr: -GREAT,
            data,
        }
    }

    /// The nearest wall point.
    #[inline]
    pub fn origin(&self) -> &Vector {
        &self.origin
    }

    /// Squared distance to the nearest wall point,
    /// negative if unset.
    #[inline]
    pub fn dist_sqr(&self) -> f64 {
        self.dist_sqr
    }

    /// Data of the nearest wall point.
    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }
}

impl<T: Clone> WallPointData<T> {
    /// Take the other's wall point if it's closer to `pt` by more than `tol`.
    fn update(&mut self, pt: &Vector, w2: &Self, tol: f64) -> bool {
        let dist2 = (*pt - w2.origin).mag_sqr();

        if self.is_valid() {
            let diff = self.dist_sqr - dist2;
            if diff < 0.0 {
                // already nearer
                return false;
            }
            if diff < SMALL || (self.dist_sqr > SMALL && diff / self.dist_sqr < tol) {
                // don't propagate small changes
                return false;
            }
        }

        self.dist_sqr = dist2;
        self.origin = w2.origin;
        self.data = w2.data.clone();
        true
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.dist_sqr > -SMALL
    }
}

impl<T: Clone> WaveInfo for WallPointData<T> {
    fn valid(&self) -> bool {
        self.is_valid()
    }

    fn update_cell(
        &mut self,
        mesh: &FvMesh,
        cell: usize,
        _nbr_face: usize,
        nbr_info: &Self,
        tol: f64,
    ) -> bool {
        self.update(&mesh.C()[cell], nbr_info, tol)
    }

    fn update_face_from_cell(
        &mut self,
        mesh: &FvMesh,
        face: usize,
        _nbr_cell: usize,
        nbr_info: &Self,
        tol: f64,
    ) -> bool {
        self.update(&mesh.Cf()[face], nbr_info, tol)
    }

    fn update_face(&mut self, mesh: &FvMesh, face: usize, nbr_info: &Self, tol: f64) -> bool {
        self.update(&mesh.Cf()[face], nbr_info, tol)
    }

    fn equal(&self, other: &Self) -> bool {
        self.origin == other.origin
    }

    fn leave_domain(&mut self, _mesh: &FvMesh, _patch: &Patch, face_centre: &Vector) {
        self.origin -= *face_centre;
    }

    fn enter_domain(&mut self, _mesh: &FvMesh, _patch: &Patch, face_centre: &Vector) {
        self.origin += *face_centre;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::cuboid_mesh;

    #[test]
    fn nearer_points_win() {
        let mesh = cuboid_mesh([1, 1, 1], [1.0, 1.0, 1.0]);
        let mut info = WallPointData::<u8>::default();
        assert!(!info.valid());

        let far = WallPointData::new(Vector::from_xyz(0.5, 0.5, 3.5), 1, 0.0);
        assert!(info.update_cell(&mesh, 0, 0, &far, 0.01));
        assert!(info.valid());
        assert_eq!(info.dist_sqr(), 9.0);
        assert_eq!(*info.data(), 1);

        let near = WallPointData::new(Vector::from_xyz(0.5, 0.5, 1.5), 2, 0.0);
        assert!(info.update_cell(&mesh, 0, 0, &near, 0.01));
        assert_eq!(info.dist_sqr(), 1.0);
        assert!(!info.update_cell(&mesh, 0, 0, &far, 0.01));

        // less than 1% nearer isn't worth propagating
        let barely = WallPointData::new(Vector::from_xyz(0.5, 0.5, 1.499), 3, 0.0);
        assert!(!info.update_cell(&mesh, 0, 0, &barely, 0.01));
        assert_eq!(*info.data(), 2);
        assert!(info.equal(&WallPointData::new(*near.origin(), 7, 5.0)));
    }

    #[test]
    fn relative_origin_across_patches() {
        let mesh = cuboid_mesh([1, 1, 1], [1.0, 1.0, 1.0]);
        let mut info = WallPointData::new(Vector::from_xyz(1.0, 0.5, 0.5), 0.0, 0.0);
        let fc = Vector::from_xyz(1.0, 0.5, 0.5);
        info.leave_domain(&mesh, mesh.patch(1), &fc);
        assert_eq!(*info.origin(), Vector::zero());
        info.enter_domain(&mesh, mesh.patch(0), &Vector::from_xyz(0.0, 0.5, 0.5));
        assert_eq!(*info.origin(), Vector::from_xyz(0.0, 0.5, 0.5));
    }
}
