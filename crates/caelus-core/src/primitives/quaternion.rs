//! Quaternions for representing rotations.

use std::{
    fmt,
    ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use super::{
    tensor::Tensor,
    vector::Vector,
    vector_space::{strip_parens, InnerProduct},
    ParseError,
};

/// A quaternion `w + v`, with `w` the scalar part and `v` the vector part.
///
/// Rotations are represented by unit quaternions;
/// composition of rotations is the Hamilton product `q1 * q2`,
/// which applies `q2` first when acting on vectors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    /// Scalar part.
    pub w: f64,
    /// Vector part.
    pub v: Vector,
}

/// The order in which Euler angles are applied,
/// named by the axes of the three successive rotations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RotationSequence {
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    ZYX,
    XYX,
    XZX,
    YXY,
    YZY,
    ZXZ,
    ZYZ,
}

impl RotationSequence {
    /// All twelve sequences.
    pub const ALL: [RotationSequence; 12] = [
        Self::XYZ,
        Self::XZY,
        Self::YXZ,
        Self::YZX,
        Self::ZXY,
        Self::ZYX,
        Self::XYX,
        Self::XZX,
        Self::YXY,
        Self::YZY,
        Self::ZXZ,
        Self::ZYZ,
    ];

    /// Axis indices of the three rotations.
    pub fn axes(self) -> [usize; 3] {
        use RotationSequence::*;
        match self {
            XYZ => [0, 1, 2],
            XZY => [0, 2, 1],
            YXZ => [1, 0, 2],
            YZX => [1, 2, 0],
            ZXY => [2, 0, 1],
            ZYX => [2, 1, 0],
            XYX => [0, 1, 0],
            XZX => [0, 2, 0],
            YXY => [1, 0, 1],
            YZY => [1, 2, 1],
            ZXZ => [2, 0, 2],
            ZYZ => [2, 1, 2],
        }
    }
}

fn unit_axis(i: usize) -> Vector {
    Vector::from_fn(|j| if i == j { 1.0 } else { 0.0 })
}

impl Quaternion {
    /// Construct from scalar and vector parts.
    #[inline]
    pub const fn new(w: f64, v: Vector) -> Self {
        Self { w, v }
    }

    /// The identity rotation.
    #[inline]
    pub fn identity() -> Self {
        Self::new(1.0, Vector::zero())
    }

    /// A pure quaternion with zero scalar part.
    #[inline]
    pub fn pure(v: Vector) -> Self {
        Self::new(0.0, v)
    }

    /// Rotation by `theta` radians about `axis`.
    pub fn from_axis_angle(axis: &Vector, theta: f64) -> Self {
        let half = 0.5 * theta;
        Self::new(half.cos(), axis.normalised() * half.sin())
    }

    /// Rotation described by successive rotations about the axes of `seq`
    /// by the corresponding components of `angles`.
    pub fn from_euler(seq: RotationSequence, angles: &Vector) -> Self {
        let [a, b, c] = seq.axes();
        Self::from_axis_angle(&unit_axis(a), angles.x())
            * Self::from_axis_angle(&unit_axis(b), angles.y())
            * Self::from_axis_angle(&unit_axis(c), angles.z())
    }

    /// The unit quaternion corresponding to a rotation tensor.
    pub fn from_rotation_tensor(r: &Tensor) -> Self {
        let trace = r.tr();
        if trace > 0.0 {
            let s = 0.5 / (trace + 1.0).sqrt();
            Self::new(
                0.25 / s,
                Vector::from_xyz(
                    (r.zy() - r.yz()) * s,
                    (r.xz() - r.zx()) * s,
                    (r.yx() - r.xy()) * s,
                ),
            )
        } else if r.xx() > r.yy() && r.xx() > r.zz() {
            let s = 2.0 * (1.0 + r.xx() - r.yy() - r.zz()).sqrt();
            Self::new(
                (r.zy() - r.yz()) / s,
                Vector::from_xyz(0.25 * s, (r.xy() + r.yx()) / s, (r.xz() + r.zx()) / s),
            )
        } else if r.yy() > r.zz() {
            let s = 2.0 * (1.0 + r.yy() - r.xx() - r.zz()).sqrt();
            Self::new(
                (r.xz() - r.zx()) / s,
                Vector::from_xyz((r.xy() + r.yx()) / s, 0.25 * s, (r.yz() + r.zy()) / s),
            )
        } else {
            let s = 2.0 * (1.0 + r.zz() - r.xx() - r.yy()).sqrt();
            Self::new(
                (r.yx() - r.xy()) / s,
                Vector::from_xyz((r.xz() + r.zx()) / s, (r.yz() + r.zy()) / s, 0.25 * s),
            )
        }
    }

    /// Squared magnitude.
    #[inline]
    pub fn mag_sqr(&self) -> f64 {
        self.w * self.w + self.v.mag_sqr()
    }

    /// Magnitude.
    #[inline]
    pub fn mag(&self) -> f64 {
        self.mag_sqr().sqrt()
    }

    /// This quaternion scaled to unit magnitude.
    #[inline]
    pub fn normalised(&self) -> Self {
        *self / self.mag()
    }

    /// Four-component dot product.
    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.w * other.w + self.v.dot(&other.v)
    }

    /// Conjugate `w - v`.
    #[inline]
    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.v)
    }

    /// Multiplicative inverse.
    #[inline]
    pub fn inv(&self) -> Self {
        self.conjugate() / self.mag_sqr()
    }

    /// The rotation tensor of a unit quaternion.
    pub fn r(&self) -> Tensor {
        let w2 = self.w * self.w;
        let x2 = self.v.x() * self.v.x();
        let y2 = self.v.y() * self.v.y();
        let z2 = self.v.z() * self.v.z();

        let txy = 2.0 * self.v.x() * self.v.y();
        let twz = 2.0 * self.w * self.v.z();
        let txz = 2.0 * self.v.x() * self.v.z();
        let twy = 2.0 * self.w * self.v.y();
        let tyz = 2.0 * self.v.y() * self.v.z();
        let twx = 2.0 * self.w * self.v.x();

        Tensor::from_cmpts(
            w2 + x2 - y2 - z2,
            txy - twz,
            txz + twy,
            txy + twz,
            w2 - x2 + y2 - z2,
            tyz - twx,
            txz - twy,
            tyz + twx,
            w2 - x2 - y2 + z2,
        )
    }

    /// Rotate a vector.
    #[inline]
    pub fn transform(&self, u: &Vector) -> Vector {
        self.r().inner(u)
    }

    /// Apply the inverse rotation to a vector.
    #[inline]
    pub fn inv_transform(&self, u: &Vector) -> Vector {
        self.r().t().inner(u)
    }

    /// The angles that reproduce this rotation with [`from_euler`][Self::from_euler].
    ///
    /// For the symmetric sequences (e.g. `ZXZ`) the middle angle is in `[0, π]`,
    /// otherwise in `[-π/2, π/2]`.
    pub fn euler_angles(&self, seq: RotationSequence) -> Vector {
        let r = self.normalised().r();
        let [i, j, k] = seq.axes();
        // sign of the axis permutation
        let p = if j == (i + 1) % 3 { 1.0 } else { -1.0 };

        if i == k {
            let k = 3 - i - j;
            let beta = r.at(i, i).clamp(-1.0, 1.0).acos();
            let alpha = r.at(j, i).atan2(-p * r.at(k, i));
            let gamma = r.at(i, j).atan2(p * r.at(i, k));
            Vector::from_xyz(alpha, beta, gamma)
        } else {
            let beta = (p * r.at(i, k)).clamp(-1.0, 1.0).asin();
            let alpha = (-p * r.at(j, k)).atan2(r.at(k, k));
            let gamma = (-p * r.at(i, j)).atan2(r.at(i, i));
            Vector::from_xyz(alpha, beta, gamma)
        }
    }

    /// Exponential.
    pub fn exp(&self) -> Self {
        let mag_v = self.v.mag();
        let exp_w = self.w.exp();
        if mag_v == 0.0 {
            return Self::new(exp_w, Vector::zero());
        }
        Self::new(exp_w * mag_v.cos(), self.v * (exp_w * mag_v.sin() / mag_v))
    }

    /// Natural logarithm.
    pub fn log(&self) -> Self {
        let mag_q = self.mag();
        let mag_v = self.v.mag();
        let mut log_q = Self::new(mag_q.ln(), Vector::zero());
        if mag_v > 0.0 {
            log_q.v = self.v * ((self.w / mag_q).clamp(-1.0, 1.0).acos() / mag_v);
        }
        log_q
    }

    /// Real power.
    pub fn pow(&self, power: f64) -> Self {
        let mag_q = self.mag();
        let mag_v = self.v.mag();
        if mag_v == 0.0 || mag_q == 0.0 {
            return Self::new(self.w.powf(power), self.v);
        }
        let angle = power * (self.w / mag_q).clamp(-1.0, 1.0).acos();
        let mag_q_pow = mag_q.powf(power);
        Self::new(
            mag_q_pow * angle.cos(),
            self.v * (mag_q_pow * angle.sin() / mag_v),
        )
    }

    /// Spherical linear interpolation from `a` at `t = 0` to `b` at `t = 1`,
    /// along the shorter arc.
    pub fn slerp(a: &Self, b: &Self, t: f64) -> Self {
        let b = if a.dot(b) < 0.0 { -*b } else { *b };
        *a * (a.inv() * b).pow(t)
    }

    /// Weighted average of rotations, aligning signs with the first one.
    ///
    /// Returns `None` for an empty input
    /// or when there isn't exactly one weight per rotation.
    pub fn average(qs: &[Self], weights: &[f64]) -> Option<Self> {
        if qs.len() != weights.len() {
            return None;
        }
        let (first, rest) = qs.split_first()?;
        let mut sum = *first * weights[0];
        for (q, &w) in rest.iter().zip(&weights[1..]) {
            if q.dot(first) < 0.0 {
                sum -= *q * w;
            } else {
                sum += *q * w;
            }
        }
        Some(sum.normalised())
    }
}

impl Mul for Quaternion {
    type Output = Self;
    /// Hamilton product.
    #[inline]
    fn mul(self, q: Self) -> Self {
        Self::new(
            self.w * q.w - self.v.dot(&q.v),
            q.v * self.w + self.v * q.w + self.v.cross(&q.v),
        )
    }
}

impl MulAssign for Quaternion {
    #[inline]
    fn mul_assign(&mut self, q: Self) {
        *self = *self * q;
    }
}

impl Mul<f64> for Quaternion {
    type Output = Self;
    #[inline]
    fn mul(self, s: f64) -> Self {
        Self::new(self.w * s, self.v * s)
    }
}

impl Mul<Quaternion> for f64 {
    type Output = Quaternion;
    #[inline]
    fn mul(self, q: Quaternion) -> Quaternion {
        q * self
    }
}

impl Div<f64> for Quaternion {
    type Output = Self;
    #[inline]
    fn div(self, s: f64) -> Self {
        Self::new(self.w / s, self.v / s)
    }
}

impl Add for Quaternion {
    type Output = Self;
    #[inline]
    fn add(self, q: Self) -> Self {
        Self::new(self.w + q.w, self.v + q.v)
    }
}

impl AddAssign for Quaternion {
    #[inline]
    fn add_assign(&mut self, q: Self) {
        *self = *self + q;
    }
}

impl Sub for Quaternion {
    type Output = Self;
    #[inline]
    fn sub(self, q: Self) -> Self {
        Self::new(self.w - q.w, self.v - q.v)
    }
}

impl SubAssign for Quaternion {
    #[inline]
    fn sub_assign(&mut self, q: Self) {
        *self = *self - q;
    }
}

impl Neg for Quaternion {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.w, -self.v)
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.w, self.v)
    }
}

impl FromStr for Quaternion {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = strip_parens(s)?;
        let split = inner.find('(').ok_or_else(|| ParseError::MissingDelimiter {
            expected: '(',
            input: inner.to_string(),
        })?;
        let w_text = inner[..split].trim();
        let w = w_text
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidNumber(w_text.to_string()))?;
        let v = inner[split..].parse::<Vector>()?;
        Ok(Self::new(w, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_quat_eq(a: &Quaternion, b: &Quaternion) {
        assert!(
            (*a - *b).mag() < 1e-10,
            "quaternions differ: {a} vs {b}"
        );
    }

    #[test]
    fn axis_angle_rotates_by_angle() {
        let q = Quaternion::from_axis_angle(&Vector::Z, FRAC_PI_2);
        let rotated = q.transform(&Vector::X);
        assert!(rotated.dot(&Vector::Y) > 1.0 - 1e-6, "got {rotated}");

        // a third of a turn about the diagonal cycles the axes
        let diag = Vector::from_xyz(1.0, 1.0, 1.0);
        let q = Quaternion::from_axis_angle(&diag, 2.0 * PI / 3.0);
        assert!(q.transform(&Vector::X).dot(&Vector::Y) > 1.0 - 1e-6);
        assert!(q.transform(&Vector::Y).dot(&Vector::Z) > 1.0 - 1e-6);

        // general angle about a general axis, checked against Rodrigues' formula
        let axis = Vector::from_xyz(0.3, -0.4, 0.866).normalised();
        let theta: f64 = 0.7;
        let u = Vector::from_xyz(0.2, 0.9, -0.1);
        let expected = u * theta.cos()
            + axis.cross(&u) * theta.sin()
            + axis * (axis.dot(&u) * (1.0 - theta.cos()));
        let q = Quaternion::from_axis_angle(&axis, theta);
        assert!(q.transform(&u).equal(&expected, 1e-6));
        assert!(q.inv_transform(&q.transform(&u)).equal(&u, 1e-12));
    }

    #[test]
    fn hamilton_product_composes_rotations() {
        let a = Quaternion::from_axis_angle(&Vector::X, 0.4);
        let b = Quaternion::from_axis_angle(&Vector::Y, -1.1);
        let composed = (a * b).r();
        assert!(composed.equal(&a.r().inner(&b.r()), 1e-12));
        assert_quat_eq(&(a * a.inv()), &Quaternion::identity());
    }

    #[test]
    fn rotation_tensor_round_trip() {
        for (axis, theta) in [
            (Vector::X, 0.3),
            (Vector::from_xyz(1.0, 2.0, -0.5), 2.9),
            (Vector::Y, PI - 0.01),
            (Vector::Z, -2.5),
        ] {
            let q = Quaternion::from_axis_angle(&axis, theta);
            let back = Quaternion::from_rotation_tensor(&q.r());
            let back = if back.dot(&q) < 0.0 { -back } else { back };
            assert_quat_eq(&back, &q);
        }
    }

    #[test]
    fn euler_angle_round_trip() {
        let angles = Vector::from_xyz(0.3, 0.5, -0.7);
        for seq in RotationSequence::ALL {
            let q = Quaternion::from_euler(seq, &angles);
            let recovered = q.euler_angles(seq);
            assert!(
                recovered.equal(&angles, 1e-10),
                "{seq:?}: got {recovered}"
            );
        }
    }

    #[test]
    fn exp_log_pow_slerp() {
        let q = Quaternion::from_axis_angle(&Vector::from_xyz(0.0, 1.0, 1.0), 1.2);
        assert_quat_eq(&q.log().exp(), &q);
        assert_quat_eq(&q.pow(2.0), &(q * q));
        assert_quat_eq(&q.pow(1.0), &q);

        let a = Quaternion::from_axis_angle(&Vector::Z, 0.2);
        let b = Quaternion::from_axis_angle(&Vector::Z, 1.0);
        assert_quat_eq(&Quaternion::slerp(&a, &b, 0.0), &a);
        assert_quat_eq(&Quaternion::slerp(&a, &b, 1.0), &b);
        let mid = Quaternion::slerp(&a, &b, 0.5);
        assert_quat_eq(&mid, &Quaternion::from_axis_angle(&Vector::Z, 0.6));
        // the sign flip picks the short way round
        let mid_neg = Quaternion::slerp(&a, &(-b), 0.5);
        assert_quat_eq(&mid_neg, &mid);
    }

    #[test]
    fn average_of_sign_flipped_rotations() {
        let q = Quaternion::from_axis_angle(&Vector::X, 0.5);
        let avg = Quaternion::average(&[q, -q], &[0.5, 0.5]).unwrap();
        assert_quat_eq(&avg, &q);
        assert!(Quaternion::average(&[], &[]).is_none());
        assert!(Quaternion::average(&[q, q], &[]).is_none());
        assert!(Quaternion::average(&[q], &[0.5, 0.5]).is_none());
    }

    #[test]
    fn text_round_trip() {
        let q = Quaternion::new(0.5, Vector::from_xyz(1.0, -2.0, 0.25));
        let text = q.to_string();
        assert_eq!(text, "(0.5 (1 -2 0.25))");
        assert_eq!(text.parse::<Quaternion>().unwrap(), q);
        assert!("(0.5 1 2 3)".parse::<Quaternion>().is_err());
        assert_relative_eq!(q.normalised().mag(), 1.0, epsilon = 1e-14);
    }
}
