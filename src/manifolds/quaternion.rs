//! Unit quaternion value type
//!
//! Components are stored scalar-first as `(w, x, y, z)` and multiplied with
//! the Hamilton convention (`i² = j² = k² = ijk = −1`). A unit quaternion
//! double-covers SO(3): `q` and `−q` encode the same rotation.

use std::f64::consts::PI;
use std::fmt;
use std::ops::{Mul, Neg};

use ndarray::{arr1, Array1};
use ndarray_linalg::Norm;
use rand::Rng;

use crate::core::{Error, Result};

/// Maximum deviation of the Euclidean norm from 1 accepted for a unit quaternion
pub const UNIT_NORM_TOLERANCE: f64 = 1e-9;

/// Rotation angles below this are treated as exactly zero
pub(crate) const SMALL_ANGLE: f64 = 1e-12;

/// Rotation encoded as a unit-norm quaternion `(w, x, y, z)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitQuaternion {
    w: f64,
    x: f64,
    y: f64,
    z: f64,
}

impl UnitQuaternion {
    /// Create a unit quaternion, failing if the norm is not 1 within
    /// [`UNIT_NORM_TOLERANCE`]
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Result<Self> {
        let q = Self::new_unchecked(w, x, y, z);
        if !q.is_unit(UNIT_NORM_TOLERANCE) {
            return Err(Error::NotOnManifold(format!(
                "quaternion is not unit norm: ||q|| = {}",
                q.norm()
            )));
        }
        Ok(q)
    }

    /// Create a unit quaternion by normalizing the given components
    pub fn new_normalize(w: f64, x: f64, y: f64, z: f64) -> Result<Self> {
        let norm = (w * w + x * x + y * y + z * z).sqrt();
        if !norm.is_finite() || norm < 1e-10 {
            return Err(Error::ComputationFailed(format!(
                "cannot normalize quaternion with norm {}",
                norm
            )));
        }
        Ok(Self::new_unchecked(w / norm, x / norm, y / norm, z / norm))
    }

    /// Wrap components without checking the norm
    ///
    /// Statistics entry points validate their inputs, so a quaternion built
    /// this way is rejected there if it is not unit norm.
    pub const fn new_unchecked(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation
    pub const fn identity() -> Self {
        Self::new_unchecked(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation by `angle` radians about `axis` (need not be normalized)
    pub fn from_axis_angle(axis: &Array1<f64>, angle: f64) -> Result<Self> {
        if axis.len() != 3 {
            return Err(Error::DimensionMismatch {
                expected: 3,
                got: axis.len(),
            });
        }
        let axis_norm = axis.norm_l2();
        if axis_norm < 1e-10 {
            return Err(Error::InvalidParameter(
                "rotation axis must be non-zero".to_string(),
            ));
        }
        Ok(Self::from_rotation_vector_unchecked(&(axis * (angle / axis_norm))))
    }

    /// Rotation encoded by a rotation vector (axis scaled by angle)
    pub fn from_rotation_vector(v: &Array1<f64>) -> Result<Self> {
        if v.len() != 3 {
            return Err(Error::DimensionMismatch {
                expected: 3,
                got: v.len(),
            });
        }
        Ok(Self::from_rotation_vector_unchecked(v))
    }

    /// `(cos(θ/2), n̂ sin(θ/2))` with θ = |v|; identity for a zero vector
    pub(crate) fn from_rotation_vector_unchecked(v: &Array1<f64>) -> Self {
        let theta = v.norm_l2();
        if theta < SMALL_ANGLE {
            return Self::identity();
        }
        let half = 0.5 * theta;
        let s = half.sin() / theta;
        Self::new_unchecked(half.cos(), v[0] * s, v[1] * s, v[2] * s)
    }

    /// Rotation vector of the shorter of `q` / `−q`, magnitude in [0, π]
    pub fn to_rotation_vector(&self) -> Array1<f64> {
        let q = self.canonical();
        let vec_norm = (q.x * q.x + q.y * q.y + q.z * q.z).sqrt();
        // angle / |vec| → 2 / w as the angle goes to zero
        let scale = if vec_norm < SMALL_ANGLE {
            2.0 / q.w
        } else {
            2.0 * vec_norm.atan2(q.w) / vec_norm
        };
        arr1(&[q.x * scale, q.y * scale, q.z * scale])
    }

    /// Uniformly distributed random rotation (Shoemake's method)
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let u1: f64 = rng.gen();
        let u2: f64 = rng.gen();
        let u3: f64 = rng.gen();
        let a = (1.0 - u1).sqrt();
        let b = u1.sqrt();
        let q = Self::new_unchecked(
            a * (2.0 * PI * u2).sin(),
            a * (2.0 * PI * u2).cos(),
            b * (2.0 * PI * u3).sin(),
            b * (2.0 * PI * u3).cos(),
        );
        q.renormalized()
    }

    pub fn w(&self) -> f64 {
        self.w
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    /// Components as `[w, x, y, z]`
    pub fn coords(&self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }

    /// Components as an ndarray vector `[w, x, y, z]`
    pub fn to_array(&self) -> Array1<f64> {
        arr1(&self.coords())
    }

    /// Build from an ndarray vector `[w, x, y, z]`, validating the norm
    pub fn from_array(a: &Array1<f64>) -> Result<Self> {
        if a.len() != 4 {
            return Err(Error::DimensionMismatch {
                expected: 4,
                got: a.len(),
            });
        }
        Self::new(a[0], a[1], a[2], a[3])
    }

    /// Euclidean norm of the 4 components
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// True if the norm is within `tolerance` of 1
    pub fn is_unit(&self, tolerance: f64) -> bool {
        let norm = self.norm();
        norm.is_finite() && (norm - 1.0).abs() <= tolerance
    }

    /// 4-d Euclidean inner product
    pub fn dot(&self, other: &Self) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Conjugate, which is the inverse rotation for a unit quaternion
    pub fn inverse(&self) -> Self {
        Self::new_unchecked(self.w, -self.x, -self.y, -self.z)
    }

    /// Representative with non-negative scalar part
    pub fn canonical(&self) -> Self {
        if self.w < 0.0 {
            -*self
        } else {
            *self
        }
    }

    /// Rotation angle in [0, π]
    pub fn angle(&self) -> f64 {
        let q = self.canonical();
        let vec_norm = (q.x * q.x + q.y * q.y + q.z * q.z).sqrt();
        2.0 * vec_norm.atan2(q.w)
    }

    /// Rescale to exactly unit norm, absorbing floating-point drift
    pub(crate) fn renormalized(&self) -> Self {
        let norm = self.norm();
        Self::new_unchecked(self.w / norm, self.x / norm, self.y / norm, self.z / norm)
    }
}

impl Default for UnitQuaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Neg for UnitQuaternion {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new_unchecked(-self.w, -self.x, -self.y, -self.z)
    }
}

/// Hamilton product; `a * b` applies `b` first, then `a`
impl Mul for UnitQuaternion {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let (a, b) = (self, rhs);
        Self::new_unchecked(
            a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
            a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
        )
        .renormalized()
    }
}

impl fmt::Display for UnitQuaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[w: {:.9}, x: {:.9}, y: {:.9}, z: {:.9}]",
            self.w, self.x, self.y, self.z
        )
    }
}
