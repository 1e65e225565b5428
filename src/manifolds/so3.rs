use ndarray::Array1;
use ndarray_linalg::Norm;

use crate::core::{EmbeddedManifold, Error, Manifold, Result};
use crate::manifolds::quaternion::{UnitQuaternion, SMALL_ANGLE, UNIT_NORM_TOLERANCE};

/// Rotation group SO(3) represented by unit quaternions (S³ modulo ±1)
///
/// Tangent vectors are rotation vectors in the body frame of the base point:
///
/// exp_q(v) = q ⊗ (cos(|v|/2), v̂ sin(|v|/2))
///
/// i.e. the base is composed on the left. The metric is the bi-invariant one
/// in which the length of a tangent vector is its rotation angle, so
/// `distance` is the angle of the relative rotation, in [0, π].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitQuaternions;

impl UnitQuaternions {
    pub fn new() -> Self {
        UnitQuaternions
    }
}

impl Manifold for UnitQuaternions {
    type Point = UnitQuaternion;
    type Vector = Array1<f64>;
    type Scalar = f64;

    fn exp_unchecked(&self, p: &Self::Point, x: &Self::Vector) -> Self::Point {
        if x.norm_l2() < SMALL_ANGLE {
            return *p;
        }
        *p * UnitQuaternion::from_rotation_vector_unchecked(x)
    }

    fn log_unchecked(&self, p: &Self::Point, q: &Self::Point) -> Self::Vector {
        (p.inverse() * *q).to_rotation_vector()
    }

    fn metric(&self, _p: &Self::Point, x: &Self::Vector, y: &Self::Vector) -> Self::Scalar {
        x.dot(y)
    }

    fn distance(&self, p: &Self::Point, q: &Self::Point) -> Result<Self::Scalar> {
        self.validate_point(p)?;
        self.validate_point(q)?;
        Ok(angular_distance(p, q))
    }

    fn project(&self, p: &Self::Point) -> Result<Self::Point> {
        UnitQuaternion::new_normalize(p.w(), p.x(), p.y(), p.z())
    }

    fn validate_point(&self, p: &Self::Point) -> Result<()> {
        if !self.is_on_manifold(p, UNIT_NORM_TOLERANCE) {
            return Err(Error::NotOnManifold(format!(
                "quaternion is not unit norm: ||q|| = {}",
                p.norm()
            )));
        }
        Ok(())
    }

    fn validate_vector(&self, _p: &Self::Point, x: &Self::Vector) -> Result<()> {
        if x.len() != 3 {
            return Err(Error::DimensionMismatch {
                expected: 3,
                got: x.len(),
            });
        }
        if x.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "tangent vector has non-finite components: {}",
                x
            )));
        }
        Ok(())
    }
}

impl EmbeddedManifold for UnitQuaternions {
    fn ambient_dim(&self) -> usize {
        4
    }

    fn dim(&self) -> usize {
        3
    }

    fn is_on_manifold(&self, p: &Self::Point, tolerance: f64) -> bool {
        p.is_unit(tolerance)
    }
}

/// Angle in [0, π] of the rotation taking `q1` to `q2`
///
/// Equal to `2·acos(|⟨q1, q2⟩|)`, evaluated in half-angle form
/// `4·atan2(|q1 − s·q2|, |q1 + s·q2|)` with `s = sign⟨q1, q2⟩`. The sign
/// flip makes the result identical for `q2` and `−q2`; the atan2 form has no
/// domain to leave and keeps full precision for nearly equal rotations,
/// where acos loses about half the digits.
pub fn angular_distance(q1: &UnitQuaternion, q2: &UnitQuaternion) -> f64 {
    let s = if q1.dot(q2) < 0.0 { -1.0 } else { 1.0 };
    let a = q1.coords();
    let b = q2.coords();

    let mut diff_sq = 0.0;
    let mut sum_sq = 0.0;
    for i in 0..4 {
        let d = a[i] - s * b[i];
        let t = a[i] + s * b[i];
        diff_sq += d * d;
        sum_sq += t * t;
    }
    4.0 * diff_sq.sqrt().atan2(sum_sq.sqrt())
}

/// Exponential map at `base`, validating both arguments
pub fn exp_map(base: &UnitQuaternion, v: &Array1<f64>) -> Result<UnitQuaternion> {
    UnitQuaternions.exp(base, v)
}

/// Logarithmic map at `base`, validating both arguments
pub fn log_map(base: &UnitQuaternion, q: &UnitQuaternion) -> Result<Array1<f64>> {
    UnitQuaternions.log(base, q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f64::consts::PI;

    fn random_quats(seed: u64, n: usize) -> Vec<UnitQuaternion> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| UnitQuaternion::random(&mut rng)).collect()
    }

    #[test]
    fn test_distance_to_self_and_antipode() {
        for q in random_quats(1, 50) {
            assert!(angular_distance(&q, &q).abs() < 1e-9);
            assert!(angular_distance(&q, &(-q)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_distance_symmetric_and_bounded() {
        let quats = random_quats(2, 30);
        for pair in quats.windows(2) {
            let d12 = angular_distance(&pair[0], &pair[1]);
            let d21 = angular_distance(&pair[1], &pair[0]);
            assert_relative_eq!(d12, d21, epsilon = 1e-12);
            assert!((0.0..=PI).contains(&d12));
        }
    }

    #[test]
    fn test_distance_matches_acos_form() {
        let quats = random_quats(3, 30);
        for pair in quats.windows(2) {
            let expected = 2.0 * pair[0].dot(&pair[1]).abs().min(1.0).acos();
            assert_relative_eq!(angular_distance(&pair[0], &pair[1]), expected, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_distance_of_half_turn() {
        let q = UnitQuaternion::identity();
        let half_turn = UnitQuaternion::new(0.0, 1.0, 0.0, 0.0).unwrap();
        assert_relative_eq!(angular_distance(&q, &half_turn), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_exp_zero_is_identity_map() {
        let manifold = UnitQuaternions::new();
        for q in random_quats(4, 20) {
            let moved = manifold.exp(&q, &arr1(&[0.0, 0.0, 0.0])).unwrap();
            assert_eq!(moved, q);
        }
    }

    #[test]
    fn test_exp_moves_by_tangent_norm() {
        let manifold = UnitQuaternions::new();
        let q = random_quats(5, 1)[0];
        let v = arr1(&[0.2, -0.1, 0.4]);
        let moved = manifold.exp(&q, &v).unwrap();
        let expected = v.dot(&v).sqrt();
        assert_relative_eq!(manifold.distance(&q, &moved).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_exp_composes_base_on_left() {
        let base = UnitQuaternion::from_axis_angle(&arr1(&[0.0, 0.0, 1.0]), PI / 2.0).unwrap();
        let v = arr1(&[0.3, 0.0, 0.0]);
        let moved = exp_map(&base, &v).unwrap();
        let expected = base * UnitQuaternion::from_rotation_vector(&v).unwrap();
        assert_relative_eq!(angular_distance(&moved, &expected), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_exp_log_roundtrip_small_vectors() {
        let manifold = UnitQuaternions::new();
        let quats = random_quats(6, 10);
        let tangents = [
            arr1(&[0.05, -0.02, 0.01]),
            arr1(&[0.0, 0.0, 0.09]),
            arr1(&[-0.03, 0.04, -0.05]),
            arr1(&[1e-7, 0.0, -1e-7]),
        ];
        for q in &quats {
            for v in &tangents {
                let moved = manifold.exp(q, v).unwrap();
                let recovered = manifold.log(q, &moved).unwrap();
                for i in 0..3 {
                    assert_relative_eq!(v[i], recovered[i], epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_log_norm_is_angular_distance() {
        let quats = random_quats(7, 20);
        for pair in quats.windows(2) {
            let v = log_map(&pair[0], &pair[1]).unwrap();
            assert_relative_eq!(
                v.dot(&v).sqrt(),
                angular_distance(&pair[0], &pair[1]),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_validation() {
        let manifold = UnitQuaternions::new();
        let q = UnitQuaternion::identity();
        let not_unit = UnitQuaternion::new_unchecked(1.0, 0.5, 0.0, 0.0);

        assert!(manifold.validate_point(&q).is_ok());
        assert!(matches!(
            manifold.validate_point(&not_unit),
            Err(Error::NotOnManifold(_))
        ));
        assert!(matches!(
            manifold.exp(&q, &arr1(&[0.1, 0.2])),
            Err(Error::DimensionMismatch { expected: 3, got: 2 })
        ));
        assert!(manifold.exp(&q, &arr1(&[f64::NAN, 0.0, 0.0])).is_err());
        assert_relative_eq!(manifold.project(&not_unit).unwrap().norm(), 1.0, epsilon = 1e-12);
    }
}
