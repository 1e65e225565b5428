use ndarray::Array1;
use ndarray_linalg::Norm;

use crate::core::{EmbeddedManifold, Error, Manifold, Result};

/// Euclidean space R^n with standard metric
///
/// Serves as the flat parameter space of a local chart: the mean estimator
/// searches over rotation vectors in R^3 at a fixed base quaternion.
#[derive(Debug, Clone, Copy)]
pub struct Euclidean {
    dim: usize,
}

impl Euclidean {
    pub fn new(dim: usize) -> Self {
        Euclidean { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn check_len(&self, v: &Array1<f64>) -> Result<()> {
        if v.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                got: v.len(),
            });
        }
        Ok(())
    }
}

impl Manifold for Euclidean {
    type Point = Array1<f64>;
    type Vector = Array1<f64>;
    type Scalar = f64;

    /// Simple addition
    fn exp_unchecked(&self, p: &Self::Point, x: &Self::Vector) -> Self::Point {
        p + x
    }

    /// Simple subtraction
    fn log_unchecked(&self, p: &Self::Point, q: &Self::Point) -> Self::Vector {
        q - p
    }

    fn metric(&self, _p: &Self::Point, x: &Self::Vector, y: &Self::Vector) -> Self::Scalar {
        x.dot(y)
    }

    fn distance(&self, p: &Self::Point, q: &Self::Point) -> Result<Self::Scalar> {
        self.check_len(p)?;
        self.check_len(q)?;
        Ok((q - p).norm_l2())
    }

    fn validate_point(&self, p: &Self::Point) -> Result<()> {
        self.check_len(p)
    }

    fn validate_vector(&self, _p: &Self::Point, x: &Self::Vector) -> Result<()> {
        self.check_len(x)
    }
}

impl EmbeddedManifold for Euclidean {
    fn ambient_dim(&self) -> usize {
        self.dim
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn is_on_manifold(&self, p: &Self::Point, _tolerance: f64) -> bool {
        p.len() == self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    #[test]
    fn test_euclidean_exp_log() {
        let chart = Euclidean::new(3);
        let p = arr1(&[0.1, -0.2, 0.3]);
        let x = arr1(&[0.01, 0.02, -0.03]);

        let q = chart.exp(&p, &x).unwrap();
        let x_recovered = chart.log(&p, &q).unwrap();

        for i in 0..3 {
            assert_relative_eq!(x[i], x_recovered[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_euclidean_distance() {
        let chart = Euclidean::new(3);
        let p = arr1(&[0.0, 0.0, 0.0]);
        let q = arr1(&[2.0, 3.0, 6.0]);

        assert_relative_eq!(chart.distance(&p, &q).unwrap(), 7.0, epsilon = 1e-12);
        assert!(chart.distance(&p, &arr1(&[1.0])).is_err());
    }

    #[test]
    fn test_euclidean_validation() {
        let chart = Euclidean::new(3);
        assert!(chart.validate_point(&arr1(&[1.0, 2.0, 3.0])).is_ok());
        assert!(matches!(
            chart.validate_point(&arr1(&[1.0, 2.0])),
            Err(Error::DimensionMismatch { expected: 3, got: 2 })
        ));
        assert!(chart.is_on_manifold(&arr1(&[0.0, 0.0, 0.0]), 0.0));
        assert_eq!(EmbeddedManifold::dim(&chart), 3);
    }
}
