//! Riemannian mean and variance of unit quaternion samples
//!
//! The mean is the Karcher mean: the rotation minimizing the sum of squared
//! angular distances to the samples. It is searched for in the exponential
//! chart of an initial guess q0, i.e. over rotation vectors v ∈ R^3 with
//! candidate exp_{q0}(v), starting at v = 0. The chart is only a faithful
//! parameterization within angle π of q0, so the initial guess should be
//! close to the samples (the first sample is the default).

use ndarray::Array1;

use crate::algorithms::optimization::{Convergence, ResidualFunction, RiemannianLevenbergMarquardt};
use crate::core::{Error, Manifold, Result};
use crate::log_to;
use crate::logging::{Level, LogSink, NoopSink};
use crate::manifolds::{angular_distance, Euclidean, UnitQuaternion, UnitQuaternions};

/// Samples closer than this angle (radians) to the initial guess are treated
/// as coinciding with it
pub const COINCIDENT_ANGLE: f64 = 1e-12;

/// Mean estimation settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsOptions {
    /// Upper bound on optimizer iterations, at least 1
    pub max_iterations: usize,
    /// Stop once an accepted step improves the summed squared distance by
    /// less than this (radians²)
    pub tolerance: f64,
}

impl Default for StatisticsOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-9,
        }
    }
}

impl StatisticsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance >= 0.0) || !self.tolerance.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    fn convergence(&self) -> Convergence {
        Convergence {
            max_iterations: self.max_iterations,
            grad_tol: self.tolerance,
            f_tol: self.tolerance,
        }
    }
}

/// Outcome of [`mean`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanEstimate {
    pub mean: UnitQuaternion,
    /// False when the iteration budget ran out before the tolerance was met;
    /// `mean` is then the best estimate found
    pub converged: bool,
    pub iterations: usize,
}

/// Mean and variance of a rotation sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsResult {
    pub mean: UnitQuaternion,
    /// Mean squared angular distance to `mean`, radians²
    pub variance: f64,
    pub converged: bool,
    pub iterations: usize,
}

/// Σ angular_distance(candidate, s)² over the samples
pub fn sum_squared_distances(candidate: &UnitQuaternion, samples: &[UnitQuaternion]) -> f64 {
    samples
        .iter()
        .map(|s| {
            let d = angular_distance(candidate, s);
            d * d
        })
        .sum()
}

/// Stacked log residuals [log_{exp_{q0}(v)}(s_i)]_i over the chart at q0
///
/// The norm of each 3-block is the angular distance to that sample, so
/// ||r(v)||² is the summed squared distance of exp_{q0}(v).
struct ChartResidual<'a> {
    base: UnitQuaternion,
    samples: &'a [UnitQuaternion],
    rotations: UnitQuaternions,
}

impl<'a> ResidualFunction<Euclidean> for ChartResidual<'a> {
    fn residual(&self, _chart: &Euclidean, v: &Array1<f64>) -> Result<Array1<f64>> {
        let candidate = self.rotations.exp_unchecked(&self.base, v);
        let mut r = Array1::zeros(3 * self.samples.len());
        for (i, s) in self.samples.iter().enumerate() {
            let block = self.rotations.log_unchecked(&candidate, s);
            r.slice_mut(ndarray::s![3 * i..3 * i + 3]).assign(&block);
        }
        Ok(r)
    }

    fn num_residuals(&self) -> usize {
        3 * self.samples.len()
    }
}

fn validate_samples(rotations: &UnitQuaternions, samples: &[UnitQuaternion]) -> Result<()> {
    if samples.is_empty() {
        return Err(Error::EmptySample);
    }
    for (i, s) in samples.iter().enumerate() {
        rotations.validate_point(s).map_err(|e| match e {
            Error::NotOnManifold(msg) => Error::NotOnManifold(format!("sample {}: {}", i, msg)),
            other => other,
        })?;
    }
    Ok(())
}

/// Karcher mean of `samples`, searched in the chart at `initial_guess`
///
/// Fails with an invalid-input error on an empty sample, a non-unit
/// quaternion or invalid options. Running out of iterations is reported
/// through `converged`, not as an error.
pub fn mean(
    initial_guess: &UnitQuaternion,
    samples: &[UnitQuaternion],
    options: &StatisticsOptions,
) -> Result<MeanEstimate> {
    options.validate()?;
    let rotations = UnitQuaternions::new();
    validate_samples(&rotations, samples)?;
    rotations.validate_point(initial_guess)?;

    // Flat objective: nothing to optimize
    if samples
        .iter()
        .all(|s| angular_distance(initial_guess, s) <= COINCIDENT_ANGLE)
    {
        return Ok(MeanEstimate {
            mean: *initial_guess,
            converged: true,
            iterations: 0,
        });
    }

    let chart = Euclidean::new(3);
    let residual = ChartResidual {
        base: *initial_guess,
        samples,
        rotations,
    };
    let optimizer = RiemannianLevenbergMarquardt::new().with_convergence(options.convergence());
    let result = optimizer.minimize(&chart, &residual, Array1::zeros(3))?;

    Ok(MeanEstimate {
        mean: rotations.exp(initial_guess, &result.point)?,
        converged: result.converged,
        iterations: result.iterations,
    })
}

/// Mean squared angular distance of `samples` to `mean`, radians²
pub fn variance(mean: &UnitQuaternion, samples: &[UnitQuaternion]) -> Result<f64> {
    if samples.is_empty() {
        return Err(Error::EmptySample);
    }
    Ok(sum_squared_distances(mean, samples) / samples.len() as f64)
}

/// Mean and variance, using the first sample as the initial guess
pub fn compute_statistics(
    samples: &[UnitQuaternion],
    options: &StatisticsOptions,
) -> Result<StatisticsResult> {
    let initial_guess = samples.first().ok_or(Error::EmptySample)?;
    compute_statistics_with_sink(samples, initial_guess, options, &NoopSink)
}

/// Mean and variance from an explicit initial guess
pub fn compute_statistics_from(
    samples: &[UnitQuaternion],
    initial_guess: &UnitQuaternion,
    options: &StatisticsOptions,
) -> Result<StatisticsResult> {
    compute_statistics_with_sink(samples, initial_guess, options, &NoopSink)
}

/// Mean and variance, reporting diagnostics to `sink`
///
/// A non-converged mean is logged at [`Level::Warn`] and still returned with
/// `converged == false`.
pub fn compute_statistics_with_sink(
    samples: &[UnitQuaternion],
    initial_guess: &UnitQuaternion,
    options: &StatisticsOptions,
    sink: &dyn LogSink,
) -> Result<StatisticsResult> {
    let estimate = mean(initial_guess, samples, options)?;
    let variance = variance(&estimate.mean, samples)?;

    if estimate.converged {
        log_to!(
            sink,
            Level::Debug,
            "mean of {} rotations converged after {} iterations, variance {:.6e} rad^2",
            samples.len(),
            estimate.iterations,
            variance
        );
    } else {
        log_to!(
            sink,
            Level::Warn,
            "mean of {} rotations did not converge within {} iterations (tolerance {:e}); returning best estimate",
            samples.len(),
            options.max_iterations,
            options.tolerance
        );
    }

    Ok(StatisticsResult {
        mean: estimate.mean,
        variance,
        converged: estimate.converged,
        iterations: estimate.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use approx::assert_relative_eq;
    use ndarray::arr1;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sum_squared_distances() {
        let q0 = UnitQuaternion::identity();
        let samples = [
            UnitQuaternion::from_rotation_vector(&arr1(&[0.1, 0.0, 0.0])).unwrap(),
            UnitQuaternion::from_rotation_vector(&arr1(&[0.0, -0.2, 0.0])).unwrap(),
        ];
        assert_relative_eq!(sum_squared_distances(&q0, &samples), 0.05, epsilon = 1e-12);
        assert_eq!(sum_squared_distances(&q0, &[]), 0.0);
    }

    #[test]
    fn test_residual_cost_matches_sum_squared_distances() {
        let mut rng = StdRng::seed_from_u64(21);
        let base = UnitQuaternion::random(&mut rng);
        let samples: Vec<_> = (0..5).map(|_| UnitQuaternion::random(&mut rng)).collect();
        let residual = ChartResidual {
            base,
            samples: &samples,
            rotations: UnitQuaternions::new(),
        };
        let chart = Euclidean::new(3);
        let v = arr1(&[0.1, 0.2, -0.3]);
        let candidate = UnitQuaternions::new().exp(&base, &v).unwrap();

        assert_relative_eq!(
            residual.cost(&chart, &v).unwrap(),
            sum_squared_distances(&candidate, &samples),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_options_validation() {
        assert!(StatisticsOptions::default().validate().is_ok());
        assert_eq!(StatisticsOptions::default().max_iterations, 200);
        assert_eq!(StatisticsOptions::default().tolerance, 1e-9);

        let err = StatisticsOptions::new().with_max_iterations(0).validate().unwrap_err();
        assert!(err.is_invalid_input());
        assert!(StatisticsOptions::new().with_tolerance(f64::NAN).validate().is_err());
        assert!(StatisticsOptions::new().with_tolerance(-1e-3).validate().is_err());
    }

    #[test]
    fn test_empty_sample_is_invalid_input() {
        let options = StatisticsOptions::default();
        let err = compute_statistics(&[], &options).unwrap_err();
        assert_eq!(err, Error::EmptySample);
        assert!(err.is_invalid_input());

        assert_eq!(
            mean(&UnitQuaternion::identity(), &[], &options).unwrap_err(),
            Error::EmptySample
        );
        assert_eq!(
            variance(&UnitQuaternion::identity(), &[]).unwrap_err(),
            Error::EmptySample
        );
    }

    #[test]
    fn test_non_unit_inputs_are_invalid_input() {
        let options = StatisticsOptions::default();
        let bad = UnitQuaternion::new_unchecked(1.0, 1.0, 0.0, 0.0);
        let good = [UnitQuaternion::identity()];

        let err = mean(&bad, &good, &options).unwrap_err();
        assert!(matches!(err, Error::NotOnManifold(_)));
        assert!(err.is_invalid_input());

        let err = compute_statistics(&[UnitQuaternion::identity(), bad], &options).unwrap_err();
        assert!(matches!(err, Error::NotOnManifold(ref msg) if msg.starts_with("sample 1")));
    }

    #[test]
    fn test_zero_iterations_is_invalid_input() {
        let options = StatisticsOptions::new().with_max_iterations(0);
        let err = compute_statistics(&[UnitQuaternion::identity()], &options).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_coincident_samples_return_guess_immediately() {
        let mut rng = StdRng::seed_from_u64(5);
        let q = UnitQuaternion::random(&mut rng);
        let samples = [q, -q, q];
        let estimate = mean(&q, &samples, &StatisticsOptions::default()).unwrap();
        assert_eq!(estimate.mean, q);
        assert!(estimate.converged);
        assert_eq!(estimate.iterations, 0);
    }

    #[test]
    fn test_single_sample_from_other_guess() {
        let mut rng = StdRng::seed_from_u64(8);
        let target = UnitQuaternion::random(&mut rng);
        let guess = UnitQuaternions::new()
            .exp(&target, &arr1(&[0.4, -0.3, 0.2]))
            .unwrap();

        let result = compute_statistics_from(&[target], &guess, &StatisticsOptions::default())
            .unwrap();

        assert!(result.converged);
        assert!(angular_distance(&result.mean, &target) < 1e-6);
        assert!(result.variance < 1e-12);
    }

    #[test]
    fn test_sink_receives_non_convergence_warning() {
        let mut rng = StdRng::seed_from_u64(13);
        let base = UnitQuaternion::random(&mut rng);
        let rotations = UnitQuaternions::new();
        let samples = [
            base,
            rotations.exp(&base, &arr1(&[0.3, 0.1, 0.0])).unwrap(),
            rotations.exp(&base, &arr1(&[-0.1, 0.4, 0.2])).unwrap(),
        ];
        let sink = MemorySink::new();
        let options = StatisticsOptions::new()
            .with_max_iterations(1)
            .with_tolerance(0.0);

        let result = compute_statistics_with_sink(&samples, &base, &options, &sink).unwrap();

        assert!(!result.converged);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::Warn);
        assert!(records[0].message.contains("did not converge"));
        assert!(records[0].file.ends_with("statistics.rs"));
    }

    #[test]
    fn test_sink_receives_debug_on_convergence() {
        let sink = MemorySink::new();
        let q = UnitQuaternion::identity();
        compute_statistics_with_sink(&[q], &q, &StatisticsOptions::default(), &sink).unwrap();
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::Debug);
    }
}
