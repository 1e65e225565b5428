pub mod optimization;
pub mod sampling;
pub mod statistics;

pub use optimization::{
    numerical_jacobian, Convergence, OptimizationResult, ResidualFunction,
    RiemannianLevenbergMarquardt, Termination,
};
pub use sampling::{axis_perturbations, gaussian_perturbations, PerturbedSample};
pub use statistics::{
    compute_statistics, compute_statistics_from, compute_statistics_with_sink, mean,
    sum_squared_distances, variance, MeanEstimate, StatisticsOptions, StatisticsResult,
};
