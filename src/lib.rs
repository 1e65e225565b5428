pub mod algorithms;
pub mod core;
pub mod logging;
pub mod manifolds;
pub mod progress;

// Flat re-exports for convenience
pub use crate::core::{EmbeddedManifold, Error, Manifold, Result};

// Re-export manifold types
pub use crate::manifolds::{
    angular_distance, exp_map, log_map, Euclidean, UnitQuaternion, UnitQuaternions,
    UNIT_NORM_TOLERANCE,
};

// Re-export optimization and statistics
pub use algorithms::optimization::{
    Convergence, OptimizationResult, ResidualFunction, RiemannianLevenbergMarquardt, Termination,
};
pub use algorithms::statistics::{
    compute_statistics, compute_statistics_from, compute_statistics_with_sink, mean,
    sum_squared_distances, variance, MeanEstimate, StatisticsOptions, StatisticsResult,
};

/// Convenience re-exports for common use cases
pub mod prelude {
    pub use crate::algorithms::statistics::{
        compute_statistics, compute_statistics_from, StatisticsOptions, StatisticsResult,
    };
    pub use crate::core::{Error, Manifold, Result};
    pub use crate::logging::{Level, LogSink, NoopSink, TracingSink};
    pub use crate::manifolds::{angular_distance, UnitQuaternion, UnitQuaternions};
}
