use quatstat::algorithms::sampling::{axis_perturbations, gaussian_perturbations};
use quatstat::prelude::*;
use quatstat::progress::Progress;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("quat_stats=info,quatstat=info")
        .init();

    let n = 100;
    let sigma = 0.2;
    let batches = 5;
    let mut rng = StdRng::seed_from_u64(42);
    let options = StatisticsOptions::default();
    let sink = TracingSink;

    println!("=== Karcher mean of perturbed rotations ===\n");

    let mut progress = Progress::new(batches);
    progress.start();
    for batch in 0..batches {
        let center = UnitQuaternion::random(&mut rng);
        let sample = gaussian_perturbations(&center, sigma, n, &mut rng)?;
        let result = quatstat::compute_statistics_with_sink(
            &sample.rotations,
            &sample.rotations[0],
            &options,
            &sink,
        )?;

        println!("batch {}", batch);
        println!("  center      = {}", center);
        println!("  mean        = {}", result.mean);
        println!(
            "  |mean - center| = {:.3e} rad (converged: {}, {} iterations)",
            angular_distance(&result.mean, &center),
            result.converged,
            result.iterations
        );
        println!(
            "  variance    = {:.5} ~ {:.5} (drawn) ~ {:.5} (3 sigma^2)",
            result.variance,
            sample.mean_squared_norm(),
            3.0 * sigma * sigma
        );

        progress.sample();
    }

    println!("\n=== Signed-axis perturbations ===\n");

    let center = UnitQuaternion::random(&mut rng);
    let sample = axis_perturbations(&center, 0.3)?;
    let result = compute_statistics_from(&sample.rotations, &UnitQuaternion::identity(), &options)?;
    println!("center = {}", center);
    println!("mean   = {}", result.mean);
    println!(
        "distance = {:.3e} rad (q and -q count as the same rotation)",
        angular_distance(&result.mean, &center)
    );

    Ok(())
}
