/// Demonstration of checkpoint/resume functionality in t-SNE.
///
/// This example shows how to:
/// 1. Compute affinities once and cache them on disk
/// 2. Start a session from the cached affinities
/// 3. Step with periodic optimizer checkpoints
/// 4. Resume from a checkpoint and land on the same embedding
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Distribution;
use rand_distr::StandardNormal;
use std::fs;
use tracing_subscriber::EnvFilter;
use tsne_rs::points_from_rows;
use tsne_rs::Affinities;
use tsne_rs::AffinityParams;
use tsne_rs::Optimizer;
use tsne_rs::Tsne;
use tsne_rs::TsneConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  println!("t-SNE Checkpoint/Resume Demo");
  println!();

  // Synthetic data: 4 blobs of 25 points in 8 dimensions, as plain rows
  println!("Generating synthetic data...");
  let mut rng = StdRng::seed_from_u64(2024);
  let rows: Vec<Vec<f64>> = (0..100)
    .map(|i| {
      let center = (i % 4) as f64 * 6.0;
      (0..8)
        .map(|_| {
          let noise: f64 = StandardNormal.sample(&mut rng);
          center + noise
        })
        .collect()
    })
    .collect();
  let data = points_from_rows(&rows)?;

  let config = TsneConfig {
    affinity: AffinityParams {
      perplexity: 15.0,
      ..Default::default()
    },
    seed: Some(99),
    ..Default::default()
  };

  // Phase 1: affinities (expensive, cacheable)
  println!();
  println!("=== Phase 1: Computing affinities ===");
  let affinities = Affinities::from_points(data.view(), &config.affinity, config.parallel)?;
  println!("Affinities computed:");
  println!("  - n_points: {}", affinities.n_points());
  println!("  - unconverged rows: {}", affinities.unconverged_rows());
  let betas = affinities.betas();
  println!(
    "  - beta range: [{:.4}, {:.4}]",
    betas.iter().cloned().fold(f64::INFINITY, f64::min),
    betas.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
  );

  println!();
  println!("Saving affinities to disk...");
  let affinity_bytes = bincode::serialize(&affinities)?;
  fs::write("checkpoint_affinities.bin", &affinity_bytes)?;
  println!("  Affinities saved ({} bytes)", affinity_bytes.len());

  // Phase 2: optimize from the cached affinities with checkpoints
  println!();
  println!("=== Phase 2: Optimization with checkpoints ===");
  let cached: Affinities = bincode::deserialize(&fs::read("checkpoint_affinities.bin")?)?;
  let mut tsne = Tsne::new(config.clone());
  tsne.init_from_affinities(cached)?;

  let total_iterations = 500;
  let checkpoint_interval = 50;
  println!(
    "Training {} iterations with checkpoints every {}:",
    total_iterations, checkpoint_interval
  );

  while tsne.iteration()? < total_iterations {
    let cost = tsne.step(checkpoint_interval)?;
    let iteration = tsne.iteration()?;
    println!(
      "  Iteration {}/{} - KL divergence: {:.4}",
      iteration,
      total_iterations,
      cost.unwrap_or(f64::NAN)
    );

    let checkpoint_bytes = bincode::serialize(tsne.optimizer()?)?;
    let filename = format!("checkpoint_{:03}.bin", iteration);
    fs::write(&filename, &checkpoint_bytes)?;
    println!(
      "    Checkpoint saved: {} ({} bytes)",
      filename,
      checkpoint_bytes.len()
    );
  }

  println!();
  println!("=== Phase 3: Converting to final model ===");
  let fitted = tsne.into_fitted()?;
  println!(
    "Training complete! Final embedding shape: {:?}",
    fitted.embedding().shape()
  );

  // Resuming from a checkpoint reproduces the same trajectory
  println!();
  println!("=== Demo: Resuming from checkpoint ===");
  println!("Loading checkpoint from iteration 250...");
  let resumed_opt: Optimizer = bincode::deserialize(&fs::read("checkpoint_250.bin")?)?;
  println!(
    "Checkpoint loaded! Currently at iteration {}",
    resumed_opt.iteration()
  );

  let mut resumed = Tsne::new(config);
  resumed.restore(resumed_opt)?;
  let remaining = total_iterations - resumed.iteration()?;
  let cost = resumed.step(remaining)?;
  println!(
    "Resumed training complete at iteration {} - KL divergence: {:.4}",
    resumed.iteration()?,
    cost.unwrap_or(f64::NAN)
  );

  let matches = resumed.solution_view()? == fitted.embedding();
  println!("Resumed embedding identical to uninterrupted run: {}", matches);

  // Cleanup checkpoint files
  println!();
  println!("=== Cleanup ===");
  for i in (checkpoint_interval..=total_iterations).step_by(checkpoint_interval) {
    let filename = format!("checkpoint_{:03}.bin", i);
    if fs::remove_file(&filename).is_ok() {
      println!("Removed {}", filename);
    }
  }
  fs::remove_file("checkpoint_affinities.bin")?;
  println!("Cleanup complete!");

  Ok(())
}
