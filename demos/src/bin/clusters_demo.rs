use clap::Parser;
use ndarray::Array2;
use plotters::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::Normal;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use tsne_rs::AffinityParams;
use tsne_rs::Tsne;
use tsne_rs::TsneConfig;

#[derive(Parser)]
#[command(name = "Gaussian clusters t-SNE Demo")]
struct Args {
  /// Number of Gaussian clusters
  #[arg(short, long, default_value = "5")]
  clusters: usize,

  /// Points drawn per cluster
  #[arg(short, long, default_value = "60")]
  points_per_cluster: usize,

  /// Dimensionality of the input space
  #[arg(short, long, default_value = "20")]
  features: usize,

  /// Target perplexity
  #[arg(long, default_value = "30.0")]
  perplexity: f64,

  /// Number of optimizer iterations
  #[arg(short, long, default_value = "1000")]
  iterations: usize,

  /// Iterations between progress reports
  #[arg(long, default_value = "100")]
  report_every: usize,

  /// Seed for both the data and the embedding
  #[arg(long, default_value = "7")]
  seed: u64,

  /// Output PNG path
  #[arg(short, long, default_value = "clusters_tsne.png")]
  output: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let args = Args::parse();

  println!("Gaussian clusters t-SNE Demo");
  println!("============================");
  println!(
    "Clusters: {} x {} points in {} dimensions",
    args.clusters, args.points_per_cluster, args.features
  );
  println!("Perplexity: {}", args.perplexity);
  println!();

  println!("Generating data...");
  let (data, labels) = generate_clusters(
    args.clusters,
    args.points_per_cluster,
    args.features,
    args.seed,
  )?;

  let config = TsneConfig {
    affinity: AffinityParams {
      perplexity: args.perplexity,
      ..Default::default()
    },
    seed: Some(args.seed),
    ..Default::default()
  };
  let mut tsne = Tsne::new(config);

  println!("Computing affinities...");
  let start = Instant::now();
  tsne.init_from_points(data.view())?;
  let affinities = tsne.affinities()?;
  println!(
    "  {} points calibrated in {:.2}s ({} rows did not converge)",
    affinities.n_points(),
    start.elapsed().as_secs_f32(),
    affinities.unconverged_rows()
  );
  println!();

  println!("Running t-SNE optimization...");
  let start = Instant::now();
  let report_every = args.report_every.max(1);
  let mut done = 0;
  while done < args.iterations {
    let batch = report_every.min(args.iterations - done);
    let cost = tsne.step(batch)?;
    done += batch;
    if let Some(cost) = cost {
      println!("  Iteration {:>5}: KL divergence {:.4}", done, cost);
    }
  }
  println!(
    "  Optimization completed in {:.2}s",
    start.elapsed().as_secs_f32()
  );
  println!();

  let embedding = tsne.solution()?;
  if embedding.ncols() < 2 {
    println!("Embedding has fewer than 2 components, skipping plot");
    return Ok(());
  }

  println!("Generating scatter plot...");
  plot_embedding(&embedding, &labels, &args.output)?;
  println!("  Plot saved to {}", args.output);
  println!();
  println!("Done!");
  Ok(())
}

/// Draw isotropic unit-variance Gaussian blobs around uniformly placed centers.
fn generate_clusters(
  n_clusters: usize,
  points_per_cluster: usize,
  n_features: usize,
  seed: u64,
) -> Result<(Array2<f64>, Vec<usize>), Box<dyn std::error::Error>> {
  let mut rng = StdRng::seed_from_u64(seed);
  let noise = Normal::new(0.0, 1.0)?;

  let centers = Array2::<f64>::from_shape_fn((n_clusters, n_features), |_| {
    rng.random_range(-20.0..20.0)
  });

  let n_samples = n_clusters * points_per_cluster;
  let labels: Vec<usize> = (0..n_samples).map(|i| i / points_per_cluster).collect();
  let data = Array2::from_shape_fn((n_samples, n_features), |(i, d)| {
    centers[(labels[i], d)] + rng.sample(noise)
  });

  Ok((data, labels))
}

/// Generate scatter plot colored by cluster
fn plot_embedding(
  embedding: &Array2<f64>,
  labels: &[usize],
  output_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
  let root = BitMapBackend::new(output_path, (1024, 1024)).into_drawing_area();
  root.fill(&WHITE)?;

  let x_min = embedding.column(0).iter().cloned().fold(f64::INFINITY, f64::min);
  let x_max = embedding.column(0).iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let y_min = embedding.column(1).iter().cloned().fold(f64::INFINITY, f64::min);
  let y_max = embedding.column(1).iter().cloned().fold(f64::NEG_INFINITY, f64::max);

  // Add padding
  let x_padding = (x_max - x_min).max(1e-9) * 0.05;
  let y_padding = (y_max - y_min).max(1e-9) * 0.05;

  let mut chart = ChartBuilder::on(&root)
    .caption("Gaussian clusters t-SNE", ("sans-serif", 40).into_font())
    .margin(10)
    .x_label_area_size(40)
    .y_label_area_size(50)
    .build_cartesian_2d(
      x_min - x_padding..x_max + x_padding,
      y_min - y_padding..y_max + y_padding,
    )?;

  chart
    .configure_mesh()
    .x_desc("t-SNE 1")
    .y_desc("t-SNE 2")
    .draw()?;

  let colors = [
    RGBColor(228, 26, 28),
    RGBColor(55, 126, 184),
    RGBColor(77, 175, 74),
    RGBColor(152, 78, 163),
    RGBColor(255, 127, 0),
    RGBColor(255, 255, 51),
    RGBColor(166, 86, 40),
    RGBColor(247, 129, 191),
    RGBColor(153, 153, 153),
    RGBColor(0, 0, 0),
  ];

  chart.draw_series(embedding.rows().into_iter().zip(labels).map(|(row, &label)| {
    Circle::new((row[0], row[1]), 3, colors[label % colors.len()].filled())
  }))?;

  let n_clusters = labels.iter().max().map_or(0, |&max| max + 1);
  for label in 0..n_clusters.min(colors.len()) {
    let color = colors[label];
    chart
      .draw_series(std::iter::once(Circle::new((x_min, y_min), 0, color.filled())))?
      .label(format!("Cluster {}", label))
      .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
  }

  chart
    .configure_series_labels()
    .border_style(&BLACK)
    .background_style(&WHITE.mix(0.8))
    .position(SeriesLabelPosition::UpperRight)
    .draw()?;

  root.present()?;
  Ok(())
}
